pub mod error;
pub mod route;
pub mod token;
pub mod venue;

use crate::Bytes;

pub use error::RouteError;
pub use route::{Group, SwapRoute, SwapStep, MAX_GROUP_COUNT};
pub use token::Token;
pub use venue::VenueKind;

/// Address literal type to uniquely identify accounts, tokens and venue contracts.
pub type Address = Bytes;

/// Length of an account address in bytes.
pub const ADDRESS_LENGTH: usize = 20;

/// Sentinel address standing for the chain's native asset wherever a token address is expected.
pub fn native_asset() -> Address {
    Bytes::from([0xee; ADDRESS_LENGTH])
}

/// The null address: an unset destination, referrer or pool.
pub fn null_address() -> Address {
    Bytes::zero(ADDRESS_LENGTH)
}

pub fn is_native(asset: &Address) -> bool {
    asset.len() == ADDRESS_LENGTH && asset.iter().all(|b| *b == 0xee)
}

/// True for the null address and for empty byte strings.
pub fn is_null(address: &Address) -> bool {
    address.is_zero()
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_native_sentinel() {
        let native = native_asset();

        assert!(is_native(&native));
        assert_eq!(native.to_string(), "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee");
        assert!(!is_native(
            &Bytes::from_str("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2").unwrap()
        ));
    }

    #[test]
    fn test_null_address() {
        assert!(is_null(&null_address()));
        assert!(is_null(&Bytes::new()));
        assert!(!is_null(&native_asset()));
    }
}
