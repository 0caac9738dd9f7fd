use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::{
    math::{apply_bps, TOTAL_BPS},
    Bytes,
};

/// Tax related to a token transfer. Should be given in Basis Points (1/100th of a percent)
pub type TransferTax = u32;

#[derive(Debug, Clone, Deserialize, Serialize, Eq)]
pub struct Token {
    pub address: Bytes,
    pub symbol: String,
    pub decimals: u32,
    /// Share of every transfer withheld by the token contract itself. Non-zero for
    /// fee-on-transfer assets, whose recipients receive less than the nominal amount.
    #[serde(default)]
    pub tax: TransferTax,
}

impl Token {
    pub fn new(address: &Bytes, symbol: &str, decimals: u32, tax: TransferTax) -> Self {
        Self { address: address.clone(), symbol: symbol.to_string(), decimals, tax }
    }

    /// Amount withheld when `amount` is transferred.
    pub fn transfer_tax(&self, amount: &BigUint) -> BigUint {
        apply_bps(amount, self.tax.min(TOTAL_BPS), TOTAL_BPS)
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}
