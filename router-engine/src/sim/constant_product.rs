//! Constant product router over two-token pairs.

use std::collections::HashMap;

use num_bigint::BigUint;
use router_common::{
    math::{balance_increase, TOTAL_BPS},
    models::{native_asset, Address},
};

use super::{amount_out, ensure_deadline};
use crate::{
    context::CallContext,
    ledger::Ledger,
    venues::{uniswap_v2::ConstantProductRouter, VenueError},
};

/// Router holding a pair per token combination. Reserves are the pair accounts' ledger balances.
#[derive(Debug, Clone)]
pub struct SimConstantProductRouter {
    address: Address,
    fee_bps: u32,
    pairs: HashMap<(Address, Address), Address>,
}

impl SimConstantProductRouter {
    /// A router charging the usual 0.3% swap fee.
    pub fn new(address: Address) -> Self {
        Self { address, fee_bps: 30, pairs: HashMap::new() }
    }

    pub fn with_fee_bps(mut self, fee_bps: u32) -> Self {
        self.fee_bps = fee_bps;
        self
    }

    pub fn add_pair(&mut self, token_a: &Address, token_b: &Address, pair: Address) {
        self.pairs
            .insert(sorted(token_a, token_b), pair);
    }

    pub fn with_pair(mut self, token_a: &Address, token_b: &Address, pair: Address) -> Self {
        self.add_pair(token_a, token_b, pair);
        self
    }

    /// Pays the input into the first pair with `pay`, then walks `path`, each pair sending its
    /// output to the next one and the last pair to `to`.
    fn swap_along<F>(
        &self,
        ledger: &mut Ledger,
        path: &[Address],
        to: &Address,
        pay: F,
    ) -> Result<Vec<BigUint>, VenueError>
    where
        F: FnOnce(&mut Ledger, &Address) -> Result<(), VenueError>,
    {
        if path.len() < 2 {
            return Err(VenueError::Rejected("invalid path".to_string()));
        }
        let pairs = path
            .windows(2)
            .map(|hop| {
                self.pair_for(&hop[0], &hop[1])
                    .ok_or_else(|| VenueError::UnknownPool(format!("{}/{}", hop[0], hop[1])))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut reserve_in = ledger.balance_of(&path[0], &pairs[0]);
        pay(ledger, &pairs[0])?;
        let mut amount = balance_increase(&reserve_in, &ledger.balance_of(&path[0], &pairs[0]));
        let mut amounts = vec![amount.clone()];

        for (hop, pair) in pairs.iter().enumerate() {
            let token_out = &path[hop + 1];
            let reserve_out = ledger.balance_of(token_out, pair);
            let out = amount_out(&amount, &reserve_in, &reserve_out, self.fee_bps, TOTAL_BPS)?;
            let recipient = pairs.get(hop + 1).unwrap_or(to);
            let before = ledger.balance_of(token_out, recipient);
            ledger.transfer(token_out, pair, recipient, &out)?;
            amounts.push(out);
            reserve_in = before.clone();
            amount = balance_increase(&before, &ledger.balance_of(token_out, recipient));
        }
        Ok(amounts)
    }
}

fn sorted(token_a: &Address, token_b: &Address) -> (Address, Address) {
    if token_a < token_b {
        (token_a.clone(), token_b.clone())
    } else {
        (token_b.clone(), token_a.clone())
    }
}

fn ensure_min_output(amounts: &[BigUint], minimum: &BigUint) -> Result<(), VenueError> {
    match amounts.last() {
        Some(actual) if actual < minimum => Err(VenueError::InsufficientOutput {
            minimum: minimum.clone(),
            actual: actual.clone(),
        }),
        _ => Ok(()),
    }
}

impl ConstantProductRouter for SimConstantProductRouter {
    fn address(&self) -> Address {
        self.address.clone()
    }

    fn pair_for(&self, token_a: &Address, token_b: &Address) -> Option<Address> {
        self.pairs
            .get(&sorted(token_a, token_b))
            .cloned()
    }

    fn swap_exact_eth_for_tokens(
        &self,
        ledger: &mut Ledger,
        call: &CallContext,
        amount_out_min: &BigUint,
        path: &[Address],
        to: &Address,
        deadline: u64,
    ) -> Result<Vec<BigUint>, VenueError> {
        ensure_deadline(ledger, deadline)?;
        let wrapped = ledger.wrapped_native().clone();
        if path.first() != Some(&wrapped) {
            return Err(VenueError::Rejected("path must start with wrapped native".to_string()));
        }
        let amounts = self.swap_along(ledger, path, to, |ledger, pair| {
            ledger.transfer(&native_asset(), &call.sender, &self.address, &call.value)?;
            ledger.wrap(&self.address, &call.value)?;
            ledger.transfer(&wrapped, &self.address, pair, &call.value)?;
            Ok(())
        })?;
        ensure_min_output(&amounts, amount_out_min)?;
        Ok(amounts)
    }

    fn swap_exact_tokens_for_eth(
        &self,
        ledger: &mut Ledger,
        caller: &Address,
        amount_in: &BigUint,
        amount_out_min: &BigUint,
        path: &[Address],
        to: &Address,
        deadline: u64,
    ) -> Result<Vec<BigUint>, VenueError> {
        ensure_deadline(ledger, deadline)?;
        let wrapped = ledger.wrapped_native().clone();
        if path.last() != Some(&wrapped) {
            return Err(VenueError::Rejected("path must end with wrapped native".to_string()));
        }
        let router = self.address.clone();
        let amounts = self.swap_along(ledger, path, &router, |ledger, pair| {
            ledger.transfer_from(&path[0], &router, caller, pair, amount_in)?;
            Ok(())
        })?;
        ensure_min_output(&amounts, amount_out_min)?;
        if let Some(out) = amounts.last() {
            ledger.unwrap(&router, out)?;
            ledger.transfer(&native_asset(), &router, to, out)?;
        }
        Ok(amounts)
    }

    fn swap_exact_tokens_for_tokens(
        &self,
        ledger: &mut Ledger,
        caller: &Address,
        amount_in: &BigUint,
        amount_out_min: &BigUint,
        path: &[Address],
        to: &Address,
        deadline: u64,
    ) -> Result<Vec<BigUint>, VenueError> {
        ensure_deadline(ledger, deadline)?;
        let amounts = self.swap_along(ledger, path, to, |ledger, pair| {
            ledger.transfer_from(&path[0], &self.address, caller, pair, amount_in)?;
            Ok(())
        })?;
        ensure_min_output(&amounts, amount_out_min)?;
        Ok(amounts)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ledger::tests::addr;

    fn setup() -> (Ledger, SimConstantProductRouter) {
        let mut ledger = Ledger::new(addr(0xee));
        let router =
            SimConstantProductRouter::new(addr(0x20)).with_pair(&addr(1), &addr(2), addr(0x21));
        ledger.mint(&addr(1), &addr(0x21), &BigUint::from(1_000_000u32));
        ledger.mint(&addr(2), &addr(0x21), &BigUint::from(2_000_000u32));
        ledger.mint(&addr(1), &addr(0xa), &BigUint::from(10_000u32));
        ledger
            .approve(&addr(1), &addr(0xa), &addr(0x20), &BigUint::from(10_000u32))
            .unwrap();
        (ledger, router)
    }

    #[test]
    fn test_swap_exact_tokens_for_tokens() {
        let (mut ledger, router) = setup();

        let amounts = router
            .swap_exact_tokens_for_tokens(
                &mut ledger,
                &addr(0xa),
                &BigUint::from(10_000u32),
                &BigUint::from(1u32),
                &[addr(1), addr(2)],
                &addr(0xb),
                0,
            )
            .unwrap();

        // 10000 * 997 * 2000000 / (1000000 * 1000 + 10000 * 997)
        assert_eq!(amounts, vec![BigUint::from(10_000u32), BigUint::from(19_743u32)]);
        assert_eq!(ledger.balance_of(&addr(2), &addr(0xb)), BigUint::from(19_743u32));
        assert_eq!(ledger.balance_of(&addr(1), &addr(0x21)), BigUint::from(1_010_000u32));
    }

    #[test]
    fn test_pair_lookup_is_order_independent() {
        let (_, router) = setup();

        assert_eq!(router.pair_for(&addr(2), &addr(1)), Some(addr(0x21)));
        assert_eq!(router.pair_for(&addr(1), &addr(3)), None);
    }

    #[test]
    fn test_expired_deadline() {
        let (mut ledger, router) = setup();
        ledger.set_timestamp(11);

        let res = router.swap_exact_tokens_for_tokens(
            &mut ledger,
            &addr(0xa),
            &BigUint::from(10_000u32),
            &BigUint::from(1u32),
            &[addr(1), addr(2)],
            &addr(0xb),
            10,
        );

        assert_eq!(res, Err(VenueError::Expired { deadline: 10, now: 11 }));
    }

    #[test]
    fn test_output_below_minimum() {
        let (mut ledger, router) = setup();

        let res = router.swap_exact_tokens_for_tokens(
            &mut ledger,
            &addr(0xa),
            &BigUint::from(10_000u32),
            &BigUint::from(20_000u32),
            &[addr(1), addr(2)],
            &addr(0xb),
            0,
        );

        assert!(matches!(res, Err(VenueError::InsufficientOutput { .. })));
    }
}
