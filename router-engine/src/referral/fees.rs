use std::collections::HashMap;

use num_bigint::BigUint;
use num_traits::{One, Zero};
use router_common::{
    math::{apply_bps, mul_div},
    models::Address,
};

use crate::{constants::TOTAL_BPS, errors::ReferralError};

/// Result of taking a referral fee out of an input amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeSplit {
    pub fee_amount: BigUint,
    /// What is left to route.
    pub swap_amount: BigUint,
    /// Caller's slippage floor, rescaled to `swap_amount`.
    pub amount_out_min: BigUint,
}

/// Takes referral fees out of input amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSplitter {
    total_bps: u32,
}

impl Default for FeeSplitter {
    fn default() -> Self {
        Self { total_bps: TOTAL_BPS }
    }
}

impl FeeSplitter {
    pub fn new(total_bps: u32) -> Self {
        Self { total_bps }
    }

    /// Splits `amount_in` at `bps` and rescales `amount_out_min` from `declared_amount_in` to the
    /// remaining swap amount.
    ///
    /// A positive floor never rescales to zero: it is clamped to one instead.
    pub fn split(
        &self,
        amount_in: &BigUint,
        bps: u32,
        declared_amount_in: &BigUint,
        amount_out_min: &BigUint,
    ) -> Result<FeeSplit, ReferralError> {
        let fee_amount = apply_bps(amount_in, bps, self.total_bps);
        if &fee_amount >= amount_in {
            return Err(ReferralError::FeeConsumesInput);
        }
        let swap_amount = amount_in - &fee_amount;

        let mut scaled_min =
            mul_div(amount_out_min, &swap_amount, declared_amount_in).unwrap_or_default();
        if !amount_out_min.is_zero() && scaled_min.is_zero() {
            scaled_min = BigUint::one();
        }
        Ok(FeeSplit { fee_amount, swap_amount, amount_out_min: scaled_min })
    }
}

/// Accumulated referral fees, per referrer and asset. Fees are held in kind.
#[derive(Debug, Clone, Default)]
pub struct EarningsLedger {
    earnings: HashMap<Address, HashMap<Address, BigUint>>,
}

impl EarningsLedger {
    pub fn credit(&mut self, referrer: &Address, asset: &Address, amount: &BigUint) {
        *self
            .earnings
            .entry(referrer.clone())
            .or_default()
            .entry(asset.clone())
            .or_default() += amount;
    }

    pub fn balance(&self, referrer: &Address, asset: &Address) -> BigUint {
        self.earnings
            .get(referrer)
            .and_then(|assets| assets.get(asset))
            .cloned()
            .unwrap_or_default()
    }

    /// Zeroes `referrer`'s earnings in `asset` and returns what they were.
    pub fn take(&mut self, referrer: &Address, asset: &Address) -> BigUint {
        self.earnings
            .get_mut(referrer)
            .and_then(|assets| assets.remove(asset))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::ledger::tests::addr;

    #[test]
    fn test_split_exact_fee() {
        let amount = BigUint::from_str("1000000000000000000").unwrap();

        let split = FeeSplitter::default()
            .split(&amount, 250, &amount, &amount)
            .unwrap();

        assert_eq!(split.fee_amount, BigUint::from_str("25000000000000000").unwrap());
        assert_eq!(split.swap_amount, BigUint::from_str("975000000000000000").unwrap());
        assert_eq!(split.amount_out_min, split.swap_amount);
    }

    #[test]
    fn test_split_large_amounts() {
        let amount = BigUint::from(1u8) << 255;

        let split = FeeSplitter::default()
            .split(&amount, 300, &amount, &BigUint::from(1u8))
            .unwrap();

        assert_eq!(split.fee_amount, &amount * BigUint::from(300u32) / BigUint::from(10_000u32));
        assert_eq!(split.amount_out_min, BigUint::one());
    }

    #[rstest]
    #[case(1u64, 1u64)]
    #[case(0u64, 0u64)]
    #[case(1_000u64, 975u64)]
    fn test_split_min_clamped(#[case] min: u64, #[case] expected: u64) {
        let split = FeeSplitter::default()
            .split(&BigUint::from(1_000u32), 250, &BigUint::from(1_000u32), &BigUint::from(min))
            .unwrap();

        assert_eq!(split.amount_out_min, BigUint::from(expected));
    }

    #[test]
    fn test_zero_rate() {
        let split = FeeSplitter::default()
            .split(&BigUint::from(7u32), 0, &BigUint::from(7u32), &BigUint::from(3u32))
            .unwrap();

        assert_eq!(split.fee_amount, BigUint::zero());
        assert_eq!(split.swap_amount, BigUint::from(7u32));
        assert_eq!(split.amount_out_min, BigUint::from(3u32));
    }

    #[test]
    fn test_fee_consuming_input() {
        let res = FeeSplitter::default().split(
            &BigUint::from(10u32),
            10_000,
            &BigUint::from(10u32),
            &BigUint::from(1u32),
        );

        assert_eq!(res, Err(ReferralError::FeeConsumesInput));
    }

    #[test]
    fn test_earnings() {
        let mut earnings = EarningsLedger::default();
        earnings.credit(&addr(1), &addr(9), &BigUint::from(5u32));
        earnings.credit(&addr(1), &addr(9), &BigUint::from(6u32));

        assert_eq!(earnings.balance(&addr(1), &addr(9)), BigUint::from(11u32));
        assert_eq!(earnings.take(&addr(1), &addr(9)), BigUint::from(11u32));
        assert_eq!(earnings.balance(&addr(1), &addr(9)), BigUint::zero());
        assert_eq!(earnings.take(&addr(2), &addr(9)), BigUint::zero());
    }
}
