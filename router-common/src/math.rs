//! Integer helpers shared by fee splitting and route execution.

use num_bigint::BigUint;
use num_traits::Zero;

/// Denominator of step and group split percentages (5 implied decimals, 100000 = 100%).
pub const PERCENT_DENOMINATOR: u32 = 100_000;

/// Denominator of fee rates expressed in basis points.
pub const TOTAL_BPS: u32 = 10_000;

/// `floor(a * b / denominator)` computed on the full product.
///
/// Returns `None` when `denominator` is zero.
pub fn mul_div(a: &BigUint, b: &BigUint, denominator: &BigUint) -> Option<BigUint> {
    if denominator.is_zero() {
        return None;
    }
    Some(a * b / denominator)
}

/// `floor(amount * percent / 100000)`.
pub fn apply_percent(amount: &BigUint, percent: u32) -> BigUint {
    amount * BigUint::from(percent) / BigUint::from(PERCENT_DENOMINATOR)
}

/// `floor(amount * bps / total_bps)`. A zero `total_bps` yields zero.
pub fn apply_bps(amount: &BigUint, bps: u32, total_bps: u32) -> BigUint {
    mul_div(amount, &BigUint::from(bps), &BigUint::from(total_bps)).unwrap_or_default()
}

/// `current - previous` when the balance grew, zero otherwise.
pub fn balance_increase(previous: &BigUint, current: &BigUint) -> BigUint {
    if current > previous {
        current - previous
    } else {
        BigUint::zero()
    }
}
