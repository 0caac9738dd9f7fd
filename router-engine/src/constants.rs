//! Fee and split constants of the referral layer.

pub use router_common::math::{PERCENT_DENOMINATOR, TOTAL_BPS};

/// Lowest rate a referrer may set for themselves (0.10%).
pub const MIN_CUSTOM_FEE_BPS: u32 = 10;
/// Highest rate a referrer may set for themselves (3.00%).
pub const MAX_CUSTOM_FEE_BPS: u32 = 300;
/// Rate of a referrer that never set a custom one.
pub const DEFAULT_REFERRER_FEE_BPS: u32 = 50;
/// Cap applied to every referral once the promotional swaps are used up.
pub const TAIL_BPS: u32 = 50;
/// Cap of the default referrer's rate. Kept below `TAIL_BPS`.
pub const MAX_DEFAULT_REFERRER_BPS: u32 = 30;
/// Promotional cap in force until the owner changes it.
pub const DEFAULT_MAX_PROMO_BPS: u32 = 250;
pub const MIN_PROMO_CAP_BPS: u32 = 100;
pub const MAX_PROMO_CAP_BPS: u32 = 300;
/// Number of swaps charged at the promotional rate after a first binding.
pub const PROMO_SWAPS: u32 = 3;
