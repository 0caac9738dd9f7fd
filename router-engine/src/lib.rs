//! Execution pipeline of the splitswap router.
//!
//! A swap enters through [`referral::ReferralRouter`], which resolves the referrer of the caller,
//! takes the referral fee in kind and hands the remaining amount to
//! [`executor::RouteExecutor`]. The executor splits the amount across the route's buckets,
//! dispatches every step to its venue's calling convention and settles the output, sweeping any
//! leftover balance to the destination.
//!
//! The chain is modelled by [`ledger::Ledger`]: every entrypoint takes it by mutable reference and
//! restores it when the call fails, so no partial effect of a failed call is ever observable.

pub mod config;
pub mod constants;
pub mod context;
pub mod errors;
pub mod executor;
pub mod guard;
pub mod ledger;
pub mod referral;
pub mod sim;
pub mod venues;
