use num_bigint::BigUint;
use router_common::models::{Address, RouteError};
use thiserror::Error;

use crate::{ledger::LedgerError, venues::VenueError};

/// Failures of [`crate::executor::RouteExecutor`].
///
/// Every variant aborts the whole call: the ledger is restored to the state it had on entry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error(transparent)]
    Route(#[from] RouteError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("Unsupported venue: {0}")]
    UnsupportedVenue(String),
    #[error("Step {step}: invalid sub-step amount")]
    InvalidSubStepAmount { step: usize },
    #[error("Step {step}: {source}")]
    Venue { step: usize, source: VenueError },
    #[error("Step {step}: pool {pool} does not match: {reason}")]
    PoolMismatch { step: usize, pool: Address, reason: String },
    #[error("Step {step}: invalid auxiliary data: {reason}")]
    InvalidAuxData { step: usize, reason: String },
    #[error("Insufficient output: expected at least {expected}, got {actual}")]
    InsufficientOutput { expected: BigUint, actual: BigUint },
    #[error("No input tokens received")]
    ZeroTokensReceived,
    #[error("Attached value {actual} does not match input amount {expected}")]
    NativeValueMismatch { expected: BigUint, actual: BigUint },
    #[error("Native value attached to a token input swap")]
    UnexpectedValue,
    #[error("Caller {0} is not authorized")]
    Unauthorized(Address),
    #[error("Execution is paused")]
    Paused,
    #[error("Reentrant call")]
    Reentrant,
    #[error("Storage unavailable: {0}")]
    Storage(String),
}

/// Failures of [`crate::referral::ReferralRouter`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferralError {
    #[error(transparent)]
    Route(#[from] RouteError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("Fee {bps} bps outside of [{min}, {max}]")]
    FeeOutOfRange { bps: u32, min: u32, max: u32 },
    #[error("Default referrer fee {bps} bps exceeds {max}")]
    DefaultReferrerFeeTooHigh { bps: u32, max: u32 },
    #[error("Promotional cap {bps} bps outside of [{min}, {max}]")]
    PromoCapOutOfRange { bps: u32, min: u32, max: u32 },
    #[error("Referral fee consumes the whole input amount")]
    FeeConsumesInput,
    #[error("No input tokens received")]
    ZeroTokensReceived,
    #[error("Attached value {actual} does not match input amount {expected}")]
    NativeValueMismatch { expected: BigUint, actual: BigUint },
    #[error("Native value attached to a token input swap")]
    UnexpectedValue,
    #[error("Address must not be null")]
    ZeroAddress,
    #[error("Caller {0} is not authorized")]
    Unauthorized(Address),
    #[error("Swaps are paused")]
    Paused,
    #[error("Reentrant call")]
    Reentrant,
    #[error("Storage unavailable: {0}")]
    Storage(String),
}
