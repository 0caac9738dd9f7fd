use thiserror::Error;

use super::Address;

/// Reasons a route is rejected before any funds move.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("Failed to decode route: {0}")]
    Decode(String),
    #[error("Failed to encode route: {0}")]
    Encode(String),
    #[error("Route has no steps")]
    EmptyRoute,
    #[error("Route expired: deadline {deadline} is before current time {now}")]
    Expired { deadline: u64, now: u64 },
    #[error("Minimum output amount must be positive")]
    ZeroAmountOutMin,
    #[error("Input amount must be positive")]
    ZeroAmountIn,
    #[error("Destination must not be the null address")]
    ZeroDestination,
    #[error("Step {step}: invalid path: {reason}")]
    InvalidPath { step: usize, reason: String },
    #[error("Step {step}: percent {percent} exceeds 100000")]
    InvalidStepPercent { step: usize, percent: u32 },
    #[error("Group {id}: percent {percent} exceeds 100000")]
    InvalidGroupPercent { id: u32, percent: u32 },
    #[error("Route asks for {group_count} groups, at most {max} are allowed")]
    TooManyGroups { group_count: u32, max: u32 },
    #[error("Group id {id} out of range for {group_count} groups")]
    GroupOutOfRange { id: u32, group_count: u32 },
    #[error("Parent groups allocate {total} of 100000")]
    InvalidAllocation { total: u64 },
    #[error("No step produces the route output {0}")]
    UnreachableOutput(Address),
    #[error("Invalid auxiliary data: {0}")]
    InvalidAuxData(String),
}
