//! The route a caller submits for execution.
//!
//! A route is a flattened split tree: `parent_groups` seed numbered buckets with shares of the
//! input amount, and every step moves a share of one bucket through one venue into another
//! bucket. Steps run strictly in list order, so a bucket must be filled by earlier steps (or a
//! parent group) before a later step draws from it.

use std::collections::HashSet;

use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use super::{error::RouteError, is_null, Address};
use crate::{abi, math::PERCENT_DENOMINATOR, serde_primitives::biguint_string, Bytes};

/// Largest bucket array a route may ask for. Bucket ids may be sparse, so this bounds the
/// allocation rather than the number of buckets a route actually uses.
pub const MAX_GROUP_COUNT: u32 = 1_024;

/// One single-venue swap leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapStep {
    /// Venue tag, resolved through the executor's venue registry.
    pub venue: String,
    /// `[input asset, output asset]`.
    pub path: [Address; 2],
    /// Pool or venue reference. Its meaning depends on the venue's calling convention.
    pub pool: Address,
    /// Share of the parent bucket consumed by this step, on the 100000 scale.
    pub percent: u32,
    /// Bucket receiving this step's output.
    pub group_id: u32,
    /// Bucket this step draws its input from.
    pub parent_group_id: u32,
    /// Opaque per-venue parameters.
    #[serde(default)]
    pub aux_data: Bytes,
}

impl SwapStep {
    pub fn token_in(&self) -> &Address {
        &self.path[0]
    }

    pub fn token_out(&self) -> &Address {
        &self.path[1]
    }
}

/// Seed allocation of the route's input amount into one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: u32,
    pub percent: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRoute {
    pub steps: Vec<SwapStep>,
    pub parent_groups: Vec<Group>,
    pub destination: Address,
    pub token_in: Address,
    pub token_out: Address,
    pub group_count: u32,
    /// Unix timestamp (seconds) after which the route may no longer execute.
    pub deadline: u64,
    #[serde(with = "biguint_string")]
    pub amount_in: BigUint,
    #[serde(with = "biguint_string")]
    pub amount_out_min: BigUint,
    /// Deliver the native asset when `token_out` is the wrapped native token.
    #[serde(default)]
    pub unwrap_native: bool,
}

impl SwapRoute {
    /// Decodes a route from its ABI wire format.
    pub fn decode(data: &[u8]) -> Result<Self, RouteError> {
        abi::decode_route(data)
    }

    /// Encodes the route into its ABI wire format.
    pub fn encode(&self) -> Result<Vec<u8>, RouteError> {
        abi::encode_route(self)
    }

    /// Checks every structural precondition of execution at time `now`.
    ///
    /// The deadline is inclusive: a route whose deadline equals `now` is still valid.
    pub fn validate(&self, now: u64) -> Result<(), RouteError> {
        if self.steps.is_empty() {
            return Err(RouteError::EmptyRoute);
        }
        if self.group_count > MAX_GROUP_COUNT {
            return Err(RouteError::TooManyGroups {
                group_count: self.group_count,
                max: MAX_GROUP_COUNT,
            });
        }
        if self.deadline < now {
            return Err(RouteError::Expired { deadline: self.deadline, now });
        }
        if self.amount_out_min.is_zero() {
            return Err(RouteError::ZeroAmountOutMin);
        }
        if self.amount_in.is_zero() {
            return Err(RouteError::ZeroAmountIn);
        }
        if is_null(&self.destination) {
            return Err(RouteError::ZeroDestination);
        }

        for (index, step) in self.steps.iter().enumerate() {
            Self::validate_step(index, step, self.group_count)?;
        }

        let mut total = 0u64;
        for group in &self.parent_groups {
            if group.percent > PERCENT_DENOMINATOR {
                return Err(RouteError::InvalidGroupPercent {
                    id: group.id,
                    percent: group.percent,
                });
            }
            self.check_group(group.id)?;
            total += u64::from(group.percent);
        }
        if total != u64::from(PERCENT_DENOMINATOR) {
            return Err(RouteError::InvalidAllocation { total });
        }

        if !self
            .steps
            .iter()
            .any(|step| step.token_out() == &self.token_out)
        {
            return Err(RouteError::UnreachableOutput(self.token_out.clone()));
        }
        Ok(())
    }

    fn validate_step(index: usize, step: &SwapStep, group_count: u32) -> Result<(), RouteError> {
        let [token_in, token_out] = &step.path;
        if is_null(token_in) || is_null(token_out) {
            return Err(RouteError::InvalidPath {
                step: index,
                reason: "null asset in path".to_string(),
            });
        }
        if token_in == token_out {
            return Err(RouteError::InvalidPath {
                step: index,
                reason: format!("input and output are both {token_in}"),
            });
        }
        if step.percent > PERCENT_DENOMINATOR {
            return Err(RouteError::InvalidStepPercent { step: index, percent: step.percent });
        }
        for id in [step.group_id, step.parent_group_id] {
            if id >= group_count {
                return Err(RouteError::GroupOutOfRange { id, group_count });
            }
        }
        Ok(())
    }

    fn check_group(&self, id: u32) -> Result<(), RouteError> {
        if id >= self.group_count {
            return Err(RouteError::GroupOutOfRange { id, group_count: self.group_count });
        }
        Ok(())
    }

    /// Every distinct asset the route touches: the input asset first, then each step's path
    /// assets in step order.
    pub fn referenced_assets(&self) -> Vec<Address> {
        let mut seen = HashSet::new();
        std::iter::once(&self.token_in)
            .chain(self.steps.iter().flat_map(|step| step.path.iter()))
            .filter(|asset| seen.insert((*asset).clone()))
            .cloned()
            .collect()
    }
}
