use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// The calling convention used to reach a class of external exchange.
///
/// Route steps carry a free-form venue tag (`"uniswap_v2"`, `"sushiswap"`, ...). The executor's
/// registry maps each tag to one of these kinds plus the venue's contract address, so several
/// forks of the same exchange share one convention.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VenueKind {
    /// Constant-product router with native-in, native-out and token-token entrypoints.
    UniswapV2,
    /// Concentrated-liquidity router, single-hop exact input; fee tier read from the pool.
    UniswapV3,
    /// Vault holding weighted pools, single swap with explicit fund management.
    BalancerV2,
    /// Stable-swap pool addressed by coin indices.
    Curve,
    /// Singleton pool manager using unlock callbacks and delta settlement.
    UniswapV4,
}
