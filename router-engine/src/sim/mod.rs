//! In-memory reference venues.
//!
//! One implementation per calling convention, each keeping its pool reserves as ledger balances
//! of the pool's account. They back the integration tests and the CLI's dry runs, and can be
//! declared in YAML as a list of [`PoolSpec`]s.

pub mod concentrated;
pub mod constant_product;
pub mod pool_manager;
pub mod stable;
pub mod weighted;

use std::{collections::BTreeMap, sync::Arc};

use num_bigint::BigUint;
use num_traits::Zero;
use router_common::{
    math::balance_increase,
    models::{native_asset, null_address, Address},
    serde_primitives::biguint_string_vec,
    Bytes,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    ledger::Ledger,
    venues::{
        uniswap_v4::{to_asset, to_currency, PoolKey},
        Venue, VenueError,
    },
};
use concentrated::{SimConcentratedPool, SimConcentratedRouter};
use constant_product::SimConstantProductRouter;
use pool_manager::{pool_account, SimPoolManager};
use stable::SimStableSwapPool;
use weighted::{SimWeightedPoolVault, WeightedPool};

/// Output of a constant product swap charging `fee / fee_denominator` of the input.
pub fn amount_out(
    amount_in: &BigUint,
    reserve_in: &BigUint,
    reserve_out: &BigUint,
    fee: u32,
    fee_denominator: u32,
) -> Result<BigUint, VenueError> {
    if amount_in.is_zero() {
        return Err(VenueError::Rejected("insufficient input amount".to_string()));
    }
    if reserve_in.is_zero() || reserve_out.is_zero() || fee >= fee_denominator {
        return Err(VenueError::InsufficientLiquidity);
    }
    let amount_in_with_fee = amount_in * BigUint::from(fee_denominator - fee);
    let numerator = &amount_in_with_fee * reserve_out;
    let denominator = reserve_in * BigUint::from(fee_denominator) + &amount_in_with_fee;
    let out = numerator / denominator;
    if out.is_zero() {
        return Err(VenueError::InsufficientLiquidity);
    }
    Ok(out)
}

pub(crate) fn ensure_deadline(ledger: &Ledger, deadline: u64) -> Result<(), VenueError> {
    let now = ledger.timestamp();
    if deadline < now {
        return Err(VenueError::Expired { deadline, now });
    }
    Ok(())
}

/// Spends `spender`'s allowance to move `amount` of `owner`'s `asset` to `to` and returns what
/// `to` actually received.
pub(crate) fn pull(
    ledger: &mut Ledger,
    asset: &Address,
    spender: &Address,
    owner: &Address,
    to: &Address,
    amount: &BigUint,
) -> Result<BigUint, VenueError> {
    let before = ledger.balance_of(asset, to);
    ledger.transfer_from(asset, spender, owner, to, amount)?;
    Ok(balance_increase(&before, &ledger.balance_of(asset, to)))
}

/// Declarative description of a reference pool. Reserves are matched to tokens by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PoolSpec {
    UniswapV2 {
        router: Address,
        pair: Address,
        tokens: [Address; 2],
        #[serde(with = "biguint_string_vec")]
        reserves: Vec<BigUint>,
    },
    UniswapV3 {
        router: Address,
        pool: Address,
        tokens: [Address; 2],
        /// Fee tier in hundredths of a basis point.
        fee: u32,
        #[serde(with = "biguint_string_vec")]
        reserves: Vec<BigUint>,
    },
    BalancerV2 {
        vault: Address,
        /// 32 byte pool id.
        pool_id: Bytes,
        account: Address,
        tokens: Vec<Address>,
        #[serde(default)]
        swap_fee_bps: u32,
        #[serde(with = "biguint_string_vec")]
        reserves: Vec<BigUint>,
    },
    Curve {
        pool: Address,
        coins: Vec<Address>,
        #[serde(default)]
        fee_bps: u32,
        #[serde(with = "biguint_string_vec")]
        reserves: Vec<BigUint>,
    },
    UniswapV4 {
        manager: Address,
        /// Ledger assets; the native asset maps to the null currency.
        tokens: [Address; 2],
        fee: u32,
        tick_spacing: u32,
        #[serde(default = "null_address")]
        hooks: Address,
        #[serde(with = "biguint_string_vec")]
        reserves: Vec<BigUint>,
    },
}

/// Mints the reserves to `account`. Wrapped native reserves are backed by native held by the
/// wrapper, so they can be unwrapped.
fn fund(ledger: &mut Ledger, account: &Address, tokens: &[Address], reserves: &[BigUint]) {
    let wrapped = ledger.wrapped_native().clone();
    for (token, reserve) in tokens.iter().zip(reserves) {
        if token == &wrapped {
            ledger.mint(&native_asset(), &wrapped, reserve);
        }
        ledger.mint(token, account, reserve);
    }
}

/// Funds the pools described by `specs` and returns the venue contracts serving them.
///
/// Pools sharing a router, vault or manager address are served by one contract.
pub fn install(ledger: &mut Ledger, specs: &[PoolSpec]) -> Result<Vec<Venue>, VenueError> {
    let mut constant_product: BTreeMap<Address, SimConstantProductRouter> = BTreeMap::new();
    let mut concentrated: BTreeMap<Address, SimConcentratedRouter> = BTreeMap::new();
    let mut vaults: BTreeMap<Address, SimWeightedPoolVault> = BTreeMap::new();
    let mut managers: BTreeMap<Address, SimPoolManager> = BTreeMap::new();
    let mut venues = Vec::new();

    for spec in specs {
        match spec {
            PoolSpec::UniswapV2 { router, pair, tokens, reserves } => {
                constant_product
                    .entry(router.clone())
                    .or_insert_with(|| SimConstantProductRouter::new(router.clone()))
                    .add_pair(&tokens[0], &tokens[1], pair.clone());
                fund(ledger, pair, tokens, reserves);
            }
            PoolSpec::UniswapV3 { router, pool, tokens, fee, reserves } => {
                let handle = Arc::new(SimConcentratedPool::new(
                    pool.clone(),
                    tokens[0].clone(),
                    tokens[1].clone(),
                    *fee,
                ));
                concentrated
                    .entry(router.clone())
                    .or_insert_with(|| SimConcentratedRouter::new(router.clone()))
                    .add_pool(handle.clone());
                venues.push(Venue::ConcentratedLiquidityPool(handle));
                fund(ledger, pool, tokens, reserves);
            }
            PoolSpec::BalancerV2 { vault, pool_id, account, tokens, swap_fee_bps, reserves } => {
                let id = <[u8; 32]>::try_from(&pool_id[..])
                    .map_err(|_| VenueError::UnknownPool(pool_id.to_string()))?;
                let pool = WeightedPool {
                    account: account.clone(),
                    tokens: tokens.clone(),
                    swap_fee_bps: *swap_fee_bps,
                };
                vaults
                    .entry(vault.clone())
                    .or_insert_with(|| SimWeightedPoolVault::new(vault.clone()))
                    .add_pool(id, pool);
                fund(ledger, account, tokens, reserves);
            }
            PoolSpec::Curve { pool, coins, fee_bps, reserves } => {
                venues.push(Venue::StableSwapPool(Arc::new(SimStableSwapPool::new(
                    pool.clone(),
                    coins.clone(),
                    *fee_bps,
                ))));
                fund(ledger, pool, coins, reserves);
            }
            PoolSpec::UniswapV4 { manager, tokens, fee, tick_spacing, hooks, reserves } => {
                let (currency_a, currency_b) = (to_currency(&tokens[0]), to_currency(&tokens[1]));
                let (currency0, currency1) = if currency_a < currency_b {
                    (currency_a, currency_b)
                } else {
                    (currency_b, currency_a)
                };
                let key = PoolKey {
                    currency0,
                    currency1,
                    fee: *fee,
                    tick_spacing: *tick_spacing,
                    hooks: hooks.clone(),
                };
                fund(ledger, &pool_account(&key), tokens, reserves);
                debug!(pool = %key.id(), currency0 = %to_asset(&key.currency0), "Installed pool");
                managers
                    .entry(manager.clone())
                    .or_insert_with(|| SimPoolManager::new(manager.clone()))
                    .add_pool(key);
            }
        }
    }

    venues.extend(
        constant_product
            .into_values()
            .map(|router| Venue::ConstantProductRouter(Arc::new(router))),
    );
    venues.extend(
        concentrated
            .into_values()
            .map(|router| Venue::ConcentratedLiquidityRouter(Arc::new(router))),
    );
    venues.extend(
        vaults
            .into_values()
            .map(|vault| Venue::WeightedPoolVault(Arc::new(vault))),
    );
    venues.extend(
        managers
            .into_values()
            .map(|manager| Venue::PoolManager(Arc::new(manager))),
    );
    Ok(venues)
}
