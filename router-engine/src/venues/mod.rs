//! Calling conventions of the supported exchange venues.
//!
//! Every venue class is an external interface (a trait in its module) plus a `swap` function
//! that drives one route step through it. Dispatch is closed over [`VenueKind`]: supporting a new
//! class of venue means adding a kind, an interface and its calling convention.
//!
//! Whatever a venue reports, the output of a leg is always measured as the executor's balance
//! delta on the step's output asset.

pub mod balancer_v2;
pub mod curve;
pub mod uniswap_v2;
pub mod uniswap_v3;
pub mod uniswap_v4;

use std::{collections::HashMap, fmt, sync::Arc};

use num_bigint::BigUint;
use num_traits::Zero;
use router_common::{
    math::balance_increase,
    models::{is_native, Address, SwapStep, VenueKind},
};
use thiserror::Error;
use tracing::debug;

use crate::{
    errors::ExecutionError,
    ledger::{Ledger, LedgerError},
};
use balancer_v2::WeightedPoolVault;
use curve::StableSwapPool;
use uniswap_v2::ConstantProductRouter;
use uniswap_v3::{ConcentratedLiquidityPool, ConcentratedLiquidityRouter};
use uniswap_v4::PoolManager;

/// Failures reported by an external venue.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VenueError {
    #[error("Call rejected: {0}")]
    Rejected(String),
    #[error("Unknown pool: {0}")]
    UnknownPool(String),
    #[error("Insufficient liquidity")]
    InsufficientLiquidity,
    #[error("Output {actual} below minimum {minimum}")]
    InsufficientOutput { minimum: BigUint, actual: BigUint },
    #[error("Deadline {deadline} passed at {now}")]
    Expired { deadline: u64, now: u64 },
    #[error("Currency {0} left unsettled")]
    CurrencyNotSettled(Address),
    #[error("Unexpected callback from {0}")]
    UnexpectedCallback(Address),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// A deployed external venue contract, one variant per interface.
#[derive(Clone)]
pub enum Venue {
    ConstantProductRouter(Arc<dyn ConstantProductRouter>),
    ConcentratedLiquidityRouter(Arc<dyn ConcentratedLiquidityRouter>),
    ConcentratedLiquidityPool(Arc<dyn ConcentratedLiquidityPool>),
    WeightedPoolVault(Arc<dyn WeightedPoolVault>),
    StableSwapPool(Arc<dyn StableSwapPool>),
    PoolManager(Arc<dyn PoolManager>),
}

impl Venue {
    pub fn address(&self) -> Address {
        match self {
            Venue::ConstantProductRouter(venue) => venue.address(),
            Venue::ConcentratedLiquidityRouter(venue) => venue.address(),
            Venue::ConcentratedLiquidityPool(venue) => venue.address(),
            Venue::WeightedPoolVault(venue) => venue.address(),
            Venue::StableSwapPool(venue) => venue.address(),
            Venue::PoolManager(venue) => venue.address(),
        }
    }

    fn interface(&self) -> &'static str {
        match self {
            Venue::ConstantProductRouter(_) => "ConstantProductRouter",
            Venue::ConcentratedLiquidityRouter(_) => "ConcentratedLiquidityRouter",
            Venue::ConcentratedLiquidityPool(_) => "ConcentratedLiquidityPool",
            Venue::WeightedPoolVault(_) => "WeightedPoolVault",
            Venue::StableSwapPool(_) => "StableSwapPool",
            Venue::PoolManager(_) => "PoolManager",
        }
    }
}

impl fmt::Debug for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple(self.interface())
            .field(&self.address())
            .finish()
    }
}

/// Registry entry of a venue tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenueEntry {
    pub kind: VenueKind,
    /// Router, vault or pool manager the tag dispatches to. Unused by conventions that address
    /// the pool named in the step directly.
    pub address: Address,
}

/// Venue tags the executor accepts and the venue contracts it can call.
#[derive(Debug, Clone, Default)]
pub struct VenueRegistry {
    dexes: HashMap<String, VenueEntry>,
    contracts: HashMap<Address, Venue>,
}

impl VenueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_dex(&mut self, tag: &str, kind: VenueKind, address: Address) {
        self.dexes
            .insert(tag.to_string(), VenueEntry { kind, address });
    }

    pub fn remove_dex(&mut self, tag: &str) -> Option<VenueEntry> {
        self.dexes.remove(tag)
    }

    pub fn dex(&self, tag: &str) -> Option<&VenueEntry> {
        self.dexes.get(tag)
    }

    /// Registers a venue contract under its own address, replacing any previous one.
    pub fn register_contract(&mut self, venue: Venue) {
        self.contracts
            .insert(venue.address(), venue);
    }

    pub fn contract(&self, address: &Address) -> Option<&Venue> {
        self.contracts.get(address)
    }

    pub fn constant_product_router(
        &self,
        address: &Address,
    ) -> Option<Arc<dyn ConstantProductRouter>> {
        match self.contracts.get(address)? {
            Venue::ConstantProductRouter(venue) => Some(venue.clone()),
            _ => None,
        }
    }

    pub fn concentrated_liquidity_router(
        &self,
        address: &Address,
    ) -> Option<Arc<dyn ConcentratedLiquidityRouter>> {
        match self.contracts.get(address)? {
            Venue::ConcentratedLiquidityRouter(venue) => Some(venue.clone()),
            _ => None,
        }
    }

    pub fn concentrated_liquidity_pool(
        &self,
        address: &Address,
    ) -> Option<Arc<dyn ConcentratedLiquidityPool>> {
        match self.contracts.get(address)? {
            Venue::ConcentratedLiquidityPool(venue) => Some(venue.clone()),
            _ => None,
        }
    }

    pub fn weighted_pool_vault(&self, address: &Address) -> Option<Arc<dyn WeightedPoolVault>> {
        match self.contracts.get(address)? {
            Venue::WeightedPoolVault(venue) => Some(venue.clone()),
            _ => None,
        }
    }

    pub fn stable_swap_pool(&self, address: &Address) -> Option<Arc<dyn StableSwapPool>> {
        match self.contracts.get(address)? {
            Venue::StableSwapPool(venue) => Some(venue.clone()),
            _ => None,
        }
    }

    pub fn pool_manager(&self, address: &Address) -> Option<Arc<dyn PoolManager>> {
        match self.contracts.get(address)? {
            Venue::PoolManager(venue) => Some(venue.clone()),
            _ => None,
        }
    }
}

/// One step of a route, resolved to concrete amounts.
#[derive(Debug, Clone)]
pub struct Leg<'a> {
    /// Position of the step in the route.
    pub index: usize,
    pub step: &'a SwapStep,
    /// Account executing the leg. Inputs are taken from it and outputs must land on it.
    pub executor: Address,
    pub amount_in: BigUint,
    pub deadline: u64,
}

impl Leg<'_> {
    pub fn token_in(&self) -> &Address {
        self.step.token_in()
    }

    pub fn token_out(&self) -> &Address {
        self.step.token_out()
    }

    pub fn venue_error(&self, source: impl Into<VenueError>) -> ExecutionError {
        ExecutionError::Venue { step: self.index, source: source.into() }
    }

    pub fn pool_mismatch(&self, pool: &Address, reason: impl Into<String>) -> ExecutionError {
        ExecutionError::PoolMismatch { step: self.index, pool: pool.clone(), reason: reason.into() }
    }

    pub fn invalid_aux_data(&self, reason: impl ToString) -> ExecutionError {
        ExecutionError::InvalidAuxData { step: self.index, reason: reason.to_string() }
    }

    fn unsupported(&self, detail: &str) -> ExecutionError {
        ExecutionError::UnsupportedVenue(format!("{}: {detail}", self.step.venue))
    }
}

/// Executes one leg against the venue its tag resolves to and returns the measured output.
pub fn execute_leg(
    ledger: &mut Ledger,
    registry: &VenueRegistry,
    leg: &Leg<'_>,
) -> Result<BigUint, ExecutionError> {
    let entry = registry
        .dex(&leg.step.venue)
        .ok_or_else(|| ExecutionError::UnsupportedVenue(leg.step.venue.clone()))?;
    let before = ledger.balance_of(leg.token_out(), &leg.executor);

    match entry.kind {
        VenueKind::UniswapV2 => {
            let router = registry
                .constant_product_router(&entry.address)
                .ok_or_else(|| leg.unsupported("no constant product router registered"))?;
            uniswap_v2::swap(ledger, leg, router.as_ref())?;
        }
        VenueKind::UniswapV3 => {
            let router = registry
                .concentrated_liquidity_router(&entry.address)
                .ok_or_else(|| leg.unsupported("no concentrated liquidity router registered"))?;
            let pool = registry
                .concentrated_liquidity_pool(&leg.step.pool)
                .ok_or_else(|| leg.unsupported("no concentrated liquidity pool at step pool"))?;
            uniswap_v3::swap(ledger, leg, router.as_ref(), pool.as_ref())?;
        }
        VenueKind::BalancerV2 => {
            let vault = registry
                .weighted_pool_vault(&entry.address)
                .ok_or_else(|| leg.unsupported("no weighted pool vault registered"))?;
            balancer_v2::swap(ledger, leg, vault.as_ref())?;
        }
        VenueKind::Curve => {
            let pool = registry
                .stable_swap_pool(&leg.step.pool)
                .ok_or_else(|| leg.unsupported("no stable swap pool at step pool"))?;
            curve::swap(ledger, leg, pool.as_ref())?;
        }
        VenueKind::UniswapV4 => {
            let manager = registry
                .pool_manager(&entry.address)
                .ok_or_else(|| leg.unsupported("no pool manager registered"))?;
            uniswap_v4::swap(ledger, leg, manager)?;
        }
    }

    let output = balance_increase(&before, &ledger.balance_of(leg.token_out(), &leg.executor));
    debug!(
        step = leg.index,
        venue = %leg.step.venue,
        kind = %entry.kind,
        token_in = %leg.token_in(),
        token_out = %leg.token_out(),
        amount_in = %leg.amount_in,
        amount_out = %output,
        "Executed leg"
    );
    Ok(output)
}

/// Grants `spender` an allowance of exactly `amount`, clearing any previous allowance first.
pub(crate) fn approve_exact(
    ledger: &mut Ledger,
    owner: &Address,
    asset: &Address,
    spender: &Address,
    amount: &BigUint,
) -> Result<(), LedgerError> {
    ledger.approve(asset, owner, spender, &BigUint::zero())?;
    ledger.approve(asset, owner, spender, amount)
}

pub(crate) fn revoke(
    ledger: &mut Ledger,
    owner: &Address,
    asset: &Address,
    spender: &Address,
) -> Result<(), LedgerError> {
    ledger.approve(asset, owner, spender, &BigUint::zero())
}

/// Runs a token-only leg around native assets: a native input is wrapped before `call`, and the
/// wrapped native gained during `call` is unwrapped afterwards when the output is native.
///
/// `call` receives the wrapped forms of the input and output assets.
pub(crate) fn with_wrapped_native<F>(
    ledger: &mut Ledger,
    leg: &Leg<'_>,
    call: F,
) -> Result<(), ExecutionError>
where
    F: FnOnce(&mut Ledger, &Address, &Address) -> Result<(), ExecutionError>,
{
    let wrapped = ledger.wrapped_native().clone();
    let token_in = if is_native(leg.token_in()) {
        ledger.wrap(&leg.executor, &leg.amount_in)?;
        wrapped.clone()
    } else {
        leg.token_in().clone()
    };
    let native_out = is_native(leg.token_out());
    let token_out = if native_out { wrapped.clone() } else { leg.token_out().clone() };

    let before = ledger.balance_of(&wrapped, &leg.executor);
    call(ledger, &token_in, &token_out)?;
    if native_out {
        let gained = balance_increase(&before, &ledger.balance_of(&wrapped, &leg.executor));
        ledger.unwrap(&leg.executor, &gained)?;
    }
    Ok(())
}
