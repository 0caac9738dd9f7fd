//! Concentrated liquidity pools and their single-hop router.
//!
//! Liquidity is modelled as one full-range position, so a pool prices like a constant product
//! pair charging its fee tier.

use std::sync::Arc;

use num_bigint::BigUint;
use router_common::models::Address;

use super::{amount_out, ensure_deadline, pull};
use crate::{
    ledger::Ledger,
    venues::{
        uniswap_v3::{
            ConcentratedLiquidityPool, ConcentratedLiquidityRouter, ExactInputSingleParams,
        },
        VenueError,
    },
};

/// Denominator of fee tiers (hundredths of a basis point).
pub const FEE_DENOMINATOR: u32 = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConcentratedPool {
    address: Address,
    token0: Address,
    token1: Address,
    fee: u32,
}

impl SimConcentratedPool {
    /// Creates a pool for the pair; the tokens are sorted into `token0 < token1`.
    pub fn new(address: Address, token_a: Address, token_b: Address, fee: u32) -> Self {
        let (token0, token1) =
            if token_a < token_b { (token_a, token_b) } else { (token_b, token_a) };
        Self { address, token0, token1, fee }
    }

    fn trades(&self, token_in: &Address, token_out: &Address) -> bool {
        (token_in == &self.token0 && token_out == &self.token1) ||
            (token_in == &self.token1 && token_out == &self.token0)
    }
}

impl ConcentratedLiquidityPool for SimConcentratedPool {
    fn address(&self) -> Address {
        self.address.clone()
    }

    fn fee(&self) -> u32 {
        self.fee
    }

    fn token0(&self) -> Address {
        self.token0.clone()
    }

    fn token1(&self) -> Address {
        self.token1.clone()
    }
}

#[derive(Debug, Clone)]
pub struct SimConcentratedRouter {
    address: Address,
    pools: Vec<Arc<SimConcentratedPool>>,
}

impl SimConcentratedRouter {
    pub fn new(address: Address) -> Self {
        Self { address, pools: Vec::new() }
    }

    pub fn add_pool(&mut self, pool: Arc<SimConcentratedPool>) {
        self.pools.push(pool);
    }

    pub fn with_pool(mut self, pool: Arc<SimConcentratedPool>) -> Self {
        self.add_pool(pool);
        self
    }
}

impl ConcentratedLiquidityRouter for SimConcentratedRouter {
    fn address(&self) -> Address {
        self.address.clone()
    }

    fn exact_input_single(
        &self,
        ledger: &mut Ledger,
        caller: &Address,
        params: &ExactInputSingleParams,
    ) -> Result<BigUint, VenueError> {
        ensure_deadline(ledger, params.deadline)?;
        let pool = self
            .pools
            .iter()
            .find(|pool| {
                pool.fee == params.fee && pool.trades(&params.token_in, &params.token_out)
            })
            .ok_or_else(|| {
                VenueError::UnknownPool(format!(
                    "{}/{} at fee {}",
                    params.token_in, params.token_out, params.fee
                ))
            })?;

        let reserve_in = ledger.balance_of(&params.token_in, &pool.address);
        let received = pull(
            ledger,
            &params.token_in,
            &self.address,
            caller,
            &pool.address,
            &params.amount_in,
        )?;
        let reserve_out = ledger.balance_of(&params.token_out, &pool.address);
        let out = amount_out(&received, &reserve_in, &reserve_out, pool.fee, FEE_DENOMINATOR)?;
        if out < params.amount_out_minimum {
            return Err(VenueError::InsufficientOutput {
                minimum: params.amount_out_minimum.clone(),
                actual: out,
            });
        }
        ledger.transfer(&params.token_out, &pool.address, &params.recipient, &out)?;
        Ok(out)
    }
}
