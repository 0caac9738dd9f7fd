//! Concentrated liquidity single-hop exact input swaps.
//!
//! The fee tier is read from the pool the step names, so a route cannot declare a fee tier that
//! routes the swap to a different pool than the one it was built against.

use num_bigint::BigUint;
use router_common::models::Address;

use super::{approve_exact, revoke, with_wrapped_native, Leg, VenueError};
use crate::{errors::ExecutionError, ledger::Ledger};

#[cfg_attr(test, mockall::automock)]
pub trait ConcentratedLiquidityPool: Send + Sync {
    fn address(&self) -> Address;
    /// Fee tier in hundredths of a basis point.
    fn fee(&self) -> u32;
    fn token0(&self) -> Address;
    fn token1(&self) -> Address;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExactInputSingleParams {
    pub token_in: Address,
    pub token_out: Address,
    pub fee: u32,
    pub recipient: Address,
    pub deadline: u64,
    pub amount_in: BigUint,
    pub amount_out_minimum: BigUint,
}

#[cfg_attr(test, mockall::automock)]
pub trait ConcentratedLiquidityRouter: Send + Sync {
    fn address(&self) -> Address;

    /// Swaps `params.amount_in` of `caller`'s tokens through the pool of the pair and fee tier.
    fn exact_input_single(
        &self,
        ledger: &mut Ledger,
        caller: &Address,
        params: &ExactInputSingleParams,
    ) -> Result<BigUint, VenueError>;
}

pub(crate) fn swap(
    ledger: &mut Ledger,
    leg: &Leg<'_>,
    router: &dyn ConcentratedLiquidityRouter,
    pool: &dyn ConcentratedLiquidityPool,
) -> Result<(), ExecutionError> {
    with_wrapped_native(ledger, leg, |ledger, token_in, token_out| {
        let (token0, token1) = (pool.token0(), pool.token1());
        let matches = (&token0 == token_in && &token1 == token_out) ||
            (&token1 == token_in && &token0 == token_out);
        if !matches {
            return Err(leg.pool_mismatch(
                &leg.step.pool,
                format!("pool trades {token0}/{token1}, path is {token_in}/{token_out}"),
            ));
        }

        let spender = router.address();
        approve_exact(ledger, &leg.executor, token_in, &spender, &leg.amount_in)?;
        let params = ExactInputSingleParams {
            token_in: token_in.clone(),
            token_out: token_out.clone(),
            fee: pool.fee(),
            recipient: leg.executor.clone(),
            deadline: leg.deadline,
            amount_in: leg.amount_in.clone(),
            amount_out_minimum: BigUint::default(),
        };
        router
            .exact_input_single(ledger, &leg.executor, &params)
            .map_err(|e| leg.venue_error(e))?;
        revoke(ledger, &leg.executor, token_in, &spender)?;
        Ok(())
    })
}
