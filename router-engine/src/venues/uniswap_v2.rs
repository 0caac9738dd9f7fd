//! Constant product two-sided exchange, called through its router.

use num_bigint::BigUint;
use num_traits::Zero;
use router_common::models::{is_native, is_null, Address};

use super::{approve_exact, revoke, Leg, VenueError};
use crate::{context::CallContext, errors::ExecutionError, ledger::Ledger};

/// Router of a constant product exchange. Paths are expressed in wrapped native terms.
#[cfg_attr(test, mockall::automock)]
pub trait ConstantProductRouter: Send + Sync {
    fn address(&self) -> Address;

    /// Pair contract holding the reserves of `token_a` and `token_b`, if one exists.
    fn pair_for(&self, token_a: &Address, token_b: &Address) -> Option<Address>;

    /// Swaps the native value attached to `call` along `path`, which must start with the wrapped
    /// native token. Returns the amounts of every hop.
    fn swap_exact_eth_for_tokens(
        &self,
        ledger: &mut Ledger,
        call: &CallContext,
        amount_out_min: &BigUint,
        path: &[Address],
        to: &Address,
        deadline: u64,
    ) -> Result<Vec<BigUint>, VenueError>;

    /// Swaps `amount_in` of the first path asset and pays out the native asset. The path must end
    /// with the wrapped native token.
    #[allow(clippy::too_many_arguments)]
    fn swap_exact_tokens_for_eth(
        &self,
        ledger: &mut Ledger,
        caller: &Address,
        amount_in: &BigUint,
        amount_out_min: &BigUint,
        path: &[Address],
        to: &Address,
        deadline: u64,
    ) -> Result<Vec<BigUint>, VenueError>;

    #[allow(clippy::too_many_arguments)]
    fn swap_exact_tokens_for_tokens(
        &self,
        ledger: &mut Ledger,
        caller: &Address,
        amount_in: &BigUint,
        amount_out_min: &BigUint,
        path: &[Address],
        to: &Address,
        deadline: u64,
    ) -> Result<Vec<BigUint>, VenueError>;
}

pub(crate) fn swap(
    ledger: &mut Ledger,
    leg: &Leg<'_>,
    router: &dyn ConstantProductRouter,
) -> Result<(), ExecutionError> {
    let wrapped = ledger.wrapped_native().clone();
    let native_in = is_native(leg.token_in());
    let native_out = is_native(leg.token_out());
    let path = [
        if native_in { wrapped.clone() } else { leg.token_in().clone() },
        if native_out { wrapped } else { leg.token_out().clone() },
    ];

    if !is_null(&leg.step.pool) {
        match router.pair_for(&path[0], &path[1]) {
            Some(pair) if pair == leg.step.pool => {}
            Some(pair) => {
                return Err(leg.pool_mismatch(&leg.step.pool, format!("router pair is {pair}")))
            }
            None => {
                return Err(leg.pool_mismatch(&leg.step.pool, "router has no pair for the path"))
            }
        }
    }

    let min_out = BigUint::zero();
    if native_in {
        let call = CallContext::new(leg.executor.clone()).with_value(leg.amount_in.clone());
        router
            .swap_exact_eth_for_tokens(ledger, &call, &min_out, &path, &leg.executor, leg.deadline)
            .map_err(|e| leg.venue_error(e))?;
        return Ok(());
    }

    let spender = router.address();
    approve_exact(ledger, &leg.executor, leg.token_in(), &spender, &leg.amount_in)?;
    if native_out {
        router.swap_exact_tokens_for_eth(
            ledger,
            &leg.executor,
            &leg.amount_in,
            &min_out,
            &path,
            &leg.executor,
            leg.deadline,
        )
    } else {
        router.swap_exact_tokens_for_tokens(
            ledger,
            &leg.executor,
            &leg.amount_in,
            &min_out,
            &path,
            &leg.executor,
            leg.deadline,
        )
    }
    .map_err(|e| leg.venue_error(e))?;
    revoke(ledger, &leg.executor, leg.token_in(), &spender)?;
    Ok(())
}
