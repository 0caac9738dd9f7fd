//! Index based stable swap exchange. The coin indices travel in the step's auxiliary data.

use num_bigint::BigUint;
use router_common::{abi::decode_curve_indices, models::Address};

use super::{approve_exact, revoke, with_wrapped_native, Leg, VenueError};
use crate::{errors::ExecutionError, ledger::Ledger};

pub trait StableSwapPool: Send + Sync {
    fn address(&self) -> Address;

    /// Coin at index `i`, `None` past the last coin.
    fn coins(&self, i: u32) -> Option<Address>;

    /// Swaps `dx` of coin `i` from `caller` into coin `j`, sent back to `caller`.
    fn exchange(
        &self,
        ledger: &mut Ledger,
        caller: &Address,
        i: u32,
        j: u32,
        dx: &BigUint,
        min_dy: &BigUint,
    ) -> Result<BigUint, VenueError>;
}

pub(crate) fn swap(
    ledger: &mut Ledger,
    leg: &Leg<'_>,
    pool: &dyn StableSwapPool,
) -> Result<(), ExecutionError> {
    let (i, j) = decode_curve_indices(&leg.step.aux_data).map_err(|e| leg.invalid_aux_data(e))?;

    with_wrapped_native(ledger, leg, |ledger, token_in, token_out| {
        let (coin_i, coin_j) = (pool.coins(i), pool.coins(j));
        if coin_i.as_ref() != Some(token_in) || coin_j.as_ref() != Some(token_out) {
            return Err(leg.pool_mismatch(
                &leg.step.pool,
                format!("coins({i}) = {coin_i:?}, coins({j}) = {coin_j:?}"),
            ));
        }

        let spender = pool.address();
        approve_exact(ledger, &leg.executor, token_in, &spender, &leg.amount_in)?;
        pool.exchange(ledger, &leg.executor, i, j, &leg.amount_in, &BigUint::default())
            .map_err(|e| leg.venue_error(e))?;
        revoke(ledger, &leg.executor, token_in, &spender)?;
        Ok(())
    })
}
