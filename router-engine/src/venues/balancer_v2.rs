//! Weighted pool vault single swaps.

use num_bigint::BigUint;
use router_common::{abi::decode_pool_id, models::Address, Bytes};

use super::{approve_exact, revoke, with_wrapped_native, Leg, VenueError};
use crate::{errors::ExecutionError, ledger::Ledger};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapKind {
    GivenIn,
    GivenOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleSwap {
    pub pool_id: [u8; 32],
    pub kind: SwapKind,
    pub asset_in: Address,
    pub asset_out: Address,
    pub amount: BigUint,
    pub user_data: Bytes,
}

/// Where the vault takes the input from and where it sends the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundManagement {
    pub sender: Address,
    pub from_internal_balance: bool,
    pub recipient: Address,
    pub to_internal_balance: bool,
}

pub trait WeightedPoolVault: Send + Sync {
    fn address(&self) -> Address;

    /// Executes `single_swap` and returns the amount calculated by the pool.
    fn swap(
        &self,
        ledger: &mut Ledger,
        caller: &Address,
        single_swap: &SingleSwap,
        funds: &FundManagement,
        limit: &BigUint,
        deadline: u64,
    ) -> Result<BigUint, VenueError>;
}

pub(crate) fn swap(
    ledger: &mut Ledger,
    leg: &Leg<'_>,
    vault: &dyn WeightedPoolVault,
) -> Result<(), ExecutionError> {
    let pool_id = decode_pool_id(&leg.step.aux_data).map_err(|e| leg.invalid_aux_data(e))?;

    with_wrapped_native(ledger, leg, |ledger, token_in, token_out| {
        let spender = vault.address();
        approve_exact(ledger, &leg.executor, token_in, &spender, &leg.amount_in)?;
        let single_swap = SingleSwap {
            pool_id,
            kind: SwapKind::GivenIn,
            asset_in: token_in.clone(),
            asset_out: token_out.clone(),
            amount: leg.amount_in.clone(),
            user_data: Bytes::new(),
        };
        let funds = FundManagement {
            sender: leg.executor.clone(),
            from_internal_balance: false,
            recipient: leg.executor.clone(),
            to_internal_balance: false,
        };
        vault
            .swap(ledger, &leg.executor, &single_swap, &funds, &BigUint::default(), leg.deadline)
            .map_err(|e| leg.venue_error(e))?;
        revoke(ledger, &leg.executor, token_in, &spender)?;
        Ok(())
    })
}
