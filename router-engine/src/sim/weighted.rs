//! Vault of equally weighted pools.

use std::collections::HashMap;

use num_bigint::BigUint;
use router_common::{math::TOTAL_BPS, models::Address};

use super::{amount_out, ensure_deadline, pull};
use crate::{
    ledger::Ledger,
    venues::{
        balancer_v2::{FundManagement, SingleSwap, SwapKind, WeightedPoolVault},
        VenueError,
    },
};

/// A pool registered with the vault. Its balances are held by `account`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedPool {
    pub account: Address,
    pub tokens: Vec<Address>,
    pub swap_fee_bps: u32,
}

#[derive(Debug, Clone)]
pub struct SimWeightedPoolVault {
    address: Address,
    pools: HashMap<[u8; 32], WeightedPool>,
}

impl SimWeightedPoolVault {
    pub fn new(address: Address) -> Self {
        Self { address, pools: HashMap::new() }
    }

    pub fn add_pool(&mut self, pool_id: [u8; 32], pool: WeightedPool) {
        self.pools.insert(pool_id, pool);
    }

    pub fn with_pool(mut self, pool_id: [u8; 32], pool: WeightedPool) -> Self {
        self.add_pool(pool_id, pool);
        self
    }
}

impl WeightedPoolVault for SimWeightedPoolVault {
    fn address(&self) -> Address {
        self.address.clone()
    }

    fn swap(
        &self,
        ledger: &mut Ledger,
        caller: &Address,
        single_swap: &SingleSwap,
        funds: &FundManagement,
        limit: &BigUint,
        deadline: u64,
    ) -> Result<BigUint, VenueError> {
        ensure_deadline(ledger, deadline)?;
        if single_swap.kind != SwapKind::GivenIn {
            return Err(VenueError::Rejected("only given-in swaps are supported".to_string()));
        }
        if funds.from_internal_balance || funds.to_internal_balance {
            return Err(VenueError::Rejected("internal balances are not supported".to_string()));
        }
        if caller != &funds.sender {
            return Err(VenueError::Rejected(format!("{caller} cannot spend for {}", funds.sender)));
        }
        let pool = self
            .pools
            .get(&single_swap.pool_id)
            .ok_or_else(|| VenueError::UnknownPool(hex::encode(single_swap.pool_id)))?;
        let (asset_in, asset_out) = (&single_swap.asset_in, &single_swap.asset_out);
        if !pool.tokens.contains(asset_in) || !pool.tokens.contains(asset_out) {
            return Err(VenueError::Rejected(format!("pool does not trade {asset_in}/{asset_out}")));
        }

        let reserve_in = ledger.balance_of(asset_in, &pool.account);
        let received = pull(
            ledger,
            asset_in,
            &self.address,
            &funds.sender,
            &pool.account,
            &single_swap.amount,
        )?;
        let reserve_out = ledger.balance_of(asset_out, &pool.account);
        let out = amount_out(&received, &reserve_in, &reserve_out, pool.swap_fee_bps, TOTAL_BPS)?;
        if &out < limit {
            return Err(VenueError::InsufficientOutput { minimum: limit.clone(), actual: out });
        }
        ledger.transfer(asset_out, &pool.account, &funds.recipient, &out)?;
        Ok(out)
    }
}
