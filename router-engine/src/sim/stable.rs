//! Index addressed stable swap pool pricing every coin at par.

use num_bigint::BigUint;
use router_common::{
    math::{apply_bps, TOTAL_BPS},
    models::Address,
};

use super::pull;
use crate::{
    ledger::Ledger,
    venues::{curve::StableSwapPool, VenueError},
};

/// Pool holding its coins on its own account. Swaps pay out `dx` less the fee, one for one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimStableSwapPool {
    address: Address,
    coins: Vec<Address>,
    fee_bps: u32,
}

impl SimStableSwapPool {
    pub fn new(address: Address, coins: Vec<Address>, fee_bps: u32) -> Self {
        Self { address, coins, fee_bps }
    }

    fn coin(&self, index: u32) -> Result<&Address, VenueError> {
        self.coins
            .get(index as usize)
            .ok_or_else(|| VenueError::Rejected(format!("no coin at index {index}")))
    }
}

impl StableSwapPool for SimStableSwapPool {
    fn address(&self) -> Address {
        self.address.clone()
    }

    fn coins(&self, i: u32) -> Option<Address> {
        self.coins.get(i as usize).cloned()
    }

    fn exchange(
        &self,
        ledger: &mut Ledger,
        caller: &Address,
        i: u32,
        j: u32,
        dx: &BigUint,
        min_dy: &BigUint,
    ) -> Result<BigUint, VenueError> {
        if i == j {
            return Err(VenueError::Rejected("same coin".to_string()));
        }
        let (coin_in, coin_out) = (self.coin(i)?.clone(), self.coin(j)?.clone());

        let received = pull(ledger, &coin_in, &self.address, caller, &self.address, dx)?;
        let dy = &received - apply_bps(&received, self.fee_bps, TOTAL_BPS);
        if dy > ledger.balance_of(&coin_out, &self.address) {
            return Err(VenueError::InsufficientLiquidity);
        }
        if &dy < min_dy {
            return Err(VenueError::InsufficientOutput { minimum: min_dy.clone(), actual: dy });
        }
        ledger.transfer(&coin_out, &self.address, caller, &dy)?;
        Ok(dy)
    }
}
