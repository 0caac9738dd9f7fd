use std::collections::HashMap;

use num_bigint::BigUint;
use num_traits::Zero;
use router_common::{math::balance_increase, models::Address};

use super::Ledger;

/// Balances of one account across a fixed set of assets, captured at one point in time.
///
/// Used to measure what an account gained since the snapshot, independent of what any
/// counterparty claims to have sent.
#[derive(Debug, Clone, Default)]
pub struct BalanceSnapshot {
    owner: Address,
    /// Assets in the order they were captured.
    assets: Vec<Address>,
    balances: HashMap<Address, BigUint>,
}

impl BalanceSnapshot {
    /// Captures `owner`'s balance of every asset in `assets`. Duplicates are captured once.
    pub fn take(ledger: &Ledger, owner: &Address, assets: &[Address]) -> Self {
        let mut snapshot = Self { owner: owner.clone(), ..Default::default() };
        for asset in assets {
            if snapshot.balances.contains_key(asset) {
                continue;
            }
            snapshot
                .balances
                .insert(asset.clone(), ledger.balance_of(asset, owner));
            snapshot.assets.push(asset.clone());
        }
        snapshot
    }

    pub fn assets(&self) -> &[Address] {
        &self.assets
    }

    pub fn balance(&self, asset: &Address) -> Option<&BigUint> {
        self.balances.get(asset)
    }

    /// Growth of `asset` since the snapshot. Zero for untracked assets and shrunk balances.
    pub fn increase(&self, ledger: &Ledger, asset: &Address) -> BigUint {
        match self.balances.get(asset) {
            Some(previous) => balance_increase(previous, &ledger.balance_of(asset, &self.owner)),
            None => BigUint::zero(),
        }
    }

    /// Every tracked asset, except those in `exclude`, whose balance grew since the snapshot,
    /// paired with its growth.
    pub fn surplus(&self, ledger: &Ledger, exclude: &[&Address]) -> Vec<(Address, BigUint)> {
        self.assets
            .iter()
            .filter(|asset| !exclude.contains(asset))
            .map(|asset| (asset.clone(), self.increase(ledger, asset)))
            .filter(|(_, increase)| !increase.is_zero())
            .collect()
    }
}
