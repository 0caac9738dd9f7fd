//! Singleton pool manager with unlock callbacks and per-currency delta accounting.
//!
//! Settled funds are held by the manager itself. A swap moves the input from the manager to the
//! pool's account and the output back, so the manager's balance always backs the open deltas.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Mutex, MutexGuard},
};

use num_bigint::{BigInt, BigUint};
use num_traits::Zero;
use router_common::{
    math::balance_increase,
    models::{is_null, native_asset, null_address, Address},
    Bytes,
};
use tracing::trace;

use super::{amount_out, concentrated::FEE_DENOMINATOR};
use crate::{
    ledger::Ledger,
    venues::{
        uniswap_v4::{to_asset, BalanceDelta, PoolKey, PoolManager, SwapParams, UnlockCallback},
        VenueError,
    },
};

/// Account holding the reserves of the pool identified by `key`.
pub fn pool_account(key: &PoolKey) -> Address {
    let id = key.id();
    Bytes::from(&id[id.len() - 20..])
}

/// State that only lives for the duration of one unlock.
#[derive(Debug, Default)]
struct Transient {
    locker: Option<Address>,
    deltas: BTreeMap<(Address, Address), BigInt>,
    synced: Option<(Address, BigUint)>,
}

impl Transient {
    fn ensure_locker(&self, locker: &Address) -> Result<(), VenueError> {
        match &self.locker {
            Some(current) if current == locker => Ok(()),
            _ => Err(VenueError::Rejected("manager is locked".to_string())),
        }
    }

    fn account(&mut self, locker: &Address, currency: &Address, change: BigInt) {
        *self
            .deltas
            .entry((locker.clone(), currency.clone()))
            .or_default() += change;
    }
}

#[derive(Debug)]
pub struct SimPoolManager {
    address: Address,
    pools: HashMap<Bytes, PoolKey>,
    transient: Mutex<Transient>,
}

impl SimPoolManager {
    pub fn new(address: Address) -> Self {
        Self { address, pools: HashMap::new(), transient: Mutex::new(Transient::default()) }
    }

    /// Initializes a pool. Its reserves are the balances of [`pool_account`].
    pub fn add_pool(&mut self, key: PoolKey) {
        self.pools.insert(key.id(), key);
    }

    pub fn with_pool(mut self, key: PoolKey) -> Self {
        self.add_pool(key);
        self
    }

    fn transient(&self) -> Result<MutexGuard<'_, Transient>, VenueError> {
        self.transient
            .lock()
            .map_err(|e| VenueError::Rejected(e.to_string()))
    }
}

impl PoolManager for SimPoolManager {
    fn address(&self) -> Address {
        self.address.clone()
    }

    fn unlock(
        &self,
        ledger: &mut Ledger,
        locker: &Address,
        callback: &dyn UnlockCallback,
    ) -> Result<(), VenueError> {
        {
            let mut transient = self.transient()?;
            if transient.locker.is_some() {
                return Err(VenueError::Rejected("manager already unlocked".to_string()));
            }
            transient.locker = Some(locker.clone());
        }

        let res = callback.unlock_callback(ledger, &self.address);

        let mut transient = self.transient()?;
        let deltas = std::mem::take(&mut transient.deltas);
        transient.locker = None;
        transient.synced = None;
        res?;
        match deltas
            .into_iter()
            .find(|(_, delta)| !delta.is_zero())
        {
            Some(((_, currency), _)) => Err(VenueError::CurrencyNotSettled(currency)),
            None => Ok(()),
        }
    }

    fn swap(
        &self,
        ledger: &mut Ledger,
        locker: &Address,
        key: &PoolKey,
        params: &SwapParams,
    ) -> Result<BalanceDelta, VenueError> {
        let mut transient = self.transient()?;
        transient.ensure_locker(locker)?;
        let id = key.id();
        let key = self
            .pools
            .get(&id)
            .ok_or_else(|| VenueError::UnknownPool(id.to_string()))?;
        let amount_in = (-&params.amount_specified)
            .to_biguint()
            .filter(|amount| !amount.is_zero())
            .ok_or_else(|| {
                VenueError::Rejected("only exact input swaps are supported".to_string())
            })?;

        let (currency_in, currency_out) = if params.zero_for_one {
            (&key.currency0, &key.currency1)
        } else {
            (&key.currency1, &key.currency0)
        };
        let (asset_in, asset_out) = (to_asset(currency_in), to_asset(currency_out));
        let pool = pool_account(key);
        let reserve_in = ledger.balance_of(&asset_in, &pool);
        let reserve_out = ledger.balance_of(&asset_out, &pool);
        let out = amount_out(&amount_in, &reserve_in, &reserve_out, key.fee, FEE_DENOMINATOR)?;

        ledger.transfer(&asset_in, &self.address, &pool, &amount_in)?;
        ledger.transfer(&asset_out, &pool, &self.address, &out)?;
        transient.account(locker, currency_in, -BigInt::from(amount_in.clone()));
        transient.account(locker, currency_out, BigInt::from(out.clone()));
        trace!(pool = %id, %amount_in, amount_out = %out, "Pool manager swap");

        let (spent, received) = (-BigInt::from(amount_in), BigInt::from(out));
        Ok(if params.zero_for_one {
            BalanceDelta { amount0: spent, amount1: received }
        } else {
            BalanceDelta { amount0: received, amount1: spent }
        })
    }

    fn sync(&self, ledger: &mut Ledger, currency: &Address) -> Result<(), VenueError> {
        let mut transient = self.transient()?;
        transient.synced = if is_null(currency) {
            None
        } else {
            Some((currency.clone(), ledger.balance_of(currency, &self.address)))
        };
        Ok(())
    }

    fn settle(
        &self,
        ledger: &mut Ledger,
        payer: &Address,
        value: &BigUint,
    ) -> Result<BigUint, VenueError> {
        let mut transient = self.transient()?;
        transient.ensure_locker(payer)?;
        match transient.synced.take() {
            Some((currency, synced)) => {
                if !value.is_zero() {
                    return Err(VenueError::Rejected("value sent for a token".to_string()));
                }
                let paid = balance_increase(&synced, &ledger.balance_of(&currency, &self.address));
                transient.account(payer, &currency, BigInt::from(paid.clone()));
                Ok(paid)
            }
            None => {
                ledger.transfer(&native_asset(), payer, &self.address, value)?;
                transient.account(payer, &null_address(), BigInt::from(value.clone()));
                Ok(value.clone())
            }
        }
    }

    fn take(
        &self,
        ledger: &mut Ledger,
        locker: &Address,
        currency: &Address,
        to: &Address,
        amount: &BigUint,
    ) -> Result<(), VenueError> {
        let mut transient = self.transient()?;
        transient.ensure_locker(locker)?;
        ledger.transfer(&to_asset(currency), &self.address, to, amount)?;
        transient.account(locker, currency, -BigInt::from(amount.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{ledger::tests::addr, venues::uniswap_v4::SwapHook};

    fn key(currency0: Address, currency1: Address) -> PoolKey {
        PoolKey { currency0, currency1, fee: 0, tick_spacing: 60, hooks: null_address() }
    }

    struct Noop;

    impl UnlockCallback for Noop {
        fn unlock_callback(&self, _: &mut Ledger, _: &Address) -> Result<(), VenueError> {
            Ok(())
        }
    }

    /// Swaps without settling the input.
    struct Unsettled {
        manager: Arc<SimPoolManager>,
        key: PoolKey,
    }

    impl UnlockCallback for Unsettled {
        fn unlock_callback(&self, ledger: &mut Ledger, _: &Address) -> Result<(), VenueError> {
            let params = SwapParams { zero_for_one: true, amount_specified: BigInt::from(-10) };
            self.manager
                .swap(ledger, &addr(0xe0), &self.key, &params)
                .map(|_| ())
        }
    }

    fn setup(key: &PoolKey) -> (Ledger, Arc<SimPoolManager>) {
        let mut ledger = Ledger::new(addr(0xee));
        let account = pool_account(key);
        ledger.mint(&to_asset(&key.currency0), &account, &BigUint::from(1_000u32));
        ledger.mint(&to_asset(&key.currency1), &account, &BigUint::from(1_000u32));
        ledger.mint(&to_asset(&key.currency0), &addr(0xe0), &BigUint::from(1_000u32));
        (ledger, Arc::new(SimPoolManager::new(addr(0x44)).with_pool(key.clone())))
    }

    #[test]
    fn test_empty_unlock() {
        let (mut ledger, manager) = setup(&key(addr(1), addr(2)));

        manager
            .unlock(&mut ledger, &addr(0xe0), &Noop)
            .unwrap();
    }

    #[test]
    fn test_unsettled_swap_rejected() {
        let key = key(addr(1), addr(2));
        let (mut ledger, manager) = setup(&key);
        ledger.mint(&addr(1), &addr(0x44), &BigUint::from(10u32));
        let callback = Unsettled { manager: manager.clone(), key };

        let res = manager.unlock(&mut ledger, &addr(0xe0), &callback);

        assert!(matches!(res, Err(VenueError::CurrencyNotSettled(_))));
    }

    #[test]
    fn test_swap_hook_native_input() {
        let key = key(null_address(), addr(2));
        let (mut ledger, manager) = setup(&key);
        let hook =
            SwapHook::new(addr(0xe0), manager.clone(), key.clone(), true, BigUint::from(1_000u32));

        manager
            .unlock(&mut ledger, &addr(0xe0), &hook)
            .unwrap();

        // 1000 * 1000 / (1000 + 1000) at zero fee
        assert_eq!(ledger.balance_of(&addr(2), &addr(0xe0)), BigUint::from(500u32));
        assert_eq!(ledger.balance_of(&native_asset(), &addr(0xe0)), BigUint::zero());
        assert_eq!(
            ledger.balance_of(&native_asset(), &pool_account(&key)),
            BigUint::from(2_000u32)
        );
        assert_eq!(ledger.balance_of(&native_asset(), &addr(0x44)), BigUint::zero());
    }

    #[test]
    fn test_swap_hook_token_input() {
        let key = key(addr(1), addr(2));
        let (mut ledger, manager) = setup(&key);
        let hook = SwapHook::new(addr(0xe0), manager.clone(), key, false, BigUint::from(1_000u32));
        ledger.mint(&addr(2), &addr(0xe0), &BigUint::from(1_000u32));

        manager
            .unlock(&mut ledger, &addr(0xe0), &hook)
            .unwrap();

        assert_eq!(ledger.balance_of(&addr(1), &addr(0xe0)), BigUint::from(1_500u32));
        assert_eq!(ledger.balance_of(&addr(2), &addr(0xe0)), BigUint::zero());
    }
}
