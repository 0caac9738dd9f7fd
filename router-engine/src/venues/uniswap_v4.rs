//! Lock/callback venue: a singleton pool manager that only trades inside an unlock.
//!
//! The executor asks the manager to unlock, the manager calls back into a dedicated hook, and the
//! hook settles the input, swaps and takes the output through the manager's delta accounting.
//! Funds never move by a direct transfer to a pool. The native asset is the null currency.

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use ethabi::{Address as H160, Token as AbiToken, Uint};
use num_bigint::{BigInt, BigUint};
use num_traits::Zero;
use router_common::{
    abi::decode_pool_params,
    models::{is_native, is_null, native_asset, null_address, Address, ADDRESS_LENGTH},
    Bytes,
};
use tiny_keccak::{Hasher, Keccak};

use super::{Leg, VenueError};
use crate::{errors::ExecutionError, ledger::Ledger};

/// Identifies a pool of the manager. `currency0` sorts strictly before `currency1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PoolKey {
    pub currency0: Address,
    pub currency1: Address,
    /// Fee in hundredths of a basis point.
    pub fee: u32,
    pub tick_spacing: u32,
    pub hooks: Address,
}

impl PoolKey {
    /// `keccak256(abi.encode(key))`.
    pub fn id(&self) -> Bytes {
        let encoded = ethabi::encode(&[
            abi_address(&self.currency0),
            abi_address(&self.currency1),
            AbiToken::Uint(Uint::from(self.fee)),
            AbiToken::Int(Uint::from(self.tick_spacing)),
            abi_address(&self.hooks),
        ]);
        let mut hasher = Keccak::v256();
        let mut id = [0u8; 32];
        hasher.update(&encoded);
        hasher.finalize(&mut id);
        Bytes::from(id)
    }
}

/// Right-aligned 20 byte form of an address; longer inputs keep their trailing bytes.
fn abi_address(address: &Address) -> AbiToken {
    let padded = address.lpad(ADDRESS_LENGTH, 0);
    AbiToken::Address(H160::from_slice(&padded[padded.len() - ADDRESS_LENGTH..]))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapParams {
    pub zero_for_one: bool,
    /// Negative for exact input, positive for exact output.
    pub amount_specified: BigInt,
}

/// Balance change of the caller in both currencies of a pool. Negative amounts are owed to the
/// manager, positive amounts may be taken.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BalanceDelta {
    pub amount0: BigInt,
    pub amount1: BigInt,
}

/// Callback the manager invokes once per unlock.
pub trait UnlockCallback {
    fn unlock_callback(&self, ledger: &mut Ledger, caller: &Address) -> Result<(), VenueError>;
}

pub trait PoolManager: Send + Sync {
    fn address(&self) -> Address;

    /// Runs `callback` with the manager unlocked for `locker`. Fails unless every currency delta
    /// opened during the callback is back to zero.
    fn unlock(
        &self,
        ledger: &mut Ledger,
        locker: &Address,
        callback: &dyn UnlockCallback,
    ) -> Result<(), VenueError>;

    fn swap(
        &self,
        ledger: &mut Ledger,
        locker: &Address,
        key: &PoolKey,
        params: &SwapParams,
    ) -> Result<BalanceDelta, VenueError>;

    /// Records the manager's current balance of `currency`, so the next `settle` credits what
    /// arrived since.
    fn sync(&self, ledger: &mut Ledger, currency: &Address) -> Result<(), VenueError>;

    /// Credits `payer` with the synced currency paid since the last `sync`, or with `value` of the
    /// native currency when nothing is synced. Returns the credited amount.
    fn settle(
        &self,
        ledger: &mut Ledger,
        payer: &Address,
        value: &BigUint,
    ) -> Result<BigUint, VenueError>;

    /// Sends `amount` of `currency` to `to`, debiting `locker`.
    fn take(
        &self,
        ledger: &mut Ledger,
        locker: &Address,
        currency: &Address,
        to: &Address,
        amount: &BigUint,
    ) -> Result<(), VenueError>;
}

/// Currency of the manager for a ledger asset.
pub fn to_currency(asset: &Address) -> Address {
    if is_native(asset) {
        null_address()
    } else {
        asset.clone()
    }
}

/// Ledger asset of a manager currency.
pub fn to_asset(currency: &Address) -> Address {
    if is_null(currency) {
        native_asset()
    } else {
        currency.clone()
    }
}

/// Executor side of an unlock: settles the leg's input, swaps it and takes the output.
///
/// Accepts exactly one callback, and only from its manager.
pub struct SwapHook {
    executor: Address,
    manager: Arc<dyn PoolManager>,
    key: PoolKey,
    zero_for_one: bool,
    amount_in: BigUint,
    pending: AtomicBool,
}

impl SwapHook {
    pub fn new(
        executor: Address,
        manager: Arc<dyn PoolManager>,
        key: PoolKey,
        zero_for_one: bool,
        amount_in: BigUint,
    ) -> Self {
        Self { executor, manager, key, zero_for_one, amount_in, pending: AtomicBool::new(true) }
    }
}

impl fmt::Debug for SwapHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwapHook")
            .field("executor", &self.executor)
            .field("manager", &self.manager.address())
            .field("key", &self.key)
            .field("zero_for_one", &self.zero_for_one)
            .field("amount_in", &self.amount_in)
            .finish()
    }
}

impl UnlockCallback for SwapHook {
    fn unlock_callback(&self, ledger: &mut Ledger, caller: &Address) -> Result<(), VenueError> {
        let manager = self.manager.address();
        if caller != &manager || !self.pending.swap(false, Ordering::AcqRel) {
            return Err(VenueError::UnexpectedCallback(caller.clone()));
        }
        let (currency_in, currency_out) = if self.zero_for_one {
            (&self.key.currency0, &self.key.currency1)
        } else {
            (&self.key.currency1, &self.key.currency0)
        };

        let credited = if is_null(currency_in) {
            self.manager
                .settle(ledger, &self.executor, &self.amount_in)?
        } else {
            self.manager.sync(ledger, currency_in)?;
            ledger.transfer(currency_in, &self.executor, &manager, &self.amount_in)?;
            self.manager
                .settle(ledger, &self.executor, &BigUint::zero())?
        };

        let params = SwapParams {
            zero_for_one: self.zero_for_one,
            amount_specified: -BigInt::from(credited),
        };
        let delta = self
            .manager
            .swap(ledger, &self.executor, &self.key, &params)?;
        let output = if self.zero_for_one { delta.amount1 } else { delta.amount0 };
        let output = output
            .to_biguint()
            .filter(|amount| !amount.is_zero())
            .ok_or(VenueError::InsufficientLiquidity)?;

        self.manager
            .take(ledger, &self.executor, currency_out, &self.executor, &output)
    }
}

pub(crate) fn swap(
    ledger: &mut Ledger,
    leg: &Leg<'_>,
    manager: Arc<dyn PoolManager>,
) -> Result<(), ExecutionError> {
    let params = decode_pool_params(&leg.step.aux_data).map_err(|e| leg.invalid_aux_data(e))?;
    let currency_in = to_currency(leg.token_in());
    let currency_out = to_currency(leg.token_out());
    let zero_for_one = currency_in < currency_out;
    let (currency0, currency1) = if zero_for_one {
        (currency_in, currency_out)
    } else {
        (currency_out, currency_in)
    };
    let key = PoolKey {
        currency0,
        currency1,
        fee: params.fee,
        tick_spacing: params.tick_spacing,
        hooks: params.hooks,
    };

    let hook = SwapHook::new(
        leg.executor.clone(),
        manager.clone(),
        key,
        zero_for_one,
        leg.amount_in.clone(),
    );
    manager
        .unlock(ledger, &leg.executor, &hook)
        .map_err(|e| leg.venue_error(e))
}
