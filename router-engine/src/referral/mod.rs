//! Public swap entrypoint with referral fees.
//!
//! [`ReferralRouter::execute_swap`] binds the caller to a referrer on first use of a referral
//! code, takes the resolved fee out of the input in kind and hands the rest to the
//! [`RouteExecutor`] with a proportionally rescaled slippage floor.

pub mod fees;
pub mod resolver;

use std::sync::{Arc, Mutex, MutexGuard};

use num_bigint::BigUint;
use num_traits::Zero;
use router_common::{
    math::balance_increase,
    models::{is_native, Address, SwapRoute},
};
use tracing::{info, warn};

use crate::{
    context::CallContext,
    errors::ReferralError,
    executor::{ExecutionReceipt, RouteExecutor},
    guard::ReentrancyGuard,
    ledger::Ledger,
    venues::{approve_exact, revoke},
};
use fees::{EarningsLedger, FeeSplitter};
use resolver::{ReferralPromo, ReferralResolver};

#[derive(Debug, Clone, Default)]
pub struct ReferralStorage {
    pub resolver: ReferralResolver,
    pub earnings: EarningsLedger,
    pub paused: bool,
}

/// Outcome of a swap through the referral router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapReceipt {
    pub referrer: Option<Address>,
    pub fee_bps: u32,
    pub fee_amount: BigUint,
    pub consumed_promo: bool,
    pub execution: ExecutionReceipt,
}

/// Storage writes of one swap.
#[derive(Debug, Default)]
struct SwapEffects {
    /// Referral code the user got bound to, with the candidate rate at bind time.
    binding: Option<(Address, u32)>,
    /// Fee owed to a referrer: `(referrer, asset, amount)`.
    credit: Option<(Address, Address, BigUint)>,
    consumed_promo: bool,
}

#[derive(Debug)]
pub struct ReferralRouter {
    address: Address,
    owner: Address,
    executor: Arc<RouteExecutor>,
    splitter: FeeSplitter,
    storage: Mutex<ReferralStorage>,
    guard: ReentrancyGuard,
}

impl ReferralRouter {
    pub fn new(address: Address, owner: Address, executor: Arc<RouteExecutor>) -> Self {
        Self::with_storage(address, owner, executor, ReferralStorage::default())
    }

    pub fn with_storage(
        address: Address,
        owner: Address,
        executor: Arc<RouteExecutor>,
        storage: ReferralStorage,
    ) -> Self {
        Self {
            address,
            owner,
            executor,
            splitter: FeeSplitter::default(),
            storage: Mutex::new(storage),
            guard: ReentrancyGuard::new(),
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn executor(&self) -> &Arc<RouteExecutor> {
        &self.executor
    }

    fn storage(&self) -> Result<MutexGuard<'_, ReferralStorage>, ReferralError> {
        self.storage
            .lock()
            .map_err(|e| ReferralError::Storage(e.to_string()))
    }

    /// Swaps along an encoded route, paying a referral fee out of the input.
    ///
    /// `referral_code` binds the caller to that referrer if they have no referrer yet. The
    /// attached value must equal the route's input amount for native input and be zero
    /// otherwise. Token input is pulled from the caller, which must have approved this router.
    pub fn execute_swap(
        &self,
        ledger: &mut Ledger,
        call: &CallContext,
        route: &[u8],
        referral_code: Option<&Address>,
    ) -> Result<SwapReceipt, ReferralError> {
        let _entered = self
            .guard
            .enter()
            .ok_or(ReferralError::Reentrant)?;
        let resolver = {
            let storage = self.storage()?;
            if storage.paused {
                return Err(ReferralError::Paused);
            }
            storage.resolver.clone()
        };

        let now = ledger.timestamp();
        let checkpoint = ledger.clone();
        let res = self
            .swap(ledger, resolver, call, route, referral_code)
            .and_then(|(receipt, effects)| {
                self.commit(&call.sender, now, effects)?;
                Ok(receipt)
            });
        match res {
            Ok(receipt) => Ok(receipt),
            Err(err) => {
                warn!(sender = %call.sender, error = %err, "Swap failed");
                *ledger = checkpoint;
                Err(err)
            }
        }
    }

    /// Runs the swap against a working copy of the resolver and returns the storage writes it
    /// makes. Venues may call back into the router meanwhile, so live storage is not held.
    fn swap(
        &self,
        ledger: &mut Ledger,
        mut resolver: ReferralResolver,
        call: &CallContext,
        route: &[u8],
        referral_code: Option<&Address>,
    ) -> Result<(SwapReceipt, SwapEffects), ReferralError> {
        let mut route = SwapRoute::decode(route)?;
        route.validate(ledger.timestamp())?;
        let user = &call.sender;
        let mut effects = SwapEffects::default();

        if let Some(code) = referral_code {
            let candidate_bps = resolver.fee_bps(code);
            if resolver.bind_first(user, code, candidate_bps, ledger.timestamp()) {
                effects.binding = Some((code.clone(), candidate_bps));
            }
        }
        let referral = resolver.compute_referral(user);
        effects.consumed_promo = referral.consumes_promo;

        let amount_in = self.receive_input(ledger, call, &route)?;
        let split =
            self.splitter
                .split(&amount_in, referral.bps, &route.amount_in, &route.amount_out_min)?;
        if let Some(referrer) = &referral.referrer {
            if !split.fee_amount.is_zero() {
                effects.credit =
                    Some((referrer.clone(), route.token_in.clone(), split.fee_amount.clone()));
            }
        }

        route.amount_in = split.swap_amount.clone();
        route.amount_out_min = split.amount_out_min.clone();
        let encoded = route.encode()?;
        let execution = if is_native(&route.token_in) {
            let call = CallContext::new(self.address.clone()).with_value(split.swap_amount.clone());
            self.executor
                .execute_swap(ledger, &call, &encoded)?
        } else {
            let executor = self.executor.address().clone();
            approve_exact(ledger, &self.address, &route.token_in, &executor, &split.swap_amount)?;
            let receipt = self.executor.execute_swap(
                ledger,
                &CallContext::new(self.address.clone()),
                &encoded,
            )?;
            revoke(ledger, &self.address, &route.token_in, &executor)?;
            receipt
        };

        info!(
            %user,
            referrer = ?referral.referrer,
            fee_bps = referral.bps,
            fee = %split.fee_amount,
            amount_out = %execution.amount_out,
            "Executed swap"
        );
        let receipt = SwapReceipt {
            referrer: referral.referrer,
            fee_bps: referral.bps,
            fee_amount: split.fee_amount,
            consumed_promo: referral.consumes_promo,
            execution,
        };
        Ok((receipt, effects))
    }

    /// Applies a successful swap's writes to live storage, leaving everything else as it is now.
    fn commit(&self, user: &Address, now: u64, effects: SwapEffects) -> Result<(), ReferralError> {
        let mut storage = self.storage()?;
        if let Some((code, bps)) = &effects.binding {
            storage
                .resolver
                .bind_first(user, code, *bps, now);
        }
        if let Some((referrer, asset, amount)) = &effects.credit {
            storage
                .earnings
                .credit(referrer, asset, amount);
        }
        storage
            .resolver
            .after_swap(user, effects.consumed_promo);
        Ok(())
    }

    fn receive_input(
        &self,
        ledger: &mut Ledger,
        call: &CallContext,
        route: &SwapRoute,
    ) -> Result<BigUint, ReferralError> {
        if is_native(&route.token_in) {
            if call.value != route.amount_in {
                return Err(ReferralError::NativeValueMismatch {
                    expected: route.amount_in.clone(),
                    actual: call.value.clone(),
                });
            }
            ledger.transfer(&route.token_in, &call.sender, &self.address, &call.value)?;
            return Ok(call.value.clone());
        }

        if !call.value.is_zero() {
            return Err(ReferralError::UnexpectedValue);
        }
        let before = ledger.balance_of(&route.token_in, &self.address);
        ledger.transfer_from(
            &route.token_in,
            &self.address,
            &call.sender,
            &self.address,
            &route.amount_in,
        )?;
        let after = ledger.balance_of(&route.token_in, &self.address);
        let received = balance_increase(&before, &after);
        if received.is_zero() {
            return Err(ReferralError::ZeroTokensReceived);
        }
        Ok(received)
    }

    /// Sets the caller's own referral rate.
    pub fn update_fee_basis_points(&self, caller: &Address, bps: u32) -> Result<(), ReferralError> {
        self.storage()?
            .resolver
            .set_fee_bps(caller, bps)?;
        info!(referrer = %caller, bps, "Updated referral fee");
        Ok(())
    }

    /// Pays out the caller's earnings in every listed asset and returns the amounts paid.
    pub fn withdraw_referral_earnings(
        &self,
        ledger: &mut Ledger,
        caller: &Address,
        assets: &[Address],
    ) -> Result<Vec<(Address, BigUint)>, ReferralError> {
        let _entered = self
            .guard
            .enter()
            .ok_or(ReferralError::Reentrant)?;
        let mut storage = self.storage()?;
        let earnings = storage.earnings.clone();
        let checkpoint = ledger.clone();

        let mut paid = Vec::new();
        for asset in assets {
            let amount = storage.earnings.take(caller, asset);
            if amount.is_zero() {
                continue;
            }
            if let Err(err) = ledger.transfer(asset, &self.address, caller, &amount) {
                storage.earnings = earnings;
                *ledger = checkpoint;
                return Err(err.into());
            }
            info!(referrer = %caller, %asset, %amount, "Withdrew referral earnings");
            paid.push((asset.clone(), amount));
        }
        Ok(paid)
    }

    pub fn referrer_earnings(
        &self,
        referrer: &Address,
        assets: &[Address],
    ) -> Result<Vec<BigUint>, ReferralError> {
        let storage = self.storage()?;
        Ok(assets
            .iter()
            .map(|asset| storage.earnings.balance(referrer, asset))
            .collect())
    }

    pub fn referral_promo(&self, user: &Address) -> Result<Option<ReferralPromo>, ReferralError> {
        Ok(self
            .storage()?
            .resolver
            .promo(user)
            .cloned())
    }

    pub fn referrer_of(&self, user: &Address) -> Result<Option<Address>, ReferralError> {
        Ok(self
            .storage()?
            .resolver
            .referrer_of(user)
            .cloned())
    }

    pub fn fee_basis_points(&self, referrer: &Address) -> Result<u32, ReferralError> {
        Ok(self.storage()?.resolver.fee_bps(referrer))
    }

    pub fn default_referrer(&self) -> Result<Option<(Address, u32)>, ReferralError> {
        Ok(self
            .storage()?
            .resolver
            .default_referrer()
            .cloned())
    }

    pub fn max_promo_bps(&self) -> Result<u32, ReferralError> {
        Ok(self.storage()?.resolver.max_promo_bps())
    }

    fn only_owner(&self, caller: &Address) -> Result<(), ReferralError> {
        if caller != &self.owner {
            return Err(ReferralError::Unauthorized(caller.clone()));
        }
        Ok(())
    }

    pub fn set_default_referrer(
        &self,
        caller: &Address,
        referrer: &Address,
        bps: u32,
    ) -> Result<(), ReferralError> {
        self.only_owner(caller)?;
        self.storage()?
            .resolver
            .set_default_referrer(referrer, bps)?;
        info!(%referrer, bps, "Set default referrer");
        Ok(())
    }

    pub fn clear_default_referrer(&self, caller: &Address) -> Result<(), ReferralError> {
        self.only_owner(caller)?;
        self.storage()?
            .resolver
            .clear_default_referrer();
        info!("Cleared default referrer");
        Ok(())
    }

    pub fn set_max_promo_bps(&self, caller: &Address, bps: u32) -> Result<(), ReferralError> {
        self.only_owner(caller)?;
        self.storage()?
            .resolver
            .set_max_promo_bps(bps)?;
        info!(bps, "Set promotional cap");
        Ok(())
    }

    pub fn import_legacy_bindings(
        &self,
        caller: &Address,
        bindings: &[(Address, Address)],
    ) -> Result<usize, ReferralError> {
        self.only_owner(caller)?;
        let imported = self
            .storage()?
            .resolver
            .import_legacy_bindings(bindings);
        info!(imported, offered = bindings.len(), "Imported legacy bindings");
        Ok(imported)
    }

    pub fn pause(&self, caller: &Address) -> Result<(), ReferralError> {
        self.only_owner(caller)?;
        self.storage()?.paused = true;
        info!("Paused swaps");
        Ok(())
    }

    pub fn unpause(&self, caller: &Address) -> Result<(), ReferralError> {
        self.only_owner(caller)?;
        self.storage()?.paused = false;
        info!("Unpaused swaps");
        Ok(())
    }

    pub fn is_paused(&self) -> Result<bool, ReferralError> {
        Ok(self.storage()?.paused)
    }
}
