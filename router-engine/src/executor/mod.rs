//! Route execution engine.
//!
//! [`RouteExecutor::execute_swap`] runs a whole route as one atomic unit: it validates the route,
//! pulls the input, walks the steps in list order over the bucket arena, enforces the slippage
//! floor, delivers the output and sweeps every other tracked asset that grew during the call to the
//! destination. Any failure restores the ledger to its state on entry.

pub mod groups;

use std::sync::{Mutex, MutexGuard};

use num_bigint::BigUint;
use num_traits::Zero;
use router_common::{
    math::balance_increase,
    models::{is_native, native_asset, Address, SwapRoute, VenueKind},
};
use tracing::{debug, info, warn};

use crate::{
    context::CallContext,
    errors::ExecutionError,
    guard::ReentrancyGuard,
    ledger::{BalanceSnapshot, Ledger},
    venues::{execute_leg, Leg, Venue, VenueEntry, VenueRegistry},
};
use groups::GroupOutputs;

/// Configuration the executor owner controls.
#[derive(Debug, Clone, Default)]
pub struct ExecutorStorage {
    /// The only account allowed to call `execute_swap`.
    pub referral_layer: Option<Address>,
    pub registry: VenueRegistry,
    pub paused: bool,
}

/// Outcome of a successful route execution.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionReceipt {
    /// Input amount actually received and split across the route.
    pub amount_in: BigUint,
    /// Output delivered to the destination.
    pub amount_out: BigUint,
    /// Leftover balances of intermediate assets forwarded to the destination.
    pub swept: Vec<(Address, BigUint)>,
    /// Unused input forwarded to the destination.
    pub refunded_input: BigUint,
}

#[derive(Debug)]
pub struct RouteExecutor {
    address: Address,
    owner: Address,
    storage: Mutex<ExecutorStorage>,
    guard: ReentrancyGuard,
}

impl RouteExecutor {
    pub fn new(address: Address, owner: Address) -> Self {
        Self {
            address,
            owner,
            storage: Mutex::new(ExecutorStorage::default()),
            guard: ReentrancyGuard::new(),
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    fn storage(&self) -> Result<MutexGuard<'_, ExecutorStorage>, ExecutionError> {
        self.storage
            .lock()
            .map_err(|e| ExecutionError::Storage(e.to_string()))
    }

    /// Executes an encoded route on behalf of the registered referral layer.
    ///
    /// The attached value must equal the route's input amount for native input and be zero
    /// otherwise. Token input is pulled from the caller, which must have approved the executor.
    pub fn execute_swap(
        &self,
        ledger: &mut Ledger,
        call: &CallContext,
        route: &[u8],
    ) -> Result<ExecutionReceipt, ExecutionError> {
        let _entered = self
            .guard
            .enter()
            .ok_or(ExecutionError::Reentrant)?;
        let storage = self.storage()?.clone();
        if storage.paused {
            return Err(ExecutionError::Paused);
        }
        if storage.referral_layer.as_ref() != Some(&call.sender) {
            warn!(sender = %call.sender, "Rejected route from unauthorized caller");
            return Err(ExecutionError::Unauthorized(call.sender.clone()));
        }

        let checkpoint = ledger.clone();
        let res = self.execute(ledger, call, &storage.registry, route);
        if let Err(err) = &res {
            warn!(error = %err, "Route execution failed");
            *ledger = checkpoint;
        }
        res
    }

    fn execute(
        &self,
        ledger: &mut Ledger,
        call: &CallContext,
        registry: &VenueRegistry,
        route: &[u8],
    ) -> Result<ExecutionReceipt, ExecutionError> {
        let route = SwapRoute::decode(route)?;
        route.validate(ledger.timestamp())?;

        let wrapped = ledger.wrapped_native().clone();
        let native_in = is_native(&route.token_in);
        let mut tracked = route.referenced_assets();
        if native_in && !tracked.contains(&wrapped) {
            tracked.push(wrapped.clone());
        }
        let snapshot = BalanceSnapshot::take(ledger, &self.address, &tracked);

        let amount_in = self.receive_input(ledger, call, &route)?;
        let mut groups = GroupOutputs::seed(route.group_count, &route.parent_groups, &amount_in);
        let mut amount_out = BigUint::zero();
        for (index, step) in route.steps.iter().enumerate() {
            let step_amount = groups.draw(step);
            if step_amount.is_zero() {
                return Err(ExecutionError::InvalidSubStepAmount { step: index });
            }
            let leg = Leg {
                index,
                step,
                executor: self.address.clone(),
                amount_in: step_amount,
                deadline: route.deadline,
            };
            let output = execute_leg(ledger, registry, &leg)?;
            groups.credit(step.group_id, &output);
            if step.token_out() == &route.token_out {
                amount_out += &output;
            }
        }

        if amount_out < route.amount_out_min {
            return Err(ExecutionError::InsufficientOutput {
                expected: route.amount_out_min.clone(),
                actual: amount_out,
            });
        }
        self.deliver(ledger, &route, &amount_out)?;

        // Native input may come back as either form of the native asset.
        let wrapped_is_input = native_in && route.token_out != wrapped;
        let mut exclude = vec![&route.token_out, &route.token_in];
        if wrapped_is_input {
            exclude.push(&wrapped);
        }
        let swept = snapshot.surplus(ledger, &exclude);
        for (asset, amount) in &swept {
            debug!(%asset, %amount, "Sweeping leftover balance");
            ledger.transfer(asset, &self.address, &route.destination, amount)?;
        }
        let refunded_input = self.refund_input(ledger, &route, &snapshot, wrapped_is_input)?;

        info!(
            token_in = %route.token_in,
            token_out = %route.token_out,
            destination = %route.destination,
            %amount_in,
            %amount_out,
            swept = swept.len(),
            %refunded_input,
            "Executed route"
        );
        Ok(ExecutionReceipt { amount_in, amount_out, swept, refunded_input })
    }

    /// Takes the route's input from the caller and returns the amount actually received.
    fn receive_input(
        &self,
        ledger: &mut Ledger,
        call: &CallContext,
        route: &SwapRoute,
    ) -> Result<BigUint, ExecutionError> {
        if is_native(&route.token_in) {
            if call.value != route.amount_in {
                return Err(ExecutionError::NativeValueMismatch {
                    expected: route.amount_in.clone(),
                    actual: call.value.clone(),
                });
            }
            ledger.transfer(&route.token_in, &call.sender, &self.address, &call.value)?;
            return Ok(call.value.clone());
        }

        if !call.value.is_zero() {
            return Err(ExecutionError::UnexpectedValue);
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
            return Err(ExecutionError::ZeroTokensReceived);
        }
        Ok(received)
    }

    fn deliver(
        &self,
        ledger: &mut Ledger,
        route: &SwapRoute,
        amount: &BigUint,
    ) -> Result<(), ExecutionError> {
        if route.unwrap_native && &route.token_out == ledger.wrapped_native() {
            ledger.unwrap(&self.address, amount)?;
            ledger.transfer(&native_asset(), &self.address, &route.destination, amount)?;
        } else {
            ledger.transfer(&route.token_out, &self.address, &route.destination, amount)?;
        }
        Ok(())
    }

    /// Forwards unused input to the destination. Leftover wrapped native of a native input route
    /// is unwrapped and sent along with the native leftover.
    ///
    /// Runs after delivery, so for a circular route the delivered output is already gone and the
    /// remaining growth of the input asset is exactly the unused input.
    fn refund_input(
        &self,
        ledger: &mut Ledger,
        route: &SwapRoute,
        snapshot: &BalanceSnapshot,
        wrapped_is_input: bool,
    ) -> Result<BigUint, ExecutionError> {
        let mut leftover = snapshot.increase(ledger, &route.token_in);
        if wrapped_is_input {
            let wrapped = ledger.wrapped_native().clone();
            let wrapped_leftover = snapshot.increase(ledger, &wrapped);
            if !wrapped_leftover.is_zero() {
                ledger.unwrap(&self.address, &wrapped_leftover)?;
                leftover += wrapped_leftover;
            }
        }
        if !leftover.is_zero() {
            ledger.transfer(&route.token_in, &self.address, &route.destination, &leftover)?;
        }
        Ok(leftover)
    }

    fn only_owner(&self, caller: &Address) -> Result<(), ExecutionError> {
        if caller != &self.owner {
            return Err(ExecutionError::Unauthorized(caller.clone()));
        }
        Ok(())
    }

    pub fn set_referral_layer(
        &self,
        caller: &Address,
        referral_layer: Address,
    ) -> Result<(), ExecutionError> {
        self.only_owner(caller)?;
        info!(%referral_layer, "Set referral layer");
        self.storage()?.referral_layer = Some(referral_layer);
        Ok(())
    }

    pub fn referral_layer(&self) -> Result<Option<Address>, ExecutionError> {
        Ok(self.storage()?.referral_layer.clone())
    }

    /// Maps a venue tag to a calling convention and the router, vault or manager it targets.
    pub fn register_venue(
        &self,
        caller: &Address,
        tag: &str,
        kind: VenueKind,
        address: Address,
    ) -> Result<(), ExecutionError> {
        self.only_owner(caller)?;
        info!(tag, %kind, %address, "Registered venue");
        self.storage()?
            .registry
            .register_dex(tag, kind, address);
        Ok(())
    }

    pub fn remove_venue(
        &self,
        caller: &Address,
        tag: &str,
    ) -> Result<Option<VenueEntry>, ExecutionError> {
        self.only_owner(caller)?;
        info!(tag, "Removed venue");
        Ok(self.storage()?.registry.remove_dex(tag))
    }

    pub fn venue(&self, tag: &str) -> Result<Option<VenueEntry>, ExecutionError> {
        Ok(self
            .storage()?
            .registry
            .dex(tag)
            .cloned())
    }

    /// Makes an external venue contract callable by the executor.
    pub fn register_contract(&self, caller: &Address, venue: Venue) -> Result<(), ExecutionError> {
        self.only_owner(caller)?;
        info!(?venue, "Registered venue contract");
        self.storage()?
            .registry
            .register_contract(venue);
        Ok(())
    }

    pub fn pause(&self, caller: &Address) -> Result<(), ExecutionError> {
        self.only_owner(caller)?;
        info!("Paused route execution");
        self.storage()?.paused = true;
        Ok(())
    }

    pub fn unpause(&self, caller: &Address) -> Result<(), ExecutionError> {
        self.only_owner(caller)?;
        info!("Unpaused route execution");
        self.storage()?.paused = false;
        Ok(())
    }

    pub fn is_paused(&self) -> Result<bool, ExecutionError> {
        Ok(self.storage()?.paused)
    }
}
