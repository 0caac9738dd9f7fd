mod common;

use std::sync::{Arc, Mutex};

use common::*;
use num_bigint::BigUint;
use num_traits::Zero;
use pretty_assertions::assert_eq;
use router_common::models::{native_asset, null_address, Address, VenueKind};
use router_engine::{
    config::ReferralConfig,
    context::CallContext,
    errors::{ExecutionError, ReferralError},
    executor::RouteExecutor,
    ledger::Ledger,
    referral::ReferralRouter,
    venues::{uniswap_v2::ConstantProductRouter, Venue, VenueError},
};

fn default_referrer() -> Address {
    addr(0xd0)
}

#[test_log::test]
fn test_promotional_rate_decays_to_tail() {
    let mut world = World::new();
    world
        .router
        .update_fee_basis_points(&referrer(), 250)
        .unwrap();
    world.fund(&user(), &token_a(), 40_000);
    let route = direct_route(&token_a(), &token_b(), 10_000, 1);

    let mut fees = Vec::new();
    for _ in 0..4 {
        let receipt = world
            .swap(&route, Some(&referrer()))
            .unwrap();
        assert_eq!(receipt.referrer, Some(referrer()));
        fees.push((receipt.fee_bps, receipt.fee_amount, receipt.consumed_promo));
    }

    assert_eq!(
        fees,
        vec![
            (250, amount(250), true),
            (250, amount(250), true),
            (250, amount(250), true),
            (50, amount(50), false),
        ]
    );
    let promo = world
        .router
        .referral_promo(&user())
        .unwrap()
        .unwrap();
    assert_eq!(promo.first_referrer, referrer());
    assert_eq!(promo.bound_at, NOW);
    assert_eq!(promo.promo_bps, 250);
    assert_eq!(promo.promo_remaining, 0);
    assert_eq!(
        world
            .router
            .referrer_earnings(&referrer(), &[token_a()])
            .unwrap(),
        vec![amount(800)]
    );
    assert_eq!(world.balance(&token_a(), &router_address()), amount(800));
    assert_eq!(world.balance(&token_b(), &user()), amount(19_254 + 18_886 + 18_529 + 18_551));
}

#[test_log::test]
fn test_withdraw_earnings() {
    let mut world = World::new();
    world.fund(&user(), &token_a(), 10_000);
    world
        .swap(&direct_route(&token_a(), &token_b(), 10_000, 1), Some(&referrer()))
        .unwrap();

    let paid = world
        .router
        .withdraw_referral_earnings(&mut world.ledger, &referrer(), &[token_a(), token_b()])
        .unwrap();

    assert_eq!(paid, vec![(token_a(), amount(50))]);
    assert_eq!(world.balance(&token_a(), &referrer()), amount(50));
    assert_eq!(world.balance(&token_a(), &router_address()), BigUint::zero());
    assert_eq!(
        world
            .router
            .referrer_earnings(&referrer(), &[token_a()])
            .unwrap(),
        vec![BigUint::zero()]
    );
    let again = world
        .router
        .withdraw_referral_earnings(&mut world.ledger, &referrer(), &[token_a()])
        .unwrap();
    assert!(again.is_empty());
}

#[test_log::test]
fn test_native_fee_is_held_in_kind() {
    let mut world = World::new();
    world.fund(&user(), &native_asset(), 10_000);
    let route = direct_route(&native_asset(), &token_b(), 10_000, 9_000);

    let receipt = world
        .swap(&route, Some(&referrer()))
        .unwrap();

    assert_eq!(receipt.fee_amount, amount(50));
    assert_eq!(receipt.execution.amount_in, amount(9_950));
    assert_eq!(receipt.execution.amount_out, amount(9_822));
    assert_eq!(world.balance(&native_asset(), &router_address()), amount(50));

    world
        .router
        .withdraw_referral_earnings(&mut world.ledger, &referrer(), &[native_asset()])
        .unwrap();
    assert_eq!(world.balance(&native_asset(), &referrer()), amount(50));
}

#[test_log::test]
fn test_promotional_cap_bounds_custom_rate() {
    let mut world = World::new();
    world
        .router
        .update_fee_basis_points(&referrer(), 300)
        .unwrap();
    world
        .router
        .set_max_promo_bps(&owner(), 100)
        .unwrap();
    world.fund(&user(), &token_a(), 10_000);

    let receipt = world
        .swap(&direct_route(&token_a(), &token_b(), 10_000, 1), Some(&referrer()))
        .unwrap();

    assert_eq!(receipt.fee_bps, 100);
    assert_eq!(receipt.fee_amount, amount(100));
}

#[test_log::test]
fn test_fee_update_out_of_range() {
    let world = World::new();

    let res = world
        .router
        .update_fee_basis_points(&referrer(), 301);

    assert_eq!(res, Err(ReferralError::FeeOutOfRange { bps: 301, min: 10, max: 300 }));
    assert_eq!(world.router.fee_basis_points(&referrer()).unwrap(), 50);
}

#[test_log::test]
fn test_self_referral_pays_no_fee() {
    let mut world = World::new();
    world.fund(&referrer(), &token_a(), 10_000);
    let mut route = direct_route(&token_a(), &token_b(), 10_000, 1);
    route.destination = referrer();

    let receipt = world
        .swap_as(&referrer(), &route, Some(&referrer()))
        .unwrap();

    assert_eq!(receipt.referrer, None);
    assert_eq!(receipt.fee_amount, BigUint::zero());
    assert_eq!(receipt.execution.amount_out, amount(19_743));
    assert_eq!(world.router.referrer_of(&referrer()).unwrap(), None);
}

#[test_log::test]
fn test_default_referrer_never_binds() {
    let mut config = config();
    config.referral = ReferralConfig {
        default_referrer: Some(default_referrer()),
        default_referrer_bps: 30,
        ..ReferralConfig::default()
    };
    let mut world = World::with_config(config);
    world.fund(&user(), &token_a(), 30_000);
    let route = direct_route(&token_a(), &token_b(), 10_000, 1);

    for _ in 0..2 {
        let receipt = world.swap(&route, None).unwrap();
        assert_eq!(receipt.referrer, Some(default_referrer()));
        assert_eq!(receipt.fee_amount, amount(30));
        assert!(!receipt.consumed_promo);
    }
    assert_eq!(world.router.referrer_of(&user()).unwrap(), None);

    let receipt = world
        .swap(&route, Some(&referrer()))
        .unwrap();

    assert_eq!(receipt.referrer, Some(referrer()));
    assert_eq!(receipt.fee_amount, amount(50));
    assert_eq!(
        world
            .router
            .referrer_earnings(&default_referrer(), &[token_a()])
            .unwrap(),
        vec![amount(60)]
    );
}

#[test_log::test]
fn test_legacy_binding_charges_tail_rate() {
    let mut world = World::new();
    world
        .router
        .update_fee_basis_points(&referrer(), 200)
        .unwrap();
    let bindings = [
        (user(), referrer()),
        (referrer(), referrer()),
        (addr(0x12), null_address()),
    ];
    assert_eq!(
        world
            .router
            .import_legacy_bindings(&user(), &bindings),
        Err(ReferralError::Unauthorized(user()))
    );
    let imported = world
        .router
        .import_legacy_bindings(&owner(), &bindings)
        .unwrap();
    assert_eq!(imported, 1);
    world.fund(&user(), &token_a(), 10_000);

    let receipt = world
        .swap(&direct_route(&token_a(), &token_b(), 10_000, 1), Some(&addr(0x33)))
        .unwrap();

    assert_eq!(receipt.referrer, Some(referrer()));
    assert_eq!(receipt.fee_bps, 50);
    assert!(!receipt.consumed_promo);
    assert_eq!(world.router.referral_promo(&user()).unwrap(), None);
    assert_eq!(world.router.referrer_of(&user()).unwrap(), Some(referrer()));
}

enum Target {
    Router(Arc<ReferralRouter>),
    Executor(Arc<RouteExecutor>),
}

/// Router that calls back into the swap pipeline while a leg is running.
struct ReentrantRouter {
    address: Address,
    target: Mutex<Option<Target>>,
    observed: Mutex<Option<ReferralError>>,
}

impl ReentrantRouter {
    fn new(address: Address) -> Self {
        Self { address, target: Mutex::new(None), observed: Mutex::new(None) }
    }

    fn reenter(&self, ledger: &mut Ledger, caller: &Address) -> Result<Vec<BigUint>, VenueError> {
        let call = CallContext::new(caller.clone());
        let res = match self.target.lock().unwrap().as_ref() {
            Some(Target::Router(router)) => router
                .execute_swap(ledger, &call, &[], None)
                .map(|_| ()),
            Some(Target::Executor(executor)) => executor
                .execute_swap(ledger, &call, &[])
                .map(|_| ())
                .map_err(ReferralError::from),
            None => Ok(()),
        };
        *self.observed.lock().unwrap() = res.err();
        Err(VenueError::Rejected("callback failed".to_string()))
    }
}

impl ConstantProductRouter for ReentrantRouter {
    fn address(&self) -> Address {
        self.address.clone()
    }

    fn pair_for(&self, _: &Address, _: &Address) -> Option<Address> {
        None
    }

    fn swap_exact_eth_for_tokens(
        &self,
        ledger: &mut Ledger,
        call: &CallContext,
        _: &BigUint,
        _: &[Address],
        _: &Address,
        _: u64,
    ) -> Result<Vec<BigUint>, VenueError> {
        self.reenter(ledger, &call.sender)
    }

    fn swap_exact_tokens_for_eth(
        &self,
        ledger: &mut Ledger,
        caller: &Address,
        _: &BigUint,
        _: &BigUint,
        _: &[Address],
        _: &Address,
        _: u64,
    ) -> Result<Vec<BigUint>, VenueError> {
        self.reenter(ledger, caller)
    }

    fn swap_exact_tokens_for_tokens(
        &self,
        ledger: &mut Ledger,
        caller: &Address,
        _: &BigUint,
        _: &BigUint,
        _: &[Address],
        _: &Address,
        _: u64,
    ) -> Result<Vec<BigUint>, VenueError> {
        self.reenter(ledger, caller)
    }
}

fn reentrant_world() -> (World, Arc<ReentrantRouter>) {
    let world = World::new();
    let venue = Arc::new(ReentrantRouter::new(addr(0x66)));
    world
        .executor
        .register_venue(&owner(), "reentrant", VenueKind::UniswapV2, addr(0x66))
        .unwrap();
    world
        .executor
        .register_contract(&owner(), Venue::ConstantProductRouter(venue.clone()))
        .unwrap();
    (world, venue)
}

#[test_log::test]
fn test_reentrant_router_call_rejected() {
    let (mut world, venue) = reentrant_world();
    *venue.target.lock().unwrap() = Some(Target::Router(world.router.clone()));
    world.fund(&user(), &token_a(), 10_000);
    let route = route(
        vec![step("reentrant", &token_a(), &token_b(), 100_000, 0, 1)],
        &token_a(),
        &token_b(),
        10_000,
        1,
    );

    let res = world.swap(&route, None);

    assert!(matches!(
        res,
        Err(ReferralError::Execution(ExecutionError::Venue { step: 0, .. }))
    ));
    assert_eq!(*venue.observed.lock().unwrap(), Some(ReferralError::Reentrant));
    assert_eq!(world.balance(&token_a(), &user()), amount(10_000));
}

#[test_log::test]
fn test_reentrant_executor_call_rejected() {
    let (mut world, venue) = reentrant_world();
    *venue.target.lock().unwrap() = Some(Target::Executor(world.executor.clone()));
    world.fund(&user(), &token_a(), 10_000);
    let route = route(
        vec![step("reentrant", &token_a(), &token_b(), 100_000, 0, 1)],
        &token_a(),
        &token_b(),
        10_000,
        1,
    );

    let res = world.swap(&route, None);

    assert!(res.is_err());
    assert_eq!(
        *venue.observed.lock().unwrap(),
        Some(ReferralError::Execution(ExecutionError::Reentrant))
    );
    assert_eq!(world.balance(&token_a(), &user()), amount(10_000));
}

/// Router that trades at par and updates the referrer's rate while the leg runs.
struct RateChangingRouter {
    address: Address,
    router: Mutex<Option<Arc<ReferralRouter>>>,
}

impl RateChangingRouter {
    fn update_rate(&self) -> Result<(), VenueError> {
        if let Some(router) = self.router.lock().unwrap().as_ref() {
            router
                .update_fee_basis_points(&referrer(), 10)
                .map_err(|e| VenueError::Rejected(e.to_string()))?;
        }
        Ok(())
    }
}

impl ConstantProductRouter for RateChangingRouter {
    fn address(&self) -> Address {
        self.address.clone()
    }

    fn pair_for(&self, _: &Address, _: &Address) -> Option<Address> {
        None
    }

    fn swap_exact_eth_for_tokens(
        &self,
        _: &mut Ledger,
        _: &CallContext,
        _: &BigUint,
        _: &[Address],
        _: &Address,
        _: u64,
    ) -> Result<Vec<BigUint>, VenueError> {
        Err(VenueError::Rejected("native input unsupported".to_string()))
    }

    fn swap_exact_tokens_for_eth(
        &self,
        _: &mut Ledger,
        _: &Address,
        _: &BigUint,
        _: &BigUint,
        _: &[Address],
        _: &Address,
        _: u64,
    ) -> Result<Vec<BigUint>, VenueError> {
        Err(VenueError::Rejected("native output unsupported".to_string()))
    }

    fn swap_exact_tokens_for_tokens(
        &self,
        ledger: &mut Ledger,
        caller: &Address,
        amount_in: &BigUint,
        _: &BigUint,
        path: &[Address],
        to: &Address,
        _: u64,
    ) -> Result<Vec<BigUint>, VenueError> {
        self.update_rate()?;
        ledger.transfer_from(&path[0], &self.address, caller, &self.address, amount_in)?;
        ledger.mint(&path[1], to, amount_in);
        Ok(vec![amount_in.clone(), amount_in.clone()])
    }
}

#[test_log::test]
fn test_rate_update_during_swap_is_kept() {
    let mut world = World::new();
    let venue = Arc::new(RateChangingRouter { address: addr(0x67), router: Mutex::new(None) });
    world
        .executor
        .register_venue(&owner(), "par", VenueKind::UniswapV2, addr(0x67))
        .unwrap();
    world
        .executor
        .register_contract(&owner(), Venue::ConstantProductRouter(venue.clone()))
        .unwrap();
    *venue.router.lock().unwrap() = Some(world.router.clone());
    world.fund(&user(), &token_a(), 10_000);
    let route = route(
        vec![step("par", &token_a(), &token_b(), 100_000, 0, 1)],
        &token_a(),
        &token_b(),
        10_000,
        1,
    );

    let receipt = world
        .swap(&route, Some(&referrer()))
        .unwrap();

    assert_eq!(receipt.fee_amount, amount(50));
    assert_eq!(receipt.execution.amount_out, amount(9_950));
    assert_eq!(world.router.fee_basis_points(&referrer()).unwrap(), 10);
    assert_eq!(
        world
            .router
            .referrer_earnings(&referrer(), &[token_a()])
            .unwrap(),
        vec![amount(50)]
    );
    let promo = world
        .router
        .referral_promo(&user())
        .unwrap()
        .unwrap();
    assert_eq!(promo.promo_bps, 50);
    assert_eq!(promo.promo_remaining, 2);
}
