#![allow(dead_code)]

use std::{collections::BTreeMap, sync::Arc};

use num_bigint::BigUint;
use router_common::{
    abi::{encode_curve_indices, encode_pool_params, PoolParams},
    models::{
        is_native, native_asset, null_address, Address, Group, SwapRoute, SwapStep, Token,
        VenueKind,
    },
    Bytes,
};
use router_engine::{
    config::{Deployment, ReferralConfig, RouterConfig, VenueConfig},
    context::CallContext,
    errors::ReferralError,
    executor::RouteExecutor,
    ledger::Ledger,
    referral::{ReferralRouter, SwapReceipt},
    sim::{install, PoolSpec},
};

pub const NOW: u64 = 1_000;

pub fn addr(byte: u8) -> Address {
    Bytes::from(byte).lpad(20, 0)
}

pub fn owner() -> Address {
    addr(0xaa)
}

pub fn executor_address() -> Address {
    addr(0xe0)
}

pub fn router_address() -> Address {
    addr(0xf0)
}

pub fn user() -> Address {
    addr(0x11)
}

pub fn referrer() -> Address {
    addr(0x22)
}

pub fn weth() -> Address {
    addr(0xc0)
}

pub fn token_a() -> Address {
    addr(0x01)
}

pub fn token_b() -> Address {
    addr(0x02)
}

/// Intermediate asset of split routes.
pub fn token_c() -> Address {
    addr(0x03)
}

/// Asset no pool trades.
pub fn token_d() -> Address {
    addr(0x04)
}

/// Asset withholding 1% of every transfer.
pub fn taxed_token() -> Address {
    addr(0x05)
}

pub fn curve_pool() -> Address {
    addr(0x50)
}

pub fn v3_pool() -> Address {
    addr(0x31)
}

pub const BALANCER_POOL_ID: [u8; 32] = [0x42; 32];

pub fn amount(value: u64) -> BigUint {
    BigUint::from(value)
}

fn reserves(values: &[u64]) -> Vec<BigUint> {
    values.iter().copied().map(amount).collect()
}

pub fn config() -> RouterConfig {
    let venues = [
        ("uniswap_v2", VenueKind::UniswapV2, addr(0x20)),
        ("uniswap_v3", VenueKind::UniswapV3, addr(0x30)),
        ("balancer_v2", VenueKind::BalancerV2, addr(0x40)),
        ("curve", VenueKind::Curve, null_address()),
        ("uniswap_v4", VenueKind::UniswapV4, addr(0x44)),
    ]
    .into_iter()
    .map(|(tag, kind, address)| (tag.to_string(), VenueConfig { kind, address }))
    .collect::<BTreeMap<_, _>>();

    RouterConfig {
        owner: owner(),
        wrapped_native: weth(),
        executor: executor_address(),
        referral_router: router_address(),
        referral: ReferralConfig::default(),
        venues,
    }
}

pub fn pools() -> Vec<PoolSpec> {
    vec![
        PoolSpec::UniswapV2 {
            router: addr(0x20),
            pair: addr(0x21),
            tokens: [token_a(), token_b()],
            reserves: reserves(&[1_000_000, 2_000_000]),
        },
        PoolSpec::UniswapV2 {
            router: addr(0x20),
            pair: addr(0x22),
            tokens: [token_a(), token_c()],
            reserves: reserves(&[1_000_000, 1_000_000]),
        },
        PoolSpec::UniswapV2 {
            router: addr(0x20),
            pair: addr(0x23),
            tokens: [weth(), token_b()],
            reserves: reserves(&[1_000_000, 1_000_000]),
        },
        PoolSpec::UniswapV2 {
            router: addr(0x20),
            pair: addr(0x24),
            tokens: [taxed_token(), token_b()],
            reserves: reserves(&[1_000_000, 1_000_000]),
        },
        PoolSpec::UniswapV3 {
            router: addr(0x30),
            pool: v3_pool(),
            tokens: [token_a(), token_b()],
            fee: 3000,
            reserves: reserves(&[1_000_000, 1_000_000]),
        },
        PoolSpec::BalancerV2 {
            vault: addr(0x40),
            pool_id: Bytes::from(BALANCER_POOL_ID),
            account: addr(0x41),
            tokens: vec![token_a(), token_b()],
            swap_fee_bps: 0,
            reserves: reserves(&[1_000_000, 1_000_000]),
        },
        PoolSpec::Curve {
            pool: curve_pool(),
            coins: vec![token_c(), token_b()],
            fee_bps: 0,
            reserves: reserves(&[1_000_000, 1_000_000]),
        },
        PoolSpec::UniswapV4 {
            manager: addr(0x44),
            tokens: [native_asset(), token_b()],
            fee: 3000,
            tick_spacing: 60,
            hooks: null_address(),
            reserves: reserves(&[1_000_000, 1_000_000]),
        },
    ]
}

pub fn v4_aux() -> Bytes {
    encode_pool_params(&PoolParams { fee: 3000, tick_spacing: 60, hooks: null_address() })
        .expect("valid pool parameters")
}

pub fn curve_aux(i: u32, j: u32) -> Bytes {
    encode_curve_indices(i, j)
}

pub struct World {
    pub ledger: Ledger,
    pub executor: Arc<RouteExecutor>,
    pub router: Arc<ReferralRouter>,
}

impl World {
    pub fn new() -> Self {
        Self::with_config(config())
    }

    pub fn with_config(config: RouterConfig) -> Self {
        let mut ledger = config.ledger();
        ledger.set_timestamp(NOW);
        ledger.register_token(Token::new(&taxed_token(), "TAX", 18, 100));
        let venues = install(&mut ledger, &pools()).expect("pools install");
        let Deployment { executor, router } = config.deploy(venues).expect("deployment succeeds");
        Self { ledger, executor, router: Arc::new(router) }
    }

    pub fn balance(&self, asset: &Address, owner: &Address) -> BigUint {
        self.ledger.balance_of(asset, owner)
    }

    pub fn fund(&mut self, owner: &Address, asset: &Address, value: u64) {
        self.ledger.mint(asset, owner, &amount(value));
    }

    /// Swaps as `sender`, approving the router for exactly the input amount first.
    pub fn swap_as(
        &mut self,
        sender: &Address,
        route: &SwapRoute,
        code: Option<&Address>,
    ) -> Result<SwapReceipt, ReferralError> {
        let call = if is_native(&route.token_in) {
            CallContext::new(sender.clone()).with_value(route.amount_in.clone())
        } else {
            self.ledger
                .approve(&route.token_in, sender, &router_address(), &route.amount_in)
                .expect("approval");
            CallContext::new(sender.clone())
        };
        let encoded = route.encode().expect("route encodes");
        self.router
            .execute_swap(&mut self.ledger, &call, &encoded, code)
    }

    pub fn swap(
        &mut self,
        route: &SwapRoute,
        code: Option<&Address>,
    ) -> Result<SwapReceipt, ReferralError> {
        self.swap_as(&user(), route, code)
    }
}

pub fn step(
    venue: &str,
    from: &Address,
    to: &Address,
    percent: u32,
    parent: u32,
    group: u32,
) -> SwapStep {
    SwapStep {
        venue: venue.to_string(),
        path: [from.clone(), to.clone()],
        pool: null_address(),
        percent,
        group_id: group,
        parent_group_id: parent,
        aux_data: Bytes::new(),
    }
}

/// Route paying `amount_in` of `token_in` into bucket 0 and delivering to the user.
pub fn route(
    steps: Vec<SwapStep>,
    token_in: &Address,
    token_out: &Address,
    amount_in: u64,
    amount_out_min: u64,
) -> SwapRoute {
    let group_count = steps
        .iter()
        .map(|step| step.group_id.max(step.parent_group_id) + 1)
        .max()
        .unwrap_or(1);
    SwapRoute {
        steps,
        parent_groups: vec![Group { id: 0, percent: 100_000 }],
        destination: user(),
        token_in: token_in.clone(),
        token_out: token_out.clone(),
        group_count,
        deadline: NOW + 60,
        amount_in: amount(amount_in),
        amount_out_min: amount(amount_out_min),
        unwrap_native: false,
    }
}

/// Single `uniswap_v2` leg from `token_in` to `token_out`.
pub fn direct_route(
    token_in: &Address,
    token_out: &Address,
    amount_in: u64,
    amount_out_min: u64,
) -> SwapRoute {
    route(
        vec![step("uniswap_v2", token_in, token_out, 100_000, 0, 1)],
        token_in,
        token_out,
        amount_in,
        amount_out_min,
    )
}
