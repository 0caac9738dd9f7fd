//! Dry runs of a route against reference venues.
//!
//! A scenario describes a whole deployment in YAML: the router configuration, token metadata,
//! pool reserves, starting balances and the swap to execute.

use std::fs;

use anyhow::Context;
use num_bigint::BigUint;
use router_common::{
    models::{is_native, Address, SwapRoute, Token},
    serde_primitives::biguint_string,
};
use router_engine::{
    config::{Deployment, RouterConfig},
    context::CallContext,
    sim::{install, PoolSpec},
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Balance {
    pub owner: Address,
    pub asset: Address,
    #[serde(with = "biguint_string")]
    pub amount: BigUint,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReferrerFee {
    pub referrer: Address,
    pub bps: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Scenario {
    pub config: RouterConfig,
    /// Chain time of the swap. Defaults to the current time.
    #[serde(default)]
    pub timestamp: Option<u64>,
    #[serde(default)]
    pub tokens: Vec<Token>,
    #[serde(default)]
    pub pools: Vec<PoolSpec>,
    #[serde(default)]
    pub balances: Vec<Balance>,
    /// Custom rates referrers set before the swap.
    #[serde(default)]
    pub referrer_fees: Vec<ReferrerFee>,
    pub caller: Address,
    #[serde(default)]
    pub referral_code: Option<Address>,
    pub route: SwapRoute,
}

impl Scenario {
    pub fn from_yaml(path: &str) -> anyhow::Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("Failed to read {path}"))?;
        serde_yaml::from_str(&contents).with_context(|| format!("Invalid scenario {path}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweptAmount {
    pub asset: Address,
    #[serde(with = "biguint_string")]
    pub amount: BigUint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationReport {
    pub referrer: Option<Address>,
    pub fee_bps: u32,
    #[serde(with = "biguint_string")]
    pub fee_amount: BigUint,
    #[serde(with = "biguint_string")]
    pub amount_in: BigUint,
    #[serde(with = "biguint_string")]
    pub amount_out: BigUint,
    pub swept: Vec<SweptAmount>,
    #[serde(with = "biguint_string")]
    pub refunded_input: BigUint,
    /// Balance of the route's output asset held by the destination after the swap.
    #[serde(with = "biguint_string")]
    pub destination_balance: BigUint,
}

/// Executes the scenario's swap. `now` is used when the scenario sets no timestamp.
pub fn simulate(scenario: &Scenario, now: u64) -> anyhow::Result<SimulationReport> {
    let mut ledger = scenario.config.ledger();
    ledger.set_timestamp(scenario.timestamp.unwrap_or(now));
    for token in &scenario.tokens {
        ledger.register_token(token.clone());
    }
    for balance in &scenario.balances {
        ledger.mint(&balance.asset, &balance.owner, &balance.amount);
    }
    let venues = install(&mut ledger, &scenario.pools).context("Failed to install pools")?;
    let Deployment { router, .. } = scenario.config.deploy(venues)?;
    for fee in &scenario.referrer_fees {
        router.update_fee_basis_points(&fee.referrer, fee.bps)?;
    }

    let route = &scenario.route;
    let call = if is_native(&route.token_in) {
        CallContext::new(scenario.caller.clone()).with_value(route.amount_in.clone())
    } else {
        ledger.approve(&route.token_in, &scenario.caller, router.address(), &route.amount_in)?;
        CallContext::new(scenario.caller.clone())
    };
    let receipt = router
        .execute_swap(&mut ledger, &call, &route.encode()?, scenario.referral_code.as_ref())
        .context("Swap failed")?;

    let destination_balance = ledger.balance_of(&route.token_out, &route.destination);
    info!(amount_out = %receipt.execution.amount_out, %destination_balance, "Simulated swap");
    Ok(SimulationReport {
        referrer: receipt.referrer,
        fee_bps: receipt.fee_bps,
        fee_amount: receipt.fee_amount,
        amount_in: receipt.execution.amount_in,
        amount_out: receipt.execution.amount_out,
        swept: receipt
            .execution
            .swept
            .into_iter()
            .map(|(asset, amount)| SweptAmount { asset, amount })
            .collect(),
        refunded_input: receipt.execution.refunded_input,
        destination_balance,
    })
}
