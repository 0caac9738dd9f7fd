//! Deployment configuration.
//!
//! ```yaml
//! owner: "0x00000000000000000000000000000000000000aa"
//! wrapped_native: "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"
//! executor: "0x00000000000000000000000000000000000000e0"
//! referral_router: "0x00000000000000000000000000000000000000f0"
//! referral:
//!   default_referrer: "0x00000000000000000000000000000000000000d0"
//!   default_referrer_bps: 30
//!   max_promo_bps: 250
//! venues:
//!   uniswap_v2:
//!     kind: uniswap_v2
//!     address: "0x0000000000000000000000000000000000000020"
//! ```

use std::{collections::BTreeMap, fs, sync::Arc};

use router_common::models::{Address, VenueKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::{
    constants::DEFAULT_MAX_PROMO_BPS,
    errors::{ExecutionError, ReferralError},
    executor::RouteExecutor,
    ledger::Ledger,
    referral::ReferralRouter,
    venues::Venue,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error(transparent)]
    Referral(#[from] ReferralError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueConfig {
    pub kind: VenueKind,
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralConfig {
    #[serde(default)]
    pub default_referrer: Option<Address>,
    #[serde(default)]
    pub default_referrer_bps: u32,
    #[serde(default = "default_max_promo_bps")]
    pub max_promo_bps: u32,
}

fn default_max_promo_bps() -> u32 {
    DEFAULT_MAX_PROMO_BPS
}

impl Default for ReferralConfig {
    fn default() -> Self {
        Self {
            default_referrer: None,
            default_referrer_bps: 0,
            max_promo_bps: DEFAULT_MAX_PROMO_BPS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterConfig {
    pub owner: Address,
    pub wrapped_native: Address,
    /// Address of the route executor.
    pub executor: Address,
    /// Address of the public referral router.
    pub referral_router: Address,
    #[serde(default)]
    pub referral: ReferralConfig,
    /// Venue tag to calling convention and target contract.
    #[serde(default)]
    pub venues: BTreeMap<String, VenueConfig>,
}

/// The executor and referral router of one deployment, already linked together.
#[derive(Debug)]
pub struct Deployment {
    pub executor: Arc<RouteExecutor>,
    pub router: ReferralRouter,
}

impl RouterConfig {
    pub fn from_yaml(path: &str) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_string(), source })?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// An empty ledger for this deployment's chain.
    pub fn ledger(&self) -> Ledger {
        Ledger::new(self.wrapped_native.clone())
    }

    /// Builds the executor and referral router, registers the venue tags and `contracts`, and
    /// applies the referral settings.
    pub fn deploy(
        &self,
        contracts: impl IntoIterator<Item = Venue>,
    ) -> Result<Deployment, ConfigError> {
        let executor = Arc::new(RouteExecutor::new(self.executor.clone(), self.owner.clone()));
        executor.set_referral_layer(&self.owner, self.referral_router.clone())?;
        for (tag, venue) in &self.venues {
            executor.register_venue(&self.owner, tag, venue.kind, venue.address.clone())?;
        }
        for contract in contracts {
            executor.register_contract(&self.owner, contract)?;
        }

        let router =
            ReferralRouter::new(self.referral_router.clone(), self.owner.clone(), executor.clone());
        router.set_max_promo_bps(&self.owner, self.referral.max_promo_bps)?;
        if let Some(referrer) = &self.referral.default_referrer {
            router.set_default_referrer(&self.owner, referrer, self.referral.default_referrer_bps)?;
        }

        info!(
            executor = %self.executor,
            referral_router = %self.referral_router,
            venues = self.venues.len(),
            "Deployed router"
        );
        Ok(Deployment { executor, router })
    }
}
