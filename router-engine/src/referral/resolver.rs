//! Per-user referral state machine.
//!
//! A user is bound to the first referrer whose code they swap with. The binding starts with
//! `PROMO_SWAPS` promotional swaps, charged at the referrer's rate capped by the promotional cap.
//! Once they are used up the binding stays, but the referrer's rate is capped by `TAIL_BPS`.
//! Users without a binding fall back to a legacy binding and then to the default referrer.

use std::collections::HashMap;

use router_common::models::{is_null, Address};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    constants::{
        DEFAULT_MAX_PROMO_BPS, DEFAULT_REFERRER_FEE_BPS, MAX_CUSTOM_FEE_BPS,
        MAX_DEFAULT_REFERRER_BPS, MAX_PROMO_CAP_BPS, MIN_CUSTOM_FEE_BPS, MIN_PROMO_CAP_BPS,
        PROMO_SWAPS, TAIL_BPS,
    },
    errors::ReferralError,
};

/// Binding of a user to their first referrer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralPromo {
    pub first_referrer: Address,
    /// Timestamp of the swap that created the binding.
    pub bound_at: u64,
    /// Referrer's rate at bind time, capped by the promotional cap then in force. Informational
    /// only: each swap charges the referrer's current rate under the current cap.
    pub promo_bps: u32,
    pub promo_remaining: u32,
}

/// Who earns the fee of a swap and at which rate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Referral {
    pub referrer: Option<Address>,
    pub bps: u32,
    /// Whether the swap uses up one promotional swap of the user.
    pub consumes_promo: bool,
}

#[derive(Debug, Clone)]
pub struct ReferralResolver {
    promos: HashMap<Address, ReferralPromo>,
    legacy_bindings: HashMap<Address, Address>,
    custom_fee_bps: HashMap<Address, u32>,
    default_referrer: Option<(Address, u32)>,
    max_promo_bps: u32,
}

impl Default for ReferralResolver {
    fn default() -> Self {
        Self {
            promos: HashMap::new(),
            legacy_bindings: HashMap::new(),
            custom_fee_bps: HashMap::new(),
            default_referrer: None,
            max_promo_bps: DEFAULT_MAX_PROMO_BPS,
        }
    }
}

impl ReferralResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `code` as `user`'s first referrer.
    ///
    /// Returns `false` without changing anything when `user` is already bound (promotional or
    /// legacy), refers themselves, or `code` is null.
    pub fn bind_first(
        &mut self,
        user: &Address,
        code: &Address,
        candidate_bps: u32,
        now: u64,
    ) -> bool {
        if is_null(code) ||
            code == user ||
            self.promos.contains_key(user) ||
            self.legacy_bindings.contains_key(user)
        {
            debug!(%user, %code, "Ignored referral code");
            return false;
        }
        let promo = ReferralPromo {
            first_referrer: code.clone(),
            bound_at: now,
            promo_bps: candidate_bps.min(self.max_promo_bps),
            promo_remaining: PROMO_SWAPS,
        };
        info!(%user, referrer = %code, promo_bps = promo.promo_bps, "Bound referrer");
        self.promos.insert(user.clone(), promo);
        true
    }

    pub fn compute_referral(&self, user: &Address) -> Referral {
        if let Some(promo) = self.promos.get(user) {
            let rate = self.fee_bps(&promo.first_referrer);
            return if promo.promo_remaining > 0 {
                Referral {
                    referrer: Some(promo.first_referrer.clone()),
                    bps: rate.min(self.max_promo_bps),
                    consumes_promo: true,
                }
            } else {
                Referral {
                    referrer: Some(promo.first_referrer.clone()),
                    bps: rate.min(TAIL_BPS),
                    consumes_promo: false,
                }
            };
        }
        if let Some(referrer) = self.legacy_bindings.get(user) {
            return Referral {
                referrer: Some(referrer.clone()),
                bps: self.fee_bps(referrer).min(TAIL_BPS),
                consumes_promo: false,
            };
        }
        if let Some((referrer, bps)) = &self.default_referrer {
            return Referral {
                referrer: Some(referrer.clone()),
                bps: (*bps).min(TAIL_BPS),
                consumes_promo: false,
            };
        }
        Referral::default()
    }

    pub fn after_swap(&mut self, user: &Address, consumed: bool) {
        if !consumed {
            return;
        }
        if let Some(promo) = self.promos.get_mut(user) {
            promo.promo_remaining = promo.promo_remaining.saturating_sub(1);
            debug!(%user, remaining = promo.promo_remaining, "Consumed promotional swap");
        }
    }

    /// Rate of `referrer`: its custom rate if it set one, `DEFAULT_REFERRER_FEE_BPS` otherwise.
    pub fn fee_bps(&self, referrer: &Address) -> u32 {
        self.custom_fee_bps
            .get(referrer)
            .copied()
            .unwrap_or(DEFAULT_REFERRER_FEE_BPS)
    }

    pub fn set_fee_bps(&mut self, referrer: &Address, bps: u32) -> Result<(), ReferralError> {
        if !(MIN_CUSTOM_FEE_BPS..=MAX_CUSTOM_FEE_BPS).contains(&bps) {
            return Err(ReferralError::FeeOutOfRange {
                bps,
                min: MIN_CUSTOM_FEE_BPS,
                max: MAX_CUSTOM_FEE_BPS,
            });
        }
        self.custom_fee_bps
            .insert(referrer.clone(), bps);
        Ok(())
    }

    pub fn promo(&self, user: &Address) -> Option<&ReferralPromo> {
        self.promos.get(user)
    }

    /// Referrer `user` is bound to, promotional binding first.
    pub fn referrer_of(&self, user: &Address) -> Option<&Address> {
        self.promos
            .get(user)
            .map(|promo| &promo.first_referrer)
            .or_else(|| self.legacy_bindings.get(user))
    }

    pub fn default_referrer(&self) -> Option<&(Address, u32)> {
        self.default_referrer.as_ref()
    }

    pub fn set_default_referrer(
        &mut self,
        referrer: &Address,
        bps: u32,
    ) -> Result<(), ReferralError> {
        if is_null(referrer) {
            return Err(ReferralError::ZeroAddress);
        }
        if bps > MAX_DEFAULT_REFERRER_BPS {
            return Err(ReferralError::DefaultReferrerFeeTooHigh {
                bps,
                max: MAX_DEFAULT_REFERRER_BPS,
            });
        }
        self.default_referrer = Some((referrer.clone(), bps));
        Ok(())
    }

    pub fn clear_default_referrer(&mut self) {
        self.default_referrer = None;
    }

    pub fn max_promo_bps(&self) -> u32 {
        self.max_promo_bps
    }

    pub fn set_max_promo_bps(&mut self, bps: u32) -> Result<(), ReferralError> {
        if !(MIN_PROMO_CAP_BPS..=MAX_PROMO_CAP_BPS).contains(&bps) {
            return Err(ReferralError::PromoCapOutOfRange {
                bps,
                min: MIN_PROMO_CAP_BPS,
                max: MAX_PROMO_CAP_BPS,
            });
        }
        self.max_promo_bps = bps;
        Ok(())
    }

    /// Imports `user -> referrer` bindings of an earlier deployment and returns how many were
    /// taken over. Users that are already bound, self-referrals and null referrers are skipped.
    pub fn import_legacy_bindings(&mut self, bindings: &[(Address, Address)]) -> usize {
        let mut imported = 0;
        for (user, referrer) in bindings {
            if is_null(referrer) ||
                referrer == user ||
                self.promos.contains_key(user) ||
                self.legacy_bindings.contains_key(user)
            {
                continue;
            }
            self.legacy_bindings
                .insert(user.clone(), referrer.clone());
            imported += 1;
        }
        imported
    }
}
