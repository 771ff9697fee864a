//! Rate configuration store.
//!
//! Sole mutator of group defaults and country overrides. Mutations never
//! touch already recorded transactions: each transaction keeps the rate it
//! was converted with.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tally_shared::types::GroupId;
use tracing::{info, warn};

use super::types::{CountryOverride, Group, RatePatch, ResolvedRate, resolve_pair};
use crate::ledger::error::LedgerError;
use crate::ledger::lock::GroupLocks;
use crate::ledger::repository::LedgerRepository;
use crate::ledger::types::{DEFAULT_COUNTRY, Direction};

/// Full rate configuration of one group, for the dashboard.
#[derive(Debug, Clone, serde::Serialize)]
pub struct GroupRateConfig {
    /// Group defaults.
    pub group: Group,
    /// Country overrides, ordered by country.
    pub countries: Vec<CountryOverride>,
}

/// Per-group rate configuration.
#[derive(Clone)]
pub struct RateStore {
    repo: Arc<dyn LedgerRepository>,
    locks: Arc<GroupLocks>,
}

impl std::fmt::Debug for RateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateStore").finish_non_exhaustive()
    }
}

impl RateStore {
    /// Create a new rate store.
    #[must_use]
    pub fn new(repo: Arc<dyn LedgerRepository>, locks: Arc<GroupLocks>) -> Self {
        Self { repo, locks }
    }

    /// Returns the group, creating it with unconfigured rates on first sight.
    pub async fn ensure_group(&self, group_id: GroupId, name: &str) -> Result<Group, LedgerError> {
        if let Some(group) = self.repo.find_group(group_id).await? {
            return Ok(group);
        }

        let _guard = self.locks.acquire(group_id).await;
        if let Some(group) = self.repo.find_group(group_id).await? {
            return Ok(group);
        }
        let group = Group::new(group_id, name, Utc::now());
        self.repo.save_group(&group).await?;
        info!(group_id = %group_id, name = %name, "group registered");
        Ok(group)
    }

    /// Resolves the effective pair for a direction and country.
    ///
    /// Order: the country's override (field by field), then the group
    /// default. An all-zero result fails with `UnconfiguredRate` when
    /// `require_configured` is set; otherwise it is logged and passed through.
    pub async fn resolve(
        &self,
        group_id: GroupId,
        direction: Direction,
        country: &str,
        require_configured: bool,
    ) -> Result<ResolvedRate, LedgerError> {
        let group = self
            .repo
            .find_group(group_id)
            .await?
            .unwrap_or_else(|| Group::new(group_id, "", Utc::now()));
        let country_override = if country == DEFAULT_COUNTRY {
            None
        } else {
            self.repo.find_country_override(group_id, country).await?
        };

        let resolved = resolve_pair(&group, country_override.as_ref(), direction);
        if resolved.pair().is_unconfigured() {
            if require_configured {
                return Err(LedgerError::UnconfiguredRate {
                    direction: direction.as_str(),
                    country: country.to_string(),
                });
            }
            warn!(
                group_id = %group_id,
                direction = direction.as_str(),
                country = %country,
                "using unconfigured (zero) rate pair"
            );
        }
        Ok(resolved)
    }

    /// Updates a group default pair. Only the fields present in `patch` change.
    pub async fn set_rate(
        &self,
        group_id: GroupId,
        direction: Direction,
        patch: RatePatch,
    ) -> Result<Group, LedgerError> {
        validate_patch(direction, patch)?;
        let _guard = self.locks.acquire(group_id).await;

        let now = Utc::now();
        let mut group = self
            .repo
            .find_group(group_id)
            .await?
            .unwrap_or_else(|| Group::new(group_id, "", now));
        group.apply(direction, patch, now);
        self.repo.save_group(&group).await?;

        info!(
            group_id = %group_id,
            direction = direction.as_str(),
            fee_rate = ?patch.fee_rate,
            exchange_rate = ?patch.exchange_rate,
            "group rate updated"
        );
        Ok(group)
    }

    /// Updates a country override. Fields not in `patch` keep their current value.
    pub async fn set_country_rate(
        &self,
        group_id: GroupId,
        country: &str,
        direction: Direction,
        patch: RatePatch,
    ) -> Result<CountryOverride, LedgerError> {
        validate_patch(direction, patch)?;
        let country = country.trim();
        if country.is_empty() || country == DEFAULT_COUNTRY {
            return Err(LedgerError::validation(format!(
                "invalid country label: {country:?}"
            )));
        }
        let _guard = self.locks.acquire(group_id).await;

        let now = Utc::now();
        let mut ov = self
            .repo
            .find_country_override(group_id, country)
            .await?
            .unwrap_or_else(|| CountryOverride::new(group_id, country, now));
        ov.apply(direction, patch, now);
        self.repo.save_country_override(&ov).await?;

        info!(
            group_id = %group_id,
            country = %country,
            direction = direction.as_str(),
            fee_rate = ?patch.fee_rate,
            exchange_rate = ?patch.exchange_rate,
            "country rate updated"
        );
        Ok(ov)
    }

    /// Removes a country override; later lookups fall back to the group default.
    pub async fn clear_country_rate(
        &self,
        group_id: GroupId,
        country: &str,
    ) -> Result<(), LedgerError> {
        let _guard = self.locks.acquire(group_id).await;
        if !self.repo.delete_country_override(group_id, country).await? {
            return Err(LedgerError::CountryNotFound(country.to_string()));
        }
        info!(group_id = %group_id, country = %country, "country rate cleared");
        Ok(())
    }

    /// Resets the group defaults to zero and drops every country override.
    pub async fn reset_defaults(&self, group_id: GroupId) -> Result<Group, LedgerError> {
        let _guard = self.locks.acquire(group_id).await;

        let now = Utc::now();
        let mut group = self
            .repo
            .find_group(group_id)
            .await?
            .unwrap_or_else(|| Group::new(group_id, "", now));
        group.reset(now);
        self.repo.save_group(&group).await?;

        for ov in self.repo.list_country_overrides(group_id).await? {
            self.repo
                .delete_country_override(group_id, &ov.country)
                .await?;
        }

        info!(group_id = %group_id, "group rates reset to defaults");
        Ok(group)
    }

    /// Group defaults plus every country override.
    pub async fn config(&self, group_id: GroupId) -> Result<GroupRateConfig, LedgerError> {
        let group = self
            .repo
            .find_group(group_id)
            .await?
            .unwrap_or_else(|| Group::new(group_id, "", Utc::now()));
        let countries = self.repo.list_country_overrides(group_id).await?;
        Ok(GroupRateConfig { group, countries })
    }
}

fn validate_patch(direction: Direction, patch: RatePatch) -> Result<(), LedgerError> {
    for value in [patch.fee_rate, patch.exchange_rate].into_iter().flatten() {
        if value < Decimal::ZERO {
            return Err(LedgerError::NegativeRate(value));
        }
    }
    // A deposit fee above 100% would turn every deposit negative.
    if direction == Direction::In
        && patch.fee_rate.is_some_and(|fee| fee > Decimal::ONE_HUNDRED)
    {
        return Err(LedgerError::validation(format!(
            "deposit fee rate must not exceed 100%, got {}%",
            patch.fee_rate.unwrap_or_default()
        )));
    }
    if patch.fee_rate.is_none() && patch.exchange_rate.is_none() {
        return Err(LedgerError::validation("rate update changes nothing"));
    }
    Ok(())
}
