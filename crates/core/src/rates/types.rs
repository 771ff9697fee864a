//! Rate configuration types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::GroupId;

use crate::ledger::types::Direction;

/// A chat group and its default rate pairs.
///
/// Zero is the "unconfigured" sentinel for every rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Chat id.
    pub id: GroupId,
    /// Chat title.
    pub name: String,
    /// Deposit fee rate, percent.
    pub in_rate: Decimal,
    /// Deposit exchange rate.
    pub in_fx: Decimal,
    /// Withdrawal fee rate, percent.
    pub out_rate: Decimal,
    /// Withdrawal exchange rate.
    pub out_fx: Decimal,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last rate change.
    pub updated_at: DateTime<Utc>,
}

impl Group {
    /// A new group with every rate unconfigured.
    #[must_use]
    pub fn new(id: GroupId, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            in_rate: Decimal::ZERO,
            in_fx: Decimal::ZERO,
            out_rate: Decimal::ZERO,
            out_fx: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    /// The default pair for a direction.
    #[must_use]
    pub const fn pair(&self, direction: Direction) -> RatePair {
        match direction {
            Direction::In => RatePair::new(self.in_rate, self.in_fx),
            Direction::Out => RatePair::new(self.out_rate, self.out_fx),
        }
    }

    /// Overwrites the fields present in `patch`.
    pub fn apply(&mut self, direction: Direction, patch: RatePatch, now: DateTime<Utc>) {
        let (fee, fx) = match direction {
            Direction::In => (&mut self.in_rate, &mut self.in_fx),
            Direction::Out => (&mut self.out_rate, &mut self.out_fx),
        };
        if let Some(v) = patch.fee_rate {
            *fee = v;
        }
        if let Some(v) = patch.exchange_rate {
            *fx = v;
        }
        self.updated_at = now;
    }

    /// Back to all-zero rates.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.in_rate = Decimal::ZERO;
        self.in_fx = Decimal::ZERO;
        self.out_rate = Decimal::ZERO;
        self.out_fx = Decimal::ZERO;
        self.updated_at = now;
    }
}

/// Per-country override inside a group. `None` falls back to the group default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryOverride {
    /// Owning group.
    pub group_id: GroupId,
    /// Country label, unique within the group.
    pub country: String,
    /// Deposit fee rate override.
    pub in_rate: Option<Decimal>,
    /// Deposit exchange rate override.
    pub in_fx: Option<Decimal>,
    /// Withdrawal fee rate override.
    pub out_rate: Option<Decimal>,
    /// Withdrawal exchange rate override.
    pub out_fx: Option<Decimal>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

impl CountryOverride {
    /// An override with nothing set yet.
    #[must_use]
    pub fn new(group_id: GroupId, country: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            group_id,
            country: country.into(),
            in_rate: None,
            in_fx: None,
            out_rate: None,
            out_fx: None,
            updated_at: now,
        }
    }

    /// The overridden fields for a direction, as `(fee_rate, exchange_rate)`.
    #[must_use]
    pub const fn fields(&self, direction: Direction) -> (Option<Decimal>, Option<Decimal>) {
        match direction {
            Direction::In => (self.in_rate, self.in_fx),
            Direction::Out => (self.out_rate, self.out_fx),
        }
    }

    /// Sets the fields present in `patch`, leaving the others untouched.
    pub fn apply(&mut self, direction: Direction, patch: RatePatch, now: DateTime<Utc>) {
        let (fee, fx) = match direction {
            Direction::In => (&mut self.in_rate, &mut self.in_fx),
            Direction::Out => (&mut self.out_rate, &mut self.out_fx),
        };
        if patch.fee_rate.is_some() {
            *fee = patch.fee_rate;
        }
        if patch.exchange_rate.is_some() {
            *fx = patch.exchange_rate;
        }
        self.updated_at = now;
    }
}

/// A partial rate update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatePatch {
    /// New fee rate in percent.
    pub fee_rate: Option<Decimal>,
    /// New exchange rate.
    pub exchange_rate: Option<Decimal>,
}

impl RatePatch {
    /// Patch touching only the fee rate.
    #[must_use]
    pub const fn fee(value: Decimal) -> Self {
        Self {
            fee_rate: Some(value),
            exchange_rate: None,
        }
    }

    /// Patch touching only the exchange rate.
    #[must_use]
    pub const fn fx(value: Decimal) -> Self {
        Self {
            fee_rate: None,
            exchange_rate: Some(value),
        }
    }
}

/// A fee/exchange rate pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatePair {
    /// Fee rate in percent.
    pub fee_rate: Decimal,
    /// Exchange rate.
    pub exchange_rate: Decimal,
}

impl RatePair {
    /// Creates a pair.
    #[must_use]
    pub const fn new(fee_rate: Decimal, exchange_rate: Decimal) -> Self {
        Self {
            fee_rate,
            exchange_rate,
        }
    }

    /// True when both values are the zero sentinel.
    #[must_use]
    pub fn is_unconfigured(&self) -> bool {
        self.fee_rate.is_zero() && self.exchange_rate.is_zero()
    }
}

/// Where a resolved pair came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "country", rename_all = "snake_case")]
pub enum RateSource {
    /// Both fields came from the group default.
    GroupDefault,
    /// At least one field came from this country's override.
    CountryOverride(String),
}

/// The effective pair for one direction and country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRate {
    /// Fee rate in percent.
    pub fee_rate: Decimal,
    /// Exchange rate.
    pub exchange_rate: Decimal,
    /// Provenance.
    pub source: RateSource,
}

impl ResolvedRate {
    /// The plain pair.
    #[must_use]
    pub const fn pair(&self) -> RatePair {
        RatePair::new(self.fee_rate, self.exchange_rate)
    }
}

/// Field-by-field resolution: override first, then group default.
#[must_use]
pub fn resolve_pair(
    group: &Group,
    country_override: Option<&CountryOverride>,
    direction: Direction,
) -> ResolvedRate {
    let default = group.pair(direction);
    let Some(ov) = country_override else {
        return ResolvedRate {
            fee_rate: default.fee_rate,
            exchange_rate: default.exchange_rate,
            source: RateSource::GroupDefault,
        };
    };

    let (fee, fx) = ov.fields(direction);
    let source = if fee.is_some() || fx.is_some() {
        RateSource::CountryOverride(ov.country.clone())
    } else {
        RateSource::GroupDefault
    };
    ResolvedRate {
        fee_rate: fee.unwrap_or(default.fee_rate),
        exchange_rate: fx.unwrap_or(default.exchange_rate),
        source,
    }
}
