//! Rate configuration: group defaults and per-country overrides.

pub mod store;
pub mod types;

pub use store::{GroupRateConfig, RateStore};
pub use types::{
    CountryOverride, Group, RatePair, RatePatch, RateSource, ResolvedRate, resolve_pair,
};
