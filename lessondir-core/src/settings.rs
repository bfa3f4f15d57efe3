//! Side tables kept next to lessons: known students, per-student rates and
//! the currency label.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

pub const DEFAULT_CURRENCY: &str = "€";

/// Rate per lesson keyed by student name.
pub type RateMap = BTreeMap<String, f64>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            currency: default_currency(),
        }
    }
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

/// Empty input falls back to the default currency.
pub fn normalize_currency(currency: &str) -> String {
    let trimmed = currency.trim();
    if trimmed.is_empty() {
        default_currency()
    } else {
        trimmed.to_string()
    }
}

/// Sorted, de-duplicated student list with blank names dropped.
pub fn normalize_students<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|s| s.as_ref().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Drop unnamed entries and clamp every rate to a finite, non-negative value.
pub fn clean_rates(rates: RateMap) -> RateMap {
    rates
        .into_iter()
        .filter(|(name, _)| !name.is_empty())
        .map(|(name, rate)| {
            let rate = if rate.is_finite() { rate.max(0.0) } else { 0.0 };
            (name, rate)
        })
        .collect()
}
