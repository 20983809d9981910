//! Exchange rate model and the rate store abstraction

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Label used when the store has no rows or cannot be reached.
pub const DEFAULT_PERIOD: &str = "P5";

/// Rates written under a period that has no rows yet.
pub const DEFAULT_RATES: [(&str, f64); 6] = [
    ("AUD", 0.62941),
    ("HKD", 0.12860),
    ("IDR", 0.06000),
    ("JPY", 0.00670),
    ("SGD", 0.74655),
    ("THB", 0.02943),
];

/// A named snapshot label, conventionally `P<n>`.
///
/// Any non-blank label is accepted; a period comes into existence the first
/// time a rate is written under it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Period(String);

impl Period {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Period {
    fn default() -> Self {
        Period(DEFAULT_PERIOD.to_string())
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Period {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        if label.is_empty() {
            return Err(anyhow::anyhow!("Period label must not be empty"));
        }
        Ok(Period(label.to_string()))
    }
}

/// One currency's rate to USD within a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub currency: String,
    pub rate: f64,
    pub period: Period,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ExchangeRate {
    pub fn new(currency: &str, rate: f64, period: &Period) -> Self {
        Self {
            currency: currency.to_string(),
            rate,
            period: period.clone(),
            updated_at: None,
        }
    }

    /// Checks the row invariants: a currency code and a finite, non-negative rate.
    pub fn validate(&self) -> Result<()> {
        if self.currency.trim().is_empty() {
            anyhow::bail!("Currency code must not be empty");
        }
        if !self.rate.is_finite() || self.rate < 0.0 {
            anyhow::bail!("Invalid rate {} for {}", self.rate, self.currency);
        }
        Ok(())
    }
}

/// Builds the default rate set under `period`.
pub fn default_rates(period: &Period) -> Vec<ExchangeRate> {
    DEFAULT_RATES
        .iter()
        .map(|(currency, rate)| ExchangeRate::new(currency, *rate, period))
        .collect()
}

/// Backing table of `(currency, period)` keyed rate rows.
#[async_trait]
pub trait RateStore: Send + Sync {
    /// All rows of `period`, ordered by currency ascending.
    async fn rates_by_period(&self, period: &Period) -> Result<Vec<ExchangeRate>>;

    /// Period of the most recently updated row, if any row exists.
    async fn latest_period(&self) -> Result<Option<Period>>;

    /// Distinct periods, descending by label.
    async fn periods(&self) -> Result<Vec<Period>>;

    /// Inserts or replaces rows on `(currency, period)` and returns what was stored.
    async fn upsert_rates(&self, rates: &[ExchangeRate]) -> Result<Vec<ExchangeRate>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_from_str_trims_and_rejects_blank() {
        let period: Period = " P7 ".parse().unwrap();
        assert_eq!(period.as_str(), "P7");
        assert!("   ".parse::<Period>().is_err());
        assert!("".parse::<Period>().is_err());
    }

    #[test]
    fn test_period_accepts_free_form_labels() {
        let period: Period = "2025-Q3 draft".parse().unwrap();
        assert_eq!(period.to_string(), "2025-Q3 draft");
    }

    #[test]
    fn test_validate_rejects_bad_rates() {
        let period = Period::default();
        assert!(ExchangeRate::new("AUD", 0.65, &period).validate().is_ok());
        assert!(ExchangeRate::new("AUD", 0.0, &period).validate().is_ok());
        assert!(ExchangeRate::new("AUD", -1.0, &period).validate().is_err());
        assert!(ExchangeRate::new("AUD", f64::NAN, &period).validate().is_err());
        assert!(
            ExchangeRate::new("AUD", f64::INFINITY, &period)
                .validate()
                .is_err()
        );
        assert!(ExchangeRate::new(" ", 1.0, &period).validate().is_err());
    }

    #[test]
    fn test_default_rates_use_requested_period() {
        let period: Period = "P9".parse().unwrap();
        let rates = default_rates(&period);
        assert_eq!(rates.len(), 6);
        assert!(rates.iter().all(|r| r.period == period));
        assert_eq!(rates[1].currency, "HKD");
        assert_eq!(rates[1].rate, 0.12860);
    }

    #[test]
    fn test_period_serializes_as_plain_string() {
        let period: Period = "P4".parse().unwrap();
        assert_eq!(serde_json::to_string(&period).unwrap(), r#""P4""#);
    }
}
