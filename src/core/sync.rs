//! Reconciles the views with the rate store.
use crate::core::rate::{ExchangeRate, Period, RateStore, default_rates};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Failed to fetch rates")]
    FetchFailed(#[source] anyhow::Error),
    #[error("Failed to update rates")]
    UpdateFailed(#[source] anyhow::Error),
    #[error("Invalid rate: {0}")]
    InvalidRate(String),
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;

#[derive(Clone)]
pub struct RateSyncService {
    store: Arc<dyn RateStore>,
    default_period: Period,
}

impl RateSyncService {
    pub fn new(store: Arc<dyn RateStore>, default_period: Period) -> Self {
        Self {
            store,
            default_period,
        }
    }

    pub fn default_period(&self) -> &Period {
        &self.default_period
    }

    /// Period of the most recently updated row. Never fails: an empty or
    /// unreachable store yields the default period.
    pub async fn get_latest_period(&self) -> Period {
        match self.store.latest_period().await {
            Ok(Some(period)) => period,
            Ok(None) => {
                debug!(default = %self.default_period, "Store is empty, using default period");
                self.default_period.clone()
            }
            Err(e) => {
                warn!(error = %e, default = %self.default_period, "Failed to fetch latest period");
                self.default_period.clone()
            }
        }
    }

    /// All rows of `period` ordered by currency; empty when the period is unknown.
    pub async fn get_snapshot(&self, period: &Period) -> SyncResult<Vec<ExchangeRate>> {
        let mut rates = self
            .store
            .rates_by_period(period)
            .await
            .map_err(SyncError::FetchFailed)?;
        rates.sort_by(|a, b| a.currency.cmp(&b.currency));
        Ok(rates)
    }

    /// Returns the snapshot of `period`, first writing the default rate set if
    /// the period has no rows.
    pub async fn bootstrap_if_empty(&self, period: &Period) -> SyncResult<Vec<ExchangeRate>> {
        let rates = self.get_snapshot(period).await?;
        if !rates.is_empty() {
            return Ok(rates);
        }
        info!(%period, "No rates stored for period, writing defaults");
        self.upsert_snapshot(period, &default_rates(period)).await
    }

    /// Writes `rates` under `period` in one batch, stamping every row with the
    /// current time. Rows are relabelled to `period`; a currency repeated in
    /// the batch keeps its last occurrence.
    pub async fn upsert_snapshot(
        &self,
        period: &Period,
        rates: &[ExchangeRate],
    ) -> SyncResult<Vec<ExchangeRate>> {
        let now = Utc::now();
        let mut batch = BTreeMap::new();
        for rate in rates {
            rate.validate()
                .map_err(|e| SyncError::InvalidRate(e.to_string()))?;
            let row = ExchangeRate {
                currency: rate.currency.trim().to_string(),
                rate: rate.rate,
                period: period.clone(),
                updated_at: Some(now),
            };
            batch.insert(row.currency.clone(), row);
        }
        let batch: Vec<ExchangeRate> = batch.into_values().collect();

        let mut stored = self
            .store
            .upsert_rates(&batch)
            .await
            .map_err(SyncError::UpdateFailed)?;
        stored.sort_by(|a, b| a.currency.cmp(&b.currency));
        info!(%period, rows = stored.len(), "Upserted rates");
        Ok(stored)
    }

    /// Distinct periods present in the store.
    pub async fn list_periods(&self) -> SyncResult<Vec<Period>> {
        self.store.periods().await.map_err(SyncError::FetchFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::memory::MemoryRateStore;
    use anyhow::anyhow;
    use async_trait::async_trait;

    fn period(label: &str) -> Period {
        label.parse().unwrap()
    }

    fn service() -> RateSyncService {
        RateSyncService::new(Arc::new(MemoryRateStore::new()), Period::default())
    }

    struct FailingStore;

    #[async_trait]
    impl RateStore for FailingStore {
        async fn rates_by_period(&self, _period: &Period) -> anyhow::Result<Vec<ExchangeRate>> {
            Err(anyhow!("connection refused"))
        }

        async fn latest_period(&self) -> anyhow::Result<Option<Period>> {
            Err(anyhow!("connection refused"))
        }

        async fn periods(&self) -> anyhow::Result<Vec<Period>> {
            Err(anyhow!("connection refused"))
        }

        async fn upsert_rates(&self, _rates: &[ExchangeRate]) -> anyhow::Result<Vec<ExchangeRate>> {
            Err(anyhow!("connection refused"))
        }
    }

    #[tokio::test]
    async fn test_latest_period_defaults_on_empty_store() {
        let service = service();
        assert_eq!(service.get_latest_period().await, period("P5"));
    }

    #[tokio::test]
    async fn test_latest_period_fails_open() {
        let service = RateSyncService::new(Arc::new(FailingStore), period("P2"));
        assert_eq!(service.get_latest_period().await, period("P2"));
    }

    #[tokio::test]
    async fn test_bootstrap_writes_defaults_under_latest_period() {
        let service = service();
        let latest = service.get_latest_period().await;

        let rates = service.bootstrap_if_empty(&latest).await.unwrap();
        assert_eq!(rates.len(), 6);
        assert!(rates.iter().all(|r| r.period == latest));

        // Rows now exist under the default label
        assert_eq!(service.get_snapshot(&latest).await.unwrap().len(), 6);
        assert_eq!(service.get_latest_period().await, latest);
    }

    #[tokio::test]
    async fn test_bootstrap_keeps_existing_rows() {
        let service = service();
        let p7 = period("P7");
        service
            .upsert_snapshot(&p7, &[ExchangeRate::new("AUD", 0.65, &p7)])
            .await
            .unwrap();

        let rates = service.bootstrap_if_empty(&p7).await.unwrap();
        assert_eq!(rates.len(), 1);
        assert_eq!(rates[0].rate, 0.65);
    }

    #[tokio::test]
    async fn test_upsert_merges_with_prior_rows_of_period() {
        let service = service();
        let p4 = period("P4");
        service.bootstrap_if_empty(&p4).await.unwrap();

        let rows = vec![
            ExchangeRate::new("SGD", 0.75, &p4),
            ExchangeRate::new("AUD", 0.66, &p4),
        ];
        service.upsert_snapshot(&p4, &rows).await.unwrap();

        let snapshot = service.get_snapshot(&p4).await.unwrap();
        let aud = snapshot.iter().find(|r| r.currency == "AUD").unwrap();
        let sgd = snapshot.iter().find(|r| r.currency == "SGD").unwrap();
        assert_eq!(aud.rate, 0.66);
        assert_eq!(sgd.rate, 0.75);
        assert!(snapshot.iter().all(|r| r.period == p4));
        // Ordered by currency
        let currencies: Vec<_> = snapshot.iter().map(|r| r.currency.as_str()).collect();
        let mut sorted = currencies.clone();
        sorted.sort();
        assert_eq!(currencies, sorted);
    }

    #[tokio::test]
    async fn test_upsert_into_fresh_period_returns_exact_rows() {
        let service = service();
        let p8 = period("P8");
        let rows = vec![
            ExchangeRate::new("AUD", 0.65, &p8),
            ExchangeRate::new("JPY", 0.0067, &p8),
        ];
        service.upsert_snapshot(&p8, &rows).await.unwrap();

        let snapshot = service.get_snapshot(&p8).await.unwrap();
        let got: Vec<_> = snapshot
            .iter()
            .map(|r| (r.currency.clone(), r.rate, r.period.clone()))
            .collect();
        assert_eq!(
            got,
            vec![
                ("AUD".to_string(), 0.65, p8.clone()),
                ("JPY".to_string(), 0.0067, p8.clone()),
            ]
        );
        assert!(snapshot.iter().all(|r| r.updated_at.is_some()));
    }

    #[tokio::test]
    async fn test_upsert_relabels_and_leaves_old_period_intact() {
        let service = service();
        let p4 = period("P4");
        let p5 = period("P5");
        let loaded = service.bootstrap_if_empty(&p4).await.unwrap();

        service.upsert_snapshot(&p5, &loaded).await.unwrap();

        assert_eq!(service.get_snapshot(&p4).await.unwrap().len(), 6);
        let relabelled = service.get_snapshot(&p5).await.unwrap();
        assert_eq!(relabelled.len(), 6);
        assert!(relabelled.iter().all(|r| r.period == p5));
    }

    #[tokio::test]
    async fn test_upsert_duplicate_currency_last_wins() {
        let service = service();
        let p1 = period("P1");
        let rows = vec![
            ExchangeRate::new("AUD", 0.60, &p1),
            ExchangeRate::new("AUD", 0.61, &p1),
        ];
        let stored = service.upsert_snapshot(&p1, &rows).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].rate, 0.61);
    }

    #[tokio::test]
    async fn test_upsert_rejects_invalid_rate_without_writing() {
        let service = service();
        let p1 = period("P1");
        let rows = vec![
            ExchangeRate::new("AUD", 0.60, &p1),
            ExchangeRate::new("HKD", -0.1, &p1),
        ];
        let err = service.upsert_snapshot(&p1, &rows).await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidRate(_)));
        assert!(service.get_snapshot(&p1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_errors_map_to_fetch_and_update_failures() {
        let service = RateSyncService::new(Arc::new(FailingStore), Period::default());
        let p1 = period("P1");

        let err = service.get_snapshot(&p1).await.unwrap_err();
        assert!(matches!(err, SyncError::FetchFailed(_)));
        assert_eq!(err.to_string(), "Failed to fetch rates");

        let err = service
            .upsert_snapshot(&p1, &[ExchangeRate::new("AUD", 0.6, &p1)])
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::UpdateFailed(_)));

        assert!(matches!(
            service.list_periods().await.unwrap_err(),
            SyncError::FetchFailed(_)
        ));
    }

    #[tokio::test]
    async fn test_list_periods() {
        let service = service();
        for label in ["P3", "P10", "P4"] {
            let p = period(label);
            service
                .upsert_snapshot(&p, &[ExchangeRate::new("AUD", 0.6, &p)])
                .await
                .unwrap();
        }
        assert_eq!(
            service.list_periods().await.unwrap(),
            vec![period("P4"), period("P3"), period("P10")]
        );
    }
}
