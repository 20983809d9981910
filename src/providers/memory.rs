use crate::core::rate::{ExchangeRate, Period, RateStore};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Default)]
struct Table {
    rows: HashMap<(Period, String), (u64, ExchangeRate)>,
    writes: u64,
}

/// Rate table held in process memory.
///
/// Serves offline runs and tests. Ties on `updated_at` are broken by write
/// order so the latest period is always the last one written.
#[derive(Default)]
pub struct MemoryRateStore {
    table: Mutex<Table>,
}

impl MemoryRateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateStore for MemoryRateStore {
    async fn rates_by_period(&self, period: &Period) -> Result<Vec<ExchangeRate>> {
        let table = self.table.lock().await;
        let mut rates: Vec<ExchangeRate> = table
            .rows
            .values()
            .filter(|(_, rate)| &rate.period == period)
            .map(|(_, rate)| rate.clone())
            .collect();
        rates.sort_by(|a, b| a.currency.cmp(&b.currency));
        Ok(rates)
    }

    async fn latest_period(&self) -> Result<Option<Period>> {
        let table = self.table.lock().await;
        Ok(table
            .rows
            .values()
            .max_by_key(|(seq, rate)| (rate.updated_at, *seq))
            .map(|(_, rate)| rate.period.clone()))
    }

    async fn periods(&self) -> Result<Vec<Period>> {
        let table = self.table.lock().await;
        let periods: BTreeSet<Period> = table.rows.keys().map(|(p, _)| p.clone()).collect();
        Ok(periods.into_iter().rev().collect())
    }

    async fn upsert_rates(&self, rates: &[ExchangeRate]) -> Result<Vec<ExchangeRate>> {
        let mut table = self.table.lock().await;
        for rate in rates {
            table.writes += 1;
            let seq = table.writes;
            table.rows.insert(
                (rate.period.clone(), rate.currency.clone()),
                (seq, rate.clone()),
            );
        }
        debug!(rows = rates.len(), total = table.rows.len(), "Memory store upsert");
        Ok(rates.to_vec())
    }
}
