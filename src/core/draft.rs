//! Local drafts: full rate snapshots staged on this machine before publishing.
//!
//! Drafts never touch the rate store. Each saved period is stored under its own
//! key and its name is appended to an index; saving a name again overwrites the
//! snapshot but still appends to the index, so the index is a save log rather
//! than a set.
use crate::core::cache::KeyValueCollection;
use crate::core::rate::{ExchangeRate, Period};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

pub const DRAFTS_COLLECTION: &str = "drafts";
const INDEX_KEY: &str = "savedPeriods";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub period: Period,
    pub rates: Vec<ExchangeRate>,
    pub created_at: DateTime<Utc>,
}

pub struct DraftCache {
    collection: Arc<dyn KeyValueCollection>,
}

impl DraftCache {
    pub fn new(collection: Arc<dyn KeyValueCollection>) -> Self {
        Self { collection }
    }

    fn draft_key(period: &Period) -> String {
        format!("period_{period}")
    }

    /// Stores `rates` under `period` and appends `period` to the index.
    pub async fn save_draft(&self, period: &Period, rates: &[ExchangeRate]) -> Result<Draft> {
        let draft = Draft {
            period: period.clone(),
            rates: rates.to_vec(),
            created_at: Utc::now(),
        };
        let payload = serde_json::to_vec(&draft)?;
        self.collection
            .put(Self::draft_key(period).as_bytes(), &payload)
            .await
            .with_context(|| format!("Failed to save draft {period}"))?;

        let mut index = self.list_drafts().await?;
        index.push(period.clone());
        self.collection
            .put(INDEX_KEY.as_bytes(), &serde_json::to_vec(&index)?)
            .await
            .context("Failed to update draft index")?;

        debug!(%period, rates = rates.len(), entries = index.len(), "Saved draft");
        Ok(draft)
    }

    pub async fn load_draft(&self, period: &Period) -> Result<Option<Draft>> {
        let Some(bytes) = self
            .collection
            .get(Self::draft_key(period).as_bytes())
            .await?
        else {
            debug!(%period, "No draft saved");
            return Ok(None);
        };
        let draft = serde_json::from_slice(&bytes)
            .with_context(|| format!("Corrupt draft for period {period}"))?;
        Ok(Some(draft))
    }

    /// Saved period names in save order, duplicates included.
    pub async fn list_drafts(&self) -> Result<Vec<Period>> {
        match self.collection.get(INDEX_KEY.as_bytes()).await? {
            Some(bytes) => serde_json::from_slice(&bytes).context("Corrupt draft index"),
            None => Ok(Vec::new()),
        }
    }
}
