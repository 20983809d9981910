use crate::core::rate::{ExchangeRate, Period, RateStore};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument};

const PREFER_UPSERT: &str = "resolution=merge-duplicates,return=representation";

#[derive(Debug, Deserialize)]
struct PeriodRow {
    period: Period,
}

/// Rate table hosted behind a PostgREST endpoint (Supabase `rest/v1`).
pub struct PostgrestRateStore {
    base_url: String,
    table: String,
    client: Client,
}

impl PostgrestRateStore {
    pub fn new(base_url: &str, api_key: &str, table: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(api_key).context("Invalid store API key")?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .context("Invalid store API key")?,
        );
        let client = Client::builder()
            .user_agent("ratedesk/0.1")
            .default_headers(headers)
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            table: table.to_string(),
            client,
        })
    }

    fn table_url(&self, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/rest/v1/{}", self.base_url, self.table))
            .with_context(|| format!("Invalid store URL: {}", self.base_url))?;
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        error!(%status, body = %body, "Rate store request failed");
        Err(anyhow!("Rate store returned {status}: {body}"))
    }

    async fn fetch<T: DeserializeOwned>(&self, query: &[(&str, &str)]) -> Result<T> {
        let url = self.table_url(query)?;
        debug!("Requesting rate rows from {}", url);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Request error for URL: {url}"))?;
        Self::check(response)
            .await?
            .json::<T>()
            .await
            .context("Failed to parse rate store response")
    }
}

#[async_trait]
impl RateStore for PostgrestRateStore {
    #[instrument(name = "PostgrestRatesByPeriod", skip(self), fields(period = %period))]
    async fn rates_by_period(&self, period: &Period) -> Result<Vec<ExchangeRate>> {
        let filter = format!("eq.{period}");
        self.fetch(&[
            ("select", "*"),
            ("period", filter.as_str()),
            ("order", "currency.asc"),
        ])
        .await
    }

    #[instrument(name = "PostgrestLatestPeriod", skip(self))]
    async fn latest_period(&self) -> Result<Option<Period>> {
        let rows: Vec<PeriodRow> = self
            .fetch(&[
                ("select", "period,updated_at"),
                ("order", "updated_at.desc"),
                ("limit", "1"),
            ])
            .await?;
        Ok(rows.into_iter().next().map(|row| row.period))
    }

    #[instrument(name = "PostgrestPeriods", skip(self))]
    async fn periods(&self) -> Result<Vec<Period>> {
        let rows: Vec<PeriodRow> = self
            .fetch(&[("select", "period"), ("order", "period.desc")])
            .await?;
        let mut periods: Vec<Period> = Vec::new();
        for row in rows {
            if !periods.contains(&row.period) {
                periods.push(row.period);
            }
        }
        Ok(periods)
    }

    #[instrument(name = "PostgrestUpsert", skip(self, rates), fields(rows = rates.len()))]
    async fn upsert_rates(&self, rates: &[ExchangeRate]) -> Result<Vec<ExchangeRate>> {
        let url = self.table_url(&[("on_conflict", "currency,period")])?;
        debug!("Upserting rate rows to {}", url);
        let response = self
            .client
            .post(url.clone())
            .header("Prefer", PREFER_UPSERT)
            .json(rates)
            .send()
            .await
            .with_context(|| format!("Request error for URL: {url}"))?;
        Self::check(response)
            .await?
            .json::<Vec<ExchangeRate>>()
            .await
            .context("Failed to parse upsert response")
    }
}
