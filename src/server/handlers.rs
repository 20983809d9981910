use super::AppState;
use crate::core::rate::{ExchangeRate, Period};
use crate::core::sync::SyncError;
use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};

/// Wire shape of a rate row. `lastUpdated` carries the period label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateRow {
    pub currency: String,
    pub rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl From<ExchangeRate> for RateRow {
    fn from(rate: ExchangeRate) -> Self {
        RateRow {
            currency: rate.currency,
            rate: rate.rate,
            last_updated: Some(rate.period.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RatesQuery {
    period: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: u64,
}

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        let status = match err {
            SyncError::InvalidRate(_) => StatusCode::BAD_REQUEST,
            SyncError::FetchFailed(_) | SyncError::UpdateFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        error!(error = ?err, "Request failed");
        ApiError::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn get_rates(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RatesQuery>,
) -> Result<Json<Vec<RateRow>>, ApiError> {
    let rates = match query.period {
        Some(label) => {
            let period: Period = label
                .parse()
                .map_err(|_| ApiError::new(StatusCode::BAD_REQUEST, "Invalid period"))?;
            state.service.get_snapshot(&period).await?
        }
        None => {
            let period = state.service.get_latest_period().await;
            state.service.bootstrap_if_empty(&period).await?
        }
    };
    Ok(Json(rates.into_iter().map(RateRow::from).collect()))
}

pub async fn post_rates(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(rows): Json<Vec<RateRow>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.auth.authorize(bearer_token(&headers)).await {
        return Err(ApiError::new(StatusCode::UNAUTHORIZED, "Unauthorized"));
    }

    let mut by_period: BTreeMap<Period, Vec<ExchangeRate>> = BTreeMap::new();
    for row in rows {
        // A blank label counts as absent
        let period = row
            .last_updated
            .as_deref()
            .filter(|label| !label.trim().is_empty())
            .map_or_else(
                || Ok(state.service.default_period().clone()),
                |label| label.parse::<Period>(),
            )
            .map_err(|_| ApiError::new(StatusCode::BAD_REQUEST, "Invalid period"))?;
        let rate = ExchangeRate::new(&row.currency, row.rate, &period);
        by_period.entry(period).or_default().push(rate);
    }

    // Reject the whole body before any period is written
    for rate in by_period.values().flatten() {
        rate.validate()
            .map_err(|e| ApiError::from(SyncError::InvalidRate(e.to_string())))?;
    }

    for (period, rates) in &by_period {
        state.service.upsert_snapshot(period, rates).await?;
    }
    info!(periods = by_period.len(), "Saved rates");
    Ok(Json(json!({ "success": true })))
}

pub async fn latest_period(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let period = state.service.get_latest_period().await;
    Json(json!({ "period": period }))
}

pub async fn periods(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let periods = state.service.list_periods().await?;
    Ok(Json(json!({ "periods": periods })))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    if !state.auth.is_enabled() {
        return Err(ApiError::new(
            StatusCode::NOT_FOUND,
            "Admin login is not configured",
        ));
    }
    match state.auth.login(&request.password).await {
        Some(token) => Ok(Json(LoginResponse {
            token,
            expires_in: state.auth.session_ttl().as_secs(),
        })),
        None => Err(ApiError::new(StatusCode::UNAUTHORIZED, "Incorrect password")),
    }
}

pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> StatusCode {
    if let Some(token) = bearer_token(&headers) {
        state.auth.logout(token).await;
    }
    StatusCode::NO_CONTENT
}
