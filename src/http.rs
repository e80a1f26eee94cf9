mod error;

use anyhow::{Context as _, Result};
use axum::{
    Json, Router,
    extract::{Query, State, rejection::JsonRejection},
    routing::{get, post},
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    sensor::{Reading, SensorValues, Summary, now_in, parse_timestamp},
    store::ReadingStore,
};

pub use error::ApiError;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_LATEST: u32 = 50;
pub const MAX_LATEST: u32 = 1000;

#[derive(Debug, Clone)]
pub struct AppState<S> {
    pub store: S,

    /// Zone in which timestamps are stored.
    pub timezone: Tz,
}

pub fn router<S: ReadingStore>(store: S, timezone: Tz) -> Router {
    Router::new()
        .route("/api/insert", post(insert::<S>))
        .route("/api/latest", get(latest::<S>))
        .route("/api/summary", get(summary::<S>))
        .with_state(AppState { store, timezone })
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = listener
        .local_addr()
        .context("failed to get listener address")?;
    info!("Server running at http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")
}

#[derive(Debug, Serialize)]
pub struct InsertResponse {
    pub ok: bool,
    pub id: u64,
}

async fn insert<S: ReadingStore>(
    State(state): State<AppState<S>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<InsertResponse>, ApiError> {
    let Json(body) = body?;

    let values =
        SensorValues::from_fields(body.get("suhu"), body.get("humidity"), body.get("lux"))
            .ok_or(ApiError::InvalidInput)?;

    let timestamp = match body.get("timestamp") {
        Some(v) => parse_timestamp(v, state.timezone).map_err(ApiError::InvalidTimestamp)?,
        None => None,
    }
    .unwrap_or_else(|| now_in(state.timezone));

    let id = state
        .store
        .insert_reading(&values.at(timestamp))
        .await
        .map_err(ApiError::Store)?;

    Ok(Json(InsertResponse { ok: true, id }))
}

#[derive(Debug, Deserialize)]
pub struct LatestParams {
    pub n: Option<String>,
}

/// Returns the oldest `n` readings in ascending id order.
async fn latest<S: ReadingStore>(
    State(state): State<AppState<S>>,
    Query(params): Query<LatestParams>,
) -> Result<Json<Vec<Reading>>, ApiError> {
    let n = latest_count(params.n.as_deref());
    let readings = state
        .store
        .latest_readings(n)
        .await
        .map_err(ApiError::Store)?;

    Ok(Json(readings))
}

async fn summary<S: ReadingStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<Summary>, ApiError> {
    let summary = state.store.summary().await.map_err(ApiError::Store)?;

    Ok(Json(summary))
}

/// Reads a leading integer from `raw` (trailing characters are ignored),
/// falls back to [`DEFAULT_LATEST`] and clamps to `1..=MAX_LATEST`.
pub fn latest_count(raw: Option<&str>) -> u32 {
    let n = raw
        .and_then(parse_leading_int)
        .unwrap_or(DEFAULT_LATEST as i64);

    n.clamp(1, MAX_LATEST as i64) as u32
}

fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, rest) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };

    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }

    let value = rest[..end].parse::<i64>().unwrap_or(i64::MAX);

    Some(if negative { -value } else { value })
}
