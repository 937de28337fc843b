use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Extension, Path, Query};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, NaiveDateTime, Utc};
use oracle_core::storage::Commitment;
use oracle_core::{Asset, Oracle};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::feed::HttpFeed;
use crate::models::PostgresStorage;
use oracle_core::error::Error;

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const DEFAULT_EVENT_TYPE: &str = "digits";

#[derive(Clone)]
pub struct AppState {
    pub oracle: Arc<Oracle<PostgresStorage>>,
    pub assets: Arc<HashMap<String, Asset>>,
    pub feed: Arc<HttpFeed>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health-check", get(health_check))
        .route("/oracle/publickey", get(get_public_key))
        .route("/asset", get(list_assets))
        .route("/asset/:id/config", get(get_asset_config))
        .route("/asset/:id/rvalue/:time", get(get_asset_rvalue))
        .route("/asset/:id/signature/:time", get(get_asset_signature))
        .route("/asset/rvalue/:r", get(get_by_rvalue))
        .layer(Extension(state))
}

async fn health_check() -> Json<()> {
    Json(())
}

#[derive(Serialize)]
struct PublicKeyResponse {
    #[serde(rename = "publicKey")]
    public_key: String,
}

async fn get_public_key(Extension(state): Extension<AppState>) -> Json<PublicKeyResponse> {
    Json(PublicKeyResponse {
        public_key: state.oracle.public_key().to_string(),
    })
}

async fn list_assets(Extension(state): Extension<AppState>) -> Json<Vec<String>> {
    let mut ids: Vec<String> = state.assets.keys().cloned().collect();
    ids.sort();
    Json(ids)
}

#[derive(Serialize)]
struct AssetConfigResponse {
    asset: String,
    currency: String,
    #[serde(rename = "hasDecimals")]
    has_decimals: bool,
    #[serde(rename = "startDate")]
    start_date: DateTime<Utc>,
    frequency: String,
    range: String,
    #[serde(rename = "eventTypes")]
    event_types: HashMap<String, bool>,
}

async fn get_asset_config(
    Extension(state): Extension<AppState>,
    Path(asset_id): Path<String>,
) -> Result<Json<AssetConfigResponse>, ApiError> {
    let asset = find_asset(&state, &asset_id)?;
    Ok(Json(AssetConfigResponse {
        asset: asset.asset_id.clone(),
        currency: asset.currency.clone(),
        has_decimals: asset.has_decimals,
        start_date: asset.start_date,
        frequency: crate::iso8601::encode_duration(asset.frequency),
        range: crate::iso8601::encode_duration(asset.range),
        event_types: asset.event_types.clone(),
    }))
}

#[derive(Serialize)]
struct DlcDataResponse {
    #[serde(rename = "oraclePublicKey")]
    oracle_public_key: String,
    #[serde(rename = "publishDate")]
    publish_date: DateTime<Utc>,
    asset: String,
    #[serde(rename = "eventType")]
    event_type: String,
    rvalue: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<String>,
}

impl DlcDataResponse {
    fn from_commitment(oracle_public_key: String, commitment: &Commitment) -> Self {
        Self {
            oracle_public_key,
            publish_date: commitment.published_date,
            asset: commitment.asset_id.clone(),
            event_type: commitment.event_type.clone(),
            rvalue: commitment.r.to_string(),
            signature: commitment.signature.map(|s| hex::encode(s.serialize())),
            value: commitment.value.clone(),
        }
    }
}

#[derive(Deserialize)]
struct EventTypeQuery {
    #[serde(rename = "eventType", default)]
    event_type: Option<String>,
}

fn find_asset<'a>(state: &'a AppState, asset_id: &str) -> Result<&'a Asset, Error> {
    state
        .assets
        .get(asset_id)
        .ok_or_else(|| Error::UnknownAsset(asset_id.to_string()))
}

fn parse_time(timestamp: &str) -> Result<DateTime<Utc>, Error> {
    let naive = NaiveDateTime::parse_from_str(timestamp, TIME_FORMAT)
        .map_err(|e| Error::InvalidTimeFormat(format!("{e}, expected format like 2020-01-01T00:00:00Z")))?;
    Ok(DateTime::from_naive_utc_and_offset(naive, Utc))
}

async fn get_asset_rvalue(
    Extension(state): Extension<AppState>,
    Path((asset_id, time)): Path<(String, String)>,
    Query(query): Query<EventTypeQuery>,
) -> Result<Json<DlcDataResponse>, ApiError> {
    let asset = find_asset(&state, &asset_id)?;
    let event_type = query.event_type.unwrap_or_else(|| DEFAULT_EVENT_TYPE.to_string());
    let requested = parse_time(&time)?;

    let now = Utc::now();
    let publish = oracle_core::schedule::calculate_publish_date(
        requested,
        asset.start_date,
        asset.frequency,
        asset.range,
        now,
    )?;

    let commitment = state.oracle.commit(&asset.asset_id, publish, &event_type).await?;

    Ok(Json(DlcDataResponse::from_commitment(
        state.oracle.public_key().to_string(),
        &commitment,
    )))
}

async fn get_asset_signature(
    Extension(state): Extension<AppState>,
    Path((asset_id, time)): Path<(String, String)>,
    Query(query): Query<EventTypeQuery>,
) -> Result<Json<DlcDataResponse>, ApiError> {
    let asset = find_asset(&state, &asset_id)?.clone();
    let event_type = query.event_type.unwrap_or_else(|| DEFAULT_EVENT_TYPE.to_string());
    let requested = parse_time(&time)?;

    let now = Utc::now();
    let publish = oracle_core::schedule::calculate_publish_date(
        requested,
        asset.start_date,
        asset.frequency,
        asset.range,
        now,
    )?;

    if publish > now {
        return Err(Error::InstantNotYetDue(format!(
            "oracle cannot sign a value not yet known, retry after {publish}"
        ))
        .into());
    }

    let commitment = state
        .oracle
        .sign(state.feed.as_ref(), &asset, publish, &event_type, now)
        .await?;

    Ok(Json(DlcDataResponse::from_commitment(
        state.oracle.public_key().to_string(),
        &commitment,
    )))
}

async fn get_by_rvalue(
    Extension(state): Extension<AppState>,
    Path(rvalue): Path<String>,
) -> Result<Json<DlcDataResponse>, ApiError> {
    let bytes = hex::decode(&rvalue)
        .map_err(|e| Error::InvalidTimeFormat(format!("invalid rvalue hex: {e}")))?;
    let r = bitcoin::XOnlyPublicKey::from_slice(&bytes)
        .map_err(|e| Error::InvalidTimeFormat(format!("invalid rvalue: {e}")))?;

    let commitment = state
        .oracle
        .find_by_r(&r)
        .await?
        .ok_or(Error::NotFound)?;

    Ok(Json(DlcDataResponse::from_commitment(
        state.oracle.public_key().to_string(),
        &commitment,
    )))
}
