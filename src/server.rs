// Copyright 2026 Chartstream Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP server speaking the form-encoded chart protocol.
//!
//! `/charts` answers metadata and download requests, `/live` ingests
//! uploaded packets, `/admin` selects the data source, and `/health` is a
//! plain liveness probe. Requests carry form-encoded parameters; every
//! recognized parameter in a request is processed and the results are
//! merged into a single JSON response object.

use crate::source::{ActiveSource, SourceConfig};
use crate::types::{ChartError, ChartResult};
use crate::wire::{self, DataRequest, UploadRequest, ACK_FAILURE, ACK_SUCCESS};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{Notify, RwLock};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

struct Configured {
    mode: &'static str,
    active: ActiveSource,
}

/// Shared state behind every endpoint.
pub struct ServerState {
    started_at: DateTime<Utc>,
    configured: RwLock<Option<Configured>>,
}

impl ServerState {
    /// State with no data source; `/charts` answers 503 until the admin
    /// endpoint configures one.
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            configured: RwLock::new(None),
        }
    }

    /// State with a source built up front, for servers configured at boot.
    pub fn with_source(config: &SourceConfig) -> ChartResult<Self> {
        let active = config.build()?;
        Ok(Self {
            started_at: Utc::now(),
            configured: RwLock::new(Some(Configured {
                mode: config.mode(),
                active,
            })),
        })
    }

    /// Install a source. Reconfiguration is refused; restart the server to
    /// switch sources.
    pub async fn configure(&self, config: &SourceConfig) -> ChartResult<()> {
        let mut configured = self.configured.write().await;
        if configured.is_some() {
            return Err(ChartError::AlreadyConfigured);
        }
        let active = config.build()?;
        info!("configured '{}' data source", config.mode());
        *configured = Some(Configured {
            mode: config.mode(),
            active,
        });
        Ok(())
    }

    pub async fn is_configured(&self) -> bool {
        self.configured.read().await.is_some()
    }

    async fn mode(&self) -> Option<&'static str> {
        self.configured.read().await.as_ref().map(|c| c.mode)
    }

    async fn source_identity(&self) -> Option<(String, String)> {
        self.configured.read().await.as_ref().map(|c| {
            (
                c.active.source.name().to_string(),
                c.active.source.id().to_string(),
            )
        })
    }

    async fn active(&self) -> Option<ActiveSource> {
        self.configured.read().await.as_ref().map(|c| c.active.clone())
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

/// The chart HTTP server.
pub struct ChartServer {
    port: u16,
    state: Arc<ServerState>,
    shutdown: Arc<Notify>,
}

impl ChartServer {
    /// Server that boots unconfigured and waits for `/admin`.
    pub fn new(port: u16) -> Self {
        Self {
            port,
            state: Arc::new(ServerState::new()),
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Server with the source fixed at boot.
    pub fn with_config(port: u16, config: &SourceConfig) -> ChartResult<Self> {
        Ok(Self {
            port,
            state: Arc::new(ServerState::with_source(config)?),
            shutdown: Arc::new(Notify::new()),
        })
    }

    pub fn state(&self) -> Arc<ServerState> {
        Arc::clone(&self.state)
    }

    /// Get the shutdown notifier (for external shutdown signaling).
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }

    /// Bind and serve until the shutdown notifier fires.
    pub async fn serve(&self) -> anyhow::Result<()> {
        let app = router(Arc::clone(&self.state));
        let addr = SocketAddr::from(([127, 0, 0, 1], self.port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("chart server listening on http://{}", listener.local_addr()?);

        let shutdown = Arc::clone(&self.shutdown);
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.notified().await })
            .await?;
        Ok(())
    }
}

/// Build the axum Router with all endpoints.
pub fn router(state: Arc<ServerState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/charts", post(charts))
        .route("/live", post(live))
        .route("/admin", post(admin))
        .layer(cors)
        .with_state(state)
}

// ── Error plumbing ──────────────────────────────────────────────

#[derive(Debug)]
struct ApiError {
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

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn unconfigured() -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "no data source is configured",
        )
    }
}

impl From<ChartError> for ApiError {
    fn from(e: ChartError) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

// ── Handlers ────────────────────────────────────────────────────

async fn health(State(state): State<Arc<ServerState>>) -> Json<Value> {
    let uptime = (Utc::now() - state.started_at).num_seconds();
    let identity = state.source_identity().await;
    Json(json!({
        "status": "ok",
        "uptime_seconds": uptime,
        "configured": state.is_configured().await,
        "mode": state.mode().await,
        "source": identity.as_ref().map(|(name, _)| name.clone()),
        "source_id": identity.map(|(_, id)| id),
    }))
}

/// Metadata and download endpoint. Every recognized parameter present in
/// the request contributes to one merged response object; unknown
/// parameters are ignored with a warning.
async fn charts(
    State(state): State<Arc<ServerState>>,
    body: String,
) -> Result<Json<Value>, ApiError> {
    let active = state.active().await.ok_or_else(ApiError::unconfigured)?;
    let grouped = group_params(&body);

    let mut response = serde_json::Map::new();
    for (name, values) in &grouped {
        match name.as_str() {
            wire::PARAM_LIST_KNOWN_CHARTS => {
                let charts = active.source.known_charts().await?;
                let listing: serde_json::Map<String, Value> = charts
                    .into_iter()
                    .map(|info| (info.id.clone(), json!(info)))
                    .collect();
                response.insert(wire::KEY_KNOWN_CHARTS.to_string(), Value::Object(listing));
            }
            wire::PARAM_GET_DATA_NAME => {
                response.insert(wire::KEY_DATA_NAME.to_string(), json!(active.source.name()));
            }
            wire::PARAM_DOWNLOAD_DATA => {
                let mut requests = Vec::with_capacity(values.len());
                for value in values {
                    let request: DataRequest = serde_json::from_str(value).map_err(|e| {
                        ApiError::bad_request(format!("malformed download request: {e}"))
                    })?;
                    requests.push(request);
                }
                let batches = active.source.data_after_batch(&requests).await?;
                for (chart, rows) in batches {
                    response.insert(chart, json!(rows));
                }
            }
            other => warn!("ignoring unknown chart parameter '{other}'"),
        }
    }
    Ok(Json(Value::Object(response)))
}

/// Ingest endpoint. Only meaningful when the active source is the live
/// buffer; acknowledges each action with "success" or "failure".
async fn live(
    State(state): State<Arc<ServerState>>,
    body: String,
) -> Result<Json<Value>, ApiError> {
    let active = state.active().await.ok_or_else(ApiError::unconfigured)?;
    let Some(buffer) = active.live else {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            "active data source does not accept uploads",
        ));
    };
    let grouped = group_params(&body);

    let mut acks = BTreeMap::new();
    for (name, values) in &grouped {
        match name.as_str() {
            wire::PARAM_CREATE_CHART => {
                for chart in values {
                    let ack = if chart.is_empty() {
                        warn!("refusing to create a chart with an empty name");
                        ACK_FAILURE
                    } else {
                        match buffer.create_chart(chart).await {
                            Ok(()) => ACK_SUCCESS,
                            Err(e) => {
                                warn!("create_chart '{chart}' refused: {e}");
                                ACK_FAILURE
                            }
                        }
                    };
                    acks.insert(wire::ack_key(wire::PARAM_CREATE_CHART, chart), ack);
                }
            }
            wire::PARAM_UPLOAD_DATA => {
                for value in values {
                    let uploads: Vec<UploadRequest> =
                        serde_json::from_str(value).map_err(|e| {
                            ApiError::bad_request(format!("malformed upload packet: {e}"))
                        })?;
                    for upload in uploads {
                        let ack = match buffer.upload(&upload.chart_name, &upload.packet).await {
                            Ok(stored) => {
                                info!("stored {stored} rows for '{}'", upload.chart_name);
                                ACK_SUCCESS
                            }
                            Err(e) => {
                                warn!("upload refused: {e}");
                                ACK_FAILURE
                            }
                        };
                        acks.insert(
                            wire::ack_key(wire::PARAM_UPLOAD_DATA, &upload.chart_name),
                            ack,
                        );
                    }
                }
            }
            other => warn!("ignoring unknown live parameter '{other}'"),
        }
    }
    Ok(Json(json!(acks)))
}

/// Configuration endpoint. Takes exactly one parameter per request.
async fn admin(
    State(state): State<Arc<ServerState>>,
    body: String,
) -> Result<Json<Value>, ApiError> {
    let grouped = group_params(&body);
    if grouped.len() != 1 {
        return Err(ApiError::bad_request(format!(
            "admin requests take exactly one parameter, got {}",
            grouped.len()
        )));
    }
    let (name, values) = match grouped.iter().next() {
        Some((name, values)) => (name.as_str(), values),
        None => return Err(ApiError::bad_request("admin requests take exactly one parameter")),
    };

    match name {
        wire::PARAM_IS_CONFIGURED => Ok(Json(json!({
            wire::KEY_CONFIGURATION_STATE: state.is_configured().await
        }))),
        wire::PARAM_SET_CONFIGURATION => {
            let value = values.first().map(String::as_str).unwrap_or_default();
            let config: SourceConfig = match serde_json::from_str(value) {
                Ok(config) => config,
                Err(e) => return Ok(Json(configuration_failure(&e.to_string()))),
            };
            match state.configure(&config).await {
                Ok(()) => Ok(Json(json!({ wire::KEY_CONFIGURATION_RESULT: true }))),
                Err(e) => Ok(Json(configuration_failure(&e.to_string()))),
            }
        }
        other => Err(ApiError::bad_request(format!(
            "unrecognized admin parameter '{other}'"
        ))),
    }
}

fn configuration_failure(message: &str) -> Value {
    json!({
        wire::KEY_CONFIGURATION_RESULT: false,
        wire::KEY_CONFIGURATION_ERROR: message,
    })
}

/// Decode the form body and group values under their parameter name.
fn group_params(body: &str) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in wire::parse_form(body) {
        grouped.entry(name).or_default().push(value);
    }
    grouped
}
