//! HTTP and WebSocket API.
//!
//! REST endpoints under `/api` for the operator UI, plus a push-only
//! WebSocket at `/ws` that streams `devices` and `whitelist` snapshots.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use lanwatch_core::{Device, HardwareId};
use lanwatch_whitelist::{JsonFileStore, Whitelist};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::MonitorConfig;
use crate::engine::DiscoveryEngine;
use crate::enforce::{EnforcementReport, EnforcementTarget, Enforcer};
use crate::error::MonitorError;
use crate::hub::BroadcastHub;
use crate::normalize::Normalizer;
use crate::platform::Platform;
use crate::reconcile::AlertSink;
use crate::resolve::NameResolver;
use crate::scheduler::ScanScheduler;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub scheduler: ScanScheduler,
    pub whitelist: Whitelist,
    pub hub: BroadcastHub,
    pub enforcer: Arc<Enforcer>,
    pub platform: Arc<dyn Platform>,
}

impl AppState {
    /// Wire every component from configuration.
    pub fn build(
        config: &MonitorConfig,
        platform: Arc<dyn Platform>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        let hub = BroadcastHub::new(config.observer_buffer);
        let whitelist = Whitelist::open_with_listener(
            JsonFileStore::new(&config.whitelist_path),
            Arc::new(hub.clone()),
        );

        let engine = DiscoveryEngine::new(
            platform.clone(),
            Normalizer::new(config.subnet),
            NameResolver::new(platform.clone(), config.resolve_timeout()),
            whitelist.clone(),
            config.discovery_timeout(),
        );
        let scheduler = ScanScheduler::new(engine, hub.clone(), alerts, config.scan_interval());
        let enforcer = Arc::new(Enforcer::new(
            platform.clone(),
            whitelist.clone(),
            config.interface.clone(),
        ));

        Self {
            scheduler,
            whitelist,
            hub,
            enforcer,
            platform,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/scan", get(scan))
        .route("/api/whitelist", get(list_whitelist).post(add_whitelist))
        .route("/api/whitelist/:mac", delete(remove_whitelist))
        .route("/api/disconnect", post(disconnect))
        .route("/api/hotspot-status", get(hotspot_status))
        .route("/api/turn-on-hotspot", post(turn_on_hotspot))
        .route("/ws", get(ws_upgrade))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Errors ────────────────────────────────────────────────────────

/// Error response: `{"success": false, "error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<MonitorError> for ApiError {
    fn from(e: MonitorError) -> Self {
        match e {
            MonitorError::Validation(msg) => Self::bad_request(msg),
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<lanwatch_whitelist::StoreError> for ApiError {
    fn from(e: lanwatch_whitelist::StoreError) -> Self {
        tracing::error!(error = %e, "Whitelist write failed");
        Self::internal("Failed to update whitelist")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "success": false, "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

// ── Scan ──────────────────────────────────────────────────────────

async fn scan(State(state): State<AppState>) -> Result<Json<Vec<Device>>, ApiError> {
    let devices = state.scheduler.scan_now().await.map_err(|e| {
        tracing::warn!(error = %e, "On-demand scan failed");
        ApiError::internal(format!("Failed to scan network: {e}"))
    })?;
    Ok(Json(devices.to_vec()))
}

// ── Whitelist ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct WhitelistRequest {
    mac: Option<String>,
}

#[derive(Debug, Serialize)]
struct WhitelistResponse {
    success: bool,
    whitelist: Vec<HardwareId>,
}

async fn list_whitelist(State(state): State<AppState>) -> Json<Vec<HardwareId>> {
    Json(state.whitelist.snapshot())
}

async fn add_whitelist(
    State(state): State<AppState>,
    body: Option<Json<WhitelistRequest>>,
) -> Result<Json<WhitelistResponse>, ApiError> {
    let mac = body
        .and_then(|Json(req)| req.mac)
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("MAC address required"))?;

    let id = HardwareId::canonicalize(&mac);
    mutate_whitelist(&state, move |whitelist| whitelist.add(&id)).await
}

async fn remove_whitelist(
    State(state): State<AppState>,
    Path(mac): Path<String>,
) -> Result<Json<WhitelistResponse>, ApiError> {
    if mac.trim().is_empty() {
        return Err(ApiError::bad_request("MAC address required"));
    }

    let id = HardwareId::canonicalize(&mac);
    mutate_whitelist(&state, move |whitelist| whitelist.remove(&id)).await
}

/// Apply a mutation on the blocking pool, since it rewrites the file.
/// Observers are notified by the whitelist itself.
async fn mutate_whitelist<F>(
    state: &AppState,
    mutation: F,
) -> Result<Json<WhitelistResponse>, ApiError>
where
    F: FnOnce(&Whitelist) -> lanwatch_whitelist::Result<bool> + Send + 'static,
{
    let whitelist = state.whitelist.clone();
    tokio::task::spawn_blocking(move || mutation(&whitelist))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Whitelist mutation aborted");
            ApiError::internal("Internal server error")
        })??;

    Ok(Json(WhitelistResponse {
        success: true,
        whitelist: state.whitelist.snapshot(),
    }))
}

// ── Enforcement ───────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct DisconnectRequest {
    ip: Option<String>,
    mac: Option<String>,
}

async fn disconnect(
    State(state): State<AppState>,
    body: Option<Json<DisconnectRequest>>,
) -> Result<Json<EnforcementReport>, ApiError> {
    let request = body.map(|Json(req)| req).unwrap_or_default();
    let target = EnforcementTarget::from_request(request.ip.as_deref(), request.mac.as_deref())?;

    // The sequence runs to completion even if the client goes away.
    let enforcer = state.enforcer.clone();
    let report = tokio::spawn(async move { enforcer.disconnect(&target).await })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Disconnect sequence aborted");
            ApiError::internal("Internal server error")
        })?;

    Ok(Json(report))
}

// ── Hotspot passthroughs ──────────────────────────────────────────

/// Failures answer with a bare `{error}` body.
async fn hotspot_status(State(state): State<AppState>) -> Response {
    match state.platform.hotspot_status().await {
        Ok(enabled) => Json(json!({ "isHotspotEnabled": enabled })).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Hotspot status check failed");
            let body = json!({ "error": "Failed to check hotspot status" });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

async fn turn_on_hotspot(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    state.platform.start_hotspot().await.map_err(|e| {
        tracing::warn!(error = %e, "Starting hotspot failed");
        ApiError::internal("Failed to start hotspot")
    })?;
    Ok(Json(json!({ "success": true })))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "observers": state.hub.observer_count() }))
}

// ── Real-time channel ─────────────────────────────────────────────

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| observe(socket, state.hub))
}

/// Forward hub events to one socket until either side goes away.
async fn observe(mut socket: WebSocket, hub: BroadcastHub) {
    let mut subscription = hub.subscribe();

    loop {
        tokio::select! {
            event = subscription.recv() => {
                let Some(event) = event else { break };
                let text = match serde_json::to_string(&*event) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to serialize push event");
                        continue;
                    }
                };
                if let Err(e) = socket.send(Message::Text(text)).await {
                    tracing::debug!(observer_id = %subscription.id(), error = %e, "Observer send failed");
                    break;
                }
            }
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Push-only channel: anything the client sends is ignored.
                Some(Ok(_)) => {}
            },
        }
    }
}
