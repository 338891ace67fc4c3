//! HTTP surface for the ledger-anchoring subsystem: a minimal demonstration
//! transport that decodes JSON requests into `register`/`verify` calls on a
//! [`LedgerSubsystem`] (SPEC_FULL §2 component 10; spec.md §1 "transport
//! that delivers transaction IDs...is out of scope" — this route is a thin
//! adapter, not a general ingestion framework). Wired the way
//! `apps/keeper`'s original health-check router was: `axum::Router` built
//! from plain handler functions, shared state via `Arc`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use ledger_core::{Digest, LedgerSubsystem, VerifyResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

pub mod config;

#[derive(Clone)]
pub struct AppState {
    pub subsystem: Arc<LedgerSubsystem>,
}

/// Build the axum router. Kept separate from `main` so integration tests can
/// mount it over an in-memory subsystem without spawning a real listener.
pub fn build_app(subsystem: Arc<LedgerSubsystem>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/register", post(register))
        .route("/verify", post(verify))
        .route("/enable", post(enable))
        .route("/disable", post(disable))
        .with_state(AppState { subsystem })
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Deserialize)]
pub struct TxRequest {
    pub asset_group_id: String,
    /// Hex-encoded 32-byte transaction ID (spec §6: "fixed-width binary
    /// IDs" — hex is just this transport's wire encoding of them).
    pub tx_id: String,
}

#[derive(Debug, Error, Serialize)]
pub enum DaemonError {
    #[error("tx_id must be 64 hex characters encoding 32 bytes: {0}")]
    BadTxId(String),
}

impl IntoResponse for DaemonError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

fn parse_tx_id(hex_str: &str) -> Result<Digest, DaemonError> {
    Digest::from_hex(hex_str).map_err(|e| DaemonError::BadTxId(e.to_string()))
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<TxRequest>,
) -> Result<StatusCode, DaemonError> {
    let tx_id = parse_tx_id(&req.tx_id)?;
    state.subsystem.register(&req.asset_group_id, tx_id);
    Ok(StatusCode::ACCEPTED)
}

async fn verify(
    State(state): State<AppState>,
    Json(req): Json<TxRequest>,
) -> Result<Json<VerifyResult>, DaemonError> {
    let tx_id = parse_tx_id(&req.tx_id)?;
    let result = state.subsystem.verify(&req.asset_group_id, tx_id).await;
    Ok(Json(result))
}

async fn enable(State(state): State<AppState>) -> StatusCode {
    state.subsystem.enable();
    StatusCode::OK
}

async fn disable(State(state): State<AppState>) -> StatusCode {
    state.subsystem.disable();
    StatusCode::OK
}
