//! Admin HTTP API — health check and Prometheus scrape endpoint.
//!
//! Endpoints:
//!   GET /health  — 200 OK, for load balancer health checks
//!   GET /metrics — Prometheus exposition format of the whole registry

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use prometheus::{Encoder, Registry, TextEncoder};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::error::Result;

/// Shared state for admin endpoints.
#[derive(Clone)]
pub struct AdminState {
    pub registry: Registry,
}

impl AdminState {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }
}

pub fn router(state: AdminState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Bind `addr` and serve the admin API until the server fails.
pub async fn serve(state: AdminState, addr: &str) -> Result<()> {
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %addr, error = %e, "failed to bind admin port");
            return Err(e.into());
        }
    };
    run(listener, state).await
}

/// Serve the admin API on an already-bound listener.
pub async fn run(listener: TcpListener, state: AdminState) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "admin API");
    }
    if let Err(e) = axum::serve(listener, router(state)).await {
        error!(error = %e, "admin server error");
        return Err(e.into());
    }
    Ok(())
}

// ─── GET /health ─────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    (StatusCode::OK, [("content-type", "application/json")], r#"{"status":"ok"}"#)
}

// ─── GET /metrics ────────────────────────────────────────────────────────────

async fn metrics(State(state): State<AdminState>) -> Response {
    let families = state.registry.gather();
    let encoder = TextEncoder::new();
    let mut out = Vec::with_capacity(2048);

    if let Err(e) = encoder.encode(&families, &mut out) {
        error!(error = %e, "metrics encoding failed");
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        out,
    )
        .into_response()
}
