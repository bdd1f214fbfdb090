//! HTTP surface: one read-only listing route plus a liveness probe.

use crate::cache::{CachedOperators, OperatorCache};
use crate::models::OperatorRecord;
use crate::scraper::error::ScrapeError;
use anyhow::Result;
use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

/// Body of `GET /api/operators`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum OperatorsResponse {
    Success {
        success: bool,
        count: usize,
        data: Arc<Vec<OperatorRecord>>,
        cached: bool,
    },
    Failure {
        success: bool,
        message: String,
        error: String,
    },
}

impl OperatorsResponse {
    pub fn from_result(result: Result<CachedOperators, ScrapeError>) -> (StatusCode, Self) {
        match result {
            Ok(snapshot) => (
                StatusCode::OK,
                OperatorsResponse::Success {
                    success: true,
                    count: snapshot.operators.len(),
                    data: snapshot.operators,
                    cached: snapshot.cached,
                },
            ),
            Err(e) => {
                error!("Failed to fetch tour operators: {}", e);
                let status = match &e {
                    ScrapeError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                    _ => StatusCode::BAD_GATEWAY,
                };
                (
                    status,
                    OperatorsResponse::Failure {
                        success: false,
                        message: "Failed to fetch tour operators".to_string(),
                        error: e.to_string(),
                    },
                )
            }
        }
    }
}

pub fn build_app(cache: Arc<OperatorCache>) -> Router {
    Router::new()
        .route("/api/operators", get(get_operators))
        .route("/health", get(health))
        .with_state(cache)
}

async fn get_operators(State(cache): State<Arc<OperatorCache>>) -> impl IntoResponse {
    let (status, body) = OperatorsResponse::from_result(cache.get_operators().await);
    (status, Json(body))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn serve(cache: Arc<OperatorCache>, bind: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, build_app(cache))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal, stopping server");
}
