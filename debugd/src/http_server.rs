//! HTTP surface of the ingestion daemon.
//!
//! The path is never inspected; every path dispatches on method. GET
//! reports status, OPTIONS answers browser preflights, POST runs the
//! parse-stamp-append pipeline. Every response, including errors, carries
//! the permissive CORS headers so browser scripts can talk to the daemon
//! from any origin.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Extension, Request},
    http::{header, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use bytes::Bytes;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::sink::{self, IngestError, LogSink};

#[derive(Clone)]
pub struct AppState {
    config: Arc<ServerConfig>,
    sink: Arc<LogSink>,
}

impl AppState {
    pub fn new(config: Arc<ServerConfig>, sink: Arc<LogSink>) -> Self {
        Self { config, sink }
    }
}

/// Uniform request-boundary error: every pipeline failure becomes a 400
/// with the error text in the body, mirroring the success content type.
struct ApiError(IngestError);

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::debug!("rejected log entry: {}", self.0);
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .fallback_service(get(status).post(ingest).options(preflight))
        .layer(Extension(state))
        .layer(middleware::from_fn(apply_cors))
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(
    listener: TcpListener,
    config: Arc<ServerConfig>,
    sink: Arc<LogSink>,
) -> Result<()> {
    let addr = listener
        .local_addr()
        .context("Failed to read bound address")?;
    info!("debugd listening on {addr}");

    let router = build_router(AppState::new(config, sink));

    axum::serve(listener, Router::into_make_service(router))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server encountered an unrecoverable error")?;

    info!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {err}");
    }
}

async fn apply_cors(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}

async fn status(Extension(state): Extension<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "log_dir": state.config.log_dir.display().to_string(),
    }))
}

async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn ingest(
    Extension(state): Extension<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let (session, fields) = sink::parse_entry(&body)?;
    let entry = sink::stamp(fields);
    let path = state.sink.append(&session, &entry)?;

    info!("[{session}] {}", sink::preview(&entry));

    Ok((
        StatusCode::OK,
        Json(json!({ "ok": true, "log_file": path.display().to_string() })),
    )
        .into_response())
}
