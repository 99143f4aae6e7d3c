// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP server: router construction and lifecycle

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::http::Uri;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use super::ask::ask_handler;
use super::documents::upload_documents_handler;
use super::handlers::{health_handler, status_handler, version_handler};
use super::ui::index_handler;
use super::ApiError;
use crate::config::AppConfig;
use crate::rag::RagPipeline;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub listen_addr: String,
    /// Request body limit, applied to uploads
    pub max_upload_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            max_upload_bytes: 64 * 1024 * 1024,
        }
    }
}

impl From<&AppConfig> for ApiConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            listen_addr: config.listen_addr.clone(),
            max_upload_bytes: config.max_upload_bytes,
        }
    }
}

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RagPipeline>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(pipeline: Arc<RagPipeline>) -> Self {
        Self {
            pipeline,
            started_at: Instant::now(),
        }
    }
}

pub fn create_app(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/v1/status", get(status_handler))
        .route("/v1/version", get(version_handler))
        .route("/v1/documents", post(upload_documents_handler))
        .route("/v1/ask", post(ask_handler))
        .fallback(not_found_handler)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn not_found_handler(uri: Uri) -> Response {
    ApiError::NotFound(format!("No route for {}", uri.path())).into_response()
}

/// Running HTTP server
pub struct ApiServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ApiServer {
    /// Bind and start serving in the background
    pub async fn start(config: ApiConfig, pipeline: Arc<RagPipeline>) -> Result<Self> {
        let addr: SocketAddr = config
            .listen_addr
            .parse()
            .with_context(|| format!("Invalid listen address: {}", config.listen_addr))?;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        let actual_addr = listener.local_addr()?;

        let app = create_app(AppState::new(pipeline), config.max_upload_bytes);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let serve_future = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = serve_future.await {
                error!("HTTP server error: {}", e);
            }
        });

        info!("🌐 HTTP server listening on http://{}", actual_addr);

        Ok(Self {
            addr: actual_addr,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and wait for in-flight requests
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        info!("HTTP server stopped");
    }
}
