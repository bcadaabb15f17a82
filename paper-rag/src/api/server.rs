//! API server for the QA service

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::AppConfig;
use crate::service::QaService;

use super::routes::{
    cache_stats, cleanup_cache, clear_cache, delete_paper, health_check, list_papers,
    paper_detail, paper_stats, popular_topics, query, query_history, upload_paper, AppState,
};

/// Configuration for the API server
pub struct ApiServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl From<&AppConfig> for ApiServerConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
        }
    }
}

/// API server
pub struct ApiServer {
    config: ApiServerConfig,
    service: AppState,
}

impl ApiServer {
    /// Create a new API server with configuration
    pub fn new(config: ApiServerConfig, service: Arc<QaService>) -> Self {
        Self { config, service }
    }

    /// Build the router for a service
    pub fn router(service: AppState) -> Router {
        Router::new()
            .route("/health", get(health_check))
            .route("/api/query", post(query))
            .route("/api/papers", get(list_papers).post(upload_paper))
            .route("/api/papers/:id", get(paper_detail).delete(delete_paper))
            .route("/api/papers/:id/stats", get(paper_stats))
            .route("/api/queries/history", get(query_history))
            .route("/api/analytics/popular", get(popular_topics))
            .route("/api/cache/stats", get(cache_stats))
            .route("/api/cache/clear", post(clear_cache))
            .route("/api/cache/cleanup", post(cleanup_cache))
            .with_state(service)
            // Add CORS layer
            .layer(CorsLayer::permissive())
    }

    /// Bind the configured address and serve until the process exits
    pub async fn start(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let cleanup = self.service.start_cache_cleanup();

        info!("Starting API server on {}", listener.local_addr()?);
        let result = axum::serve(listener, Self::router(self.service)).await;

        if let Some(handle) = cleanup {
            handle.abort();
        }
        result?;
        Ok(())
    }
}
