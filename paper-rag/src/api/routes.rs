//! API routes for the QA server

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use paper_cache::DocumentId;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use crate::models::{NewPaper, QueryRequest};
use crate::service::{QaService, ServiceError};

/// Application state
pub type AppState = Arc<QaService>;

/// Health check response
#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub cache_enabled: bool,
}

/// Result of an administrative cache action
#[derive(Serialize, Deserialize)]
pub struct CacheActionResponse {
    pub message: String,
    pub enabled: bool,
    pub removed_count: usize,
}

#[derive(Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Query history paging parameters
#[derive(Deserialize)]
pub struct HistoryQuery {
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

/// Popular topics parameters
#[derive(Deserialize)]
pub struct PopularQuery {
    pub limit: Option<usize>,
}

/// Service error rendered as `{"error": ...}` with a matching status
pub struct ApiError(ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            ServiceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::PaperNotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {:#}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Health check endpoint
pub async fn health_check(State(service): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cache_enabled: service.cache_enabled(),
    })
}

/// Answer a question about the uploaded papers
pub async fn query(
    State(service): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = service.ask(request).await?;
    Ok(Json(response))
}

pub async fn list_papers(State(service): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(service.list_papers().await?))
}

/// Add a paper; every cached answer is dropped
pub async fn upload_paper(
    State(service): State<AppState>,
    Json(paper): Json<NewPaper>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = service.upload(paper).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

pub async fn paper_detail(
    State(service): State<AppState>,
    Path(paper_id): Path<DocumentId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(service.get_paper(paper_id).await?))
}

/// Query count, confidence and topics for one paper
pub async fn paper_stats(
    State(service): State<AppState>,
    Path(paper_id): Path<DocumentId>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(service.paper_stats(paper_id).await?))
}

/// Logged queries, newest first
pub async fn query_history(
    State(service): State<AppState>,
    Query(params): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let history = service
        .query_history(params.skip.unwrap_or(0), params.limit.unwrap_or(50))
        .await?;
    Ok(Json(history))
}

pub async fn popular_topics(
    State(service): State<AppState>,
    Query(params): Query<PopularQuery>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(service.popular_topics(params.limit.unwrap_or(10)).await?))
}

/// Delete a paper; cached answers citing it are dropped
pub async fn delete_paper(
    State(service): State<AppState>,
    Path(paper_id): Path<DocumentId>,
) -> Result<impl IntoResponse, ApiError> {
    service.delete(paper_id).await?;
    Ok(Json(MessageResponse {
        message: format!("Paper {} deleted successfully", paper_id),
    }))
}

pub async fn cache_stats(State(service): State<AppState>) -> impl IntoResponse {
    Json(service.cache_stats().await)
}

pub async fn clear_cache(State(service): State<AppState>) -> impl IntoResponse {
    let removed_count = service.clear_cache().await;
    Json(CacheActionResponse {
        message: "Cache cleared successfully".to_string(),
        enabled: service.cache_enabled(),
        removed_count,
    })
}

pub async fn cleanup_cache(State(service): State<AppState>) -> impl IntoResponse {
    let removed_count = service.cleanup_cache().await;
    Json(CacheActionResponse {
        message: format!("Removed {} expired entries", removed_count),
        enabled: service.cache_enabled(),
        removed_count,
    })
}
