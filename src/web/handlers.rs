//! HTTP request handlers

use super::state::AppState;
use crate::gateway::{
    ConnectionStatus, ErrorResponse, GatewayError, LanguageSummary, SearchRequest,
    SearchResponse, Status,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

/// Root endpoint body
#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub message: String,
    pub status: String,
    pub version: String,
    pub source: String,
    pub table: String,
}

/// Greeting body
#[derive(Debug, Serialize, Deserialize)]
pub struct HelloResponse {
    pub message: String,
}

/// Service status handler
pub async fn index(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: state.service_name().to_string(),
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        source: state.gateway.source_name().to_string(),
        table: state.gateway.options().table.clone(),
    })
}

/// Greeting handler
pub async fn hello(State(state): State<AppState>) -> Json<HelloResponse> {
    Json(HelloResponse {
        message: state.settings.general.greeting.clone(),
    })
}

/// Data source connection test
pub async fn test_connection(State(state): State<AppState>) -> Json<ConnectionStatus> {
    Json(state.gateway.health_check().await)
}

/// Language listing
pub async fn test_languages(
    State(state): State<AppState>,
) -> Result<Json<LanguageSummary>, GatewayError> {
    let summary = state.gateway.list_languages().await.map_err(|e| {
        tracing::error!("Database language test error: {}", e);
        e
    })?;
    Ok(Json(summary))
}

/// Search handler
pub async fn search(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, GatewayError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!("Rejected search body: {}", rejection.body_text());
        GatewayError::ValidationFailed(rejection.body_text())
    })?;

    match state.gateway.search(request).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            tracing::error!("Search error: {}", e);
            Err(e)
        }
    }
}

/// Unknown routes
pub async fn not_found() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            status: Status::Error,
            error: "not found".to_string(),
        }),
    )
}
