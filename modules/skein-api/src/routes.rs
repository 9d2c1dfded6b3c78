use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::auth::bearer_authorized;
use crate::AppState;

pub async fn health() -> &'static str {
    "ok"
}

/// Trigger one dispatcher batch. Authenticated with the shared trigger secret;
/// 401 on mismatch, 500 only on infrastructure failure.
pub async fn run_jobs(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if !bearer_authorized(&headers, &state.trigger_secret) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid trigger secret"})),
        )
            .into_response();
    }

    match state.dispatcher.run_batch().await {
        Ok((report, stats)) => Json(json!({
            "processed_jobs": report.processed,
            "completed": report.completed,
            "retried": report.retried,
            "failed": report.failed,
            "queue_stats": stats,
        }))
        .into_response(),
        Err(e) => {
            error!(error = %format!("{e:#}"), "Batch run failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "batch run failed"})),
            )
                .into_response()
        }
    }
}

#[derive(Deserialize)]
pub struct ConceptMapParams {
    /// Abstraction level 0-100; higher hides low-frequency concepts.
    #[serde(default)]
    pub level: u8,
    /// Optional name substring filter.
    pub q: Option<String>,
}

/// Concept map for the visualization layer.
pub async fn concept_map(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<ConceptMapParams>,
) -> Response {
    match state
        .reader
        .concept_map(user_id, params.level, params.q.as_deref())
        .await
    {
        Ok(map) => Json(map).into_response(),
        Err(e) => {
            error!(error = %e, %user_id, "Concept map query failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "concept map query failed"})),
            )
                .into_response()
        }
    }
}
