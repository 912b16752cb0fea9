//! Queue listing and count handlers.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use taskboard_models::{JobCounts, OverviewSnapshot, QueueName};
use tracing::debug;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Serialize)]
pub struct QueuesResponse {
    pub queues: Vec<QueueName>,
    pub count: usize,
}

/// List every queue in the namespace.
pub async fn list_queues(State(state): State<AppState>) -> ApiResult<Json<QueuesResponse>> {
    let queues = state.inspector.list_queues().await?;
    Ok(Json(QueuesResponse {
        count: queues.len(),
        queues,
    }))
}

#[derive(Serialize)]
pub struct OverviewResponse {
    pub queue_counts: OverviewSnapshot,
}

/// Per-state counts for every queue.
pub async fn get_overview(State(state): State<AppState>) -> ApiResult<Json<OverviewResponse>> {
    let queue_counts = state.inspector.overview().await?;
    debug!(queues = queue_counts.len(), "Built overview");
    Ok(Json(OverviewResponse { queue_counts }))
}

#[derive(Serialize)]
pub struct CountsResponse {
    pub counts: JobCounts,
}

/// Per-state counts for one queue.
pub async fn get_queue_counts(
    State(state): State<AppState>,
    Path(queue): Path<String>,
) -> ApiResult<Json<CountsResponse>> {
    let queue = QueueName::parse(queue)?;
    let counts = state.inspector.count_job_states(&queue).await?;
    Ok(Json(CountsResponse { counts }))
}
