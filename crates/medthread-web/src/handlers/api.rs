//! JSON form of the pipeline.

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::pipeline::PipelineOutcome;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct ThreadRequest {
    pub query: String,
}

/// `200` with the report, or `422` with `{"error": "<message>"}`.
pub async fn api_thread(
    State(state): State<SharedState>,
    Json(payload): Json<ThreadRequest>,
) -> Response {
    match state.pipeline.run(&payload.query).await {
        PipelineOutcome::Completed(report) => Json(report).into_response(),
        PipelineOutcome::Rejected(reason) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": reason.to_string() })),
        )
            .into_response(),
    }
}
