use axum::extract::{Path, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use tracing::instrument;

use crate::gateway::StatusRow;
use crate::response::{ApiError, EnhancedResponse, MessageType, SimpleResponse};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/GetAll", get(get_all_resolutions))
        .route("/Add", post(add_resolution))
        .route("/Update/:id", put(update_resolution))
        .route("/Delete/:id", delete(delete_resolution))
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct IssueResolutionRow {
    pub resolution_id: i32,
    pub issue_id: i32,
    pub issue_title: Option<String>,
    pub employee_id: i32,
    pub full_name: Option<String>,
    pub resolution_notes: Option<String>,
    pub resolution_date: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IssueResolutionRequest {
    #[serde(rename = "IssueID", default)]
    pub issue_id: i32,
    #[serde(rename = "EmployeeID")]
    pub employee_id: i32,
    pub resolution_notes: Option<String>,
}

#[instrument(skip(state))]
async fn get_all_resolutions(
    State(state): State<AppState>,
) -> Result<Json<Vec<IssueResolutionRow>>, ApiError> {
    let rows =
        sqlx::query_as::<_, IssueResolutionRow>("SELECT * FROM pm.get_all_issue_resolutions()")
            .fetch_all(&state.db)
            .await?;
    Ok(Json(rows))
}

#[instrument(skip(state, payload))]
async fn add_resolution(
    State(state): State<AppState>,
    Json(payload): Json<IssueResolutionRequest>,
) -> Result<Json<EnhancedResponse>, ApiError> {
    let row = sqlx::query_as::<_, StatusRow>(
        "SELECT success, message_type, message, data \
         FROM pm.add_issue_resolution($1, $2, $3)",
    )
    .bind(payload.issue_id)
    .bind(payload.employee_id)
    .bind(&payload.resolution_notes)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(EnhancedResponse {
        success: row.success,
        message_type: MessageType::parse(&row.message_type),
        message: row.message,
        data: row.data,
    }))
}

#[instrument(skip(state, payload))]
async fn update_resolution(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<IssueResolutionRequest>,
) -> Result<Json<SimpleResponse>, ApiError> {
    let message = sqlx::query_scalar::<_, String>(
        "SELECT message FROM pm.update_issue_resolution($1, $2, $3)",
    )
    .bind(id)
    .bind(&payload.resolution_notes)
    .bind(payload.employee_id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(SimpleResponse {
        success: true,
        message,
    }))
}

#[instrument(skip(state))]
async fn delete_resolution(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<EnhancedResponse>, ApiError> {
    let row = sqlx::query_as::<_, StatusRow>(
        "SELECT success, message_type, message, data FROM pm.delete_issue_resolution($1)",
    )
    .bind(id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(EnhancedResponse {
        success: row.success,
        message_type: MessageType::parse(&row.message_type),
        message: row.message,
        data: row.data,
    }))
}
