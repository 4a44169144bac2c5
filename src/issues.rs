use axum::extract::{Path, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use tracing::instrument;

use crate::gateway::OutcomeRow;
use crate::response::{ApiError, SimpleResponse};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/GetAll", get(get_all_issues))
        .route("/Insert", post(insert_issue))
        .route("/Update", put(update_issue))
        .route("/Delete/:issue_id", delete(delete_issue))
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct IssueRow {
    pub issue_id: Option<i32>,
    pub client_project_id: Option<i32>,
    pub client_name: Option<String>,
    pub project_name: Option<String>,
    pub issue_title: Option<String>,
    pub issue_description: Option<String>,
    pub resolved_by: Option<String>,
    pub status: Option<String>,
    pub created_date: Option<OffsetDateTime>,
    pub resolved_date: Option<OffsetDateTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InsertIssueRequest {
    #[serde(rename = "ClientProjectID")]
    pub client_project_id: i32,
    #[serde(default)]
    pub issue_title: String,
    #[serde(default)]
    pub issue_description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateIssueRequest {
    #[serde(rename = "IssueID")]
    pub issue_id: i32,
    #[serde(rename = "ClientProjectID")]
    pub client_project_id: i32,
    #[serde(default)]
    pub issue_title: String,
    #[serde(default)]
    pub issue_description: String,
    #[serde(default)]
    pub status: String,
    pub resolved_date: Option<Date>,
}

fn outcome_reply(row: OutcomeRow) -> Json<SimpleResponse> {
    Json(SimpleResponse {
        success: row.success,
        message: row.message,
    })
}

#[instrument(skip(state))]
async fn get_all_issues(State(state): State<AppState>) -> Result<Json<Vec<IssueRow>>, ApiError> {
    let rows = sqlx::query_as::<_, IssueRow>("SELECT * FROM pm.get_issues()")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(rows))
}

#[instrument(skip(state, payload))]
async fn insert_issue(
    State(state): State<AppState>,
    Json(payload): Json<InsertIssueRequest>,
) -> Result<Json<SimpleResponse>, ApiError> {
    let row = sqlx::query_as::<_, OutcomeRow>(
        "SELECT success, message FROM pm.insert_issue($1, $2, $3)",
    )
    .bind(payload.client_project_id)
    .bind(&payload.issue_title)
    .bind(&payload.issue_description)
    .fetch_one(&state.db)
    .await?;
    Ok(outcome_reply(row))
}

#[instrument(skip(state, payload))]
async fn update_issue(
    State(state): State<AppState>,
    Json(payload): Json<UpdateIssueRequest>,
) -> Result<Json<SimpleResponse>, ApiError> {
    let row = sqlx::query_as::<_, OutcomeRow>(
        "SELECT success, message FROM pm.update_issue($1, $2, $3, $4, $5, $6)",
    )
    .bind(payload.issue_id)
    .bind(payload.client_project_id)
    .bind(&payload.issue_title)
    .bind(&payload.issue_description)
    .bind(&payload.status)
    .bind(payload.resolved_date)
    .fetch_one(&state.db)
    .await?;
    Ok(outcome_reply(row))
}

#[instrument(skip(state))]
async fn delete_issue(
    State(state): State<AppState>,
    Path(issue_id): Path<i32>,
) -> Result<Json<SimpleResponse>, ApiError> {
    let row = sqlx::query_as::<_, OutcomeRow>("SELECT success, message FROM pm.delete_issue($1)")
        .bind(issue_id)
        .fetch_one(&state.db)
        .await?;
    Ok(outcome_reply(row))
}
