use axum::extract::{Path, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::Date;
use tracing::instrument;

use crate::gateway::OutcomeRow;
use crate::response::{ApiError, SimpleResponse};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/GetAll", get(get_all_milestones))
        .route("/Insert", post(insert_milestone))
        .route("/Update", put(update_milestone))
        .route("/Delete/:milestone_id", delete(delete_milestone))
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneRow {
    pub milestone_id: i32,
    pub project_id: i32,
    pub project_name: String,
    pub milestone_name: String,
    pub description: String,
    pub due_date: Date,
    pub completion_date: Option<Date>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InsertMilestoneRequest {
    #[serde(rename = "ProjectID")]
    pub project_id: i32,
    #[serde(default)]
    pub milestone_name: String,
    #[serde(default)]
    pub description: String,
    pub due_date: Date,
    pub completion_date: Option<Date>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateMilestoneRequest {
    #[serde(rename = "MilestoneID")]
    pub milestone_id: i32,
    #[serde(rename = "ProjectID")]
    pub project_id: i32,
    #[serde(default)]
    pub milestone_name: String,
    #[serde(default)]
    pub description: String,
    pub due_date: Date,
    pub completion_date: Option<Date>,
}

fn outcome_reply(row: OutcomeRow) -> Json<SimpleResponse> {
    Json(SimpleResponse {
        success: row.success,
        message: row.message,
    })
}

#[instrument(skip(state))]
async fn get_all_milestones(
    State(state): State<AppState>,
) -> Result<Json<Vec<MilestoneRow>>, ApiError> {
    let rows = sqlx::query_as::<_, MilestoneRow>("SELECT * FROM pm.get_milestones()")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(rows))
}

#[instrument(skip(state, payload))]
async fn insert_milestone(
    State(state): State<AppState>,
    Json(payload): Json<InsertMilestoneRequest>,
) -> Result<Json<SimpleResponse>, ApiError> {
    let row = sqlx::query_as::<_, OutcomeRow>(
        "SELECT success, message FROM pm.insert_milestone($1, $2, $3, $4, $5)",
    )
    .bind(payload.project_id)
    .bind(&payload.milestone_name)
    .bind(&payload.description)
    .bind(payload.due_date)
    .bind(payload.completion_date)
    .fetch_one(&state.db)
    .await?;
    Ok(outcome_reply(row))
}

#[instrument(skip(state, payload))]
async fn update_milestone(
    State(state): State<AppState>,
    Json(payload): Json<UpdateMilestoneRequest>,
) -> Result<Json<SimpleResponse>, ApiError> {
    let row = sqlx::query_as::<_, OutcomeRow>(
        "SELECT success, message FROM pm.update_milestone($1, $2, $3, $4, $5, $6)",
    )
    .bind(payload.milestone_id)
    .bind(payload.project_id)
    .bind(&payload.milestone_name)
    .bind(&payload.description)
    .bind(payload.due_date)
    .bind(payload.completion_date)
    .fetch_one(&state.db)
    .await?;
    Ok(outcome_reply(row))
}

#[instrument(skip(state))]
async fn delete_milestone(
    State(state): State<AppState>,
    Path(milestone_id): Path<i32>,
) -> Result<Json<SimpleResponse>, ApiError> {
    let row =
        sqlx::query_as::<_, OutcomeRow>("SELECT success, message FROM pm.delete_milestone($1)")
            .bind(milestone_id)
            .fetch_one(&state.db)
            .await?;
    Ok(outcome_reply(row))
}
