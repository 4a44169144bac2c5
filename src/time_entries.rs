use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::Date;
use tracing::instrument;

use crate::billing::ActorQuery;
use crate::gateway::StatusRow;
use crate::response::{ApiError, EnhancedResponse, MessageType};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/GetAllTimeEntries", get(get_all_time_entries))
        .route("/GetCompletedTimeEntries", get(get_completed_time_entries))
        .route("/GetTimeEntriesByProject/:project_id", get(get_time_entries_by_project))
        .route("/AddTimeEntry", post(add_time_entry))
        .route("/UpdateTimeEntry", put(update_time_entry))
        .route("/DeleteTimeEntry/:time_entry_id", delete(delete_time_entry))
        .route("/MarkTaskCompleted", post(mark_task_completed))
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntryRow {
    pub time_entry_id: i32,
    pub task_id: i32,
    pub task_name: String,
    pub employee_id: i32,
    pub employee_name: String,
    pub date_worked: Date,
    pub hours_worked: Decimal,
    pub notes: Option<String>,
    pub project_id: i32,
    pub project_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddTimeEntryRequest {
    #[serde(rename = "TaskID")]
    pub task_id: i32,
    #[serde(rename = "EmployeeID")]
    pub employee_id: i32,
    pub date_worked: Date,
    pub hours_worked: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateTimeEntryRequest {
    #[serde(rename = "TimeEntryID")]
    pub time_entry_id: i32,
    pub date_worked: Date,
    pub hours_worked: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MarkTaskCompletedRequest {
    #[serde(rename = "TaskID")]
    pub task_id: i32,
}

fn status_list(rows: Vec<StatusRow>) -> Json<Vec<EnhancedResponse>> {
    Json(
        rows.into_iter()
            .map(|row| EnhancedResponse {
                success: row.success,
                message_type: MessageType::parse(&row.message_type),
                message: row.message,
                data: row.data,
            })
            .collect(),
    )
}

#[instrument(skip(state))]
async fn get_all_time_entries(
    State(state): State<AppState>,
) -> Result<Json<Vec<TimeEntryRow>>, ApiError> {
    let rows = sqlx::query_as::<_, TimeEntryRow>("SELECT * FROM pm.get_all_time_entries()")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
async fn get_completed_time_entries(
    State(state): State<AppState>,
) -> Result<Json<Vec<TimeEntryRow>>, ApiError> {
    let rows = sqlx::query_as::<_, TimeEntryRow>("SELECT * FROM pm.get_completed_time_entries()")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
async fn get_time_entries_by_project(
    State(state): State<AppState>,
    Path(project_id): Path<i32>,
) -> Result<Json<Vec<TimeEntryRow>>, ApiError> {
    let rows =
        sqlx::query_as::<_, TimeEntryRow>("SELECT * FROM pm.get_time_entries_by_project($1)")
            .bind(project_id)
            .fetch_all(&state.db)
            .await?;
    Ok(Json(rows))
}

#[instrument(skip(state, payload))]
async fn add_time_entry(
    State(state): State<AppState>,
    Json(payload): Json<AddTimeEntryRequest>,
) -> Result<Json<Vec<EnhancedResponse>>, ApiError> {
    let rows = sqlx::query_as::<_, StatusRow>(
        "SELECT success, message_type, message, data \
         FROM pm.add_time_entry($1, $2, $3, $4, $5)",
    )
    .bind(payload.task_id)
    .bind(payload.employee_id)
    .bind(payload.date_worked)
    .bind(payload.hours_worked)
    .bind(&payload.notes)
    .fetch_all(&state.db)
    .await?;
    Ok(status_list(rows))
}

#[instrument(skip(state, payload))]
async fn update_time_entry(
    State(state): State<AppState>,
    Json(payload): Json<UpdateTimeEntryRequest>,
) -> Result<Json<Vec<EnhancedResponse>>, ApiError> {
    let rows = sqlx::query_as::<_, StatusRow>(
        "SELECT success, message_type, message, data \
         FROM pm.update_time_entry($1, $2, $3, $4)",
    )
    .bind(payload.time_entry_id)
    .bind(payload.date_worked)
    .bind(payload.hours_worked)
    .bind(&payload.notes)
    .fetch_all(&state.db)
    .await?;
    Ok(status_list(rows))
}

#[instrument(skip(state))]
async fn delete_time_entry(
    State(state): State<AppState>,
    Path(time_entry_id): Path<i32>,
    Query(actor): Query<ActorQuery>,
) -> Result<Json<Vec<EnhancedResponse>>, ApiError> {
    let rows = sqlx::query_as::<_, StatusRow>(
        "SELECT success, message_type, message, data FROM pm.delete_time_entry($1, $2)",
    )
    .bind(time_entry_id)
    .bind(&actor.user_id)
    .fetch_all(&state.db)
    .await?;
    Ok(status_list(rows))
}

#[instrument(skip(state, payload))]
async fn mark_task_completed(
    State(state): State<AppState>,
    Json(payload): Json<MarkTaskCompletedRequest>,
) -> Result<Json<Vec<EnhancedResponse>>, ApiError> {
    if payload.task_id <= 0 {
        return Err(ApiError::bad_request("Invalid TaskID."));
    }

    let rows = sqlx::query_as::<_, StatusRow>(
        "SELECT success, message_type, message, data FROM pm.mark_task_completed($1)",
    )
    .bind(payload.task_id)
    .fetch_all(&state.db)
    .await?;
    Ok(status_list(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_time_entry_body_deserializes() {
        let req: AddTimeEntryRequest = serde_json::from_str(
            r#"{"TaskID":3,"EmployeeID":7,"DateWorked":"2024-05-10","HoursWorked":"6.5","Notes":"Design review"}"#,
        )
        .unwrap();
        assert_eq!(req.task_id, 3);
        assert_eq!(req.hours_worked, Decimal::new(65, 1));
        assert_eq!(req.notes.as_deref(), Some("Design review"));
    }

    #[test]
    fn mark_task_completed_rejects_non_positive_id() {
        let req: MarkTaskCompletedRequest = serde_json::from_str(r#"{"TaskID":0}"#).unwrap();
        assert!(req.task_id <= 0);
    }
}
