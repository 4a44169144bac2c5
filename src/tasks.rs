use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use tracing::instrument;

use crate::billing::ActorQuery;
use crate::gateway::StatusRow;
use crate::response::{ApiError, EnhancedResponse, MessageType};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/GetAllTasks", get(get_all_tasks))
        .route("/GetAllTaskStatus", get(get_all_task_status))
        .route("/AddTask", post(add_task))
        .route("/UpdateTask", put(update_task))
        .route("/DeleteTask/:task_id", delete(delete_task))
        .route("/GetAllTaskAssignments", get(get_all_task_assignments))
        .route("/AddTaskAssignment", post(add_task_assignment))
        .route("/UpdateTaskAssignment", put(update_task_assignment))
        .route("/DeleteTaskAssignment/:assignment_id", delete(delete_task_assignment))
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TaskRow {
    pub task_id: i32,
    pub task_name: String,
    pub description: Option<String>,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub priority: Option<String>,
    pub project_id: i32,
    pub project_name: String,
    pub task_status_id: Option<i32>,
    pub task_status: Option<String>,
    pub assigned_employees: Option<String>,
    pub total_hours_worked: Decimal,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusRow {
    pub task_status_id: i32,
    pub status_name: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TaskAssignmentRow {
    pub assignment_id: i32,
    pub task_id: i32,
    pub task_name: String,
    pub project_id: i32,
    pub project_name: String,
    pub employee_id: i32,
    pub employee_name: String,
    pub assigned_date: Date,
}

/// Task writes report a message and an integer success code rather than the
/// usual status row.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdateOutcome {
    pub message: String,
    pub success_code: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddTaskRequest {
    #[serde(rename = "ProjectID")]
    pub project_id: i32,
    #[serde(default)]
    pub task_name: String,
    pub description: Option<String>,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub priority: Option<String>,
    #[serde(rename = "TaskStatusID")]
    pub task_status_id: Option<i32>,
    #[serde(rename = "UserID", default = "default_actor")]
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateTaskRequest {
    #[serde(rename = "TaskID")]
    pub task_id: i32,
    #[serde(rename = "ProjectID", default)]
    pub project_id: i32,
    #[serde(default)]
    pub task_name: String,
    pub description: Option<String>,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub priority: Option<String>,
    #[serde(rename = "TaskStatusID")]
    pub task_status_id: Option<i32>,
    #[serde(rename = "UserID", default = "default_actor")]
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddTaskAssignmentRequest {
    #[serde(rename = "TaskID")]
    pub task_id: i32,
    #[serde(rename = "EmployeeID")]
    pub employee_id: i32,
    pub assigned_date: Option<Date>,
    #[serde(default)]
    pub force_assign: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateTaskAssignmentRequest {
    #[serde(rename = "AssignmentID")]
    pub assignment_id: i32,
    #[serde(rename = "TaskID")]
    pub task_id: i32,
    #[serde(rename = "EmployeeID")]
    pub employee_id: i32,
    pub assigned_date: Option<Date>,
}

fn default_actor() -> String {
    "SYSTEM".into()
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

fn outcome_reply(
    outcome: Option<TaskUpdateOutcome>,
) -> Result<(StatusCode, Json<TaskUpdateOutcome>), ApiError> {
    let Some(outcome) = outcome else {
        return Err(ApiError::internal("Database did not return a response."));
    };
    let status = if outcome.success_code == 1 {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    Ok((status, Json(outcome)))
}

#[instrument(skip(state))]
async fn get_all_tasks(State(state): State<AppState>) -> Result<Json<Vec<TaskRow>>, ApiError> {
    let rows = sqlx::query_as::<_, TaskRow>("SELECT * FROM pm.get_all_tasks()")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
async fn get_all_task_status(
    State(state): State<AppState>,
) -> Result<Json<Vec<TaskStatusRow>>, ApiError> {
    let rows = sqlx::query_as::<_, TaskStatusRow>("SELECT * FROM pm.get_all_task_status()")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(rows))
}

#[instrument(skip(state, payload))]
async fn add_task(
    State(state): State<AppState>,
    Json(payload): Json<AddTaskRequest>,
) -> Result<Json<Vec<EnhancedResponse>>, ApiError> {
    let rows = sqlx::query_as::<_, StatusRow>(
        "SELECT success, message_type, message, data \
         FROM pm.add_task($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(payload.project_id)
    .bind(&payload.task_name)
    .bind(&payload.description)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(&payload.priority)
    .bind(payload.task_status_id)
    .bind(&payload.user_id)
    .fetch_all(&state.db)
    .await?;
    Ok(status_list(rows))
}

#[instrument(skip(state, payload))]
async fn update_task(
    State(state): State<AppState>,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<(StatusCode, Json<TaskUpdateOutcome>), ApiError> {
    let outcome = sqlx::query_as::<_, TaskUpdateOutcome>(
        "SELECT message, success_code FROM pm.update_task($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(payload.task_id)
    .bind(&payload.task_name)
    .bind(&payload.description)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(&payload.priority)
    .bind(payload.task_status_id)
    .bind(&payload.user_id)
    .fetch_optional(&state.db)
    .await?;
    outcome_reply(outcome)
}

#[instrument(skip(state))]
async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<i32>,
    Query(actor): Query<ActorQuery>,
) -> Result<Json<Vec<EnhancedResponse>>, ApiError> {
    let rows = sqlx::query_as::<_, StatusRow>(
        "SELECT success, message_type, message, data FROM pm.delete_task($1, $2)",
    )
    .bind(task_id)
    .bind(&actor.user_id)
    .fetch_all(&state.db)
    .await?;
    Ok(status_list(rows))
}

#[instrument(skip(state))]
async fn get_all_task_assignments(
    State(state): State<AppState>,
) -> Result<Json<Vec<TaskAssignmentRow>>, ApiError> {
    let rows =
        sqlx::query_as::<_, TaskAssignmentRow>("SELECT * FROM pm.get_all_task_assignments()")
            .fetch_all(&state.db)
            .await?;
    Ok(Json(rows))
}

#[instrument(skip(state, payload))]
async fn add_task_assignment(
    State(state): State<AppState>,
    Json(payload): Json<AddTaskAssignmentRequest>,
) -> Result<Json<Vec<EnhancedResponse>>, ApiError> {
    // Missing assignment date means "assigned now"
    let assigned_date = payload
        .assigned_date
        .unwrap_or_else(|| OffsetDateTime::now_utc().date());

    let rows = sqlx::query_as::<_, StatusRow>(
        "SELECT success, message_type, message, data \
         FROM pm.add_task_assignment($1, $2, $3, $4)",
    )
    .bind(payload.task_id)
    .bind(payload.employee_id)
    .bind(assigned_date)
    .bind(payload.force_assign)
    .fetch_all(&state.db)
    .await?;
    Ok(status_list(rows))
}

#[instrument(skip(state, payload))]
async fn update_task_assignment(
    State(state): State<AppState>,
    Json(payload): Json<UpdateTaskAssignmentRequest>,
) -> Result<(StatusCode, Json<TaskUpdateOutcome>), ApiError> {
    let outcome = sqlx::query_as::<_, TaskUpdateOutcome>(
        "SELECT message, success_code FROM pm.update_task_assignment($1, $2, $3, $4)",
    )
    .bind(payload.assignment_id)
    .bind(payload.task_id)
    .bind(payload.employee_id)
    .bind(payload.assigned_date)
    .fetch_optional(&state.db)
    .await?;
    outcome_reply(outcome)
}

#[instrument(skip(state))]
async fn delete_task_assignment(
    State(state): State<AppState>,
    Path(assignment_id): Path<i32>,
    Query(actor): Query<ActorQuery>,
) -> Result<Json<Vec<EnhancedResponse>>, ApiError> {
    let rows = sqlx::query_as::<_, StatusRow>(
        "SELECT success, message_type, message, data FROM pm.delete_task_assignment($1, $2)",
    )
    .bind(assignment_id)
    .bind(&actor.user_id)
    .fetch_all(&state.db)
    .await?;
    Ok(status_list(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_update_success_code_decides_status() {
        let (status, _) = outcome_reply(Some(TaskUpdateOutcome {
            message: "Task updated.".into(),
            success_code: 1,
        }))
        .unwrap();
        assert_eq!(status, StatusCode::OK);

        let (status, _) = outcome_reply(Some(TaskUpdateOutcome {
            message: "Task not found.".into(),
            success_code: 0,
        }))
        .unwrap();
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert!(outcome_reply(None).is_err());
    }

    #[test]
    fn add_assignment_force_flag_defaults_off() {
        let req: AddTaskAssignmentRequest =
            serde_json::from_str(r#"{"TaskID":1,"EmployeeID":2}"#).unwrap();
        assert!(!req.force_assign);
        assert!(req.assigned_date.is_none());
    }
}
