use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use tracing::instrument;

use crate::gateway::{parse_embedded_list, ResultSets, SqlParam, StatusRow};
use crate::response::{failed_reply, ApiError, EnhancedResponse, MessageType};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/add-project", post(add_project))
        .route("/get-project-by-id/:id", get(get_project_by_id))
        .route("/get-all-projects", get(get_all_projects))
        .route("/update-project/:id", put(update_project))
        .route("/delete-project/:id", delete(delete_project))
        .route("/:id/dependencies", get(check_project_dependencies))
        .route("/:id/summary", get(get_project_summary))
        .route("/CompleteProject/:project_id", put(complete_project))
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRow {
    pub project_id: i32,
    pub project_name: String,
    pub description: Option<String>,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub status_id: Option<i32>,
    pub created_date: OffsetDateTime,
    pub modified_date: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDependenciesRow {
    pub project_id: i32,
    pub project_name: String,
    pub task_count: i32,
    pub budget_count: i32,
    pub billing_count: i32,
    pub resource_allocation_count: i32,
    pub portfolio_assignment_count: i32,
    pub time_entry_count: i32,
    pub task_assignment_count: i32,
    pub cost_item_count: i32,
    pub deletion_recommendation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all(serialize = "camelCase", deserialize = "PascalCase"))]
pub struct ClientSummary {
    #[serde(rename(deserialize = "ClientID"))]
    pub client_id: i32,
    pub client_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub assigned_employee: Option<String>,
    pub assigned_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "PascalCase"))]
pub struct TaskSummary {
    #[serde(rename(deserialize = "TaskID"))]
    pub task_id: i32,
    pub task_name: Option<String>,
    pub task_description: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub priority: Option<String>,
    pub task_status: Option<String>,
    pub assigned_employees: Option<String>,
    pub total_hours_worked: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "PascalCase"))]
pub struct IssueSummary {
    #[serde(rename(deserialize = "IssueID"))]
    pub issue_id: i32,
    pub issue_title: Option<String>,
    pub issue_description: Option<String>,
    pub issue_status: Option<String>,
    pub created_date: Option<String>,
    pub resolved_date: Option<String>,
    pub client_name: Option<String>,
    pub resolved_by: Option<String>,
    pub resolution_notes: Option<String>,
    pub last_resolution_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "PascalCase"))]
pub struct ResourceSummary {
    #[serde(rename(deserialize = "AllocationID"))]
    pub allocation_id: i32,
    #[serde(rename(deserialize = "EmployeeID"))]
    pub employee_id: i32,
    pub employee_name: Option<String>,
    pub employee_email: Option<String>,
    pub employee_role: Option<String>,
    pub project_role: Option<String>,
    pub allocation_percentage: Option<Decimal>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub total_hours_worked: Option<Decimal>,
    pub tasks_assigned: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "PascalCase"))]
pub struct BillingSummary {
    #[serde(rename(deserialize = "BillingID"))]
    pub billing_id: i32,
    pub invoice_number: Option<String>,
    pub billing_name: Option<String>,
    pub amount: Option<Decimal>,
    pub billing_date: Option<String>,
    pub due_date: Option<String>,
    pub billing_status: Option<String>,
}

/// Single-row summary with five JSON-encoded sub-lists. The raw columns are
/// parsed after the row materializes and never reach the response body.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummaryRow {
    pub success: bool,
    pub message: Option<String>,
    pub project_id: i32,
    pub project_name: Option<String>,
    pub project_description: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub project_status: Option<String>,
    pub budget_id: Option<i32>,
    pub estimated_cost: Option<Decimal>,
    pub actual_cost: Option<Decimal>,
    pub variance: Option<Decimal>,
    pub budget_status: Option<String>,
    pub budget_approved_date: Option<Date>,
    pub total_tasks: i32,
    pub completed_tasks: i32,
    pub total_issues: i32,
    pub open_issues: i32,
    pub total_clients: i32,
    pub total_resources: i32,
    pub total_billed: Decimal,
    #[serde(skip_serializing)]
    pub clients_list: Option<String>,
    #[serde(skip_serializing)]
    pub tasks_list: Option<String>,
    #[serde(skip_serializing)]
    pub issues_list: Option<String>,
    #[serde(skip_serializing)]
    pub resources_list: Option<String>,
    #[serde(skip_serializing)]
    pub billings_list: Option<String>,
    #[sqlx(skip)]
    pub clients: Vec<ClientSummary>,
    #[sqlx(skip)]
    pub tasks: Vec<TaskSummary>,
    #[sqlx(skip)]
    pub issues: Vec<IssueSummary>,
    #[sqlx(skip)]
    pub resources: Vec<ResourceSummary>,
    #[sqlx(skip)]
    pub billings: Vec<BillingSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateProjectRequest {
    pub project_name: String,
    pub description: Option<String>,
    pub start_date: Date,
    pub end_date: Option<Date>,
    #[serde(rename = "UserID", default = "default_actor")]
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateProjectRequest {
    pub project_name: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    #[serde(rename = "StatusID")]
    pub status_id: Option<i32>,
    #[serde(rename = "UserID", default = "default_actor")]
    pub user_id: String,
}

fn default_actor() -> String {
    "SYSTEM".into()
}

fn enhanced(row: StatusRow) -> EnhancedResponse {
    EnhancedResponse {
        success: row.success,
        message_type: MessageType::parse(&row.message_type),
        message: row.message,
        data: row.data,
    }
}

/// Project writes answer 200 on success and 400 on any reported failure,
/// regardless of severity.
fn write_reply(row: Option<StatusRow>) -> (StatusCode, Json<EnhancedResponse>) {
    match row {
        Some(row) => {
            let status = if row.success {
                StatusCode::OK
            } else {
                StatusCode::BAD_REQUEST
            };
            (status, Json(enhanced(row)))
        }
        None => failed_reply("Failed to execute project operation"),
    }
}

#[instrument(skip(state, payload))]
async fn add_project(
    State(state): State<AppState>,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<EnhancedResponse>), ApiError> {
    let row = sqlx::query_as::<_, StatusRow>(
        "SELECT success, message_type, message, data \
         FROM pm.add_project($1, $2, $3, $4, $5)",
    )
    .bind(&payload.project_name)
    .bind(&payload.description)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(&payload.user_id)
    .fetch_optional(&state.db)
    .await?;
    Ok(write_reply(row))
}

#[instrument(skip(state))]
async fn get_project_by_id(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    let mut sets = ResultSets::open(
        &state.db,
        "pm.get_project_by_id",
        2,
        vec![SqlParam::Int(Some(id))],
    )
    .await?;
    let project = sets.next_row::<ProjectRow>().await?;
    let status = sets.next_row::<StatusRow>().await?;
    sets.finish().await?;

    if let Some(status) = status {
        match MessageType::parse(&status.message_type) {
            MessageType::Warning => {
                return Ok((StatusCode::NOT_FOUND, Json(enhanced(status))).into_response());
            }
            MessageType::Error => {
                return Ok((StatusCode::BAD_REQUEST, Json(enhanced(status))).into_response());
            }
            MessageType::Info => {}
        }
    }
    Ok(Json(project).into_response())
}

#[instrument(skip(state))]
async fn get_all_projects(State(state): State<AppState>) -> Result<Response, ApiError> {
    let mut sets = ResultSets::open(&state.db, "pm.get_all_projects", 2, vec![]).await?;
    let projects = sets.next_list::<ProjectRow>().await?;
    let status = sets.next_row::<StatusRow>().await?;
    sets.finish().await?;

    if let Some(status) = status {
        if !status.success {
            return Ok((StatusCode::BAD_REQUEST, Json(enhanced(status))).into_response());
        }
    }
    Ok(Json(projects).into_response())
}

#[instrument(skip(state, payload))]
async fn update_project(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateProjectRequest>,
) -> Result<(StatusCode, Json<EnhancedResponse>), ApiError> {
    let row = sqlx::query_as::<_, StatusRow>(
        "SELECT success, message_type, message, data \
         FROM pm.update_project($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(id)
    .bind(&payload.project_name)
    .bind(&payload.description)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.status_id)
    .bind(&payload.user_id)
    .fetch_optional(&state.db)
    .await?;
    Ok(write_reply(row))
}

#[instrument(skip(state))]
async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<(StatusCode, Json<EnhancedResponse>), ApiError> {
    let row = sqlx::query_as::<_, StatusRow>(
        "SELECT success, message_type, message, data FROM pm.delete_project($1)",
    )
    .bind(id)
    .fetch_optional(&state.db)
    .await?;
    Ok(write_reply(row))
}

#[instrument(skip(state))]
async fn check_project_dependencies(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ProjectDependenciesRow>, ApiError> {
    let row = sqlx::query_as::<_, ProjectDependenciesRow>(
        "SELECT * FROM pm.check_project_dependencies($1)",
    )
    .bind(id)
    .fetch_optional(&state.db)
    .await?;

    row.map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Project with ID {id} not found.")))
}

#[instrument(skip(state))]
async fn get_project_summary(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<(StatusCode, Json<ProjectSummaryRow>), ApiError> {
    let row = sqlx::query_as::<_, ProjectSummaryRow>(
        "SELECT * FROM pm.get_project_details_by_id($1)",
    )
    .bind(id)
    .fetch_optional(&state.db)
    .await?;

    let Some(mut row) = row else {
        return Err(ApiError::not_found(format!(
            "Project with ID {id} not found."
        )));
    };
    if !row.success {
        return Ok((StatusCode::NOT_FOUND, Json(row)));
    }

    row.clients = parse_embedded_list(row.clients_list.as_deref())?;
    row.tasks = parse_embedded_list(row.tasks_list.as_deref())?;
    row.issues = parse_embedded_list(row.issues_list.as_deref())?;
    row.resources = parse_embedded_list(row.resources_list.as_deref())?;
    row.billings = parse_embedded_list(row.billings_list.as_deref())?;

    Ok((StatusCode::OK, Json(row)))
}

#[instrument(skip(state))]
async fn complete_project(
    State(state): State<AppState>,
    Path(project_id): Path<i32>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let message: String = sqlx::query_scalar(
        "SELECT output_message FROM pm.change_project_status_to_completed($1)",
    )
    .bind(project_id)
    .fetch_one(&state.db)
    .await?;

    // The routine signals refusal through its message text
    Ok(Json(json!({
        "success": !message.starts_with("Cannot"),
        "message": message,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_reply_maps_success_to_ok() {
        let (status, _) = write_reply(Some(StatusRow {
            success: true,
            message_type: "INFO".into(),
            message: "Project created.".into(),
            data: None,
        }));
        assert_eq!(status, StatusCode::OK);

        let (status, _) = write_reply(Some(StatusRow {
            success: false,
            message_type: "ERROR".into(),
            message: "Invalid dates.".into(),
            data: None,
        }));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = write_reply(None);
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn summary_sub_lists_parse_from_embedded_json() {
        let clients: Vec<ClientSummary> = parse_embedded_list(Some(
            r#"[{"ClientID":4,"ClientName":"Acme","ContactEmail":"ops@acme.test"}]"#,
        ))
        .unwrap();
        assert_eq!(clients[0].client_id, 4);
        assert_eq!(clients[0].client_name.as_deref(), Some("Acme"));
        assert!(clients[0].assigned_employee.is_none());
    }

    #[test]
    fn summary_raw_columns_stay_out_of_the_body() {
        let row = ProjectSummaryRow {
            success: true,
            message: None,
            project_id: 1,
            project_name: Some("P".into()),
            project_description: None,
            start_date: None,
            end_date: None,
            project_status: None,
            budget_id: None,
            estimated_cost: None,
            actual_cost: None,
            variance: None,
            budget_status: None,
            budget_approved_date: None,
            total_tasks: 0,
            completed_tasks: 0,
            total_issues: 0,
            open_issues: 0,
            total_clients: 0,
            total_resources: 0,
            total_billed: Decimal::ZERO,
            clients_list: Some("[]".into()),
            tasks_list: None,
            issues_list: None,
            resources_list: None,
            billings_list: None,
            clients: vec![],
            tasks: vec![],
            issues: vec![],
            resources: vec![],
            billings: vec![],
        };
        let json = serde_json::to_value(&row).unwrap();
        assert!(json.get("clientsList").is_none());
        assert!(json.get("clients").is_some());
        assert!(json.get("totalBilled").is_some());
    }

    #[test]
    fn completion_refusal_is_signaled_by_message_prefix() {
        let refusal = "Cannot complete project with open tasks.";
        assert!(refusal.starts_with("Cannot"));
        let ok = "Project marked as completed.";
        assert!(!ok.starts_with("Cannot"));
    }
}
