use axum::extract::{Path, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use tracing::instrument;

use crate::gateway::{parse_embedded_list, OutcomeRow, ResultSets, SqlParam};
use crate::response::{ApiError, SimpleResponse};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/clients", get(get_clients))
        .route("/dashboard/:client_id", get(get_client_dashboard))
        .route("/client-projects", get(get_client_projects))
        .route("/insert-client", post(insert_client))
        .route("/insert-client-project", post(insert_client_project))
        .route("/update-client", put(update_client))
        .route("/update-client-project", put(update_client_project))
        .route("/delete-client/:client_id", delete(delete_client))
        .route(
            "/delete-client-project/:client_project_id",
            delete(delete_client_project),
        )
        .route("/client-projects-by-id/:client_id", get(get_client_projects_by_id))
        .route("/client-issues/:client_id", get(get_client_issues))
        .route("/client-tasks/:client_id", get(get_client_tasks))
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ClientRow {
    pub client_id: i32,
    pub client_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ClientProjectRow {
    pub client_project_id: i32,
    pub client_id: i32,
    pub client_name: Option<String>,
    pub project_id: Option<i32>,
    pub project_name: Option<String>,
    pub employee_id: Option<i32>,
    pub employee_name: Option<String>,
    pub assigned_date: Option<Date>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DashboardProjectRow {
    pub client_project_id: Option<i32>,
    pub project_id: Option<i32>,
    pub project_name: Option<String>,
    pub project_description: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub status_id: Option<i32>,
    pub project_status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DashboardProjectCountsRow {
    pub total_projects: Option<i32>,
    pub planned_projects: Option<i32>,
    pub in_progress_projects: Option<i32>,
    pub completed_projects: Option<i32>,
    pub on_hold_projects: Option<i32>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DashboardIssueRow {
    pub issue_id: Option<i32>,
    pub client_project_id: Option<i32>,
    pub issue_title: Option<String>,
    pub issue_description: Option<String>,
    pub status: Option<String>,
    pub created_date: Option<OffsetDateTime>,
    pub resolved_date: Option<OffsetDateTime>,
    pub resolved_by_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DashboardIssueCountsRow {
    pub total_issues: Option<i32>,
    pub open_issues: Option<i32>,
    pub resolved_issues: Option<i32>,
}

/// Four result sets in fixed order: projects, project counts, issues,
/// issue counts.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDashboard {
    pub projects: Vec<DashboardProjectRow>,
    pub project_counts: DashboardProjectCountsRow,
    pub issues: Vec<DashboardIssueRow>,
    pub issue_counts: DashboardIssueCountsRow,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ClientProjectByIdRow {
    pub client_project_id: i32,
    pub client_id: i32,
    pub assigned_date: Option<Date>,
    pub project_id: i32,
    pub project_name: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub status_id: i32,
    pub project_status: Option<String>,
    #[serde(skip_serializing)]
    pub employees_json: Option<String>,
    #[sqlx(skip)]
    pub employees: Vec<ClientEmployee>,
}

/// Employee entry embedded as a JSON column on the project row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "PascalCase"))]
pub struct ClientEmployee {
    #[serde(rename(deserialize = "EmployeeID"))]
    pub employee_id: i32,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ClientIssueRow {
    pub issue_id: i32,
    pub client_project_id: i32,
    pub issue_title: String,
    pub issue_description: String,
    pub status: String,
    pub created_date: OffsetDateTime,
    pub resolved_date: Option<OffsetDateTime>,
    pub resolved_by_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ClientTaskRow {
    pub client_project_id: i32,
    pub client_id: i32,
    pub project_id: i32,
    pub project_name: Option<String>,
    pub project_assigned_date: Date,
    pub task_id: i32,
    pub task_name: Option<String>,
    pub description: Option<String>,
    pub start_date: Date,
    pub end_date: Date,
    pub priority: Option<String>,
    pub task_status: Option<String>,
    #[serde(skip_serializing)]
    pub assignments_json: Option<String>,
    #[sqlx(skip)]
    pub assignments: Vec<TaskAssignment>,
}

/// Assignment entry embedded as a JSON column on the task row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "PascalCase"))]
pub struct TaskAssignment {
    #[serde(rename(deserialize = "AssignmentID"))]
    pub assignment_id: i32,
    #[serde(rename(deserialize = "AssignedEmployeeID"))]
    pub assigned_employee_id: i32,
    pub assigned_employee_name: Option<String>,
    pub assigned_employee_email: Option<String>,
    pub task_assigned_date: Option<String>,
    pub due_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InsertClientRequest {
    pub client_name: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateClientRequest {
    #[serde(rename = "ClientID")]
    pub client_id: i32,
    pub client_name: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InsertClientProjectRequest {
    #[serde(rename = "ClientID")]
    pub client_id: Option<i32>,
    #[serde(rename = "ProjectID")]
    pub project_id: i32,
    #[serde(rename = "EmployeeID")]
    pub employee_id: i32,
    pub assigned_date: Option<Date>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateClientProjectRequest {
    #[serde(rename = "ClientProjectID")]
    pub client_project_id: i32,
    #[serde(rename = "ClientID")]
    pub client_id: i32,
    #[serde(rename = "ProjectID")]
    pub project_id: i32,
    #[serde(rename = "EmployeeID")]
    pub employee_id: i32,
    pub assigned_date: Option<Date>,
}

fn outcome_reply(row: OutcomeRow) -> Json<SimpleResponse> {
    Json(SimpleResponse {
        success: row.success,
        message: row.message,
    })
}

#[instrument(skip(state))]
async fn get_clients(State(state): State<AppState>) -> Result<Json<Vec<ClientRow>>, ApiError> {
    let rows = sqlx::query_as::<_, ClientRow>("SELECT * FROM pm.get_clients()")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
async fn get_client_dashboard(
    State(state): State<AppState>,
    Path(client_id): Path<i32>,
) -> Result<Json<ClientDashboard>, ApiError> {
    let mut sets = ResultSets::open(
        &state.db,
        "pm.get_client_dashboard",
        4,
        vec![SqlParam::Int(Some(client_id))],
    )
    .await?;

    let projects = sets.next_list::<DashboardProjectRow>().await?;
    let project_counts = sets
        .next_row::<DashboardProjectCountsRow>()
        .await?
        .unwrap_or_default();
    let issues = sets.next_list::<DashboardIssueRow>().await?;
    let issue_counts = sets
        .next_row::<DashboardIssueCountsRow>()
        .await?
        .unwrap_or_default();
    sets.finish().await?;

    Ok(Json(ClientDashboard {
        projects,
        project_counts,
        issues,
        issue_counts,
    }))
}

#[instrument(skip(state))]
async fn get_client_projects(
    State(state): State<AppState>,
) -> Result<Json<Vec<ClientProjectRow>>, ApiError> {
    let rows = sqlx::query_as::<_, ClientProjectRow>("SELECT * FROM pm.get_client_projects()")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(rows))
}

#[instrument(skip(state, payload))]
async fn insert_client(
    State(state): State<AppState>,
    Json(payload): Json<InsertClientRequest>,
) -> Result<Json<SimpleResponse>, ApiError> {
    let row = sqlx::query_as::<_, OutcomeRow>(
        "SELECT success, message FROM pm.insert_client($1, $2, $3)",
    )
    .bind(&payload.client_name)
    .bind(&payload.contact_email)
    .bind(&payload.contact_phone)
    .fetch_one(&state.db)
    .await?;
    Ok(outcome_reply(row))
}

#[instrument(skip(state, payload))]
async fn insert_client_project(
    State(state): State<AppState>,
    Json(payload): Json<InsertClientProjectRequest>,
) -> Result<Json<SimpleResponse>, ApiError> {
    let row = sqlx::query_as::<_, OutcomeRow>(
        "SELECT success, message FROM pm.insert_client_project($1, $2, $3, $4)",
    )
    .bind(payload.client_id)
    .bind(payload.project_id)
    .bind(payload.employee_id)
    .bind(payload.assigned_date)
    .fetch_one(&state.db)
    .await?;
    Ok(outcome_reply(row))
}

#[instrument(skip(state, payload))]
async fn update_client(
    State(state): State<AppState>,
    Json(payload): Json<UpdateClientRequest>,
) -> Result<Json<SimpleResponse>, ApiError> {
    let row = sqlx::query_as::<_, OutcomeRow>(
        "SELECT success, message FROM pm.update_client($1, $2, $3, $4)",
    )
    .bind(payload.client_id)
    .bind(&payload.client_name)
    .bind(&payload.contact_email)
    .bind(&payload.contact_phone)
    .fetch_one(&state.db)
    .await?;
    Ok(outcome_reply(row))
}

#[instrument(skip(state, payload))]
async fn update_client_project(
    State(state): State<AppState>,
    Json(payload): Json<UpdateClientProjectRequest>,
) -> Result<Json<SimpleResponse>, ApiError> {
    let row = sqlx::query_as::<_, OutcomeRow>(
        "SELECT success, message FROM pm.update_client_project($1, $2, $3, $4, $5)",
    )
    .bind(payload.client_project_id)
    .bind(payload.client_id)
    .bind(payload.project_id)
    .bind(payload.employee_id)
    .bind(payload.assigned_date)
    .fetch_one(&state.db)
    .await?;
    Ok(outcome_reply(row))
}

#[instrument(skip(state))]
async fn delete_client(
    State(state): State<AppState>,
    Path(client_id): Path<i32>,
) -> Result<Json<SimpleResponse>, ApiError> {
    let row =
        sqlx::query_as::<_, OutcomeRow>("SELECT success, message FROM pm.delete_client($1)")
            .bind(client_id)
            .fetch_one(&state.db)
            .await?;
    Ok(outcome_reply(row))
}

#[instrument(skip(state))]
async fn delete_client_project(
    State(state): State<AppState>,
    Path(client_project_id): Path<i32>,
) -> Result<Json<SimpleResponse>, ApiError> {
    let row = sqlx::query_as::<_, OutcomeRow>(
        "SELECT success, message FROM pm.delete_client_project($1)",
    )
    .bind(client_project_id)
    .fetch_one(&state.db)
    .await?;
    Ok(outcome_reply(row))
}

#[instrument(skip(state))]
async fn get_client_projects_by_id(
    State(state): State<AppState>,
    Path(client_id): Path<i32>,
) -> Result<Json<Vec<ClientProjectByIdRow>>, ApiError> {
    let mut rows = sqlx::query_as::<_, ClientProjectByIdRow>(
        "SELECT * FROM pm.get_client_projects_by_id($1)",
    )
    .bind(client_id)
    .fetch_all(&state.db)
    .await?;

    for row in &mut rows {
        row.employees = parse_embedded_list(row.employees_json.as_deref())?;
    }
    Ok(Json(rows))
}

#[instrument(skip(state))]
async fn get_client_issues(
    State(state): State<AppState>,
    Path(client_id): Path<i32>,
) -> Result<Json<Vec<ClientIssueRow>>, ApiError> {
    let rows = sqlx::query_as::<_, ClientIssueRow>("SELECT * FROM pm.get_client_issues($1)")
        .bind(client_id)
        .fetch_all(&state.db)
        .await?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
async fn get_client_tasks(
    State(state): State<AppState>,
    Path(client_id): Path<i32>,
) -> Result<Json<Vec<ClientTaskRow>>, ApiError> {
    let mut rows = sqlx::query_as::<_, ClientTaskRow>(
        "SELECT * FROM pm.get_client_tasks_with_assignments($1)",
    )
    .bind(client_id)
    .fetch_all(&state.db)
    .await?;

    for row in &mut rows {
        row.assignments = parse_embedded_list(row.assignments_json.as_deref())?;
    }
    Ok(Json(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_employees_deserialize_pascal_case() {
        let employees: Vec<ClientEmployee> =
            parse_embedded_list(Some(r#"[{"EmployeeID":1,"FullName":"A"}]"#)).unwrap();
        assert_eq!(employees.len(), 1);
        assert_eq!(employees[0].employee_id, 1);
        assert_eq!(employees[0].full_name.as_deref(), Some("A"));

        let none: Vec<ClientEmployee> = parse_embedded_list(None).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn embedded_employees_serialize_camel_case() {
        let employee = ClientEmployee {
            employee_id: 3,
            full_name: Some("B".into()),
            email: None,
            role: None,
        };
        let json = serde_json::to_string(&employee).unwrap();
        assert!(json.contains("\"employeeId\":3"));
        assert!(json.contains("\"fullName\":\"B\""));
    }

    #[test]
    fn embedded_assignments_accept_optional_due_date() {
        let raw = r#"[{"AssignmentID":9,"AssignedEmployeeID":4,
                       "AssignedEmployeeName":"C","AssignedEmployeeEmail":"c@x.com",
                       "TaskAssignedDate":"2024-05-01","DueDate":null}]"#;
        let assignments: Vec<TaskAssignment> = parse_embedded_list(Some(raw)).unwrap();
        assert_eq!(assignments[0].assignment_id, 9);
        assert!(assignments[0].due_date.is_none());
    }
}
