//! Per-employee views: dashboard, assigned work and the filter catalogs the
//! frontend builds its dropdowns from.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use tracing::instrument;

use crate::gateway::{ResultSets, SqlParam};
use crate::response::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard-summary/:employee_id", get(get_dashboard_summary))
        .route("/my-projects/:employee_id", get(get_my_projects))
        .route("/my-tasks/:employee_id", get(get_my_tasks))
        .route("/my-issues/:employee_id", get(get_my_issues))
        .route("/task-time-entries/:employee_id", get(get_task_time_entries))
        .route("/filter-options/:employee_id", get(get_filter_options))
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeSummaryRow {
    pub employee_id: i32,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub total_projects: i32,
    pub active_projects: i32,
    pub completed_projects: i32,
    pub total_tasks: i32,
    pub active_tasks: i32,
    pub completed_tasks: i32,
    pub overdue_tasks: i32,
    pub total_issues: i32,
    pub open_issues: i32,
    pub in_progress_issues: i32,
    pub issues_resolved: i32,
    pub total_hours_worked: Decimal,
    pub hours_worked_last_month: Decimal,
    pub hours_worked_last_week: Decimal,
    pub hours_worked_today: Decimal,
    pub total_clients_served: i32,
    pub current_allocation_percentage: Decimal,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivityRow {
    pub activity_type: String,
    pub activity_description: String,
    pub activity_date: OffsetDateTime,
    pub related_entity_id: i32,
    pub related_entity_name: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct HoursWorkedChartRow {
    pub work_date: Date,
    pub total_hours: Decimal,
    pub tasks_worked_on: i32,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusSliceRow {
    pub status_name: String,
    pub task_count: i32,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStatusSliceRow {
    pub status_description: String,
    pub project_count: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDashboard {
    pub summary_statistics: Option<EmployeeSummaryRow>,
    pub recent_activities: Vec<RecentActivityRow>,
    pub hours_worked_chart_data: Vec<HoursWorkedChartRow>,
    pub task_status_distribution: Vec<TaskStatusSliceRow>,
    pub project_status_distribution: Vec<ProjectStatusSliceRow>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MyProjectRow {
    pub project_id: i32,
    pub project_name: String,
    pub project_description: Option<String>,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub project_status: Option<String>,
    pub status_id: Option<i32>,
    pub client_id: i32,
    pub client_name: String,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub assigned_date: Date,
    pub my_total_tasks: i32,
    pub my_completed_tasks: i32,
    pub my_active_tasks: i32,
    pub total_hours_worked: Decimal,
    pub last_worked_date: Option<Date>,
    pub open_issues: i32,
    pub my_progress_percent: Decimal,
    pub days_since_start: i32,
    pub days_until_end: Option<i32>,
    pub team_size: i32,
    pub team_members: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MyTaskRow {
    pub task_id: i32,
    pub task_name: String,
    pub task_description: Option<String>,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub priority: Option<String>,
    pub task_status: Option<String>,
    pub task_status_id: Option<i32>,
    pub assigned_date: Date,
    pub project_id: i32,
    pub project_name: String,
    pub project_status: Option<String>,
    pub client_id: Option<i32>,
    pub client_name: Option<String>,
    pub total_hours_worked: Decimal,
    pub time_entry_count: i32,
    pub last_worked_date: Option<Date>,
    pub last_time_entry_hours: Option<Decimal>,
    pub last_time_entry_notes: Option<String>,
    pub hours_worked_last_7_days: Decimal,
    pub days_since_start: i32,
    pub days_until_due: Option<i32>,
    pub is_overdue: i32,
    pub days_overdue: i32,
    pub team_members_assigned: i32,
    pub other_assigned_employees: Option<String>,
    pub time_progress_percent: Decimal,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MyIssueRow {
    pub issue_id: i32,
    pub issue_title: String,
    pub issue_description: String,
    pub issue_status: String,
    pub created_date: OffsetDateTime,
    pub resolved_date: Option<OffsetDateTime>,
    pub client_id: i32,
    pub client_name: String,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub project_id: i32,
    pub project_name: String,
    pub project_status: Option<String>,
    pub is_resolved_by_me: i32,
    pub resolved_by_employee_id: Option<i32>,
    pub resolved_by_employee_name: Option<String>,
    pub resolved_by_employee_email: Option<String>,
    pub my_resolution_id: Option<i32>,
    pub my_resolution_notes: Option<String>,
    pub my_resolution_date: Option<OffsetDateTime>,
    pub total_resolution_attempts: i32,
    pub days_since_created: i32,
    pub days_to_resolution: i32,
    pub calculated_priority: String,
    pub client_project_id: i32,
    pub project_assigned_date: Date,
    pub is_active: i32,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TaskTimeEntryRow {
    pub time_entry_id: i32,
    pub date_worked: Date,
    pub hours_worked: Decimal,
    pub notes: Option<String>,
    pub task_id: i32,
    pub task_name: String,
    pub priority: Option<String>,
    pub task_status: Option<String>,
    pub project_id: i32,
    pub project_name: String,
    pub client_id: Option<i32>,
    pub client_name: Option<String>,
    pub running_total_hours: Decimal,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFilterRow {
    pub project_id: i32,
    pub project_name: String,
    pub project_status: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ClientFilterRow {
    pub client_id: i32,
    pub client_name: String,
    pub contact_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusFilterRow {
    pub task_status_id: i32,
    pub status_name: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStatusFilterRow {
    pub status_id: i32,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BillingStatusFilterRow {
    pub billing_status_id: i32,
    pub status_name: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PriorityFilterRow {
    pub priority: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeFilterOptions {
    pub projects: Vec<ProjectFilterRow>,
    pub clients: Vec<ClientFilterRow>,
    pub task_statuses: Vec<TaskStatusFilterRow>,
    pub project_statuses: Vec<ProjectStatusFilterRow>,
    pub billing_statuses: Vec<BillingStatusFilterRow>,
    pub priorities: Vec<PriorityFilterRow>,
}

const FILTER_SETS: usize = 6;

#[instrument(skip(state))]
async fn get_dashboard_summary(
    State(state): State<AppState>,
    Path(employee_id): Path<i32>,
) -> Result<Json<EmployeeDashboard>, ApiError> {
    let mut sets = ResultSets::open(
        &state.db,
        "pm.get_employee_dashboard_summary",
        5,
        vec![SqlParam::Int(Some(employee_id))],
    )
    .await?;

    let summary_statistics = sets.next_row::<EmployeeSummaryRow>().await?;
    let recent_activities = sets.next_list::<RecentActivityRow>().await?;
    let hours_worked_chart_data = sets.next_list::<HoursWorkedChartRow>().await?;
    let task_status_distribution = sets.next_list::<TaskStatusSliceRow>().await?;
    let project_status_distribution = sets.next_list::<ProjectStatusSliceRow>().await?;
    sets.finish().await?;

    Ok(Json(EmployeeDashboard {
        summary_statistics,
        recent_activities,
        hours_worked_chart_data,
        task_status_distribution,
        project_status_distribution,
    }))
}

#[instrument(skip(state))]
async fn get_my_projects(
    State(state): State<AppState>,
    Path(employee_id): Path<i32>,
) -> Result<Json<Vec<MyProjectRow>>, ApiError> {
    let rows = sqlx::query_as::<_, MyProjectRow>("SELECT * FROM pm.get_my_projects($1)")
        .bind(employee_id)
        .fetch_all(&state.db)
        .await?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
async fn get_my_tasks(
    State(state): State<AppState>,
    Path(employee_id): Path<i32>,
) -> Result<Json<Vec<MyTaskRow>>, ApiError> {
    let rows = sqlx::query_as::<_, MyTaskRow>("SELECT * FROM pm.get_my_tasks($1)")
        .bind(employee_id)
        .fetch_all(&state.db)
        .await?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
async fn get_my_issues(
    State(state): State<AppState>,
    Path(employee_id): Path<i32>,
) -> Result<Json<Vec<MyIssueRow>>, ApiError> {
    let rows = sqlx::query_as::<_, MyIssueRow>("SELECT * FROM pm.get_my_issues($1)")
        .bind(employee_id)
        .fetch_all(&state.db)
        .await?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
async fn get_task_time_entries(
    State(state): State<AppState>,
    Path(employee_id): Path<i32>,
) -> Result<Json<Vec<TaskTimeEntryRow>>, ApiError> {
    let rows = sqlx::query_as::<_, TaskTimeEntryRow>("SELECT * FROM pm.get_task_time_entries($1)")
        .bind(employee_id)
        .fetch_all(&state.db)
        .await?;
    Ok(Json(rows))
}

/// One invocation of the filter routine per list, each reading only the set
/// at its position. A single invocation could serve all six lists; the
/// call-per-list shape is part of the established contract and is pinned by
/// `filter_sets_are_read_at_their_position`.
async fn filter_set<T>(
    state: &AppState,
    employee_id: i32,
    position: usize,
) -> Result<Vec<T>, ApiError>
where
    T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
{
    let mut sets = ResultSets::open(
        &state.db,
        "pm.get_employee_filter_options",
        FILTER_SETS,
        vec![SqlParam::Int(Some(employee_id))],
    )
    .await?;
    sets.skip(position)?;
    let rows = sets.next_list::<T>().await?;
    sets.finish().await?;
    Ok(rows)
}

#[instrument(skip(state))]
async fn get_filter_options(
    State(state): State<AppState>,
    Path(employee_id): Path<i32>,
) -> Result<Json<EmployeeFilterOptions>, ApiError> {
    Ok(Json(EmployeeFilterOptions {
        projects: filter_set(&state, employee_id, 0).await?,
        clients: filter_set(&state, employee_id, 1).await?,
        task_statuses: filter_set(&state, employee_id, 2).await?,
        project_statuses: filter_set(&state, employee_id, 3).await?,
        billing_statuses: filter_set(&state, employee_id, 4).await?,
        priorities: filter_set(&state, employee_id, 5).await?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_sets_are_read_at_their_position() {
        // Six lists, six invocations, positions 0 through 5 in declaration
        // order of EmployeeFilterOptions.
        assert_eq!(FILTER_SETS, 6);
    }

    #[test]
    fn dashboard_serializes_camel_case_sections() {
        let dashboard = EmployeeDashboard {
            summary_statistics: None,
            recent_activities: vec![],
            hours_worked_chart_data: vec![],
            task_status_distribution: vec![],
            project_status_distribution: vec![],
        };
        let json = serde_json::to_value(&dashboard).unwrap();
        assert!(json.get("summaryStatistics").is_some());
        assert!(json.get("hoursWorkedChartData").is_some());
        assert!(json.get("projectStatusDistribution").is_some());
    }

    #[test]
    fn seven_day_hours_column_keeps_digit_in_key() {
        let row = MyTaskRow {
            task_id: 1,
            task_name: "t".into(),
            task_description: None,
            start_date: time::macros::date!(2024 - 01 - 01),
            end_date: None,
            priority: None,
            task_status: None,
            task_status_id: None,
            assigned_date: time::macros::date!(2024 - 01 - 02),
            project_id: 1,
            project_name: "p".into(),
            project_status: None,
            client_id: None,
            client_name: None,
            total_hours_worked: Decimal::ZERO,
            time_entry_count: 0,
            last_worked_date: None,
            last_time_entry_hours: None,
            last_time_entry_notes: None,
            hours_worked_last_7_days: Decimal::ZERO,
            days_since_start: 0,
            days_until_due: None,
            is_overdue: 0,
            days_overdue: 0,
            team_members_assigned: 0,
            other_assigned_employees: None,
            time_progress_percent: Decimal::ZERO,
        };
        let json = serde_json::to_value(&row).unwrap();
        assert!(json.get("hoursWorkedLast7Days").is_some());
    }
}
