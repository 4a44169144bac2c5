//! Read-only reporting endpoints. Each report is one routine; the `format`
//! query picks the rendering. JSON is the raw row list, CSV prepends the
//! company letterhead. Spreadsheet and PDF rendering are not offered here,
//! those requests are refused rather than silently served as JSON.

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use tracing::instrument;

use crate::company_profile::{fetch_company_profile, CompanyProfileRow};
use crate::response::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/GetAllBillingSummary", get(get_billing_summary))
        .route("/GetAllBudgetVsActual", get(get_budget_vs_actual))
        .route("/GetAllIssues", get(get_issues_report))
        .route("/GetAllProjectSummary", get(get_project_summary_report))
        .route("/GetAllEmployeeTimesheets", get(get_employee_timesheets))
        .route("/GetAllClientProjectAssignments", get(get_client_project_assignments))
        .route("/GetAllEmployeeWorkload", get(get_employee_workload))
        .route("/GetAllRevenueByClient", get(get_revenue_by_client))
}

#[derive(Debug, Deserialize)]
pub struct FormatQuery {
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_format() -> String {
    "json".into()
}

const FALLBACK_COMPANY_NAME: &str = "NECOR PSL Software";

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BillingSummaryRow {
    pub invoice_number: Option<String>,
    pub project_name: Option<String>,
    pub billing_name: Option<String>,
    pub amount: Option<Decimal>,
    pub billing_status: Option<String>,
    pub billing_date: Date,
    pub due_date: Option<Date>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BudgetVsActualRow {
    pub project_name: Option<String>,
    pub estimated_cost: Option<Decimal>,
    pub actual_cost: Option<Decimal>,
    pub variance: Option<Decimal>,
    pub budget_status: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct IssuesReportRow {
    pub issue_id: Option<i32>,
    pub project_name: Option<String>,
    pub issue_title: Option<String>,
    pub status: Option<String>,
    pub created_date: Option<Date>,
    pub resolved_date: Option<Date>,
    pub resolved_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummaryReportRow {
    pub project_id: Option<i32>,
    pub project_name: Option<String>,
    pub project_status: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub client_name: Option<String>,
    pub estimated_cost: Option<Decimal>,
    pub actual_cost: Option<Decimal>,
    pub total_billed: Option<Decimal>,
    pub total_tasks: Option<i32>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeTimesheetRow {
    pub full_name: Option<String>,
    pub project_name: Option<String>,
    pub task_name: Option<String>,
    pub date_worked: Option<Date>,
    pub hours_worked: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ClientProjectReportRow {
    pub client_name: Option<String>,
    pub project_name: Option<String>,
    pub assigned_employee: Option<String>,
    pub assigned_date: Option<Date>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeWorkloadReportRow {
    pub employee_name: Option<String>,
    pub number_of_projects: Option<i32>,
    pub tasks_assigned: Option<i32>,
    pub total_hours_worked: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RevenueByClientRow {
    pub client_name: Option<String>,
    pub total_billing: Option<Decimal>,
    pub period: Option<String>,
}

/// Column order for CSV output: legacy export header paired with the JSON
/// key the value serializes under.
type Columns = &'static [(&'static str, &'static str)];

const BILLING_COLUMNS: Columns = &[
    ("InvoiceNumber", "invoiceNumber"),
    ("ProjectName", "projectName"),
    ("BillingName", "billingName"),
    ("Amount", "amount"),
    ("BillingStatus", "billingStatus"),
    ("BillingDate", "billingDate"),
    ("DueDate", "dueDate"),
];

const BUDGET_VS_ACTUAL_COLUMNS: Columns = &[
    ("ProjectName", "projectName"),
    ("EstimatedCost", "estimatedCost"),
    ("ActualCost", "actualCost"),
    ("Variance", "variance"),
    ("BudgetStatus", "budgetStatus"),
];

const ISSUES_COLUMNS: Columns = &[
    ("IssueID", "issueId"),
    ("ProjectName", "projectName"),
    ("IssueTitle", "issueTitle"),
    ("Status", "status"),
    ("CreatedDate", "createdDate"),
    ("ResolvedDate", "resolvedDate"),
    ("ResolvedBy", "resolvedBy"),
];

const PROJECT_SUMMARY_COLUMNS: Columns = &[
    ("ProjectID", "projectId"),
    ("ProjectName", "projectName"),
    ("ProjectStatus", "projectStatus"),
    ("StartDate", "startDate"),
    ("EndDate", "endDate"),
    ("ClientName", "clientName"),
    ("EstimatedCost", "estimatedCost"),
    ("ActualCost", "actualCost"),
    ("TotalBilled", "totalBilled"),
    ("TotalTasks", "totalTasks"),
];

const TIMESHEET_COLUMNS: Columns = &[
    ("FullName", "fullName"),
    ("ProjectName", "projectName"),
    ("TaskName", "taskName"),
    ("DateWorked", "dateWorked"),
    ("HoursWorked", "hoursWorked"),
    ("Notes", "notes"),
];

const CLIENT_PROJECT_COLUMNS: Columns = &[
    ("ClientName", "clientName"),
    ("ProjectName", "projectName"),
    ("AssignedEmployee", "assignedEmployee"),
    ("AssignedDate", "assignedDate"),
];

const WORKLOAD_COLUMNS: Columns = &[
    ("EmployeeName", "employeeName"),
    ("NumberOfProjects", "numberOfProjects"),
    ("TasksAssigned", "tasksAssigned"),
    ("TotalHoursWorked", "totalHoursWorked"),
];

const REVENUE_COLUMNS: Columns = &[
    ("ClientName", "clientName"),
    ("TotalBilling", "totalBilling"),
    ("Period", "period"),
];

fn csv_cell(value: &serde_json::Value) -> String {
    let text = match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    // Commas are stripped rather than quoted, keeping the legacy layout
    text.replace(',', "")
}

fn render_csv<T: Serialize>(
    rows: &[T],
    file_name: &str,
    columns: Columns,
    profile: Option<&CompanyProfileRow>,
) -> Result<String, ApiError> {
    let mut out = String::new();

    let company_name = profile
        .map(|p| p.company_name.as_str())
        .unwrap_or(FALLBACK_COMPANY_NAME);
    out.push_str(&format!("Company: {company_name}\n"));
    if let Some(profile) = profile {
        if !profile.motto.trim().is_empty() {
            out.push_str(&format!("Motto: {}\n", profile.motto));
        }
        if !profile.company_email.trim().is_empty() {
            out.push_str(&format!("Email: {}\n", profile.company_email));
        }
    }
    out.push_str(&format!("Report: {file_name}\n"));

    let stamp_format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let stamp = OffsetDateTime::now_utc()
        .format(&stamp_format)
        .map_err(|_| ApiError::internal("Failed to format report timestamp."))?;
    out.push_str(&format!("Created On: {stamp}\n\n"));

    out.push_str(&columns.iter().map(|(h, _)| *h).collect::<Vec<_>>().join(","));
    out.push('\n');

    for row in rows {
        let value = serde_json::to_value(row)
            .map_err(|_| ApiError::internal("Failed to render report row."))?;
        let line = columns
            .iter()
            .map(|(_, key)| csv_cell(value.get(*key).unwrap_or(&serde_json::Value::Null)))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

async fn report_response<T: Serialize>(
    state: &AppState,
    rows: Vec<T>,
    format: &str,
    file_name: &str,
    columns: Columns,
) -> Result<Response, ApiError> {
    match format.to_ascii_lowercase().as_str() {
        "csv" => {
            let profile = fetch_company_profile(&state.db).await?;
            let body = render_csv(&rows, file_name, columns, profile.as_ref())?;
            Ok((
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/csv".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{file_name}.csv\""),
                    ),
                ],
                body,
            )
                .into_response())
        }
        "excel" | "pdf" => Err(ApiError::bad_request(format!(
            "Report format '{format}' is not supported."
        ))),
        _ => Ok(Json(rows).into_response()),
    }
}

async fn fetch_report<T>(state: &AppState, proc: &str) -> Result<Vec<T>, ApiError>
where
    T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
{
    let sql = format!("SELECT * FROM {proc}()");
    Ok(sqlx::query_as::<_, T>(&sql).fetch_all(&state.db).await?)
}

#[instrument(skip(state))]
async fn get_billing_summary(
    State(state): State<AppState>,
    Query(query): Query<FormatQuery>,
) -> Result<Response, ApiError> {
    let rows: Vec<BillingSummaryRow> = fetch_report(&state, "pm.get_billing_report").await?;
    report_response(&state, rows, &query.format, "BillingReport", BILLING_COLUMNS).await
}

#[instrument(skip(state))]
async fn get_budget_vs_actual(
    State(state): State<AppState>,
    Query(query): Query<FormatQuery>,
) -> Result<Response, ApiError> {
    let rows: Vec<BudgetVsActualRow> =
        fetch_report(&state, "pm.get_budget_vs_actual_report").await?;
    report_response(
        &state,
        rows,
        &query.format,
        "BudgetVsActualReport",
        BUDGET_VS_ACTUAL_COLUMNS,
    )
    .await
}

#[instrument(skip(state))]
async fn get_issues_report(
    State(state): State<AppState>,
    Query(query): Query<FormatQuery>,
) -> Result<Response, ApiError> {
    let rows: Vec<IssuesReportRow> = fetch_report(&state, "pm.get_issue_tracking_report").await?;
    report_response(
        &state,
        rows,
        &query.format,
        "IssueTrackingReport",
        ISSUES_COLUMNS,
    )
    .await
}

#[instrument(skip(state))]
async fn get_project_summary_report(
    State(state): State<AppState>,
    Query(query): Query<FormatQuery>,
) -> Result<Response, ApiError> {
    let rows: Vec<ProjectSummaryReportRow> =
        fetch_report(&state, "pm.get_project_summary_report").await?;
    report_response(
        &state,
        rows,
        &query.format,
        "ProjectSummaryReport",
        PROJECT_SUMMARY_COLUMNS,
    )
    .await
}

#[instrument(skip(state))]
async fn get_employee_timesheets(
    State(state): State<AppState>,
    Query(query): Query<FormatQuery>,
) -> Result<Response, ApiError> {
    let rows: Vec<EmployeeTimesheetRow> =
        fetch_report(&state, "pm.get_employee_timesheet_report").await?;
    report_response(
        &state,
        rows,
        &query.format,
        "EmployeeTimesheetReport",
        TIMESHEET_COLUMNS,
    )
    .await
}

#[instrument(skip(state))]
async fn get_client_project_assignments(
    State(state): State<AppState>,
    Query(query): Query<FormatQuery>,
) -> Result<Response, ApiError> {
    let rows: Vec<ClientProjectReportRow> =
        fetch_report(&state, "pm.get_client_project_report").await?;
    report_response(
        &state,
        rows,
        &query.format,
        "ClientProjectReport",
        CLIENT_PROJECT_COLUMNS,
    )
    .await
}

#[instrument(skip(state))]
async fn get_employee_workload(
    State(state): State<AppState>,
    Query(query): Query<FormatQuery>,
) -> Result<Response, ApiError> {
    let rows: Vec<EmployeeWorkloadReportRow> =
        fetch_report(&state, "pm.get_employee_workload_report").await?;
    report_response(
        &state,
        rows,
        &query.format,
        "EmployeeWorkloadReport",
        WORKLOAD_COLUMNS,
    )
    .await
}

#[instrument(skip(state))]
async fn get_revenue_by_client(
    State(state): State<AppState>,
    Query(query): Query<FormatQuery>,
) -> Result<Response, ApiError> {
    let rows: Vec<RevenueByClientRow> =
        fetch_report(&state, "pm.get_revenue_by_client_report").await?;
    report_response(
        &state,
        rows,
        &query.format,
        "RevenueByClientReport",
        REVENUE_COLUMNS,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn sample_rows() -> Vec<RevenueByClientRow> {
        vec![
            RevenueByClientRow {
                client_name: Some("Acme, Inc".into()),
                total_billing: Some(Decimal::new(150050, 2)),
                period: Some("2024-Q1".into()),
            },
            RevenueByClientRow {
                client_name: None,
                total_billing: None,
                period: None,
            },
        ]
    }

    #[test]
    fn csv_cells_strip_commas_and_blank_nulls() {
        let csv = render_csv(&sample_rows(), "RevenueByClientReport", REVENUE_COLUMNS, None)
            .unwrap();
        assert!(csv.contains("Company: NECOR PSL Software"));
        assert!(csv.contains("Report: RevenueByClientReport"));
        assert!(csv.contains("ClientName,TotalBilling,Period"));
        assert!(csv.contains("Acme Inc,1500.50,2024-Q1"));
        assert!(csv.lines().last().unwrap().contains(",,"));
    }

    #[test]
    fn csv_header_block_includes_profile_lines() {
        let profile = CompanyProfileRow {
            company_name: "Initech".into(),
            company_email: "hello@initech.test".into(),
            motto: "TPS first".into(),
            company_phone: None,
            physical_address: None,
            postal_address: None,
            email_server_host: None,
            email_server_port: None,
            email_username: None,
            email_password: None,
            use_ssl: None,
            profile_pic: None,
        };
        let csv = render_csv(
            &sample_rows(),
            "RevenueByClientReport",
            REVENUE_COLUMNS,
            Some(&profile),
        )
        .unwrap();
        assert!(csv.starts_with("Company: Initech\n"));
        assert!(csv.contains("Motto: TPS first"));
        assert!(csv.contains("Email: hello@initech.test"));
    }

    #[test]
    fn issue_columns_keep_legacy_header_names() {
        assert_eq!(ISSUES_COLUMNS[0], ("IssueID", "issueId"));
        let row = IssuesReportRow {
            issue_id: Some(9),
            project_name: None,
            issue_title: None,
            status: None,
            created_date: Some(date!(2024 - 03 - 01)),
            resolved_date: None,
            resolved_by: None,
        };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["issueId"], 9);
        assert_eq!(value["createdDate"], "2024-03-01");
    }
}
