use axum::extract::{Multipart, Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Serialize;
use sqlx::FromRow;
use tracing::instrument;

use crate::gateway::{OutcomeRow, ResultSets, SqlParam};
use crate::response::{ApiError, SimpleResponse};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/GetEmployeeProfile/:employee_id", get(get_employee_profile))
        .route("/profile/:client_id", get(get_client_profile))
        .route("/employee-profilepic/:employee_id", put(update_employee_profile_pic))
        .route("/client-profilepic/:client_id", put(update_client_profile_pic))
        .route("/company-profilepic", put(update_company_profile_pic))
}

#[derive(Debug, Clone, FromRow)]
struct EmployeeInfoRow {
    full_name: Option<String>,
    email_address: Option<String>,
    role: Option<String>,
    profile_pic: Option<Vec<u8>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeInfo {
    pub full_name: String,
    pub email_address: String,
    pub role: String,
    pub profile_pic: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProfileProjectRow {
    pub project_name: Option<String>,
    pub project_description: Option<String>,
    pub project_status: Option<String>,
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProfileTaskRow {
    pub task_name: Option<String>,
    pub task_description: Option<String>,
    pub task_status: Option<String>,
    pub priority: Option<String>,
    pub project_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProfileIssueRow {
    pub issue_title: Option<String>,
    pub issue_description: Option<String>,
    pub current_status: Option<String>,
    pub project_name: Option<String>,
    pub client_name: Option<String>,
    pub resolution_notes: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeProfile {
    pub employee_info: EmployeeInfo,
    pub projects: Vec<ProfileProjectRow>,
    pub tasks: Vec<ProfileTaskRow>,
    pub issues: Vec<ProfileIssueRow>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ClientProfileRow {
    pub client_id: i32,
    pub client_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub profile_pic: Option<Vec<u8>>,
}

fn unknown(value: Option<String>) -> String {
    value.unwrap_or_else(|| "N/A".into())
}

/// Pull the uploaded image out of the first multipart field carrying data.
async fn read_upload(mut multipart: Multipart) -> Result<Vec<u8>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::bad_request("No file uploaded."))?
    {
        let bytes = field
            .bytes()
            .await
            .map_err(|_| ApiError::bad_request("No file uploaded."))?;
        if !bytes.is_empty() {
            return Ok(bytes.to_vec());
        }
    }
    Err(ApiError::bad_request("No file uploaded."))
}

#[instrument(skip(state))]
async fn get_employee_profile(
    State(state): State<AppState>,
    Path(employee_id): Path<i32>,
) -> Result<Json<EmployeeProfile>, ApiError> {
    let mut sets = ResultSets::open(
        &state.db,
        "pm.get_employee_profile_overview",
        4,
        vec![SqlParam::Int(Some(employee_id))],
    )
    .await?;

    let info = sets.next_row::<EmployeeInfoRow>().await?;
    let projects = sets.next_list::<ProfileProjectRow>().await?;
    let tasks = sets.next_list::<ProfileTaskRow>().await?;
    let issues = sets.next_list::<ProfileIssueRow>().await?;
    sets.finish().await?;

    let Some(info) = info else {
        return Err(ApiError::not_found(format!(
            "Employee with ID {employee_id} not found."
        )));
    };

    Ok(Json(EmployeeProfile {
        employee_info: EmployeeInfo {
            full_name: unknown(info.full_name),
            email_address: unknown(info.email_address),
            role: unknown(info.role),
            profile_pic: info.profile_pic,
        },
        projects,
        tasks,
        issues,
    }))
}

#[instrument(skip(state))]
async fn get_client_profile(
    State(state): State<AppState>,
    Path(client_id): Path<i32>,
) -> Result<Json<ClientProfileRow>, ApiError> {
    let row = sqlx::query_as::<_, ClientProfileRow>("SELECT * FROM pm.get_client_profile($1)")
        .bind(client_id)
        .fetch_optional(&state.db)
        .await?;

    row.map(Json).ok_or_else(|| {
        ApiError::not_found(format!("Client with ID {client_id} not found."))
    })
}

#[instrument(skip(state, multipart))]
async fn update_employee_profile_pic(
    State(state): State<AppState>,
    Path(employee_id): Path<i32>,
    multipart: Multipart,
) -> Result<Json<SimpleResponse>, ApiError> {
    let image = read_upload(multipart).await?;
    let row = sqlx::query_as::<_, OutcomeRow>(
        "SELECT success, message FROM pm.update_employee_profile_pic($1, $2)",
    )
    .bind(employee_id)
    .bind(&image)
    .fetch_one(&state.db)
    .await?;
    Ok(Json(SimpleResponse {
        success: row.success,
        message: row.message,
    }))
}

#[instrument(skip(state, multipart))]
async fn update_client_profile_pic(
    State(state): State<AppState>,
    Path(client_id): Path<i32>,
    multipart: Multipart,
) -> Result<Json<SimpleResponse>, ApiError> {
    let image = read_upload(multipart).await?;
    let row = sqlx::query_as::<_, OutcomeRow>(
        "SELECT success, message FROM pm.update_client_profile_pic($1, $2)",
    )
    .bind(client_id)
    .bind(&image)
    .fetch_one(&state.db)
    .await?;
    Ok(Json(SimpleResponse {
        success: row.success,
        message: row.message,
    }))
}

#[instrument(skip(state, multipart))]
async fn update_company_profile_pic(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<SimpleResponse>, ApiError> {
    let image = read_upload(multipart).await?;
    let row = sqlx::query_as::<_, OutcomeRow>(
        "SELECT success, message FROM pm.update_company_profile_pic($1)",
    )
    .bind(&image)
    .fetch_one(&state.db)
    .await?;
    Ok(Json(SimpleResponse {
        success: row.success,
        message: row.message,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_profile_fields_fall_back_to_placeholder() {
        assert_eq!(unknown(None), "N/A");
        assert_eq!(unknown(Some("Jamie Fox".into())), "Jamie Fox");
    }

    #[test]
    fn employee_info_serializes_camel_case() {
        let info = EmployeeInfo {
            full_name: "A".into(),
            email_address: "a@b.c".into(),
            role: "Developer".into(),
            profile_pic: None,
        };
        let json = serde_json::to_value(&info).unwrap();
        assert!(json.get("emailAddress").is_some());
        assert!(json.get("profilePic").is_some());
    }
}
