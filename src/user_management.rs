//! User administration: roles, provisioning with a mailed temporary
//! password, and the password reset flow.

use axum::extract::State;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::FromRow;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{instrument, warn};

use crate::auth::password::{generate_temp_password, sha256_hex};
use crate::auth::tokens::{generate_reset_token, hash_token};
use crate::company_profile::fetch_company_profile;
use crate::gateway::OutcomeRow;
use crate::mailer;
use crate::response::{ApiError, SimpleResponse};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/GetRoles", get(get_roles))
        .route("/AddRole", post(add_role))
        .route("/UpdateRole", put(update_role))
        .route("/DeleteRole", delete(delete_role))
        .route("/GetAllEmployeesAndClients", get(get_all_employees_and_clients))
        .route("/AddUser", post(add_user))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", put(reset_password))
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RoleRow {
    pub role_id: i32,
    pub role_name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeClientRow {
    pub entity_id: i32,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub entity_type: Option<String>,
    pub user_id: Option<i32>,
    pub role_name: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
struct ContactRow {
    full_name: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
struct ResetCandidateRow {
    user_id: i32,
    full_name: String,
    email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddRoleRequest {
    #[serde(default)]
    pub role_name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateRoleRequest {
    #[serde(rename = "RoleID")]
    pub role_id: i32,
    pub role_name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteRoleRequest {
    #[serde(rename = "RoleID")]
    pub role_id: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddUserRequest {
    #[serde(rename = "EmployeeID")]
    pub employee_id: Option<i32>,
    #[serde(rename = "ClientID")]
    pub client_id: Option<i32>,
    #[serde(default)]
    pub role_id: i32,
    #[serde(default)]
    pub created_by: i32,
    pub status_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub new_password: String,
}

const RESET_TOKEN_TTL_MINUTES: i64 = 30;
const GENERIC_RESET_ACK: &str = "If an account exists, a reset link has been sent.";

fn db_reject(err: sqlx::Error) -> ApiError {
    match &err {
        sqlx::Error::Database(db) => ApiError::bad_request(db.message().to_string()),
        _ => ApiError::from(err),
    }
}

#[instrument(skip(state))]
async fn get_roles(State(state): State<AppState>) -> Result<Json<Vec<RoleRow>>, ApiError> {
    let rows = sqlx::query_as::<_, RoleRow>("SELECT * FROM core.get_roles()")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(rows))
}

#[instrument(skip(state, payload))]
async fn add_role(
    State(state): State<AppState>,
    Json(payload): Json<AddRoleRequest>,
) -> Result<Json<SimpleResponse>, ApiError> {
    if payload.role_name.trim().is_empty() {
        return Err(ApiError::bad_request("RoleName is required."));
    }
    sqlx::query("SELECT core.add_role($1, $2)")
        .bind(&payload.role_name)
        .bind(&payload.description)
        .execute(&state.db)
        .await
        .map_err(db_reject)?;
    Ok(Json(SimpleResponse {
        success: true,
        message: "Role added successfully.".into(),
    }))
}

#[instrument(skip(state, payload))]
async fn update_role(
    State(state): State<AppState>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<Json<SimpleResponse>, ApiError> {
    sqlx::query("SELECT core.update_role($1, $2, $3)")
        .bind(payload.role_id)
        .bind(&payload.role_name)
        .bind(&payload.description)
        .execute(&state.db)
        .await
        .map_err(db_reject)?;
    Ok(Json(SimpleResponse {
        success: true,
        message: "Role updated successfully.".into(),
    }))
}

#[instrument(skip(state, payload))]
async fn delete_role(
    State(state): State<AppState>,
    Json(payload): Json<DeleteRoleRequest>,
) -> Result<Json<SimpleResponse>, ApiError> {
    sqlx::query("SELECT core.delete_role($1)")
        .bind(payload.role_id)
        .execute(&state.db)
        .await
        .map_err(db_reject)?;
    Ok(Json(SimpleResponse {
        success: true,
        message: "Role deleted successfully.".into(),
    }))
}

#[instrument(skip(state))]
async fn get_all_employees_and_clients(
    State(state): State<AppState>,
) -> Result<Json<Vec<EmployeeClientRow>>, ApiError> {
    let rows =
        sqlx::query_as::<_, EmployeeClientRow>("SELECT * FROM pm.get_all_employees_and_clients()")
            .fetch_all(&state.db)
            .await?;
    Ok(Json(rows))
}

/// Recipient lookup for the welcome mail, by whichever entity the new user
/// was linked to.
async fn user_contact(
    state: &AppState,
    payload: &AddUserRequest,
    user_id: i32,
) -> anyhow::Result<(String, String)> {
    let sql = if payload.employee_id.is_some_and(|id| id > 0) {
        "SELECT full_name, email FROM pm.get_employee_contact_by_user($1)"
    } else if payload.client_id.is_some_and(|id| id > 0) {
        "SELECT full_name, email FROM pm.get_client_contact_by_user($1)"
    } else {
        anyhow::bail!("neither EmployeeID nor ClientID was provided");
    };

    let contact = sqlx::query_as::<_, ContactRow>(sql)
        .bind(user_id)
        .fetch_optional(&state.db)
        .await?;
    let contact = contact.ok_or_else(|| anyhow::anyhow!("no contact row for user {user_id}"))?;
    match (contact.full_name, contact.email) {
        (Some(name), Some(email)) if !email.trim().is_empty() => Ok((name, email)),
        _ => anyhow::bail!("user {user_id} has no usable email address"),
    }
}

async fn send_welcome_email(
    state: &AppState,
    payload: &AddUserRequest,
    user_id: i32,
    temp_password: &str,
) -> anyhow::Result<()> {
    let (full_name, email) = user_contact(state, payload, user_id).await?;

    let profile = fetch_company_profile(&state.db)
        .await?
        .ok_or_else(|| anyhow::anyhow!("company profile not found"))?;
    let smtp = profile
        .smtp_profile()
        .ok_or_else(|| anyhow::anyhow!("email server host is not configured"))?;

    let body = mailer::account_created_body(&full_name, &email, temp_password);
    mailer::send_email(&smtp, &email, "Your account has been created", &body).await
}

#[instrument(skip(state, payload))]
async fn add_user(
    State(state): State<AppState>,
    Json(payload): Json<AddUserRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if payload.role_id <= 0 || payload.created_by <= 0 {
        return Err(ApiError::bad_request("RoleId and CreatedBy are required."));
    }

    let temp_password = generate_temp_password();
    let password_hash = sha256_hex(&temp_password);

    // The user row must be durable before any mail goes out
    let mut tx = state.db.begin().await?;
    let user_id: i32 =
        sqlx::query_scalar("SELECT user_id FROM core.add_pm_user($1, $2, $3, $4, $5, $6)")
            .bind(payload.employee_id)
            .bind(payload.client_id)
            .bind(&password_hash)
            .bind(payload.role_id)
            .bind(payload.created_by)
            .bind(payload.status_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_reject)?;
    tx.commit().await?;

    let (email_sent, email_error) =
        match send_welcome_email(&state, &payload, user_id, &temp_password).await {
            Ok(()) => (true, None),
            Err(err) => {
                warn!(error = %err, user_id, "welcome email failed");
                (false, Some(err.to_string()))
            }
        };

    Ok(Json(json!({
        "success": true,
        "message": "User added successfully.",
        "userId": user_id,
        "emailSent": email_sent,
        "emailError": email_error,
    })))
}

#[instrument(skip(state, payload))]
async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<SimpleResponse>, ApiError> {
    if payload.email.trim().is_empty() {
        return Err(ApiError::bad_request("Email is required."));
    }

    let user = sqlx::query_as::<_, ResetCandidateRow>(
        "SELECT user_id, full_name, email FROM core.get_user_by_email($1)",
    )
    .bind(&payload.email)
    .fetch_optional(&state.db)
    .await?;

    // Unknown addresses get the same acknowledgment as known ones
    let Some(user) = user else {
        return Ok(Json(SimpleResponse {
            success: true,
            message: GENERIC_RESET_ACK.into(),
        }));
    };

    let raw_token = generate_reset_token();
    let token_hash = hash_token(&raw_token);
    let expires_at = OffsetDateTime::now_utc() + TimeDuration::minutes(RESET_TOKEN_TTL_MINUTES);

    sqlx::query("SELECT core.create_password_reset_token($1, $2, $3)")
        .bind(user.user_id)
        .bind(&token_hash)
        .bind(expires_at)
        .execute(&state.db)
        .await?;

    let profile = fetch_company_profile(&state.db).await?;
    let smtp = profile
        .as_ref()
        .and_then(|p| p.smtp_profile())
        .ok_or_else(|| ApiError::internal("Company email config not found."))?;

    let body = mailer::password_reset_body(&state.config.reset_password_url, &raw_token);
    if let Err(err) = mailer::send_email(&smtp, &user.email, "Reset your password", &body).await {
        warn!(error = %err, user_id = user.user_id, "reset email failed");
        return Err(ApiError::internal("Failed to send reset email."));
    }

    Ok(Json(SimpleResponse {
        success: true,
        message: GENERIC_RESET_ACK.into(),
    }))
}

#[instrument(skip(state, payload))]
async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<SimpleResponse>, ApiError> {
    if payload.token.trim().is_empty() || payload.new_password.trim().is_empty() {
        return Err(ApiError::bad_request("Token and new password are required."));
    }

    let token_hash = hash_token(&payload.token);

    // Token lookup, password update and the single-use flag commit together
    let mut tx = state.db.begin().await?;
    let row = sqlx::query_as::<_, OutcomeRow>(
        "SELECT success, message FROM core.consume_password_reset_token($1, $2)",
    )
    .bind(&token_hash)
    .bind(sha256_hex(&payload.new_password))
    .fetch_optional(&mut *tx)
    .await?;

    match row {
        Some(row) if row.success => {
            tx.commit().await?;
            Ok(Json(SimpleResponse {
                success: true,
                message: "Password has been reset successfully.".into(),
            }))
        }
        _ => {
            tx.rollback().await?;
            // Expired, used and unknown tokens are indistinguishable
            Err(ApiError::bad_request("Invalid or expired token."))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_role_requires_a_role_name() {
        // A body without RoleName must still deserialize so the handler can
        // answer 400 instead of a body-rejection 422
        let req: AddRoleRequest = serde_json::from_str(r#"{"Description":"ops"}"#).unwrap();
        assert!(req.role_name.trim().is_empty());

        let req: AddRoleRequest = serde_json::from_str(r#"{"RoleName":"  "}"#).unwrap();
        assert!(req.role_name.trim().is_empty());

        let req: AddRoleRequest =
            serde_json::from_str(r#"{"RoleName":"Auditor","Description":null}"#).unwrap();
        assert!(!req.role_name.trim().is_empty());
    }

    #[test]
    fn add_user_requires_role_and_creator() {
        let req: AddUserRequest =
            serde_json::from_str(r#"{"EmployeeID":3,"RoleId":0,"CreatedBy":1}"#).unwrap();
        assert!(req.role_id <= 0 || req.created_by <= 0);

        let req: AddUserRequest =
            serde_json::from_str(r#"{"ClientID":4,"RoleId":2,"CreatedBy":1,"StatusId":null}"#)
                .unwrap();
        assert!(req.role_id > 0 && req.created_by > 0);
        assert_eq!(req.client_id, Some(4));
        assert!(req.employee_id.is_none());
    }

    #[test]
    fn reset_token_ttl_is_thirty_minutes() {
        assert_eq!(RESET_TOKEN_TTL_MINUTES, 30);
    }

    #[test]
    fn forgot_password_ack_never_names_the_account() {
        assert!(!GENERIC_RESET_ACK.contains('@'));
        assert_eq!(GENERIC_RESET_ACK, "If an account exists, a reset link has been sent.");
    }
}
