//! Sign-in, self-signup and account activation. Credential checks live in
//! the `core` schema routines; this module hashes, calls and issues tokens.

use axum::extract::{FromRef, Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::FromRow;
use time::OffsetDateTime;
use tracing::{instrument, warn};

use crate::auth::jwt::{AuthUser, JwtKeys, TokenUser};
use crate::auth::password::{is_valid_email, sha256_hex};
use crate::company_profile::fetch_company_profile;
use crate::gateway::{ResultSets, SqlParam};
use crate::mailer;
use crate::response::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/LoginPM", post(login_pm))
        .route("/LOGS", get(get_audit_trail))
        .route("/signup", post(sign_up))
        .route("/inactiveUsers", get(get_inactive_users))
        .route("/linkUserToEmployee", post(link_user_to_employee))
        .route("/deleteInactiveUser/:user_id", delete(delete_inactive_user))
        .route("/Permissions", get(get_my_permissions))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LoginUserRow {
    pub user_id: i32,
    pub full_name: String,
    pub email: String,
    pub role_id: i32,
    pub role_name: String,
    pub status_id: i32,
    pub created_at: OffsetDateTime,
    pub password_expiry_date: Option<OffsetDateTime>,
    pub complexity_id: i32,
    pub created_by: Option<String>,
    pub employee_id: Option<i32>,
    pub client_id: Option<i32>,
    pub client_name: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
struct PermissionNameRow {
    permission_name: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogRow {
    pub audit_id: i64,
    pub table_name: String,
    pub primary_key_value: String,
    pub action_type: String,
    pub old_data: Option<String>,
    pub new_data: Option<String>,
    pub user_id: String,
    pub action_date: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignUpRequest {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InactiveUserRow {
    pub user_id: i32,
    pub full_name: String,
    pub email: String,
    pub created_at: OffsetDateTime,
    pub role_id: i32,
    pub role_name: String,
    pub status_id: i32,
    pub status_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LinkUserRequest {
    #[serde(rename = "UserID", default)]
    pub user_id: i32,
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LinkedUserRow {
    pub user_id: i32,
    pub employee_id: i32,
    pub full_name: String,
    pub email: String,
    pub role: String,
}

/// Surface constraint violations from `core` routines as client errors with
/// the routine's own message.
fn db_reject(err: sqlx::Error) -> ApiError {
    match &err {
        sqlx::Error::Database(db) => ApiError::bad_request(db.message().to_string()),
        _ => ApiError::from(err),
    }
}

#[instrument(skip(state, payload))]
async fn login_pm(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if payload.email.trim().is_empty() || payload.password.trim().is_empty() {
        return Err(ApiError::bad_request("Email and password are required."));
    }

    let mut sets = ResultSets::open(
        &state.db,
        "core.login_pm",
        2,
        vec![
            SqlParam::Text(Some(payload.email.clone())),
            SqlParam::Text(Some(sha256_hex(&payload.password))),
        ],
    )
    .await?;
    let user = sets.next_row::<LoginUserRow>().await?;
    let permission_rows = sets.next_list::<PermissionNameRow>().await?;
    sets.finish().await?;

    let Some(user) = user else {
        return Err(ApiError::unauthorized("Invalid email or password."));
    };

    let keys = JwtKeys::from_ref(&state);
    let token = keys
        .sign(&TokenUser {
            user_id: user.user_id,
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            role_name: user.role_name.clone(),
            role_id: user.role_id,
            status_id: user.status_id,
        })
        .map_err(|_| ApiError::internal("Failed to issue token."))?;

    let permissions: Vec<String> = permission_rows
        .into_iter()
        .map(|row| row.permission_name)
        .collect();

    Ok(Json(json!({
        "success": true,
        "token": token,
        "user": user,
        "permissions": permissions,
    })))
}

#[instrument(skip(state))]
async fn get_audit_trail(
    State(state): State<AppState>,
) -> Result<Json<Vec<AuditLogRow>>, ApiError> {
    let rows = sqlx::query_as::<_, AuditLogRow>("SELECT * FROM pm.get_audit_trail()")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(rows))
}

#[instrument(skip(state, payload))]
async fn sign_up(
    State(state): State<AppState>,
    Json(payload): Json<SignUpRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if payload.full_name.trim().is_empty()
        || payload.email.trim().is_empty()
        || payload.password.trim().is_empty()
    {
        return Err(ApiError::bad_request("All fields are required."));
    }
    if !is_valid_email(payload.email.trim()) {
        return Err(ApiError::bad_request("Invalid email address."));
    }

    let user_id: i32 =
        sqlx::query_scalar("SELECT user_id FROM core.add_user_sign_up($1, $2, $3, $4)")
            .bind(&payload.full_name)
            .bind(&payload.email)
            .bind(sha256_hex(&payload.password))
            .bind("SELF")
            .fetch_one(&state.db)
            .await
            .map_err(db_reject)?;

    Ok(Json(json!({
        "success": true,
        "message": "Account created successfully. Awaiting activation.",
        "userId": user_id,
    })))
}

#[instrument(skip(state))]
async fn get_inactive_users(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let users =
        sqlx::query_as::<_, InactiveUserRow>("SELECT * FROM core.get_inactive_non_employee_users()")
            .fetch_all(&state.db)
            .await?;

    Ok(Json(json!({
        "success": true,
        "count": users.len(),
        "data": users,
    })))
}

#[instrument(skip(state, payload))]
async fn link_user_to_employee(
    State(state): State<AppState>,
    Json(payload): Json<LinkUserRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if payload.user_id <= 0 || payload.role.trim().is_empty() {
        return Err(ApiError::bad_request("UserID and Role are required."));
    }

    let linked = sqlx::query_as::<_, LinkedUserRow>(
        "SELECT * FROM pm.link_user_to_employee($1, $2)",
    )
    .bind(payload.user_id)
    .bind(&payload.role)
    .fetch_all(&state.db)
    .await?;

    let Some(user) = linked.first().cloned() else {
        return Err(ApiError::not_found("Failed to link user to employee."));
    };

    // Activation mail is best effort and never undoes the link
    match fetch_company_profile(&state.db).await {
        Ok(Some(profile)) => {
            if let Some(smtp) = profile.smtp_profile() {
                let body = mailer::account_activated_body(&user.full_name);
                if let Err(err) =
                    mailer::send_email(&smtp, &user.email, "Your account has been activated", &body)
                        .await
                {
                    warn!(error = %err, user_id = user.user_id, "activation email failed");
                }
            } else {
                warn!("company profile has no SMTP host, activation email skipped");
            }
        }
        Ok(None) => warn!("no company profile, activation email skipped"),
        Err(err) => warn!(error = %err, "company profile lookup failed"),
    }

    Ok(Json(json!({
        "success": true,
        "message": "User linked to employee successfully and email sent.",
        "data": linked,
    })))
}

#[instrument(skip(state))]
async fn delete_inactive_user(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> Result<Json<serde_json::Value>, ApiError> {
    sqlx::query("SELECT core.delete_inactive_user($1)")
        .bind(user_id)
        .execute(&state.db)
        .await
        .map_err(db_reject)?;

    Ok(Json(json!({
        "success": true,
        "message": "User deleted successfully.",
        "deletedUserId": user_id,
    })))
}

#[instrument(skip(state, user))]
async fn get_my_permissions(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<String>>, ApiError> {
    let permissions: Vec<String> =
        sqlx::query_scalar("SELECT permission_name FROM core.get_permissions_by_user_id($1)")
            .bind(user.0.sub)
            .fetch_all(&state.db)
            .await?;

    if permissions.is_empty() {
        return Err(ApiError::not_found("No permissions found for this user."));
    }
    Ok(Json(permissions))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_request_reads_lowercase_keys() {
        let req: LoginRequest =
            serde_json::from_str(r#"{"email":"a@b.c","password":"pw"}"#).unwrap();
        assert_eq!(req.email, "a@b.c");
        assert_eq!(req.password, "pw");
    }

    #[test]
    fn blank_credentials_are_rejected_before_the_database() {
        let req: LoginRequest = serde_json::from_str(r#"{"email":"  ","password":""}"#).unwrap();
        assert!(req.email.trim().is_empty() || req.password.trim().is_empty());
    }

    #[test]
    fn login_user_serializes_camel_case() {
        let user = LoginUserRow {
            user_id: 1,
            full_name: "Ada".into(),
            email: "ada@example.com".into(),
            role_id: 2,
            role_name: "Admin".into(),
            status_id: 1,
            created_at: OffsetDateTime::UNIX_EPOCH,
            password_expiry_date: None,
            complexity_id: 1,
            created_by: None,
            employee_id: Some(7),
            client_id: None,
            client_name: None,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("userId").is_some());
        assert!(json.get("passwordExpiryDate").is_some());
        assert_eq!(json["employeeId"], 7);
    }

    #[test]
    fn link_request_requires_user_and_role() {
        let req: LinkUserRequest = serde_json::from_str(r#"{"UserID":0,"Role":""}"#).unwrap();
        assert!(req.user_id <= 0 || req.role.trim().is_empty());
    }
}
