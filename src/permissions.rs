//! Role-permission administration. The routines own the actual grant rules;
//! this module only shuttles the catalog and the grant records.

use axum::extract::{Path, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use tracing::instrument;

use crate::gateway::OutcomeRow;
use crate::response::{ApiError, SimpleResponse};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/GetAllPermissions", get(get_all_permissions))
        .route("/GetRolePermissions", get(get_role_permissions))
        .route("/GrantRolePermission", post(grant_role_permission))
        .route("/UpdateRolePermission", put(update_role_permission))
        .route("/RevokeRolePermission/:role_permission_id", delete(revoke_role_permission))
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRow {
    pub permission_id: i32,
    pub permission_name: Option<String>,
    pub description: Option<String>,
    pub module: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RolePermissionRow {
    pub role_permission_id: i32,
    pub role_name: Option<String>,
    pub permission_name: Option<String>,
    pub granted_at: OffsetDateTime,
    pub granted_by_user_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GrantRolePermissionRequest {
    #[serde(rename = "RoleID")]
    pub role_id: i32,
    #[serde(rename = "PermissionID")]
    pub permission_id: i32,
    pub granted_by: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateRolePermissionRequest {
    #[serde(rename = "RolePermissionID")]
    pub role_permission_id: i32,
    #[serde(rename = "RoleID")]
    pub role_id: i32,
    #[serde(rename = "PermissionID")]
    pub permission_id: i32,
    pub granted_by: i32,
}

fn outcome_reply(row: OutcomeRow) -> Json<SimpleResponse> {
    Json(SimpleResponse {
        success: row.success,
        message: row.message,
    })
}

#[instrument(skip(state))]
async fn get_all_permissions(
    State(state): State<AppState>,
) -> Result<Json<Vec<PermissionRow>>, ApiError> {
    let rows = sqlx::query_as::<_, PermissionRow>("SELECT * FROM pm.get_all_permissions()")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
async fn get_role_permissions(
    State(state): State<AppState>,
) -> Result<Json<Vec<RolePermissionRow>>, ApiError> {
    let rows = sqlx::query_as::<_, RolePermissionRow>("SELECT * FROM pm.get_role_permissions()")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(rows))
}

#[instrument(skip(state, payload))]
async fn grant_role_permission(
    State(state): State<AppState>,
    Json(payload): Json<GrantRolePermissionRequest>,
) -> Result<Json<SimpleResponse>, ApiError> {
    let row = sqlx::query_as::<_, OutcomeRow>(
        "SELECT success, message FROM pm.grant_role_permission($1, $2, $3)",
    )
    .bind(payload.role_id)
    .bind(payload.permission_id)
    .bind(payload.granted_by)
    .fetch_one(&state.db)
    .await?;
    Ok(outcome_reply(row))
}

#[instrument(skip(state, payload))]
async fn update_role_permission(
    State(state): State<AppState>,
    Json(payload): Json<UpdateRolePermissionRequest>,
) -> Result<Json<SimpleResponse>, ApiError> {
    let row = sqlx::query_as::<_, OutcomeRow>(
        "SELECT success, message FROM pm.update_role_permission($1, $2, $3, $4)",
    )
    .bind(payload.role_permission_id)
    .bind(payload.role_id)
    .bind(payload.permission_id)
    .bind(payload.granted_by)
    .fetch_one(&state.db)
    .await?;
    Ok(outcome_reply(row))
}

#[instrument(skip(state))]
async fn revoke_role_permission(
    State(state): State<AppState>,
    Path(role_permission_id): Path<i32>,
) -> Result<Json<SimpleResponse>, ApiError> {
    let row = sqlx::query_as::<_, OutcomeRow>(
        "SELECT success, message FROM pm.revoke_role_permission($1)",
    )
    .bind(role_permission_id)
    .fetch_one(&state.db)
    .await?;
    Ok(outcome_reply(row))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_request_uses_upper_id_keys() {
        let req: GrantRolePermissionRequest =
            serde_json::from_str(r#"{"RoleID":2,"PermissionID":9,"GrantedBy":1}"#).unwrap();
        assert_eq!(req.role_id, 2);
        assert_eq!(req.permission_id, 9);
        assert_eq!(req.granted_by, 1);
    }
}
