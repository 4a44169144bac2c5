use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use tracing::instrument;

use crate::gateway::{RowsAffectedRow, StatusRow};
use crate::response::{ApiError, EnhancedResponse, MessageType};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/GetAll", get(get_all_allocations))
        .route("/Add", post(add_allocation))
        .route("/Update", put(update_allocation))
        .route("/Delete/:allocation_id", delete(delete_allocation))
        .route("/ValidateWorkload/:employee_id", get(validate_workload))
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ResourceAllocationRow {
    pub allocation_id: i32,
    pub project_id: i32,
    pub project_name: String,
    pub employee_id: i32,
    pub employee_name: String,
    pub email: String,
    pub role: String,
    pub allocation_percentage: Decimal,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub allocation_status: String,
}

#[derive(Debug, Clone, Default, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeWorkloadRow {
    pub employee_id: i32,
    pub employee_name: String,
    pub total_allocation: Option<Decimal>,
    pub check_date: Option<OffsetDateTime>,
    pub allocation_status: String,
    pub success: Option<bool>,
    pub message_type: Option<String>,
    pub message: Option<String>,
    pub data: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddResourceAllocationRequest {
    #[serde(rename = "ProjectID")]
    pub project_id: i32,
    #[serde(rename = "EmployeeID")]
    pub employee_id: i32,
    pub role: Option<String>,
    pub allocation_percentage: Decimal,
    pub start_date: Date,
    pub end_date: Option<Date>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateResourceAllocationRequest {
    #[serde(rename = "AllocationID")]
    pub allocation_id: i32,
    pub role: Option<String>,
    pub allocation_percentage: Decimal,
    pub start_date: Date,
    pub end_date: Option<Date>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteActorQuery {
    #[serde(rename = "userID", default = "default_actor")]
    pub user_id: String,
}

fn default_actor() -> String {
    "SYSTEM".into()
}

#[instrument(skip(state))]
async fn get_all_allocations(
    State(state): State<AppState>,
) -> Result<Json<Vec<ResourceAllocationRow>>, ApiError> {
    let rows = sqlx::query_as::<_, ResourceAllocationRow>(
        "SELECT * FROM pm.get_all_resource_allocations()",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(rows))
}

#[instrument(skip(state, payload))]
async fn add_allocation(
    State(state): State<AppState>,
    Json(payload): Json<AddResourceAllocationRequest>,
) -> Result<Json<EnhancedResponse>, ApiError> {
    let row = sqlx::query_as::<_, StatusRow>(
        "SELECT success, message_type, message, data \
         FROM pm.add_resource_allocation($1, $2, $3, $4, $5, $6)",
    )
    .bind(payload.project_id)
    .bind(payload.employee_id)
    .bind(&payload.role)
    .bind(payload.allocation_percentage)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(EnhancedResponse {
        success: row.success,
        message_type: MessageType::parse(&row.message_type),
        message: row.message,
        data: row.data,
    }))
}

#[instrument(skip(state, payload))]
async fn update_allocation(
    State(state): State<AppState>,
    Json(payload): Json<UpdateResourceAllocationRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let row = sqlx::query_as::<_, RowsAffectedRow>(
        "SELECT rows_affected FROM pm.update_resource_allocation($1, $2, $3, $4, $5)",
    )
    .bind(payload.allocation_id)
    .bind(&payload.role)
    .bind(payload.allocation_percentage)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(json!({
        "success": true,
        "rowsAffected": row.rows_affected,
    })))
}

#[instrument(skip(state))]
async fn delete_allocation(
    State(state): State<AppState>,
    Path(allocation_id): Path<i32>,
    Query(actor): Query<DeleteActorQuery>,
) -> Result<Json<EnhancedResponse>, ApiError> {
    let row = sqlx::query_as::<_, StatusRow>(
        "SELECT success, message_type, message, data \
         FROM pm.delete_resource_allocation($1, $2)",
    )
    .bind(allocation_id)
    .bind(&actor.user_id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(EnhancedResponse {
        success: row.success,
        message_type: MessageType::parse(&row.message_type),
        message: row.message,
        data: row.data,
    }))
}

#[instrument(skip(state))]
async fn validate_workload(
    State(state): State<AppState>,
    Path(employee_id): Path<i32>,
) -> Result<Json<EmployeeWorkloadRow>, ApiError> {
    let row = sqlx::query_as::<_, EmployeeWorkloadRow>(
        "SELECT * FROM pm.validate_employee_workload($1)",
    )
    .bind(employee_id)
    .fetch_optional(&state.db)
    .await?;

    // No row means the employee has no recorded allocations at all
    Ok(Json(row.unwrap_or(EmployeeWorkloadRow {
        employee_id,
        success: Some(false),
        message: Some("No data returned for this employee".into()),
        ..Default::default()
    })))
}
