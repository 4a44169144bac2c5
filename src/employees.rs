use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::instrument;

use crate::billing::ActorQuery;
use crate::gateway::StatusRow;
use crate::response::{ApiError, EnhancedResponse, MessageType};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/get-all", get(get_all_employees))
        .route("/add", post(add_employee))
        .route("/update", put(update_employee))
        .route("/delete/:employee_id", delete(delete_employee))
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRow {
    pub employee_id: i32,
    pub task_names: String,
    pub full_name: String,
    pub email: String,
    pub role: String,
    pub active_projects: i32,
    pub total_allocation: Decimal,
    pub assigned_tasks: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddEmployeeRequest {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateEmployeeRequest {
    pub employee_id: i32,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
}

// Employee writes always answer 200; the body's success flag and message
// carry the procedure's verdict.
fn status_body(row: StatusRow) -> Json<EnhancedResponse> {
    Json(EnhancedResponse {
        success: row.success,
        message_type: MessageType::parse(&row.message_type),
        message: row.message,
        data: row.data,
    })
}

#[instrument(skip(state))]
async fn get_all_employees(
    State(state): State<AppState>,
) -> Result<Json<Vec<EmployeeRow>>, ApiError> {
    let rows = sqlx::query_as::<_, EmployeeRow>("SELECT * FROM pm.get_all_employees()")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(rows))
}

#[instrument(skip(state, payload))]
async fn add_employee(
    State(state): State<AppState>,
    Json(payload): Json<AddEmployeeRequest>,
) -> Result<Json<EnhancedResponse>, ApiError> {
    let row = sqlx::query_as::<_, StatusRow>(
        "SELECT success, message_type, message, data FROM pm.add_employee($1, $2, $3)",
    )
    .bind(&payload.full_name)
    .bind(&payload.email)
    .bind(&payload.role)
    .fetch_one(&state.db)
    .await?;
    Ok(status_body(row))
}

#[instrument(skip(state, payload))]
async fn update_employee(
    State(state): State<AppState>,
    Json(payload): Json<UpdateEmployeeRequest>,
) -> Result<Json<EnhancedResponse>, ApiError> {
    let row = sqlx::query_as::<_, StatusRow>(
        "SELECT success, message_type, message, data FROM pm.update_employee($1, $2, $3, $4)",
    )
    .bind(payload.employee_id)
    .bind(&payload.full_name)
    .bind(&payload.email)
    .bind(&payload.role)
    .fetch_one(&state.db)
    .await?;
    Ok(status_body(row))
}

#[instrument(skip(state))]
async fn delete_employee(
    State(state): State<AppState>,
    Path(employee_id): Path<i32>,
    Query(actor): Query<ActorQuery>,
) -> Result<Json<EnhancedResponse>, ApiError> {
    let row = sqlx::query_as::<_, StatusRow>(
        "SELECT success, message_type, message, data FROM pm.delete_employee($1, $2)",
    )
    .bind(employee_id)
    .bind(&actor.user_id)
    .fetch_one(&state.db)
    .await?;
    Ok(status_body(row))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_request_tolerates_missing_fields() {
        let req: AddEmployeeRequest = serde_json::from_str(r#"{"FullName":"Ada"}"#).unwrap();
        assert_eq!(req.full_name, "Ada");
        assert_eq!(req.email, "");
        assert_eq!(req.role, "");
    }
}
