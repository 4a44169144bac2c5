use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::instrument;

use crate::response::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(count_tasks))
        .route("/projects", get(count_projects))
        .route("/issues", get(count_issues))
        .route("/employees", get(count_employees))
        .route("/clients", get(count_clients))
        .route("/bills", get(count_bills))
}

async fn scalar_count(state: &AppState, sql: &str) -> Result<i64, ApiError> {
    let count = sqlx::query_scalar::<_, i64>(sql)
        .fetch_one(&state.db)
        .await?;
    Ok(count)
}

#[instrument(skip(state))]
async fn count_tasks(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let total = scalar_count(&state, "SELECT pm.count_tasks()").await?;
    Ok(Json(json!({ "totalTasks": total })))
}

#[instrument(skip(state))]
async fn count_projects(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let total = scalar_count(&state, "SELECT pm.count_projects()").await?;
    Ok(Json(json!({ "totalProjects": total })))
}

#[instrument(skip(state))]
async fn count_issues(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let total = scalar_count(&state, "SELECT pm.count_issues()").await?;
    Ok(Json(json!({ "totalIssues": total })))
}

#[instrument(skip(state))]
async fn count_employees(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let total = scalar_count(&state, "SELECT pm.count_employees()").await?;
    Ok(Json(json!({ "totalEmployees": total })))
}

#[instrument(skip(state))]
async fn count_clients(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let total = scalar_count(&state, "SELECT pm.count_clients()").await?;
    Ok(Json(json!({ "totalClients": total })))
}

#[instrument(skip(state))]
async fn count_bills(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let total = scalar_count(&state, "SELECT pm.count_bills()").await?;
    Ok(Json(json!({ "totalBills": total })))
}
