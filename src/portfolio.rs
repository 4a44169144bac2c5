use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::Date;
use tracing::instrument;

use crate::billing::ActorQuery;
use crate::gateway::{RowsAffectedRow, StatusRow};
use crate::response::{
    enhanced_reply, failed_reply, rows_affected_reply, ApiError, EnhancedResponse, RowsAffected,
    WriteKind,
};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/GetAll", get(get_all_portfolios))
        .route("/:id/Projects", get(get_portfolio_projects))
        .route("/Add", post(add_portfolio))
        .route("/Update/:id", put(update_portfolio))
        .route("/Delete/:id", delete(delete_portfolio))
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioRow {
    pub portfolio_id: i32,
    pub portfolio_name: String,
    pub description: Option<String>,
    pub manager_id: Option<i32>,
    pub manager_name: Option<String>,
    pub project_count: i32,
    pub total_estimated_cost: Decimal,
    pub total_actual_cost: Decimal,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioProjectRow {
    pub project_id: i32,
    pub project_name: String,
    pub description: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub status_name: Option<String>,
    pub estimated_cost: Option<Decimal>,
    pub actual_cost: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddPortfolioRequest {
    pub portfolio_name: String,
    pub description: Option<String>,
    #[serde(rename = "ManagerID")]
    pub manager_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdatePortfolioRequest {
    pub portfolio_name: String,
    pub description: Option<String>,
    #[serde(rename = "ManagerID")]
    pub manager_id: Option<i32>,
}

#[instrument(skip(state))]
async fn get_all_portfolios(
    State(state): State<AppState>,
) -> Result<Json<Vec<PortfolioRow>>, ApiError> {
    let rows = sqlx::query_as::<_, PortfolioRow>("SELECT * FROM pm.get_all_portfolios()")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
async fn get_portfolio_projects(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<PortfolioProjectRow>>, ApiError> {
    let rows =
        sqlx::query_as::<_, PortfolioProjectRow>("SELECT * FROM pm.get_portfolio_projects($1)")
            .bind(id)
            .fetch_all(&state.db)
            .await?;
    Ok(Json(rows))
}

#[instrument(skip(state, payload))]
async fn add_portfolio(
    State(state): State<AppState>,
    Json(payload): Json<AddPortfolioRequest>,
) -> Result<(StatusCode, Json<EnhancedResponse>), ApiError> {
    let row = sqlx::query_as::<_, StatusRow>(
        "SELECT success, message_type, message, data FROM pm.add_portfolio($1, $2, $3)",
    )
    .bind(&payload.portfolio_name)
    .bind(&payload.description)
    .bind(payload.manager_id)
    .fetch_optional(&state.db)
    .await?;

    let Some(row) = row else {
        return Ok(failed_reply("Failed to execute portfolio operation"));
    };
    Ok(enhanced_reply(WriteKind::Insert, row))
}

#[instrument(skip(state, payload))]
async fn update_portfolio(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdatePortfolioRequest>,
) -> Result<(StatusCode, Json<RowsAffected>), ApiError> {
    let row = sqlx::query_as::<_, RowsAffectedRow>(
        "SELECT rows_affected FROM pm.update_portfolio($1, $2, $3, $4)",
    )
    .bind(id)
    .bind(&payload.portfolio_name)
    .bind(&payload.description)
    .bind(payload.manager_id)
    .fetch_optional(&state.db)
    .await?;

    Ok(rows_affected_reply(row.map(|r| r.rows_affected).unwrap_or(0)))
}

#[instrument(skip(state))]
async fn delete_portfolio(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(actor): Query<ActorQuery>,
) -> Result<(StatusCode, Json<EnhancedResponse>), ApiError> {
    let row = sqlx::query_as::<_, StatusRow>(
        "SELECT success, message_type, message, data FROM pm.delete_portfolio($1, $2)",
    )
    .bind(id)
    .bind(&actor.user_id)
    .fetch_optional(&state.db)
    .await?;

    let Some(row) = row else {
        return Ok(failed_reply("Failed to execute delete operation"));
    };
    Ok(enhanced_reply(WriteKind::Delete, row))
}
