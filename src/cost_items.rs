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
        .route("/cost-items", get(get_all_cost_items))
        .route("/cost-items-by-budget/:budget_id", get(get_cost_items_by_budget))
        .route("/add-cost-item", post(add_cost_item))
        .route("/update-cost-item", put(update_cost_item))
        .route("/delete-cost-item/:cost_id", delete(delete_cost_item))
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CostItemRow {
    pub cost_id: i32,
    pub budget_id: i32,
    pub project_id: i32,
    pub project_name: String,
    pub description: String,
    pub amount: Decimal,
    pub date_incurred: Date,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CostItemByBudgetRow {
    pub cost_id: i32,
    pub description: String,
    pub amount: Decimal,
    pub date_incurred: Date,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddCostItemRequest {
    #[serde(rename = "BudgetID")]
    pub budget_id: i32,
    pub description: String,
    pub amount: Decimal,
    pub date_incurred: Date,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateCostItemRequest {
    #[serde(rename = "CostID")]
    pub cost_id: i32,
    pub description: String,
    pub amount: Decimal,
    pub date_incurred: Date,
}

#[instrument(skip(state))]
async fn get_all_cost_items(
    State(state): State<AppState>,
) -> Result<Json<Vec<CostItemRow>>, ApiError> {
    let rows = sqlx::query_as::<_, CostItemRow>("SELECT * FROM pm.get_all_cost_items()")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
async fn get_cost_items_by_budget(
    State(state): State<AppState>,
    Path(budget_id): Path<i32>,
) -> Result<Json<Vec<CostItemByBudgetRow>>, ApiError> {
    let rows =
        sqlx::query_as::<_, CostItemByBudgetRow>("SELECT * FROM pm.get_cost_items_by_budget($1)")
            .bind(budget_id)
            .fetch_all(&state.db)
            .await?;
    Ok(Json(rows))
}

#[instrument(skip(state, payload))]
async fn add_cost_item(
    State(state): State<AppState>,
    Json(payload): Json<AddCostItemRequest>,
) -> Result<(StatusCode, Json<EnhancedResponse>), ApiError> {
    let row = sqlx::query_as::<_, StatusRow>(
        "SELECT success, message_type, message, data FROM pm.add_cost_item($1, $2, $3, $4)",
    )
    .bind(payload.budget_id)
    .bind(&payload.description)
    .bind(payload.amount)
    .bind(payload.date_incurred)
    .fetch_optional(&state.db)
    .await?;

    let Some(row) = row else {
        return Ok(failed_reply("Failed to execute cost item operation"));
    };
    Ok(enhanced_reply(WriteKind::Insert, row))
}

#[instrument(skip(state, payload))]
async fn update_cost_item(
    State(state): State<AppState>,
    Json(payload): Json<UpdateCostItemRequest>,
) -> Result<(StatusCode, Json<RowsAffected>), ApiError> {
    let row = sqlx::query_as::<_, RowsAffectedRow>(
        "SELECT rows_affected FROM pm.update_cost_item($1, $2, $3, $4)",
    )
    .bind(payload.cost_id)
    .bind(&payload.description)
    .bind(payload.amount)
    .bind(payload.date_incurred)
    .fetch_optional(&state.db)
    .await?;

    Ok(rows_affected_reply(row.map(|r| r.rows_affected).unwrap_or(0)))
}

#[instrument(skip(state))]
async fn delete_cost_item(
    State(state): State<AppState>,
    Path(cost_id): Path<i32>,
    Query(actor): Query<ActorQuery>,
) -> Result<(StatusCode, Json<EnhancedResponse>), ApiError> {
    let row = sqlx::query_as::<_, StatusRow>(
        "SELECT success, message_type, message, data FROM pm.delete_cost_item($1, $2)",
    )
    .bind(cost_id)
    .bind(&actor.user_id)
    .fetch_optional(&state.db)
    .await?;

    let Some(row) = row else {
        return Ok(failed_reply("Failed to execute delete operation"));
    };
    Ok(enhanced_reply(WriteKind::Delete, row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn cost_item_row_serializes_camel_case() {
        let row = CostItemByBudgetRow {
            cost_id: 7,
            description: "Licenses".into(),
            amount: Decimal::new(2599, 2),
            date_incurred: date!(2024 - 03 - 15),
        };
        let json = serde_json::to_string(&row).unwrap();
        assert!(json.contains("\"costId\":7"));
        assert!(json.contains("\"dateIncurred\""));
    }
}
