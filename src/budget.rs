use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::Date;
use tracing::instrument;

use crate::gateway::{RowsAffectedRow, StatusRow};
use crate::response::{
    enhanced_reply, failed_reply, rows_affected_reply, ApiError, EnhancedResponse, RowsAffected,
    WriteKind,
};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/budgets", get(get_all_budgets))
        .route("/add-budget", post(add_budget))
        .route("/update-budget", put(update_budget))
        .route("/delete-budget/:budget_id", delete(delete_budget))
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BudgetRow {
    pub budget_id: i32,
    pub project_id: i32,
    pub project_name: String,
    pub estimated_cost: Decimal,
    pub actual_cost: Decimal,
    pub approved_date: Option<Date>,
    pub variance: Decimal,
    pub variance_percentage: Decimal,
    pub cost_items_count: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddBudgetRequest {
    #[serde(rename = "ProjectID")]
    pub project_id: i32,
    pub estimated_cost: Decimal,
    #[serde(default)]
    pub actual_cost: Option<Decimal>,
    pub approved_date: Option<Date>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateBudgetRequest {
    #[serde(rename = "BudgetID")]
    pub budget_id: i32,
    pub estimated_cost: Decimal,
    #[serde(default)]
    pub actual_cost: Option<Decimal>,
    pub approved_date: Option<Date>,
}

#[derive(Debug, Deserialize)]
pub struct NumericActorQuery {
    #[serde(rename = "userId", default)]
    pub user_id: Option<i32>,
}

#[instrument(skip(state))]
async fn get_all_budgets(State(state): State<AppState>) -> Result<Json<Vec<BudgetRow>>, ApiError> {
    let rows = sqlx::query_as::<_, BudgetRow>("SELECT * FROM pm.get_all_budgets()")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(rows))
}

#[instrument(skip(state, payload))]
async fn add_budget(
    State(state): State<AppState>,
    Json(payload): Json<AddBudgetRequest>,
) -> Result<(StatusCode, Json<EnhancedResponse>), ApiError> {
    let row = sqlx::query_as::<_, StatusRow>(
        "SELECT success, message_type, message, data FROM pm.add_budget($1, $2, $3, $4)",
    )
    .bind(payload.project_id)
    .bind(payload.estimated_cost)
    .bind(payload.actual_cost.unwrap_or_default())
    .bind(payload.approved_date)
    .fetch_optional(&state.db)
    .await?;

    let Some(row) = row else {
        return Ok(failed_reply("Failed to execute budget operation"));
    };
    Ok(enhanced_reply(WriteKind::Insert, row))
}

#[instrument(skip(state, payload))]
async fn update_budget(
    State(state): State<AppState>,
    Json(payload): Json<UpdateBudgetRequest>,
) -> Result<(StatusCode, Json<RowsAffected>), ApiError> {
    let row = sqlx::query_as::<_, RowsAffectedRow>(
        "SELECT rows_affected FROM pm.update_budget($1, $2, $3, $4)",
    )
    .bind(payload.budget_id)
    .bind(payload.estimated_cost)
    .bind(payload.actual_cost.unwrap_or_default())
    .bind(payload.approved_date)
    .fetch_optional(&state.db)
    .await?;

    Ok(rows_affected_reply(row.map(|r| r.rows_affected).unwrap_or(0)))
}

#[instrument(skip(state))]
async fn delete_budget(
    State(state): State<AppState>,
    Path(budget_id): Path<i32>,
    Query(actor): Query<NumericActorQuery>,
) -> Result<(StatusCode, Json<EnhancedResponse>), ApiError> {
    let row = sqlx::query_as::<_, StatusRow>(
        "SELECT success, message_type, message, data FROM pm.delete_budget($1, $2)",
    )
    .bind(budget_id)
    .bind(actor.user_id.unwrap_or(0))
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

    #[test]
    fn add_budget_defaults_actual_cost() {
        let req: AddBudgetRequest =
            serde_json::from_str(r#"{"ProjectID":1,"EstimatedCost":500,"ApprovedDate":null}"#)
                .unwrap();
        assert!(req.actual_cost.is_none());
        assert_eq!(req.estimated_cost, Decimal::from(500));
    }

    #[test]
    fn delete_actor_defaults_to_zero() {
        let q: NumericActorQuery = serde_json::from_str("{}").unwrap();
        assert!(q.user_id.is_none());
    }
}
