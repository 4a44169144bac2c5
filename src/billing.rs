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
    SimpleResponse, WriteKind,
};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/billings", get(get_all_billings))
        .route("/billing-status", get(get_all_billing_status))
        .route("/add-billing", post(add_billing))
        .route("/change-status", put(change_billing_status))
        .route("/update-billing", put(update_billing))
        .route("/delete-billing/:billing_id", delete(delete_billing))
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BillingRow {
    pub billing_id: i32,
    pub project_id: i32,
    pub project_name: String,
    pub invoice_number: String,
    pub amount: Decimal,
    pub billing_date: Date,
    pub due_date: Date,
    pub billing_status_id: Option<i32>,
    pub billing_status: Option<String>,
    pub days_until_due: i32,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BillingStatusRow {
    pub billing_status_id: i32,
    pub status_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddBillingRequest {
    #[serde(rename = "ProjectID")]
    pub project_id: i32,
    pub invoice_number: String,
    pub amount: Decimal,
    pub billing_date: Date,
    pub due_date: Date,
    #[serde(rename = "BillingStatusID")]
    pub billing_status_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChangeBillingStatusRequest {
    #[serde(rename = "BillingID")]
    pub billing_id: i32,
    #[serde(rename = "NewStatusID")]
    pub new_status_id: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateBillingRequest {
    #[serde(rename = "BillingID")]
    pub billing_id: i32,
    pub amount: Decimal,
    pub billing_date: Date,
    pub due_date: Date,
    #[serde(rename = "BillingStatusID")]
    pub billing_status_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ActorQuery {
    #[serde(rename = "userId", default = "default_actor")]
    pub user_id: String,
}

fn default_actor() -> String {
    "SYSTEM".into()
}

#[instrument(skip(state))]
async fn get_all_billings(
    State(state): State<AppState>,
) -> Result<Json<Vec<BillingRow>>, ApiError> {
    let rows = sqlx::query_as::<_, BillingRow>("SELECT * FROM pm.get_all_billings()")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
async fn get_all_billing_status(
    State(state): State<AppState>,
) -> Result<Json<Vec<BillingStatusRow>>, ApiError> {
    let rows = sqlx::query_as::<_, BillingStatusRow>("SELECT * FROM pm.get_all_billing_status()")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(rows))
}

#[instrument(skip(state, payload))]
async fn add_billing(
    State(state): State<AppState>,
    Json(payload): Json<AddBillingRequest>,
) -> Result<(StatusCode, Json<EnhancedResponse>), ApiError> {
    let row = sqlx::query_as::<_, StatusRow>(
        "SELECT success, message_type, message, data \
         FROM pm.add_billing($1, $2, $3, $4, $5, $6)",
    )
    .bind(payload.project_id)
    .bind(&payload.invoice_number)
    .bind(payload.amount)
    .bind(payload.billing_date)
    .bind(payload.due_date)
    .bind(payload.billing_status_id)
    .fetch_optional(&state.db)
    .await?;

    let Some(row) = row else {
        return Ok(failed_reply("Failed to execute billing operation"));
    };
    Ok(enhanced_reply(WriteKind::Insert, row))
}

#[instrument(skip(state, payload))]
async fn change_billing_status(
    State(state): State<AppState>,
    Json(payload): Json<ChangeBillingStatusRequest>,
) -> Result<Json<SimpleResponse>, ApiError> {
    let message = sqlx::query_scalar::<_, String>(
        "SELECT response_message FROM pm.change_billing_status($1, $2)",
    )
    .bind(payload.billing_id)
    .bind(payload.new_status_id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(SimpleResponse {
        success: true,
        message,
    }))
}

#[instrument(skip(state, payload))]
async fn update_billing(
    State(state): State<AppState>,
    Json(payload): Json<UpdateBillingRequest>,
) -> Result<(StatusCode, Json<RowsAffected>), ApiError> {
    let row = sqlx::query_as::<_, RowsAffectedRow>(
        "SELECT rows_affected FROM pm.update_billing($1, $2, $3, $4, $5)",
    )
    .bind(payload.billing_id)
    .bind(payload.amount)
    .bind(payload.billing_date)
    .bind(payload.due_date)
    .bind(payload.billing_status_id)
    .fetch_optional(&state.db)
    .await?;

    Ok(rows_affected_reply(row.map(|r| r.rows_affected).unwrap_or(0)))
}

#[instrument(skip(state))]
async fn delete_billing(
    State(state): State<AppState>,
    Path(billing_id): Path<i32>,
    Query(actor): Query<ActorQuery>,
) -> Result<(StatusCode, Json<EnhancedResponse>), ApiError> {
    let row = sqlx::query_as::<_, StatusRow>(
        "SELECT success, message_type, message, data FROM pm.delete_billing($1, $2)",
    )
    .bind(billing_id)
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
    fn add_billing_request_accepts_documented_body() {
        let body = r#"{"ProjectID":5,"InvoiceNumber":"INV-001","Amount":1000.00,
                       "BillingDate":"2024-01-01","DueDate":"2024-02-01","BillingStatusID":null}"#;
        let req: AddBillingRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.project_id, 5);
        assert_eq!(req.invoice_number, "INV-001");
        assert_eq!(req.billing_date, date!(2024 - 01 - 01));
        assert!(req.billing_status_id.is_none());
    }

    #[test]
    fn billing_row_serializes_camel_case() {
        let row = BillingRow {
            billing_id: 1,
            project_id: 5,
            project_name: "Apollo".into(),
            invoice_number: "INV-001".into(),
            amount: Decimal::new(100000, 2),
            billing_date: date!(2024 - 01 - 01),
            due_date: date!(2024 - 02 - 01),
            billing_status_id: None,
            billing_status: None,
            days_until_due: 31,
        };
        let json = serde_json::to_string(&row).unwrap();
        assert!(json.contains("\"billingId\":1"));
        assert!(json.contains("\"daysUntilDue\":31"));
    }

    #[test]
    fn actor_query_defaults_to_system() {
        let q: ActorQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.user_id, "SYSTEM");
    }
}
