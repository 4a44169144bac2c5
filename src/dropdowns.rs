use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use sqlx::FromRow;
use tracing::instrument;

use crate::response::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/projects-item", get(get_projects_item))
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectItemRow {
    pub project_id: i32,
    pub project_name: String,
}

#[instrument(skip(state))]
async fn get_projects_item(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProjectItemRow>>, ApiError> {
    let rows = sqlx::query_as::<_, ProjectItemRow>("SELECT * FROM pm.get_projects_item()")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(rows))
}
