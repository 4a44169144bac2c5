use axum::extract::State;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::instrument;

use crate::gateway::OutcomeRow;
use crate::mailer::SmtpProfile;
use crate::response::{ApiError, SimpleResponse};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile))
        .route("/add-profile", post(add_profile))
        .route("/update-profile", put(update_profile))
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfileRow {
    pub company_name: String,
    pub company_email: String,
    pub motto: String,
    pub company_phone: Option<String>,
    pub physical_address: Option<String>,
    pub postal_address: Option<String>,
    pub email_server_host: Option<String>,
    pub email_server_port: Option<i32>,
    pub email_username: Option<String>,
    #[serde(skip_serializing)]
    pub email_password: Option<String>,
    pub use_ssl: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<Vec<u8>>,
}

impl CompanyProfileRow {
    /// SMTP material for outbound mail, if the profile carries a host.
    pub fn smtp_profile(&self) -> Option<SmtpProfile> {
        let host = self.email_server_host.clone()?;
        Some(SmtpProfile {
            company_name: self.company_name.clone(),
            from_address: self.company_email.clone(),
            host,
            port: self.email_server_port.unwrap_or(587) as u16,
            username: self.email_username.clone(),
            password: self.email_password.clone(),
            use_ssl: self.use_ssl.unwrap_or(true),
        })
    }
}

/// The profile is a single-tenant row; several modules read it for report
/// headers and SMTP settings.
pub async fn fetch_company_profile(db: &PgPool) -> Result<Option<CompanyProfileRow>, sqlx::Error> {
    sqlx::query_as::<_, CompanyProfileRow>("SELECT * FROM pm.get_company_profile()")
        .fetch_optional(db)
        .await
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompanyProfileRequest {
    pub company_name: String,
    pub company_email: String,
    pub motto: String,
    pub company_phone: Option<String>,
    pub physical_address: Option<String>,
    pub postal_address: Option<String>,
    pub email_server_host: Option<String>,
    pub email_server_port: Option<i32>,
    pub email_username: Option<String>,
    pub email_password: Option<String>,
    #[serde(rename = "UseSSL")]
    pub use_ssl: Option<bool>,
}

#[instrument(skip(state))]
async fn get_profile(
    State(state): State<AppState>,
) -> Result<Json<Vec<CompanyProfileRow>>, ApiError> {
    let rows = sqlx::query_as::<_, CompanyProfileRow>("SELECT * FROM pm.get_company_profile()")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(rows))
}

#[instrument(skip(state, payload))]
async fn add_profile(
    State(state): State<AppState>,
    Json(payload): Json<CompanyProfileRequest>,
) -> Result<Json<SimpleResponse>, ApiError> {
    let row = sqlx::query_as::<_, OutcomeRow>(
        "SELECT success, message \
         FROM pm.add_company_profile($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(&payload.company_name)
    .bind(&payload.company_email)
    .bind(&payload.motto)
    .bind(&payload.company_phone)
    .bind(&payload.physical_address)
    .bind(&payload.postal_address)
    .bind(&payload.email_server_host)
    .bind(payload.email_server_port)
    .bind(&payload.email_username)
    .bind(&payload.email_password)
    .bind(payload.use_ssl)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(SimpleResponse {
        success: row.success,
        message: row.message,
    }))
}

#[instrument(skip(state, payload))]
async fn update_profile(
    State(state): State<AppState>,
    Json(payload): Json<CompanyProfileRequest>,
) -> Result<Json<SimpleResponse>, ApiError> {
    let row = sqlx::query_as::<_, OutcomeRow>(
        "SELECT success, message \
         FROM pm.update_company_profile($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NULL)",
    )
    .bind(&payload.company_name)
    .bind(&payload.company_email)
    .bind(&payload.motto)
    .bind(&payload.company_phone)
    .bind(&payload.physical_address)
    .bind(&payload.postal_address)
    .bind(&payload.email_server_host)
    .bind(payload.email_server_port)
    .bind(&payload.email_username)
    .bind(&payload.email_password)
    .bind(payload.use_ssl)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(SimpleResponse {
        success: row.success,
        message: row.message,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_profile() -> CompanyProfileRow {
        CompanyProfileRow {
            company_name: "Acme".into(),
            company_email: "info@acme.test".into(),
            motto: "Ship it".into(),
            company_phone: None,
            physical_address: None,
            postal_address: None,
            email_server_host: Some("smtp.acme.test".into()),
            email_server_port: Some(2525),
            email_username: Some("mailer".into()),
            email_password: Some("s3cret".into()),
            use_ssl: Some(false),
            profile_pic: None,
        }
    }

    #[test]
    fn smtp_profile_requires_a_host() {
        let mut profile = sample_profile();
        let smtp = profile.smtp_profile().expect("host present");
        assert_eq!(smtp.host, "smtp.acme.test");
        assert_eq!(smtp.port, 2525);
        assert!(!smtp.use_ssl);

        profile.email_server_host = None;
        assert!(profile.smtp_profile().is_none());
    }

    #[test]
    fn email_password_never_serializes() {
        let json = serde_json::to_string(&sample_profile()).unwrap();
        assert!(!json.contains("s3cret"));
        assert!(json.contains("\"companyName\":\"Acme\""));
    }
}
