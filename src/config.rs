use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub expiry_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    /// Exact origins allowed by CORS; empty means allow any (dev only).
    pub cors_allowed_origins: Vec<String>,
    /// Front-end page that consumes password-reset tokens.
    pub reset_password_url: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "pm-gateway".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "pm-frontend".into()),
            expiry_hours: std::env::var("JWT_EXPIRY_HOURS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(24),
        };
        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        let reset_password_url = std::env::var("RESET_PASSWORD_URL")
            .unwrap_or_else(|_| "http://localhost:3000/reset-password".into());
        Ok(Self {
            database_url,
            jwt,
            cors_allowed_origins,
            reset_password_url,
        })
    }
}
