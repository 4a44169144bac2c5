use axum::{
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};

use crate::{config::JwtConfig, state::AppState};

/// Identity claims issued at login. Mirrors what the front end reads from
/// the token: who the user is and which role drives its menus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i32,
    pub name: String,
    pub email: String,
    pub role: String,
    pub role_id: i32,
    pub status_id: i32,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
}

/// What the signer needs to know about the authenticated user.
#[derive(Debug, Clone)]
pub struct TokenUser {
    pub user_id: i32,
    pub full_name: String,
    pub email: String,
    pub role_name: String,
    pub role_id: i32,
    pub status_id: i32,
}

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub expiry_hours: i64,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            issuer,
            audience,
            expiry_hours,
        } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            expiry_hours,
        }
    }
}

impl JwtKeys {
    pub fn sign(&self, user: &TokenUser) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::hours(self.expiry_hours);
        let claims = Claims {
            sub: user.user_id,
            name: user.full_name.clone(),
            email: user.email.clone(),
            role: user.role_name.clone(),
            role_id: user.role_id,
            status_id: user.status_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = user.user_id, role = %user.role_name, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

/// Extractor for endpoints that require a bearer token. Yields the full
/// claim set so handlers can read the caller's user id and role.
pub struct AuthUser(pub Claims);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or((
                StatusCode::UNAUTHORIZED,
                "Missing Authorization header".to_string(),
            ))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or((
            StatusCode::UNAUTHORIZED,
            "Invalid Authorization header".to_string(),
        ))?;

        match keys.verify(token) {
            Ok(claims) => Ok(AuthUser(claims)),
            Err(_) => {
                warn!("invalid or expired token");
                Err((
                    StatusCode::UNAUTHORIZED,
                    "Invalid or expired token".to_string(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod jwt_tests {
    use super::*;

    fn make_keys() -> JwtKeys {
        let state = AppState::fake();
        JwtKeys::from_ref(&state)
    }

    fn sample_user() -> TokenUser {
        TokenUser {
            user_id: 42,
            full_name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            role_name: "Admin".into(),
            role_id: 1,
            status_id: 2,
        }
    }

    #[tokio::test]
    async fn sign_and_verify_round_trips_identity_claims() {
        let keys = make_keys();
        let token = keys.sign(&sample_user()).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.name, "Ada Lovelace");
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.role, "Admin");
        assert_eq!(claims.role_id, 1);
        assert_eq!(claims.status_id, 2);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
    }

    #[tokio::test]
    async fn expiry_follows_configured_hours() {
        let keys = make_keys();
        let token = keys.sign(&sample_user()).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        let lifetime = claims.exp - claims.iat;
        assert_eq!(lifetime, 24 * 60 * 60);
    }

    #[tokio::test]
    async fn verify_rejects_wrong_secret() {
        let keys = make_keys();
        let token = keys.sign(&sample_user()).expect("sign");
        let other = JwtKeys {
            encoding: EncodingKey::from_secret(b"other-secret"),
            decoding: DecodingKey::from_secret(b"other-secret"),
            issuer: keys.issuer.clone(),
            audience: keys.audience.clone(),
            expiry_hours: keys.expiry_hours,
        };
        assert!(other.verify(&token).is_err());
    }

    #[tokio::test]
    async fn verify_rejects_wrong_issuer_or_audience() {
        let keys = make_keys();
        let token = keys.sign(&sample_user()).expect("sign");
        let mut strict = make_keys();
        strict.issuer = "someone-else".into();
        assert!(strict.verify(&token).is_err());
    }
}
