use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use crate::gateway::{GatewayError, StatusRow};

/// Severity tag emitted by status-reporting procedures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageType {
    Info,
    Warning,
    Error,
}

impl MessageType {
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "INFO" => MessageType::Info,
            "WARNING" => MessageType::Warning,
            _ => MessageType::Error,
        }
    }
}

/// Body for writes whose procedure reports success, severity, message and
/// an optional data payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedResponse {
    pub success: bool,
    pub message_type: MessageType,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Body for writes whose procedure reports only success and a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowsAffected {
    pub rows_affected: i32,
}

/// Which write verb produced a status row; decides the status code for
/// WARNING outcomes (duplicate on insert vs missing target on update/delete).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Insert,
    Update,
    Delete,
}

/// Map a procedure status row onto the HTTP reply contract: success is 200,
/// WARNING is 409 for inserts and 404 for updates/deletes, anything else 400.
/// The body always carries the procedure's own message.
pub fn enhanced_reply(kind: WriteKind, row: StatusRow) -> (StatusCode, Json<EnhancedResponse>) {
    let message_type = MessageType::parse(&row.message_type);
    let body = EnhancedResponse {
        success: row.success,
        message_type,
        message: row.message,
        data: row.data,
    };
    let status = if body.success {
        StatusCode::OK
    } else {
        match (message_type, kind) {
            (MessageType::Warning, WriteKind::Insert) => StatusCode::CONFLICT,
            (MessageType::Warning, _) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        }
    };
    (status, Json(body))
}

/// Reply used when a write routine produced no confirmation row at all.
pub fn failed_reply(message: &str) -> (StatusCode, Json<EnhancedResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(EnhancedResponse {
            success: false,
            message_type: MessageType::Error,
            message: message.to_string(),
            data: None,
        }),
    )
}

/// Rows-affected contract: zero rows means nothing matched, reported as 400
/// with the count still in the body.
pub fn rows_affected_reply(rows: i32) -> (StatusCode, Json<RowsAffected>) {
    let status = if rows > 0 {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(RowsAffected { rows_affected: rows }))
}

/// Uniform error reply: every failure surfaces as `{success, message}` with
/// an appropriate status code. Database faults are logged in full but leave
/// only a generic message in the body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "message": self.message,
        }));
        (self.status, body).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        error!(error = %e, "database error");
        ApiError::internal("An unexpected database error occurred.")
    }
}

impl From<GatewayError> for ApiError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::NotConfirmed => {
                ApiError::bad_request("The operation could not be confirmed.")
            }
            other => {
                error!(error = %other, "gateway error");
                ApiError::internal("An unexpected database error occurred.")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_row(success: bool, message_type: &str, message: &str) -> StatusRow {
        StatusRow {
            success,
            message_type: message_type.into(),
            message: message.into(),
            data: None,
        }
    }

    #[test]
    fn successful_write_is_200() {
        let (status, Json(body)) =
            enhanced_reply(WriteKind::Insert, status_row(true, "INFO", "Created."));
        assert_eq!(status, StatusCode::OK);
        assert!(body.success);
        assert_eq!(body.message_type, MessageType::Info);
    }

    #[test]
    fn insert_warning_is_conflict() {
        let (status, Json(body)) = enhanced_reply(
            WriteKind::Insert,
            status_row(false, "WARNING", "Duplicate invoice number."),
        );
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.message, "Duplicate invoice number.");
    }

    #[test]
    fn update_and_delete_warnings_are_not_found() {
        let (status, _) = enhanced_reply(
            WriteKind::Update,
            status_row(false, "WARNING", "No such record."),
        );
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = enhanced_reply(
            WriteKind::Delete,
            status_row(false, "warning", "No such record."),
        );
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn error_outcomes_are_400() {
        let (status, _) = enhanced_reply(
            WriteKind::Update,
            status_row(false, "ERROR", "Constraint violation."),
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // Unknown severity degrades to ERROR
        let (status, _) = enhanced_reply(
            WriteKind::Insert,
            status_row(false, "SOMETHING", "Odd."),
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn zero_rows_affected_is_400_with_count_in_body() {
        let (status, Json(body)) = rows_affected_reply(0);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.rows_affected, 0);

        let (status, Json(body)) = rows_affected_reply(3);
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.rows_affected, 3);
    }

    #[test]
    fn bodies_serialize_camel_case() {
        let body = EnhancedResponse {
            success: true,
            message_type: MessageType::Warning,
            message: "m".into(),
            data: None,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"messageType\":\"WARNING\""));
        assert!(!json.contains("data"));

        let json = serde_json::to_string(&RowsAffected { rows_affected: 2 }).unwrap();
        assert_eq!(json, "{\"rowsAffected\":2}");
    }
}
