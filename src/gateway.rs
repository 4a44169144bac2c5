//! Thin access layer over the stored routines that own all business logic.
//!
//! Single-result-set routines are called directly with `sqlx::query_as` from
//! the resource modules. What lives here is the machinery those modules
//! share: the confirmation row shapes, the embedded-JSON column parser and
//! the multi-result-set reader built on refcursors.

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use sqlx::postgres::PgRow;
use sqlx::query::QueryScalar;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::{Date, OffsetDateTime};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("{proc} returned {got} result sets, expected {expected}")]
    ResultSetCount {
        proc: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("{proc} has no result sets left to read")]
    ResultSetExhausted { proc: &'static str },
    #[error("routine returned no confirmation row")]
    NotConfirmed,
    #[error("embedded JSON column could not be parsed: {0}")]
    BadEmbeddedJson(#[from] serde_json::Error),
}

/// Confirmation row for writes that report success, severity and payload.
#[derive(Debug, Clone, FromRow)]
pub struct StatusRow {
    pub success: bool,
    pub message_type: String,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

/// Confirmation row for writes that report only success and a message.
#[derive(Debug, Clone, FromRow)]
pub struct OutcomeRow {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct RowsAffectedRow {
    pub rows_affected: i32,
}

/// A typed argument for a routine invoked through [`ResultSets`]. Optional
/// parameters bind SQL NULL through the `None` side of each variant.
#[derive(Debug, Clone)]
pub enum SqlParam {
    Int(Option<i32>),
    BigInt(Option<i64>),
    Text(Option<String>),
    Bool(Option<bool>),
    Numeric(Option<Decimal>),
    Date(Option<Date>),
    Timestamp(Option<OffsetDateTime>),
    Bytes(Option<Vec<u8>>),
}

impl SqlParam {
    fn bind<'q>(
        self,
        q: QueryScalar<'q, Postgres, String, sqlx::postgres::PgArguments>,
    ) -> QueryScalar<'q, Postgres, String, sqlx::postgres::PgArguments> {
        match self {
            SqlParam::Int(v) => q.bind(v),
            SqlParam::BigInt(v) => q.bind(v),
            SqlParam::Text(v) => q.bind(v),
            SqlParam::Bool(v) => q.bind(v),
            SqlParam::Numeric(v) => q.bind(v),
            SqlParam::Date(v) => q.bind(v),
            SqlParam::Timestamp(v) => q.bind(v),
            SqlParam::Bytes(v) => q.bind(v),
        }
    }
}

/// SQL that collects a routine's cursor names. The emitted column is
/// `refcursor`, which the driver cannot decode directly, so it is cast to
/// text here.
fn cursor_query(proc: &str, param_count: usize) -> String {
    let placeholders = (1..=param_count)
        .map(|i| format!("${i}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT c::text FROM {proc}({placeholders}) AS c")
}

/// Sequential reader over a routine that emits several result sets as
/// refcursors inside one transaction.
///
/// The caller declares how many sets the routine is expected to emit and in
/// what order it will read them. A mismatch between declared and actual
/// cursor counts aborts immediately rather than silently mis-pairing sets
/// with target types. Empty sets still occupy their position.
pub struct ResultSets {
    tx: Transaction<'static, Postgres>,
    proc: &'static str,
    cursors: std::vec::IntoIter<String>,
}

impl ResultSets {
    pub async fn open(
        pool: &PgPool,
        proc: &'static str,
        expected: usize,
        params: Vec<SqlParam>,
    ) -> Result<Self, GatewayError> {
        let mut tx = pool.begin().await?;

        let sql = cursor_query(proc, params.len());
        let mut query = sqlx::query_scalar::<_, String>(&sql);
        for p in params {
            query = p.bind(query);
        }
        let cursors = query.fetch_all(&mut *tx).await?;

        if cursors.len() != expected {
            return Err(GatewayError::ResultSetCount {
                proc,
                expected,
                got: cursors.len(),
            });
        }
        debug!(proc, sets = cursors.len(), "result sets opened");

        Ok(Self {
            tx,
            proc,
            cursors: cursors.into_iter(),
        })
    }

    /// Read the next result set in emission order as a list of rows.
    pub async fn next_list<T>(&mut self) -> Result<Vec<T>, GatewayError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let cursor = self
            .cursors
            .next()
            .ok_or(GatewayError::ResultSetExhausted { proc: self.proc })?;
        let sql = format!("FETCH ALL FROM \"{cursor}\"");
        let rows = sqlx::query_as::<_, T>(&sql)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows)
    }

    /// Pass over the next `n` result sets without reading them. Unread
    /// cursors close with the transaction.
    pub fn skip(&mut self, n: usize) -> Result<(), GatewayError> {
        for _ in 0..n {
            self.cursors
                .next()
                .ok_or(GatewayError::ResultSetExhausted { proc: self.proc })?;
        }
        Ok(())
    }

    /// Read the next result set expecting at most one row.
    pub async fn next_row<T>(&mut self) -> Result<Option<T>, GatewayError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let cursor = self
            .cursors
            .next()
            .ok_or(GatewayError::ResultSetExhausted { proc: self.proc })?;
        let sql = format!("FETCH ALL FROM \"{cursor}\"");
        let row = sqlx::query_as::<_, T>(&sql)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
    }

    pub async fn finish(self) -> Result<(), GatewayError> {
        self.tx.commit().await?;
        Ok(())
    }
}

/// Deserialize an embedded JSON column into a typed list. A NULL or empty
/// column is an empty list, never an error; malformed JSON is an error.
pub fn parse_embedded_list<T: DeserializeOwned>(
    raw: Option<&str>,
) -> Result<Vec<T>, GatewayError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Vec::new()),
        Some(s) => Ok(serde_json::from_str(s)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "PascalCase")]
    struct EmbeddedEmployee {
        #[serde(rename = "EmployeeID")]
        employee_id: i32,
        full_name: String,
    }

    #[test]
    fn cursor_query_casts_refcursor_names_to_text() {
        assert_eq!(
            cursor_query("pm.get_client_dashboard", 1),
            "SELECT c::text FROM pm.get_client_dashboard($1) AS c"
        );
        assert_eq!(
            cursor_query("core.login_pm", 2),
            "SELECT c::text FROM core.login_pm($1, $2) AS c"
        );
        assert_eq!(
            cursor_query("pm.no_args", 0),
            "SELECT c::text FROM pm.no_args() AS c"
        );
    }

    #[test]
    fn embedded_list_parses_typed_rows() {
        let rows: Vec<EmbeddedEmployee> =
            parse_embedded_list(Some(r#"[{"EmployeeID":1,"FullName":"A"}]"#)).unwrap();
        assert_eq!(
            rows,
            vec![EmbeddedEmployee {
                employee_id: 1,
                full_name: "A".into()
            }]
        );
    }

    #[test]
    fn null_and_empty_columns_are_empty_lists() {
        let rows: Vec<EmbeddedEmployee> = parse_embedded_list(None).unwrap();
        assert!(rows.is_empty());
        let rows: Vec<EmbeddedEmployee> = parse_embedded_list(Some("")).unwrap();
        assert!(rows.is_empty());
        let rows: Vec<EmbeddedEmployee> = parse_embedded_list(Some("  ")).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn malformed_embedded_json_is_an_error() {
        let err = parse_embedded_list::<EmbeddedEmployee>(Some("{not json")).unwrap_err();
        assert!(matches!(err, GatewayError::BadEmbeddedJson(_)));
    }
}
