//! Bridging between translator output and rusqlite
//!
//! - [`Param`] values become [`SqlValue`]s for binding
//! - result cells are read back through small typed accessors
//! - unique-constraint failures are recognized without touching any
//!   other native error

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::ffi;
pub use rusqlite::types::Value as SqlValue;
use stratadoc_core::{Error, Result};
use stratadoc_query::Param;

/// One result row
pub type Row = Vec<SqlValue>;

/// Convert a translator parameter into a bindable value
pub fn to_sql_value(param: &Param) -> SqlValue {
    match param {
        Param::Int(i) => SqlValue::Integer(*i),
        Param::Float(f) => SqlValue::Real(*f),
        Param::Text(s) => SqlValue::Text(s.clone()),
    }
}

/// Convert a parameter list
pub fn to_sql_values(params: &[Param]) -> Vec<SqlValue> {
    params.iter().map(to_sql_value).collect()
}

/// Destructure a row with a known column count
pub fn columns<const N: usize>(row: Row) -> Result<[SqlValue; N]> {
    row.try_into()
        .map_err(|row: Row| Error::storage(rusqlite::Error::InvalidColumnIndex(row.len().min(N))))
}

/// Read an integer cell
pub fn as_i64(value: &SqlValue) -> Result<i64> {
    match value {
        SqlValue::Integer(i) => Ok(*i),
        other => Err(unexpected("integer", other)),
    }
}

/// Read a text cell
pub fn as_text(value: &SqlValue) -> Result<&str> {
    match value {
        SqlValue::Text(s) => Ok(s),
        other => Err(unexpected("text", other)),
    }
}

/// Take ownership of a text cell
pub fn into_text(value: SqlValue) -> Result<String> {
    match value {
        SqlValue::Text(s) => Ok(s),
        other => Err(unexpected("text", &other)),
    }
}

/// Render a timestamp the way it is stored
pub fn format_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp
pub fn parse_time(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| Error::Serialization(format!("invalid stored timestamp '{}': {}", text, e)))
}

fn unexpected(wanted: &str, found: &SqlValue) -> Error {
    Error::storage(rusqlite::Error::InvalidColumnType(
        0,
        format!("expected {}", wanted),
        found.data_type(),
    ))
}

/// Which unique constraint a write tripped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UniqueViolation {
    /// The `(collection_id, doc_id)` primary key
    PrimaryKey,
    /// A unique expression index, by native name
    Index(String),
}

/// Recognize a unique-constraint failure inside a storage error
///
/// Returns `None` for every other error, which the caller propagates as is.
pub fn unique_violation(err: &Error) -> Option<UniqueViolation> {
    let Error::Storage(source) = err else {
        return None;
    };
    let sqlite = source.downcast_ref::<rusqlite::Error>()?;
    let rusqlite::Error::SqliteFailure(failure, message) = sqlite else {
        return None;
    };
    match failure.extended_code {
        ffi::SQLITE_CONSTRAINT_PRIMARYKEY => Some(UniqueViolation::PrimaryKey),
        ffi::SQLITE_CONSTRAINT_UNIQUE => {
            let message = message.as_deref().unwrap_or_default();
            Some(match index_name(message) {
                Some(name) => UniqueViolation::Index(name.to_string()),
                None => UniqueViolation::PrimaryKey,
            })
        }
        _ => None,
    }
}

/// Pull the index name out of `UNIQUE constraint failed: index 'name'`
fn index_name(message: &str) -> Option<&str> {
    let start = message.find("index '")? + "index '".len();
    let rest = &message[start..];
    let end = rest.find('\'')?;
    Some(&rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_param_conversion() {
        assert_eq!(to_sql_value(&Param::Int(3)), SqlValue::Integer(3));
        assert_eq!(to_sql_value(&Param::Float(1.5)), SqlValue::Real(1.5));
        assert_eq!(
            to_sql_value(&Param::Text("x".into())),
            SqlValue::Text("x".into())
        );
    }

    #[test]
    fn test_cell_accessors() {
        assert_eq!(as_i64(&SqlValue::Integer(7)).unwrap(), 7);
        assert!(as_i64(&SqlValue::Null).is_err());
        assert_eq!(as_text(&SqlValue::Text("a".into())).unwrap(), "a");
        assert!(into_text(SqlValue::Integer(1)).is_err());
    }

    #[test]
    fn test_columns() {
        let [a, b] = columns::<2>(vec![SqlValue::Integer(1), SqlValue::Null]).unwrap();
        assert_eq!(a, SqlValue::Integer(1));
        assert_eq!(b, SqlValue::Null);
        assert!(columns::<3>(vec![SqlValue::Null]).is_err());
    }

    #[test]
    fn test_time_round_trip() {
        let at = Utc::now();
        let text = format_time(at);
        assert!(text.ends_with('Z'));
        let parsed = parse_time(&text).unwrap();
        assert_eq!(parsed.timestamp_micros(), at.timestamp_micros());
        assert!(parse_time("yesterday").is_err());
    }

    #[test]
    fn test_index_name_extraction() {
        assert_eq!(
            index_name("UNIQUE constraint failed: index 'sdx_1_users_email'"),
            Some("sdx_1_users_email")
        );
        assert_eq!(index_name("UNIQUE constraint failed: t.a"), None);
    }

    #[test]
    fn test_detects_primary_key_violation() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (a INTEGER, b TEXT, PRIMARY KEY (a, b));")
            .unwrap();
        conn.execute("INSERT INTO t VALUES (1, 'x')", []).unwrap();
        let err = Error::storage(conn.execute("INSERT INTO t VALUES (1, 'x')", []).unwrap_err());
        assert_eq!(unique_violation(&err), Some(UniqueViolation::PrimaryKey));
    }

    #[test]
    fn test_detects_expression_index_violation() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (data TEXT);
             CREATE UNIQUE INDEX \"sdx_1_t_email\" ON t(json_extract(data, '$.email'));",
        )
        .unwrap();
        conn.execute("INSERT INTO t VALUES ('{\"email\":\"a\"}')", [])
            .unwrap();
        let err = Error::storage(
            conn.execute("INSERT INTO t VALUES ('{\"email\":\"a\"}')", [])
                .unwrap_err(),
        );
        assert_eq!(
            unique_violation(&err),
            Some(UniqueViolation::Index("sdx_1_t_email".into()))
        );
    }

    #[test]
    fn test_other_errors_pass_through() {
        let conn = Connection::open_in_memory().unwrap();
        let err = Error::storage(conn.execute("SELECT * FROM missing", []).unwrap_err());
        assert_eq!(unique_violation(&err), None);
        assert_eq!(unique_violation(&Error::invalid_argument("x")), None);
    }
}
