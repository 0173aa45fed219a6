use serde_json::{Map, Value};
use sqlx::{
    postgres::{PgArguments, PgRow},
    FromRow, PgPool, Postgres,
};

use crate::database::manager::DatabaseError;

/// A SQL statement (or fragment) paired with its positional bind values
#[derive(Debug, Clone, PartialEq)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<Value>,
}

/// External (API) field name to storage column name
pub type ColumnMap = &'static [(&'static str, &'static str)];

/// Output of [`sql_for_partial_update`]
#[derive(Debug, Clone, PartialEq)]
pub struct SetClause {
    pub set_cols: String,
    pub values: Vec<Value>,
}

impl SetClause {
    /// Placeholder index for the first parameter following the SET values
    pub fn next_param(&self) -> usize {
        self.values.len() + 1
    }
}

/// Build the `SET` clause for a partial update.
///
/// Every key of `data` becomes `"column"=$N`, in insertion order, with the
/// column looked up in `columns` and falling back to the key itself. The
/// returned values line up with the placeholders. An empty `data` map is a
/// caller error.
///
/// ```ignore
/// let data = json!({"firstName": "Aliya", "age": 32});
/// let set = sql_for_partial_update(data.as_object().unwrap(), &[("firstName", "first_name")])?;
/// assert_eq!(set.set_cols, r#""first_name"=$1, "age"=$2"#);
/// ```
pub fn sql_for_partial_update(
    data: &Map<String, Value>,
    columns: ColumnMap,
) -> Result<SetClause, DatabaseError> {
    if data.is_empty() {
        return Err(DatabaseError::bad_request("No data"));
    }

    let set_cols = data
        .keys()
        .enumerate()
        .map(|(idx, key)| format!("\"{}\"=${}", column_for(key, columns), idx + 1))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(SetClause {
        set_cols,
        values: data.values().cloned().collect(),
    })
}

fn column_for<'a>(key: &'a str, columns: ColumnMap) -> &'a str {
    columns
        .iter()
        .find(|(external, _)| *external == key)
        .map(|(_, column)| *column)
        .unwrap_or(key)
}

pub fn bind_value<'q>(
    q: sqlx::query::Query<'q, Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        Value::Array(_) | Value::Object(_) => q.bind(v.to_string()),
    }
}

pub fn bind_value_as<'q, O>(
    q: sqlx::query::QueryAs<'q, Postgres, O, PgArguments>,
    v: &'q Value,
) -> sqlx::query::QueryAs<'q, Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, sqlx::postgres::PgRow>,
{
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        Value::Array(_) | Value::Object(_) => q.bind(v.to_string()),
    }
}

/// Run a statement and map every row
pub async fn fetch_all<T>(pool: &PgPool, sql: &SqlResult) -> Result<Vec<T>, DatabaseError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    log_query(sql);
    let mut q = sqlx::query_as::<_, T>(&sql.query);
    for p in sql.params.iter() {
        q = bind_value_as(q, p);
    }
    Ok(q.fetch_all(pool).await?)
}

/// Run a statement expected to touch at most one row
pub async fn fetch_optional<T>(pool: &PgPool, sql: &SqlResult) -> Result<Option<T>, DatabaseError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    log_query(sql);
    let mut q = sqlx::query_as::<_, T>(&sql.query);
    for p in sql.params.iter() {
        q = bind_value_as(q, p);
    }
    Ok(q.fetch_optional(pool).await?)
}

/// Run a statement for its affected-row count
pub async fn execute(pool: &PgPool, sql: &SqlResult) -> Result<u64, DatabaseError> {
    log_query(sql);
    let mut q = sqlx::query(&sql.query);
    for p in sql.params.iter() {
        q = bind_value(q, p);
    }
    Ok(q.execute(pool).await?.rows_affected())
}

fn log_query(sql: &SqlResult) {
    if crate::config::config().database.enable_query_logging {
        tracing::debug!(params = sql.params.len(), "SQL: {}", sql.query);
    }
}

/// Serialize a patch struct into an ordered field map, dropping absent fields
pub fn to_changes<T: serde::Serialize>(patch: &T) -> Result<Map<String, Value>, DatabaseError> {
    match serde_json::to_value(patch) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(DatabaseError::bad_request("Update payload must be an object")),
        Err(e) => Err(DatabaseError::bad_request(format!("Invalid update payload: {}", e))),
    }
}
