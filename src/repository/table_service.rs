use chrono::NaiveDate;
use serde_json::{Map, Value};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use crate::error::AppError;

/// Every table this service may touch. Anything else is rejected before a
/// query is built.
const ALLOWED_TABLES: &[&str] = &["properties", "units", "tenants", "rent_payments"];

/// Lists rows as JSON objects, newest-first by default. Filters are a map of
/// `column` (or `column__gte` / `column__lte` / `column__is_null`) to value.
pub async fn list_rows(
    pool: &PgPool,
    table: &str,
    filters: Option<&Map<String, Value>>,
    limit: i64,
    offset: i64,
    order_by: &str,
    ascending: bool,
) -> Result<Vec<Value>, AppError> {
    let table_name = validate_table(table)?;
    let order_name = if order_by.trim().is_empty() {
        "created_at"
    } else {
        validate_identifier(order_by)?
    };

    let mut query = QueryBuilder::<Postgres>::new("SELECT row_to_json(t) AS row FROM ");
    query.push(table_name).push(" t WHERE 1=1");

    if let Some(filter_map) = filters {
        for (key, value) in filter_map {
            push_filter_clause(&mut query, key, value)?;
        }
    }

    query.push(" ORDER BY t.").push(order_name);
    query.push(if ascending { " ASC" } else { " DESC" });
    query
        .push(" LIMIT ")
        .push_bind(limit.clamp(1, 1000))
        .push(" OFFSET ")
        .push_bind(offset.max(0));

    let rows = query.build().fetch_all(pool).await.map_err(map_db_error)?;
    Ok(read_rows(rows))
}

pub async fn get_row(
    pool: &PgPool,
    table: &str,
    row_id: &str,
    id_field: &str,
) -> Result<Value, AppError> {
    let table_name = validate_table(table)?;
    let id_name = validate_identifier(id_field)?;

    let mut query = QueryBuilder::<Postgres>::new("SELECT row_to_json(t) AS row FROM ");
    query.push(table_name).push(" t WHERE ");
    push_eq_filter(
        &mut query,
        id_name,
        &infer_scalar(id_name, &Value::String(row_id.to_string())),
    );
    query.push(" LIMIT 1");

    let row = query
        .build()
        .fetch_optional(pool)
        .await
        .map_err(map_db_error)?;

    row.and_then(|value| value.try_get::<Option<Value>, _>("row").ok().flatten())
        .ok_or_else(|| AppError::NotFound(format!("{table_name} record not found.")))
}

/// Inserts a JSON payload. `jsonb_populate_record` lets PostgreSQL resolve
/// column types (uuid, enum, date, numeric) from the table definition, so the
/// payload can stay loosely typed on the Rust side.
pub async fn create_row(
    pool: &PgPool,
    table: &str,
    payload: &Map<String, Value>,
) -> Result<Value, AppError> {
    let table_name = validate_table(table)?;
    if payload.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Could not create {table_name} record."
        )));
    }

    let mut keys = payload.keys().cloned().collect::<Vec<_>>();
    keys.sort_unstable();
    for key in &keys {
        validate_identifier(key)?;
    }

    let mut query = QueryBuilder::<Postgres>::new("INSERT INTO ");
    query.push(table_name).push(" (");
    {
        let mut separated = query.separated(", ");
        for key in &keys {
            separated.push(validate_identifier(key)?);
        }
    }
    query.push(") SELECT ");
    {
        let mut separated = query.separated(", ");
        for key in &keys {
            separated.push("r.");
            separated.push_unseparated(validate_identifier(key)?);
        }
    }
    query
        .push(" FROM jsonb_populate_record(NULL::")
        .push(table_name)
        .push(", ");
    query.push_bind(Value::Object(payload.clone()));
    query
        .push(") r RETURNING row_to_json(")
        .push(table_name)
        .push(".*) AS row");

    let row = query
        .build()
        .fetch_optional(pool)
        .await
        .map_err(map_db_error)?;

    row.and_then(|value| value.try_get::<Option<Value>, _>("row").ok().flatten())
        .ok_or_else(|| AppError::Internal(format!("Could not create {table_name} record.")))
}

pub async fn update_row(
    pool: &PgPool,
    table: &str,
    row_id: &str,
    payload: &Map<String, Value>,
    id_field: &str,
) -> Result<Value, AppError> {
    let table_name = validate_table(table)?;
    let id_name = validate_identifier(id_field)?;
    if payload.is_empty() {
        return Err(AppError::BadRequest("No fields to update.".to_string()));
    }

    let mut keys = payload.keys().cloned().collect::<Vec<_>>();
    keys.sort_unstable();
    for key in &keys {
        validate_identifier(key)?;
    }

    let mut query = QueryBuilder::<Postgres>::new("UPDATE ");
    query.push(table_name).push(" t SET ");
    {
        let mut separated = query.separated(", ");
        for key in &keys {
            let column = validate_identifier(key)?;
            separated.push(column);
            separated.push_unseparated(" = r.");
            separated.push_unseparated(column);
        }
    }
    query
        .push(" FROM jsonb_populate_record(NULL::")
        .push(table_name)
        .push(", ");
    query.push_bind(Value::Object(payload.clone()));
    query.push(") r WHERE ");
    push_eq_filter(
        &mut query,
        id_name,
        &infer_scalar(id_name, &Value::String(row_id.to_string())),
    );
    query.push(" RETURNING row_to_json(t) AS row");

    let row = query
        .build()
        .fetch_optional(pool)
        .await
        .map_err(map_db_error)?;

    row.and_then(|value| value.try_get::<Option<Value>, _>("row").ok().flatten())
        .ok_or_else(|| AppError::NotFound(format!("{table_name} record not found.")))
}

/// Deletes a row and returns its last known state.
pub async fn delete_row(
    pool: &PgPool,
    table: &str,
    row_id: &str,
    id_field: &str,
) -> Result<Value, AppError> {
    let existing = get_row(pool, table, row_id, id_field).await?;
    let table_name = validate_table(table)?;
    let id_name = validate_identifier(id_field)?;

    let mut query = QueryBuilder::<Postgres>::new("DELETE FROM ");
    query.push(table_name).push(" t WHERE ");
    push_eq_filter(
        &mut query,
        id_name,
        &infer_scalar(id_name, &Value::String(row_id.to_string())),
    );
    query.build().execute(pool).await.map_err(map_db_error)?;

    Ok(existing)
}

pub async fn count_rows(
    pool: &PgPool,
    table: &str,
    filters: Option<&Map<String, Value>>,
) -> Result<i64, AppError> {
    let table_name = validate_table(table)?;

    let mut query = QueryBuilder::<Postgres>::new("SELECT COUNT(*)::bigint AS total FROM ");
    query.push(table_name).push(" t WHERE 1=1");

    if let Some(filter_map) = filters {
        for (key, value) in filter_map {
            push_filter_clause(&mut query, key, value)?;
        }
    }

    let row = query.build().fetch_one(pool).await.map_err(map_db_error)?;
    Ok(row.try_get::<i64, _>("total").unwrap_or(0))
}

fn read_rows(rows: Vec<PgRow>) -> Vec<Value> {
    rows.into_iter()
        .filter_map(|row| row.try_get::<Option<Value>, _>("row").ok().flatten())
        .collect()
}

fn map_db_error(error: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(ref db_error) = error {
        if db_error.is_unique_violation() {
            return AppError::Conflict("A record with these values already exists.".to_string());
        }
        if db_error.is_foreign_key_violation() {
            return AppError::BadRequest("Record references a missing row.".to_string());
        }
    }
    AppError::Database(format!("Database operation failed: {error}"))
}

fn validate_table(table: &str) -> Result<&str, AppError> {
    let normalized = validate_identifier(table)?;
    if ALLOWED_TABLES.contains(&normalized) {
        return Ok(normalized);
    }
    Err(AppError::BadRequest(format!(
        "Table '{normalized}' is not allowed."
    )))
}

fn validate_identifier(identifier: &str) -> Result<&str, AppError> {
    let trimmed = identifier.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(
            "Identifier cannot be empty.".to_string(),
        ));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        || trimmed
            .chars()
            .next()
            .is_some_and(|first| first.is_ascii_digit())
    {
        return Err(AppError::BadRequest(format!(
            "Invalid identifier '{trimmed}'."
        )));
    }
    Ok(trimmed)
}

#[derive(Debug, Clone, PartialEq)]
enum Scalar {
    Text(String),
    Uuid(uuid::Uuid),
    Bool(bool),
    I64(i64),
    F64(f64),
    Date(NaiveDate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterOperator {
    Eq,
    Gte,
    Lte,
    IsNull,
}

fn parse_filter_key(filter_key: &str) -> Result<(&str, FilterOperator), AppError> {
    let (column, operator) = match filter_key.rsplit_once("__") {
        Some((column, "gte")) => (column, FilterOperator::Gte),
        Some((column, "lte")) => (column, FilterOperator::Lte),
        Some((column, "is_null")) => (column, FilterOperator::IsNull),
        _ => (filter_key, FilterOperator::Eq),
    };
    Ok((validate_identifier(column)?, operator))
}

/// Picks a bind type for a filter value. String values are probed as uuid,
/// then date, and fall back to text; the `id` columns are uuids in every
/// table here.
fn infer_scalar(column: &str, value: &Value) -> Scalar {
    match value {
        Value::Bool(flag) => Scalar::Bool(*flag),
        Value::Number(number) => number
            .as_i64()
            .map(Scalar::I64)
            .unwrap_or_else(|| Scalar::F64(number.as_f64().unwrap_or_default())),
        Value::String(text) => {
            let trimmed = text.trim();
            if column == "id" || column.ends_with("_id") {
                if let Ok(id) = uuid::Uuid::parse_str(trimmed) {
                    return Scalar::Uuid(id);
                }
            }
            if let Ok(date) = trimmed.parse::<NaiveDate>() {
                return Scalar::Date(date);
            }
            Scalar::Text(trimmed.to_string())
        }
        other => Scalar::Text(other.to_string()),
    }
}

fn push_filter_clause(
    query: &mut QueryBuilder<Postgres>,
    filter_key: &str,
    value: &Value,
) -> Result<(), AppError> {
    let (column, operator) = parse_filter_key(filter_key)?;

    match operator {
        FilterOperator::IsNull => {
            query.push(" AND t.").push(column);
            if value.as_bool().unwrap_or(true) {
                query.push(" IS NULL");
            } else {
                query.push(" IS NOT NULL");
            }
        }
        FilterOperator::Eq => {
            if value.is_null() {
                return Ok(());
            }
            query.push(" AND ");
            push_eq_filter(query, column, &infer_scalar(column, value));
        }
        FilterOperator::Gte | FilterOperator::Lte => {
            if value.is_null() {
                return Ok(());
            }
            let sql_operator = if operator == FilterOperator::Gte {
                " >= "
            } else {
                " <= "
            };
            query.push(" AND t.").push(column);
            match infer_scalar(column, value) {
                Scalar::Text(text) => {
                    query.push("::text").push(sql_operator).push_bind(text);
                }
                Scalar::Uuid(id) => {
                    query.push(sql_operator).push_bind(id);
                }
                Scalar::Bool(flag) => {
                    query.push(sql_operator).push_bind(flag);
                }
                Scalar::I64(number) => {
                    query.push(sql_operator).push_bind(number);
                }
                Scalar::F64(number) => {
                    query.push(sql_operator).push_bind(number);
                }
                Scalar::Date(date) => {
                    query.push(sql_operator).push_bind(date);
                }
            }
        }
    }
    Ok(())
}

fn push_eq_filter(query: &mut QueryBuilder<Postgres>, column: &str, value: &Scalar) {
    query.push("t.").push(column);
    match value {
        Scalar::Text(text) => {
            query.push("::text = ").push_bind(text.clone());
        }
        Scalar::Uuid(id) => {
            query.push(" = ").push_bind(*id);
        }
        Scalar::Bool(flag) => {
            query.push(" = ").push_bind(*flag);
        }
        Scalar::I64(number) => {
            query.push(" = ").push_bind(*number);
        }
        Scalar::F64(number) => {
            query.push(" = ").push_bind(*number);
        }
        Scalar::Date(date) => {
            query.push(" = ").push_bind(*date);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        infer_scalar, parse_filter_key, validate_identifier, validate_table, FilterOperator,
        Scalar,
    };
    use serde_json::json;

    #[test]
    fn accepts_snake_case_identifiers_only() {
        assert!(validate_identifier("payment_status").is_ok());
        assert!(validate_identifier("a1_b2").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("1column").is_err());
        assert!(validate_identifier("DROP TABLE").is_err());
        assert!(validate_identifier("name;--").is_err());
    }

    #[test]
    fn rejects_unknown_tables() {
        assert!(validate_table("rent_payments").is_ok());
        assert!(validate_table("pg_catalog").is_err());
        assert!(validate_table("organizations").is_err());
    }

    #[test]
    fn parses_operator_suffixes() {
        assert_eq!(
            parse_filter_key("due_date__lte").unwrap(),
            ("due_date", FilterOperator::Lte)
        );
        assert_eq!(
            parse_filter_key("unit_id__is_null").unwrap(),
            ("unit_id", FilterOperator::IsNull)
        );
        assert_eq!(
            parse_filter_key("payment_status").unwrap(),
            ("payment_status", FilterOperator::Eq)
        );
    }

    #[test]
    fn infers_bind_types_from_column_and_value() {
        let id = "c0ffee00-0000-4000-8000-000000000001";
        assert!(matches!(
            infer_scalar("tenant_id", &json!(id)),
            Scalar::Uuid(_)
        ));
        // Same uuid text on a non-id column stays text.
        assert!(matches!(
            infer_scalar("notes", &json!(id)),
            Scalar::Text(_)
        ));
        assert!(matches!(
            infer_scalar("payment_month", &json!("2026-08-01")),
            Scalar::Date(_)
        ));
        assert_eq!(infer_scalar("total_units", &json!(12)), Scalar::I64(12));
        assert_eq!(
            infer_scalar("monthly_rent", &json!(15000.5)),
            Scalar::F64(15000.5)
        );
        assert!(matches!(
            infer_scalar("payment_status", &json!("pending")),
            Scalar::Text(_)
        ));
    }
}
