//! Display enrichment for list endpoints. The original pages joined related
//! names inline (`units(unit_number, properties(property_name))`); here the
//! lookups run after the main query and are best-effort: a missing or
//! unreadable related row leaves the base record untouched.

use std::collections::HashMap;

use serde_json::Value;
use sqlx::PgPool;

use crate::repository::table_service::get_row;
use crate::schemas::{value_str, value_str_opt};

/// Attaches `property_name` to each unit row.
pub async fn attach_property_names(pool: &PgPool, rows: Vec<Value>) -> Vec<Value> {
    let mut properties = HashMap::new();
    let mut enriched = Vec::with_capacity(rows.len());

    for row in rows {
        let mut row_obj = row.as_object().cloned().unwrap_or_default();
        let property_id = value_str(&row, "property_id");
        if let Some(name) = property_name(pool, &mut properties, &property_id).await {
            row_obj.insert("property_name".to_string(), Value::String(name));
        }
        enriched.push(Value::Object(row_obj));
    }
    enriched
}

/// Attaches `unit_number` and `property_name` to each tenant row, following
/// the tenant's unit assignment when present.
pub async fn attach_unit_context(pool: &PgPool, rows: Vec<Value>) -> Vec<Value> {
    let mut units = HashMap::new();
    let mut properties = HashMap::new();
    let mut enriched = Vec::with_capacity(rows.len());

    for row in rows {
        let mut row_obj = row.as_object().cloned().unwrap_or_default();
        let unit_id = value_str(&row, "unit_id");
        if let Some(unit) = cached_row(pool, "units", &mut units, &unit_id).await {
            if let Some(unit_number) = value_str_opt(&unit, "unit_number") {
                row_obj.insert("unit_number".to_string(), Value::String(unit_number));
            }
            let property_id = value_str(&unit, "property_id");
            if let Some(name) = property_name(pool, &mut properties, &property_id).await {
                row_obj.insert("property_name".to_string(), Value::String(name));
            }
        }
        enriched.push(Value::Object(row_obj));
    }
    enriched
}

/// Attaches `tenant_name`, `unit_number`, and `property_name` to each rent
/// payment row.
pub async fn attach_payment_context(pool: &PgPool, rows: Vec<Value>) -> Vec<Value> {
    let mut tenants = HashMap::new();
    let mut units = HashMap::new();
    let mut properties = HashMap::new();
    let mut enriched = Vec::with_capacity(rows.len());

    for row in rows {
        let mut row_obj = row.as_object().cloned().unwrap_or_default();

        let tenant_id = value_str(&row, "tenant_id");
        if let Some(tenant) = cached_row(pool, "tenants", &mut tenants, &tenant_id).await {
            if let Some(full_name) = value_str_opt(&tenant, "full_name") {
                row_obj.insert("tenant_name".to_string(), Value::String(full_name));
            }
        }

        let unit_id = value_str(&row, "unit_id");
        if let Some(unit) = cached_row(pool, "units", &mut units, &unit_id).await {
            if let Some(unit_number) = value_str_opt(&unit, "unit_number") {
                row_obj.insert("unit_number".to_string(), Value::String(unit_number));
            }
            let property_id = value_str(&unit, "property_id");
            if let Some(name) = property_name(pool, &mut properties, &property_id).await {
                row_obj.insert("property_name".to_string(), Value::String(name));
            }
        }

        enriched.push(Value::Object(row_obj));
    }
    enriched
}

async fn property_name(
    pool: &PgPool,
    memo: &mut HashMap<String, Option<Value>>,
    property_id: &str,
) -> Option<String> {
    cached_row(pool, "properties", memo, property_id)
        .await
        .and_then(|property| value_str_opt(&property, "property_name"))
}

/// One lookup per distinct id within a request; failures memoize as `None`.
async fn cached_row(
    pool: &PgPool,
    table: &str,
    memo: &mut HashMap<String, Option<Value>>,
    row_id: &str,
) -> Option<Value> {
    if row_id.is_empty() {
        return None;
    }
    if let Some(cached) = memo.get(row_id) {
        return cached.clone();
    }
    let fetched = get_row(pool, table, row_id, "id").await.ok();
    memo.insert(row_id.to_string(), fetched.clone());
    fetched
}
