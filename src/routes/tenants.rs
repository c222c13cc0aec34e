use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Map, Value};

use crate::error::{AppError, AppResult};
use crate::repository::table_service::{create_row, delete_row, get_row, list_rows, update_row};
use crate::routes::db_pool;
use crate::schemas::{
    clamp_limit_in_range, ensure_one_of, non_empty_opt, parse_date_field, remove_nulls,
    serialize_to_map, validate_input, value_str, CreateTenantInput, TenantPath, TenantsQuery,
    UpdateTenantInput, TENANT_STATUSES,
};
use crate::services::enrichment::attach_unit_context;
use crate::services::occupancy::apply_occupancy_transition;
use crate::state::AppState;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/tenants",
            axum::routing::get(list_tenants).post(create_tenant),
        )
        .route(
            "/tenants/{tenant_id}",
            axum::routing::get(get_tenant)
                .patch(update_tenant)
                .delete(delete_tenant),
        )
}

/// Lists tenants, optionally by status; the payment form uses
/// `?status=active`.
async fn list_tenants(
    State(state): State<AppState>,
    Query(query): Query<TenantsQuery>,
) -> AppResult<Json<Value>> {
    let pool = db_pool(&state)?;

    let mut filters = Map::new();
    if let Some(status) = non_empty_opt(query.status.as_deref()) {
        ensure_one_of("status", &status, TENANT_STATUSES)?;
        filters.insert("status".to_string(), Value::String(status));
    }
    if let Some(unit_id) = non_empty_opt(query.unit_id.as_deref()) {
        filters.insert("unit_id".to_string(), Value::String(unit_id));
    }

    let rows = list_rows(
        pool,
        "tenants",
        if filters.is_empty() { None } else { Some(&filters) },
        clamp_limit_in_range(query.limit, 1, 500),
        0,
        "created_at",
        false,
    )
    .await?;

    let rows = attach_unit_context(pool, rows).await;
    Ok(Json(json!({ "data": rows })))
}

/// Two sequential writes, not atomic: the tenant insert, then (when a unit
/// is assigned) the vacant-to-occupied update. A failed second write still
/// returns 201; the `occupancy` field in the body says what happened.
async fn create_tenant(
    State(state): State<AppState>,
    Json(payload): Json<CreateTenantInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&payload)?;
    let pool = db_pool(&state)?;

    let record = build_tenant_record(&payload)?;
    let created = create_row(pool, "tenants", &record).await?;

    let unit_id = value_str(&created, "unit_id");
    let occupancy = apply_occupancy_transition(
        pool,
        if unit_id.is_empty() {
            None
        } else {
            Some(unit_id.as_str())
        },
    )
    .await;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(json!({
            "tenant": created,
            "occupancy": occupancy.to_json(),
        })),
    ))
}

async fn get_tenant(
    State(state): State<AppState>,
    Path(path): Path<TenantPath>,
) -> AppResult<Json<Value>> {
    let pool = db_pool(&state)?;
    let record = get_row(pool, "tenants", &path.tenant_id, "id").await?;
    Ok(Json(record))
}

async fn update_tenant(
    State(state): State<AppState>,
    Path(path): Path<TenantPath>,
    Json(payload): Json<UpdateTenantInput>,
) -> AppResult<Json<Value>> {
    if let Some(status) = payload.status.as_deref() {
        ensure_one_of("status", status, TENANT_STATUSES)?;
    }
    let pool = db_pool(&state)?;
    let patch = remove_nulls(serialize_to_map(&payload));
    let updated = update_row(pool, "tenants", &path.tenant_id, &patch, "id").await?;
    Ok(Json(updated))
}

/// Deleting a tenant does not release its unit; occupancy reversal is a
/// manual operator edit.
async fn delete_tenant(
    State(state): State<AppState>,
    Path(path): Path<TenantPath>,
) -> AppResult<Json<Value>> {
    let pool = db_pool(&state)?;
    let deleted = delete_row(pool, "tenants", &path.tenant_id, "id").await?;
    Ok(Json(json!({ "deleted": deleted })))
}

/// Normalizes the form payload for insert: blank unit id and lease end date
/// become absent, and the deposit is kept only when it parses as a
/// non-negative number.
fn build_tenant_record(payload: &CreateTenantInput) -> Result<Map<String, Value>, AppError> {
    ensure_one_of("status", &payload.status, TENANT_STATUSES)?;
    parse_date_field("lease_start_date", &payload.lease_start_date)?;
    if let Some(end) = non_empty_opt(payload.lease_end_date.as_deref()) {
        parse_date_field("lease_end_date", &end)?;
    }

    let mut record = remove_nulls(serialize_to_map(payload));

    if non_empty_opt(payload.unit_id.as_deref()).is_none() {
        record.remove("unit_id");
    }
    if non_empty_opt(payload.lease_end_date.as_deref()).is_none() {
        record.remove("lease_end_date");
    }

    record.remove("security_deposit");
    if let Some(deposit) = parse_deposit(payload.security_deposit.as_ref()) {
        record.insert("security_deposit".to_string(), json!(deposit));
    }

    Ok(record)
}

fn parse_deposit(value: Option<&Value>) -> Option<f64> {
    let parsed = match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|amount| amount.is_finite() && *amount >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::{build_tenant_record, parse_deposit};
    use crate::schemas::CreateTenantInput;
    use serde_json::{json, Value};

    fn base_input() -> CreateTenantInput {
        CreateTenantInput {
            unit_id: None,
            full_name: "Asha Verma".to_string(),
            email: None,
            phone: "9876543210".to_string(),
            id_proof_type: "aadhar".to_string(),
            id_proof_number: None,
            emergency_contact_name: None,
            emergency_contact_phone: None,
            lease_start_date: "2026-08-01".to_string(),
            lease_end_date: None,
            security_deposit: None,
            status: "active".to_string(),
        }
    }

    #[test]
    fn blank_unit_assignment_is_omitted() {
        let mut input = base_input();
        input.unit_id = Some("   ".to_string());
        let record = build_tenant_record(&input).expect("record should build");
        assert!(!record.contains_key("unit_id"));
        assert_eq!(
            record.get("full_name").and_then(Value::as_str),
            Some("Asha Verma")
        );
    }

    #[test]
    fn keeps_assigned_unit() {
        let mut input = base_input();
        input.unit_id = Some("c0ffee00-0000-4000-8000-000000000001".to_string());
        let record = build_tenant_record(&input).expect("record should build");
        assert!(record.contains_key("unit_id"));
    }

    #[test]
    fn deposit_is_parse_or_omit() {
        assert_eq!(parse_deposit(Some(&json!(25000))), Some(25000.0));
        assert_eq!(parse_deposit(Some(&json!("25000.50"))), Some(25000.5));
        assert_eq!(parse_deposit(Some(&json!("two lakh"))), None);
        assert_eq!(parse_deposit(Some(&json!(-1))), None);
        assert_eq!(parse_deposit(None), None);

        let mut input = base_input();
        input.security_deposit = Some(json!("not a number"));
        let record = build_tenant_record(&input).expect("record should build");
        assert!(!record.contains_key("security_deposit"));
    }

    #[test]
    fn rejects_bad_dates_and_statuses() {
        let mut input = base_input();
        input.lease_start_date = "01-08-2026".to_string();
        assert!(build_tenant_record(&input).is_err());

        let mut input = base_input();
        input.status = "evicted".to_string();
        assert!(build_tenant_record(&input).is_err());
    }
}
