use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Map, Value};

use crate::error::AppResult;
use crate::repository::table_service::{create_row, delete_row, get_row, list_rows, update_row};
use crate::routes::db_pool;
use crate::schemas::{
    clamp_limit_in_range, ensure_one_of, non_empty_opt, remove_nulls, serialize_to_map,
    validate_input, CreateUnitInput, UnitPath, UnitsQuery, UpdateUnitInput, UNIT_STATUSES,
};
use crate::services::enrichment::attach_property_names;
use crate::state::AppState;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/units", axum::routing::get(list_units).post(create_unit))
        .route(
            "/units/{unit_id}",
            axum::routing::get(get_unit)
                .patch(update_unit)
                .delete(delete_unit),
        )
}

/// Lists units, optionally narrowed by property or status. The tenant form
/// uses `?status=vacant` to offer assignable units.
async fn list_units(
    State(state): State<AppState>,
    Query(query): Query<UnitsQuery>,
) -> AppResult<Json<Value>> {
    let pool = db_pool(&state)?;

    let mut filters = Map::new();
    if let Some(property_id) = non_empty_opt(query.property_id.as_deref()) {
        filters.insert("property_id".to_string(), Value::String(property_id));
    }
    if let Some(status) = non_empty_opt(query.status.as_deref()) {
        ensure_one_of("status", &status, UNIT_STATUSES)?;
        filters.insert("status".to_string(), Value::String(status));
    }

    let rows = list_rows(
        pool,
        "units",
        if filters.is_empty() { None } else { Some(&filters) },
        clamp_limit_in_range(query.limit, 1, 500),
        0,
        "created_at",
        false,
    )
    .await?;

    let rows = attach_property_names(pool, rows).await;
    Ok(Json(json!({ "data": rows })))
}

/// `unit_number` is unique within a property; a duplicate insert surfaces as
/// a 409 from the repository layer.
async fn create_unit(
    State(state): State<AppState>,
    Json(payload): Json<CreateUnitInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&payload)?;
    ensure_one_of("status", &payload.status, UNIT_STATUSES)?;
    let pool = db_pool(&state)?;

    let record = remove_nulls(serialize_to_map(&payload));
    let created = create_row(pool, "units", &record).await?;
    Ok((axum::http::StatusCode::CREATED, Json(created)))
}

async fn get_unit(
    State(state): State<AppState>,
    Path(path): Path<UnitPath>,
) -> AppResult<Json<Value>> {
    let pool = db_pool(&state)?;
    let record = get_row(pool, "units", &path.unit_id, "id").await?;
    Ok(Json(record))
}

async fn update_unit(
    State(state): State<AppState>,
    Path(path): Path<UnitPath>,
    Json(payload): Json<UpdateUnitInput>,
) -> AppResult<Json<Value>> {
    if let Some(status) = payload.status.as_deref() {
        ensure_one_of("status", status, UNIT_STATUSES)?;
    }
    let pool = db_pool(&state)?;
    let patch = remove_nulls(serialize_to_map(&payload));
    let updated = update_row(pool, "units", &path.unit_id, &patch, "id").await?;
    Ok(Json(updated))
}

async fn delete_unit(
    State(state): State<AppState>,
    Path(path): Path<UnitPath>,
) -> AppResult<Json<Value>> {
    let pool = db_pool(&state)?;
    let deleted = delete_row(pool, "units", &path.unit_id, "id").await?;
    Ok(Json(json!({ "deleted": deleted })))
}
