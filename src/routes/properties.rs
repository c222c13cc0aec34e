use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::repository::table_service::{create_row, delete_row, get_row, list_rows, update_row};
use crate::routes::db_pool;
use crate::schemas::{
    clamp_limit_in_range, remove_nulls, serialize_to_map, validate_input, CreatePropertyInput,
    ListQuery, PropertyPath, UpdatePropertyInput,
};
use crate::state::AppState;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/properties",
            axum::routing::get(list_properties).post(create_property),
        )
        .route(
            "/properties/{property_id}",
            axum::routing::get(get_property)
                .patch(update_property)
                .delete(delete_property),
        )
}

async fn list_properties(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Value>> {
    let pool = db_pool(&state)?;
    let rows = list_rows(
        pool,
        "properties",
        None,
        clamp_limit_in_range(query.limit, 1, 500),
        0,
        "created_at",
        false,
    )
    .await?;
    Ok(Json(json!({ "data": rows })))
}

async fn create_property(
    State(state): State<AppState>,
    Json(payload): Json<CreatePropertyInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&payload)?;
    let pool = db_pool(&state)?;

    let record = remove_nulls(serialize_to_map(&payload));
    let created = create_row(pool, "properties", &record).await?;
    Ok((axum::http::StatusCode::CREATED, Json(created)))
}

async fn get_property(
    State(state): State<AppState>,
    Path(path): Path<PropertyPath>,
) -> AppResult<Json<Value>> {
    let pool = db_pool(&state)?;
    let record = get_row(pool, "properties", &path.property_id, "id").await?;
    Ok(Json(record))
}

async fn update_property(
    State(state): State<AppState>,
    Path(path): Path<PropertyPath>,
    Json(payload): Json<UpdatePropertyInput>,
) -> AppResult<Json<Value>> {
    let pool = db_pool(&state)?;
    let patch = remove_nulls(serialize_to_map(&payload));
    let updated = update_row(pool, "properties", &path.property_id, &patch, "id").await?;
    Ok(Json(updated))
}

async fn delete_property(
    State(state): State<AppState>,
    Path(path): Path<PropertyPath>,
) -> AppResult<Json<Value>> {
    let pool = db_pool(&state)?;
    let deleted = delete_row(pool, "properties", &path.property_id, "id").await?;
    Ok(Json(json!({ "deleted": deleted })))
}
