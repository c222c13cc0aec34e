use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Map, Value};

use crate::error::{AppError, AppResult};
use crate::repository::table_service::{create_row, get_row, list_rows};
use crate::routes::db_pool;
use crate::schemas::{
    clamp_limit_in_range, ensure_one_of, non_empty_opt, parse_date_field, validate_input,
    PaymentPath, PaymentsQuery, RecordRentPaymentInput, PAYMENT_METHODS,
};
use crate::services::billing::{
    classify_payment, parse_money_or_zero, ChargeBreakdown, PaymentStatus,
};
use crate::services::enrichment::attach_payment_context;
use crate::state::AppState;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route(
            "/rent-payments",
            axum::routing::get(list_payments).post(record_payment),
        )
        .route(
            "/rent-payments/{payment_id}",
            axum::routing::get(get_payment),
        )
}

/// Records a rent payment. `total_amount` and `payment_status` are always
/// derived here, never taken from the client, and never recomputed after
/// this write. There is no edit or settle flow.
async fn record_payment(
    State(state): State<AppState>,
    Json(payload): Json<RecordRentPaymentInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&payload)?;
    let record = build_payment_record(&payload)?;

    let pool = db_pool(&state)?;
    let created = create_row(pool, "rent_payments", &record).await?;
    Ok((axum::http::StatusCode::CREATED, Json(created)))
}

async fn list_payments(
    State(state): State<AppState>,
    Query(query): Query<PaymentsQuery>,
) -> AppResult<Json<Value>> {
    let pool = db_pool(&state)?;

    let mut filters = Map::new();
    if let Some(tenant_id) = non_empty_opt(query.tenant_id.as_deref()) {
        filters.insert("tenant_id".to_string(), Value::String(tenant_id));
    }
    if let Some(unit_id) = non_empty_opt(query.unit_id.as_deref()) {
        filters.insert("unit_id".to_string(), Value::String(unit_id));
    }
    if let Some(status) = non_empty_opt(query.payment_status.as_deref()) {
        let status = PaymentStatus::parse(&status).ok_or_else(|| {
            AppError::UnprocessableEntity(
                "payment_status must be one of: pending, partial, paid, overdue.".to_string(),
            )
        })?;
        filters.insert(
            "payment_status".to_string(),
            Value::String(status.as_str().to_string()),
        );
    }

    let rows = list_rows(
        pool,
        "rent_payments",
        if filters.is_empty() { None } else { Some(&filters) },
        clamp_limit_in_range(query.limit, 1, 500),
        0,
        "payment_month",
        false,
    )
    .await?;

    let rows = attach_payment_context(pool, rows).await;
    Ok(Json(json!({ "data": rows })))
}

async fn get_payment(
    State(state): State<AppState>,
    Path(path): Path<PaymentPath>,
) -> AppResult<Json<Value>> {
    let pool = db_pool(&state)?;
    let record = get_row(pool, "rent_payments", &path.payment_id, "id").await?;
    Ok(Json(record))
}

/// Builds the insert payload: parses the charge fields (parse-or-zero,
/// except the required rent), totals them, and classifies the status. Pure;
/// no write happens until this succeeds.
fn build_payment_record(payload: &RecordRentPaymentInput) -> Result<Map<String, Value>, AppError> {
    if payload
        .rent_amount
        .as_ref()
        .map_or(true, Value::is_null)
    {
        return Err(AppError::UnprocessableEntity(
            "rent_amount is required.".to_string(),
        ));
    }
    ensure_one_of("payment_method", &payload.payment_method, PAYMENT_METHODS)?;
    parse_date_field("payment_month", &payload.payment_month)?;
    parse_date_field("due_date", &payload.due_date)?;
    if let Some(date) = non_empty_opt(payload.payment_date.as_deref()) {
        parse_date_field("payment_date", &date)?;
    }

    let charges = ChargeBreakdown {
        rent_amount: parse_money_or_zero(payload.rent_amount.as_ref()),
        electricity_bill: parse_money_or_zero(payload.electricity_bill.as_ref()),
        water_bill: parse_money_or_zero(payload.water_bill.as_ref()),
        maintenance_charges: parse_money_or_zero(payload.maintenance_charges.as_ref()),
        other_charges: parse_money_or_zero(payload.other_charges.as_ref()),
    };
    let total_amount = charges.total();
    let amount_paid = parse_money_or_zero(payload.amount_paid.as_ref());
    let payment_status = classify_payment(total_amount, amount_paid);

    let mut record = Map::new();
    record.insert(
        "tenant_id".to_string(),
        Value::String(payload.tenant_id.clone()),
    );
    record.insert(
        "unit_id".to_string(),
        Value::String(payload.unit_id.clone()),
    );
    record.insert(
        "payment_month".to_string(),
        Value::String(payload.payment_month.trim().to_string()),
    );
    record.insert(
        "due_date".to_string(),
        Value::String(payload.due_date.trim().to_string()),
    );
    record.insert("rent_amount".to_string(), json!(charges.rent_amount));
    record.insert(
        "electricity_bill".to_string(),
        json!(charges.electricity_bill),
    );
    record.insert("water_bill".to_string(), json!(charges.water_bill));
    record.insert(
        "maintenance_charges".to_string(),
        json!(charges.maintenance_charges),
    );
    record.insert("other_charges".to_string(), json!(charges.other_charges));
    record.insert("total_amount".to_string(), json!(total_amount));
    record.insert("amount_paid".to_string(), json!(amount_paid));
    record.insert(
        "payment_status".to_string(),
        Value::String(payment_status.as_str().to_string()),
    );
    if let Some(date) = non_empty_opt(payload.payment_date.as_deref()) {
        record.insert("payment_date".to_string(), Value::String(date));
    }
    record.insert(
        "payment_method".to_string(),
        Value::String(payload.payment_method.clone()),
    );
    if let Some(reference) = non_empty_opt(payload.transaction_reference.as_deref()) {
        record.insert("transaction_reference".to_string(), Value::String(reference));
    }
    if let Some(notes) = non_empty_opt(payload.notes.as_deref()) {
        record.insert("notes".to_string(), Value::String(notes));
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::build_payment_record;
    use crate::error::AppError;
    use crate::schemas::RecordRentPaymentInput;
    use serde_json::{json, Value};

    fn base_input() -> RecordRentPaymentInput {
        RecordRentPaymentInput {
            tenant_id: "c0ffee00-0000-4000-8000-000000000001".to_string(),
            unit_id: "c0ffee00-0000-4000-8000-000000000002".to_string(),
            payment_month: "2026-08-01".to_string(),
            due_date: "2026-08-05".to_string(),
            rent_amount: Some(json!(15000)),
            electricity_bill: Some(json!(500)),
            water_bill: Some(json!(200)),
            maintenance_charges: Some(json!(300)),
            other_charges: Some(json!(0)),
            amount_paid: None,
            payment_date: None,
            payment_method: "cash".to_string(),
            transaction_reference: None,
            notes: None,
        }
    }

    fn field_f64(record: &serde_json::Map<String, Value>, key: &str) -> f64 {
        record.get(key).and_then(Value::as_f64).unwrap_or(f64::NAN)
    }

    fn field_str<'a>(record: &'a serde_json::Map<String, Value>, key: &str) -> &'a str {
        record.get(key).and_then(Value::as_str).unwrap_or_default()
    }

    #[test]
    fn fully_paid_scenario() {
        let mut input = base_input();
        input.amount_paid = Some(json!(16000));
        let record = build_payment_record(&input).expect("record should build");
        assert_eq!(field_f64(&record, "total_amount"), 16000.0);
        assert_eq!(field_str(&record, "payment_status"), "paid");
    }

    #[test]
    fn partially_paid_scenario() {
        let mut input = base_input();
        input.amount_paid = Some(json!(10000));
        let record = build_payment_record(&input).expect("record should build");
        assert_eq!(field_f64(&record, "total_amount"), 16000.0);
        assert_eq!(field_str(&record, "payment_status"), "partial");
    }

    #[test]
    fn unpaid_scenario_is_pending() {
        let record = build_payment_record(&base_input()).expect("record should build");
        assert_eq!(field_f64(&record, "amount_paid"), 0.0);
        assert_eq!(field_str(&record, "payment_status"), "pending");
    }

    #[test]
    fn missing_rent_amount_is_a_validation_error() {
        let mut input = base_input();
        input.rent_amount = None;
        let error = build_payment_record(&input).expect_err("rent is required");
        assert!(matches!(error, AppError::UnprocessableEntity(_)));

        let mut input = base_input();
        input.rent_amount = Some(Value::Null);
        assert!(build_payment_record(&input).is_err());
    }

    #[test]
    fn malformed_optional_charges_count_as_zero() {
        let mut input = base_input();
        input.electricity_bill = Some(json!("five hundred"));
        input.water_bill = None;
        let record = build_payment_record(&input).expect("record should build");
        assert_eq!(field_f64(&record, "electricity_bill"), 0.0);
        assert_eq!(field_f64(&record, "water_bill"), 0.0);
        assert_eq!(field_f64(&record, "total_amount"), 15300.0);
    }

    #[test]
    fn malformed_rent_degrades_to_zero_but_still_counts_as_present() {
        let mut input = base_input();
        input.rent_amount = Some(json!("free"));
        input.electricity_bill = Some(json!(0));
        input.water_bill = Some(json!(0));
        input.maintenance_charges = Some(json!(0));
        input.other_charges = Some(json!(0));
        let record = build_payment_record(&input).expect("record should build");
        // 0 >= 0: an all-zero bill with nothing paid classifies as paid.
        assert_eq!(field_f64(&record, "total_amount"), 0.0);
        assert_eq!(field_str(&record, "payment_status"), "paid");
    }

    #[test]
    fn string_amounts_are_accepted() {
        let mut input = base_input();
        input.rent_amount = Some(json!("15000"));
        input.amount_paid = Some(json!("16000.00"));
        let record = build_payment_record(&input).expect("record should build");
        assert_eq!(field_str(&record, "payment_status"), "paid");
    }

    #[test]
    fn rejects_unknown_payment_method_and_bad_dates() {
        let mut input = base_input();
        input.payment_method = "barter".to_string();
        assert!(build_payment_record(&input).is_err());

        let mut input = base_input();
        input.due_date = "next friday".to_string();
        assert!(build_payment_record(&input).is_err());
    }

    #[test]
    fn blank_optional_strings_are_omitted() {
        let mut input = base_input();
        input.transaction_reference = Some("  ".to_string());
        input.notes = Some(" adjusted for repairs ".to_string());
        let record = build_payment_record(&input).expect("record should build");
        assert!(!record.contains_key("transaction_reference"));
        assert_eq!(field_str(&record, "notes"), "adjusted for repairs");
    }
}
