use axum::extract::State;
use axum::Json;
use serde_json::{json, Map, Value};

use crate::error::AppResult;
use crate::repository::table_service::{count_rows, list_rows};
use crate::routes::db_pool;
use crate::schemas::value_str;
use crate::state::AppState;

pub fn router() -> axum::Router<AppState> {
    axum::Router::new().route("/dashboard/summary", axum::routing::get(summary))
}

/// Landing-page stats: property count, active tenants, pending payments, and
/// revenue collected so far. Cached briefly; the numbers feed a dashboard,
/// not an invoice.
async fn summary(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let cache_key = "summary".to_string();
    if let Some(cached) = state.dashboard_cache.get(&cache_key).await {
        return Ok(Json(cached));
    }

    let pool = db_pool(&state)?;

    let property_count = count_rows(pool, "properties", None).await?;

    let mut tenant_filters = Map::new();
    tenant_filters.insert("status".to_string(), Value::String("active".to_string()));
    let active_tenants = count_rows(pool, "tenants", Some(&tenant_filters)).await?;

    let payments = list_rows(pool, "rent_payments", None, 1000, 0, "created_at", false).await?;
    let (pending_payments, total_revenue) = summarize_payments(&payments);

    let body = json!({
        "properties": property_count,
        "active_tenants": active_tenants,
        "pending_payments": pending_payments,
        "total_revenue": total_revenue,
    });

    state.dashboard_cache.insert(cache_key, body.clone()).await;
    Ok(Json(body))
}

/// Counts `pending` payments and sums `amount_paid` across all rows.
/// Unreadable amounts count as 0.
fn summarize_payments(rows: &[Value]) -> (i64, f64) {
    let mut pending = 0_i64;
    let mut revenue = 0.0_f64;
    for row in rows {
        if value_str(row, "payment_status") == "pending" {
            pending += 1;
        }
        let paid = row
            .as_object()
            .and_then(|obj| obj.get("amount_paid"))
            .and_then(|v| {
                v.as_f64()
                    .or_else(|| v.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
            })
            .unwrap_or(0.0);
        revenue += paid;
    }
    (pending, revenue)
}

#[cfg(test)]
mod tests {
    use super::summarize_payments;
    use serde_json::json;

    #[test]
    fn summarizes_pending_count_and_revenue() {
        let rows = vec![
            json!({ "payment_status": "pending", "amount_paid": 0 }),
            json!({ "payment_status": "partial", "amount_paid": 10000.0 }),
            json!({ "payment_status": "paid", "amount_paid": "16000" }),
            json!({ "payment_status": "pending", "amount_paid": null }),
        ];
        let (pending, revenue) = summarize_payments(&rows);
        assert_eq!(pending, 2);
        assert_eq!(revenue, 26000.0);
    }

    #[test]
    fn empty_payment_set_summarizes_to_zero() {
        assert_eq!(summarize_payments(&[]), (0, 0.0));
    }
}
