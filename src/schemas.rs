use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Map, Value};
use validator::Validate;

use crate::error::AppError;

pub const UNIT_STATUSES: &[&str] = &["vacant", "occupied", "maintenance"];
pub const TENANT_STATUSES: &[&str] = &["active", "inactive"];
pub const PAYMENT_METHODS: &[&str] = &["cash", "bank_transfer", "upi", "cheque", "card"];

pub fn validate_input<T: Validate>(input: &T) -> Result<(), AppError> {
    input
        .validate()
        .map_err(|errors| AppError::UnprocessableEntity(format!("Validation failed: {errors}")))
}

fn default_property_type() -> String {
    "apartment".to_string()
}
fn default_total_units() -> i32 {
    1
}
fn default_unit_status() -> String {
    "vacant".to_string()
}
fn default_id_proof_type() -> String {
    "aadhar".to_string()
}
fn default_tenant_status() -> String {
    "active".to_string()
}
fn default_payment_method() -> String {
    "cash".to_string()
}
fn default_limit_200() -> i64 {
    200
}

#[derive(Debug, Clone, Deserialize, serde::Serialize, Validate)]
pub struct CreatePropertyInput {
    #[validate(length(min = 1, max = 255))]
    pub property_name: String,
    #[validate(length(min = 1))]
    pub address: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    #[serde(default = "default_property_type")]
    pub property_type: String,
    #[serde(default = "default_total_units")]
    #[validate(range(min = 1))]
    pub total_units: i32,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct UpdatePropertyInput {
    pub property_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub property_type: Option<String>,
    pub total_units: Option<i32>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize, Validate)]
pub struct CreateUnitInput {
    #[validate(length(min = 1))]
    pub property_id: String,
    #[validate(length(min = 1, max = 50))]
    pub unit_number: String,
    pub floor_number: Option<i32>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<f64>,
    pub square_feet: Option<f64>,
    #[validate(range(min = 0.0))]
    pub monthly_rent: f64,
    #[serde(default = "default_unit_status")]
    pub status: String,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct UpdateUnitInput {
    pub unit_number: Option<String>,
    pub floor_number: Option<i32>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<f64>,
    pub square_feet: Option<f64>,
    pub monthly_rent: Option<f64>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize, Validate)]
pub struct CreateTenantInput {
    /// Optional; an unassigned tenant is valid.
    pub unit_id: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub full_name: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub phone: String,
    #[serde(default = "default_id_proof_type")]
    pub id_proof_type: String,
    pub id_proof_number: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub lease_start_date: String,
    pub lease_end_date: Option<String>,
    /// Form field; parsed leniently and omitted when not numeric.
    pub security_deposit: Option<Value>,
    #[serde(default = "default_tenant_status")]
    pub status: String,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct UpdateTenantInput {
    pub unit_id: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub id_proof_type: Option<String>,
    pub id_proof_number: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub lease_start_date: Option<String>,
    pub lease_end_date: Option<String>,
    pub security_deposit: Option<Value>,
    pub status: Option<String>,
}

/// Payment form payload. The money fields accept numbers or numeric strings;
/// everything except `rent_amount` falls back to 0 when missing or
/// malformed. `rent_amount` is the one required money field.
#[derive(Debug, Clone, Deserialize, serde::Serialize, Validate)]
pub struct RecordRentPaymentInput {
    #[validate(length(min = 1))]
    pub tenant_id: String,
    #[validate(length(min = 1))]
    pub unit_id: String,
    pub payment_month: String,
    pub due_date: String,
    pub rent_amount: Option<Value>,
    pub electricity_bill: Option<Value>,
    pub water_bill: Option<Value>,
    pub maintenance_charges: Option<Value>,
    pub other_charges: Option<Value>,
    pub amount_paid: Option<Value>,
    pub payment_date: Option<String>,
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
    pub transaction_reference: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PropertyPath {
    pub property_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnitPath {
    pub unit_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TenantPath {
    pub tenant_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentPath {
    pub payment_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit_200")]
    pub limit: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnitsQuery {
    pub property_id: Option<String>,
    pub status: Option<String>,
    #[serde(default = "default_limit_200")]
    pub limit: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TenantsQuery {
    pub status: Option<String>,
    pub unit_id: Option<String>,
    #[serde(default = "default_limit_200")]
    pub limit: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentsQuery {
    pub tenant_id: Option<String>,
    pub unit_id: Option<String>,
    pub payment_status: Option<String>,
    #[serde(default = "default_limit_200")]
    pub limit: i64,
}

pub fn clamp_limit_in_range(limit: i64, minimum: i64, maximum: i64) -> i64 {
    limit.clamp(minimum, maximum)
}

pub fn serialize_to_map<T: serde::Serialize>(input: &T) -> Map<String, Value> {
    serde_json::to_value(input)
        .ok()
        .and_then(|value| value.as_object().cloned())
        .unwrap_or_default()
}

pub fn remove_nulls(mut map: Map<String, Value>) -> Map<String, Value> {
    map.retain(|_, value| !value.is_null());
    map
}

pub fn non_empty_opt(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToOwned::to_owned)
}

pub fn value_str(row: &Value, key: &str) -> String {
    value_str_opt(row, key).unwrap_or_default()
}

pub fn value_str_opt(row: &Value, key: &str) -> Option<String> {
    row.as_object()
        .and_then(|obj| obj.get(key))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

pub fn parse_date_field(field: &str, raw: &str) -> Result<NaiveDate, AppError> {
    raw.trim().parse::<NaiveDate>().map_err(|_| {
        AppError::UnprocessableEntity(format!("{field} must be a date (YYYY-MM-DD)."))
    })
}

pub fn ensure_one_of(field: &str, value: &str, allowed: &[&str]) -> Result<(), AppError> {
    if allowed.contains(&value) {
        return Ok(());
    }
    Err(AppError::UnprocessableEntity(format!(
        "{field} must be one of: {}.",
        allowed.join(", ")
    )))
}

#[cfg(test)]
mod tests {
    use super::{
        clamp_limit_in_range, ensure_one_of, non_empty_opt, parse_date_field, remove_nulls,
        serialize_to_map, value_str, value_str_opt, CreatePropertyInput, PAYMENT_METHODS,
    };
    use serde_json::json;

    #[test]
    fn clamps_limits() {
        assert_eq!(clamp_limit_in_range(0, 1, 500), 1);
        assert_eq!(clamp_limit_in_range(200, 1, 500), 200);
        assert_eq!(clamp_limit_in_range(9999, 1, 500), 500);
    }

    #[test]
    fn serializes_inputs_without_nulls() {
        let input = CreatePropertyInput {
            property_name: "Sunrise Apartments".to_string(),
            address: "12 MG Road".to_string(),
            city: None,
            state: None,
            postal_code: None,
            property_type: "apartment".to_string(),
            total_units: 8,
            description: None,
        };
        let map = remove_nulls(serialize_to_map(&input));
        assert_eq!(map.get("total_units").and_then(|v| v.as_i64()), Some(8));
        assert!(!map.contains_key("city"));
    }

    #[test]
    fn validates_membership() {
        assert!(ensure_one_of("payment_method", "upi", PAYMENT_METHODS).is_ok());
        assert!(ensure_one_of("payment_method", "crypto", PAYMENT_METHODS).is_err());
    }

    #[test]
    fn parses_dates_strictly() {
        assert!(parse_date_field("due_date", "2026-08-05").is_ok());
        assert!(parse_date_field("due_date", " 2026-08-05 ").is_ok());
        assert!(parse_date_field("due_date", "05/08/2026").is_err());
        assert!(parse_date_field("due_date", "").is_err());
    }

    #[test]
    fn reads_string_fields_leniently() {
        let row = json!({ "name": "  A-101  ", "empty": "   ", "num": 3 });
        assert_eq!(value_str(&row, "name"), "A-101");
        assert_eq!(value_str_opt(&row, "empty"), None);
        assert_eq!(value_str(&row, "num"), "");
        assert_eq!(non_empty_opt(Some("  x ")), Some("x".to_string()));
        assert_eq!(non_empty_opt(Some("   ")), None);
    }
}
