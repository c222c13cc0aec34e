//! Unit occupancy transition on tenant creation. Two-phase by design: the
//! tenant insert has already committed when this runs, and a failed unit
//! update is reported back as a partial success rather than rolled back or
//! silently dropped. The reverse transition (occupied back to vacant when a
//! tenant leaves) intentionally does not exist; that is an operator edit.

use serde_json::{json, Map, Value};
use sqlx::PgPool;

use crate::error::AppError;
use crate::repository::table_service::update_row;

/// Outcome of the occupancy step, attached to the create-tenant response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OccupancyUpdate {
    /// Tenant was created without an assigned unit.
    NotRequested,
    Updated,
    /// Tenant exists but the unit update failed; the caller decides whether
    /// to compensate.
    Failed { message: String },
}

impl OccupancyUpdate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotRequested => "not_requested",
            Self::Updated => "updated",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Failed { message } => json!({ "state": "failed", "message": message }),
            other => json!({ "state": other.as_str() }),
        }
    }
}

pub fn occupied_patch() -> Map<String, Value> {
    let mut patch = Map::new();
    patch.insert("status".to_string(), Value::String("occupied".to_string()));
    patch
}

/// Marks the assigned unit occupied after a tenant insert. Attempted exactly
/// once; failure is logged and returned, never raised.
pub async fn apply_occupancy_transition(pool: &PgPool, unit_id: Option<&str>) -> OccupancyUpdate {
    let Some(unit_id) = unit_id.map(str::trim).filter(|id| !id.is_empty()) else {
        return OccupancyUpdate::NotRequested;
    };

    match mark_unit_occupied(pool, unit_id).await {
        Ok(_) => OccupancyUpdate::Updated,
        Err(error) => {
            tracing::warn!(unit_id, error = %error, "tenant created but unit occupancy update failed");
            OccupancyUpdate::Failed {
                message: error.to_string(),
            }
        }
    }
}

async fn mark_unit_occupied(pool: &PgPool, unit_id: &str) -> Result<Value, AppError> {
    update_row(pool, "units", unit_id, &occupied_patch(), "id").await
}

#[cfg(test)]
mod tests {
    use super::{occupied_patch, OccupancyUpdate};
    use serde_json::Value;

    #[test]
    fn patch_only_touches_status() {
        let patch = occupied_patch();
        assert_eq!(patch.len(), 1);
        assert_eq!(patch.get("status").and_then(Value::as_str), Some("occupied"));
    }

    #[test]
    fn serializes_outcomes() {
        assert_eq!(
            OccupancyUpdate::NotRequested.to_json(),
            serde_json::json!({ "state": "not_requested" })
        );
        assert_eq!(
            OccupancyUpdate::Updated.to_json(),
            serde_json::json!({ "state": "updated" })
        );
        let failed = OccupancyUpdate::Failed {
            message: "units record not found.".to_string(),
        };
        assert_eq!(failed.as_str(), "failed");
        assert_eq!(
            failed.to_json().get("message").and_then(Value::as_str),
            Some("units record not found.")
        );
    }
}
