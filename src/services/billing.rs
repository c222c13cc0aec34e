//! Rent payment computation. The one piece of business logic in the system:
//! total the charge components and classify the payment status from the
//! amount paid. Pure; callers persist the result with the payment record.

use serde_json::Value;

/// Rounds to two-decimal currency precision, half away from zero.
pub fn round_money(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Money fields arrive from forms as numbers or numeric strings. Anything
/// absent, malformed, non-finite, or negative degrades to 0 instead of
/// failing the operation. Deliberate leniency, not an accident.
pub fn parse_money_or_zero(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(amount) if amount.is_finite() && amount >= 0.0 => round_money(amount),
        _ => 0.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargeBreakdown {
    pub rent_amount: f64,
    pub electricity_bill: f64,
    pub water_bill: f64,
    pub maintenance_charges: f64,
    pub other_charges: f64,
}

impl ChargeBreakdown {
    pub fn total(&self) -> f64 {
        round_money(
            self.rent_amount
                + self.electricity_bill
                + self.water_bill
                + self.maintenance_charges
                + self.other_charges,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
    /// Allowed by the schema, never produced by classification.
    Overdue,
}

impl PaymentStatus {
    /// Accepts the schema's status vocabulary, including `overdue` (settable
    /// in the store, usable as a filter, never classified).
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "partial" => Some(Self::Partial),
            "paid" => Some(Self::Paid),
            "overdue" => Some(Self::Overdue),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Partial => "partial",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
        }
    }
}

/// The paid check runs first: a zero total with zero paid counts as `paid`
/// (0 >= 0), not `pending`.
pub fn classify_payment(total_amount: f64, amount_paid: f64) -> PaymentStatus {
    if amount_paid >= total_amount {
        PaymentStatus::Paid
    } else if amount_paid > 0.0 {
        PaymentStatus::Partial
    } else {
        PaymentStatus::Pending
    }
}
