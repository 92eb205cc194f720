//! Payment model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use std::str::FromStr;
use utoipa::ToSchema;

/// Payment status. Pending moves to Paid exactly once, on confirmed
/// reconciliation; there is no edge back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Paid => "Paid",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(PaymentStatus::Pending),
            "Paid" => Ok(PaymentStatus::Paid),
            other => Err(format!("unknown payment status: {}", other)),
        }
    }
}

/// Payment kind: the base rental fee, or an overdue fine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum PaymentType {
    Payment,
    Fine,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Payment => "Payment",
            PaymentType::Fine => "Fine",
        }
    }
}

impl FromStr for PaymentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Payment" => Ok(PaymentType::Payment),
            "Fine" => Ok(PaymentType::Fine),
            other => Err(format!("unknown payment type: {}", other)),
        }
    }
}

impl std::fmt::Display for PaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment row from database.
///
/// `session_url` / `session_id` stay null until the external checkout
/// session has been created.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Payment {
    pub id: i32,
    pub status: PaymentStatus,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    pub borrowing_id: i32,
    pub session_url: Option<String>,
    pub session_id: Option<String>,
    #[schema(value_type = f64)]
    pub money_to_paid: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub created_at: DateTime<Utc>,
}

// Status and type are stored as TEXT; decode through FromStr.
impl<'r> FromRow<'r, PgRow> for Payment {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        let payment_type: String = row.try_get("type")?;
        Ok(Self {
            id: row.try_get("id")?,
            status: status
                .parse()
                .map_err(|e: String| sqlx::Error::ColumnDecode {
                    index: "status".to_string(),
                    source: e.into(),
                })?,
            payment_type: payment_type
                .parse()
                .map_err(|e: String| sqlx::Error::ColumnDecode {
                    index: "type".to_string(),
                    source: e.into(),
                })?,
            borrowing_id: row.try_get("borrowing_id")?,
            session_url: row.try_get("session_url")?,
            session_id: row.try_get("session_id")?,
            money_to_paid: row.try_get("money_to_paid")?,
            paid_at: row.try_get("paid_at")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
