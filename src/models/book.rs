//! Book catalog model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use std::str::FromStr;
use utoipa::ToSchema;

/// Cover type of a book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum CoverType {
    Hard,
    Soft,
}

impl CoverType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoverType::Hard => "Hard",
            CoverType::Soft => "Soft",
        }
    }
}

impl FromStr for CoverType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Hard" => Ok(CoverType::Hard),
            "Soft" => Ok(CoverType::Soft),
            other => Err(format!("unknown cover type: {}", other)),
        }
    }
}

impl std::fmt::Display for CoverType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Book row from database
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub cover: CoverType,
    pub inventory: i32,
    #[schema(value_type = f64)]
    pub daily_fee: Decimal,
    #[serde(skip_serializing)]
    pub created_at: DateTime<Utc>,
}

// Cover is stored as TEXT; decode through FromStr.
impl<'r> FromRow<'r, PgRow> for Book {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let cover: String = row.try_get("cover")?;
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            author: row.try_get("author")?,
            cover: cover
                .parse()
                .map_err(|e: String| sqlx::Error::ColumnDecode {
                    index: "cover".to_string(),
                    source: e.into(),
                })?,
            inventory: row.try_get("inventory")?,
            daily_fee: row.try_get("daily_fee")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
