//! Borrowing (loan) model

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

/// Borrowing row from database.
///
/// `actual_return_date` is null while the borrowing is active; once set it
/// is never unset.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Borrowing {
    pub id: i32,
    pub borrow_date: NaiveDate,
    pub expected_return_date: NaiveDate,
    pub actual_return_date: Option<NaiveDate>,
    pub book_id: i32,
    pub user_id: i32,
    #[serde(skip_serializing)]
    pub created_at: DateTime<Utc>,
}

impl Borrowing {
    pub fn is_active(&self) -> bool {
        self.actual_return_date.is_none()
    }
}

/// Borrowing joined with the borrower's email, used by the overdue sweep
/// and admin notifications.
#[derive(Debug, Clone, FromRow)]
pub struct BorrowingWithUser {
    pub id: i32,
    pub expected_return_date: NaiveDate,
    pub user_email: String,
}
