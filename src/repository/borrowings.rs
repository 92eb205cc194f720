//! Borrowings repository for database operations.
//!
//! Borrowing creation and return are single transactional units: the
//! borrowing row, the inventory adjustment and the payment row commit
//! together or not at all.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::{
        borrowing::{Borrowing, BorrowingWithUser},
        payment::Payment,
    },
};

#[derive(Clone)]
pub struct BorrowingsRepository {
    pool: Pool<Postgres>,
}

impl BorrowingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get borrowing by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Borrowing> {
        sqlx::query_as::<_, Borrowing>("SELECT * FROM borrowings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrowing with id {} not found", id)))
    }

    /// List borrowings, optionally scoped to a user and/or an active state
    pub async fn list(
        &self,
        user_id: Option<i32>,
        is_active: Option<bool>,
    ) -> AppResult<Vec<Borrowing>> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM borrowings WHERE TRUE");

        if let Some(user_id) = user_id {
            query.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(is_active) = is_active {
            query.push(if is_active {
                " AND actual_return_date IS NULL"
            } else {
                " AND actual_return_date IS NOT NULL"
            });
        }
        query.push(" ORDER BY id");

        let borrowings = query
            .build_query_as::<Borrowing>()
            .fetch_all(&self.pool)
            .await?;
        Ok(borrowings)
    }

    /// Create a borrowing against a book.
    ///
    /// The inventory decrement is guarded (`inventory > 0`), so two
    /// concurrent creations against a single remaining copy cannot both
    /// succeed. The base payment row is inserted Pending in the same
    /// transaction; its checkout session is attached afterwards.
    pub async fn create(
        &self,
        user_id: i32,
        book_id: i32,
        borrow_date: NaiveDate,
        expected_return_date: NaiveDate,
        base_amount: Decimal,
    ) -> AppResult<(Borrowing, Payment)> {
        let mut tx = self.pool.begin().await?;

        let decremented = sqlx::query(
            "UPDATE books SET inventory = inventory - 1 WHERE id = $1 AND inventory > 0",
        )
        .bind(book_id)
        .execute(&mut *tx)
        .await?;

        if decremented.rows_affected() == 0 {
            return Err(AppError::Validation(
                "We don't have enough inventory.".to_string(),
            ));
        }

        let borrowing = sqlx::query_as::<_, Borrowing>(
            r#"
            INSERT INTO borrowings (borrow_date, expected_return_date, book_id, user_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(borrow_date)
        .bind(expected_return_date)
        .bind(book_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (status, type, borrowing_id, money_to_paid)
            VALUES ('Pending', 'Payment', $1, $2)
            RETURNING *
            "#,
        )
        .bind(borrowing.id)
        .bind(base_amount)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((borrowing, payment))
    }

    /// Mark a borrowing returned.
    ///
    /// The return-date update is guarded on `actual_return_date IS NULL`;
    /// a concurrent second return hits AlreadyReturned and leaves the
    /// inventory untouched. When `fine_amount` is present a Fine payment
    /// row is inserted in the same transaction.
    pub async fn mark_returned(
        &self,
        borrowing_id: i32,
        returned_on: NaiveDate,
        fine_amount: Option<Decimal>,
    ) -> AppResult<(Borrowing, Option<Payment>)> {
        let mut tx = self.pool.begin().await?;

        let borrowing = sqlx::query_as::<_, Borrowing>(
            r#"
            UPDATE borrowings
            SET actual_return_date = $2
            WHERE id = $1 AND actual_return_date IS NULL
            RETURNING *
            "#,
        )
        .bind(borrowing_id)
        .bind(returned_on)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::AlreadyReturned("Already returned.".to_string()))?;

        sqlx::query("UPDATE books SET inventory = inventory + 1 WHERE id = $1")
            .bind(borrowing.book_id)
            .execute(&mut *tx)
            .await?;

        let fine = match fine_amount {
            Some(amount) => {
                let fine = sqlx::query_as::<_, Payment>(
                    r#"
                    INSERT INTO payments (status, type, borrowing_id, money_to_paid)
                    VALUES ('Pending', 'Fine', $1, $2)
                    RETURNING *
                    "#,
                )
                .bind(borrowing.id)
                .bind(amount)
                .fetch_one(&mut *tx)
                .await?;
                Some(fine)
            }
            None => None,
        };

        tx.commit().await?;

        Ok((borrowing, fine))
    }

    /// Active borrowings past their expected return date
    pub async fn list_overdue(&self, today: NaiveDate) -> AppResult<Vec<BorrowingWithUser>> {
        let overdue = sqlx::query_as::<_, BorrowingWithUser>(
            r#"
            SELECT b.id, b.expected_return_date, u.email AS user_email
            FROM borrowings b
            JOIN users u ON b.user_id = u.id
            WHERE b.expected_return_date < $1 AND b.actual_return_date IS NULL
            ORDER BY b.id
            "#,
        )
        .bind(today)
        .fetch_all(&self.pool)
        .await?;
        Ok(overdue)
    }

    /// Count borrowings created on a given date
    pub async fn count_created_on(&self, date: NaiveDate) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM borrowings WHERE borrow_date = $1")
                .bind(date)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
