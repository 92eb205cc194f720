//! Payments repository for database operations

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Pool, Postgres, QueryBuilder, Row};

use crate::{
    error::{AppError, AppResult},
    models::payment::{Payment, PaymentType},
};

#[derive(Clone)]
pub struct PaymentsRepository {
    pool: Pool<Postgres>,
}

impl PaymentsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get payment by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Payment> {
        sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Payment with id {} not found", id)))
    }

    /// Get payment by stored checkout session id
    pub async fn get_by_session_id(&self, session_id: &str) -> AppResult<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE session_id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(payment)
    }

    /// List payments, optionally scoped to a user and/or a payment type
    pub async fn list(
        &self,
        user_id: Option<i32>,
        payment_type: Option<PaymentType>,
    ) -> AppResult<Vec<Payment>> {
        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT p.* FROM payments p JOIN borrowings b ON p.borrowing_id = b.id WHERE TRUE",
        );

        if let Some(user_id) = user_id {
            query.push(" AND b.user_id = ").push_bind(user_id);
        }
        if let Some(payment_type) = payment_type {
            query.push(" AND p.type = ").push_bind(payment_type.as_str());
        }
        query.push(" ORDER BY p.id");

        let payments = query
            .build_query_as::<Payment>()
            .fetch_all(&self.pool)
            .await?;
        Ok(payments)
    }

    /// Payments attached to a borrowing
    pub async fn list_for_borrowing(&self, borrowing_id: i32) -> AppResult<Vec<Payment>> {
        let payments =
            sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE borrowing_id = $1 ORDER BY id")
                .bind(borrowing_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(payments)
    }

    /// Attach checkout session details once session creation succeeded
    pub async fn set_session(
        &self,
        id: i32,
        session_id: &str,
        session_url: &str,
    ) -> AppResult<Payment> {
        sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET session_id = $2, session_url = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(session_id)
        .bind(session_url)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Payment with id {} not found", id)))
    }

    /// Transition a payment Pending -> Paid.
    ///
    /// Guarded on the current status, so duplicate reconciliations are
    /// no-ops. Returns whether this call performed the transition.
    pub async fn mark_paid(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE payments SET status = 'Paid', paid_at = NOW() WHERE id = $1 AND status = 'Pending'",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count and total of payments marked Paid on a given date
    pub async fn paid_summary_on(&self, date: NaiveDate) -> AppResult<(i64, Decimal)> {
        let start: DateTime<Utc> =
            DateTime::from_naive_utc_and_offset(date.and_time(NaiveTime::MIN), Utc);
        let end = start + chrono::Duration::days(1);

        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS count, COALESCE(SUM(money_to_paid), 0) AS total
            FROM payments
            WHERE status = 'Paid' AND paid_at >= $1 AND paid_at < $2
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok((row.get("count"), row.get("total")))
    }
}
