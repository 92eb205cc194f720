//! Admin notification dispatcher.
//!
//! Services call the event hooks explicitly; the hooks enqueue a text on
//! an in-process queue and return immediately. A spawned worker drains
//! the queue and delivers through the transport with bounded retry, so a
//! transport outage never surfaces to the request that triggered it.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tokio::sync::mpsc;

use crate::{
    error::AppResult, models::payment::PaymentType, repository::Repository,
    services::telegram::NotifyTransport,
};

const RETRY_BASE_DELAY_MS: u64 = 500;

/// Hands texts to the delivery worker. Submission never blocks.
#[derive(Clone)]
pub struct NotificationQueue {
    tx: Option<mpsc::UnboundedSender<String>>,
}

impl NotificationQueue {
    /// Spawn the delivery worker and return the queue feeding it
    pub fn start(transport: Arc<dyn NotifyTransport>, max_attempts: u32) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        tokio::spawn(async move {
            while let Some(text) = rx.recv().await {
                deliver_with_retry(transport.as_ref(), &text, max_attempts).await;
            }
        });

        Self { tx: Some(tx) }
    }

    /// Queue with no transport configured; submissions are dropped
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn submit(&self, text: String) {
        match &self.tx {
            Some(tx) => {
                if tx.send(text).is_err() {
                    tracing::error!("Notification worker is gone, dropping message");
                }
            }
            None => tracing::debug!("Notifications disabled, dropping message"),
        }
    }
}

/// Deliver one message, retrying transport failures up to `max_attempts`.
/// Terminal failure is logged and the message dropped.
async fn deliver_with_retry(transport: &dyn NotifyTransport, text: &str, max_attempts: u32) {
    for attempt in 1..=max_attempts {
        match transport.send_text(text).await {
            Ok(()) => return,
            Err(e) if attempt < max_attempts => {
                tracing::warn!(
                    "Notification send failed (attempt {}/{}): {}",
                    attempt,
                    max_attempts,
                    e
                );
                tokio::time::sleep(Duration::from_millis(RETRY_BASE_DELAY_MS * attempt as u64))
                    .await;
            }
            Err(e) => {
                tracing::error!("Notification dropped after {} attempts: {}", max_attempts, e);
            }
        }
    }
}

/// Event hooks and periodic sweeps emitting admin alerts
#[derive(Clone)]
pub struct NotificationsService {
    repository: Repository,
    queue: NotificationQueue,
}

impl NotificationsService {
    pub fn new(repository: Repository, queue: NotificationQueue) -> Self {
        Self { repository, queue }
    }

    /// A new borrowing was committed
    pub fn borrowing_created(&self, user_email: &str, book_title: &str, due: NaiveDate) {
        self.queue
            .submit(format_borrowing_created(user_email, book_title, due));
    }

    /// A payment transitioned Pending -> Paid. Callers must invoke this
    /// only when the transition actually happened, not on every save.
    pub fn payment_paid(&self, user_email: &str, amount: Decimal, kind: PaymentType) {
        self.queue
            .submit(format_payment_paid(user_email, amount, kind));
    }

    /// One alert per overdue borrowing. A single query drives the run, so
    /// a run never duplicates its own alerts; repeated runs may re-alert.
    pub async fn run_overdue_sweep(&self) -> AppResult<()> {
        let today = chrono::Utc::now().date_naive();
        let overdue = self.repository.borrowings.list_overdue(today).await?;

        tracing::info!("Overdue sweep: {} borrowing(s) overdue", overdue.len());

        for borrowing in &overdue {
            self.queue
                .submit(format_overdue(borrowing.id, &borrowing.user_email));
        }
        Ok(())
    }

    /// One summary message for today's borrowings and received payments
    pub async fn run_daily_summary(&self) -> AppResult<()> {
        let today = chrono::Utc::now().date_naive();
        let borrowings_today = self.repository.borrowings.count_created_on(today).await?;
        let (payments_count, total) = self.repository.payments.paid_summary_on(today).await?;

        self.queue.submit(format_daily_summary(
            today,
            borrowings_today,
            payments_count,
            total,
        ));
        Ok(())
    }
}

fn format_borrowing_created(user_email: &str, book_title: &str, due: NaiveDate) -> String {
    format!(
        "📚 New borrowing created\nUser: {}\nBook: {}\nReturn until: {}",
        user_email, book_title, due
    )
}

fn format_payment_paid(user_email: &str, amount: Decimal, kind: PaymentType) -> String {
    format!(
        "💳 Payment successful\nUser: {}\nAmount: {}\nType: {}",
        user_email, amount, kind
    )
}

fn format_overdue(borrowing_id: i32, user_email: &str) -> String {
    format!("⚠️ Borrowing #{} by {} is overdue!", borrowing_id, user_email)
}

fn format_daily_summary(
    date: NaiveDate,
    new_borrowings: i64,
    payments: i64,
    total: Decimal,
) -> String {
    format!(
        "📊 Daily Summary ({}):\nNew borrowings: {}\nPayments: {}\nTotal received: {}",
        date, new_borrowings, payments, total
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::services::telegram::MockNotifyTransport;
    use mockall::Sequence;

    #[test]
    fn borrowing_created_message() {
        let due = NaiveDate::from_ymd_opt(2025, 12, 25).unwrap();
        let text = format_borrowing_created("reader@example.com", "Clean Code", due);
        assert_eq!(
            text,
            "📚 New borrowing created\nUser: reader@example.com\nBook: Clean Code\nReturn until: 2025-12-25"
        );
    }

    #[test]
    fn payment_paid_message_carries_kind() {
        let text = format_payment_paid("reader@example.com", Decimal::new(1990, 2), PaymentType::Fine);
        assert_eq!(
            text,
            "💳 Payment successful\nUser: reader@example.com\nAmount: 19.90\nType: Fine"
        );
    }

    #[test]
    fn daily_summary_message() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let text = format_daily_summary(date, 3, 2, Decimal::new(2985, 2));
        assert_eq!(
            text,
            "📊 Daily Summary (2025-06-01):\nNew borrowings: 3\nPayments: 2\nTotal received: 29.85"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn delivery_retries_then_succeeds() {
        let mut transport = MockNotifyTransport::new();
        let mut seq = Sequence::new();

        transport
            .expect_send_text()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Err(AppError::Internal("transport down".to_string())));
        transport
            .expect_send_text()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        deliver_with_retry(&transport, "hello", 3).await;
    }

    #[tokio::test(start_paused = true)]
    async fn delivery_gives_up_after_max_attempts() {
        let mut transport = MockNotifyTransport::new();

        transport
            .expect_send_text()
            .times(3)
            .returning(|_| Err(AppError::Internal("transport down".to_string())));

        // Terminal failure is swallowed, never raised.
        deliver_with_retry(&transport, "hello", 3).await;
    }
}
