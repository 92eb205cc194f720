//! Payment orchestration service

use rust_decimal::Decimal;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{
        payment::{Payment, PaymentType},
        user::UserClaims,
    },
    repository::Repository,
    services::{
        notifications::NotificationsService,
        stripe::{CheckoutGateway, CreateSessionRequest, SessionStatus},
    },
};

/// Confirmation payload returned by a successful reconciliation
#[derive(Debug)]
pub struct PaymentConfirmation {
    pub payment_id: i32,
    pub payment_type: PaymentType,
    pub amount: Decimal,
    pub currency: Option<String>,
    pub payer_email: Option<String>,
}

#[derive(Clone)]
pub struct PaymentsService {
    repository: Repository,
    gateway: Arc<dyn CheckoutGateway>,
    notifications: NotificationsService,
}

impl PaymentsService {
    pub fn new(
        repository: Repository,
        gateway: Arc<dyn CheckoutGateway>,
        notifications: NotificationsService,
    ) -> Self {
        Self {
            repository,
            gateway,
            notifications,
        }
    }

    /// Open a hosted checkout session for a Pending payment and store the
    /// session URL/id on it.
    pub async fn open_checkout_session(
        &self,
        payment: Payment,
        book_title: &str,
    ) -> AppResult<Payment> {
        let description = match payment.payment_type {
            PaymentType::Payment => format!("Borrowing fee for \"{}\"", book_title),
            PaymentType::Fine => format!("Overdue fine for \"{}\"", book_title),
        };

        let session = self
            .gateway
            .create_session(&CreateSessionRequest {
                payment_id: payment.id,
                amount: payment.money_to_paid,
                description,
            })
            .await?;

        self.repository
            .payments
            .set_session(payment.id, &session.session_id, &session.checkout_url)
            .await
    }

    /// Reconcile an external checkout session into payment status.
    ///
    /// Idempotent: re-reconciling an already-Paid payment returns the
    /// same confirmation without re-notifying.
    pub async fn reconcile_session(&self, session_id: &str) -> AppResult<PaymentConfirmation> {
        let session = self.gateway.retrieve_session(session_id).await?;

        if session.status != SessionStatus::Paid {
            return Err(AppError::PaymentNotCompleted(
                "The payment has not been completed yet.".to_string(),
            ));
        }

        // The payment is resolved through the correlation metadata written
        // at session creation; the stored session id is the fallback.
        let payment = match session.payment_id {
            Some(id) => match self.repository.payments.get_by_id(id).await {
                Ok(payment) => payment,
                Err(AppError::NotFound(_)) => {
                    return Err(AppError::InvalidSession(
                        "No payment matches this session.".to_string(),
                    ))
                }
                Err(e) => return Err(e),
            },
            None => self
                .repository
                .payments
                .get_by_session_id(session_id)
                .await?
                .ok_or_else(|| {
                    AppError::InvalidSession("No payment matches this session.".to_string())
                })?,
        };

        let transitioned = self.repository.payments.mark_paid(payment.id).await?;

        if transitioned {
            tracing::info!("Payment {} marked Paid (session {})", payment.id, session_id);
            let borrowing = self
                .repository
                .borrowings
                .get_by_id(payment.borrowing_id)
                .await?;
            let user = self.repository.users.get_by_id(borrowing.user_id).await?;
            self.notifications
                .payment_paid(&user.email, payment.money_to_paid, payment.payment_type);
        }

        Ok(PaymentConfirmation {
            payment_id: payment.id,
            payment_type: payment.payment_type,
            amount: payment.money_to_paid,
            currency: session.currency,
            payer_email: session.payer_email,
        })
    }

    /// List payments visible to the requester; same rule as borrowings
    pub async fn list(
        &self,
        claims: &UserClaims,
        user_id: Option<i32>,
        type_filter: Option<String>,
    ) -> AppResult<Vec<Payment>> {
        let payment_type = match type_filter.as_deref() {
            None => None,
            Some(t) => match t.to_ascii_lowercase().as_str() {
                "payment" => Some(PaymentType::Payment),
                "fine" => Some(PaymentType::Fine),
                other => {
                    return Err(AppError::Validation(format!(
                        "Unknown payment type filter: {}",
                        other
                    )))
                }
            },
        };

        let scope = if claims.is_staff {
            user_id
        } else {
            if user_id.is_some() {
                return Err(AppError::Authorization(
                    "You don't have permission to view these payments.".to_string(),
                ));
            }
            Some(claims.user_id)
        };

        self.repository.payments.list(scope, payment_type).await
    }
}
