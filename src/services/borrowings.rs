//! Borrowing lifecycle service.
//!
//! Inventory mutation and notification hooks are invoked explicitly from
//! here, never from persistence side effects, so ordering and atomicity
//! stay auditable.

use chrono::{NaiveDate, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::Book,
        borrowing::Borrowing,
        payment::Payment,
        user::UserClaims,
    },
    repository::Repository,
    services::{fees, notifications::NotificationsService, payments::PaymentsService},
};

/// Result of a successful creation: the borrowing plus its base payment
/// (session attached).
#[derive(Debug)]
pub struct BorrowingCreated {
    pub borrowing: Borrowing,
    pub payment: Payment,
}

/// Result of a successful return; `fine` is present only when the
/// borrowing came back overdue.
#[derive(Debug)]
pub struct BorrowingReturned {
    pub borrowing: Borrowing,
    pub fine: Option<Payment>,
}

#[derive(Clone)]
pub struct BorrowingsService {
    repository: Repository,
    payments: PaymentsService,
    notifications: NotificationsService,
}

impl BorrowingsService {
    pub fn new(
        repository: Repository,
        payments: PaymentsService,
        notifications: NotificationsService,
    ) -> Self {
        Self {
            repository,
            payments,
            notifications,
        }
    }

    /// Borrow a book.
    ///
    /// The borrowing row, the inventory decrement and the Pending base
    /// payment commit as one transaction. The checkout session is opened
    /// after the commit: a gateway failure surfaces to the caller while
    /// the committed rows stay consistent for a later retry.
    pub async fn create(
        &self,
        user_id: i32,
        book_id: i32,
        expected_return_date: NaiveDate,
    ) -> AppResult<BorrowingCreated> {
        let today = Utc::now().date_naive();

        if expected_return_date < today {
            return Err(AppError::Validation("Please enter a valid date.".to_string()));
        }

        let book = self.repository.books.get_by_id(book_id).await?;
        if book.inventory <= 0 {
            return Err(AppError::Validation(
                "We don't have enough inventory.".to_string(),
            ));
        }

        let amount = fees::base_amount(today, expected_return_date, book.daily_fee);
        let (borrowing, payment) = self
            .repository
            .borrowings
            .create(user_id, book_id, today, expected_return_date, amount)
            .await?;

        tracing::info!(
            "Borrowing {} created for user {} (book {}, due {})",
            borrowing.id,
            user_id,
            book_id,
            expected_return_date
        );

        let user = self.repository.users.get_by_id(user_id).await?;
        self.notifications
            .borrowing_created(&user.email, &book.title, borrowing.expected_return_date);

        let payment = self
            .payments
            .open_checkout_session(payment, &book.title)
            .await?;

        Ok(BorrowingCreated { borrowing, payment })
    }

    /// Return a borrowed book.
    ///
    /// Only the borrowing's owner may return it. The return date, the
    /// inventory increment and the Fine payment (when overdue) commit as
    /// one transaction.
    pub async fn return_borrowing(
        &self,
        borrowing_id: i32,
        claims: &UserClaims,
    ) -> AppResult<BorrowingReturned> {
        let borrowing = self.repository.borrowings.get_by_id(borrowing_id).await?;

        if borrowing.user_id != claims.user_id {
            return Err(AppError::Authorization(
                "You don't have permission to do this.".to_string(),
            ));
        }
        if borrowing.actual_return_date.is_some() {
            return Err(AppError::AlreadyReturned("Already returned.".to_string()));
        }

        let book = self.repository.books.get_by_id(borrowing.book_id).await?;
        let today = Utc::now().date_naive();
        let fine_amount = fees::fine_amount(borrowing.expected_return_date, today, book.daily_fee);

        let (borrowing, fine) = self
            .repository
            .borrowings
            .mark_returned(borrowing_id, today, fine_amount)
            .await?;

        tracing::info!(
            "Borrowing {} returned{}",
            borrowing.id,
            if fine.is_some() { " with fine" } else { "" }
        );

        let fine = match fine {
            Some(payment) => Some(
                self.payments
                    .open_checkout_session(payment, &book.title)
                    .await?,
            ),
            None => None,
        };

        Ok(BorrowingReturned { borrowing, fine })
    }

    /// List borrowings visible to the requester.
    ///
    /// Non-staff users always see their own borrowings; passing `user_id`
    /// requires staff. For staff `user_id` is a plain filter.
    pub async fn list(
        &self,
        claims: &UserClaims,
        is_active: Option<bool>,
        user_id: Option<i32>,
    ) -> AppResult<Vec<Borrowing>> {
        let scope = if claims.is_staff {
            user_id
        } else {
            if user_id.is_some() {
                return Err(AppError::Authorization(
                    "You don't have permission to view this borrowing.".to_string(),
                ));
            }
            Some(claims.user_id)
        };

        self.repository.borrowings.list(scope, is_active).await
    }

    /// Get one borrowing with its book and payments; owner or staff only
    pub async fn get(
        &self,
        borrowing_id: i32,
        claims: &UserClaims,
    ) -> AppResult<(Borrowing, Book, Vec<Payment>)> {
        let borrowing = self.repository.borrowings.get_by_id(borrowing_id).await?;

        if borrowing.user_id != claims.user_id && !claims.is_staff {
            return Err(AppError::Authorization(
                "You do not have permission to perform this action.".to_string(),
            ));
        }

        let book = self.repository.books.get_by_id(borrowing.book_id).await?;
        let payments = self
            .repository
            .payments
            .list_for_borrowing(borrowing_id)
            .await?;

        Ok((borrowing, book, payments))
    }
}
