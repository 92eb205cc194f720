//! Business logic services

pub mod auth;
pub mod borrowings;
pub mod catalog;
pub mod fees;
pub mod notifications;
pub mod payments;
pub mod stripe;
pub mod telegram;

use std::sync::Arc;

use crate::{config::AuthConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub catalog: catalog::CatalogService,
    pub borrowings: borrowings::BorrowingsService,
    pub payments: payments::PaymentsService,
    pub notifications: notifications::NotificationsService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository and collaborators
    pub fn new(
        repository: Repository,
        auth_config: AuthConfig,
        gateway: Arc<dyn stripe::CheckoutGateway>,
        queue: notifications::NotificationQueue,
    ) -> Self {
        let notifications =
            notifications::NotificationsService::new(repository.clone(), queue);
        let payments = payments::PaymentsService::new(
            repository.clone(),
            gateway,
            notifications.clone(),
        );

        Self {
            auth: auth::AuthService::new(repository.clone(), auth_config),
            catalog: catalog::CatalogService::new(repository.clone()),
            borrowings: borrowings::BorrowingsService::new(
                repository.clone(),
                payments.clone(),
                notifications.clone(),
            ),
            payments,
            notifications,
            repository,
        }
    }

    /// Cheap connectivity probe used by the readiness endpoint
    pub async fn db_ready(&self) -> crate::error::AppResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.repository.pool)
            .await?;
        Ok(())
    }
}
