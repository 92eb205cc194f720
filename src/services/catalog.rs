//! Book catalog service

use rust_decimal::Decimal;

use crate::{
    error::{AppError, AppResult},
    models::book::Book,
    repository::{books::BookFields, Repository},
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List all books
    pub async fn list_books(&self) -> AppResult<Vec<Book>> {
        self.repository.books.list().await
    }

    /// Get book by ID
    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Create a new book
    pub async fn create_book(&self, fields: BookFields) -> AppResult<Book> {
        Self::check_fields(&fields)?;
        self.repository.books.create(&fields).await
    }

    /// Update an existing book
    pub async fn update_book(&self, id: i32, fields: BookFields) -> AppResult<Book> {
        Self::check_fields(&fields)?;
        self.repository.books.update(id, &fields).await
    }

    /// Delete a book
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await
    }

    fn check_fields(fields: &BookFields) -> AppResult<()> {
        if fields.inventory < 0 {
            return Err(AppError::Validation(
                "Inventory cannot be negative".to_string(),
            ));
        }
        if fields.daily_fee < Decimal::ZERO {
            return Err(AppError::Validation(
                "Daily fee cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}
