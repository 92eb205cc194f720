//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, borrowings, health, payments};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Libris API",
        version = "0.1.0",
        description = "Library Borrowing Management Service REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::login,
        auth::me,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Borrowings
        borrowings::list_borrowings,
        borrowings::create_borrowing,
        borrowings::get_borrowing,
        borrowings::return_borrowing,
        // Payments
        payments::list_payments,
        payments::payment_success,
        payments::payment_cancel,
    ),
    components(
        schemas(
            // Auth
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::LoginResponse,
            crate::models::user::UserPublic,
            // Books
            crate::models::book::Book,
            crate::models::book::CoverType,
            books::BookRequest,
            // Borrowings
            crate::models::borrowing::Borrowing,
            borrowings::CreateBorrowingRequest,
            borrowings::CreateBorrowingResponse,
            borrowings::BorrowingDetailResponse,
            borrowings::ReturnResponse,
            // Payments
            crate::models::payment::Payment,
            crate::models::payment::PaymentStatus,
            crate::models::payment::PaymentType,
            payments::ConfirmationResponse,
            payments::CancelResponse,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "books", description = "Book catalog management"),
        (name = "borrowings", description = "Borrowing lifecycle"),
        (name = "payments", description = "Payments and checkout callbacks")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
