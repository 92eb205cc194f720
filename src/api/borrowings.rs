//! Borrowing lifecycle endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::{book::Book, borrowing::Borrowing, payment::Payment},
};

use super::AuthenticatedUser;

/// Create borrowing request
#[derive(Deserialize, ToSchema)]
pub struct CreateBorrowingRequest {
    /// Book to borrow
    pub book_id: i32,
    /// Planned return date (today or later)
    pub expected_return_date: NaiveDate,
}

/// Borrowing list filters
#[derive(Deserialize, IntoParams)]
pub struct BorrowingQuery {
    /// true = only active, false = only returned
    pub is_active: Option<bool>,
    /// Filter by user (staff only)
    pub user_id: Option<i32>,
}

/// Created borrowing with its checkout link
#[derive(Serialize, ToSchema)]
pub struct CreateBorrowingResponse {
    pub id: i32,
    pub borrow_date: NaiveDate,
    pub expected_return_date: NaiveDate,
    pub actual_return_date: Option<NaiveDate>,
    pub book_id: i32,
    pub user_id: i32,
    pub payment_session_url: Option<String>,
}

/// Return outcome; fine fields are present only for overdue returns
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payments: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_session_url: Option<String>,
}

/// Borrowing detail with nested book and payments
#[derive(Serialize, ToSchema)]
pub struct BorrowingDetailResponse {
    pub id: i32,
    pub borrow_date: NaiveDate,
    pub expected_return_date: NaiveDate,
    pub actual_return_date: Option<NaiveDate>,
    pub book: Book,
    pub user_id: i32,
    pub payments: Vec<Payment>,
}

/// List borrowings
#[utoipa::path(
    get,
    path = "/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(BorrowingQuery),
    responses(
        (status = 200, description = "Visible borrowings", body = Vec<Borrowing>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "user_id filter requires staff")
    )
)]
pub async fn list_borrowings(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BorrowingQuery>,
) -> AppResult<Json<Vec<Borrowing>>> {
    let borrowings = state
        .services
        .borrowings
        .list(&claims, query.is_active, query.user_id)
        .await?;
    Ok(Json(borrowings))
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    request_body = CreateBorrowingRequest,
    responses(
        (status = 201, description = "Borrowing created", body = CreateBorrowingResponse),
        (status = 400, description = "No inventory or invalid date"),
        (status = 401, description = "Not authenticated"),
        (status = 502, description = "Checkout session creation failed")
    )
)]
pub async fn create_borrowing(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateBorrowingRequest>,
) -> AppResult<(StatusCode, Json<CreateBorrowingResponse>)> {
    let created = state
        .services
        .borrowings
        .create(claims.user_id, request.book_id, request.expected_return_date)
        .await?;

    let borrowing = created.borrowing;
    Ok((
        StatusCode::CREATED,
        Json(CreateBorrowingResponse {
            id: borrowing.id,
            borrow_date: borrowing.borrow_date,
            expected_return_date: borrowing.expected_return_date,
            actual_return_date: borrowing.actual_return_date,
            book_id: borrowing.book_id,
            user_id: borrowing.user_id,
            payment_session_url: created.payment.session_url,
        }),
    ))
}

/// Get borrowing details
#[utoipa::path(
    get,
    path = "/borrowings/{id}",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing ID")
    ),
    responses(
        (status = 200, description = "Borrowing details", body = BorrowingDetailResponse),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Borrowing not found")
    )
)]
pub async fn get_borrowing(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowingDetailResponse>> {
    let (borrowing, book, payments) = state.services.borrowings.get(id, &claims).await?;

    Ok(Json(BorrowingDetailResponse {
        id: borrowing.id,
        borrow_date: borrowing.borrow_date,
        expected_return_date: borrowing.expected_return_date,
        actual_return_date: borrowing.actual_return_date,
        book,
        user_id: borrowing.user_id,
        payments,
    }))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/borrowings/{id}/return",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing ID")
    ),
    responses(
        (status = 200, description = "Returned", body = ReturnResponse),
        (status = 400, description = "Already returned"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Borrowing not found")
    )
)]
pub async fn return_borrowing(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ReturnResponse>> {
    let returned = state.services.borrowings.return_borrowing(id, &claims).await?;

    let mut response = ReturnResponse {
        detail: "Returned successfully.".to_string(),
        payments: None,
        payment_session_url: None,
    };

    if let Some(fine) = returned.fine {
        response.payments = Some("Please pay the fine.".to_string());
        response.payment_session_url = fine.session_url;
    }

    Ok(Json(response))
}
