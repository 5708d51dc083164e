//! Loan management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    error::AppResult,
    models::loan::{CreateLoanRequest, LoanDto, LoanQuery, ReturnLoanRequest},
    repository::PageRequest,
    AppState,
};

use super::PaginatedResponse;

/// Lend a book, identified by ISBN, to a customer
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = CreateLoanRequest,
    responses(
        (status = 201, description = "Loan created, body is the loan ID", body = i64),
        (status = 400, description = "Invalid input or book already loaned", body = crate::error::ErrorResponse),
        (status = 404, description = "No book with this ISBN", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_loan(
    State(state): State<AppState>,
    Json(request): Json<CreateLoanRequest>,
) -> AppResult<(StatusCode, Json<i64>)> {
    request.validate()?;

    let id = state
        .services
        .loans
        .create_loan(&request.isbn, &request.customer, &request.email)
        .await?;
    Ok((StatusCode::CREATED, Json(id)))
}

/// Get a loan by ID
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    params(
        ("id" = i64, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan details", body = LoanDto),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_loan(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<LoanDto>> {
    let loan = state.services.loans.get_by_id(id).await?;
    Ok(Json(loan.into()))
}

/// Record whether a loan has been returned
#[utoipa::path(
    patch,
    path = "/loans/{id}",
    tag = "loans",
    params(
        ("id" = i64, Path, description = "Loan ID")
    ),
    request_body = ReturnLoanRequest,
    responses(
        (status = 200, description = "Loan updated"),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Loan already returned", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_loan(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<ReturnLoanRequest>,
) -> AppResult<StatusCode> {
    state.services.loans.mark_returned(id, request.returned).await?;
    Ok(StatusCode::OK)
}

/// Search loans by book ISBN or customer name (either may match)
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    params(LoanQuery),
    responses(
        (status = 200, description = "Page of loans", body = crate::api::LoanPage)
    )
)]
pub async fn list_loans(
    State(state): State<AppState>,
    Query(query): Query<LoanQuery>,
) -> AppResult<Json<PaginatedResponse<LoanDto>>> {
    let request = PageRequest::new(query.page, query.size);
    let page = state
        .services
        .loans
        .find_by_isbn_or_customer(query.isbn.as_deref(), query.customer.as_deref(), request)
        .await?;
    Ok(Json(PaginatedResponse::from_page(page, request)))
}

/// Loans currently overdue
#[utoipa::path(
    get,
    path = "/loans/overdue",
    tag = "loans",
    responses(
        (status = 200, description = "Overdue loans", body = Vec<LoanDto>)
    )
)]
pub async fn list_overdue(State(state): State<AppState>) -> AppResult<Json<Vec<LoanDto>>> {
    let loans = state
        .services
        .overdue
        .overdue(Utc::now().date_naive())
        .await?;
    Ok(Json(loans.into_iter().map(LoanDto::from).collect()))
}
