//! Book catalog endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        book::{BookDto, BookFilter, BookQuery, CreateBook, UpdateBook},
        loan::{LoanDto, PageQuery},
    },
    repository::PageRequest,
    AppState,
};

use super::PaginatedResponse;

/// List books, optionally filtered by title, author or ISBN
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookQuery),
    responses(
        (status = 200, description = "Page of books", body = crate::api::BookPage)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<PaginatedResponse<BookDto>>> {
    let filter = BookFilter::from(&query);
    let request = PageRequest::new(query.page, query.size);
    let page = state.services.catalog.find(&filter, request).await?;
    Ok(Json(PaginatedResponse::from_page(page, request)))
}

/// Get a book by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = BookDto),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<BookDto>> {
    let book = state.services.catalog.get_by_id(id).await?;
    Ok(Json(book.into()))
}

/// Add a book to the catalog
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = BookDto),
        (status = 400, description = "Invalid input or ISBN already registered", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    Json(request): Json<CreateBook>,
) -> AppResult<(StatusCode, Json<BookDto>)> {
    request.validate()?;

    let created = state.services.catalog.add(request.into()).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Update title and author of a book
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = BookDto),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateBook>,
) -> AppResult<Json<BookDto>> {
    request.validate()?;

    let updated = state
        .services
        .catalog
        .update(id, &request.title, &request.author)
        .await?;
    Ok(Json(updated.into()))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Book is out on loan", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    state.services.catalog.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Every loan of a book, active and returned
#[utoipa::path(
    get,
    path = "/books/{id}/loans",
    tag = "books",
    params(
        ("id" = i64, Path, description = "Book ID"),
        PageQuery
    ),
    responses(
        (status = 200, description = "Page of loans", body = crate::api::LoanPage),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_book_loans(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PaginatedResponse<LoanDto>>> {
    let request = PageRequest::new(query.page, query.size);
    let page = state.services.loans.find_by_book(id, request).await?;
    Ok(Json(PaginatedResponse::from_page(page, request)))
}
