//! API handlers for Biblioteca REST endpoints

pub mod books;
pub mod health;
pub mod loans;
pub mod openapi;

use axum::{
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::ToSchema;

use crate::{
    models::{book::BookDto, loan::LoanDto},
    repository::{Page, PageRequest},
    AppState,
};

/// Paginated response wrapper
#[derive(Serialize, ToSchema)]
#[aliases(BookPage = PaginatedResponse<BookDto>, LoanPage = PaginatedResponse<LoanDto>)]
pub struct PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// Entries of the requested page
    pub items: Vec<T>,
    /// Total number of matching entries
    pub total: i64,
    /// Zero-based page number
    pub page: i64,
    /// Requested page size
    pub size: i64,
}

impl<T> PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub fn from_page<U>(page: Page<U>, request: PageRequest) -> Self
    where
        U: Into<T>,
    {
        Self {
            items: page.items.into_iter().map(Into::into).collect(),
            total: page.total,
            page: request.page,
            size: request.size,
        }
    }
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Books
        .route("/books", get(books::list_books).post(books::create_book))
        .route(
            "/books/:id",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        .route("/books/:id/loans", get(books::list_book_loans))
        // Loans
        .route("/loans", post(loans::create_loan).get(loans::list_loans))
        .route("/loans/overdue", get(loans::list_overdue))
        .route("/loans/:id", get(loans::get_loan).patch(loans::return_loan))
        .with_state(state.clone());

    let health = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .merge(health)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
