//! Repository layer: storage traits and their implementations
//!
//! The catalog and the ledger only ever talk to [`BookStore`] and
//! [`LoanStore`]. Two implementations exist: PostgreSQL (`books`, `loans`)
//! and an in-process store (`memory`) used by the `memory` backend and tests.

pub mod books;
pub mod loans;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookFilter, NewBook},
        loan::{Loan, NewLoan, ReturnOutcome},
    },
};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Zero-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub size: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, size: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(0).max(0),
            size: size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Rows to skip; saturates instead of overflowing on absurd page numbers
    pub fn offset(&self) -> i64 {
        self.page.saturating_mul(self.size)
    }

    /// Slice an already filtered and ordered collection
    pub fn slice<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len() as i64;
        let items = items
            .into_iter()
            .skip(self.offset() as usize)
            .take(self.size as usize)
            .collect();
        Page { items, total }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results plus the total number of matches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// Outcome of a guarded book deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    HasActiveLoan,
}

/// Persistence contract for books
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn exists_by_isbn(&self, isbn: &str) -> AppResult<bool>;

    /// Insert a book. Fails with `DuplicateIsbn` when the ISBN is taken.
    async fn insert(&self, book: &NewBook) -> AppResult<Book>;

    async fn get_by_id(&self, id: i64) -> AppResult<Option<Book>>;

    async fn get_by_isbn(&self, isbn: &str) -> AppResult<Option<Book>>;

    /// Update title and author; `None` when the book does not exist
    async fn update(&self, id: i64, title: &str, author: &str) -> AppResult<Option<Book>>;

    /// Delete a book unless it still has an active loan
    async fn delete(&self, id: i64) -> AppResult<DeleteOutcome>;

    /// Books matching every given filter field, ordered by id
    async fn find(&self, filter: &BookFilter, page: PageRequest) -> AppResult<Page<Book>>;
}

/// Persistence contract for loans
#[async_trait]
pub trait LoanStore: Send + Sync {
    async fn exists_active_for_book(&self, book_id: i64) -> AppResult<bool>;

    /// Atomically insert a loan if its book has no active loan.
    /// Fails with `BookAlreadyLoaned` when one exists and with `BookNotFound`
    /// when the book is gone.
    async fn insert_if_no_active(&self, loan: &NewLoan) -> AppResult<Loan>;

    async fn get_by_id(&self, id: i64) -> AppResult<Option<Loan>>;

    /// Set `returned` unless the loan is already returned
    async fn mark_returned(&self, id: i64, returned: bool) -> AppResult<ReturnOutcome>;

    /// Loans whose book has `isbn` or whose customer is `customer`, ordered
    /// by id. With neither given every loan matches.
    async fn find_by_isbn_or_customer(
        &self,
        isbn: Option<&str>,
        customer: Option<&str>,
        page: PageRequest,
    ) -> AppResult<Page<Loan>>;

    /// All loans of a book, active and returned, ordered by id
    async fn find_by_book(&self, book_id: i64, page: PageRequest) -> AppResult<Page<Loan>>;

    /// Active loans dated strictly before `cutoff`
    async fn find_active_loaned_before(&self, cutoff: NaiveDate) -> AppResult<Vec<Loan>>;

    /// Connectivity check used by readiness
    async fn ping(&self) -> AppResult<()>;
}

/// Storage handles shared by the services
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<dyn BookStore>,
    pub loans: Arc<dyn LoanStore>,
}

impl Repository {
    /// PostgreSQL-backed repository
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self {
            books: Arc::new(books::BooksRepository::new(pool.clone())),
            loans: Arc::new(loans::LoansRepository::new(pool)),
        }
    }

    /// In-process repository; both handles share one store
    pub fn in_memory() -> Self {
        let store = Arc::new(memory::MemoryStore::new());
        Self {
            books: store.clone(),
            loans: store,
        }
    }
}
