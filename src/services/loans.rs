//! Loan ledger service
//!
//! Owns the lending rules: a book has at most one active loan, a loan is
//! created active and becomes terminal once marked returned.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::{
    error::{require_non_blank, AppError, AppResult},
    models::loan::{overdue_cutoff, Loan, NewLoan, ReturnOutcome},
    repository::{LoanStore, Page, PageRequest},
};

use super::catalog::CatalogService;

#[derive(Clone)]
pub struct LoansService {
    loans: Arc<dyn LoanStore>,
    catalog: CatalogService,
}

impl LoansService {
    pub fn new(loans: Arc<dyn LoanStore>, catalog: CatalogService) -> Self {
        Self { loans, catalog }
    }

    /// Lend the book with `isbn` to a customer. Returns the new loan id.
    pub async fn create_loan(&self, isbn: &str, customer: &str, email: &str) -> AppResult<i64> {
        let (isbn, customer, email) = (isbn.trim(), customer.trim(), email.trim());
        require_non_blank(&[("isbn", isbn), ("customer", customer), ("email", email)])?;

        let book = self.catalog.get_by_isbn(isbn).await?;

        // Check and insert are one atomic store operation; a concurrent loser
        // gets BookAlreadyLoaned instead of a second active loan.
        let new_loan = NewLoan {
            book_id: book.id,
            customer: customer.to_string(),
            email: email.to_string(),
            loan_date: Utc::now().date_naive(),
        };
        let loan = match self.loans.insert_if_no_active(&new_loan).await {
            Ok(loan) => loan,
            Err(AppError::BookAlreadyLoaned(_)) => {
                tracing::info!(book_id = book.id, isbn = %book.isbn, "Book already loaned");
                return Err(AppError::BookAlreadyLoaned(book.isbn));
            }
            Err(AppError::BookNotFound(_)) => {
                return Err(AppError::BookNotFound(format!("isbn {}", book.isbn)));
            }
            Err(e) => return Err(e),
        };

        tracing::info!(loan_id = loan.id, book_id = book.id, customer = %loan.customer, "Loan created");
        Ok(loan.id)
    }

    pub async fn get_by_id(&self, id: i64) -> AppResult<Loan> {
        self.loans
            .get_by_id(id)
            .await?
            .ok_or(AppError::LoanNotFound(id))
    }

    /// Record the returned flag of an active loan. Once `true` the loan is
    /// terminal and any further call fails with `AlreadyTerminal`.
    pub async fn mark_returned(&self, id: i64, returned: bool) -> AppResult<Loan> {
        match self.loans.mark_returned(id, returned).await? {
            ReturnOutcome::Updated(loan) => {
                tracing::info!(loan_id = id, returned, "Loan updated");
                Ok(loan)
            }
            ReturnOutcome::AlreadyReturned => {
                tracing::info!(loan_id = id, "Loan already returned");
                Err(AppError::AlreadyTerminal(id))
            }
            ReturnOutcome::NotFound => Err(AppError::LoanNotFound(id)),
        }
    }

    /// Loans whose book has `isbn` OR whose customer is `customer`
    pub async fn find_by_isbn_or_customer(
        &self,
        isbn: Option<&str>,
        customer: Option<&str>,
        page: PageRequest,
    ) -> AppResult<Page<Loan>> {
        let isbn = isbn.map(str::trim).filter(|v| !v.is_empty());
        let customer = customer.map(str::trim).filter(|v| !v.is_empty());
        self.loans.find_by_isbn_or_customer(isbn, customer, page).await
    }

    /// Every loan of a book, ordered by loan id
    pub async fn find_by_book(&self, book_id: i64, page: PageRequest) -> AppResult<Page<Loan>> {
        let book = self.catalog.get_by_id(book_id).await?;
        self.loans.find_by_book(book.id, page).await
    }

    /// Active loans taken out more than `grace_days` before `as_of`
    pub async fn list_overdue(&self, as_of: NaiveDate, grace_days: i64) -> AppResult<Vec<Loan>> {
        self.loans
            .find_active_loaned_before(overdue_cutoff(as_of, grace_days))
            .await
    }

    pub async fn ping(&self) -> AppResult<()> {
        self.loans.ping().await
    }
}
