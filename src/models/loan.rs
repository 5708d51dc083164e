//! Loan model and related types

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::book::{Book, BookDto};

/// Loan model. The book is a snapshot read alongside the loan row; the loan
/// only owns the `book.id` reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: i64,
    pub book: Book,
    pub customer: String,
    pub email: String,
    pub loan_date: NaiveDate,
    /// `None` until somebody reports on the loan; `Some(true)` is terminal
    pub returned: Option<bool>,
}

impl Loan {
    /// A loan is active until it has been marked returned
    pub fn is_active(&self) -> bool {
        self.returned != Some(true)
    }

    /// Active and taken out more than `grace_days` before `as_of`
    pub fn is_overdue(&self, as_of: NaiveDate, grace_days: i64) -> bool {
        self.is_active() && self.loan_date < overdue_cutoff(as_of, grace_days)
    }
}

/// Loans dated strictly before this day are overdue
pub fn overdue_cutoff(as_of: NaiveDate, grace_days: i64) -> NaiveDate {
    as_of - Duration::days(grace_days)
}

/// Loan ready to be stored
#[derive(Debug, Clone)]
pub struct NewLoan {
    pub book_id: i64,
    pub customer: String,
    pub email: String,
    pub loan_date: NaiveDate,
}

/// Result of a conditional return update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnOutcome {
    Updated(Loan),
    AlreadyReturned,
    NotFound,
}

/// Loan as exposed by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDto {
    pub id: i64,
    pub isbn: String,
    pub customer: String,
    pub email: String,
    pub loan_date: NaiveDate,
    pub returned: Option<bool>,
    pub book: BookDto,
}

impl From<Loan> for LoanDto {
    fn from(loan: Loan) -> Self {
        Self {
            id: loan.id,
            isbn: loan.book.isbn.clone(),
            customer: loan.customer,
            email: loan.email,
            loan_date: loan.loan_date,
            returned: loan.returned,
            book: loan.book.into(),
        }
    }
}

/// Create loan request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateLoanRequest {
    /// ISBN of the book to lend
    #[validate(length(min = 1, message = "isbn must not be empty"))]
    #[serde(default)]
    pub isbn: String,
    #[validate(length(min = 1, message = "customer must not be empty"))]
    #[serde(default)]
    pub customer: String,
    #[validate(email(message = "email must be a valid address"))]
    #[serde(default)]
    pub email: String,
}

/// Return (or report on) a loan
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReturnLoanRequest {
    pub returned: bool,
}

/// Loan search. A loan matches when its book has the given ISBN or when its
/// customer has the given name.
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct LoanQuery {
    pub isbn: Option<String>,
    pub customer: Option<String>,
    /// Zero-based page number (default: 0)
    pub page: Option<i64>,
    /// Page size (default: 20)
    pub size: Option<i64>,
}

/// Pagination-only query
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct PageQuery {
    /// Zero-based page number (default: 0)
    pub page: Option<i64>,
    /// Page size (default: 20)
    pub size: Option<i64>,
}
