//! Data models for Biblioteca

pub mod book;
pub mod loan;

// Re-export commonly used types
pub use book::{Book, BookDto, NewBook};
pub use loan::{Loan, LoanDto, NewLoan};
