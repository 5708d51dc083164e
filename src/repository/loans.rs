//! Loans repository for database operations
//!
//! The "one active loan per book" rule is enforced by the partial unique
//! index `loans_one_active_per_book`; a losing concurrent insert surfaces as a
//! unique violation and is reported as `BookAlreadyLoaned`.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{FromRow, Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::Book,
        loan::{Loan, NewLoan, ReturnOutcome},
    },
};

use super::{LoanStore, Page, PageRequest};

const LOAN_COLUMNS: &str = r#"
    SELECT l.id, l.customer, l.email, l.loan_date, l.returned,
           b.id AS book_id, b.title AS book_title, b.author AS book_author, b.isbn AS book_isbn
    FROM loans l
    JOIN books b ON b.id = l.book_id
"#;

/// Flat loan row joined with its book
#[derive(Debug, FromRow)]
struct LoanRow {
    id: i64,
    customer: String,
    email: String,
    loan_date: NaiveDate,
    returned: Option<bool>,
    book_id: i64,
    book_title: String,
    book_author: String,
    book_isbn: String,
}

impl From<LoanRow> for Loan {
    fn from(row: LoanRow) -> Self {
        Self {
            id: row.id,
            book: Book {
                id: row.book_id,
                title: row.book_title,
                author: row.book_author,
                isbn: row.book_isbn,
            },
            customer: row.customer,
            email: row.email,
            loan_date: row.loan_date,
            returned: row.returned,
        }
    }
}

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn fetch_page(
        &self,
        mut count: QueryBuilder<'_, Postgres>,
        mut select: QueryBuilder<'_, Postgres>,
        page: PageRequest,
    ) -> AppResult<Page<Loan>> {
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        select
            .push(" ORDER BY l.id LIMIT ")
            .push_bind(page.size)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let rows = select.build_query_as::<LoanRow>().fetch_all(&self.pool).await?;

        Ok(Page {
            items: rows.into_iter().map(Loan::from).collect(),
            total,
        })
    }
}

#[async_trait]
impl LoanStore for LoansRepository {
    async fn exists_active_for_book(&self, book_id: i64) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM loans WHERE book_id = $1 AND returned IS NOT TRUE)",
        )
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn insert_if_no_active(&self, loan: &NewLoan) -> AppResult<Loan> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO loans (book_id, customer, email, loan_date)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(loan.book_id)
        .bind(&loan.customer)
        .bind(&loan.email)
        .bind(loan.loan_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return AppError::BookAlreadyLoaned(format!("book {}", loan.book_id));
                }
                if db.is_foreign_key_violation() {
                    return AppError::BookNotFound(format!("book {}", loan.book_id));
                }
            }
            AppError::Database(e)
        })?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Loan {} vanished after insert", id)))
    }

    async fn get_by_id(&self, id: i64) -> AppResult<Option<Loan>> {
        let row = sqlx::query_as::<_, LoanRow>(&format!("{LOAN_COLUMNS} WHERE l.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Loan::from))
    }

    async fn mark_returned(&self, id: i64, returned: bool) -> AppResult<ReturnOutcome> {
        // The row lock taken by UPDATE serializes concurrent returns of one loan.
        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE loans SET returned = $2
            WHERE id = $1 AND returned IS NOT TRUE
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(returned)
        .fetch_optional(&self.pool)
        .await?;

        match (updated, self.get_by_id(id).await?) {
            (Some(_), Some(loan)) => Ok(ReturnOutcome::Updated(loan)),
            (None, Some(_)) => Ok(ReturnOutcome::AlreadyReturned),
            (_, None) => Ok(ReturnOutcome::NotFound),
        }
    }

    async fn find_by_isbn_or_customer(
        &self,
        isbn: Option<&str>,
        customer: Option<&str>,
        page: PageRequest,
    ) -> AppResult<Page<Loan>> {
        let build = |head: &str| {
            let mut builder = QueryBuilder::<Postgres>::new(head);
            match (isbn, customer) {
                (Some(isbn), Some(customer)) => {
                    builder
                        .push(" WHERE b.isbn = ")
                        .push_bind(isbn.to_string())
                        .push(" OR l.customer = ")
                        .push_bind(customer.to_string());
                }
                (Some(isbn), None) => {
                    builder.push(" WHERE b.isbn = ").push_bind(isbn.to_string());
                }
                (None, Some(customer)) => {
                    builder.push(" WHERE l.customer = ").push_bind(customer.to_string());
                }
                (None, None) => {}
            }
            builder
        };

        let count = build("SELECT COUNT(*) FROM loans l JOIN books b ON b.id = l.book_id");
        let select = build(LOAN_COLUMNS);
        self.fetch_page(count, select, page).await
    }

    async fn find_by_book(&self, book_id: i64, page: PageRequest) -> AppResult<Page<Loan>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM loans l WHERE l.book_id = ");
        count.push_bind(book_id);
        let mut select = QueryBuilder::<Postgres>::new(LOAN_COLUMNS);
        select.push(" WHERE l.book_id = ").push_bind(book_id);
        self.fetch_page(count, select, page).await
    }

    async fn find_active_loaned_before(&self, cutoff: NaiveDate) -> AppResult<Vec<Loan>> {
        let rows = sqlx::query_as::<_, LoanRow>(&format!(
            "{LOAN_COLUMNS} WHERE l.loan_date < $1 AND l.returned IS NOT TRUE ORDER BY l.id"
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Loan::from).collect())
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
