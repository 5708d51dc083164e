//! Books repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{map_unique_violation, AppError, AppResult},
    models::book::{Book, BookFilter, NewBook},
};

use super::{BookStore, DeleteOutcome, Page, PageRequest};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn push_filter<'a>(builder: &mut QueryBuilder<'a, Postgres>, filter: &'a BookFilter) {
        builder.push(" WHERE 1=1");
        if let Some(ref title) = filter.title {
            builder
                .push(" AND title ILIKE ")
                .push_bind(format!("%{}%", escape_like(title)));
        }
        if let Some(ref author) = filter.author {
            builder
                .push(" AND author ILIKE ")
                .push_bind(format!("%{}%", escape_like(author)));
        }
        if let Some(ref isbn) = filter.isbn {
            builder.push(" AND isbn = ").push_bind(isbn);
        }
    }
}

/// Escape LIKE wildcards so user input only matches literally
fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[async_trait]
impl BookStore for BooksRepository {
    async fn exists_by_isbn(&self, isbn: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1)")
            .bind(isbn)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn insert(&self, book: &NewBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, isbn)
            VALUES ($1, $2, $3)
            RETURNING id, title, author, isbn
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, || AppError::DuplicateIsbn(book.isbn.clone())))
    }

    async fn get_by_id(&self, id: i64) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT id, title, author, isbn FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn get_by_isbn(&self, isbn: &str) -> AppResult<Option<Book>> {
        let book =
            sqlx::query_as::<_, Book>("SELECT id, title, author, isbn FROM books WHERE isbn = $1")
                .bind(isbn)
                .fetch_optional(&self.pool)
                .await?;
        Ok(book)
    }

    async fn update(&self, id: i64, title: &str, author: &str) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET title = $2, author = $3
            WHERE id = $1
            RETURNING id, title, author, isbn
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(author)
        .fetch_optional(&self.pool)
        .await?;
        Ok(book)
    }

    async fn delete(&self, id: i64) -> AppResult<DeleteOutcome> {
        let deleted = sqlx::query(
            r#"
            DELETE FROM books b
            WHERE b.id = $1
              AND NOT EXISTS (
                  SELECT 1 FROM loans l
                  WHERE l.book_id = b.id AND l.returned IS NOT TRUE
              )
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if deleted > 0 {
            return Ok(DeleteOutcome::Deleted);
        }

        match self.get_by_id(id).await? {
            Some(_) => Ok(DeleteOutcome::HasActiveLoan),
            None => Ok(DeleteOutcome::NotFound),
        }
    }

    async fn find(&self, filter: &BookFilter, page: PageRequest) -> AppResult<Page<Book>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM books");
        Self::push_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT id, title, author, isbn FROM books");
        Self::push_filter(&mut select, filter);
        select
            .push(" ORDER BY id LIMIT ")
            .push_bind(page.size)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let items = select.build_query_as::<Book>().fetch_all(&self.pool).await?;

        Ok(Page { items, total })
    }
}
