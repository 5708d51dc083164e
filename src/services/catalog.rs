//! Book catalog service

use std::sync::Arc;

use crate::{
    error::{require_non_blank, AppError, AppResult},
    models::book::{Book, BookFilter, NewBook},
    repository::{BookStore, DeleteOutcome, Page, PageRequest},
};

#[derive(Clone)]
pub struct CatalogService {
    books: Arc<dyn BookStore>,
}

impl CatalogService {
    pub fn new(books: Arc<dyn BookStore>) -> Self {
        Self { books }
    }

    /// Add a book to the catalog. The ISBN must not be registered yet.
    pub async fn add(&self, book: NewBook) -> AppResult<Book> {
        let book = NewBook {
            title: book.title.trim().to_string(),
            author: book.author.trim().to_string(),
            isbn: book.isbn.trim().to_string(),
        };
        require_non_blank(&[
            ("title", book.title.as_str()),
            ("author", book.author.as_str()),
            ("isbn", book.isbn.as_str()),
        ])?;

        if self.books.exists_by_isbn(&book.isbn).await? {
            tracing::info!(isbn = %book.isbn, "Rejected book with duplicate ISBN");
            return Err(AppError::DuplicateIsbn(book.isbn));
        }
        // The store re-checks under its own constraint; a concurrent add of the
        // same ISBN still ends in DuplicateIsbn.
        let created = self.books.insert(&book).await?;
        tracing::info!(book_id = created.id, isbn = %created.isbn, "Book added");
        Ok(created)
    }

    pub async fn get_by_id(&self, id: i64) -> AppResult<Book> {
        self.books
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::BookNotFound(format!("id {}", id)))
    }

    pub async fn get_by_isbn(&self, isbn: &str) -> AppResult<Book> {
        self.books
            .get_by_isbn(isbn)
            .await?
            .ok_or_else(|| AppError::BookNotFound(format!("isbn {}", isbn)))
    }

    /// Update title and author; the ISBN cannot change
    pub async fn update(&self, id: i64, title: &str, author: &str) -> AppResult<Book> {
        let (title, author) = (title.trim(), author.trim());
        require_non_blank(&[("title", title), ("author", author)])?;

        self.books
            .update(id, title, author)
            .await?
            .ok_or_else(|| AppError::BookNotFound(format!("id {}", id)))
    }

    /// Delete a book. Refused while the book is out on loan; its returned
    /// loans are removed with it.
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        match self.books.delete(id).await? {
            DeleteOutcome::Deleted => {
                tracing::info!(book_id = id, "Book deleted");
                Ok(())
            }
            DeleteOutcome::NotFound => Err(AppError::BookNotFound(format!("id {}", id))),
            DeleteOutcome::HasActiveLoan => {
                tracing::warn!(book_id = id, "Refused to delete book with an active loan");
                Err(AppError::BookHasActiveLoan(id))
            }
        }
    }

    pub async fn find(&self, filter: &BookFilter, page: PageRequest) -> AppResult<Page<Book>> {
        self.books.find(filter, page).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::Repository;

    fn service() -> CatalogService {
        CatalogService::new(Repository::in_memory().books)
    }

    fn new_book(title: &str, author: &str, isbn: &str) -> NewBook {
        NewBook {
            title: title.to_string(),
            author: author.to_string(),
            isbn: isbn.to_string(),
        }
    }

    #[tokio::test]
    async fn test_add_duplicate_isbn_keeps_first_book() {
        let catalog = service();
        let first = catalog.add(new_book("Dune", "Frank Herbert", "123")).await.unwrap();

        let err = catalog
            .add(new_book("Other", "Someone", "123"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateIsbn(ref isbn) if isbn == "123"));

        let stored = catalog.get_by_id(first.id).await.unwrap();
        assert_eq!(stored, first);
    }

    #[tokio::test]
    async fn test_get_missing_book() {
        let catalog = service();
        assert!(matches!(
            catalog.get_by_id(7).await.unwrap_err(),
            AppError::BookNotFound(_)
        ));
        assert!(matches!(
            catalog.get_by_isbn("nope").await.unwrap_err(),
            AppError::BookNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_update_keeps_isbn() {
        let catalog = service();
        let book = catalog.add(new_book("Dune", "Frank Herbert", "123")).await.unwrap();

        let updated = catalog.update(book.id, "Dune Messiah", "F. Herbert").await.unwrap();
        assert_eq!(updated.title, "Dune Messiah");
        assert_eq!(updated.author, "F. Herbert");
        assert_eq!(updated.isbn, "123");

        assert!(matches!(
            catalog.update(99, "x", "y").await.unwrap_err(),
            AppError::BookNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_blank_fields_are_rejected_after_trimming() {
        let catalog = service();

        match catalog.add(new_book("   ", " ", "9")).await.unwrap_err() {
            AppError::Validation(messages) => assert_eq!(
                messages,
                vec!["title must not be empty", "author must not be empty"]
            ),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(
            catalog.get_by_isbn("9").await.unwrap_err(),
            AppError::BookNotFound(_)
        ));

        let book = catalog.add(new_book(" Dune ", "Frank Herbert", " 123 ")).await.unwrap();
        assert_eq!(book.title, "Dune");
        assert_eq!(book.isbn, "123");

        assert!(matches!(
            catalog.update(book.id, "  ", "  ").await.unwrap_err(),
            AppError::Validation(ref messages) if messages.len() == 2
        ));
        assert_eq!(catalog.get_by_id(book.id).await.unwrap().title, "Dune");
    }

    #[tokio::test]
    async fn test_delete() {
        let catalog = service();
        let book = catalog.add(new_book("Dune", "Frank Herbert", "123")).await.unwrap();
        catalog.delete(book.id).await.unwrap();
        assert!(matches!(
            catalog.delete(book.id).await.unwrap_err(),
            AppError::BookNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_find_with_filter_and_page() {
        let catalog = service();
        catalog.add(new_book("Dune", "Frank Herbert", "1")).await.unwrap();
        catalog.add(new_book("Dune Messiah", "Frank Herbert", "2")).await.unwrap();
        catalog.add(new_book("Emma", "Jane Austen", "3")).await.unwrap();

        let filter = BookFilter {
            author: Some("herbert".to_string()),
            ..Default::default()
        };
        let page = catalog
            .find(&filter, PageRequest::new(Some(0), Some(1)))
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].isbn, "1");

        let all = catalog.find(&BookFilter::default(), PageRequest::default()).await.unwrap();
        assert_eq!(all.total, 3);
    }
}
