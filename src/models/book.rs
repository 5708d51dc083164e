//! Book (catalog entry) model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Book model from storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub isbn: String,
}

/// Book ready to be stored (id not yet assigned)
#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub isbn: String,
}

/// Book as exposed by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BookDto {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub isbn: String,
}

impl From<Book> for BookDto {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            isbn: book.isbn,
        }
    }
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "title must not be empty"))]
    #[serde(default)]
    pub title: String,
    #[validate(length(min = 1, message = "author must not be empty"))]
    #[serde(default)]
    pub author: String,
    #[validate(length(min = 1, message = "isbn must not be empty"))]
    #[serde(default)]
    pub isbn: String,
}

impl From<CreateBook> for NewBook {
    fn from(request: CreateBook) -> Self {
        Self {
            title: request.title.trim().to_string(),
            author: request.author.trim().to_string(),
            isbn: request.isbn.trim().to_string(),
        }
    }
}

/// Update book request. The ISBN is fixed once the book is created.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, message = "title must not be empty"))]
    #[serde(default)]
    pub title: String,
    #[validate(length(min = 1, message = "author must not be empty"))]
    #[serde(default)]
    pub author: String,
}

/// Book search filter. Empty fields match everything.
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Case-insensitive substring of the title
    pub title: Option<String>,
    /// Case-insensitive substring of the author
    pub author: Option<String>,
    /// Exact ISBN
    pub isbn: Option<String>,
    /// Zero-based page number (default: 0)
    pub page: Option<i64>,
    /// Page size (default: 20)
    pub size: Option<i64>,
}

/// Normalized book filter handed to storage
#[derive(Debug, Clone, Default)]
pub struct BookFilter {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl From<&BookQuery> for BookFilter {
    fn from(query: &BookQuery) -> Self {
        Self {
            title: non_blank(&query.title),
            author: non_blank(&query.author),
            isbn: non_blank(&query.isbn),
        }
    }
}

impl BookFilter {
    /// In-process evaluation of the filter, matching what the SQL search does
    pub fn matches(&self, book: &Book) -> bool {
        let contains = |haystack: &str, needle: &str| {
            haystack.to_lowercase().contains(&needle.to_lowercase())
        };
        self.title.as_deref().map_or(true, |t| contains(&book.title, t))
            && self.author.as_deref().map_or(true, |a| contains(&book.author, a))
            && self.isbn.as_deref().map_or(true, |i| book.isbn == i)
    }
}
