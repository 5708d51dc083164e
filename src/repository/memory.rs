//! In-process storage for books and loans
//!
//! Loans are grouped per book, each group behind its own mutex, so creating
//! loans for different books never waits on a shared write lock. Lock order:
//! `books` → `slots` → one slot mutex → `loan_index`.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc, Mutex, PoisonError, RwLock,
    },
};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookFilter, NewBook},
        loan::{Loan, NewLoan, ReturnOutcome},
    },
};

use super::{BookStore, DeleteOutcome, LoanStore, Page, PageRequest};

#[derive(Debug, Clone)]
struct StoredLoan {
    id: i64,
    customer: String,
    email: String,
    loan_date: NaiveDate,
    returned: Option<bool>,
}

impl StoredLoan {
    fn is_active(&self) -> bool {
        self.returned != Some(true)
    }

    fn with_book(&self, book: &Book) -> Loan {
        Loan {
            id: self.id,
            book: book.clone(),
            customer: self.customer.clone(),
            email: self.email.clone(),
            loan_date: self.loan_date,
            returned: self.returned,
        }
    }
}

type Slot = Arc<Mutex<Vec<StoredLoan>>>;

fn poisoned<T>(_: PoisonError<T>) -> AppError {
    AppError::Internal("in-memory store lock poisoned".to_string())
}

pub struct MemoryStore {
    books: RwLock<BTreeMap<i64, Book>>,
    slots: RwLock<HashMap<i64, Slot>>,
    loan_index: RwLock<HashMap<i64, i64>>,
    next_book_id: AtomicI64,
    next_loan_id: AtomicI64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            books: RwLock::new(BTreeMap::new()),
            slots: RwLock::new(HashMap::new()),
            loan_index: RwLock::new(HashMap::new()),
            next_book_id: AtomicI64::new(1),
            next_loan_id: AtomicI64::new(1),
        }
    }

    fn slot(&self, book_id: i64) -> AppResult<Option<Slot>> {
        Ok(self.slots.read().map_err(poisoned)?.get(&book_id).cloned())
    }

    fn slot_or_create(&self, book_id: i64) -> AppResult<Slot> {
        if let Some(slot) = self.slot(book_id)? {
            return Ok(slot);
        }
        let mut slots = self.slots.write().map_err(poisoned)?;
        Ok(slots.entry(book_id).or_default().clone())
    }

    /// Every loan joined with its book, ordered by loan id
    fn all_loans(&self, books: &BTreeMap<i64, Book>) -> AppResult<Vec<Loan>> {
        let slots: Vec<(i64, Slot)> = self
            .slots
            .read()
            .map_err(poisoned)?
            .iter()
            .map(|(book_id, slot)| (*book_id, slot.clone()))
            .collect();

        let mut loans = Vec::new();
        for (book_id, slot) in slots {
            let Some(book) = books.get(&book_id) else {
                continue;
            };
            let stored = slot.lock().map_err(poisoned)?;
            loans.extend(stored.iter().map(|l| l.with_book(book)));
        }
        loans.sort_by_key(|l| l.id);
        Ok(loans)
    }
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn exists_by_isbn(&self, isbn: &str) -> AppResult<bool> {
        let books = self.books.read().map_err(poisoned)?;
        Ok(books.values().any(|b| b.isbn == isbn))
    }

    async fn insert(&self, book: &NewBook) -> AppResult<Book> {
        let mut books = self.books.write().map_err(poisoned)?;
        if books.values().any(|b| b.isbn == book.isbn) {
            return Err(AppError::DuplicateIsbn(book.isbn.clone()));
        }
        let id = self.next_book_id.fetch_add(1, Ordering::SeqCst);
        let stored = Book {
            id,
            title: book.title.clone(),
            author: book.author.clone(),
            isbn: book.isbn.clone(),
        };
        books.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_by_id(&self, id: i64) -> AppResult<Option<Book>> {
        Ok(self.books.read().map_err(poisoned)?.get(&id).cloned())
    }

    async fn get_by_isbn(&self, isbn: &str) -> AppResult<Option<Book>> {
        let books = self.books.read().map_err(poisoned)?;
        Ok(books.values().find(|b| b.isbn == isbn).cloned())
    }

    async fn update(&self, id: i64, title: &str, author: &str) -> AppResult<Option<Book>> {
        let mut books = self.books.write().map_err(poisoned)?;
        Ok(books.get_mut(&id).map(|book| {
            book.title = title.to_string();
            book.author = author.to_string();
            book.clone()
        }))
    }

    async fn delete(&self, id: i64) -> AppResult<DeleteOutcome> {
        let mut books = self.books.write().map_err(poisoned)?;
        if !books.contains_key(&id) {
            return Ok(DeleteOutcome::NotFound);
        }

        if let Some(slot) = self.slot(id)? {
            let loans = slot.lock().map_err(poisoned)?;
            if loans.iter().any(StoredLoan::is_active) {
                return Ok(DeleteOutcome::HasActiveLoan);
            }
            // Returned loans go with the book.
            let mut index = self.loan_index.write().map_err(poisoned)?;
            for loan in loans.iter() {
                index.remove(&loan.id);
            }
            drop(index);
            drop(loans);
            self.slots.write().map_err(poisoned)?.remove(&id);
        }

        books.remove(&id);
        Ok(DeleteOutcome::Deleted)
    }

    async fn find(&self, filter: &BookFilter, page: PageRequest) -> AppResult<Page<Book>> {
        let books = self.books.read().map_err(poisoned)?;
        let matching: Vec<Book> = books.values().filter(|b| filter.matches(b)).cloned().collect();
        Ok(page.slice(matching))
    }
}

#[async_trait]
impl LoanStore for MemoryStore {
    async fn exists_active_for_book(&self, book_id: i64) -> AppResult<bool> {
        match self.slot(book_id)? {
            Some(slot) => Ok(slot.lock().map_err(poisoned)?.iter().any(StoredLoan::is_active)),
            None => Ok(false),
        }
    }

    async fn insert_if_no_active(&self, loan: &NewLoan) -> AppResult<Loan> {
        // Held for the whole insert so the book cannot be deleted underneath.
        let books = self.books.read().map_err(poisoned)?;
        let book = books
            .get(&loan.book_id)
            .ok_or_else(|| AppError::BookNotFound(format!("book {}", loan.book_id)))?;

        let slot = self.slot_or_create(loan.book_id)?;
        let mut loans = slot.lock().map_err(poisoned)?;
        if loans.iter().any(StoredLoan::is_active) {
            return Err(AppError::BookAlreadyLoaned(book.isbn.clone()));
        }

        let stored = StoredLoan {
            id: self.next_loan_id.fetch_add(1, Ordering::SeqCst),
            customer: loan.customer.clone(),
            email: loan.email.clone(),
            loan_date: loan.loan_date,
            returned: None,
        };
        loans.push(stored.clone());
        self.loan_index
            .write()
            .map_err(poisoned)?
            .insert(stored.id, loan.book_id);

        Ok(stored.with_book(book))
    }

    async fn get_by_id(&self, id: i64) -> AppResult<Option<Loan>> {
        let books = self.books.read().map_err(poisoned)?;
        let book_id = self.loan_index.read().map_err(poisoned)?.get(&id).copied();
        let (Some(book_id), Some(book)) = (book_id, book_id.and_then(|b| books.get(&b))) else {
            return Ok(None);
        };
        let Some(slot) = self.slot(book_id)? else {
            return Ok(None);
        };
        let loans = slot.lock().map_err(poisoned)?;
        Ok(loans.iter().find(|l| l.id == id).map(|l| l.with_book(book)))
    }

    async fn mark_returned(&self, id: i64, returned: bool) -> AppResult<ReturnOutcome> {
        let books = self.books.read().map_err(poisoned)?;
        let book_id = self.loan_index.read().map_err(poisoned)?.get(&id).copied();
        let (Some(book_id), Some(book)) = (book_id, book_id.and_then(|b| books.get(&b))) else {
            return Ok(ReturnOutcome::NotFound);
        };
        let Some(slot) = self.slot(book_id)? else {
            return Ok(ReturnOutcome::NotFound);
        };

        let mut loans = slot.lock().map_err(poisoned)?;
        let Some(stored) = loans.iter_mut().find(|l| l.id == id) else {
            return Ok(ReturnOutcome::NotFound);
        };
        if !stored.is_active() {
            return Ok(ReturnOutcome::AlreadyReturned);
        }
        stored.returned = Some(returned);
        Ok(ReturnOutcome::Updated(stored.with_book(book)))
    }

    async fn find_by_isbn_or_customer(
        &self,
        isbn: Option<&str>,
        customer: Option<&str>,
        page: PageRequest,
    ) -> AppResult<Page<Loan>> {
        let books = self.books.read().map_err(poisoned)?;
        let matching: Vec<Loan> = self
            .all_loans(&books)?
            .into_iter()
            .filter(|l| match (isbn, customer) {
                (None, None) => true,
                _ => {
                    isbn.map_or(false, |i| l.book.isbn == i)
                        || customer.map_or(false, |c| l.customer == c)
                }
            })
            .collect();
        Ok(page.slice(matching))
    }

    async fn find_by_book(&self, book_id: i64, page: PageRequest) -> AppResult<Page<Loan>> {
        let books = self.books.read().map_err(poisoned)?;
        let (Some(book), Some(slot)) = (books.get(&book_id), self.slot(book_id)?) else {
            return Ok(Page { items: Vec::new(), total: 0 });
        };
        let loans: Vec<Loan> = slot
            .lock()
            .map_err(poisoned)?
            .iter()
            .map(|l| l.with_book(book))
            .collect();
        Ok(page.slice(loans))
    }

    async fn find_active_loaned_before(&self, cutoff: NaiveDate) -> AppResult<Vec<Loan>> {
        let books = self.books.read().map_err(poisoned)?;
        Ok(self
            .all_loans(&books)?
            .into_iter()
            .filter(|l| l.is_active() && l.loan_date < cutoff)
            .collect())
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
