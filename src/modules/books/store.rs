//! In-memory book store.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;

use super::clock::{Clock, IdGenerator, SystemClock, UuidGenerator};
use super::models::{Book, BookDraft, BookSummary};

/// Store shared between request handlers.
pub type SharedBookStore = Arc<RwLock<BookStore>>;

/// Rejected payload for create or update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing name")]
    MissingName,

    #[error("readPage exceeds pageCount")]
    ReadPageExceedsPageCount,
}

/// No book with the requested id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("book not found")]
pub struct NotFound;

/// Update can fail on lookup or on the new values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UpdateError {
    #[error(transparent)]
    NotFound(#[from] NotFound),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Books in insertion order, searched linearly by id.
pub struct BookStore {
    books: Vec<Book>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl BookStore {
    pub fn new(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            books: Vec::new(),
            clock,
            ids,
        }
    }

    pub fn into_shared(self) -> SharedBookStore {
        Arc::new(RwLock::new(self))
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Validate, stamp, and append a new book. Returns its id.
    pub fn create(&mut self, draft: BookDraft) -> Result<String, ValidationError> {
        let name = validate(&draft)?;
        let finished = draft.is_finished();
        let id = self.fresh_id();
        let now = self.clock.now();

        let book = Book {
            id: id.clone(),
            name,
            year: draft.year,
            author: draft.author,
            summary: draft.summary,
            publisher: draft.publisher,
            page_count: draft.page_count,
            read_page: draft.read_page,
            finished,
            reading: draft.reading,
            inserted_at: now,
            updated_at: now,
        };
        self.books.push(book);

        tracing::info!(book_id = %id, total = self.books.len(), "book created");
        Ok(id)
    }

    pub fn list_summaries(&self) -> Vec<BookSummary> {
        self.books.iter().map(Book::summary).collect()
    }

    pub fn get(&self, id: &str) -> Result<&Book, NotFound> {
        self.books.iter().find(|book| book.id == id).ok_or(NotFound)
    }

    /// Replace everything but `id` and `inserted_at`.
    ///
    /// Existence is checked before the new values are validated.
    pub fn update(&mut self, id: &str, draft: BookDraft) -> Result<(), UpdateError> {
        let index = self.position(id)?;
        let name = validate(&draft)?;
        let now = self.clock.now();

        self.books[index].apply(name, draft, now);

        tracing::info!(book_id = %id, "book updated");
        Ok(())
    }

    /// Remove a book, keeping the rest in order. Returns the removed record.
    pub fn delete(&mut self, id: &str) -> Result<Book, NotFound> {
        let index = self.position(id)?;
        let removed = self.books.remove(index);

        tracing::info!(book_id = %id, total = self.books.len(), "book deleted");
        Ok(removed)
    }

    fn position(&self, id: &str) -> Result<usize, NotFound> {
        self.books
            .iter()
            .position(|book| book.id == id)
            .ok_or(NotFound)
    }

    fn fresh_id(&self) -> String {
        loop {
            let candidate = self.ids.next_id();
            if self.position(&candidate).is_err() {
                return candidate;
            }
            tracing::debug!(book_id = %candidate, "generated id already in use, drawing again");
        }
    }
}

impl Default for BookStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock), Arc::new(UuidGenerator))
    }
}

impl std::fmt::Debug for BookStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookStore")
            .field("books", &self.books)
            .finish_non_exhaustive()
    }
}

/// Name must be present and non-empty; `read_page` must not exceed `page_count`.
fn validate(draft: &BookDraft) -> Result<String, ValidationError> {
    let name = match draft.name.as_deref() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => return Err(ValidationError::MissingName),
    };

    if draft.read_page_exceeds_page_count() {
        return Err(ValidationError::ReadPageExceedsPageCount);
    }

    Ok(name)
}
