//! HTTP handlers for the books module.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use bookshelf_http::{ApiResponse, AppError, AppResult};

use super::models::{Book, BookDraft, BookSummary};
use super::store::{NotFound, SharedBookStore, UpdateError, ValidationError};

const ADDED: &str = "Buku berhasil ditambahkan";
const UPDATED: &str = "Buku berhasil diperbarui";
const DELETED: &str = "Buku berhasil dihapus";

const INVALID_NAME: &str = "Mohon isi nama buku";
const INVALID_READ_PAGE: &str = "readPage tidak boleh lebih besar dari pageCount";
const MISSING_BOOK: &str = "Buku tidak ditemukan";

fn invalid_reason(err: ValidationError) -> &'static str {
    match err {
        ValidationError::MissingName => INVALID_NAME,
        ValidationError::ReadPageExceedsPageCount => INVALID_READ_PAGE,
    }
}

fn add_failure(err: ValidationError) -> AppError {
    AppError::validation(format!("Gagal menambahkan buku. {}", invalid_reason(err)))
}

fn lookup_failure(_: NotFound) -> AppError {
    AppError::not_found(MISSING_BOOK)
}

fn update_failure(err: UpdateError) -> AppError {
    match err {
        UpdateError::NotFound(NotFound) => {
            AppError::not_found(format!("Gagal memperbarui buku. {MISSING_BOOK}"))
        }
        UpdateError::Invalid(err) => {
            AppError::validation(format!("Gagal memperbarui buku. {}", invalid_reason(err)))
        }
    }
}

fn delete_failure(_: NotFound) -> AppError {
    AppError::not_found(format!("Buku gagal dihapus. {MISSING_BOOK}"))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedBook {
    pub book_id: String,
}

#[derive(Debug, Serialize)]
pub struct BookList {
    pub books: Vec<BookSummary>,
}

#[derive(Debug, Serialize)]
pub struct BookDetail {
    pub book: Book,
}

/// Routes relative to the module mount point.
pub fn router(store: SharedBookStore) -> Router {
    Router::new()
        .route("/", get(list_books).post(add_book))
        .route(
            "/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(store)
}

async fn add_book(
    State(store): State<SharedBookStore>,
    payload: Result<Json<BookDraft>, JsonRejection>,
) -> AppResult<ApiResponse<CreatedBook>> {
    let Json(draft) = payload?;

    let book_id = store
        .write()
        .await
        .create(draft)
        .map_err(add_failure)?;

    Ok(ApiResponse::created(CreatedBook { book_id }).with_message(ADDED))
}

async fn list_books(State(store): State<SharedBookStore>) -> ApiResponse<BookList> {
    let books = store.read().await.list_summaries();
    tracing::debug!(count = books.len(), "listing books");
    ApiResponse::ok(BookList { books })
}

async fn get_book(
    State(store): State<SharedBookStore>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<BookDetail>> {
    let book = store
        .read()
        .await
        .get(&id)
        .cloned()
        .map_err(lookup_failure)?;

    Ok(ApiResponse::ok(BookDetail { book }))
}

async fn update_book(
    State(store): State<SharedBookStore>,
    Path(id): Path<String>,
    payload: Result<Json<BookDraft>, JsonRejection>,
) -> AppResult<ApiResponse<()>> {
    let Json(draft) = payload?;

    store
        .write()
        .await
        .update(&id, draft)
        .map_err(update_failure)?;

    Ok(ApiResponse::message(UPDATED))
}

async fn delete_book(
    State(store): State<SharedBookStore>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    store
        .write()
        .await
        .delete(&id)
        .map_err(delete_failure)?;

    Ok(ApiResponse::message(DELETED))
}
