use crate::models::{
    AdjustStockError, Author, Book, CreateAuthorError, CreateAuthorRequest, CreateBookError,
    CreateBookRequest, DeleteAuthorError, DeleteBookError, FindAllAuthorsError, FindAuthorError,
    FindBookByIsbnError, FindBookError, ListBooksError, UpdateAuthorError, UpdateAuthorRequest,
    UpdateBookError, UpdateBookRequest,
};
use async_trait::async_trait;

#[async_trait]
pub trait AuthorRepository: Send + Sync + 'static {
    async fn create_author(&self, req: &CreateAuthorRequest) -> Result<Author, CreateAuthorError>;

    async fn find_author(&self, id: i64) -> Result<Author, FindAuthorError>;

    async fn find_all_authors(&self) -> Result<Vec<Author>, FindAllAuthorsError>;

    async fn update_author(&self, req: &UpdateAuthorRequest) -> Result<Author, UpdateAuthorError>;

    /// Physical deletion. Authors have no soft-delete path.
    async fn delete_author(&self, id: i64) -> Result<Author, DeleteAuthorError>;
}

#[async_trait]
pub trait BookRepository: Send + Sync + 'static {
    async fn create_book(&self, req: &CreateBookRequest) -> Result<Book, CreateBookError>;

    async fn find_book(&self, id: i64) -> Result<Book, FindBookError>;

    async fn find_book_by_isbn(&self, isbn: &str) -> Result<Book, FindBookByIsbnError>;

    /// Active books only, ordered by title ascending.
    async fn find_all_books(&self) -> Result<Vec<Book>, ListBooksError>;

    /// Every row, soft-deleted ones included, ordered by title ascending.
    async fn find_all_books_including_inactive(&self) -> Result<Vec<Book>, ListBooksError>;

    async fn update_book(&self, req: &UpdateBookRequest) -> Result<Book, UpdateBookError>;

    /// Soft delete: flips `is_active` to false and leaves every other
    /// field untouched. Re-validates existence on every call.
    async fn soft_delete_book(&self, id: i64) -> Result<Book, DeleteBookError>;

    /// Physical deletion. Terminal: later lookups by this id fail.
    async fn hard_delete_book(&self, id: i64) -> Result<Book, DeleteBookError>;

    /// Applies a signed delta to the stock counter. The floor check runs
    /// inside the storage engine, so the stock can never go negative even
    /// under concurrent adjustments.
    async fn adjust_stock(&self, id: i64, delta: i64) -> Result<Book, AdjustStockError>;

    async fn search_books_by_title(&self, title: &str) -> Result<Vec<Book>, ListBooksError>;

    async fn search_books_by_author(&self, author: &str) -> Result<Vec<Book>, ListBooksError>;

    async fn find_books_by_year(&self, year: i32) -> Result<Vec<Book>, ListBooksError>;

    async fn find_low_stock_books(&self, threshold: i64) -> Result<Vec<Book>, ListBooksError>;
}
