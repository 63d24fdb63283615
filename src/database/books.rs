use super::is_unique_violation;
use crate::models::{
    AdjustStockError, Book, BookAuthor, BookTitle, CreateBookError, CreateBookRequest,
    DeleteBookError, FindBookByIsbnError, FindBookError, Isbn, ListBooksError, PublicationYear,
    UpdateBookError, UpdateBookRequest,
};
use crate::repositories::BookRepository;
use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

#[derive(Debug, Clone)]
pub struct DefaultBookRepository {
    pool: SqlitePool,
}

impl DefaultBookRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn book_with_isbn(&self, isbn: &str) -> Result<Option<Book>, anyhow::Error> {
        let book = sqlx::query_as("SELECT * FROM book WHERE isbn = ?")
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| {
                anyhow!(err).context(format!(r#"Failed to look up book with ISBN "{isbn}""#))
            })?;

        Ok(book)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Book {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id = row.try_get("id")?;
        let title = row.try_get("title")?;
        let author = row.try_get("author")?;
        let year = row.try_get("year")?;
        let isbn = row.try_get("isbn")?;
        let stock = row.try_get("stock")?;
        let is_active = row.try_get("is_active")?;

        let title = BookTitle::new_unchecked(title);
        let author = BookAuthor::new_unchecked(author);
        let year = PublicationYear::new_unchecked(year);
        let isbn = Isbn::new_unchecked(isbn);
        Ok(Self::new(id, title, author, year, isbn, stock, is_active))
    }
}

#[async_trait]
impl BookRepository for DefaultBookRepository {
    async fn create_book(&self, req: &CreateBookRequest) -> Result<Book, CreateBookError> {
        // Uniqueness is checked against every row, soft-deleted ones
        // included. The UNIQUE constraint on the column backstops races.
        let existing = self
            .book_with_isbn(req.isbn().as_str())
            .await
            .map_err(CreateBookError::Other)?;
        if existing.is_some() {
            return Err(CreateBookError::DuplicateIsbn {
                isbn: req.isbn().to_string(),
            });
        }

        let book = sqlx::query_as(
            "INSERT INTO book (title, author, year, isbn, stock, is_active) \
             VALUES (?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(req.title().to_string())
        .bind(req.author().to_string())
        .bind(req.year().value())
        .bind(req.isbn().to_string())
        .bind(req.stock().value())
        .bind(req.is_active())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                CreateBookError::DuplicateIsbn {
                    isbn: req.isbn().to_string(),
                }
            } else {
                let err = anyhow!(err)
                    .context(format!(r#"Failed to create book "{}""#, req.title()));
                CreateBookError::Other(err)
            }
        })?;

        Ok(book)
    }

    async fn find_book(&self, id: i64) -> Result<Book, FindBookError> {
        let book = sqlx::query_as("SELECT * FROM book WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| {
                if matches!(err, sqlx::Error::RowNotFound) {
                    FindBookError::NotFound { id }
                } else {
                    let err =
                        anyhow!(err).context(format!(r#"Failed to retrieve book with id "{id}""#));
                    FindBookError::Other(err)
                }
            })?;

        Ok(book)
    }

    async fn find_book_by_isbn(&self, isbn: &str) -> Result<Book, FindBookByIsbnError> {
        let book = self
            .book_with_isbn(isbn)
            .await
            .map_err(FindBookByIsbnError::Other)?
            .ok_or_else(|| FindBookByIsbnError::NotFound { isbn: isbn.into() })?;

        Ok(book)
    }

    async fn find_all_books(&self) -> Result<Vec<Book>, ListBooksError> {
        let books =
            sqlx::query_as("SELECT * FROM book WHERE is_active = 1 ORDER BY title ASC")
                .fetch_all(&self.pool)
                .await
                .map_err(|err| {
                    let err = anyhow!(err).context("Failed to retrieve active books");
                    ListBooksError(err)
                })?;

        Ok(books)
    }

    async fn find_all_books_including_inactive(&self) -> Result<Vec<Book>, ListBooksError> {
        let books = sqlx::query_as("SELECT * FROM book ORDER BY title ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|err| {
                let err = anyhow!(err).context("Failed to retrieve all books");
                ListBooksError(err)
            })?;

        Ok(books)
    }

    async fn update_book(&self, req: &UpdateBookRequest) -> Result<Book, UpdateBookError> {
        let current = self.find_book(req.id()).await.map_err(|err| match err {
            FindBookError::NotFound { id } => UpdateBookError::NotFound { id },
            FindBookError::Other(err) => UpdateBookError::Other(err),
        })?;

        // A supplied ISBN must not belong to a different row. The row's
        // own ISBN may be re-submitted unchanged.
        if let Some(isbn) = req.isbn() {
            let holder = self
                .book_with_isbn(isbn.as_str())
                .await
                .map_err(UpdateBookError::Other)?;
            if let Some(holder) = holder {
                if holder.id() != req.id() {
                    return Err(UpdateBookError::DuplicateIsbn {
                        isbn: isbn.to_string(),
                    });
                }
            }
        }

        // Partial update: unsupplied fields keep their prior values.
        let title = req.title().unwrap_or(current.title());
        let author = req.author().unwrap_or(current.author());
        let year = req.year().unwrap_or(current.year());
        let isbn = req.isbn().unwrap_or(current.isbn());
        let stock = req.stock().map_or(current.stock(), |s| s.value());
        let is_active = req.is_active().unwrap_or(current.is_active());

        let book = sqlx::query_as(
            "UPDATE book SET title = ?, author = ?, year = ?, isbn = ?, stock = ?, \
             is_active = ? WHERE id = ? RETURNING *",
        )
        .bind(title.to_string())
        .bind(author.to_string())
        .bind(year.value())
        .bind(isbn.to_string())
        .bind(stock)
        .bind(is_active)
        .bind(req.id())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                UpdateBookError::DuplicateIsbn {
                    isbn: isbn.to_string(),
                }
            } else {
                let err = anyhow!(err)
                    .context(format!(r#"Failed to update book with id "{}""#, req.id()));
                UpdateBookError::Other(err)
            }
        })?;

        Ok(book)
    }

    async fn soft_delete_book(&self, id: i64) -> Result<Book, DeleteBookError> {
        let book = sqlx::query_as("UPDATE book SET is_active = 0 WHERE id = ? RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| {
                let err =
                    anyhow!(err).context(format!(r#"Failed to deactivate book with id "{id}""#));
                DeleteBookError::Other(err)
            })?
            .ok_or(DeleteBookError::NotFound { id })?;

        Ok(book)
    }

    async fn hard_delete_book(&self, id: i64) -> Result<Book, DeleteBookError> {
        let book = sqlx::query_as("DELETE FROM book WHERE id = ? RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| {
                let err = anyhow!(err).context(format!(r#"Failed to delete book with id "{id}""#));
                DeleteBookError::Other(err)
            })?
            .ok_or(DeleteBookError::NotFound { id })?;

        Ok(book)
    }

    async fn adjust_stock(&self, id: i64, delta: i64) -> Result<Book, AdjustStockError> {
        // Single conditional update: the non-negative floor is evaluated
        // by the storage engine, so concurrent adjustments cannot race the
        // counter below zero.
        let updated: Option<Book> = sqlx::query_as(
            "UPDATE book SET stock = stock + ?1 WHERE id = ?2 AND stock + ?1 >= 0 RETURNING *",
        )
        .bind(delta)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| {
            let err =
                anyhow!(err).context(format!(r#"Failed to adjust stock for book with id "{id}""#));
            AdjustStockError::Other(err)
        })?;

        if let Some(book) = updated {
            return Ok(book);
        }

        // Nothing matched: the row is either missing or the delta would
        // have crossed the floor.
        let current: Option<Book> = sqlx::query_as("SELECT * FROM book WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| {
                let err =
                    anyhow!(err).context(format!(r#"Failed to retrieve book with id "{id}""#));
                AdjustStockError::Other(err)
            })?;

        match current {
            Some(book) => Err(AdjustStockError::InsufficientStock {
                id,
                stock: book.stock(),
                delta,
            }),
            None => Err(AdjustStockError::NotFound { id }),
        }
    }

    async fn search_books_by_title(&self, title: &str) -> Result<Vec<Book>, ListBooksError> {
        let books = sqlx::query_as(
            "SELECT * FROM book WHERE title LIKE '%' || ? || '%' AND is_active = 1 \
             ORDER BY title ASC",
        )
        .bind(title)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| {
            let err = anyhow!(err).context(format!(r#"Failed to search books by title "{title}""#));
            ListBooksError(err)
        })?;

        Ok(books)
    }

    async fn search_books_by_author(&self, author: &str) -> Result<Vec<Book>, ListBooksError> {
        let books = sqlx::query_as(
            "SELECT * FROM book WHERE author LIKE '%' || ? || '%' AND is_active = 1 \
             ORDER BY author ASC",
        )
        .bind(author)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| {
            let err =
                anyhow!(err).context(format!(r#"Failed to search books by author "{author}""#));
            ListBooksError(err)
        })?;

        Ok(books)
    }

    async fn find_books_by_year(&self, year: i32) -> Result<Vec<Book>, ListBooksError> {
        let books = sqlx::query_as(
            "SELECT * FROM book WHERE year = ? AND is_active = 1 ORDER BY title ASC",
        )
        .bind(year)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| {
            let err = anyhow!(err).context(format!("Failed to retrieve books from year {year}"));
            ListBooksError(err)
        })?;

        Ok(books)
    }

    async fn find_low_stock_books(&self, threshold: i64) -> Result<Vec<Book>, ListBooksError> {
        let books = sqlx::query_as(
            "SELECT * FROM book WHERE stock < ? AND is_active = 1 ORDER BY stock ASC",
        )
        .bind(threshold)
        .fetch_all(&self.pool)
        .await
        .map_err(|err| {
            let err = anyhow!(err)
                .context(format!("Failed to retrieve books with stock below {threshold}"));
            ListBooksError(err)
        })?;

        Ok(books)
    }
}
