use crate::models::{
    AdjustStockError, Author, AuthorName, AuthorNameError, Book, BookAuthor, BookAuthorError,
    BookTitle, BookTitleError, Country, CountryError, CreateAuthorError, CreateAuthorRequest,
    CreateBookError, CreateBookRequest, DeleteAuthorError, DeleteBookError, FindAllAuthorsError,
    FindAuthorError, FindBookByIsbnError, FindBookError, Isbn, IsbnError, ListBooksError,
    PublicationYear, PublicationYearError, StockQuantity, StockQuantityError, UpdateAuthorError,
    UpdateAuthorRequest, UpdateBookError, UpdateBookRequest,
};
use crate::repositories::{AuthorRepository, BookRepository};
use crate::rpc::AppState;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    pub cmd: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RpcResponse {
    Ok { data: Value },
    Error { error: ErrorBody },
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub enum RpcError {
    NotFound(String),
    Conflict(String),
    Validation(String),
    Internal(String),
}

impl RpcError {
    /// Internal failures are masked on the wire; the cause is logged here.
    fn internal(cause: anyhow::Error, what: &str) -> Self {
        tracing::error!("{what}: {cause:#}");
        Self::Internal("Internal server error".to_string())
    }
}

impl From<RpcError> for RpcResponse {
    fn from(err: RpcError) -> Self {
        let (kind, message) = match err {
            RpcError::NotFound(message) => ("not_found", message),
            RpcError::Conflict(message) => ("conflict", message),
            RpcError::Validation(message) => ("validation", message),
            RpcError::Internal(message) => ("internal", message),
        };
        Self::Error {
            error: ErrorBody { kind, message },
        }
    }
}

impl From<CreateAuthorError> for RpcError {
    fn from(err: CreateAuthorError) -> Self {
        Self::internal(err.0, "Failed to create author")
    }
}

impl From<FindAuthorError> for RpcError {
    fn from(err: FindAuthorError) -> Self {
        match err {
            FindAuthorError::Other(cause) => Self::internal(cause, "Failed to find author"),
            err => Self::NotFound(err.to_string()),
        }
    }
}

impl From<FindAllAuthorsError> for RpcError {
    fn from(err: FindAllAuthorsError) -> Self {
        Self::internal(err.0, "Failed to list authors")
    }
}

impl From<UpdateAuthorError> for RpcError {
    fn from(err: UpdateAuthorError) -> Self {
        match err {
            UpdateAuthorError::Other(cause) => Self::internal(cause, "Failed to update author"),
            err => Self::NotFound(err.to_string()),
        }
    }
}

impl From<DeleteAuthorError> for RpcError {
    fn from(err: DeleteAuthorError) -> Self {
        match err {
            DeleteAuthorError::Other(cause) => Self::internal(cause, "Failed to delete author"),
            err => Self::NotFound(err.to_string()),
        }
    }
}

impl From<CreateBookError> for RpcError {
    fn from(err: CreateBookError) -> Self {
        match err {
            CreateBookError::Other(cause) => Self::internal(cause, "Failed to create book"),
            err => Self::Conflict(err.to_string()),
        }
    }
}

impl From<FindBookError> for RpcError {
    fn from(err: FindBookError) -> Self {
        match err {
            FindBookError::Other(cause) => Self::internal(cause, "Failed to find book"),
            err => Self::NotFound(err.to_string()),
        }
    }
}

impl From<FindBookByIsbnError> for RpcError {
    fn from(err: FindBookByIsbnError) -> Self {
        match err {
            FindBookByIsbnError::Other(cause) => {
                Self::internal(cause, "Failed to find book by ISBN")
            }
            err => Self::NotFound(err.to_string()),
        }
    }
}

impl From<ListBooksError> for RpcError {
    fn from(err: ListBooksError) -> Self {
        Self::internal(err.0, "Failed to list books")
    }
}

impl From<UpdateBookError> for RpcError {
    fn from(err: UpdateBookError) -> Self {
        match err {
            UpdateBookError::Other(cause) => Self::internal(cause, "Failed to update book"),
            err @ UpdateBookError::NotFound { .. } => Self::NotFound(err.to_string()),
            err @ UpdateBookError::DuplicateIsbn { .. } => Self::Conflict(err.to_string()),
        }
    }
}

impl From<DeleteBookError> for RpcError {
    fn from(err: DeleteBookError) -> Self {
        match err {
            DeleteBookError::Other(cause) => Self::internal(cause, "Failed to delete book"),
            err => Self::NotFound(err.to_string()),
        }
    }
}

impl From<AdjustStockError> for RpcError {
    fn from(err: AdjustStockError) -> Self {
        match err {
            AdjustStockError::Other(cause) => Self::internal(cause, "Failed to adjust stock"),
            err @ AdjustStockError::NotFound { .. } => Self::NotFound(err.to_string()),
            err @ AdjustStockError::InsufficientStock { .. } => Self::Validation(err.to_string()),
        }
    }
}

impl From<StockQuantityError> for RpcError {
    fn from(err: StockQuantityError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ParseCreateAuthorError {
    #[error(transparent)]
    Name(#[from] AuthorNameError),
    #[error(transparent)]
    Country(#[from] CountryError),
}

impl From<ParseCreateAuthorError> for RpcError {
    fn from(err: ParseCreateAuthorError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ParseUpdateAuthorError {
    #[error(transparent)]
    Name(#[from] AuthorNameError),
    #[error(transparent)]
    Country(#[from] CountryError),
}

impl From<ParseUpdateAuthorError> for RpcError {
    fn from(err: ParseUpdateAuthorError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ParseCreateBookError {
    #[error(transparent)]
    Title(#[from] BookTitleError),
    #[error(transparent)]
    Author(#[from] BookAuthorError),
    #[error(transparent)]
    Year(#[from] PublicationYearError),
    #[error(transparent)]
    Isbn(#[from] IsbnError),
    #[error("Stock must be greater than 0")]
    Stock,
}

impl From<ParseCreateBookError> for RpcError {
    fn from(err: ParseCreateBookError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ParseUpdateBookError {
    #[error(transparent)]
    Title(#[from] BookTitleError),
    #[error(transparent)]
    Author(#[from] BookAuthorError),
    #[error(transparent)]
    Year(#[from] PublicationYearError),
    #[error(transparent)]
    Isbn(#[from] IsbnError),
    #[error("Stock must be greater than 0")]
    Stock,
}

impl From<ParseUpdateBookError> for RpcError {
    fn from(err: ParseUpdateBookError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[derive(Debug, Deserialize)]
pub struct IdPayload {
    id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAuthorBody {
    name: String,
    country: String,
    is_active: Option<bool>,
}

impl TryFrom<CreateAuthorBody> for CreateAuthorRequest {
    type Error = ParseCreateAuthorError;

    fn try_from(body: CreateAuthorBody) -> Result<Self, Self::Error> {
        let name = AuthorName::new(&body.name)?;
        let country = Country::new(&body.country)?;
        Ok(Self::new(name, country, body.is_active.unwrap_or(true)))
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateAuthorPayload {
    id: i64,
    data: UpdateAuthorBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAuthorBody {
    name: Option<String>,
    country: Option<String>,
    is_active: Option<bool>,
}

impl TryFrom<UpdateAuthorPayload> for UpdateAuthorRequest {
    type Error = ParseUpdateAuthorError;

    fn try_from(payload: UpdateAuthorPayload) -> Result<Self, Self::Error> {
        let mut req = Self::new(payload.id);
        if let Some(name) = payload.data.name {
            req.set_name(AuthorName::new(&name)?);
        }
        if let Some(country) = payload.data.country {
            req.set_country(Country::new(&country)?);
        }
        if let Some(is_active) = payload.data.is_active {
            req.set_is_active(is_active);
        }
        Ok(req)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookBody {
    title: String,
    author: String,
    year: i32,
    isbn: String,
    stock: i64,
    is_active: Option<bool>,
}

impl TryFrom<CreateBookBody> for CreateBookRequest {
    type Error = ParseCreateBookError;

    fn try_from(body: CreateBookBody) -> Result<Self, Self::Error> {
        let title = BookTitle::new(&body.title)?;
        let author = BookAuthor::new(&body.author)?;
        let year = PublicationYear::new(body.year)?;
        let isbn = Isbn::new(&body.isbn)?;
        let stock = StockQuantity::new(body.stock).map_err(|_| ParseCreateBookError::Stock)?;
        Ok(Self::new(
            title,
            author,
            year,
            isbn,
            stock,
            body.is_active.unwrap_or(true),
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateBookPayload {
    id: i64,
    data: UpdateBookBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookBody {
    title: Option<String>,
    author: Option<String>,
    year: Option<i32>,
    isbn: Option<String>,
    stock: Option<i64>,
    is_active: Option<bool>,
}

impl TryFrom<UpdateBookPayload> for UpdateBookRequest {
    type Error = ParseUpdateBookError;

    fn try_from(payload: UpdateBookPayload) -> Result<Self, Self::Error> {
        let mut req = Self::new(payload.id);
        if let Some(title) = payload.data.title {
            req.set_title(BookTitle::new(&title)?);
        }
        if let Some(author) = payload.data.author {
            req.set_author(BookAuthor::new(&author)?);
        }
        if let Some(year) = payload.data.year {
            req.set_year(PublicationYear::new(year)?);
        }
        if let Some(isbn) = payload.data.isbn {
            req.set_isbn(Isbn::new(&isbn)?);
        }
        if let Some(stock) = payload.data.stock {
            req.set_stock(StockQuantity::new(stock).map_err(|_| ParseUpdateBookError::Stock)?);
        }
        if let Some(is_active) = payload.data.is_active {
            req.set_is_active(is_active);
        }
        Ok(req)
    }
}

#[derive(Debug, Deserialize)]
pub struct StockPayload {
    id: i64,
    quantity: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorResponse {
    id: i64,
    name: String,
    country: String,
    is_active: bool,
}

impl From<Author> for AuthorResponse {
    fn from(author: Author) -> Self {
        Self {
            id: author.id(),
            name: author.name().to_string(),
            country: author.country().to_string(),
            is_active: author.is_active(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookResponse {
    id: i64,
    title: String,
    author: String,
    year: i32,
    isbn: String,
    stock: i64,
    is_active: bool,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.id(),
            title: book.title().to_string(),
            author: book.author().to_string(),
            year: book.year().value(),
            isbn: book.isbn().to_string(),
            stock: book.stock(),
            is_active: book.is_active(),
        }
    }
}

/// Parses one wire frame and dispatches it. Malformed frames are reported
/// as validation errors rather than dropping the connection.
pub async fn handle_frame<AR: AuthorRepository, BR: BookRepository>(
    state: &AppState<AR, BR>,
    line: &str,
) -> RpcResponse {
    let request: RpcRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(err) => {
            return RpcError::Validation(format!("Malformed request frame: {err}")).into();
        }
    };

    dispatch(state, request).await
}

/// Routes a named command to its handler and wraps the outcome in the
/// response envelope.
pub async fn dispatch<AR: AuthorRepository, BR: BookRepository>(
    state: &AppState<AR, BR>,
    request: RpcRequest,
) -> RpcResponse {
    tracing::debug!(cmd = %request.cmd, "dispatching command");

    let result = match request.cmd.as_str() {
        "authors.findall" => find_all_authors(state).await,
        "authors.findone" => find_one_author(state, request.payload).await,
        "authors.create" => create_author(state, request.payload).await,
        "authors.update" => update_author(state, request.payload).await,
        "authors.delete" => delete_author(state, request.payload).await,
        "createBook" => create_book(state, request.payload).await,
        "findAllBooks" => find_all_books(state).await,
        "findAllBooksIncludingInactive" => find_all_books_including_inactive(state).await,
        "findOneBook" => find_one_book(state, request.payload).await,
        "findBookByISBN" => find_book_by_isbn(state, request.payload).await,
        "updateBook" => update_book(state, request.payload).await,
        "removeBook" => remove_book(state, request.payload).await,
        "hardDeleteBook" => hard_delete_book(state, request.payload).await,
        "updateBookStock" => update_book_stock(state, request.payload).await,
        "incrementBookStock" => increment_book_stock(state, request.payload).await,
        "decrementBookStock" => decrement_book_stock(state, request.payload).await,
        "searchBooksByTitle" => search_books_by_title(state, request.payload).await,
        "searchBooksByAuthor" => search_books_by_author(state, request.payload).await,
        "getBooksByYear" => get_books_by_year(state, request.payload).await,
        "getLowStockBooks" => get_low_stock_books(state, request.payload).await,
        other => Err(RpcError::Validation(format!(
            "No handler for command \"{other}\""
        ))),
    };

    match result {
        Ok(data) => RpcResponse::Ok { data },
        Err(err) => err.into(),
    }
}

fn parse_payload<T: serde::de::DeserializeOwned>(payload: Value) -> Result<T, RpcError> {
    serde_json::from_value(payload).map_err(|err| RpcError::Validation(format!("Invalid payload: {err}")))
}

fn to_data<T: Serialize>(value: T) -> Result<Value, RpcError> {
    serde_json::to_value(value)
        .map_err(|err| RpcError::internal(anyhow::anyhow!(err), "Failed to serialize response"))
}

fn books_to_data(books: Vec<Book>) -> Result<Value, RpcError> {
    to_data(books.into_iter().map(BookResponse::from).collect::<Vec<_>>())
}

async fn find_all_authors<AR: AuthorRepository, BR: BookRepository>(
    state: &AppState<AR, BR>,
) -> Result<Value, RpcError> {
    let authors = state.author_repo.find_all_authors().await?;
    to_data(
        authors
            .into_iter()
            .map(AuthorResponse::from)
            .collect::<Vec<_>>(),
    )
}

async fn find_one_author<AR: AuthorRepository, BR: BookRepository>(
    state: &AppState<AR, BR>,
    payload: Value,
) -> Result<Value, RpcError> {
    let IdPayload { id } = parse_payload(payload)?;
    let author = state.author_repo.find_author(id).await?;
    to_data(AuthorResponse::from(author))
}

async fn create_author<AR: AuthorRepository, BR: BookRepository>(
    state: &AppState<AR, BR>,
    payload: Value,
) -> Result<Value, RpcError> {
    let body: CreateAuthorBody = parse_payload(payload)?;
    let req = CreateAuthorRequest::try_from(body)?;
    let author = state.author_repo.create_author(&req).await?;
    to_data(AuthorResponse::from(author))
}

async fn update_author<AR: AuthorRepository, BR: BookRepository>(
    state: &AppState<AR, BR>,
    payload: Value,
) -> Result<Value, RpcError> {
    let body: UpdateAuthorPayload = parse_payload(payload)?;
    let req = UpdateAuthorRequest::try_from(body)?;
    let author = state.author_repo.update_author(&req).await?;
    to_data(AuthorResponse::from(author))
}

async fn delete_author<AR: AuthorRepository, BR: BookRepository>(
    state: &AppState<AR, BR>,
    payload: Value,
) -> Result<Value, RpcError> {
    let IdPayload { id } = parse_payload(payload)?;
    let author = state.author_repo.delete_author(id).await?;
    to_data(AuthorResponse::from(author))
}

async fn create_book<AR: AuthorRepository, BR: BookRepository>(
    state: &AppState<AR, BR>,
    payload: Value,
) -> Result<Value, RpcError> {
    let body: CreateBookBody = parse_payload(payload)?;
    let req = CreateBookRequest::try_from(body)?;
    let book = state.book_repo.create_book(&req).await?;
    to_data(BookResponse::from(book))
}

async fn find_all_books<AR: AuthorRepository, BR: BookRepository>(
    state: &AppState<AR, BR>,
) -> Result<Value, RpcError> {
    let books = state.book_repo.find_all_books().await?;
    books_to_data(books)
}

async fn find_all_books_including_inactive<AR: AuthorRepository, BR: BookRepository>(
    state: &AppState<AR, BR>,
) -> Result<Value, RpcError> {
    let books = state.book_repo.find_all_books_including_inactive().await?;
    books_to_data(books)
}

async fn find_one_book<AR: AuthorRepository, BR: BookRepository>(
    state: &AppState<AR, BR>,
    payload: Value,
) -> Result<Value, RpcError> {
    let id: i64 = parse_payload(payload)?;
    let book = state.book_repo.find_book(id).await?;
    to_data(BookResponse::from(book))
}

async fn find_book_by_isbn<AR: AuthorRepository, BR: BookRepository>(
    state: &AppState<AR, BR>,
    payload: Value,
) -> Result<Value, RpcError> {
    let isbn: String = parse_payload(payload)?;
    let book = state.book_repo.find_book_by_isbn(&isbn).await?;
    to_data(BookResponse::from(book))
}

async fn update_book<AR: AuthorRepository, BR: BookRepository>(
    state: &AppState<AR, BR>,
    payload: Value,
) -> Result<Value, RpcError> {
    let body: UpdateBookPayload = parse_payload(payload)?;
    let req = UpdateBookRequest::try_from(body)?;
    let book = state.book_repo.update_book(&req).await?;
    to_data(BookResponse::from(book))
}

async fn remove_book<AR: AuthorRepository, BR: BookRepository>(
    state: &AppState<AR, BR>,
    payload: Value,
) -> Result<Value, RpcError> {
    let id: i64 = parse_payload(payload)?;
    let book = state.book_repo.soft_delete_book(id).await?;
    to_data(BookResponse::from(book))
}

async fn hard_delete_book<AR: AuthorRepository, BR: BookRepository>(
    state: &AppState<AR, BR>,
    payload: Value,
) -> Result<Value, RpcError> {
    let id: i64 = parse_payload(payload)?;
    let book = state.book_repo.hard_delete_book(id).await?;
    to_data(BookResponse::from(book))
}

async fn update_book_stock<AR: AuthorRepository, BR: BookRepository>(
    state: &AppState<AR, BR>,
    payload: Value,
) -> Result<Value, RpcError> {
    let StockPayload { id, quantity } = parse_payload(payload)?;
    let book = state.book_repo.adjust_stock(id, quantity).await?;
    to_data(BookResponse::from(book))
}

async fn increment_book_stock<AR: AuthorRepository, BR: BookRepository>(
    state: &AppState<AR, BR>,
    payload: Value,
) -> Result<Value, RpcError> {
    let StockPayload { id, quantity } = parse_payload(payload)?;
    let quantity = StockQuantity::new(quantity)?;
    let book = state.book_repo.adjust_stock(id, quantity.value()).await?;
    to_data(BookResponse::from(book))
}

async fn decrement_book_stock<AR: AuthorRepository, BR: BookRepository>(
    state: &AppState<AR, BR>,
    payload: Value,
) -> Result<Value, RpcError> {
    let StockPayload { id, quantity } = parse_payload(payload)?;
    // The quantity is a magnitude: validated positive, then negated.
    let quantity = StockQuantity::new(quantity)?;
    let book = state.book_repo.adjust_stock(id, -quantity.value()).await?;
    to_data(BookResponse::from(book))
}

async fn search_books_by_title<AR: AuthorRepository, BR: BookRepository>(
    state: &AppState<AR, BR>,
    payload: Value,
) -> Result<Value, RpcError> {
    let title: String = parse_payload(payload)?;
    let books = state.book_repo.search_books_by_title(&title).await?;
    books_to_data(books)
}

async fn search_books_by_author<AR: AuthorRepository, BR: BookRepository>(
    state: &AppState<AR, BR>,
    payload: Value,
) -> Result<Value, RpcError> {
    let author: String = parse_payload(payload)?;
    let books = state.book_repo.search_books_by_author(&author).await?;
    books_to_data(books)
}

async fn get_books_by_year<AR: AuthorRepository, BR: BookRepository>(
    state: &AppState<AR, BR>,
    payload: Value,
) -> Result<Value, RpcError> {
    let year: i32 = parse_payload(payload)?;
    let books = state.book_repo.find_books_by_year(year).await?;
    books_to_data(books)
}

async fn get_low_stock_books<AR: AuthorRepository, BR: BookRepository>(
    state: &AppState<AR, BR>,
    payload: Value,
) -> Result<Value, RpcError> {
    let threshold: Option<i64> = parse_payload(payload)?;
    let books = state
        .book_repo
        .find_low_stock_books(threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD))
        .await?;
    books_to_data(books)
}
