use chrono::Datelike;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

const AUTHOR_NAME_MIN: usize = 2;
const AUTHOR_NAME_MAX: usize = 100;
const COUNTRY_MIN: usize = 2;
const COUNTRY_MAX: usize = 50;
const TEXT_FIELD_MAX: usize = 255;

#[derive(Debug, Clone)]
pub struct AuthorName(String);

impl AuthorName {
    pub fn new(raw: &str) -> Result<Self, AuthorNameError> {
        let trimmed = raw.trim();
        let len = trimmed.chars().count();
        if (AUTHOR_NAME_MIN..=AUTHOR_NAME_MAX).contains(&len) {
            Ok(Self(trimmed.into()))
        } else {
            Err(AuthorNameError)
        }
    }

    pub fn new_unchecked(raw: &str) -> Self {
        Self(raw.into())
    }
}

impl std::fmt::Display for AuthorName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug)]
#[error("Author name must be between {AUTHOR_NAME_MIN} and {AUTHOR_NAME_MAX} characters")]
pub struct AuthorNameError;

#[derive(Debug, Clone)]
pub struct Country(String);

impl Country {
    pub fn new(raw: &str) -> Result<Self, CountryError> {
        let trimmed = raw.trim();
        let len = trimmed.chars().count();
        if (COUNTRY_MIN..=COUNTRY_MAX).contains(&len) {
            Ok(Self(trimmed.into()))
        } else {
            Err(CountryError)
        }
    }

    pub fn new_unchecked(raw: &str) -> Self {
        Self(raw.into())
    }
}

impl std::fmt::Display for Country {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug)]
#[error("Country must be between {COUNTRY_MIN} and {COUNTRY_MAX} characters")]
pub struct CountryError;

#[derive(Debug, Clone)]
pub struct BookTitle(String);

impl BookTitle {
    pub fn new(raw: &str) -> Result<Self, BookTitleError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Err(BookTitleError::Empty)
        } else if trimmed.chars().count() > TEXT_FIELD_MAX {
            Err(BookTitleError::TooLong)
        } else {
            Ok(Self(trimmed.into()))
        }
    }

    pub fn new_unchecked(raw: &str) -> Self {
        Self(raw.into())
    }
}

impl std::fmt::Display for BookTitle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug)]
pub enum BookTitleError {
    #[error("Title cannot be empty")]
    Empty,
    #[error("Title cannot exceed {TEXT_FIELD_MAX} characters")]
    TooLong,
}

/// Free-text author attribution on a book. Not a reference into the
/// author directory.
#[derive(Debug, Clone)]
pub struct BookAuthor(String);

impl BookAuthor {
    pub fn new(raw: &str) -> Result<Self, BookAuthorError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Err(BookAuthorError::Empty)
        } else if trimmed.chars().count() > TEXT_FIELD_MAX {
            Err(BookAuthorError::TooLong)
        } else {
            Ok(Self(trimmed.into()))
        }
    }

    pub fn new_unchecked(raw: &str) -> Self {
        Self(raw.into())
    }
}

impl std::fmt::Display for BookAuthor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug)]
pub enum BookAuthorError {
    #[error("Author cannot be empty")]
    Empty,
    #[error("Author cannot exceed {TEXT_FIELD_MAX} characters")]
    TooLong,
}

/// A valid ISBN-10 or ISBN-13, stored as supplied. Hyphens and spaces are
/// ignored for validation but preserved in the stored value.
#[derive(Debug, Clone)]
pub struct Isbn(String);

impl Isbn {
    pub fn new(raw: &str) -> Result<Self, IsbnError> {
        let trimmed = raw.trim();
        if Self::is_valid(trimmed) {
            Ok(Self(trimmed.into()))
        } else {
            Err(IsbnError(trimmed.into()))
        }
    }

    pub fn new_unchecked(raw: &str) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_valid(s: &str) -> bool {
        static ISBN10: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"^[0-9]{9}[0-9Xx]$").unwrap());
        static ISBN13: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{13}$").unwrap());

        let digits: String = s.chars().filter(|c| *c != '-' && *c != ' ').collect();
        if ISBN10.is_match(&digits) {
            is_valid_isbn10(&digits)
        } else if ISBN13.is_match(&digits) {
            is_valid_isbn13(&digits)
        } else {
            false
        }
    }
}

fn is_valid_isbn10(digits: &str) -> bool {
    let sum: u32 = digits
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let value = if c == 'X' || c == 'x' {
                10
            } else {
                c.to_digit(10).unwrap_or(0)
            };
            (10 - i as u32) * value
        })
        .sum();
    sum % 11 == 0
}

fn is_valid_isbn13(digits: &str) -> bool {
    let sum: u32 = digits
        .chars()
        .enumerate()
        .map(|(i, c)| {
            let weight = if i % 2 == 0 { 1 } else { 3 };
            weight * c.to_digit(10).unwrap_or(0)
        })
        .sum();
    sum % 10 == 0
}

impl std::fmt::Display for Isbn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug)]
#[error("\"{0}\" is not a valid ISBN-10 or ISBN-13")]
pub struct IsbnError(String);

/// Publication year, bounded below by 0 and above by the current year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicationYear(i32);

impl PublicationYear {
    pub fn new(year: i32) -> Result<Self, PublicationYearError> {
        let max = chrono::Utc::now().year();
        if year < 0 {
            Err(PublicationYearError::Negative)
        } else if year > max {
            Err(PublicationYearError::Future { max })
        } else {
            Ok(Self(year))
        }
    }

    pub const fn new_unchecked(year: i32) -> Self {
        Self(year)
    }

    pub const fn value(self) -> i32 {
        self.0
    }
}

#[derive(Error, Debug)]
pub enum PublicationYearError {
    #[error("Year cannot be negative")]
    Negative,
    #[error("Year cannot be later than {max}")]
    Future { max: i32 },
}

/// A strictly positive amount of stock: the initial stock of a new book,
/// a replacement stock level, or the magnitude of an increment/decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockQuantity(i64);

impl StockQuantity {
    pub fn new(quantity: i64) -> Result<Self, StockQuantityError> {
        if quantity > 0 {
            Ok(Self(quantity))
        } else {
            Err(StockQuantityError)
        }
    }

    pub const fn value(self) -> i64 {
        self.0
    }
}

#[derive(Error, Debug)]
#[error("Quantity must be greater than 0")]
pub struct StockQuantityError;

#[derive(Debug, Clone)]
pub struct Author {
    id: i64,
    name: AuthorName,
    country: Country,
    is_active: bool,
}

impl Author {
    pub const fn new(id: i64, name: AuthorName, country: Country, is_active: bool) -> Self {
        Self {
            id,
            name,
            country,
            is_active,
        }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }

    pub const fn name(&self) -> &AuthorName {
        &self.name
    }

    pub const fn country(&self) -> &Country {
        &self.country
    }

    pub const fn is_active(&self) -> bool {
        self.is_active
    }
}

#[derive(Debug, Clone)]
pub struct Book {
    id: i64,
    title: BookTitle,
    author: BookAuthor,
    year: PublicationYear,
    isbn: Isbn,
    stock: i64,
    is_active: bool,
}

impl Book {
    pub const fn new(
        id: i64,
        title: BookTitle,
        author: BookAuthor,
        year: PublicationYear,
        isbn: Isbn,
        stock: i64,
        is_active: bool,
    ) -> Self {
        Self {
            id,
            title,
            author,
            year,
            isbn,
            stock,
            is_active,
        }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }

    pub const fn title(&self) -> &BookTitle {
        &self.title
    }

    pub const fn author(&self) -> &BookAuthor {
        &self.author
    }

    pub const fn year(&self) -> PublicationYear {
        self.year
    }

    pub const fn isbn(&self) -> &Isbn {
        &self.isbn
    }

    pub const fn stock(&self) -> i64 {
        self.stock
    }

    pub const fn is_active(&self) -> bool {
        self.is_active
    }
}

#[derive(Debug)]
pub struct CreateAuthorRequest {
    name: AuthorName,
    country: Country,
    is_active: bool,
}

impl CreateAuthorRequest {
    pub const fn new(name: AuthorName, country: Country, is_active: bool) -> Self {
        Self {
            name,
            country,
            is_active,
        }
    }

    pub const fn name(&self) -> &AuthorName {
        &self.name
    }

    pub const fn country(&self) -> &Country {
        &self.country
    }

    pub const fn is_active(&self) -> bool {
        self.is_active
    }
}

#[derive(Error, Debug)]
#[error(transparent)]
pub struct CreateAuthorError(#[from] pub anyhow::Error);

#[derive(Error, Debug)]
pub enum FindAuthorError {
    #[error("Author with id \"{id}\" does not exist")]
    NotFound { id: i64 },
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Error, Debug)]
#[error(transparent)]
pub struct FindAllAuthorsError(#[from] pub anyhow::Error);

#[derive(Debug)]
pub struct UpdateAuthorRequest {
    id: i64,
    name: Option<AuthorName>,
    country: Option<Country>,
    is_active: Option<bool>,
}

impl UpdateAuthorRequest {
    pub const fn new(id: i64) -> Self {
        Self {
            id,
            name: None,
            country: None,
            is_active: None,
        }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }

    pub const fn name(&self) -> Option<&AuthorName> {
        self.name.as_ref()
    }

    pub fn set_name(&mut self, name: AuthorName) {
        self.name = Some(name);
    }

    pub const fn country(&self) -> Option<&Country> {
        self.country.as_ref()
    }

    pub fn set_country(&mut self, country: Country) {
        self.country = Some(country);
    }

    pub const fn is_active(&self) -> Option<bool> {
        self.is_active
    }

    pub fn set_is_active(&mut self, is_active: bool) {
        self.is_active = Some(is_active);
    }
}

#[derive(Error, Debug)]
pub enum UpdateAuthorError {
    #[error("Author with id \"{id}\" does not exist")]
    NotFound { id: i64 },
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Error, Debug)]
pub enum DeleteAuthorError {
    #[error("Author with id \"{id}\" does not exist")]
    NotFound { id: i64 },
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Debug)]
pub struct CreateBookRequest {
    title: BookTitle,
    author: BookAuthor,
    year: PublicationYear,
    isbn: Isbn,
    stock: StockQuantity,
    is_active: bool,
}

impl CreateBookRequest {
    pub const fn new(
        title: BookTitle,
        author: BookAuthor,
        year: PublicationYear,
        isbn: Isbn,
        stock: StockQuantity,
        is_active: bool,
    ) -> Self {
        Self {
            title,
            author,
            year,
            isbn,
            stock,
            is_active,
        }
    }

    pub const fn title(&self) -> &BookTitle {
        &self.title
    }

    pub const fn author(&self) -> &BookAuthor {
        &self.author
    }

    pub const fn year(&self) -> PublicationYear {
        self.year
    }

    pub const fn isbn(&self) -> &Isbn {
        &self.isbn
    }

    pub const fn stock(&self) -> StockQuantity {
        self.stock
    }

    pub const fn is_active(&self) -> bool {
        self.is_active
    }
}

#[derive(Error, Debug)]
pub enum CreateBookError {
    #[error("Book with ISBN \"{isbn}\" already exists")]
    DuplicateIsbn { isbn: String },
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Error, Debug)]
pub enum FindBookError {
    #[error("Book with id \"{id}\" does not exist")]
    NotFound { id: i64 },
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Error, Debug)]
pub enum FindBookByIsbnError {
    #[error("Book with ISBN \"{isbn}\" does not exist")]
    NotFound { isbn: String },
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Error, Debug)]
#[error(transparent)]
pub struct ListBooksError(#[from] pub anyhow::Error);

#[derive(Debug)]
pub struct UpdateBookRequest {
    id: i64,
    title: Option<BookTitle>,
    author: Option<BookAuthor>,
    year: Option<PublicationYear>,
    isbn: Option<Isbn>,
    stock: Option<StockQuantity>,
    is_active: Option<bool>,
}

impl UpdateBookRequest {
    pub const fn new(id: i64) -> Self {
        Self {
            id,
            title: None,
            author: None,
            year: None,
            isbn: None,
            stock: None,
            is_active: None,
        }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }

    pub const fn title(&self) -> Option<&BookTitle> {
        self.title.as_ref()
    }

    pub fn set_title(&mut self, title: BookTitle) {
        self.title = Some(title);
    }

    pub const fn author(&self) -> Option<&BookAuthor> {
        self.author.as_ref()
    }

    pub fn set_author(&mut self, author: BookAuthor) {
        self.author = Some(author);
    }

    pub const fn year(&self) -> Option<PublicationYear> {
        self.year
    }

    pub fn set_year(&mut self, year: PublicationYear) {
        self.year = Some(year);
    }

    pub const fn isbn(&self) -> Option<&Isbn> {
        self.isbn.as_ref()
    }

    pub fn set_isbn(&mut self, isbn: Isbn) {
        self.isbn = Some(isbn);
    }

    pub const fn stock(&self) -> Option<StockQuantity> {
        self.stock
    }

    pub fn set_stock(&mut self, stock: StockQuantity) {
        self.stock = Some(stock);
    }

    pub const fn is_active(&self) -> Option<bool> {
        self.is_active
    }

    pub fn set_is_active(&mut self, is_active: bool) {
        self.is_active = Some(is_active);
    }
}

#[derive(Error, Debug)]
pub enum UpdateBookError {
    #[error("Book with id \"{id}\" does not exist")]
    NotFound { id: i64 },
    #[error("Another book with ISBN \"{isbn}\" already exists")]
    DuplicateIsbn { isbn: String },
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Error, Debug)]
pub enum DeleteBookError {
    #[error("Book with id \"{id}\" does not exist")]
    NotFound { id: i64 },
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Error, Debug)]
pub enum AdjustStockError {
    #[error("Book with id \"{id}\" does not exist")]
    NotFound { id: i64 },
    #[error("Insufficient stock for book {id}: current stock {stock}, requested change {delta}")]
    InsufficientStock { id: i64, stock: i64, delta: i64 },
    #[error(transparent)]
    Other(anyhow::Error),
}
