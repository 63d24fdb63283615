use crate::models::{
    Author, AuthorName, Country, CreateAuthorError, CreateAuthorRequest, DeleteAuthorError,
    FindAllAuthorsError, FindAuthorError, UpdateAuthorError, UpdateAuthorRequest,
};
use crate::repositories::AuthorRepository;
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{FromRow, Row, SqlitePool};
use std::str::FromStr;

mod books;

pub use books::DefaultBookRepository;

static MIGRATOR: Migrator = sqlx::migrate!();

pub async fn establish_pool(path: &str) -> anyhow::Result<SqlitePool> {
    let opts = SqliteConnectOptions::from_str(path)
        .with_context(|| format!("Invalid database path {path}"))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal);
    // SQLite allows a single writer; one connection also keeps in-memory
    // databases alive for the lifetime of the pool.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(opts)
        .await
        .with_context(|| format!("Failed to open database at {path}"))?;

    MIGRATOR.run(&pool).await?;

    Ok(pool)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.is_unique_violation();
    }

    false
}

#[derive(Debug, Clone)]
pub struct DefaultAuthorRepository {
    pool: SqlitePool,
}

impl DefaultAuthorRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl<'r> FromRow<'r, SqliteRow> for Author {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id = row.try_get("id")?;
        let name = row.try_get("name")?;
        let country = row.try_get("country")?;
        let is_active = row.try_get("is_active")?;

        let name = AuthorName::new_unchecked(name);
        let country = Country::new_unchecked(country);
        Ok(Self::new(id, name, country, is_active))
    }
}

#[async_trait]
impl AuthorRepository for DefaultAuthorRepository {
    async fn create_author(&self, req: &CreateAuthorRequest) -> Result<Author, CreateAuthorError> {
        let author = sqlx::query_as(
            "INSERT INTO author (name, country, is_active) VALUES (?, ?, ?) RETURNING *",
        )
        .bind(req.name().to_string())
        .bind(req.country().to_string())
        .bind(req.is_active())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            let err = anyhow!(err).context(format!(
                r#"Failed to create author with name "{}""#,
                req.name()
            ));
            CreateAuthorError(err)
        })?;

        Ok(author)
    }

    async fn find_author(&self, id: i64) -> Result<Author, FindAuthorError> {
        let author = sqlx::query_as("SELECT id, name, country, is_active FROM author WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| {
                if matches!(err, sqlx::Error::RowNotFound) {
                    FindAuthorError::NotFound { id }
                } else {
                    let err =
                        anyhow!(err).context(format!(r#"Failed to retrieve author with id "{id}""#));
                    FindAuthorError::Other(err)
                }
            })?;

        Ok(author)
    }

    async fn find_all_authors(&self) -> Result<Vec<Author>, FindAllAuthorsError> {
        let authors = sqlx::query_as("SELECT id, name, country, is_active FROM author")
            .fetch_all(&self.pool)
            .await
            .map_err(|err| {
                let err = anyhow!(err).context("Failed to retrieve all authors");
                FindAllAuthorsError(err)
            })?;

        Ok(authors)
    }

    async fn update_author(&self, req: &UpdateAuthorRequest) -> Result<Author, UpdateAuthorError> {
        let current = self.find_author(req.id()).await.map_err(|err| match err {
            FindAuthorError::NotFound { id } => UpdateAuthorError::NotFound { id },
            FindAuthorError::Other(err) => UpdateAuthorError::Other(err),
        })?;

        // Partial update: unsupplied fields keep their prior values.
        let name = req.name().unwrap_or(current.name());
        let country = req.country().unwrap_or(current.country());
        let is_active = req.is_active().unwrap_or(current.is_active());

        let author = sqlx::query_as(
            "UPDATE author SET name = ?, country = ?, is_active = ? WHERE id = ? RETURNING *",
        )
        .bind(name.to_string())
        .bind(country.to_string())
        .bind(is_active)
        .bind(req.id())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            let err =
                anyhow!(err).context(format!(r#"Failed to update author with id "{}""#, req.id()));
            UpdateAuthorError::Other(err)
        })?;

        Ok(author)
    }

    async fn delete_author(&self, id: i64) -> Result<Author, DeleteAuthorError> {
        let author = sqlx::query_as("DELETE FROM author WHERE id = ? RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| {
                let err =
                    anyhow!(err).context(format!(r#"Failed to delete author with id "{id}""#));
                DeleteAuthorError::Other(err)
            })?
            .ok_or(DeleteAuthorError::NotFound { id })?;

        Ok(author)
    }
}
