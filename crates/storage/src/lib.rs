//! Durable record store for roll records, backed by SQLite.
//!
//! No business rules live here: the repository exposes the four
//! operations the service layer needs (list-all, get-by-id, insert,
//! update) and reports failures as typed errors.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{migrate::MigrateError, sqlite::SqlitePoolOptions, Row, SqlitePool};
use thiserror::Error;

use roll_stock_core::Roll;

/// Top-level database handle that owns the SQLite connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Establishes a new SQLite connection pool for the provided connection string.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(StorageError::Connect)?;

        apply_pragmas(&pool).await?;

        Ok(Self { pool })
    }

    /// Applies migrations located under `migrations/`.
    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(StorageError::Migration)?;
        Ok(())
    }

    /// Returns a handle to operate on roll records.
    pub fn rolls(&self) -> RollRepository {
        RollRepository {
            pool: self.pool.clone(),
        }
    }

    /// Exposes the inner pool when lower level access is required.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn apply_pragmas(pool: &SqlitePool) -> Result<(), StorageError> {
    sqlx::query("PRAGMA foreign_keys = ON;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA journal_mode = WAL;")
        .fetch_one(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA synchronous = NORMAL;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA busy_timeout = 5000;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    Ok(())
}

/// General storage level errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to connect to sqlite: {0}")]
    Connect(sqlx::Error),
    #[error("failed to apply pragma: {0}")]
    Pragma(sqlx::Error),
    #[error("failed to run database migrations: {0}")]
    Migration(MigrateError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Errors that can occur while reading or mutating roll records.
#[derive(Debug, Error)]
pub enum RollStoreError {
    /// A `CHECK` constraint rejected the record's dimensions.
    #[error("roll dimensions violate a storage constraint")]
    CheckViolation,
    /// An update referenced an id the store does not hold.
    #[error("roll is not present in the store")]
    MissingRoll,
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for RollStoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                // SQLITE_CONSTRAINT_CHECK
                if db_err.code().as_deref() == Some("275") {
                    RollStoreError::CheckViolation
                } else {
                    RollStoreError::Database(sqlx::Error::Database(db_err))
                }
            }
            other => RollStoreError::Database(other),
        }
    }
}

/// Dimensions of a roll about to enter stock; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewRoll {
    pub length: f64,
    pub weight: f64,
    pub added_at: DateTime<Utc>,
}

/// Repository for roll records.
#[derive(Clone)]
pub struct RollRepository {
    pool: SqlitePool,
}

impl RollRepository {
    /// Returns every roll record in the store, ordered by id.
    pub async fn list_all(&self) -> Result<Vec<Roll>, RollStoreError> {
        let rows = sqlx::query_as::<_, RollRow>(
            "SELECT id, length, weight, added_at, remove_at FROM rolls ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(RollRow::into_domain).collect())
    }

    /// Fetches a single roll by id, `None` when the store has no such record.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Roll>, RollStoreError> {
        let row = sqlx::query_as::<_, RollRow>(
            "SELECT id, length, weight, added_at, remove_at FROM rolls WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(RollRow::into_domain))
    }

    /// Inserts a new record and returns it with the store-assigned id.
    pub async fn insert(&self, record: &NewRoll) -> Result<Roll, RollStoreError> {
        let row = sqlx::query(
            "INSERT INTO rolls (length, weight, added_at) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(record.length)
        .bind(record.weight)
        .bind(to_rfc3339(record.added_at))
        .fetch_one(&self.pool)
        .await?;

        let id: i64 = row.get("id");
        Ok(Roll {
            id,
            length: record.length,
            weight: record.weight,
            added_at: record.added_at,
            remove_at: None,
        })
    }

    /// Writes the full record back under its id.
    pub async fn update(&self, roll: &Roll) -> Result<(), RollStoreError> {
        let result = sqlx::query(
            "UPDATE rolls SET length = ?, weight = ?, added_at = ?, remove_at = ? WHERE id = ?",
        )
        .bind(roll.length)
        .bind(roll.weight)
        .bind(to_rfc3339(roll.added_at))
        .bind(roll.remove_at.map(to_rfc3339))
        .bind(roll.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RollStoreError::MissingRoll);
        }
        Ok(())
    }
}

/// Database row for a roll record.
#[derive(Debug, sqlx::FromRow)]
struct RollRow {
    id: i64,
    length: f64,
    weight: f64,
    added_at: DateTime<Utc>,
    remove_at: Option<DateTime<Utc>>,
}

impl RollRow {
    fn into_domain(self) -> Roll {
        Roll {
            id: self.id,
            length: self.length,
            weight: self.weight,
            added_at: self.added_at,
            remove_at: self.remove_at,
        }
    }
}

fn to_rfc3339(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}
