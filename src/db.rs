//! SQLite storage for the download ledger.
//!
//! Opens a pooled connection in WAL mode with `synchronous=FULL`, so a
//! recorded chapter survives a crash, then applies the embedded migrations.
//!
//! ```no_run
//! use archiver_core::Database;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(Path::new("data/comic_spider.db")).await?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use thiserror::Error;
use tracing::{info, instrument};

const LEDGER_MAX_CONNECTIONS: u32 = 5;

/// How long a connection waits on a locked database before `SQLITE_BUSY`.
const LOCK_WAIT: Duration = Duration::from_secs(5);

/// Errors opening or querying the ledger database.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("ledger database error: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("ledger schema migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The directory for the database file could not be created.
    #[error("cannot create ledger directory {path}: {source}")]
    Directory {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Cloneable handle to the ledger's connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the ledger file at `db_path`.
    ///
    /// Missing parent directories are created first.
    ///
    /// # Errors
    ///
    /// [`DbError::Directory`] when the parent cannot be created, otherwise
    /// connection or migration failures.
    #[instrument(skip(db_path), fields(path = %db_path.display()))]
    pub async fn new(db_path: &Path) -> Result<Self, DbError> {
        ensure_parent_dir(db_path)?;

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full)
            .busy_timeout(LOCK_WAIT);

        let pool = SqlitePoolOptions::new()
            .max_connections(LEDGER_MAX_CONNECTIONS)
            .connect_with(options)
            .await?;
        Self::migrated(pool).await
    }

    /// Opens a private in-memory ledger.
    ///
    /// Limited to one connection, since every `:memory:` connection is its
    /// own database.
    ///
    /// # Errors
    ///
    /// Connection or migration failures.
    #[instrument]
    pub async fn new_in_memory() -> Result<Self, DbError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::migrated(pool).await
    }

    async fn migrated(pool: SqlitePool) -> Result<Self, DbError> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Reports whether the journal mode is WAL.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Connection` if the pragma query fails.
    pub async fn is_wal_enabled(&self) -> Result<bool, DbError> {
        let (mode,): (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&self.pool)
            .await?;
        Ok(mode.eq_ignore_ascii_case("wal"))
    }

    /// Waits for in-flight queries and closes every connection.
    #[instrument(skip(self))]
    pub async fn close(self) {
        self.pool.close().await;
    }
}

fn ensure_parent_dir(db_path: &Path) -> Result<(), DbError> {
    let Some(parent) = db_path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() || parent.exists() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|source| DbError::Directory {
        path: parent.display().to_string(),
        source,
    })?;
    info!(dir = %parent.display(), "created ledger directory");
    Ok(())
}
