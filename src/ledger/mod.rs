//! Download ledger: the persistent record of what has been mirrored.
//!
//! One `comic_info` row exists per tracked comic. Its `downloaded_episodes`
//! column lists the chapter titles whose every page image was confirmed on
//! disk in a single fetch pass; partial chapters are never recorded.
//!
//! # Overview
//!
//! - [`Ledger`] - `SQLite`-backed implementation
//! - [`LedgerRepository`] - data-access contract used by the planner and orchestrator
//! - [`LedgerEntry`] / [`ComicMetadata`] - row snapshot and metadata patch
//!
//! Writes are serialized by an internal lock and each one commits before the
//! call returns, so a recorded chapter is durable before the caller moves on.
//!
//! # Example
//!
//! ```ignore
//! use archiver_core::{Database, Ledger, LedgerRepository};
//!
//! let ledger = Ledger::new(Database::new_in_memory().await?);
//! ledger.mark_comic_tracked("5821a0c0").await?;
//! ledger.record_chapter_downloaded("5821a0c0", "第1話").await?;
//! assert!(ledger.is_chapter_downloaded("5821a0c0", "第1話").await?);
//! ```

mod entry;
mod error;
mod repository;

pub use entry::{ComicMetadata, LedgerEntry};
pub use error::LedgerError;
pub use repository::LedgerRepository;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::db::Database;
use entry::{decode_episodes, encode_episodes};

/// Prefix of synthetic ledger ids holding per-keyword search markers.
pub const SEARCH_MARKER_PREFIX: &str = "search:";

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// `SQLite`-backed download ledger.
///
/// Cloning is cheap and clones share both the connection pool and the write lock.
#[derive(Debug, Clone)]
pub struct Ledger {
    db: Database,
    write_lock: Arc<Mutex<()>>,
}

impl Ledger {
    /// Creates a ledger over an opened database.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self {
            db,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Returns true if a row exists for the comic.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn is_comic_tracked(&self, comic_id: &str) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM comic_info WHERE comic_id = ?")
            .bind(comic_id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.is_some())
    }

    /// Inserts a bare row for the comic if none exists.
    ///
    /// Returns true when a new row was created.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Database`] if the insert fails.
    #[instrument(skip(self))]
    pub async fn mark_comic_tracked(&self, comic_id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let result = sqlx::query("INSERT OR IGNORE INTO comic_info (comic_id) VALUES (?)")
            .bind(comic_id)
            .execute(self.db.pool())
            .await?;
        let inserted = result.rows_affected() == 1;
        if inserted {
            info!(comic_id, "started tracking comic");
        }
        Ok(inserted)
    }

    /// Returns the titles recorded as fully downloaded, in recording order.
    ///
    /// An untracked comic yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Database`] if the query fails or
    /// [`LedgerError::CorruptEpisodes`] if the stored list cannot be decoded.
    #[instrument(skip(self))]
    pub async fn downloaded_episodes(&self, comic_id: &str) -> Result<Vec<String>> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT downloaded_episodes FROM comic_info WHERE comic_id = ?")
                .bind(comic_id)
                .fetch_optional(self.db.pool())
                .await?;
        match row {
            Some((raw,)) => decode_episodes(comic_id, raw.as_deref()),
            None => Ok(Vec::new()),
        }
    }

    /// Returns true if the chapter title is in the comic's downloaded set.
    ///
    /// # Errors
    ///
    /// Same as [`downloaded_episodes`](Self::downloaded_episodes).
    #[instrument(skip(self))]
    pub async fn is_chapter_downloaded(&self, comic_id: &str, chapter_title: &str) -> Result<bool> {
        Ok(self
            .downloaded_episodes(comic_id)
            .await?
            .iter()
            .any(|title| title == chapter_title))
    }

    /// Appends a chapter title to the comic's downloaded set and commits.
    ///
    /// Creates the row if the comic was not tracked yet. Recording a title
    /// that is already present is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Database`] if the transaction fails or
    /// [`LedgerError::CorruptEpisodes`] if the stored list cannot be decoded.
    #[instrument(skip(self))]
    pub async fn record_chapter_downloaded(&self, comic_id: &str, chapter_title: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.db.pool().begin().await?;

        let current: Option<(Option<String>,)> =
            sqlx::query_as("SELECT downloaded_episodes FROM comic_info WHERE comic_id = ?")
                .bind(comic_id)
                .fetch_optional(&mut *tx)
                .await?;

        let mut episodes = match &current {
            Some((raw,)) => decode_episodes(comic_id, raw.as_deref())?,
            None => Vec::new(),
        };
        if episodes.iter().any(|title| title == chapter_title) {
            debug!(comic_id, chapter_title, "chapter already recorded");
            tx.commit().await?;
            return Ok(());
        }
        episodes.push(chapter_title.to_string());
        let encoded = encode_episodes(comic_id, &episodes)?;

        if current.is_some() {
            sqlx::query("UPDATE comic_info SET downloaded_episodes = ? WHERE comic_id = ?")
                .bind(&encoded)
                .bind(comic_id)
                .execute(&mut *tx)
                .await?;
        } else {
            sqlx::query("INSERT INTO comic_info (comic_id, downloaded_episodes) VALUES (?, ?)")
                .bind(comic_id)
                .bind(&encoded)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        info!(
            comic_id,
            chapter_title,
            recorded = episodes.len(),
            "recorded downloaded chapter"
        );
        Ok(())
    }

    /// Merges metadata into the comic's row without touching `downloaded_episodes`.
    ///
    /// Missing rows are created. Fields left as `None` keep their stored value
    /// (or the column default for a new row).
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Database`] if the upsert fails.
    #[instrument(skip(self, metadata), fields(comic_id = %metadata.comic_id))]
    pub async fn upsert_comic_metadata(&self, metadata: &ComicMetadata) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        sqlx::query(
            r"INSERT INTO comic_info (
                comic_id, title, author, finished, pagesCount, category, epsCount, update_time
            ) VALUES (
                ?1, ?2, COALESCE(?3, ''), COALESCE(?4, FALSE), COALESCE(?5, 0),
                COALESCE(?6, ''), COALESCE(?7, 0), ?8
            )
            ON CONFLICT(comic_id) DO UPDATE SET
                title = COALESCE(?2, comic_info.title),
                author = COALESCE(?3, comic_info.author),
                finished = COALESCE(?4, comic_info.finished),
                pagesCount = COALESCE(?5, comic_info.pagesCount),
                category = COALESCE(?6, comic_info.category),
                epsCount = COALESCE(?7, comic_info.epsCount),
                update_time = COALESCE(?8, comic_info.update_time)",
        )
        .bind(&metadata.comic_id)
        .bind(metadata.title.as_deref())
        .bind(metadata.author.as_deref())
        .bind(metadata.finished)
        .bind(metadata.pages_count)
        .bind(metadata.joined_categories())
        .bind(metadata.eps_count)
        .bind(metadata.update_time.as_deref())
        .execute(self.db.pool())
        .await?;

        debug!(title = ?metadata.title, "saved comic metadata");
        Ok(())
    }

    /// Returns the full row for a comic, if tracked.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Database`] if the query fails or
    /// [`LedgerError::CorruptEpisodes`] if the stored list cannot be decoded.
    #[instrument(skip(self))]
    pub async fn get_comic(&self, comic_id: &str) -> Result<Option<LedgerEntry>> {
        let row = sqlx::query("SELECT * FROM comic_info WHERE comic_id = ?")
            .bind(comic_id)
            .fetch_optional(self.db.pool())
            .await?;
        row.as_ref().map(LedgerEntry::from_row).transpose()
    }

    /// Returns the number of tracked comics, excluding search markers.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM comic_info WHERE substr(comic_id, 1, ?) != ?")
                .bind(i64::try_from(SEARCH_MARKER_PREFIX.len()).unwrap_or(i64::MAX))
                .bind(SEARCH_MARKER_PREFIX)
                .fetch_one(self.db.pool())
                .await?;
        Ok(count)
    }

    /// Returns the last-seen search title stored for a keyword.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn search_marker(&self, keyword: &str) -> Result<Option<String>> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT title FROM comic_info WHERE comic_id = ?")
                .bind(search_marker_id(keyword))
                .fetch_optional(self.db.pool())
                .await?;
        Ok(row.and_then(|(title,)| title))
    }

    /// Stores the last-seen search title for a keyword.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Database`] if the upsert fails.
    #[instrument(skip(self))]
    pub async fn set_search_marker(&self, keyword: &str, title: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        sqlx::query(
            r"INSERT INTO comic_info (comic_id, title, update_time)
            VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(comic_id) DO UPDATE SET title = ?2, update_time = datetime('now')",
        )
        .bind(search_marker_id(keyword))
        .bind(title)
        .execute(self.db.pool())
        .await?;
        debug!(keyword, title, "saved search marker");
        Ok(())
    }
}

/// Builds the synthetic ledger id holding a keyword's search marker.
#[must_use]
pub fn search_marker_id(keyword: &str) -> String {
    format!("{SEARCH_MARKER_PREFIX}{keyword}")
}
