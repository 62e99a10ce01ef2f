//! Repository seam for ledger persistence operations.
//!
//! The planner and orchestrator depend on this trait rather than on
//! [`Ledger`] directly, so alternative stores only need to honor the contract.

use async_trait::async_trait;

use super::{ComicMetadata, Ledger, Result};

/// Data-access contract for the download ledger.
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Returns true if the comic has a ledger row.
    async fn is_comic_tracked(&self, comic_id: &str) -> Result<bool>;

    /// Inserts a bare row if absent; returns true when a row was created.
    async fn mark_comic_tracked(&self, comic_id: &str) -> Result<bool>;

    /// Returns true if the chapter title is recorded as fully downloaded.
    async fn is_chapter_downloaded(&self, comic_id: &str, chapter_title: &str) -> Result<bool>;

    /// Durably appends a chapter title to the downloaded set.
    async fn record_chapter_downloaded(&self, comic_id: &str, chapter_title: &str) -> Result<()>;

    /// Merges supplied metadata fields into the comic's row.
    async fn upsert_comic_metadata(&self, metadata: &ComicMetadata) -> Result<()>;

    /// Returns the number of tracked comics.
    async fn count(&self) -> Result<i64>;

    /// Returns the stored last-seen search title for a keyword.
    async fn search_marker(&self, keyword: &str) -> Result<Option<String>>;

    /// Stores the last-seen search title for a keyword.
    async fn set_search_marker(&self, keyword: &str, title: &str) -> Result<()>;
}

#[async_trait]
impl LedgerRepository for Ledger {
    async fn is_comic_tracked(&self, comic_id: &str) -> Result<bool> {
        Ledger::is_comic_tracked(self, comic_id).await
    }

    async fn mark_comic_tracked(&self, comic_id: &str) -> Result<bool> {
        Ledger::mark_comic_tracked(self, comic_id).await
    }

    async fn is_chapter_downloaded(&self, comic_id: &str, chapter_title: &str) -> Result<bool> {
        Ledger::is_chapter_downloaded(self, comic_id, chapter_title).await
    }

    async fn record_chapter_downloaded(&self, comic_id: &str, chapter_title: &str) -> Result<()> {
        Ledger::record_chapter_downloaded(self, comic_id, chapter_title).await
    }

    async fn upsert_comic_metadata(&self, metadata: &ComicMetadata) -> Result<()> {
        Ledger::upsert_comic_metadata(self, metadata).await
    }

    async fn count(&self) -> Result<i64> {
        Ledger::count(self).await
    }

    async fn search_marker(&self, keyword: &str) -> Result<Option<String>> {
        Ledger::search_marker(self, keyword).await
    }

    async fn set_search_marker(&self, keyword: &str, title: &str) -> Result<()> {
        Ledger::set_search_marker(self, keyword, title).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::Database;

    async fn tracked_count(repo: &dyn LedgerRepository) -> Result<i64> {
        repo.count().await
    }

    #[tokio::test]
    async fn test_ledger_repository_trait_delegates_lifecycle() {
        let ledger = Ledger::new(Database::new_in_memory().await.unwrap());
        let repo: &dyn LedgerRepository = &ledger;

        assert!(repo.mark_comic_tracked("c1").await.unwrap());
        repo.record_chapter_downloaded("c1", "Ep1").await.unwrap();

        assert!(repo.is_comic_tracked("c1").await.unwrap());
        assert!(repo.is_chapter_downloaded("c1", "Ep1").await.unwrap());
        assert_eq!(tracked_count(repo).await.unwrap(), 1);
    }
}
