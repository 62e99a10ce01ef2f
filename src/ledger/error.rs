//! Error types for ledger operations.

use thiserror::Error;

/// Errors raised by the download ledger.
///
/// Every variant is fatal for the comic being processed but never for the run;
/// the orchestrator logs it and moves on to the next comic.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The underlying SQLite query failed.
    #[error("ledger database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The stored `downloaded_episodes` column is not a JSON array of strings.
    #[error("corrupt downloaded_episodes for comic {comic_id}: {source}")]
    CorruptEpisodes {
        /// Comic whose row could not be decoded.
        comic_id: String,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },

    /// Encoding the episode list failed.
    #[error("failed to encode downloaded_episodes for comic {comic_id}: {source}")]
    EncodeEpisodes {
        /// Comic whose row could not be written.
        comic_id: String,
        /// Encoder error.
        #[source]
        source: serde_json::Error,
    },
}
