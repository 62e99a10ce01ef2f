//! Post-download retention decisions.
//!
//! When enabled, a favorited comic is unfavorited once it is finished, or once
//! it has gone `stale_after_days` without a remote update.

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

use crate::catalog::ComicDetail;

/// Timestamp layout of the remote `updated_at` field.
pub const UPDATED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Retention evaluation errors.
#[derive(Debug, Error)]
pub enum RetentionError {
    /// `updated_at` did not match [`UPDATED_AT_FORMAT`].
    #[error("cannot parse updated_at '{value}' for comic {comic_id}: {source}")]
    InvalidTimestamp {
        /// The comic being evaluated.
        comic_id: String,
        /// The raw timestamp.
        value: String,
        /// Parser error.
        #[source]
        source: chrono::ParseError,
    },
}

/// Why a comic should be unfavorited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    Finished,
    /// Days since the last remote update.
    Stale { idle_days: i64 },
}

/// Outcome of [`RetentionPolicy::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionDecision {
    Keep,
    Unfavorite(RemovalReason),
}

/// Retention rules built from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub enabled: bool,
    pub stale_after_days: i64,
}

impl RetentionPolicy {
    #[must_use]
    pub fn new(enabled: bool, stale_after_days: u32) -> Self {
        Self {
            enabled,
            stale_after_days: i64::from(stale_after_days),
        }
    }

    /// Decides whether `comic` should be unfavorited at `now`.
    ///
    /// Disabled policies and comics that are not favorited always yield
    /// [`RetentionDecision::Keep`] without parsing the timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`RetentionError::InvalidTimestamp`] when the staleness check
    /// is reached and `updated_at` cannot be parsed.
    pub fn evaluate(
        &self,
        comic: &ComicDetail,
        now: DateTime<Utc>,
    ) -> Result<RetentionDecision, RetentionError> {
        if !self.enabled || !comic.is_favourite {
            return Ok(RetentionDecision::Keep);
        }
        if comic.finished {
            return Ok(RetentionDecision::Unfavorite(RemovalReason::Finished));
        }

        let updated_at = parse_updated_at(&comic.id, &comic.updated_at)?;
        let idle_days = (now - updated_at).num_days();
        if idle_days >= self.stale_after_days {
            Ok(RetentionDecision::Unfavorite(RemovalReason::Stale { idle_days }))
        } else {
            Ok(RetentionDecision::Keep)
        }
    }
}

/// Parses a remote `updated_at` value as UTC.
///
/// # Errors
///
/// Returns [`RetentionError::InvalidTimestamp`] on a format mismatch.
pub fn parse_updated_at(comic_id: &str, value: &str) -> Result<DateTime<Utc>, RetentionError> {
    NaiveDateTime::parse_from_str(value, UPDATED_AT_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|source| RetentionError::InvalidTimestamp {
            comic_id: comic_id.to_string(),
            value: value.to_string(),
            source,
        })
}
