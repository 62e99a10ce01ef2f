//! Bounded-concurrency image pool with per-image retry.
//!
//! One [`ImagePool`] is built per run and reused for every chapter. Each image
//! of a chapter is fetched by its own task once a semaphore permit is free, so
//! at most `concurrency` requests are in flight across the whole run. A failed
//! image never cancels its siblings; the chapter result only reports how many
//! images made it to disk.
//!
//! # Example
//!
//! ```no_run
//! use archiver_core::download::{ImageClient, ImagePool, RetryPolicy};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = ImagePool::new(5, RetryPolicy::default())?;
//! let client = ImageClient::new()?;
//! let urls = vec!["https://img.example.com/static/a.jpg".to_string()];
//! let outcome = pool.fetch_chapter(&client, &urls, Path::new("comics/C1/Ep1")).await?;
//! println!("{}/{} images", outcome.succeeded, outcome.total);
//! pool.close();
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use super::constants::{MAX_CONCURRENCY, MIN_CONCURRENCY};
use super::filename::{image_file_name, padding_width};
use super::retry::{RetryDecision, RetryPolicy, classify_error};
use super::{DownloadError, ImageClient};

/// Errors raised by the pool itself, as opposed to individual image failures.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// Worker count outside the accepted range.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The rejected value.
        value: usize,
    },

    /// The chapter directory could not be created.
    #[error("failed to create chapter directory {path}: {source}")]
    Directory {
        /// Directory path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The pool was closed before the chapter was dispatched.
    #[error("image pool is closed")]
    Closed,
}

/// Per-chapter result of [`ImagePool::fetch_chapter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChapterOutcome {
    /// Images in the chapter.
    pub total: usize,
    /// Images present on disk after the pass, including pre-existing ones.
    pub succeeded: usize,
    /// Images already on disk and not requested.
    pub skipped_existing: usize,
    /// Retry attempts made across the chapter.
    pub retried: usize,
}

impl ChapterOutcome {
    /// True when every image made it to disk.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.succeeded == self.total
    }

    /// Images that failed after exhausting retries.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.total - self.succeeded
    }

    /// Whole-number share of images on disk, 0 to 100.
    #[must_use]
    pub fn percent_complete(&self) -> usize {
        if self.total == 0 {
            return 0;
        }
        self.succeeded * 100 / self.total
    }
}

#[derive(Debug, Default)]
struct ChapterStats {
    succeeded: AtomicUsize,
    skipped_existing: AtomicUsize,
    retried: AtomicUsize,
}

impl ChapterStats {
    fn increment_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_skipped(&self) {
        self.skipped_existing.fetch_add(1, Ordering::SeqCst);
        self.increment_succeeded();
    }

    fn increment_retried(&self) {
        self.retried.fetch_add(1, Ordering::SeqCst);
    }

    fn snapshot(&self, total: usize) -> ChapterOutcome {
        ChapterOutcome {
            total,
            succeeded: self.succeeded.load(Ordering::SeqCst),
            skipped_existing: self.skipped_existing.load(Ordering::SeqCst),
            retried: self.retried.load(Ordering::SeqCst),
        }
    }
}

/// Shared image worker pool.
#[derive(Debug)]
pub struct ImagePool {
    semaphore: Arc<Semaphore>,
    concurrency: usize,
    retry_policy: RetryPolicy,
}

impl ImagePool {
    /// Creates a pool with `concurrency` workers.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConcurrency`] unless `concurrency` is in `1..=100`.
    #[instrument(level = "debug", skip(retry_policy))]
    pub fn new(concurrency: usize, retry_policy: RetryPolicy) -> Result<Self, PoolError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(PoolError::InvalidConcurrency { value: concurrency });
        }

        debug!(
            concurrency,
            max_attempts = retry_policy.max_attempts(),
            "creating image pool"
        );

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
            retry_policy,
        })
    }

    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Downloads a chapter's images into `chapter_dir` and waits for all of them.
    ///
    /// Image `i` (0-based) is written to `chapter_dir/<i+1 zero-padded>.jpg`.
    /// Existing files are counted as successes without a request.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Directory`] if `chapter_dir` cannot be created and
    /// [`PoolError::Closed`] if the pool was closed. Image failures are not
    /// errors; they show up as `succeeded < total`.
    #[instrument(skip(self, client, urls), fields(dir = %chapter_dir.display(), images = urls.len()))]
    pub async fn fetch_chapter(
        &self,
        client: &ImageClient,
        urls: &[String],
        chapter_dir: &Path,
    ) -> Result<ChapterOutcome, PoolError> {
        tokio::fs::create_dir_all(chapter_dir)
            .await
            .map_err(|source| PoolError::Directory {
                path: chapter_dir.to_path_buf(),
                source,
            })?;

        let width = padding_width(urls.len());
        let stats = Arc::new(ChapterStats::default());
        let mut handles = Vec::with_capacity(urls.len());

        for (position, url) in urls.iter().enumerate() {
            let destination = chapter_dir.join(image_file_name(position, width));

            if tokio::fs::try_exists(&destination).await.unwrap_or(false) {
                debug!(index = position + 1, "image already on disk");
                stats.increment_skipped();
                continue;
            }

            let permit = self
                .semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| PoolError::Closed)?;

            let client = client.clone();
            let stats = Arc::clone(&stats);
            let retry_policy = self.retry_policy.clone();
            let url = url.clone();

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                match fetch_with_retry(&client, &url, &destination, &retry_policy, &stats).await {
                    Ok(()) => stats.increment_succeeded(),
                    Err((error, attempts)) => {
                        warn!(
                            index = position + 1,
                            url = %url,
                            attempts,
                            error = %error,
                            "image failed after all attempts"
                        );
                    }
                }
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "image task panicked");
            }
        }

        let outcome = stats.snapshot(urls.len());
        info!(
            total = outcome.total,
            succeeded = outcome.succeeded,
            skipped = outcome.skipped_existing,
            retried = outcome.retried,
            "chapter fetch complete"
        );
        Ok(outcome)
    }

    /// Stops accepting work. Chapters in flight finish their dispatched images.
    pub fn close(&self) {
        self.semaphore.close();
        debug!("image pool closed");
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }
}

async fn fetch_with_retry(
    client: &ImageClient,
    url: &str,
    destination: &Path,
    policy: &RetryPolicy,
    stats: &ChapterStats,
) -> Result<(), (DownloadError, u32)> {
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match client.fetch_to_file(url, destination).await {
            Ok(_) => return Ok(()),
            Err(e) => match policy.should_retry(classify_error(&e), attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next_attempt,
                } => {
                    debug!(
                        url,
                        attempt = next_attempt,
                        max_attempts = policy.max_attempts(),
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "retrying image"
                    );
                    stats.increment_retried();
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(url, %reason, "not retrying image");
                    return Err((e, attempt));
                }
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_new_valid_concurrency() {
        assert_eq!(ImagePool::new(1, RetryPolicy::default()).unwrap().concurrency(), 1);
        assert_eq!(ImagePool::new(100, RetryPolicy::default()).unwrap().concurrency(), 100);
    }

    #[test]
    fn test_pool_new_invalid_concurrency() {
        assert!(matches!(
            ImagePool::new(0, RetryPolicy::default()),
            Err(PoolError::InvalidConcurrency { value: 0 })
        ));
        assert!(matches!(
            ImagePool::new(101, RetryPolicy::default()),
            Err(PoolError::InvalidConcurrency { value: 101 })
        ));
    }

    #[test]
    fn test_chapter_outcome_completion() {
        let complete = ChapterOutcome {
            total: 3,
            succeeded: 3,
            ..ChapterOutcome::default()
        };
        assert!(complete.is_complete());
        let partial = ChapterOutcome {
            total: 5,
            succeeded: 2,
            ..ChapterOutcome::default()
        };
        assert!(!partial.is_complete());
        assert_eq!(partial.failed(), 3);
    }

    #[test]
    fn test_chapter_outcome_percent_complete() {
        let partial = ChapterOutcome {
            total: 3,
            succeeded: 2,
            ..ChapterOutcome::default()
        };
        assert_eq!(partial.percent_complete(), 66);
        let complete = ChapterOutcome {
            total: 4,
            succeeded: 4,
            ..ChapterOutcome::default()
        };
        assert_eq!(complete.percent_complete(), 100);
        assert_eq!(ChapterOutcome::default().percent_complete(), 0);
    }

    #[tokio::test]
    async fn test_existing_files_skip_network() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("001.jpg"), b"x").unwrap();
        std::fs::write(dir.path().join("002.jpg"), b"y").unwrap();

        let pool = ImagePool::new(2, RetryPolicy::immediate(1)).unwrap();
        let client = ImageClient::new().unwrap();
        // Unroutable URLs: any request would fail the chapter.
        let urls = vec!["http://127.0.0.1:9/a".to_string(), "http://127.0.0.1:9/b".to_string()];
        let outcome = pool.fetch_chapter(&client, &urls, dir.path()).await.unwrap();

        assert!(outcome.is_complete());
        assert_eq!(outcome.skipped_existing, 2);
    }

    #[tokio::test]
    async fn test_closed_pool_rejects_work() {
        let dir = tempfile::tempdir().unwrap();
        let pool = ImagePool::new(1, RetryPolicy::immediate(1)).unwrap();
        pool.close();
        assert!(pool.is_closed());

        let client = ImageClient::new().unwrap();
        let urls = vec!["http://127.0.0.1:9/a".to_string()];
        let result = pool.fetch_chapter(&client, &urls, dir.path()).await;
        assert!(matches!(result, Err(PoolError::Closed)));
    }

    #[tokio::test]
    async fn test_empty_chapter_is_trivially_complete() {
        let dir = tempfile::tempdir().unwrap();
        let pool = ImagePool::new(1, RetryPolicy::immediate(1)).unwrap();
        let client = ImageClient::new().unwrap();
        let outcome = pool.fetch_chapter(&client, &[], dir.path()).await.unwrap();
        assert_eq!(outcome.total, 0);
        assert!(outcome.is_complete());
    }
}
