//! Page image downloads.
//!
//! This module fetches a chapter's page images to disk with bounded
//! concurrency and per-image retry.
//!
//! # Features
//!
//! - Shared worker pool sized once per run ([`ImagePool`])
//! - Streaming writes through a `.part` file renamed on completion
//! - Skip-if-exists idempotence on restart
//! - Exponential backoff with jitter ([`RetryPolicy`])
//! - Deterministic local layout ([`comic_dir`], [`chapter_dir`], [`image_file_name`])
//!
//! # Example
//!
//! ```no_run
//! use archiver_core::download::{ImageClient, ImagePool, RetryPolicy, chapter_dir, comic_dir};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = ImagePool::new(5, RetryPolicy::default())?;
//! let client = ImageClient::new()?;
//! let dir = chapter_dir(&comic_dir(Path::new("comics"), "Sample"), "Ep1");
//! let urls = vec!["https://img.example.com/static/a.jpg".to_string()];
//! let outcome = pool.fetch_chapter(&client, &urls, &dir).await?;
//! assert!(outcome.succeeded <= outcome.total);
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod error;
mod filename;
mod pool;
mod retry;

pub use client::ImageClient;
pub use constants::DEFAULT_CONCURRENCY;
pub use error::DownloadError;
pub use filename::{chapter_dir, comic_dir, image_file_name, padding_width, sanitize_component};
pub use pool::{ChapterOutcome, ImagePool, PoolError};
pub use retry::{DEFAULT_MAX_RETRIES, FailureType, RetryDecision, RetryPolicy, classify_error};
