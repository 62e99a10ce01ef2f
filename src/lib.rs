//! Comic Archiver Core Library
//!
//! Incrementally mirrors a user's favorited comics, plus comics discovered
//! through keyword subscriptions, from a remote catalog to local disk. A
//! persistent ledger records which chapters are fully downloaded so every run
//! only fetches what is new.
//!
//! # Architecture
//!
//! - [`catalog`] - Signed client and contract for the remote catalog
//! - [`ledger`] - Persistent record of downloaded chapters and comic metadata
//! - [`planner`] - Episode enumeration and diff against the ledger
//! - [`download`] - Bounded-concurrency image pool with retry
//! - [`retention`] - Unfavorite decisions for finished or stale comics
//! - [`orchestrator`] - Favorites and search passes composing the above
//! - [`config`] - Layered YAML and environment configuration
//! - [`db`] - `SQLite` connection and schema management

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod config;
pub mod db;
pub mod download;
pub mod ledger;
pub mod orchestrator;
pub mod planner;
pub mod retention;
mod user_agent;

// Re-export commonly used types
pub use catalog::{Catalog, CatalogError};
pub use config::Settings;
pub use db::Database;
pub use download::{ChapterOutcome, DownloadError, ImageClient, ImagePool, RetryPolicy};
pub use ledger::{Ledger, LedgerError, LedgerRepository};
pub use orchestrator::{ComicOutcome, Orchestrator, OrchestratorError, RunOptions, RunSummary};
pub use retention::{RetentionDecision, RetentionPolicy};
