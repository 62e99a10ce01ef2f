//! Constants for the download module (timeouts, concurrency bounds).

/// Default HTTP connect timeout for image requests (10 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default HTTP read timeout for a single image (60 seconds).
pub const READ_TIMEOUT_SECS: u64 = 60;

/// Smallest accepted worker count.
pub const MIN_CONCURRENCY: usize = 1;

/// Largest accepted worker count.
pub const MAX_CONCURRENCY: usize = 100;

/// Default worker count.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Suffix of in-progress image files.
pub const PARTIAL_SUFFIX: &str = "part";
