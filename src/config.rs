//! Run configuration: YAML file layered under environment overrides.
//!
//! Precedence is environment > file > built-in default. Environment keys use
//! the `COMIC_ARCHIVER_` prefix and `__` between section and key, e.g.
//! `COMIC_ARCHIVER_DOWNLOAD__THREAD_NUMBER=8`. List values
//! (`download.filter`, `download.key_world`) are comma separated.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

/// Default config file location, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/comic.yaml";

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "COMIC_ARCHIVER";

const DEFAULT_BASE_URL: &str = "https://picaapi.picacomic.com/";
const DEFAULT_API_TIMEOUT_SECS: u64 = 10;
const DEFAULT_IMAGE_QUALITY: &str = "original";
const DEFAULT_THREAD_NUMBER: usize = 5;
const DEFAULT_SEARCH_PAGES: u32 = 1;
const DEFAULT_STALE_DAYS: u32 = 30;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_CHAPTER_DELAY_MS: u64 = 1000;
const DEFAULT_OUTPUT_DIR: &str = "comics";
const DEFAULT_DATABASE: &str = "data/comic_spider.db";

/// Template written on first run when no config file exists.
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# comic-archiver configuration.
# Every key can be overridden from the environment, e.g.
#   COMIC_ARCHIVER_GLOBAL__USER_PASSWORD=secret
global:
  user_name: ""
  user_password: ""
  pdf_switch: 0

api:
  base_url: "https://picaapi.picacomic.com/"
  # Client signing material for the remote API.
  api_key: ""
  secret_key: ""
  nonce: ""
  timeout_secs: 10
  image_quality: "original"

download:
  # Concurrent image downloads.
  thread_number: 5
  # Categories excluded from keyword search results.
  filter: []
  # Search result pages fetched per keyword.
  page: 1
  # Search keywords to subscribe to.
  key_world: []
  # Unfavorite finished or stale comics after downloading.
  remove_favorites: false
  # Log per-chapter progress.
  is_detail: false
  # Days without updates before an unfinished comic counts as stale.
  out_time_day: 30
  max_retries: 3
  chapter_delay_ms: 1000

storage:
  output_dir: "comics"
  database: "data/comic_spider.db"
"#;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or deserializing the layered sources failed.
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// A value is present but out of range or empty.
    #[error("invalid config value for `{key}`: {message}")]
    Invalid {
        /// Dotted key, e.g. `download.thread_number`.
        key: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// Writing the first-run template failed.
    #[error("failed to write default config to {path}: {source}")]
    Write {
        /// Target path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Fully resolved, immutable run configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub global: GlobalSettings,
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub download: DownloadSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

/// Account credentials.
#[derive(Clone, Deserialize)]
pub struct GlobalSettings {
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub user_password: String,
}

impl fmt::Debug for GlobalSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalSettings")
            .field("user_name", &self.user_name)
            .field("user_password", &"<redacted>")
            .finish()
    }
}

/// Remote API endpoint and signing material.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub api_key: String,
    pub secret_key: String,
    pub nonce: String,
    pub timeout_secs: u64,
    pub image_quality: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            secret_key: String::new(),
            nonce: String::new(),
            timeout_secs: DEFAULT_API_TIMEOUT_SECS,
            image_quality: DEFAULT_IMAGE_QUALITY.to_string(),
        }
    }
}

impl fmt::Debug for ApiSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .field("nonce", &self.nonce)
            .field("timeout_secs", &self.timeout_secs)
            .field("image_quality", &self.image_quality)
            .finish()
    }
}

impl ApiSettings {
    /// Request timeout for catalog calls.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Download, search and retention behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownloadSettings {
    /// Image worker pool size.
    pub thread_number: usize,
    /// Categories excluded from search results.
    pub filter: Vec<String>,
    /// Max search pages per keyword.
    pub page: u32,
    /// Search keywords.
    pub key_world: Vec<String>,
    /// Enables the retention policy.
    pub remove_favorites: bool,
    /// Enables per-chapter progress logging.
    pub is_detail: bool,
    /// Staleness threshold in days.
    pub out_time_day: u32,
    /// Attempts per image, including the first.
    pub max_retries: u32,
    /// Pause between chapters.
    pub chapter_delay_ms: u64,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            thread_number: DEFAULT_THREAD_NUMBER,
            filter: Vec::new(),
            page: DEFAULT_SEARCH_PAGES,
            key_world: Vec::new(),
            remove_favorites: false,
            is_detail: false,
            out_time_day: DEFAULT_STALE_DAYS,
            max_retries: DEFAULT_RETRY_ATTEMPTS,
            chapter_delay_ms: DEFAULT_CHAPTER_DELAY_MS,
        }
    }
}

impl DownloadSettings {
    /// Courtesy delay between chapters.
    #[must_use]
    pub fn chapter_delay(&self) -> Duration {
        Duration::from_millis(self.chapter_delay_ms)
    }
}

/// Local storage locations.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub output_dir: PathBuf,
    pub database: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            database: PathBuf::from(DEFAULT_DATABASE),
        }
    }
}

impl Settings {
    /// Loads the YAML file at `path`, applies environment overrides and validates.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if the file is missing or malformed and
    /// [`ConfigError::Invalid`] if a value fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with_env_prefix(path, ENV_PREFIX)
    }

    fn load_with_env_prefix(path: &Path, prefix: &str) -> Result<Self, ConfigError> {
        let settings: Self = Config::builder()
            .add_source(File::from(path).format(FileFormat::Yaml).required(true))
            .add_source(
                Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("download.filter")
                    .with_list_parse_key("download.key_world"),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parses settings from a YAML string without environment overrides.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load).
    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        let settings: Self = Config::builder()
            .add_source(File::from_str(raw, FileFormat::Yaml))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validates values against runtime constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty("global.user_name", &self.global.user_name)?;
        require_non_empty("global.user_password", &self.global.user_password)?;
        require_non_empty("api.api_key", &self.api.api_key)?;
        require_non_empty("api.secret_key", &self.api.secret_key)?;
        require_non_empty("api.nonce", &self.api.nonce)?;

        if url::Url::parse(&self.api.base_url).is_err() {
            return Err(invalid(
                "api.base_url",
                format!("'{}' is not an absolute URL", self.api.base_url),
            ));
        }
        if !(1..=3600).contains(&self.api.timeout_secs) {
            return Err(invalid(
                "api.timeout_secs",
                format!("{}. Expected range: 1..=3600", self.api.timeout_secs),
            ));
        }
        if !(1..=100).contains(&self.download.thread_number) {
            return Err(invalid(
                "download.thread_number",
                format!("{}. Expected range: 1..=100", self.download.thread_number),
            ));
        }
        if self.download.page == 0 {
            return Err(invalid("download.page", "0. Expected at least 1".to_string()));
        }
        if !(1..=10).contains(&self.download.max_retries) {
            return Err(invalid(
                "download.max_retries",
                format!("{}. Expected range: 1..=10", self.download.max_retries),
            ));
        }
        if self.download.chapter_delay_ms > 60_000 {
            return Err(invalid(
                "download.chapter_delay_ms",
                format!("{}. Expected range: 0..=60000", self.download.chapter_delay_ms),
            ));
        }
        Ok(())
    }
}

fn require_non_empty(key: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(invalid(key, "must not be empty".to_string()));
    }
    Ok(())
}

fn invalid(key: &'static str, message: String) -> ConfigError {
    ConfigError::Invalid { key, message }
}

/// Writes the commented template to `path` if no file exists there.
///
/// Returns true when the template was written, meaning the caller should ask
/// the user to fill it in and stop.
///
/// # Errors
///
/// Returns [`ConfigError::Write`] if the directory or file cannot be created.
pub fn ensure_config_file(path: &Path) -> Result<bool, ConfigError> {
    if path.exists() {
        return Ok(false);
    }
    let write_error = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }
    std::fs::write(path, DEFAULT_CONFIG_TEMPLATE).map_err(write_error)?;
    info!(path = %path.display(), "wrote default configuration");
    Ok(true)
}
