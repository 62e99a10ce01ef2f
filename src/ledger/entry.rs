//! Ledger row types.

use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::LedgerError;

/// Separator used for the comma-joined `category` column.
const CATEGORY_SEPARATOR: &str = ",";

/// Metadata fields merged into a ledger row by
/// [`LedgerRepository::upsert_comic_metadata`](super::LedgerRepository::upsert_comic_metadata).
///
/// `None` fields keep whatever the row already holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComicMetadata {
    pub comic_id: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub finished: Option<bool>,
    pub pages_count: Option<i64>,
    pub categories: Option<Vec<String>>,
    pub eps_count: Option<i64>,
    pub update_time: Option<String>,
}

impl ComicMetadata {
    /// Creates an empty metadata patch for a comic.
    #[must_use]
    pub fn new(comic_id: impl Into<String>) -> Self {
        Self {
            comic_id: comic_id.into(),
            ..Self::default()
        }
    }

    pub(super) fn joined_categories(&self) -> Option<String> {
        self.categories
            .as_ref()
            .map(|categories| categories.join(CATEGORY_SEPARATOR))
    }
}

/// Snapshot of one `comic_info` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub comic_id: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub finished: bool,
    pub pages_count: i64,
    pub categories: Vec<String>,
    pub eps_count: i64,
    pub update_time: Option<String>,
    pub downloaded_episodes: Vec<String>,
    pub crawl_time: Option<String>,
}

impl LedgerEntry {
    pub(super) fn from_row(row: &SqliteRow) -> Result<Self, LedgerError> {
        let comic_id: String = row.try_get("comic_id")?;
        let raw_episodes: Option<String> = row.try_get("downloaded_episodes")?;
        let downloaded_episodes = decode_episodes(&comic_id, raw_episodes.as_deref())?;
        let category: Option<String> = row.try_get("category")?;

        Ok(Self {
            title: row.try_get("title")?,
            author: row.try_get("author")?,
            finished: row.try_get::<Option<bool>, _>("finished")?.unwrap_or(false),
            pages_count: row.try_get::<Option<i64>, _>("pagesCount")?.unwrap_or(0),
            categories: split_categories(category.as_deref()),
            eps_count: row.try_get::<Option<i64>, _>("epsCount")?.unwrap_or(0),
            update_time: row.try_get("update_time")?,
            downloaded_episodes,
            crawl_time: row.try_get("crawl_time")?,
            comic_id,
        })
    }
}

/// Decodes the JSON `downloaded_episodes` column. `NULL` and blank mean none.
pub(super) fn decode_episodes(
    comic_id: &str,
    raw: Option<&str>,
) -> Result<Vec<String>, LedgerError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Vec::new()),
        Some(raw) => serde_json::from_str(raw).map_err(|source| LedgerError::CorruptEpisodes {
            comic_id: comic_id.to_string(),
            source,
        }),
    }
}

pub(super) fn encode_episodes(comic_id: &str, episodes: &[String]) -> Result<String, LedgerError> {
    serde_json::to_string(episodes).map_err(|source| LedgerError::EncodeEpisodes {
        comic_id: comic_id.to_string(),
        source,
    })
}

fn split_categories(raw: Option<&str>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(CATEGORY_SEPARATOR)
            .map(str::trim)
            .filter(|category| !category.is_empty())
            .map(ToString::to_string)
            .collect()
    })
    .unwrap_or_default()
}
