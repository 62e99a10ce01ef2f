//! Wire types returned by the remote catalog.

use serde::Deserialize;

use crate::ledger::ComicMetadata;

/// A comic as listed in favorites or search results.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComicSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub pages_count: Option<i64>,
    #[serde(default)]
    pub eps_count: Option<i64>,
    #[serde(default)]
    pub finished: bool,
}

impl ComicSummary {
    /// Returns true if any of the comic's categories is in `excluded`.
    #[must_use]
    pub fn has_category_in(&self, excluded: &[String]) -> bool {
        self.categories
            .iter()
            .any(|category| excluded.iter().any(|skip| skip == category))
    }
}

/// Fresh metadata for a single comic.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComicDetail {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub pages_count: i64,
    #[serde(default)]
    pub eps_count: i64,
    #[serde(default)]
    pub finished: bool,
    /// ISO-8601 UTC timestamp with milliseconds, e.g. `2024-03-01T12:00:00.000Z`.
    #[serde(rename = "updated_at")]
    pub updated_at: String,
    #[serde(rename = "isFavourite", default)]
    pub is_favourite: bool,
}

impl From<&ComicDetail> for ComicMetadata {
    fn from(detail: &ComicDetail) -> Self {
        Self {
            comic_id: detail.id.clone(),
            title: Some(detail.title.clone()),
            author: Some(detail.author.clone()),
            finished: Some(detail.finished),
            pages_count: Some(detail.pages_count),
            categories: Some(detail.categories.clone()),
            eps_count: Some(detail.eps_count),
            update_time: Some(detail.updated_at.clone()),
        }
    }
}

/// One chapter of a comic.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Episode {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub title: String,
    /// 1-based, contiguous ordering key.
    pub order: u32,
}

/// One page of a paginated comic listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ComicPage {
    #[serde(default)]
    pub docs: Vec<ComicSummary>,
    pub pages: u32,
}

/// One page of a comic's episode listing.
#[derive(Debug, Clone, Deserialize)]
pub struct EpisodePage {
    #[serde(default)]
    pub docs: Vec<Episode>,
    pub pages: u32,
    /// Declared number of episodes across all pages.
    pub total: u32,
}

/// A page image reference inside an episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    pub url: String,
}
