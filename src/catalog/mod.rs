//! Remote comic catalog.
//!
//! The [`Catalog`] trait is the contract the orchestrator and planner consume.
//! [`SignedCatalog`] is the HTTP implementation; tests substitute in-memory
//! fakes.

mod client;
mod error;
mod signing;
mod types;

use async_trait::async_trait;

pub use client::{ApiClient, Session, SignedCatalog};
pub use error::CatalogError;
pub use signing::sign_request;
pub use types::{ComicDetail, ComicPage, ComicSummary, Episode, EpisodePage, PageImage};

/// Upper bound on page-image pages requested for one episode.
pub const MAX_IMAGE_PAGES: u32 = 1000;

/// Typed operations against the remote catalog.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// One page of the user's favorites (1-based).
    async fn list_favorites(&self, page: u32) -> Result<ComicPage, CatalogError>;

    /// One page of keyword search results, newest first.
    async fn search_comics(&self, keyword: &str, page: u32) -> Result<ComicPage, CatalogError>;

    /// One page of a comic's episodes.
    async fn list_episodes(&self, comic_id: &str, page: u32) -> Result<EpisodePage, CatalogError>;

    /// One page of an episode's images; an empty page marks the end.
    async fn list_page_images(
        &self,
        comic_id: &str,
        order: u32,
        page: u32,
    ) -> Result<Vec<PageImage>, CatalogError>;

    /// Fresh metadata for a comic.
    async fn fetch_comic_metadata(&self, comic_id: &str) -> Result<ComicDetail, CatalogError>;

    /// Toggles the comic's favorite state.
    async fn set_favorite(&self, comic_id: &str) -> Result<(), CatalogError>;
}

/// Collects every favorited comic across all pages.
///
/// # Errors
///
/// Propagates the first page error.
pub async fn favorites_all(catalog: &dyn Catalog) -> Result<Vec<ComicSummary>, CatalogError> {
    let first = catalog.list_favorites(1).await?;
    let mut comics = first.docs;
    for page in 2..=first.pages {
        comics.extend(catalog.list_favorites(page).await?.docs);
    }
    Ok(comics)
}

/// Collects an episode's image URLs in page order.
///
/// Requests pages 1, 2, ... until one comes back empty.
///
/// # Errors
///
/// Propagates the first page error. Returns
/// [`CatalogError::UnboundedListing`] if no empty page arrives within
/// [`MAX_IMAGE_PAGES`], since a cut-off list would look like a whole chapter.
pub async fn page_image_urls(
    catalog: &dyn Catalog,
    comic_id: &str,
    order: u32,
) -> Result<Vec<String>, CatalogError> {
    let mut urls = Vec::new();
    for page in 1..=MAX_IMAGE_PAGES {
        let images = catalog.list_page_images(comic_id, order, page).await?;
        if images.is_empty() {
            return Ok(urls);
        }
        urls.extend(images.into_iter().map(|image| image.url));
    }
    Err(CatalogError::UnboundedListing {
        comic_id: comic_id.to_string(),
        order,
        pages: MAX_IMAGE_PAGES,
    })
}
