//! Incremental keyword search collection.
//!
//! Results arrive newest first. Collection stops at the title remembered from
//! the previous run, so each run only picks up comics published since.

use tracing::{debug, info, instrument};

use crate::catalog::{Catalog, CatalogError, ComicSummary};

/// Comics collected for one keyword.
#[derive(Debug, Clone, Default)]
pub struct SearchBatch {
    /// New comics, newest first, with excluded categories removed.
    pub comics: Vec<ComicSummary>,
    /// First title of page 1; becomes the keyword's next marker.
    pub newest_title: Option<String>,
}

/// Pages through search results for `keyword` up to `page_cap` pages.
///
/// Stops at the first comic titled `marker`. Comics with a category in
/// `excluded` are dropped, but still count toward finding the marker.
///
/// # Errors
///
/// Propagates the first catalog error.
#[instrument(skip(catalog, excluded))]
pub async fn collect_search_results(
    catalog: &dyn Catalog,
    keyword: &str,
    marker: Option<&str>,
    page_cap: u32,
    excluded: &[String],
) -> Result<SearchBatch, CatalogError> {
    let mut batch = SearchBatch::default();

    'pages: for page in 1..=page_cap {
        let result = catalog.search_comics(keyword, page).await?;
        if page == 1 {
            batch.newest_title = result.docs.first().map(|comic| comic.title.clone());
        }

        for comic in result.docs {
            if marker == Some(comic.title.as_str()) {
                debug!(page, title = %comic.title, "reached previous search marker");
                break 'pages;
            }
            if comic.has_category_in(excluded) {
                debug!(title = %comic.title, "filtered by category");
                continue;
            }
            batch.comics.push(comic);
        }

        if page >= result.pages {
            break;
        }
    }

    info!(keyword, collected = batch.comics.len(), "search collected");
    Ok(batch)
}
