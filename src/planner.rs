//! Chapter fetch planning.
//!
//! Drains a comic's paginated episode listing, checks it against the declared
//! total and diffs it against the ledger. An inconsistent listing is abandoned
//! for this run rather than partially downloaded.

use tracing::{debug, error, info, instrument};

use crate::catalog::{Catalog, CatalogError, Episode};
use crate::ledger::{LedgerRepository, Result};

/// Collects every episode of a comic, sorted ascending by `order`.
///
/// Page 1 is fetched first to learn the page count and declared total, then
/// the remaining pages from last to second. Returns an empty list, after
/// logging why, when a page fails or the collected count differs from the
/// declared total.
#[instrument(skip(catalog))]
pub async fn collect_episodes(catalog: &dyn Catalog, comic_id: &str, title: &str) -> Vec<Episode> {
    match drain_episode_pages(catalog, comic_id).await {
        Ok((episodes, declared_total)) if episodes.len() == declared_total as usize => episodes,
        Ok((episodes, declared_total)) => {
            error!(
                comic_id,
                title,
                expected = declared_total,
                actual = episodes.len(),
                "episode count mismatch, skipping comic this run"
            );
            Vec::new()
        }
        Err(e) => {
            error!(comic_id, title, error = %e, "failed to list episodes");
            Vec::new()
        }
    }
}

async fn drain_episode_pages(
    catalog: &dyn Catalog,
    comic_id: &str,
) -> std::result::Result<(Vec<Episode>, u32), CatalogError> {
    let first = catalog.list_episodes(comic_id, 1).await?;
    let declared_total = first.total;
    let mut episodes = first.docs;

    for page in (2..=first.pages).rev() {
        episodes.extend(catalog.list_episodes(comic_id, page).await?.docs);
    }
    episodes.sort_by_key(|episode| episode.order);

    debug!(
        pages = first.pages,
        collected = episodes.len(),
        declared_total,
        "episode pages drained"
    );
    Ok((episodes, declared_total))
}

/// Returns the episodes of a comic that still need downloading, in `order`.
///
/// An untracked comic needs every episode. For a tracked comic, episodes whose
/// title is already in the ledger's downloaded set are left out.
///
/// # Errors
///
/// Propagates ledger read failures.
#[instrument(skip(catalog, ledger))]
pub async fn plan_chapters(
    catalog: &dyn Catalog,
    ledger: &dyn LedgerRepository,
    comic_id: &str,
    title: &str,
) -> Result<Vec<Episode>> {
    let episodes = collect_episodes(catalog, comic_id, title).await;
    if episodes.is_empty() {
        return Ok(episodes);
    }

    if !ledger.is_comic_tracked(comic_id).await? {
        debug!(count = episodes.len(), "comic untracked, every episode pending");
        return Ok(episodes);
    }

    let mut pending = Vec::with_capacity(episodes.len());
    for episode in episodes {
        if ledger.is_chapter_downloaded(comic_id, &episode.title).await? {
            continue;
        }
        pending.push(episode);
    }

    if pending.is_empty() {
        debug!("no new chapters");
    } else {
        info!(count = pending.len(), title, "new chapters pending");
    }
    Ok(pending)
}
