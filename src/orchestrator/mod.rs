//! Run orchestrator: favorites pass, then keyword search pass.
//!
//! Comics are processed one at a time and chapters in ascending `order`;
//! only image fetches run concurrently, inside the shared [`ImagePool`].
//! Per comic the flow is:
//!
//! ```text
//! plan chapters ─┬─ nothing pending, untracked ─────────────────────────► Skipped
//!                └─ track ─► fetch chapters ─► refresh metadata ─► retention ─► Completed
//! ```
//!
//! Any error inside a comic marks it `Failed` and the run moves on; only
//! authentication failures abort the run.

mod error;
mod outcome;
mod search;

pub use error::OrchestratorError;
pub use outcome::{ComicOutcome, PassSummary, RunSummary};
pub use search::{SearchBatch, collect_search_results};

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};

use crate::catalog::{Catalog, ComicDetail, ComicSummary, favorites_all, page_image_urls};
use crate::config::Settings;
use crate::download::{ImageClient, ImagePool, chapter_dir, comic_dir};
use crate::ledger::{ComicMetadata, LedgerRepository};
use crate::planner::plan_chapters;
use crate::retention::{RetentionDecision, RetentionPolicy};

/// Behavior knobs for a run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Root of the comic tree.
    pub output_dir: PathBuf,
    /// Search keywords, processed in order.
    pub keywords: Vec<String>,
    /// Categories dropped from search results.
    pub excluded_categories: Vec<String>,
    /// Max search pages per keyword.
    pub search_page_cap: u32,
    pub retention: RetentionPolicy,
    /// Pause after each fetched chapter.
    pub chapter_delay: Duration,
    /// Log each chapter at info level.
    pub detail_logging: bool,
}

impl RunOptions {
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        let download = &settings.download;
        Self {
            output_dir: settings.storage.output_dir.clone(),
            keywords: download.key_world.clone(),
            excluded_categories: download.filter.clone(),
            search_page_cap: download.page,
            retention: RetentionPolicy::new(download.remove_favorites, download.out_time_day),
            chapter_delay: download.chapter_delay(),
            detail_logging: download.is_detail,
        }
    }
}

/// Drives one complete run.
pub struct Orchestrator {
    catalog: Arc<dyn Catalog>,
    ledger: Arc<dyn LedgerRepository>,
    pool: ImagePool,
    images: ImageClient,
    options: RunOptions,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        catalog: Arc<dyn Catalog>,
        ledger: Arc<dyn LedgerRepository>,
        pool: ImagePool,
        images: ImageClient,
        options: RunOptions,
    ) -> Self {
        Self {
            catalog,
            ledger,
            pool,
            images,
            options,
        }
    }

    /// Runs the favorites pass then the search pass, and closes the pool.
    ///
    /// # Errors
    ///
    /// Returns an error only for run-fatal failures (authentication).
    pub async fn run(self) -> Result<RunSummary, OrchestratorError> {
        let result = self.run_passes().await;
        self.pool.close();
        result
    }

    async fn run_passes(&self) -> Result<RunSummary, OrchestratorError> {
        let mut summary = RunSummary::default();
        let mut processed = HashSet::new();

        self.favorites_pass(&mut summary.favorites, &mut processed)
            .await?;
        info!(
            comics = summary.favorites.comics,
            completed = summary.favorites.completed,
            skipped = summary.favorites.skipped,
            failed = summary.favorites.failed,
            "favorites pass finished"
        );

        self.search_pass(&mut summary.search, &mut processed).await?;
        info!(
            comics = summary.search.comics,
            completed = summary.search.completed,
            skipped = summary.search.skipped,
            failed = summary.search.failed,
            "search pass finished"
        );

        Ok(summary)
    }

    async fn favorites_pass(
        &self,
        pass: &mut PassSummary,
        processed: &mut HashSet<String>,
    ) -> Result<(), OrchestratorError> {
        let favorites = match favorites_all(self.catalog.as_ref()).await {
            Ok(favorites) => favorites,
            Err(e) if e.is_auth() => return Err(e.into()),
            Err(e) => {
                error!(error = %e, "failed to list favorites");
                return Ok(());
            }
        };
        info!(count = favorites.len(), "favorites listed");

        for comic in &favorites {
            if !processed.insert(comic.id.clone()) {
                continue;
            }
            let outcome = self.handle_comic(comic).await?;
            pass.record(outcome);
        }
        Ok(())
    }

    async fn search_pass(
        &self,
        pass: &mut PassSummary,
        processed: &mut HashSet<String>,
    ) -> Result<(), OrchestratorError> {
        for keyword in &self.options.keywords {
            let comics = match self.collect_keyword(keyword, processed).await {
                Ok(comics) => comics,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    error!(keyword, error = %e, "search failed");
                    continue;
                }
            };

            for comic in &comics {
                if !processed.insert(comic.id.clone()) {
                    debug!(title = %comic.title, "already processed this run");
                    continue;
                }
                let outcome = self.handle_comic(comic).await?;
                pass.record(outcome);
            }
        }
        Ok(())
    }

    /// Collects new comics for a keyword, subscribes to them and advances the marker.
    #[instrument(skip(self, processed))]
    async fn collect_keyword(
        &self,
        keyword: &str,
        processed: &HashSet<String>,
    ) -> Result<Vec<ComicSummary>, OrchestratorError> {
        let marker = self.ledger.search_marker(keyword).await?;
        let mut batch = collect_search_results(
            self.catalog.as_ref(),
            keyword,
            marker.as_deref(),
            self.options.search_page_cap,
            &self.options.excluded_categories,
        )
        .await?;
        batch.comics.retain(|comic| !processed.contains(&comic.id));

        let mut all_subscribed = true;
        for comic in &batch.comics {
            match self.subscribe(comic).await {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    error!(title = %comic.title, error = %e, "failed to subscribe");
                    all_subscribed = false;
                }
            }
        }

        // An unsubscribed comic would be lost once the marker moves past it.
        match batch.newest_title {
            Some(newest) if all_subscribed => {
                self.ledger.set_search_marker(keyword, &newest).await?;
            }
            Some(_) => warn!(keyword, "keeping previous search marker"),
            None => {}
        }
        Ok(batch.comics)
    }

    async fn subscribe(&self, comic: &ComicSummary) -> Result<(), OrchestratorError> {
        let detail = self.catalog.fetch_comic_metadata(&comic.id).await?;
        if !detail.is_favourite {
            self.catalog.set_favorite(&comic.id).await?;
            info!(title = %comic.title, "subscribed");
        }
        Ok(())
    }

    /// Per-comic error boundary.
    async fn handle_comic(&self, comic: &ComicSummary) -> Result<ComicOutcome, OrchestratorError> {
        match self.process_comic(comic).await {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                error!(
                    comic_id = %comic.id,
                    title = %comic.title,
                    error = %e,
                    "comic failed"
                );
                Ok(ComicOutcome::Failed)
            }
        }
    }

    /// Processes one comic through its full lifecycle.
    ///
    /// # Errors
    ///
    /// Any catalog, ledger, pool or retention error ends this comic.
    #[instrument(skip(self, comic), fields(comic_id = %comic.id, title = %comic.title))]
    pub async fn process_comic(
        &self,
        comic: &ComicSummary,
    ) -> Result<ComicOutcome, OrchestratorError> {
        let pending = plan_chapters(
            self.catalog.as_ref(),
            self.ledger.as_ref(),
            &comic.id,
            &comic.title,
        )
        .await?;

        if pending.is_empty() && !self.ledger.is_comic_tracked(&comic.id).await? {
            debug!("nothing to download");
            return Ok(ComicOutcome::Skipped);
        }

        let mut chapters_downloaded = 0;
        let mut chapters_incomplete = 0;

        if !pending.is_empty() {
            self.ledger.mark_comic_tracked(&comic.id).await?;
            let root = comic_dir(&self.options.output_dir, &comic.title);
            let total = pending.len();

            for (index, episode) in pending.iter().enumerate() {
                let urls = page_image_urls(self.catalog.as_ref(), &comic.id, episode.order).await?;
                if urls.is_empty() {
                    warn!(chapter = %episode.title, "chapter has no images");
                    chapters_incomplete += 1;
                    continue;
                }

                let outcome = self
                    .pool
                    .fetch_chapter(&self.images, &urls, &chapter_dir(&root, &episode.title))
                    .await?;

                if outcome.is_complete() {
                    self.ledger
                        .record_chapter_downloaded(&comic.id, &episode.title)
                        .await?;
                    chapters_downloaded += 1;
                } else {
                    error!(
                        chapter = %episode.title,
                        succeeded = outcome.succeeded,
                        total = outcome.total,
                        failed = outcome.failed(),
                        "chapter incomplete, will retry next run"
                    );
                    chapters_incomplete += 1;
                }

                if self.options.detail_logging {
                    info!(
                        chapter = %episode.title,
                        index = index + 1,
                        total,
                        succeeded = outcome.succeeded,
                        images = outcome.total,
                        progress_pct = outcome.percent_complete(),
                        "chapter done"
                    );
                }
                tokio::time::sleep(self.options.chapter_delay).await;
            }
        }

        let detail = self.catalog.fetch_comic_metadata(&comic.id).await?;
        let unfavorited = self.apply_retention(&detail).await?;
        log_metadata(&detail);
        self.ledger
            .upsert_comic_metadata(&ComicMetadata::from(&detail))
            .await?;

        Ok(ComicOutcome::Completed {
            chapters_downloaded,
            chapters_incomplete,
            unfavorited,
        })
    }

    async fn apply_retention(&self, detail: &ComicDetail) -> Result<bool, OrchestratorError> {
        match self.options.retention.evaluate(detail, Utc::now())? {
            RetentionDecision::Keep => Ok(false),
            RetentionDecision::Unfavorite(reason) => {
                self.catalog.set_favorite(&detail.id).await?;
                info!(title = %detail.title, ?reason, "removed from favorites");
                Ok(true)
            }
        }
    }
}

fn log_metadata(detail: &ComicDetail) {
    info!(
        comic_id = %detail.id,
        title = %detail.title,
        author = %detail.author,
        finished = detail.finished,
        pages = detail.pages_count,
        categories = %detail.categories.join(","),
        episodes = detail.eps_count,
        updated_at = %detail.updated_at,
        "comic metadata"
    );
}
