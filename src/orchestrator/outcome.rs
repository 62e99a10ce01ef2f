//! Per-comic outcomes and run totals.

/// Terminal state of one comic in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComicOutcome {
    /// Untracked and nothing to download; the ledger was not touched.
    Skipped,
    /// Pending chapters were attempted and metadata refreshed.
    Completed {
        /// Chapters recorded in the ledger this run.
        chapters_downloaded: usize,
        /// Chapters left unrecorded (failed images or no images).
        chapters_incomplete: usize,
        /// True if the retention policy unfavorited the comic.
        unfavorited: bool,
    },
    /// An error ended this comic's processing.
    Failed,
}

/// Counts for one traversal pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub comics: usize,
    pub skipped: usize,
    pub completed: usize,
    pub failed: usize,
    pub chapters_downloaded: usize,
    pub chapters_incomplete: usize,
    pub unfavorited: usize,
}

impl PassSummary {
    pub(crate) fn record(&mut self, outcome: ComicOutcome) {
        self.comics += 1;
        match outcome {
            ComicOutcome::Skipped => self.skipped += 1,
            ComicOutcome::Failed => self.failed += 1,
            ComicOutcome::Completed {
                chapters_downloaded,
                chapters_incomplete,
                unfavorited,
            } => {
                self.completed += 1;
                self.chapters_downloaded += chapters_downloaded;
                self.chapters_incomplete += chapters_incomplete;
                self.unfavorited += usize::from(unfavorited);
            }
        }
    }
}

/// Totals for a full run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub favorites: PassSummary,
    pub search: PassSummary,
}

impl RunSummary {
    #[must_use]
    pub fn chapters_downloaded(&self) -> usize {
        self.favorites.chapters_downloaded + self.search.chapters_downloaded
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.favorites.failed + self.search.failed
    }
}
