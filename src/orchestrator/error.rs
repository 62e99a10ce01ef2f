//! Errors that end processing of a single comic.

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::download::PoolError;
use crate::ledger::LedgerError;
use crate::retention::RetentionError;

/// A failure inside one comic's processing, or a run-fatal failure.
///
/// Only authentication failures abort the run; see [`OrchestratorError::is_fatal`].
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Retention(#[from] RetentionError),
}

impl OrchestratorError {
    /// True for errors that must stop the whole run.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Catalog(error) => error.is_auth(),
            Self::Pool(PoolError::Closed) => true,
            _ => false,
        }
    }
}
