//! Per-document migration and reversal sagas.

mod migrate;
mod reverse;

pub use migrate::{BatchReport, MigrationSaga};
pub use reverse::{ReversalReport, ReversalSaga};

use thiserror::Error;

use crate::ledger::FailureCategory;
use crate::store::StoreError;

/// Failure of one step of one document's saga. The batch records it to the
/// ledger and moves on to the next document.
#[derive(Error, Debug)]
#[error("{category} failed for document {document_id}: {detail}")]
pub struct StepFailure {
    pub document_id: String,
    pub category: FailureCategory,
    pub detail: String,
}

/// Conditions that abort a whole batch.
#[derive(Error, Debug)]
pub enum BatchError {
    /// Derived documents could not be deleted after a failed saga. The store
    /// now holds orphans that no automated process will clean up, so the run
    /// must stop instead of silently accumulating more.
    #[error(
        "Compensation failed for document {document_id}: {detail} \
         (orphaned versions: {orphaned_versions:?})"
    )]
    CompensationFailed {
        document_id: String,
        detail: String,
        orphaned_versions: Vec<String>,
    },

    /// The store became unusable for the batch as a whole.
    #[error("Remote store error: {0}")]
    Store(#[from] StoreError),
}
