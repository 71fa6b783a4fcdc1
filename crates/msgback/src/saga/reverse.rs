//! Reversal of finalized migrations.
//!
//! For every document carrying the finalized marker: delete the derived
//! documents listed in its description, then restore the pre-migration title
//! and clear the description. Deletion and restore are independent remote
//! calls; when deletion succeeds and the restore fails, the description is
//! left pointing at deleted documents. That gap is accepted — there is no
//! compensation in this direction.

use tracing::{error, info};

use crate::ledger::{FailureCategory, RunLedger};
use crate::metadata;
use crate::store::{DocumentFields, FinalizedDocument, RemoteStore, StoreError};

/// Outcome counts for one reversal run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReversalReport {
    pub reversed: usize,
    pub failed: usize,
}

/// Deletes derived documents and restores source metadata, one finalized
/// document at a time.
pub struct ReversalSaga<'a> {
    store: &'a dyn RemoteStore,
    ledger: &'a RunLedger,
}

impl<'a> ReversalSaga<'a> {
    pub fn new(store: &'a dyn RemoteStore, ledger: &'a RunLedger) -> Self {
        Self { store, ledger }
    }

    /// Reverts every finalized document. A document that cannot be reverted
    /// (unparsable description, delete failure, restore failure) is recorded
    /// to the ledger and skipped; one malformed record never aborts the rest.
    pub async fn run(&self, extension: &str) -> Result<ReversalReport, StoreError> {
        let records = self.store.list_finalized_documents(extension).await?;
        let finalized: Vec<_> = records
            .into_iter()
            .filter(|record| metadata::is_marked(&record.title))
            .collect();

        if finalized.is_empty() {
            info!("No finalized documents to revert");
            return Ok(ReversalReport::default());
        }

        let mut report = ReversalReport::default();
        for record in &finalized {
            match self.revert_document(record).await {
                Ok(()) => {
                    info!(document = %record.id, "restored");
                    report.reversed += 1;
                }
                Err(detail) => {
                    error!(document = %record.id, "reversal failed: {}", detail);
                    self.ledger
                        .record(FailureCategory::Reversal, &record.id, &detail);
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    async fn revert_document(&self, record: &FinalizedDocument) -> Result<(), String> {
        let derived_ids = metadata::parse_description(&record.description)
            .map_err(|e| format!("unparsable description '{}': {}", record.description, e))?;

        if !derived_ids.is_empty() {
            info!(
                document = %record.id,
                "deleting {} derived documents",
                derived_ids.len()
            );
            self.store
                .delete_documents(&derived_ids)
                .await
                .map_err(|e| format!("delete failed: {}", e))?;
        }

        info!(document = %record.id, "restoring metadata");
        let fields = DocumentFields {
            title: Some(metadata::strip_marker(&record.title)),
            description: Some(String::new()),
        };
        self.store
            .update_document(&record.id, &fields)
            .await
            .map_err(|e| format!("metadata restore failed: {}", e))
    }
}
