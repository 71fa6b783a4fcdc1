//! Selection of migration candidates.

use tracing::{debug, info};

use crate::ledger::{FailureCategory, RunLedger};
use crate::metadata;
use crate::store::{RemoteStore, Result, SourceDocument};

/// Chooses the documents eligible for migration: message documents with the
/// configured extension, not yet finalized under either marker form, with a
/// retrievable binary. Documents without a binary are excluded and recorded
/// under the missing-binary category; this is not fatal for the batch. At
/// most `cap` documents are returned when one is set.
pub async fn select_candidates(
    store: &dyn RemoteStore,
    extension: &str,
    cap: Option<usize>,
    ledger: &RunLedger,
) -> Result<Vec<SourceDocument>> {
    let records = store.list_message_documents(extension).await?;
    debug!("Store returned {} message documents", records.len());

    let mut candidates = Vec::new();
    for record in records {
        if metadata::is_marked(&record.title) {
            debug!(document = %record.id, "skipping already finalized document");
            continue;
        }
        if !record.has_binary() {
            ledger.record(
                FailureCategory::MissingBinary,
                &record.id,
                &format!("no retrievable binary version ('{}')", record.title),
            );
            continue;
        }

        candidates.push(record);
        if cap.is_some_and(|cap| candidates.len() >= cap) {
            break;
        }
    }

    info!("Selected {} candidate documents", candidates.len());
    Ok(candidates)
}
