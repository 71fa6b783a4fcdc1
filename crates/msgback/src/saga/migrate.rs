//! The per-document migration saga.
//!
//! Each selected document runs through download → convert → upload-all →
//! link-all → finalize. The remote calls are independent, so the sequence is
//! made to behave as if atomic by compensation: from the first successful
//! upload onward, any failure deletes the derived documents created so far
//! before the saga reports the document as failed.

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::convert::{extract_mail_timestamp, Converter};
use crate::ledger::{FailureCategory, RunLedger};
use crate::metadata;
use crate::staging::Staging;
use crate::store::{
    DocumentFields, DocumentLink, NewDocumentLink, RemoteStore, SourceDocument, VersionUpload,
};

use super::{BatchError, StepFailure};

/// Outcome counts for one migration batch.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub migrated: usize,
    pub failed: usize,
}

enum SagaFailure {
    /// Per-document failure; recorded and skipped.
    Step(StepFailure),
    /// Batch-fatal condition.
    Fatal(BatchError),
}

/// Runs the migration sequence for each selected document, strictly one
/// document at a time.
pub struct MigrationSaga<'a> {
    store: &'a dyn RemoteStore,
    converter: &'a dyn Converter,
    staging: &'a Staging,
    ledger: &'a RunLedger,
}

impl<'a> MigrationSaga<'a> {
    pub fn new(
        store: &'a dyn RemoteStore,
        converter: &'a dyn Converter,
        staging: &'a Staging,
        ledger: &'a RunLedger,
    ) -> Self {
        Self {
            store,
            converter,
            staging,
            ledger,
        }
    }

    /// Processes the documents in order. A failed document is recorded to the
    /// ledger and skipped; only a compensation failure aborts the batch.
    pub async fn run(&self, documents: &[SourceDocument]) -> Result<BatchReport, BatchError> {
        if documents.is_empty() {
            info!("There are no message documents to migrate");
            return Ok(BatchReport::default());
        }

        let mut report = BatchReport::default();
        for document in documents {
            match self.migrate_document(document).await {
                Ok(()) => {
                    info!(document = %document.id, "finalized");
                    report.migrated += 1;
                }
                Err(SagaFailure::Step(failure)) => {
                    error!(
                        document = %failure.document_id,
                        category = %failure.category,
                        "{}",
                        failure.detail
                    );
                    self.ledger
                        .record(failure.category, &failure.document_id, &failure.detail);
                    report.failed += 1;
                }
                Err(SagaFailure::Fatal(batch_error)) => {
                    error!("{}", batch_error);
                    if let BatchError::CompensationFailed {
                        document_id,
                        detail,
                        ..
                    } = &batch_error
                    {
                        self.ledger
                            .record(FailureCategory::Compensation, document_id, detail);
                    }
                    return Err(batch_error);
                }
            }
        }
        Ok(report)
    }

    async fn migrate_document(&self, document: &SourceDocument) -> Result<(), SagaFailure> {
        // Selection guarantees a binary locator; a document slipping through
        // without one is excluded the same way selection would have.
        let Some(locator) = document.latest_version_data.as_deref() else {
            return Err(step(
                document,
                FailureCategory::MissingBinary,
                "no binary version locator",
            ));
        };

        let binary_path = self
            .staging
            .binary_path(&document.id, &document.file_extension);
        let extraction_dir = self.staging.extraction_dir(&document.id);

        info!(document = %document.id, "downloading");
        self.store
            .download_version_binary(locator, &binary_path)
            .await
            .map_err(|e| step(document, FailureCategory::Fetch, e.to_string()))?;

        info!(document = %document.id, "extracting");
        self.converter
            .convert(&binary_path, &extraction_dir)
            .map_err(|e| step(document, FailureCategory::Convert, e.to_string()))?;

        // The finalized title carries the message date when one can be
        // recovered from the extracted body text.
        let timestamp = extract_mail_timestamp(&extraction_dir);
        if timestamp.is_none() {
            warn!(document = %document.id, "no usable message date in extracted body");
        }

        let files = self
            .staging
            .extracted_files(&document.id)
            .map_err(|e| step(document, FailureCategory::Convert, e.to_string()))?;

        let mut version_ids: Vec<String> = Vec::new();
        let result = self
            .create_derived_documents(document, &files, timestamp.as_deref(), &mut version_ids)
            .await;

        if let Err(failure) = result {
            self.compensate(document, &version_ids).await?;
            return Err(SagaFailure::Step(failure));
        }

        // The document is already finalized; leftover staging files only get
        // logged.
        self.staging
            .cleanup_document(&document.id, &document.file_extension);
        Ok(())
    }

    /// Uploads every extracted file, links the derived documents to the
    /// parent's share set, and finalizes the parent's metadata. Created
    /// version ids are pushed into `version_ids` as they are allocated so the
    /// caller can compensate a partial failure.
    async fn create_derived_documents(
        &self,
        document: &SourceDocument,
        files: &[PathBuf],
        timestamp: Option<&str>,
        version_ids: &mut Vec<String>,
    ) -> Result<(), StepFailure> {
        for file in files {
            info!(document = %document.id, file = %file.display(), "uploading");
            let upload = build_upload(document, file, timestamp)
                .map_err(|e| step_failure(document, FailureCategory::Upload, e))?;
            let version_id = self
                .store
                .upload_version(&upload)
                .await
                .map_err(|e| step_failure(document, FailureCategory::Upload, e.to_string()))?;
            version_ids.push(version_id);
        }

        let derived_ids = self
            .store
            .document_ids_for_versions(version_ids)
            .await
            .map_err(|e| step_failure(document, FailureCategory::Link, e.to_string()))?;
        let parent_links = self
            .store
            .document_links(&document.id)
            .await
            .map_err(|e| step_failure(document, FailureCategory::Link, e.to_string()))?;

        for derived_id in &derived_ids {
            let links = link_records(derived_id, &parent_links, self.store.user_id());
            if links.is_empty() {
                continue;
            }
            info!(document = %document.id, derived = %derived_id, "creating links");
            self.store
                .create_links(&links)
                .await
                .map_err(|e| step_failure(document, FailureCategory::Link, e.to_string()))?;
        }

        info!(document = %document.id, "updating source document");
        let fields = DocumentFields {
            title: Some(metadata::mark_title(&document.title, timestamp)),
            description: Some(metadata::encode_description(&derived_ids)),
        };
        self.store
            .update_document(&document.id, &fields)
            .await
            .map_err(|e| step_failure(document, FailureCategory::Finalize, e.to_string()))?;

        Ok(())
    }

    /// Deletes the derived documents created so far for `document`. A failure
    /// here leaves orphans in the store and aborts the whole batch.
    async fn compensate(
        &self,
        document: &SourceDocument,
        version_ids: &[String],
    ) -> Result<(), SagaFailure> {
        if version_ids.is_empty() {
            return Ok(());
        }

        warn!(
            document = %document.id,
            "rolling back {} derived documents",
            version_ids.len()
        );

        let rollback = async {
            let derived_ids = self.store.document_ids_for_versions(version_ids).await?;
            self.store.delete_documents(&derived_ids).await?;
            Ok::<_, crate::store::StoreError>(())
        };

        match rollback.await {
            Ok(()) => {
                info!(document = %document.id, "rollback complete");
                Ok(())
            }
            Err(e) => Err(SagaFailure::Fatal(BatchError::CompensationFailed {
                document_id: document.id.clone(),
                detail: e.to_string(),
                orphaned_versions: version_ids.to_vec(),
            })),
        }
    }
}

/// Builds the upload payload for one extracted file. The parent's identity is
/// embedded in the derived document's description.
fn build_upload(
    document: &SourceDocument,
    file: &Path,
    timestamp: Option<&str>,
) -> Result<VersionUpload, String> {
    let data = std::fs::read(file)
        .map_err(|e| format!("failed to read extracted file '{}': {}", file.display(), e))?;

    let stem = file
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("extracted");
    let title = match timestamp {
        Some(ts) => format!("{} - {}", ts, stem),
        None => stem.to_string(),
    };

    Ok(VersionUpload {
        title,
        description: serde_json::json!({ "msgId": document.id }).to_string(),
        path_on_client: file.display().to_string(),
        data,
    })
}

/// The link records to copy onto one derived document: the parent's share set
/// minus the acting user's own entry.
fn link_records(
    derived_id: &str,
    parent_links: &[DocumentLink],
    acting_user: &str,
) -> Vec<NewDocumentLink> {
    parent_links
        .iter()
        .filter(|link| link.linked_entity_id != acting_user)
        .map(|link| NewDocumentLink {
            content_document_id: derived_id.to_string(),
            linked_entity_id: link.linked_entity_id.clone(),
            share_type: link.share_type.clone(),
            visibility: link.visibility.clone(),
        })
        .collect()
}

fn step_failure(
    document: &SourceDocument,
    category: FailureCategory,
    detail: impl Into<String>,
) -> StepFailure {
    StepFailure {
        document_id: document.id.clone(),
        category,
        detail: detail.into(),
    }
}

fn step(
    document: &SourceDocument,
    category: FailureCategory,
    detail: impl Into<String>,
) -> SagaFailure {
    SagaFailure::Step(step_failure(document, category, detail))
}
