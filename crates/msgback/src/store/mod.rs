//! Remote document store client.

mod error;
mod rest;
mod types;

pub use error::{Result, StoreError};
pub use rest::{RestStore, StoreCredentials};
pub use types::{
    DocumentFields, DocumentLink, FinalizedDocument, NewDocumentLink, SourceDocument,
    VersionUpload,
};

use std::path::Path;

use async_trait::async_trait;

/// Operations the sagas need from the document store.
///
/// Calls are issued one at a time and awaited before the next; implementations
/// do not need to coordinate concurrent writers.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Message documents with the given file extension. Implementations may
    /// pre-filter obviously finalized titles; callers still apply the marker
    /// check themselves.
    async fn list_message_documents(&self, extension: &str) -> Result<Vec<SourceDocument>>;

    /// Documents already finalized by a previous migration run.
    async fn list_finalized_documents(&self, extension: &str) -> Result<Vec<FinalizedDocument>>;

    /// Downloads the binary behind a server-relative locator into `dest`.
    async fn download_version_binary(&self, locator: &str, dest: &Path) -> Result<()>;

    /// Uploads one extracted file as a new document version and returns the
    /// created version id.
    async fn upload_version(&self, upload: &VersionUpload) -> Result<String>;

    /// Resolves version ids to their owning document ids, preserving order.
    async fn document_ids_for_versions(&self, version_ids: &[String]) -> Result<Vec<String>>;

    /// Sharing entries of a document.
    async fn document_links(&self, document_id: &str) -> Result<Vec<DocumentLink>>;

    /// Creates sharing entries.
    async fn create_links(&self, links: &[NewDocumentLink]) -> Result<()>;

    /// Updates title/description metadata of a document.
    async fn update_document(&self, document_id: &str, fields: &DocumentFields) -> Result<()>;

    /// Deletes documents by id.
    async fn delete_documents(&self, document_ids: &[String]) -> Result<()>;

    /// Id of the authenticated user acting on the store.
    fn user_id(&self) -> &str;
}
