//! Shared test doubles: an in-memory document store and a scripted converter.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use msgback::convert::{ConvertError, Converter};
use msgback::metadata;
use msgback::store::{
    DocumentFields, DocumentLink, FinalizedDocument, NewDocumentLink, RemoteStore, SourceDocument,
    StoreError, VersionUpload,
};

/// One remote document held by the mock store.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub id: String,
    pub title: String,
    pub file_extension: String,
    pub description: String,
    pub latest_version_id: Option<String>,
    pub latest_version_data: Option<String>,
    pub links: Vec<DocumentLink>,
}

#[derive(Default)]
struct StoreState {
    documents: Vec<StoredDocument>,
    /// Binary locator -> content.
    binaries: HashMap<String, Vec<u8>>,
    /// Version id -> owning document id.
    versions: HashMap<String, String>,
    next_id: u32,
    uploads: u32,
    link_batches: u32,
}

/// In-memory store with per-operation failure injection.
#[derive(Default)]
pub struct MockStore {
    state: Mutex<StoreState>,
    /// Fail the Nth upload of the run (1-based).
    pub fail_upload_at: Option<u32>,
    /// Fail the Nth link batch of the run (1-based).
    pub fail_link_at: Option<u32>,
    /// Fail metadata updates for this document id.
    pub fail_update_for: Option<String>,
    /// Fail every delete call.
    pub fail_delete: bool,
    /// Fail every binary download.
    pub fail_download: bool,
}

pub const ACTING_USER: &str = "USER1";

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an unprocessed message document with a downloadable binary and
    /// the given share set.
    pub fn add_message_document(
        &self,
        id: &str,
        title: &str,
        locator: &str,
        binary: &[u8],
        links: Vec<DocumentLink>,
    ) {
        let mut state = self.state.lock().unwrap();
        let version_id = format!("SRCV_{}", id);
        state.binaries.insert(locator.to_string(), binary.to_vec());
        state.documents.push(StoredDocument {
            id: id.to_string(),
            title: title.to_string(),
            file_extension: "msg".to_string(),
            description: String::new(),
            latest_version_id: Some(version_id),
            latest_version_data: Some(locator.to_string()),
            links,
        });
    }

    /// Seeds a message document whose latest version has no binary.
    pub fn add_document_without_binary(&self, id: &str, title: &str) {
        let mut state = self.state.lock().unwrap();
        state.documents.push(StoredDocument {
            id: id.to_string(),
            title: title.to_string(),
            file_extension: "msg".to_string(),
            description: String::new(),
            latest_version_id: None,
            latest_version_data: None,
            links: Vec::new(),
        });
    }

    /// Seeds an already finalized document plus its derived documents.
    pub fn add_finalized_document(
        &self,
        id: &str,
        title: &str,
        description: &str,
        derived_ids: &[&str],
    ) {
        let mut state = self.state.lock().unwrap();
        state.documents.push(StoredDocument {
            id: id.to_string(),
            title: title.to_string(),
            file_extension: "msg".to_string(),
            description: description.to_string(),
            latest_version_id: None,
            latest_version_data: None,
            links: Vec::new(),
        });
        for derived_id in derived_ids {
            state.documents.push(StoredDocument {
                id: derived_id.to_string(),
                title: format!("derived {}", derived_id),
                file_extension: "txt".to_string(),
                description: String::new(),
                latest_version_id: None,
                latest_version_data: None,
                links: Vec::new(),
            });
        }
    }

    pub fn document(&self, id: &str) -> Option<StoredDocument> {
        self.state
            .lock()
            .unwrap()
            .documents
            .iter()
            .find(|d| d.id == id)
            .cloned()
    }

    pub fn document_exists(&self, id: &str) -> bool {
        self.document(id).is_some()
    }

    pub fn document_count(&self) -> usize {
        self.state.lock().unwrap().documents.len()
    }

    /// Documents created by uploads during the test.
    pub fn derived_documents(&self) -> Vec<StoredDocument> {
        let state = self.state.lock().unwrap();
        let derived: std::collections::HashSet<_> = state.versions.values().cloned().collect();
        state
            .documents
            .iter()
            .filter(|d| derived.contains(&d.id))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RemoteStore for MockStore {
    async fn list_message_documents(&self, extension: &str) -> Result<Vec<SourceDocument>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .documents
            .iter()
            .filter(|d| d.file_extension == extension)
            .map(|d| SourceDocument {
                id: d.id.clone(),
                title: d.title.clone(),
                file_extension: d.file_extension.clone(),
                latest_version_id: d.latest_version_id.clone(),
                latest_version_data: d.latest_version_data.clone(),
            })
            .collect())
    }

    async fn list_finalized_documents(
        &self,
        extension: &str,
    ) -> Result<Vec<FinalizedDocument>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .documents
            .iter()
            .filter(|d| d.file_extension == extension && metadata::is_marked(&d.title))
            .map(|d| FinalizedDocument {
                id: d.id.clone(),
                title: d.title.clone(),
                description: d.description.clone(),
            })
            .collect())
    }

    async fn download_version_binary(&self, locator: &str, dest: &Path) -> Result<(), StoreError> {
        if self.fail_download {
            return Err(StoreError::Transport("injected download failure".to_string()));
        }
        let bytes = {
            let state = self.state.lock().unwrap();
            state.binaries.get(locator).cloned()
        };
        match bytes {
            Some(bytes) => {
                std::fs::write(dest, bytes)?;
                Ok(())
            }
            None => Err(StoreError::Transport(format!(
                "no binary at '{}'",
                locator
            ))),
        }
    }

    async fn upload_version(&self, upload: &VersionUpload) -> Result<String, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.uploads += 1;
        if self.fail_upload_at == Some(state.uploads) {
            return Err(StoreError::Rejected {
                status: 500,
                body: "injected upload failure".to_string(),
            });
        }

        state.next_id += 1;
        let version_id = format!("V{}", state.next_id);
        let document_id = format!("D{}", state.next_id);
        let file_extension = upload
            .path_on_client
            .rsplit('.')
            .next()
            .unwrap_or("bin")
            .to_string();

        state.documents.push(StoredDocument {
            id: document_id.clone(),
            title: upload.title.clone(),
            file_extension,
            description: upload.description.clone(),
            latest_version_id: Some(version_id.clone()),
            latest_version_data: None,
            links: Vec::new(),
        });
        state.versions.insert(version_id.clone(), document_id);
        Ok(version_id)
    }

    async fn document_ids_for_versions(
        &self,
        version_ids: &[String],
    ) -> Result<Vec<String>, StoreError> {
        let state = self.state.lock().unwrap();
        version_ids
            .iter()
            .map(|version_id| {
                state.versions.get(version_id).cloned().ok_or_else(|| {
                    StoreError::UnexpectedResponse(format!(
                        "no document for version '{}'",
                        version_id
                    ))
                })
            })
            .collect()
    }

    async fn document_links(&self, document_id: &str) -> Result<Vec<DocumentLink>, StoreError> {
        let state = self.state.lock().unwrap();
        state
            .documents
            .iter()
            .find(|d| d.id == document_id)
            .map(|d| d.links.clone())
            .ok_or_else(|| {
                StoreError::UnexpectedResponse(format!("no such document '{}'", document_id))
            })
    }

    async fn create_links(&self, links: &[NewDocumentLink]) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.link_batches += 1;
        if self.fail_link_at == Some(state.link_batches) {
            return Err(StoreError::Rejected {
                status: 500,
                body: "injected link failure".to_string(),
            });
        }

        for link in links {
            let document = state
                .documents
                .iter_mut()
                .find(|d| d.id == link.content_document_id)
                .ok_or_else(|| {
                    StoreError::UnexpectedResponse(format!(
                        "no such document '{}'",
                        link.content_document_id
                    ))
                })?;
            document.links.push(DocumentLink {
                linked_entity_id: link.linked_entity_id.clone(),
                share_type: link.share_type.clone(),
                visibility: link.visibility.clone(),
            });
        }
        Ok(())
    }

    async fn update_document(
        &self,
        document_id: &str,
        fields: &DocumentFields,
    ) -> Result<(), StoreError> {
        if self.fail_update_for.as_deref() == Some(document_id) {
            return Err(StoreError::Rejected {
                status: 500,
                body: "injected update failure".to_string(),
            });
        }

        let mut state = self.state.lock().unwrap();
        let document = state
            .documents
            .iter_mut()
            .find(|d| d.id == document_id)
            .ok_or_else(|| {
                StoreError::UnexpectedResponse(format!("no such document '{}'", document_id))
            })?;

        if let Some(title) = &fields.title {
            document.title = title.clone();
        }
        if let Some(description) = &fields.description {
            document.description = description.clone();
        }
        Ok(())
    }

    async fn delete_documents(&self, document_ids: &[String]) -> Result<(), StoreError> {
        if self.fail_delete {
            return Err(StoreError::Rejected {
                status: 500,
                body: "injected delete failure".to_string(),
            });
        }

        let mut state = self.state.lock().unwrap();
        for document_id in document_ids {
            if !state.documents.iter().any(|d| &d.id == document_id) {
                return Err(StoreError::UnexpectedResponse(format!(
                    "no such document '{}'",
                    document_id
                )));
            }
        }
        state.documents.retain(|d| !document_ids.contains(&d.id));
        state.versions.retain(|_, doc| !document_ids.contains(doc));
        Ok(())
    }

    fn user_id(&self) -> &str {
        ACTING_USER
    }
}

/// Converter that writes a fixed set of files into the extraction directory.
pub struct MockConverter {
    pub files: Vec<(String, Vec<u8>)>,
    pub fail: bool,
}

impl MockConverter {
    /// The body text plus one attachment, with a parsable message date.
    pub fn two_files() -> Self {
        Self {
            files: vec![
                (
                    "Email.txt".to_string(),
                    b"From: Alice <alice@example.com>\nSubject: Invoice\n\
                      Date: Mon, 06 Jan 2020 10:32:00 +0100\n\nPlease see attached."
                        .to_vec(),
                ),
                ("attachment.pdf".to_string(), b"%PDF-".to_vec()),
            ],
            fail: false,
        }
    }

    /// A single body file without a usable message date.
    pub fn undated_body() -> Self {
        Self {
            files: vec![(
                "Email.txt".to_string(),
                b"Subject: Invoice\n\nNo date header here.".to_vec(),
            )],
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            files: Vec::new(),
            fail: true,
        }
    }
}

impl Converter for MockConverter {
    fn convert(&self, _binary_path: &Path, out_dir: &Path) -> Result<(), ConvertError> {
        if self.fail {
            return Err(ConvertError::Malformed("injected convert failure".to_string()));
        }
        std::fs::create_dir_all(out_dir).map_err(|e| ConvertError::WriteExtracted {
            path: out_dir.to_path_buf(),
            source: e,
        })?;
        for (name, content) in &self.files {
            let path = out_dir.join(name);
            std::fs::write(&path, content).map_err(|e| ConvertError::WriteExtracted {
                path: path.clone(),
                source: e,
            })?;
        }
        Ok(())
    }
}

/// The share set used by most tests: the acting user plus two other entities.
pub fn default_links() -> Vec<DocumentLink> {
    vec![
        DocumentLink {
            linked_entity_id: ACTING_USER.to_string(),
            share_type: "I".to_string(),
            visibility: "InternalUsers".to_string(),
        },
        DocumentLink {
            linked_entity_id: "GROUP1".to_string(),
            share_type: "V".to_string(),
            visibility: "AllUsers".to_string(),
        },
        DocumentLink {
            linked_entity_id: "USER2".to_string(),
            share_type: "V".to_string(),
            visibility: "AllUsers".to_string(),
        },
    ]
}
