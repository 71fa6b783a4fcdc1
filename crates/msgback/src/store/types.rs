//! Record shapes exchanged with the document store.

use serde::Serialize;

/// A remote document holding an original message binary.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub id: String,
    pub title: String,
    pub file_extension: String,
    /// Id of the latest published version, when one exists.
    pub latest_version_id: Option<String>,
    /// Server-relative locator of the latest published binary.
    pub latest_version_data: Option<String>,
}

impl SourceDocument {
    /// True when the latest published version carries a retrievable binary.
    pub fn has_binary(&self) -> bool {
        self.latest_version_id.is_some() && self.latest_version_data.is_some()
    }
}

/// A finalized document as returned by the reversal query.
#[derive(Debug, Clone)]
pub struct FinalizedDocument {
    pub id: String,
    pub title: String,
    pub description: String,
}

/// One sharing entry of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLink {
    pub linked_entity_id: String,
    pub share_type: String,
    pub visibility: String,
}

/// A sharing entry to create on a newly derived document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewDocumentLink {
    pub content_document_id: String,
    pub linked_entity_id: String,
    pub share_type: String,
    pub visibility: String,
}

/// Payload for uploading one extracted file as a new document version.
#[derive(Debug, Clone)]
pub struct VersionUpload {
    pub title: String,
    pub description: String,
    pub path_on_client: String,
    pub data: Vec<u8>,
}

/// Metadata update applied to a document. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct DocumentFields {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_binary_requires_both_fields() {
        let mut document = SourceDocument {
            id: "A1".to_string(),
            title: "invoice.msg".to_string(),
            file_extension: "msg".to_string(),
            latest_version_id: Some("V1".to_string()),
            latest_version_data: Some("/versions/V1/data".to_string()),
        };
        assert!(document.has_binary());

        document.latest_version_data = None;
        assert!(!document.has_binary());

        document.latest_version_data = Some("/versions/V1/data".to_string());
        document.latest_version_id = None;
        assert!(!document.has_binary());
    }

    #[test]
    fn test_new_link_serializes_store_field_names() {
        let link = NewDocumentLink {
            content_document_id: "D1".to_string(),
            linked_entity_id: "U2".to_string(),
            share_type: "V".to_string(),
            visibility: "AllUsers".to_string(),
        };
        let json = serde_json::to_value(&link).unwrap();
        assert_eq!(json["ContentDocumentId"], "D1");
        assert_eq!(json["LinkedEntityId"], "U2");
        assert_eq!(json["ShareType"], "V");
        assert_eq!(json["Visibility"], "AllUsers");
    }
}
