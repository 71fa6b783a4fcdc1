//! REST client for the document store.

use std::path::Path;

use async_trait::async_trait;
use base64::Engine;
use futures_util::StreamExt;
use log::{debug, info};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;

use super::error::{Result, StoreError};
use super::types::{
    DocumentFields, DocumentLink, FinalizedDocument, NewDocumentLink, SourceDocument,
    VersionUpload,
};
use super::RemoteStore;

/// Credentials for the username-password login flow.
pub struct StoreCredentials {
    pub login_url: String,
    pub username: String,
    pub client_id: SecretString,
    pub client_secret: SecretString,
    pub password: SecretString,
    /// Appended to the password at login when present.
    pub security_token: Option<SecretString>,
}

/// Connected REST client. Holds the session token obtained at login.
pub struct RestStore {
    http: Client,
    instance_url: String,
    access_token: SecretString,
    api_version: String,
    user_id: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    instance_url: String,
    /// Identity URL; its last path segment is the acting user id.
    id: String,
}

#[derive(Deserialize)]
struct QueryResponse {
    records: Vec<Value>,
    done: bool,
    #[serde(rename = "nextRecordsUrl")]
    next_records_url: Option<String>,
}

#[derive(Deserialize)]
struct CreateResponse {
    id: String,
}

#[derive(Deserialize)]
struct OperationResult {
    success: bool,
    #[serde(default)]
    errors: Vec<Value>,
}

impl RestStore {
    /// Authenticates against the login endpoint and returns a connected
    /// client.
    pub async fn connect(credentials: &StoreCredentials, api_version: &str) -> Result<Self> {
        let http = Client::new();

        let mut password = credentials.password.expose_secret().to_string();
        if let Some(token) = &credentials.security_token {
            password.push_str(token.expose_secret());
        }

        let params = [
            ("grant_type", "password"),
            ("client_id", credentials.client_id.expose_secret()),
            ("client_secret", credentials.client_secret.expose_secret()),
            ("username", credentials.username.as_str()),
            ("password", password.as_str()),
        ];

        let login_url = format!(
            "{}/services/oauth2/token",
            credentials.login_url.trim_end_matches('/')
        );
        let response = http
            .post(&login_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| StoreError::LoginFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::LoginFailed(format!("{}: {}", status, body)));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| StoreError::LoginFailed(e.to_string()))?;

        let user_id = token
            .id
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        if user_id.is_empty() {
            return Err(StoreError::LoginFailed(format!(
                "identity URL '{}' has no user id segment",
                token.id
            )));
        }

        info!("Logged in to {} as user {}", token.instance_url, user_id);

        Ok(Self {
            http,
            instance_url: token.instance_url,
            access_token: SecretString::from(token.access_token),
            api_version: api_version.to_string(),
            user_id,
        })
    }

    fn data_url(&self, path: &str) -> String {
        format!(
            "{}/services/data/v{}/{}",
            self.instance_url, self.api_version, path
        )
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token.expose_secret())
    }

    /// Returns the response if it has a success status, otherwise maps it to
    /// a `Rejected` error carrying the body.
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Rejected {
            status: status.as_u16(),
            body,
        })
    }

    /// Runs a query, following pagination until all records are collected.
    async fn query(&self, soql: &str) -> Result<Vec<Value>> {
        debug!("Query: {}", soql);

        let mut url = self.data_url("query");
        let mut first = true;
        let mut records = Vec::new();

        loop {
            let mut request = self.http.get(&url).header("Authorization", self.bearer());
            if first {
                request = request.query(&[("q", soql)]);
            }
            let response = Self::check(request.send().await?).await?;
            let page: QueryResponse = response
                .json()
                .await
                .map_err(|e| StoreError::UnexpectedResponse(e.to_string()))?;

            records.extend(page.records);

            if page.done {
                return Ok(records);
            }
            match page.next_records_url {
                Some(next) => {
                    url = format!("{}{}", self.instance_url, next);
                    first = false;
                }
                None => {
                    return Err(StoreError::UnexpectedResponse(
                        "paginated query without nextRecordsUrl".to_string(),
                    ))
                }
            }
        }
    }

    /// Checks the per-record results of a collections call.
    fn check_results(results: &[OperationResult], operation: &str) -> Result<()> {
        for result in results {
            if !result.success {
                return Err(StoreError::UnexpectedResponse(format!(
                    "{} failed: {:?}",
                    operation, result.errors
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for RestStore {
    async fn list_message_documents(&self, extension: &str) -> Result<Vec<SourceDocument>> {
        let soql = format!(
            "SELECT Id, Title, FileExtension, \
             LatestPublishedVersion.Id, LatestPublishedVersion.VersionData \
             FROM ContentDocument \
             WHERE FileExtension = '{}' \
             AND (NOT Title LIKE 'backup_%') AND (NOT Title LIKE '%_backup')",
            extension
        );
        let records = self.query(&soql).await?;
        records.iter().map(parse_source_document).collect()
    }

    async fn list_finalized_documents(&self, extension: &str) -> Result<Vec<FinalizedDocument>> {
        let soql = format!(
            "SELECT Id, Title, Description FROM ContentDocument \
             WHERE FileExtension = '{}' \
             AND (Title LIKE 'backup_%' OR Title LIKE '%_backup')",
            extension
        );
        let records = self.query(&soql).await?;
        records
            .iter()
            .map(|record| {
                Ok(FinalizedDocument {
                    id: str_field(record, "Id")?,
                    title: str_field(record, "Title")?,
                    description: opt_str_field(record, "Description").unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn download_version_binary(&self, locator: &str, dest: &Path) -> Result<()> {
        let url = format!("{}{}", self.instance_url, locator);
        debug!("Downloading {} to {}", locator, dest.display());

        let response = self
            .http
            .get(&url)
            .header("Authorization", self.bearer())
            .send()
            .await?;
        let response = Self::check(response).await?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        if written == 0 {
            return Err(StoreError::EmptyBinary(locator.to_string()));
        }
        Ok(())
    }

    async fn upload_version(&self, upload: &VersionUpload) -> Result<String> {
        let body = json!({
            "Title": upload.title,
            "Description": upload.description,
            "PathOnClient": upload.path_on_client,
            "VersionData": base64::engine::general_purpose::STANDARD.encode(&upload.data),
        });

        let response = self
            .http
            .post(self.data_url("sobjects/ContentVersion"))
            .header("Authorization", self.bearer())
            .json(&body)
            .send()
            .await?;
        let response = Self::check(response).await?;

        let created: CreateResponse = response
            .json()
            .await
            .map_err(|e| StoreError::UnexpectedResponse(e.to_string()))?;
        Ok(created.id)
    }

    async fn document_ids_for_versions(&self, version_ids: &[String]) -> Result<Vec<String>> {
        if version_ids.is_empty() {
            return Ok(Vec::new());
        }

        let soql = format!(
            "SELECT Id, ContentDocumentId FROM ContentVersion WHERE Id IN {}",
            soql_id_list(version_ids)
        );
        let records = self.query(&soql).await?;

        // The store does not guarantee result order; re-key by version id.
        let mut by_version = std::collections::HashMap::new();
        for record in &records {
            by_version.insert(
                str_field(record, "Id")?,
                str_field(record, "ContentDocumentId")?,
            );
        }

        version_ids
            .iter()
            .map(|version_id| {
                by_version.get(version_id).cloned().ok_or_else(|| {
                    StoreError::UnexpectedResponse(format!(
                        "no document for version '{}'",
                        version_id
                    ))
                })
            })
            .collect()
    }

    async fn document_links(&self, document_id: &str) -> Result<Vec<DocumentLink>> {
        let soql = format!(
            "SELECT LinkedEntityId, ShareType, Visibility FROM ContentDocumentLink \
             WHERE ContentDocumentId = '{}'",
            document_id
        );
        let records = self.query(&soql).await?;
        records
            .iter()
            .map(|record| {
                Ok(DocumentLink {
                    linked_entity_id: str_field(record, "LinkedEntityId")?,
                    share_type: str_field(record, "ShareType")?,
                    visibility: str_field(record, "Visibility")?,
                })
            })
            .collect()
    }

    async fn create_links(&self, links: &[NewDocumentLink]) -> Result<()> {
        if links.is_empty() {
            return Ok(());
        }

        let mut records = Vec::with_capacity(links.len());
        for link in links {
            let mut record = serde_json::to_value(link)
                .map_err(|e| StoreError::UnexpectedResponse(e.to_string()))?;
            record["attributes"] = json!({ "type": "ContentDocumentLink" });
            records.push(record);
        }

        let response = self
            .http
            .post(self.data_url("composite/sobjects"))
            .header("Authorization", self.bearer())
            .json(&json!({ "allOrNone": true, "records": records }))
            .send()
            .await?;
        let response = Self::check(response).await?;

        let results: Vec<OperationResult> = response
            .json()
            .await
            .map_err(|e| StoreError::UnexpectedResponse(e.to_string()))?;
        Self::check_results(&results, "create link")
    }

    async fn update_document(&self, document_id: &str, fields: &DocumentFields) -> Result<()> {
        let mut body = serde_json::Map::new();
        if let Some(title) = &fields.title {
            body.insert("Title".to_string(), Value::String(title.clone()));
        }
        if let Some(description) = &fields.description {
            body.insert("Description".to_string(), Value::String(description.clone()));
        }

        let response = self
            .http
            .patch(self.data_url(&format!("sobjects/ContentDocument/{}", document_id)))
            .header("Authorization", self.bearer())
            .json(&Value::Object(body))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete_documents(&self, document_ids: &[String]) -> Result<()> {
        if document_ids.is_empty() {
            return Ok(());
        }

        let response = self
            .http
            .delete(self.data_url("composite/sobjects"))
            .header("Authorization", self.bearer())
            .query(&[
                ("ids", document_ids.join(",")),
                ("allOrNone", "true".to_string()),
            ])
            .send()
            .await?;
        let response = Self::check(response).await?;

        let results: Vec<OperationResult> = response
            .json()
            .await
            .map_err(|e| StoreError::UnexpectedResponse(e.to_string()))?;
        Self::check_results(&results, "delete document")
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }
}

/// Renders ids as a quoted SOQL IN list: `('a', 'b')`.
fn soql_id_list(ids: &[String]) -> String {
    format!("('{}')", ids.join("', '"))
}

fn str_field(record: &Value, name: &str) -> Result<String> {
    record[name]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| StoreError::UnexpectedResponse(format!("missing field '{}'", name)))
}

fn opt_str_field(record: &Value, name: &str) -> Option<String> {
    record[name].as_str().map(str::to_string)
}

fn parse_source_document(record: &Value) -> Result<SourceDocument> {
    let latest = &record["LatestPublishedVersion"];
    Ok(SourceDocument {
        id: str_field(record, "Id")?,
        title: str_field(record, "Title")?,
        file_extension: str_field(record, "FileExtension")?,
        latest_version_id: opt_str_field(latest, "Id"),
        latest_version_data: opt_str_field(latest, "VersionData"),
    })
}
