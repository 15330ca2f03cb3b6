use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::instrument;

use crate::domain::{
    ports::DocumentSource, Document, DomainError, SourceFile, GOOGLE_SLIDES_MIME, PPTX_MIME,
};
use crate::infrastructure::config::SourceConfig;

const FILE_FIELDS: &str = "id,name,mimeType,createdTime,modifiedTime";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    mime_type: Option<String>,
    created_time: Option<DateTime<Utc>>,
    modified_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

impl From<DriveFile> for SourceFile {
    fn from(file: DriveFile) -> Self {
        Self {
            id: file.id,
            name: file.name,
            mime_type: file.mime_type,
            created_at: file.created_time,
            modified_at: file.modified_time,
        }
    }
}

/// Google Drive v3 client. Native Google Slides files are exported as
/// `.pptx`; everything else is downloaded as stored.
pub struct GoogleDriveSource {
    client: reqwest::Client,
    base_url: Url,
    access_token: String,
    folder_id: Option<String>,
}

impl GoogleDriveSource {
    pub fn new(config: &SourceConfig) -> Result<Self, DomainError> {
        let access_token = config
            .access_token
            .clone()
            .ok_or_else(|| DomainError::invalid_argument("GOOGLE_DRIVE_ACCESS_TOKEN is not set"))?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .ok()
            .filter(|u| !u.cannot_be_a_base())
            .ok_or_else(|| {
                DomainError::invalid_argument(format!("invalid Drive base url {}", config.base_url))
            })?;

        Ok(Self {
            client,
            base_url,
            access_token,
            folder_id: config.folder_id.clone(),
        })
    }

    /// Appends path segments to the base url. Each segment is percent-encoded,
    /// so ids containing `/`, `?` or `#` stay a single segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, DomainError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DomainError::internal("Drive base url cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, url: Url, query: &[(&str, &str)], what: &str) -> Result<reqwest::Response, DomainError> {
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await
            .map_err(map_request_error)?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp
            .text()
            .await
            .unwrap_or_else(|_| "failed to read response body".into());
        Err(map_status(status, what, &body))
    }

    async fn metadata(&self, file_id: &str) -> Result<DriveFile, DomainError> {
        let url = self.endpoint(&["files", file_id])?;
        self.get(url, &[("fields", FILE_FIELDS), ("supportsAllDrives", "true")], file_id)
            .await?
            .json()
            .await
            .map_err(|e| DomainError::transient(format!("invalid Drive metadata for {file_id}: {e}")))
    }

    async fn download(&self, file: &DriveFile) -> Result<Vec<u8>, DomainError> {
        let resp = if file.mime_type.as_deref() == Some(GOOGLE_SLIDES_MIME) {
            let url = self.endpoint(&["files", &file.id, "export"])?;
            self.get(url, &[("mimeType", PPTX_MIME)], &file.id).await?
        } else {
            let url = self.endpoint(&["files", &file.id])?;
            self.get(url, &[("alt", "media"), ("supportsAllDrives", "true")], &file.id)
                .await?
        };

        resp.bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(map_request_error)
    }
}

/// Quotes a value for a Drive search query, escaping `\` and `'`.
fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn map_request_error(e: reqwest::Error) -> DomainError {
    if e.is_timeout() {
        DomainError::timeout(format!("Drive request timed out: {e}"))
    } else {
        DomainError::transient(format!("Drive request failed: {e}"))
    }
}

fn map_status(status: StatusCode, what: &str, body: &str) -> DomainError {
    match status {
        StatusCode::NOT_FOUND => DomainError::not_found(format!("Drive file {what}")),
        StatusCode::TOO_MANY_REQUESTS => DomainError::transient(format!("Drive rate limited: {body}")),
        s if s.is_server_error() => DomainError::transient(format!("Drive returned {s}: {body}")),
        s => DomainError::internal(format!("Drive returned {s} for {what}: {body}")),
    }
}

#[async_trait]
impl DocumentSource for GoogleDriveSource {
    #[instrument(skip(self))]
    async fn fetch(&self, document_id: &str) -> Result<Document, DomainError> {
        let file = self.metadata(document_id).await?;
        let content = self.download(&file).await?;

        let mime_type = match file.mime_type.as_deref() {
            Some(GOOGLE_SLIDES_MIME) => Some(PPTX_MIME.to_string()),
            other => other.map(str::to_string),
        };

        let mut document = Document::new(&file.id, &file.name, content)
            .with_source_location(format!("drive://{}", file.id));
        if let Some(mime) = mime_type {
            document = document.with_mime_type(mime);
        }

        tracing::debug!(document_id, bytes = document.content.len(), "downloaded from Drive");
        Ok(document)
    }

    #[instrument(skip(self))]
    async fn list(&self, folder: Option<&str>) -> Result<Vec<SourceFile>, DomainError> {
        let folder = folder
            .or(self.folder_id.as_deref())
            .ok_or_else(|| DomainError::invalid_argument("no Drive folder configured"))?;

        let url = self.endpoint(&["files"])?;
        let q = format!("{} in parents and trashed = false", quote_literal(folder));
        let fields = format!("nextPageToken,files({FILE_FIELDS})");
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("q", q.as_str()),
                ("fields", fields.as_str()),
                ("pageSize", "100"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let page: FileList = self
                .get(url.clone(), &query, folder)
                .await?
                .json()
                .await
                .map_err(|e| DomainError::transient(format!("invalid Drive listing: {e}")))?;

            files.extend(page.files.into_iter().map(SourceFile::from));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::info!(folder, count = files.len(), "listed Drive folder");
        Ok(files)
    }
}
