use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind as IoErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::instrument;

use crate::domain::{ports::DocumentSource, Document, DomainError, SourceFile};

/// Serves files from a directory. Document ids are paths relative to the
/// root, using `/` separators.
pub struct LocalFileSource {
    root: PathBuf,
}

impl LocalFileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Ids must already be canonical, so one file has exactly one id.
    fn resolve(&self, relative: &str) -> Result<PathBuf, DomainError> {
        let id = canonical(relative)?;
        if id != relative {
            return Err(DomainError::invalid_argument(format!(
                "document path {relative} is not canonical, use {id}"
            )));
        }
        Ok(self.root.join(id))
    }
}

/// Joins the normal components of `relative` with `/`. Anything that could
/// leave the root (`..`, absolute paths, prefixes) is rejected.
fn canonical(relative: &str) -> Result<String, DomainError> {
    let mut parts = Vec::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy()),
            Component::CurDir => {}
            _ => {
                return Err(DomainError::invalid_argument(format!(
                    "invalid document path: {relative}"
                )))
            }
        }
    }
    if parts.is_empty() {
        return Err(DomainError::invalid_argument(format!("invalid document path: {relative}")));
    }
    Ok(parts.join("/"))
}

fn io_error(what: &str, e: std::io::Error) -> DomainError {
    match e.kind() {
        IoErrorKind::NotFound => DomainError::not_found(what.to_string()),
        _ => DomainError::transient(format!("{what}: {e}")),
    }
}

#[async_trait]
impl DocumentSource for LocalFileSource {
    #[instrument(skip(self))]
    async fn fetch(&self, document_id: &str) -> Result<Document, DomainError> {
        let path = self.resolve(document_id)?;
        let content = tokio::fs::read(&path)
            .await
            .map_err(|e| io_error(document_id, e))?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| document_id.to_string());

        Ok(Document::new(document_id, name, content)
            .with_source_location(path.display().to_string()))
    }

    /// Lists regular files directly inside `folder` (the root when `None`),
    /// sorted by id.
    #[instrument(skip(self))]
    async fn list(&self, folder: Option<&str>) -> Result<Vec<SourceFile>, DomainError> {
        let prefix = folder.map(canonical).transpose()?;
        let dir = match &prefix {
            Some(p) => self.root.join(p),
            None => self.root.clone(),
        };
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| io_error(&dir.display().to_string(), e))?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error(&dir.display().to_string(), e))?
        {
            let metadata = match entry.metadata().await {
                Ok(m) if m.is_file() => m,
                _ => continue,
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            let id = match &prefix {
                Some(p) => format!("{p}/{name}"),
                None => name.clone(),
            };

            files.push(SourceFile {
                id,
                name,
                mime_type: None,
                created_at: metadata.created().ok().map(DateTime::<Utc>::from),
                modified_at: metadata.modified().ok().map(DateTime::<Utc>::from),
            });
        }

        files.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DocumentFormat, ErrorKind};
    use tempfile::TempDir;

    fn populated() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b-notes.txt"), "Notes").unwrap();
        std::fs::write(dir.path().join("a-deck.pptx"), b"PK\x03\x04").unwrap();
        std::fs::create_dir(dir.path().join("archive")).unwrap();
        std::fs::write(dir.path().join("archive/old.txt"), "Old").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_list_returns_files_sorted() {
        let dir = populated();
        let source = LocalFileSource::new(dir.path());

        let files = source.list(None).await.unwrap();

        let ids: Vec<&str> = files.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["a-deck.pptx", "b-notes.txt"]);
        assert_eq!(files[0].format(), Some(DocumentFormat::Pptx));
        assert!(files[0].modified_at.is_some());
    }

    #[tokio::test]
    async fn test_list_subfolder_prefixes_ids() {
        let dir = populated();
        let source = LocalFileSource::new(dir.path());

        let files = source.list(Some("archive")).await.unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].id, "archive/old.txt");
        let doc = source.fetch(&files[0].id).await.unwrap();
        assert_eq!(doc.content, b"Old");
        assert_eq!(doc.name, "old.txt");
    }

    #[tokio::test]
    async fn test_fetch_missing_is_not_found() {
        let dir = populated();
        let source = LocalFileSource::new(dir.path());

        let err = source.fetch("nope.pptx").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_fetch_rejects_escaping_paths() {
        let dir = populated();
        let source = LocalFileSource::new(dir.path().join("archive"));

        let err = source.fetch("../b-notes.txt").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_fetch_rejects_aliases_of_an_id() {
        let dir = populated();
        let source = LocalFileSource::new(dir.path());

        for alias in ["./b-notes.txt", "archive/./old.txt", "archive//old.txt", "b-notes.txt/"] {
            let err = source.fetch(alias).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{alias}");
        }
        assert_eq!(source.fetch("b-notes.txt").await.unwrap().content, b"Notes");
    }

    #[tokio::test]
    async fn test_list_normalizes_folder_prefix() {
        let dir = populated();
        let source = LocalFileSource::new(dir.path());

        let files = source.list(Some("./archive/")).await.unwrap();

        assert_eq!(files[0].id, "archive/old.txt");
        assert!(source.fetch(&files[0].id).await.is_ok());
    }
}
