//! Local directory as an origin source

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde_json::json;

use crate::domain::document::{Metadata, OriginDocument, OriginDocumentPreview};
use crate::domain::origin::{OriginSource, OriginSourceType};
use crate::domain::DomainError;

/// Extensions listed as documents
pub const SUPPORTED_EXTENSIONS: [&str; 5] = ["txt", "md", "pdf", "docx", "json"];

const TEXT_EXTENSIONS: [&str; 2] = ["txt", "md"];
const PREVIEW_CHARS: usize = 200;

fn origin_error(message: impl Into<String>) -> DomainError {
    DomainError::origin(OriginSourceType::Filesystem.as_str(), message)
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default()
}

/// Documents are the supported files below `base_path`, identified by their
/// path relative to it.
#[derive(Debug, Clone)]
pub struct FilesystemOriginSource {
    base_path: PathBuf,
}

impl FilesystemOriginSource {
    pub async fn open(base_path: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let base_path = base_path.into();

        let metadata = tokio::fs::metadata(&base_path)
            .await
            .map_err(|_| DomainError::validation(format!("Path does not exist: {}", base_path.display())))?;
        if !metadata.is_dir() {
            return Err(DomainError::validation(format!(
                "Path is not a directory: {}",
                base_path.display()
            )));
        }

        Ok(Self { base_path })
    }

    /// Supported files sorted by file name
    async fn supported_files(&self) -> Result<Vec<PathBuf>, DomainError> {
        let mut files = Vec::new();
        let mut pending = vec![self.base_path.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .map_err(|e| origin_error(format!("Cannot read {}: {}", dir.display(), e)))?;

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| origin_error(format!("Cannot read {}: {}", dir.display(), e)))?
            {
                let path = entry.path();
                let file_type = match entry.file_type().await {
                    Ok(t) => t,
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable entry");
                        continue;
                    }
                };

                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() && SUPPORTED_EXTENSIONS.contains(&extension(&path).as_str()) {
                    files.push(path);
                }
            }
        }

        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()).then_with(|| a.cmp(b)));
        Ok(files)
    }

    fn relative_id(&self, path: &Path) -> String {
        path.strip_prefix(&self.base_path)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    /// Resolve an origin id inside the base directory; ids escaping it are rejected
    fn resolve(&self, origin_id: &str) -> Option<PathBuf> {
        let relative = Path::new(origin_id);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

        if escapes {
            None
        } else {
            Some(self.base_path.join(relative))
        }
    }

    fn file_metadata(path: &Path, size: u64) -> Metadata {
        let value = json!({
            "file_path": path.display().to_string(),
            "file_name": path.file_name().map(|n| n.to_string_lossy().to_string()),
            "file_size": size,
            "file_extension": path.extension().map(|e| format!(".{}", e.to_string_lossy())),
        });

        match value {
            serde_json::Value::Object(map) => map,
            _ => Metadata::new(),
        }
    }

    async fn read_content(path: &Path) -> Result<String, DomainError> {
        let ext = extension(path);
        let read_error = |e: std::io::Error| origin_error(format!("Cannot read {}: {}", path.display(), e));

        if TEXT_EXTENSIONS.contains(&ext.as_str()) {
            return tokio::fs::read_to_string(path).await.map_err(read_error);
        }

        if ext == "json" {
            let text = tokio::fs::read_to_string(path).await.map_err(read_error)?;
            let value: serde_json::Value = serde_json::from_str(&text)
                .map_err(|e| origin_error(format!("Invalid JSON in {}: {}", path.display(), e)))?;
            return serde_json::to_string_pretty(&value)
                .map_err(|e| DomainError::internal(format!("Failed to format JSON: {}", e)));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(format!("Binary file: {}", name))
    }

    async fn load(&self, path: &Path) -> Result<OriginDocument, DomainError> {
        let size = tokio::fs::metadata(path)
            .await
            .map(|m| m.len())
            .map_err(|e| origin_error(format!("Cannot stat {}: {}", path.display(), e)))?;
        let content = Self::read_content(path).await?;

        Ok(OriginDocument::new(self.relative_id(path), content)
            .with_metadata(Self::file_metadata(path, size)))
    }
}

#[async_trait]
impl OriginSource for FilesystemOriginSource {
    fn source_type(&self) -> OriginSourceType {
        OriginSourceType::Filesystem
    }

    async fn test_connection(&self) -> bool {
        tokio::fs::metadata(&self.base_path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    async fn list_documents(
        &self,
        limit: usize,
        skip: usize,
    ) -> Result<Vec<OriginDocumentPreview>, DomainError> {
        let files = self.supported_files().await?;
        let mut previews = Vec::new();

        for path in files.into_iter().skip(skip).take(limit) {
            let size = match tokio::fs::metadata(&path).await {
                Ok(m) => m.len(),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping file");
                    continue;
                }
            };

            let preview = if TEXT_EXTENSIONS.contains(&extension(&path).as_str()) {
                tokio::fs::read_to_string(&path)
                    .await
                    .map(|text| text.chars().take(PREVIEW_CHARS).collect())
                    .unwrap_or_default()
            } else {
                String::new()
            };

            previews.push(OriginDocumentPreview {
                origin_id: self.relative_id(&path),
                title: path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default(),
                preview,
                size: size as usize,
                created_at: None,
                metadata: Self::file_metadata(&path, size),
            });
        }

        Ok(previews)
    }

    async fn get_document(&self, origin_id: &str) -> Result<Option<OriginDocument>, DomainError> {
        let Some(path) = self.resolve(origin_id) else {
            return Err(DomainError::validation(format!(
                "Origin id '{}' is outside the base directory",
                origin_id
            )));
        };

        match tokio::fs::metadata(&path).await {
            Ok(m) if m.is_file() => self.load(&path).await.map(Some),
            _ => Ok(None),
        }
    }

    async fn fetch_documents(
        &self,
        limit: Option<usize>,
        skip: usize,
    ) -> Result<Vec<OriginDocument>, DomainError> {
        let files = self.supported_files().await?;
        let take = limit.unwrap_or(files.len());
        let mut documents = Vec::new();

        for path in files.into_iter().skip(skip).take(take) {
            match self.load(&path).await {
                Ok(document) => documents.push(document),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipping file"),
            }
        }

        Ok(documents)
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn fixture() -> (TempDir, FilesystemOriginSource) {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("b_notes.txt"), "plain notes").unwrap();
        std::fs::write(dir.path().join("nested/a_readme.md"), "# Title\n\nBody").unwrap();
        std::fs::write(dir.path().join("data.json"), r#"{"k":1}"#).unwrap();
        std::fs::write(dir.path().join("image.png"), [0u8, 1, 2]).unwrap();

        let source = FilesystemOriginSource::open(dir.path()).await.unwrap();
        (dir, source)
    }

    #[tokio::test]
    async fn test_open_requires_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("f.txt");
        std::fs::write(&file, "x").unwrap();

        assert!(FilesystemOriginSource::open(&file).await.is_err());
        assert!(FilesystemOriginSource::open(dir.path().join("missing")).await.is_err());
    }

    #[tokio::test]
    async fn test_list_documents_sorted_and_filtered() {
        let (_dir, source) = fixture().await;
        let previews = source.list_documents(10, 0).await.unwrap();

        let ids: Vec<&str> = previews.iter().map(|p| p.origin_id.as_str()).collect();
        assert_eq!(ids, vec!["nested/a_readme.md", "b_notes.txt", "data.json"]);
        assert_eq!(previews[1].preview, "plain notes");
        assert_eq!(previews[2].preview, "");

        let page = source.list_documents(1, 1).await.unwrap();
        assert_eq!(page[0].origin_id, "b_notes.txt");
    }

    #[tokio::test]
    async fn test_get_document_reads_and_formats() {
        let (_dir, source) = fixture().await;

        let json_doc = source.get_document("data.json").await.unwrap().unwrap();
        assert_eq!(json_doc.content, "{\n  \"k\": 1\n}");
        assert_eq!(json_doc.metadata["file_extension"], ".json");

        let nested = source.get_document("nested/a_readme.md").await.unwrap().unwrap();
        assert_eq!(nested.content, "# Title\n\nBody");

        assert!(source.get_document("missing.txt").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_document_rejects_traversal() {
        let (_dir, source) = fixture().await;
        assert!(source.get_document("../etc/passwd").await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_documents_limit() {
        let (_dir, source) = fixture().await;
        let documents = source.fetch_documents(Some(2), 0).await.unwrap();
        assert_eq!(documents.len(), 2);
        assert!(source.test_connection().await);
    }
}
