//! JSON file document store (plain or gzip).

use super::DocumentStore;
use crate::error::DocumentError;
use crate::types::TaskDocument;
use async_trait::async_trait;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Document store backed by a single JSON file.
///
/// Reads detect gzip by magic bytes. Writes are gzip-compressed when the path
/// ends in `.gz` and go through a temp file plus rename, so readers never see
/// a partial document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn compress(&self) -> bool {
        self.path.extension().is_some_and(|ext| ext == "gz")
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Decode document bytes, plain JSON or gzip.
pub fn decode_document(bytes: &[u8]) -> Result<TaskDocument, DocumentError> {
    if bytes.starts_with(&GZIP_MAGIC) {
        let mut json = Vec::new();
        GzDecoder::new(bytes).read_to_end(&mut json)?;
        Ok(serde_json::from_slice(&json)?)
    } else {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Encode a document as pretty JSON, optionally gzip-compressed.
pub fn encode_document(doc: &TaskDocument, gzip: bool) -> Result<Vec<u8>, DocumentError> {
    let json = serde_json::to_vec_pretty(doc)?;
    if !gzip {
        return Ok(json);
    }
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    Ok(encoder.finish()?)
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn read(&self) -> Result<TaskDocument, DocumentError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(TaskDocument::default()),
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(TaskDocument::default());
        }
        decode_document(&bytes)
    }

    async fn write(&self, doc: &TaskDocument) -> Result<(), DocumentError> {
        let bytes = encode_document(doc, self.compress())?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp_path = self.temp_path();
        let mut file = tokio::fs::File::create(&temp_path).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_reads_empty_document() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("absent.json"));
        let doc = store.read().await.unwrap();
        assert_eq!(doc, TaskDocument::default());
    }

    #[tokio::test]
    async fn test_write_creates_parent_dirs_and_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("tasks.json");
        let store = JsonFileStore::new(&path);

        let doc = TaskDocument {
            tasks: vec![],
            next_id: 12,
        };
        store.write(&doc).await.unwrap();

        assert!(path.exists());
        assert!(!store.temp_path().exists());
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"nextId\": 12"));
    }

    #[tokio::test]
    async fn test_gz_path_writes_compressed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.json.gz");
        let store = JsonFileStore::new(&path);

        let doc = TaskDocument {
            tasks: vec![],
            next_id: 3,
        };
        store.write(&doc).await.unwrap();

        let raw = std::fs::read(&path).unwrap();
        assert!(raw.starts_with(&GZIP_MAGIC));
        assert_eq!(store.read().await.unwrap().next_id, 3);
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = JsonFileStore::new(&path).read().await;
        assert!(matches!(result, Err(DocumentError::Json(_))));
    }
}
