use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufReader};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found")]
    NotFound,
    #[error("invalid object key: {0}")]
    InvalidKey(String),
    #[error("content type {given} does not match key extension ({expected})")]
    ContentTypeMismatch {
        given: String,
        expected: &'static str,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    fn from_io(e: std::io::Error) -> Self {
        if e.kind() == ErrorKind::NotFound {
            Self::NotFound
        } else {
            Self::Io(e)
        }
    }
}

/// Object store backed by a directory on the local filesystem.
///
/// Keys are slash-separated relative paths such as
/// `images/original/<id>.webp` and map one-to-one onto files under
/// `<data_dir>/objects`.
#[derive(Debug)]
pub struct LocalObjectStore {
    base_path: PathBuf,
}

impl LocalObjectStore {
    pub fn new(base_path: &Path) -> Self {
        Self {
            base_path: base_path.to_path_buf(),
        }
    }

    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(key
            .split('/')
            .fold(self.base_path.clone(), |path, segment| path.join(segment)))
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path.join(".tmp").join(Uuid::new_v4().to_string())
    }

    pub async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.object_path(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    pub async fn size(&self, key: &str) -> Result<u64, StorageError> {
        let path = self.object_path(key)?;
        let metadata = fs::metadata(&path).await.map_err(StorageError::from_io)?;
        Ok(metadata.len())
    }

    pub async fn get(&self, key: &str) -> Result<(BufReader<File>, u64), StorageError> {
        let path = self.object_path(key)?;
        let file = File::open(&path).await.map_err(StorageError::from_io)?;
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(StorageError::NotFound);
        }

        Ok((BufReader::new(file), metadata.len()))
    }

    /// Writes an object, replacing any existing one under the same key.
    pub async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError> {
        let final_path = self.object_path(key)?;

        let expected = content_type_for_key(key);
        if !content_type.eq_ignore_ascii_case(expected) {
            return Err(StorageError::ContentTypeMismatch {
                given: content_type.to_string(),
                expected,
            });
        }

        let temp_path = self.temp_path();
        if let Some(parent) = temp_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut temp_file = File::create(&temp_path).await?;
        temp_file.write_all(data).await?;
        temp_file.sync_all().await?;

        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::rename(&temp_path, &final_path).await?;
        tracing::debug!("Stored object {} ({} bytes)", key, data.len());

        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.object_path(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

fn validate_key(key: &str) -> Result<(), StorageError> {
    let invalid = || StorageError::InvalidKey(key.to_string());

    if key.is_empty() || key.starts_with('/') || key.contains('\\') || key.contains('\0') {
        return Err(invalid());
    }

    if key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == ".." || segment.starts_with(".tmp"))
    {
        return Err(invalid());
    }

    Ok(())
}

#[must_use]
pub fn is_valid_key(key: &str) -> bool {
    validate_key(key).is_ok()
}

/// Content type implied by an object key's extension.
#[must_use]
pub fn content_type_for_key(key: &str) -> &'static str {
    let ext = key
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "webp" => "image/webp",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "avif" => "image/avif",
        _ => "application/octet-stream",
    }
}

/// File extension for an uploaded image's content type.
#[must_use]
pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    match content_type.to_ascii_lowercase().as_str() {
        "image/webp" => Some("webp"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/avif" => Some("avif"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    const KEY: &str = "images/original/p1.webp";

    #[tokio::test]
    async fn test_put_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalObjectStore::new(temp_dir.path());

        storage.put(KEY, b"RIFF", "image/webp").await.unwrap();

        assert!(storage.exists(KEY).await.unwrap());
        assert_eq!(storage.size(KEY).await.unwrap(), 4);

        let (mut reader, size) = storage.get(KEY).await.unwrap();
        assert_eq!(size, 4);

        let mut content = Vec::new();
        reader.read_to_end(&mut content).await.unwrap();
        assert_eq!(content, b"RIFF");
    }

    #[tokio::test]
    async fn test_content_type_mismatch() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalObjectStore::new(temp_dir.path());

        let result = storage.put(KEY, b"data", "image/png").await;
        assert!(matches!(
            result,
            Err(StorageError::ContentTypeMismatch { .. })
        ));
        assert!(!storage.exists(KEY).await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_keys_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalObjectStore::new(temp_dir.path());

        for key in ["", "/etc/passwd", "images/../secret.webp", "a//b.webp", ".tmp/x"] {
            assert!(
                matches!(storage.exists(key).await, Err(StorageError::InvalidKey(_))),
                "key {key:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalObjectStore::new(temp_dir.path());

        assert!(!storage.exists(KEY).await.unwrap());
        assert!(matches!(storage.get(KEY).await, Err(StorageError::NotFound)));
    }

    #[tokio::test]
    async fn test_delete() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalObjectStore::new(temp_dir.path());

        storage.put(KEY, b"data", "image/webp").await.unwrap();
        assert!(storage.delete(KEY).await.unwrap());
        assert!(!storage.exists(KEY).await.unwrap());
        assert!(!storage.delete(KEY).await.unwrap());
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for_key("a/b.WEBP"), "image/webp");
        assert_eq!(content_type_for_key("a/b.jpeg"), "image/jpeg");
        assert_eq!(content_type_for_key("a/b"), "application/octet-stream");
        assert_eq!(extension_for_content_type("image/png"), Some("png"));
        assert_eq!(extension_for_content_type("text/plain"), None);
        assert!(is_valid_key(KEY));
    }
}
