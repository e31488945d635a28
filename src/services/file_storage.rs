use chrono::Utc;
use rand::Rng;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::services::file_validation::validate_file_size;
use crate::utils::error::{AppError, AppResult};

const SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LENGTH: usize = 7;

/// Flat directory of uploaded bytes addressed by generated stored names.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

/// A file whose bytes are fully on disk.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub original_name: String,
    pub stored_name: String,
    pub mime_type: String,
    pub size: u64,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_root(&self) -> AppResult<()> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create upload directory: {}", e)))
    }

    pub fn path_of(&self, stored_name: &str) -> PathBuf {
        self.root.join(stored_name)
    }

    pub async fn exists(&self, stored_name: &str) -> bool {
        fs::try_exists(self.path_of(stored_name))
            .await
            .unwrap_or(false)
    }

    /// Opens a new file for an upload. Bytes are pushed with
    /// [`FileSink::write_chunk`] as they arrive.
    pub async fn create_sink(
        &self,
        original_name: &str,
        mime_type: &str,
        max_size: u64,
    ) -> AppResult<FileSink> {
        self.ensure_root().await?;

        let stored_name = generate_stored_name(original_name);
        let path = self.path_of(&stored_name);
        let file = fs::File::create(&path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create file: {}", e)))?;

        Ok(FileSink {
            file,
            path,
            original_name: original_name.to_string(),
            stored_name,
            mime_type: mime_type.to_string(),
            written: 0,
            max_size,
        })
    }

    /// Writes a whole buffer in one go.
    pub async fn save(
        &self,
        original_name: &str,
        mime_type: &str,
        data: &[u8],
        max_size: u64,
    ) -> AppResult<StoredFile> {
        let mut sink = self.create_sink(original_name, mime_type, max_size).await?;
        if let Err(e) = sink.write_chunk(data).await {
            sink.abort().await;
            return Err(e);
        }
        sink.finish().await
    }

    /// Best-effort removal; a missing file is not an error.
    pub async fn remove(&self, stored_name: &str) {
        let path = self.path_of(stored_name);
        match fs::remove_file(&path).await {
            Ok(()) => tracing::debug!("Deleted file from disk: {:?}", path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to delete file {:?}: {}", path, e),
        }
    }
}

pub struct FileSink {
    file: fs::File,
    path: PathBuf,
    original_name: String,
    stored_name: String,
    mime_type: String,
    written: u64,
    max_size: u64,
}

impl FileSink {
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> AppResult<()> {
        validate_file_size(self.written + chunk.len() as u64, self.max_size)?;

        self.file
            .write_all(chunk)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write file: {}", e)))?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    pub async fn finish(mut self) -> AppResult<StoredFile> {
        if let Err(e) = self.file.flush().await {
            self.abort().await;
            return Err(AppError::Internal(format!("Failed to flush file: {}", e)));
        }

        tracing::debug!(
            "Stored upload: name={}, stored={}, size={} bytes",
            self.original_name,
            self.stored_name,
            self.written
        );

        Ok(StoredFile {
            original_name: self.original_name,
            stored_name: self.stored_name,
            mime_type: self.mime_type,
            size: self.written,
        })
    }

    /// Drops the partially written file.
    pub async fn abort(self) {
        drop(self.file);
        if let Err(e) = fs::remove_file(&self.path).await {
            tracing::warn!("Failed to delete partial upload {:?}: {}", self.path, e);
        }
    }
}

/// `{unix_millis}-{random base36}{.ext}`, keeping the original extension so
/// stored files remain recognisable on disk.
pub fn generate_stored_name(original_name: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LENGTH)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect();

    let extension = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();

    format!("{}-{}{}", Utc::now().timestamp_millis(), suffix, extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_names_keep_extension_and_differ() {
        let a = generate_stored_name("Report Final.PDF");
        let b = generate_stored_name("Report Final.PDF");
        assert!(a.ends_with(".pdf"));
        assert_ne!(a, b);
        assert!(!a.contains(' '));
    }

    #[test]
    fn stored_names_drop_unsafe_extensions() {
        let name = generate_stored_name("../../etc/passwd");
        assert!(!name.contains('/'));
        let name = generate_stored_name("archive.tar/../x");
        assert!(!name.contains('/'));
        assert!(!generate_stored_name("noext").contains('.'));
    }

    #[tokio::test]
    async fn saves_and_removes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("uploads"));

        let stored = storage
            .save("hello.pdf", "application/pdf", b"%PDF-1.4", 1024)
            .await
            .unwrap();
        assert_eq!(stored.size, 8);
        assert!(storage.exists(&stored.stored_name).await);

        storage.remove(&stored.stored_name).await;
        assert!(!storage.exists(&stored.stored_name).await);
        // Removing twice is fine.
        storage.remove(&stored.stored_name).await;
    }

    #[tokio::test]
    async fn oversized_writes_leave_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        let err = storage
            .save("big.pdf", "application/pdf", &[0u8; 16], 8)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge(_)));

        let mut entries = std::fs::read_dir(dir.path()).unwrap();
        assert!(entries.next().is_none());
    }
}
