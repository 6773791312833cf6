use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// StorageError
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Empty, absolute, or `..`-containing path.
    #[error("invalid media path: {0}")]
    InvalidPath(String),

    #[error("media file not found: {0}")]
    NotFound(String),

    #[error("media io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("simulated storage failure")]
    Simulated,
}

// 1. MediaStorage Contract
/// MediaStorage
///
/// Abstract contract for the file store behind `/media/`. Paths are always
/// relative to the store's root and use `/` as separator. The concrete
/// implementation can be swapped (local directory in production, in-memory mock
/// in tests) without touching the handlers.
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Creates the storage root if needed. Called once at startup.
    async fn ensure_ready(&self) -> Result<(), StorageError>;

    /// Reads the whole file at `relative`.
    async fn read(&self, relative: &str) -> Result<Vec<u8>, StorageError>;

    /// Stores `data` under `dir` with a sanitized, collision-free name derived
    /// from `file_name`, returning the stored relative path.
    async fn save(&self, dir: &str, file_name: &str, data: &[u8]) -> Result<String, StorageError>;

    /// Removes the file at `relative`.
    async fn delete(&self, relative: &str) -> Result<(), StorageError>;
}

/// StorageState
///
/// The concrete type used to share media storage across the application state.
pub type StorageState = Arc<dyn MediaStorage>;

/// content_type_for
///
/// MIME type served for a media path, by extension (case-insensitive). Other
/// extensions get no explicit type.
pub fn content_type_for(path: &str) -> Option<&'static str> {
    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".pdf") {
        Some("application/pdf")
    } else if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        Some("image/jpeg")
    } else {
        None
    }
}

/// resolve_relative
///
/// Joins `relative` onto `root`, accepting only plain path segments. Anything
/// that could step outside the root resolves to `None`.
pub fn resolve_relative(root: &Path, relative: &str) -> Option<PathBuf> {
    let candidate = Path::new(relative);
    let mut resolved = root.to_path_buf();
    let mut segments = 0;
    for component in candidate.components() {
        match component {
            Component::Normal(segment) => {
                resolved.push(segment);
                segments += 1;
            }
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (segments > 0).then_some(resolved)
}

/// sanitize_file_name
///
/// Keeps only the last path segment of a client-supplied name; whitespace becomes
/// `_` and anything other than letters, digits, `-`, `_` and `.` is dropped.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    let cleaned: String = base
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some('_')
            } else if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                Some(c)
            } else {
                None
            }
        })
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        "archivo".to_string()
    } else {
        cleaned
    }
}

fn unique_key(dir: &str, file_name: &str) -> String {
    let prefix = Uuid::new_v4().simple().to_string();
    format!(
        "{}/{}_{}",
        dir.trim_matches('/'),
        &prefix[..8],
        sanitize_file_name(file_name)
    )
}

// 2. The Real Implementation (local directory)
/// LocalMediaStorage
///
/// Files live under `root` on the local filesystem.
#[derive(Clone)]
pub struct LocalMediaStorage {
    root: PathBuf,
}

impl LocalMediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl MediaStorage for LocalMediaStorage {
    async fn ensure_ready(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    async fn read(&self, relative: &str) -> Result<Vec<u8>, StorageError> {
        let path = resolve_relative(&self.root, relative)
            .ok_or_else(|| StorageError::InvalidPath(relative.to_string()))?;

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(relative.to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn save(&self, dir: &str, file_name: &str, data: &[u8]) -> Result<String, StorageError> {
        let key = unique_key(dir, file_name);
        let path = resolve_relative(&self.root, &key).ok_or_else(|| StorageError::InvalidPath(key.clone()))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;

        tracing::debug!(media_path = %key, size = data.len(), "stored media file");
        Ok(key)
    }

    async fn delete(&self, relative: &str) -> Result<(), StorageError> {
        let path = resolve_relative(&self.root, relative)
            .ok_or_else(|| StorageError::InvalidPath(relative.to_string()))?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(relative.to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

// 3. The Mock Implementation (For Tests)
/// MockMediaStorage
///
/// In-memory `MediaStorage` for handler and router tests.
#[derive(Default)]
pub struct MockMediaStorage {
    /// When true, every operation returns `StorageError::Simulated`.
    pub should_fail: bool,
    files: RwLock<HashMap<String, Vec<u8>>>,
}

impl MockMediaStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Pre-loads a file at `relative`.
    pub fn with_file(mut self, relative: &str, data: impl Into<Vec<u8>>) -> Self {
        self.files.get_mut().insert(relative.to_string(), data.into());
        self
    }

    pub async fn stored(&self, relative: &str) -> Option<Vec<u8>> {
        self.files.read().await.get(relative).cloned()
    }

    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }
}

#[async_trait]
impl MediaStorage for MockMediaStorage {
    async fn ensure_ready(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn read(&self, relative: &str) -> Result<Vec<u8>, StorageError> {
        if self.should_fail {
            return Err(StorageError::Simulated);
        }
        if resolve_relative(Path::new("/"), relative).is_none() {
            return Err(StorageError::InvalidPath(relative.to_string()));
        }
        self.stored(relative)
            .await
            .ok_or_else(|| StorageError::NotFound(relative.to_string()))
    }

    async fn save(&self, dir: &str, file_name: &str, data: &[u8]) -> Result<String, StorageError> {
        if self.should_fail {
            return Err(StorageError::Simulated);
        }
        let key = unique_key(dir, file_name);
        self.files.write().await.insert(key.clone(), data.to_vec());
        Ok(key)
    }

    async fn delete(&self, relative: &str) -> Result<(), StorageError> {
        if self.should_fail {
            return Err(StorageError::Simulated);
        }
        self.files
            .write()
            .await
            .remove(relative)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(relative.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type_for("actas/acta.pdf"), Some("application/pdf"));
        assert_eq!(content_type_for("gestiones/FOTO.JPG"), Some("image/jpeg"));
        assert_eq!(content_type_for("gestiones/foto.jpeg"), Some("image/jpeg"));
        assert_eq!(content_type_for("notes.txt"), None);
    }

    #[test]
    fn resolution_stays_under_root() {
        let root = Path::new("/srv/media");
        assert_eq!(
            resolve_relative(root, "actas/a.pdf"),
            Some(PathBuf::from("/srv/media/actas/a.pdf"))
        );
        assert_eq!(
            resolve_relative(root, "./actas/a.pdf"),
            Some(PathBuf::from("/srv/media/actas/a.pdf"))
        );
        assert_eq!(resolve_relative(root, "../etc/passwd"), None);
        assert_eq!(resolve_relative(root, "actas/../../etc/passwd"), None);
        assert_eq!(resolve_relative(root, "/etc/passwd"), None);
        assert_eq!(resolve_relative(root, ""), None);
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("Informe final.pdf"), "Informe_final.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\tmp\\acta(1).pdf"), "acta1.pdf");
        assert_eq!(sanitize_file_name("reunión.jpg"), "reunión.jpg");
        assert_eq!(sanitize_file_name(".."), "archivo");
    }

    #[test]
    fn unique_keys_keep_directory_and_name() {
        let key = unique_key("gestiones", "evidencia.pdf");
        assert!(key.starts_with("gestiones/"));
        assert!(key.ends_with("_evidencia.pdf"));
        assert_ne!(key, unique_key("gestiones", "evidencia.pdf"));
    }
}
