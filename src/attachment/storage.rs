//! On-disk storage for attachment files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::{AgoraError, Result};

/// Attachment file store.
///
/// Files get a random UUID name, keep a lowercase extension, and live in a
/// shard directory named after the first two characters:
/// ```text
/// {base_path}/
/// ├── 3f/
/// │   └── 3f2a9c1e-0d4b-4e8f-9a7c-5b6d1e2f3a4b.png
/// └── a0/
///     └── a0c4...e1.pdf
/// ```
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Open a store rooted at `base_path`, creating the directory if needed.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    /// Root directory of the store.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Write `content` under a fresh name and return that name.
    pub fn save(&self, content: &[u8], original_name: &str) -> Result<String> {
        let stored_name = Self::generate_stored_name(original_name);
        let path = self.path_for(&stored_name)?;
        if let Some(shard) = path.parent() {
            fs::create_dir_all(shard)?;
        }
        fs::write(&path, content)?;
        Ok(stored_name)
    }

    /// Read a stored file.
    pub fn load(&self, stored_name: &str) -> Result<Vec<u8>> {
        let path = self.path_for(stored_name)?;
        match fs::read(&path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(AgoraError::NotFound(format!("file {stored_name}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a stored file. Returns false if it was already gone.
    pub fn delete(&self, stored_name: &str) -> Result<bool> {
        let path = self.path_for(stored_name)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                if let Some(shard) = path.parent() {
                    // Fails harmlessly while the shard still holds other files.
                    let _ = fs::remove_dir(shard);
                }
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether a stored file exists.
    pub fn exists(&self, stored_name: &str) -> bool {
        self.path_for(stored_name)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }

    /// Full path of a stored file.
    ///
    /// Names that could escape the store (separators, `..`, too short for a
    /// shard) are rejected.
    pub fn path_for(&self, stored_name: &str) -> Result<PathBuf> {
        if !Self::is_valid_stored_name(stored_name) {
            return Err(AgoraError::Validation(format!(
                "invalid stored file name: {stored_name}"
            )));
        }
        Ok(self.base_path.join(&stored_name[..2]).join(stored_name))
    }

    /// A new UUID name carrying the lowercased extension of `original_name`.
    pub fn generate_stored_name(original_name: &str) -> String {
        let ext = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| "bin".to_string());
        format!("{}.{ext}", Uuid::new_v4())
    }

    fn is_valid_stored_name(name: &str) -> bool {
        name.len() >= 3
            && !name.starts_with('.')
            && !name.contains("..")
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
    }
}
