//! Byte-addressable file access for the containers that hold world assets.
//!
//! The container reader itself lives outside this crate. Importers only
//! need to pull a named file's bytes out of it, so they talk to the
//! [`Archive`] trait. [`MemoryArchive`] covers embedded assets and tests.

use std::collections::HashMap;
use std::fmt;

/// Errors that can occur while extracting files from an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveError {
    /// The requested file is not in the archive.
    NotFound(String),
    /// The file name is empty or otherwise unusable.
    InvalidName(String),
}

impl fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveError::NotFound(name) => write!(f, "file not found in archive: {name}"),
            ArchiveError::InvalidName(reason) => write!(f, "invalid file name: {reason}"),
        }
    }
}

impl std::error::Error for ArchiveError {}

/// A container of named files.
///
/// File names are matched case-insensitively.
pub trait Archive {
    /// Extract the contents of the file called `name`.
    fn unpack_file(&self, name: &str) -> Result<Vec<u8>, ArchiveError>;

    /// Whether a file called `name` exists.
    fn contains(&self, name: &str) -> bool {
        self.unpack_file(name).is_ok()
    }
}

fn normalize_name(name: &str) -> Result<String, ArchiveError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ArchiveError::InvalidName("empty file name".into()));
    }
    Ok(trimmed.to_ascii_lowercase())
}

/// In-memory archive, keyed by lower-cased file name.
///
/// # Example
///
/// ```ignore
/// let mut archive = MemoryArchive::new();
/// archive.insert("OrcSkin.bmp", bmp_bytes);
/// assert!(archive.contains("orcskin.BMP"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryArchive {
    /// Create an empty archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a file, replacing any file with the same (case-folded) name.
    ///
    /// Empty names are ignored.
    pub fn insert(&mut self, name: impl AsRef<str>, data: Vec<u8>) {
        match normalize_name(name.as_ref()) {
            Ok(key) => {
                self.files.insert(key, data);
            }
            Err(e) => log::warn!("MemoryArchive: not inserting file: {e}"),
        }
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with_file(mut self, name: impl AsRef<str>, data: Vec<u8>) -> Self {
        self.insert(name, data);
        self
    }

    /// Remove a file, returning its data if it existed.
    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        let key = normalize_name(name).ok()?;
        self.files.remove(&key)
    }

    /// Number of files in the archive.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the archive holds no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Sorted list of the stored (lower-cased) file names.
    pub fn file_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.files.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Archive for MemoryArchive {
    fn unpack_file(&self, name: &str) -> Result<Vec<u8>, ArchiveError> {
        let key = normalize_name(name)?;
        self.files
            .get(&key)
            .cloned()
            .ok_or_else(|| ArchiveError::NotFound(name.to_owned()))
    }

    fn contains(&self, name: &str) -> bool {
        normalize_name(name).is_ok_and(|key| self.files.contains_key(&key))
    }
}
