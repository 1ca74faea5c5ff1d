//! Local-directory binary-file store.
//!
//! # Responsibility
//! - Store rendered document bytes under opaque locators.
//! - Open and delete stored bytes by locator.
//!
//! # Invariants
//! - Locators are flat file names; path traversal is rejected.
//! - `store` writes the complete buffer or fails without leaving the
//!   locator resolvable.

use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub type FileStoreResult<T> = Result<T, FileStoreError>;

/// File-store error for locator validation and I/O failures.
#[derive(Debug)]
pub enum FileStoreError {
    InvalidLocator(String),
    Io(std::io::Error),
}

impl Display for FileStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLocator(locator) => write!(f, "invalid file locator `{locator}`"),
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl Error for FileStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidLocator(_) => None,
            Self::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for FileStoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Directory-backed store for rendered document bytes.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl AsRef<Path>) -> FileStoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Stores a complete byte buffer and returns its locator.
    pub fn store(&self, bytes: &[u8]) -> FileStoreResult<String> {
        let locator = format!("{}.doc", Uuid::new_v4());
        let path = self.root.join(&locator);
        std::fs::write(&path, bytes)?;
        info!(
            "event=file_store module=files status=ok locator={} size={}",
            locator,
            bytes.len()
        );
        Ok(locator)
    }

    /// Opens stored bytes by locator.
    pub fn open_bytes(&self, locator: &str) -> FileStoreResult<Vec<u8>> {
        let path = self.resolve(locator)?;
        Ok(std::fs::read(path)?)
    }

    /// Deletes stored bytes by locator. Deleting a missing locator fails.
    pub fn delete(&self, locator: &str) -> FileStoreResult<()> {
        let path = self.resolve(locator)?;
        std::fs::remove_file(path)?;
        Ok(())
    }

    /// Returns whether the locator currently resolves to stored bytes.
    pub fn exists(&self, locator: &str) -> bool {
        self.resolve(locator)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }

    fn resolve(&self, locator: &str) -> FileStoreResult<PathBuf> {
        if locator.is_empty()
            || locator.contains('/')
            || locator.contains('\\')
            || locator.contains("..")
        {
            return Err(FileStoreError::InvalidLocator(locator.to_string()));
        }
        Ok(self.root.join(locator))
    }
}
