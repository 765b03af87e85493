//! Mock login backed by a small key-value store
//!
//! The only persisted state is the login flag: the document digits and the
//! document kind. There is no password; a document that passes check-digit
//! validation logs in.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::document::{Document, DocumentKind};
use crate::error::AppError;

const DOCUMENT_ID_KEY: &str = "documentId";
const DOCUMENT_TYPE_KEY: &str = "documentType";

/// String key-value storage
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, AppError>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), AppError>;

    fn remove(&mut self, key: &str) -> Result<(), AppError>;
}

/// Volatile store, used by tests and when no state file is wanted
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: BTreeMap<String, String>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), AppError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), AppError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Store kept as one JSON object in a file
///
/// The whole file is rewritten on every change. A missing file reads as
/// an empty store.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileKeyValueStore {
    /// Open (or lazily create) the store at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref().to_path_buf();
        let entries: BTreeMap<String, String> = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!("Opened key-value store {:?} ({} keys)", path, entries.len());
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), AppError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), AppError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), AppError> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// Login, session restore and logout over a key-value store
pub struct AuthService {
    store: Box<dyn KeyValueStore>,
}

impl AuthService {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Validate the document and persist the login flag
    pub fn login(&mut self, raw: &str, kind: DocumentKind) -> Result<Document, AppError> {
        let document = Document::parse(raw, kind)?;

        self.store.set(DOCUMENT_ID_KEY, document.digits())?;
        self.store.set(DOCUMENT_TYPE_KEY, kind.as_str())?;

        info!("Logged in with {}", document);
        Ok(document)
    }

    /// Recover a previous login
    ///
    /// A flag that no longer parses or validates is cleared.
    pub fn restore(&mut self) -> Result<Option<Document>, AppError> {
        let id = self.store.get(DOCUMENT_ID_KEY)?;
        let kind = self.store.get(DOCUMENT_TYPE_KEY)?;

        let (Some(id), Some(kind)) = (id, kind) else {
            return Ok(None);
        };

        let restored = kind
            .parse::<DocumentKind>()
            .and_then(|kind| Document::parse(&id, kind));

        match restored {
            Ok(document) => {
                info!("Restored login for {}", document);
                Ok(Some(document))
            }
            Err(e) => {
                warn!("Discarding stored login flag: {}", e);
                self.logout()?;
                Ok(None)
            }
        }
    }

    /// Forget the persisted login flag
    pub fn logout(&mut self) -> Result<(), AppError> {
        self.store.remove(DOCUMENT_ID_KEY)?;
        self.store.remove(DOCUMENT_TYPE_KEY)?;
        debug!("Login flag cleared");
        Ok(())
    }
}
