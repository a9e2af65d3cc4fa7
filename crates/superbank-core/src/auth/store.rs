//! Persistence of the bearer credential.
//!
//! Exactly one credential string is stored per installation. Where it lives
//! is decided once at startup by picking a `TokenBackend`; `TokenStore` wraps
//! the backend and turns every storage failure into a typed outcome so the
//! rest of the client never sees a storage error.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use keyring::Entry;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Key the credential is stored under, in every backend.
pub const TOKEN_KEY: &str = "user_jwt_secure";

/// Keychain service name.
const SERVICE_NAME: &str = "superbank";

/// Key/value file used by `FileBackend`.
const STORAGE_FILE: &str = "storage.json";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt storage file: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Storage lock poisoned")]
    Poisoned,
}

/// A place the credential can be kept.
///
/// Implementations report failures honestly; `TokenStore` decides what the
/// caller gets to see.
#[async_trait]
pub trait TokenBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn read(&self) -> Result<Option<String>, StorageError>;

    async fn write(&self, token: &str) -> Result<(), StorageError>;

    /// Remove the credential. Removing an absent credential is not an error.
    async fn remove(&self) -> Result<(), StorageError>;
}

/// Which backend to construct at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Platform-secure store (OS keychain / credential manager).
    #[default]
    Keyring,
    /// Persistent key/value file, the equivalent of browser local storage.
    File,
    /// Process memory only; nothing survives a restart.
    Memory,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Keyring => "keyring",
            BackendKind::File => "file",
            BackendKind::Memory => "memory",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyring" | "secure" => Ok(BackendKind::Keyring),
            "file" | "local" => Ok(BackendKind::File),
            "memory" => Ok(BackendKind::Memory),
            other => Err(format!("unknown storage backend: {}", other)),
        }
    }
}

// ============================================================================
// Backends
// ============================================================================

/// Credential kept in the OS keychain.
pub struct KeyringBackend {
    entry: Arc<Entry>,
}

impl KeyringBackend {
    pub fn new() -> Result<Self, StorageError> {
        Self::with_service(SERVICE_NAME)
    }

    /// Use a custom keychain service name, e.g. to separate test credentials.
    pub fn with_service(service: &str) -> Result<Self, StorageError> {
        let entry = Entry::new(service, TOKEN_KEY)?;
        Ok(Self {
            entry: Arc::new(entry),
        })
    }
}

#[async_trait]
impl TokenBackend for KeyringBackend {
    fn name(&self) -> &'static str {
        "keyring"
    }

    async fn read(&self) -> Result<Option<String>, StorageError> {
        let entry = Arc::clone(&self.entry);
        match tokio::task::spawn_blocking(move || entry.get_password()).await? {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, token: &str) -> Result<(), StorageError> {
        let entry = Arc::clone(&self.entry);
        let token = token.to_string();
        tokio::task::spawn_blocking(move || entry.set_password(&token)).await??;
        Ok(())
    }

    async fn remove(&self) -> Result<(), StorageError> {
        let entry = Arc::clone(&self.entry);
        match tokio::task::spawn_blocking(move || entry.delete_credential()).await? {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Credential kept in a JSON key/value file.
///
/// The file may hold other keys; they are left untouched.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    /// Store under `<dir>/storage.json`.
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(STORAGE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load_map(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn store_map(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(map)?;
        tokio::fs::write(&self.path, contents).await?;
        Ok(())
    }
}

#[async_trait]
impl TokenBackend for FileBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn read(&self) -> Result<Option<String>, StorageError> {
        let mut map = self.load_map().await?;
        Ok(map.remove(TOKEN_KEY))
    }

    async fn write(&self, token: &str) -> Result<(), StorageError> {
        let mut map = self.load_map().await?;
        map.insert(TOKEN_KEY.to_string(), token.to_string());
        self.store_map(&map).await
    }

    async fn remove(&self) -> Result<(), StorageError> {
        let mut map = self.load_map().await?;
        if map.remove(TOKEN_KEY).is_some() {
            self.store_map(&map).await?;
        }
        Ok(())
    }
}

/// Credential kept in process memory.
#[derive(Default)]
pub struct MemoryBackend {
    token: Mutex<Option<String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn read(&self) -> Result<Option<String>, StorageError> {
        let guard = self.token.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(guard.clone())
    }

    async fn write(&self, token: &str) -> Result<(), StorageError> {
        let mut guard = self.token.lock().map_err(|_| StorageError::Poisoned)?;
        *guard = Some(token.to_string());
        Ok(())
    }

    async fn remove(&self) -> Result<(), StorageError> {
        let mut guard = self.token.lock().map_err(|_| StorageError::Poisoned)?;
        *guard = None;
        Ok(())
    }
}

// ============================================================================
// TokenStore
// ============================================================================

/// Result of reading the credential.
#[derive(Clone, PartialEq, Eq)]
pub enum TokenRead {
    Found(String),
    /// Nothing was ever stored, or it was cleared.
    Missing,
    /// The backing store failed; callers treat this as logged out.
    Unavailable(String),
}

impl TokenRead {
    pub fn token(&self) -> Option<&str> {
        match self {
            TokenRead::Found(token) => Some(token),
            _ => None,
        }
    }

    pub fn into_token(self) -> Option<String> {
        match self {
            TokenRead::Found(token) => Some(token),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, TokenRead::Found(_))
    }
}

impl fmt::Debug for TokenRead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenRead::Found(_) => f.write_str("Found(<redacted>)"),
            TokenRead::Missing => f.write_str("Missing"),
            TokenRead::Unavailable(reason) => f.debug_tuple("Unavailable").field(reason).finish(),
        }
    }
}

/// Result of a save or clear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Stored,
    Cleared,
    Failed(String),
}

impl WriteOutcome {
    pub fn is_ok(&self) -> bool {
        !matches!(self, WriteOutcome::Failed(_))
    }
}

/// The single-credential store handed to the session.
/// Clone is cheap - the backend is shared.
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn TokenBackend>,
}

impl TokenStore {
    pub fn new(backend: Arc<dyn TokenBackend>) -> Self {
        Self { backend }
    }

    /// Build the backend named by `kind`. `data_dir` is only used by the
    /// file backend.
    pub fn from_kind(kind: BackendKind, data_dir: &Path) -> Result<Self, StorageError> {
        let backend: Arc<dyn TokenBackend> = match kind {
            BackendKind::Keyring => Arc::new(KeyringBackend::new()?),
            BackendKind::File => Arc::new(FileBackend::new(data_dir)),
            BackendKind::Memory => Arc::new(MemoryBackend::new()),
        };
        Ok(Self::new(backend))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Read the credential. An empty stored value counts as missing.
    pub async fn get(&self) -> TokenRead {
        match self.backend.read().await {
            Ok(Some(token)) if !token.is_empty() => TokenRead::Found(token),
            Ok(_) => TokenRead::Missing,
            Err(e) => {
                warn!(backend = self.backend.name(), error = %e, "Failed to read credential");
                TokenRead::Unavailable(e.to_string())
            }
        }
    }

    pub async fn save(&self, token: &str) -> WriteOutcome {
        match self.backend.write(token).await {
            Ok(()) => {
                debug!(backend = self.backend.name(), "Credential stored");
                WriteOutcome::Stored
            }
            Err(e) => {
                warn!(backend = self.backend.name(), error = %e, "Failed to store credential");
                WriteOutcome::Failed(e.to_string())
            }
        }
    }

    pub async fn clear(&self) -> WriteOutcome {
        match self.backend.remove().await {
            Ok(()) => {
                debug!(backend = self.backend.name(), "Credential cleared");
                WriteOutcome::Cleared
            }
            Err(e) => {
                warn!(backend = self.backend.name(), error = %e, "Failed to clear credential");
                WriteOutcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Backend whose every operation fails, for exercising the degrade path.
    pub(crate) struct BrokenBackend;

    #[async_trait]
    impl TokenBackend for BrokenBackend {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn read(&self) -> Result<Option<String>, StorageError> {
            Err(StorageError::Poisoned)
        }

        async fn write(&self, _token: &str) -> Result<(), StorageError> {
            Err(StorageError::Poisoned)
        }

        async fn remove(&self) -> Result<(), StorageError> {
            Err(StorageError::Poisoned)
        }
    }

    #[tokio::test]
    async fn test_memory_round_trip_and_clear() {
        let store = TokenStore::in_memory();
        assert_eq!(store.get().await, TokenRead::Missing);

        assert_eq!(store.save("abc123").await, WriteOutcome::Stored);
        assert_eq!(store.get().await.token(), Some("abc123"));

        assert_eq!(store.clear().await, WriteOutcome::Cleared);
        assert_eq!(store.get().await, TokenRead::Missing);
        // Clearing twice is fine
        assert_eq!(store.clear().await, WriteOutcome::Cleared);
    }

    #[tokio::test]
    async fn test_file_round_trip_survives_new_instance() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = TokenStore::new(Arc::new(FileBackend::new(dir.path())));
        assert_eq!(store.save("file-token").await, WriteOutcome::Stored);

        // A fresh backend over the same directory stands in for a restart
        let reopened = TokenStore::new(Arc::new(FileBackend::new(dir.path())));
        assert_eq!(reopened.get().await.token(), Some("file-token"));

        assert_eq!(reopened.clear().await, WriteOutcome::Cleared);
        assert_eq!(store.get().await, TokenRead::Missing);
        assert!(reopened.clear().await.is_ok());
    }

    #[tokio::test]
    async fn test_file_backend_preserves_other_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = FileBackend::new(dir.path());
        std::fs::write(backend.path(), r#"{"language":"kk"}"#).expect("seed file");

        let store = TokenStore::new(Arc::new(backend));
        store.save("t").await;
        store.clear().await;

        let contents = std::fs::read_to_string(dir.path().join(STORAGE_FILE)).expect("read");
        let map: BTreeMap<String, String> = serde_json::from_str(&contents).expect("json");
        assert_eq!(map.get("language").map(String::as_str), Some("kk"));
        assert!(!map.contains_key(TOKEN_KEY));
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_as_unavailable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = FileBackend::new(dir.path());
        std::fs::write(backend.path(), "not json").expect("seed file");

        let store = TokenStore::new(Arc::new(backend));
        let read = store.get().await;
        assert!(matches!(read, TokenRead::Unavailable(_)));
        assert_eq!(read.token(), None);
    }

    #[tokio::test]
    async fn test_keyring_round_trip_on_mock_store() {
        keyring::set_default_credential_builder(keyring::mock::default_credential_builder());

        let store = TokenStore::new(Arc::new(
            KeyringBackend::with_service("superbank-test").expect("mock entry"),
        ));
        assert_eq!(store.get().await, TokenRead::Missing);
        assert_eq!(store.save("secure-token").await, WriteOutcome::Stored);
        assert_eq!(store.get().await.token(), Some("secure-token"));
        assert_eq!(store.clear().await, WriteOutcome::Cleared);
        assert_eq!(store.get().await, TokenRead::Missing);
        assert_eq!(store.clear().await, WriteOutcome::Cleared);
    }

    #[tokio::test]
    async fn test_failures_are_typed_not_raised() {
        let store = TokenStore::new(Arc::new(BrokenBackend));
        assert!(matches!(store.get().await, TokenRead::Unavailable(_)));
        assert!(!store.save("x").await.is_ok());
        assert!(!store.clear().await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_token_reads_as_missing() {
        let store = TokenStore::in_memory();
        store.save("").await;
        assert_eq!(store.get().await, TokenRead::Missing);
    }

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!("keyring".parse::<BackendKind>(), Ok(BackendKind::Keyring));
        assert_eq!("File".parse::<BackendKind>(), Ok(BackendKind::File));
        assert_eq!(" memory ".parse::<BackendKind>(), Ok(BackendKind::Memory));
        assert!("sqlite".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_token_read_debug_redacts() {
        let rendered = format!("{:?}", TokenRead::Found("secret".into()));
        assert!(!rendered.contains("secret"));
    }
}
