//! Authentication module for managing the bearer credential.
//!
//! This module provides:
//! - `TokenStore`: persistence of the single credential over a pluggable
//!   backing store (OS keychain, key/value file, or memory)
//! - `Session`: the shared session context derived from the stored credential
//! - `LoginFlow`: password login followed by MFA code verification
//!
//! Credentials are not checked for expiry locally; the server signals an
//! invalid credential with a 401 and the session is cleared then.

pub mod flow;
pub mod session;
pub mod store;

pub use flow::{LoginError, LoginFlow, LoginStep};
pub use session::{Credential, Session, SessionState};
pub use store::{
    BackendKind, FileBackend, KeyringBackend, MemoryBackend, StorageError, TokenBackend,
    TokenRead, TokenStore, WriteOutcome,
};
