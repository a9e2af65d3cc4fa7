//! Session context shared by the API client and every screen.
//!
//! "Authenticated" is never stored on its own; it is derived from whether a
//! credential is present. The `TokenStore` stays the source of truth and the
//! in-memory view is reconciled with it on every read.
//!
//! All credential writes go through one async mutex, so overlapping
//! login/logout sequences apply in order (last write wins). Each change of
//! credential bumps a generation counter; a 401 only clears the credential
//! generation the failing request was sent with.

use std::fmt;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use super::store::{TokenStore, WriteOutcome};

/// Snapshot of the client-side session.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub token: Option<String>,
    /// True only while the credential is being restored at startup.
    pub loading: bool,
    pub generation: u64,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("authenticated", &self.is_authenticated())
            .field("loading", &self.loading)
            .field("generation", &self.generation)
            .finish()
    }
}

/// The credential to attach to one request, tagged with its generation.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub generation: u64,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("generation", &self.generation)
            .finish()
    }
}

pub struct Session {
    store: TokenStore,
    writes: Mutex<()>,
    state: watch::Sender<SessionState>,
}

impl Session {
    pub fn new(store: TokenStore) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            store,
            writes: Mutex::new(()),
            state,
        }
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Current snapshot.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Watch session changes, e.g. to send the user back to login after a 401.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn generation(&self) -> u64 {
        self.state.borrow().generation
    }

    /// Load the credential from storage at startup. Returns whether the
    /// session is authenticated afterwards.
    pub async fn restore(&self) -> bool {
        let _guard = self.writes.lock().await;
        self.state.send_modify(|s| s.loading = true);

        let token = self.store.get().await.into_token();
        self.state.send_modify(|s| {
            Self::apply(s, token);
            s.loading = false;
        });

        let authenticated = self.is_authenticated();
        info!(
            backend = self.store.backend_name(),
            authenticated, "Session restored"
        );
        authenticated
    }

    /// Persist a freshly issued credential (login).
    ///
    /// The session only becomes authenticated if the write succeeded.
    pub async fn establish(&self, token: &str) -> WriteOutcome {
        let _guard = self.writes.lock().await;
        let outcome = self.store.save(token).await;
        if outcome.is_ok() {
            let token = Some(token.to_string()).filter(|t| !t.is_empty());
            self.state.send_modify(|s| Self::apply(s, token));
            info!("Session established");
        }
        outcome
    }

    /// Remove the credential (logout).
    pub async fn end(&self) -> WriteOutcome {
        let _guard = self.writes.lock().await;
        let outcome = self.store.clear().await;
        if outcome.is_ok() {
            self.state.send_modify(|s| Self::apply(s, None));
            info!("Session ended");
        }
        outcome
    }

    /// Read the credential for an outgoing request.
    ///
    /// Holding the write lock means a `establish` that completed before this
    /// call is always visible here.
    pub async fn credential(&self) -> Option<Credential> {
        let (token, generation) = self.snapshot().await;
        token.map(|token| Credential { token, generation })
    }

    /// The stored token together with the generation it belongs to.
    ///
    /// Both are read under the write lock, so the generation is the right
    /// one to pass to `invalidate` even when no token is stored.
    pub async fn snapshot(&self) -> (Option<String>, u64) {
        let _guard = self.writes.lock().await;
        let token = self.store.get().await.into_token();

        let mut generation = 0;
        self.state.send_if_modified(|s| {
            let changed = s.token != token;
            if changed {
                debug!("Session reconciled with credential store");
                Self::apply(s, token.clone());
            }
            generation = s.generation;
            changed
        });
        (token, generation)
    }

    /// Clear the credential after the server rejected it.
    ///
    /// `generation` is the one current when the rejected request was sent.
    /// If the credential has changed since (a newer login), nothing is
    /// cleared and `false` is returned.
    pub async fn invalidate(&self, generation: u64) -> bool {
        let _guard = self.writes.lock().await;
        let current = self.generation();
        if current != generation {
            debug!(
                sent_with = generation,
                current, "Ignoring 401 for a superseded credential"
            );
            return false;
        }

        let outcome = self.store.clear().await;
        if !outcome.is_ok() {
            return false;
        }
        self.state.send_modify(|s| Self::apply(s, None));
        warn!("Credential rejected by server, session cleared");
        true
    }

    fn apply(state: &mut SessionState, token: Option<String>) {
        if state.token != token {
            state.token = token;
            state.generation += 1;
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("backend", &self.store.backend_name())
            .field("state", &*self.state.borrow())
            .finish()
    }
}
