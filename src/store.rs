//! In-memory session store with atomic read-modify-write updates.
//!
//! Stands in for the external persistence gateway. Every command runs as one
//! [`SessionStore::update`] call: the closure validates and mutates a scratch
//! copy under the lock, and only a successful closure replaces the stored
//! document and bumps its version. Two commands racing on the same session
//! therefore serialize on the lock and each sees the other's completed write,
//! never a half-applied one.

use crate::error::GameError;
use crate::session::{GameSession, SessionId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};

/// What an update closure wants done with its scratch copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    /// Store the mutated copy with its version bumped.
    Keep,
    /// Drop the session from the store entirely.
    Remove,
}

/// Shared handle to every live session document.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<SessionId, GameSession>>>,
}

impl SessionStore {
    /// Creates an empty store.
    #[instrument]
    pub fn new() -> Self {
        info!("Creating session store");
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<SessionId, GameSession>>, GameError> {
        self.sessions
            .lock()
            .map_err(|_| GameError::storage("session store lock poisoned"))
    }

    /// Inserts a newly created session.
    ///
    /// # Errors
    ///
    /// `Storage` if the id is already taken or the store is unusable.
    #[instrument(skip(self, session), fields(session_id = %session.id))]
    pub fn insert(&self, session: GameSession) -> Result<(), GameError> {
        let mut sessions = self.lock()?;
        if sessions.contains_key(&session.id) {
            warn!("Session id already exists");
            return Err(GameError::storage("session id already exists"));
        }
        info!("Session stored");
        sessions.insert(session.id.clone(), session);
        Ok(())
    }

    /// Returns a snapshot of the session.
    ///
    /// # Errors
    ///
    /// `SessionNotFound` when no session lives under `id`.
    #[instrument(skip(self))]
    pub fn get(&self, id: &str) -> Result<GameSession, GameError> {
        let sessions = self.lock()?;
        sessions
            .get(id)
            .cloned()
            .ok_or(GameError::SessionNotFound)
    }

    /// Applies `f` to the session atomically.
    ///
    /// The closure works on a scratch copy while the lock is held. When it
    /// returns `Ok`, the copy replaces the stored document with its version
    /// bumped by one; when it returns `Err`, the stored document is untouched
    /// and the error propagates — a rejected command writes nothing.
    #[instrument(skip(self, f))]
    pub fn update<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut GameSession) -> Result<T, GameError>,
    ) -> Result<T, GameError> {
        let mut sessions = self.lock()?;
        let current = sessions.get_mut(id).ok_or(GameError::SessionNotFound)?;
        let mut scratch = current.clone();
        let out = f(&mut scratch)?;
        scratch.version = current.version + 1;
        debug!(version = scratch.version, "Session updated");
        *current = scratch;
        Ok(out)
    }

    /// Applies `f` atomically, letting the closure decide whether the mutated
    /// copy is stored or the session is dropped entirely.
    ///
    /// The removal decision runs under the same lock as the mutation, so no
    /// other command can slip in between them: a session observed empty by
    /// the closure is still empty when it is removed.
    ///
    /// # Errors
    ///
    /// `SessionNotFound` when no session lives under `id`; closure errors
    /// propagate with the stored document untouched.
    #[instrument(skip(self, f))]
    pub fn update_or_remove<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut GameSession) -> Result<(T, Commit), GameError>,
    ) -> Result<T, GameError> {
        let mut sessions = self.lock()?;
        let current = sessions.get_mut(id).ok_or(GameError::SessionNotFound)?;
        let mut scratch = current.clone();
        let (out, commit) = f(&mut scratch)?;
        match commit {
            Commit::Keep => {
                scratch.version = current.version + 1;
                debug!(version = scratch.version, "Session updated");
                *current = scratch;
            }
            Commit::Remove => {
                sessions.remove(id);
                info!(session_id = id, "Session removed");
            }
        }
        Ok(out)
    }

    /// Removes the session entirely.
    ///
    /// # Errors
    ///
    /// `SessionNotFound` when no session lives under `id`.
    #[instrument(skip(self))]
    pub fn remove(&self, id: &str) -> Result<(), GameError> {
        let mut sessions = self.lock()?;
        sessions
            .remove(id)
            .map(|_| info!(session_id = id, "Session removed"))
            .ok_or(GameError::SessionNotFound)
    }

    /// Snapshots every live session.
    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<GameSession>, GameError> {
        let sessions = self.lock()?;
        let mut all: Vec<GameSession> = sessions.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        debug!(count = all.len(), "Sessions listed");
        Ok(all)
    }
}
