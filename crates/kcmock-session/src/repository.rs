//! Concurrent session store.
//!
//! Entries move from pending request to established session and never back.
//! Transitions replace an entry only while it still is the exact object the
//! caller read, so a lost race surfaces as an error instead of silently
//! clobbering another writer's state.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::error::{SessionError, SessionResult};
use crate::session::{LoginSession, PersistentSession, SessionRequest};

/// A stored session in one of its two lifecycle stages.
#[derive(Debug, Clone)]
pub enum SessionEntry {
    /// An authorization request waiting for the user to authenticate.
    Request(Arc<SessionRequest>),
    /// An established login session.
    Session(Arc<PersistentSession>),
}

/// Concurrent session store keyed by session ID.
#[derive(Debug, Default)]
pub struct SessionRepository {
    entries: DashMap<String, SessionEntry>,
}

impl SessionRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a new login request.
    ///
    /// # Errors
    ///
    /// Returns an error if any entry already exists under the same session
    /// ID, whether pending or established.
    pub fn put_request(&self, request: Arc<SessionRequest>) -> SessionResult<()> {
        match self.entries.entry(request.session_id().to_string()) {
            Entry::Occupied(_) => Err(SessionError::DuplicateSession(
                request.session_id().to_string(),
            )),
            Entry::Vacant(vacant) => {
                vacant.insert(SessionEntry::Request(request));
                Ok(())
            }
        }
    }

    /// Replaces a pending request with the established session built from it.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored entry is not the given request object
    /// anymore. The store is left unchanged in that case.
    pub fn upgrade_request(
        &self,
        expected: &Arc<SessionRequest>,
        session: Arc<PersistentSession>,
    ) -> SessionResult<()> {
        match self.entries.entry(expected.session_id().to_string()) {
            Entry::Occupied(mut occupied) => match occupied.get() {
                SessionEntry::Request(stored) if Arc::ptr_eq(stored, expected) => {
                    occupied.insert(SessionEntry::Session(session));
                    Ok(())
                }
                _ => Err(SessionError::StaleSession(
                    expected.session_id().to_string(),
                )),
            },
            Entry::Vacant(_) => Err(SessionError::StaleSession(
                expected.session_id().to_string(),
            )),
        }
    }

    /// Replaces an established session with an updated one, e.g. on re-login.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored entry is not the given session object
    /// anymore. The store is left unchanged in that case.
    pub fn update_session(
        &self,
        expected: &Arc<PersistentSession>,
        replacement: Arc<PersistentSession>,
    ) -> SessionResult<()> {
        match self.entries.entry(expected.session_id().to_string()) {
            Entry::Occupied(mut occupied) => match occupied.get() {
                SessionEntry::Session(stored) if Arc::ptr_eq(stored, expected) => {
                    occupied.insert(SessionEntry::Session(replacement));
                    Ok(())
                }
                _ => Err(SessionError::StaleSession(
                    expected.session_id().to_string(),
                )),
            },
            Entry::Vacant(_) => Err(SessionError::StaleSession(
                expected.session_id().to_string(),
            )),
        }
    }

    /// Looks up a pending request. Established sessions do not match.
    #[must_use]
    pub fn get_request(&self, session_id: &str) -> Option<Arc<SessionRequest>> {
        self.entries
            .get(session_id)
            .and_then(|entry| match entry.value() {
                SessionEntry::Request(request) => Some(Arc::clone(request)),
                SessionEntry::Session(_) => None,
            })
    }

    /// Looks up an established session. Pending requests do not match.
    #[must_use]
    pub fn get_session(&self, session_id: &str) -> Option<Arc<PersistentSession>> {
        self.entries
            .get(session_id)
            .and_then(|entry| match entry.value() {
                SessionEntry::Session(session) => Some(Arc::clone(session)),
                SessionEntry::Request(_) => None,
            })
    }

    /// Removes the entry under the given session ID, if any.
    pub fn remove_session(&self, session_id: &str) {
        self.entries.remove(session_id);
    }
}
