//! File-backed session store with synchronous observer notifications.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::AuthError;

// ── Data model ──────────────────────────────────────────────────

/// Profile returned by the server's `/user/get` endpoint.
///
/// Only `username` is interpreted by this crate; every other field the
/// server sends is carried through untouched in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub username: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    /// Profile with just a username (other fields empty).
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            extra: Map::new(),
        }
    }

    /// Parse a profile out of a raw server payload.
    pub fn from_value(value: Value) -> Result<Self, AuthError> {
        serde_json::from_value(value)
            .map_err(|e| AuthError::Validation(format!("malformed profile payload: {e}")))
    }
}

/// The durable unit of truth: authenticated flag plus the profile.
///
/// Invariant: `is_authenticated == true` iff `user_info` is present.
/// Mutations always replace the whole record; the two fields are never
/// written independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub is_authenticated: bool,
    pub user_info: Option<UserProfile>,
}

impl SessionRecord {
    /// The logged-out default.
    pub fn logged_out() -> Self {
        Self {
            is_authenticated: false,
            user_info: None,
        }
    }

    /// An authenticated record for the given profile.
    pub fn authenticated(profile: UserProfile) -> Self {
        Self {
            is_authenticated: true,
            user_info: Some(profile),
        }
    }
}

impl Default for SessionRecord {
    fn default() -> Self {
        Self::logged_out()
    }
}

// ── Store ───────────────────────────────────────────────────────

/// Handle returned by [`SessionStore::subscribe`]; pass it back to
/// [`SessionStore::unsubscribe`] to stop notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Observer = Arc<dyn Fn(&SessionRecord) + Send + Sync>;

/// Source of truth for "is the user authenticated" and "who are they".
///
/// Observers are notified synchronously, once per mutation, in mutation
/// order, always with the post-mutation record. A callback may read the
/// store (or subscribe/unsubscribe) during its own notification.
pub struct SessionStore {
    record: Mutex<SessionRecord>,
    observers: Mutex<ObserverList>,
    path: Option<PathBuf>,
}

#[derive(Default)]
struct ObserverList {
    next_id: u64,
    entries: Vec<(SubscriptionId, Observer)>,
}

impl SessionStore {
    /// Create an in-memory store (no durable copy).
    pub fn new() -> Self {
        Self {
            record: Mutex::new(SessionRecord::logged_out()),
            observers: Mutex::new(ObserverList::default()),
            path: None,
        }
    }

    /// Open a file-backed store.
    ///
    /// A missing or malformed file falls back to the logged-out default;
    /// construction never fails.
    pub fn open(path: &Path) -> Self {
        Self {
            record: Mutex::new(load_record(path)),
            observers: Mutex::new(ObserverList::default()),
            path: Some(path.to_path_buf()),
        }
    }

    /// Snapshot of the current record.
    pub fn read(&self) -> SessionRecord {
        self.record.lock().clone()
    }

    /// Register an observer. It is invoked immediately with the current
    /// record, then once per subsequent mutation.
    pub fn subscribe(&self, observer: impl Fn(&SessionRecord) + Send + Sync + 'static) -> SubscriptionId {
        let observer: Observer = Arc::new(observer);
        let current = self.read();
        let id = {
            let mut list = self.observers.lock();
            list.next_id += 1;
            let id = SubscriptionId(list.next_id);
            list.entries.push((id, observer.clone()));
            id
        };
        observer(&current);
        id
    }

    /// Remove an observer. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.observers.lock().entries.retain(|(entry_id, _)| *entry_id != id);
    }

    /// Replace the record with an authenticated one for `profile`,
    /// persist it, and notify. Every call is a distinct event — two
    /// identical calls produce two notifications.
    pub fn set_authenticated(&self, profile: UserProfile) {
        self.commit(SessionRecord::authenticated(profile));
    }

    /// Reset to the logged-out record, erase the durable copy, notify.
    pub fn clear(&self) {
        self.commit(SessionRecord::logged_out());
    }

    /// Replace `user_info.username`, keeping every other profile field.
    ///
    /// Fails with [`AuthError::InvalidState`] when logged out — there is
    /// no profile to merge into.
    pub fn update_username(&self, username: &str) -> Result<(), AuthError> {
        let next = {
            let current = self.record.lock();
            let Some(profile) = current.user_info.as_ref() else {
                return Err(AuthError::InvalidState(
                    "cannot update username while logged out".into(),
                ));
            };
            let mut profile = profile.clone();
            profile.username = username.to_string();
            SessionRecord::authenticated(profile)
        };
        self.commit(next);
        Ok(())
    }

    /// Store, persist, then fan out — in that order, so a callback that
    /// reads the store observes the value it was just handed.
    fn commit(&self, next: SessionRecord) {
        *self.record.lock() = next.clone();
        self.persist(&next);
        let observers: Vec<Observer> = self
            .observers
            .lock()
            .entries
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();
        for observer in observers {
            observer(&next);
        }
    }

    /// Best-effort durable write: an authenticated record is serialized
    /// to the backing file, a logged-out one erases it. Failures are
    /// logged, never propagated.
    fn persist(&self, record: &SessionRecord) {
        let Some(path) = &self.path else {
            return;
        };

        let result = if record.is_authenticated {
            write_json(path, record)
        } else {
            match std::fs::remove_file(path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
                _ => Ok(()),
            }
        };

        if let Err(e) = result {
            tracing::warn!(path = %path.display(), error = %e, "session persistence failed; continuing in memory");
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Deserialize the durable record, degrading to logged-out on any problem.
fn load_record(path: &Path) -> SessionRecord {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(_) => return SessionRecord::logged_out(),
    };

    match serde_json::from_slice::<SessionRecord>(&bytes) {
        // A record violating the authenticated ⇔ profile-present pairing
        // is treated the same as a corrupt file.
        Ok(record) if record.is_authenticated == record.user_info.is_some() => record,
        Ok(_) => {
            tracing::warn!(path = %path.display(), "stored session record is inconsistent; starting logged out");
            SessionRecord::logged_out()
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "stored session record is unreadable; starting logged out");
            SessionRecord::logged_out()
        }
    }
}

fn write_json(path: &Path, record: &SessionRecord) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let bytes = serde_json::to_vec(record).map_err(std::io::Error::other)?;
    std::fs::write(path, bytes)
}

// ── Tests ───────────────────────────────────────────────────────
