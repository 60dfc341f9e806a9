//! In-memory user registry.
//!
//! Each operation is logged to `database.log` as if it were a query.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::{mapref::entry::Entry, DashMap};
use serde_json::json;
use thiserror::Error;

use crate::app::models::{NewUser, User};
use crate::faults::{FaultKind, IntoFault};
use crate::http::request::RequestId;
use crate::observability::record::timestamp_now;
use crate::observability::LogEmitter;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("User {0} not found")]
    NotFound(u64),

    #[error("A user with email {0} already exists")]
    DuplicateEmail(String),
}

impl IntoFault for StoreError {
    fn fault_kind(&self) -> FaultKind {
        match self {
            StoreError::NotFound(_) => FaultKind::NotFound,
            StoreError::DuplicateEmail(_) => FaultKind::Conflict,
        }
    }
}

/// Thread-safe user registry, cheap to clone.
#[derive(Clone)]
pub struct UserStore {
    users: Arc<DashMap<u64, User>>,
    emails: Arc<DashMap<String, u64>>,
    next_id: Arc<AtomicU64>,
    emitter: Arc<LogEmitter>,
}

impl UserStore {
    pub fn new(emitter: Arc<LogEmitter>) -> Self {
        Self {
            users: Arc::new(DashMap::new()),
            emails: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(1)),
            emitter,
        }
    }

    /// All users ordered by id.
    pub fn list(&self, request_id: Option<&RequestId>) -> Vec<User> {
        let start = Instant::now();
        let mut users: Vec<User> = self.users.iter().map(|entry| entry.value().clone()).collect();
        users.sort_by_key(|u| u.id);

        self.emitter.database_query(
            request_id,
            crate::source_location!(),
            "SELECT * FROM users ORDER BY id",
            json!([]),
            start.elapsed(),
        );
        users
    }

    pub fn get(&self, request_id: Option<&RequestId>, id: u64) -> Result<User, StoreError> {
        let start = Instant::now();
        let user = self.users.get(&id).map(|entry| entry.value().clone());

        self.emitter.database_query(
            request_id,
            crate::source_location!(),
            "SELECT * FROM users WHERE id = ?",
            json!([id]),
            start.elapsed(),
        );
        user.ok_or(StoreError::NotFound(id))
    }

    /// Insert a validated user. Emails are unique, case-insensitively.
    pub fn insert(&self, request_id: Option<&RequestId>, new_user: NewUser) -> Result<User, StoreError> {
        let start = Instant::now();
        let email = new_user.email.trim().to_string();

        let result = match self.emails.entry(email.to_lowercase()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateEmail(email.clone())),
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let user = User {
                    id,
                    name: new_user.name.trim().to_string(),
                    email: email.clone(),
                    created_at: timestamp_now(),
                };
                slot.insert(id);
                self.users.insert(id, user.clone());
                Ok(user)
            }
        };

        self.emitter.database_query(
            request_id,
            crate::source_location!(),
            "INSERT INTO users (name, email) VALUES (?, ?)",
            json!([new_user.name, email]),
            start.elapsed(),
        );
        result
    }

    pub fn remove(&self, request_id: Option<&RequestId>, id: u64) -> Result<User, StoreError> {
        let start = Instant::now();
        let removed = self.users.remove(&id).map(|(_, user)| user);
        if let Some(user) = &removed {
            self.emails.remove(&user.email.to_lowercase());
        }

        self.emitter.database_query(
            request_id,
            crate::source_location!(),
            "DELETE FROM users WHERE id = ?",
            json!([id]),
            start.elapsed(),
        );
        removed.ok_or(StoreError::NotFound(id))
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::faults::Fault;
    use crate::observability::{EmitterOptions, LogCategory};

    fn store(dir: &std::path::Path) -> UserStore {
        UserStore::new(Arc::new(LogEmitter::open(&EmitterOptions::new(dir)).unwrap()))
    }

    fn new_user(name: &str, email: &str) -> NewUser {
        NewUser {
            name: name.into(),
            email: email.into(),
            password: None,
        }
    }

    #[test]
    fn test_insert_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let ada = store.insert(None, new_user("Ada", "ada@example.com")).unwrap();
        assert_eq!(ada.id, 1);
        assert_eq!(store.get(None, 1).unwrap().email, "ada@example.com");
        assert_eq!(store.list(None).len(), 1);

        store.remove(None, 1).unwrap();
        assert!(store.is_empty());
        assert!(matches!(store.get(None, 1), Err(StoreError::NotFound(1))));
    }

    #[test]
    fn test_duplicate_email_is_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        store.insert(None, new_user("Ada", "ada@example.com")).unwrap();
        let err = store.insert(None, new_user("Ada 2", "ADA@example.com")).unwrap_err();
        assert_eq!(Fault::from(err).kind(), FaultKind::Conflict);
        assert_eq!(store.len(), 1);

        // The address is free again after removal.
        store.remove(None, 1).unwrap();
        assert!(store.insert(None, new_user("Ada", "ada@example.com")).is_ok());
    }

    #[test]
    fn test_queries_are_logged() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let id = RequestId::new();

        store.insert(Some(&id), new_user("Ada", "ada@example.com")).unwrap();
        let _ = store.get(Some(&id), 42);

        let log = std::fs::read_to_string(dir.path().join(LogCategory::Database.file_name())).unwrap();
        let records: Vec<serde_json::Value> =
            log.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r["event"] == "database_query"));
        assert!(records.iter().all(|r| r["request_id"] == id.to_string()));
        assert_eq!(records[1]["params"], json!([42]));
    }
}
