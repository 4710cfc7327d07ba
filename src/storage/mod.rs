// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # User Storage
//!
//! Registered users live behind the [`UserStore`] trait. Two backends exist:
//!
//! - [`RedbUserStore`]: embedded ACID database at `$DATA_DIR/users.redb`
//! - [`InMemoryUserStore`]: process memory, lost on restart
//!
//! The backend is chosen once at startup by [`open_user_store`]. If the
//! database cannot be opened the service keeps running on the in-memory
//! store and logs a warning.
//!
//! ## Uniqueness
//!
//! Email, phone, username and wallet address are each unique. Lookups on
//! wallet address and username are case-insensitive.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ServerConfig;
use crate::identity::Identifier;

pub mod memory;
pub mod redb_store;

pub use memory::InMemoryUserStore;
pub use redb_store::RedbUserStore;

/// Maximum number of hits returned by a user search.
pub const SEARCH_LIMIT: usize = 10;

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("duplicate {0}")]
    Conflict(&'static str),

    #[error("user not found: {0}")]
    NotFound(String),

    #[error("store lock poisoned")]
    LockPoisoned,
}

pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Stored User
// =============================================================================

/// A registered user as persisted by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredUser {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub wallet_address: String,
    pub created_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
}

impl StoredUser {
    /// Build a fresh record for a first-time identifier.
    pub fn new(identifier: &Identifier, username: String, wallet_address: String) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            username,
            email: identifier.email().map(str::to_string),
            phone: identifier.phone().map(str::to_string),
            wallet_address,
            created_at: now,
            last_login: now,
        }
    }

    /// Index keys for every identifier this user can log in with.
    pub(crate) fn identifier_keys(&self) -> Vec<String> {
        let mut keys = Vec::with_capacity(2);
        if let Some(email) = &self.email {
            keys.push(email_key(email));
        }
        if let Some(phone) = &self.phone {
            keys.push(phone_key(phone));
        }
        keys
    }

    /// Case-insensitive substring match on username or wallet address.
    pub(crate) fn matches(&self, needle_lower: &str) -> bool {
        self.username.to_lowercase().contains(needle_lower)
            || self.wallet_address.to_lowercase().contains(needle_lower)
    }
}

fn email_key(email: &str) -> String {
    format!("email:{email}")
}

fn phone_key(phone: &str) -> String {
    format!("phone:{phone}")
}

/// Index key for a parsed identifier.
pub(crate) fn identifier_key(identifier: &Identifier) -> String {
    match identifier {
        Identifier::Email(v) => email_key(v),
        Identifier::Phone(v) => phone_key(v),
    }
}

/// Sort search hits oldest-first and cap them.
pub(crate) fn finish_search(mut hits: Vec<StoredUser>, limit: usize) -> Vec<StoredUser> {
    hits.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    hits.truncate(limit);
    hits
}

// =============================================================================
// UserStore trait
// =============================================================================

/// Persistence port for registered users.
pub trait UserStore: Send + Sync {
    /// Short backend label reported by `/health`.
    fn backend_name(&self) -> &'static str;

    fn find_by_identifier(&self, identifier: &Identifier) -> StorageResult<Option<StoredUser>>;

    /// Case-insensitive wallet address lookup.
    fn find_by_wallet(&self, wallet_address: &str) -> StorageResult<Option<StoredUser>>;

    fn find_by_id(&self, id: &str) -> StorageResult<Option<StoredUser>>;

    /// Case-insensitive username check.
    fn username_taken(&self, username: &str) -> StorageResult<bool>;

    /// Insert a new user, failing with `Conflict` if any unique field is taken.
    fn insert(&self, user: &StoredUser) -> StorageResult<()>;

    /// Stamp `last_login` and return the updated record.
    fn touch_last_login(&self, id: &str, at: DateTime<Utc>) -> StorageResult<StoredUser>;

    /// Users whose username or wallet address contains `query`, case-insensitively.
    fn search(&self, query: &str, limit: usize) -> StorageResult<Vec<StoredUser>>;
}

/// Open the configured user store, falling back to memory.
pub fn open_user_store(config: &ServerConfig) -> Arc<dyn UserStore> {
    match config.user_db_path() {
        Some(path) => match RedbUserStore::open(&path) {
            Ok(store) => {
                tracing::info!(path = %path.display(), "user store opened");
                Arc::new(store)
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "could not open user database, falling back to in-memory store"
                );
                Arc::new(InMemoryUserStore::new())
            }
        },
        None => {
            tracing::warn!("DATA_DIR not set, users are kept in memory only");
            Arc::new(InMemoryUserStore::new())
        }
    }
}
