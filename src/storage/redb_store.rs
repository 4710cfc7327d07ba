// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded user database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: user id → serialized StoredUser (JSON bytes)
//! - `identifier_index`: `email:<addr>` / `phone:<number>` → user id
//! - `wallet_index`: lowercase wallet address → user id
//! - `username_index`: lowercase username → user id

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::{finish_search, identifier_key, StorageError, StorageResult, StoredUser, UserStore};
use crate::identity::Identifier;

// =============================================================================
// Table Definitions
// =============================================================================

const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

const IDENTIFIER_INDEX: TableDefinition<&str, &str> = TableDefinition::new("identifier_index");

const WALLET_INDEX: TableDefinition<&str, &str> = TableDefinition::new("wallet_index");

const USERNAME_INDEX: TableDefinition<&str, &str> = TableDefinition::new("username_index");

// =============================================================================
// RedbUserStore
// =============================================================================

pub struct RedbUserStore {
    db: Database,
}

impl RedbUserStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(IDENTIFIER_INDEX)?;
            let _ = write_txn.open_table(WALLET_INDEX)?;
            let _ = write_txn.open_table(USERNAME_INDEX)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Resolve a user id through one of the index tables.
    fn lookup(
        &self,
        index: TableDefinition<'static, &'static str, &'static str>,
        key: &str,
    ) -> StorageResult<Option<StoredUser>> {
        let read_txn = self.db.begin_read()?;
        let index_table = read_txn.open_table(index)?;
        let id = match index_table.get(key)? {
            Some(v) => v.value().to_string(),
            None => return Ok(None),
        };
        let users = read_txn.open_table(USERS)?;
        match users.get(id.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }
}

impl UserStore for RedbUserStore {
    fn backend_name(&self) -> &'static str {
        "redb"
    }

    fn find_by_identifier(&self, identifier: &Identifier) -> StorageResult<Option<StoredUser>> {
        self.lookup(IDENTIFIER_INDEX, &identifier_key(identifier))
    }

    fn find_by_wallet(&self, wallet_address: &str) -> StorageResult<Option<StoredUser>> {
        self.lookup(WALLET_INDEX, &wallet_address.to_lowercase())
    }

    fn find_by_id(&self, id: &str) -> StorageResult<Option<StoredUser>> {
        let read_txn = self.db.begin_read()?;
        let users = read_txn.open_table(USERS)?;
        match users.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn username_taken(&self, username: &str) -> StorageResult<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERNAME_INDEX)?;
        Ok(table.get(username.to_lowercase().as_str())?.is_some())
    }

    fn insert(&self, user: &StoredUser) -> StorageResult<()> {
        let json = serde_json::to_vec(user)?;
        let identifier_keys = user.identifier_keys();
        let username_key = user.username.to_lowercase();
        let wallet_key = user.wallet_address.to_lowercase();

        let write_txn = self.db.begin_write()?;
        let conflict = {
            let mut ids = write_txn.open_table(IDENTIFIER_INDEX)?;
            let mut usernames = write_txn.open_table(USERNAME_INDEX)?;
            let mut wallets = write_txn.open_table(WALLET_INDEX)?;

            let mut conflict = None;
            for key in &identifier_keys {
                if ids.get(key.as_str())?.is_some() {
                    conflict = Some(if key.starts_with("email:") { "email" } else { "phone" });
                    break;
                }
            }
            if conflict.is_none() && usernames.get(username_key.as_str())?.is_some() {
                conflict = Some("username");
            }
            if conflict.is_none() && wallets.get(wallet_key.as_str())?.is_some() {
                conflict = Some("wallet address");
            }

            if conflict.is_none() {
                for key in &identifier_keys {
                    ids.insert(key.as_str(), user.id.as_str())?;
                }
                usernames.insert(username_key.as_str(), user.id.as_str())?;
                wallets.insert(wallet_key.as_str(), user.id.as_str())?;
                let mut users = write_txn.open_table(USERS)?;
                users.insert(user.id.as_str(), json.as_slice())?;
            }
            conflict
        };

        match conflict {
            Some(field) => {
                write_txn.abort()?;
                Err(StorageError::Conflict(field))
            }
            None => {
                write_txn.commit()?;
                Ok(())
            }
        }
    }

    fn touch_last_login(&self, id: &str, at: DateTime<Utc>) -> StorageResult<StoredUser> {
        let write_txn = self.db.begin_write()?;
        let updated = {
            let mut table = write_txn.open_table(USERS)?;

            // Read existing value and deserialize before mutating
            let existing_bytes = {
                let existing = table
                    .get(id)?
                    .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
                existing.value().to_vec()
            };

            let mut user: StoredUser = serde_json::from_slice(&existing_bytes)?;
            user.last_login = at;
            let json = serde_json::to_vec(&user)?;
            table.insert(id, json.as_slice())?;
            user
        };
        write_txn.commit()?;
        Ok(updated)
    }

    fn search(&self, query: &str, limit: usize) -> StorageResult<Vec<StoredUser>> {
        let needle = query.to_lowercase();
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USERS)?;

        let mut hits = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let user: StoredUser = serde_json::from_slice(value.value())?;
            if user.matches(&needle) {
                hits.push(user);
            }
        }
        Ok(finish_search(hits, limit))
    }
}
