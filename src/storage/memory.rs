// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory user store used when no data directory is configured.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use super::{finish_search, identifier_key, StorageError, StorageResult, StoredUser, UserStore};
use crate::identity::Identifier;

#[derive(Default)]
struct Inner {
    users: HashMap<String, StoredUser>,
    by_identifier: HashMap<String, String>,
    by_wallet: HashMap<String, String>,
    by_username: HashMap<String, String>,
}

impl Inner {
    fn get_via(&self, index: &HashMap<String, String>, key: &str) -> Option<StoredUser> {
        index.get(key).and_then(|id| self.users.get(id)).cloned()
    }
}

#[derive(Default)]
pub struct InMemoryUserStore {
    inner: RwLock<Inner>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.users.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl UserStore for InMemoryUserStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn find_by_identifier(&self, identifier: &Identifier) -> StorageResult<Option<StoredUser>> {
        let inner = self.inner.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(inner.get_via(&inner.by_identifier, &identifier_key(identifier)))
    }

    fn find_by_wallet(&self, wallet_address: &str) -> StorageResult<Option<StoredUser>> {
        let inner = self.inner.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(inner.get_via(&inner.by_wallet, &wallet_address.to_lowercase()))
    }

    fn find_by_id(&self, id: &str) -> StorageResult<Option<StoredUser>> {
        let inner = self.inner.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(inner.users.get(id).cloned())
    }

    fn username_taken(&self, username: &str) -> StorageResult<bool> {
        let inner = self.inner.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(inner.by_username.contains_key(&username.to_lowercase()))
    }

    fn insert(&self, user: &StoredUser) -> StorageResult<()> {
        let mut inner = self.inner.write().map_err(|_| StorageError::LockPoisoned)?;

        let identifier_keys = user.identifier_keys();
        for key in &identifier_keys {
            if inner.by_identifier.contains_key(key) {
                let field = if key.starts_with("email:") { "email" } else { "phone" };
                return Err(StorageError::Conflict(field));
            }
        }
        let username_key = user.username.to_lowercase();
        if inner.by_username.contains_key(&username_key) {
            return Err(StorageError::Conflict("username"));
        }
        let wallet_key = user.wallet_address.to_lowercase();
        if inner.by_wallet.contains_key(&wallet_key) {
            return Err(StorageError::Conflict("wallet address"));
        }

        for key in identifier_keys {
            inner.by_identifier.insert(key, user.id.clone());
        }
        inner.by_username.insert(username_key, user.id.clone());
        inner.by_wallet.insert(wallet_key, user.id.clone());
        inner.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    fn touch_last_login(&self, id: &str, at: DateTime<Utc>) -> StorageResult<StoredUser> {
        let mut inner = self.inner.write().map_err(|_| StorageError::LockPoisoned)?;
        let user = inner
            .users
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        user.last_login = at;
        Ok(user.clone())
    }

    fn search(&self, query: &str, limit: usize) -> StorageResult<Vec<StoredUser>> {
        let needle = query.to_lowercase();
        let inner = self.inner.read().map_err(|_| StorageError::LockPoisoned)?;
        let hits = inner
            .users
            .values()
            .filter(|u| u.matches(&needle))
            .cloned()
            .collect();
        Ok(finish_search(hits, limit))
    }
}
