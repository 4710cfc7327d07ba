// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-wallet address book.

use serde::{Deserialize, Serialize};

use super::store::{LocalStore, LocalStoreError};
use crate::models::is_wallet_address;

const CONTACTS_KEY_PREFIX: &str = "sentechain_contacts_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactEntry {
    pub id: String,
    pub name: String,
    /// Address exactly as entered.
    pub address: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ContactError {
    #[error("Please fill in all fields")]
    MissingField,

    #[error("Invalid Ethereum address")]
    InvalidAddress,

    #[error("Contact already exists")]
    Duplicate,

    #[error("Contact not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] LocalStoreError),
}

/// Contacts of one wallet, keyed by the owner's lowercase address.
#[derive(Debug, Clone)]
pub struct ContactBook {
    store: LocalStore,
    key: String,
}

impl ContactBook {
    pub fn new(store: LocalStore, owner_address: &str) -> Self {
        Self {
            store,
            key: format!("{CONTACTS_KEY_PREFIX}{}", owner_address.to_lowercase()),
        }
    }

    /// Storage key for this book.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn list(&self) -> Result<Vec<ContactEntry>, ContactError> {
        Ok(self.store.get_json(&self.key)?.unwrap_or_default())
    }

    fn save(&self, contacts: &[ContactEntry]) -> Result<(), ContactError> {
        self.store.set_json(&self.key, &contacts)?;
        Ok(())
    }

    /// Add a contact. Addresses are unique ignoring case.
    pub fn add(&self, name: &str, address: &str) -> Result<ContactEntry, ContactError> {
        let name = name.trim();
        let address = address.trim();
        if name.is_empty() || address.is_empty() {
            return Err(ContactError::MissingField);
        }
        if !is_wallet_address(address) {
            return Err(ContactError::InvalidAddress);
        }

        let mut contacts = self.list()?;
        if contacts
            .iter()
            .any(|c| c.address.eq_ignore_ascii_case(address))
        {
            return Err(ContactError::Duplicate);
        }

        let entry = ContactEntry {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            address: address.to_string(),
        };
        contacts.push(entry.clone());
        self.save(&contacts)?;
        Ok(entry)
    }

    pub fn remove(&self, id: &str) -> Result<ContactEntry, ContactError> {
        let mut contacts = self.list()?;
        let index = contacts
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| ContactError::NotFound(id.to_string()))?;
        let removed = contacts.remove(index);
        self.save(&contacts)?;
        Ok(removed)
    }

    pub fn find_by_address(&self, address: &str) -> Result<Option<ContactEntry>, ContactError> {
        let address = address.trim();
        Ok(self
            .list()?
            .into_iter()
            .find(|c| c.address.eq_ignore_ascii_case(address)))
    }
}
