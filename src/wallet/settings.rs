// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User preferences and local data export.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::contacts::{ContactBook, ContactEntry, ContactError};
use super::session::UserSession;
use super::store::{LocalStore, LocalStoreResult};
use crate::models::UserView;

pub const SETTINGS_KEY: &str = "sentechain_settings";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub notifications: bool,
    pub email_alerts: bool,
    pub two_factor: bool,
    pub dark_mode: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            notifications: true,
            email_alerts: false,
            two_factor: false,
            dark_mode: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceFlag {
    Notifications,
    EmailAlerts,
    TwoFactor,
    DarkMode,
}

impl Preferences {
    fn flag_mut(&mut self, flag: PreferenceFlag) -> &mut bool {
        match flag {
            PreferenceFlag::Notifications => &mut self.notifications,
            PreferenceFlag::EmailAlerts => &mut self.email_alerts,
            PreferenceFlag::TwoFactor => &mut self.two_factor,
            PreferenceFlag::DarkMode => &mut self.dark_mode,
        }
    }
}

/// Everything a user can download from the settings page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupExport {
    pub user: Option<UserView>,
    pub contacts: Vec<ContactEntry>,
    pub settings: Preferences,
    pub export_date: DateTime<Utc>,
}

impl BackupExport {
    /// `sentechain-backup-<unix millis>.json`
    pub fn file_name(&self) -> String {
        format!("sentechain-backup-{}.json", self.export_date.timestamp_millis())
    }
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    store: LocalStore,
}

impl SettingsStore {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Saved preferences, or the defaults when nothing was saved yet.
    pub fn load(&self) -> LocalStoreResult<Preferences> {
        Ok(self.store.get_json(SETTINGS_KEY)?.unwrap_or_default())
    }

    pub fn save(&self, preferences: &Preferences) -> LocalStoreResult<()> {
        self.store.set_json(SETTINGS_KEY, preferences)
    }

    /// Flip one flag and persist the result.
    pub fn toggle(&self, flag: PreferenceFlag) -> LocalStoreResult<Preferences> {
        let mut preferences = self.load()?;
        let value = preferences.flag_mut(flag);
        *value = !*value;
        self.save(&preferences)?;
        Ok(preferences)
    }

    pub fn export_backup(&self, session: Option<&UserSession>) -> Result<BackupExport, ContactError> {
        let contacts = match session {
            Some(session) => ContactBook::new(self.store.clone(), &session.wallet_address).list()?,
            None => Vec::new(),
        };
        Ok(BackupExport {
            user: session.map(UserSession::user),
            contacts,
            settings: self.load()?,
            export_date: Utc::now(),
        })
    }

    /// Remove all local data, session included.
    pub fn clear_all(&self) -> LocalStoreResult<()> {
        self.store.clear()?;
        tracing::info!("Local data cleared");
        Ok(())
    }
}
