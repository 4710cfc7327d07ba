// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Logged-in session persisted between runs.
//!
//! A session is two entries: the user object as JSON and the bearer token.
//! Both must be present for a session to load. Logging out only deletes the
//! local entries; the backend keeps no session state.

use serde::{Deserialize, Serialize};

use super::store::{LocalStore, LocalStoreResult};
use crate::models::{LoginResponse, UserView};

pub const USER_KEY: &str = "sentechain_user";
pub const TOKEN_KEY: &str = "sentechain_token";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSession {
    pub id: String,
    pub username: String,
    pub wallet_address: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub token: String,
}

impl UserSession {
    pub fn new(user: UserView, token: String) -> Self {
        Self {
            id: user.id,
            username: user.username,
            wallet_address: user.wallet_address,
            email: user.email,
            phone: user.phone,
            token,
        }
    }

    pub fn from_login(response: &LoginResponse) -> Self {
        Self::new(response.user.clone(), response.token.clone())
    }

    pub fn user(&self) -> UserView {
        UserView {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            wallet_address: self.wallet_address.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    store: LocalStore,
}

impl SessionStore {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    pub fn save(&self, session: &UserSession) -> LocalStoreResult<()> {
        self.store.set_json(USER_KEY, &session.user())?;
        self.store.set(TOKEN_KEY, &session.token)?;
        tracing::debug!(username = %session.username, "Session saved");
        Ok(())
    }

    /// The saved session, or `None` unless both the user and the token exist.
    pub fn load(&self) -> LocalStoreResult<Option<UserSession>> {
        let user = self.store.get_json::<UserView>(USER_KEY)?;
        let token = self.store.get(TOKEN_KEY)?;
        Ok(match (user, token) {
            (Some(user), Some(token)) => Some(UserSession::new(user, token)),
            _ => None,
        })
    }

    pub fn logout(&self) -> LocalStoreResult<()> {
        self.store.remove(USER_KEY)?;
        self.store.remove(TOKEN_KEY)?;
        tracing::info!("Logged out");
        Ok(())
    }
}
