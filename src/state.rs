// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::config::{ServerConfig, DEV_JWT_SECRET, DEFAULT_TOKEN_TTL_DAYS};
use crate::identity::{AddressDeriver, DerivationMode};
use crate::storage::{InMemoryUserStore, UserStore};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub tokens: TokenIssuer,
    pub deriver: Arc<AddressDeriver>,
}

impl AppState {
    pub fn new(users: Arc<dyn UserStore>, tokens: TokenIssuer, deriver: AddressDeriver) -> Self {
        Self {
            users,
            tokens,
            deriver: Arc::new(deriver),
        }
    }

    /// Build state from configuration around an already opened store.
    pub fn from_config(config: &ServerConfig, users: Arc<dyn UserStore>) -> Self {
        Self::new(
            users,
            TokenIssuer::new(&config.jwt_secret, config.token_ttl_days),
            AddressDeriver::new(config.derivation_secret.as_bytes(), config.derivation_mode),
        )
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(
            Arc::new(InMemoryUserStore::new()),
            TokenIssuer::new(DEV_JWT_SECRET, DEFAULT_TOKEN_TTL_DAYS),
            AddressDeriver::new(Vec::new(), DerivationMode::Deterministic),
        )
    }
}
