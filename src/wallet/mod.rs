// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client-side wallet core.
//!
//! Everything the dashboard needs apart from rendering:
//! - `provider` / `local_provider` - EIP-1193 wallet adapter
//! - `refresh` - confirmation-driven balance refresh
//! - `session`, `contacts`, `settings` - state kept in a [`LocalStore`]
//! - `history` - transfer history from token logs
//! - `setup` - environment self-check
//! - `api_client` - backend auth API client

pub mod api_client;
pub mod contacts;
pub mod history;
pub mod local_provider;
pub mod provider;
pub mod refresh;
pub mod session;
pub mod settings;
pub mod setup;
pub mod store;

pub use api_client::{ApiClientError, AuthApiClient};
pub use contacts::{ContactBook, ContactEntry, ContactError};
pub use local_provider::LocalWalletProvider;
pub use provider::{Eip1193, NetworkSwitch, ProviderError, ProviderEvent, WalletAdapter};
pub use refresh::{RefreshConfig, RefreshCoordinator, TrackHandle, TrackPhase};
pub use session::{SessionStore, UserSession};
pub use settings::{Preferences, SettingsStore};
pub use store::{LocalStore, LocalStoreError};
