// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::storage::StoredUser;

// =============================================================================
// Wallet Address
// =============================================================================

/// A `0x`-prefixed, 40 hex digit account address.
///
/// The original casing is preserved; comparisons elsewhere are
/// case-insensitive.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct WalletAddress(pub String);

impl WalletAddress {
    /// Returns `None` unless the value matches `^0x[0-9a-fA-F]{40}$`.
    pub fn parse(value: &str) -> Option<Self> {
        is_wallet_address(value).then(|| WalletAddress(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase form used as a lookup key.
    pub fn key(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl std::fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<WalletAddress> for String {
    fn from(value: WalletAddress) -> Self {
        value.0
    }
}

/// `^0x[0-9a-fA-F]{40}$`
pub fn is_wallet_address(value: &str) -> bool {
    value.len() == 42
        && value.starts_with("0x")
        && value[2..].chars().all(|c| c.is_ascii_hexdigit())
}

// =============================================================================
// Auth Models
// =============================================================================

/// Login (or first-time registration) with an email address or phone number.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Email address or phone number.
    #[serde(default)]
    pub identifier: String,
}

/// Public view of a user returned at login.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub wallet_address: String,
}

impl From<&StoredUser> for UserView {
    fn from(user: &StoredUser) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            wallet_address: user.wallet_address.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    /// True when this login created the account.
    pub is_new_user: bool,
    /// Bearer token for `/api/auth/me`.
    pub token: String,
    pub user: UserView,
}

/// Profile view, including the account creation time.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub wallet_address: String,
    pub created_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
}

impl From<&StoredUser> for ProfileView {
    fn from(user: &StoredUser) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            wallet_address: user.wallet_address.clone(),
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    pub success: bool,
    pub user: ProfileView,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Case-insensitive substring of a username or wallet address.
    pub query: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub username: String,
    pub wallet_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SearchResponse {
    pub success: bool,
    pub users: Vec<SearchHit>,
}

// =============================================================================
// Service Models
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Always `"ok"` while the process is serving.
    pub status: String,
    pub timestamp: DateTime<Utc>,
    /// Active user store backend (`redb` or `memory`).
    pub storage: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceIndex {
    pub message: String,
    pub version: String,
    pub endpoints: ServiceEndpoints,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceEndpoints {
    pub health: String,
    pub login: String,
    pub profile: String,
    pub search: String,
    pub me: String,
    pub docs: String,
}
