// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token claims and authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Claims carried by a SenteChain session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    /// Subject: the backend user id.
    pub sub: String,

    #[serde(rename = "walletAddress")]
    pub wallet_address: String,

    /// Issued at (unix seconds)
    pub iat: i64,

    /// Expiration (unix seconds)
    pub exp: i64,
}

/// Authenticated user information extracted from a verified token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub wallet_address: String,

    /// Token expiration (unix seconds), not serialized
    #[serde(skip)]
    pub expires_at: i64,
}

impl From<SessionClaims> for AuthenticatedUser {
    fn from(claims: SessionClaims) -> Self {
        Self {
            user_id: claims.sub,
            wallet_address: claims.wallet_address,
            expires_at: claims.exp,
        }
    }
}
