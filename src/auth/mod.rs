// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Session tokens for identifier logins.
//!
//! ## Auth Flow
//!
//! 1. Client posts an email or phone number to `/api/auth/login`
//! 2. Server finds or creates the user and issues an HS256 token carrying
//!    `sub` (user id) and `walletAddress`, valid for `TOKEN_TTL_DAYS`
//! 3. Client sends `Authorization: Bearer <token>` to protected routes
//!
//! Tokens are never revoked server-side; logout is a client-side discard.

pub mod claims;
pub mod error;
pub mod extractor;
pub mod tokens;

pub use claims::{AuthenticatedUser, SessionClaims};
pub use error::AuthError;
pub use extractor::Auth;
pub use tokens::TokenIssuer;
