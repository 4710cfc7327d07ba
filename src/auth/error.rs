// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Why a session token was refused or could not be issued.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Authorization header is required")]
    MissingBearer,
    #[error("Authorization header must be 'Bearer <token>'")]
    NotBearer,
    #[error("Session token is malformed")]
    Malformed,
    #[error("Session token signature does not match")]
    BadSignature,
    #[error("Session has expired, please log in again")]
    Expired,
    #[error("Could not issue session token: {0}")]
    Signing(String),
}

impl AuthError {
    /// Stable machine-readable code sent next to the message.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingBearer => "missing_bearer",
            AuthError::NotBearer => "not_bearer",
            AuthError::Malformed => "malformed_token",
            AuthError::BadSignature => "bad_signature",
            AuthError::Expired => "session_expired",
            AuthError::Signing(_) => "signing_failed",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match &self {
            AuthError::Signing(reason) => tracing::error!(%reason, "session token signing failed"),
            other => tracing::debug!(code = other.code(), "session token rejected"),
        }
        let body = Json(json!({
            "error": self.to_string(),
            "error_code": self.code(),
        }));
        (self.status(), body).into_response()
    }
}
