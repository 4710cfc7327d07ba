// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP client for the backend auth API.

use std::time::Duration;

use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize};

use crate::models::{LoginRequest, LoginResponse, ProfileResponse, SearchResponse};

pub const BACKEND_URL_ENV: &str = "SENTECHAIN_BACKEND_URL";
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";

#[derive(Debug, thiserror::Error)]
pub enum ApiClientError {
    #[error("Request failed: {0}")]
    Request(String),

    /// The backend answered with an error body.
    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Clone)]
pub struct AuthApiClient {
    base_url: String,
    http: Client,
}

impl AuthApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| ApiClientError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { base_url, http })
    }

    /// Use `SENTECHAIN_BACKEND_URL`, falling back to `http://localhost:5000`.
    pub fn from_env() -> Result<Self, ApiClientError> {
        let base_url = std::env::var(BACKEND_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
        Self::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read<T: DeserializeOwned>(response: Response, what: &str) -> Result<T, ApiClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or(body);
            return Err(ApiClientError::Api {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json()
            .await
            .map_err(|e| ApiClientError::InvalidResponse(format!("{what}: {e}")))
    }

    pub async fn login(&self, identifier: &str) -> Result<LoginResponse, ApiClientError> {
        let response = self
            .http
            .post(self.url("/api/auth/login"))
            .json(&LoginRequest {
                identifier: identifier.to_string(),
            })
            .send()
            .await
            .map_err(|e| ApiClientError::Request(format!("POST /api/auth/login failed: {e}")))?;
        Self::read(response, "login").await
    }

    pub async fn profile(&self, wallet_address: &str) -> Result<ProfileResponse, ApiClientError> {
        let response = self
            .http
            .get(self.url(&format!("/api/auth/profile/{wallet_address}")))
            .send()
            .await
            .map_err(|e| ApiClientError::Request(format!("GET profile failed: {e}")))?;
        Self::read(response, "profile").await
    }

    pub async fn search(&self, query: &str) -> Result<SearchResponse, ApiClientError> {
        let response = self
            .http
            .get(self.url("/api/auth/search"))
            .query(&[("query", query)])
            .send()
            .await
            .map_err(|e| ApiClientError::Request(format!("GET /api/auth/search failed: {e}")))?;
        Self::read(response, "search").await
    }

    /// Current user for a bearer token.
    pub async fn me(&self, token: &str) -> Result<ProfileResponse, ApiClientError> {
        let response = self
            .http
            .get(self.url("/api/auth/me"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ApiClientError::Request(format!("GET /api/auth/me failed: {e}")))?;
        Self::read(response, "me").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::router;
    use crate::state::AppState;

    async fn spawn_backend() -> AuthApiClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(AppState::default())).await.unwrap();
        });
        AuthApiClient::new(format!("http://{addr}/")).unwrap()
    }

    #[test]
    fn trims_trailing_slash() {
        let client = AuthApiClient::new("http://localhost:5000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000");
        assert_eq!(client.url("/health"), "http://localhost:5000/health");
    }

    #[tokio::test]
    async fn error_bodies_become_api_errors() {
        let client = spawn_backend().await;

        let err = client.login("   ").await.unwrap_err();
        assert!(matches!(err, ApiClientError::Api { status: 400, .. }));

        let err = client.search("").await.unwrap_err();
        let ApiClientError::Api { status, message } = err else {
            panic!("expected Api error, got {err:?}");
        };
        assert_eq!(status, 400);
        assert_eq!(message, "Search query is required");

        let err = client.me("not-a-token").await.unwrap_err();
        assert!(matches!(err, ApiClientError::Api { status: 401, .. }));
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_request_error() {
        let client = AuthApiClient::new("http://127.0.0.1:9").unwrap();
        assert!(matches!(
            client.search("alice").await,
            Err(ApiClientError::Request(_))
        ));
    }
}
