// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use chrono::Utc;

use crate::models::{HealthResponse, ServiceEndpoints, ServiceIndex};
use crate::state::AppState;

/// Liveness check reporting the active storage backend.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is running", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        storage: state.users.backend_name().to_string(),
    })
}

/// Service index listing the available endpoints.
#[utoipa::path(
    get,
    path = "/",
    tag = "Health",
    responses((status = 200, body = ServiceIndex))
)]
pub async fn index() -> Json<ServiceIndex> {
    Json(ServiceIndex {
        message: "SenteChain Backend API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints: ServiceEndpoints {
            health: "/health".to_string(),
            login: "POST /api/auth/login".to_string(),
            profile: "GET /api/auth/profile/{walletAddress}".to_string(),
            search: "GET /api/auth/search?query=username".to_string(),
            me: "GET /api/auth/me".to_string(),
            docs: "/docs".to_string(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_reports_memory_backend() {
        let Json(response) = health(State(AppState::default())).await;
        assert_eq!(response.status, "ok");
        assert_eq!(response.storage, "memory");
    }

    #[tokio::test]
    async fn index_lists_login_endpoint() {
        let Json(response) = index().await;
        assert_eq!(response.message, "SenteChain Backend API");
        assert_eq!(response.endpoints.login, "POST /api/auth/login");
    }
}
