// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::AuthenticatedUser,
    models::{
        HealthResponse, LoginRequest, LoginResponse, ProfileResponse, ProfileView, SearchHit,
        SearchResponse, ServiceEndpoints, ServiceIndex, UserView, WalletAddress,
    },
    state::AppState,
};

pub mod auth;
pub mod health;

pub fn router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/profile/{wallet_address}", get(auth::profile))
        .route("/search", get(auth::search))
        .route("/me", get(auth::me));

    Router::new()
        .route("/", get(health::index))
        .route("/health", get(health::health))
        .nest("/api/auth", auth_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::index,
        auth::login,
        auth::profile,
        auth::search,
        auth::me
    ),
    components(
        schemas(
            HealthResponse,
            ServiceIndex,
            ServiceEndpoints,
            LoginRequest,
            LoginResponse,
            UserView,
            ProfileResponse,
            ProfileView,
            SearchHit,
            SearchResponse,
            WalletAddress,
            AuthenticatedUser
        )
    ),
    tags(
        (name = "Auth", description = "Identifier login, profiles and user search"),
        (name = "Health", description = "Service status")
    )
)]
pub struct ApiDoc;
