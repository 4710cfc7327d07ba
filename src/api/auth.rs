// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;

use crate::{
    auth::Auth,
    error::ApiError,
    identity::Identifier,
    models::{
        LoginRequest, LoginResponse, ProfileResponse, ProfileView, SearchHit, SearchQuery,
        SearchResponse, UserView,
    },
    state::AppState,
    storage::{StorageError, StoredUser, UserStore, SEARCH_LIMIT},
};

/// Numbered suffixes tried before falling back to a random one.
const MAX_USERNAME_SUFFIX: u32 = 1000;

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    tag = "Auth",
    responses(
        (status = 200, description = "Logged in, account created on first use", body = LoginResponse),
        (status = 400, description = "Missing or invalid identifier")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let identifier = Identifier::parse(&request.identifier)?;

    let (user, is_new_user) = match state.users.find_by_identifier(&identifier)? {
        Some(existing) => (state.users.touch_last_login(&existing.id, Utc::now())?, false),
        None => register(&state, &identifier)?,
    };

    let token = state
        .tokens
        .issue(&user)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    tracing::info!(
        user_id = %user.id,
        identifier = %identifier.masked(),
        is_new_user,
        "login"
    );

    Ok(Json(LoginResponse {
        success: true,
        is_new_user,
        token,
        user: UserView::from(&user),
    }))
}

/// Create the account for a first-time identifier.
///
/// A concurrent login for the same identifier may win the insert; in that
/// case the stored user is returned as an existing login.
fn register(state: &AppState, identifier: &Identifier) -> Result<(StoredUser, bool), ApiError> {
    let address = state.deriver.derive(identifier).map_err(|e| {
        tracing::error!(error = %e, "address derivation failed");
        ApiError::internal("Server error")
    })?;
    let username = unique_username(state.users.as_ref(), identifier.username_hint())?;
    let user = StoredUser::new(identifier, username, address.to_checksum(None));

    match state.users.insert(&user) {
        Ok(()) => {
            tracing::info!(
                user_id = %user.id,
                wallet_address = %user.wallet_address,
                "registered new user"
            );
            Ok((user, true))
        }
        Err(StorageError::Conflict(field)) => match state.users.find_by_identifier(identifier)? {
            Some(existing) => Ok((state.users.touch_last_login(&existing.id, Utc::now())?, false)),
            None => Err(StorageError::Conflict(field).into()),
        },
        Err(e) => Err(e.into()),
    }
}

fn unique_username(users: &dyn UserStore, hint: &str) -> Result<String, ApiError> {
    if !users.username_taken(hint)? {
        return Ok(hint.to_string());
    }
    for n in 2..MAX_USERNAME_SUFFIX {
        let candidate = format!("{hint}{n}");
        if !users.username_taken(&candidate)? {
            return Ok(candidate);
        }
    }
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    Ok(format!("{hint}_{}", &suffix[..8]))
}

#[utoipa::path(
    get,
    path = "/api/auth/profile/{wallet_address}",
    params(
        ("wallet_address" = String, Path, description = "Wallet address, matched case-insensitively")
    ),
    tag = "Auth",
    responses(
        (status = 200, body = ProfileResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn profile(
    State(state): State<AppState>,
    Path(wallet_address): Path<String>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = state
        .users
        .find_by_wallet(wallet_address.trim())?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ProfileResponse {
        success: true,
        user: ProfileView::from(&user),
    }))
}

#[utoipa::path(
    get,
    path = "/api/auth/search",
    params(SearchQuery),
    tag = "Auth",
    responses(
        (status = 200, body = SearchResponse),
        (status = 400, description = "Search query is required")
    )
)]
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = params
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::bad_request("Search query is required"))?;

    let users = state
        .users
        .search(query, SEARCH_LIMIT)?
        .into_iter()
        .map(|u| SearchHit {
            username: u.username,
            wallet_address: u.wallet_address,
        })
        .collect();

    Ok(Json(SearchResponse {
        success: true,
        users,
    }))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, body = ProfileResponse),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 404, description = "User not found")
    )
)]
pub async fn me(
    Auth(caller): Auth,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = state
        .users
        .find_by_id(&caller.user_id)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(ProfileResponse {
        success: true,
        user: ProfileView::from(&user),
    }))
}
