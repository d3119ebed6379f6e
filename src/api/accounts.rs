// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account endpoints.
//!
//! Registration and login issue tokens; the admin endpoints edit the
//! `role=admin` claim that the `EsAdmin` policy checks.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    auth::{Auth, Claim, IssuedToken, ROLE_CLAIM},
    error::ApiError,
    identity::IdentityUser,
    pagination::{Paginated, Pagination},
    state::AppState,
};

const ADMIN_ROLE: &str = "admin";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Email and password.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UserCredentials {
    pub email: String,
    pub password: String,
}

/// Target of a role change.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EditAdminRequest {
    /// Identifier of the user to change.
    pub user_id: String,
}

/// The caller as seen through their token.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUserResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub is_admin: bool,
    /// Every claim carried by the token.
    pub claims: Vec<Claim>,
}

fn issue_for(state: &AppState, user: &IdentityUser) -> Result<Json<IssuedToken>, ApiError> {
    let issued = state.security.issuer.issue(&user.token_claims())?;
    Ok(Json(issued))
}

fn admin_claim() -> Claim {
    Claim::new(ROLE_CLAIM, ADMIN_ROLE)
}

// ============================================================================
// Handlers
// ============================================================================

/// Create an account and return a token for it.
#[utoipa::path(
    post,
    path = "/api/accounts/register",
    tag = "Accounts",
    request_body = UserCredentials,
    responses(
        (status = 200, description = "Account created", body = IssuedToken),
        (status = 400, description = "Duplicate email or invalid data")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(credentials): Json<UserCredentials>,
) -> Result<Json<IssuedToken>, ApiError> {
    let user = state
        .identity
        .create_user(&credentials.email, &credentials.password)?;
    tracing::info!(user_id = %user.id, "Account registered");
    issue_for(&state, &user)
}

/// Exchange credentials for a token.
#[utoipa::path(
    post,
    path = "/api/accounts/login",
    tag = "Accounts",
    request_body = UserCredentials,
    responses(
        (status = 200, description = "Login succeeded", body = IssuedToken),
        (status = 400, description = "Incorrect login")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<UserCredentials>,
) -> Result<Json<IssuedToken>, ApiError> {
    match state
        .identity
        .verify_credentials(&credentials.email, &credentials.password)?
    {
        Some(user) => issue_for(&state, &user),
        None => {
            tracing::debug!("Login rejected");
            Err(ApiError::bad_request("Incorrect login"))
        }
    }
}

/// Claims of the authenticated caller.
#[utoipa::path(
    get,
    path = "/api/accounts/me",
    tag = "Accounts",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Caller information", body = CurrentUserResponse),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn me(Auth(principal): Auth) -> Json<CurrentUserResponse> {
    Json(CurrentUserResponse {
        email: principal.email().map(str::to_string),
        is_admin: principal.is_admin(),
        claims: principal.iter().collect(),
    })
}

/// One page of users. The total count is in `cantidadTotalRegistros`.
#[utoipa::path(
    get,
    path = "/api/accounts/users",
    tag = "Accounts",
    security(("bearer" = [])),
    params(Pagination),
    responses(
        (status = 200, description = "Users ordered by email", body = [IdentityUser],
            headers(("cantidadTotalRegistros" = usize, description = "Total number of users"))),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<Paginated<IdentityUser>, ApiError> {
    let (items, total) = state.identity.list_users(page.offset(), page.limit())?;
    Ok(Paginated { items, total })
}

/// Grant the admin role.
#[utoipa::path(
    post,
    path = "/api/accounts/make-admin",
    tag = "Accounts",
    security(("bearer" = [])),
    request_body = EditAdminRequest,
    responses(
        (status = 204, description = "Role granted"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "User not found")
    )
)]
pub async fn make_admin(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Json(request): Json<EditAdminRequest>,
) -> Result<StatusCode, ApiError> {
    state.identity.add_claim(&request.user_id, admin_claim())?;
    tracing::info!(
        user_id = %request.user_id,
        granted_by = caller.email().unwrap_or("unknown"),
        "Admin role granted"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Revoke the admin role.
#[utoipa::path(
    post,
    path = "/api/accounts/remove-admin",
    tag = "Accounts",
    security(("bearer" = [])),
    request_body = EditAdminRequest,
    responses(
        (status = 204, description = "Role revoked"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "User not found")
    )
)]
pub async fn remove_admin(
    State(state): State<AppState>,
    Auth(caller): Auth,
    Json(request): Json<EditAdminRequest>,
) -> Result<StatusCode, ApiError> {
    state.identity.remove_claim(&request.user_id, &admin_claim())?;
    tracing::info!(
        user_id = %request.user_id,
        revoked_by = caller.email().unwrap_or("unknown"),
        "Admin role revoked"
    );
    Ok(StatusCode::NO_CONTENT)
}
