// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for the request principal.
//!
//! Both read what the authentication stage left in the request extensions;
//! neither touches the token again.
//!
//! ```rust,ignore
//! async fn my_handler(Auth(principal): Auth) -> impl IntoResponse {
//!     // principal is the validated ClaimsPrincipal
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::{middleware::Authentication, AuthError, ClaimsPrincipal};

/// Extractor for a validated principal.
///
/// Rejects with 401 when the request carried no valid bearer token.
pub struct Auth(pub ClaimsPrincipal);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let outcome = parts
            .extensions
            .get::<Authentication>()
            .ok_or(AuthError::MissingCredentials)?;
        outcome.require().cloned().map(Auth)
    }
}

/// Optional authentication extractor.
///
/// Returns `None` for anonymous callers and callers whose token failed.
pub struct OptionalAuth(pub Option<ClaimsPrincipal>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuth(
            parts
                .extensions
                .get::<Authentication>()
                .and_then(Authentication::principal)
                .cloned(),
        ))
    }
}
