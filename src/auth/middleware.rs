// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication and authorization middleware for Axum.
//!
//! [`authenticate`] runs for every routed request. It never rejects: the
//! outcome is stored in the request extensions as an [`Authentication`],
//! which handlers read through the `Auth` and `OptionalAuth` extractors.
//!
//! [`authorize`] is attached only to endpoints whose [`Access`] is not
//! anonymous. It turns a missing or failed authentication into 401 and a
//! failed policy into 403.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{AuthError, ClaimsPrincipal, PolicyTable};
use crate::state::AppState;

/// Access requirement declared by an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// No authentication needed; any principal (or none) is accepted.
    Anonymous,
    /// A valid token is required.
    Authenticated,
    /// A valid token satisfying every named policy is required.
    Policies(Vec<String>),
}

impl Access {
    pub fn policy(name: impl Into<String>) -> Self {
        Access::Policies(vec![name.into()])
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Access::Anonymous)
    }

    pub fn policies(&self) -> &[String] {
        match self {
            Access::Policies(names) => names,
            _ => &[],
        }
    }
}

/// Outcome of the authentication stage for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    /// No bearer token was presented.
    Anonymous,
    /// The bearer token validated.
    Authenticated(ClaimsPrincipal),
    /// A bearer token was presented and rejected.
    Failed(AuthError),
}

impl Authentication {
    pub fn principal(&self) -> Option<&ClaimsPrincipal> {
        match self {
            Authentication::Authenticated(principal) => Some(principal),
            _ => None,
        }
    }

    /// The principal, or the 401 a protected endpoint answers with.
    pub fn require(&self) -> Result<&ClaimsPrincipal, AuthError> {
        match self {
            Authentication::Authenticated(principal) => Ok(principal),
            Authentication::Failed(err) => Err(err.clone()),
            Authentication::Anonymous => Err(AuthError::MissingCredentials),
        }
    }
}

/// Pull the bearer token out of the `Authorization` header.
///
/// Requests without the header, with another scheme, or with an empty token
/// are anonymous rather than failed.
fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AuthError> {
    let Some(header) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = header.to_str().map_err(|_| AuthError::InvalidAuthHeader)?;

    let Some((scheme, token)) = value.split_once(' ') else {
        return Ok(None);
    };
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return Ok(None);
    }

    let token = token.trim();
    Ok((!token.is_empty()).then_some(token))
}

/// Authentication stage.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let outcome = match bearer_token(request.headers()) {
        Ok(None) => Authentication::Anonymous,
        Ok(Some(token)) => match state.security.validator.validate(token) {
            Ok(principal) => Authentication::Authenticated(principal),
            Err(err) => {
                tracing::debug!(error_code = err.error_code(), "Bearer token rejected");
                Authentication::Failed(err)
            }
        },
        Err(err) => {
            tracing::debug!(error_code = err.error_code(), "Authorization header rejected");
            Authentication::Failed(err)
        }
    };

    request.extensions_mut().insert(outcome);
    next.run(request).await
}

/// State for the authorization stage of one endpoint.
#[derive(Clone)]
pub struct AccessGuard {
    policies: Arc<PolicyTable>,
    access: Access,
}

impl AccessGuard {
    pub fn new(policies: Arc<PolicyTable>, access: Access) -> Self {
        Self { policies, access }
    }

    /// Check the recorded authentication outcome against this endpoint's access.
    pub fn check(&self, outcome: Option<&Authentication>) -> Result<(), AuthError> {
        if self.access.is_anonymous() {
            return Ok(());
        }
        let principal = outcome
            .unwrap_or(&Authentication::Anonymous)
            .require()?;
        self.policies
            .evaluate_all(self.access.policies().iter().map(String::as_str), principal)
    }
}

/// Authorization stage.
pub async fn authorize(
    State(guard): State<AccessGuard>,
    request: Request,
    next: Next,
) -> Response {
    if let Err(err) = guard.check(request.extensions().get::<Authentication>()) {
        tracing::debug!(
            path = %request.uri().path(),
            error_code = err.error_code(),
            "Request not authorized"
        );
        return err.into_response();
    }
    next.run(request).await
}
