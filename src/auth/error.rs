// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication and authorization errors.

use axum::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication error type.
///
/// Every token failure maps to 401 and a failed policy maps to 403. The two
/// never mix: a caller with a valid token is never told they are
/// unauthenticated, and a caller without one is never told they are forbidden.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No bearer token on a request to a protected endpoint
    MissingCredentials,
    /// Authorization header present but not `Bearer <token>`
    InvalidAuthHeader,
    /// Token is not a structurally valid JWT
    MalformedToken,
    /// Token signature does not verify against the signing key
    InvalidSignature,
    /// Token expiry instant has been reached
    TokenExpired,
    /// Token `nbf` instant is still in the future
    TokenNotYetValid,
    /// Valid token, failed policy
    Forbidden { policy: String },
    /// Endpoint references a policy that was never registered
    UnknownPolicy(String),
    /// Internal error
    InternalError(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "missing_credentials",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::Forbidden { .. } => "forbidden",
            AuthError::UnknownPolicy(_) | AuthError::InternalError(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingCredentials
            | AuthError::InvalidAuthHeader
            | AuthError::MalformedToken
            | AuthError::InvalidSignature
            | AuthError::TokenExpired
            | AuthError::TokenNotYetValid => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AuthError::UnknownPolicy(_) | AuthError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn is_unauthenticated(&self) -> bool {
        self.status_code() == StatusCode::UNAUTHORIZED
    }

    fn challenge(&self) -> Option<&'static str> {
        match self {
            AuthError::MissingCredentials => Some("Bearer"),
            AuthError::TokenExpired => Some(
                r#"Bearer error="invalid_token", error_description="The token expired""#,
            ),
            e if e.is_unauthenticated() => Some(r#"Bearer error="invalid_token""#),
            _ => None,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingCredentials => write!(f, "Authentication is required"),
            AuthError::InvalidAuthHeader => {
                write!(f, "Invalid authorization header format (expected 'Bearer <token>')")
            }
            AuthError::MalformedToken => write!(f, "Token is malformed"),
            AuthError::InvalidSignature => write!(f, "Token signature is invalid"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::TokenNotYetValid => write!(f, "Token is not yet valid"),
            AuthError::Forbidden { .. } => {
                write!(f, "Insufficient permissions for this operation")
            }
            // Policy names and internal details stay in the logs.
            AuthError::UnknownPolicy(_) | AuthError::InternalError(_) => {
                write!(f, "Internal authentication error")
            }
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            AuthError::UnknownPolicy(name) => {
                tracing::error!(policy = %name, "Endpoint references an unregistered policy")
            }
            AuthError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal authentication error")
            }
            _ => {}
        }
        let challenge = self.challenge();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        let mut response = (status, body).into_response();
        if let Some(challenge) = challenge {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static(challenge));
        }
        response
    }
}
