// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! API errors and the global exception filter.

use std::any::Any;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::AuthError;
use crate::identity::IdentityError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Log `detail` and answer with a generic 500.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        tracing::error!(error = %detail, "Request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::DuplicateEmail | IdentityError::InvalidInput(_) => {
                Self::bad_request(err.to_string())
            }
            IdentityError::UserNotFound => Self::not_found(err.to_string()),
            IdentityError::Unavailable(_) => Self::internal(err),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err.status_code() {
            StatusCode::INTERNAL_SERVER_ERROR => Self::internal(format!("{err:?}")),
            status => Self::new(status, err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

/// Response for a request whose handler panicked.
///
/// The panic message is only included when `expose_details` is set
/// (development); otherwise the client sees a generic 500.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>, expose_details: bool) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    tracing::error!(panic = %detail, "Unhandled failure while processing request");

    let message = if expose_details {
        format!("Internal server error: {detail}")
    } else {
        "Internal server error".to_string()
    };
    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);
        assert_eq!(bad.message, "bad");

        let internal = ApiError::internal("db exploded");
        assert_eq!(internal.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(internal.message, "Internal server error");
    }

    #[test]
    fn identity_errors_map_to_statuses() {
        assert_eq!(
            ApiError::from(IdentityError::DuplicateEmail).status,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(IdentityError::UserNotFound).status,
            StatusCode::NOT_FOUND
        );
        let unavailable = ApiError::from(IdentityError::Unavailable("lock".to_string()));
        assert_eq!(unavailable.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!unavailable.message.contains("lock"));
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_string(response).await, r#"{"error":"bad data"}"#);
    }

    #[tokio::test]
    async fn panic_details_only_in_development() {
        let hidden = panic_response(Box::new("secret detail"), false);
        assert_eq!(hidden.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body_string(hidden).await.contains("secret detail"));

        let shown = panic_response(Box::new(String::from("secret detail")), true);
        assert!(body_string(shown).await.contains("secret detail"));
    }
}
