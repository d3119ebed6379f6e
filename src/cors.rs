// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cross-origin policy.
//!
//! Exactly one origin (the configured frontend) may read responses from
//! browser script, with any method and any request header. The total-count
//! header of paginated responses is exposed to it.
//!
//! CORS is enforced by the browser. A request from another origin is still
//! processed by the server; its response carries no `Access-Control-*`
//! headers at all.

use std::convert::Infallible;

use axum::{
    extract::{Request, State},
    http::{header::ORIGIN, HeaderValue},
    middleware::Next,
    response::Response,
};
use thiserror::Error;
use tower::{service_fn, Layer, ServiceExt};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use url::Url;

use crate::pagination::TOTAL_COUNT_HEADER;

#[derive(Debug, Error)]
pub enum CorsError {
    #[error("allowed origin `{origin}` is not a valid URL: {reason}")]
    InvalidOrigin { origin: String, reason: String },
}

/// The single default CORS policy.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed_origin: HeaderValue,
    layer: CorsLayer,
}

impl CorsPolicy {
    /// Build the policy from the configured frontend URL.
    ///
    /// The URL is reduced to its origin (`scheme://host[:port]`), so a trailing
    /// slash or path in configuration does not break matching.
    pub fn new(frontend_url: &str) -> Result<Self, CorsError> {
        let invalid = |reason: String| CorsError::InvalidOrigin {
            origin: frontend_url.to_string(),
            reason,
        };

        let url = Url::parse(frontend_url.trim()).map_err(|e| invalid(e.to_string()))?;
        let origin = url.origin();
        if !origin.is_tuple() {
            return Err(invalid("URL has no host".to_string()));
        }
        let allowed_origin = HeaderValue::from_str(&origin.ascii_serialization())
            .map_err(|e| invalid(e.to_string()))?;

        let layer = CorsLayer::new()
            .allow_origin(AllowOrigin::list([allowed_origin.clone()]))
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
            .expose_headers([TOTAL_COUNT_HEADER]);

        Ok(Self {
            allowed_origin,
            layer,
        })
    }

    pub fn allowed_origin(&self) -> &str {
        // Built from an ASCII serialization, always valid.
        self.allowed_origin.to_str().unwrap_or_default()
    }

    /// Whether a request `Origin` value is the allowed one.
    pub fn allows(&self, origin: &HeaderValue) -> bool {
        *origin == self.allowed_origin
    }
}

/// CORS stage.
///
/// Only requests from the allowed origin go through the tower-http CORS
/// service (preflight answers, allow and expose headers). Requests without an
/// `Origin` or from any other origin pass on untouched.
pub async fn cors_gate(State(policy): State<CorsPolicy>, request: Request, next: Next) -> Response {
    let allowed = request
        .headers()
        .get(ORIGIN)
        .is_some_and(|origin| policy.allows(origin));
    if !allowed {
        return next.run(request).await;
    }

    let inner = service_fn(move |request: Request| {
        let next = next.clone();
        async move { Ok::<_, Infallible>(next.run(request).await) }
    });
    match policy.layer.layer(inner).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    }
}
