// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTPS redirection.
//!
//! Plaintext requests are answered with `307 Temporary Redirect` to the same
//! host, path and query on the configured HTTPS port. When the server
//! terminates TLS itself, or no HTTPS port is known, requests pass through.

use axum::{
    extract::{Request, State},
    http::{
        header::{HOST, LOCATION},
        HeaderValue, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};

const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Transport facts fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportPolicy {
    pub listener_is_tls: bool,
    pub https_port: Option<u16>,
}

impl TransportPolicy {
    fn is_secure(&self, request: &Request) -> bool {
        self.listener_is_tls
            || request
                .headers()
                .get(FORWARDED_PROTO)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|proto| proto.eq_ignore_ascii_case("https"))
    }

    /// Where a plaintext request should be sent, if anywhere.
    fn redirect_target(&self, request: &Request) -> Option<HeaderValue> {
        let port = self.https_port?;
        let host = request.headers().get(HOST)?.to_str().ok()?;
        let host = strip_port(host);
        if host.is_empty() {
            return None;
        }

        let path = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let location = if port == 443 {
            format!("https://{host}{path}")
        } else {
            format!("https://{host}:{port}{path}")
        };
        HeaderValue::from_str(&location).ok()
    }
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        // IPv6 literal, `[::1]:8080`
        return host.split_once(']').map(|(h, _)| &host[..=h.len()]).unwrap_or(host);
    }
    host.split(':').next().unwrap_or(host)
}

/// Transport security stage.
pub async fn enforce_https(
    State(policy): State<TransportPolicy>,
    request: Request,
    next: Next,
) -> Response {
    if !policy.is_secure(&request) {
        if let Some(location) = policy.redirect_target(&request) {
            return (StatusCode::TEMPORARY_REDIRECT, [(LOCATION, location)]).into_response();
        }
    }
    next.run(request).await
}
