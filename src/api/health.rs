// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{auth::OptionalAuth, state::AppState};

/// Health check response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always "ok" while the process serves requests.
    pub status: String,
    /// Whether the caller presented a valid bearer token.
    pub authenticated: bool,
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Whether the service process is running.
    pub service: String,
    /// "ok" when the web root exists, "missing" otherwise.
    pub static_files: String,
    /// Deployment environment.
    pub environment: String,
}

/// Liveness check.
///
/// Open to anonymous callers; a bad bearer token only reports
/// `authenticated: false`.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn health(
    State(state): State<AppState>,
    OptionalAuth(caller): OptionalAuth,
) -> Json<HealthResponse> {
    let static_files = if state.settings.static_dir.is_dir() {
        "ok"
    } else {
        "missing"
    };
    let environment = if state.settings.environment.is_development() {
        "development"
    } else {
        "production"
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        authenticated: caller.is_some(),
        checks: HealthChecks {
            service: "ok".to_string(),
            static_files: static_files.to_string(),
            environment: environment.to_string(),
        },
    })
}
