// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request pipeline assembly.
//!
//! Every request passes through the stages of [`PIPELINE`] in order. Any stage
//! may answer the request itself; otherwise it hands the request to the next.
//! The router is built by folding over that list from the innermost stage
//! outwards, so the order in the constant is the order at runtime.
//!
//! Authorization and dispatch are bound per endpoint: an [`Endpoint`] carries
//! its [`Access`] requirement and gets its own authorization layer.

pub mod static_files;
pub mod transport;

use std::any::Any;

use axum::{
    http::Uri,
    middleware::from_fn_with_state,
    routing::MethodRouter,
    Router,
};
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{middleware::authorize, middleware::authenticate, Access, AccessGuard};
use crate::error::{panic_response, ApiError};
use crate::state::AppState;

pub use static_files::StaticFiles;
pub use transport::TransportPolicy;

/// One request-processing stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Exception filter; failure details only in development, where the API
    /// docs are also routed.
    Diagnostics,
    /// Redirect plaintext requests to HTTPS.
    TransportSecurity,
    /// Serve files from the web root.
    StaticFiles,
    /// Match an endpoint, 404 otherwise.
    Routing,
    /// Single-origin CORS policy.
    Cors,
    /// Bearer token validation. Never rejects on its own.
    Authentication,
    /// Per-endpoint access requirements.
    Authorization,
    /// The endpoint handler.
    Dispatch,
}

/// Stages in execution order.
pub const PIPELINE: [Stage; 8] = [
    Stage::Diagnostics,
    Stage::TransportSecurity,
    Stage::StaticFiles,
    Stage::Routing,
    Stage::Cors,
    Stage::Authentication,
    Stage::Authorization,
    Stage::Dispatch,
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("endpoint {path} requires unknown policy {policy:?}")]
    UnknownPolicy { path: String, policy: String },
}

/// A routed endpoint with its access requirement.
pub struct Endpoint {
    pub path: &'static str,
    pub handler: MethodRouter<AppState>,
    pub access: Access,
}

impl Endpoint {
    /// An endpoint open to anonymous callers.
    pub fn new(path: &'static str, handler: MethodRouter<AppState>) -> Self {
        Self {
            path,
            handler,
            access: Access::Anonymous,
        }
    }

    /// Require a valid token.
    pub fn authenticated(mut self) -> Self {
        self.access = Access::Authenticated;
        self
    }

    /// Require a valid token that satisfies `policy`. Repeated calls stack.
    pub fn policy(mut self, policy: &str) -> Self {
        self.access = match self.access {
            Access::Policies(mut names) => {
                names.push(policy.to_string());
                Access::Policies(names)
            }
            _ => Access::policy(policy),
        };
        self
    }
}

/// Assembly inputs not carried by [`AppState`].
pub struct PipelineOptions {
    /// The listener terminates TLS itself.
    pub listener_is_tls: bool,
    /// Document served under `/docs` in development.
    pub openapi: utoipa::openapi::OpenApi,
}

/// Build the full application router.
///
/// Fails when an endpoint names a policy missing from the policy table.
pub fn assemble(
    state: AppState,
    endpoints: Vec<Endpoint>,
    options: PipelineOptions,
) -> Result<Router, PipelineError> {
    let development = state.settings.environment.is_development();

    let mut routes: Router<AppState> = Router::new();
    for endpoint in endpoints {
        routes = routes.route(endpoint.path, guarded(&state, endpoint)?);
    }
    let mut app: Router = routes.fallback(not_found).with_state(state.clone());

    for stage in PIPELINE.iter().rev() {
        app = match stage {
            // Bound per endpoint in `guarded`.
            Stage::Dispatch | Stage::Authorization => app,
            Stage::Authentication => app.layer(from_fn_with_state(state.clone(), authenticate)),
            Stage::Cors => app.layer(from_fn_with_state(
                state.security.cors.clone(),
                crate::cors::cors_gate,
            )),
            // Stages added after this one wrap the whole router, not just matched routes.
            // Development docs are routed here so the outer stages cover them too.
            Stage::Routing => {
                let router = Router::new().fallback_service(app);
                if development {
                    router.merge(
                        SwaggerUi::new("/docs").url("/api-doc/openapi.json", options.openapi.clone()),
                    )
                } else {
                    router
                }
            }
            Stage::StaticFiles => match StaticFiles::new(&state.settings.static_dir) {
                Some(files) => app.layer(from_fn_with_state(files, static_files::serve_static)),
                None => {
                    tracing::debug!(
                        root = %state.settings.static_dir.display(),
                        "Web root not found, static files disabled"
                    );
                    app
                }
            },
            Stage::TransportSecurity => {
                let policy = TransportPolicy {
                    listener_is_tls: options.listener_is_tls,
                    https_port: state.settings.https_port,
                };
                app.layer(from_fn_with_state(policy, transport::enforce_https))
            }
            Stage::Diagnostics => app.layer(CatchPanicLayer::custom(
                move |panic: Box<dyn Any + Send + 'static>| panic_response(panic, development),
            )),
        };
    }

    tracing::debug!(stages = ?PIPELINE, "Request pipeline assembled");

    Ok(app.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id()),
    ))
}

/// Attach the authorization stage for endpoints that need one.
fn guarded(state: &AppState, endpoint: Endpoint) -> Result<MethodRouter<AppState>, PipelineError> {
    let policies = &state.security.policies;
    if let Some(unknown) = endpoint
        .access
        .policies()
        .iter()
        .find(|name| !policies.contains(name))
    {
        return Err(PipelineError::UnknownPolicy {
            path: endpoint.path.to_string(),
            policy: unknown.clone(),
        });
    }

    if endpoint.access.is_anonymous() {
        return Ok(endpoint.handler);
    }
    let guard = AccessGuard::new(policies.clone(), endpoint.access);
    Ok(endpoint
        .handler
        .route_layer(from_fn_with_state(guard, authorize)))
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("No route for {}", uri.path()))
}
