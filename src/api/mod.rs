// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::{
    auth::{Claim, IssuedToken, ES_ADMIN},
    identity::IdentityUser,
    pipeline::{self, Endpoint, PipelineError, PipelineOptions},
    state::AppState,
};

pub mod accounts;
pub mod health;

/// Every routed endpoint with its access requirement.
pub fn endpoints() -> Vec<Endpoint> {
    vec![
        Endpoint::new("/health", get(health::health)),
        Endpoint::new("/api/accounts/register", post(accounts::register)),
        Endpoint::new("/api/accounts/login", post(accounts::login)),
        Endpoint::new("/api/accounts/me", get(accounts::me)).authenticated(),
        Endpoint::new("/api/accounts/users", get(accounts::list_users)).policy(ES_ADMIN),
        Endpoint::new("/api/accounts/make-admin", post(accounts::make_admin)).policy(ES_ADMIN),
        Endpoint::new("/api/accounts/remove-admin", post(accounts::remove_admin))
            .policy(ES_ADMIN),
    ]
}

/// The application with its full request pipeline.
pub fn app(state: AppState) -> Result<Router, PipelineError> {
    let options = PipelineOptions {
        listener_is_tls: state.settings.tls.is_some(),
        openapi: ApiDoc::openapi(),
    };
    pipeline::assemble(state, endpoints(), options)
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        accounts::register,
        accounts::login,
        accounts::me,
        accounts::list_users,
        accounts::make_admin,
        accounts::remove_admin
    ),
    components(
        schemas(
            health::HealthResponse,
            health::HealthChecks,
            accounts::UserCredentials,
            accounts::EditAdminRequest,
            accounts::CurrentUserResponse,
            IdentityUser,
            IssuedToken,
            Claim
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness"),
        (name = "Accounts", description = "Registration, login and admin role management")
    )
)]
pub struct ApiDoc;
