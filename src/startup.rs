// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! One-time process initialization.
//!
//! [`bootstrap`] runs before the listener is bound and produces the immutable
//! [`SecurityBundle`] every request handler shares. Nothing in it is mutated
//! afterwards.

use std::sync::Arc;

use thiserror::Error;

use crate::auth::{ClaimTypeMap, PolicyTable, SigningKey, TokenIssuer, TokenValidator};
use crate::config::Settings;
use crate::cors::{CorsError, CorsPolicy};
use crate::identity::IdentityError;
use crate::pipeline::PipelineError;

/// Below this size an HMAC-SHA256 key is weaker than the hash itself.
const RECOMMENDED_KEY_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Cors(#[from] CorsError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("failed to seed identity store: {0}")]
    Seed(#[from] IdentityError),
    #[error("TLS configuration failed: {0}")]
    Tls(String),
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read-only security configuration shared by all requests.
#[derive(Debug)]
pub struct SecurityBundle {
    pub validator: TokenValidator,
    pub issuer: TokenIssuer,
    pub policies: Arc<PolicyTable>,
    pub cors: CorsPolicy,
}

/// Build the security bundle from settings.
///
/// The inbound claim type map is created empty here, before any validator
/// exists, so no token can ever be read with remapped claim types.
pub fn bootstrap(settings: &Settings) -> Result<SecurityBundle, StartupError> {
    let claim_types = ClaimTypeMap::verbatim();
    let claim_types_verbatim = claim_types.is_verbatim();

    let key = SigningKey::from_secret(&settings.signing_key);
    if key.len() < RECOMMENDED_KEY_BYTES {
        tracing::warn!(
            key_bytes = key.len(),
            recommended = RECOMMENDED_KEY_BYTES,
            "JWT signing key is shorter than recommended"
        );
    }

    let validator = TokenValidator::new(&key, claim_types);
    let issuer = TokenIssuer::new(&key, settings.token_lifetime);
    let policies = Arc::new(PolicyTable::standard());
    let cors = CorsPolicy::new(&settings.frontend_url)?;

    tracing::info!(
        policies = policies.len(),
        claim_types_verbatim,
        allowed_origin = cors.allowed_origin(),
        "Security configuration loaded (issuer and audience validation disabled)"
    );

    Ok(SecurityBundle {
        validator,
        issuer,
        policies,
        cors,
    })
}
