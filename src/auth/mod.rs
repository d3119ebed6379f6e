// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer token authentication and claim-based authorization.
//!
//! ## Auth Flow
//!
//! 1. A client obtains a token from `/api/accounts/login` (signed with the
//!    process signing key, HS256)
//! 2. The client sends `Authorization: Bearer <token>`
//! 3. The authentication stage:
//!    - Verifies structure, signature and expiry (zero clock skew)
//!    - Does **not** verify issuer or audience
//!    - Stores the claims principal in the request extensions
//! 4. The authorization stage of protected endpoints:
//!    - 401 when no valid token was presented
//!    - 403 when a required policy (e.g. `EsAdmin`) denies
//!
//! ## Security
//!
//! - Validation is stateless; the identity store is never consulted per request
//! - Claim types are used verbatim (no inbound claim type mapping)
//! - Policies are registered once at startup and never change

pub mod claims;
pub mod error;
pub mod extractor;
pub mod middleware;
pub mod policy;
pub mod token;

pub use claims::{Claim, ClaimTypeMap, ClaimsPrincipal, EMAIL_CLAIM, ROLE_CLAIM};
pub use error::AuthError;
pub use extractor::{Auth, OptionalAuth};
pub use middleware::{Access, AccessGuard, Authentication};
pub use policy::{Policy, PolicyTable, ES_ADMIN};
pub use token::{IssuedToken, SigningKey, TokenIssuer, TokenValidator};
