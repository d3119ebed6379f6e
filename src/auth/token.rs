// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token validation and issuance.
//!
//! ## Validation
//!
//! Each step is a hard gate; the first failure ends validation:
//!
//! 1. Structural decode of `header.claims.signature`
//! 2. HMAC signature check against the process signing key
//! 3. Lifetime check (`exp`, and `nbf` when present) with **zero** clock skew
//!
//! Issuer and audience are deliberately not validated. Tokens are issued and
//! consumed by this one deployment, so the signing key is the only trust
//! anchor. Turning either check on changes which tokens are accepted.
//!
//! Validation is stateless: nothing but the signing key and the token itself
//! is consulted, and no shared state is written.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::claims::{Claim, ClaimTypeMap, ClaimsPrincipal};
use super::error::AuthError;

/// HMAC algorithms accepted for the symmetric signing key.
const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Symmetric key used to sign and verify bearer tokens.
///
/// Loaded once at startup and never regenerated.
#[derive(Clone)]
pub struct SigningKey {
    bytes: Vec<u8>,
}

impl SigningKey {
    /// Key from the UTF-8 bytes of a configured secret.
    pub fn from_secret(secret: &str) -> Self {
        Self {
            bytes: secret.as_bytes().to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(&self.bytes)
    }

    fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(&self.bytes)
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningKey(<{} bytes>)", self.bytes.len())
    }
}

/// Verifies inbound bearer tokens.
#[derive(Clone)]
pub struct TokenValidator {
    decoding_key: DecodingKey,
    validation: Validation,
    claim_types: ClaimTypeMap,
}

impl fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenValidator")
            .field("algorithms", &self.validation.algorithms)
            .field("claim_types", &self.claim_types)
            .finish_non_exhaustive()
    }
}

impl TokenValidator {
    pub fn new(key: &SigningKey, claim_types: ClaimTypeMap) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        validation.leeway = 0;
        // Lifetime is checked against the caller's clock in `validate_at`.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        Self {
            decoding_key: key.decoding_key(),
            validation,
            claim_types,
        }
    }

    /// Validate against the current time.
    pub fn validate(&self, token: &str) -> Result<ClaimsPrincipal, AuthError> {
        self.validate_at(token, Utc::now())
    }

    /// Validate against an explicit validation instant.
    pub fn validate_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<ClaimsPrincipal, AuthError> {
        if token.split('.').count() != 3 {
            return Err(AuthError::MalformedToken);
        }

        let data = decode::<Map<String, Value>>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    AuthError::InvalidSignature
                }
                _ => AuthError::MalformedToken,
            })?;
        let claims = data.claims;

        let now = unix_seconds(now);
        let exp = numeric_date(&claims, "exp")?.ok_or(AuthError::MalformedToken)?;
        if now >= exp {
            return Err(AuthError::TokenExpired);
        }
        if let Some(nbf) = numeric_date(&claims, "nbf")? {
            if now < nbf {
                return Err(AuthError::TokenNotYetValid);
            }
        }

        Ok(self.principal_from(claims))
    }

    fn principal_from(&self, claims: Map<String, Value>) -> ClaimsPrincipal {
        let mut principal = ClaimsPrincipal::anonymous();
        for (claim_type, value) in claims {
            let claim_type = self.claim_types.map(&claim_type).to_string();
            match value {
                Value::Null => {}
                Value::Array(items) => {
                    for item in items {
                        if let Some(v) = claim_value(item) {
                            principal.push(claim_type.clone(), v);
                        }
                    }
                }
                other => {
                    if let Some(v) = claim_value(other) {
                        principal.push(claim_type, v);
                    }
                }
            }
        }
        principal
    }
}

fn claim_value(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn numeric_date(claims: &Map<String, Value>, name: &str) -> Result<Option<f64>, AuthError> {
    match claims.get(name) {
        None => Ok(None),
        Some(value) => value.as_f64().map(Some).ok_or(AuthError::MalformedToken),
    }
}

fn unix_seconds(instant: DateTime<Utc>) -> f64 {
    instant.timestamp() as f64 + f64::from(instant.timestamp_subsec_nanos()) / 1e9
}

/// A freshly signed token returned to a client after login.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IssuedToken {
    /// Compact JWT to send as `Authorization: Bearer <token>`.
    pub token: String,
    /// Expiry instant of the token.
    pub expiration: DateTime<Utc>,
}

/// Signs tokens for verified identities with the process signing key.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    lifetime: Duration,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(key: &SigningKey, lifetime: Duration) -> Self {
        Self {
            encoding_key: key.encoding_key(),
            lifetime,
        }
    }

    pub fn issue(&self, claims: &[Claim]) -> Result<IssuedToken, AuthError> {
        self.issue_at(claims, Utc::now())
    }

    /// Sign `claims` with an expiry of `now + lifetime`.
    ///
    /// Repeated claim types are written as JSON arrays.
    pub fn issue_at(&self, claims: &[Claim], now: DateTime<Utc>) -> Result<IssuedToken, AuthError> {
        let lifetime = chrono::Duration::from_std(self.lifetime)
            .map_err(|e| AuthError::InternalError(format!("token lifetime out of range: {e}")))?;
        // `exp` has whole-second precision; report exactly what is signed.
        let expires_at = (now + lifetime).timestamp();
        let expiration = DateTime::from_timestamp(expires_at, 0)
            .ok_or_else(|| AuthError::InternalError("token expiry out of range".to_string()))?;

        let mut payload = Map::new();
        for claim in claims {
            let value = Value::String(claim.value.clone());
            match payload.get_mut(&claim.claim_type) {
                None => {
                    payload.insert(claim.claim_type.clone(), value);
                }
                Some(Value::Array(values)) => values.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
            }
        }
        payload.insert("exp".to_string(), Value::from(expires_at));

        let token = encode(&Header::new(Algorithm::HS256), &payload, &self.encoding_key)
            .map_err(|e| AuthError::InternalError(format!("failed to sign token: {e}")))?;

        Ok(IssuedToken { token, expiration })
    }
}
