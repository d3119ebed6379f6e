// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Claims and the claims principal attached to each request.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Claim type carrying role membership.
pub const ROLE_CLAIM: &str = "role";

/// Claim type carrying the account email.
pub const EMAIL_CLAIM: &str = "email";

/// A typed fact asserted about the principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct Claim {
    /// Claim type, passed through verbatim from the token.
    #[serde(rename = "type")]
    pub claim_type: String,
    /// Claim value.
    pub value: String,
}

impl Claim {
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
        }
    }
}

/// Mapping applied to inbound claim types while a token is read.
///
/// The startup bundle builds this with [`ClaimTypeMap::verbatim`], so claim
/// types reach policies exactly as they appear in the token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimTypeMap {
    entries: HashMap<String, String>,
}

impl ClaimTypeMap {
    /// A map with no entries: every claim type is kept as-is.
    pub fn verbatim() -> Self {
        Self::default()
    }

    /// Add a rename from a short token claim type to a long one.
    pub fn with_entry(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.entries.insert(from.into(), to.into());
        self
    }

    pub fn is_verbatim(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve the claim type used inside the application.
    pub fn map<'a>(&'a self, claim_type: &'a str) -> &'a str {
        self.entries
            .get(claim_type)
            .map(String::as_str)
            .unwrap_or(claim_type)
    }
}

/// The validated identity of a request: claim type to one or more values.
///
/// An empty principal stands for an anonymous caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimsPrincipal {
    claims: BTreeMap<String, Vec<String>>,
}

impl ClaimsPrincipal {
    /// The principal of a caller without a valid token.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn from_claims(claims: impl IntoIterator<Item = Claim>) -> Self {
        let mut principal = Self::default();
        for claim in claims {
            principal.push(claim.claim_type, claim.value);
        }
        principal
    }

    pub(crate) fn push(&mut self, claim_type: String, value: String) {
        let values = self.claims.entry(claim_type).or_default();
        if !values.contains(&value) {
            values.push(value);
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.claims.is_empty()
    }

    /// Exact, case-sensitive match on both type and value.
    pub fn has_claim(&self, claim_type: &str, value: &str) -> bool {
        self.claims
            .get(claim_type)
            .is_some_and(|values| values.iter().any(|v| v == value))
    }

    /// All values of a claim type.
    pub fn values(&self, claim_type: &str) -> &[String] {
        self.claims
            .get(claim_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First value of a claim type.
    pub fn first(&self, claim_type: &str) -> Option<&str> {
        self.values(claim_type).first().map(String::as_str)
    }

    pub fn email(&self) -> Option<&str> {
        self.first(EMAIL_CLAIM)
    }

    pub fn is_admin(&self) -> bool {
        self.has_claim(ROLE_CLAIM, "admin")
    }

    pub fn iter(&self) -> impl Iterator<Item = Claim> + '_ {
        self.claims
            .iter()
            .flat_map(|(t, values)| values.iter().map(move |v| Claim::new(t.clone(), v.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_principal_is_empty() {
        let principal = ClaimsPrincipal::anonymous();
        assert!(principal.is_anonymous());
        assert!(!principal.is_admin());
        assert!(principal.values(ROLE_CLAIM).is_empty());
    }

    #[test]
    fn has_claim_requires_exact_match() {
        let principal = ClaimsPrincipal::from_claims([Claim::new("role", "admin")]);
        assert!(principal.has_claim("role", "admin"));
        assert!(!principal.has_claim("role", "Admin"));
        assert!(!principal.has_claim("Role", "admin"));
        assert!(!principal.has_claim("role", "admin "));
    }

    #[test]
    fn keeps_multiple_values_per_type() {
        let principal = ClaimsPrincipal::from_claims([
            Claim::new("role", "user"),
            Claim::new("role", "admin"),
            Claim::new("role", "admin"),
        ]);
        assert_eq!(principal.values("role"), ["user", "admin"]);
        assert!(principal.is_admin());
        assert_eq!(principal.iter().count(), 2);
    }

    #[test]
    fn verbatim_map_passes_types_through() {
        let map = ClaimTypeMap::verbatim();
        assert!(map.is_verbatim());
        assert_eq!(map.map("role"), "role");
    }

    #[test]
    fn map_entries_rename_types() {
        let map = ClaimTypeMap::verbatim().with_entry("role", "urn:claims:role");
        assert!(!map.is_verbatim());
        assert_eq!(map.map("role"), "urn:claims:role");
        assert_eq!(map.map("email"), "email");
    }
}
