// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Named authorization policies.
//!
//! Policies are registered once at startup into a [`PolicyTable`] and are
//! read-only afterwards. Evaluation is a pure function of the validated
//! claims principal.

use std::collections::HashMap;

use super::claims::{ClaimsPrincipal, ROLE_CLAIM};
use super::error::AuthError;

/// Policy granted to administrators: requires `role=admin`.
pub const ES_ADMIN: &str = "EsAdmin";

/// A single condition on the claims principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// At least one claim of `claim_type` with exactly `value`.
    Claim { claim_type: String, value: String },
}

impl Requirement {
    fn is_satisfied_by(&self, principal: &ClaimsPrincipal) -> bool {
        match self {
            Requirement::Claim { claim_type, value } => principal.has_claim(claim_type, value),
        }
    }
}

/// A named rule made of requirements that must all hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    name: String,
    requirements: Vec<Requirement>,
}

impl Policy {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn allows(&self, principal: &ClaimsPrincipal) -> bool {
        self.requirements.iter().all(|r| r.is_satisfied_by(principal))
    }
}

/// Immutable lookup table of policies keyed by name.
#[derive(Debug, Clone, Default)]
pub struct PolicyTable {
    policies: HashMap<String, Policy>,
}

impl PolicyTable {
    pub fn builder() -> PolicyTableBuilder {
        PolicyTableBuilder::default()
    }

    /// The policies this API registers at startup.
    pub fn standard() -> Self {
        Self::builder()
            .require_claim(ES_ADMIN, ROLE_CLAIM, "admin")
            .build()
    }

    pub fn get(&self, name: &str) -> Option<&Policy> {
        self.policies.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.policies.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Evaluate a single named policy.
    pub fn evaluate(&self, name: &str, principal: &ClaimsPrincipal) -> Result<(), AuthError> {
        let policy = self
            .get(name)
            .ok_or_else(|| AuthError::UnknownPolicy(name.to_string()))?;

        if policy.allows(principal) {
            Ok(())
        } else {
            Err(AuthError::Forbidden {
                policy: name.to_string(),
            })
        }
    }

    /// Evaluate every named policy; all must allow.
    pub fn evaluate_all<'a, I>(&self, names: I, principal: &ClaimsPrincipal) -> Result<(), AuthError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .try_for_each(|name| self.evaluate(name, principal))
    }
}

/// Collects policies before the table is frozen.
#[derive(Debug, Default)]
pub struct PolicyTableBuilder {
    policies: HashMap<String, Policy>,
}

impl PolicyTableBuilder {
    /// Add a claim requirement to the named policy, creating it if needed.
    pub fn require_claim(
        mut self,
        policy: impl Into<String>,
        claim_type: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let name = policy.into();
        self.policies
            .entry(name.clone())
            .or_insert_with(|| Policy {
                name,
                requirements: Vec::new(),
            })
            .requirements
            .push(Requirement::Claim {
                claim_type: claim_type.into(),
                value: value.into(),
            });
        self
    }

    pub fn build(self) -> PolicyTable {
        PolicyTable {
            policies: self.policies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::Claim;

    fn principal(claims: &[(&str, &str)]) -> ClaimsPrincipal {
        ClaimsPrincipal::from_claims(claims.iter().map(|(t, v)| Claim::new(*t, *v)))
    }

    #[test]
    fn es_admin_allows_admin_role() {
        let table = PolicyTable::standard();
        assert!(table
            .evaluate(ES_ADMIN, &principal(&[("role", "admin")]))
            .is_ok());
        assert!(table
            .evaluate(ES_ADMIN, &principal(&[("role", "user"), ("role", "admin")]))
            .is_ok());
    }

    #[test]
    fn es_admin_denies_everything_else() {
        let table = PolicyTable::standard();
        let denied = [
            principal(&[]),
            principal(&[("role", "user")]),
            principal(&[("role", "Admin")]),
            principal(&[("role", "administrator")]),
            principal(&[("roles", "admin")]),
            principal(&[("email", "admin")]),
        ];
        for p in &denied {
            assert_eq!(
                table.evaluate(ES_ADMIN, p),
                Err(AuthError::Forbidden {
                    policy: ES_ADMIN.to_string()
                }),
                "{p:?}"
            );
        }
    }

    #[test]
    fn unknown_policy_is_an_error() {
        let table = PolicyTable::standard();
        assert_eq!(
            table.evaluate("EsRoot", &principal(&[("role", "admin")])),
            Err(AuthError::UnknownPolicy("EsRoot".to_string()))
        );
    }

    #[test]
    fn multiple_policies_must_all_pass() {
        let table = PolicyTable::builder()
            .require_claim(ES_ADMIN, "role", "admin")
            .require_claim("Verified", "email_verified", "true")
            .build();

        let admin_only = principal(&[("role", "admin")]);
        assert!(matches!(
            table.evaluate_all([ES_ADMIN, "Verified"], &admin_only),
            Err(AuthError::Forbidden { policy }) if policy == "Verified"
        ));

        let both = principal(&[("role", "admin"), ("email_verified", "true")]);
        assert!(table.evaluate_all([ES_ADMIN, "Verified"], &both).is_ok());
    }

    #[test]
    fn requirements_within_a_policy_are_anded() {
        let table = PolicyTable::builder()
            .require_claim("Staff", "role", "admin")
            .require_claim("Staff", "department", "ops")
            .build();
        assert_eq!(table.get("Staff").map(|p| p.requirements().len()), Some(2));
        assert!(table
            .evaluate("Staff", &principal(&[("role", "admin")]))
            .is_err());
        assert!(table
            .evaluate("Staff", &principal(&[("role", "admin"), ("department", "ops")]))
            .is_ok());
    }
}
