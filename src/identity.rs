// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity store contract.
//!
//! The identity store owns user records and their claims. It is consulted
//! only when tokens are issued or claims are edited, never while a request
//! token is validated.

use std::sync::RwLock;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{Claim, EMAIL_CLAIM};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("an account with this email already exists")]
    DuplicateEmail,
    #[error("user not found")]
    UserNotFound,
    #[error("invalid account data: {0}")]
    InvalidInput(String),
    #[error("identity store unavailable: {0}")]
    Unavailable(String),
}

/// A user record as exposed to the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct IdentityUser {
    /// Stable user identifier.
    pub id: String,
    /// Account email.
    pub email: String,
    /// Claims stored for this user (roles and the like).
    #[serde(skip)]
    pub claims: Vec<Claim>,
}

impl IdentityUser {
    /// Claims written into a token issued for this user.
    pub fn token_claims(&self) -> Vec<Claim> {
        let mut claims = vec![Claim::new(EMAIL_CLAIM, self.email.clone())];
        claims.extend(self.claims.iter().cloned());
        claims
    }
}

/// Persistence of users, credentials and claims.
pub trait IdentityStore: Send + Sync {
    fn create_user(&self, email: &str, password: &str) -> Result<IdentityUser, IdentityError>;

    /// Returns `None` when the email is unknown or the password does not match.
    fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<IdentityUser>, IdentityError>;

    /// One page of users ordered by email, plus the total user count.
    fn list_users(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<IdentityUser>, usize), IdentityError>;

    fn add_claim(&self, user_id: &str, claim: Claim) -> Result<(), IdentityError>;

    fn remove_claim(&self, user_id: &str, claim: &Claim) -> Result<(), IdentityError>;
}

struct StoredUser {
    user: IdentityUser,
    /// Argon2id PHC string; carries its own salt and parameters.
    password_hash: String,
}

/// In-process identity store.
#[derive(Default)]
pub struct MemoryIdentityStore {
    users: RwLock<Vec<StoredUser>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<StoredUser>>, IdentityError> {
        self.users
            .read()
            .map_err(|_| IdentityError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Vec<StoredUser>>, IdentityError> {
        self.users
            .write()
            .map_err(|_| IdentityError::Unavailable("lock poisoned".to_string()))
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hash_password(password: &str) -> Result<String, IdentityError> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|e| IdentityError::Unavailable(format!("password salt: {e}")))?;
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| IdentityError::Unavailable(format!("password hash: {e}")))?;
    Ok(phc.to_string())
}

fn verify_password(password: &str, phc: &str) -> Result<bool, IdentityError> {
    let parsed = PasswordHash::new(phc)
        .map_err(|e| IdentityError::Unavailable(format!("stored password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

impl IdentityStore for MemoryIdentityStore {
    fn create_user(&self, email: &str, password: &str) -> Result<IdentityUser, IdentityError> {
        let email = normalize_email(email);
        if email.is_empty() || !email.contains('@') {
            return Err(IdentityError::InvalidInput("email is not valid".to_string()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(IdentityError::InvalidInput(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let mut users = self.write()?;
        if users.iter().any(|u| u.user.email == email) {
            return Err(IdentityError::DuplicateEmail);
        }

        let password_hash = hash_password(password)?;
        let user = IdentityUser {
            id: Uuid::new_v4().to_string(),
            email,
            claims: Vec::new(),
        };
        users.push(StoredUser {
            user: user.clone(),
            password_hash,
        });
        tracing::info!(user_id = %user.id, "Identity user created");
        Ok(user)
    }

    fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<IdentityUser>, IdentityError> {
        let email = normalize_email(email);
        let users = self.read()?;
        let Some(stored) = users.iter().find(|u| u.user.email == email) else {
            return Ok(None);
        };
        let verified = verify_password(password, &stored.password_hash)?;
        Ok(verified.then(|| stored.user.clone()))
    }

    fn list_users(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<IdentityUser>, usize), IdentityError> {
        let users = self.read()?;
        let mut all: Vec<&IdentityUser> = users.iter().map(|u| &u.user).collect();
        all.sort_by(|a, b| a.email.cmp(&b.email));
        let page = all.iter().skip(offset).take(limit).map(|u| (*u).clone()).collect();
        Ok((page, all.len()))
    }

    fn add_claim(&self, user_id: &str, claim: Claim) -> Result<(), IdentityError> {
        let mut users = self.write()?;
        let stored = users
            .iter_mut()
            .find(|u| u.user.id == user_id)
            .ok_or(IdentityError::UserNotFound)?;
        if !stored.user.claims.contains(&claim) {
            stored.user.claims.push(claim);
        }
        Ok(())
    }

    fn remove_claim(&self, user_id: &str, claim: &Claim) -> Result<(), IdentityError> {
        let mut users = self.write()?;
        let stored = users
            .iter_mut()
            .find(|u| u.user.id == user_id)
            .ok_or(IdentityError::UserNotFound)?;
        stored.user.claims.retain(|c| c != claim);
        Ok(())
    }
}
