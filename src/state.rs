// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::config::Settings;
use crate::identity::IdentityStore;
use crate::startup::SecurityBundle;

/// Shared, read-only application state.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub security: Arc<SecurityBundle>,
    pub identity: Arc<dyn IdentityStore>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        security: SecurityBundle,
        identity: Arc<dyn IdentityStore>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            security: Arc::new(security),
            identity,
        }
    }
}
