// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Back-end API server bootstrap.
//!
//! This crate wires the security core of the API: bearer token validation,
//! named authorization policies, a single-origin CORS policy and the fixed
//! request pipeline that runs them for every request.
//!
//! ## Modules
//!
//! - `api` - HTTP handlers (Axum) and the OpenAPI document
//! - `auth` - Token validation, claims, policies and the auth middleware
//! - `cors` - Single allowed-origin CORS policy
//! - `pipeline` - Ordered request pipeline assembly
//! - `startup` - One-time initialization of the shared security state
//! - `identity` - User, credential and claim storage

pub mod api;
pub mod auth;
pub mod config;
pub mod cors;
pub mod error;
pub mod identity;
pub mod logging;
pub mod pagination;
pub mod pipeline;
pub mod startup;
pub mod state;
