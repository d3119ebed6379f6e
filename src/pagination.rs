// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Paging for list endpoints.
//!
//! List endpoints return one page of items as the JSON body and the total
//! number of records in the [`TOTAL_COUNT_HEADER`] response header. The CORS
//! policy exposes that header to browser scripts.

use axum::{
    http::{HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

/// Total number of records behind a paginated response.
///
/// Clients read it as `cantidadTotalRegistros`; header names are case-insensitive.
pub const TOTAL_COUNT_HEADER: HeaderName = HeaderName::from_static("cantidadtotalregistros");

/// Upper bound on `recordsPerPage`.
pub const MAX_RECORDS_PER_PAGE: usize = 50;

const DEFAULT_RECORDS_PER_PAGE: usize = 10;

/// Query parameters selecting a page.
#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct Pagination {
    /// 1-based page number (default 1).
    #[serde(default = "default_page")]
    pub page: usize,
    /// Records per page (default 10, at most 50).
    #[serde(default = "default_records_per_page")]
    pub records_per_page: usize,
}

fn default_page() -> usize {
    1
}

fn default_records_per_page() -> usize {
    DEFAULT_RECORDS_PER_PAGE
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: default_page(),
            records_per_page: default_records_per_page(),
        }
    }
}

impl Pagination {
    /// Records per page after clamping to `1..=MAX_RECORDS_PER_PAGE`.
    pub fn limit(&self) -> usize {
        self.records_per_page.clamp(1, MAX_RECORDS_PER_PAGE)
    }

    /// Number of records to skip.
    pub fn offset(&self) -> usize {
        self.page.max(1).saturating_sub(1).saturating_mul(self.limit())
    }
}

/// A page of items plus the total record count.
#[derive(Debug)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T: Serialize> IntoResponse for Paginated<T> {
    fn into_response(self) -> Response {
        let mut response = Json(self.items).into_response();
        with_total_count(&mut response, self.total);
        response
    }
}

/// Set the total-count header on a response.
pub fn with_total_count(response: &mut Response, total: usize) {
    response
        .headers_mut()
        .insert(TOTAL_COUNT_HEADER, HeaderValue::from(total));
}
