// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Static asset stage.
//!
//! `GET`/`HEAD` requests naming an existing file under the web root are
//! answered from disk. Everything else, including misses, continues down the
//! pipeline untouched.

use std::path::Path;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
};
use tower::ServiceExt;
use tower_http::services::ServeDir;

#[derive(Debug, Clone)]
pub struct StaticFiles {
    dir: ServeDir,
}

impl StaticFiles {
    /// `None` when the web root does not exist; the stage is then skipped.
    pub fn new(root: &Path) -> Option<Self> {
        root.is_dir().then(|| Self {
            dir: ServeDir::new(root).append_index_html_on_directories(false),
        })
    }
}

pub async fn serve_static(
    State(files): State<StaticFiles>,
    request: Request,
    next: Next,
) -> Response {
    if !matches!(*request.method(), Method::GET | Method::HEAD) {
        return next.run(request).await;
    }

    // Look up a bodiless copy so a miss can hand the original request on.
    let mut lookup = Request::new(Body::empty());
    *lookup.method_mut() = request.method().clone();
    *lookup.uri_mut() = request.uri().clone();
    *lookup.headers_mut() = request.headers().clone();

    match files.dir.oneshot(lookup).await {
        Ok(response) if response.status() != StatusCode::NOT_FOUND => response.map(Body::new),
        _ => next.run(request).await,
    }
}
