// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, process::ExitCode, sync::Arc, time::Duration};

use axum::Router;
use axum_server::{tls_rustls::RustlsConfig, Handle};

use back_end_server::{
    api,
    auth::{Claim, ROLE_CLAIM},
    config::{SeedAdmin, Settings, TlsPaths},
    identity::{IdentityStore, MemoryIdentityStore},
    logging,
    startup::{bootstrap, StartupError},
    state::AppState,
};

/// How long in-flight TLS connections get to finish after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> ExitCode {
    // Logging is not up yet; configuration errors go to stderr.
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("Failed to start: {err}");
            return ExitCode::FAILURE;
        }
    };
    logging::init(settings.log_format);

    match run(settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "Server stopped with an error");
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: Settings) -> Result<(), StartupError> {
    tracing::info!(?settings, "Configuration loaded");

    // Must complete before the listener is bound.
    let security = bootstrap(&settings)?;

    let identity = Arc::new(MemoryIdentityStore::new());
    if let Some(seed) = &settings.seed_admin {
        seed_admin(identity.as_ref(), seed)?;
    }
    if settings.database_url.is_some() {
        tracing::warn!("DATABASE_URL is set but users are kept in memory");
    }

    let addr = resolve(&settings.bind_address()).await?;
    let tls = settings.tls.clone();

    let state = AppState::new(settings, security, identity);
    let app = api::app(state)?;

    match tls {
        Some(paths) => serve_tls(addr, app, &paths).await,
        None => serve_plain(addr, app).await,
    }
}

fn seed_admin(store: &dyn IdentityStore, seed: &SeedAdmin) -> Result<(), StartupError> {
    let user = store.create_user(&seed.email, &seed.password)?;
    store.add_claim(&user.id, Claim::new(ROLE_CLAIM, "admin"))?;
    tracing::info!(user_id = %user.id, "Seed admin account created");
    Ok(())
}

async fn resolve(address: &str) -> Result<SocketAddr, StartupError> {
    tokio::net::lookup_host(address)
        .await?
        .next()
        .ok_or_else(|| {
            StartupError::Io(std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                format!("bind address `{address}` did not resolve"),
            ))
        })
}

async fn serve_plain(addr: SocketAddr, app: Router) -> Result<(), StartupError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening on http");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn serve_tls(addr: SocketAddr, app: Router, paths: &TlsPaths) -> Result<(), StartupError> {
    // Install the ring crypto provider for rustls (must be done before any TLS operations)
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::debug!("rustls crypto provider already installed");
    }

    let config = RustlsConfig::from_pem_file(&paths.cert, &paths.key)
        .await
        .map_err(|e| StartupError::Tls(format!("{}: {e}", paths.cert.display())))?;

    let handle = Handle::new();
    tokio::spawn({
        let handle = handle.clone();
        async move {
            shutdown_signal().await;
            handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        }
    });

    tracing::info!(%addr, "Listening on https");
    axum_server::bind_rustls(addr, config)
        .handle(handle)
        .serve(app.into_make_service())
        .await?;
    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received, draining connections");
}
