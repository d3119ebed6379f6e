// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup. Missing
//! required values are fatal: [`Settings::from_env`] returns an error and the
//! process refuses to start.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `APP_ENV` | `development` or `production` | `production` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `JWT_SIGNING_KEY` | Symmetric key for bearer token signatures | Required |
//! | `FRONTEND_URL` | The single origin allowed by CORS | Required |
//! | `DATABASE_URL` | Persistence connection string | Optional |
//! | `HTTPS_PORT` | Port plaintext requests are redirected to | Optional |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM certificate chain and key | Optional |
//! | `STATIC_DIR` | Web root for static files | `wwwroot` |
//! | `TOKEN_LIFETIME_SECS` | Lifetime of issued tokens | `31536000` |
//! | `SEED_ADMIN_EMAIL` / `SEED_ADMIN_PASSWORD` | Seed an admin account | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const APP_ENV_ENV: &str = "APP_ENV";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const SIGNING_KEY_ENV: &str = "JWT_SIGNING_KEY";
pub const FRONTEND_URL_ENV: &str = "FRONTEND_URL";
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
pub const HTTPS_PORT_ENV: &str = "HTTPS_PORT";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const STATIC_DIR_ENV: &str = "STATIC_DIR";
pub const TOKEN_LIFETIME_ENV: &str = "TOKEN_LIFETIME_SECS";
pub const SEED_ADMIN_EMAIL_ENV: &str = "SEED_ADMIN_EMAIL";
pub const SEED_ADMIN_PASSWORD_ENV: &str = "SEED_ADMIN_PASSWORD";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Issued tokens live for one year unless configured otherwise.
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 365 * 24 * 60 * 60;

/// Errors raised while loading configuration. All of them abort startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required configuration value `{0}` is missing")]
    Missing(&'static str),
    #[error("configuration value `{var}` is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Hosting environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Paths to a PEM certificate chain and private key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Credentials for an admin account created at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct SeedAdmin {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for SeedAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedAdmin")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Startup configuration.
#[derive(Clone)]
pub struct Settings {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    /// Raw signing key; only ever turned into a `SigningKey` by the startup bundle.
    pub signing_key: String,
    pub frontend_url: String,
    pub database_url: Option<String>,
    pub https_port: Option<u16>,
    pub tls: Option<TlsPaths>,
    pub static_dir: PathBuf,
    pub token_lifetime: Duration,
    pub seed_admin: Option<SeedAdmin>,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("environment", &self.environment)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("signing_key", &"<redacted>")
            .field("frontend_url", &self.frontend_url)
            .field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
            .field("https_port", &self.https_port)
            .field("tls", &self.tls)
            .field("static_dir", &self.static_dir)
            .field("token_lifetime", &self.token_lifetime)
            .field("seed_admin", &self.seed_admin)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through an arbitrary lookup function.
    ///
    /// Empty values are treated as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let environment = match get(APP_ENV_ENV).map(|v| v.to_lowercase()) {
            None => Environment::Production,
            Some(v) if v == "development" || v == "dev" => Environment::Development,
            Some(v) if v == "production" || v == "prod" => Environment::Production,
            Some(v) => {
                return Err(ConfigError::Invalid {
                    var: APP_ENV_ENV,
                    reason: format!("unknown environment `{v}`"),
                })
            }
        };

        let signing_key = get(SIGNING_KEY_ENV).ok_or(ConfigError::Missing(SIGNING_KEY_ENV))?;
        let frontend_url = get(FRONTEND_URL_ENV).ok_or(ConfigError::Missing(FRONTEND_URL_ENV))?;

        let port = match get(PORT_ENV) {
            Some(v) => parse_port(PORT_ENV, &v)?,
            None => 8080,
        };
        let https_port = get(HTTPS_PORT_ENV)
            .map(|v| parse_port(HTTPS_PORT_ENV, &v))
            .transpose()?;

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(TLS_KEY_PATH_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(TLS_CERT_PATH_ENV)),
        };

        let token_lifetime = match get(TOKEN_LIFETIME_ENV) {
            Some(v) => {
                let secs: u64 = v.trim().parse().map_err(|e| ConfigError::Invalid {
                    var: TOKEN_LIFETIME_ENV,
                    reason: format!("{e}"),
                })?;
                if secs == 0 {
                    return Err(ConfigError::Invalid {
                        var: TOKEN_LIFETIME_ENV,
                        reason: "must be greater than zero".to_string(),
                    });
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_TOKEN_LIFETIME_SECS),
        };

        let seed_admin = match (get(SEED_ADMIN_EMAIL_ENV), get(SEED_ADMIN_PASSWORD_ENV)) {
            (Some(email), Some(password)) => Some(SeedAdmin { email, password }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(SEED_ADMIN_PASSWORD_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(SEED_ADMIN_EMAIL_ENV)),
        };

        let log_format = match get(LOG_FORMAT_ENV).map(|v| v.to_lowercase()) {
            Some(v) if v == "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            environment,
            host: get(HOST_ENV).unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            signing_key,
            frontend_url,
            database_url: get(DATABASE_URL_ENV),
            https_port,
            tls,
            static_dir: get(STATIC_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("wwwroot")),
            token_lifetime,
            seed_admin,
            log_format,
        })
    }

    /// Bind address as `host:port`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_port(var: &'static str, value: &str) -> Result<u16, ConfigError> {
    value.trim().parse().map_err(|e| ConfigError::Invalid {
        var,
        reason: format!("`{value}` is not a port number: {e}"),
    })
}
