// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! by the backend service. Configuration is loaded from the environment
//! once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `5000` |
//! | `DATA_DIR` | Directory holding `users.redb` | unset (in-memory store) |
//! | `JWT_SECRET` | HS256 signing secret for session tokens | development secret |
//! | `TOKEN_TTL_DAYS` | Session token lifetime in days | `30` |
//! | `DERIVATION_SECRET` | HMAC key used to derive wallet addresses | empty |
//! | `DERIVATION_MODE` | `deterministic` or `timestamped` | `deterministic` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;

use crate::identity::DerivationMode;
use crate::logging::LogFormat;

/// Environment variable name for the server bind address.
pub const HOST_ENV: &str = "HOST";

/// Environment variable name for the server bind port.
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the user database directory.
///
/// When unset the service keeps users in memory and loses them on restart.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Environment variable name for the session token signing secret.
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";

/// Environment variable name for the session token lifetime.
pub const TOKEN_TTL_DAYS_ENV: &str = "TOKEN_TTL_DAYS";

/// Environment variable name for the address derivation key.
pub const DERIVATION_SECRET_ENV: &str = "DERIVATION_SECRET";

/// Environment variable name for the address derivation mode.
pub const DERIVATION_MODE_ENV: &str = "DERIVATION_MODE";

/// Environment variable name for the log output format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_TOKEN_TTL_DAYS: i64 = 30;

/// Signing secret used when `JWT_SECRET` is not provided.
///
/// Only suitable for local development. Startup logs a warning when it is used.
pub const DEV_JWT_SECRET: &str = "sentechain_secret_key_2024";

/// File name of the embedded user database inside `DATA_DIR`.
pub const USER_DB_FILE: &str = "users.redb";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Backend service configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: Option<PathBuf>,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub derivation_secret: String,
    pub derivation_mode: DerivationMode,
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            data_dir: None,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl_days: DEFAULT_TOKEN_TTL_DAYS,
            derivation_secret: String::new(),
            derivation_mode: DerivationMode::Deterministic,
            log_format: LogFormat::Pretty,
        }
    }
}

impl ServerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary lookup function.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match get(PORT_ENV) {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: PORT_ENV,
                value: raw,
            })?,
            None => defaults.port,
        };

        let token_ttl_days = match get(TOKEN_TTL_DAYS_ENV) {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(days) if days > 0 => days,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: TOKEN_TTL_DAYS_ENV,
                        value: raw,
                    })
                }
            },
            None => defaults.token_ttl_days,
        };

        let derivation_mode = match get(DERIVATION_MODE_ENV) {
            Some(raw) => DerivationMode::parse(&raw).ok_or(ConfigError::InvalidValue {
                name: DERIVATION_MODE_ENV,
                value: raw,
            })?,
            None => defaults.derivation_mode,
        };

        Ok(Self {
            host: get(HOST_ENV).unwrap_or(defaults.host),
            port,
            data_dir: get(DATA_DIR_ENV).map(PathBuf::from),
            jwt_secret: get(JWT_SECRET_ENV).unwrap_or(defaults.jwt_secret),
            token_ttl_days,
            derivation_secret: get(DERIVATION_SECRET_ENV).unwrap_or_default(),
            derivation_mode,
            log_format: LogFormat::from_env_value(get(LOG_FORMAT_ENV).as_deref()),
        })
    }

    /// Socket address string suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    /// Path of the user database, if a data directory is configured.
    pub fn user_db_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(USER_DB_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.token_ttl_days, 30);
        assert!(config.data_dir.is_none());
        assert!(config.uses_dev_secret());
        assert_eq!(config.derivation_mode, DerivationMode::Deterministic);
        assert_eq!(config.bind_address(), "0.0.0.0:5000");
    }

    #[test]
    fn reads_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("PORT", "8081"),
            ("DATA_DIR", "/var/lib/sentechain"),
            ("JWT_SECRET", "s3cret"),
            ("DERIVATION_MODE", "timestamped"),
            ("LOG_FORMAT", "json"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8081);
        assert!(!config.uses_dev_secret());
        assert_eq!(config.derivation_mode, DerivationMode::Timestamped);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(
            config.user_db_path().unwrap(),
            PathBuf::from("/var/lib/sentechain/users.redb")
        );
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[("DATA_DIR", "  "), ("PORT", "")])).unwrap();
        assert!(config.data_dir.is_none());
        assert_eq!(config.port, 5000);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(ServerConfig::from_lookup(lookup(&[("PORT", "http")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("TOKEN_TTL_DAYS", "0")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("DERIVATION_MODE", "random")])).is_err());
    }
}
