// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! by the `ledger` binary. Configuration is loaded from the environment at
//! startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Directory holding the slot files | `.financial-tracker` |
//! | `LEDGER_KDF_ITERATIONS` | PBKDF2 iterations for newly enabled vaults | `100000` |
//! | `LEDGER_PASSPHRASE` | Vault passphrase; prompted for when unset | unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::path::PathBuf;

use zeroize::Zeroizing;

use crate::crypto::DEFAULT_ITERATIONS;
use crate::storage::DEFAULT_DATA_DIR;

/// Environment variable name for the slot data directory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Environment variable name for the KDF iteration count.
///
/// Only affects vaults enabled after the change; existing records carry
/// their own count.
pub const KDF_ITERATIONS_ENV: &str = "LEDGER_KDF_ITERATIONS";

/// Environment variable name for a non-interactive passphrase.
pub const PASSPHRASE_ENV: &str = "LEDGER_PASSPHRASE";

/// Environment variable name for the log output format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Filter applied when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has invalid value {value:?}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub kdf_iterations: u32,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            kdf_iterations: DEFAULT_ITERATIONS,
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_optional)
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(dir) = lookup(DATA_DIR_ENV) {
            config.data_dir = PathBuf::from(dir);
        }

        if let Some(raw) = lookup(KDF_ITERATIONS_ENV) {
            config.kdf_iterations = match raw.parse::<u32>() {
                Ok(0) | Err(_) => {
                    return Err(ConfigError::InvalidValue {
                        name: KDF_ITERATIONS_ENV,
                        value: raw,
                        reason: "expected a positive integer",
                    })
                }
                Ok(n) => n,
            };
        }

        if let Some(format) = lookup(LOG_FORMAT_ENV) {
            config.log_format = LogFormat::parse(&format);
        }

        Ok(config)
    }
}

/// Passphrase supplied through the environment, if any.
pub fn passphrase_from_env() -> Option<Zeroizing<String>> {
    std::env::var(PASSPHRASE_ENV)
        .ok()
        .filter(|v| !v.is_empty())
        .map(Zeroizing::new)
}

fn env_optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
