// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults and the [`AgentConfig`] loaded from
//! them at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `CHAIN_RPC_URL` | nodeos HTTP endpoint | `https://eos.greymass.com` |
//! | `CHANNEL_SERVICE_URL` | Push-channel service | `https://cb.anchor.link` |
//! | `DATA_DIR` | Directory for the secret store | `./data` |
//! | `SIGNER_PRIVATE_KEY` | Active key (`PVT_K1_` or WIF) | Required |
//! | `SIGNER_ACCOUNT` | Account that signs requests | Required |
//! | `LINK_NAME` | Client identifier sent in callbacks | `mydapp` |
//! | `EXPIRE_SECONDS` | Transaction expiry past the head block | `60` |
//! | `DEBOUNCE_MS` | Window collapsing repeated requests | `1000` |
//! | `SETTLE_MS` | Delay before a debounced request runs | `250` |
//! | `HTTP_TIMEOUT_SECS` | Chain RPC and callback timeout | `15` |
//! | `REARM_AFTER_SIGN` | Re-open the channel after each sign | `false` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::channel::ChannelConfig;
use crate::eosio::{Name, PrivateKey};
use crate::orchestrator::OrchestratorConfig;

pub const CHAIN_RPC_URL_ENV: &str = "CHAIN_RPC_URL";
pub const CHANNEL_SERVICE_URL_ENV: &str = "CHANNEL_SERVICE_URL";
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const SIGNER_PRIVATE_KEY_ENV: &str = "SIGNER_PRIVATE_KEY";
pub const SIGNER_ACCOUNT_ENV: &str = "SIGNER_ACCOUNT";
pub const LINK_NAME_ENV: &str = "LINK_NAME";
pub const EXPIRE_SECONDS_ENV: &str = "EXPIRE_SECONDS";
pub const DEBOUNCE_MS_ENV: &str = "DEBOUNCE_MS";
pub const SETTLE_MS_ENV: &str = "SETTLE_MS";
pub const HTTP_TIMEOUT_SECS_ENV: &str = "HTTP_TIMEOUT_SECS";
pub const REARM_AFTER_SIGN_ENV: &str = "REARM_AFTER_SIGN";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_CHAIN_RPC_URL: &str = "https://eos.greymass.com";
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(250);
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// File name of the redb secret store inside `DATA_DIR`.
pub const SECRET_STORE_FILE: &str = "secrets.redb";
/// Scope all agent secrets are stored under.
pub const SECRET_STORE_SCOPE: &str = "signing-agent";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Invalid {
                name: LOG_FORMAT_ENV,
                reason: format!("expected `json` or `pretty`, got `{other}`"),
            }),
        }
    }
}

#[derive(Clone)]
pub struct AgentConfig {
    pub chain_rpc_url: String,
    pub data_dir: PathBuf,
    pub signer_account: Name,
    pub signer_key: PrivateKey,
    pub link_name: String,
    pub expire_seconds: u32,
    pub http_timeout: Duration,
    /// Timing, re-arm switch and channel service.
    pub orchestrator: OrchestratorConfig,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentConfig")
            .field("chain_rpc_url", &self.chain_rpc_url)
            .field("data_dir", &self.data_dir)
            .field("signer_account", &self.signer_account)
            .field("link_name", &self.link_name)
            .field("expire_seconds", &self.expire_seconds)
            .field("http_timeout", &self.http_timeout)
            .field("orchestrator", &self.orchestrator)
            .field("log_format", &self.log_format)
            .finish_non_exhaustive()
    }
}

impl AgentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; `lookup` returns `None` when unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env_or_default = |name: &str, default: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let env_required = |name: &'static str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let signer_account = env_required(SIGNER_ACCOUNT_ENV)?;
        let signer_account = Name::new(&signer_account).map_err(|e| ConfigError::Invalid {
            name: SIGNER_ACCOUNT_ENV,
            reason: e.to_string(),
        })?;
        let signer_key = env_required(SIGNER_PRIVATE_KEY_ENV)?
            .parse::<PrivateKey>()
            .map_err(|e| ConfigError::Invalid {
                name: SIGNER_PRIVATE_KEY_ENV,
                reason: e.to_string(),
            })?;

        let expire_seconds = parse_number(EXPIRE_SECONDS_ENV, &env_or_default(EXPIRE_SECONDS_ENV, "60"))?;
        let debounce_ms = parse_number(
            DEBOUNCE_MS_ENV,
            &env_or_default(DEBOUNCE_MS_ENV, &DEFAULT_DEBOUNCE.as_millis().to_string()),
        )?;
        let settle_ms = parse_number(
            SETTLE_MS_ENV,
            &env_or_default(SETTLE_MS_ENV, &DEFAULT_SETTLE.as_millis().to_string()),
        )?;
        let timeout_secs = parse_number(
            HTTP_TIMEOUT_SECS_ENV,
            &env_or_default(HTTP_TIMEOUT_SECS_ENV, &DEFAULT_HTTP_TIMEOUT.as_secs().to_string()),
        )?;
        let rearm_after_sign = parse_bool(
            REARM_AFTER_SIGN_ENV,
            &env_or_default(REARM_AFTER_SIGN_ENV, "false"),
        )?;

        Ok(Self {
            chain_rpc_url: env_or_default(CHAIN_RPC_URL_ENV, DEFAULT_CHAIN_RPC_URL),
            data_dir: PathBuf::from(env_or_default(DATA_DIR_ENV, DEFAULT_DATA_DIR)),
            signer_account,
            signer_key,
            link_name: env_or_default(LINK_NAME_ENV, crate::signer::DEFAULT_LINK_NAME),
            expire_seconds,
            http_timeout: Duration::from_secs(timeout_secs),
            orchestrator: OrchestratorConfig {
                debounce: Duration::from_millis(debounce_ms),
                settle: Duration::from_millis(settle_ms),
                rearm_after_sign,
                channel: ChannelConfig {
                    service_url: env_or_default(
                        CHANNEL_SERVICE_URL_ENV,
                        crate::channel::DEFAULT_SERVICE_URL,
                    ),
                    ..ChannelConfig::default()
                },
            },
            log_format: env_or_default(LOG_FORMAT_ENV, "pretty").parse()?,
        })
    }

    pub fn secret_store_path(&self) -> PathBuf {
        self.data_dir.join(SECRET_STORE_FILE)
    }
}

fn parse_number<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            name,
            reason: format!("expected a boolean, got `{other}`"),
        }),
    }
}
