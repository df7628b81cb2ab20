// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use crate::callback::DeliveryError;
use crate::chain::ChainClientError;
use crate::channel::{ChannelError, MessageDecodeError};
use crate::config::ConfigError;
use crate::eosio::{AbiError, KeyError};
use crate::request::{EncodingError, ResolveError};
use crate::session::{SecretStoreError, SessionError};
use crate::signer::SigningError;

/// Failure of any signing-agent stage, as seen by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AgentError {
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("ABI fetch error: {0}")]
    AbiFetch(String),

    #[error("Chain query error: {0}")]
    ChainQuery(String),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Message decode error: {0}")]
    MessageDecode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Channel error: {0}")]
    Channel(String),
}

impl AgentError {
    /// Short stage label used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode",
            Self::AbiFetch(_) => "abi_fetch",
            Self::ChainQuery(_) => "chain_query",
            Self::Signing(_) => "signing",
            Self::Network(_) => "network",
            Self::Storage(_) => "storage",
            Self::MessageDecode(_) => "message_decode",
            Self::Config(_) => "config",
            Self::Channel(_) => "channel",
        }
    }
}

impl From<ResolveError> for AgentError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Decode(_) => Self::Decode(err.to_string()),
            ResolveError::AbiFetch { .. } => Self::AbiFetch(err.to_string()),
            ResolveError::ChainQuery(_) => Self::ChainQuery(err.to_string()),
        }
    }
}

impl From<EncodingError> for AgentError {
    fn from(err: EncodingError) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<AbiError> for AgentError {
    fn from(err: AbiError) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<ChainClientError> for AgentError {
    fn from(err: ChainClientError) -> Self {
        match err {
            ChainClientError::AbiNotFound(_) => Self::AbiFetch(err.to_string()),
            _ => Self::ChainQuery(err.to_string()),
        }
    }
}

impl From<SigningError> for AgentError {
    fn from(err: SigningError) -> Self {
        Self::Signing(err.to_string())
    }
}

impl From<KeyError> for AgentError {
    fn from(err: KeyError) -> Self {
        Self::Signing(err.to_string())
    }
}

impl From<DeliveryError> for AgentError {
    fn from(err: DeliveryError) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<SessionError> for AgentError {
    fn from(err: SessionError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<SecretStoreError> for AgentError {
    fn from(err: SecretStoreError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<MessageDecodeError> for AgentError {
    fn from(err: MessageDecodeError) -> Self {
        Self::MessageDecode(err.to_string())
    }
}

impl From<ChannelError> for AgentError {
    fn from(err: ChannelError) -> Self {
        Self::Channel(err.to_string())
    }
}

impl From<ConfigError> for AgentError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eosio::Name;

    #[test]
    fn resolve_errors_keep_their_stage() {
        let decode: AgentError = ResolveError::Decode("bad body".into()).into();
        assert_eq!(decode.kind(), "decode");
        assert!(decode.to_string().contains("bad body"));

        let abi: AgentError = ResolveError::AbiFetch {
            account: Name::new("eosio.token").unwrap(),
            reason: "timeout".into(),
        }
        .into();
        assert_eq!(abi.kind(), "abi_fetch");
        assert!(abi.to_string().contains("eosio.token"));

        let chain: AgentError = ResolveError::ChainQuery("no head".into()).into();
        assert_eq!(chain.kind(), "chain_query");
    }

    #[test]
    fn component_errors_map_to_their_category() {
        assert_eq!(AgentError::from(SigningError::NoCallback).kind(), "signing");
        assert_eq!(
            AgentError::from(DeliveryError::Status {
                status: 500,
                body: String::new()
            })
            .kind(),
            "network"
        );
        assert_eq!(
            AgentError::from(ChannelError::EmptyChannelId("x".into())).kind(),
            "channel"
        );
        assert_eq!(
            AgentError::from(ChainClientError::AbiNotFound(Name::new("alice").unwrap())).kind(),
            "abi_fetch"
        );
        assert_eq!(
            AgentError::from(ChainClientError::RpcError("503".into())).kind(),
            "chain_query"
        );
        assert_eq!(
            AgentError::from(ConfigError::Missing("SIGNER_ACCOUNT")).to_string(),
            "Configuration error: SIGNER_ACCOUNT is required"
        );
    }
}
