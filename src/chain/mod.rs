// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Read-only access to chain state.
//!
//! The resolver only needs three things from a node: the head block, a block
//! by number and an account's ABI. [`ChainOracle`] is that surface;
//! [`ChainClient`] implements it over the nodeos HTTP API.

pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::eosio::{AbiDef, Checksum256, Name};

pub use client::ChainClient;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainClientError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("RPC error: {0}")]
    RpcError(String),

    #[error("Invalid RPC response: {0}")]
    InvalidResponse(String),

    #[error("Account {0} has no ABI")]
    AbiNotFound(Name),
}

/// Subset of `/v1/chain/get_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainInfo {
    pub chain_id: Checksum256,
    pub head_block_num: u32,
    #[serde(default)]
    pub head_block_time: String,
    #[serde(default)]
    pub last_irreversible_block_num: u32,
}

/// Subset of `/v1/chain/get_block`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub block_num: u32,
    pub timestamp: String,
    pub ref_block_prefix: u32,
}

#[async_trait]
pub trait ChainOracle: Send + Sync {
    async fn get_info(&self) -> Result<ChainInfo, ChainClientError>;

    async fn get_block(&self, block_num: u32) -> Result<BlockInfo, ChainClientError>;

    async fn get_abi(&self, account: Name) -> Result<AbiDef, ChainClientError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::eosio::abi::tests::token_abi;

    pub(crate) const EOS_CHAIN_ID: &str =
        "aca376f206b8fc25a6ed44dbdc66547c36c6c33e3a119ffbeaef943642f0e906";
    pub(crate) const BLOCK_TIME: &str = "2020-01-01T00:00:00.000";
    pub(crate) const REF_BLOCK_PREFIX: u32 = 12345;

    /// In-memory node that records every call it receives.
    pub(crate) struct StubOracle {
        pub chain_id: Checksum256,
        pub head: u32,
        pub abis: HashMap<Name, AbiDef>,
        calls: Mutex<Vec<String>>,
    }

    impl StubOracle {
        /// EOS mainnet at head 100 with `eosio.token` deployed.
        pub(crate) fn eos() -> Self {
            let mut abis = HashMap::new();
            abis.insert(Name::new("eosio.token").unwrap(), token_abi());
            Self {
                chain_id: EOS_CHAIN_ID.parse().unwrap(),
                head: 100,
                abis,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub(crate) fn count(&self, prefix: &str) -> usize {
            self.calls().iter().filter(|c| c.starts_with(prefix)).count()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl ChainOracle for StubOracle {
        async fn get_info(&self) -> Result<ChainInfo, ChainClientError> {
            self.record("get_info".into());
            Ok(ChainInfo {
                chain_id: self.chain_id,
                head_block_num: self.head,
                head_block_time: BLOCK_TIME.into(),
                last_irreversible_block_num: self.head.saturating_sub(10),
            })
        }

        async fn get_block(&self, block_num: u32) -> Result<BlockInfo, ChainClientError> {
            self.record(format!("get_block:{block_num}"));
            Ok(BlockInfo {
                block_num,
                timestamp: BLOCK_TIME.into(),
                ref_block_prefix: REF_BLOCK_PREFIX,
            })
        }

        async fn get_abi(&self, account: Name) -> Result<AbiDef, ChainClientError> {
            self.record(format!("get_abi:{account}"));
            self.abis
                .get(&account)
                .cloned()
                .ok_or(ChainClientError::AbiNotFound(account))
        }
    }
}
