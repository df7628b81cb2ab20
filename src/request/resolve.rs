// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Binding a signing request to a signer and the current chain head.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use super::payload::{Callback, CallbackPayload};
use super::types::{ChainAlias, IdentityRequest, RequestPayload, SigningRequest};
use crate::chain::{BlockInfo, ChainOracle};
use crate::codec::CodecAdapter;
use crate::eosio::keys::Signature;
use crate::eosio::{AbiDef, Action, Checksum256, Name, Pack, PermissionLevel, TimePointSec, Transaction};

pub const DEFAULT_EXPIRE_SECONDS: u32 = 60;

/// ABIs fetched for one resolve, keyed by contract account.
pub type AbiSet = BTreeMap<Name, AbiDef>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("Failed to decode request: {0}")]
    Decode(String),

    #[error("Failed to fetch ABI for {account}: {reason}")]
    AbiFetch { account: Name, reason: String },

    #[error("Chain query failed: {0}")]
    ChainQuery(String),
}

/// A URI to decode, or a request that is already decoded.
#[derive(Debug, Clone)]
pub enum RequestInput {
    Uri(String),
    Request(SigningRequest),
}

impl From<&str> for RequestInput {
    fn from(uri: &str) -> Self {
        Self::Uri(uri.to_string())
    }
}

impl From<String> for RequestInput {
    fn from(uri: String) -> Self {
        Self::Uri(uri)
    }
}

impl From<SigningRequest> for RequestInput {
    fn from(request: SigningRequest) -> Self {
        Self::Request(request)
    }
}

/// A request bound to a signer and a reference block. Ready to sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTransaction {
    pub request: SigningRequest,
    /// Canonical encoding of `request`.
    pub encoded_request: String,
    pub signer: PermissionLevel,
    pub chain_id: Checksum256,
    pub transaction: Transaction,
    pub serialized_transaction: Vec<u8>,
}

impl ResolvedTransaction {
    pub fn transaction_id(&self) -> Checksum256 {
        Checksum256::hash(&self.serialized_transaction)
    }

    /// Callback for `signatures`, or `None` when the request has no callback.
    pub fn callback(&self, signatures: &[Signature], block_num: Option<u32>) -> Option<Callback> {
        if self.request.callback.is_empty() {
            return None;
        }
        let (first, rest) = signatures.split_first()?;

        let extra_signatures = rest
            .iter()
            .enumerate()
            .map(|(n, sig)| (format!("sig{n}"), sig.to_string()))
            .collect();

        let payload = CallbackPayload {
            sig: first.to_string(),
            tx: self.transaction_id().to_string(),
            rbn: self.transaction.ref_block_num.to_string(),
            rid: self.transaction.ref_block_prefix.to_string(),
            ex: self.transaction.expiration.to_string(),
            req: self.encoded_request.clone(),
            sa: self.signer.actor.to_string(),
            sp: self.signer.permission.to_string(),
            cid: self.chain_id.to_string(),
            bn: block_num.map(|n| n.to_string()),
            extra_signatures,
            ..Default::default()
        };

        Some(Callback {
            url: self.request.callback.clone(),
            payload,
            background: self.request.background(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedRequest {
    pub resolved: ResolvedTransaction,
    /// The request's callback URL, placeholders unresolved.
    pub callback_url: String,
    pub abis: AbiSet,
}

pub struct RequestResolver {
    oracle: Arc<dyn ChainOracle>,
    codec: CodecAdapter,
    expire_seconds: u32,
}

impl RequestResolver {
    pub fn new(oracle: Arc<dyn ChainOracle>, codec: CodecAdapter) -> Self {
        Self {
            oracle,
            codec,
            expire_seconds: DEFAULT_EXPIRE_SECONDS,
        }
    }

    pub fn with_expire_seconds(mut self, expire_seconds: u32) -> Self {
        self.expire_seconds = expire_seconds;
        self
    }

    pub fn codec(&self) -> &CodecAdapter {
        &self.codec
    }

    /// Decode `input`, fetch its ABIs, read the chain head and resolve the
    /// transaction for `signer`.
    pub async fn resolve(
        &self,
        input: impl Into<RequestInput>,
        signer: PermissionLevel,
    ) -> Result<ResolvedRequest, ResolveError> {
        let request = match input.into() {
            RequestInput::Uri(uri) => SigningRequest::from_uri(&uri, &self.codec)
                .map_err(|e| ResolveError::Decode(e.to_string()))?,
            RequestInput::Request(request) => request,
        };
        let chain_id = request.chain_id.resolve().ok_or_else(|| {
            ResolveError::Decode(format!("unknown chain alias {:?}", request.chain_id))
        })?;

        let abis = self.fetch_abis(&request).await?;

        let info = self
            .oracle
            .get_info()
            .await
            .map_err(|e| ResolveError::ChainQuery(e.to_string()))?;
        if info.chain_id != chain_id {
            return Err(ResolveError::ChainQuery(format!(
                "node is on chain {}, request is for {chain_id}",
                info.chain_id
            )));
        }
        let block = self
            .oracle
            .get_block(info.head_block_num)
            .await
            .map_err(|e| ResolveError::ChainQuery(e.to_string()))?;

        let transaction = self.resolve_transaction(&request, &abis, signer, &block)?;
        let encoded_request = request
            .encode(&self.codec)
            .map_err(|e| ResolveError::Decode(e.to_string()))?;
        let chain_name = ChainAlias::from_chain_id(&chain_id)
            .map_or_else(|| chain_id.to_string(), |alias| alias.to_string());
        debug!(
            chain = %chain_name,
            head = block.block_num,
            actions = transaction.actions.len(),
            signer = %signer,
            "resolved signing request"
        );

        let callback_url = request.callback.clone();
        let serialized_transaction = transaction.pack_to_vec();
        Ok(ResolvedRequest {
            resolved: ResolvedTransaction {
                request,
                encoded_request,
                signer,
                chain_id,
                transaction,
                serialized_transaction,
            },
            callback_url,
            abis,
        })
    }

    async fn fetch_abis(&self, request: &SigningRequest) -> Result<AbiSet, ResolveError> {
        let mut abis = AbiSet::new();
        for account in request.raw_accounts() {
            let abi = self
                .oracle
                .get_abi(account)
                .await
                .map_err(|e| ResolveError::AbiFetch {
                    account,
                    reason: e.to_string(),
                })?;
            abis.insert(account, abi);
        }
        Ok(abis)
    }

    fn resolve_transaction(
        &self,
        request: &SigningRequest,
        abis: &AbiSet,
        signer: PermissionLevel,
        block: &BlockInfo,
    ) -> Result<Transaction, ResolveError> {
        let mut transaction = match &request.req {
            RequestPayload::Action(action) => Transaction {
                actions: vec![resolve_action(action, abis, signer)?],
                ..Default::default()
            },
            RequestPayload::Actions(actions) => Transaction {
                actions: actions
                    .iter()
                    .map(|action| resolve_action(action, abis, signer))
                    .collect::<Result<_, _>>()?,
                ..Default::default()
            },
            RequestPayload::Transaction(tx) => Transaction {
                actions: tx
                    .actions
                    .iter()
                    .map(|action| resolve_action(action, abis, signer))
                    .collect::<Result<_, _>>()?,
                ..tx.clone()
            },
            RequestPayload::Identity(identity) => Transaction {
                actions: vec![identity_action(identity, request.version, signer)?],
                ..Default::default()
            },
        };

        if !request.is_identity() && transaction.has_empty_header() {
            let timestamp = TimePointSec::parse(&block.timestamp)
                .map_err(|e| ResolveError::ChainQuery(format!("block timestamp: {e}")))?;
            transaction.expiration = timestamp.saturating_add(self.expire_seconds);
            transaction.ref_block_num = (block.block_num & 0xffff) as u16;
            transaction.ref_block_prefix = block.ref_block_prefix;
        }
        Ok(transaction)
    }
}

fn resolve_name(name: Name, signer: PermissionLevel) -> Name {
    if name == Name::PLACEHOLDER_ACTOR {
        signer.actor
    } else if name == Name::PLACEHOLDER_PERMISSION {
        signer.permission
    } else {
        name
    }
}

fn resolve_authorization(auth: PermissionLevel, signer: PermissionLevel) -> PermissionLevel {
    let permission = if auth.permission == Name::PLACEHOLDER_ACTOR
        || auth.permission == Name::PLACEHOLDER_PERMISSION
    {
        signer.permission
    } else {
        auth.permission
    };
    PermissionLevel::new(resolve_name(auth.actor, signer), permission)
}

fn resolve_action(
    action: &Action,
    abis: &AbiSet,
    signer: PermissionLevel,
) -> Result<Action, ResolveError> {
    let abi = abis.get(&action.account).ok_or_else(|| ResolveError::AbiFetch {
        account: action.account,
        reason: "ABI missing from resolve set".into(),
    })?;
    let type_name = abi
        .action_type(action.name)
        .map_err(|e| ResolveError::Decode(format!("{}::{}: {e}", action.account, action.name)))?;

    let map_name = |name: Name| resolve_name(name, signer);
    let value = abi
        .decode_with(type_name, &action.data, &map_name)
        .map_err(|e| ResolveError::Decode(format!("{}::{}: {e}", action.account, action.name)))?;
    let data = abi
        .encode(type_name, &value)
        .map_err(|e| ResolveError::Decode(format!("{}::{}: {e}", action.account, action.name)))?;

    Ok(Action {
        account: action.account,
        name: action.name,
        authorization: action
            .authorization
            .iter()
            .map(|auth| resolve_authorization(*auth, signer))
            .collect(),
        data,
    })
}

fn identity_action(
    identity: &IdentityRequest,
    version: u8,
    signer: PermissionLevel,
) -> Result<Action, ResolveError> {
    let permission = identity
        .permission
        .map(|auth| resolve_authorization(auth, signer))
        .unwrap_or(signer);
    let resolved = IdentityRequest {
        scope: identity.scope,
        permission: Some(permission),
    };
    let mut writer = crate::eosio::BinaryWriter::new();
    resolved.pack_versioned(version, &mut writer);

    Ok(Action {
        account: Name::default(),
        name: Name::new("identity").map_err(|e| ResolveError::Decode(e.to_string()))?,
        authorization: vec![signer],
        data: writer.into_bytes(),
    })
}
