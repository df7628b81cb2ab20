// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction signing and callback payload construction.
//!
//! The cryptographic step sits behind [`SignatureProvider`] so the key can
//! live anywhere. [`LocalKeyProvider`] holds keys in memory and signs
//! `sha256(chain_id || transaction || 32 zero bytes)`.

use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::eosio::{Checksum256, PrivateKey, PublicKey, Signature};
use crate::identity::Identity;
use crate::request::{AbiSet, Callback, ResolvedTransaction, SCHEME};

/// Token some encoders emit for a missing `req` value.
pub const ABSENT_TOKEN: &str = "undefined";

/// Client identifier reported to the requesting application.
pub const DEFAULT_LINK_NAME: &str = "mydapp";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SigningError {
    #[error("No private key for {0}")]
    MissingKey(String),

    #[error("Signature failed: {0}")]
    Signature(String),

    #[error("Provider returned no signatures")]
    NoSignatures,

    #[error("Request has no callback")]
    NoCallback,
}

/// Everything a provider needs to sign one transaction.
#[derive(Debug, Clone, Copy)]
pub struct SignArgs<'a> {
    pub chain_id: &'a Checksum256,
    pub required_keys: &'a [PublicKey],
    pub serialized_transaction: &'a [u8],
    pub abis: &'a AbiSet,
}

#[async_trait]
pub trait SignatureProvider: Send + Sync {
    /// One signature per required key, in order.
    async fn sign(&self, args: SignArgs<'_>) -> Result<Vec<Signature>, SigningError>;
}

/// Digest signed for a transaction on `chain_id`.
pub fn signing_digest(chain_id: &Checksum256, serialized_transaction: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(chain_id.as_bytes());
    hasher.update(serialized_transaction);
    // Empty context-free data digest
    hasher.update([0u8; 32]);
    hasher.finalize().into()
}

/// Signs with keys held in memory.
pub struct LocalKeyProvider {
    keys: Vec<(PublicKey, PrivateKey)>,
}

impl LocalKeyProvider {
    pub fn new(keys: impl IntoIterator<Item = PrivateKey>) -> Result<Self, SigningError> {
        let keys = keys
            .into_iter()
            .map(|key| {
                key.public_key()
                    .map(|public| (public, key))
                    .map_err(|e| SigningError::Signature(e.to_string()))
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { keys })
    }

    pub fn available_keys(&self) -> Vec<PublicKey> {
        self.keys.iter().map(|(public, _)| *public).collect()
    }
}

#[async_trait]
impl SignatureProvider for LocalKeyProvider {
    async fn sign(&self, args: SignArgs<'_>) -> Result<Vec<Signature>, SigningError> {
        let digest = signing_digest(args.chain_id, args.serialized_transaction);
        args.required_keys
            .iter()
            .map(|required| {
                let (_, private) = self
                    .keys
                    .iter()
                    .find(|(public, _)| public == required)
                    .ok_or_else(|| SigningError::MissingKey(required.to_string()))?;
                private
                    .sign_digest(&digest)
                    .map_err(|e| SigningError::Signature(e.to_string()))
            })
            .collect()
    }
}

/// Replace a `req` value that is exactly the absent token with the scheme.
pub fn repair_request_field(req: String) -> String {
    if req == ABSENT_TOKEN {
        SCHEME.to_string()
    } else {
        req
    }
}

pub struct Signer {
    provider: Arc<dyn SignatureProvider>,
    public_key: PublicKey,
    link_name: String,
}

impl Signer {
    pub fn new(provider: Arc<dyn SignatureProvider>, public_key: PublicKey) -> Self {
        Self {
            provider,
            public_key,
            link_name: DEFAULT_LINK_NAME.to_string(),
        }
    }

    /// Signer backed by the identity's own key.
    pub fn from_identity(identity: &Identity) -> Result<Self, SigningError> {
        let provider = LocalKeyProvider::new([identity.private_key().clone()])?;
        Ok(Self::new(Arc::new(provider), identity.public_key()))
    }

    pub fn with_link_name(mut self, link_name: impl Into<String>) -> Self {
        self.link_name = link_name.into();
        self
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    /// Sign `resolved` and build the callback for its first descriptor.
    pub async fn sign(
        &self,
        resolved: &ResolvedTransaction,
        abis: &AbiSet,
    ) -> Result<Callback, SigningError> {
        let required_keys = [self.public_key];
        let signatures = self
            .provider
            .sign(SignArgs {
                chain_id: &resolved.chain_id,
                required_keys: &required_keys,
                serialized_transaction: &resolved.serialized_transaction,
                abis,
            })
            .await?;
        if signatures.is_empty() {
            return Err(SigningError::NoSignatures);
        }

        let mut callback = resolved
            .callback(&signatures, None)
            .ok_or(SigningError::NoCallback)?;

        let payload = &mut callback.payload;
        payload.req = repair_request_field(std::mem::take(&mut payload.req));
        payload.link_ch = Some(resolved.request.callback.clone());
        payload.link_key = Some(self.public_key.to_string());
        payload.link_name = Some(self.link_name.clone());

        info!(
            tx_id = %payload.tx,
            signer = %resolved.signer,
            "signed transaction"
        );
        Ok(callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::testing::StubOracle;
    use crate::codec::CodecAdapter;
    use crate::identity::tests::alice;
    use crate::request::resolve::tests::transfer_request;
    use crate::request::{RequestResolver, ResolvedRequest};

    async fn resolved() -> ResolvedRequest {
        RequestResolver::new(Arc::new(StubOracle::eos()), CodecAdapter::default())
            .resolve(transfer_request(), alice().authorization())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn signature_recovers_to_signer_key() {
        let identity = alice();
        let resolved = resolved().await;
        let callback = Signer::from_identity(&identity)
            .unwrap()
            .sign(&resolved.resolved, &resolved.abis)
            .await
            .unwrap();

        let signature: Signature = callback.payload.sig.parse().unwrap();
        let digest = signing_digest(
            &resolved.resolved.chain_id,
            &resolved.resolved.serialized_transaction,
        );
        assert_eq!(signature.recover(&digest).unwrap(), identity.public_key());
        assert!(callback.payload.sig.starts_with("SIG_K1_"));
    }

    #[tokio::test]
    async fn payload_carries_link_fields() {
        let identity = alice();
        let resolved = resolved().await;
        let callback = Signer::from_identity(&identity)
            .unwrap()
            .with_link_name("wallet-under-test")
            .sign(&resolved.resolved, &resolved.abis)
            .await
            .unwrap();

        let payload = callback.payload;
        assert_eq!(payload.link_ch.as_deref(), Some(resolved.callback_url.as_str()));
        assert_eq!(payload.link_key, Some(identity.public_key().to_string()));
        assert!(payload.link_key.as_deref().unwrap().starts_with("PUB_K1_"));
        assert_eq!(payload.link_name.as_deref(), Some("wallet-under-test"));
        assert_eq!(payload.req, resolved.resolved.encoded_request);
        assert_eq!(payload.sa, "alice");
        assert_eq!(payload.sp, "active");
        assert_eq!(callback.url, resolved.callback_url);
    }

    #[test]
    fn only_the_exact_absent_token_is_rewritten() {
        assert_eq!(repair_request_field("undefined".into()), "esr");
        assert_eq!(
            repair_request_field("undefined://gmNgZGRkAIFXBqEFEwpsR".into()),
            "undefined://gmNgZGRkAIFXBqEFEwpsR"
        );
        assert_eq!(repair_request_field("esr://abc".into()), "esr://abc");
        assert_eq!(repair_request_field("Undefined".into()), "Undefined");
    }

    #[tokio::test]
    async fn missing_key_is_reported() {
        let resolved = resolved().await;
        let provider = LocalKeyProvider::new(Vec::new()).unwrap();
        let signer = Signer::new(Arc::new(provider), alice().public_key());
        let err = signer
            .sign(&resolved.resolved, &resolved.abis)
            .await
            .unwrap_err();
        assert!(matches!(err, SigningError::MissingKey(_)));
    }

    #[tokio::test]
    async fn request_without_callback_cannot_be_answered() {
        let mut resolved = resolved().await;
        resolved.resolved.request.callback.clear();
        let err = Signer::from_identity(&alice())
            .unwrap()
            .sign(&resolved.resolved, &resolved.abis)
            .await
            .unwrap_err();
        assert_eq!(err, SigningError::NoCallback);
    }

    #[test]
    fn local_provider_lists_keys() {
        let provider = LocalKeyProvider::new([alice().private_key().clone()]).unwrap();
        assert_eq!(provider.available_keys(), vec![alice().public_key()]);
    }
}
