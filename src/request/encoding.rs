// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! `esr:` URI encoding.
//!
//! ```text
//! esr://<base64url( header | body )>
//! header = version | 0x80 when body is raw-deflated
//! ```

use super::types::{SigningRequest, MAX_VERSION, MIN_VERSION};
use crate::codec::{base64url_decode, base64url_encode, CodecAdapter, CodecError};
use crate::eosio::SerializerError;

pub const SCHEME: &str = "esr";
const WEB_SCHEME: &str = "web+esr";
const COMPRESSED_FLAG: u8 = 1 << 7;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    #[error("Invalid request scheme: {0}")]
    InvalidScheme(String),

    #[error("Empty request body")]
    EmptyBody,

    #[error("Unsupported request version {0}")]
    UnsupportedVersion(u8),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("Malformed request body: {0}")]
    Body(#[from] SerializerError),
}

impl SigningRequest {
    /// Decode an `esr:` / `esr://` / `web+esr:` URI, compressed or not.
    pub fn from_uri(uri: &str, codec: &CodecAdapter) -> Result<Self, EncodingError> {
        let uri = uri.trim();
        let (scheme, path) = uri
            .split_once(':')
            .ok_or_else(|| EncodingError::InvalidScheme(uri.to_string()))?;
        if scheme != SCHEME && scheme != WEB_SCHEME {
            return Err(EncodingError::InvalidScheme(scheme.to_string()));
        }
        let encoded = path.strip_prefix("//").unwrap_or(path);

        let data = base64url_decode(encoded)?;
        let (&header, rest) = data.split_first().ok_or(EncodingError::EmptyBody)?;
        let version = header & !COMPRESSED_FLAG;
        if !(MIN_VERSION..=MAX_VERSION).contains(&version) {
            return Err(EncodingError::UnsupportedVersion(version));
        }

        let body = if header & COMPRESSED_FLAG != 0 {
            codec.decompress(rest)?
        } else {
            rest.to_vec()
        };
        Ok(Self::unpack_body(version, &body)?)
    }

    /// Encode to a URI. The body is only compressed when that makes it smaller.
    pub fn to_uri(
        &self,
        codec: &CodecAdapter,
        compress: bool,
        slashes: bool,
    ) -> Result<String, EncodingError> {
        let mut body = self.pack_body();
        let mut header = self.version;
        if compress {
            let deflated = codec.compress(&body)?;
            if deflated.len() < body.len() {
                header |= COMPRESSED_FLAG;
                body = deflated;
            }
        }

        let mut data = Vec::with_capacity(body.len() + 1);
        data.push(header);
        data.extend_from_slice(&body);

        let separator = if slashes { "://" } else { ":" };
        Ok(format!("{SCHEME}{separator}{}", base64url_encode(&data)))
    }

    /// Canonical compressed `esr://` form.
    pub fn encode(&self, codec: &CodecAdapter) -> Result<String, EncodingError> {
        self.to_uri(codec, true, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eosio::{
        Action, Checksum256, Extension, Name, PermissionLevel, TimePointSec, Transaction,
    };
    use crate::request::types::{ChainId, IdentityRequest, InfoPair, RequestPayload};
    use proptest::collection::vec;
    use proptest::option;
    use proptest::prelude::*;

    fn transfer() -> SigningRequest {
        SigningRequest {
            version: 2,
            chain_id: ChainId::Alias(1),
            req: RequestPayload::Actions(vec![
                Action {
                    account: Name::new("eosio.token").unwrap(),
                    name: Name::new("transfer").unwrap(),
                    authorization: vec![PermissionLevel::new(
                        Name::PLACEHOLDER_ACTOR,
                        Name::PLACEHOLDER_PERMISSION,
                    )],
                    data: vec![0; 40],
                };
                3
            ]),
            flags: 1,
            callback: "https://cb.anchor.link/link/abc?sig={{sig}}".into(),
            info: Vec::new(),
            signature: None,
        }
    }

    #[test]
    fn compressed_and_plain_forms_decode_alike() {
        let codec = CodecAdapter::default();
        let request = transfer();

        let compressed = request.encode(&codec).unwrap();
        let plain = request.to_uri(&codec, false, false).unwrap();
        assert!(compressed.starts_with("esr://"));
        assert!(plain.starts_with("esr:") && !plain.starts_with("esr://"));
        assert!(compressed.len() < plain.len());

        assert_eq!(SigningRequest::from_uri(&compressed, &codec).unwrap(), request);
        assert_eq!(SigningRequest::from_uri(&plain, &codec).unwrap(), request);
    }

    #[test]
    fn header_marks_compression() {
        let codec = CodecAdapter::default();
        let uri = transfer().encode(&codec).unwrap();
        let data = base64url_decode(uri.trim_start_matches("esr://")).unwrap();
        assert_eq!(data[0], 0x82);
    }

    #[test]
    fn incompressible_body_stays_plain() {
        let codec = CodecAdapter::default();
        let request = SigningRequest {
            version: 2,
            chain_id: ChainId::Alias(1),
            req: RequestPayload::Identity(IdentityRequest::default()),
            flags: 0,
            callback: "abcdefghijklmnopqrst".into(),
            info: Vec::new(),
            signature: None,
        };
        let uri = request.encode(&codec).unwrap();
        let data = base64url_decode(uri.trim_start_matches("esr://")).unwrap();
        assert_eq!(data[0], 2);
        assert_eq!(SigningRequest::from_uri(&uri, &codec).unwrap(), request);
    }

    #[test]
    fn web_scheme_is_accepted() {
        let codec = CodecAdapter::default();
        let uri = transfer().encode(&codec).unwrap().replacen("esr:", "web+esr:", 1);
        assert_eq!(SigningRequest::from_uri(&uri, &codec).unwrap(), transfer());
    }

    #[test]
    fn rejects_bad_input() {
        let codec = CodecAdapter::default();
        assert!(matches!(
            SigningRequest::from_uri("http://example.com", &codec),
            Err(EncodingError::InvalidScheme(_))
        ));
        assert!(matches!(
            SigningRequest::from_uri("esr:", &codec),
            Err(EncodingError::EmptyBody)
        ));
        // header byte 0x01: version 1
        assert!(matches!(
            SigningRequest::from_uri("esr:AQ", &codec),
            Err(EncodingError::UnsupportedVersion(1))
        ));
        assert!(matches!(
            SigningRequest::from_uri("esr:Ag", &codec),
            Err(EncodingError::Body(_))
        ));
        assert!(SigningRequest::from_uri("esr:!!!", &codec).is_err());
    }

    fn name() -> impl Strategy<Value = Name> {
        any::<u64>().prop_map(Name::from_raw)
    }

    fn permission_level() -> impl Strategy<Value = PermissionLevel> {
        (name(), name()).prop_map(|(actor, permission)| PermissionLevel::new(actor, permission))
    }

    fn action() -> impl Strategy<Value = Action> {
        (name(), name(), vec(permission_level(), 0..3), vec(any::<u8>(), 0..48)).prop_map(
            |(account, name, authorization, data)| Action {
                account,
                name,
                authorization,
                data,
            },
        )
    }

    fn transaction() -> impl Strategy<Value = Transaction> {
        (
            any::<u32>(),
            any::<u16>(),
            any::<u32>(),
            any::<u32>(),
            any::<u8>(),
            any::<u32>(),
            vec(action(), 0..2),
            vec(action(), 0..3),
            vec((any::<u16>(), vec(any::<u8>(), 0..8)), 0..2),
        )
            .prop_map(
                |(
                    expiration,
                    ref_block_num,
                    ref_block_prefix,
                    max_net_usage_words,
                    max_cpu_usage_ms,
                    delay_sec,
                    context_free_actions,
                    actions,
                    extensions,
                )| Transaction {
                    expiration: TimePointSec(expiration),
                    ref_block_num,
                    ref_block_prefix,
                    max_net_usage_words,
                    max_cpu_usage_ms,
                    delay_sec,
                    context_free_actions,
                    actions,
                    transaction_extensions: extensions
                        .into_iter()
                        .map(|(kind, data)| Extension { kind, data })
                        .collect(),
                },
            )
    }

    fn payload(version: u8) -> impl Strategy<Value = RequestPayload> {
        // identity scope is only carried from version 3
        let identity = (name(), option::of(permission_level())).prop_map(
            move |(scope, permission)| {
                RequestPayload::Identity(IdentityRequest {
                    scope: (version >= 3).then_some(scope),
                    permission,
                })
            },
        );
        prop_oneof![
            action().prop_map(RequestPayload::Action),
            vec(action(), 0..4).prop_map(RequestPayload::Actions),
            transaction().prop_map(RequestPayload::Transaction),
            identity,
        ]
    }

    fn chain_id() -> impl Strategy<Value = ChainId> {
        prop_oneof![
            any::<u8>().prop_map(ChainId::Alias),
            any::<[u8; 32]>().prop_map(|bytes| ChainId::Id(Checksum256(bytes))),
        ]
    }

    fn signing_request() -> impl Strategy<Value = SigningRequest> {
        prop_oneof![Just(2u8), Just(3u8)]
            .prop_flat_map(|version| {
                (
                    Just(version),
                    chain_id(),
                    payload(version),
                    any::<u8>(),
                    ".{0,40}",
                    vec(("[a-z_]{0,12}", vec(any::<u8>(), 0..24)), 0..4),
                )
            })
            .prop_map(|(version, chain_id, req, flags, callback, info)| SigningRequest {
                version,
                chain_id,
                req,
                flags,
                callback,
                info: info
                    .into_iter()
                    .map(|(key, value)| InfoPair { key, value })
                    .collect(),
                signature: None,
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn any_request_survives_its_uri(
            request in signing_request(),
            compress in any::<bool>(),
            slashes in any::<bool>(),
        ) {
            let codec = CodecAdapter::default();
            let uri = request.to_uri(&codec, compress, slashes).unwrap();
            let prefix = if slashes { "esr://" } else { "esr:" };
            prop_assert!(uri.starts_with(prefix));
            prop_assert_eq!(SigningRequest::from_uri(&uri, &codec).unwrap(), request);
        }
    }
}
