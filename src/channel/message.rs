// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sealed messages pushed over the link channel.

use crate::eosio::layout::{FieldSpec, FieldValue, Record, RecordLayout, WireType};
use crate::eosio::{PublicKey, SerializerError};

/// `sealed_message { from: public_key, nonce: uint64, ciphertext: bytes, checksum: uint32 }`
pub const SEALED_MESSAGE: RecordLayout = RecordLayout {
    name: "sealed_message",
    fields: &[
        FieldSpec::new("from", WireType::PublicKey),
        FieldSpec::new("nonce", WireType::Uint64),
        FieldSpec::new("ciphertext", WireType::Bytes),
        FieldSpec::new("checksum", WireType::Uint32),
    ],
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Malformed sealed message: {0}")]
pub struct MessageDecodeError(#[from] SerializerError);

/// Encrypted envelope from the requesting application. The ciphertext is
/// passed on untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedMessage {
    pub from: PublicKey,
    pub nonce: u64,
    pub ciphertext: Vec<u8>,
    pub checksum: u32,
}

impl SealedMessage {
    pub fn decode(data: &[u8]) -> Result<Self, MessageDecodeError> {
        let mut record = SEALED_MESSAGE.decode(data)?;
        let missing = |field: &str| {
            MessageDecodeError(SerializerError::InvalidValue(format!("missing field `{field}`")))
        };

        let Some(FieldValue::PublicKey(from)) = record.take("from") else {
            return Err(missing("from"));
        };
        let Some(FieldValue::Uint64(nonce)) = record.take("nonce") else {
            return Err(missing("nonce"));
        };
        let Some(FieldValue::Bytes(ciphertext)) = record.take("ciphertext") else {
            return Err(missing("ciphertext"));
        };
        let Some(FieldValue::Uint32(checksum)) = record.take("checksum") else {
            return Err(missing("checksum"));
        };

        Ok(Self {
            from,
            nonce,
            ciphertext,
            checksum,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>, MessageDecodeError> {
        let record = Record::new(vec![
            ("from", FieldValue::PublicKey(self.from)),
            ("nonce", FieldValue::Uint64(self.nonce)),
            ("ciphertext", FieldValue::Bytes(self.ciphertext.clone())),
            ("checksum", FieldValue::Uint32(self.checksum)),
        ]);
        Ok(SEALED_MESSAGE.encode(&record)?)
    }
}
