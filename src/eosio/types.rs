// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Core chain types: checksums, timestamps, actions and transactions.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use super::name::Name;
use super::serializer::{
    BinaryReader, BinaryWriter, Pack, SerializerError, SerializerResult, Unpack,
};

/// Timestamp format used by nodeos (UTC, no zone suffix).
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// 32-byte digest, rendered as lowercase hex.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Checksum256(pub [u8; 32]);

impl Checksum256 {
    pub fn hash(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Checksum256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for Checksum256 {
    type Err = SerializerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)
            .map_err(|e| SerializerError::InvalidValue(format!("checksum256 hex: {e}")))?;
        let array: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            SerializerError::InvalidValue(format!("checksum256 must be 32 bytes, got {}", v.len()))
        })?;
        Ok(Self(array))
    }
}

impl Serialize for Checksum256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Checksum256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl Pack for Checksum256 {
    fn pack(&self, writer: &mut BinaryWriter) {
        writer.write_raw(&self.0);
    }
}

impl Unpack for Checksum256 {
    fn unpack(reader: &mut BinaryReader<'_>) -> SerializerResult<Self> {
        Ok(Self(reader.read_array()?))
    }
}

/// Seconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimePointSec(pub u32);

impl TimePointSec {
    pub fn seconds(&self) -> u32 {
        self.0
    }

    pub fn saturating_add(&self, seconds: u32) -> Self {
        Self(self.0.saturating_add(seconds))
    }

    /// Parse a nodeos timestamp, discarding any fractional seconds.
    ///
    /// Accepts `2020-01-01T00:00:00`, `2020-01-01T00:00:00.500` and a
    /// trailing `Z`.
    pub fn parse(s: &str) -> Result<Self, SerializerError> {
        let trimmed = s.trim_end_matches('Z');
        let parsed = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
            .map_err(|e| SerializerError::InvalidValue(format!("timestamp `{s}`: {e}")))?;
        let secs = parsed.and_utc().timestamp();
        u32::try_from(secs)
            .map(Self)
            .map_err(|_| SerializerError::InvalidValue(format!("timestamp `{s}` out of range")))
    }
}

impl fmt::Display for TimePointSec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match DateTime::from_timestamp(i64::from(self.0), 0) {
            Some(dt) => write!(f, "{}", dt.format(TIME_FORMAT)),
            None => write!(f, "{}", self.0),
        }
    }
}

impl Pack for TimePointSec {
    fn pack(&self, writer: &mut BinaryWriter) {
        writer.write_u32(self.0);
    }
}

impl Unpack for TimePointSec {
    fn unpack(reader: &mut BinaryReader<'_>) -> SerializerResult<Self> {
        Ok(Self(reader.read_u32()?))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionLevel {
    pub actor: Name,
    pub permission: Name,
}

impl PermissionLevel {
    pub fn new(actor: Name, permission: Name) -> Self {
        Self { actor, permission }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.actor, self.permission)
    }
}

impl Pack for PermissionLevel {
    fn pack(&self, writer: &mut BinaryWriter) {
        self.actor.pack(writer);
        self.permission.pack(writer);
    }
}

impl Unpack for PermissionLevel {
    fn unpack(reader: &mut BinaryReader<'_>) -> SerializerResult<Self> {
        Ok(Self {
            actor: Name::unpack(reader)?,
            permission: Name::unpack(reader)?,
        })
    }
}

/// A contract action with already serialized `data`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Action {
    pub account: Name,
    pub name: Name,
    pub authorization: Vec<PermissionLevel>,
    pub data: Vec<u8>,
}

impl Pack for Action {
    fn pack(&self, writer: &mut BinaryWriter) {
        self.account.pack(writer);
        self.name.pack(writer);
        self.authorization.pack(writer);
        writer.write_bytes(&self.data);
    }
}

impl Unpack for Action {
    fn unpack(reader: &mut BinaryReader<'_>) -> SerializerResult<Self> {
        Ok(Self {
            account: Name::unpack(reader)?,
            name: Name::unpack(reader)?,
            authorization: Vec::unpack(reader)?,
            data: reader.read_bytes()?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extension {
    pub kind: u16,
    pub data: Vec<u8>,
}

impl Pack for Extension {
    fn pack(&self, writer: &mut BinaryWriter) {
        writer.write_u16(self.kind);
        writer.write_bytes(&self.data);
    }
}

impl Unpack for Extension {
    fn unpack(reader: &mut BinaryReader<'_>) -> SerializerResult<Self> {
        Ok(Self {
            kind: reader.read_u16()?,
            data: reader.read_bytes()?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    pub expiration: TimePointSec,
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    pub max_net_usage_words: u32,
    pub max_cpu_usage_ms: u8,
    pub delay_sec: u32,
    pub context_free_actions: Vec<Action>,
    pub actions: Vec<Action>,
    pub transaction_extensions: Vec<Extension>,
}

impl Transaction {
    /// True when expiration and TAPOS fields are all unset.
    pub fn has_empty_header(&self) -> bool {
        self.expiration.0 == 0 && self.ref_block_num == 0 && self.ref_block_prefix == 0
    }

    /// Transaction id: sha256 of the packed transaction.
    pub fn id(&self) -> Checksum256 {
        Checksum256::hash(&self.pack_to_vec())
    }
}

impl Pack for Transaction {
    fn pack(&self, writer: &mut BinaryWriter) {
        self.expiration.pack(writer);
        writer.write_u16(self.ref_block_num);
        writer.write_u32(self.ref_block_prefix);
        writer.write_varuint32(self.max_net_usage_words);
        writer.write_u8(self.max_cpu_usage_ms);
        writer.write_varuint32(self.delay_sec);
        self.context_free_actions.pack(writer);
        self.actions.pack(writer);
        self.transaction_extensions.pack(writer);
    }
}

impl Unpack for Transaction {
    fn unpack(reader: &mut BinaryReader<'_>) -> SerializerResult<Self> {
        Ok(Self {
            expiration: TimePointSec::unpack(reader)?,
            ref_block_num: reader.read_u16()?,
            ref_block_prefix: reader.read_u32()?,
            max_net_usage_words: reader.read_varuint32()?,
            max_cpu_usage_ms: reader.read_u8()?,
            delay_sec: reader.read_varuint32()?,
            context_free_actions: Vec::unpack(reader)?,
            actions: Vec::unpack(reader)?,
            transaction_extensions: Vec::unpack(reader)?,
        })
    }
}
