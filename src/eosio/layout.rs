// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fixed-field binary record descriptions.
//!
//! A [`RecordLayout`] lists field names and wire types in order. The
//! generic [`RecordLayout::decode`] and [`RecordLayout::encode`] walk that
//! list, so adding a record type only needs a new `const` layout.

use super::keys::PublicKey;
use super::serializer::{BinaryReader, BinaryWriter, Pack, SerializerError, SerializerResult, Unpack};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    PublicKey,
    Uint32,
    Uint64,
    Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub wire: WireType,
}

impl FieldSpec {
    pub const fn new(name: &'static str, wire: WireType) -> Self {
        Self { name, wire }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    PublicKey(PublicKey),
    Uint32(u32),
    Uint64(u64),
    Bytes(Vec<u8>),
}

impl FieldValue {
    fn wire_type(&self) -> WireType {
        match self {
            Self::PublicKey(_) => WireType::PublicKey,
            Self::Uint32(_) => WireType::Uint32,
            Self::Uint64(_) => WireType::Uint64,
            Self::Bytes(_) => WireType::Bytes,
        }
    }
}

/// Decoded record: field values in layout order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(&'static str, FieldValue)>,
}

impl Record {
    pub fn new(fields: Vec<(&'static str, FieldValue)>) -> Self {
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    /// Move a field out of the record.
    pub fn take(&mut self, name: &str) -> Option<FieldValue> {
        let idx = self.fields.iter().position(|(field, _)| *field == name)?;
        Some(self.fields.remove(idx).1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayout {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

impl RecordLayout {
    /// Read every field in order; the input must be consumed exactly.
    pub fn decode(&self, data: &[u8]) -> SerializerResult<Record> {
        let mut reader = BinaryReader::new(data);
        let mut fields = Vec::with_capacity(self.fields.len());
        for spec in self.fields {
            let value = match spec.wire {
                WireType::PublicKey => FieldValue::PublicKey(PublicKey::unpack(&mut reader)?),
                WireType::Uint32 => FieldValue::Uint32(reader.read_u32()?),
                WireType::Uint64 => FieldValue::Uint64(reader.read_u64()?),
                WireType::Bytes => FieldValue::Bytes(reader.read_bytes()?),
            };
            fields.push((spec.name, value));
        }
        reader.finish()?;
        Ok(Record { fields })
    }

    /// Write `record` following this layout, checking names and types.
    pub fn encode(&self, record: &Record) -> SerializerResult<Vec<u8>> {
        let mut writer = BinaryWriter::new();
        for spec in self.fields {
            let value = record.get(spec.name).ok_or_else(|| {
                SerializerError::InvalidValue(format!("{}: missing field `{}`", self.name, spec.name))
            })?;
            if value.wire_type() != spec.wire {
                return Err(SerializerError::InvalidValue(format!(
                    "{}: field `{}` expects {:?}, got {:?}",
                    self.name,
                    spec.name,
                    spec.wire,
                    value.wire_type()
                )));
            }
            match value {
                FieldValue::PublicKey(key) => key.pack(&mut writer),
                FieldValue::Uint32(v) => writer.write_u32(*v),
                FieldValue::Uint64(v) => writer.write_u64(*v),
                FieldValue::Bytes(v) => writer.write_bytes(v),
            }
        }
        Ok(writer.into_bytes())
    }
}
