// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Contract ABI model and ABI-driven binary codec.
//!
//! Action data travels as raw bytes; the ABI describes how to read it. The
//! codec converts between the binary form and `serde_json::Value` using the
//! same JSON conventions as nodeos:
//!
//! - 64-bit integers are strings, smaller integers are numbers
//! - `bytes` and checksums are lowercase hex
//! - variants are `["type_name", value]`
//! - `T[]` arrays, `T?` optionals and `T$` binary extensions are supported

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use super::asset::{Asset, Symbol, SymbolCode};
use super::keys::{PublicKey, Signature};
use super::name::Name;
use super::serializer::{BinaryReader, BinaryWriter, Pack, SerializerError, Unpack};
use super::types::{Checksum256, TimePointSec};

/// Nesting guard against self-referencing typedefs and structs.
const MAX_DEPTH: usize = 64;

/// Milliseconds between the Unix epoch and the block timestamp epoch (2000-01-01).
const BLOCK_TIMESTAMP_EPOCH_MS: i64 = 946_684_800_000;
const BLOCK_INTERVAL_MS: i64 = 500;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AbiError {
    #[error("Unknown type `{0}`")]
    UnknownType(String),

    #[error("ABI has no action `{0}`")]
    UnknownAction(Name),

    #[error("Type nesting too deep at `{0}`")]
    TooDeep(String),

    #[error("Invalid value for `{type_name}`: {reason}")]
    InvalidValue { type_name: String, reason: String },

    #[error("Missing field `{field}` in struct `{struct_name}`")]
    MissingField { struct_name: String, field: String },

    #[error(transparent)]
    Serializer(#[from] SerializerError),
}

pub type AbiResult<T> = Result<T, AbiError>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiTypeDef {
    pub new_type_name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiField {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiStruct {
    pub name: String,
    #[serde(default)]
    pub base: String,
    #[serde(default)]
    pub fields: Vec<AbiField>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiAction {
    pub name: Name,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub ricardian_contract: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiVariant {
    pub name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

/// Contract ABI as returned by `get_abi`. Unused sections are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiDef {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub types: Vec<AbiTypeDef>,
    #[serde(default)]
    pub structs: Vec<AbiStruct>,
    #[serde(default)]
    pub actions: Vec<AbiAction>,
    #[serde(default)]
    pub variants: Vec<AbiVariant>,
}

/// Rewrites `name` values while decoding.
pub type NameMapper<'a> = &'a dyn Fn(Name) -> Name;

fn identity_mapper(name: Name) -> Name {
    name
}

impl AbiDef {
    /// Struct type used by `action`.
    pub fn action_type(&self, action: Name) -> AbiResult<&str> {
        self.actions
            .iter()
            .find(|a| a.name == action)
            .map(|a| a.type_name.as_str())
            .ok_or(AbiError::UnknownAction(action))
    }

    pub fn decode(&self, type_name: &str, data: &[u8]) -> AbiResult<Value> {
        self.decode_with(type_name, data, &identity_mapper)
    }

    /// Decode `data`, passing every `name`-typed value through `map_name`.
    pub fn decode_with(
        &self,
        type_name: &str,
        data: &[u8],
        map_name: NameMapper<'_>,
    ) -> AbiResult<Value> {
        let mut reader = BinaryReader::new(data);
        let value = self.read_value(type_name, &mut reader, map_name, 0)?;
        reader.finish()?;
        Ok(value)
    }

    pub fn encode(&self, type_name: &str, value: &Value) -> AbiResult<Vec<u8>> {
        let mut writer = BinaryWriter::new();
        self.write_value(type_name, value, &mut writer, 0)?;
        Ok(writer.into_bytes())
    }

    fn resolve_alias<'a>(&'a self, type_name: &'a str) -> AbiResult<&'a str> {
        let mut current = type_name;
        for _ in 0..MAX_DEPTH {
            match self.types.iter().find(|t| t.new_type_name == current) {
                Some(def) => current = def.type_name.as_str(),
                None => return Ok(current),
            }
        }
        Err(AbiError::TooDeep(type_name.to_string()))
    }

    fn find_struct(&self, name: &str) -> Option<&AbiStruct> {
        self.structs.iter().find(|s| s.name == name)
    }

    fn find_variant(&self, name: &str) -> Option<&AbiVariant> {
        self.variants.iter().find(|v| v.name == name)
    }

    fn read_value(
        &self,
        type_name: &str,
        reader: &mut BinaryReader<'_>,
        map_name: NameMapper<'_>,
        depth: usize,
    ) -> AbiResult<Value> {
        if depth > MAX_DEPTH {
            return Err(AbiError::TooDeep(type_name.to_string()));
        }

        if let Some(inner) = type_name.strip_suffix('$') {
            return self.read_value(inner, reader, map_name, depth + 1);
        }
        if let Some(inner) = type_name.strip_suffix("[]") {
            let len = reader.read_varuint32()? as usize;
            let mut items = Vec::with_capacity(len.min(reader.remaining()));
            for _ in 0..len {
                let start = reader.position();
                items.push(self.read_value(inner, reader, map_name, depth + 1)?);
                // Each element must consume input, so `len` is bounded by the data
                if reader.position() == start {
                    return Err(AbiError::InvalidValue {
                        type_name: type_name.to_string(),
                        reason: "array element consumes no input".to_string(),
                    });
                }
            }
            return Ok(Value::Array(items));
        }
        if let Some(inner) = type_name.strip_suffix('?') {
            return if reader.read_bool()? {
                self.read_value(inner, reader, map_name, depth + 1)
            } else {
                Ok(Value::Null)
            };
        }

        let resolved = self.resolve_alias(type_name)?;
        if let Some(value) = read_builtin(resolved, reader, map_name)? {
            return Ok(value);
        }

        if let Some(def) = self.find_struct(resolved) {
            let mut object = Map::new();
            self.read_struct_fields(def, reader, map_name, &mut object, depth + 1)?;
            return Ok(Value::Object(object));
        }

        if let Some(def) = self.find_variant(resolved) {
            let index = reader.read_varuint32()? as usize;
            let case = def.types.get(index).ok_or_else(|| AbiError::InvalidValue {
                type_name: resolved.to_string(),
                reason: format!("variant index {index} out of range"),
            })?;
            let inner = self.read_value(case, reader, map_name, depth + 1)?;
            return Ok(Value::Array(vec![Value::String(case.clone()), inner]));
        }

        Err(AbiError::UnknownType(resolved.to_string()))
    }

    fn read_struct_fields(
        &self,
        def: &AbiStruct,
        reader: &mut BinaryReader<'_>,
        map_name: NameMapper<'_>,
        object: &mut Map<String, Value>,
        depth: usize,
    ) -> AbiResult<()> {
        if depth > MAX_DEPTH {
            return Err(AbiError::TooDeep(def.name.clone()));
        }
        if !def.base.is_empty() {
            let base_name = self.resolve_alias(&def.base)?;
            let base = self
                .find_struct(base_name)
                .ok_or_else(|| AbiError::UnknownType(def.base.clone()))?;
            self.read_struct_fields(base, reader, map_name, object, depth + 1)?;
        }
        for field in &def.fields {
            // Binary extensions may be absent at the end of the input
            if field.type_name.ends_with('$') && reader.is_empty() {
                break;
            }
            let value = self.read_value(&field.type_name, reader, map_name, depth + 1)?;
            object.insert(field.name.clone(), value);
        }
        Ok(())
    }

    fn write_value(
        &self,
        type_name: &str,
        value: &Value,
        writer: &mut BinaryWriter,
        depth: usize,
    ) -> AbiResult<()> {
        if depth > MAX_DEPTH {
            return Err(AbiError::TooDeep(type_name.to_string()));
        }

        if let Some(inner) = type_name.strip_suffix('$') {
            return self.write_value(inner, value, writer, depth + 1);
        }
        if let Some(inner) = type_name.strip_suffix("[]") {
            let items = value.as_array().ok_or_else(|| invalid(type_name, "expected array"))?;
            writer.write_varuint32(items.len() as u32);
            for item in items {
                self.write_value(inner, item, writer, depth + 1)?;
            }
            return Ok(());
        }
        if let Some(inner) = type_name.strip_suffix('?') {
            if value.is_null() {
                writer.write_u8(0);
                return Ok(());
            }
            writer.write_u8(1);
            return self.write_value(inner, value, writer, depth + 1);
        }

        let resolved = self.resolve_alias(type_name)?;
        if write_builtin(resolved, value, writer)? {
            return Ok(());
        }

        if let Some(def) = self.find_struct(resolved) {
            let object = value
                .as_object()
                .ok_or_else(|| invalid(resolved, "expected object"))?;
            return self.write_struct_fields(def, object, writer, depth + 1);
        }

        if let Some(def) = self.find_variant(resolved) {
            let pair = value
                .as_array()
                .filter(|pair| pair.len() == 2)
                .ok_or_else(|| invalid(resolved, "expected [type, value] pair"))?;
            let case = pair[0]
                .as_str()
                .ok_or_else(|| invalid(resolved, "variant type must be a string"))?;
            let index = def
                .types
                .iter()
                .position(|t| t == case)
                .ok_or_else(|| invalid(resolved, &format!("`{case}` is not a case")))?;
            writer.write_varuint32(index as u32);
            return self.write_value(case, &pair[1], writer, depth + 1);
        }

        Err(AbiError::UnknownType(resolved.to_string()))
    }

    fn write_struct_fields(
        &self,
        def: &AbiStruct,
        object: &Map<String, Value>,
        writer: &mut BinaryWriter,
        depth: usize,
    ) -> AbiResult<()> {
        if depth > MAX_DEPTH {
            return Err(AbiError::TooDeep(def.name.clone()));
        }
        if !def.base.is_empty() {
            let base_name = self.resolve_alias(&def.base)?;
            let base = self
                .find_struct(base_name)
                .ok_or_else(|| AbiError::UnknownType(def.base.clone()))?;
            self.write_struct_fields(base, object, writer, depth + 1)?;
        }
        for field in &def.fields {
            match object.get(&field.name) {
                Some(value) => self.write_value(&field.type_name, value, writer, depth + 1)?,
                None if field.type_name.ends_with('$') => break,
                None => {
                    return Err(AbiError::MissingField {
                        struct_name: def.name.clone(),
                        field: field.name.clone(),
                    })
                }
            }
        }
        Ok(())
    }
}

fn invalid(type_name: &str, reason: &str) -> AbiError {
    AbiError::InvalidValue {
        type_name: type_name.to_string(),
        reason: reason.to_string(),
    }
}

fn number(value: impl Into<Number>) -> Value {
    Value::Number(value.into())
}

fn format_time_point(micros: i64) -> String {
    let millis = micros.div_euclid(1000);
    match chrono::DateTime::from_timestamp_millis(millis) {
        Some(dt) => dt.format("%Y-%m-%dT%H:%M:%S%.3f").to_string(),
        None => micros.to_string(),
    }
}

fn parse_time_point(type_name: &str, s: &str) -> AbiResult<i64> {
    let trimmed = s.trim_end_matches('Z');
    let parsed = chrono::NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| invalid(type_name, &e.to_string()))?;
    Ok(parsed.and_utc().timestamp_micros())
}

/// Read a builtin type, or `None` when `type_name` is not builtin.
fn read_builtin(
    type_name: &str,
    reader: &mut BinaryReader<'_>,
    map_name: NameMapper<'_>,
) -> AbiResult<Option<Value>> {
    let value = match type_name {
        "bool" => Value::Bool(reader.read_bool()?),
        "int8" => number(reader.read_i8()?),
        "uint8" => number(reader.read_u8()?),
        "int16" => number(reader.read_i16()?),
        "uint16" => number(reader.read_u16()?),
        "int32" => number(reader.read_i32()?),
        "uint32" => number(reader.read_u32()?),
        "varint32" => number(reader.read_varint32()?),
        "varuint32" => number(reader.read_varuint32()?),
        "int64" => Value::String(reader.read_i64()?.to_string()),
        "uint64" => Value::String(reader.read_u64()?.to_string()),
        "float32" => float(type_name, f64::from(reader.read_f32()?))?,
        "float64" => float(type_name, reader.read_f64()?)?,
        "name" => Value::String(map_name(Name::unpack(reader)?).to_string()),
        "string" => Value::String(reader.read_string()?),
        "bytes" => Value::String(hex::encode(reader.read_bytes()?)),
        "checksum160" => Value::String(hex::encode(reader.read_raw(20)?)),
        "checksum256" => Value::String(hex::encode(reader.read_raw(32)?)),
        "checksum512" => Value::String(hex::encode(reader.read_raw(64)?)),
        "time_point_sec" => Value::String(TimePointSec::unpack(reader)?.to_string()),
        "time_point" => Value::String(format_time_point(reader.read_i64()?)),
        "block_timestamp_type" => {
            let slot = i64::from(reader.read_u32()?);
            let millis = slot * BLOCK_INTERVAL_MS + BLOCK_TIMESTAMP_EPOCH_MS;
            Value::String(format_time_point(millis * 1000))
        }
        "symbol_code" => Value::String(SymbolCode::from_raw(reader.read_u64()?).to_string()),
        "symbol" => Value::String(Symbol::unpack(reader)?.to_string()),
        "asset" => Value::String(Asset::unpack(reader)?.to_string()),
        "extended_asset" => {
            let quantity = Asset::unpack(reader)?;
            let contract = map_name(Name::unpack(reader)?);
            let mut object = Map::new();
            object.insert("quantity".to_string(), Value::String(quantity.to_string()));
            object.insert("contract".to_string(), Value::String(contract.to_string()));
            Value::Object(object)
        }
        "public_key" => Value::String(PublicKey::unpack(reader)?.to_string()),
        "signature" => Value::String(Signature::unpack(reader)?.to_string()),
        _ => return Ok(None),
    };
    Ok(Some(value))
}

fn float(type_name: &str, value: f64) -> AbiResult<Value> {
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| invalid(type_name, "non-finite float"))
}

fn as_str<'a>(type_name: &str, value: &'a Value) -> AbiResult<&'a str> {
    value.as_str().ok_or_else(|| invalid(type_name, "expected string"))
}

fn as_i64(type_name: &str, value: &Value) -> AbiResult<i64> {
    match value {
        Value::Number(n) => n.as_i64().ok_or_else(|| invalid(type_name, "expected integer")),
        Value::String(s) => s.parse().map_err(|_| invalid(type_name, "expected integer")),
        _ => Err(invalid(type_name, "expected integer")),
    }
}

fn as_u64(type_name: &str, value: &Value) -> AbiResult<u64> {
    match value {
        Value::Number(n) => n.as_u64().ok_or_else(|| invalid(type_name, "expected unsigned integer")),
        Value::String(s) => s.parse().map_err(|_| invalid(type_name, "expected unsigned integer")),
        _ => Err(invalid(type_name, "expected unsigned integer")),
    }
}

fn ranged<T: TryFrom<i64>>(type_name: &str, value: &Value) -> AbiResult<T> {
    T::try_from(as_i64(type_name, value)?).map_err(|_| invalid(type_name, "out of range"))
}

fn as_f64(type_name: &str, value: &Value) -> AbiResult<f64> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| invalid(type_name, "expected float")),
        Value::String(s) => s.parse().map_err(|_| invalid(type_name, "expected float")),
        _ => Err(invalid(type_name, "expected float")),
    }
}

fn write_fixed_hex(type_name: &str, value: &Value, len: usize, writer: &mut BinaryWriter) -> AbiResult<()> {
    let bytes = hex::decode(as_str(type_name, value)?).map_err(|e| invalid(type_name, &e.to_string()))?;
    if bytes.len() != len {
        return Err(invalid(type_name, &format!("expected {len} bytes, got {}", bytes.len())));
    }
    writer.write_raw(&bytes);
    Ok(())
}

fn parse_with<T, E: std::fmt::Display>(
    type_name: &str,
    value: &Value,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> AbiResult<T> {
    parse(as_str(type_name, value)?).map_err(|e| invalid(type_name, &e.to_string()))
}

/// Write a builtin type; returns `false` when `type_name` is not builtin.
fn write_builtin(type_name: &str, value: &Value, writer: &mut BinaryWriter) -> AbiResult<bool> {
    match type_name {
        "bool" => writer.write_bool(value.as_bool().ok_or_else(|| invalid(type_name, "expected bool"))?),
        "int8" => writer.write_i8(ranged(type_name, value)?),
        "uint8" => writer.write_u8(ranged(type_name, value)?),
        "int16" => writer.write_i16(ranged(type_name, value)?),
        "uint16" => writer.write_u16(ranged(type_name, value)?),
        "int32" => writer.write_i32(ranged(type_name, value)?),
        "uint32" => writer.write_u32(ranged(type_name, value)?),
        "varint32" => writer.write_varint32(ranged(type_name, value)?),
        "varuint32" => writer.write_varuint32(ranged(type_name, value)?),
        "int64" => writer.write_i64(as_i64(type_name, value)?),
        "uint64" => writer.write_u64(as_u64(type_name, value)?),
        "float32" => writer.write_f32(as_f64(type_name, value)? as f32),
        "float64" => writer.write_f64(as_f64(type_name, value)?),
        "name" => parse_with(type_name, value, Name::new)?.pack(writer),
        "string" => writer.write_string(as_str(type_name, value)?),
        "bytes" => {
            let bytes = hex::decode(as_str(type_name, value)?)
                .map_err(|e| invalid(type_name, &e.to_string()))?;
            writer.write_bytes(&bytes);
        }
        "checksum160" => write_fixed_hex(type_name, value, 20, writer)?,
        "checksum256" => write_fixed_hex(type_name, value, 32, writer)?,
        "checksum512" => write_fixed_hex(type_name, value, 64, writer)?,
        "time_point_sec" => parse_with(type_name, value, TimePointSec::parse)?.pack(writer),
        "time_point" => writer.write_i64(parse_time_point(type_name, as_str(type_name, value)?)?),
        "block_timestamp_type" => {
            let millis = parse_time_point(type_name, as_str(type_name, value)?)? / 1000;
            let slot = (millis - BLOCK_TIMESTAMP_EPOCH_MS) / BLOCK_INTERVAL_MS;
            writer.write_u32(u32::try_from(slot).map_err(|_| invalid(type_name, "out of range"))?);
        }
        "symbol_code" => writer.write_u64(parse_with(type_name, value, str::parse::<SymbolCode>)?.raw()),
        "symbol" => parse_with(type_name, value, str::parse::<Symbol>)?.pack(writer),
        "asset" => parse_with(type_name, value, str::parse::<Asset>)?.pack(writer),
        "extended_asset" => {
            let object = value
                .as_object()
                .ok_or_else(|| invalid(type_name, "expected object"))?;
            let quantity = object
                .get("quantity")
                .ok_or_else(|| invalid(type_name, "missing quantity"))?;
            let contract = object
                .get("contract")
                .ok_or_else(|| invalid(type_name, "missing contract"))?;
            parse_with(type_name, quantity, str::parse::<Asset>)?.pack(writer);
            parse_with(type_name, contract, Name::new)?.pack(writer);
        }
        "public_key" => parse_with(type_name, value, str::parse::<PublicKey>)?.pack(writer),
        "signature" => parse_with(type_name, value, str::parse::<Signature>)?.pack(writer),
        _ => return Ok(false),
    }
    Ok(true)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    /// Trimmed `eosio.token` ABI.
    pub(crate) fn token_abi() -> AbiDef {
        serde_json::from_value(json!({
            "version": "eosio::abi/1.1",
            "types": [{ "new_type_name": "account_name", "type": "name" }],
            "structs": [
                {
                    "name": "transfer",
                    "base": "",
                    "fields": [
                        { "name": "from", "type": "account_name" },
                        { "name": "to", "type": "name" },
                        { "name": "quantity", "type": "asset" },
                        { "name": "memo", "type": "string" }
                    ]
                },
                {
                    "name": "account",
                    "base": "",
                    "fields": [{ "name": "balance", "type": "asset" }]
                }
            ],
            "actions": [{ "name": "transfer", "type": "transfer", "ricardian_contract": "" }],
            "tables": [{ "name": "accounts", "type": "account" }]
        }))
        .unwrap()
    }

    #[test]
    fn transfer_round_trip() {
        let abi = token_abi();
        let value = json!({
            "from": "alice",
            "to": "bob",
            "quantity": "1.0000 EOS",
            "memo": "hello"
        });
        let encoded = abi.encode("transfer", &value).unwrap();
        assert_eq!(encoded.len(), 8 + 8 + 16 + 6);
        assert_eq!(abi.decode("transfer", &encoded).unwrap(), value);
    }

    #[test]
    fn decode_with_maps_only_name_fields() {
        let abi = token_abi();
        let value = json!({
            "from": "............1",
            "to": "bob",
            "quantity": "1.0000 EOS",
            "memo": "............1"
        });
        let encoded = abi.encode("transfer", &value).unwrap();
        let alice = Name::new("alice").unwrap();
        let mapper = |name: Name| if name == Name::PLACEHOLDER_ACTOR { alice } else { name };
        let decoded = abi.decode_with("transfer", &encoded, &mapper).unwrap();
        assert_eq!(decoded["from"], "alice");
        assert_eq!(decoded["memo"], "............1");
    }

    #[test]
    fn action_type_lookup() {
        let abi = token_abi();
        assert_eq!(abi.action_type(Name::new("transfer").unwrap()).unwrap(), "transfer");
        assert!(matches!(
            abi.action_type(Name::new("issue").unwrap()),
            Err(AbiError::UnknownAction(_))
        ));
    }

    #[test]
    fn arrays_optionals_and_variants() {
        let abi: AbiDef = serde_json::from_value(json!({
            "structs": [
                { "name": "base", "base": "", "fields": [{ "name": "id", "type": "uint64" }] },
                {
                    "name": "thing",
                    "base": "base",
                    "fields": [
                        { "name": "tags", "type": "string[]" },
                        { "name": "note", "type": "string?" },
                        { "name": "choice", "type": "either" },
                        { "name": "extra", "type": "uint8$" }
                    ]
                }
            ],
            "variants": [{ "name": "either", "types": ["uint8", "string"] }]
        }))
        .unwrap();

        let value = json!({
            "id": "18446744073709551615",
            "tags": ["a", "b"],
            "note": null,
            "choice": ["string", "picked"],
            "extra": 9
        });
        let encoded = abi.encode("thing", &value).unwrap();
        assert_eq!(abi.decode("thing", &encoded).unwrap(), value);

        // Trailing binary extension may be omitted entirely
        let mut short = value.clone();
        short.as_object_mut().unwrap().remove("extra");
        let encoded = abi.encode("thing", &short).unwrap();
        assert_eq!(abi.decode("thing", &encoded).unwrap(), short);
    }

    #[test]
    fn missing_field_is_reported() {
        let abi = token_abi();
        let err = abi.encode("transfer", &json!({ "from": "alice" })).unwrap_err();
        assert!(matches!(err, AbiError::MissingField { .. }));
    }

    #[test]
    fn unknown_type_is_reported() {
        let abi = token_abi();
        assert!(matches!(
            abi.decode("nonexistent", &[]),
            Err(AbiError::UnknownType(_))
        ));
    }

    #[test]
    fn time_types_round_trip() {
        let abi = AbiDef::default();
        for (ty, text) in [
            ("time_point_sec", "2020-01-01T00:00:00"),
            ("time_point", "2020-01-01T00:00:00.500"),
            ("block_timestamp_type", "2020-01-01T00:00:00.500"),
        ] {
            let encoded = abi.encode(ty, &json!(text)).unwrap();
            assert_eq!(abi.decode(ty, &encoded).unwrap(), json!(text), "{ty}");
        }
    }

    #[test]
    fn array_of_empty_structs_is_rejected() {
        let abi: AbiDef = serde_json::from_value(json!({
            "structs": [{ "name": "empty", "base": "", "fields": [] }]
        }))
        .unwrap();
        // varuint32 length 0xffffffff, no element bytes
        let data = [0xff, 0xff, 0xff, 0xff, 0x0f];
        assert!(matches!(
            abi.decode("empty[]", &data),
            Err(AbiError::InvalidValue { .. })
        ));
        assert_eq!(abi.decode("empty[]", &[0]).unwrap(), json!([]));
    }

    #[test]
    fn self_referencing_typedef_is_bounded() {
        let abi: AbiDef = serde_json::from_value(json!({
            "types": [{ "new_type_name": "loop", "type": "loop" }]
        }))
        .unwrap();
        assert!(matches!(abi.decode("loop", &[]), Err(AbiError::TooDeep(_))));
    }
}
