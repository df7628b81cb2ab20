// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EOSIO binary serialization.
//!
//! All integers are little-endian. Collection lengths are `varuint32`
//! prefixed, optionals carry a single presence byte.

use crate::codec::{utf8_decode, utf8_encode, CodecError};

/// Errors raised while reading or writing the binary format.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SerializerError {
    #[error("Unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("varuint32 does not fit in 32 bits")]
    VarintOverflow,

    #[error("Invalid UTF-8 string: {0}")]
    InvalidUtf8(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),
}

pub type SerializerResult<T> = Result<T, SerializerError>;

/// Types with a fixed EOSIO binary encoding.
pub trait Pack {
    fn pack(&self, writer: &mut BinaryWriter);

    /// Serialize into a fresh buffer.
    fn pack_to_vec(&self) -> Vec<u8> {
        let mut writer = BinaryWriter::new();
        self.pack(&mut writer);
        writer.into_bytes()
    }
}

/// Types that can be read back from the EOSIO binary encoding.
pub trait Unpack: Sized {
    fn unpack(reader: &mut BinaryReader<'_>) -> SerializerResult<Self>;

    /// Deserialize from a complete buffer, rejecting trailing bytes.
    fn unpack_exact(data: &[u8]) -> SerializerResult<Self> {
        let mut reader = BinaryReader::new(data);
        let value = Self::unpack(&mut reader)?;
        reader.finish()?;
        Ok(value)
    }
}

/// Append-only binary buffer.
#[derive(Debug, Default, Clone)]
pub struct BinaryWriter {
    buf: Vec<u8>,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_raw(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(u8::from(value));
    }

    pub fn write_u16(&mut self, value: u16) {
        self.write_raw(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.write_raw(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.write_raw(&value.to_le_bytes());
    }

    pub fn write_i8(&mut self, value: i8) {
        self.write_raw(&value.to_le_bytes());
    }

    pub fn write_i16(&mut self, value: i16) {
        self.write_raw(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.write_raw(&value.to_le_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.write_raw(&value.to_le_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.write_raw(&value.to_le_bytes());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.write_raw(&value.to_le_bytes());
    }

    /// LEB128 encoding of an unsigned 32-bit integer.
    pub fn write_varuint32(&mut self, mut value: u32) {
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                self.write_u8(byte);
                return;
            }
            self.write_u8(byte | 0x80);
        }
    }

    /// Zigzag encoded signed 32-bit integer.
    pub fn write_varint32(&mut self, value: i32) {
        self.write_varuint32(((value << 1) ^ (value >> 31)) as u32);
    }

    /// Length-prefixed byte string.
    pub fn write_bytes(&mut self, data: &[u8]) {
        self.write_varuint32(data.len() as u32);
        self.write_raw(data);
    }

    pub fn write_string(&mut self, value: &str) {
        self.write_bytes(&utf8_encode(value));
    }
}

/// Cursor over a borrowed binary buffer.
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BinaryReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Fail if any input is left unread.
    pub fn finish(&self) -> SerializerResult<()> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(SerializerError::TrailingBytes(n)),
        }
    }

    pub fn read_raw(&mut self, len: usize) -> SerializerResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(SerializerError::UnexpectedEof {
                needed: len,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_array<const N: usize>(&mut self) -> SerializerResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_raw(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> SerializerResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_bool(&mut self) -> SerializerResult<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(SerializerError::InvalidValue(format!(
                "bool must be 0 or 1, got {other}"
            ))),
        }
    }

    pub fn read_u16(&mut self) -> SerializerResult<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> SerializerResult<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> SerializerResult<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_i8(&mut self) -> SerializerResult<i8> {
        Ok(i8::from_le_bytes(self.read_array()?))
    }

    pub fn read_i16(&mut self) -> SerializerResult<i16> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> SerializerResult<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> SerializerResult<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> SerializerResult<f32> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    pub fn read_f64(&mut self) -> SerializerResult<f64> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    pub fn read_varuint32(&mut self) -> SerializerResult<u32> {
        let mut value: u64 = 0;
        let mut shift = 0;
        loop {
            let byte = self.read_u8()?;
            value |= u64::from(byte & 0x7f) << shift;
            if value > u64::from(u32::MAX) {
                return Err(SerializerError::VarintOverflow);
            }
            if byte & 0x80 == 0 {
                return Ok(value as u32);
            }
            shift += 7;
            if shift >= 35 {
                return Err(SerializerError::VarintOverflow);
            }
        }
    }

    pub fn read_varint32(&mut self) -> SerializerResult<i32> {
        let raw = self.read_varuint32()?;
        Ok(((raw >> 1) as i32) ^ -((raw & 1) as i32))
    }

    /// Length-prefixed byte string.
    pub fn read_bytes(&mut self) -> SerializerResult<Vec<u8>> {
        let len = self.read_varuint32()? as usize;
        Ok(self.read_raw(len)?.to_vec())
    }

    pub fn read_string(&mut self) -> SerializerResult<String> {
        let bytes = self.read_bytes()?;
        utf8_decode(&bytes).map_err(|e| match e {
            CodecError::Utf8(reason) => SerializerError::InvalidUtf8(reason),
            other => SerializerError::InvalidUtf8(other.to_string()),
        })
    }
}

impl Pack for u8 {
    fn pack(&self, writer: &mut BinaryWriter) {
        writer.write_u8(*self);
    }
}

impl Unpack for u8 {
    fn unpack(reader: &mut BinaryReader<'_>) -> SerializerResult<Self> {
        reader.read_u8()
    }
}

impl Pack for u16 {
    fn pack(&self, writer: &mut BinaryWriter) {
        writer.write_u16(*self);
    }
}

impl Unpack for u16 {
    fn unpack(reader: &mut BinaryReader<'_>) -> SerializerResult<Self> {
        reader.read_u16()
    }
}

impl Pack for String {
    fn pack(&self, writer: &mut BinaryWriter) {
        writer.write_string(self);
    }
}

impl Unpack for String {
    fn unpack(reader: &mut BinaryReader<'_>) -> SerializerResult<Self> {
        reader.read_string()
    }
}

impl<T: Pack> Pack for Vec<T> {
    fn pack(&self, writer: &mut BinaryWriter) {
        writer.write_varuint32(self.len() as u32);
        for item in self {
            item.pack(writer);
        }
    }
}

impl<T: Unpack> Unpack for Vec<T> {
    fn unpack(reader: &mut BinaryReader<'_>) -> SerializerResult<Self> {
        let len = reader.read_varuint32()? as usize;
        // Every element takes at least one byte
        if len > reader.remaining() {
            return Err(SerializerError::UnexpectedEof {
                needed: len,
                remaining: reader.remaining(),
            });
        }
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(T::unpack(reader)?);
        }
        Ok(items)
    }
}

impl<T: Pack> Pack for Option<T> {
    fn pack(&self, writer: &mut BinaryWriter) {
        match self {
            Some(value) => {
                writer.write_u8(1);
                value.pack(writer);
            }
            None => writer.write_u8(0),
        }
    }
}

impl<T: Unpack> Unpack for Option<T> {
    fn unpack(reader: &mut BinaryReader<'_>) -> SerializerResult<Self> {
        if reader.read_bool()? {
            Ok(Some(T::unpack(reader)?))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varuint32_boundaries() {
        for (value, expected) in [
            (0u32, vec![0x00]),
            (127, vec![0x7f]),
            (128, vec![0x80, 0x01]),
            (300, vec![0xac, 0x02]),
            (u32::MAX, vec![0xff, 0xff, 0xff, 0xff, 0x0f]),
        ] {
            let mut writer = BinaryWriter::new();
            writer.write_varuint32(value);
            assert_eq!(writer.as_bytes(), expected.as_slice(), "encoding {value}");

            let mut reader = BinaryReader::new(&expected);
            assert_eq!(reader.read_varuint32().unwrap(), value);
            assert!(reader.is_empty());
        }
    }

    #[test]
    fn varuint32_rejects_overflow() {
        let mut reader = BinaryReader::new(&[0xff, 0xff, 0xff, 0xff, 0x1f]);
        assert_eq!(reader.read_varuint32(), Err(SerializerError::VarintOverflow));
    }

    #[test]
    fn varint32_zigzag() {
        for value in [0, -1, 1, -64, 64, i32::MIN, i32::MAX] {
            let mut writer = BinaryWriter::new();
            writer.write_varint32(value);
            let bytes = writer.into_bytes();
            assert_eq!(BinaryReader::new(&bytes).read_varint32().unwrap(), value);
        }
    }

    #[test]
    fn strings_are_length_prefixed() {
        let mut writer = BinaryWriter::new();
        writer.write_string("esr");
        assert_eq!(writer.as_bytes(), &[3, b'e', b's', b'r']);
        assert_eq!(BinaryReader::new(writer.as_bytes()).read_string().unwrap(), "esr");
    }

    #[test]
    fn invalid_utf8_string_is_rejected() {
        let mut reader = BinaryReader::new(&[2, 0xc3, 0x28]);
        assert!(matches!(reader.read_string(), Err(SerializerError::InvalidUtf8(_))));
    }

    #[test]
    fn truncated_input_reports_eof() {
        let mut reader = BinaryReader::new(&[1, 2]);
        assert_eq!(
            reader.read_u32(),
            Err(SerializerError::UnexpectedEof {
                needed: 4,
                remaining: 2
            })
        );
    }

    #[test]
    fn unpack_exact_rejects_trailing_bytes() {
        assert_eq!(u8::unpack_exact(&[7, 8]), Err(SerializerError::TrailingBytes(1)));
        assert_eq!(u8::unpack_exact(&[7]), Ok(7));
    }

    #[test]
    fn vec_length_larger_than_input_fails_fast() {
        let mut reader = BinaryReader::new(&[0xff, 0x01]);
        assert!(Vec::<u8>::unpack(&mut reader).is_err());
    }
}
