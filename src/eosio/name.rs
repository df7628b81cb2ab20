// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account and action names.
//!
//! A name is up to 13 characters from `.12345a-z` packed into a `u64`: the
//! first twelve characters take five bits each, the thirteenth takes the
//! low four bits.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::serializer::{BinaryReader, BinaryWriter, Pack, SerializerResult, Unpack};

const CHARMAP: &[u8; 32] = b".12345abcdefghijklmnopqrstuvwxyz";
const MAX_NAME_LEN: usize = 13;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("Name `{0}` is longer than 13 characters")]
    TooLong(String),

    #[error("Name `{name}` contains invalid character `{ch}`")]
    InvalidCharacter { name: String, ch: char },

    #[error("Name `{0}` has an invalid 13th character")]
    InvalidLastCharacter(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(u64);

impl Name {
    /// `............1`, resolved to the signing account.
    pub const PLACEHOLDER_ACTOR: Name = Name(1);
    /// `............2`, resolved to the signing permission.
    pub const PLACEHOLDER_PERMISSION: Name = Name(2);

    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn new(name: &str) -> Result<Self, NameError> {
        if name.len() > MAX_NAME_LEN {
            return Err(NameError::TooLong(name.to_string()));
        }

        let mut value = 0u64;
        for (i, ch) in name.chars().enumerate() {
            let symbol = char_to_symbol(ch).ok_or_else(|| NameError::InvalidCharacter {
                name: name.to_string(),
                ch,
            })?;
            if i < 12 {
                value |= (symbol & 0x1f) << (64 - 5 * (i + 1));
            } else {
                if symbol > 0x0f {
                    return Err(NameError::InvalidLastCharacter(name.to_string()));
                }
                value |= symbol;
            }
        }
        Ok(Self(value))
    }
}

fn char_to_symbol(ch: char) -> Option<u64> {
    match ch {
        'a'..='z' => Some(ch as u64 - 'a' as u64 + 6),
        '1'..='5' => Some(ch as u64 - '1' as u64 + 1),
        '.' => Some(0),
        _ => None,
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut chars = [b'.'; MAX_NAME_LEN];
        let mut tmp = self.0;
        for i in 0..MAX_NAME_LEN {
            let (mask, shift) = if i == 0 { (0x0f, 4) } else { (0x1f, 5) };
            chars[12 - i] = CHARMAP[(tmp & mask) as usize];
            tmp >>= shift;
        }
        let end = chars
            .iter()
            .rposition(|&c| c != b'.')
            .map_or(0, |idx| idx + 1);
        // CHARMAP is ASCII
        f.write_str(std::str::from_utf8(&chars[..end]).unwrap_or_default())
    }
}

impl FromStr for Name {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Name::new(&s).map_err(serde::de::Error::custom)
    }
}

impl Pack for Name {
    fn pack(&self, writer: &mut BinaryWriter) {
        writer.write_u64(self.0);
    }
}

impl Unpack for Name {
    fn unpack(reader: &mut BinaryReader<'_>) -> SerializerResult<Self> {
        Ok(Self(reader.read_u64()?))
    }
}
