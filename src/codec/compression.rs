// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::io::{Read, Write};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;

use super::CodecError;

/// Upper bound on inflated request bodies.
const MAX_INFLATED_LEN: u64 = 4 * 1024 * 1024;

/// Byte-level compression used for request bodies.
pub trait Compression: Send + Sync {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;
}

/// Raw deflate (RFC 1951, no zlib or gzip framing).
#[derive(Debug, Clone, Copy)]
pub struct DeflateRaw {
    level: flate2::Compression,
}

impl Default for DeflateRaw {
    fn default() -> Self {
        Self {
            level: flate2::Compression::best(),
        }
    }
}

impl Compression for DeflateRaw {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut encoder = DeflateEncoder::new(Vec::new(), self.level);
        encoder
            .write_all(data)
            .map_err(|e| CodecError::Compress(e.to_string()))?;
        encoder
            .finish()
            .map_err(|e| CodecError::Compress(e.to_string()))
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        DeflateDecoder::new(data)
            .take(MAX_INFLATED_LEN + 1)
            .read_to_end(&mut out)
            .map_err(|e| CodecError::Decompress(e.to_string()))?;
        if out.len() as u64 > MAX_INFLATED_LEN {
            return Err(CodecError::Decompress("inflated body too large".into()));
        }
        Ok(out)
    }
}
