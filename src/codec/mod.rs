// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Byte and text codecs used by the signing-request encoder.
//!
//! [`CodecAdapter`] bundles a pluggable [`Compression`] with the UTF-8 and
//! base64url text codecs. The default adapter uses raw deflate, which is
//! what every signing-request producer emits.

mod compression;
mod text;

use std::sync::Arc;

pub use compression::{Compression, DeflateRaw};
pub use text::{base64url_decode, base64url_encode, utf8_decode, utf8_encode};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("Compression failed: {0}")]
    Compress(String),

    #[error("Decompression failed: {0}")]
    Decompress(String),

    #[error("Invalid base64url: {0}")]
    Base64(String),

    #[error("Invalid UTF-8: {0}")]
    Utf8(String),
}

#[derive(Clone)]
pub struct CodecAdapter {
    compression: Arc<dyn Compression>,
}

impl CodecAdapter {
    pub fn new(compression: Arc<dyn Compression>) -> Self {
        Self { compression }
    }

    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        self.compression.compress(data)
    }

    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        self.compression.decompress(data)
    }
}

impl Default for CodecAdapter {
    fn default() -> Self {
        Self::new(Arc::new(DeflateRaw::default()))
    }
}

impl std::fmt::Debug for CodecAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecAdapter").finish_non_exhaustive()
    }
}
