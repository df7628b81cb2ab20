// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use base64ct::{Base64UrlUnpadded, Encoding};

use super::CodecError;

pub fn utf8_encode(s: &str) -> Vec<u8> {
    s.as_bytes().to_vec()
}

pub fn utf8_decode(data: &[u8]) -> Result<String, CodecError> {
    String::from_utf8(data.to_vec()).map_err(|e| CodecError::Utf8(e.to_string()))
}

/// Unpadded base64url, the alphabet used in request URIs.
pub fn base64url_encode(data: &[u8]) -> String {
    Base64UrlUnpadded::encode_string(data)
}

/// Decode unpadded base64url. Trailing `=` padding is tolerated.
pub fn base64url_decode(s: &str) -> Result<Vec<u8>, CodecError> {
    Base64UrlUnpadded::decode_vec(s.trim_end_matches('='))
        .map_err(|e| CodecError::Base64(e.to_string()))
}
