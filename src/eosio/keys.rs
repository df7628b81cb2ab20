// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! secp256k1 keys and signatures in EOSIO string formats.
//!
//! | Kind | Modern | Legacy |
//! |------|--------|--------|
//! | Public key | `PUB_K1_<base58(key ‖ ripemd160(key ‖ "K1")[..4])>` | `EOS<base58(key ‖ ripemd160(key)[..4])>` |
//! | Private key | `PVT_K1_<base58(key ‖ ripemd160(key ‖ "K1")[..4])>` | WIF: `base58(0x80 ‖ key ‖ sha256d[..4])` |
//! | Signature | `SIG_K1_<base58(sig ‖ ripemd160(sig ‖ "K1")[..4])>` | none |
//!
//! Signatures are 65 bytes: a recovery header (`27 + 4 + recid`) followed by
//! `r ‖ s`. Only canonical signatures are produced.

use std::fmt;
use std::str::FromStr;

use k256::ecdsa::signature::hazmat::RandomizedPrehashSigner;
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use super::serializer::{BinaryReader, BinaryWriter, Pack, SerializerError, SerializerResult, Unpack};

const LEGACY_PUBLIC_PREFIX: &str = "EOS";
const WIF_VERSION: u8 = 0x80;
const MAX_SIGN_ATTEMPTS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("Invalid key format: {0}")]
    InvalidFormat(String),

    #[error("Checksum mismatch in {0}")]
    ChecksumMismatch(&'static str),

    #[error("Unsupported key type: {0}")]
    UnsupportedKeyType(String),

    #[error("Cryptographic failure: {0}")]
    Crypto(String),
}

/// Curve tag carried in binary keys and signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    K1,
    R1,
}

impl KeyType {
    fn from_index(index: u8) -> Result<Self, KeyError> {
        match index {
            0 => Ok(Self::K1),
            1 => Ok(Self::R1),
            other => Err(KeyError::UnsupportedKeyType(format!("type index {other}"))),
        }
    }

    fn index(&self) -> u8 {
        match self {
            Self::K1 => 0,
            Self::R1 => 1,
        }
    }

    fn suffix(&self) -> &'static str {
        match self {
            Self::K1 => "K1",
            Self::R1 => "R1",
        }
    }

    fn from_suffix(suffix: &str) -> Result<Self, KeyError> {
        match suffix {
            "K1" => Ok(Self::K1),
            "R1" => Ok(Self::R1),
            other => Err(KeyError::UnsupportedKeyType(other.to_string())),
        }
    }
}

fn ripemd_checksum(data: &[u8], suffix: &str) -> [u8; 4] {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    hasher.update(suffix.as_bytes());
    let digest = hasher.finalize();
    [digest[0], digest[1], digest[2], digest[3]]
}

fn sha256d_checksum(data: &[u8]) -> [u8; 4] {
    let digest = Sha256::digest(Sha256::digest(data));
    [digest[0], digest[1], digest[2], digest[3]]
}

fn encode_checked(data: &[u8], suffix: &str) -> String {
    let mut buf = data.to_vec();
    buf.extend_from_slice(&ripemd_checksum(data, suffix));
    bs58::encode(buf).into_string()
}

/// Decode `base58(payload ‖ checksum)` and verify the ripemd160 checksum.
fn decode_checked<const N: usize>(
    encoded: &str,
    suffix: &str,
    what: &'static str,
) -> Result<[u8; N], KeyError> {
    let raw = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| KeyError::InvalidFormat(format!("{what}: {e}")))?;
    if raw.len() != N + 4 {
        return Err(KeyError::InvalidFormat(format!(
            "{what}: expected {} bytes, got {}",
            N + 4,
            raw.len()
        )));
    }
    let (payload, checksum) = raw.split_at(N);
    if ripemd_checksum(payload, suffix) != checksum {
        return Err(KeyError::ChecksumMismatch(what));
    }
    let mut out = [0u8; N];
    out.copy_from_slice(payload);
    Ok(out)
}

/// Compressed SEC1 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey {
    key_type: KeyType,
    data: [u8; 33],
}

impl PublicKey {
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    pub fn as_bytes(&self) -> &[u8; 33] {
        &self.data
    }

    fn from_verifying_key(key: &VerifyingKey) -> Result<Self, KeyError> {
        let point = key.to_encoded_point(true);
        let data: [u8; 33] = point
            .as_bytes()
            .try_into()
            .map_err(|_| KeyError::Crypto("unexpected public key length".to_string()))?;
        Ok(Self {
            key_type: KeyType::K1,
            data,
        })
    }

    /// `EOS`-prefixed form still expected by older tooling.
    pub fn to_legacy_string(&self) -> Result<String, KeyError> {
        if self.key_type != KeyType::K1 {
            return Err(KeyError::UnsupportedKeyType(
                "legacy format only exists for K1 keys".to_string(),
            ));
        }
        Ok(format!("{LEGACY_PUBLIC_PREFIX}{}", encode_checked(&self.data, "")))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = self.key_type.suffix();
        write!(f, "PUB_{suffix}_{}", encode_checked(&self.data, suffix))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({self})")
    }
}

impl FromStr for PublicKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = s.strip_prefix("PUB_") {
            let (suffix, encoded) = rest
                .split_once('_')
                .ok_or_else(|| KeyError::InvalidFormat(s.to_string()))?;
            let key_type = KeyType::from_suffix(suffix)?;
            let data = decode_checked::<33>(encoded, suffix, "public key")?;
            return Ok(Self { key_type, data });
        }
        if let Some(encoded) = s.strip_prefix(LEGACY_PUBLIC_PREFIX) {
            let data = decode_checked::<33>(encoded, "", "public key")?;
            return Ok(Self {
                key_type: KeyType::K1,
                data,
            });
        }
        Err(KeyError::InvalidFormat(format!("unrecognised public key `{s}`")))
    }
}

impl Pack for PublicKey {
    fn pack(&self, writer: &mut BinaryWriter) {
        writer.write_u8(self.key_type.index());
        writer.write_raw(&self.data);
    }
}

impl Unpack for PublicKey {
    fn unpack(reader: &mut BinaryReader<'_>) -> SerializerResult<Self> {
        let key_type = KeyType::from_index(reader.read_u8()?)
            .map_err(|e| SerializerError::InvalidValue(e.to_string()))?;
        Ok(Self {
            key_type,
            data: reader.read_array()?,
        })
    }
}

/// secp256k1 signing key. `Debug` never prints key material.
#[derive(Clone)]
pub struct PrivateKey {
    key: SigningKey,
}

impl PrivateKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        SigningKey::from_slice(bytes)
            .map(|key| Self { key })
            .map_err(|e| KeyError::InvalidFormat(format!("private key: {e}")))
    }

    pub fn public_key(&self) -> Result<PublicKey, KeyError> {
        PublicKey::from_verifying_key(self.key.verifying_key())
    }

    /// Legacy WIF encoding.
    pub fn to_wif(&self) -> String {
        let mut buf = Vec::with_capacity(37);
        buf.push(WIF_VERSION);
        buf.extend_from_slice(&self.key.to_bytes());
        let checksum = sha256d_checksum(&buf);
        buf.extend_from_slice(&checksum);
        bs58::encode(buf).into_string()
    }

    /// Sign a 32-byte digest, retrying with fresh entropy until the
    /// signature is canonical.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<Signature, KeyError> {
        for _ in 0..MAX_SIGN_ATTEMPTS {
            let signature: EcdsaSignature = self
                .key
                .sign_prehash_with_rng(&mut OsRng, digest)
                .map_err(|e| KeyError::Crypto(e.to_string()))?;
            let rs = signature.to_bytes();
            if !is_canonical(&rs) {
                continue;
            }
            let recovery_id =
                RecoveryId::trial_recovery_from_prehash(self.key.verifying_key(), digest, &signature)
                    .map_err(|e| KeyError::Crypto(e.to_string()))?;

            let mut data = [0u8; 65];
            data[0] = recovery_id.to_byte() + 27 + 4;
            data[1..].copy_from_slice(&rs);
            return Ok(Signature {
                key_type: KeyType::K1,
                data,
            });
        }
        Err(KeyError::Crypto(
            "could not produce a canonical signature".to_string(),
        ))
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

impl FromStr for PrivateKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = s.strip_prefix("PVT_") {
            let (suffix, encoded) = rest
                .split_once('_')
                .ok_or_else(|| KeyError::InvalidFormat("private key".to_string()))?;
            if KeyType::from_suffix(suffix)? != KeyType::K1 {
                return Err(KeyError::UnsupportedKeyType(suffix.to_string()));
            }
            let data = decode_checked::<32>(encoded, suffix, "private key")?;
            return Self::from_bytes(&data);
        }

        let raw = bs58::decode(s)
            .into_vec()
            .map_err(|e| KeyError::InvalidFormat(format!("private key: {e}")))?;
        if raw.len() != 37 || raw[0] != WIF_VERSION {
            return Err(KeyError::InvalidFormat(
                "private key is neither PVT_K1_ nor WIF".to_string(),
            ));
        }
        let (payload, checksum) = raw.split_at(33);
        if sha256d_checksum(payload) != checksum {
            return Err(KeyError::ChecksumMismatch("private key"));
        }
        Self::from_bytes(&payload[1..])
    }
}

/// EOSIO requires both `r` and `s` to be non-negative and minimally encoded.
fn is_canonical(rs: &[u8]) -> bool {
    rs[0] & 0x80 == 0
        && !(rs[0] == 0 && rs[1] & 0x80 == 0)
        && rs[32] & 0x80 == 0
        && !(rs[32] == 0 && rs[33] & 0x80 == 0)
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature {
    key_type: KeyType,
    data: [u8; 65],
}

impl Signature {
    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.data
    }

    /// Recover the public key that produced this signature over `digest`.
    pub fn recover(&self, digest: &[u8; 32]) -> Result<PublicKey, KeyError> {
        if self.key_type != KeyType::K1 {
            return Err(KeyError::UnsupportedKeyType(self.key_type.suffix().to_string()));
        }
        let recovery_byte = self.data[0]
            .checked_sub(27 + 4)
            .ok_or_else(|| KeyError::InvalidFormat("signature recovery header".to_string()))?;
        let recovery_id = RecoveryId::from_byte(recovery_byte)
            .ok_or_else(|| KeyError::InvalidFormat("signature recovery id".to_string()))?;
        let signature = EcdsaSignature::from_slice(&self.data[1..])
            .map_err(|e| KeyError::InvalidFormat(e.to_string()))?;
        let key = VerifyingKey::recover_from_prehash(digest, &signature, recovery_id)
            .map_err(|e| KeyError::Crypto(e.to_string()))?;
        PublicKey::from_verifying_key(&key)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = self.key_type.suffix();
        write!(f, "SIG_{suffix}_{}", encode_checked(&self.data, suffix))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({self})")
    }
}

impl FromStr for Signature {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix("SIG_")
            .ok_or_else(|| KeyError::InvalidFormat(format!("unrecognised signature `{s}`")))?;
        let (suffix, encoded) = rest
            .split_once('_')
            .ok_or_else(|| KeyError::InvalidFormat(s.to_string()))?;
        let key_type = KeyType::from_suffix(suffix)?;
        let data = decode_checked::<65>(encoded, suffix, "signature")?;
        Ok(Self { key_type, data })
    }
}

impl Pack for Signature {
    fn pack(&self, writer: &mut BinaryWriter) {
        writer.write_u8(self.key_type.index());
        writer.write_raw(&self.data);
    }
}

impl Unpack for Signature {
    fn unpack(reader: &mut BinaryReader<'_>) -> SerializerResult<Self> {
        let key_type = KeyType::from_index(reader.read_u8()?)
            .map_err(|e| SerializerError::InvalidValue(e.to_string()))?;
        Ok(Self {
            key_type,
            data: reader.read_array()?,
        })
    }
}
