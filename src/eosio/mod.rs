// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EOSIO chain primitives.
//!
//! Binary serialization, names, keys and signatures, transactions and the
//! ABI-driven codec used to resolve action data.

pub mod abi;
pub mod asset;
pub mod keys;
pub mod layout;
pub mod name;
pub mod serializer;
pub mod types;

pub use abi::{AbiDef, AbiError};
pub use keys::{KeyError, PrivateKey, PublicKey, Signature};
pub use name::Name;
pub use serializer::{BinaryReader, BinaryWriter, Pack, SerializerError, Unpack};
pub use types::{Action, Checksum256, Extension, PermissionLevel, TimePointSec, Transaction};
