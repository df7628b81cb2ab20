// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EOSIO signing requests.
//!
//! - `types` - request model and binary body layout
//! - `encoding` - `esr:` URI encode/decode
//! - `resolve` - binding a request to a signer and chain head
//! - `payload` - callback descriptor built from a signed transaction

pub mod encoding;
pub mod payload;
pub mod resolve;
pub mod types;

pub use encoding::{EncodingError, SCHEME};
pub use payload::{Callback, CallbackPayload};
pub use resolve::{
    AbiSet, RequestInput, RequestResolver, ResolveError, ResolvedRequest, ResolvedTransaction,
};
pub use types::{ChainAlias, ChainId, IdentityRequest, InfoPair, RequestPayload, SigningRequest};
