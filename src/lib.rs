// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Signing Agent - EOSIO Signing Request Wallet Agent
//!
//! Receives `esr:` signing requests, binds them to live chain state, signs
//! them with the configured key and answers the requesting application
//! through its callback. The last signed request is kept as a session so the
//! push channel can be re-opened after a restart.
//!
//! ## Modules
//!
//! - `eosio` - Names, keys, binary serializer and ABI codec
//! - `codec` - Compression and base64url helpers
//! - `request` - Signing request model, URI encoding and resolution
//! - `chain` - nodeos RPC client
//! - `signer` - Transaction signing and callback payloads
//! - `callback` - Callback delivery over HTTP
//! - `channel` - Push-channel listener (WebSocket)
//! - `session` - Persisted session and secret store (redb)
//! - `orchestrator` - Debounced resolve, sign, deliver and save pipeline

pub mod callback;
pub mod chain;
pub mod channel;
pub mod codec;
pub mod config;
pub mod eosio;
pub mod error;
pub mod identity;
pub mod logging;
pub mod orchestrator;
pub mod request;
pub mod session;
pub mod signer;
