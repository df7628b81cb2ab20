// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Callback descriptor produced after signing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// JSON body POSTed to the requester.
///
/// Field names are fixed by the protocol. Extra signatures beyond the
/// first are flattened in as `sig0`, `sig1`, ...
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackPayload {
    /// First signature.
    pub sig: String,
    /// Transaction id (hex).
    pub tx: String,
    /// Reference block number.
    pub rbn: String,
    /// Reference block prefix.
    pub rid: String,
    /// Expiration.
    pub ex: String,
    /// The originating request, encoded.
    pub req: String,
    /// Signer actor.
    pub sa: String,
    /// Signer permission.
    pub sp: String,
    /// Chain id (hex).
    pub cid: String,
    /// Block number the transaction was broadcast in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_ch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_name: Option<String>,
    #[serde(flatten)]
    pub extra_signatures: BTreeMap<String, String>,
}

impl CallbackPayload {
    /// Value of a named field, as used by URL placeholders.
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "sig" => Some(&self.sig),
            "tx" => Some(&self.tx),
            "rbn" => Some(&self.rbn),
            "rid" => Some(&self.rid),
            "ex" => Some(&self.ex),
            "req" => Some(&self.req),
            "sa" => Some(&self.sa),
            "sp" => Some(&self.sp),
            "cid" => Some(&self.cid),
            "bn" => self.bn.as_deref(),
            "link_ch" => self.link_ch.as_deref(),
            "link_key" => self.link_key.as_deref(),
            "link_name" => self.link_name.as_deref(),
            other => self.extra_signatures.get(other).map(String::as_str),
        }
    }
}

/// Where and what to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Callback {
    /// URL template, placeholders still unresolved.
    pub url: String,
    pub payload: CallbackPayload,
    pub background: bool,
}
