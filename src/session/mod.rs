// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persisted wallet session.
//!
//! One [`SessionRecord`] is stored as JSON under [`SESSION_KEY`]. It is
//! overwritten after every successful sign and read once at start-up.

pub mod secret_store;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use secret_store::{MemorySecretStore, RedbSecretStore, SecretStore, SecretStoreError};

use crate::request::{Callback, ResolvedTransaction};

pub const SESSION_KEY: &str = "walletSession";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] SecretStoreError),

    #[error("session record is malformed: {0}")]
    Serde(#[from] serde_json::Error),
}

/// What is needed to re-open the link channel after a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Chain id (hex).
    pub network: String,
    pub actor: String,
    pub permission: String,
    /// The signed request, canonically encoded.
    pub payload: String,
}

impl SessionRecord {
    pub fn from_signed(resolved: &ResolvedTransaction, callback: &Callback) -> Self {
        Self {
            network: resolved.chain_id.to_string(),
            actor: callback.payload.sa.clone(),
            permission: callback.payload.sp.clone(),
            payload: resolved.encoded_request.clone(),
        }
    }
}

#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn SecretStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }

    pub async fn load(&self) -> Result<Option<SessionRecord>, SessionError> {
        match self.store.get(SESSION_KEY).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Last write wins.
    pub async fn save(&self, record: &SessionRecord) -> Result<(), SessionError> {
        let json = serde_json::to_string(record)?;
        self.store.set(SESSION_KEY, &json).await?;
        debug!(actor = %record.actor, network = %record.network, "session saved");
        Ok(())
    }
}
