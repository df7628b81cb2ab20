// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The agent's signing identity: one account and one key.

use std::fmt;

use crate::eosio::{KeyError, Name, PermissionLevel, PrivateKey, PublicKey};

/// Permission every request is resolved against.
pub const SIGNING_PERMISSION: &str = "active";

#[derive(Clone)]
pub struct Identity {
    account: Name,
    permission: Name,
    private_key: PrivateKey,
    public_key: PublicKey,
}

impl Identity {
    /// Build an identity for `account@active`.
    ///
    /// # Arguments
    /// * `account` - The account name that signs requests
    /// * `private_key` - The account's active key
    ///
    /// # Returns
    /// * `Err(KeyError)` - If the public key cannot be derived
    pub fn new(account: Name, private_key: PrivateKey) -> Result<Self, KeyError> {
        let public_key = private_key.public_key()?;
        let permission = Name::new(SIGNING_PERMISSION)
            .map_err(|e| KeyError::InvalidFormat(e.to_string()))?;
        Ok(Self {
            account,
            permission,
            private_key,
            public_key,
        })
    }

    pub fn account(&self) -> Name {
        self.account
    }

    pub fn authorization(&self) -> PermissionLevel {
        PermissionLevel::new(self.account, self.permission)
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("account", &self.account)
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}
