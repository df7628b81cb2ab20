// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signing request data model and its binary layout.

use std::fmt;

use crate::eosio::keys::Signature;
use crate::eosio::serializer::{BinaryReader, BinaryWriter, Pack, SerializerError, SerializerResult, Unpack};
use crate::eosio::{Action, Checksum256, Name, PermissionLevel, Transaction};

/// Oldest and newest protocol versions this crate reads and writes.
pub const MIN_VERSION: u8 = 2;
pub const MAX_VERSION: u8 = 3;

/// Broadcast the transaction after signing.
pub const FLAG_BROADCAST: u8 = 1 << 0;
/// Deliver the callback in the background.
pub const FLAG_BACKGROUND: u8 = 1 << 1;

/// Well-known chains addressable by a one-byte alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChainAlias {
    Eos = 1,
    Telos = 2,
    Jungle = 3,
    Kylin = 4,
    Worbli = 5,
    Bos = 6,
    Meetone = 7,
    Insights = 8,
    Beos = 9,
    Wax = 10,
    Proton = 11,
    Fio = 12,
}

impl ChainAlias {
    pub const ALL: [ChainAlias; 12] = [
        Self::Eos,
        Self::Telos,
        Self::Jungle,
        Self::Kylin,
        Self::Worbli,
        Self::Bos,
        Self::Meetone,
        Self::Insights,
        Self::Beos,
        Self::Wax,
        Self::Proton,
        Self::Fio,
    ];

    pub fn from_u8(alias: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|a| *a as u8 == alias)
    }

    pub fn from_chain_id(id: &Checksum256) -> Option<Self> {
        let hex = id.to_string();
        Self::ALL.into_iter().find(|a| a.chain_id_hex() == hex)
    }

    pub fn chain_id_hex(&self) -> &'static str {
        match self {
            Self::Eos => "aca376f206b8fc25a6ed44dbdc66547c36c6c33e3a119ffbeaef943642f0e906",
            Self::Telos => "4667b205c6838ef70ff7988f6e8257e8be0e1284a2f59699054a018f743b1d11",
            Self::Jungle => "e70aaab8997e1dfce58fbfac80cbbb8fecec7b99cf982a9444273cbc64c41473",
            Self::Kylin => "5fff1dae8dc8e2fc4d5b23b2c7665c97f9e9d8edf2b6485a86ba311c25639191",
            Self::Worbli => "73647cde120091e0a4b85bced2f3cfdb3041e266cbbe95cee59b73235a1b3b6f",
            Self::Bos => "d5a3d18fbb3c084e3b1f3fa98c21014b5f3db536cc15d08f9f6479517c6a3d86",
            Self::Meetone => "cfe6486a83bad4962f232d48003b1824ab5665c36778141034d75e57b956e422",
            Self::Insights => "b042025541e25a472bffde2d62edd457b7e70cee943412b1ea0f044f88591664",
            Self::Beos => "b912d19a6abd2b1b05611ae5be473355d64d95aeff0c09bedc8c166cd6468fe4",
            Self::Wax => "1064487b3cd1a897ce03ae5b6a865651747e2e152090f99c1d19d44e01aea5a4",
            Self::Proton => "384da888112027f0321850a169f737c33e53b388aad48b5adace4bab97f437e0",
            Self::Fio => "21dcae42c0182200e93f954a074011f9048a7624c6fe81d3c9541a614a88bd1c",
        }
    }

    pub fn chain_id(&self) -> Checksum256 {
        // Table entries are valid 64-char hex
        self.chain_id_hex().parse().unwrap_or_default()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Eos => "EOS",
            Self::Telos => "TELOS",
            Self::Jungle => "JUNGLE",
            Self::Kylin => "KYLIN",
            Self::Worbli => "WORBLI",
            Self::Bos => "BOS",
            Self::Meetone => "MEETONE",
            Self::Insights => "INSIGHTS",
            Self::Beos => "BEOS",
            Self::Wax => "WAX",
            Self::Proton => "PROTON",
            Self::Fio => "FIO",
        }
    }
}

/// `variant<chain_alias, checksum256>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainId {
    Alias(u8),
    Id(Checksum256),
}

impl ChainId {
    /// Full chain id; `None` for an unknown alias.
    pub fn resolve(&self) -> Option<Checksum256> {
        match self {
            Self::Alias(alias) => ChainAlias::from_u8(*alias).map(|a| a.chain_id()),
            Self::Id(id) => Some(*id),
        }
    }
}

impl Pack for ChainId {
    fn pack(&self, writer: &mut BinaryWriter) {
        match self {
            Self::Alias(alias) => {
                writer.write_varuint32(0);
                writer.write_u8(*alias);
            }
            Self::Id(id) => {
                writer.write_varuint32(1);
                id.pack(writer);
            }
        }
    }
}

impl Unpack for ChainId {
    fn unpack(reader: &mut BinaryReader<'_>) -> SerializerResult<Self> {
        match reader.read_varuint32()? {
            0 => Ok(Self::Alias(reader.read_u8()?)),
            1 => Ok(Self::Id(Checksum256::unpack(reader)?)),
            other => Err(SerializerError::InvalidValue(format!(
                "chain_id variant index {other}"
            ))),
        }
    }
}

/// Identity proof request. `scope` only exists on the wire from version 3.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityRequest {
    pub scope: Option<Name>,
    pub permission: Option<PermissionLevel>,
}

impl IdentityRequest {
    pub fn pack_versioned(&self, version: u8, writer: &mut BinaryWriter) {
        if version >= 3 {
            self.scope.unwrap_or_default().pack(writer);
        }
        self.permission.pack(writer);
    }

    pub fn unpack_versioned(version: u8, reader: &mut BinaryReader<'_>) -> SerializerResult<Self> {
        let scope = if version >= 3 {
            Some(Name::unpack(reader)?)
        } else {
            None
        };
        Ok(Self {
            scope,
            permission: Option::unpack(reader)?,
        })
    }
}

/// `variant<action, action[], transaction, identity>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestPayload {
    Action(Action),
    Actions(Vec<Action>),
    Transaction(Transaction),
    Identity(IdentityRequest),
}

impl RequestPayload {
    fn variant_index(&self) -> u32 {
        match self {
            Self::Action(_) => 0,
            Self::Actions(_) => 1,
            Self::Transaction(_) => 2,
            Self::Identity(_) => 3,
        }
    }

    /// Actions carried by the request, empty for identity requests.
    pub fn actions(&self) -> &[Action] {
        match self {
            Self::Action(action) => std::slice::from_ref(action),
            Self::Actions(actions) => actions,
            Self::Transaction(tx) => &tx.actions,
            Self::Identity(_) => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoPair {
    pub key: String,
    pub value: Vec<u8>,
}

impl Pack for InfoPair {
    fn pack(&self, writer: &mut BinaryWriter) {
        writer.write_string(&self.key);
        writer.write_bytes(&self.value);
    }
}

impl Unpack for InfoPair {
    fn unpack(reader: &mut BinaryReader<'_>) -> SerializerResult<Self> {
        Ok(Self {
            key: reader.read_string()?,
            value: reader.read_bytes()?,
        })
    }
}

/// Optional signature by the requesting application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSignature {
    pub signer: Name,
    pub signature: Signature,
}

impl Pack for RequestSignature {
    fn pack(&self, writer: &mut BinaryWriter) {
        self.signer.pack(writer);
        self.signature.pack(writer);
    }
}

impl Unpack for RequestSignature {
    fn unpack(reader: &mut BinaryReader<'_>) -> SerializerResult<Self> {
        Ok(Self {
            signer: Name::unpack(reader)?,
            signature: Signature::unpack(reader)?,
        })
    }
}

/// A decoded signing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningRequest {
    pub version: u8,
    pub chain_id: ChainId,
    pub req: RequestPayload,
    pub flags: u8,
    pub callback: String,
    pub info: Vec<InfoPair>,
    pub signature: Option<RequestSignature>,
}

impl SigningRequest {
    pub fn is_identity(&self) -> bool {
        matches!(self.req, RequestPayload::Identity(_))
    }

    pub fn background(&self) -> bool {
        self.flags & FLAG_BACKGROUND != 0
    }

    /// Distinct contract accounts referenced by the request's actions, in
    /// first-seen order.
    pub fn raw_accounts(&self) -> Vec<Name> {
        let mut accounts: Vec<Name> = Vec::new();
        for action in self.req.actions() {
            if !accounts.contains(&action.account) {
                accounts.push(action.account);
            }
        }
        accounts
    }

    /// Serialized request body, without the header byte or signature.
    pub fn pack_data(&self) -> Vec<u8> {
        let mut writer = BinaryWriter::new();
        self.chain_id.pack(&mut writer);
        writer.write_varuint32(self.req.variant_index());
        match &self.req {
            RequestPayload::Action(action) => action.pack(&mut writer),
            RequestPayload::Actions(actions) => actions.pack(&mut writer),
            RequestPayload::Transaction(tx) => tx.pack(&mut writer),
            RequestPayload::Identity(identity) => identity.pack_versioned(self.version, &mut writer),
        }
        writer.write_u8(self.flags);
        writer.write_string(&self.callback);
        self.info.pack(&mut writer);
        writer.into_bytes()
    }

    /// Body plus the trailing request signature, if any.
    pub fn pack_body(&self) -> Vec<u8> {
        let mut body = self.pack_data();
        if let Some(signature) = &self.signature {
            body.extend_from_slice(&signature.pack_to_vec());
        }
        body
    }

    /// Parse a request body for `version`.
    pub fn unpack_body(version: u8, data: &[u8]) -> SerializerResult<Self> {
        let mut reader = BinaryReader::new(data);
        let chain_id = ChainId::unpack(&mut reader)?;
        let req = match reader.read_varuint32()? {
            0 => RequestPayload::Action(Action::unpack(&mut reader)?),
            1 => RequestPayload::Actions(Vec::unpack(&mut reader)?),
            2 => RequestPayload::Transaction(Transaction::unpack(&mut reader)?),
            3 => RequestPayload::Identity(IdentityRequest::unpack_versioned(version, &mut reader)?),
            other => {
                return Err(SerializerError::InvalidValue(format!(
                    "request variant index {other}"
                )))
            }
        };
        let flags = reader.read_u8()?;
        let callback = reader.read_string()?;
        let info = Vec::unpack(&mut reader)?;
        let signature = if reader.is_empty() {
            None
        } else {
            Some(RequestSignature::unpack(&mut reader)?)
        };
        reader.finish()?;

        Ok(Self {
            version,
            chain_id,
            req,
            flags,
            callback,
            info,
            signature,
        })
    }
}

impl fmt::Display for ChainAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer_request(version: u8) -> SigningRequest {
        SigningRequest {
            version,
            chain_id: ChainId::Alias(1),
            req: RequestPayload::Action(Action {
                account: Name::new("eosio.token").unwrap(),
                name: Name::new("transfer").unwrap(),
                authorization: vec![PermissionLevel::new(
                    Name::PLACEHOLDER_ACTOR,
                    Name::PLACEHOLDER_PERMISSION,
                )],
                data: vec![1, 2, 3],
            }),
            flags: FLAG_BROADCAST,
            callback: "https://example.com/cb?tx={{tx}}".into(),
            info: vec![InfoPair {
                key: "memo".into(),
                value: b"hi".to_vec(),
            }],
            signature: None,
        }
    }

    #[test]
    fn aliases_map_to_known_chains() {
        assert_eq!(
            ChainId::Alias(1).resolve().unwrap().to_string(),
            "aca376f206b8fc25a6ed44dbdc66547c36c6c33e3a119ffbeaef943642f0e906"
        );
        assert_eq!(ChainAlias::from_u8(10), Some(ChainAlias::Wax));
        assert!(ChainId::Alias(0).resolve().is_none());
        assert!(ChainId::Alias(13).resolve().is_none());
        for alias in ChainAlias::ALL {
            assert_eq!(ChainAlias::from_chain_id(&alias.chain_id()), Some(alias));
        }
    }

    #[test]
    fn body_layout_starts_with_chain_variant() {
        let body = transfer_request(2).pack_data();
        // chain_id variant 0, alias 1, then req variant 0 and the account name
        assert_eq!(&body[..3], &[0, 1, 0]);
        assert_eq!(
            &body[3..11],
            &Name::new("eosio.token").unwrap().raw().to_le_bytes()
        );
    }

    #[test]
    fn body_round_trip() {
        let request = transfer_request(2);
        let decoded = SigningRequest::unpack_body(2, &request.pack_body()).unwrap();
        assert_eq!(decoded, request);
        assert_eq!(decoded.info[0].key, "memo");
        assert_eq!(decoded.info[0].value, b"hi");
        assert_eq!(decoded.flags & FLAG_BROADCAST, FLAG_BROADCAST);
        assert!(!decoded.background());
    }

    #[test]
    fn identity_scope_is_version_dependent() {
        let identity = IdentityRequest {
            scope: Some(Name::new("myapp").unwrap()),
            permission: None,
        };
        let mut v2 = BinaryWriter::new();
        identity.pack_versioned(2, &mut v2);
        assert_eq!(v2.as_bytes(), &[0]);

        let mut v3 = BinaryWriter::new();
        identity.pack_versioned(3, &mut v3);
        assert_eq!(v3.as_bytes().len(), 9);

        let mut reader = BinaryReader::new(v3.as_bytes());
        assert_eq!(IdentityRequest::unpack_versioned(3, &mut reader).unwrap(), identity);
    }

    #[test]
    fn raw_accounts_are_distinct() {
        let mut request = transfer_request(2);
        let RequestPayload::Action(action) = request.req.clone() else {
            unreachable!()
        };
        request.req = RequestPayload::Actions(vec![action.clone(), action]);
        assert_eq!(request.raw_accounts(), vec![Name::new("eosio.token").unwrap()]);
    }
}
