// Copyright (C) Microsoft Corporation. All rights reserved.

//! The authorization tag vocabulary.
//!
//! A tag is a 32-bit identifier. The high byte carries the declared value
//! type in its low seven bits and the repeatable flag in bit 7; the low
//! 24 bits number the tag within its type. Non-repeatable tags appear at
//! most once in an authorization set.

/// Value type carried in a tag's high byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TagType {
    /// Unrecognized type code.
    Invalid = 0,
    /// 32-bit enumerated value.
    Enum = 1,
    /// Unsigned 32-bit integer.
    Uint = 2,
    /// Unsigned 64-bit integer.
    Ulong = 3,
    /// Milliseconds since the epoch, unsigned 64-bit.
    Date = 4,
    /// Presence is truth; the value bytes are ignored.
    Bool = 5,
    /// Big-endian byte string holding an arbitrary-precision integer.
    Bignum = 6,
    /// Variable-length byte blob.
    Bytes = 7,
}

impl TagType {
    fn from_code(code: u8) -> TagType {
        match code {
            1 => TagType::Enum,
            2 => TagType::Uint,
            3 => TagType::Ulong,
            4 => TagType::Date,
            5 => TagType::Bool,
            6 => TagType::Bignum,
            7 => TagType::Bytes,
            _ => TagType::Invalid,
        }
    }
}

/// Semantic class of a tag, as recorded in the vocabulary table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagClass {
    /// Selects or parameterizes the cryptographic transform.
    CryptoParam,
    /// Constrains when and by whom the key may be used.
    AuthConstraint,
    /// Records where the key came from.
    Provenance,
}

const REPEATABLE: u32 = 0x80;

const fn tag_value(ty: u8, repeatable: bool, number: u32) -> u32 {
    ((ty as u32) << 24) | (if repeatable { REPEATABLE << 24 } else { 0 }) | number
}

/// All recognized authorization tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Tag {
    /// Authorized purposes (repeatable enum of [`crate::Purpose`]).
    Purpose = tag_value(1, true, 1),
    /// Key algorithm (enum of [`crate::Algorithm`]).
    Algorithm = tag_value(1, false, 2),
    /// Key size in bits.
    KeySize = tag_value(2, false, 3),
    /// Authorized block modes (repeatable enum of [`crate::BlockMode`]).
    BlockMode = tag_value(1, true, 4),
    /// Authorized digests (repeatable enum of [`crate::Digest`]).
    Digest = tag_value(1, true, 5),
    /// Authorized paddings (repeatable enum of [`crate::PaddingMode`]).
    Padding = tag_value(1, true, 6),
    /// Caller-supplied nonces are permitted.
    CallerNonce = tag_value(5, false, 7),
    /// MAC or AEAD tag length in bits, chosen at begin time.
    MacLength = tag_value(2, false, 8),
    /// RSA public exponent.
    RsaPublicExponent = tag_value(3, false, 200),

    /// Key is unusable before this time.
    ActiveDatetime = tag_value(4, false, 400),
    /// Encryption/signing use ends at this time.
    OriginationExpireDatetime = tag_value(4, false, 401),
    /// Decryption/verification use ends at this time.
    UsageExpireDatetime = tag_value(4, false, 402),

    /// Key is usable by every user of the device.
    AllUsers = tag_value(5, false, 500),
    /// Key is bound to one user.
    UserId = tag_value(2, false, 501),
    /// No authentication token is required to use the key.
    NoAuthRequired = tag_value(5, false, 502),
    /// Required authenticator category.
    UserAuthType = tag_value(1, false, 503),
    /// Seconds an authentication remains fresh.
    AuthTimeout = tag_value(2, false, 504),

    /// Owning application identity (hidden, binds the blob).
    ApplicationId = tag_value(7, false, 600),
    /// Application-supplied binding data (hidden, binds the blob).
    ApplicationData = tag_value(7, false, 601),
    /// When the key was created.
    CreationDatetime = tag_value(4, false, 602),
    /// How the key material came to exist (enum of
    /// [`crate::KeyOrigin`]).
    Origin = tag_value(1, false, 603),
    /// Verified-boot state at sealing time (hidden, binds the blob).
    RootOfTrust = tag_value(7, false, 604),

    /// AEAD associated data, supplied per update call.
    AssociatedData = tag_value(7, false, 1000),
    /// IV or nonce for modes that take one.
    Nonce = tag_value(7, false, 1001),
    /// AEAD authentication tag.
    AeadTag = tag_value(7, false, 1002),
}

impl Tag {
    /// Decodes a tag from its 32-bit wire value.
    pub fn from_value(value: u32) -> Option<Tag> {
        const ALL: &[Tag] = &[
            Tag::Purpose,
            Tag::Algorithm,
            Tag::KeySize,
            Tag::BlockMode,
            Tag::Digest,
            Tag::Padding,
            Tag::CallerNonce,
            Tag::MacLength,
            Tag::RsaPublicExponent,
            Tag::ActiveDatetime,
            Tag::OriginationExpireDatetime,
            Tag::UsageExpireDatetime,
            Tag::AllUsers,
            Tag::UserId,
            Tag::NoAuthRequired,
            Tag::UserAuthType,
            Tag::AuthTimeout,
            Tag::ApplicationId,
            Tag::ApplicationData,
            Tag::CreationDatetime,
            Tag::Origin,
            Tag::RootOfTrust,
            Tag::AssociatedData,
            Tag::Nonce,
            Tag::AeadTag,
        ];
        ALL.iter().copied().find(|tag| *tag as u32 == value)
    }

    /// The declared value type.
    pub fn tag_type(&self) -> TagType {
        TagType::from_code(((*self as u32 >> 24) & 0x7f) as u8)
    }

    /// Whether the tag may legitimately appear more than once in a set.
    pub fn is_repeatable(&self) -> bool {
        (*self as u32 >> 24) & REPEATABLE != 0
    }

    /// Whether the tag is stripped from every caller-visible set and only
    /// participates in blob binding.
    pub fn is_hidden(&self) -> bool {
        matches!(
            self,
            Tag::ApplicationId | Tag::ApplicationData | Tag::RootOfTrust
        )
    }

    /// Semantic class recorded in the vocabulary.
    pub fn class(&self) -> TagClass {
        match self {
            Tag::Algorithm
            | Tag::KeySize
            | Tag::BlockMode
            | Tag::Digest
            | Tag::Padding
            | Tag::MacLength
            | Tag::RsaPublicExponent
            | Tag::AssociatedData
            | Tag::Nonce
            | Tag::AeadTag => TagClass::CryptoParam,
            Tag::Purpose
            | Tag::CallerNonce
            | Tag::ActiveDatetime
            | Tag::OriginationExpireDatetime
            | Tag::UsageExpireDatetime
            | Tag::AllUsers
            | Tag::UserId
            | Tag::NoAuthRequired
            | Tag::UserAuthType
            | Tag::AuthTimeout => TagClass::AuthConstraint,
            Tag::ApplicationId
            | Tag::ApplicationData
            | Tag::CreationDatetime
            | Tag::Origin
            | Tag::RootOfTrust => TagClass::Provenance,
        }
    }
}
