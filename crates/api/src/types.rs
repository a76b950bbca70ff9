// Copyright (C) Microsoft Corporation. All rights reserved.

//! Enumerated crypto parameter values.
//!
//! Every enum here travels through authorization sets as a `u32`; the
//! `from_value` constructors reject unknown codes so that policy checks
//! never operate on unvalidated numbers.

use lkms_crypto::HashAlgo;

/// Key algorithm families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Algorithm {
    /// RSA signing and encryption.
    Rsa = 1,
    /// Elliptic-curve signing (NIST prime curves).
    Ec = 2,
    /// AES block/stream/AEAD encryption.
    Aes = 3,
    /// HMAC message authentication.
    Hmac = 4,
}

impl Algorithm {
    /// Decodes an algorithm from its wire value.
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            1 => Some(Algorithm::Rsa),
            2 => Some(Algorithm::Ec),
            3 => Some(Algorithm::Aes),
            4 => Some(Algorithm::Hmac),
            _ => None,
        }
    }

    /// Returns true if `purpose` is defined at all for this algorithm.
    pub fn supports_purpose(&self, purpose: Purpose) -> bool {
        match self {
            Algorithm::Rsa => true,
            Algorithm::Ec | Algorithm::Hmac => {
                matches!(purpose, Purpose::Sign | Purpose::Verify)
            }
            Algorithm::Aes => matches!(purpose, Purpose::Encrypt | Purpose::Decrypt),
        }
    }
}

/// What a key may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Purpose {
    /// Produce signatures or MACs.
    Sign = 1,
    /// Check signatures or MACs.
    Verify = 2,
    /// Encrypt data.
    Encrypt = 3,
    /// Decrypt data.
    Decrypt = 4,
}

impl Purpose {
    /// Decodes a purpose from its wire value.
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            1 => Some(Purpose::Sign),
            2 => Some(Purpose::Verify),
            3 => Some(Purpose::Encrypt),
            4 => Some(Purpose::Decrypt),
            _ => None,
        }
    }
}

/// AES block modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum BlockMode {
    /// Electronic codebook.
    Ecb = 1,
    /// Cipher block chaining.
    Cbc = 2,
    /// Counter mode.
    Ctr = 3,
    /// Galois/counter mode (AEAD).
    Gcm = 4,
}

impl BlockMode {
    /// Decodes a block mode from its wire value.
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            1 => Some(BlockMode::Ecb),
            2 => Some(BlockMode::Cbc),
            3 => Some(BlockMode::Ctr),
            4 => Some(BlockMode::Gcm),
            _ => None,
        }
    }
}

/// Padding modes across algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum PaddingMode {
    /// No padding.
    None = 1,
    /// RSAES-OAEP (encryption).
    RsaOaep = 2,
    /// RSASSA-PSS (signing).
    RsaPss = 3,
    /// RSAES-PKCS1-v1_5 (encryption).
    RsaPkcs1Encrypt = 4,
    /// RSASSA-PKCS1-v1_5 (signing).
    RsaPkcs1Sign = 5,
    /// PKCS#7 block padding (AES).
    Pkcs7 = 6,
}

impl PaddingMode {
    /// Decodes a padding mode from its wire value.
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            1 => Some(PaddingMode::None),
            2 => Some(PaddingMode::RsaOaep),
            3 => Some(PaddingMode::RsaPss),
            4 => Some(PaddingMode::RsaPkcs1Encrypt),
            5 => Some(PaddingMode::RsaPkcs1Sign),
            6 => Some(PaddingMode::Pkcs7),
            _ => None,
        }
    }
}

/// Digest selection for signing operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Digest {
    /// No digest; the raw message is processed.
    None = 0,
    /// MD5 (legacy RSA/EC signing only).
    Md5 = 1,
    /// SHA-1.
    Sha1 = 2,
    /// SHA-224.
    Sha224 = 3,
    /// SHA-256.
    Sha256 = 4,
    /// SHA-384.
    Sha384 = 5,
    /// SHA-512.
    Sha512 = 6,
}

impl Digest {
    /// Decodes a digest from its wire value.
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            0 => Some(Digest::None),
            1 => Some(Digest::Md5),
            2 => Some(Digest::Sha1),
            3 => Some(Digest::Sha224),
            4 => Some(Digest::Sha256),
            5 => Some(Digest::Sha384),
            6 => Some(Digest::Sha512),
            _ => None,
        }
    }

    /// Maps onto the primitive hash table; `None` digest has no mapping.
    pub fn hash_algo(&self) -> Option<HashAlgo> {
        match self {
            Digest::None => None,
            Digest::Md5 => Some(HashAlgo::Md5),
            Digest::Sha1 => Some(HashAlgo::Sha1),
            Digest::Sha224 => Some(HashAlgo::Sha224),
            Digest::Sha256 => Some(HashAlgo::Sha256),
            Digest::Sha384 => Some(HashAlgo::Sha384),
            Digest::Sha512 => Some(HashAlgo::Sha512),
        }
    }
}

/// Key material serialization formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum KeyFormat {
    /// X.509 SubjectPublicKeyInfo DER (export of public keys).
    X509 = 1,
    /// PKCS#8 DER (import of RSA/EC private keys).
    Pkcs8 = 2,
    /// Raw bytes (import of AES/HMAC keys).
    Raw = 3,
}

impl KeyFormat {
    /// Decodes a key format from its wire value.
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            1 => Some(KeyFormat::X509),
            2 => Some(KeyFormat::Pkcs8),
            3 => Some(KeyFormat::Raw),
            _ => None,
        }
    }
}

/// How the key material came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum KeyOrigin {
    /// Generated inside the service.
    Generated = 1,
    /// Imported by the caller.
    Imported = 2,
    /// Provenance lost (legacy blobs).
    Unknown = 3,
}
