// Copyright (C) Microsoft Corporation. All rights reserved.

//! Hash algorithm table.
//!
//! Maps the digest identifiers used throughout the service onto OpenSSL
//! message digests. MD5 and SHA-1 are carried for compatibility with the
//! RSA/EC signing surface; new keys should prefer the SHA-2 family.

use openssl::hash::MessageDigest;

use super::*;

/// Supported hash algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgo {
    /// MD5 (legacy, RSA/EC signing compatibility only).
    Md5,
    /// SHA-1 (legacy).
    Sha1,
    /// SHA-224.
    Sha224,
    /// SHA-256.
    Sha256,
    /// SHA-384.
    Sha384,
    /// SHA-512.
    Sha512,
}

impl HashAlgo {
    /// Returns the OpenSSL message digest for this algorithm.
    pub fn md(&self) -> MessageDigest {
        match self {
            HashAlgo::Md5 => MessageDigest::md5(),
            HashAlgo::Sha1 => MessageDigest::sha1(),
            HashAlgo::Sha224 => MessageDigest::sha224(),
            HashAlgo::Sha256 => MessageDigest::sha256(),
            HashAlgo::Sha384 => MessageDigest::sha384(),
            HashAlgo::Sha512 => MessageDigest::sha512(),
        }
    }

    /// Returns the digest output size in bytes.
    pub fn size(&self) -> usize {
        match self {
            HashAlgo::Md5 => 16,
            HashAlgo::Sha1 => 20,
            HashAlgo::Sha224 => 28,
            HashAlgo::Sha256 => 32,
            HashAlgo::Sha384 => 48,
            HashAlgo::Sha512 => 64,
        }
    }

    /// Computes the digest of `data` in one shot.
    pub fn hash(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let digest = openssl::hash::hash(self.md(), data).map_err(|_| CryptoError::HashError)?;
        Ok(digest.to_vec())
    }
}
