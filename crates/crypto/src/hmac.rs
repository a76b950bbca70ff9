// Copyright (C) Microsoft Corporation. All rights reserved.

//! HMAC computation and verification.
//!
//! Keys are raw byte strings of any length (the MAC secret). Verification
//! compares in constant time against a caller-truncated MAC.

use openssl::pkey::PKey;
use openssl::sign::Signer;
use zeroize::Zeroizing;

use super::*;

/// HMAC key material.
#[derive(Clone)]
pub struct HmacKey {
    key: Zeroizing<Vec<u8>>,
}

impl HmacKey {
    /// Wraps raw key material. Any non-empty length is accepted.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.is_empty() {
            Err(CryptoError::HmacError)?;
        }
        Ok(Self {
            key: Zeroizing::new(bytes.to_vec()),
        })
    }

    /// Generates a random key of `size` bytes.
    pub fn generate(size: usize) -> Result<Self, CryptoError> {
        if size == 0 {
            Err(CryptoError::HmacError)?;
        }
        let mut key = Zeroizing::new(vec![0u8; size]);
        Rng::rand_bytes(&mut key)?;
        Ok(Self { key })
    }

    /// Key length in bytes.
    pub fn size(&self) -> usize {
        self.key.len()
    }

    /// Raw key material, for the service's key codec.
    pub fn bytes(&self) -> &[u8] {
        &self.key
    }
}

/// HMAC over a fixed hash algorithm.
pub struct HmacAlgo {
    hash: HashAlgo,
}

impl HmacAlgo {
    /// Creates an HMAC instance for the given hash.
    pub fn new(hash: HashAlgo) -> Self {
        Self { hash }
    }

    /// Computes the full-length MAC of `message`.
    pub fn sign(&self, key: &HmacKey, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let pkey = PKey::hmac(key.bytes()).map_err(|_| CryptoError::HmacError)?;
        let mut signer = Signer::new(self.hash.md(), &pkey).map_err(|_| CryptoError::HmacError)?;
        signer.update(message).map_err(|_| CryptoError::HmacError)?;
        signer.sign_to_vec().map_err(|_| CryptoError::HmacError)
    }

    /// Verifies `mac` against the computed MAC truncated to `mac.len()`
    /// bytes, in constant time.
    pub fn verify(&self, key: &HmacKey, message: &[u8], mac: &[u8]) -> Result<bool, CryptoError> {
        let computed = Zeroizing::new(self.sign(key, message)?);
        if mac.is_empty() || mac.len() > computed.len() {
            return Ok(false);
        }
        Ok(openssl::memcmp::eq(&computed[..mac.len()], mac))
    }
}
