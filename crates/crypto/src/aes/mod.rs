// Copyright (C) Microsoft Corporation. All rights reserved.

//! AES key management and cipher modes.
//!
//! Block and stream modes (ECB, CBC, CTR) are provided through
//! [`AesCipher`]; the AEAD modes live in the `gcm` submodule
//! ([`AesGcmContext`] for streaming, [`AesGcmAlgo`]/[`AesOcbAlgo`] for
//! one-shot sealing).

mod block;
mod gcm;


pub use block::*;
pub use gcm::*;
use zeroize::Zeroizing;

use super::*;

/// AES cipher block size in bytes.
pub const AES_BLOCK_SIZE: usize = 16;

/// Direction of a symmetric cipher operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Plaintext in, ciphertext out.
    Encrypt,
    /// Ciphertext in, plaintext out.
    Decrypt,
}

/// An AES key (128, 192 or 256 bits).
///
/// Key material is zeroized when the key is dropped.
#[derive(Clone)]
pub struct AesKey {
    key: Zeroizing<Vec<u8>>,
}

impl AesKey {
    /// Creates an AES key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::AesInvalidKeySize` if the material is not
    /// 16, 24 or 32 bytes long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        Self::validate_key_size(bytes.len())?;
        Ok(Self {
            key: Zeroizing::new(bytes.to_vec()),
        })
    }

    /// Generates a random AES key of `size` bytes.
    pub fn generate(size: usize) -> Result<Self, CryptoError> {
        Self::validate_key_size(size)?;
        let mut key = Zeroizing::new(vec![0u8; size]);
        Rng::rand_bytes(&mut key)?;
        Ok(Self { key })
    }

    /// Returns the key length in bytes.
    pub fn size(&self) -> usize {
        self.key.len()
    }

    /// Returns the key length in bits.
    pub fn bits(&self) -> usize {
        self.key.len() * 8
    }

    /// Raw key material, for use by the cipher implementations and the
    /// service's key codec.
    pub fn bytes(&self) -> &[u8] {
        &self.key
    }

    fn validate_key_size(key_size: usize) -> Result<(), CryptoError> {
        match key_size {
            16 | 24 | 32 => Ok(()),
            _ => Err(CryptoError::AesInvalidKeySize),
        }
    }
}
