// Copyright (C) Microsoft Corporation. All rights reserved.

//! AES-ECB, AES-CBC and AES-CTR streaming contexts.
//!
//! All three modes share one context type over `openssl::symm::Crypter`.
//! ECB and CBC are block ciphers: with padding disabled the total input
//! must be block-aligned by the time [`AesCipher::finalize`] runs, and the
//! caller sees `CryptoError::AesDataSizeError` otherwise. CTR is a stream
//! mode and produces output byte-for-byte.

use openssl::symm::Cipher;
use openssl::symm::Crypter;
use openssl::symm::Mode;

use super::*;

/// Streaming context for the non-AEAD AES modes.
pub struct AesCipher {
    crypter: Crypter,
    direction: Direction,
    block_size: usize,
}

impl AesCipher {
    /// Creates an ECB context. `pad` selects PKCS#7 padding.
    pub fn ecb(key: &AesKey, direction: Direction, pad: bool) -> Result<Self, CryptoError> {
        let cipher = match key.size() {
            16 => Cipher::aes_128_ecb(),
            24 => Cipher::aes_192_ecb(),
            32 => Cipher::aes_256_ecb(),
            _ => Err(CryptoError::AesInvalidKeySize)?,
        };
        Self::new(cipher, key, direction, None, pad)
    }

    /// Creates a CBC context with a 16-byte IV. `pad` selects PKCS#7
    /// padding.
    pub fn cbc(
        key: &AesKey,
        direction: Direction,
        iv: &[u8],
        pad: bool,
    ) -> Result<Self, CryptoError> {
        if iv.len() != AES_BLOCK_SIZE {
            Err(CryptoError::AesInvalidIvSize)?;
        }
        let cipher = match key.size() {
            16 => Cipher::aes_128_cbc(),
            24 => Cipher::aes_192_cbc(),
            32 => Cipher::aes_256_cbc(),
            _ => Err(CryptoError::AesInvalidKeySize)?,
        };
        Self::new(cipher, key, direction, Some(iv), pad)
    }

    /// Creates a CTR context with a 16-byte initial counter block.
    pub fn ctr(key: &AesKey, direction: Direction, iv: &[u8]) -> Result<Self, CryptoError> {
        if iv.len() != AES_BLOCK_SIZE {
            Err(CryptoError::AesInvalidIvSize)?;
        }
        let cipher = match key.size() {
            16 => Cipher::aes_128_ctr(),
            24 => Cipher::aes_192_ctr(),
            32 => Cipher::aes_256_ctr(),
            _ => Err(CryptoError::AesInvalidKeySize)?,
        };
        Self::new(cipher, key, direction, Some(iv), false)
    }

    fn new(
        cipher: Cipher,
        key: &AesKey,
        direction: Direction,
        iv: Option<&[u8]>,
        pad: bool,
    ) -> Result<Self, CryptoError> {
        let mode = match direction {
            Direction::Encrypt => Mode::Encrypt,
            Direction::Decrypt => Mode::Decrypt,
        };
        let mut crypter =
            Crypter::new(cipher, mode, key.bytes(), iv).map_err(|_| CryptoError::AesError)?;
        crypter.pad(pad);
        Ok(Self {
            crypter,
            direction,
            block_size: cipher.block_size(),
        })
    }

    /// Processes a chunk of input.
    ///
    /// `output` must hold at least `input.len() + block_size` bytes; the
    /// return value is the number of bytes actually produced (block modes
    /// withhold incomplete blocks).
    pub fn update(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize, CryptoError> {
        self.crypter
            .update(input, output)
            .map_err(|_| CryptoError::AesError)
    }

    /// Flushes the final block.
    ///
    /// `output` must hold at least `block_size` bytes. Ragged unpadded
    /// input and corrupt PKCS#7 padding both surface here as a final-block
    /// failure; callers that need to tell them apart track the total input
    /// length themselves.
    pub fn finalize(&mut self, output: &mut [u8]) -> Result<usize, CryptoError> {
        self.crypter.finalize(output).map_err(|_| match self.direction {
            Direction::Encrypt => CryptoError::AesEncryptError,
            Direction::Decrypt => CryptoError::AesDecryptError,
        })
    }

    /// Cipher block size in bytes (16 for every AES mode).
    pub fn block_size(&self) -> usize {
        self.block_size
    }
}
