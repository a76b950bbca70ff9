// Copyright (C) Microsoft Corporation. All rights reserved.

//! AES-GCM and AES-OCB authenticated encryption.
//!
//! [`AesGcmContext`] is the streaming interface used by cryptographic
//! operations: associated data may be fed incrementally before the cipher
//! input, and the authentication tag length is chosen by the caller
//! (12..=16 bytes). [`AesGcmAlgo`] and [`AesOcbAlgo`] are one-shot forms
//! used by the key-blob codec, which always works on complete buffers with
//! a full 16-byte tag.

use openssl::cipher::Cipher;
use openssl::cipher::CipherRef;
use openssl::cipher_ctx::CipherCtx;

use super::*;

/// GCM nonce size in bytes.
pub const GCM_NONCE_SIZE: usize = 12;
/// Full GCM/OCB authentication tag size in bytes.
pub const AEAD_TAG_SIZE: usize = 16;
/// Shortest tag the streaming context will emit or accept.
const MIN_TAG_SIZE: usize = 12;

fn gcm_cipher(key: &AesKey) -> Result<&'static CipherRef, CryptoError> {
    match key.size() {
        16 => Ok(Cipher::aes_128_gcm()),
        24 => Ok(Cipher::aes_192_gcm()),
        32 => Ok(Cipher::aes_256_gcm()),
        _ => Err(CryptoError::AesInvalidKeySize),
    }
}

/// Streaming AES-GCM context.
pub struct AesGcmContext {
    ctx: CipherCtx,
    direction: Direction,
    tag: Option<Vec<u8>>,
}

impl AesGcmContext {
    /// Initializes a streaming encryption context with a 12-byte nonce.
    pub fn encrypt(key: &AesKey, nonce: &[u8]) -> Result<Self, CryptoError> {
        Self::init(key, nonce, Direction::Encrypt)
    }

    /// Initializes a streaming decryption context with a 12-byte nonce.
    ///
    /// The authentication tag must be supplied via [`Self::set_tag`]
    /// before [`Self::finish`].
    pub fn decrypt(key: &AesKey, nonce: &[u8]) -> Result<Self, CryptoError> {
        Self::init(key, nonce, Direction::Decrypt)
    }

    fn init(key: &AesKey, nonce: &[u8], direction: Direction) -> Result<Self, CryptoError> {
        if nonce.len() != GCM_NONCE_SIZE {
            Err(CryptoError::GcmInvalidIvLength)?;
        }
        let cipher = gcm_cipher(key)?;
        let mut ctx = CipherCtx::new().map_err(|_| CryptoError::GcmEncryptionFailed)?;
        match direction {
            Direction::Encrypt => ctx
                .encrypt_init(Some(cipher), Some(key.bytes()), Some(nonce))
                .map_err(|_| CryptoError::GcmEncryptionFailed)?,
            Direction::Decrypt => ctx
                .decrypt_init(Some(cipher), Some(key.bytes()), Some(nonce))
                .map_err(|_| CryptoError::GcmDecryptionFailed)?,
        }
        Ok(Self {
            ctx,
            direction,
            tag: None,
        })
    }

    /// Feeds associated data. Must precede any call to [`Self::update`].
    pub fn update_aad(&mut self, aad: &[u8]) -> Result<(), CryptoError> {
        self.ctx
            .cipher_update(aad, None)
            .map(|_| ())
            .map_err(|_| self.op_error())
    }

    /// Processes a chunk of cipher input. `output` must hold at least
    /// `input.len()` bytes; returns the number of bytes produced.
    pub fn update(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize, CryptoError> {
        self.ctx
            .cipher_update(input, Some(output))
            .map_err(|_| self.op_error())
    }

    /// Supplies the expected authentication tag for decryption.
    pub fn set_tag(&mut self, tag: &[u8]) -> Result<(), CryptoError> {
        if tag.is_empty() || tag.len() > AEAD_TAG_SIZE {
            Err(CryptoError::GcmInvalidTagLength)?;
        }
        self.tag = Some(tag.to_vec());
        Ok(())
    }

    /// Finalizes the operation.
    ///
    /// On encrypt, fills `tag_out` (12..=16 bytes) with the
    /// authentication tag. On decrypt, verifies the tag supplied via
    /// [`Self::set_tag`]; verification failure is
    /// `CryptoError::GcmDecryptionFailed`.
    pub fn finish(&mut self, tag_out: Option<&mut [u8]>) -> Result<(), CryptoError> {
        match self.direction {
            Direction::Encrypt => {
                let mut trailer = [0u8; AES_BLOCK_SIZE];
                self.ctx
                    .cipher_final(&mut trailer)
                    .map_err(|_| CryptoError::GcmEncryptionFailed)?;
                if let Some(tag_out) = tag_out {
                    if tag_out.len() < MIN_TAG_SIZE || tag_out.len() > AEAD_TAG_SIZE {
                        Err(CryptoError::GcmInvalidTagLength)?;
                    }
                    self.ctx
                        .tag(tag_out)
                        .map_err(|_| CryptoError::GcmEncryptionFailed)?;
                }
            }
            Direction::Decrypt => {
                let tag = self.tag.take().unwrap_or_default();
                self.ctx
                    .set_tag(&tag)
                    .map_err(|_| CryptoError::GcmDecryptionFailed)?;
                let mut trailer = [0u8; AES_BLOCK_SIZE];
                self.ctx
                    .cipher_final(&mut trailer)
                    .map_err(|_| CryptoError::GcmDecryptionFailed)?;
            }
        }
        Ok(())
    }

    fn op_error(&self) -> CryptoError {
        match self.direction {
            Direction::Encrypt => CryptoError::GcmEncryptionFailed,
            Direction::Decrypt => CryptoError::GcmDecryptionFailed,
        }
    }
}

/// One-shot AES-GCM with a full 16-byte tag.
pub struct AesGcmAlgo {
    nonce: Vec<u8>,
    tag: Vec<u8>,
    aad: Option<Vec<u8>>,
}

impl AesGcmAlgo {
    /// Creates a one-shot instance for encryption.
    pub fn for_encrypt(nonce: &[u8], aad: Option<&[u8]>) -> Result<Self, CryptoError> {
        if nonce.len() != GCM_NONCE_SIZE {
            Err(CryptoError::GcmInvalidIvLength)?;
        }
        Ok(Self {
            nonce: nonce.to_vec(),
            tag: vec![0u8; AEAD_TAG_SIZE],
            aad: aad.map(|a| a.to_vec()),
        })
    }

    /// Creates a one-shot instance for decryption with the expected tag.
    pub fn for_decrypt(nonce: &[u8], tag: &[u8], aad: Option<&[u8]>) -> Result<Self, CryptoError> {
        if nonce.len() != GCM_NONCE_SIZE {
            Err(CryptoError::GcmInvalidIvLength)?;
        }
        if tag.len() != AEAD_TAG_SIZE {
            Err(CryptoError::GcmInvalidTagLength)?;
        }
        Ok(Self {
            nonce: nonce.to_vec(),
            tag: tag.to_vec(),
            aad: aad.map(|a| a.to_vec()),
        })
    }

    /// Returns the authentication tag (valid after `encrypt`).
    pub fn tag(&self) -> &[u8] {
        &self.tag
    }

    /// Encrypts `input` into a new buffer.
    pub fn encrypt(&mut self, key: &AesKey, input: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut ctx = AesGcmContext::encrypt(key, &self.nonce)?;
        if let Some(aad) = &self.aad {
            ctx.update_aad(aad)?;
        }
        let mut output = vec![0u8; input.len() + AES_BLOCK_SIZE];
        let count = ctx.update(input, &mut output)?;
        ctx.finish(Some(&mut self.tag))?;
        output.truncate(count);
        Ok(output)
    }

    /// Decrypts `input` into a new buffer, verifying the tag.
    pub fn decrypt(&mut self, key: &AesKey, input: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut ctx = AesGcmContext::decrypt(key, &self.nonce)?;
        if let Some(aad) = &self.aad {
            ctx.update_aad(aad)?;
        }
        let mut output = vec![0u8; input.len() + AES_BLOCK_SIZE];
        let count = ctx.update(input, &mut output)?;
        ctx.set_tag(&self.tag)?;
        ctx.finish(None)?;
        output.truncate(count);
        Ok(output)
    }
}

/// One-shot AES-256-OCB, used only to unseal (and, in tests, to build)
/// previous-generation key blobs.
pub struct AesOcbAlgo {
    nonce: Vec<u8>,
    tag: Vec<u8>,
    aad: Option<Vec<u8>>,
}

impl AesOcbAlgo {
    /// Creates a one-shot instance for encryption.
    pub fn for_encrypt(nonce: &[u8], aad: Option<&[u8]>) -> Result<Self, CryptoError> {
        if nonce.len() != GCM_NONCE_SIZE {
            Err(CryptoError::GcmInvalidIvLength)?;
        }
        Ok(Self {
            nonce: nonce.to_vec(),
            tag: vec![0u8; AEAD_TAG_SIZE],
            aad: aad.map(|a| a.to_vec()),
        })
    }

    /// Creates a one-shot instance for decryption with the expected tag.
    pub fn for_decrypt(nonce: &[u8], tag: &[u8], aad: Option<&[u8]>) -> Result<Self, CryptoError> {
        if nonce.len() != GCM_NONCE_SIZE {
            Err(CryptoError::GcmInvalidIvLength)?;
        }
        if tag.len() != AEAD_TAG_SIZE {
            Err(CryptoError::GcmInvalidTagLength)?;
        }
        Ok(Self {
            nonce: nonce.to_vec(),
            tag: tag.to_vec(),
            aad: aad.map(|a| a.to_vec()),
        })
    }

    /// Returns the authentication tag (valid after `encrypt`).
    pub fn tag(&self) -> &[u8] {
        &self.tag
    }

    /// Encrypts `input` into a new buffer.
    pub fn encrypt(&mut self, key: &AesKey, input: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if key.size() != 32 {
            Err(CryptoError::AesInvalidKeySize)?;
        }
        let mut ctx = CipherCtx::new().map_err(|_| CryptoError::OcbEncryptionFailed)?;
        ctx.encrypt_init(
            Some(Cipher::aes_256_ocb()),
            Some(key.bytes()),
            Some(&self.nonce),
        )
        .map_err(|_| CryptoError::OcbEncryptionFailed)?;
        if let Some(aad) = &self.aad {
            ctx.cipher_update(aad, None)
                .map_err(|_| CryptoError::OcbEncryptionFailed)?;
        }
        let mut output = vec![0u8; input.len() + AES_BLOCK_SIZE];
        let count = ctx
            .cipher_update(input, Some(&mut output))
            .map_err(|_| CryptoError::OcbEncryptionFailed)?;
        let mut trailer = [0u8; AES_BLOCK_SIZE];
        ctx.cipher_final(&mut trailer)
            .map_err(|_| CryptoError::OcbEncryptionFailed)?;
        ctx.tag(&mut self.tag)
            .map_err(|_| CryptoError::OcbEncryptionFailed)?;
        output.truncate(count);
        Ok(output)
    }

    /// Decrypts `input` into a new buffer, verifying the tag.
    pub fn decrypt(&mut self, key: &AesKey, input: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if key.size() != 32 {
            Err(CryptoError::AesInvalidKeySize)?;
        }
        let mut ctx = CipherCtx::new().map_err(|_| CryptoError::OcbDecryptionFailed)?;
        ctx.decrypt_init(
            Some(Cipher::aes_256_ocb()),
            Some(key.bytes()),
            Some(&self.nonce),
        )
        .map_err(|_| CryptoError::OcbDecryptionFailed)?;
        ctx.set_tag(&self.tag)
            .map_err(|_| CryptoError::OcbDecryptionFailed)?;
        if let Some(aad) = &self.aad {
            ctx.cipher_update(aad, None)
                .map_err(|_| CryptoError::OcbDecryptionFailed)?;
        }
        let mut output = vec![0u8; input.len() + AES_BLOCK_SIZE];
        let mut count = ctx
            .cipher_update(input, Some(&mut output))
            .map_err(|_| CryptoError::OcbDecryptionFailed)?;
        count += ctx
            .cipher_final(&mut output[count..])
            .map_err(|_| CryptoError::OcbDecryptionFailed)?;
        output.truncate(count);
        Ok(output)
    }
}
