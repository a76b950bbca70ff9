// Copyright (C) Microsoft Corporation. All rights reserved.

//! RSA encryption and decryption.
//!
//! Supports raw (no padding), PKCS#1 v1.5 and OAEP. OAEP defaults to
//! SHA-1 when no digest is configured, matching the interoperable
//! baseline; the MGF1 digest always follows the OAEP digest.

use openssl::encrypt::Decrypter;
use openssl::encrypt::Encrypter;
use openssl::rsa::Padding;
use zeroize::Zeroizing;

use super::*;

/// RSA encryption padding scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaEncPadding {
    /// Raw modular exponentiation, no padding.
    None,
    /// PKCS#1 v1.5 encryption padding.
    Pkcs1,
    /// RSAES-OAEP.
    Oaep,
}

/// One-shot RSA encrypter/decrypter for a fixed (padding, digest) pair.
pub struct RsaCipher {
    padding: RsaEncPadding,
    digest: Option<HashAlgo>,
}

impl RsaCipher {
    /// Creates a cipher. `digest` is only meaningful for OAEP.
    pub fn new(padding: RsaEncPadding, digest: Option<HashAlgo>) -> Self {
        Self { padding, digest }
    }

    /// Maximum plaintext length for the given modulus size, or `None`
    /// when the plaintext must be exactly the modulus length.
    pub fn max_input(&self, key_bytes: usize) -> Option<usize> {
        match self.padding {
            RsaEncPadding::None => None,
            RsaEncPadding::Pkcs1 => Some(key_bytes.saturating_sub(11)),
            RsaEncPadding::Oaep => {
                Some(key_bytes.saturating_sub(2 * self.oaep_digest().size() + 2))
            }
        }
    }

    /// Encrypts `plaintext` with the public key.
    pub fn encrypt(&self, key: &RsaPublicKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        match self.padding {
            RsaEncPadding::None => {
                let rsa = key.rsa()?;
                let mut ciphertext = vec![0u8; rsa.size() as usize];
                let count = rsa
                    .public_encrypt(plaintext, &mut ciphertext, Padding::NONE)
                    .map_err(|_| CryptoError::RsaEncryptError)?;
                ciphertext.truncate(count);
                Ok(ciphertext)
            }
            RsaEncPadding::Pkcs1 => {
                let rsa = key.rsa()?;
                let mut ciphertext = vec![0u8; rsa.size() as usize];
                let count = rsa
                    .public_encrypt(plaintext, &mut ciphertext, Padding::PKCS1)
                    .map_err(|_| CryptoError::RsaEncryptError)?;
                ciphertext.truncate(count);
                Ok(ciphertext)
            }
            RsaEncPadding::Oaep => {
                let mut encrypter =
                    Encrypter::new(key.pkey()).map_err(|_| CryptoError::RsaError)?;
                encrypter
                    .set_rsa_padding(Padding::PKCS1_OAEP)
                    .map_err(|_| CryptoError::RsaError)?;
                encrypter
                    .set_rsa_oaep_md(self.oaep_digest().md())
                    .map_err(|_| CryptoError::RsaError)?;
                encrypter
                    .set_rsa_mgf1_md(self.oaep_digest().md())
                    .map_err(|_| CryptoError::RsaError)?;
                let len = encrypter
                    .encrypt_len(plaintext)
                    .map_err(|_| CryptoError::RsaError)?;
                let mut ciphertext = vec![0u8; len];
                let count = encrypter
                    .encrypt(plaintext, &mut ciphertext)
                    .map_err(|_| CryptoError::RsaEncryptError)?;
                ciphertext.truncate(count);
                Ok(ciphertext)
            }
        }
    }

    /// Decrypts `ciphertext` with the private key.
    ///
    /// Padding failures (including corrupted ciphertext) surface as
    /// `CryptoError::RsaDecryptError`.
    pub fn decrypt(
        &self,
        key: &RsaPrivateKey,
        ciphertext: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        match self.padding {
            RsaEncPadding::None => {
                let rsa = key.rsa()?;
                let mut plaintext = Zeroizing::new(vec![0u8; rsa.size() as usize]);
                let count = rsa
                    .private_decrypt(ciphertext, &mut plaintext, Padding::NONE)
                    .map_err(|_| CryptoError::RsaDecryptError)?;
                plaintext.truncate(count);
                Ok(plaintext)
            }
            RsaEncPadding::Pkcs1 => {
                let rsa = key.rsa()?;
                let mut plaintext = Zeroizing::new(vec![0u8; rsa.size() as usize]);
                let count = rsa
                    .private_decrypt(ciphertext, &mut plaintext, Padding::PKCS1)
                    .map_err(|_| CryptoError::RsaDecryptError)?;
                plaintext.truncate(count);
                Ok(plaintext)
            }
            RsaEncPadding::Oaep => {
                let mut decrypter =
                    Decrypter::new(key.pkey()).map_err(|_| CryptoError::RsaError)?;
                decrypter
                    .set_rsa_padding(Padding::PKCS1_OAEP)
                    .map_err(|_| CryptoError::RsaError)?;
                decrypter
                    .set_rsa_oaep_md(self.oaep_digest().md())
                    .map_err(|_| CryptoError::RsaError)?;
                decrypter
                    .set_rsa_mgf1_md(self.oaep_digest().md())
                    .map_err(|_| CryptoError::RsaError)?;
                let len = decrypter
                    .decrypt_len(ciphertext)
                    .map_err(|_| CryptoError::RsaError)?;
                let mut plaintext = Zeroizing::new(vec![0u8; len]);
                let count = decrypter
                    .decrypt(ciphertext, &mut plaintext)
                    .map_err(|_| CryptoError::RsaDecryptError)?;
                plaintext.truncate(count);
                Ok(plaintext)
            }
        }
    }

    fn oaep_digest(&self) -> HashAlgo {
        self.digest.unwrap_or(HashAlgo::Sha1)
    }
}
