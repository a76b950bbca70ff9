// Copyright (C) Microsoft Corporation. All rights reserved.

//! RSA signing and verification.
//!
//! Three padding schemes are supported:
//!
//! - **NONE** — raw modular exponentiation; the message must be exactly
//!   the modulus length and numerically smaller than the modulus.
//! - **PKCS#1 v1.5** — with a digest, RFC 3447 signatures; without one,
//!   the raw message is padded directly (bounded by key bytes − 11).
//! - **PSS** — digest required; salt length equals the digest length.
//!
//! The service buffers complete messages before signing, so only one-shot
//! entry points are provided.

use openssl::rsa::Padding;
use openssl::sign::RsaPssSaltlen;
use openssl::sign::Signer;
use openssl::sign::Verifier;

use super::*;

/// RSA signature padding scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaSignPadding {
    /// Raw modular exponentiation, no padding.
    None,
    /// PKCS#1 v1.5 signature padding.
    Pkcs1,
    /// RSASSA-PSS.
    Pss,
}

/// One-shot RSA signer/verifier for a fixed (padding, digest) pair.
pub struct RsaSigner {
    padding: RsaSignPadding,
    digest: Option<HashAlgo>,
}

impl RsaSigner {
    /// Creates a signer. `digest` of `None` selects the undigested forms;
    /// PSS callers must supply a digest (enforced by the policy layer
    /// before any operation is built).
    pub fn new(padding: RsaSignPadding, digest: Option<HashAlgo>) -> Self {
        Self { padding, digest }
    }

    /// Signs `message`, returning a signature of modulus length.
    pub fn sign(&self, key: &RsaPrivateKey, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        match (self.padding, self.digest) {
            (RsaSignPadding::None, digest) => {
                let data = Self::digested(digest, message)?;
                let rsa = key.rsa()?;
                let mut signature = vec![0u8; rsa.size() as usize];
                let count = rsa
                    .private_encrypt(&data, &mut signature, Padding::NONE)
                    .map_err(|_| CryptoError::RsaSignError)?;
                signature.truncate(count);
                Ok(signature)
            }
            (RsaSignPadding::Pkcs1, None) => {
                let rsa = key.rsa()?;
                let mut signature = vec![0u8; rsa.size() as usize];
                let count = rsa
                    .private_encrypt(message, &mut signature, Padding::PKCS1)
                    .map_err(|_| CryptoError::RsaSignError)?;
                signature.truncate(count);
                Ok(signature)
            }
            (RsaSignPadding::Pkcs1, Some(digest)) => {
                let mut signer = Signer::new(digest.md(), key.pkey())
                    .map_err(|_| CryptoError::RsaSignError)?;
                signer
                    .set_rsa_padding(Padding::PKCS1)
                    .map_err(|_| CryptoError::RsaSignError)?;
                signer
                    .update(message)
                    .map_err(|_| CryptoError::RsaSignError)?;
                signer.sign_to_vec().map_err(|_| CryptoError::RsaSignError)
            }
            (RsaSignPadding::Pss, Some(digest)) => {
                let mut signer = Signer::new(digest.md(), key.pkey())
                    .map_err(|_| CryptoError::RsaSignError)?;
                signer
                    .set_rsa_padding(Padding::PKCS1_PSS)
                    .map_err(|_| CryptoError::RsaSignError)?;
                signer
                    .set_rsa_pss_saltlen(RsaPssSaltlen::DIGEST_LENGTH)
                    .map_err(|_| CryptoError::RsaSignError)?;
                signer
                    .set_rsa_mgf1_md(digest.md())
                    .map_err(|_| CryptoError::RsaSignError)?;
                signer
                    .update(message)
                    .map_err(|_| CryptoError::RsaSignError)?;
                signer.sign_to_vec().map_err(|_| CryptoError::RsaSignError)
            }
            (RsaSignPadding::Pss, None) => Err(CryptoError::RsaSignError),
        }
    }

    /// Verifies `signature` over `message`.
    ///
    /// Returns `Ok(false)` for a well-formed but non-matching signature;
    /// structurally invalid signatures yield `CryptoError::RsaVerifyError`.
    pub fn verify(
        &self,
        key: &RsaPublicKey,
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool, CryptoError> {
        match (self.padding, self.digest) {
            (RsaSignPadding::None, digest) => {
                let data = Self::digested(digest, message)?;
                let rsa = key.rsa()?;
                if signature.len() != rsa.size() as usize {
                    return Ok(false);
                }
                let mut recovered = vec![0u8; rsa.size() as usize];
                let count = rsa
                    .public_decrypt(signature, &mut recovered, Padding::NONE)
                    .map_err(|_| CryptoError::RsaVerifyError)?;
                recovered.truncate(count);
                Ok(recovered.len() == data.len() && openssl::memcmp::eq(&recovered, &data))
            }
            (RsaSignPadding::Pkcs1, None) => {
                let rsa = key.rsa()?;
                if signature.len() != rsa.size() as usize {
                    return Ok(false);
                }
                let mut recovered = vec![0u8; rsa.size() as usize];
                let count = rsa
                    .public_decrypt(signature, &mut recovered, Padding::PKCS1)
                    .map_err(|_| CryptoError::RsaVerifyError)?;
                recovered.truncate(count);
                Ok(recovered.len() == message.len() && openssl::memcmp::eq(&recovered, message))
            }
            (RsaSignPadding::Pkcs1, Some(digest)) => {
                let mut verifier = Verifier::new(digest.md(), key.pkey())
                    .map_err(|_| CryptoError::RsaVerifyError)?;
                verifier
                    .set_rsa_padding(Padding::PKCS1)
                    .map_err(|_| CryptoError::RsaVerifyError)?;
                verifier
                    .update(message)
                    .map_err(|_| CryptoError::RsaVerifyError)?;
                Ok(verifier.verify(signature).unwrap_or(false))
            }
            (RsaSignPadding::Pss, Some(digest)) => {
                let mut verifier = Verifier::new(digest.md(), key.pkey())
                    .map_err(|_| CryptoError::RsaVerifyError)?;
                verifier
                    .set_rsa_padding(Padding::PKCS1_PSS)
                    .map_err(|_| CryptoError::RsaVerifyError)?;
                verifier
                    .set_rsa_pss_saltlen(RsaPssSaltlen::DIGEST_LENGTH)
                    .map_err(|_| CryptoError::RsaVerifyError)?;
                verifier
                    .set_rsa_mgf1_md(digest.md())
                    .map_err(|_| CryptoError::RsaVerifyError)?;
                verifier
                    .update(message)
                    .map_err(|_| CryptoError::RsaVerifyError)?;
                Ok(verifier.verify(signature).unwrap_or(false))
            }
            (RsaSignPadding::Pss, None) => Err(CryptoError::RsaVerifyError),
        }
    }

    fn digested(digest: Option<HashAlgo>, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        match digest {
            None => Ok(message.to_vec()),
            Some(digest) => digest.hash(message),
        }
    }
}
