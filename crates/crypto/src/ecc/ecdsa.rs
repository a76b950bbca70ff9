// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! ECDSA signing and verification.
//!
//! With a digest configured the message is hashed first; without one the
//! raw message is truncated to the curve order size and signed directly.
//! Signatures are DER-encoded `ECDSA-Sig-Value` structures.

use openssl::ecdsa::EcdsaSig;

use super::*;

/// One-shot ECDSA signer/verifier.
pub struct EcdsaSigner {
    digest: Option<HashAlgo>,
}

impl EcdsaSigner {
    /// Creates a signer; `None` selects the undigested form.
    pub fn new(digest: Option<HashAlgo>) -> Self {
        Self { digest }
    }

    /// Signs `message`, returning a DER-encoded signature.
    pub fn sign(&self, key: &EcPrivateKey, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let data = self.digested(key.curve(), message)?;
        let ec = key.ec_key()?;
        let sig = EcdsaSig::sign(&data, &ec).map_err(|_| CryptoError::EccSignError)?;
        sig.to_der().map_err(|_| CryptoError::EccSignError)
    }

    /// Verifies a DER-encoded signature over `message`.
    ///
    /// Returns `Ok(false)` for a well-formed but non-matching signature;
    /// a structurally invalid signature yields
    /// `CryptoError::EccVerifyError`.
    pub fn verify(
        &self,
        key: &EcPublicKey,
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool, CryptoError> {
        let data = self.digested(key.curve(), message)?;
        let sig = EcdsaSig::from_der(signature).map_err(|_| CryptoError::EccVerifyError)?;
        let ec = key.ec_key()?;
        sig.verify(&data, &ec).map_err(|_| CryptoError::EccVerifyError)
    }

    fn digested(&self, curve: EcCurve, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        match self.digest {
            Some(digest) => digest.hash(message),
            None => {
                let take = message.len().min(curve.order_size());
                Ok(message[..take].to_vec())
            }
        }
    }
}
