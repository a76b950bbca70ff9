// Copyright (C) Microsoft Corporation. All rights reserved.

//! RSA key management.
//!
//! Private keys are held as OpenSSL `PKey` objects. Keys are imported and
//! exported in DER form: PKCS#8 for private material, X.509
//! SubjectPublicKeyInfo for public material.

mod encrypt;
mod sign;


pub use encrypt::*;
use openssl::bn::BigNum;
use openssl::pkey::PKey;
use openssl::pkey::PKeyRef;
use openssl::pkey::Private;
use openssl::pkey::Public;
use openssl::rsa::Rsa;
pub use sign::*;

use super::*;

/// RSA private key.
#[derive(Clone, Debug)]
pub struct RsaPrivateKey {
    key: PKey<Private>,
}

/// RSA public key.
#[derive(Clone, Debug)]
pub struct RsaPublicKey {
    key: PKey<Public>,
}

impl RsaPrivateKey {
    /// Generates an RSA key pair with the given modulus size and public
    /// exponent.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::RsaKeyGenError` if OpenSSL refuses the
    /// parameters (it rejects moduli below 512 bits) or generation fails.
    pub fn generate(bits: u32, exponent: u64) -> Result<Self, CryptoError> {
        let e = BigNum::from_slice(&exponent.to_be_bytes())
            .map_err(|_| CryptoError::RsaInvalidExponent)?;
        let rsa = Rsa::generate_with_e(bits, &e).map_err(|_| CryptoError::RsaKeyGenError)?;
        let key = PKey::from_rsa(rsa).map_err(|_| CryptoError::RsaKeyGenError)?;
        Ok(Self { key })
    }

    /// Imports an RSA private key from PKCS#8 DER.
    pub fn from_pkcs8(der: &[u8]) -> Result<Self, CryptoError> {
        let key =
            PKey::private_key_from_pkcs8(der).map_err(|_| CryptoError::RsaKeyImportError)?;
        // Reject non-RSA PKCS#8 material up front.
        key.rsa().map_err(|_| CryptoError::RsaKeyImportError)?;
        Ok(Self { key })
    }

    /// Exports the private key as PKCS#8 DER.
    pub fn to_pkcs8(&self) -> Result<Vec<u8>, CryptoError> {
        self.key
            .private_key_to_pkcs8()
            .map_err(|_| CryptoError::RsaKeyExportError)
    }

    /// Exports the public half as X.509 SubjectPublicKeyInfo DER.
    pub fn public_key_der(&self) -> Result<Vec<u8>, CryptoError> {
        self.key
            .public_key_to_der()
            .map_err(|_| CryptoError::RsaKeyExportError)
    }

    /// Derives a standalone public key.
    pub fn public_key(&self) -> Result<RsaPublicKey, CryptoError> {
        let der = self.public_key_der()?;
        RsaPublicKey::from_der(&der)
    }

    /// Modulus size in bytes.
    pub fn size(&self) -> usize {
        self.key.size()
    }

    /// Modulus size in bits.
    pub fn bits(&self) -> usize {
        self.key.bits() as usize
    }

    /// Public exponent as a `u64`.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::RsaInvalidExponent` for exponents wider than
    /// 64 bits.
    pub fn public_exponent(&self) -> Result<u64, CryptoError> {
        let rsa = self.key.rsa().map_err(|_| CryptoError::RsaError)?;
        let e = rsa.e().to_vec();
        if e.len() > 8 {
            Err(CryptoError::RsaInvalidExponent)?;
        }
        let mut value = 0u64;
        for byte in e {
            value = (value << 8) | u64::from(byte);
        }
        Ok(value)
    }

    pub(crate) fn pkey(&self) -> &PKeyRef<Private> {
        &self.key
    }

    pub(crate) fn rsa(&self) -> Result<Rsa<Private>, CryptoError> {
        self.key.rsa().map_err(|_| CryptoError::RsaError)
    }
}

impl RsaPublicKey {
    /// Imports an RSA public key from X.509 SubjectPublicKeyInfo DER.
    pub fn from_der(der: &[u8]) -> Result<Self, CryptoError> {
        let key = PKey::public_key_from_der(der).map_err(|_| CryptoError::RsaKeyImportError)?;
        key.rsa().map_err(|_| CryptoError::RsaKeyImportError)?;
        Ok(Self { key })
    }

    /// Modulus size in bytes.
    pub fn size(&self) -> usize {
        self.key.size()
    }

    pub(crate) fn pkey(&self) -> &PKeyRef<Public> {
        &self.key
    }

    pub(crate) fn rsa(&self) -> Result<Rsa<Public>, CryptoError> {
        self.key.rsa().map_err(|_| CryptoError::RsaError)
    }
}
