// Copyright (C) Microsoft Corporation. All rights reserved.

//! Elliptic-curve key management for the NIST prime curves.
//!
//! The curve is selected by key size: 224 → P-224, 256 → P-256,
//! 384 → P-384, 521 → P-521.

mod ecdsa;


pub use ecdsa::*;
use openssl::ec::EcGroup;
use openssl::ec::EcKey;
use openssl::nid::Nid;
use openssl::pkey::PKey;
use openssl::pkey::Private;
use openssl::pkey::Public;

use super::*;

/// Supported NIST prime curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcCurve {
    /// NIST P-224 (secp224r1).
    P224,
    /// NIST P-256 (secp256r1 / prime256v1).
    P256,
    /// NIST P-384 (secp384r1).
    P384,
    /// NIST P-521 (secp521r1).
    P521,
}

impl EcCurve {
    /// Maps a key size in bits onto a curve.
    pub fn from_key_size(bits: u32) -> Option<Self> {
        match bits {
            224 => Some(EcCurve::P224),
            256 => Some(EcCurve::P256),
            384 => Some(EcCurve::P384),
            521 => Some(EcCurve::P521),
            _ => None,
        }
    }

    /// Key size in bits.
    pub fn key_size_bits(&self) -> u32 {
        match self {
            EcCurve::P224 => 224,
            EcCurve::P256 => 256,
            EcCurve::P384 => 384,
            EcCurve::P521 => 521,
        }
    }

    /// Group order size in bytes; raw (undigested) ECDSA input is
    /// truncated to this length.
    pub fn order_size(&self) -> usize {
        match self {
            EcCurve::P224 => 28,
            EcCurve::P256 => 32,
            EcCurve::P384 => 48,
            EcCurve::P521 => 66,
        }
    }

    fn nid(&self) -> Nid {
        match self {
            EcCurve::P224 => Nid::SECP224R1,
            EcCurve::P256 => Nid::X9_62_PRIME256V1,
            EcCurve::P384 => Nid::SECP384R1,
            EcCurve::P521 => Nid::SECP521R1,
        }
    }

    fn from_nid(nid: Nid) -> Option<Self> {
        match nid {
            Nid::SECP224R1 => Some(EcCurve::P224),
            Nid::X9_62_PRIME256V1 => Some(EcCurve::P256),
            Nid::SECP384R1 => Some(EcCurve::P384),
            Nid::SECP521R1 => Some(EcCurve::P521),
            _ => None,
        }
    }
}

/// EC private key bound to one of the supported curves.
#[derive(Clone, Debug)]
pub struct EcPrivateKey {
    key: PKey<Private>,
    curve: EcCurve,
}

/// EC public key bound to one of the supported curves.
#[derive(Clone, Debug)]
pub struct EcPublicKey {
    key: PKey<Public>,
    curve: EcCurve,
}

impl EcPrivateKey {
    /// Generates a key pair on the given curve.
    pub fn generate(curve: EcCurve) -> Result<Self, CryptoError> {
        let group =
            EcGroup::from_curve_name(curve.nid()).map_err(|_| CryptoError::EccKeyGenError)?;
        let ec = EcKey::generate(&group).map_err(|_| CryptoError::EccKeyGenError)?;
        let key = PKey::from_ec_key(ec).map_err(|_| CryptoError::EccKeyGenError)?;
        Ok(Self { key, curve })
    }

    /// Imports an EC private key from PKCS#8 DER, recovering the curve
    /// from the encoded parameters.
    ///
    /// # Errors
    ///
    /// `CryptoError::EccKeyImportError` for unparseable or non-EC
    /// material, `CryptoError::EccUnsupportedCurve` for a curve outside
    /// the supported set.
    pub fn from_pkcs8(der: &[u8]) -> Result<Self, CryptoError> {
        let key =
            PKey::private_key_from_pkcs8(der).map_err(|_| CryptoError::EccKeyImportError)?;
        let ec = key.ec_key().map_err(|_| CryptoError::EccKeyImportError)?;
        let nid = ec
            .group()
            .curve_name()
            .ok_or(CryptoError::EccUnsupportedCurve)?;
        let curve = EcCurve::from_nid(nid).ok_or(CryptoError::EccUnsupportedCurve)?;
        Ok(Self { key, curve })
    }

    /// Exports the private key as PKCS#8 DER.
    pub fn to_pkcs8(&self) -> Result<Vec<u8>, CryptoError> {
        self.key
            .private_key_to_pkcs8()
            .map_err(|_| CryptoError::EccKeyExportError)
    }

    /// Exports the public half as X.509 SubjectPublicKeyInfo DER.
    pub fn public_key_der(&self) -> Result<Vec<u8>, CryptoError> {
        self.key
            .public_key_to_der()
            .map_err(|_| CryptoError::EccKeyExportError)
    }

    /// Derives a standalone public key.
    pub fn public_key(&self) -> Result<EcPublicKey, CryptoError> {
        let der = self.public_key_der()?;
        EcPublicKey::from_der(&der)
    }

    /// The curve this key lives on.
    pub fn curve(&self) -> EcCurve {
        self.curve
    }

    pub(crate) fn ec_key(&self) -> Result<EcKey<Private>, CryptoError> {
        self.key.ec_key().map_err(|_| CryptoError::EccKeyImportError)
    }
}

impl EcPublicKey {
    /// Imports an EC public key from X.509 SubjectPublicKeyInfo DER.
    pub fn from_der(der: &[u8]) -> Result<Self, CryptoError> {
        let key = PKey::public_key_from_der(der).map_err(|_| CryptoError::EccKeyImportError)?;
        let ec = key.ec_key().map_err(|_| CryptoError::EccKeyImportError)?;
        let nid = ec
            .group()
            .curve_name()
            .ok_or(CryptoError::EccUnsupportedCurve)?;
        let curve = EcCurve::from_nid(nid).ok_or(CryptoError::EccUnsupportedCurve)?;
        Ok(Self { key, curve })
    }

    /// The curve this key lives on.
    pub fn curve(&self) -> EcCurve {
        self.curve
    }

    pub(crate) fn ec_key(&self) -> Result<EcKey<Public>, CryptoError> {
        self.key.ec_key().map_err(|_| CryptoError::EccKeyImportError)
    }
}
