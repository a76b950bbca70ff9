// Copyright (C) Microsoft Corporation. All rights reserved.

//! Key objects: one material variant per algorithm family, plus the
//! generation and import contracts.

use lkms_crypto::AesKey;
use lkms_crypto::EcCurve;
use lkms_crypto::EcPrivateKey;
use lkms_crypto::HmacKey;
use lkms_crypto::RsaPrivateKey;
use zeroize::Zeroizing;

use crate::authset::AuthorizationSet;
use crate::authset::KeyParam;
use crate::error::ErrCodeMapper;
use crate::error::ErrorCode;
use crate::tag::Tag;
use crate::types::Algorithm;
use crate::types::Digest;
use crate::types::KeyFormat;

/// Key material, the secret half of a key object.
pub enum KeyMaterial {
    /// RSA private key.
    Rsa(RsaPrivateKey),
    /// EC private key.
    Ec(EcPrivateKey),
    /// AES raw key.
    Aes(AesKey),
    /// HMAC secret.
    Hmac(HmacKey),
}

/// The two authorization-set partitions returned at characteristics
/// time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyCharacteristics {
    /// Constraints a secure backend will enforce.
    pub hw_enforced: AuthorizationSet,
    /// Constraints the software layer checks.
    pub sw_enforced: AuthorizationSet,
}

impl KeyCharacteristics {
    /// Merged view of both partitions, for policy checks.
    pub fn all(&self) -> AuthorizationSet {
        let mut merged = self.hw_enforced.clone();
        merged.merge(&self.sw_enforced);
        merged
    }
}

impl KeyMaterial {
    /// The algorithm family of this material.
    pub fn algorithm(&self) -> Algorithm {
        match self {
            KeyMaterial::Rsa(_) => Algorithm::Rsa,
            KeyMaterial::Ec(_) => Algorithm::Ec,
            KeyMaterial::Aes(_) => Algorithm::Aes,
            KeyMaterial::Hmac(_) => Algorithm::Hmac,
        }
    }

    /// Intrinsic key size in bits.
    pub fn key_size_bits(&self) -> u32 {
        match self {
            KeyMaterial::Rsa(key) => key.bits() as u32,
            KeyMaterial::Ec(key) => key.curve().key_size_bits(),
            KeyMaterial::Aes(key) => key.bits() as u32,
            KeyMaterial::Hmac(key) => (key.size() * 8) as u32,
        }
    }

    /// Serializes the secret material for sealing: PKCS#8 DER for the
    /// asymmetric families, raw bytes for the symmetric ones.
    pub(crate) fn to_bytes(&self) -> Result<Zeroizing<Vec<u8>>, ErrorCode> {
        let bytes = match self {
            KeyMaterial::Rsa(key) => key.to_pkcs8().map_code(ErrorCode::UnknownError)?,
            KeyMaterial::Ec(key) => key.to_pkcs8().map_code(ErrorCode::UnknownError)?,
            KeyMaterial::Aes(key) => key.bytes().to_vec(),
            KeyMaterial::Hmac(key) => key.bytes().to_vec(),
        };
        Ok(Zeroizing::new(bytes))
    }

    /// Rebuilds material from its sealed serialization.
    pub(crate) fn from_bytes(algorithm: Algorithm, bytes: &[u8]) -> Result<Self, ErrorCode> {
        match algorithm {
            Algorithm::Rsa => Ok(KeyMaterial::Rsa(
                RsaPrivateKey::from_pkcs8(bytes).map_code(ErrorCode::InvalidKeyBlob)?,
            )),
            Algorithm::Ec => Ok(KeyMaterial::Ec(
                EcPrivateKey::from_pkcs8(bytes).map_code(ErrorCode::InvalidKeyBlob)?,
            )),
            Algorithm::Aes => Ok(KeyMaterial::Aes(
                AesKey::from_bytes(bytes).map_code(ErrorCode::InvalidKeyBlob)?,
            )),
            Algorithm::Hmac => Ok(KeyMaterial::Hmac(
                HmacKey::from_bytes(bytes).map_code(ErrorCode::InvalidKeyBlob)?,
            )),
        }
    }

    /// Generates fresh material as described by `params`.
    ///
    /// Enforces the generation contract: exactly one known algorithm, a
    /// key size valid for it, at least one purpose, an RSA public
    /// exponent where applicable, and digest combinations that make
    /// sense for the family.
    pub fn generate(params: &AuthorizationSet) -> Result<Self, ErrorCode> {
        let algorithm = required_algorithm(params)?;
        check_generation_params(params, algorithm)?;
        let key_size = params
            .get_uint(Tag::KeySize)
            .ok_or(ErrorCode::UnsupportedKeySize)?;

        match algorithm {
            Algorithm::Rsa => {
                if key_size == 0 || key_size % 8 != 0 {
                    Err(ErrorCode::UnsupportedKeySize)?;
                }
                let exponent = params
                    .get_ulong(Tag::RsaPublicExponent)
                    .ok_or(ErrorCode::InvalidArgument)?;
                let key = RsaPrivateKey::generate(key_size, exponent)
                    .map_code(ErrorCode::UnknownError)?;
                Ok(KeyMaterial::Rsa(key))
            }
            Algorithm::Ec => {
                let curve =
                    EcCurve::from_key_size(key_size).ok_or(ErrorCode::UnsupportedKeySize)?;
                let key = EcPrivateKey::generate(curve).map_code(ErrorCode::UnknownError)?;
                Ok(KeyMaterial::Ec(key))
            }
            Algorithm::Aes => {
                if !matches!(key_size, 128 | 192 | 256) {
                    Err(ErrorCode::UnsupportedKeySize)?;
                }
                let key = AesKey::generate(key_size as usize / 8)
                    .map_code(ErrorCode::UnknownError)?;
                Ok(KeyMaterial::Aes(key))
            }
            Algorithm::Hmac => {
                if key_size == 0 || key_size % 8 != 0 {
                    Err(ErrorCode::UnsupportedKeySize)?;
                }
                let key = HmacKey::generate(key_size as usize / 8)
                    .map_code(ErrorCode::UnknownError)?;
                Ok(KeyMaterial::Hmac(key))
            }
        }
    }

    /// Imports caller-supplied material.
    ///
    /// Re-derives the intrinsic parameters from the material and
    /// cross-checks any redundantly declared values; the returned set
    /// holds the derived params that were not declared, for inclusion in
    /// the key's characteristics.
    pub fn import(
        params: &AuthorizationSet,
        format: KeyFormat,
        data: &[u8],
    ) -> Result<(Self, AuthorizationSet), ErrorCode> {
        let algorithm = required_algorithm(params)?;
        check_generation_params(params, algorithm)?;

        let expected_format = match algorithm {
            Algorithm::Rsa | Algorithm::Ec => KeyFormat::Pkcs8,
            Algorithm::Aes | Algorithm::Hmac => KeyFormat::Raw,
        };
        if format != expected_format {
            Err(ErrorCode::UnsupportedKeyFormat)?;
        }

        let mut derived = AuthorizationSet::new();
        let material = match algorithm {
            Algorithm::Rsa => {
                let key =
                    RsaPrivateKey::from_pkcs8(data).map_code(ErrorCode::InvalidArgument)?;
                cross_check_uint(params, Tag::KeySize, key.bits() as u32, &mut derived)?;
                let exponent = key
                    .public_exponent()
                    .map_code(ErrorCode::ImportParameterMismatch)?;
                cross_check_ulong(params, Tag::RsaPublicExponent, exponent, &mut derived)?;
                KeyMaterial::Rsa(key)
            }
            Algorithm::Ec => {
                let key =
                    EcPrivateKey::from_pkcs8(data).map_code(ErrorCode::InvalidArgument)?;
                cross_check_uint(params, Tag::KeySize, key.curve().key_size_bits(), &mut derived)?;
                KeyMaterial::Ec(key)
            }
            Algorithm::Aes => {
                if !matches!(data.len(), 16 | 24 | 32) {
                    Err(ErrorCode::UnsupportedKeySize)?;
                }
                let key = AesKey::from_bytes(data).map_code(ErrorCode::UnsupportedKeySize)?;
                cross_check_uint(params, Tag::KeySize, key.bits() as u32, &mut derived)?;
                KeyMaterial::Aes(key)
            }
            Algorithm::Hmac => {
                if data.is_empty() {
                    Err(ErrorCode::UnsupportedKeySize)?;
                }
                let key = HmacKey::from_bytes(data).map_code(ErrorCode::UnsupportedKeySize)?;
                cross_check_uint(params, Tag::KeySize, (key.size() * 8) as u32, &mut derived)?;
                KeyMaterial::Hmac(key)
            }
        };
        Ok((material, derived))
    }

    /// Exports the public half as X.509 SubjectPublicKeyInfo DER.
    ///
    /// Symmetric material has no exportable form.
    pub fn export_public(&self) -> Result<Vec<u8>, ErrorCode> {
        match self {
            KeyMaterial::Rsa(key) => key.public_key_der().map_code(ErrorCode::UnknownError),
            KeyMaterial::Ec(key) => key.public_key_der().map_code(ErrorCode::UnknownError),
            KeyMaterial::Aes(_) | KeyMaterial::Hmac(_) => Err(ErrorCode::UnsupportedKeyFormat),
        }
    }
}

fn required_algorithm(params: &AuthorizationSet) -> Result<Algorithm, ErrorCode> {
    let value = params
        .get_enum(Tag::Algorithm)
        .ok_or(ErrorCode::UnsupportedAlgorithm)?;
    Algorithm::from_value(value).ok_or(ErrorCode::UnsupportedAlgorithm)
}

/// Parameter checks shared by generation and import.
fn check_generation_params(
    params: &AuthorizationSet,
    algorithm: Algorithm,
) -> Result<(), ErrorCode> {
    // A key that can never be used is a caller mistake.
    if !params.contains_tag(Tag::Purpose) {
        Err(ErrorCode::UnsupportedPurpose)?;
    }

    let digests: Vec<Digest> = params
        .all_enums(Tag::Digest)
        .into_iter()
        .map(|v| Digest::from_value(v).ok_or(ErrorCode::UnsupportedDigest))
        .collect::<Result<_, _>>()?;

    match algorithm {
        Algorithm::Hmac => {
            // The MAC digest is a fixed property of an HMAC key.
            let real: Vec<&Digest> = digests.iter().filter(|d| **d != Digest::None).collect();
            if real.len() != 1 {
                Err(ErrorCode::UnsupportedDigest)?;
            }
        }
        Algorithm::Aes => {
            if digests.iter().any(|d| *d != Digest::None) {
                Err(ErrorCode::UnsupportedDigest)?;
            }
        }
        Algorithm::Rsa | Algorithm::Ec => {}
    }
    Ok(())
}

fn cross_check_uint(
    params: &AuthorizationSet,
    tag: Tag,
    derived: u32,
    additions: &mut AuthorizationSet,
) -> Result<(), ErrorCode> {
    match params.get_uint(tag) {
        Some(declared) if declared != derived => Err(ErrorCode::ImportParameterMismatch),
        Some(_) => Ok(()),
        None => {
            additions.push(KeyParam::uint(tag, derived)?);
            Ok(())
        }
    }
}

fn cross_check_ulong(
    params: &AuthorizationSet,
    tag: Tag,
    derived: u64,
    additions: &mut AuthorizationSet,
) -> Result<(), ErrorCode> {
    match params.get_ulong(tag) {
        Some(declared) if declared != derived => Err(ErrorCode::ImportParameterMismatch),
        Some(_) => Ok(()),
        None => {
            additions.push(KeyParam::ulong(tag, derived)?);
            Ok(())
        }
    }
}
