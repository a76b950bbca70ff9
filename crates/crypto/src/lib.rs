// Copyright (C) Microsoft Corporation. All rights reserved.

//! Cryptographic primitive library for the local key-management service.
//!
//! This crate wraps the OpenSSL primitives that the key-management core
//! consumes, presenting uniform construction and streaming semantics:
//!
//! - **AES**: ECB, CBC and CTR block/stream modes plus GCM and OCB AEAD
//! - **RSA**: key management, signing (NONE/PKCS#1 v1.5/PSS) and
//!   encryption (NONE/PKCS#1 v1.5/OAEP) paddings
//! - **ECDSA**: NIST curves P-224, P-256, P-384 and P-521
//! - **HMAC**: SHA-1 through SHA-512
//! - **HKDF**: deterministic key derivation for sealing keys
//! - **RNG**: process-wide randomness with caller entropy mixing

mod aes;
mod ecc;
mod hash;
mod hmac;
mod kdf;
mod rand;
mod rsa;

pub use aes::*;
pub use ecc::*;
pub use hash::*;
pub use hmac::*;
pub use kdf::*;
pub use rand::*;
pub use rsa::*;
use thiserror::Error;

/// Error type for all cryptographic operations in this crate.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoError {
    // AES-related errors
    /// AES key size is invalid for the specified algorithm.
    #[error("AES invalid key size")]
    AesInvalidKeySize,
    /// AES initialization vector size is invalid.
    #[error("AES invalid IV size")]
    AesInvalidIvSize,
    /// AES input is not aligned to the cipher block size.
    #[error("AES invalid data size")]
    AesDataSizeError,
    /// General AES operation failure.
    #[error("AES operation failed")]
    AesError,
    /// AES encryption operation failed.
    #[error("AES encryption failed")]
    AesEncryptError,
    /// AES decryption operation failed.
    #[error("AES decryption failed")]
    AesDecryptError,

    // AEAD errors
    /// AES-GCM IV length is invalid.
    #[error("AES-GCM invalid IV length")]
    GcmInvalidIvLength,
    /// AES-GCM tag length is invalid.
    #[error("AES-GCM invalid tag length")]
    GcmInvalidTagLength,
    /// AES-GCM encryption operation failed.
    #[error("AES-GCM encryption failed")]
    GcmEncryptionFailed,
    /// AES-GCM decryption or tag verification failed.
    #[error("AES-GCM decryption failed")]
    GcmDecryptionFailed,
    /// AES-OCB encryption operation failed.
    #[error("AES-OCB encryption failed")]
    OcbEncryptionFailed,
    /// AES-OCB decryption or tag verification failed.
    #[error("AES-OCB decryption failed")]
    OcbDecryptionFailed,

    // Random number generation errors
    /// Random number generation operation failed.
    #[error("Random number generation failed")]
    RngError,

    // Hash/HMAC errors
    /// Hashing operation failed.
    #[error("Hashing operation failed")]
    HashError,
    /// HMAC computation failed.
    #[error("HMAC operation failed")]
    HmacError,

    // HKDF errors
    /// HKDF key derivation failed.
    #[error("HKDF operation failed")]
    HkdfError,

    // RSA-related errors
    /// General RSA operation failure.
    #[error("RSA operation failed")]
    RsaError,
    /// RSA key generation failed.
    #[error("RSA key generation failed")]
    RsaKeyGenError,
    /// RSA key import failed.
    #[error("RSA key import failed")]
    RsaKeyImportError,
    /// RSA key export failed.
    #[error("RSA key export failed")]
    RsaKeyExportError,
    /// RSA public exponent does not fit the supported range.
    #[error("RSA invalid public exponent")]
    RsaInvalidExponent,
    /// RSA signing operation failed.
    #[error("RSA sign failed")]
    RsaSignError,
    /// RSA verification operation failed.
    #[error("RSA verify failed")]
    RsaVerifyError,
    /// RSA encryption operation failed.
    #[error("RSA encryption failed")]
    RsaEncryptError,
    /// RSA decryption operation failed.
    #[error("RSA decryption failed")]
    RsaDecryptError,

    // ECC-related errors
    /// Elliptic curve is not one of the supported NIST curves.
    #[error("ECC unsupported curve")]
    EccUnsupportedCurve,
    /// ECC key generation failed.
    #[error("ECC key generation failed")]
    EccKeyGenError,
    /// ECC key import failed.
    #[error("ECC key import failed")]
    EccKeyImportError,
    /// ECC key export failed.
    #[error("ECC key export failed")]
    EccKeyExportError,
    /// ECDSA signing operation failed.
    #[error("ECDSA sign failed")]
    EccSignError,
    /// ECDSA verification operation failed.
    #[error("ECDSA verify failed")]
    EccVerifyError,
}
