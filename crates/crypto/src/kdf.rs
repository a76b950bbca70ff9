// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! HKDF key derivation (RFC 5869), extract-and-expand.

use openssl::md::Md;
use openssl::pkey::Id;
use openssl::pkey_ctx::PkeyCtx;

use super::*;

/// HKDF-SHA256 extract-and-expand.
pub struct Hkdf;

impl Hkdf {
    /// Derives `okm.len()` bytes from `ikm` with the given salt and info.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::HkdfError` if the OpenSSL derivation fails.
    pub fn sha256(
        ikm: &[u8],
        salt: &[u8],
        info: &[u8],
        okm: &mut [u8],
    ) -> Result<(), CryptoError> {
        let mut ctx = PkeyCtx::new_id(Id::HKDF).map_err(|_| CryptoError::HkdfError)?;
        ctx.derive_init().map_err(|_| CryptoError::HkdfError)?;
        ctx.set_hkdf_md(Md::sha256())
            .map_err(|_| CryptoError::HkdfError)?;
        ctx.set_hkdf_key(ikm).map_err(|_| CryptoError::HkdfError)?;
        ctx.set_hkdf_salt(salt).map_err(|_| CryptoError::HkdfError)?;
        ctx.add_hkdf_info(info).map_err(|_| CryptoError::HkdfError)?;
        ctx.derive(Some(okm)).map_err(|_| CryptoError::HkdfError)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hkdf_rfc5869_case1() {
        // RFC 5869 A.1
        let ikm = [0x0bu8; 22];
        let salt = hex::decode("000102030405060708090a0b0c").unwrap();
        let info = hex::decode("f0f1f2f3f4f5f6f7f8f9").unwrap();
        let mut okm = [0u8; 42];
        Hkdf::sha256(&ikm, &salt, &info, &mut okm).expect("hkdf failed");
        assert_eq!(
            hex::encode(okm),
            "3cb25f25faacd57a90434f64d0362f2a2d2d0a90cf1a5a4c5db02d56ecc4c5bf34007208d5b887185865"
        );
    }

    #[test]
    fn test_hkdf_is_deterministic() {
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        Hkdf::sha256(b"root", b"salt", b"info", &mut a).unwrap();
        Hkdf::sha256(b"root", b"salt", b"info", &mut b).unwrap();
        assert_eq!(a, b);
    }
}
