// Copyright (C) Microsoft Corporation. All rights reserved.

//! RSA operations.
//!
//! Asymmetric primitives work on complete messages, so these operations
//! accumulate their input and run the primitive at finish time. Length
//! rules are enforced lazily: update always consumes, finish applies the
//! padding-specific bounds.

use lkms_crypto::RsaCipher;
use lkms_crypto::RsaEncPadding;
use lkms_crypto::RsaPrivateKey;
use lkms_crypto::RsaPublicKey;
use lkms_crypto::RsaSignPadding;
use lkms_crypto::RsaSigner;
use zeroize::Zeroizing;

use super::CipherOperation;
use crate::authset::AuthorizationSet;
use crate::error::ErrCodeMapper;
use crate::error::ErrorCode;
use crate::policy;
use crate::types::Digest;
use crate::types::PaddingMode;
use crate::types::Purpose;

/// Builds an RSA operation for any of the four purposes.
pub(crate) fn new_rsa_operation(
    key: RsaPrivateKey,
    purpose: Purpose,
    key_auths: &AuthorizationSet,
    begin_params: &AuthorizationSet,
) -> Result<Box<dyn CipherOperation>, ErrorCode> {
    match purpose {
        Purpose::Sign | Purpose::Verify => {
            let digest = policy::resolve_digest(begin_params, key_auths, true)?;
            let padding = policy::resolve_padding(
                begin_params,
                key_auths,
                &[
                    PaddingMode::None,
                    PaddingMode::RsaPkcs1Sign,
                    PaddingMode::RsaPss,
                ],
                true,
            )?;
            if padding == PaddingMode::RsaPss {
                // PSS needs room for the digest, eight bytes of salt and
                // two bytes of overhead.
                let hash = digest.hash_algo().ok_or(ErrorCode::IncompatibleDigest)?;
                if key.size() < hash.size() + 10 {
                    Err(ErrorCode::IncompatibleDigest)?;
                }
            }
            let sign_padding = match padding {
                PaddingMode::None => RsaSignPadding::None,
                PaddingMode::RsaPkcs1Sign => RsaSignPadding::Pkcs1,
                PaddingMode::RsaPss => RsaSignPadding::Pss,
                _ => Err(ErrorCode::UnsupportedPaddingMode)?,
            };
            Ok(Box::new(RsaSignOp {
                signer: RsaSigner::new(sign_padding, digest.hash_algo()),
                public: if purpose == Purpose::Verify {
                    Some(key.public_key().map_code(ErrorCode::UnknownError)?)
                } else {
                    None
                },
                key,
                buffer: Zeroizing::new(Vec::new()),
            }))
        }
        Purpose::Encrypt | Purpose::Decrypt => {
            let padding = policy::resolve_padding(
                begin_params,
                key_auths,
                &[
                    PaddingMode::None,
                    PaddingMode::RsaOaep,
                    PaddingMode::RsaPkcs1Encrypt,
                ],
                true,
            )?;
            let digest = match begin_params.get_enum(crate::tag::Tag::Digest) {
                Some(value) => Digest::from_value(value).ok_or(ErrorCode::UnsupportedDigest)?,
                None => Digest::None,
            };
            let enc_padding = match padding {
                PaddingMode::None => RsaEncPadding::None,
                PaddingMode::RsaOaep => RsaEncPadding::Oaep,
                PaddingMode::RsaPkcs1Encrypt => RsaEncPadding::Pkcs1,
                _ => Err(ErrorCode::UnsupportedPaddingMode)?,
            };
            Ok(Box::new(RsaCipherOp {
                cipher: RsaCipher::new(enc_padding, digest.hash_algo()),
                public: if purpose == Purpose::Encrypt {
                    Some(key.public_key().map_code(ErrorCode::UnknownError)?)
                } else {
                    None
                },
                key,
                encrypting: purpose == Purpose::Encrypt,
                buffer: Zeroizing::new(Vec::new()),
            }))
        }
    }
}

/// RSA sign/verify job. A `public` key present marks verification.
struct RsaSignOp {
    key: RsaPrivateKey,
    public: Option<RsaPublicKey>,
    signer: RsaSigner,
    buffer: Zeroizing<Vec<u8>>,
}

impl CipherOperation for RsaSignOp {
    fn update(&mut self, input: &[u8]) -> Result<(usize, Vec<u8>), ErrorCode> {
        self.buffer.extend_from_slice(input);
        Ok((input.len(), Vec::new()))
    }

    fn finish(
        &mut self,
        signature: Option<&[u8]>,
        _out_params: &mut AuthorizationSet,
    ) -> Result<Vec<u8>, ErrorCode> {
        match &self.public {
            None => self
                .signer
                .sign(&self.key, &self.buffer)
                .map_code(ErrorCode::UnknownError),
            Some(public) => {
                let signature = signature.ok_or(ErrorCode::VerificationFailed)?;
                let ok = self
                    .signer
                    .verify(public, &self.buffer, signature)
                    .map_code(ErrorCode::UnknownError)?;
                if !ok {
                    Err(ErrorCode::VerificationFailed)?;
                }
                Ok(Vec::new())
            }
        }
    }
}

/// RSA encrypt/decrypt job.
struct RsaCipherOp {
    key: RsaPrivateKey,
    public: Option<RsaPublicKey>,
    cipher: RsaCipher,
    encrypting: bool,
    buffer: Zeroizing<Vec<u8>>,
}

impl CipherOperation for RsaCipherOp {
    fn update(&mut self, input: &[u8]) -> Result<(usize, Vec<u8>), ErrorCode> {
        self.buffer.extend_from_slice(input);
        Ok((input.len(), Vec::new()))
    }

    fn finish(
        &mut self,
        _signature: Option<&[u8]>,
        _out_params: &mut AuthorizationSet,
    ) -> Result<Vec<u8>, ErrorCode> {
        let key_bytes = self.key.size();
        if self.encrypting {
            match self.cipher.max_input(key_bytes) {
                // Unpadded RSA operates on exactly one modulus-sized block.
                None => {
                    if self.buffer.len() != key_bytes {
                        Err(ErrorCode::InvalidInputLength)?;
                    }
                }
                Some(max) => {
                    if self.buffer.len() > max {
                        Err(ErrorCode::InvalidInputLength)?;
                    }
                }
            }
            let public = self.public.as_ref().ok_or(ErrorCode::UnknownError)?;
            self.cipher
                .encrypt(public, &self.buffer)
                .map_code(ErrorCode::UnknownError)
        } else {
            if self.buffer.len() != key_bytes {
                Err(ErrorCode::InvalidInputLength)?;
            }
            let plaintext = self
                .cipher
                .decrypt(&self.key, &self.buffer)
                .map_code(ErrorCode::UnknownError)?;
            Ok(plaintext.to_vec())
        }
    }
}
