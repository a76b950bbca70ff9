// Copyright (C) Microsoft Corporation. All rights reserved.

//! AES operations: ECB/CBC/CTR block and stream jobs plus the GCM AEAD
//! job with incremental associated data.

use lkms_crypto::AesCipher;
use lkms_crypto::AesGcmContext;
use lkms_crypto::AesKey;
use lkms_crypto::Direction;
use lkms_crypto::AES_BLOCK_SIZE;
use lkms_crypto::GCM_NONCE_SIZE;

use super::CipherOperation;
use crate::authset::AuthorizationSet;
use crate::authset::KeyParam;
use crate::error::ErrCodeMapper;
use crate::error::ErrorCode;
use crate::policy;
use crate::tag::Tag;
use crate::types::BlockMode;
use crate::types::PaddingMode;
use crate::types::Purpose;

const GCM_MIN_MAC_BITS: u32 = 96;
const GCM_MAX_MAC_BITS: u32 = 128;
const GCM_MIN_TAG_BYTES: usize = 12;
const GCM_MAX_TAG_BYTES: usize = 16;

/// Builds an AES operation for the resolved block mode, generating a
/// nonce into `out_params` where the mode needs one.
pub(crate) fn new_aes_operation(
    key: AesKey,
    purpose: Purpose,
    key_auths: &AuthorizationSet,
    begin_params: &AuthorizationSet,
    out_params: &mut AuthorizationSet,
) -> Result<Box<dyn CipherOperation>, ErrorCode> {
    let mode = policy::resolve_block_mode(begin_params, key_auths)?;
    let direction = match purpose {
        Purpose::Encrypt => Direction::Encrypt,
        Purpose::Decrypt => Direction::Decrypt,
        _ => Err(ErrorCode::UnsupportedPurpose)?,
    };

    match mode {
        BlockMode::Ecb | BlockMode::Cbc => {
            let padding = policy::resolve_padding(
                begin_params,
                key_auths,
                &[PaddingMode::None, PaddingMode::Pkcs7],
                false,
            )?;
            let pkcs7 = padding == PaddingMode::Pkcs7;
            let cipher = match mode {
                BlockMode::Ecb => AesCipher::ecb(&key, direction, pkcs7)
                    .map_code(ErrorCode::UnknownError)?,
                _ => {
                    let nonce = policy::resolve_nonce(
                        purpose,
                        begin_params,
                        key_auths,
                        AES_BLOCK_SIZE,
                        out_params,
                    )?;
                    AesCipher::cbc(&key, direction, &nonce, pkcs7)
                        .map_code(ErrorCode::UnknownError)?
                }
            };
            Ok(Box::new(AesBlockOp {
                cipher,
                pkcs7,
                // A block mode without padding only accepts whole blocks.
                require_alignment: !pkcs7,
                decrypting: direction == Direction::Decrypt,
                total_input: 0,
            }))
        }
        BlockMode::Ctr => {
            policy::resolve_padding(begin_params, key_auths, &[PaddingMode::None], false)?;
            let nonce = policy::resolve_nonce(
                purpose,
                begin_params,
                key_auths,
                AES_BLOCK_SIZE,
                out_params,
            )?;
            let cipher =
                AesCipher::ctr(&key, direction, &nonce).map_code(ErrorCode::UnknownError)?;
            Ok(Box::new(AesBlockOp {
                cipher,
                pkcs7: false,
                require_alignment: false,
                decrypting: direction == Direction::Decrypt,
                total_input: 0,
            }))
        }
        BlockMode::Gcm => {
            policy::resolve_padding(begin_params, key_auths, &[PaddingMode::None], false)?;
            let mac_bits = begin_params
                .get_uint(Tag::MacLength)
                .ok_or(ErrorCode::UnsupportedMacLength)?;
            let mac_len = policy::check_mac_length(mac_bits, GCM_MIN_MAC_BITS, GCM_MAX_MAC_BITS)?;
            let nonce = policy::resolve_nonce(
                purpose,
                begin_params,
                key_auths,
                GCM_NONCE_SIZE,
                out_params,
            )?;
            let ctx = match direction {
                Direction::Encrypt => AesGcmContext::encrypt(&key, &nonce),
                Direction::Decrypt => AesGcmContext::decrypt(&key, &nonce),
            }
            .map_code(ErrorCode::UnknownError)?;
            Ok(Box::new(AesGcmOp {
                ctx,
                decrypting: direction == Direction::Decrypt,
                mac_len,
                tag: None,
                data_started: false,
            }))
        }
    }
}

/// ECB, CBC or CTR job.
struct AesBlockOp {
    cipher: AesCipher,
    pkcs7: bool,
    require_alignment: bool,
    decrypting: bool,
    total_input: usize,
}

impl CipherOperation for AesBlockOp {
    fn update(&mut self, input: &[u8]) -> Result<(usize, Vec<u8>), ErrorCode> {
        let mut output = vec![0u8; input.len() + AES_BLOCK_SIZE];
        let count = self
            .cipher
            .update(input, &mut output)
            .map_code(ErrorCode::UnknownError)?;
        output.truncate(count);
        self.total_input += input.len();
        Ok((input.len(), output))
    }

    fn finish(
        &mut self,
        _signature: Option<&[u8]>,
        _out_params: &mut AuthorizationSet,
    ) -> Result<Vec<u8>, ErrorCode> {
        if self.require_alignment && self.total_input % AES_BLOCK_SIZE != 0 {
            Err(ErrorCode::InvalidInputLength)?;
        }
        let mut output = vec![0u8; 2 * AES_BLOCK_SIZE];
        match self.cipher.finalize(&mut output) {
            Ok(count) => {
                output.truncate(count);
                Ok(output)
            }
            // A failing final block on padded decryption means the
            // padding did not check out.
            Err(err) if self.pkcs7 && self.decrypting => {
                tracing::error!("AES padded finalize failed: {:?}", err);
                Err(ErrorCode::InvalidArgument)
            }
            Err(err) => {
                tracing::error!("AES finalize failed: {:?}", err);
                Err(ErrorCode::UnknownError)
            }
        }
    }
}

/// GCM AEAD job.
struct AesGcmOp {
    ctx: AesGcmContext,
    decrypting: bool,
    mac_len: usize,
    tag: Option<Vec<u8>>,
    data_started: bool,
}

impl CipherOperation for AesGcmOp {
    fn update_aad(&mut self, aad: &[u8]) -> Result<(), ErrorCode> {
        // GCM commits to the associated data before the first cipher
        // byte; late AAD cannot be authenticated.
        if self.data_started {
            Err(ErrorCode::InvalidArgument)?;
        }
        self.ctx.update_aad(aad).map_code(ErrorCode::UnknownError)
    }

    fn supply_tag(&mut self, tag: &[u8]) -> Result<(), ErrorCode> {
        if !self.decrypting {
            return Ok(());
        }
        if tag.len() < GCM_MIN_TAG_BYTES || tag.len() > GCM_MAX_TAG_BYTES {
            Err(ErrorCode::UnsupportedMacLength)?;
        }
        self.tag = Some(tag.to_vec());
        Ok(())
    }

    fn update(&mut self, input: &[u8]) -> Result<(usize, Vec<u8>), ErrorCode> {
        if !input.is_empty() {
            self.data_started = true;
        }
        let mut output = vec![0u8; input.len() + AES_BLOCK_SIZE];
        let count = self
            .ctx
            .update(input, &mut output)
            .map_code(ErrorCode::UnknownError)?;
        output.truncate(count);
        Ok((input.len(), output))
    }

    fn finish(
        &mut self,
        _signature: Option<&[u8]>,
        out_params: &mut AuthorizationSet,
    ) -> Result<Vec<u8>, ErrorCode> {
        if self.decrypting {
            match self.tag.take() {
                None => Err(ErrorCode::VerificationFailed),
                Some(tag) => {
                    self.ctx
                        .set_tag(&tag)
                        .map_code(ErrorCode::VerificationFailed)?;
                    self.ctx
                        .finish(None)
                        .map_code(ErrorCode::VerificationFailed)?;
                    Ok(Vec::new())
                }
            }
        } else {
            let mut tag = vec![0u8; self.mac_len];
            self.ctx
                .finish(Some(&mut tag))
                .map_code(ErrorCode::UnknownError)?;
            out_params.push(KeyParam::bytes(Tag::AeadTag, tag)?);
            Ok(Vec::new())
        }
    }
}
