// Copyright (C) Microsoft Corporation. All rights reserved.

//! HMAC operations.
//!
//! The digest is a fixed property of the key; the MAC length comes from
//! begin params and may truncate the natural output down to 64 bits.
//! A mac-length authorization stored on the key itself is deliberately
//! ignored.

use lkms_crypto::HmacAlgo;
use lkms_crypto::HmacKey;
use zeroize::Zeroizing;

use super::CipherOperation;
use crate::authset::AuthorizationSet;
use crate::error::ErrCodeMapper;
use crate::error::ErrorCode;
use crate::policy;
use crate::tag::Tag;
use crate::types::Digest;
use crate::types::Purpose;

const MIN_HMAC_LENGTH_BITS: u32 = 64;

/// Builds an HMAC sign or verify operation.
pub(crate) fn new_hmac_operation(
    key: HmacKey,
    purpose: Purpose,
    key_auths: &AuthorizationSet,
    begin_params: &AuthorizationSet,
) -> Result<Box<dyn CipherOperation>, ErrorCode> {
    // The key's single non-NONE digest, fixed at generation time.
    let digest = key_auths
        .all_enums(Tag::Digest)
        .into_iter()
        .filter_map(Digest::from_value)
        .find(|d| *d != Digest::None)
        .ok_or(ErrorCode::UnsupportedDigest)?;
    if let Some(requested) = begin_params.get_enum(Tag::Digest) {
        if requested != digest as u32 {
            Err(ErrorCode::IncompatibleDigest)?;
        }
    }
    let hash = digest.hash_algo().ok_or(ErrorCode::UnsupportedDigest)?;

    let mac_bits = begin_params
        .get_uint(Tag::MacLength)
        .ok_or(ErrorCode::UnsupportedMacLength)?;
    let mac_len =
        policy::check_mac_length(mac_bits, MIN_HMAC_LENGTH_BITS, (hash.size() * 8) as u32)?;

    Ok(Box::new(HmacOp {
        algo: HmacAlgo::new(hash),
        key,
        mac_len,
        verifying: purpose == Purpose::Verify,
        buffer: Zeroizing::new(Vec::new()),
    }))
}

/// HMAC sign/verify job.
struct HmacOp {
    algo: HmacAlgo,
    key: HmacKey,
    mac_len: usize,
    verifying: bool,
    buffer: Zeroizing<Vec<u8>>,
}

impl CipherOperation for HmacOp {
    fn update(&mut self, input: &[u8]) -> Result<(usize, Vec<u8>), ErrorCode> {
        self.buffer.extend_from_slice(input);
        Ok((input.len(), Vec::new()))
    }

    fn finish(
        &mut self,
        signature: Option<&[u8]>,
        _out_params: &mut AuthorizationSet,
    ) -> Result<Vec<u8>, ErrorCode> {
        if self.verifying {
            let signature = signature.ok_or(ErrorCode::VerificationFailed)?;
            if signature.len() != self.mac_len {
                Err(ErrorCode::VerificationFailed)?;
            }
            let ok = self
                .algo
                .verify(&self.key, &self.buffer, signature)
                .map_code(ErrorCode::UnknownError)?;
            if !ok {
                Err(ErrorCode::VerificationFailed)?;
            }
            Ok(Vec::new())
        } else {
            let mut mac = self
                .algo
                .sign(&self.key, &self.buffer)
                .map_code(ErrorCode::UnknownError)?;
            mac.truncate(self.mac_len);
            Ok(mac)
        }
    }
}
