// Copyright (C) Microsoft Corporation. All rights reserved.

//! ECDSA operations. The whole message is buffered; with digest NONE
//! the primitive truncates it to the curve order size at finish.

use lkms_crypto::EcPrivateKey;
use lkms_crypto::EcPublicKey;
use lkms_crypto::EcdsaSigner;
use zeroize::Zeroizing;

use super::CipherOperation;
use crate::authset::AuthorizationSet;
use crate::error::ErrCodeMapper;
use crate::error::ErrorCode;
use crate::policy;
use crate::types::Purpose;

/// Builds an EC sign or verify operation.
pub(crate) fn new_ec_operation(
    key: EcPrivateKey,
    purpose: Purpose,
    key_auths: &AuthorizationSet,
    begin_params: &AuthorizationSet,
) -> Result<Box<dyn CipherOperation>, ErrorCode> {
    let digest = policy::resolve_digest(begin_params, key_auths, false)?;
    Ok(Box::new(EcSignOp {
        signer: EcdsaSigner::new(digest.hash_algo()),
        public: if purpose == Purpose::Verify {
            Some(key.public_key().map_code(ErrorCode::UnknownError)?)
        } else {
            None
        },
        key,
        buffer: Zeroizing::new(Vec::new()),
    }))
}

/// ECDSA sign/verify job. A `public` key present marks verification.
struct EcSignOp {
    key: EcPrivateKey,
    public: Option<EcPublicKey>,
    signer: EcdsaSigner,
    buffer: Zeroizing<Vec<u8>>,
}

impl CipherOperation for EcSignOp {
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
