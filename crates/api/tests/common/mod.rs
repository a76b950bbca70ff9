// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Shared helpers for the end-to-end suites.

#![allow(dead_code)]

use lkms_api::Algorithm;
use lkms_api::AuthorizationSet;
use lkms_api::BlockMode;
use lkms_api::Digest;
use lkms_api::ErrorCode;
use lkms_api::KeyParam;
use lkms_api::PaddingMode;
use lkms_api::Purpose;
use lkms_api::SoftKeystore;
use lkms_api::Tag;

pub fn rsa_signing_key(bits: u32, exponent: u64, digest: Digest, padding: PaddingMode) -> AuthorizationSet {
    let mut params = AuthorizationSet::new();
    params.push(KeyParam::enumerated(Tag::Algorithm, Algorithm::Rsa as u32).unwrap());
    params.push(KeyParam::uint(Tag::KeySize, bits).unwrap());
    params.push(KeyParam::ulong(Tag::RsaPublicExponent, exponent).unwrap());
    params.push(KeyParam::enumerated(Tag::Purpose, Purpose::Sign as u32).unwrap());
    params.push(KeyParam::enumerated(Tag::Purpose, Purpose::Verify as u32).unwrap());
    params.push(KeyParam::enumerated(Tag::Digest, digest as u32).unwrap());
    params.push(KeyParam::enumerated(Tag::Padding, padding as u32).unwrap());
    params
}

pub fn rsa_encryption_key(bits: u32, exponent: u64, padding: PaddingMode) -> AuthorizationSet {
    let mut params = AuthorizationSet::new();
    params.push(KeyParam::enumerated(Tag::Algorithm, Algorithm::Rsa as u32).unwrap());
    params.push(KeyParam::uint(Tag::KeySize, bits).unwrap());
    params.push(KeyParam::ulong(Tag::RsaPublicExponent, exponent).unwrap());
    params.push(KeyParam::enumerated(Tag::Purpose, Purpose::Encrypt as u32).unwrap());
    params.push(KeyParam::enumerated(Tag::Purpose, Purpose::Decrypt as u32).unwrap());
    params.push(KeyParam::enumerated(Tag::Padding, padding as u32).unwrap());
    params
}

pub fn ec_signing_key(bits: u32, digest: Digest) -> AuthorizationSet {
    let mut params = AuthorizationSet::new();
    params.push(KeyParam::enumerated(Tag::Algorithm, Algorithm::Ec as u32).unwrap());
    params.push(KeyParam::uint(Tag::KeySize, bits).unwrap());
    params.push(KeyParam::enumerated(Tag::Purpose, Purpose::Sign as u32).unwrap());
    params.push(KeyParam::enumerated(Tag::Purpose, Purpose::Verify as u32).unwrap());
    params.push(KeyParam::enumerated(Tag::Digest, digest as u32).unwrap());
    params
}

pub fn aes_encryption_key(bits: u32, mode: BlockMode, padding: PaddingMode) -> AuthorizationSet {
    let mut params = AuthorizationSet::new();
    params.push(KeyParam::enumerated(Tag::Algorithm, Algorithm::Aes as u32).unwrap());
    params.push(KeyParam::uint(Tag::KeySize, bits).unwrap());
    params.push(KeyParam::enumerated(Tag::Purpose, Purpose::Encrypt as u32).unwrap());
    params.push(KeyParam::enumerated(Tag::Purpose, Purpose::Decrypt as u32).unwrap());
    params.push(KeyParam::enumerated(Tag::BlockMode, mode as u32).unwrap());
    params.push(KeyParam::enumerated(Tag::Padding, padding as u32).unwrap());
    params
}

pub fn hmac_key(bits: u32, digest: Digest) -> AuthorizationSet {
    let mut params = AuthorizationSet::new();
    params.push(KeyParam::enumerated(Tag::Algorithm, Algorithm::Hmac as u32).unwrap());
    params.push(KeyParam::uint(Tag::KeySize, bits).unwrap());
    params.push(KeyParam::enumerated(Tag::Purpose, Purpose::Sign as u32).unwrap());
    params.push(KeyParam::enumerated(Tag::Purpose, Purpose::Verify as u32).unwrap());
    params.push(KeyParam::enumerated(Tag::Digest, digest as u32).unwrap());
    params
}

pub fn digest_and_padding(digest: Digest, padding: PaddingMode) -> AuthorizationSet {
    let mut params = AuthorizationSet::new();
    params.push(KeyParam::enumerated(Tag::Digest, digest as u32).unwrap());
    params.push(KeyParam::enumerated(Tag::Padding, padding as u32).unwrap());
    params
}

pub fn block_mode_and_padding(mode: BlockMode, padding: PaddingMode) -> AuthorizationSet {
    let mut params = AuthorizationSet::new();
    params.push(KeyParam::enumerated(Tag::BlockMode, mode as u32).unwrap());
    params.push(KeyParam::enumerated(Tag::Padding, padding as u32).unwrap());
    params
}

/// Drives a complete begin/update/finish cycle.
///
/// Returns (begin out-params, finish out-params, concatenated output).
pub fn process_message(
    keystore: &SoftKeystore,
    purpose: Purpose,
    key_blob: &[u8],
    begin_params: &AuthorizationSet,
    update_params: &AuthorizationSet,
    input: &[u8],
    signature: Option<&[u8]>,
) -> Result<(AuthorizationSet, AuthorizationSet, Vec<u8>), ErrorCode> {
    let begin = keystore.begin(purpose, key_blob, begin_params)?;
    let mut output = Vec::new();

    let update = keystore.update(begin.handle, update_params, input)?;
    assert_eq!(update.input_consumed, input.len());
    output.extend_from_slice(&update.output);

    let finish = keystore.finish(begin.handle, &AuthorizationSet::new(), signature)?;
    output.extend_from_slice(&finish.output);
    Ok((begin.out_params, finish.out_params, output))
}

/// Signs `message` and returns the signature.
pub fn sign_message(
    keystore: &SoftKeystore,
    key_blob: &[u8],
    begin_params: &AuthorizationSet,
    message: &[u8],
) -> Result<Vec<u8>, ErrorCode> {
    let (_, _, signature) = process_message(
        keystore,
        Purpose::Sign,
        key_blob,
        begin_params,
        &AuthorizationSet::new(),
        message,
        None,
    )?;
    Ok(signature)
}

/// Verifies `signature` over `message`.
pub fn verify_message(
    keystore: &SoftKeystore,
    key_blob: &[u8],
    begin_params: &AuthorizationSet,
    message: &[u8],
    signature: &[u8],
) -> Result<(), ErrorCode> {
    process_message(
        keystore,
        Purpose::Verify,
        key_blob,
        begin_params,
        &AuthorizationSet::new(),
        message,
        Some(signature),
    )
    .map(|_| ())
}
