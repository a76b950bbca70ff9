// Copyright (C) Microsoft Corporation. All rights reserved.

//! The policy check engine.
//!
//! Validates requested operation parameters against a key's stored
//! authorizations, and decides the hardware/software split of freshly
//! minted characteristics. Checks run in a fixed order so that the most
//! specific error wins: purpose membership, then parameter membership,
//! then nonce and MAC-length rules. The hidden-tag binding needs no code
//! here; the blob authenticator enforces it.

use lkms_crypto::Rng;

use crate::authset::AuthorizationSet;
use crate::authset::KeyParam;
use crate::error::ErrCodeMapper;
use crate::error::ErrorCode;
use crate::hardware::HardwareBackend;
use crate::key::KeyCharacteristics;
use crate::tag::Tag;
use crate::types::Algorithm;
use crate::types::BlockMode;
use crate::types::Digest;
use crate::types::PaddingMode;
use crate::types::Purpose;

/// Begin-time purpose enforcement.
///
/// The key's own purpose list is consulted first, so a key that was never
/// authorized for the request fails `IncompatiblePurpose` even when the
/// algorithm could not perform it anyway; a purpose the algorithm does
/// not define at all then fails `UnsupportedPurpose`.
pub(crate) fn check_purpose(
    algorithm: Algorithm,
    purpose: Purpose,
    key_auths: &AuthorizationSet,
) -> Result<(), ErrorCode> {
    let authorized = key_auths
        .all_enums(Tag::Purpose)
        .into_iter()
        .any(|value| Purpose::from_value(value) == Some(purpose));
    if !authorized {
        Err(ErrorCode::IncompatiblePurpose)?;
    }
    if !algorithm.supports_purpose(purpose) {
        Err(ErrorCode::UnsupportedPurpose)?;
    }
    Ok(())
}

/// Resolves the digest for the operation from begin params.
///
/// `required` callers (RSA) fail `UnsupportedDigest` when the param is
/// absent; others default to `Digest::None`. The resolved value must be
/// a member of the key's digest set.
pub(crate) fn resolve_digest(
    begin_params: &AuthorizationSet,
    key_auths: &AuthorizationSet,
    required: bool,
) -> Result<Digest, ErrorCode> {
    let digest = match begin_params.get_enum(Tag::Digest) {
        Some(value) => Digest::from_value(value).ok_or(ErrorCode::UnsupportedDigest)?,
        None if required => Err(ErrorCode::UnsupportedDigest)?,
        None => Digest::None,
    };
    if !key_auths.all_enums(Tag::Digest).contains(&(digest as u32)) {
        Err(ErrorCode::IncompatibleDigest)?;
    }
    Ok(digest)
}

/// Resolves the padding mode from begin params.
///
/// `required` callers (RSA) fail `UnsupportedPaddingMode` when the param
/// is absent; AES defaults to `PaddingMode::None`. The resolved value
/// must be a member of the key's padding set and of `acceptable` (the
/// paddings that mean anything for the operation being built).
pub(crate) fn resolve_padding(
    begin_params: &AuthorizationSet,
    key_auths: &AuthorizationSet,
    acceptable: &[PaddingMode],
    required: bool,
) -> Result<PaddingMode, ErrorCode> {
    let padding = match begin_params.get_enum(Tag::Padding) {
        Some(value) => PaddingMode::from_value(value).ok_or(ErrorCode::UnsupportedPaddingMode)?,
        None if required => Err(ErrorCode::UnsupportedPaddingMode)?,
        None => PaddingMode::None,
    };
    if !acceptable.contains(&padding) {
        Err(ErrorCode::UnsupportedPaddingMode)?;
    }
    if !key_auths.all_enums(Tag::Padding).contains(&(padding as u32)) {
        Err(ErrorCode::IncompatiblePaddingMode)?;
    }
    Ok(padding)
}

/// Resolves the AES block mode from begin params; the mode must be
/// present, known, and a member of the key's mode set.
pub(crate) fn resolve_block_mode(
    begin_params: &AuthorizationSet,
    key_auths: &AuthorizationSet,
) -> Result<BlockMode, ErrorCode> {
    let mode = begin_params
        .get_enum(Tag::BlockMode)
        .and_then(BlockMode::from_value)
        .ok_or(ErrorCode::IncompatibleBlockMode)?;
    if !key_auths
        .all_enums(Tag::BlockMode)
        .contains(&(mode as u32))
    {
        Err(ErrorCode::IncompatibleBlockMode)?;
    }
    Ok(mode)
}

/// Applies the caller-nonce rule and produces the operation nonce.
///
/// Encrypt operations may only take a caller nonce when the key carries
/// the caller-nonce authorization; a missing nonce is generated into
/// `out_params`. Decrypt operations always take the caller's nonce.
pub(crate) fn resolve_nonce(
    purpose: Purpose,
    begin_params: &AuthorizationSet,
    key_auths: &AuthorizationSet,
    required_len: usize,
    out_params: &mut AuthorizationSet,
) -> Result<Vec<u8>, ErrorCode> {
    match begin_params.get_bytes(Tag::Nonce) {
        Some(nonce) => {
            if purpose == Purpose::Encrypt && !key_auths.contains_tag(Tag::CallerNonce) {
                Err(ErrorCode::CallerNonceProhibited)?;
            }
            if nonce.len() != required_len {
                Err(ErrorCode::InvalidNonce)?;
            }
            Ok(nonce.to_vec())
        }
        None => {
            if purpose == Purpose::Decrypt {
                Err(ErrorCode::InvalidNonce)?;
            }
            let mut nonce = vec![0u8; required_len];
            Rng::rand_bytes(&mut nonce).map_code(ErrorCode::UnknownError)?;
            out_params.push(KeyParam::bytes(Tag::Nonce, nonce.clone())?);
            Ok(nonce)
        }
    }
}

/// Validates a MAC/tag length in bits against the inclusive range
/// `[min_bits, max_bits]`; lengths must be byte-aligned.
pub(crate) fn check_mac_length(
    mac_bits: u32,
    min_bits: u32,
    max_bits: u32,
) -> Result<usize, ErrorCode> {
    if mac_bits % 8 != 0 || mac_bits < min_bits || mac_bits > max_bits {
        Err(ErrorCode::UnsupportedMacLength)?;
    }
    Ok(mac_bits as usize / 8)
}

/// Primary crypto parameters: the tags a hardware backend enforces for
/// keys it hosts.
fn is_primary_crypto_param(tag: Tag) -> bool {
    matches!(
        tag,
        Tag::Algorithm | Tag::KeySize | Tag::RsaPublicExponent | Tag::Digest | Tag::Padding
    )
}

/// Splits freshly minted characteristics between the two enforcement
/// sets.
///
/// When a hardware backend is configured and claims the key, the primary
/// crypto parameters become hardware-enforced and everything else stays
/// software-enforced; otherwise the whole set is software-enforced.
pub(crate) fn split_characteristics(
    params: &AuthorizationSet,
    algorithm: Algorithm,
    key_size_bits: u32,
    backend: Option<&dyn HardwareBackend>,
) -> KeyCharacteristics {
    let in_hardware = backend
        .map(|b| b.supports_key(algorithm, key_size_bits))
        .unwrap_or(false);

    let mut characteristics = KeyCharacteristics::default();
    for param in params.iter() {
        if in_hardware && is_primary_crypto_param(param.tag()) {
            characteristics.hw_enforced.push(param.clone());
        } else {
            characteristics.sw_enforced.push(param.clone());
        }
    }
    characteristics
}
