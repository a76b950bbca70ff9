// Copyright (C) Microsoft Corporation. All rights reserved.

//! The key-blob codec.
//!
//! A sealed blob is the only persistent representation of a key:
//!
//! ```text
//! "LKB1" | version | nonce(12) | tag(16) | le32 ct_len | ciphertext |
//!     hw auth set | sw auth set
//! ```
//!
//! The ciphertext is AES-256-GCM over the raw key material under a
//! process-local master key derived from a fixed root. The GCM associated
//! data covers the serialized hidden set (application-id,
//! application-data, root-of-trust) followed by both serialized
//! authorization sets, so any bit-flip anywhere in the blob, and any
//! divergence in the hidden binding values, fails authentication.
//!
//! Two previous-generation formats are recognized on ingest and decoded
//! into the same in-memory structure: a `'P'`-prefixed PKCS#8 software
//! blob (whose `'Q'` variant marks a key owned by the hardware backend)
//! and an AES-OCB sealed blob.

use lazy_static::lazy_static;
use lkms_crypto::AesGcmAlgo;
use lkms_crypto::AesKey;
use lkms_crypto::AesOcbAlgo;
use lkms_crypto::CryptoError;
use lkms_crypto::EcPrivateKey;
use lkms_crypto::Hkdf;
use lkms_crypto::Rng;
use lkms_crypto::RsaPrivateKey;
use lkms_crypto::AEAD_TAG_SIZE;
use lkms_crypto::GCM_NONCE_SIZE;
use zeroize::Zeroizing;

use crate::authset::AuthorizationSet;
use crate::authset::KeyParam;
use crate::error::ErrCodeMapper;
use crate::error::ErrorCode;
use crate::key::KeyMaterial;
use crate::tag::Tag;
use crate::types::Algorithm;
use crate::types::Digest;
use crate::types::PaddingMode;
use crate::types::Purpose;

const BLOB_MAGIC: [u8; 4] = *b"LKB1";
const BLOB_VERSION: u8 = 2;

const LEGACY_SW_PREFIX: u8 = b'P';
const LEGACY_HW_PREFIX: u8 = b'Q';
const LEGACY_MAGIC_TAIL: [u8; 3] = *b"K#8";
const LEGACY_TYPE_RSA: u32 = 1;
const LEGACY_TYPE_EC: u32 = 2;

/// Fixed derivation root for the process-local sealing keys. The blobs
/// it seals are only as secret as this constant; a production deployment
/// substitutes a device-unique root at build time.
const MASTER_ROOT: [u8; 32] = [
    0x4c, 0x4b, 0x4d, 0x53, 0x2d, 0x72, 0x6f, 0x6f, 0x74, 0x2d, 0x30, 0x32, 0x9d, 0x1f, 0x83,
    0x5a, 0x27, 0xc6, 0x41, 0xe8, 0x7b, 0x0e, 0xd4, 0x92, 0x35, 0xa8, 0x6f, 0x1d, 0xc0, 0x58,
    0xee, 0x07,
];

lazy_static! {
    static ref MASTER_KEY: Result<AesKey, CryptoError> = derive_key(b"blob-sealing-v2");
    static ref LEGACY_OCB_KEY: Result<AesKey, CryptoError> = derive_key(b"blob-sealing-ocb-v1");
}

fn derive_key(info: &[u8]) -> Result<AesKey, CryptoError> {
    let mut okm = Zeroizing::new([0u8; 32]);
    Hkdf::sha256(&MASTER_ROOT, b"lkms-sealing", info, okm.as_mut())?;
    AesKey::from_bytes(okm.as_ref())
}

fn master_key() -> Result<&'static AesKey, ErrorCode> {
    MASTER_KEY.as_ref().map_code(ErrorCode::UnknownError)
}

fn legacy_ocb_key() -> Result<&'static AesKey, ErrorCode> {
    LEGACY_OCB_KEY.as_ref().map_code(ErrorCode::UnknownError)
}

/// A blob decoded back into its canonical in-memory form.
pub struct UnsealedKey {
    /// The secret material.
    pub material: KeyMaterial,
    /// Constraints the secure backend enforces.
    pub hw_enforced: AuthorizationSet,
    /// Constraints the software layer enforces.
    pub sw_enforced: AuthorizationSet,
}

impl UnsealedKey {
    /// Merged view of both authorization sets.
    pub fn authorizations(&self) -> AuthorizationSet {
        let mut merged = self.hw_enforced.clone();
        merged.merge(&self.sw_enforced);
        merged
    }
}

/// Builds the hidden authorization set that binds a blob to its caller.
pub fn hidden_set(app_id: Option<&[u8]>, app_data: Option<&[u8]>) -> AuthorizationSet {
    let mut hidden = AuthorizationSet::new();
    if let Some(app_id) = app_id {
        if let Ok(param) = KeyParam::bytes(Tag::ApplicationId, app_id.to_vec()) {
            hidden.push(param);
        }
    }
    if let Some(app_data) = app_data {
        if let Ok(param) = KeyParam::bytes(Tag::ApplicationData, app_data.to_vec()) {
            hidden.push(param);
        }
    }
    // A software implementation has no verified-boot measurement to bind.
    if let Ok(param) = KeyParam::bytes(Tag::RootOfTrust, b"SW".to_vec()) {
        hidden.push(param);
    }
    hidden
}

fn binding_aad(hidden: &AuthorizationSet, hw_ser: &[u8], sw_ser: &[u8]) -> Vec<u8> {
    let mut aad = hidden.serialize();
    aad.extend_from_slice(hw_ser);
    aad.extend_from_slice(sw_ser);
    aad
}

/// Seals key material and its authorization sets into an opaque blob.
pub fn seal(
    material: &KeyMaterial,
    hw_enforced: &AuthorizationSet,
    sw_enforced: &AuthorizationSet,
    hidden: &AuthorizationSet,
) -> Result<Vec<u8>, ErrorCode> {
    let plaintext = material.to_bytes()?;
    let hw_ser = hw_enforced.serialize();
    let sw_ser = sw_enforced.serialize();
    let aad = binding_aad(hidden, &hw_ser, &sw_ser);

    let mut nonce = [0u8; GCM_NONCE_SIZE];
    Rng::rand_bytes(&mut nonce).map_code(ErrorCode::UnknownError)?;

    let mut algo =
        AesGcmAlgo::for_encrypt(&nonce, Some(&aad)).map_code(ErrorCode::UnknownError)?;
    let ciphertext = algo
        .encrypt(master_key()?, &plaintext)
        .map_code(ErrorCode::UnknownError)?;

    let mut blob = Vec::with_capacity(
        BLOB_MAGIC.len() + 1 + nonce.len() + AEAD_TAG_SIZE + 4 + ciphertext.len()
            + hw_ser.len()
            + sw_ser.len(),
    );
    blob.extend_from_slice(&BLOB_MAGIC);
    blob.push(BLOB_VERSION);
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(algo.tag());
    blob.extend_from_slice(&(ciphertext.len() as u32).to_le_bytes());
    blob.extend_from_slice(&ciphertext);
    blob.extend_from_slice(&hw_ser);
    blob.extend_from_slice(&sw_ser);
    Ok(blob)
}

/// Decodes and authenticates a blob in any recognized format.
pub fn unseal(blob: &[u8], hidden: &AuthorizationSet) -> Result<UnsealedKey, ErrorCode> {
    if blob.starts_with(&BLOB_MAGIC) {
        return unseal_current(blob, hidden);
    }
    if blob.len() > 4
        && (blob[0] == LEGACY_SW_PREFIX || blob[0] == LEGACY_HW_PREFIX)
        && blob[1..4] == LEGACY_MAGIC_TAIL
    {
        return unseal_legacy_pkcs8(blob);
    }
    unseal_legacy_ocb(blob, hidden)
}

fn unseal_current(blob: &[u8], hidden: &AuthorizationSet) -> Result<UnsealedKey, ErrorCode> {
    let mut pos = BLOB_MAGIC.len();
    let version = *blob.get(pos).ok_or(ErrorCode::InvalidKeyBlob)?;
    if version != BLOB_VERSION {
        Err(ErrorCode::InvalidKeyBlob)?;
    }
    pos += 1;

    let nonce = read_slice(blob, &mut pos, GCM_NONCE_SIZE)?;
    let tag = read_slice(blob, &mut pos, AEAD_TAG_SIZE)?;
    let ct_len = u32::from_le_bytes(
        read_slice(blob, &mut pos, 4)?
            .try_into()
            .map_code(ErrorCode::InvalidKeyBlob)?,
    ) as usize;
    let ciphertext = read_slice(blob, &mut pos, ct_len)?;

    let (hw_enforced, hw_used) = AuthorizationSet::deserialize_prefix(&blob[pos..])?;
    let hw_ser = &blob[pos..pos + hw_used];
    pos += hw_used;
    let (sw_enforced, sw_used) = AuthorizationSet::deserialize_prefix(&blob[pos..])?;
    let sw_ser = &blob[pos..pos + sw_used];
    pos += sw_used;
    if pos != blob.len() {
        Err(ErrorCode::InvalidKeyBlob)?;
    }

    let aad = binding_aad(hidden, hw_ser, sw_ser);
    let mut algo =
        AesGcmAlgo::for_decrypt(nonce, tag, Some(&aad)).map_code(ErrorCode::InvalidKeyBlob)?;
    let plaintext = Zeroizing::new(
        algo.decrypt(master_key()?, ciphertext)
            .map_code(ErrorCode::InvalidKeyBlob)?,
    );

    let algorithm = blob_algorithm(&hw_enforced, &sw_enforced)?;
    let material = KeyMaterial::from_bytes(algorithm, &plaintext)?;
    Ok(UnsealedKey {
        material,
        hw_enforced,
        sw_enforced,
    })
}

/// Previous-generation software blob: `"PK#8"` magic, BE32 key type,
/// BE32 PKCS#8 length, PKCS#8 DER. A leading `'Q'` marks the same bytes
/// as a key owned by the hardware backend, which moves the primary
/// crypto parameters into the hardware-enforced set.
fn unseal_legacy_pkcs8(blob: &[u8]) -> Result<UnsealedKey, ErrorCode> {
    let hardware = blob[0] == LEGACY_HW_PREFIX;
    let mut pos = 4;
    let key_type = u32::from_be_bytes(
        read_slice(blob, &mut pos, 4)?
            .try_into()
            .map_code(ErrorCode::InvalidKeyBlob)?,
    );
    let der_len = u32::from_be_bytes(
        read_slice(blob, &mut pos, 4)?
            .try_into()
            .map_code(ErrorCode::InvalidKeyBlob)?,
    ) as usize;
    let der = read_slice(blob, &mut pos, der_len)?;
    if pos != blob.len() {
        Err(ErrorCode::InvalidKeyBlob)?;
    }

    let (material, exponent) = match key_type {
        LEGACY_TYPE_RSA => {
            let key = RsaPrivateKey::from_pkcs8(der).map_code(ErrorCode::InvalidKeyBlob)?;
            let exponent = key.public_exponent().map_code(ErrorCode::InvalidKeyBlob)?;
            (KeyMaterial::Rsa(key), Some(exponent))
        }
        LEGACY_TYPE_EC => {
            let key = EcPrivateKey::from_pkcs8(der).map_code(ErrorCode::InvalidKeyBlob)?;
            (KeyMaterial::Ec(key), None)
        }
        _ => Err(ErrorCode::InvalidKeyBlob)?,
    };

    // Synthesize the characteristics a key of this generation carried.
    let mut crypto_params = AuthorizationSet::new();
    crypto_params.push(KeyParam::enumerated(
        Tag::Algorithm,
        material.algorithm() as u32,
    )?);
    crypto_params.push(KeyParam::uint(Tag::KeySize, material.key_size_bits())?);
    if let Some(exponent) = exponent {
        crypto_params.push(KeyParam::ulong(Tag::RsaPublicExponent, exponent)?);
    }
    crypto_params.push(KeyParam::enumerated(Tag::Digest, Digest::None as u32)?);
    crypto_params.push(KeyParam::enumerated(Tag::Padding, PaddingMode::None as u32)?);

    let mut rest = AuthorizationSet::new();
    rest.push(KeyParam::enumerated(Tag::Purpose, Purpose::Sign as u32)?);
    rest.push(KeyParam::enumerated(Tag::Purpose, Purpose::Verify as u32)?);
    rest.push(KeyParam::boolean(Tag::AllUsers)?);
    rest.push(KeyParam::boolean(Tag::NoAuthRequired)?);

    let (hw_enforced, sw_enforced) = if hardware {
        (crypto_params, rest)
    } else {
        crypto_params.merge(&rest);
        (AuthorizationSet::new(), crypto_params)
    };
    Ok(UnsealedKey {
        material,
        hw_enforced,
        sw_enforced,
    })
}

/// Previous-generation OCB software blob: nonce(12), le32 ct_len,
/// ciphertext, tag(16), hw set, sw set.
fn unseal_legacy_ocb(blob: &[u8], hidden: &AuthorizationSet) -> Result<UnsealedKey, ErrorCode> {
    let mut pos = 0;
    let nonce = read_slice(blob, &mut pos, GCM_NONCE_SIZE)?;
    let ct_len = u32::from_le_bytes(
        read_slice(blob, &mut pos, 4)?
            .try_into()
            .map_code(ErrorCode::InvalidKeyBlob)?,
    ) as usize;
    let ciphertext = read_slice(blob, &mut pos, ct_len)?;
    let tag = read_slice(blob, &mut pos, AEAD_TAG_SIZE)?;

    let (hw_enforced, hw_used) = AuthorizationSet::deserialize_prefix(&blob[pos..])?;
    let hw_ser = &blob[pos..pos + hw_used];
    pos += hw_used;
    let (sw_enforced, sw_used) = AuthorizationSet::deserialize_prefix(&blob[pos..])?;
    let sw_ser = &blob[pos..pos + sw_used];
    pos += sw_used;
    if pos != blob.len() {
        Err(ErrorCode::InvalidKeyBlob)?;
    }

    let aad = binding_aad(hidden, hw_ser, sw_ser);
    let mut algo =
        AesOcbAlgo::for_decrypt(nonce, tag, Some(&aad)).map_code(ErrorCode::InvalidKeyBlob)?;
    let plaintext = Zeroizing::new(
        algo.decrypt(legacy_ocb_key()?, ciphertext)
            .map_code(ErrorCode::InvalidKeyBlob)?,
    );

    let algorithm = blob_algorithm(&hw_enforced, &sw_enforced)?;
    let material = KeyMaterial::from_bytes(algorithm, &plaintext)?;
    Ok(UnsealedKey {
        material,
        hw_enforced,
        sw_enforced,
    })
}

fn blob_algorithm(
    hw_enforced: &AuthorizationSet,
    sw_enforced: &AuthorizationSet,
) -> Result<Algorithm, ErrorCode> {
    let value = hw_enforced
        .get_enum(Tag::Algorithm)
        .or_else(|| sw_enforced.get_enum(Tag::Algorithm))
        .ok_or(ErrorCode::InvalidKeyBlob)?;
    Algorithm::from_value(value).ok_or(ErrorCode::InvalidKeyBlob)
}

fn read_slice<'a>(data: &'a [u8], pos: &mut usize, len: usize) -> Result<&'a [u8], ErrorCode> {
    let end = pos.checked_add(len).ok_or(ErrorCode::InvalidKeyBlob)?;
    if end > data.len() {
        Err(ErrorCode::InvalidKeyBlob)?;
    }
    let slice = &data[*pos..end];
    *pos = end;
    Ok(slice)
}
