// Copyright (C) Microsoft Corporation. All rights reserved.

//! The service façade: the entry points a host process calls.

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use lkms_crypto::Rng;

use crate::authset::AuthorizationSet;
use crate::authset::KeyParam;
use crate::blob;
use crate::error::ErrCodeMapper;
use crate::error::ErrorCode;
use crate::hardware::HardwareBackend;
use crate::key::KeyCharacteristics;
use crate::key::KeyMaterial;
use crate::op;
use crate::op::Operation;
use crate::op::OperationTable;
use crate::policy;
use crate::tag::Tag;
use crate::types::Algorithm;
use crate::types::BlockMode;
use crate::types::Digest;
use crate::types::KeyFormat;
use crate::types::KeyOrigin;
use crate::types::PaddingMode;
use crate::types::Purpose;

/// A freshly minted key: the sealed blob plus its two characteristic
/// sets.
pub struct KeyBundle {
    /// The opaque blob the caller stores.
    pub key_blob: Vec<u8>,
    /// The split characteristics.
    pub characteristics: KeyCharacteristics,
}

/// Result of [`SoftKeystore::begin`].
pub struct BeginResult {
    /// Handle for the new operation.
    pub handle: u64,
    /// Begin-time outputs (generated nonce, when applicable).
    pub out_params: AuthorizationSet,
}

/// Result of [`SoftKeystore::update`].
pub struct UpdateResult {
    /// Bytes of input the operation consumed.
    pub input_consumed: usize,
    /// Update-time outputs.
    pub out_params: AuthorizationSet,
    /// Output bytes produced by this update.
    pub output: Vec<u8>,
}

/// Result of [`SoftKeystore::finish`].
pub struct FinishResult {
    /// Finish-time outputs (AEAD tag on GCM encryption).
    pub out_params: AuthorizationSet,
    /// Final output bytes.
    pub output: Vec<u8>,
}

/// The software keystore device.
///
/// All entry points are synchronous and safe to call from multiple
/// threads; the operation table is the only shared mutable state.
pub struct SoftKeystore {
    operations: OperationTable,
    hardware: Option<Box<dyn HardwareBackend>>,
}

impl Default for SoftKeystore {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftKeystore {
    /// Creates a keystore with no hardware backend.
    pub fn new() -> Self {
        Self {
            operations: OperationTable::new(),
            hardware: None,
        }
    }

    /// Creates a keystore that reports keys claimed by `backend` as
    /// hardware-enforced.
    pub fn with_hardware(backend: Box<dyn HardwareBackend>) -> Self {
        Self {
            operations: OperationTable::new(),
            hardware: Some(backend),
        }
    }

    /// Supported algorithm families.
    pub fn get_supported_algorithms(&self) -> Vec<Algorithm> {
        vec![Algorithm::Rsa, Algorithm::Ec, Algorithm::Aes, Algorithm::Hmac]
    }

    /// Block modes defined for (algorithm, purpose).
    pub fn get_supported_block_modes(
        &self,
        algorithm: Algorithm,
        purpose: Purpose,
    ) -> Result<Vec<BlockMode>, ErrorCode> {
        check_purpose_defined(algorithm, purpose)?;
        Ok(match algorithm {
            Algorithm::Aes => vec![
                BlockMode::Ecb,
                BlockMode::Cbc,
                BlockMode::Ctr,
                BlockMode::Gcm,
            ],
            _ => Vec::new(),
        })
    }

    /// Padding modes defined for (algorithm, purpose).
    pub fn get_supported_padding_modes(
        &self,
        algorithm: Algorithm,
        purpose: Purpose,
    ) -> Result<Vec<PaddingMode>, ErrorCode> {
        check_purpose_defined(algorithm, purpose)?;
        Ok(match (algorithm, purpose) {
            (Algorithm::Rsa, Purpose::Sign | Purpose::Verify) => vec![
                PaddingMode::None,
                PaddingMode::RsaPkcs1Sign,
                PaddingMode::RsaPss,
            ],
            (Algorithm::Rsa, Purpose::Encrypt | Purpose::Decrypt) => vec![
                PaddingMode::None,
                PaddingMode::RsaOaep,
                PaddingMode::RsaPkcs1Encrypt,
            ],
            (Algorithm::Aes, _) => vec![PaddingMode::None, PaddingMode::Pkcs7],
            _ => Vec::new(),
        })
    }

    /// Digests defined for (algorithm, purpose).
    pub fn get_supported_digests(
        &self,
        algorithm: Algorithm,
        purpose: Purpose,
    ) -> Result<Vec<Digest>, ErrorCode> {
        check_purpose_defined(algorithm, purpose)?;
        Ok(match algorithm {
            Algorithm::Rsa | Algorithm::Ec => vec![
                Digest::None,
                Digest::Md5,
                Digest::Sha1,
                Digest::Sha224,
                Digest::Sha256,
                Digest::Sha384,
                Digest::Sha512,
            ],
            Algorithm::Hmac => vec![
                Digest::Sha1,
                Digest::Sha224,
                Digest::Sha256,
                Digest::Sha384,
                Digest::Sha512,
            ],
            Algorithm::Aes => Vec::new(),
        })
    }

    /// Import formats accepted for the algorithm.
    pub fn get_supported_import_formats(&self, algorithm: Algorithm) -> Vec<KeyFormat> {
        match algorithm {
            Algorithm::Rsa | Algorithm::Ec => vec![KeyFormat::Pkcs8],
            Algorithm::Aes | Algorithm::Hmac => vec![KeyFormat::Raw],
        }
    }

    /// Export formats available for the algorithm.
    pub fn get_supported_export_formats(&self, algorithm: Algorithm) -> Vec<KeyFormat> {
        match algorithm {
            Algorithm::Rsa | Algorithm::Ec => vec![KeyFormat::X509],
            Algorithm::Aes | Algorithm::Hmac => Vec::new(),
        }
    }

    /// Mixes caller entropy into the process randomness source.
    pub fn add_rng_entropy(&self, data: &[u8]) -> Result<(), ErrorCode> {
        Rng::add_entropy(data).map_code(ErrorCode::UnknownError)
    }

    /// Generates a key described by `params` and seals it into a blob.
    pub fn generate_key(&self, params: &AuthorizationSet) -> Result<KeyBundle, ErrorCode> {
        let material = KeyMaterial::generate(params)?;
        self.mint_key(material, params, &AuthorizationSet::new(), KeyOrigin::Generated)
    }

    /// Imports caller-supplied key material.
    pub fn import_key(
        &self,
        params: &AuthorizationSet,
        format: KeyFormat,
        material: &[u8],
    ) -> Result<KeyBundle, ErrorCode> {
        let (material, derived) = KeyMaterial::import(params, format, material)?;
        self.mint_key(material, params, &derived, KeyOrigin::Imported)
    }

    /// Returns the characteristics stored in a blob.
    pub fn get_key_characteristics(
        &self,
        key_blob: &[u8],
        app_id: Option<&[u8]>,
        app_data: Option<&[u8]>,
    ) -> Result<KeyCharacteristics, ErrorCode> {
        let hidden = blob::hidden_set(app_id, app_data);
        let unsealed = blob::unseal(key_blob, &hidden)?;
        Ok(KeyCharacteristics {
            hw_enforced: unsealed.hw_enforced,
            sw_enforced: unsealed.sw_enforced,
        })
    }

    /// Exports public key material from a blob.
    pub fn export_key(
        &self,
        format: KeyFormat,
        key_blob: &[u8],
        app_id: Option<&[u8]>,
        app_data: Option<&[u8]>,
    ) -> Result<Vec<u8>, ErrorCode> {
        let hidden = blob::hidden_set(app_id, app_data);
        let unsealed = blob::unseal(key_blob, &hidden)?;
        if format != KeyFormat::X509 {
            Err(ErrorCode::UnsupportedKeyFormat)?;
        }
        unsealed.material.export_public()
    }

    /// Starts a cryptographic job against a sealed key.
    pub fn begin(
        &self,
        purpose: Purpose,
        key_blob: &[u8],
        params: &AuthorizationSet,
    ) -> Result<BeginResult, ErrorCode> {
        let hidden = blob::hidden_set(
            params.get_bytes(Tag::ApplicationId),
            params.get_bytes(Tag::ApplicationData),
        );
        let unsealed = blob::unseal(key_blob, &hidden)?;
        let algorithm = unsealed.material.algorithm();
        let key_auths = unsealed.authorizations();

        policy::check_purpose(algorithm, purpose, &key_auths)?;

        let mut out_params = AuthorizationSet::new();
        let imp = match unsealed.material {
            KeyMaterial::Rsa(key) => op::new_rsa_operation(key, purpose, &key_auths, params)?,
            KeyMaterial::Ec(key) => op::new_ec_operation(key, purpose, &key_auths, params)?,
            KeyMaterial::Aes(key) => {
                op::new_aes_operation(key, purpose, &key_auths, params, &mut out_params)?
            }
            KeyMaterial::Hmac(key) => op::new_hmac_operation(key, purpose, &key_auths, params)?,
        };

        let handle = self.operations.insert(Operation::new(imp))?;
        tracing::debug!("operation {} began: {:?} {:?}", handle, algorithm, purpose);
        Ok(BeginResult { handle, out_params })
    }

    /// Feeds input (and AEAD parameters) to a live operation.
    ///
    /// Any error destroys the operation.
    pub fn update(
        &self,
        handle: u64,
        params: &AuthorizationSet,
        input: &[u8],
    ) -> Result<UpdateResult, ErrorCode> {
        let mut operation = self.operations.take(handle)?;
        let result = drive_update(&mut operation, params, input);
        match result {
            Ok(result) => {
                self.operations.put_back(handle, operation);
                Ok(result)
            }
            Err(err) => {
                tracing::debug!("operation {} destroyed by update: {:?}", handle, err);
                self.operations.retire();
                Err(err)
            }
        }
    }

    /// Completes a live operation, returning its final output.
    ///
    /// The operation is destroyed whether or not finish succeeds.
    pub fn finish(
        &self,
        handle: u64,
        params: &AuthorizationSet,
        signature: Option<&[u8]>,
    ) -> Result<FinishResult, ErrorCode> {
        let mut operation = self.operations.take(handle)?;
        let result = drive_finish(&mut operation, params, signature);
        self.operations.retire();
        tracing::debug!("operation {} finished: ok={}", handle, result.is_ok());
        result
    }

    /// Cancels a live operation.
    pub fn abort(&self, handle: u64) -> Result<(), ErrorCode> {
        let operation = self.operations.take(handle)?;
        drop(operation);
        self.operations.retire();
        Ok(())
    }

    fn mint_key(
        &self,
        material: KeyMaterial,
        params: &AuthorizationSet,
        derived: &AuthorizationSet,
        origin: KeyOrigin,
    ) -> Result<KeyBundle, ErrorCode> {
        let algorithm = material.algorithm();
        let key_size_bits = material.key_size_bits();

        // Everything the caller asked for, minus the hidden binding
        // params, plus derived values and service defaults.
        let mut public_params: AuthorizationSet = params
            .iter()
            .filter(|p| !p.tag().is_hidden())
            .cloned()
            .collect();
        public_params.merge(derived);
        if !public_params.contains_tag(Tag::Origin) {
            public_params.push(KeyParam::enumerated(Tag::Origin, origin as u32)?);
        }
        if !public_params.contains_tag(Tag::CreationDatetime) {
            public_params.push(KeyParam::date(Tag::CreationDatetime, now_ms())?);
        }
        if !has_auth_constraints(&public_params) {
            public_params.push(KeyParam::boolean(Tag::AllUsers)?);
            public_params.push(KeyParam::boolean(Tag::NoAuthRequired)?);
        }

        let characteristics = policy::split_characteristics(
            &public_params,
            algorithm,
            key_size_bits,
            self.hardware.as_deref(),
        );

        let hidden = blob::hidden_set(
            params.get_bytes(Tag::ApplicationId),
            params.get_bytes(Tag::ApplicationData),
        );
        let key_blob = blob::seal(
            &material,
            &characteristics.hw_enforced,
            &characteristics.sw_enforced,
            &hidden,
        )?;
        Ok(KeyBundle {
            key_blob,
            characteristics,
        })
    }
}

fn drive_update(
    operation: &mut Operation,
    params: &AuthorizationSet,
    input: &[u8],
) -> Result<UpdateResult, ErrorCode> {
    apply_operation_params(operation, params)?;
    let (input_consumed, output) = operation.imp().update(input)?;
    Ok(UpdateResult {
        input_consumed,
        out_params: AuthorizationSet::new(),
        output,
    })
}

fn drive_finish(
    operation: &mut Operation,
    params: &AuthorizationSet,
    signature: Option<&[u8]>,
) -> Result<FinishResult, ErrorCode> {
    apply_operation_params(operation, params)?;
    let mut out_params = AuthorizationSet::new();
    let output = operation.imp().finish(signature, &mut out_params)?;
    Ok(FinishResult { out_params, output })
}

/// Routes AEAD parameters carried in update/finish params to the
/// operation; unrelated tags are ignored, as the original interface
/// tolerates extra params.
fn apply_operation_params(
    operation: &mut Operation,
    params: &AuthorizationSet,
) -> Result<(), ErrorCode> {
    for param in params.iter() {
        match (param.tag(), param.value()) {
            (Tag::AssociatedData, crate::authset::KeyParamValue::Bytes(aad)) => {
                operation.imp().update_aad(aad)?;
            }
            (Tag::AeadTag, crate::authset::KeyParamValue::Bytes(tag)) => {
                operation.imp().supply_tag(tag)?;
            }
            _ => {}
        }
    }
    Ok(())
}

fn check_purpose_defined(algorithm: Algorithm, purpose: Purpose) -> Result<(), ErrorCode> {
    if !algorithm.supports_purpose(purpose) {
        Err(ErrorCode::UnsupportedPurpose)?;
    }
    Ok(())
}

fn has_auth_constraints(params: &AuthorizationSet) -> bool {
    [
        Tag::AllUsers,
        Tag::UserId,
        Tag::NoAuthRequired,
        Tag::UserAuthType,
        Tag::AuthTimeout,
    ]
    .iter()
    .any(|tag| params.contains_tag(*tag))
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
