// Copyright (C) Microsoft Corporation. All rights reserved.

#![warn(missing_docs)]

//! Device-local key-management service core.
//!
//! Issues, stores and operates on cryptographic keys on behalf of client
//! applications, enforcing per-key usage policies expressed as typed
//! tag/value pairs. Clients never see raw key material: they hold
//! opaque, integrity-protected key blobs and drive each cryptographic
//! job through a begin/update/finish/abort handle.

mod authset;
mod blob;
mod error;
mod hardware;
mod key;
mod op;
mod policy;
mod service;
mod tag;
mod types;

pub use authset::AuthorizationSet;
pub use authset::KeyParam;
pub use authset::KeyParamValue;
pub use error::ErrorCode;
pub use hardware::HardwareBackend;
pub use key::KeyCharacteristics;
pub use key::KeyMaterial;
pub use op::MAX_OPERATIONS;
pub use service::BeginResult;
pub use service::FinishResult;
pub use service::KeyBundle;
pub use service::SoftKeystore;
pub use service::UpdateResult;
pub use tag::Tag;
pub use tag::TagClass;
pub use tag::TagType;
pub use types::Algorithm;
pub use types::BlockMode;
pub use types::Digest;
pub use types::KeyFormat;
pub use types::KeyOrigin;
pub use types::PaddingMode;
pub use types::Purpose;
