// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Capability interface of an optional legacy hardware backend.
//!
//! When a backend is configured and claims a key, the primary crypto
//! parameters of that key are reported as hardware-enforced. Forwarding
//! of the operations themselves is the adapter's concern and out of
//! scope here; the core only consumes the capability query.

use crate::types::Algorithm;

/// A legacy secure-hardware keystore sitting below this service.
pub trait HardwareBackend: Send + Sync {
    /// Whether the backend can host keys of this algorithm and size.
    fn supports_key(&self, algorithm: Algorithm, key_size_bits: u32) -> bool;
}
