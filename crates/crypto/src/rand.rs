// Copyright (C) Microsoft Corporation. All rights reserved.

//! Process-wide random number generation.
//!
//! Primary randomness comes from the OpenSSL DRBG. Because rust-openssl
//! exposes no way to feed caller entropy into that DRBG, entropy supplied
//! through [`Rng::add_entropy`] seeds a supplementary ChaCha20 stream; every
//! generated buffer is the XOR of the OpenSSL output and the supplementary
//! stream. Until entropy is added the supplementary stream is absent and
//! output is the OpenSSL DRBG output alone.

use lazy_static::lazy_static;
use openssl::hash::MessageDigest;
use parking_lot::Mutex;
use rand_chacha::ChaCha20Rng;
use rand_core::RngCore;
use rand_core::SeedableRng;

use super::*;

lazy_static! {
    static ref MIX_STREAM: Mutex<Option<ChaCha20Rng>> = Mutex::new(None);
}

/// Cryptographically secure random number generator.
pub struct Rng;

impl Rng {
    /// Fills `buf` with random bytes.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::RngError` if the underlying DRBG fails.
    pub fn rand_bytes(buf: &mut [u8]) -> Result<(), CryptoError> {
        openssl::rand::rand_bytes(buf).map_err(|_| CryptoError::RngError)?;
        if let Some(stream) = MIX_STREAM.lock().as_mut() {
            let mut mix = vec![0u8; buf.len()];
            stream.fill_bytes(&mut mix);
            for (out, m) in buf.iter_mut().zip(mix.iter()) {
                *out ^= m;
            }
        }
        Ok(())
    }

    /// Mixes caller-supplied entropy into the process randomness source.
    ///
    /// The supplementary stream is reseeded with SHA-256 over the previous
    /// stream state, fresh DRBG output and the caller bytes, so repeated
    /// calls accumulate rather than replace entropy.
    pub fn add_entropy(data: &[u8]) -> Result<(), CryptoError> {
        let mut stream = MIX_STREAM.lock();

        let mut ikm = vec![0u8; 64];
        openssl::rand::rand_bytes(&mut ikm[..32]).map_err(|_| CryptoError::RngError)?;
        if let Some(existing) = stream.as_mut() {
            existing.fill_bytes(&mut ikm[32..]);
        }
        ikm.extend_from_slice(data);

        let digest = openssl::hash::hash(MessageDigest::sha256(), &ikm)
            .map_err(|_| CryptoError::RngError)?;
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&digest);
        *stream = Some(ChaCha20Rng::from_seed(seed));
        Ok(())
    }
}
