// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::error::Error;
use std::fmt::Debug;
use std::fmt::Display;

/// Maps arbitrary lower-level errors onto a service error code, logging
/// the original error at the conversion site.
pub(crate) trait ErrCodeMapper<T, E> {
    fn map_code(self, code: ErrorCode) -> Result<T, ErrorCode>;
}

impl<T, E: Debug> ErrCodeMapper<T, E> for Result<T, E> {
    fn map_code(self, code: ErrorCode) -> Result<T, ErrorCode> {
        match self {
            Ok(t) => Ok(t),
            Err(err) => {
                tracing::error!("Mapping error {:?} to service error: {:?}", err, code);
                Err(code)
            }
        }
    }
}

/// Numeric error codes returned by every service entry point.
///
/// Codes are negative so that the C device table can reserve `0` for
/// success; the Rust surface encodes success through `Result`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorCode {
    /// A required output parameter of the C device table was null. Never
    /// produced by the Rust surface.
    OutputParameterNull = -1,
    /// The algorithm tag is missing or names an unknown algorithm.
    UnsupportedAlgorithm = -2,
    /// The purpose is not defined for the algorithm.
    UnsupportedPurpose = -3,
    /// The key size is missing or not valid for the algorithm.
    UnsupportedKeySize = -4,
    /// The padding mode is missing or not defined for the operation.
    UnsupportedPaddingMode = -5,
    /// The digest is missing or not defined for the operation.
    UnsupportedDigest = -6,
    /// The key material format is not supported for the algorithm.
    UnsupportedKeyFormat = -7,
    /// The MAC/tag length is missing or outside the permitted range.
    UnsupportedMacLength = -8,
    /// A caller-supplied nonce has the wrong length for the block mode.
    InvalidNonce = -9,
    /// The key does not authorize caller-supplied nonces.
    CallerNonceProhibited = -10,
    /// The key does not authorize the requested purpose.
    IncompatiblePurpose = -11,
    /// The requested digest is not among the key's authorized digests.
    IncompatibleDigest = -12,
    /// The requested padding is not among the key's authorized paddings.
    IncompatiblePaddingMode = -13,
    /// The requested block mode is not among the key's authorized modes.
    IncompatibleBlockMode = -14,
    /// Imported key material contradicts the declared parameters.
    ImportParameterMismatch = -15,
    /// The accumulated input length violates the operation's constraints.
    InvalidInputLength = -16,
    /// A malformed argument that no more specific code covers.
    InvalidArgument = -17,

    /// The key blob failed authentication or cannot be parsed.
    InvalidKeyBlob = -30,
    /// A signature or AEAD tag failed verification.
    VerificationFailed = -31,

    /// No live operation exists under the supplied handle.
    InvalidOperationHandle = -40,
    /// The operation table is full.
    TooManyOperations = -41,

    /// The key's usage-expire date has passed.
    KeyExpired = -50,
    /// The key's active date has not yet arrived.
    KeyNotYetValid = -51,
    /// The key requires user authentication that was not presented.
    KeyUserNotAuthenticated = -52,

    /// Catch-all for primitive failures.
    UnknownError = -1000,
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Error for ErrorCode {}
