//! Error types for building and verifying hybrid certificates.

use thiserror::Error;
use time::OffsetDateTime;

/// Represents errors that can occur while building or verifying hybrid certificates.
///
/// Build operations are fail-fast: any of these returned from a pipeline stage
/// means no certificate was produced. Verification uses the signature variants
/// to tell the caller *why* a certificate was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HybridCertError {
    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// Error during data decoding.
    #[error("Failed to decode data: {0}")]
    DecodingError(String),

    /// Error due to invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error during key generation.
    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    /// Error related to certificate operations.
    #[error("Certificate error: {0}")]
    CertificateError(String),

    /// Codec-level structural violation in an extension set.
    #[error("Malformed extension: {0}")]
    MalformedExtension(String),

    /// The validity window ends before it starts.
    #[error("Invalid validity window: not before {not_before} is after not after {not_after}")]
    InvalidValidityWindow {
        not_before: OffsetDateTime,
        not_after: OffsetDateTime,
    },

    /// The body already carries an alternate public key.
    #[error("Alternate public key extension is already present")]
    AltKeyAlreadyPresent,

    /// The private key handle could not produce a signature.
    #[error("Signer unavailable: {0}")]
    SignerUnavailable(String),

    /// The primary signature does not verify.
    #[error("Primary signature is invalid")]
    PrimarySignatureInvalid,

    /// The alternate signature does not verify.
    #[error("Alternate signature is invalid")]
    AltSignatureInvalid,

    /// A hybrid policy was requested but the alternate extensions are missing.
    #[error("An alternate public key or alternate signature extension is missing")]
    AltExtensionMissing,

    /// Re-encoding a decoded structure did not reproduce the original bytes.
    #[error("Encoding mismatch: {0}")]
    EncodingMismatch(String),

    /// Error from RSA operations.
    #[error("RSA error: {0}")]
    RsaError(String),
}

impl From<der::Error> for HybridCertError {
    /// Converts a `der::Error` into a `HybridCertError`.
    fn from(err: der::Error) -> Self {
        HybridCertError::DecodingError(err.to_string())
    }
}

impl From<rsa::Error> for HybridCertError {
    fn from(err: rsa::Error) -> Self {
        HybridCertError::RsaError(err.to_string())
    }
}

impl From<pkcs8::spki::Error> for HybridCertError {
    fn from(err: pkcs8::spki::Error) -> Self {
        HybridCertError::EncodingError(err.to_string())
    }
}
