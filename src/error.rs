//! The error taxonomy of the engine.
//!
//! Every fallible operation returns a specific kind rather than a boolean.
//! Nothing here is fatal: malformed or hostile input degrades to a rejected
//! record or message, never to a crash or to a partially mutated store.

use thiserror::Error;

use crate::{DecodeError, EncodeError};

/// The failure kinds of the engine's mutating and synchronous operations.
///
/// [`Error::code`] maps each kind to a stable negative integer for callers
/// that consume the engine through a result-code interface; zero is
/// reserved for success.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// an argument was rejected before any state change
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// an encoded certificate was smaller or larger than the protocol
    /// permits
    #[error("encoded certificate size out of bounds: {0} bytes")]
    CertSizeOutOfBounds(usize),

    /// a byte-identical certificate or credential is already present.
    /// Benign, but distinguishable from success and from real failures.
    #[error("already present")]
    AlreadyPresent,

    /// the issuer referenced by a certificate is not in the store
    #[error("no issuer certificate in table")]
    NoIssuerCert,

    /// a certificate's validity interval is not a subset of its issuer's
    #[error("validity period exceeds the issuer's")]
    ValidityNotEnclosed,

    /// the certificate's own chain signature did not verify
    #[error("certificate chain signature invalid")]
    ChainSignatureInvalid,

    /// the certificate appears in a revocation index
    #[error("certificate is revoked")]
    Revoked,

    /// the certificate or credential is expired at the reference time
    #[error("certificate or credential expired")]
    Expired,

    /// a binary record ended before its declared contents
    #[error("record truncated")]
    TooShort,

    /// the wire encoding could not be decoded
    #[error("decode failed: {0}")]
    Decode(String),

    /// a structure could not be encoded
    #[error("encode failed: {0}")]
    Encode(String),

    /// the input uses a wire feature this engine does not implement
    #[error("unsupported: {0}")]
    Unsupported(&'static str),

    /// ECDSA verification failed
    #[error("signature verification failed")]
    SignatureVerificationFailed,

    /// an implicit certificate's key pair could not be reconstructed, or
    /// the reconstructed pair is inconsistent
    #[error("key reconstruction failed")]
    KeyReconstructionFailed,

    /// the reference time lies outside the CRL's issue/next-CRL window
    #[error("CRL period does not cover the reference time")]
    InvalidPeriod,

    /// no security profile is registered for the PSID
    #[error("no security profile for the PSID")]
    NoSecProfile,

    /// no local credential is valid at the requested signing time
    #[error("no credential available at the requested time")]
    NoAvailableCmh,

    /// a rotating-set index exceeds the range permitted for the class
    #[error("rotating-set j value out of range")]
    JValueOutOfRange,

    /// the verification queue is at capacity; the caller may retry
    #[error("work queue full")]
    WorkQueueFull,

    /// the engine has been released and accepts no further work
    #[error("engine stopped")]
    EngineStopped,

    /// a file-level convenience wrapper failed to read its input
    #[error("i/o: {0}")]
    Io(String),
}

impl Error {
    /// The stable result code of this failure kind. Zero is success;
    /// every kind maps to a distinct negative value.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Error::InvalidParameter(_) => -1,
            Error::CertSizeOutOfBounds(_) => -2,
            Error::AlreadyPresent => -3,
            Error::NoIssuerCert => -4,
            Error::ValidityNotEnclosed => -5,
            Error::ChainSignatureInvalid => -6,
            Error::Revoked => -7,
            Error::Expired => -8,
            Error::TooShort => -9,
            Error::Decode(_) => -10,
            Error::Encode(_) => -11,
            Error::Unsupported(_) => -12,
            Error::SignatureVerificationFailed => -13,
            Error::KeyReconstructionFailed => -14,
            Error::InvalidPeriod => -15,
            Error::NoSecProfile => -16,
            Error::NoAvailableCmh => -17,
            Error::JValueOutOfRange => -18,
            Error::WorkQueueFull => -19,
            Error::EngineStopped => -20,
            Error::Io(_) => -21,
        }
    }
}

impl From<DecodeError> for Error {
    fn from(value: DecodeError) -> Self {
        match value {
            DecodeError::TooShort => Error::TooShort,
            other => Error::Decode(other.to_string()),
        }
    }
}

impl From<EncodeError> for Error {
    fn from(value: EncodeError) -> Self {
        Error::Encode(value.message().into())
    }
}
