use thiserror::Error;

use crate::der::DerError;

/// Errors that can occur during cryptographic operations.
///
/// `verify`-family operations never surface these for untrusted inputs;
/// they report `false` instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// A bit size, digest id, or other argument outside the allowed set.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// Malformed DER, base64, or JSON key material.
    #[error("decode error: {0}")]
    Decode(String),

    /// Structural or algebraic key-validation failure.
    #[error("invalid key: {0}")]
    InvalidKey(&'static str),

    /// RSA message plus padding exceeds the modulus size.
    #[error("message too long for modulus")]
    MessageTooLong,

    /// DSA signing exhausted its retry budget.
    #[error("signing exhausted its retry budget")]
    SignatureFailed,
}

impl From<DerError> for CryptoError {
    fn from(err: DerError) -> Self {
        CryptoError::Decode(err.to_string())
    }
}
