#![deny(unsafe_code)]
#![allow(missing_docs)]

//! Classical public-key cryptographic primitives.
//!
//! This crate implements the following primitives:
//! - RSA: PKCS#1 v1.5 signing and verification with CRT and blinding
//! - DSA: FIPS 186-4 parameter generation, key generation, sign/verify
//! - BigInt: the supporting constant-time big-integer arithmetic
//! - DER: strict PKCS#1-style key serialization
//!
//! Randomness is supplied by the caller through `rand_core`'s
//! `CryptoRng + RngCore`; digests are supplied as [`hash::HashAlg`]
//! collaborators. All operations are synchronous and state-free between
//! calls; key objects are immutable and safe to share across threads.

pub mod bigint;
pub mod der;
pub mod dsa;
pub mod encoding;
pub mod error;
pub mod hash;
pub mod prime;
pub mod rsa;

mod jwk;
mod util;

pub use bigint::{BigInt, Montgomery};
pub use dsa::{DsaParams, DsaPrivateKey, DsaPublicKey, DsaSignature};
pub use error::CryptoError;
pub use hash::{HashAlg, SHA1, SHA224, SHA256, SHA384, SHA512};
pub use rsa::{RsaPrivateKey, RsaPublicKey};
