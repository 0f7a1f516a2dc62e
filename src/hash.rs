//! The hash collaborator surface.
//!
//! The engines never implement digests themselves; they consume a
//! [`HashAlg`] — an identifier, an output size, and a one-shot digest
//! function. Built-in instances cover the SHA family; callers signing
//! with anything else (MD5, RIPEMD-160, ..) construct their own.

use sha2::Digest;

/// A message digest algorithm: `{ id, size, hash }`.
#[derive(Clone, Copy)]
pub struct HashAlg {
    /// Identifier used to select the PKCS#1 DigestInfo prefix.
    pub id: &'static str,
    /// Digest output size in bytes.
    pub size: usize,
    hash_fn: fn(&[u8]) -> Vec<u8>,
}

impl HashAlg {
    pub const fn new(id: &'static str, size: usize, hash_fn: fn(&[u8]) -> Vec<u8>) -> Self {
        Self { id, size, hash_fn }
    }

    /// One-shot digest of `data`; output is exactly `size` bytes.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        (self.hash_fn)(data)
    }
}

impl std::fmt::Debug for HashAlg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashAlg")
            .field("id", &self.id)
            .field("size", &self.size)
            .finish()
    }
}

fn sha1_digest(data: &[u8]) -> Vec<u8> {
    sha1::Sha1::digest(data).to_vec()
}

fn sha224_digest(data: &[u8]) -> Vec<u8> {
    sha2::Sha224::digest(data).to_vec()
}

fn sha256_digest(data: &[u8]) -> Vec<u8> {
    sha2::Sha256::digest(data).to_vec()
}

fn sha384_digest(data: &[u8]) -> Vec<u8> {
    sha2::Sha384::digest(data).to_vec()
}

fn sha512_digest(data: &[u8]) -> Vec<u8> {
    sha2::Sha512::digest(data).to_vec()
}

pub static SHA1: HashAlg = HashAlg::new("SHA1", 20, sha1_digest);
pub static SHA224: HashAlg = HashAlg::new("SHA224", 28, sha224_digest);
pub static SHA256: HashAlg = HashAlg::new("SHA256", 32, sha256_digest);
pub static SHA384: HashAlg = HashAlg::new("SHA384", 48, sha384_digest);
pub static SHA512: HashAlg = HashAlg::new("SHA512", 64, sha512_digest);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_abc() {
        assert_eq!(
            hex::encode(SHA256.digest(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_sha1_abc() {
        assert_eq!(
            hex::encode(SHA1.digest(b"abc")),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn test_sizes() {
        for alg in [&SHA1, &SHA224, &SHA256, &SHA384, &SHA512] {
            assert_eq!(alg.digest(b"x").len(), alg.size);
        }
    }
}
