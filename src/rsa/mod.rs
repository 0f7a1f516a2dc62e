//! RSA key generation, validation, and PKCS#1 v1.5 signatures.
//!
//! Private operations run through CRT exponentiation with Kocher base
//! blinding and a constant-time ladder; verification reconstructs the
//! expected encoded message and compares in constant time
//! (encode-and-compare — the signed payload's ASN.1 is never parsed).

pub(crate) mod padding;

use rand_core::{CryptoRng, RngCore};
use tracing::debug;
use zeroize::Zeroize;

use crate::bigint::{BigInt, Montgomery};
use crate::der::{Reader, Writer};
use crate::error::CryptoError;
use crate::hash::HashAlg;
use crate::prime;
use crate::util;

/// Fixed public exponent for generated keys.
pub const PUBLIC_EXPONENT: u64 = 65537;

const ALLOWED_MODULUS_BITS: [usize; 5] = [512, 1024, 2048, 4096, 8192];
const MIN_MODULUS_BITS: usize = 512;
const MAX_EXPONENT_BITS: usize = 33;

/// RSA public key `(n, e)`. Field buffers are canonical trimmed
/// big-endian bytes.
#[derive(Clone, Debug)]
pub struct RsaPublicKey {
    n: Vec<u8>,
    e: Vec<u8>,
}

impl PartialEq for RsaPublicKey {
    fn eq(&self, other: &Self) -> bool {
        util::ct_eq(&self.n, &other.n) && util::ct_eq(&self.e, &other.e)
    }
}

impl Eq for RsaPublicKey {}

impl RsaPublicKey {
    pub fn from_parts(n: &[u8], e: &[u8]) -> Self {
        Self {
            n: util::trim_leading_zeros(n),
            e: util::trim_leading_zeros(e),
        }
    }

    pub fn n(&self) -> &[u8] {
        &self.n
    }

    pub fn e(&self) -> &[u8] {
        &self.e
    }

    /// Modulus bit length.
    pub fn bits(&self) -> usize {
        bits_of(&self.n)
    }

    /// Modulus byte size; signatures are exactly this long.
    pub fn size(&self) -> usize {
        (self.bits() + 7) / 8
    }

    /// `RSAPublicKey ::= SEQUENCE { n INTEGER, e INTEGER }`.
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_sequence(|w| {
            w.write_unsigned_integer(&self.n);
            w.write_unsigned_integer(&self.e);
        });
        w.into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CryptoError> {
        let mut r = Reader::new(bytes);
        let mut seq = r.read_sequence()?;
        r.finish()?;
        let n = seq.read_unsigned_integer()?.to_vec();
        let e = seq.read_unsigned_integer()?.to_vec();
        seq.finish()?;
        Ok(Self { n, e })
    }
}

/// RSA private key `(n, e, d, p, q, dp, dq, qi)` with `p > q`.
/// Secret field buffers are zeroized on drop.
#[derive(Clone)]
pub struct RsaPrivateKey {
    n: Vec<u8>,
    e: Vec<u8>,
    d: Vec<u8>,
    p: Vec<u8>,
    q: Vec<u8>,
    dp: Vec<u8>,
    dq: Vec<u8>,
    qi: Vec<u8>,
}

impl Drop for RsaPrivateKey {
    fn drop(&mut self) {
        self.d.zeroize();
        self.p.zeroize();
        self.q.zeroize();
        self.dp.zeroize();
        self.dq.zeroize();
        self.qi.zeroize();
    }
}

impl std::fmt::Debug for RsaPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaPrivateKey")
            .field("bits", &self.bits())
            .finish()
    }
}

impl PartialEq for RsaPrivateKey {
    fn eq(&self, other: &Self) -> bool {
        util::ct_eq(&self.n, &other.n)
            && util::ct_eq(&self.e, &other.e)
            && util::ct_eq(&self.d, &other.d)
            && util::ct_eq(&self.p, &other.p)
            && util::ct_eq(&self.q, &other.q)
            && util::ct_eq(&self.dp, &other.dp)
            && util::ct_eq(&self.dq, &other.dq)
            && util::ct_eq(&self.qi, &other.qi)
    }
}

impl Eq for RsaPrivateKey {}

impl RsaPrivateKey {
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        n: &[u8],
        e: &[u8],
        d: &[u8],
        p: &[u8],
        q: &[u8],
        dp: &[u8],
        dq: &[u8],
        qi: &[u8],
    ) -> Self {
        Self {
            n: util::trim_leading_zeros(n),
            e: util::trim_leading_zeros(e),
            d: util::trim_leading_zeros(d),
            p: util::trim_leading_zeros(p),
            q: util::trim_leading_zeros(q),
            dp: util::trim_leading_zeros(dp),
            dq: util::trim_leading_zeros(dq),
            qi: util::trim_leading_zeros(qi),
        }
    }

    pub fn n(&self) -> &[u8] {
        &self.n
    }

    pub fn e(&self) -> &[u8] {
        &self.e
    }

    pub fn d(&self) -> &[u8] {
        &self.d
    }

    pub fn p(&self) -> &[u8] {
        &self.p
    }

    pub fn q(&self) -> &[u8] {
        &self.q
    }

    pub fn dp(&self) -> &[u8] {
        &self.dp
    }

    pub fn dq(&self) -> &[u8] {
        &self.dq
    }

    pub fn qi(&self) -> &[u8] {
        &self.qi
    }

    pub fn bits(&self) -> usize {
        bits_of(&self.n)
    }

    pub fn size(&self) -> usize {
        (self.bits() + 7) / 8
    }

    /// Public half of the key.
    pub fn to_public(&self) -> RsaPublicKey {
        RsaPublicKey {
            n: self.n.clone(),
            e: self.e.clone(),
        }
    }

    /// `RSAPrivateKey ::= SEQUENCE { version, n, e, d, p, q, dp, dq, qi }`
    /// (RFC 8017 A.1.2, two-prime version 0).
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_sequence(|w| {
            w.write_version(0);
            w.write_unsigned_integer(&self.n);
            w.write_unsigned_integer(&self.e);
            w.write_unsigned_integer(&self.d);
            w.write_unsigned_integer(&self.p);
            w.write_unsigned_integer(&self.q);
            w.write_unsigned_integer(&self.dp);
            w.write_unsigned_integer(&self.dq);
            w.write_unsigned_integer(&self.qi);
        });
        w.into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CryptoError> {
        let mut r = Reader::new(bytes);
        let mut seq = r.read_sequence()?;
        r.finish()?;
        seq.read_version(0)?;
        let n = seq.read_unsigned_integer()?.to_vec();
        let e = seq.read_unsigned_integer()?.to_vec();
        let d = seq.read_unsigned_integer()?.to_vec();
        let p = seq.read_unsigned_integer()?.to_vec();
        let q = seq.read_unsigned_integer()?.to_vec();
        let dp = seq.read_unsigned_integer()?.to_vec();
        let dq = seq.read_unsigned_integer()?.to_vec();
        let qi = seq.read_unsigned_integer()?.to_vec();
        seq.finish()?;
        Ok(Self {
            n,
            e,
            d,
            p,
            q,
            dp,
            dq,
            qi,
        })
    }
}

fn bits_of(canonical: &[u8]) -> usize {
    match canonical.first() {
        None => 0,
        Some(&top) => (canonical.len() - 1) * 8 + (8 - top.leading_zeros() as usize),
    }
}

/// Generate a key with modulus of exactly `bits` bits and e = 65537.
///
/// `bits` must be one of 512, 1024, 2048, 4096, 8192. Primes are drawn
/// until `gcd(e, p-1) = 1`, `|p - q| > 2^(bits/2 - 100)`, and `p·q` has
/// exactly `bits` bits.
pub fn generate_key<R: CryptoRng + RngCore>(
    bits: usize,
    rng: &mut R,
) -> Result<RsaPrivateKey, CryptoError> {
    if !ALLOWED_MODULUS_BITS.contains(&bits) {
        return Err(CryptoError::InvalidParameter("unsupported modulus size"));
    }
    let e = BigInt::from_u64(PUBLIC_EXPONENT);
    let one = BigInt::one();
    let half = bits / 2;

    let mut attempts = 0usize;
    loop {
        attempts += 1;
        let p = generate_prime_coprime(bits - half, &e, rng)?;
        let q = generate_prime_coprime(half, &e, rng)?;
        if p == q {
            continue;
        }
        let (p, q) = if p < q { (q, p) } else { (p, q) };

        let diff = &p - &q;
        if diff.bit_length() <= half - 100 {
            continue;
        }
        let n = &p * &q;
        if n.bit_length() != bits {
            continue;
        }

        let p1 = &p - &one;
        let q1 = &q - &one;
        let lambda = &(&p1 * &q1) / &p1.gcd(&q1);
        let d = match e.mod_inverse(&lambda) {
            Some(d) => d,
            None => continue,
        };
        let dp = &d % &p1;
        let dq = &d % &q1;
        let qi = match q.mod_inverse(&p) {
            Some(qi) => qi,
            None => continue,
        };

        debug!(bits, attempts, "rsa key pair settled");
        return Ok(RsaPrivateKey {
            n: n.to_bytes_be(),
            e: e.to_bytes_be(),
            d: d.to_bytes_be(),
            p: p.to_bytes_be(),
            q: q.to_bytes_be(),
            dp: dp.to_bytes_be(),
            dq: dq.to_bytes_be(),
            qi: qi.to_bytes_be(),
        });
    }
}

fn generate_prime_coprime<R: CryptoRng + RngCore>(
    bits: usize,
    e: &BigInt,
    rng: &mut R,
) -> Result<BigInt, CryptoError> {
    let one = BigInt::one();
    loop {
        let p = prime::generate_prime(bits, prime::MILLER_RABIN_ROUNDS, rng)?;
        if (&p - &one).gcd(e).is_one() {
            return Ok(p);
        }
    }
}

/// Public key of a private key.
pub fn public_key_create(key: &RsaPrivateKey) -> RsaPublicKey {
    key.to_public()
}

/// Structural checks on a public key: odd n of at least 512 bits, odd e
/// with `3 <= e < min(n, 2^33)`.
pub fn public_key_verify(key: &RsaPublicKey) -> Result<(), CryptoError> {
    let n = BigInt::from_bytes_be(&key.n);
    let e = BigInt::from_bytes_be(&key.e);
    if n.bit_length() < MIN_MODULUS_BITS {
        return Err(CryptoError::InvalidKey("modulus too small"));
    }
    if !n.is_odd() {
        return Err(CryptoError::InvalidKey("modulus is even"));
    }
    if !e.is_odd() {
        return Err(CryptoError::InvalidKey("public exponent is even"));
    }
    if e < BigInt::from_u64(3) {
        return Err(CryptoError::InvalidKey("public exponent too small"));
    }
    if e.bit_length() > MAX_EXPONENT_BITS {
        return Err(CryptoError::InvalidKey("public exponent too large"));
    }
    if e >= n {
        return Err(CryptoError::InvalidKey("public exponent exceeds modulus"));
    }
    Ok(())
}

/// Full algebraic validation of a private key: primality of p and q,
/// `n = p·q`, CRT exponents, `qi·q ≡ 1 (mod p)`, and
/// `e·d ≡ 1 (mod lcm(p-1, q-1))`.
pub fn private_key_verify<R: CryptoRng + RngCore>(
    key: &RsaPrivateKey,
    rng: &mut R,
) -> Result<(), CryptoError> {
    public_key_verify(&key.to_public())?;

    let n = BigInt::from_bytes_be(&key.n);
    let e = BigInt::from_bytes_be(&key.e);
    let d = BigInt::from_bytes_be(&key.d);
    let p = BigInt::from_bytes_be(&key.p);
    let q = BigInt::from_bytes_be(&key.q);
    let dp = BigInt::from_bytes_be(&key.dp);
    let dq = BigInt::from_bytes_be(&key.dq);
    let qi = BigInt::from_bytes_be(&key.qi);
    let one = BigInt::one();

    if p == q {
        return Err(CryptoError::InvalidKey("prime factors are equal"));
    }
    if &(&p * &q) != &n {
        return Err(CryptoError::InvalidKey("modulus is not p*q"));
    }
    if !prime::probably_prime(&p, prime::MILLER_RABIN_ROUNDS, rng)
        || !prime::probably_prime(&q, prime::MILLER_RABIN_ROUNDS, rng)
    {
        return Err(CryptoError::InvalidKey("prime factor fails primality"));
    }

    let p1 = &p - &one;
    let q1 = &q - &one;
    if &d % &p1 != dp {
        return Err(CryptoError::InvalidKey("dp mismatch"));
    }
    if &d % &q1 != dq {
        return Err(CryptoError::InvalidKey("dq mismatch"));
    }
    if !(&(&qi * &q) % &p).is_one() {
        return Err(CryptoError::InvalidKey("qi is not the inverse of q"));
    }
    let lambda = &(&p1 * &q1) / &p1.gcd(&q1);
    if !(&(&e * &d) % &lambda).is_one() {
        return Err(CryptoError::InvalidKey("d is not the inverse of e"));
    }
    Ok(())
}

/// PKCS#1 v1.5 signature over `msg`; output is exactly `key.size()` bytes.
///
/// The private exponentiation is blinded with a fresh random factor and
/// uses the constant-time ladder mod p and q; the result is checked
/// against the public key before release.
pub fn sign<R: CryptoRng + RngCore>(
    hash: &HashAlg,
    msg: &[u8],
    key: &RsaPrivateKey,
    rng: &mut R,
) -> Result<Vec<u8>, CryptoError> {
    let k = key.size();
    let mut em = padding::emsa_pkcs1_v15(hash.id, &hash.digest(msg), k)?;

    let n = BigInt::from_bytes_be(&key.n);
    let e = BigInt::from_bytes_be(&key.e);
    let p = BigInt::from_bytes_be(&key.p);
    let q = BigInt::from_bytes_be(&key.q);
    let dp = BigInt::from_bytes_be(&key.dp);
    let dq = BigInt::from_bytes_be(&key.dq);
    let qi = BigInt::from_bytes_be(&key.qi);

    let m = BigInt::from_bytes_be(&em);
    em.zeroize();
    if m >= n {
        return Err(CryptoError::InvalidKey("message representative out of range"));
    }

    let mont_n = Montgomery::new(&n)?;
    let mont_p = Montgomery::new(&p)?;
    let mont_q = Montgomery::new(&q)?;

    // Kocher base blinding: operate on m·r^e, strip r afterwards.
    let (r, r_inv) = loop {
        let r = BigInt::random_below(rng, &n)?;
        if let Some(inv) = r.mod_inverse(&n) {
            break (r, inv);
        }
    };
    let blinded = &(&m * &mont_n.pow(&r, &e)) % &n;

    // CRT: m1 = c^dp mod p, m2 = c^dq mod q, recombine through qi.
    let m1 = mont_p.pow_secret(&(&blinded % &p), &dp);
    let m2 = mont_q.pow_secret(&(&blinded % &q), &dq);
    let m2_mod_p = &m2 % &p;
    let delta = if m1 >= m2_mod_p {
        &m1 - &m2_mod_p
    } else {
        &(&m1 + &p) - &m2_mod_p
    };
    let h = &(&qi * &delta) % &p;
    let blinded_sig = &m2 + &(&h * &q);
    let s = &(&blinded_sig * &r_inv) % &n;

    // Protect against fault attacks and inconsistent CRT parameters: a
    // wrong result here would leak key material if released.
    if mont_n.pow(&s, &e) != m {
        return Err(CryptoError::InvalidKey(
            "private operation inconsistent with public key",
        ));
    }

    s.to_bytes_be_padded(k)
}

/// PKCS#1 v1.5 verification. Returns `false` for every malformed or
/// mismatched input; the encoded-message comparison is constant-time
/// over the modulus width.
pub fn verify(hash: &HashAlg, msg: &[u8], sig: &[u8], key: &RsaPublicKey) -> bool {
    verify_inner(hash, msg, sig, key).unwrap_or(false)
}

fn verify_inner(
    hash: &HashAlg,
    msg: &[u8],
    sig: &[u8],
    key: &RsaPublicKey,
) -> Result<bool, CryptoError> {
    public_key_verify(key)?;
    let k = key.size();
    if sig.len() != k {
        return Ok(false);
    }
    let n = BigInt::from_bytes_be(&key.n);
    let e = BigInt::from_bytes_be(&key.e);
    let s = BigInt::from_bytes_be(sig);
    if s >= n {
        return Ok(false);
    }
    let m = Montgomery::new(&n)?.pow(&s, &e);
    let em = m.to_bytes_be_padded(k)?;
    let expected = padding::emsa_pkcs1_v15(hash.id, &hash.digest(msg), k)?;
    Ok(util::ct_eq(&em, &expected))
}

/// [`sign`] over a DER-encoded `RSAPrivateKey`.
pub fn sign_der<R: CryptoRng + RngCore>(
    hash: &HashAlg,
    msg: &[u8],
    key_der: &[u8],
    rng: &mut R,
) -> Result<Vec<u8>, CryptoError> {
    let key = RsaPrivateKey::decode(key_der)?;
    sign(hash, msg, &key, rng)
}

/// [`verify`] over a DER-encoded `RSAPublicKey`.
pub fn verify_der(hash: &HashAlg, msg: &[u8], sig: &[u8], key_der: &[u8]) -> bool {
    match RsaPublicKey::decode(key_der) {
        Ok(key) => verify(hash, msg, sig, &key),
        Err(_) => false,
    }
}

/// [`public_key_verify`] over DER bytes.
pub fn public_key_verify_der(key_der: &[u8]) -> Result<(), CryptoError> {
    public_key_verify(&RsaPublicKey::decode(key_der)?)
}

/// [`private_key_verify`] over DER bytes.
pub fn private_key_verify_der<R: CryptoRng + RngCore>(
    key_der: &[u8],
    rng: &mut R,
) -> Result<(), CryptoError> {
    private_key_verify(&RsaPrivateKey::decode(key_der)?, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{SHA1, SHA256};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::from_seed([17u8; 32])
    }

    #[test]
    fn test_generate_rejects_bad_sizes() {
        let mut rng = rng();
        for bits in [0, 100, 768, 1536, 3072, 16384] {
            assert_eq!(
                generate_key(bits, &mut rng).err(),
                Some(CryptoError::InvalidParameter("unsupported modulus size"))
            );
        }
    }

    #[test]
    fn test_generate_sign_verify_512() {
        let mut rng = rng();
        let key = generate_key(512, &mut rng).unwrap();
        assert_eq!(key.bits(), 512);
        private_key_verify(&key, &mut rng).unwrap();

        let sig = sign(&SHA1, b"hello", &key, &mut rng).unwrap();
        assert_eq!(sig.len(), key.size());
        let public = key.to_public();
        assert!(verify(&SHA1, b"hello", &sig, &public));
        assert!(!verify(&SHA1, b"hellp", &sig, &public));
    }

    #[test]
    fn test_sign_deterministic_output() {
        // PKCS#1 v1.5 is deterministic: blinding must not change the
        // signature bytes.
        let mut rng = rng();
        let key = generate_key(512, &mut rng).unwrap();
        let a = sign(&SHA1, b"msg", &key, &mut rng).unwrap();
        let b = sign(&SHA1, b"msg", &key, &mut rng).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_message_too_long() {
        let mut rng = rng();
        let key = generate_key(512, &mut rng).unwrap();
        // SHA-256 needs 62 bytes of EM; a 512-bit key has 64. SHA-512's
        // 83 does not fit.
        assert!(sign(&SHA256, b"x", &key, &mut rng).is_ok());
        assert_eq!(
            sign(&crate::hash::SHA512, b"x", &key, &mut rng).err(),
            Some(CryptoError::MessageTooLong)
        );
    }

    #[test]
    fn test_verify_rejects_wrong_length() {
        let mut rng = rng();
        let key = generate_key(512, &mut rng).unwrap();
        let public = key.to_public();
        let sig = sign(&SHA256, b"data", &key, &mut rng).unwrap();
        assert!(verify(&SHA256, b"data", &sig, &public));
        assert!(!verify(&SHA256, b"data", &sig[..sig.len() - 1], &public));
        let mut long = sig.clone();
        long.push(0);
        assert!(!verify(&SHA256, b"data", &long, &public));
    }

    #[test]
    fn test_verify_never_panics_on_garbage_key() {
        let garbage = RsaPublicKey::from_parts(&[0x04, 0x00], &[0x03]);
        assert!(!verify(&SHA256, b"m", &[0u8; 2], &garbage));
        assert!(!verify_der(&SHA256, b"m", &[0u8; 64], b"not der"));
    }

    #[test]
    fn test_der_roundtrip() {
        let mut rng = rng();
        let key = generate_key(512, &mut rng).unwrap();
        let der = key.encode();
        let back = RsaPrivateKey::decode(&der).unwrap();
        assert_eq!(key, back);

        let public = key.to_public();
        let back = RsaPublicKey::decode(&public.encode()).unwrap();
        assert_eq!(public, back);
    }

    #[test]
    fn test_private_key_verify_catches_corruption() {
        let mut rng = rng();
        let key = generate_key(512, &mut rng).unwrap();
        let mut dp = key.dp().to_vec();
        dp[0] ^= 1;
        let bad = RsaPrivateKey::from_parts(
            key.n(),
            key.e(),
            key.d(),
            key.p(),
            key.q(),
            &dp,
            key.dq(),
            key.qi(),
        );
        assert!(private_key_verify(&bad, &mut rng).is_err());
        // The fault check refuses to emit a signature under the bad key.
        assert!(sign(&SHA1, b"m", &bad, &mut rng).is_err());
    }

    #[test]
    fn test_public_key_verify_rules() {
        let mut rng = rng();
        let key = generate_key(512, &mut rng).unwrap();
        public_key_verify(&key.to_public()).unwrap();

        let even_e = RsaPublicKey::from_parts(key.n(), &[0x04]);
        assert!(public_key_verify(&even_e).is_err());
        let tiny_e = RsaPublicKey::from_parts(key.n(), &[0x01]);
        assert!(public_key_verify(&tiny_e).is_err());
        let huge_e = RsaPublicKey::from_parts(key.n(), &[0x02, 0, 0, 0, 0x01]);
        assert!(public_key_verify(&huge_e).is_err());
        let small_n = RsaPublicKey::from_parts(&[0xff; 32], &[0x01, 0x00, 0x01]);
        assert!(public_key_verify(&small_n).is_err());
    }
}
