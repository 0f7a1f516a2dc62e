//! DSA domain parameters, keys, and signatures (FIPS 186-4).
//!
//! Parameter generation follows the FIPS-compatible candidate search:
//! a prime q of N bits, then up to 4L candidates for a prime p with
//! q | (p - 1), then the smallest h >= 2 whose power generates the
//! order-q subgroup.
//!
//! Sign and verify take the message as a caller-hashed, caller-truncated
//! digest: the leftmost ceil(N/8) bytes are interpreted directly as the
//! integer z. There is no hashing inside this module.

use rand_core::{CryptoRng, RngCore};
use tracing::debug;
use zeroize::Zeroize;

use crate::bigint::{BigInt, Montgomery};
use crate::der::{Reader, Writer, TAG_INTEGER};
use crate::error::CryptoError;
use crate::prime;
use crate::util;

const MIN_P_BITS: usize = 1024;
const MAX_P_BITS: usize = 3072;

/// DSA signing retry budget; only degenerate keys need more than one
/// attempt.
const SIGN_ATTEMPTS: usize = 10;

/// Domain parameters `(p, q, g)`. Field buffers are canonical trimmed
/// big-endian bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DsaParams {
    p: Vec<u8>,
    q: Vec<u8>,
    g: Vec<u8>,
}

impl DsaParams {
    pub fn from_parts(p: &[u8], q: &[u8], g: &[u8]) -> Self {
        Self {
            p: util::trim_leading_zeros(p),
            q: util::trim_leading_zeros(q),
            g: util::trim_leading_zeros(g),
        }
    }

    pub fn p(&self) -> &[u8] {
        &self.p
    }

    pub fn q(&self) -> &[u8] {
        &self.q
    }

    pub fn g(&self) -> &[u8] {
        &self.g
    }

    /// L, the bit length of p.
    pub fn bits(&self) -> usize {
        bits_of(&self.p)
    }

    /// N, the bit length of q.
    pub fn q_bits(&self) -> usize {
        bits_of(&self.q)
    }

    pub fn size(&self) -> usize {
        (self.bits() + 7) / 8
    }

    /// Byte width of r and s: ceil(N/8).
    pub fn q_size(&self) -> usize {
        (self.q_bits() + 7) / 8
    }

    /// `Dss-Parms ::= SEQUENCE { p, q, g }`.
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_sequence(|w| {
            w.write_unsigned_integer(&self.p);
            w.write_unsigned_integer(&self.q);
            w.write_unsigned_integer(&self.g);
        });
        w.into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CryptoError> {
        let mut r = Reader::new(bytes);
        let mut seq = r.read_sequence()?;
        r.finish()?;
        let p = seq.read_unsigned_integer()?.to_vec();
        let q = seq.read_unsigned_integer()?.to_vec();
        let g = seq.read_unsigned_integer()?.to_vec();
        seq.finish()?;
        Ok(Self { p, q, g })
    }
}

/// Public key: domain parameters plus `y = g^x mod p`.
#[derive(Clone, Debug)]
pub struct DsaPublicKey {
    params: DsaParams,
    y: Vec<u8>,
}

impl PartialEq for DsaPublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.params == other.params && util::ct_eq(&self.y, &other.y)
    }
}

impl Eq for DsaPublicKey {}

impl DsaPublicKey {
    pub fn from_parts(params: DsaParams, y: &[u8]) -> Self {
        Self {
            params,
            y: util::trim_leading_zeros(y),
        }
    }

    pub fn params(&self) -> &DsaParams {
        &self.params
    }

    pub fn y(&self) -> &[u8] {
        &self.y
    }

    pub fn bits(&self) -> usize {
        self.params.bits()
    }

    pub fn size(&self) -> usize {
        self.params.size()
    }

    /// `SEQUENCE { version, p, q, g, y }`.
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_sequence(|w| {
            w.write_version(0);
            w.write_unsigned_integer(&self.params.p);
            w.write_unsigned_integer(&self.params.q);
            w.write_unsigned_integer(&self.params.g);
            w.write_unsigned_integer(&self.y);
        });
        w.into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CryptoError> {
        let mut r = Reader::new(bytes);
        let mut seq = r.read_sequence()?;
        r.finish()?;
        seq.read_version(0)?;
        let p = seq.read_unsigned_integer()?.to_vec();
        let q = seq.read_unsigned_integer()?.to_vec();
        let g = seq.read_unsigned_integer()?.to_vec();
        let y = seq.read_unsigned_integer()?.to_vec();
        seq.finish()?;
        Ok(Self {
            params: DsaParams { p, q, g },
            y,
        })
    }

    /// Decode either the self-contained SEQUENCE form or the OpenSSL
    /// bare-INTEGER `y` form, which needs externally supplied parameters.
    pub fn decode_with_params(params: &DsaParams, bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.first() == Some(&TAG_INTEGER) {
            let mut r = Reader::new(bytes);
            let y = r.read_unsigned_integer()?.to_vec();
            r.finish()?;
            return Ok(Self {
                params: params.clone(),
                y,
            });
        }
        Self::decode(bytes)
    }
}

/// Private key: the public key plus the secret exponent x, zeroized on
/// drop.
#[derive(Clone)]
pub struct DsaPrivateKey {
    public: DsaPublicKey,
    x: Vec<u8>,
}

impl Drop for DsaPrivateKey {
    fn drop(&mut self) {
        self.x.zeroize();
    }
}

impl std::fmt::Debug for DsaPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DsaPrivateKey")
            .field("bits", &self.public.bits())
            .finish()
    }
}

impl PartialEq for DsaPrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.public == other.public && util::ct_eq(&self.x, &other.x)
    }
}

impl Eq for DsaPrivateKey {}

impl DsaPrivateKey {
    pub fn from_parts(params: DsaParams, y: &[u8], x: &[u8]) -> Self {
        Self {
            public: DsaPublicKey::from_parts(params, y),
            x: util::trim_leading_zeros(x),
        }
    }

    pub fn params(&self) -> &DsaParams {
        self.public.params()
    }

    pub fn public_key(&self) -> &DsaPublicKey {
        &self.public
    }

    pub fn x(&self) -> &[u8] {
        &self.x
    }

    pub fn bits(&self) -> usize {
        self.public.bits()
    }

    pub fn size(&self) -> usize {
        self.public.size()
    }

    /// Public half of the key.
    pub fn to_public(&self) -> DsaPublicKey {
        self.public.clone()
    }

    /// `SEQUENCE { version, p, q, g, y, x }` (OpenSSL DSAPrivateKey).
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_sequence(|w| {
            w.write_version(0);
            w.write_unsigned_integer(&self.public.params.p);
            w.write_unsigned_integer(&self.public.params.q);
            w.write_unsigned_integer(&self.public.params.g);
            w.write_unsigned_integer(&self.public.y);
            w.write_unsigned_integer(&self.x);
        });
        w.into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CryptoError> {
        let mut r = Reader::new(bytes);
        let mut seq = r.read_sequence()?;
        r.finish()?;
        seq.read_version(0)?;
        let p = seq.read_unsigned_integer()?.to_vec();
        let q = seq.read_unsigned_integer()?.to_vec();
        let g = seq.read_unsigned_integer()?.to_vec();
        let y = seq.read_unsigned_integer()?.to_vec();
        let x = seq.read_unsigned_integer()?.to_vec();
        seq.finish()?;
        Ok(Self {
            public: DsaPublicKey {
                params: DsaParams { p, q, g },
                y,
            },
            x,
        })
    }
}

/// A signature `(r, s)`, each exactly ceil(N/8) bytes, left-padded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DsaSignature {
    r: Vec<u8>,
    s: Vec<u8>,
}

impl DsaSignature {
    pub fn from_parts(r: &[u8], s: &[u8]) -> Self {
        Self {
            r: r.to_vec(),
            s: s.to_vec(),
        }
    }

    pub fn r(&self) -> &[u8] {
        &self.r
    }

    pub fn s(&self) -> &[u8] {
        &self.s
    }

    /// Fixed-width wire form `r || s`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.r.len() + self.s.len());
        out.extend_from_slice(&self.r);
        out.extend_from_slice(&self.s);
        out
    }

    /// Split an `r || s` concatenation down the middle.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.is_empty() || bytes.len() % 2 != 0 {
            return Err(CryptoError::Decode("signature length must be even".into()));
        }
        let (r, s) = bytes.split_at(bytes.len() / 2);
        Ok(Self {
            r: r.to_vec(),
            s: s.to_vec(),
        })
    }
}

fn bits_of(canonical: &[u8]) -> usize {
    match canonical.first() {
        None => 0,
        Some(&top) => (canonical.len() - 1) * 8 + (8 - top.leading_zeros() as usize),
    }
}

/// N for a requested L: 160 below 2048 bits, 256 from 2048 up.
fn q_bits_for(l_bits: usize) -> usize {
    if l_bits < 2048 {
        160
    } else {
        256
    }
}

/// Generate domain parameters with p of exactly `bits` bits.
///
/// `bits` must lie in [1024, 3072]. Each q candidate gets a budget of 4L
/// p candidates before q is regenerated.
pub fn params_generate<R: CryptoRng + RngCore>(
    bits: usize,
    rng: &mut R,
) -> Result<DsaParams, CryptoError> {
    if !(MIN_P_BITS..=MAX_P_BITS).contains(&bits) {
        return Err(CryptoError::InvalidParameter("unsupported parameter size"));
    }
    let n_bits = q_bits_for(bits);
    let one = BigInt::one();

    let (p, q) = 'search: loop {
        let q = prime::generate_prime(n_bits, prime::MILLER_RABIN_ROUNDS, rng)?;
        for _ in 0..(4 * bits) {
            let candidate = BigInt::random_bits(rng, bits);
            let rem = &candidate % &q;
            // p = candidate - (rem - 1), so q divides p - 1.
            let mut p = &candidate + &one;
            if !rem.is_zero() {
                p = &p - &rem;
            }
            if p.bit_length() < bits {
                continue;
            }
            if prime::probably_prime(&p, prime::MILLER_RABIN_ROUNDS, rng) {
                break 'search (p, q);
            }
        }
        debug!(bits, "p-candidate budget exhausted, regenerating q");
    };

    // Smallest h >= 2 with g = h^((p-1)/q) != 1 generates the subgroup.
    let exp = &(&p - &one) / &q;
    let mont_p = Montgomery::new(&p)?;
    let mut h = BigInt::from_u64(2);
    let g = loop {
        let g = mont_p.pow(&h, &exp);
        if !g.is_one() {
            break g;
        }
        h = &h + &one;
    };

    debug!(bits, n_bits, "dsa domain parameters settled");
    Ok(DsaParams {
        p: p.to_bytes_be(),
        q: q.to_bytes_be(),
        g: g.to_bytes_be(),
    })
}

/// Validate domain parameters: admissible sizes, p and q prime,
/// q | (p - 1), and g a nontrivial element of the order-q subgroup.
pub fn params_verify<R: CryptoRng + RngCore>(
    params: &DsaParams,
    rng: &mut R,
) -> Result<(), CryptoError> {
    let p = BigInt::from_bytes_be(&params.p);
    let q = BigInt::from_bytes_be(&params.q);
    let g = BigInt::from_bytes_be(&params.g);
    let one = BigInt::one();

    let l = p.bit_length();
    let n = q.bit_length();
    if !(MIN_P_BITS..=MAX_P_BITS).contains(&l) {
        return Err(CryptoError::InvalidKey("prime modulus size out of range"));
    }
    if n != 160 && n != 224 && n != 256 {
        return Err(CryptoError::InvalidKey("subgroup order size out of range"));
    }
    if g <= one || g >= p {
        return Err(CryptoError::InvalidKey("generator out of range"));
    }
    if !(&(&p - &one) % &q).is_zero() {
        return Err(CryptoError::InvalidKey("q does not divide p - 1"));
    }
    if !prime::probably_prime(&q, prime::MILLER_RABIN_ROUNDS, rng) {
        return Err(CryptoError::InvalidKey("q fails primality"));
    }
    if !prime::probably_prime(&p, prime::MILLER_RABIN_ROUNDS, rng) {
        return Err(CryptoError::InvalidKey("p fails primality"));
    }
    if !Montgomery::new(&p)?.pow(&g, &q).is_one() {
        return Err(CryptoError::InvalidKey("generator has wrong order"));
    }
    Ok(())
}

/// `y = g^x mod p` for a private exponent `0 < x < q`.
pub fn compute_y(params: &DsaParams, x: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let p = BigInt::from_bytes_be(&params.p);
    let q = BigInt::from_bytes_be(&params.q);
    let g = BigInt::from_bytes_be(&params.g);
    let x = BigInt::from_bytes_be(x);
    if x.is_zero() || x >= q {
        return Err(CryptoError::InvalidKey("private exponent out of range"));
    }
    let y = Montgomery::new(&p)?.pow_secret(&g, &x);
    Ok(y.to_bytes_be())
}

/// Fresh private key under existing parameters: x uniform in [1, q-1].
pub fn private_key_create<R: CryptoRng + RngCore>(
    params: &DsaParams,
    rng: &mut R,
) -> Result<DsaPrivateKey, CryptoError> {
    let q = BigInt::from_bytes_be(&params.q);
    let x = BigInt::random_below(rng, &q)?;
    let x_bytes = x.to_bytes_be();
    let y = compute_y(params, &x_bytes)?;
    Ok(DsaPrivateKey {
        public: DsaPublicKey {
            params: params.clone(),
            y: util::trim_leading_zeros(&y),
        },
        x: x_bytes,
    })
}

/// Parameters and key in one step.
pub fn private_key_generate<R: CryptoRng + RngCore>(
    bits: usize,
    rng: &mut R,
) -> Result<DsaPrivateKey, CryptoError> {
    let params = params_generate(bits, rng)?;
    private_key_create(&params, rng)
}

/// Attach a public value to parameters.
pub fn public_key_create(params: &DsaParams, y: &[u8]) -> DsaPublicKey {
    DsaPublicKey::from_parts(params.clone(), y)
}

/// Validate a public key: valid parameters, `0 < y < p`, and y inside
/// the order-q subgroup.
pub fn public_key_verify<R: CryptoRng + RngCore>(
    key: &DsaPublicKey,
    rng: &mut R,
) -> Result<(), CryptoError> {
    params_verify(&key.params, rng)?;
    let p = BigInt::from_bytes_be(&key.params.p);
    let q = BigInt::from_bytes_be(&key.params.q);
    let y = BigInt::from_bytes_be(&key.y);
    if y.is_zero() || y >= p {
        return Err(CryptoError::InvalidKey("public value out of range"));
    }
    if !Montgomery::new(&p)?.pow(&y, &q).is_one() {
        return Err(CryptoError::InvalidKey("public value outside the subgroup"));
    }
    Ok(())
}

/// Validate a private key: valid public key, `0 < x < q`, and
/// `y = g^x mod p`.
pub fn private_key_verify<R: CryptoRng + RngCore>(
    key: &DsaPrivateKey,
    rng: &mut R,
) -> Result<(), CryptoError> {
    public_key_verify(&key.public, rng)?;
    let params = &key.public.params;
    let q = BigInt::from_bytes_be(&params.q);
    let x = BigInt::from_bytes_be(&key.x);
    if x.is_zero() || x >= q {
        return Err(CryptoError::InvalidKey("private exponent out of range"));
    }
    let y = compute_y(params, &key.x)?;
    if !util::ct_eq(&y, &key.public.y) {
        return Err(CryptoError::InvalidKey("public value does not match x"));
    }
    Ok(())
}

/// Sign a caller-hashed digest.
///
/// The leftmost ceil(N/8) bytes of `msg` are the integer z; the caller
/// is responsible for hashing and truncating to N bits. q's bit length
/// must be a multiple of 8. Retries up to ten times on r = 0 or s = 0,
/// then reports `SignatureFailed`.
pub fn sign<R: CryptoRng + RngCore>(
    msg: &[u8],
    key: &DsaPrivateKey,
    rng: &mut R,
) -> Result<DsaSignature, CryptoError> {
    let params = &key.public.params;
    let p = BigInt::from_bytes_be(&params.p);
    let q = BigInt::from_bytes_be(&params.q);
    let g = BigInt::from_bytes_be(&params.g);
    let x = BigInt::from_bytes_be(&key.x);

    let q_bits = q.bit_length();
    if q_bits == 0 || q_bits % 8 != 0 {
        return Err(CryptoError::InvalidKey("subgroup order not byte aligned"));
    }
    if x.is_zero() || x >= q {
        return Err(CryptoError::InvalidKey("private exponent out of range"));
    }
    let q_size = q_bits / 8;
    let z = BigInt::from_bytes_be(&msg[..msg.len().min(q_size)]);

    let mont_p = Montgomery::new(&p)?;
    let mont_q = Montgomery::new(&q)?;
    let q_minus_2 = &q - &BigInt::from_u64(2);

    for _ in 0..SIGN_ATTEMPTS {
        let k = BigInt::random_below(rng, &q)?;
        let r = &mont_p.pow_secret(&g, &k) % &q;
        if r.is_zero() {
            continue;
        }
        // Fermat inverse: k^(q-2) mod q. Unlike the euclidean inverse its
        // schedule does not depend on k.
        let k_inv = mont_q.pow_secret(&k, &q_minus_2);
        let xr = &(&x * &r) % &q;
        let s = &(&k_inv * &(&(&z + &xr) % &q)) % &q;
        if s.is_zero() {
            continue;
        }
        return Ok(DsaSignature {
            r: r.to_bytes_be_padded(q_size)?,
            s: s.to_bytes_be_padded(q_size)?,
        });
    }
    Err(CryptoError::SignatureFailed)
}

/// Verify a signature over a caller-hashed digest. Returns `false` for
/// any malformed key or signature: r or s outside (0, q), wrong widths,
/// or a failed congruence.
pub fn verify(msg: &[u8], sig: &DsaSignature, key: &DsaPublicKey) -> bool {
    verify_inner(msg, sig, key).unwrap_or(false)
}

fn verify_inner(msg: &[u8], sig: &DsaSignature, key: &DsaPublicKey) -> Result<bool, CryptoError> {
    let params = &key.params;
    let p = BigInt::from_bytes_be(&params.p);
    let q = BigInt::from_bytes_be(&params.q);
    let g = BigInt::from_bytes_be(&params.g);
    let y = BigInt::from_bytes_be(&key.y);
    let one = BigInt::one();

    if p <= one || q <= one || !p.is_odd() || !q.is_odd() {
        return Ok(false);
    }
    let q_size = (q.bit_length() + 7) / 8;
    if sig.r.len() != q_size || sig.s.len() != q_size {
        return Ok(false);
    }
    let r = BigInt::from_bytes_be(&sig.r);
    let s = BigInt::from_bytes_be(&sig.s);
    if r.is_zero() || r >= q || s.is_zero() || s >= q {
        return Ok(false);
    }

    let w = match s.mod_inverse(&q) {
        Some(w) => w,
        None => return Ok(false),
    };
    let z = BigInt::from_bytes_be(&msg[..msg.len().min(q_size)]);
    let u1 = &(&z * &w) % &q;
    let u2 = &(&r * &w) % &q;
    let mont_p = Montgomery::new(&p)?;
    let v1 = mont_p.pow(&g, &u1);
    let v2 = mont_p.pow(&y, &u2);
    let v = &(&(&v1 * &v2) % &p) % &q;
    Ok(v == r)
}

/// [`sign`] over a DER-encoded private key.
pub fn sign_der<R: CryptoRng + RngCore>(
    msg: &[u8],
    key_der: &[u8],
    rng: &mut R,
) -> Result<DsaSignature, CryptoError> {
    let key = DsaPrivateKey::decode(key_der)?;
    sign(msg, &key, rng)
}

/// [`verify`] over a DER-encoded public key.
pub fn verify_der(msg: &[u8], sig: &DsaSignature, key_der: &[u8]) -> bool {
    match DsaPublicKey::decode(key_der) {
        Ok(key) => verify(msg, sig, &key),
        Err(_) => false,
    }
}
