//! Probabilistic primality testing and prime generation.

use lazy_static::lazy_static;
use rand_core::{CryptoRng, RngCore};
use tracing::trace;

use crate::bigint::{BigInt, Montgomery};
use crate::error::CryptoError;

/// Miller-Rabin rounds for key and parameter generation
/// (FIPS 186-4, Table C.1).
pub const MILLER_RABIN_ROUNDS: usize = 64;

const TRIAL_DIVISION_BOUND: u64 = 2048;

lazy_static! {
    static ref SMALL_PRIMES: Vec<u64> = sieve(TRIAL_DIVISION_BOUND);
}

fn sieve(bound: u64) -> Vec<u64> {
    let bound = bound as usize;
    let mut composite = vec![false; bound];
    let mut primes = Vec::new();
    for n in 2..bound {
        if composite[n] {
            continue;
        }
        primes.push(n as u64);
        let mut multiple = n * n;
        while multiple < bound {
            composite[multiple] = true;
            multiple += n;
        }
    }
    primes
}

/// Miller-Rabin with `rounds` random bases from `[2, n - 2]`, preceded by
/// trial division against every prime below 2048. A `true` result is
/// wrong with probability at most 4^-rounds.
pub fn probably_prime<R: CryptoRng + RngCore>(n: &BigInt, rounds: usize, rng: &mut R) -> bool {
    // Trial division also settles every n below the bound.
    for &p in SMALL_PRIMES.iter() {
        if n == &BigInt::from_u64(p) {
            return true;
        }
        if n.rem_u64(p) == 0 {
            return false;
        }
    }
    if n.bit_length() < 2 {
        // 0 and 1; everything else small was settled above.
        return false;
    }

    let one = BigInt::one();
    let n_minus_1 = n - &one;
    let n_minus_2 = &n_minus_1 - &one;
    let s = n_minus_1.trailing_zeros();
    let d = n_minus_1.shr_bits(s);

    let mont = match Montgomery::new(n) {
        Ok(m) => m,
        Err(_) => return false,
    };

    'witness: for _ in 0..rounds {
        let base = match BigInt::random_below(rng, &n_minus_2) {
            Ok(v) => &v + &one,
            Err(_) => return false,
        };
        let mut x = mont.pow(&base, &d);
        if x.is_one() || x == n_minus_1 {
            continue;
        }
        for _ in 1..s {
            x = (&x * &x).div_rem(n).1;
            if x == n_minus_1 {
                continue 'witness;
            }
            if x.is_one() {
                return false;
            }
        }
        return false;
    }
    true
}

/// Random probable prime of exactly `bits` bits, top and bottom bits set.
pub fn generate_prime<R: CryptoRng + RngCore>(
    bits: usize,
    rounds: usize,
    rng: &mut R,
) -> Result<BigInt, CryptoError> {
    if bits < 16 {
        return Err(CryptoError::InvalidParameter("prime size too small"));
    }
    let mut candidates = 0usize;
    loop {
        candidates += 1;
        let candidate = BigInt::random_bits(rng, bits);
        if probably_prime(&candidate, rounds, rng) {
            trace!(bits, candidates, "prime candidate accepted");
            return Ok(candidate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::from_seed([42u8; 32])
    }

    fn bi(v: u64) -> BigInt {
        BigInt::from_u64(v)
    }

    #[test]
    fn test_sieve() {
        assert_eq!(&SMALL_PRIMES[..5], &[2, 3, 5, 7, 11]);
        assert!(SMALL_PRIMES.contains(&2039));
        assert!(SMALL_PRIMES.iter().all(|&p| p < 2048));
    }

    #[test]
    fn test_small_values() {
        let mut rng = rng();
        assert!(!probably_prime(&BigInt::zero(), 16, &mut rng));
        assert!(!probably_prime(&bi(1), 16, &mut rng));
        assert!(probably_prime(&bi(2), 16, &mut rng));
        assert!(probably_prime(&bi(3), 16, &mut rng));
        assert!(!probably_prime(&bi(4), 16, &mut rng));
        assert!(probably_prime(&bi(1009), 16, &mut rng));
    }

    #[test]
    fn test_known_primes_and_composites() {
        let mut rng = rng();
        assert!(probably_prime(&bi(104729), 32, &mut rng));
        assert!(probably_prime(&bi(2147483647), 32, &mut rng)); // 2^31 - 1
        assert!(!probably_prime(&bi(104729 * 3), 32, &mut rng));
        // Carmichael numbers fool Fermat but not Miller-Rabin.
        assert!(!probably_prime(&bi(561), 32, &mut rng));
        assert!(!probably_prime(&bi(41041), 32, &mut rng));
        // Square of a prime beyond the trial-division bound.
        assert!(!probably_prime(&bi(2053 * 2053), 32, &mut rng));
    }

    #[test]
    fn test_large_known_prime() {
        let mut rng = rng();
        // 2^127 - 1.
        let m127 = BigInt::from_bytes_be(&hex::decode("7fffffffffffffffffffffffffffffff").unwrap());
        assert!(probably_prime(&m127, 16, &mut rng));
        assert!(!probably_prime(&(&m127 + &bi(2)), 16, &mut rng));
    }

    #[test]
    fn test_generate_prime_shape() {
        let mut rng = rng();
        let p = generate_prime(128, 16, &mut rng).unwrap();
        assert_eq!(p.bit_length(), 128);
        assert!(p.is_odd());
        assert!(probably_prime(&p, 16, &mut rng));
    }
}
