//! Montgomery-form modular arithmetic.
//!
//! A [`Montgomery`] context caches, for an odd modulus m, the limb count,
//! `-m^-1 mod 2^64`, and `R^2 mod m` (R = 2^(64·k)). [`Montgomery::pow`]
//! is a variable-time sliding-window ladder for public exponents;
//! [`Montgomery::pow_secret`] is a fixed-window ladder whose control flow
//! and memory access pattern depend only on the exponent's bit length,
//! never on its bits.

use subtle::{ConditionallySelectable, ConstantTimeEq};

use super::BigInt;
use crate::error::CryptoError;

const WINDOW_BITS: usize = 4;
const TABLE_SIZE: usize = 1 << WINDOW_BITS;

/// Cached Montgomery context for one odd modulus.
pub struct Montgomery {
    m: BigInt,
    m_limbs: Vec<u64>,
    /// `-m^-1 mod 2^64`.
    n0: u64,
    /// `R^2 mod m`, used to convert into Montgomery form.
    rr: Vec<u64>,
    k: usize,
}

impl Montgomery {
    /// The modulus must be odd and at least 3.
    pub fn new(m: &BigInt) -> Result<Self, CryptoError> {
        if !m.is_odd() || m.bit_length() < 2 {
            return Err(CryptoError::InvalidParameter(
                "montgomery modulus must be odd and greater than one",
            ));
        }
        let k = m.limbs().len();
        let mut m_limbs = m.limbs().to_vec();
        m_limbs.resize(k, 0);

        // Inverse of m[0] mod 2^64 by Newton iteration; odd m[0] is its
        // own inverse mod 8, and each step doubles the correct bits.
        let m0 = m_limbs[0];
        let mut inv = m0;
        for _ in 0..5 {
            inv = inv.wrapping_mul(2u64.wrapping_sub(m0.wrapping_mul(inv)));
        }
        let n0 = inv.wrapping_neg();

        // R^2 mod m = 2^(128k) mod m.
        let r2 = BigInt::one().shl_bits(128 * k).div_rem(m).1;
        let mut rr = r2.limbs().to_vec();
        rr.resize(k, 0);

        Ok(Self {
            m: m.clone(),
            m_limbs,
            n0,
            rr,
            k,
        })
    }

    pub fn modulus(&self) -> &BigInt {
        &self.m
    }

    /// CIOS Montgomery multiplication: returns `a·b·R^-1 mod m` as a
    /// fixed-width limb vector. Runs in time independent of the values.
    fn mont_mul(&self, a: &[u64], b: &[u64]) -> Vec<u64> {
        let k = self.k;
        let mut t = vec![0u64; k + 2];
        for i in 0..k {
            let mut carry = 0u128;
            for j in 0..k {
                let s = t[j] as u128 + a[i] as u128 * b[j] as u128 + carry;
                t[j] = s as u64;
                carry = s >> 64;
            }
            let s = t[k] as u128 + carry;
            t[k] = s as u64;
            t[k + 1] = (s >> 64) as u64;

            let mu = t[0].wrapping_mul(self.n0);
            let mut carry = (t[0] as u128 + mu as u128 * self.m_limbs[0] as u128) >> 64;
            for j in 1..k {
                let s = t[j] as u128 + mu as u128 * self.m_limbs[j] as u128 + carry;
                t[j - 1] = s as u64;
                carry = s >> 64;
            }
            let s = t[k] as u128 + carry;
            t[k - 1] = s as u64;
            t[k] = t[k + 1] + (s >> 64) as u64;
            t[k + 1] = 0;
        }

        // The loop leaves t < 2m; subtract m once without branching.
        let top = t[k];
        let mut diff = vec![0u64; k];
        let mut borrow = 0u64;
        for j in 0..k {
            let d = (t[j] as u128)
                .wrapping_sub(self.m_limbs[j] as u128)
                .wrapping_sub(borrow as u128);
            diff[j] = d as u64;
            borrow = ((d >> 64) as u64) & 1;
        }
        let need_sub = top.ct_eq(&1) | borrow.ct_eq(&0);
        let mut out = vec![0u64; k];
        for j in 0..k {
            out[j] = u64::conditional_select(&t[j], &diff[j], need_sub);
        }
        out
    }

    fn to_mont(&self, a: &BigInt) -> Vec<u64> {
        let reduced = a.div_rem(&self.m).1;
        let mut limbs = reduced.limbs().to_vec();
        limbs.resize(self.k, 0);
        self.mont_mul(&limbs, &self.rr)
    }

    fn from_mont(&self, a: &[u64]) -> BigInt {
        let mut one = vec![0u64; self.k];
        one[0] = 1;
        BigInt::from_limbs(self.mont_mul(a, &one))
    }

    fn one_mont(&self) -> Vec<u64> {
        // R mod m = R^2 · R^-1.
        let mut one = vec![0u64; self.k];
        one[0] = 1;
        self.mont_mul(&self.rr, &one)
    }

    /// `base^exp mod m`, sliding window. Variable-time; public inputs only.
    pub fn pow(&self, base: &BigInt, exp: &BigInt) -> BigInt {
        let ebits = exp.bit_length();
        if ebits == 0 {
            return BigInt::one().div_rem(&self.m).1;
        }
        let base_m = self.to_mont(base);

        // Odd powers base^1, base^3, .., base^15.
        let base_sq = self.mont_mul(&base_m, &base_m);
        let mut odd_powers = Vec::with_capacity(TABLE_SIZE / 2);
        odd_powers.push(base_m);
        for i in 1..TABLE_SIZE / 2 {
            let next = self.mont_mul(&odd_powers[i - 1], &base_sq);
            odd_powers.push(next);
        }

        let mut acc = self.one_mont();
        let mut i = ebits as isize - 1;
        while i >= 0 {
            if !exp.bit(i as usize) {
                acc = self.mont_mul(&acc, &acc);
                i -= 1;
                continue;
            }
            // Longest window of at most WINDOW_BITS bits ending in a 1.
            let bottom = (i + 1 - WINDOW_BITS as isize).max(0);
            let mut j = bottom;
            while !exp.bit(j as usize) {
                j += 1;
            }
            let mut window = 0usize;
            for b in (j..=i).rev() {
                window = (window << 1) | exp.bit(b as usize) as usize;
            }
            for _ in j..=i {
                acc = self.mont_mul(&acc, &acc);
            }
            acc = self.mont_mul(&acc, &odd_powers[(window - 1) / 2]);
            i = j - 1;
        }
        self.from_mont(&acc)
    }

    /// `base^exp mod m` with value-independent control flow.
    ///
    /// Fixed 4-bit windows over the exponent's bit length; every window
    /// multiplies by a table entry gathered with a full constant-time
    /// scan, including the zero window. Only the exponent's bit length
    /// shapes the schedule.
    pub fn pow_secret(&self, base: &BigInt, exp: &BigInt) -> BigInt {
        let windows = (exp.bit_length() + WINDOW_BITS - 1) / WINDOW_BITS;
        if windows == 0 {
            return BigInt::one().div_rem(&self.m).1;
        }

        let mut table = Vec::with_capacity(TABLE_SIZE);
        table.push(self.one_mont());
        table.push(self.to_mont(base));
        for i in 2..TABLE_SIZE {
            let next = self.mont_mul(&table[i - 1], &table[1]);
            table.push(next);
        }

        let mut acc = self.one_mont();
        for w in (0..windows).rev() {
            for _ in 0..WINDOW_BITS {
                acc = self.mont_mul(&acc, &acc);
            }
            let mut idx = 0u64;
            for b in (0..WINDOW_BITS).rev() {
                idx = (idx << 1) | exp.bit(w * WINDOW_BITS + b) as u64;
            }
            let entry = self.select_entry(&table, idx);
            acc = self.mont_mul(&acc, &entry);
        }
        self.from_mont(&acc)
    }

    /// Read every table entry; keep the one whose index matches.
    fn select_entry(&self, table: &[Vec<u64>], idx: u64) -> Vec<u64> {
        let mut out = vec![0u64; self.k];
        for (i, entry) in table.iter().enumerate() {
            let hit = (i as u64).ct_eq(&idx);
            for j in 0..self.k {
                out[j] = u64::conditional_select(&out[j], &entry[j], hit);
            }
        }
        out
    }
}
