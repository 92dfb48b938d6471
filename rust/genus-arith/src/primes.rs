//! Small-prime utilities on `u64` with `u128` intermediates.

use crate::ring::{ext_gcd, Ring, W64};

/// Deterministic primality test by trial division over 6k ± 1.
///
/// Hecke and neighbor primes are small, so this is never the bottleneck.
pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n < 4 {
        return true;
    }
    if n % 2 == 0 || n % 3 == 0 {
        return false;
    }
    let mut d = 5u64;
    while (d as u128) * (d as u128) <= n as u128 {
        if n % d == 0 || n % (d + 2) == 0 {
            return false;
        }
        d += 6;
    }
    true
}

/// Smallest prime strictly greater than `n`.
pub fn next_prime(n: u64) -> u64 {
    let mut candidate = n.saturating_add(1).max(2);
    while !is_prime(candidate) {
        candidate += 1;
    }
    candidate
}

/// Modular exponentiation: base^exp mod m using binary method.
pub fn mod_pow(mut base: u64, mut exp: u64, m: u64) -> u64 {
    if m == 1 {
        return 0;
    }
    let m = m as u128;
    let mut result = 1u128;
    base %= m as u64;
    let mut b = base as u128;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result * b % m;
        }
        exp >>= 1;
        b = b * b % m;
    }
    result as u64
}

/// Modular inverse: a^{-1} mod m for `m < 2^63`. Returns None if
/// gcd(a, m) != 1.
pub fn mod_inv(a: u64, m: u64) -> Option<u64> {
    let modulus = W64::from_int(i64::try_from(m).ok()?);
    let (g, x, _) = ext_gcd(&W64::from_int((a % m) as i64), &modulus);
    if g != W64::from_int(1) {
        return None;
    }
    Some(x.residue(m))
}

/// Ascending primes, skipping those rejected by `skip`.
///
/// With `skip = |p| disc % p == 0` this yields the "good" primes for a
/// discriminant in the order the genus expansion consumes them.
pub struct PrimeIter<F: Fn(u64) -> bool> {
    current: u64,
    skip: F,
}

impl<F: Fn(u64) -> bool> PrimeIter<F> {
    pub fn new(skip: F) -> Self {
        PrimeIter { current: 1, skip }
    }
}

impl<F: Fn(u64) -> bool> Iterator for PrimeIter<F> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        loop {
            if self.current == u64::MAX {
                return None;
            }
            self.current = next_prime(self.current);
            if !(self.skip)(self.current) {
                return Some(self.current);
            }
        }
    }
}
