//! Arithmetic in F_p with a seeded random source.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::primes::mod_inv;

/// The prime field F_p together with a deterministic RNG.
///
/// Two fields built from the same `(p, seed)` produce identical random
/// streams, which keeps neighbor enumeration reproducible.
#[derive(Debug, Clone)]
pub struct PrimeField {
    p: u64,
    rng: StdRng,
}

impl PrimeField {
    pub fn new(p: u64, seed: u64) -> Self {
        let mixed = seed ^ p.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        PrimeField {
            p,
            rng: StdRng::seed_from_u64(mixed),
        }
    }

    pub fn prime(&self) -> u64 {
        self.p
    }

    /// Uniform element of F_p.
    pub fn random(&mut self) -> u64 {
        self.rng.gen_range(0..self.p)
    }

    pub fn random_vector(&mut self) -> [u64; 3] {
        [self.random(), self.random(), self.random()]
    }

    pub fn add(&self, a: u64, b: u64) -> u64 {
        ((a as u128 + b as u128) % self.p as u128) as u64
    }

    pub fn sub(&self, a: u64, b: u64) -> u64 {
        self.add(a, self.neg(b))
    }

    pub fn mul(&self, a: u64, b: u64) -> u64 {
        ((a as u128 * b as u128) % self.p as u128) as u64
    }

    pub fn neg(&self, a: u64) -> u64 {
        let a = a % self.p;
        if a == 0 {
            0
        } else {
            self.p - a
        }
    }

    /// Multiplicative inverse, `None` for zero.
    pub fn inv(&self, a: u64) -> Option<u64> {
        if a % self.p == 0 {
            return None;
        }
        mod_inv(a % self.p, self.p)
    }
}
