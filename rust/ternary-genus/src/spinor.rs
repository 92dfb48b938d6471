//! Spinor norms via Zassenhaus' formula.

use genus_arith::{odd_valuation_mask, Ring};
use num_bigint::BigInt;
use num_traits::{One, Zero};

use crate::error::{GenusError, Result};
use crate::isometry::{cross, dot, is_zero_vector, Isometry, Vector};
use crate::quadform::QuadForm;

/// Evaluates spinor norms as bit-vectors over a fixed list of primes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spinor {
    primes: Vec<u64>,
}

impl Spinor {
    pub fn new(primes: Vec<u64>) -> Self {
        Spinor { primes }
    }

    pub fn primes(&self) -> &[u64] {
        &self.primes
    }

    /// Bit i is set when the spinor norm of `s / scalar` has odd valuation
    /// at the i-th prime.
    pub fn norm<R: Ring>(&self, q: &QuadForm<R>, s: &Isometry<R>, scalar: &R) -> Result<u64> {
        let value = self.norm_value(q, s, scalar)?;
        Ok(odd_valuation_mask(&value, &self.primes))
    }

    /// An integer in the square class of the spinor norm of `s / scalar`,
    /// where `Q(s·x) = scalar²·Q(x)`.
    pub fn norm_value<R: Ring>(&self, q: &QuadForm<R>, s: &Isometry<R>, scalar: &R) -> Result<BigInt> {
        let scalar = scalar.to_bigint();
        let m = Isometry::scalar(&scalar).sub(&s.to_big());
        let gram = q.to_big().gram();

        let cols: Vec<Vector<BigInt>> = (0..3).map(|j| m.column(j)).collect();
        let mut chosen: Vec<usize> = Vec::with_capacity(3);
        for j in 0..3 {
            let independent = match chosen.as_slice() {
                [] => !is_zero_vector(&cols[j]),
                [i] => !is_zero_vector(&cross(&cols[*i], &cols[j])),
                [i, k] => !dot(&cols[*i], &cross(&cols[*k], &cols[j])).is_zero(),
                _ => false,
            };
            if independent {
                chosen.push(j);
            }
        }

        // (Mᵀ A) restricted to the chosen rows and columns.
        let entry = |i: usize, j: usize| dot(&cols[i], &gram[j]);
        let mut value = match chosen.as_slice() {
            [] => BigInt::one(),
            [i] => entry(*i, *i),
            [i, j] => entry(*i, *i) * entry(*j, *j) - entry(*i, *j) * entry(*j, *i),
            _ => {
                let rows: [[BigInt; 3]; 3] = [
                    [entry(0, 0), entry(0, 1), entry(0, 2)],
                    [entry(1, 0), entry(1, 1), entry(1, 2)],
                    [entry(2, 0), entry(2, 1), entry(2, 2)],
                ];
                Isometry::from_rows(rows).determinant()
            }
        };
        if chosen.len() % 2 == 1 {
            value *= &scalar;
        }
        if value.is_zero() {
            return Err(GenusError::arithmetic::<R>(format!(
                "degenerate spinor norm for {} at scalar {}",
                s, scalar
            )));
        }
        Ok(value)
    }
}
