//! Legendre and Hilbert symbols over `BigInt`.

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, ToPrimitive, Zero};

use crate::primes::mod_pow;

/// Split `n = p^k · u` with `p ∤ u`. Returns `(k, u)`.
///
/// `n` must be nonzero.
pub fn valuation(n: &BigInt, p: u64) -> (u32, BigInt) {
    assert!(!n.is_zero(), "valuation of zero is undefined");
    let bp = BigInt::from(p);
    let mut k = 0u32;
    let mut u = n.clone();
    loop {
        let (q, r) = u.div_rem(&bp);
        if !r.is_zero() {
            break;
        }
        u = q;
        k += 1;
    }
    (k, u)
}

fn residue(n: &BigInt, m: u64) -> u64 {
    n.mod_floor(&BigInt::from(m)).to_u64().unwrap_or_default()
}

/// Legendre symbol (a/p) for an odd prime p.
/// Returns 1 if a is a quadratic residue mod p, -1 if not, 0 if p | a.
pub fn legendre_symbol(a: &BigInt, p: u64) -> i32 {
    assert!(p > 2, "Legendre symbol requires odd prime");
    let r = residue(a, p);
    if r == 0 {
        return 0;
    }
    // Euler's criterion
    if mod_pow(r, (p - 1) / 2, p) == 1 {
        1
    } else {
        -1
    }
}

/// Hilbert symbol (a, b)_p for nonzero rationals given as integers.
///
/// Returns -1 exactly when `a x² + b y² = z²` has no nontrivial solution
/// over Q_p.
pub fn hilbert_symbol(a: &BigInt, b: &BigInt, p: u64) -> i32 {
    assert!(
        !a.is_zero() && !b.is_zero(),
        "Hilbert symbol requires nonzero arguments"
    );
    let (alpha, u) = valuation(a, p);
    let (beta, v) = valuation(b, p);

    if p == 2 {
        let eps = |x: &BigInt| (residue(x, 8) - 1) / 2 % 2;
        let omega = |x: &BigInt| {
            let r = residue(x, 8);
            (r * r - 1) / 8 % 2
        };
        let e = eps(&u) * eps(&v) + alpha as u64 * omega(&v) + beta as u64 * omega(&u);
        return if e % 2 == 0 { 1 } else { -1 };
    }

    let mut sign = 1;
    if (alpha as u64 * beta as u64 * ((p - 1) / 2)) % 2 == 1 {
        sign = -sign;
    }
    if beta % 2 == 1 {
        sign *= legendre_symbol(&u, p);
    }
    if alpha % 2 == 1 {
        sign *= legendre_symbol(&v, p);
    }
    sign
}

/// Squarefree part of a nonzero integer restricted to the given primes:
/// bit i is set when `n` has odd valuation at `primes[i]`.
pub fn odd_valuation_mask(n: &BigInt, primes: &[u64]) -> u64 {
    let n = n.abs();
    primes
        .iter()
        .enumerate()
        .filter(|(_, &p)| valuation(&n, p).0 % 2 == 1)
        .fold(0u64, |mask, (i, _)| mask | (1u64 << i))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(n: i64) -> BigInt {
        BigInt::from(n)
    }

    #[test]
    fn test_valuation() {
        assert_eq!(valuation(&b(48), 2), (4, b(3)));
        assert_eq!(valuation(&b(-45), 3), (2, b(-5)));
        assert_eq!(valuation(&b(7), 5), (0, b(7)));
    }

    #[test]
    fn test_legendre() {
        // Quadratic residues mod 11: 1, 3, 4, 5, 9
        for a in 1..11 {
            let expected = if [1, 3, 4, 5, 9].contains(&a) { 1 } else { -1 };
            assert_eq!(legendre_symbol(&b(a), 11), expected, "({}/11)", a);
        }
        assert_eq!(legendre_symbol(&b(-1), 7), -1);
        assert_eq!(legendre_symbol(&b(22), 11), 0);
    }

    #[test]
    fn test_hilbert_odd_prime() {
        // (-1, -1)_p = 1 for odd p; the quaternions ramify only at 2 and ∞.
        for p in [3u64, 5, 7, 11, 13] {
            assert_eq!(hilbert_symbol(&b(-1), &b(-1), p), 1);
        }
        // (p, u)_p = (u/p) for a unit u.
        assert_eq!(hilbert_symbol(&b(3), &b(2), 3), -1);
        assert_eq!(hilbert_symbol(&b(5), &b(-1), 5), 1);
    }

    #[test]
    fn test_hilbert_two() {
        assert_eq!(hilbert_symbol(&b(-1), &b(-1), 2), -1);
        assert_eq!(hilbert_symbol(&b(2), &b(3), 2), -1);
        assert_eq!(hilbert_symbol(&b(2), &b(7), 2), 1);
        assert_eq!(hilbert_symbol(&b(3), &b(5), 2), 1);
    }

    #[test]
    fn test_hilbert_product_formula() {
        // ∏_v (a, b)_v = 1 where (a, b)_∞ = -1 iff both negative.
        let pairs = [(-1i64, -11i64), (-3, -7), (6, -5), (-10, 21)];
        for (x, y) in pairs {
            let mut product = if x < 0 && y < 0 { -1 } else { 1 };
            for p in [2u64, 3, 5, 7, 11, 13] {
                product *= hilbert_symbol(&b(x), &b(y), p);
            }
            assert_eq!(product, 1, "product formula for ({}, {})", x, y);
        }
    }

    #[test]
    fn test_odd_valuation_mask() {
        assert_eq!(odd_valuation_mask(&b(2 * 9 * 5), &[2, 3, 5]), 0b101);
        assert_eq!(odd_valuation_mask(&b(-49), &[7]), 0);
    }
}
