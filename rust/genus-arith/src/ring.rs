//! Integer strategies for exact form arithmetic.
//!
//! Every computation on coefficients and isometries is generic over [`Ring`].
//! Two strategies are provided:
//!
//! - [`BigInt`]: arbitrary precision, never overflows.
//! - [`W64`]: 64-bit two's complement with wrapping semantics. It is much
//!   faster, but overflow is silent, so callers must validate their results
//!   (neighbor discriminants, positive definiteness) and promote to `BigInt`
//!   when a check fails.
//!
//! Conversions between strategies always go through [`BigInt`] and are
//! checked: narrowing returns `None` instead of truncating.

use num_bigint::BigInt;
use num_traits::{Num, Signed, ToPrimitive};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use std::num::Wrapping;

/// Fixed-width strategy: wrapping 64-bit integers.
pub type W64 = Wrapping<i64>;

/// Uniform exact-integer interface shared by both precision strategies.
pub trait Ring:
    Num + Signed + Clone + Ord + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// True when arithmetic wraps instead of growing.
    const FIXED_WIDTH: bool;

    fn from_int(value: i64) -> Self;

    fn to_bigint(&self) -> BigInt;

    /// Checked narrowing from arbitrary precision.
    fn from_bigint(value: &BigInt) -> Option<Self>;

    /// Approximate value, used only for enumeration bounds.
    fn as_f64(&self) -> f64;

    /// Least non-negative residue modulo `p`.
    fn residue(&self, p: u64) -> u64;
}

impl Ring for BigInt {
    const FIXED_WIDTH: bool = false;

    fn from_int(value: i64) -> Self {
        BigInt::from(value)
    }

    fn to_bigint(&self) -> BigInt {
        self.clone()
    }

    fn from_bigint(value: &BigInt) -> Option<Self> {
        Some(value.clone())
    }

    fn as_f64(&self) -> f64 {
        self.to_f64().unwrap_or(f64::INFINITY)
    }

    fn residue(&self, p: u64) -> u64 {
        let m = BigInt::from(p);
        let r = self % &m;
        let r = if r.is_negative() { r + m } else { r };
        r.to_u64().unwrap_or_default()
    }
}

impl Ring for W64 {
    const FIXED_WIDTH: bool = true;

    fn from_int(value: i64) -> Self {
        Wrapping(value)
    }

    fn to_bigint(&self) -> BigInt {
        BigInt::from(self.0)
    }

    fn from_bigint(value: &BigInt) -> Option<Self> {
        value.to_i64().map(Wrapping)
    }

    fn as_f64(&self) -> f64 {
        self.0 as f64
    }

    fn residue(&self, p: u64) -> u64 {
        (self.0 as i128).rem_euclid(p as i128) as u64
    }
}

/// Floor division for a positive divisor.
pub fn div_floor<R: Ring>(a: &R, b: &R) -> R {
    let q = a.clone() / b.clone();
    let r = a.clone() - q.clone() * b.clone();
    if r.is_negative() {
        q - R::one()
    } else {
        q
    }
}

/// Non-negative remainder for a positive modulus.
pub fn mod_floor<R: Ring>(a: &R, m: &R) -> R {
    let r = a.clone() % m.clone();
    if r.is_negative() {
        r + m.clone()
    } else {
        r
    }
}

/// True when `b` divides `a` exactly.
pub fn divides<R: Ring>(b: &R, a: &R) -> bool {
    !b.is_zero() && (a.clone() % b.clone()).is_zero()
}

/// Extended GCD: returns (g, u, v) with g = u*a + v*b and g >= 0.
pub fn ext_gcd<R: Ring>(a: &R, b: &R) -> (R, R, R) {
    let mut old_r = a.clone();
    let mut r = b.clone();
    let mut old_s = R::one();
    let mut s = R::zero();
    let mut old_t = R::zero();
    let mut t = R::one();

    while !r.is_zero() {
        let q = old_r.clone() / r.clone();
        let temp_r = old_r - q.clone() * r.clone();
        old_r = std::mem::replace(&mut r, temp_r);
        let temp_s = old_s - q.clone() * s.clone();
        old_s = std::mem::replace(&mut s, temp_s);
        let temp_t = old_t - q * t.clone();
        old_t = std::mem::replace(&mut t, temp_t);
    }

    if old_r.is_negative() {
        (-old_r, -old_s, -old_t)
    } else {
        (old_r, old_s, old_t)
    }
}

/// Checked conversion between strategies.
pub fn convert<R: Ring, T: Ring>(value: &R) -> Option<T> {
    T::from_bigint(&value.to_bigint())
}

/// Which [`Ring`] implementation a computation should run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// Wrapping 64-bit arithmetic ([`W64`]).
    Fixed,
    /// Arbitrary precision ([`BigInt`]).
    #[default]
    Arbitrary,
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precision::Fixed => write!(f, "fixed"),
            Precision::Arbitrary => write!(f, "arbitrary"),
        }
    }
}

impl std::str::FromStr for Precision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" | "w64" | "i64" => Ok(Precision::Fixed),
            "arbitrary" | "bigint" | "big" => Ok(Precision::Arbitrary),
            other => Err(format!("unknown precision '{}'", other)),
        }
    }
}
