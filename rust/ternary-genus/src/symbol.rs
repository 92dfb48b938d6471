//! Local data at the primes dividing the discriminant, and the search for
//! a form realising it.

use genus_arith::{is_prime, Ring};
use num_bigint::BigInt;
use num_traits::{One, ToPrimitive};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{GenusError, Result};
use crate::quadform::QuadForm;

/// Largest number of primes a conductor bitmask can index.
pub const MAX_PRIME_SYMBOLS: usize = 63;

/// A prime dividing the discriminant and whether the form is anisotropic
/// (ramified) there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrimeSymbol {
    pub p: u64,
    pub ramified: bool,
}

impl PrimeSymbol {
    pub fn new(p: u64, ramified: bool) -> Self {
        PrimeSymbol { p, ramified }
    }

    pub fn ramified(p: u64) -> Self {
        Self::new(p, true)
    }

    pub fn unramified(p: u64) -> Self {
        Self::new(p, false)
    }
}

/// Check count, primality, distinctness and ramification parity.
pub fn validate_symbols(symbols: &[PrimeSymbol]) -> Result<()> {
    if symbols.len() > MAX_PRIME_SYMBOLS {
        return Err(GenusError::TooManyPrimes(symbols.len()));
    }
    if symbols.is_empty() {
        return Err(GenusError::InvalidSymbols("no prime symbols given".into()));
    }
    let mut seen = HashSet::new();
    for symbol in symbols {
        if !is_prime(symbol.p) {
            return Err(GenusError::NotPrime(symbol.p));
        }
        if !seen.insert(symbol.p) {
            return Err(GenusError::InvalidSymbols(format!(
                "prime {} listed twice",
                symbol.p
            )));
        }
    }
    // A positive-definite ternary space ramifies at infinity, so by the
    // product formula it ramifies at an odd number of finite primes.
    let ramified = symbols.iter().filter(|s| s.ramified).count();
    if ramified % 2 == 0 {
        return Err(GenusError::InvalidSymbols(format!(
            "{} ramified primes; a definite form needs an odd number",
            ramified
        )));
    }
    Ok(())
}

/// Product of the symbol primes.
pub fn symbol_discriminant(symbols: &[PrimeSymbol]) -> BigInt {
    symbols
        .iter()
        .fold(BigInt::one(), |acc, s| acc * BigInt::from(s.p))
}

/// True when `q` has the local behaviour the symbols ask for, and is
/// isotropic at 2 whenever 2 is not among them.
pub fn matches_symbols<R: Ring>(q: &QuadForm<R>, symbols: &[PrimeSymbol]) -> bool {
    let two_listed = symbols.iter().any(|s| s.p == 2);
    symbols.iter().all(|s| q.is_anisotropic(s.p) == s.ramified)
        && (two_listed || !q.is_anisotropic(2))
}

/// Search Minkowski-bounded coefficients for a form of discriminant
/// `∏ p` with the requested ramification.
pub fn find_form<R: Ring>(symbols: &[PrimeSymbol]) -> Result<QuadForm<R>> {
    validate_symbols(symbols)?;
    let disc = symbol_discriminant(symbols);
    let n = disc.to_i128().ok_or_else(|| {
        GenusError::InvalidSymbols(format!("discriminant {} is too large to search", disc))
    })?;

    let mut a = 1i128;
    while a * a * a <= n {
        let mut b = a;
        while a * b * b <= n {
            for h in -a..=a {
                let den = 4 * a * b - h * h;
                if den <= 0 {
                    continue;
                }
                for g in -a..=a {
                    for f in -b..=b {
                        let num = n - f * g * h + a * f * f + b * g * g;
                        if num % den != 0 {
                            continue;
                        }
                        let c = num / den;
                        if c < b {
                            continue;
                        }
                        let candidate: QuadForm<BigInt> =
                            QuadForm::new(a.into(), b.into(), c.into(), f.into(), g.into(), h.into());
                        if matches_symbols(&candidate, symbols) {
                            log::debug!("Found form {} for discriminant {}", candidate, disc);
                            return candidate.convert().ok_or_else(|| {
                                GenusError::Conversion(format!("{} does not fit", candidate))
                            });
                        }
                    }
                }
            }
            b += 1;
        }
        a += 1;
    }
    Err(GenusError::InvalidSymbols(format!(
        "no positive-definite form of discriminant {} has the requested ramification",
        disc
    )))
}
