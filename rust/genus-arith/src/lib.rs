//! Exact arithmetic primitives for ternary genus computations.
//!
//! - [`ring`]: the [`Ring`] abstraction over `BigInt` and wrapping `i64`
//! - [`primes`]: primality, prime iteration, modular inverse
//! - [`symbols`]: valuations, Legendre and Hilbert symbols
//! - [`field`]: F_p arithmetic with a seeded sampler

pub mod field;
pub mod primes;
pub mod ring;
pub mod symbols;

pub use field::PrimeField;
pub use primes::{is_prime, mod_inv, mod_pow, next_prime, PrimeIter};
pub use ring::{convert, div_floor, divides, ext_gcd, mod_floor, Precision, Ring, W64};
pub use symbols::{hilbert_symbol, legendre_symbol, odd_valuation_mask, valuation};
