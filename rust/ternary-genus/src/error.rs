//! Error type shared by every genus operation.

use genus_arith::Ring;

/// Errors raised while constructing a genus or building Hecke matrices.
#[derive(Debug, thiserror::Error)]
pub enum GenusError {
    #[error("too many prime symbols: {0} (conductor bitmasks allow at most 63)")]
    TooManyPrimes(usize),

    #[error("invalid prime symbols: {0}")]
    InvalidSymbols(String),

    #[error("invalid quadratic form: {0}")]
    InvalidForm(String),

    #[error("prime {p} divides the discriminant {disc}")]
    PrimeDividesDiscriminant { p: u64, disc: String },

    #[error("{0} is not prime")]
    NotPrime(u64),

    #[error("conductor {conductor} is not a squarefree divisor of the discriminant {disc}")]
    InvalidConductor { conductor: String, disc: String },

    #[error("internal consistency failure: {0}")]
    Consistency(String),

    #[error("fixed-width arithmetic overflowed: {0}")]
    Overflow(String),

    #[error("value does not fit the target precision: {0}")]
    Conversion(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GenusError {
    /// True when retrying with arbitrary precision may succeed.
    pub fn is_overflow(&self) -> bool {
        matches!(self, GenusError::Overflow(_))
    }

    /// A failed exact check. On a wrapping ring this is reported as an
    /// overflow, otherwise it is a genuine consistency failure.
    pub(crate) fn arithmetic<R: Ring>(message: impl Into<String>) -> Self {
        if R::FIXED_WIDTH {
            GenusError::Overflow(message.into())
        } else {
            GenusError::Consistency(message.into())
        }
    }
}

pub type Result<T> = std::result::Result<T, GenusError>;
