//! Precision chosen at run time.

use genus_arith::{Precision, Ring, W64};
use num_bigint::BigInt;
use std::collections::BTreeMap;

use crate::config::GenusConfig;
use crate::error::Result;
use crate::genus::Genus;
use crate::matrix::{CsrMatrix, DenseMatrix};
use crate::quadform::QuadForm;
use crate::symbol::PrimeSymbol;

/// A genus over either integer strategy. Results are always reported with
/// `BigInt` conductors.
#[derive(Debug)]
pub enum AnyGenus {
    Fixed(Genus<W64>),
    Arbitrary(Genus<BigInt>),
}

fn rekey<R: Ring, V: Clone>(map: &BTreeMap<R, V>) -> BTreeMap<BigInt, V> {
    map.iter().map(|(k, v)| (k.to_bigint(), v.clone())).collect()
}

impl AnyGenus {
    /// Construct with `config.precision`, falling back to arbitrary
    /// precision on overflow when `config.promote_on_overflow` is set.
    pub fn build(symbols: &[PrimeSymbol], config: &GenusConfig) -> Result<Self> {
        match config.precision {
            Precision::Arbitrary => Ok(AnyGenus::Arbitrary(Genus::from_symbols(symbols, config)?)),
            Precision::Fixed => match Genus::<W64>::from_symbols(symbols, config) {
                Ok(genus) => Ok(AnyGenus::Fixed(genus)),
                Err(e) if e.is_overflow() && config.promote_on_overflow => {
                    log::warn!("Fixed-width construction failed ({}), retrying with BigInt", e);
                    Ok(AnyGenus::Arbitrary(Genus::from_symbols(symbols, config)?))
                }
                Err(e) => Err(e),
            },
        }
    }

    pub fn precision(&self) -> Precision {
        match self {
            AnyGenus::Fixed(_) => Precision::Fixed,
            AnyGenus::Arbitrary(_) => Precision::Arbitrary,
        }
    }

    /// Convert a fixed-width genus to arbitrary precision, keeping order.
    pub fn promote(self) -> Result<Self> {
        match self {
            AnyGenus::Fixed(genus) => Ok(AnyGenus::Arbitrary(genus.convert()?)),
            other => Ok(other),
        }
    }

    fn promote_in_place(&mut self) -> Result<()> {
        if let AnyGenus::Fixed(genus) = self {
            log::warn!("Promoting genus of discriminant {} to BigInt", genus.discriminant());
            let promoted = genus.convert()?;
            *self = AnyGenus::Arbitrary(promoted);
        }
        Ok(())
    }

    pub fn config(&self) -> &GenusConfig {
        match self {
            AnyGenus::Fixed(g) => g.config(),
            AnyGenus::Arbitrary(g) => g.config(),
        }
    }

    pub fn size(&self) -> usize {
        match self {
            AnyGenus::Fixed(g) => g.size(),
            AnyGenus::Arbitrary(g) => g.size(),
        }
    }

    pub fn seed(&self) -> u64 {
        match self {
            AnyGenus::Fixed(g) => g.seed(),
            AnyGenus::Arbitrary(g) => g.seed(),
        }
    }

    pub fn mass_x24(&self) -> &BigInt {
        match self {
            AnyGenus::Fixed(g) => g.mass_x24(),
            AnyGenus::Arbitrary(g) => g.mass_x24(),
        }
    }

    pub fn spinor_primes(&self) -> &[u64] {
        match self {
            AnyGenus::Fixed(g) => g.spinor_primes(),
            AnyGenus::Arbitrary(g) => g.spinor_primes(),
        }
    }

    pub fn dimension_map(&self) -> BTreeMap<BigInt, usize> {
        match self {
            AnyGenus::Fixed(g) => rekey(&g.dimension_map()),
            AnyGenus::Arbitrary(g) => g.dimension_map(),
        }
    }

    /// Class representatives in discovery order.
    pub fn forms(&self) -> Vec<QuadForm<BigInt>> {
        match self {
            AnyGenus::Fixed(g) => g.representatives().iter().map(|r| r.q.to_big()).collect(),
            AnyGenus::Arbitrary(g) => g.representatives().iter().map(|r| r.q.clone()).collect(),
        }
    }

    /// Dense Hecke matrices at `p`; promotes on overflow if configured.
    pub fn hecke_matrix_dense(&mut self, p: u64) -> Result<BTreeMap<BigInt, DenseMatrix>> {
        let outcome = match self {
            AnyGenus::Fixed(g) => g.hecke_matrix_dense(p).map(|m| rekey(&m)),
            AnyGenus::Arbitrary(g) => return Ok((*g.hecke_matrix_dense(p)?).clone()),
        };
        match outcome {
            Err(e) if e.is_overflow() && self.config().promote_on_overflow => {
                self.promote_in_place()?;
                self.hecke_matrix_dense(p)
            }
            other => other,
        }
    }

    /// Sparse Hecke matrices at `p`; promotes on overflow if configured.
    pub fn hecke_matrix_sparse(&mut self, p: u64) -> Result<BTreeMap<BigInt, CsrMatrix>> {
        let outcome = match self {
            AnyGenus::Fixed(g) => g.hecke_matrix_sparse(p).map(|m| rekey(&m)),
            AnyGenus::Arbitrary(g) => return g.hecke_matrix_sparse(p),
        };
        match outcome {
            Err(e) if e.is_overflow() && self.config().promote_on_overflow => {
                self.promote_in_place()?;
                self.hecke_matrix_sparse(p)
            }
            other => other,
        }
    }
}
