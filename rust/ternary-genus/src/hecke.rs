//! Hecke operators on the conductor subspaces of a genus.
//!
//! For each class the p+1 neighbors are computed once and packed as
//! `(target << num_primes) | spinor_bits`; every conductor's matrix is then
//! read off the packed rows. Neighbor computation is parallel over classes,
//! each with its own sampler seeded from `(seed, p, class)`.

use genus_arith::{is_prime, PrimeField, Ring};
use num_bigint::BigInt;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError};
use std::time::Instant;

use crate::error::{GenusError, Result};
use crate::genus::Genus;
use crate::isometry::Isometry;
use crate::matrix::{CsrBuilder, CsrMatrix, DenseMatrix};
use crate::neighbor::NeighborManager;
use crate::quadform::QuadForm;

/// A rational isometry `isometry / denominator` of the mother form, coming
/// from a p-neighbor of class `source` that lands in class `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborIsometry<R: Ring> {
    pub source: usize,
    pub target: usize,
    pub isometry: Isometry<R>,
    pub denominator: R,
}

fn pack(target: usize, bits: u64, num_primes: usize) -> u128 {
    ((target as u128) << num_primes) | bits as u128
}

fn unpack(value: u128, num_primes: usize) -> (usize, u64) {
    let mask = (1u128 << num_primes) - 1;
    ((value >> num_primes) as usize, (value & mask) as u64)
}

/// Character value of a neighbor on the conductor with bitmask `k`.
fn character(bits: u64, k: usize) -> i64 {
    if (bits & k as u64).count_ones() % 2 == 0 {
        1
    } else {
        -1
    }
}

impl<R: Ring> Genus<R> {
    fn check_hecke_prime(&self, p: u64) -> Result<()> {
        if !is_prime(p) {
            return Err(GenusError::NotPrime(p));
        }
        if self.disc.residue(p) == 0 {
            return Err(GenusError::PrimeDividesDiscriminant {
                p,
                disc: self.disc.to_string(),
            });
        }
        Ok(())
    }

    fn manager_for(&self, p: u64, index: usize) -> Result<NeighborManager<R>> {
        let salt = (index as u64 + 1).wrapping_mul(0xD1B5_4A32_D192_ED03);
        let mut field = PrimeField::new(p, self.seed.wrapping_add(salt));
        NeighborManager::new(&self.hash.keys()[index].q, &mut field, self.config.validate)
    }

    /// `cur.s ∘ s ∘ target.sinv`, an isometry of the mother form scaled by
    /// `p · scale(cur) · scale(target)`.
    fn composite(
        &self,
        source: usize,
        target: usize,
        s: &Isometry<R>,
        p: u64,
    ) -> Result<(Isometry<R>, R)> {
        let cur = &self.hash.keys()[source];
        let rep = &self.hash.keys()[target];
        let iso = cur.s.checked_mul(s)?.checked_mul(&rep.sinv)?;
        let scalar = BigInt::from(p) * cur.scale_exact() * rep.scale_exact();
        let scalar = R::from_bigint(&scalar)
            .ok_or_else(|| GenusError::Overflow("composite scale exceeded 64 bits".into()))?;
        if self.config.validate && !iso.is_isometry(self.mother(), self.mother(), &scalar) {
            return Err(GenusError::arithmetic::<R>(format!(
                "composite isometry from class {} to {} is wrong",
                source, target
            )));
        }
        Ok((iso, scalar))
    }

    fn locate(&self, q: &QuadForm<R>, source: usize) -> Result<usize> {
        self.hash.index_of_key(q).ok_or_else(|| {
            GenusError::Consistency(format!(
                "neighbor {} of class {} is not in the genus",
                q, source
            ))
        })
    }

    /// Packed `(target, spinor bits)` for each neighbor of class `index`.
    fn neighbor_row(&self, p: u64, index: usize) -> Result<Vec<u128>> {
        let manager = self.manager_for(p, index)?;
        let pr = R::from_int(p as i64);
        let num_primes = self.prime_divisors.len();
        manager
            .neighbors()
            .map(|result| {
                let (neighbor, s) = result?;
                let target = self.locate(&neighbor, index)?;
                let bits = if target == index {
                    self.spinor.norm(&neighbor, &s, &pr)?
                } else {
                    let (iso, scalar) = self.composite(index, target, &s, p)?;
                    self.spinor.norm(self.mother(), &iso, &scalar)?
                };
                Ok(pack(target, bits, num_primes))
            })
            .collect()
    }

    fn neighbor_rows(&self, p: u64) -> Result<Vec<Vec<u128>>> {
        self.check_hecke_prime(p)?;
        (0..self.size())
            .into_par_iter()
            .map(|index| self.neighbor_row(p, index))
            .collect()
    }

    fn dense_from_rows(&self, rows: &[Vec<u128>], k: usize) -> DenseMatrix {
        let num_primes = self.prime_divisors.len();
        let lut = &self.lut_positions[k];
        let mut matrix = DenseMatrix::zeros(self.dims[k]);
        for (index, row) in rows.iter().enumerate() {
            let npos = match lut[index] {
                Some(npos) => npos,
                None => continue,
            };
            for &packed in row {
                let (target, bits) = unpack(packed, num_primes);
                if let Some(rpos) = lut[target] {
                    matrix.add(npos, rpos, character(bits, k));
                }
            }
        }
        matrix
    }

    fn sparse_from_rows(&self, rows: &[Vec<u128>], k: usize) -> CsrMatrix {
        let num_primes = self.prime_divisors.len();
        let lut = &self.lut_positions[k];
        let mut builder = CsrBuilder::new(self.dims[k]);
        for (index, row) in rows.iter().enumerate() {
            let npos = match lut[index] {
                Some(npos) => npos,
                None => continue,
            };
            for &packed in row {
                let (target, bits) = unpack(packed, num_primes);
                if let Some(rpos) = lut[target] {
                    builder.accumulate(rpos, character(bits, k));
                }
            }
            builder.close_row(npos);
        }
        builder.finish()
    }

    /// Dense Hecke matrices at `p` for every conductor. Cached per prime.
    pub fn hecke_matrix_dense(&self, p: u64) -> Result<Arc<BTreeMap<R, DenseMatrix>>> {
        if let Some(hit) = self
            .hecke_cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&p)
        {
            return Ok(Arc::clone(hit));
        }
        let start = Instant::now();
        let rows = self.neighbor_rows(p)?;
        let matrices: BTreeMap<R, DenseMatrix> = (0..self.conductors.len())
            .map(|k| (self.conductors[k].clone(), self.dense_from_rows(&rows, k)))
            .collect();
        log::info!(
            "Dense T_{} over {} classes and {} conductors in {:.2?}",
            p,
            self.size(),
            self.conductors.len(),
            start.elapsed()
        );
        let matrices = Arc::new(matrices);
        self.hecke_cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(p, Arc::clone(&matrices));
        Ok(matrices)
    }

    /// Sparse Hecke matrices at `p` for every conductor.
    pub fn hecke_matrix_sparse(&self, p: u64) -> Result<BTreeMap<R, CsrMatrix>> {
        let start = Instant::now();
        let rows = self.neighbor_rows(p)?;
        let matrices = (0..self.conductors.len())
            .map(|k| (self.conductors[k].clone(), self.sparse_from_rows(&rows, k)))
            .collect();
        log::info!("Sparse T_{} in {:.2?}", p, start.elapsed());
        Ok(matrices)
    }

    pub fn hecke_matrix_dense_at(&self, p: u64, conductor: &R) -> Result<DenseMatrix> {
        let k = self.conductor_index(conductor)?;
        let all = self.hecke_matrix_dense(p)?;
        all.get(&self.conductors[k])
            .cloned()
            .ok_or_else(|| GenusError::Consistency(format!("conductor {} missing", conductor)))
    }

    pub fn hecke_matrix_sparse_at(&self, p: u64, conductor: &R) -> Result<CsrMatrix> {
        let k = self.conductor_index(conductor)?;
        let rows = self.neighbor_rows(p)?;
        Ok(self.sparse_from_rows(&rows, k))
    }

    /// Every p-neighbor of every class as a rational isometry of the mother
    /// form, for building operators twisted by other representations.
    pub fn neighbor_isometries(&self, p: u64) -> Result<NeighborIsometries<'_, R>> {
        self.check_hecke_prime(p)?;
        Ok(NeighborIsometries {
            genus: self,
            p,
            source: 0,
            t: 0,
            manager: None,
            done: false,
        })
    }
}

/// Iterator returned by [`Genus::neighbor_isometries`]. Stops after the
/// first error.
pub struct NeighborIsometries<'a, R: Ring> {
    genus: &'a Genus<R>,
    p: u64,
    source: usize,
    t: u64,
    manager: Option<NeighborManager<R>>,
    done: bool,
}

impl<'a, R: Ring> NeighborIsometries<'a, R> {
    fn step(&mut self) -> Result<Option<NeighborIsometry<R>>> {
        loop {
            if self.source >= self.genus.size() {
                return Ok(None);
            }
            if self.manager.is_none() {
                self.manager = Some(self.genus.manager_for(self.p, self.source)?);
                self.t = 0;
            }
            if self.t > self.p {
                self.manager = None;
                self.source += 1;
                continue;
            }
            let manager = match &self.manager {
                Some(manager) => manager,
                None => continue,
            };
            let (neighbor, s) = manager.reduced_neighbor(self.t)?;
            self.t += 1;
            let target = self.genus.locate(&neighbor, self.source)?;
            let (isometry, denominator) = self.genus.composite(self.source, target, &s, self.p)?;
            return Ok(Some(NeighborIsometry {
                source: self.source,
                target,
                isometry,
                denominator,
            }));
        }
    }
}

impl<'a, R: Ring> Iterator for NeighborIsometries<'a, R> {
    type Item = Result<NeighborIsometry<R>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.step() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
