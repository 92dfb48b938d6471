//! Genus enumeration by Kneser neighbors, certified by the mass formula.
//!
//! Construction runs in three phases:
//! 1. Expansion: starting from the mother form, walk increasing good primes
//!    and, at each, visit every known class in discovery order, inserting
//!    new neighbors until `Σ 48/|Aut|` reaches the closed-form mass.
//! 2. Composition: chain each class's isometry back to the mother form.
//! 3. Conductor tables: drop a class from the conductor-k subspace when one
//!    of its automorphisms has a spinor character that is odd on k.

use genus_arith::{hilbert_symbol, PrimeField, PrimeIter, Ring};
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::Rng;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use crate::config::GenusConfig;
use crate::error::{GenusError, Result};
use crate::isometry::Isometry;
use crate::matrix::DenseMatrix;
use crate::neighbor::NeighborManager;
use crate::quadform::QuadForm;
use crate::spinor::Spinor;
use crate::symbol::{find_form, symbol_discriminant, validate_symbols, PrimeSymbol};
use crate::table::{Keyed, RepTable};

/// One equivalence class of the genus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenusRep<R: Ring> {
    /// Reduced form, the dedup key.
    pub q: QuadForm<R>,
    /// Maps the mother form onto `q`: `Q₀(s·x) = scale²·q(x)`.
    pub s: Isometry<R>,
    /// Maps `q` back onto the mother form: `q(sinv·x) = scale²·Q₀(x)`.
    pub sinv: Isometry<R>,
    /// Class this one was discovered from; `None` for the mother.
    pub parent: Option<usize>,
    /// Prime of the discovering neighbor step.
    pub p: Option<u64>,
    /// Neighbor steps per prime on the path from the mother.
    pub es: BTreeMap<u64, u32>,
}

impl<R: Ring> Keyed for GenusRep<R> {
    type Key = QuadForm<R>;

    fn key(&self) -> &QuadForm<R> {
        &self.q
    }
}

impl<R: Ring> GenusRep<R> {
    fn mother(q: QuadForm<R>) -> Self {
        GenusRep {
            q,
            s: Isometry::identity(),
            sinv: Isometry::identity(),
            parent: None,
            p: None,
            es: BTreeMap::new(),
        }
    }

    /// `∏ pᵉ` over the path from the mother, exactly.
    pub fn scale_exact(&self) -> BigInt {
        self.es
            .iter()
            .fold(BigInt::one(), |acc, (&p, &e)| acc * BigInt::from(p).pow(e))
    }

    pub fn scale(&self) -> Result<R> {
        R::from_bigint(&self.scale_exact())
            .ok_or_else(|| GenusError::Overflow("isometry scale exceeded 64 bits".into()))
    }

    pub fn convert<T: Ring>(&self) -> Option<GenusRep<T>> {
        Some(GenusRep {
            q: self.q.convert()?,
            s: self.s.convert()?,
            sinv: self.sinv.convert()?,
            parent: self.parent,
            p: self.p,
            es: self.es.clone(),
        })
    }
}

/// `24 × mass`: `2·disc·∏ (p + h_p) / (2p)` with `h_p` the Hasse symbol.
pub fn mass_x24<R: Ring>(q: &QuadForm<R>, primes: &[u64]) -> Result<BigInt> {
    let big = q.to_big();
    let disc = big.discriminant();
    let first = &big.h * &big.h - BigInt::from(4) * &big.a * &big.b;
    let second = -(&big.a * &disc);
    let mut num = BigInt::from(2) * &disc;
    let mut den = BigInt::one();
    for &p in primes {
        num *= BigInt::from(p) + hilbert_symbol(&first, &second, p);
        den *= BigInt::from(2 * p);
    }
    let (mass, rem) = num.div_rem(&den);
    if !rem.is_zero() {
        return Err(GenusError::Consistency(format!(
            "mass of {} is not an integer multiple of 1/24",
            q
        )));
    }
    Ok(mass)
}

/// `48 / |Aut(q)|`
fn aut_weight<R: Ring>(q: &QuadForm<R>) -> Result<BigInt> {
    let n = q.num_automorphisms()?;
    if n == 0 || 48 % n != 0 {
        return Err(GenusError::Consistency(format!(
            "{} has {} automorphisms",
            q, n
        )));
    }
    Ok(BigInt::from(48 / n))
}

fn resolve_seed(seed: u64) -> u64 {
    if seed != 0 {
        return seed;
    }
    let fresh = rand::thread_rng().gen_range(1..=u64::MAX);
    log::info!("Seed 0 requested, using random seed {}", fresh);
    fresh
}

/// The genus of a positive-definite ternary form with squarefree
/// discriminant, together with its conductor decomposition.
#[derive(Debug)]
pub struct Genus<R: Ring> {
    pub(crate) disc: R,
    pub(crate) symbols: Vec<PrimeSymbol>,
    pub(crate) prime_divisors: Vec<u64>,
    pub(crate) conductors: Vec<R>,
    pub(crate) dims: Vec<usize>,
    pub(crate) lut_positions: Vec<Vec<Option<usize>>>,
    pub(crate) mass_x24: BigInt,
    pub(crate) hash: RepTable<GenusRep<R>>,
    pub(crate) spinor: Spinor,
    pub(crate) spinor_primes: RepTable<u64>,
    pub(crate) seed: u64,
    pub(crate) config: GenusConfig,
    pub(crate) hecke_cache: RwLock<HashMap<u64, Arc<BTreeMap<R, DenseMatrix>>>>,
}

impl<R: Ring> Genus<R> {
    /// Build the genus described by `symbols`, finding a mother form first.
    pub fn from_symbols(symbols: &[PrimeSymbol], config: &GenusConfig) -> Result<Self> {
        validate_symbols(symbols)?;
        let q = find_form::<R>(symbols)?;
        Self::from_form(&q, symbols, config)
    }

    /// Build the genus of `q`, whose discriminant must be the product of
    /// the symbol primes.
    pub fn from_form(q: &QuadForm<R>, symbols: &[PrimeSymbol], config: &GenusConfig) -> Result<Self> {
        validate_symbols(symbols)?;
        let (mother, _) = q.reduce()?;
        let disc = mother.discriminant();
        let expected = symbol_discriminant(symbols);
        if mother.exact_discriminant() != expected {
            return Err(GenusError::InvalidForm(format!(
                "{} has discriminant {}, symbols give {}",
                q,
                mother.exact_discriminant(),
                expected
            )));
        }
        if let Some(s) = symbols.iter().find(|s| mother.is_anisotropic(s.p) != s.ramified) {
            return Err(GenusError::InvalidForm(format!(
                "{} has the wrong ramification at {}",
                q, s.p
            )));
        }

        let prime_divisors: Vec<u64> = symbols.iter().map(|s| s.p).collect();
        let num_conductors = 1usize << prime_divisors.len();
        let mut conductors: Vec<R> = Vec::with_capacity(num_conductors);
        conductors.push(R::one());
        for n in 1..num_conductors {
            let bit = n.trailing_zeros() as usize;
            let value = R::from_int(prime_divisors[bit] as i64) * conductors[n ^ (1 << bit)].clone();
            conductors.push(value);
        }

        let mass = mass_x24(&mother, &prime_divisors)?;
        let seed = resolve_seed(config.seed);
        log::info!(
            "Constructing genus of {} (disc {}, mass x24 = {}, seed {})",
            mother,
            disc,
            mass,
            seed
        );
        let start = std::time::Instant::now();

        let mut genus = Genus {
            disc,
            symbols: symbols.to_vec(),
            spinor: Spinor::new(prime_divisors.clone()),
            prime_divisors,
            conductors,
            dims: Vec::new(),
            lut_positions: Vec::new(),
            mass_x24: mass,
            hash: RepTable::new(),
            spinor_primes: RepTable::new(),
            seed,
            config: config.clone(),
            hecke_cache: RwLock::new(HashMap::new()),
        };
        genus.expand(mother)?;
        genus.compose_isometries()?;
        genus.build_conductor_tables()?;

        log::info!(
            "Genus of discriminant {} has {} classes, dims {:?} ({:.2?})",
            genus.disc,
            genus.size(),
            genus.dims,
            start.elapsed()
        );
        Ok(genus)
    }

    fn expand(&mut self, mother: QuadForm<R>) -> Result<()> {
        let mut sum = aut_weight(&mother)?;
        self.hash.add(GenusRep::mother(mother.clone()));

        let disc = mother.exact_discriminant();
        let mut primes = PrimeIter::new(move |p| disc.is_multiple_of(&BigInt::from(p)));
        let mut tried = 0;
        while sum < self.mass_x24 {
            if tried >= self.config.max_expansion_primes {
                return Err(GenusError::Consistency(format!(
                    "mass {} not reached after {} primes ({} reached)",
                    self.mass_x24, tried, sum
                )));
            }
            let p = primes
                .next()
                .ok_or_else(|| GenusError::Consistency("ran out of primes".into()))?;
            tried += 1;
            log::debug!("Expanding at p = {} from {} classes", p, self.hash.len());

            let mut field = PrimeField::new(p, self.seed);
            let mut current = 0;
            while sum != self.mass_x24 && current < self.hash.len() {
                let q = self.hash.keys()[current].q.clone();
                let manager = NeighborManager::new(&q, &mut field, self.config.validate)?;
                for t in 0..=p {
                    let (neighbor, s) = manager.reduced_neighbor(t)?;
                    if self.hash.contains_key(&neighbor) {
                        continue;
                    }
                    let weight = aut_weight(&neighbor)?;
                    self.hash.add(GenusRep {
                        q: neighbor,
                        s,
                        sinv: Isometry::identity(),
                        parent: Some(current),
                        p: Some(p),
                        es: BTreeMap::new(),
                    });
                    self.spinor_primes.add(p);
                    sum += weight;
                    if sum == self.mass_x24 {
                        break;
                    }
                }
                current += 1;
            }
            if sum > self.mass_x24 {
                return Err(GenusError::Consistency(format!(
                    "mass overshoot: {} > {}",
                    sum, self.mass_x24
                )));
            }
        }
        Ok(())
    }

    /// Rewrite every isometry relative to the mother form.
    fn compose_isometries(&mut self) -> Result<()> {
        let mother = self.mother().clone();
        for i in 1..self.hash.len() {
            let rep = &self.hash.keys()[i];
            let parent_index = rep
                .parent
                .ok_or_else(|| GenusError::Consistency(format!("class {} has no parent", i)))?;
            let p = rep
                .p
                .ok_or_else(|| GenusError::Consistency(format!("class {} has no prime", i)))?;
            let parent = self.hash.keys()[parent_index].clone();
            let pr = R::from_int(p as i64);

            let sinv = rep.s.inverse_scaled(&pr)?.checked_mul(&parent.sinv)?;
            let s = parent.s.checked_mul(&rep.s)?;
            let mut es = parent.es;
            *es.entry(p).or_insert(0) += 1;

            let validate = self.config.validate;
            let rep = self
                .hash
                .get_mut(i)
                .ok_or_else(|| GenusError::Consistency(format!("class {} vanished", i)))?;
            rep.s = s;
            rep.sinv = sinv;
            rep.es = es;
            if validate {
                let scale = rep.scale()?;
                if !rep.s.is_isometry(&mother, &rep.q, &scale)
                    || !rep.sinv.is_isometry(&rep.q, &mother, &scale)
                {
                    return Err(GenusError::arithmetic::<R>(format!(
                        "composed isometry of class {} is wrong",
                        i
                    )));
                }
            }
        }
        Ok(())
    }

    fn build_conductor_tables(&mut self) -> Result<()> {
        let num_conductors = self.conductors.len();
        let size = self.hash.len();
        let mut dims = vec![0usize; num_conductors];
        let mut lut = vec![vec![None; size]; num_conductors];
        let one = R::one();
        for (n, rep) in self.hash.iter().enumerate() {
            let mut excluded = vec![false; num_conductors];
            for aut in rep.q.proper_automorphisms()? {
                let bits = self.spinor.norm(&rep.q, &aut, &one)?;
                for (k, flag) in excluded.iter_mut().enumerate() {
                    if (bits & k as u64).count_ones() % 2 == 1 {
                        *flag = true;
                    }
                }
            }
            for k in 0..num_conductors {
                if !excluded[k] {
                    lut[k][n] = Some(dims[k]);
                    dims[k] += 1;
                }
            }
        }
        self.dims = dims;
        self.lut_positions = lut;
        Ok(())
    }

    pub fn size(&self) -> usize {
        self.hash.len()
    }

    /// The effective seed; pass it back in to reproduce this genus.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn discriminant(&self) -> &R {
        &self.disc
    }

    pub fn symbols(&self) -> &[PrimeSymbol] {
        &self.symbols
    }

    pub fn prime_divisors(&self) -> &[u64] {
        &self.prime_divisors
    }

    /// Squarefree divisors of the discriminant, indexed by prime bitmask.
    pub fn conductors(&self) -> &[R] {
        &self.conductors
    }

    pub fn mass_x24(&self) -> &BigInt {
        &self.mass_x24
    }

    pub fn config(&self) -> &GenusConfig {
        &self.config
    }

    pub fn mother(&self) -> &QuadForm<R> {
        &self.hash.keys()[0].q
    }

    /// Classes in discovery order.
    pub fn representatives(&self) -> &[GenusRep<R>] {
        self.hash.keys()
    }

    pub fn representative(&self, index: usize) -> Option<&GenusRep<R>> {
        self.hash.get(index)
    }

    /// Index of the class of `q`, which need not be reduced.
    pub fn index_of(&self, q: &QuadForm<R>) -> Result<Option<usize>> {
        let (reduced, _) = q.reduce()?;
        Ok(self.hash.index_of_key(&reduced))
    }

    /// Primes that produced a new class during expansion, in order.
    pub fn spinor_primes(&self) -> &[u64] {
        self.spinor_primes.keys()
    }

    /// Conductor → dimension of its subspace.
    pub fn dimension_map(&self) -> BTreeMap<R, usize> {
        self.conductors
            .iter()
            .cloned()
            .zip(self.dims.iter().copied())
            .collect()
    }

    /// Position of a conductor in [`Genus::conductors`].
    pub fn conductor_index(&self, conductor: &R) -> Result<usize> {
        self.conductors
            .iter()
            .position(|c| c == conductor)
            .ok_or_else(|| GenusError::InvalidConductor {
                conductor: conductor.to_string(),
                disc: self.disc.to_string(),
            })
    }

    /// Row/column of class `index` in the conductor-`k` subspace, if any.
    pub fn position(&self, k: usize, index: usize) -> Option<usize> {
        self.lut_positions.get(k)?.get(index).copied().flatten()
    }

    /// Checked conversion to another precision, keeping class order.
    pub fn convert<T: Ring>(&self) -> Result<Genus<T>> {
        let fail = |what: &str| GenusError::Conversion(format!("{} does not fit", what));
        let mut hash = RepTable::with_capacity(self.size());
        for (i, rep) in self.hash.iter().enumerate() {
            let converted = rep.convert::<T>().ok_or_else(|| fail(&format!("class {}", i)))?;
            hash.add(converted);
        }
        let conductors = self
            .conductors
            .iter()
            .map(|c| T::from_bigint(&c.to_bigint()))
            .collect::<Option<Vec<T>>>()
            .ok_or_else(|| fail("conductor"))?;
        Ok(Genus {
            disc: T::from_bigint(&self.disc.to_bigint()).ok_or_else(|| fail("discriminant"))?,
            symbols: self.symbols.clone(),
            prime_divisors: self.prime_divisors.clone(),
            conductors,
            dims: self.dims.clone(),
            lut_positions: self.lut_positions.clone(),
            mass_x24: self.mass_x24.clone(),
            hash,
            spinor: self.spinor.clone(),
            spinor_primes: self.spinor_primes.clone(),
            seed: self.seed,
            config: self.config.clone(),
            hecke_cache: RwLock::new(HashMap::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genus_arith::W64;

    fn level_11(seed: u64) -> Genus<BigInt> {
        Genus::from_symbols(&[PrimeSymbol::ramified(11)], &GenusConfig::with_seed(seed)).unwrap()
    }

    #[test]
    fn test_mass_formula_values() {
        let cases: [([i64; 6], &[u64], i64); 4] = [
            ([1, 1, 4, 0, 1, 1], &[11], 10),
            ([2, 2, 3, 0, 2, 1], &[37], 36),
            ([1, 1, 1, 0, 1, 1], &[2], 1),
            ([1, 1, 1, 0, 0, 1], &[3], 2),
        ];
        for (coeffs, primes, expected) in cases {
            let q: QuadForm<BigInt> = QuadForm::from_ints(coeffs);
            assert_eq!(mass_x24(&q, primes).unwrap(), BigInt::from(expected));
        }
    }

    #[test]
    fn test_level_11_enumeration() {
        let genus = level_11(1);
        assert_eq!(genus.size(), 2);
        assert_eq!(genus.mass_x24(), &BigInt::from(10));
        let mut forms: Vec<QuadForm<BigInt>> =
            genus.representatives().iter().map(|r| r.q.clone()).collect();
        forms.sort_by(|a, b| a.canonical_cmp(b));
        assert_eq!(
            forms,
            vec![
                QuadForm::from_ints([1, 1, 3, 0, 1, 0]),
                QuadForm::from_ints([1, 1, 4, 0, 1, 1]),
            ]
        );
        assert_eq!(genus.conductors(), &[BigInt::from(1), BigInt::from(11)]);
        assert_eq!(genus.spinor_primes(), &[2u64]);
    }

    #[test]
    fn test_composed_isometries_reach_mother() {
        let genus = level_11(3);
        let mother = genus.mother().clone();
        assert!(genus.representative(0).unwrap().parent.is_none());
        for rep in genus.representatives().iter().skip(1) {
            let scale = rep.scale().unwrap();
            assert!(rep.s.is_isometry(&mother, &rep.q, &scale));
            assert!(rep.sinv.is_isometry(&rep.q, &mother, &scale));
            assert!(rep.parent.is_some());
            assert!(rep.es.values().sum::<u32>() >= 1);
        }
    }

    #[test]
    fn test_from_form_checks_discriminant() {
        let q: QuadForm<BigInt> = QuadForm::from_ints([1, 1, 4, 0, 1, 1]);
        let err = Genus::from_form(&q, &[PrimeSymbol::ramified(13)], &GenusConfig::with_seed(1))
            .unwrap_err();
        assert!(matches!(err, GenusError::InvalidForm(_)));
    }

    #[test]
    fn test_random_seed_is_recorded() {
        let genus = level_11(0);
        assert_ne!(genus.seed(), 0);
        let again = level_11(genus.seed());
        assert_eq!(genus.representatives(), again.representatives());
    }

    #[test]
    fn test_convert_keeps_order() {
        let genus = level_11(5);
        let fixed: Genus<W64> = genus.convert().unwrap();
        assert_eq!(fixed.size(), genus.size());
        for (a, b) in fixed.representatives().iter().zip(genus.representatives()) {
            assert_eq!(a.q.to_big(), b.q);
        }
        assert_eq!(fixed.seed(), genus.seed());
    }

    #[test]
    fn test_spinor_primes_each_produced_a_class() {
        for level in [11u64, 101] {
            let genus =
                Genus::<BigInt>::from_symbols(&[PrimeSymbol::ramified(level)], &GenusConfig::with_seed(4))
                    .unwrap();
            let mut used: Vec<u64> = genus.representatives().iter().filter_map(|r| r.p).collect();
            used.dedup();
            assert_eq!(genus.spinor_primes(), used.as_slice(), "level {}", level);
        }
        let single = Genus::<BigInt>::from_symbols(&[PrimeSymbol::ramified(2)], &GenusConfig::with_seed(4))
            .unwrap();
        assert_eq!(single.size(), 1);
        assert!(single.spinor_primes().is_empty());
    }

    #[test]
    fn test_conductor_index() {
        let genus = level_11(1);
        assert_eq!(genus.conductor_index(&BigInt::from(11)).unwrap(), 1);
        assert!(matches!(
            genus.conductor_index(&BigInt::from(7)),
            Err(GenusError::InvalidConductor { .. })
        ));
    }
}
