//! Positive-definite ternary quadratic forms.
//!
//! `Q(x, y, z) = a x² + b y² + c z² + f yz + g xz + h xy`
//! with Gram matrix `[[2a, h, g], [h, 2b, f], [g, f, 2c]]` and
//! discriminant `4abc + fgh − af² − bg² − ch²` (half the Gram determinant).

use genus_arith::{convert, hilbert_symbol, Ring};
use num_bigint::BigInt;
use std::cmp::Ordering;
use std::fmt;

use crate::error::{GenusError, Result};
use crate::isometry::{dot, Isometry, Vector};
use crate::reduction;

/// A ternary quadratic form with coefficients in `R`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuadForm<R: Ring> {
    pub a: R,
    pub b: R,
    pub c: R,
    pub f: R,
    pub g: R,
    pub h: R,
}

impl<R: Ring> QuadForm<R> {
    pub fn new(a: R, b: R, c: R, f: R, g: R, h: R) -> Self {
        QuadForm { a, b, c, f, g, h }
    }

    /// Build from `[a, b, c, f, g, h]`.
    pub fn from_ints(coeffs: [i64; 6]) -> Self {
        let [a, b, c, f, g, h] = coeffs.map(R::from_int);
        QuadForm { a, b, c, f, g, h }
    }

    /// `[a, b, c, f, g, h]`
    pub fn coefficients(&self) -> [R; 6] {
        [
            self.a.clone(),
            self.b.clone(),
            self.c.clone(),
            self.f.clone(),
            self.g.clone(),
            self.h.clone(),
        ]
    }

    pub fn discriminant(&self) -> R {
        let (a, b, c) = (&self.a, &self.b, &self.c);
        let (f, g, h) = (&self.f, &self.g, &self.h);
        R::from_int(4) * a.clone() * b.clone() * c.clone()
            + f.clone() * g.clone() * h.clone()
            - a.clone() * f.clone() * f.clone()
            - b.clone() * g.clone() * g.clone()
            - c.clone() * h.clone() * h.clone()
    }

    /// Discriminant evaluated over `BigInt` from the stored coefficients.
    ///
    /// On a wrapping ring this differs from the true value whenever a
    /// coefficient has overflowed, which is how overflow is detected.
    pub fn exact_discriminant(&self) -> BigInt {
        self.to_big().discriminant()
    }

    pub fn gram(&self) -> [[R; 3]; 3] {
        let two = R::from_int(2);
        [
            [two.clone() * self.a.clone(), self.h.clone(), self.g.clone()],
            [self.h.clone(), two.clone() * self.b.clone(), self.f.clone()],
            [self.g.clone(), self.f.clone(), two * self.c.clone()],
        ]
    }

    pub fn evaluate(&self, v: &Vector<R>) -> R {
        let [x, y, z] = v;
        self.a.clone() * x.clone() * x.clone()
            + self.b.clone() * y.clone() * y.clone()
            + self.c.clone() * z.clone() * z.clone()
            + self.f.clone() * y.clone() * z.clone()
            + self.g.clone() * x.clone() * z.clone()
            + self.h.clone() * x.clone() * y.clone()
    }

    /// `B(u, v) = Q(u + v) − Q(u) − Q(v) = uᵀ A v`
    pub fn bilinear(&self, u: &Vector<R>, v: &Vector<R>) -> R {
        let gram = self.gram();
        let av = [dot(&gram[0], v), dot(&gram[1], v), dot(&gram[2], v)];
        dot(u, &av)
    }

    /// The form on the lattice spanned by the columns of `s`.
    pub fn transform(&self, s: &Isometry<R>) -> QuadForm<R> {
        let (x, y, z) = (s.column(0), s.column(1), s.column(2));
        QuadForm {
            a: self.evaluate(&x),
            b: self.evaluate(&y),
            c: self.evaluate(&z),
            f: self.bilinear(&y, &z),
            g: self.bilinear(&x, &z),
            h: self.bilinear(&x, &y),
        }
    }

    /// Every coefficient multiplied by `k`.
    pub fn scaled(&self, k: &R) -> QuadForm<R> {
        let [a, b, c, f, g, h] = self.coefficients().map(|x| x * k.clone());
        QuadForm { a, b, c, f, g, h }
    }

    /// Sylvester's criterion on the leading principal minors.
    pub fn is_positive_definite(&self) -> bool {
        let minor2 = R::from_int(4) * self.a.clone() * self.b.clone() - self.h.clone() * self.h.clone();
        self.a.is_positive() && minor2.is_positive() && self.discriminant().is_positive()
    }

    /// Canonical representative of the equivalence class, with a proper
    /// unimodular `U` such that `self.transform(U)` is the result.
    pub fn reduce(&self) -> Result<(QuadForm<R>, Isometry<R>)> {
        if !self.is_positive_definite() {
            return Err(GenusError::InvalidForm(format!(
                "{} is not positive definite",
                self
            )));
        }
        reduction::reduce(self)
    }

    /// Determinant +1 automorphisms.
    pub fn proper_automorphisms(&self) -> Result<Vec<Isometry<R>>> {
        let (reduced, u) = self.reduce()?;
        let auts = reduction::reduced_automorphisms(&reduced)?;
        if reduced == *self {
            return Ok(auts);
        }
        // U is unimodular with det +1, so adj(U) = U⁻¹.
        let u_inv = u.adjugate();
        Ok(auts.iter().map(|m| u.mul(m).mul(&u_inv)).collect())
    }

    /// The full automorphism group `{±M : M proper}`.
    pub fn automorphisms(&self) -> Result<Vec<Isometry<R>>> {
        let proper = self.proper_automorphisms()?;
        let negated: Vec<Isometry<R>> = proper.iter().map(|m| m.negate()).collect();
        Ok(proper.into_iter().chain(negated).collect())
    }

    pub fn num_automorphisms(&self) -> Result<usize> {
        Ok(2 * self.proper_automorphisms()?.len())
    }

    /// The Hilbert symbol `(h² − 4ab, −a·disc)_p`, the Hasse invariant of
    /// the form at `p` up to a sign convention.
    pub fn hasse_symbol(&self, p: u64) -> i32 {
        let q = self.to_big();
        let first = &q.h * &q.h - BigInt::from(4) * &q.a * &q.b;
        let second = -(&q.a * q.discriminant());
        hilbert_symbol(&first, &second, p)
    }

    /// True when the form is anisotropic over Q_p.
    pub fn is_anisotropic(&self, p: u64) -> bool {
        self.hasse_symbol(p) == -1
    }

    /// Coefficients reduced into `[0, p)`.
    pub fn residues(&self, p: u64) -> [u64; 6] {
        self.coefficients().map(|x| x.residue(p))
    }

    pub fn to_big(&self) -> QuadForm<BigInt> {
        let [a, b, c, f, g, h] = self.coefficients().map(|x| x.to_bigint());
        QuadForm { a, b, c, f, g, h }
    }

    /// Checked conversion to another integer strategy.
    pub fn convert<T: Ring>(&self) -> Option<QuadForm<T>> {
        Some(QuadForm {
            a: convert(&self.a)?,
            b: convert(&self.b)?,
            c: convert(&self.c)?,
            f: convert(&self.f)?,
            g: convert(&self.g)?,
            h: convert(&self.h)?,
        })
    }

    /// Ordering used to pick the canonical form among minimal bases:
    /// `(a, b, c, |f|, |g|, |h|)` then positive signs before negative ones.
    pub(crate) fn canonical_cmp(&self, other: &QuadForm<R>) -> Ordering {
        let key = |q: &QuadForm<R>| {
            (
                (q.a.clone(), q.b.clone(), q.c.clone()),
                (q.f.abs(), q.g.abs(), q.h.abs()),
                (q.f.is_negative(), q.g.is_negative(), q.h.is_negative()),
            )
        };
        key(self).cmp(&key(other))
    }
}

impl<R: Ring> fmt::Display for QuadForm<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {}, {}, {})",
            self.a, self.b, self.c, self.f, self.g, self.h
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genus_arith::W64;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn form(c: [i64; 6]) -> QuadForm<BigInt> {
        QuadForm::from_ints(c)
    }

    /// A random product of elementary matrices, determinant +1.
    fn random_unimodular(rng: &mut StdRng) -> Isometry<BigInt> {
        let mut u: Isometry<BigInt> = Isometry::identity();
        for _ in 0..6 {
            let i = rng.gen_range(0..3);
            let j = (i + rng.gen_range(1..3)) % 3;
            let k = rng.gen_range(-2i64..=2);
            let mut m = [[1i64, 0, 0], [0, 1, 0], [0, 0, 1]];
            m[i][j] = k;
            u = u.mul(&Isometry::from_int_rows(m));
        }
        u
    }

    #[test]
    fn test_discriminant() {
        assert_eq!(form([1, 1, 1, 0, 0, 0]).discriminant(), BigInt::from(4));
        assert_eq!(form([1, 1, 4, 0, 1, 1]).discriminant(), BigInt::from(11));
        assert_eq!(form([1, 1, 1, 0, 1, 1]).discriminant(), BigInt::from(2));
        assert_eq!(form([2, 2, 3, 0, 2, 1]).discriminant(), BigInt::from(37));
    }

    #[test]
    fn test_evaluate_matches_bilinear() {
        let q = form([2, 3, 5, 1, -1, 2]);
        let v = [BigInt::from(1), BigInt::from(-2), BigInt::from(3)];
        assert_eq!(q.bilinear(&v, &v), BigInt::from(2) * q.evaluate(&v));
    }

    #[test]
    fn test_transform_by_identity() {
        let q = form([1, 2, 5, 1, 1, 0]);
        assert_eq!(q.transform(&Isometry::identity()), q);
    }

    #[test]
    fn test_positive_definite() {
        assert!(form([1, 1, 4, 0, 1, 1]).is_positive_definite());
        assert!(!form([1, 1, 1, 0, 0, 3]).is_positive_definite());
        assert!(!form([-1, 1, 1, 0, 0, 0]).is_positive_definite());
        assert!(form([-1, 1, 1, 0, 0, 0]).reduce().is_err());
    }

    #[test]
    fn test_reduce_known_forms() {
        let (r, u) = form([1, 1, 1, 1, 1, 1]).reduce().unwrap();
        assert_eq!(r, form([1, 1, 1, 0, 1, 1]));
        assert_eq!(u.determinant(), BigInt::from(1));
        assert_eq!(form([1, 1, 1, 1, 1, 1]).transform(&u), r);
    }

    #[test]
    fn test_reduce_is_idempotent() {
        for c in [[1, 1, 4, 0, 1, 1], [1, 1, 3, 0, 1, 0], [2, 2, 3, 0, 2, 1]] {
            let q = form(c);
            let (r, _) = q.reduce().unwrap();
            let (rr, u) = r.reduce().unwrap();
            assert_eq!(r, rr);
            assert_eq!(r.transform(&u), r);
        }
    }

    #[test]
    fn test_reduce_is_canonical_under_basis_change() {
        let mut rng = StdRng::seed_from_u64(7);
        for c in [[1, 1, 4, 0, 1, 1], [1, 2, 5, 1, 1, 0], [2, 2, 3, 0, 2, 1], [1, 3, 7, 3, 1, 1]] {
            let q = form(c);
            let (canonical, _) = q.reduce().unwrap();
            for _ in 0..10 {
                let u = random_unimodular(&mut rng);
                let moved = q.transform(&u);
                let (r, v) = moved.reduce().unwrap();
                assert_eq!(r, canonical, "reducing {}", moved);
                assert_eq!(moved.transform(&v), r);
            }
        }
    }

    #[test]
    fn test_automorphism_counts() {
        assert_eq!(form([1, 1, 1, 0, 0, 0]).num_automorphisms().unwrap(), 48);
        assert_eq!(form([1, 1, 1, 0, 1, 1]).num_automorphisms().unwrap(), 48);
        assert_eq!(form([1, 1, 4, 0, 1, 1]).num_automorphisms().unwrap(), 12);
        assert_eq!(form([1, 1, 3, 0, 1, 0]).num_automorphisms().unwrap(), 8);
        assert_eq!(form([2, 2, 3, 0, 2, 1]).num_automorphisms().unwrap(), 2);
    }

    #[test]
    fn test_automorphisms_of_unreduced_form() {
        let mut rng = StdRng::seed_from_u64(3);
        let q = form([1, 1, 4, 0, 1, 1]).transform(&random_unimodular(&mut rng));
        let auts = q.automorphisms().unwrap();
        assert_eq!(auts.len(), 12);
        let one = BigInt::from(1);
        for m in &auts {
            assert!(m.is_isometry(&q, &q, &one));
        }
    }

    #[test]
    fn test_anisotropy() {
        // (1,1,4,0,1,1) has discriminant 11 and ramifies there.
        let q = form([1, 1, 4, 0, 1, 1]);
        assert!(q.is_anisotropic(11));
        assert!(!q.is_anisotropic(2));
        assert!(!q.is_anisotropic(3));
    }

    #[test]
    fn test_fixed_width_matches_bigint() {
        let big = form([1, 2, 5, 1, 1, 0]);
        let small: QuadForm<W64> = big.convert().unwrap();
        let (rb, _) = big.reduce().unwrap();
        let (rs, _) = small.reduce().unwrap();
        assert_eq!(rs.to_big(), rb);
        assert_eq!(small.exact_discriminant(), big.discriminant());
    }
}
