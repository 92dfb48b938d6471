//! 3×3 integer matrices acting on ternary lattices.
//!
//! Columns are basis vectors: `Q.transform(S)` is the form on the lattice
//! spanned by the columns of `S`.

use genus_arith::{convert, Ring};
use num_bigint::BigInt;
use std::fmt;

use crate::error::{GenusError, Result};
use crate::quadform::QuadForm;

/// A column vector.
pub type Vector<R> = [R; 3];

pub(crate) fn cross<R: Ring>(u: &Vector<R>, v: &Vector<R>) -> Vector<R> {
    [
        u[1].clone() * v[2].clone() - u[2].clone() * v[1].clone(),
        u[2].clone() * v[0].clone() - u[0].clone() * v[2].clone(),
        u[0].clone() * v[1].clone() - u[1].clone() * v[0].clone(),
    ]
}

pub(crate) fn dot<R: Ring>(u: &Vector<R>, v: &Vector<R>) -> R {
    u[0].clone() * v[0].clone() + u[1].clone() * v[1].clone() + u[2].clone() * v[2].clone()
}

pub(crate) fn is_zero_vector<R: Ring>(v: &Vector<R>) -> bool {
    v.iter().all(|x| x.is_zero())
}

/// `u + k·v`
pub(crate) fn axpy<R: Ring>(u: &Vector<R>, k: &R, v: &Vector<R>) -> Vector<R> {
    [
        u[0].clone() + k.clone() * v[0].clone(),
        u[1].clone() + k.clone() * v[1].clone(),
        u[2].clone() + k.clone() * v[2].clone(),
    ]
}

pub(crate) fn scale<R: Ring>(k: &R, v: &Vector<R>) -> Vector<R> {
    [
        k.clone() * v[0].clone(),
        k.clone() * v[1].clone(),
        k.clone() * v[2].clone(),
    ]
}

pub(crate) fn from_ints<R: Ring>(v: [i64; 3]) -> Vector<R> {
    [R::from_int(v[0]), R::from_int(v[1]), R::from_int(v[2])]
}

/// An integral linear map, usually a scaled isometry between two forms.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Isometry<R: Ring> {
    m: [[R; 3]; 3],
}

impl<R: Ring> Isometry<R> {
    pub fn identity() -> Self {
        Self::scalar(&R::one())
    }

    /// `k·I`
    pub fn scalar(k: &R) -> Self {
        let z = R::zero;
        Isometry {
            m: [
                [k.clone(), z(), z()],
                [z(), k.clone(), z()],
                [z(), z(), k.clone()],
            ],
        }
    }

    pub fn from_rows(m: [[R; 3]; 3]) -> Self {
        Isometry { m }
    }

    pub fn from_columns(c0: Vector<R>, c1: Vector<R>, c2: Vector<R>) -> Self {
        let [a0, a1, a2] = c0;
        let [b0, b1, b2] = c1;
        let [d0, d1, d2] = c2;
        Isometry {
            m: [[a0, b0, d0], [a1, b1, d1], [a2, b2, d2]],
        }
    }

    pub fn from_int_rows(m: [[i64; 3]; 3]) -> Self {
        Isometry {
            m: m.map(|row| row.map(R::from_int)),
        }
    }

    pub fn get(&self, i: usize, j: usize) -> &R {
        &self.m[i][j]
    }

    pub fn column(&self, j: usize) -> Vector<R> {
        [self.m[0][j].clone(), self.m[1][j].clone(), self.m[2][j].clone()]
    }

    /// `S·v`
    pub fn apply(&self, v: &Vector<R>) -> Vector<R> {
        [dot(&self.m[0], v), dot(&self.m[1], v), dot(&self.m[2], v)]
    }

    /// Composition `S∘T`, the matrix product `S·T`.
    pub fn mul(&self, other: &Isometry<R>) -> Isometry<R> {
        let cols = [other.column(0), other.column(1), other.column(2)];
        let [c0, c1, c2] = cols.map(|c| self.apply(&c));
        Isometry::from_columns(c0, c1, c2)
    }

    /// Composition that fails instead of wrapping on a fixed-width ring.
    pub fn checked_mul(&self, other: &Isometry<R>) -> Result<Isometry<R>> {
        let product = self.mul(other);
        if R::FIXED_WIDTH {
            let exact = self.to_big().mul(&other.to_big());
            if exact != product.to_big() {
                return Err(GenusError::Overflow(
                    "isometry composition exceeded 64 bits".into(),
                ));
            }
        }
        Ok(product)
    }

    /// Entrywise `S − T`.
    pub fn sub(&self, other: &Isometry<R>) -> Isometry<R> {
        let mut m = self.m.clone();
        for (i, row) in m.iter_mut().enumerate() {
            for (j, x) in row.iter_mut().enumerate() {
                *x = x.clone() - other.m[i][j].clone();
            }
        }
        Isometry { m }
    }

    pub fn transpose(&self) -> Isometry<R> {
        Isometry::from_columns(
            self.m[0].clone(),
            self.m[1].clone(),
            self.m[2].clone(),
        )
    }

    pub fn determinant(&self) -> R {
        dot(&self.m[0], &cross(&self.m[1], &self.m[2]))
    }

    /// Classical adjoint: `S·adj(S) = det(S)·I`.
    pub fn adjugate(&self) -> Isometry<R> {
        let r = &self.m;
        // Columns of the adjugate are cross products of row pairs.
        Isometry::from_columns(
            cross(&r[1], &r[2]),
            cross(&r[2], &r[0]),
            cross(&r[0], &r[1]),
        )
    }

    pub fn negate(&self) -> Isometry<R> {
        Isometry {
            m: self.m.clone().map(|row| row.map(|x| -x)),
        }
    }

    /// `scale²·S⁻¹`, computed exactly.
    ///
    /// For a neighbor isometry `S` at `p` this is integral and maps the
    /// neighbor back onto the original lattice scaled by `p`.
    pub fn inverse_scaled(&self, scale: &R) -> Result<Isometry<R>> {
        let big = self.to_big();
        let det = big.determinant();
        if det == BigInt::from(0) {
            return Err(GenusError::arithmetic::<R>("inverting a singular isometry"));
        }
        let s = scale.to_bigint();
        let s2 = &s * &s;
        let adj = big.adjugate();
        let mut rows: [[R; 3]; 3] = Isometry::<R>::identity().m;
        for (i, row) in rows.iter_mut().enumerate() {
            for (j, entry) in row.iter_mut().enumerate() {
                let numerator = adj.get(i, j) * &s2;
                if &numerator % &det != BigInt::from(0) {
                    return Err(GenusError::arithmetic::<R>(format!(
                        "scaled inverse by {} is not integral (det {})",
                        scale, det
                    )));
                }
                *entry = R::from_bigint(&(numerator / &det)).ok_or_else(|| {
                    GenusError::Overflow("scaled inverse exceeded 64 bits".into())
                })?;
            }
        }
        Ok(Isometry { m: rows })
    }

    /// Exact check that `Q1(S·x) = scalar²·Q2(x)` for all `x`.
    ///
    /// Evaluated over `BigInt`, so wrapped entries are caught as well.
    pub fn is_isometry(&self, q1: &QuadForm<R>, q2: &QuadForm<R>, scalar: &R) -> bool {
        let s = scalar.to_bigint();
        let image = q1.to_big().transform(&self.to_big());
        image == q2.to_big().scaled(&(&s * &s))
    }

    pub fn to_big(&self) -> Isometry<BigInt> {
        Isometry {
            m: self.m.clone().map(|row| row.map(|x| x.to_bigint())),
        }
    }

    /// Checked conversion to another integer strategy.
    pub fn convert<T: Ring>(&self) -> Option<Isometry<T>> {
        let mut rows: [[T; 3]; 3] = Isometry::<T>::identity().m;
        for (i, row) in rows.iter_mut().enumerate() {
            for (j, entry) in row.iter_mut().enumerate() {
                *entry = convert(&self.m[i][j])?;
            }
        }
        Some(Isometry { m: rows })
    }
}

impl<R: Ring> fmt::Display for Isometry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows: Vec<String> = self
            .m
            .iter()
            .map(|r| format!("[{}, {}, {}]", r[0], r[1], r[2]))
            .collect();
        write!(f, "[{}]", rows.join(", "))
    }
}
