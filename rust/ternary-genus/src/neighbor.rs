//! Kneser p-neighbors of a ternary form.
//!
//! A hyperbolic frame `(e, f, g)` of `Q mod p` is fixed once per manager:
//! `e`, `f` isotropic with `B(e, f) = 1` and `g ⟂ e, f`. The p+1 isotropic
//! lines are then `t ↦ f + t·g − Q(g)·t²·e` for `t < p` and `e` for `t = p`.

use genus_arith::{divides, ext_gcd, PrimeField, Ring};
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::Signed;

use crate::error::{GenusError, Result};
use crate::isometry::{axpy, from_ints, scale, Isometry, Vector};
use crate::quadform::QuadForm;

type Residues = [u64; 3];

/// Generates the p+1 neighbors of a form at a fixed prime.
#[derive(Debug, Clone)]
pub struct NeighborManager<R: Ring> {
    q: QuadForm<R>,
    disc: BigInt,
    field: PrimeField,
    e: Residues,
    f: Residues,
    g: Residues,
    qg: u64,
    validate: bool,
}

fn eval_mod(field: &PrimeField, coeffs: &[u64; 6], v: &Residues) -> u64 {
    let [a, b, c, f, g, h] = *coeffs;
    let [x, y, z] = *v;
    let terms = [
        field.mul(a, field.mul(x, x)),
        field.mul(b, field.mul(y, y)),
        field.mul(c, field.mul(z, z)),
        field.mul(f, field.mul(y, z)),
        field.mul(g, field.mul(x, z)),
        field.mul(h, field.mul(x, y)),
    ];
    terms.iter().fold(0, |acc, &t| field.add(acc, t))
}

fn gram_mod(field: &PrimeField, coeffs: &[u64; 6]) -> [[u64; 3]; 3] {
    let [a, b, c, f, g, h] = *coeffs;
    [
        [field.add(a, a), h, g],
        [h, field.add(b, b), f],
        [g, f, field.add(c, c)],
    ]
}

fn apply_mod(field: &PrimeField, m: &[[u64; 3]; 3], v: &Residues) -> Residues {
    m.map(|row| {
        (0..3).fold(0, |acc, j| field.add(acc, field.mul(row[j], v[j])))
    })
}

fn dot_mod(field: &PrimeField, u: &Residues, v: &Residues) -> u64 {
    (0..3).fold(0, |acc, i| field.add(acc, field.mul(u[i], v[i])))
}

fn cross_mod(field: &PrimeField, u: &Residues, v: &Residues) -> Residues {
    [
        field.sub(field.mul(u[1], v[2]), field.mul(u[2], v[1])),
        field.sub(field.mul(u[2], v[0]), field.mul(u[0], v[2])),
        field.sub(field.mul(u[0], v[1]), field.mul(u[1], v[0])),
    ]
}

impl<R: Ring> NeighborManager<R> {
    /// Sample the hyperbolic frame for `q` at `field.prime()`.
    pub fn new(q: &QuadForm<R>, field: &mut PrimeField, validate: bool) -> Result<Self> {
        let p = field.prime();
        let disc = q.exact_discriminant();
        if disc.is_multiple_of(&BigInt::from(p)) {
            return Err(GenusError::PrimeDividesDiscriminant {
                p,
                disc: disc.to_string(),
            });
        }
        let coeffs = q.residues(p);
        let gram = gram_mod(field, &coeffs);

        let e = loop {
            let v = field.random_vector();
            if v != [0, 0, 0] && eval_mod(field, &coeffs, &v) == 0 {
                break v;
            }
        };

        // A basis vector not orthogonal to e, scaled so B(e, f) = 1.
        let ae = apply_mod(field, &gram, &e);
        let i = (0..3).find(|&i| ae[i] != 0).ok_or_else(|| {
            GenusError::Consistency(format!("isotropic vector {:?} is radical mod {}", e, p))
        })?;
        let s = field.inv(ae[i]).ok_or_else(|| {
            GenusError::Consistency(format!("{} is not invertible mod {}", ae[i], p))
        })?;
        let mut f = [0u64; 3];
        f[i] = s;
        let qf = eval_mod(field, &coeffs, &f);
        let f = [0usize, 1, 2].map(|k| field.sub(f[k], field.mul(qf, e[k])));

        let af = apply_mod(field, &gram, &f);
        let g = cross_mod(field, &ae, &af);
        let qg = eval_mod(field, &coeffs, &g);

        if validate {
            let checks = [
                eval_mod(field, &coeffs, &f) == 0,
                dot_mod(field, &ae, &f) == 1,
                dot_mod(field, &ae, &g) == 0,
                dot_mod(field, &af, &g) == 0,
                g != [0, 0, 0],
            ];
            if checks.iter().any(|ok| !ok) {
                return Err(GenusError::Consistency(format!(
                    "bad hyperbolic frame mod {} for {}",
                    p, q
                )));
            }
        }

        Ok(NeighborManager {
            q: q.clone(),
            disc,
            field: field.clone(),
            e,
            f,
            g,
            qg,
            validate,
        })
    }

    pub fn prime(&self) -> u64 {
        self.field.prime()
    }

    pub fn form(&self) -> &QuadForm<R> {
        &self.q
    }

    /// The isotropic vector mod p for projective coordinate `t` (`t = p` is ∞).
    pub fn isotropic_vector(&self, t: u64) -> Residues {
        let field = &self.field;
        if t == self.prime() {
            return self.e;
        }
        let t2 = field.mul(self.qg, field.mul(t, t));
        [0usize, 1, 2].map(|k| {
            let v = field.add(self.f[k], field.mul(t, self.g[k]));
            field.sub(v, field.mul(t2, self.e[k]))
        })
    }

    /// The unreduced neighbor for `t` and `S` with `Q(S·v) = p²·Q'(v)`.
    pub fn neighbor(&self, t: u64) -> Result<(QuadForm<R>, Isometry<R>)> {
        let p = self.prime();
        let q = &self.q;
        let pr = R::from_int(p as i64);
        let p2 = pr.clone() * pr.clone();
        let failure = |what: &str| {
            GenusError::arithmetic::<R>(format!("{} for {} at p = {}, t = {}", what, q, p, t))
        };

        let raw = self.isotropic_vector(t);
        let content = raw[0].gcd(&raw[1]).gcd(&raw[2]);
        let v: Vector<R> = from_ints(raw.map(|x| (x / content) as i64));

        let (mut x, mut y, mut z) = unimodular_completion(v);
        if !divides(&pr, &q.evaluate(&x)) {
            return Err(failure("lifted vector is not isotropic"));
        }
        if q.bilinear(&x, &z).residue(p) == 0 {
            std::mem::swap(&mut y, &mut z);
        }
        let bz = q.bilinear(&x, &z).residue(p);
        let bz_inv = self.field.inv(bz).ok_or_else(|| failure("isotropic vector is radical"))?;

        // Lift x so that Q(x) ≡ 0 (mod p²).
        let qx = (q.evaluate(&x) / pr.clone()).residue(p);
        let k = self.field.mul(self.field.neg(qx), bz_inv);
        x = axpy(&x, &(pr.clone() * R::from_int(k as i64)), &z);
        if !divides(&p2, &q.evaluate(&x)) {
            return Err(failure("Q(x) is not divisible by p²"));
        }

        // Make y orthogonal to x modulo p.
        let m = self.field.mul(q.bilinear(&x, &y).residue(p), bz_inv);
        y = axpy(&y, &-R::from_int(m as i64), &z);
        let bxy = q.bilinear(&x, &y);
        if !divides(&pr, &bxy) {
            return Err(failure("B(x, y) is not divisible by p"));
        }

        let (qx, qy, qz) = (q.evaluate(&x), q.evaluate(&y), q.evaluate(&z));
        let (byz, bxz) = (q.bilinear(&y, &z), q.bilinear(&x, &z));

        // The index-p sublattice <x, y, p z> scales the discriminant by p².
        let intermediate = QuadForm::new(
            qx.clone(),
            qy.clone(),
            p2.clone() * qz.clone(),
            pr.clone() * byz.clone(),
            pr.clone() * bxz.clone(),
            bxy.clone(),
        );
        let bp = BigInt::from(p);
        if intermediate.exact_discriminant() != &self.disc * &bp * &bp {
            return Err(failure("index-p sublattice has the wrong discriminant"));
        }

        let neighbor = QuadForm::new(
            qx / p2.clone(),
            qy,
            p2.clone() * qz,
            pr.clone() * byz,
            bxz,
            bxy / pr.clone(),
        );
        if neighbor.exact_discriminant() != self.disc {
            return Err(failure("neighbor discriminant differs from the original"));
        }
        if !neighbor.to_big().is_positive_definite() {
            return Err(failure("neighbor is not positive definite"));
        }

        let s = Isometry::from_columns(x, scale(&pr, &y), scale(&p2, &z));
        let s = if s.to_big().determinant().is_negative() {
            s.negate()
        } else {
            s
        };
        if self.validate && !s.is_isometry(q, &neighbor, &pr) {
            return Err(failure("neighbor isometry check failed"));
        }
        Ok((neighbor, s))
    }

    /// The reduced neighbor for `t` with its isometry.
    pub fn reduced_neighbor(&self, t: u64) -> Result<(QuadForm<R>, Isometry<R>)> {
        let (neighbor, s) = self.neighbor(t)?;
        let (reduced, u) = neighbor.reduce()?;
        let s = s.checked_mul(&u)?;
        if reduced.exact_discriminant() != self.disc {
            return Err(GenusError::arithmetic::<R>(format!(
                "reduced neighbor {} has the wrong discriminant",
                reduced
            )));
        }
        Ok((reduced, s))
    }

    /// All p+1 reduced neighbors, in order of `t`.
    pub fn neighbors(&self) -> impl Iterator<Item = Result<(QuadForm<R>, Isometry<R>)>> + '_ {
        (0..=self.prime()).map(move |t| self.reduced_neighbor(t))
    }
}

/// Columns `(x, y, z)` of a unimodular matrix whose first column is the
/// primitive vector `v`.
fn unimodular_completion<R: Ring>(v: Vector<R>) -> (Vector<R>, Vector<R>, Vector<R>) {
    let (d, s, t) = ext_gcd(&v[0], &v[1]);
    if d.is_zero() {
        return (v, from_ints([1, 0, 0]), from_ints([0, 1, 0]));
    }
    let (_, u, w) = ext_gcd(&d, &v[2]);
    let y = [-t, s, R::zero()];
    let z = [
        -(w.clone() * v[0].clone() / d.clone()),
        -(w * v[1].clone() / d),
        u,
    ];
    (v, y, z)
}
