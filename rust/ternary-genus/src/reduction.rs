//! Reduction of ternary forms to a canonical representative.
//!
//! A form is first size-reduced pairwise (Lagrange steps), then every
//! proper basis attaining the successive minima is enumerated: Fincke–Pohst
//! for the first two vectors and a planar closest-vector search in the
//! completing coset for the third. The canonical form is the smallest of
//! the resulting forms under [`QuadForm::canonical_cmp`].

use genus_arith::{div_floor, ext_gcd, Ring};
use std::cmp::Ordering;

use crate::error::{GenusError, Result};
use crate::isometry::{axpy, cross, from_ints, is_zero_vector, Isometry, Vector};
use crate::quadform::QuadForm;

pub(crate) fn reduce<R: Ring>(q: &QuadForm<R>) -> Result<(QuadForm<R>, Isometry<R>)> {
    let u = pairwise_reduce(q)?;
    let q0 = q.transform(&u);
    let mut best: Option<(QuadForm<R>, Isometry<R>)> = None;
    for m in minimal_bases(&q0)? {
        let candidate = q0.transform(&m);
        let better = match &best {
            None => true,
            Some((current, _)) => candidate.canonical_cmp(current) == Ordering::Less,
        };
        if better {
            best = Some((candidate, u.mul(&m)));
        }
    }
    best.ok_or_else(|| GenusError::arithmetic::<R>(format!("no minimal basis found for {}", q)))
}

/// Proper automorphisms of a form that is already reduced.
pub(crate) fn reduced_automorphisms<R: Ring>(q: &QuadForm<R>) -> Result<Vec<Isometry<R>>> {
    Ok(minimal_bases(q)?
        .into_iter()
        .filter(|m| q.transform(m) == *q)
        .collect())
}

/// Repeated Lagrange steps `b_j ← b_j − k·b_i` until no norm decreases.
/// Returns a proper unimodular change of basis with nondecreasing diagonal.
fn pairwise_reduce<R: Ring>(q: &QuadForm<R>) -> Result<Isometry<R>> {
    let mut cols: [Vector<R>; 3] = [from_ints([1, 0, 0]), from_ints([0, 1, 0]), from_ints([0, 0, 1])];
    let two = R::from_int(2);
    let four = R::from_int(4);
    loop {
        cols.sort_by_cached_key(|v| q.evaluate(v));
        let mut changed = false;
        for i in 0..3 {
            for j in 0..3 {
                if i == j {
                    continue;
                }
                let n = q.evaluate(&cols[i]);
                if !n.is_positive() {
                    return Err(GenusError::arithmetic::<R>(format!(
                        "nonpositive norm while reducing {}",
                        q
                    )));
                }
                let bb = q.bilinear(&cols[i], &cols[j]);
                // k = round(B(b_i, b_j) / 2Q(b_i))
                let k = div_floor(&(two.clone() * bb + two.clone() * n.clone()), &(four.clone() * n));
                if k.is_zero() {
                    continue;
                }
                let candidate = axpy(&cols[j], &-k, &cols[i]);
                if q.evaluate(&candidate) < q.evaluate(&cols[j]) {
                    cols[j] = candidate;
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }
    let [c0, c1, c2] = cols;
    let u = Isometry::from_columns(c0, c1, c2);
    Ok(if u.determinant().is_negative() { u.negate() } else { u })
}

/// Relative slack for floating-point enumeration bounds; every candidate
/// is re-checked exactly.
fn slack(bound: f64) -> f64 {
    1e-6 * (1.0 + bound.abs())
}

fn int_range(center: f64, width: f64) -> std::ops::RangeInclusive<i64> {
    let lo = (center - width - 1e-9).ceil() as i64;
    let hi = (center + width + 1e-9).floor() as i64;
    lo..=hi
}

/// All nonzero `v` with `Q(v) ≤ bound` (Fincke–Pohst).
pub(crate) fn short_vectors<R: Ring>(q: &QuadForm<R>, bound: &R) -> Vec<Vector<R>> {
    let (a, b, c) = (q.a.as_f64(), q.b.as_f64(), q.c.as_f64());
    let (f, g, h) = (q.f.as_f64(), q.g.as_f64(), q.h.as_f64());
    // Q = q11 (x + q12 y + q13 z)² + q22 (y + q23 z)² + q33 z²
    let q11 = a;
    let q12 = h / (2.0 * a);
    let q13 = g / (2.0 * a);
    let q22 = b - h * h / (4.0 * a);
    let q23 = (f - h * g / (2.0 * a)) / (2.0 * q22);
    let q33 = c - g * g / (4.0 * a) - q22 * q23 * q23;

    let limit = bound.as_f64() + slack(bound.as_f64());
    let mut out = Vec::new();
    for z in int_range(0.0, (limit / q33).max(0.0).sqrt()) {
        let r1 = limit - q33 * (z * z) as f64;
        if r1 < 0.0 {
            continue;
        }
        let zf = z as f64;
        for y in int_range(-q23 * zf, (r1 / q22).max(0.0).sqrt()) {
            let t = y as f64 + q23 * zf;
            let r2 = r1 - q22 * t * t;
            if r2 < 0.0 {
                continue;
            }
            let center = -(q12 * y as f64 + q13 * zf);
            for x in int_range(center, (r2 / q11).max(0.0).sqrt()) {
                if x == 0 && y == 0 && z == 0 {
                    continue;
                }
                let v: Vector<R> = from_ints([x, y, z]);
                if q.evaluate(&v) <= *bound {
                    out.push(v);
                }
            }
        }
    }
    out
}

/// `w` with `w·c = 1`, when `c` is primitive.
fn dual_vector<R: Ring>(c: &Vector<R>) -> Option<Vector<R>> {
    let (g1, s, t) = ext_gcd(&c[0], &c[1]);
    let (g2, u, w) = ext_gcd(&g1, &c[2]);
    if !g2.is_one() {
        return None;
    }
    Some([u.clone() * s, u * t, w])
}

/// Every proper basis `(v1, v2, v3)` with `Q(v1) = λ1`, `Q(v2) = λ2` and
/// `Q(v3)` minimal among completions. Expects a pairwise-reduced form.
pub(crate) fn minimal_bases<R: Ring>(q: &QuadForm<R>) -> Result<Vec<Isometry<R>>> {
    let bound = std::cmp::max(q.a.clone(), q.b.clone());
    let mut vs = short_vectors(q, &bound);
    vs.sort_by_cached_key(|v| q.evaluate(v));
    let norms: Vec<R> = vs.iter().map(|v| q.evaluate(v)).collect();

    let lambda1 = norms
        .first()
        .cloned()
        .ok_or_else(|| GenusError::arithmetic::<R>(format!("no short vectors for {}", q)))?;
    let lambda2 = vs
        .iter()
        .zip(&norms)
        .find(|(v, n)| {
            vs.iter()
                .zip(&norms)
                .any(|(u, m)| m <= *n && !is_zero_vector(&cross(v, u)))
        })
        .map(|(_, n)| n.clone())
        .ok_or_else(|| GenusError::arithmetic::<R>(format!("rank-deficient short vectors for {}", q)))?;

    let first: Vec<&Vector<R>> = vs.iter().zip(&norms).filter(|(_, n)| **n == lambda1).map(|(v, _)| v).collect();
    let second: Vec<&Vector<R>> = vs.iter().zip(&norms).filter(|(_, n)| **n == lambda2).map(|(v, _)| v).collect();

    let mut best: Option<R> = None;
    let mut bases = Vec::new();
    for v1 in &first {
        for v2 in &second {
            let c = cross(v1, v2);
            if is_zero_vector(&c) {
                continue;
            }
            let w = match dual_vector(&c) {
                Some(w) => w,
                None => continue,
            };
            let limit = match &best {
                Some(b) => b.clone(),
                None => std::cmp::max(q.c.clone(), q.evaluate(&w)),
            };
            for (norm, v3) in completions(q, v1, v2, &w, &limit) {
                let improves = match &best {
                    None => true,
                    Some(b) => norm < *b,
                };
                if improves {
                    best = Some(norm.clone());
                    bases.clear();
                }
                if Some(&norm) == best.as_ref() {
                    bases.push(Isometry::from_columns((*v1).clone(), (*v2).clone(), v3));
                }
            }
        }
    }
    if bases.is_empty() {
        return Err(GenusError::arithmetic::<R>(format!("no completion found for {}", q)));
    }
    Ok(bases)
}

/// Vectors `w + x·v1 + y·v2` of norm at most `limit`.
fn completions<R: Ring>(
    q: &QuadForm<R>,
    v1: &Vector<R>,
    v2: &Vector<R>,
    w: &Vector<R>,
    limit: &R,
) -> Vec<(R, Vector<R>)> {
    let l1 = q.evaluate(v1).as_f64();
    let l2 = q.evaluate(v2).as_f64();
    let b12 = q.bilinear(v1, v2).as_f64();
    let bw1 = q.bilinear(w, v1).as_f64();
    let bw2 = q.bilinear(w, v2).as_f64();
    let qw = q.evaluate(w).as_f64();
    let det = 4.0 * l1 * l2 - b12 * b12;

    // Real minimiser of Q(w + x v1 + y v2) and its value.
    let x0 = -(2.0 * l2 * bw1 - b12 * bw2) / det;
    let y0 = -(2.0 * l1 * bw2 - b12 * bw1) / det;
    let minimum = qw + bw1 * x0 + bw2 * y0 + l1 * x0 * x0 + l2 * y0 * y0 + b12 * x0 * y0;

    let budget = limit.as_f64() - minimum + slack(limit.as_f64());
    let mut out = Vec::new();
    if budget < 0.0 {
        return out;
    }
    for y in int_range(y0, (budget * 4.0 * l1 / det).max(0.0).sqrt()) {
        let dy = y as f64 - y0;
        let rem = budget - (l2 - b12 * b12 / (4.0 * l1)) * dy * dy;
        if rem < 0.0 {
            continue;
        }
        let center = x0 - b12 * dy / (2.0 * l1);
        for x in int_range(center, (rem / l1).max(0.0).sqrt()) {
            let v3 = axpy(&axpy(w, &R::from_int(x), v1), &R::from_int(y), v2);
            let norm = q.evaluate(&v3);
            if norm <= *limit {
                out.push((norm, v3));
            }
        }
    }
    out
}
