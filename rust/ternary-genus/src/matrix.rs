//! Integer matrices produced by Hecke construction.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Square row-major integer matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenseMatrix {
    pub dim: usize,
    pub data: Vec<i64>,
}

impl DenseMatrix {
    pub fn zeros(dim: usize) -> Self {
        DenseMatrix {
            dim,
            data: vec![0; dim * dim],
        }
    }

    pub fn from_rows(rows: &[Vec<i64>]) -> Self {
        let dim = rows.len();
        let data = rows.iter().flat_map(|r| r.iter().copied()).collect();
        DenseMatrix { dim, data }
    }

    pub fn get(&self, i: usize, j: usize) -> i64 {
        self.data[i * self.dim + j]
    }

    pub(crate) fn add(&mut self, i: usize, j: usize, value: i64) {
        self.data[i * self.dim + j] += value;
    }

    pub fn row(&self, i: usize) -> &[i64] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    pub fn to_rows(&self) -> Vec<Vec<i64>> {
        (0..self.dim).map(|i| self.row(i).to_vec()).collect()
    }

    pub fn row_sums(&self) -> Vec<i64> {
        (0..self.dim).map(|i| self.row(i).iter().sum()).collect()
    }

    pub fn trace(&self) -> i64 {
        (0..self.dim).map(|i| self.get(i, i)).sum()
    }

    pub fn mul(&self, other: &DenseMatrix) -> DenseMatrix {
        assert_eq!(self.dim, other.dim, "dimension mismatch");
        let n = self.dim;
        let mut out = DenseMatrix::zeros(n);
        for i in 0..n {
            for k in 0..n {
                let a = self.get(i, k);
                if a == 0 {
                    continue;
                }
                for j in 0..n {
                    out.data[i * n + j] += a * other.get(k, j);
                }
            }
        }
        out
    }

    pub fn commutes_with(&self, other: &DenseMatrix) -> bool {
        self.mul(other) == other.mul(self)
    }

    pub fn nnz(&self) -> usize {
        self.data.iter().filter(|&&x| x != 0).count()
    }
}

impl fmt::Display for DenseMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.dim {
            let row: Vec<String> = self.row(i).iter().map(|x| format!("{:>4}", x)).collect();
            writeln!(f, "[{}]", row.join(""))?;
        }
        Ok(())
    }
}

/// Compressed sparse row matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsrMatrix {
    pub dim: usize,
    pub data: Vec<i64>,
    pub indices: Vec<usize>,
    pub indptr: Vec<usize>,
}

impl CsrMatrix {
    pub fn empty(dim: usize) -> Self {
        CsrMatrix {
            dim,
            data: Vec::new(),
            indices: Vec::new(),
            indptr: vec![0; dim + 1],
        }
    }

    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    /// `(column, value)` pairs of row `i`.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, i64)> + '_ {
        let range = self.indptr[i]..self.indptr[i + 1];
        self.indices[range.clone()]
            .iter()
            .copied()
            .zip(self.data[range].iter().copied())
    }

    pub fn get(&self, i: usize, j: usize) -> i64 {
        self.row(i).find(|&(c, _)| c == j).map_or(0, |(_, v)| v)
    }

    pub fn to_dense(&self) -> DenseMatrix {
        let mut dense = DenseMatrix::zeros(self.dim);
        for i in 0..self.dim {
            for (j, v) in self.row(i) {
                dense.add(i, j, v);
            }
        }
        dense
    }
}

/// Builds a [`CsrMatrix`] row by row through a reusable scratch row.
pub(crate) struct CsrBuilder {
    matrix: CsrMatrix,
    scratch: Vec<i64>,
    touched: Vec<usize>,
}

impl CsrBuilder {
    pub fn new(dim: usize) -> Self {
        CsrBuilder {
            matrix: CsrMatrix::empty(dim),
            scratch: vec![0; dim],
            touched: Vec::new(),
        }
    }

    pub fn accumulate(&mut self, col: usize, value: i64) {
        if self.scratch[col] == 0 {
            self.touched.push(col);
        }
        self.scratch[col] += value;
    }

    /// Flush the scratch row into row `row`, dropping cancelled entries.
    pub fn close_row(&mut self, row: usize) {
        self.touched.sort_unstable();
        self.touched.dedup();
        let mut nnz = 0;
        for &col in &self.touched {
            let value = std::mem::take(&mut self.scratch[col]);
            if value != 0 {
                self.matrix.data.push(value);
                self.matrix.indices.push(col);
                nnz += 1;
            }
        }
        self.touched.clear();
        self.matrix.indptr[row + 1] = self.matrix.indptr[row] + nnz;
    }

    pub fn finish(self) -> CsrMatrix {
        self.matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_basics() {
        let m = DenseMatrix::from_rows(&[vec![0, 3], vec![2, 1]]);
        assert_eq!(m.get(0, 1), 3);
        assert_eq!(m.row_sums(), vec![3, 3]);
        assert_eq!(m.trace(), 1);
        assert_eq!(m.to_rows(), vec![vec![0, 3], vec![2, 1]]);
        assert_eq!(m.nnz(), 3);
    }

    #[test]
    fn test_dense_mul() {
        let a = DenseMatrix::from_rows(&[vec![0, 3], vec![2, 1]]);
        let b = DenseMatrix::from_rows(&[vec![1, 3], vec![2, 2]]);
        assert_eq!(a.mul(&b), DenseMatrix::from_rows(&[vec![6, 6], vec![4, 8]]));
        assert!(a.commutes_with(&b));
        let c = DenseMatrix::from_rows(&[vec![1, 0], vec![0, 2]]);
        assert!(!a.commutes_with(&c));
    }

    #[test]
    fn test_csr_builder_drops_cancelled_entries() {
        let mut builder = CsrBuilder::new(3);
        builder.accumulate(2, 1);
        builder.accumulate(0, 1);
        builder.accumulate(2, 1);
        builder.close_row(0);
        builder.close_row(1);
        builder.accumulate(1, 1);
        builder.accumulate(1, -1);
        builder.accumulate(0, -1);
        builder.close_row(2);
        let csr = builder.finish();
        assert_eq!(csr.indptr, vec![0, 2, 2, 3]);
        assert_eq!(csr.indices, vec![0, 2, 0]);
        assert_eq!(csr.data, vec![1, 2, -1]);
        assert_eq!(csr.get(0, 2), 2);
        assert_eq!(csr.get(1, 1), 0);
        assert_eq!(
            csr.to_dense(),
            DenseMatrix::from_rows(&[vec![1, 0, 2], vec![0, 0, 0], vec![-1, 0, 0]])
        );
    }
}
