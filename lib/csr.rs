//! Compressed sparse row storage for sector Hamiltonians.
//!
//! Rows are accumulated in list-of-lists form and compressed once. A matrix
//! built with `upper = true` stores only entries with `col >= row`; the lower
//! triangle is implied by Hermiticity.

use nalgebra as na;
use crate::Scalar;

/// Row-wise accumulator for a [`CsrMatrix`].
#[derive(Clone, Debug, PartialEq)]
pub struct LilMatrix<T> {
    rows: Vec<Vec<(usize, T)>>,
    upper: bool,
}

impl<T> LilMatrix<T>
where T: Scalar
{
    /// Create a new, empty `n x n` matrix.
    pub fn new(n: usize, upper: bool) -> Self {
        Self { rows: vec![Vec::new(); n], upper }
    }

    /// Build directly from finished rows.
    pub fn from_rows(rows: Vec<Vec<(usize, T)>>, upper: bool) -> Self {
        Self { rows, upper }
    }

    pub fn nrows(&self) -> usize { self.rows.len() }

    /// Add `x` to entry `(i, j)`. Lower-triangle entries are ignored for
    /// upper-triangular storage.
    pub fn add(&mut self, i: usize, j: usize, x: T) {
        if self.upper && j < i { return; }
        self.rows[i].push((j, x));
    }

    /// Sort every row by column, merge duplicates, and compress.
    pub fn into_csr(self) -> CsrMatrix<T> {
        let nrows = self.rows.len();
        let mut row_ptr: Vec<usize> = Vec::with_capacity(nrows + 1);
        let mut col_idx: Vec<usize> = Vec::new();
        let mut values: Vec<T> = Vec::new();
        row_ptr.push(0);
        for mut row in self.rows.into_iter() {
            row.sort_by_key(|&(col, _)| col);
            let start = col_idx.len();
            for (col, val) in row.into_iter() {
                if col_idx.len() > start && col_idx.last() == Some(&col) {
                    if let Some(last) = values.last_mut() { *last += val; }
                    continue;
                }
                col_idx.push(col);
                values.push(val);
            }
            row_ptr.push(col_idx.len());
        }
        CsrMatrix { nrows, row_ptr, col_idx, values, upper: self.upper }
    }
}

/// Sparse square matrix in compressed sparse row format.
#[derive(Clone, Debug, PartialEq)]
pub struct CsrMatrix<T> {
    nrows: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<T>,
    upper: bool,
}

impl<T> CsrMatrix<T>
where T: Scalar
{
    pub fn nrows(&self) -> usize { self.nrows }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize { self.values.len() }

    /// Returns `true` if only the upper triangle is stored.
    pub fn is_upper(&self) -> bool { self.upper }

    pub fn row_ptr(&self) -> &[usize] { &self.row_ptr }

    pub fn col_idx(&self) -> &[usize] { &self.col_idx }

    pub fn values(&self) -> &[T] { &self.values }

    /// Stored entries of row `i`.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, T)> + '_ {
        let range = self.row_ptr[i]..self.row_ptr[i + 1];
        self.col_idx[range.clone()].iter().copied()
            .zip(self.values[range].iter().copied())
    }

    /// Entry `(i, j)` of the full matrix.
    pub fn get(&self, i: usize, j: usize) -> T {
        let lookup = |r: usize, c: usize| -> Option<T> {
            let range = self.row_ptr[r]..self.row_ptr[r + 1];
            self.col_idx[range.clone()].binary_search(&c).ok()
                .map(|k| self.values[range.start + k])
        };
        if self.upper && j < i {
            lookup(j, i).map(|x| x.conj()).unwrap_or_else(T::zero)
        } else {
            lookup(i, j).unwrap_or_else(T::zero)
        }
    }

    /// Compute `y = A x`.
    ///
    /// *Panics* if `x` or `y` doesn't have length `nrows`.
    pub fn multiply(&self, x: &[T], y: &mut [T]) {
        assert_eq!(x.len(), self.nrows);
        assert_eq!(y.len(), self.nrows);
        y.iter_mut().for_each(|yi| { *yi = T::zero(); });
        for i in 0..self.nrows {
            let mut acc = T::zero();
            for (j, v) in self.row(i) {
                acc += v * x[j];
                if self.upper && j != i {
                    y[j] += v.conj() * x[i];
                }
            }
            y[i] += acc;
        }
    }

    /// Expand into a dense matrix.
    pub fn to_dense(&self) -> na::DMatrix<T> {
        let mut dense = na::DMatrix::from_element(self.nrows, self.nrows, T::zero());
        for i in 0..self.nrows {
            for (j, v) in self.row(i) {
                dense[(i, j)] += v;
                if self.upper && j != i {
                    dense[(j, i)] += v.conj();
                }
            }
        }
        dense
    }

    /// Largest deviation from Hermiticity, `max |A_ij - conj(A_ji)|`.
    pub fn hermiticity_error(&self) -> f64 {
        if self.upper { return 0.0; }
        (0..self.nrows)
            .flat_map(|i| self.row(i).map(move |(j, v)| (i, j, v)))
            .map(|(i, j, v)| (v - self.get(j, i).conj()).modulus())
            .fold(0.0, f64::max)
    }
}
