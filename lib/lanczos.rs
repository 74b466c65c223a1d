//! Lanczos eigensolver for Hermitian operators with full reorthogonalization.
//!
//! The Krylov basis is kept in memory and every new vector is orthogonalized
//! twice against all previous ones. Ritz pairs are extracted from the real
//! symmetric tridiagonal projection and a pair is accepted once its residual
//! estimate `β_m |s_{m,i}|` falls below `tol * max(1, |θ_i|)`.
//!
//! A single Krylov space holds only one direction of each degenerate
//! eigenspace. Converged pairs are therefore locked, and the iteration is
//! restarted from a fresh vector orthogonal to everything locked so far, until
//! a restart no longer turns up a pair beyond the `nev`-th locked one.

use nalgebra as na;
use rand::{ rngs::StdRng, SeedableRng };
use rand::distributions::Distribution;
use statrs::distribution::Normal;
use thiserror::Error;
use crate::{
    Scalar,
    csr::CsrMatrix,
    dotc,
    norm,
    pool::PoolError,
};

const CHECK_EVERY: usize = 5;
const BREAKDOWN: f64 = 1e-12;
const RESTARTS_PER_PAIR: usize = 3;

#[derive(Debug, Error)]
pub enum LanczosError {
    /// Returned when zero eigenpairs are requested.
    #[error("error in Lanczos: must request at least one eigenpair")]
    NoEigenpairs,

    /// Returned when the Krylov space is too small for the number of requested
    /// eigenpairs.
    #[error("error in Lanczos: ncv = {ncv} too small for nev = {nev}; need ncv > nev + 1")]
    KrylovTooSmall { nev: usize, ncv: usize },

    /// Returned when the start vector has the wrong length.
    #[error("error in Lanczos: start vector has length {found}, expected {expected}")]
    StartVectorLength { expected: usize, found: usize },

    /// Returned when the start vector vanishes.
    #[error("error in Lanczos: start vector has zero norm")]
    ZeroStartVector,

    /// Returned when the operator has the wrong dimension.
    #[error("error in Lanczos: operator has {found} rows, expected {expected}")]
    OperatorDimension { expected: usize, found: usize },

    /// Returned when an operator application fails.
    #[error("error in Lanczos: operator application failed: {0}")]
    Apply(#[from] PoolError),
}
use LanczosError::*;
pub type LanczosResult<T> = Result<T, LanczosError>;

/// Callback computing `y = A x`.
pub type MultiplyFn<'a, T> = dyn Fn(&[T], &mut [T]) -> Result<(), PoolError> + Sync + 'a;

/// A Hermitian linear operator.
pub enum LinearOp<'a, T> {
    /// An assembled matrix.
    Csr(&'a CsrMatrix<T>),
    /// A matrix-free product.
    Callback(&'a MultiplyFn<'a, T>),
}

impl<'a, T> LinearOp<'a, T>
where T: Scalar
{
    fn apply(&self, x: &[T], y: &mut [T]) -> LanczosResult<()> {
        match self {
            Self::Csr(mat) => { mat.multiply(x, y); Ok(()) },
            Self::Callback(f) => Ok(f(x, y)?),
        }
    }
}

/// End of the spectrum to target.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Which {
    Smallest,
    Largest,
}

/// Converged eigenpairs, ordered from the targeted end of the spectrum.
#[derive(Clone, Debug, PartialEq)]
pub struct Spectrum<T> {
    pub eigenvalues: Vec<f64>,
    pub eigenvectors: Vec<Vec<T>>,
    /// Number of converged pairs; only these are stored.
    pub nconv: usize,
    pub which: Which,
}

impl<T> Spectrum<T> {
    /// An empty spectrum.
    pub fn empty(which: Which) -> Self {
        Self { eigenvalues: Vec::new(), eigenvectors: Vec::new(), nconv: 0, which }
    }

    /// The extremal eigenvalue.
    pub fn e0(&self) -> Option<f64> { self.eigenvalues.first().copied() }

    /// Distance between the two most extremal eigenvalues.
    pub fn gap(&self) -> Option<f64> {
        (self.nconv >= 2)
            .then(|| (self.eigenvalues[1] - self.eigenvalues[0]).abs())
    }
}

/// Compute `nev` extremal eigenpairs of a Hermitian operator of dimension
/// `dim`.
///
/// Each Lanczos run takes at most `min(dim, max(ncv, maxit))` steps. Fewer than
/// `nev` pairs are returned if they haven't converged by then. Restart vectors
/// are drawn by rescaling the entries of `v0` with fixed-seed Gaussian weights,
/// so that they vanish wherever `v0` does and repeated calls agree.
#[allow(clippy::too_many_arguments)]
pub fn eigsolve<T>(
    op: &LinearOp<'_, T>,
    dim: usize,
    nev: usize,
    ncv: usize,
    maxit: usize,
    which: Which,
    tol: f64,
    v0: &[T],
) -> LanczosResult<Spectrum<T>>
where T: Scalar
{
    if nev == 0 { return Err(NoEigenpairs); }
    if ncv <= nev + 1 { return Err(KrylovTooSmall { nev, ncv }); }
    if v0.len() != dim {
        return Err(StartVectorLength { expected: dim, found: v0.len() });
    }
    if let LinearOp::Csr(mat) = op {
        if mat.nrows() != dim {
            return Err(OperatorDimension { expected: dim, found: mat.nrows() });
        }
    }
    if dim == 0 { return Ok(Spectrum::empty(which)); }
    if norm(v0) == 0.0 { return Err(ZeroStartVector); }

    let max_steps = dim.min(ncv.max(maxit));
    let mut locked: Vec<(f64, Vec<T>)> = Vec::with_capacity(nev + 1);
    let mut total_steps: usize = 0;
    for restart in 0..RESTARTS_PER_PAIR * nev + 1 {
        let start
            = if restart == 0 { v0.to_vec() } else { restart_vector(v0, restart) };
        let Some(q0) = deflate(start, &locked) else { break; };
        let full = locked.len() >= nev;
        let want = if full { 1 } else { nev - locked.len() };
        let (found, steps) = run(op, q0, &locked, want, max_steps, which, tol)?;
        total_steps += steps;
        if full {
            let worst = locked[nev - 1].0;
            let beyond
                = found.first()
                .is_some_and(|&(theta, _)| lies_beyond(theta, worst, which, tol));
            if !beyond { break; }
        } else if found.is_empty() {
            break;
        }
        locked.extend(found);
        locked.sort_by(|(a, _), (b, _)| match which {
            Which::Smallest => a.total_cmp(b),
            Which::Largest => b.total_cmp(a),
        });
        locked.truncate(nev);
    }
    if locked.len() < nev {
        log::warn!(
            "Lanczos stopped after {} steps with {} of {} pairs converged",
            total_steps, locked.len(), nev,
        );
    } else {
        log::debug!("Lanczos converged in {} steps", total_steps);
    }
    let (eigenvalues, eigenvectors): (Vec<f64>, Vec<Vec<T>>)
        = locked.into_iter().unzip();
    Ok(Spectrum { nconv: eigenvalues.len(), eigenvalues, eigenvectors, which })
}

// one Lanczos run in the complement of `locked`, returning up to `want`
// converged pairs from the targeted end and the number of steps taken
#[allow(clippy::too_many_arguments)]
fn run<T>(
    op: &LinearOp<'_, T>,
    q0: Vec<T>,
    locked: &[(f64, Vec<T>)],
    want: usize,
    max_steps: usize,
    which: Which,
    tol: f64,
) -> LanczosResult<(Vec<(f64, Vec<T>)>, usize)>
where T: Scalar
{
    let dim = q0.len();
    let mut basis: Vec<Vec<T>> = Vec::with_capacity(max_steps + 1);
    let mut alpha: Vec<f64> = Vec::with_capacity(max_steps);
    let mut beta: Vec<f64> = Vec::with_capacity(max_steps);
    basis.push(q0);
    let mut w: Vec<T> = vec![T::zero(); dim];

    for m in 0..max_steps {
        op.apply(&basis[m], &mut w)?;
        let a = dotc(&basis[m], &w).re();
        alpha.push(a);
        axpy(&mut w, -T::from_re(a), &basis[m]);
        if m > 0 { axpy(&mut w, -T::from_re(beta[m - 1]), &basis[m - 1]); }
        for _ in 0..2 {
            for q in locked.iter().map(|(_, v)| v).chain(basis.iter()) {
                let overlap = dotc(q, &w);
                axpy(&mut w, -overlap, q);
            }
        }
        let b = norm(&w);
        let steps = m + 1;
        let breakdown = b < BREAKDOWN;
        let last = breakdown || steps == max_steps;
        if last || (steps >= want && steps % CHECK_EVERY == 0) {
            let (theta, s) = ritz(&alpha, &beta, which);
            let converged: Vec<usize>
                = (0..theta.len().min(want))
                .take_while(|&i| {
                    breakdown
                        || b * s[(steps - 1, i)].abs() < tol * theta[i].abs().max(1.0)
                })
                .collect();
            if converged.len() == want || last {
                return Ok((recover(&basis, &theta, &s, &converged), steps));
            }
        }
        let inv = T::from_re(b.recip());
        basis.push(w.iter().map(|&x| x * inv).collect());
        beta.push(b);
    }
    Ok((Vec::new(), max_steps))
}

// `theta` is further toward the targeted end than `worst`, beyond tolerance
fn lies_beyond(theta: f64, worst: f64, which: Which, tol: f64) -> bool {
    let margin = tol * worst.abs().max(1.0);
    match which {
        Which::Smallest => theta < worst - margin,
        Which::Largest => theta > worst + margin,
    }
}

fn restart_vector<T>(v0: &[T], restart: usize) -> Vec<T>
where T: Scalar
{
    let mut rng = StdRng::seed_from_u64(restart as u64);
    let normal = Normal::standard();
    v0.iter().map(|&x| x * T::from_re(normal.sample(&mut rng))).collect()
}

// orthogonalize against the locked vectors and normalize; `None` if nothing
// is left
fn deflate<T>(mut v: Vec<T>, locked: &[(f64, Vec<T>)]) -> Option<Vec<T>>
where T: Scalar
{
    let before = norm(&v);
    for _ in 0..2 {
        for (_, q) in locked.iter() {
            let overlap = dotc(q, &v);
            axpy(&mut v, -overlap, q);
        }
    }
    let after = norm(&v);
    if after <= 1e-8 * before { return None; }
    let inv = T::from_re(after.recip());
    v.iter_mut().for_each(|x| { *x *= inv; });
    Some(v)
}

fn axpy<T>(y: &mut [T], a: T, x: &[T])
where T: Scalar
{
    y.iter_mut().zip(x).for_each(|(yi, &xi)| { *yi += a * xi; });
}

// eigenpairs of the tridiagonal projection, sorted from the targeted end
fn ritz(alpha: &[f64], beta: &[f64], which: Which) -> (Vec<f64>, na::DMatrix<f64>) {
    let m = alpha.len();
    let mut t = na::DMatrix::<f64>::zeros(m, m);
    for i in 0..m {
        t[(i, i)] = alpha[i];
        if i + 1 < m {
            t[(i, i + 1)] = beta[i];
            t[(i + 1, i)] = beta[i];
        }
    }
    let eig = t.symmetric_eigen();
    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&i, &j| {
        let (a, b) = (eig.eigenvalues[i], eig.eigenvalues[j]);
        match which {
            Which::Smallest => a.total_cmp(&b),
            Which::Largest => b.total_cmp(&a),
        }
    });
    let theta: Vec<f64> = order.iter().map(|&i| eig.eigenvalues[i]).collect();
    let s = na::DMatrix::from_fn(m, m, |r, c| eig.eigenvectors[(r, order[c])]);
    (theta, s)
}

fn recover<T>(
    basis: &[Vec<T>],
    theta: &[f64],
    s: &na::DMatrix<f64>,
    which_pairs: &[usize],
) -> Vec<(f64, Vec<T>)>
where T: Scalar
{
    let dim = basis[0].len();
    which_pairs.iter()
        .map(|&i| {
            let mut v: Vec<T> = vec![T::zero(); dim];
            for (k, q) in basis.iter().take(s.nrows()).enumerate() {
                axpy(&mut v, T::from_re(s[(k, i)]), q);
            }
            let nrm = norm(&v);
            v.iter_mut().for_each(|x| { *x *= T::from_re(nrm.recip()); });
            (theta[i], v)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64 as C64;
    use crate::csr::LilMatrix;

    fn chain_laplacian(n: usize) -> CsrMatrix<f64> {
        // eigenvalues 2 - 2 cos(π j / (n + 1))
        let mut lil = LilMatrix::new(n, false);
        for i in 0..n {
            lil.add(i, i, 2.0);
            if i + 1 < n {
                lil.add(i, i + 1, -1.0);
                lil.add(i + 1, i, -1.0);
            }
        }
        lil.into_csr()
    }

    fn exact(n: usize, j: usize) -> f64 {
        2.0 - 2.0 * (std::f64::consts::PI * j as f64 / (n + 1) as f64).cos()
    }

    #[test]
    fn smallest_and_largest() {
        let n = 60;
        let mat = chain_laplacian(n);
        let v0: Vec<f64> = (0..n).map(|i| 1.0 + 0.01 * i as f64).collect();
        let lo = eigsolve(&LinearOp::Csr(&mat), n, 2, 20, 200, Which::Smallest, 1e-10, &v0)
            .unwrap();
        assert_eq!(lo.nconv, 2);
        assert!((lo.eigenvalues[0] - exact(n, 1)).abs() < 1e-8);
        assert!((lo.eigenvalues[1] - exact(n, 2)).abs() < 1e-8);
        let hi = eigsolve(&LinearOp::Csr(&mat), n, 1, 20, 200, Which::Largest, 1e-10, &v0)
            .unwrap();
        assert!((hi.eigenvalues[0] - exact(n, n)).abs() < 1e-8);
        // residual of the returned vector
        let mut y = vec![0.0; n];
        mat.multiply(&lo.eigenvectors[0], &mut y);
        let res: f64
            = y.iter().zip(&lo.eigenvectors[0])
            .map(|(yi, vi)| (yi - lo.eigenvalues[0] * vi).powi(2))
            .sum::<f64>()
            .sqrt();
        assert!(res < 1e-6);
    }

    #[test]
    fn callback_and_breakdown() {
        // diag(3, 1, 2) in a complex basis: the Krylov space closes after three
        // steps
        let diag = [3.0, 1.0, 2.0];
        let f = |x: &[C64], y: &mut [C64]| -> Result<(), PoolError> {
            y.iter_mut().zip(x).zip(diag).for_each(|((yi, &xi), d)| { *yi = xi * d; });
            Ok(())
        };
        let v0 = vec![C64::new(1.0, 0.0), C64::new(0.0, 1.0), C64::new(1.0, 1.0)];
        let op: LinearOp<C64> = LinearOp::Callback(&f);
        let spec = eigsolve(&op, 3, 2, 4, 10, Which::Smallest, 1e-12, &v0).unwrap();
        assert_eq!(spec.nconv, 2);
        assert!((spec.eigenvalues[0] - 1.0).abs() < 1e-12);
        assert!((spec.gap().unwrap() - 1.0).abs() < 1e-12);
        assert!((spec.eigenvectors[0][1].norm() - 1.0).abs() < 1e-10);
    }

    fn diagonal(d: &[f64]) -> CsrMatrix<f64> {
        let mut lil = LilMatrix::new(d.len(), false);
        d.iter().enumerate().for_each(|(i, &x)| { lil.add(i, i, x); });
        lil.into_csr()
    }

    #[test]
    fn degenerate_levels_are_all_found() {
        // a threefold level at 1; a Krylov space started from the uniform
        // vector only ever sees (1, 0, 1, 0, 1, 0)
        let mat = diagonal(&[1.0, 0.0, 1.0, 3.0, 1.0, 2.0]);
        let op = LinearOp::Csr(&mat);
        let v0 = vec![1.0; 6];
        let lo = eigsolve(&op, 6, 3, 5, 0, Which::Smallest, 1e-10, &v0).unwrap();
        assert_eq!(lo.nconv, 3);
        for (e, x) in lo.eigenvalues.iter().zip([0.0, 1.0, 1.0]) {
            assert!((e - x).abs() < 1e-10);
        }
        assert!(lo.gap().unwrap() > 1.0 - 1e-10);
        for i in 0..3 {
            for j in 0..3 {
                let d = dotc(&lo.eigenvectors[i], &lo.eigenvectors[j]);
                let x = if i == j { 1.0 } else { 0.0 };
                assert!((d - x).abs() < 1e-8);
            }
        }

        let hi = eigsolve(&op, 6, 4, 6, 0, Which::Largest, 1e-10, &v0).unwrap();
        assert_eq!(hi.nconv, 4);
        for (e, x) in hi.eigenvalues.iter().zip([3.0, 2.0, 1.0, 1.0]) {
            assert!((e - x).abs() < 1e-10);
        }

        let pair = eigsolve(&op, 6, 2, 5, 0, Which::Largest, 1e-10, &v0).unwrap();
        assert!((pair.gap().unwrap() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn restarts_keep_the_start_support() {
        // the largest level sits where the start vector vanishes
        let mat = diagonal(&[1.0, 5.0, 2.0, 2.0]);
        let v0 = vec![1.0, 0.0, 1.0, 0.5];
        let spec = eigsolve(&LinearOp::Csr(&mat), 4, 2, 4, 0, Which::Largest, 1e-10, &v0)
            .unwrap();
        assert_eq!(spec.nconv, 2);
        assert!((spec.eigenvalues[0] - 2.0).abs() < 1e-10);
        assert!((spec.eigenvalues[1] - 2.0).abs() < 1e-10);
        assert!(spec.eigenvectors.iter().all(|v| v[1] == 0.0));
    }

    #[test]
    fn argument_errors() {
        let mat = chain_laplacian(4);
        let v0 = vec![1.0; 4];
        let op = LinearOp::Csr(&mat);
        assert!(matches!(
            eigsolve(&op, 4, 0, 4, 10, Which::Smallest, 1e-8, &v0),
            Err(NoEigenpairs)
        ));
        assert!(matches!(
            eigsolve(&op, 4, 2, 3, 10, Which::Smallest, 1e-8, &v0),
            Err(KrylovTooSmall { .. })
        ));
        assert!(matches!(
            eigsolve(&op, 4, 1, 3, 10, Which::Smallest, 1e-8, &[0.0; 4]),
            Err(ZeroStartVector)
        ));
    }
}
