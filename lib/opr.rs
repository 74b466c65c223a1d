//! Operators built from dense single-site matrices.
//!
//! An [`Opr`] acts on one orbital of one site, an [`OprProd`] is a scaled
//! product of them, and an [`MOpr`] is a sum of products. Products and sums are
//! formed with `*` and `+`, and scalars multiply from the left:
//! ```ignore
//! let hop: MOpr<C64>
//!     = C64::from(-1.0) * (local::cdag(0, 0) * local::c(1, 0))
//!     + C64::from(-1.0) * (local::cdag(1, 0) * local::c(0, 0));
//! ```
//!
//! Factors of a product are applied right to left. Multiplying two factors
//! acting on the same orbital of the same site multiplies their matrices,
//! moving the right factor leftward past any factors in between with the
//! appropriate fermionic exchange sign; distinct modes are simply appended.

use std::ops::{ Add, AddAssign, Mul };
use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::Scalar;

/// A single-site operator.
#[derive(Clone, Debug, PartialEq)]
pub struct Opr<T> {
    site: usize,
    orbital: usize,
    fermion: bool,
    diagonal: bool,
    mat: nd::Array2<T>,
}

impl<T> Opr<T>
where T: Scalar
{
    /// Create a new operator on orbital `orbital` of `site`. `fermion` marks an
    /// operator that changes fermion parity.
    ///
    /// *Panics* if `mat` is not square.
    pub fn new(site: usize, orbital: usize, fermion: bool, mat: nd::Array2<T>)
        -> Self
    {
        assert_eq!(mat.nrows(), mat.ncols(), "operator matrix must be square");
        let diagonal
            = mat.indexed_iter()
            .all(|((i, j), x)| i == j || x.modulus() == 0.0);
        Self { site, orbital, fermion, diagonal, mat }
    }

    pub fn site(&self) -> usize { self.site }

    pub fn orbital(&self) -> usize { self.orbital }

    pub fn is_fermion(&self) -> bool { self.fermion }

    pub fn is_diagonal(&self) -> bool { self.diagonal }

    pub fn mat(&self) -> &nd::Array2<T> { &self.mat }

    /// Local dimension.
    pub fn dim(&self) -> usize { self.mat.nrows() }

    /// Returns `true` if both operators act on the same orbital of the same
    /// site.
    pub fn same_mode(&self, other: &Self) -> bool {
        self.site == other.site && self.orbital == other.orbital
    }

    /// Returns `true` if every matrix element is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.mat.iter().all(|x| x.modulus() == 0.0)
    }

    /// Matrix product `self · rhs` on the same mode.
    pub fn matmul(&self, rhs: &Self) -> Self {
        debug_assert!(self.same_mode(rhs));
        Self::new(
            self.site,
            self.orbital,
            self.fermion ^ rhs.fermion,
            self.mat.dot(&rhs.mat),
        )
    }

    /// Hermitian conjugate.
    pub fn adjoint(&self) -> Self {
        Self {
            mat: self.mat.t().mapv(|x| x.conj()),
            ..self.clone()
        }
    }
}

/// A scaled product of single-site operators.
#[derive(Clone, Debug, PartialEq)]
pub struct OprProd<T> {
    coeff: T,
    factors: Vec<Opr<T>>,
}

impl<T> OprProd<T>
where T: Scalar
{
    /// The identity scaled by `coeff`.
    pub fn new(coeff: T) -> Self { Self { coeff, factors: Vec::new() } }

    pub fn coeff(&self) -> T { self.coeff }

    pub fn factors(&self) -> &[Opr<T>] { &self.factors }

    /// Returns `true` if every factor is diagonal.
    pub fn is_diagonal(&self) -> bool {
        self.factors.iter().all(|f| f.diagonal)
    }

    /// Returns `true` if the coefficient is exactly zero.
    pub fn is_zero(&self) -> bool { self.coeff.modulus() == 0.0 }

    /// Multiply the coefficient by a scalar.
    pub fn scale(mut self, c: T) -> Self {
        self.coeff *= c;
        self
    }

    /// Multiply on the right by a single-site operator.
    pub fn push(&mut self, f: Opr<T>) {
        let mut odd = false;
        for k in (0..self.factors.len()).rev() {
            if self.factors[k].same_mode(&f) {
                if odd { self.coeff = -self.coeff; }
                let merged = self.factors[k].matmul(&f);
                if merged.is_zero() { self.coeff = T::zero(); }
                self.factors[k] = merged;
                return;
            }
            if f.fermion && self.factors[k].fermion { odd = !odd; }
        }
        self.factors.push(f);
    }

    /// Hermitian conjugate.
    pub fn adjoint(&self) -> Self {
        let mut out = Self::new(self.coeff.conj());
        self.factors.iter().rev()
            .for_each(|f| { out.push(f.adjoint()); });
        out
    }
}

impl<T> From<Opr<T>> for OprProd<T>
where T: Scalar
{
    fn from(f: Opr<T>) -> Self { Self { coeff: T::one(), factors: vec![f] } }
}

impl<T> Mul<Opr<T>> for Opr<T>
where T: Scalar
{
    type Output = OprProd<T>;

    fn mul(self, rhs: Opr<T>) -> OprProd<T> {
        let mut prod = OprProd::from(self);
        prod.push(rhs);
        prod
    }
}

impl<T> Mul<OprProd<T>> for Opr<T>
where T: Scalar
{
    type Output = OprProd<T>;

    fn mul(self, rhs: OprProd<T>) -> OprProd<T> { OprProd::from(self) * rhs }
}

impl<T> Mul<Opr<T>> for OprProd<T>
where T: Scalar
{
    type Output = OprProd<T>;

    fn mul(mut self, rhs: Opr<T>) -> OprProd<T> {
        self.push(rhs);
        self
    }
}

impl<T> Mul<OprProd<T>> for OprProd<T>
where T: Scalar
{
    type Output = OprProd<T>;

    fn mul(mut self, rhs: OprProd<T>) -> OprProd<T> {
        self.coeff *= rhs.coeff;
        rhs.factors.into_iter().for_each(|f| { self.push(f); });
        self
    }
}

/// A sum of operator products.
#[derive(Clone, Debug, PartialEq)]
pub struct MOpr<T> {
    terms: Vec<OprProd<T>>,
}

impl<T> Default for MOpr<T> {
    fn default() -> Self { Self { terms: Vec::new() } }
}

impl<T> MOpr<T>
where T: Scalar
{
    /// The zero operator.
    pub fn new() -> Self { Self::default() }

    pub fn terms(&self) -> &[OprProd<T>] { &self.terms }

    /// Returns `true` if there are no terms.
    pub fn is_empty(&self) -> bool { self.terms.is_empty() }

    /// Returns `true` if every term is diagonal.
    pub fn is_diagonal(&self) -> bool {
        self.terms.iter().all(|t| t.is_diagonal())
    }

    /// Add a term, skipping it if its coefficient is zero.
    pub fn push(&mut self, term: OprProd<T>) {
        if !term.is_zero() { self.terms.push(term); }
    }

    /// Multiply every coefficient by a scalar.
    pub fn scale(mut self, c: T) -> Self {
        self.terms.iter_mut().for_each(|t| { t.coeff *= c; });
        self
    }

    /// Split into diagonal and off-diagonal parts.
    pub fn split_diagonal(self) -> (Self, Self) {
        let (diag, off): (Vec<_>, Vec<_>)
            = self.terms.into_iter().partition(|t| t.is_diagonal());
        (Self { terms: diag }, Self { terms: off })
    }

    /// Hermitian conjugate.
    pub fn adjoint(&self) -> Self {
        Self { terms: self.terms.iter().map(|t| t.adjoint()).collect() }
    }

    /// Largest site index acted on, if any.
    pub fn max_site(&self) -> Option<usize> {
        self.terms.iter()
            .flat_map(|t| t.factors.iter().map(|f| f.site))
            .max()
    }
}

impl<T> From<Opr<T>> for MOpr<T>
where T: Scalar
{
    fn from(f: Opr<T>) -> Self { OprProd::from(f).into() }
}

impl<T> From<OprProd<T>> for MOpr<T>
where T: Scalar
{
    fn from(p: OprProd<T>) -> Self {
        let mut out = Self::new();
        out.push(p);
        out
    }
}

impl<T, R> AddAssign<R> for MOpr<T>
where
    T: Scalar,
    R: Into<MOpr<T>>,
{
    fn add_assign(&mut self, rhs: R) {
        rhs.into().terms.into_iter().for_each(|t| { self.push(t); });
    }
}

impl<T, R> Add<R> for MOpr<T>
where
    T: Scalar,
    R: Into<MOpr<T>>,
{
    type Output = MOpr<T>;

    fn add(mut self, rhs: R) -> MOpr<T> {
        self += rhs;
        self
    }
}

impl<T, R> Add<R> for OprProd<T>
where
    T: Scalar,
    R: Into<MOpr<T>>,
{
    type Output = MOpr<T>;

    fn add(self, rhs: R) -> MOpr<T> { MOpr::from(self) + rhs }
}

impl<T, R> Add<R> for Opr<T>
where
    T: Scalar,
    R: Into<MOpr<T>>,
{
    type Output = MOpr<T>;

    fn add(self, rhs: R) -> MOpr<T> { MOpr::from(self) + rhs }
}

impl<T> Mul<MOpr<T>> for MOpr<T>
where T: Scalar
{
    type Output = MOpr<T>;

    fn mul(self, rhs: MOpr<T>) -> MOpr<T> {
        let mut out = MOpr::new();
        for l in self.terms.iter() {
            for r in rhs.terms.iter() {
                out.push(l.clone() * r.clone());
            }
        }
        out
    }
}

macro_rules! impl_scalar_lmul {
    ( $scalar:ty ) => {
        impl Mul<Opr<$scalar>> for $scalar {
            type Output = OprProd<$scalar>;

            fn mul(self, rhs: Opr<$scalar>) -> OprProd<$scalar> {
                OprProd::from(rhs).scale(self)
            }
        }

        impl Mul<OprProd<$scalar>> for $scalar {
            type Output = OprProd<$scalar>;

            fn mul(self, rhs: OprProd<$scalar>) -> OprProd<$scalar> {
                rhs.scale(self)
            }
        }

        impl Mul<MOpr<$scalar>> for $scalar {
            type Output = MOpr<$scalar>;

            fn mul(self, rhs: MOpr<$scalar>) -> MOpr<$scalar> {
                rhs.scale(self)
            }
        }
    }
}
impl_scalar_lmul!(f64);
impl_scalar_lmul!(C64);
