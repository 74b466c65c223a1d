#![allow(dead_code, clippy::needless_return)]

//! Exact diagonalization of quantum lattice Hamiltonians in translation-
//! symmetric momentum sectors.
//!
//! The parent lattice is split into two sublattices (A and B) whose
//! configurations are enumerated and classified into translation orbits
//! independently. A set of precomputed *Weisse tables* then maps any parent
//! configuration, given only the orbit data of its two halves, to the canonical
//! representative of its parent orbit together with the translation that takes
//! it there. Representatives of a momentum sector are indexed through *Lin
//! tables* and the Hamiltonian is either assembled into a CSR matrix or applied
//! matrix-free, and handed to a Lanczos eigensolver.
//!
//! ```ignore
//! use num_complex::Complex64 as C64;
//! use lattice_ed::{
//!     config::EdConfig,
//!     lattice::{ Boundary, Lattice },
//!     local,
//!     mbasis::{ Orbital, SiteProps },
//!     model::Engine,
//! };
//!
//! let latt = Lattice::chain(8, Boundary::Pbc)?;
//! let props = SiteProps::new(8).with_orbital(Orbital::spin_half());
//! let mut engine: Engine<C64> = Engine::new(props, EdConfig::default());
//! engine.bind_lattice(latt)?;
//! for i in 0..8 {
//!     let j = (i + 1) % 8;
//!     engine.add_hamiltonian(local::sz(i, 0) * local::sz(j, 0))?;
//!     engine.add_hamiltonian(
//!         C64::from(0.5) * (local::splus(i, 0) * local::sminus(j, 0))
//!         + C64::from(0.5) * (local::sminus(i, 0) * local::splus(j, 0))
//!     )?;
//! }
//! engine.build_weisse()?;
//! engine.enumerate_sector(&[0], &[(local::sz_total(8, 0), 0.0)])?;
//! engine.assemble(false)?;
//! let spec = engine.ground_state(4, 15, 0)?;
//! println!("{:?}", spec.e0());
//! ```

use std::{ fmt, ops::Neg };
use ndarray as nd;
use num_complex::Complex64 as C64;
use num_traits::NumAssign;

pub mod config;
pub mod lattice;
pub mod mbasis;
pub mod opr;
pub mod local;
pub mod orbit;
pub mod weisse;
pub mod lin;
pub mod sector;
pub mod csr;
pub mod hamiltonian;
pub mod lanczos;
pub mod pool;
pub mod model;

/// Capabilities required of an amplitude type.
///
/// Implemented for `f64` and [`C64`]. Momentum sectors with non-real phases
/// require a complex amplitude.
pub trait Scalar:
    nd::LinalgScalar
    + NumAssign
    + Send
    + Sync
    + fmt::Debug
    + PartialEq
    + Neg<Output = Self>
{
    /// `true` if the type carries an imaginary part.
    const IS_COMPLEX: bool;

    /// Complex conjugate.
    fn conj(self) -> Self;

    /// Absolute value.
    fn modulus(self) -> f64;

    /// Real part.
    fn re(self) -> f64;

    /// Embed a real number.
    fn from_re(x: f64) -> Self;

    /// Convert from a complex number, discarding the imaginary part for real
    /// types.
    fn from_c64(z: C64) -> Self;

    /// Convert to a complex number.
    fn to_c64(self) -> C64;

    /// `exp(i angle)`.
    fn from_phase(angle: f64) -> Self { Self::from_c64(C64::cis(angle)) }
}

impl Scalar for f64 {
    const IS_COMPLEX: bool = false;

    fn conj(self) -> Self { self }

    fn modulus(self) -> f64 { self.abs() }

    fn re(self) -> f64 { self }

    fn from_re(x: f64) -> Self { x }

    fn from_c64(z: C64) -> Self { z.re }

    fn to_c64(self) -> C64 { C64::new(self, 0.0) }
}

impl Scalar for C64 {
    const IS_COMPLEX: bool = true;

    fn conj(self) -> Self { C64::new(self.re, -self.im) }

    fn modulus(self) -> f64 { self.norm() }

    fn re(self) -> f64 { self.re }

    fn from_re(x: f64) -> Self { C64::new(x, 0.0) }

    fn from_c64(z: C64) -> Self { z }

    fn to_c64(self) -> C64 { self }
}

/// Hermitian inner product `Σ conj(a_i) b_i`.
pub fn dotc<T>(a: &[T], b: &[T]) -> T
where T: Scalar
{
    a.iter().zip(b)
        .fold(T::zero(), |acc, (ai, bi)| acc + ai.conj() * *bi)
}

/// Euclidean norm of a vector.
pub fn norm<T>(a: &[T]) -> f64
where T: Scalar
{
    a.iter().map(|ai| ai.modulus().powi(2)).sum::<f64>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotc_conjugates_left() {
        let a = [C64::new(1.0, 2.0), C64::new(0.0, -1.0)];
        let b = [C64::new(3.0, 0.0), C64::new(1.0, 1.0)];
        let d = dotc(&a, &b);
        // (1 - 2i) * 3 + (i) * (1 + i) = 3 - 6i + i - 1
        assert!((d - C64::new(2.0, -5.0)).norm() < 1e-14);
        assert!((norm(&a) - 6.0_f64.sqrt()).abs() < 1e-14);
    }

    #[test]
    fn real_scalar_drops_imaginary() {
        assert_eq!(<f64 as Scalar>::from_c64(C64::new(0.5, 3.0)), 0.5);
        assert!((<f64 as Scalar>::from_phase(std::f64::consts::PI) + 1.0).abs() < 1e-15);
    }
}
