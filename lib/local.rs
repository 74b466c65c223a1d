//! Standard local operators.
//!
//! Matrices are indexed `[output, input]` in the local-state conventions of
//! the [`Orbital`][crate::mbasis::Orbital] presets: spin states run from
//! `m = +S` (state 0) down to `m = -S`, and fermionic states are occupation
//! bit strings (for the electron orbital, bit 0 is ↑ and bit 1 is ↓ with
//! `|↑↓⟩ = c†_↑ c†_↓ |0⟩`).

use ndarray as nd;
use crate::{
    Scalar,
    opr::{ MOpr, Opr },
};

/// Spin projection of an electron.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Spin {
    Up,
    Down,
}

fn from_entries<T>(n: usize, entries: &[(usize, usize, f64)]) -> nd::Array2<T>
where T: Scalar
{
    let mut mat = nd::Array2::zeros((n, n));
    entries.iter()
        .for_each(|&(i, j, x)| { mat[[i, j]] = T::from_re(x); });
    mat
}

/// Spin raising operator for spin `two_s / 2`.
pub fn make_spin_plus<T>(two_s: usize) -> nd::Array2<T>
where T: Scalar
{
    let s = two_s as f64 / 2.0;
    let entries: Vec<(usize, usize, f64)>
        = (1..=two_s)
        .map(|j| {
            let m = s - j as f64;
            (j - 1, j, (s * (s + 1.0) - m * (m + 1.0)).sqrt())
        })
        .collect();
    from_entries(two_s + 1, &entries)
}

/// Spin lowering operator for spin `two_s / 2`.
pub fn make_spin_minus<T>(two_s: usize) -> nd::Array2<T>
where T: Scalar
{
    make_spin_plus::<T>(two_s).t().to_owned()
}

/// Spin projection operator for spin `two_s / 2`.
pub fn make_spin_z<T>(two_s: usize) -> nd::Array2<T>
where T: Scalar
{
    let s = two_s as f64 / 2.0;
    let entries: Vec<(usize, usize, f64)>
        = (0..=two_s).map(|j| (j, j, s - j as f64)).collect();
    from_entries(two_s + 1, &entries)
}

/// Spin-1/2 `S^+`.
pub fn make_splus<T>() -> nd::Array2<T>
where T: Scalar
{
    make_spin_plus(1)
}

/// Spin-1/2 `S^-`.
pub fn make_sminus<T>() -> nd::Array2<T>
where T: Scalar
{
    make_spin_minus(1)
}

/// Spin-1/2 `S^z`.
pub fn make_sz<T>() -> nd::Array2<T>
where T: Scalar
{
    make_spin_z(1)
}

/// Spinless fermion creation operator.
pub fn make_cdag<T>() -> nd::Array2<T>
where T: Scalar
{
    from_entries(2, &[(1, 0, 1.0)])
}

/// Spinless fermion annihilation operator.
pub fn make_c<T>() -> nd::Array2<T>
where T: Scalar
{
    from_entries(2, &[(0, 1, 1.0)])
}

/// Spinless fermion number operator.
pub fn make_n<T>() -> nd::Array2<T>
where T: Scalar
{
    from_entries(2, &[(1, 1, 1.0)])
}

/// Electron creation operator.
pub fn make_cdag_spin<T>(spin: Spin) -> nd::Array2<T>
where T: Scalar
{
    match spin {
        Spin::Up => from_entries(4, &[(1, 0, 1.0), (3, 2, 1.0)]),
        Spin::Down => from_entries(4, &[(2, 0, 1.0), (3, 1, -1.0)]),
    }
}

/// Electron annihilation operator.
pub fn make_c_spin<T>(spin: Spin) -> nd::Array2<T>
where T: Scalar
{
    make_cdag_spin::<T>(spin).t().to_owned()
}

/// Electron number operator for one spin species.
pub fn make_n_spin<T>(spin: Spin) -> nd::Array2<T>
where T: Scalar
{
    match spin {
        Spin::Up => from_entries(4, &[(1, 1, 1.0), (3, 3, 1.0)]),
        Spin::Down => from_entries(4, &[(2, 2, 1.0), (3, 3, 1.0)]),
    }
}

/// `S^+` on a spin-1/2 orbital.
pub fn splus<T>(site: usize, orb: usize) -> Opr<T>
where T: Scalar
{
    Opr::new(site, orb, false, make_splus())
}

/// `S^-` on a spin-1/2 orbital.
pub fn sminus<T>(site: usize, orb: usize) -> Opr<T>
where T: Scalar
{
    Opr::new(site, orb, false, make_sminus())
}

/// `S^z` on a spin-1/2 orbital.
pub fn sz<T>(site: usize, orb: usize) -> Opr<T>
where T: Scalar
{
    Opr::new(site, orb, false, make_sz())
}

/// `S^+` on a spin-`two_s / 2` orbital.
pub fn spin_plus<T>(site: usize, orb: usize, two_s: usize) -> Opr<T>
where T: Scalar
{
    Opr::new(site, orb, false, make_spin_plus(two_s))
}

/// `S^-` on a spin-`two_s / 2` orbital.
pub fn spin_minus<T>(site: usize, orb: usize, two_s: usize) -> Opr<T>
where T: Scalar
{
    Opr::new(site, orb, false, make_spin_minus(two_s))
}

/// `S^z` on a spin-`two_s / 2` orbital.
pub fn spin_z<T>(site: usize, orb: usize, two_s: usize) -> Opr<T>
where T: Scalar
{
    Opr::new(site, orb, false, make_spin_z(two_s))
}

/// `c†` on a spinless fermion orbital.
pub fn cdag<T>(site: usize, orb: usize) -> Opr<T>
where T: Scalar
{
    Opr::new(site, orb, true, make_cdag())
}

/// `c` on a spinless fermion orbital.
pub fn c<T>(site: usize, orb: usize) -> Opr<T>
where T: Scalar
{
    Opr::new(site, orb, true, make_c())
}

/// `n` on a spinless fermion orbital.
pub fn n<T>(site: usize, orb: usize) -> Opr<T>
where T: Scalar
{
    Opr::new(site, orb, false, make_n())
}

/// `c†_σ` on an electron orbital.
pub fn cdag_spin<T>(site: usize, orb: usize, spin: Spin) -> Opr<T>
where T: Scalar
{
    Opr::new(site, orb, true, make_cdag_spin(spin))
}

/// `c_σ` on an electron orbital.
pub fn c_spin<T>(site: usize, orb: usize, spin: Spin) -> Opr<T>
where T: Scalar
{
    Opr::new(site, orb, true, make_c_spin(spin))
}

/// `n_σ` on an electron orbital.
pub fn n_spin<T>(site: usize, orb: usize, spin: Spin) -> Opr<T>
where T: Scalar
{
    Opr::new(site, orb, false, make_n_spin(spin))
}

/// Total `S^z` of a spin-1/2 orbital over the first `num_sites` sites.
pub fn sz_total<T>(num_sites: usize, orb: usize) -> MOpr<T>
where T: Scalar
{
    (0..num_sites)
        .fold(MOpr::new(), |acc, site| acc + sz::<T>(site, orb))
}

/// Total particle number of a spinless fermion orbital over the first
/// `num_sites` sites.
pub fn n_total<T>(num_sites: usize, orb: usize) -> MOpr<T>
where T: Scalar
{
    (0..num_sites)
        .fold(MOpr::new(), |acc, site| acc + n::<T>(site, orb))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spin_algebra() {
        for two_s in 1..=3 {
            let p = make_spin_plus::<f64>(two_s);
            let m = make_spin_minus::<f64>(two_s);
            let z = make_spin_z::<f64>(two_s);
            // [S+, S-] = 2 S^z
            let comm = p.dot(&m) - m.dot(&p);
            let diff = &comm - &(&z * 2.0);
            assert!(diff.iter().all(|x| x.abs() < 1e-12));
        }
        assert_eq!(make_splus::<f64>(), nd::array![[0.0, 1.0], [0.0, 0.0]]);
        assert_eq!(make_sz::<f64>(), nd::array![[0.5, 0.0], [0.0, -0.5]]);
    }

    #[test]
    fn electron_anticommutation() {
        let up = make_cdag_spin::<f64>(Spin::Up);
        let dn = make_cdag_spin::<f64>(Spin::Down);
        // {c†_↑, c†_↓} = 0 within one site
        let anti = up.dot(&dn) + dn.dot(&up);
        assert!(anti.iter().all(|x| x.abs() < 1e-15));
        let cu = make_c_spin::<f64>(Spin::Up);
        let n = cu.t().dot(&cu);
        assert_eq!(n, make_n_spin::<f64>(Spin::Up));
    }
}
