//! Action of a translation-invariant Hamiltonian on the Bloch states of a
//! momentum sector.
//!
//! For a representative `r_i`, each configuration `c` reached by the
//! off-diagonal part, `H_off |r_i⟩ = Σ_c α_c |c⟩`, is canonicalized through the
//! Weisse tables to `T_d |c⟩ = χ |r_j⟩` and contributes
//! ```text
//! H_ij += conj(α_c) χ e^{+ik·d} sqrt(ν_j / ν_i)
//! ```
//! Rows of fake representatives hold only the pinned diagonal. Without
//! translation symmetry every configuration is its own representative, and
//! the same rows reduce to `H_ij += conj(α_c)`.

use crate::{
    Scalar,
    config::PINNED_DIAGONAL,
    csr::{ CsrMatrix, LilMatrix },
    mbasis::{ self, MBasis, SiteProps, SiteSplit },
    opr::MOpr,
    pool::{ PoolResult, WorkerPool },
    sector::Sector,
    weisse::{ Symmetry, WeisseTables },
};

const ROW_CHUNK: usize = 16;

/// Position of a configuration's canonical representative in a sector.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Located {
    /// Index of the representative.
    pub index: usize,
    /// Parent translation taking the configuration to the representative.
    pub disp: usize,
    /// `true` if that translation picks up a fermionic sign.
    pub odd: bool,
}

/// How the states of a sector are labeled.
#[derive(Copy, Clone, Debug)]
pub enum Basis<'a> {
    /// Bloch states over translation orbits, canonicalized through Weisse
    /// tables.
    Momentum { sym: Symmetry<'a>, weisse: &'a WeisseTables },
    /// Plain product states of an undivided lattice.
    Full { split: &'a SiteSplit },
}

impl<'a> Basis<'a> {
    /// Site properties of the whole lattice.
    pub fn props(&self) -> &'a SiteProps {
        match *self {
            Self::Momentum { sym, .. } => &sym.zp.parent,
            Self::Full { split } => &split.props,
        }
    }
}

/// A Hamiltonian restricted to a momentum sector.
#[derive(Copy, Clone, Debug)]
pub struct SectorHamiltonian<'a, T> {
    pub basis: Basis<'a>,
    pub sector: &'a Sector,
    pub h_diag: &'a MOpr<T>,
    pub h_off: &'a MOpr<T>,
    /// Amplitudes with modulus at most this are dropped.
    pub eps: f64,
}

impl<'a, T> SectorHamiltonian<'a, T>
where T: Scalar
{
    /// Sector dimension, fakes included.
    pub fn dim(&self) -> usize { self.sector.dim_repr() }

    /// Find the representative of a configuration's orbit.
    pub fn locate(&self, c: &MBasis) -> Option<Located> {
        let (sym, weisse)
            = match self.basis {
                Basis::Momentum { sym, weisse } => (sym, weisse),
                Basis::Full { split } => {
                    let index = self.sector.find(split.key(c))?;
                    return Some(Located { index, disp: 0, odd: false });
                },
            };
        let canon = weisse.lookup(&sym, c)?;
        let orbits = sym.orbits;
        let key
            = (orbits.repr_label(canon.ra), orbits.translated_label(canon.rb, canon.j));
        let index = self.sector.find(key)?;
        let odd
            = if sym.zp.parent.has_fermions() {
                let mut img = c.clone();
                img.translate(&sym.zp.parent, sym.group.perm(canon.disp))
            } else {
                false
            };
        Some(Located { index, disp: canon.disp, odd })
    }

    // e^{+ik·d} for parent translation `disp`
    fn phase(&self, disp: usize) -> T {
        match self.basis {
            Basis::Momentum { sym, .. } => {
                T::from_phase(sym.group.phase_angle(disp, self.sector.momentum()))
            },
            Basis::Full { .. } => T::one(),
        }
    }

    /// Nonzero entries of row `i`, sorted by column with duplicates merged.
    pub fn row(&self, i: usize) -> Vec<(usize, T)> {
        let sector = self.sector;
        if sector.is_fake(i) {
            return vec![(i, T::from_re(PINNED_DIAGONAL))];
        }
        let props = self.basis.props();
        let r = sector.state(i);
        let mut entries: Vec<(usize, T)> = Vec::new();
        if !self.h_diag.is_empty() {
            entries.push((i, r.diagonal_operator(props, self.h_diag)));
        }
        let nu_i = sector.norm(i);
        for (c, alpha) in mbasis::opr_x_phi(self.h_off, r, props, self.eps) {
            let Some(loc) = self.locate(&c) else { continue; };
            if sector.is_fake(loc.index) { continue; }
            let chi = if loc.odd { -T::one() } else { T::one() };
            let phase = self.phase(loc.disp);
            let ratio = (sector.norm(loc.index) / nu_i).sqrt();
            entries.push((loc.index, alpha.conj() * chi * phase * T::from_re(ratio)));
        }
        entries.sort_by_key(|&(j, _)| j);
        let mut merged: Vec<(usize, T)> = Vec::with_capacity(entries.len());
        for (j, x) in entries.into_iter() {
            match merged.last_mut() {
                Some((last, acc)) if *last == j => { *acc += x; },
                _ => { merged.push((j, x)); },
            }
        }
        merged.retain(|&(j, x)| j == i || x.modulus() > self.eps);
        merged
    }

    /// Assemble the sector matrix, optionally keeping only the upper
    /// triangle.
    pub fn assemble(&self, upper: bool, pool: &WorkerPool)
        -> PoolResult<CsrMatrix<T>>
    {
        let rows: Vec<Vec<(usize, T)>>
            = pool.map(self.dim(), ROW_CHUNK, |i| {
                let mut row = self.row(i);
                if upper { row.retain(|&(j, _)| j >= i); }
                row
            })?;
        Ok(LilMatrix::from_rows(rows, upper).into_csr())
    }

    /// Compute `y = H x` without storing the matrix.
    pub fn multiply(&self, x: &[T], y: &mut [T], pool: &WorkerPool)
        -> PoolResult<()>
    {
        pool.fill(y, ROW_CHUNK, |i| {
            self.row(i).into_iter()
                .fold(T::zero(), |acc, (j, v)| acc + v * x[j])
        })
    }
}
