//! Momentum sectors: the canonical representatives of a fixed momentum and
//! fixed values of a set of conserved diagonal observables.
//!
//! Representatives are sorted by the labels of their two halves,
//! `(label(r_a), label(T_j r_b))`, which is the order used by the sector's
//! [`BasisIndex`]. Each carries the normalization factor
//! ```text
//! ν = |Σ_{s ∈ S} e^{-ik·s} χ(s)|² / |S|
//! ```
//! where `S` is its parent stabilizer and `χ(s) = ±1` the fermionic sign picked
//! up under `s`. Representatives with `ν` below the fake tolerance have no
//! component in the sector and are kept only as placeholders.
//!
//! Without translation symmetry, [`Sector::full`] lists every configuration
//! satisfying the conserved quantum numbers, keyed by a [`SiteSplit`] and with
//! `ν = 1`.

use std::time::Instant;
use num_complex::Complex64 as C64;
use thiserror::Error;
use crate::{
    Scalar,
    lin::BasisIndex,
    mbasis::{ self, MBasis, MBasisError, MBasisResult, SiteSplit },
    opr::MOpr,
    pool::{ PoolError, PoolResult, WorkerPool },
    weisse::{ Branch, Symmetry, WeisseTables },
};

#[derive(Debug, Error)]
pub enum SectorError {
    #[error("labeling error: {0}")]
    Label(#[from] MBasisError),

    #[error("worker pool error: {0}")]
    Pool(#[from] PoolError),
}
pub type SectorResult<T> = Result<T, SectorError>;

/// A canonical representative before sorting.
struct Candidate {
    key: (u64, u64),
    config: MBasis,
    group: usize,
}

/// The representatives of a single momentum sector.
#[derive(Clone, Debug)]
pub struct Sector {
    momentum: Vec<i64>,
    basis: Vec<MBasis>,
    groups: Vec<usize>,
    norm: Vec<f64>,
    index: BasisIndex,
    fake_tol: f64,
}

impl Sector {
    /// Enumerate every canonical representative satisfying the conserved
    /// quantum numbers `Q_m = q_m` (within `q_tol`) and compute their
    /// normalization factors at `momentum`.
    pub fn enumerate<T>(
        sym: &Symmetry,
        weisse: &WeisseTables,
        momentum: &[i64],
        conserved: &[(MOpr<T>, f64)],
        q_tol: f64,
        fake_tol: f64,
        pool: &WorkerPool,
    ) -> PoolResult<Self>
    where T: Scalar
    {
        let t0 = Instant::now();
        let orbits = sym.orbits;
        let nreps = orbits.num_reps();
        let nj = sym.sub_group.len();
        let involved = weisse.involved();
        let per_rep: Vec<Vec<Candidate>>
            = pool.map(nreps, 1, |ra| {
                let ga = orbits.belong2group[ra];
                let rb_start = if involved { ra } else { 0 };
                let mut found: Vec<Candidate> = Vec::new();
                for rb in rb_start..nreps {
                    let gb = orbits.belong2group[rb];
                    let branch = Branch::of(ra, rb);
                    for j in 0..nj {
                        let Some(group) = weisse.w(branch, ga, gb, j) else {
                            continue;
                        };
                        let config = sym.reconstruct(ra, rb, j);
                        if !mbasis::satisfies(&config, &sym.zp.parent, conserved, q_tol) {
                            continue;
                        }
                        let key = (orbits.repr_label(ra), orbits.translated_label(rb, j));
                        found.push(Candidate { key, config, group });
                    }
                }
                found
            })?;
        let mut cands: Vec<Candidate> = per_rep.into_iter().flatten().collect();
        cands.sort_by_key(|cand| cand.key);

        let dim_sub = orbits.basis_full.len();
        let mut keys: Vec<(u64, u64)> = Vec::with_capacity(cands.len());
        let mut basis: Vec<MBasis> = Vec::with_capacity(cands.len());
        let mut groups: Vec<usize> = Vec::with_capacity(cands.len());
        for cand in cands.into_iter() {
            keys.push(cand.key);
            basis.push(cand.config);
            groups.push(cand.group);
        }
        let index = BasisIndex::new(keys, dim_sub, dim_sub);
        let norm: Vec<f64>
            = pool.map(basis.len(), 64, |i| {
                normalization(sym, weisse, &basis[i], groups[i], momentum)
            })?;
        let sector = Self {
            momentum: momentum.to_vec(),
            basis,
            groups,
            norm,
            index,
            fake_tol,
        };
        log::info!(
            "enumerated sector k = {}: {} representatives ({} fake) in {:.3?}",
            sym.group.fmt_momentum(momentum),
            sector.dim_repr(),
            sector.dim_repr() - sector.dim_physical(),
            t0.elapsed(),
        );
        Ok(sector)
    }

    /// Enumerate every configuration satisfying the conserved quantum numbers
    /// `Q_m = q_m` (within `q_tol`), in label order. `momentum` is only
    /// recorded and should be all zeros.
    pub fn full<T>(
        split: &SiteSplit,
        momentum: &[i64],
        conserved: &[(MOpr<T>, f64)],
        q_tol: f64,
        fake_tol: f64,
        pool: &WorkerPool,
    ) -> SectorResult<Self>
    where T: Scalar
    {
        let t0 = Instant::now();
        let props = &split.props;
        let (dim_hi, dim_lo) = split.dims();
        let (dim_hi, dim_lo) = (dim_hi as usize, dim_lo as usize);
        let per_block: Vec<Vec<MBasis>>
            = pool.map(dim_hi, 1, |hi| {
                mbasis::enumerate_basis(props, split.block_labels(hi as u64), conserved, q_tol)
            })?
            .into_iter()
            .collect::<MBasisResult<_>>()?;
        let basis: Vec<MBasis> = per_block.into_iter().flatten().collect();
        let keys: Vec<(u64, u64)> = basis.iter().map(|c| split.key(c)).collect();
        let n = basis.len();
        let sector = Self {
            momentum: momentum.to_vec(),
            basis,
            groups: vec![0; n],
            norm: vec![1.0; n],
            index: BasisIndex::new(keys, dim_hi, dim_lo),
            fake_tol,
        };
        log::info!(
            "enumerated full basis: {} configurations in {:.3?}",
            sector.dim_repr(),
            t0.elapsed(),
        );
        Ok(sector)
    }

    pub fn momentum(&self) -> &[i64] { &self.momentum }

    /// Number of representatives, fakes included.
    pub fn dim_repr(&self) -> usize { self.basis.len() }

    /// Number of representatives with nonzero projection onto the sector.
    pub fn dim_physical(&self) -> usize {
        self.norm.iter().filter(|&&nu| nu >= self.fake_tol).count()
    }

    pub fn basis(&self) -> &[MBasis] { &self.basis }

    /// Configuration of representative `i`.
    pub fn state(&self, i: usize) -> &MBasis { &self.basis[i] }

    /// Index of the parent stabilizer of representative `i`.
    pub fn group(&self, i: usize) -> usize { self.groups[i] }

    /// Normalization factor of representative `i`.
    pub fn norm(&self, i: usize) -> f64 { self.norm[i] }

    pub fn norms(&self) -> &[f64] { &self.norm }

    /// Returns `true` if representative `i` has no component in the sector.
    pub fn is_fake(&self, i: usize) -> bool { self.norm[i] < self.fake_tol }

    /// Position of a representative by the labels of its halves.
    pub fn find(&self, key: (u64, u64)) -> Option<usize> { self.index.find(key) }

    pub fn index(&self) -> &BasisIndex { &self.index }
}

/// `ν` for a canonical configuration with parent stabilizer `group`.
pub fn normalization(
    sym: &Symmetry,
    weisse: &WeisseTables,
    config: &MBasis,
    group: usize,
    momentum: &[i64],
) -> f64
{
    let stab = &weisse.groups_parent()[group];
    let fermions = sym.zp.parent.has_fermions();
    let amp: C64
        = stab.elems().iter()
        .map(|&s| {
            let odd
                = if fermions {
                    let mut img = config.clone();
                    img.translate(&sym.zp.parent, sym.group.perm(s))
                } else {
                    false
                };
            let chi = if odd { -1.0 } else { 1.0 };
            C64::cis(-sym.group.phase_angle(s, momentum)) * chi
        })
        .sum();
    amp.norm_sqr() / stab.order() as f64
}
