//! Many-body product states, packed into bit strings.
//!
//! Every site carries the same ordered list of [`Orbital`]s. The local state of
//! each orbital occupies a fixed-width bit field; fields are little-endian
//! within a site and site blocks are concatenated in site order. Comparing two
//! configurations as unsigned integers therefore coincides with comparing
//! their *labels*
//! ```text
//! label(c) = Σ_site s(site) D^site,    s(site) = Σ_o v(site, o) ∏_{o' < o} d_o'
//! ```
//! where `d_o` is the local dimension of orbital `o` and `D = ∏_o d_o`.
//!
//! Fermionic modes are ordered site-major, orbital-minor. The fermion number of
//! local state `v` of a fermionic orbital is `popcount(v)`.

use std::{ cmp::Ordering, ops::Range };
use bitvec::prelude::*;
use thiserror::Error;
use crate::{
    Scalar,
    lattice::SubLattice,
    opr::MOpr,
};

#[derive(Debug, Error)]
pub enum MBasisError {
    /// Returned when configuration labels don't fit in 64 bits.
    #[error("error in labeling: {num_sites} sites of local dimension {local_dim} exceed 64-bit labels")]
    LabelOverflow { num_sites: usize, local_dim: usize },
}
use MBasisError::*;
pub type MBasisResult<T> = Result<T, MBasisError>;

/// A single orbital (local degree of freedom) present on every site.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Orbital {
    name: String,
    dim_local: usize,
    fermion: bool,
    nbits: usize,
}

impl Orbital {
    /// Create a new orbital with local dimension `dim_local`.
    ///
    /// *Panics* if `dim_local` is zero.
    pub fn new(name: &str, dim_local: usize, fermion: bool) -> Self {
        assert!(dim_local > 0, "orbital must have at least one local state");
        let nbits
            = if dim_local <= 2 {
                1
            } else {
                (usize::BITS - (dim_local - 1).leading_zeros()) as usize
            };
        Self { name: name.to_string(), dim_local, fermion, nbits }
    }

    /// Spin-1/2: states `0 = ↑`, `1 = ↓`.
    pub fn spin_half() -> Self { Self::new("spin-1/2", 2, false) }

    /// Spin-1: states `0 = +1`, `1 = 0`, `2 = -1`.
    pub fn spin_one() -> Self { Self::new("spin-1", 3, false) }

    /// Spinless fermion: states `0 = empty`, `1 = occupied`.
    pub fn spinless_fermion() -> Self { Self::new("spinless-fermion", 2, true) }

    /// Spin-1/2 electron: states `0 = empty`, `1 = ↑`, `2 = ↓`, `3 = ↑↓`.
    pub fn electron() -> Self { Self::new("electron", 4, true) }

    /// t-J electron without double occupancy: states `0 = empty`, `1 = ↑`,
    /// `2 = ↓`.
    pub fn tj() -> Self { Self::new("tJ", 3, true) }

    pub fn name(&self) -> &str { &self.name }

    pub fn dim_local(&self) -> usize { self.dim_local }

    pub fn is_fermion(&self) -> bool { self.fermion }

    pub fn nbits(&self) -> usize { self.nbits }

    /// Fermion parity of a local state.
    pub fn parity(&self, v: usize) -> bool {
        self.fermion && v.count_ones() % 2 == 1
    }
}

/// The orbitals carried by every site of a lattice.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SiteProps {
    num_sites: usize,
    orbitals: Vec<Orbital>,
    offsets: Vec<usize>,
    bits_per_site: usize,
}

impl SiteProps {
    /// Create a new set of site properties with no orbitals.
    pub fn new(num_sites: usize) -> Self {
        Self {
            num_sites,
            orbitals: Vec::new(),
            offsets: Vec::new(),
            bits_per_site: 0,
        }
    }

    /// Add an orbital to every site.
    pub fn add_orbital(&mut self, orbital: Orbital) {
        self.offsets.push(self.bits_per_site);
        self.bits_per_site += orbital.nbits;
        self.orbitals.push(orbital);
    }

    /// Builder form of [`Self::add_orbital`].
    pub fn with_orbital(mut self, orbital: Orbital) -> Self {
        self.add_orbital(orbital);
        self
    }

    /// The same orbitals on a different number of sites.
    pub fn restrict(&self, num_sites: usize) -> Self {
        Self { num_sites, ..self.clone() }
    }

    pub fn num_sites(&self) -> usize { self.num_sites }

    pub fn num_orbitals(&self) -> usize { self.orbitals.len() }

    pub fn orbital(&self, orb: usize) -> &Orbital { &self.orbitals[orb] }

    pub fn orbitals(&self) -> &[Orbital] { &self.orbitals }

    pub fn bits_per_site(&self) -> usize { self.bits_per_site }

    pub fn total_bits(&self) -> usize { self.bits_per_site * self.num_sites }

    /// Dimension of the local Hilbert space of one site.
    pub fn local_dim(&self) -> usize {
        self.orbitals.iter().map(|o| o.dim_local).product()
    }

    /// Returns `true` if any orbital is fermionic.
    pub fn has_fermions(&self) -> bool {
        self.orbitals.iter().any(|o| o.fermion)
    }

    /// Number of distinct configurations, if it fits in a `u64`.
    pub fn num_labels(&self) -> Option<u64> {
        let d = self.local_dim() as u64;
        (0..self.num_sites).try_fold(1_u64, |acc, _| acc.checked_mul(d))
    }

    /// Like [`Self::num_labels`], but an error if the labels overflow.
    pub fn check_labels(&self) -> MBasisResult<u64> {
        self.num_labels()
            .ok_or(LabelOverflow { num_sites: self.num_sites, local_dim: self.local_dim() })
    }

    fn field(&self, site: usize, orb: usize) -> std::ops::Range<usize> {
        let start = site * self.bits_per_site + self.offsets[orb];
        start..start + self.orbitals[orb].nbits
    }

    fn site_block(&self, site: usize) -> std::ops::Range<usize> {
        site * self.bits_per_site..(site + 1) * self.bits_per_site
    }
}

/// A many-body product state.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MBasis {
    bits: BitVec<u64, Lsb0>,
}

impl PartialOrd for MBasis {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MBasis {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bits.len().cmp(&other.bits.len())
            .then_with(|| {
                self.bits.iter().by_vals().rev()
                    .cmp(other.bits.iter().by_vals().rev())
            })
    }
}

/// A sparse superposition of product states.
pub type Wavefunction<T> = Vec<(MBasis, T)>;

impl MBasis {
    /// The configuration with every orbital in local state 0.
    pub fn new(props: &SiteProps) -> Self {
        Self { bits: BitVec::repeat(false, props.total_bits()) }
    }

    /// Create a configuration from local states listed site-major,
    /// orbital-minor.
    ///
    /// *Panics* if the number of states is wrong or a state is out of range.
    pub fn from_states(props: &SiteProps, states: &[usize]) -> Self {
        let norb = props.num_orbitals();
        assert_eq!(states.len(), props.num_sites() * norb);
        let mut c = Self::new(props);
        for (k, &v) in states.iter().enumerate() {
            assert!(v < props.orbital(k % norb).dim_local);
            c.set(props, k / norb, k % norb, v);
        }
        c
    }

    /// Inverse of [`Self::label`].
    pub fn from_label(props: &SiteProps, label: u64) -> Self {
        let d = props.local_dim() as u64;
        let mut rem = label;
        let mut c = Self::new(props);
        for site in 0..props.num_sites() {
            c.set_site_state(props, site, (rem % d) as usize);
            rem /= d;
        }
        c
    }

    /// Local state of orbital `orb` on `site`.
    pub fn get(&self, props: &SiteProps, site: usize, orb: usize) -> usize {
        self.bits[props.field(site, orb)].load_le::<usize>()
    }

    /// Set the local state of orbital `orb` on `site`.
    pub fn set(&mut self, props: &SiteProps, site: usize, orb: usize, v: usize) {
        self.bits[props.field(site, orb)].store_le(v);
    }

    /// Combined local state of all orbitals on `site`.
    pub fn site_state(&self, props: &SiteProps, site: usize) -> usize {
        props.orbitals.iter().enumerate().rev()
            .fold(0, |acc, (o, orb)| {
                acc * orb.dim_local + self.get(props, site, o)
            })
    }

    /// Set the combined local state of all orbitals on `site`.
    pub fn set_site_state(&mut self, props: &SiteProps, site: usize, s: usize) {
        let mut rem = s;
        for o in 0..props.num_orbitals() {
            let d = props.orbitals[o].dim_local;
            self.set(props, site, o, rem % d);
            rem /= d;
        }
    }

    /// Integer label of the configuration; see the module-level docs.
    pub fn label(&self, props: &SiteProps) -> MBasisResult<u64> {
        props.check_labels()?;
        let d = props.local_dim() as u64;
        let label: u64
            = (0..props.num_sites()).rev()
            .fold(0, |acc, site| acc * d + self.site_state(props, site) as u64);
        Ok(label)
    }

    /// Parity of the number of fermions in all modes preceding
    /// `(site, orb)`.
    pub fn jw_parity(&self, props: &SiteProps, site: usize, orb: usize) -> bool {
        if !props.has_fermions() { return false; }
        let norb = props.num_orbitals();
        (0..site * norb + orb)
            .filter(|m| props.orbitals[m % norb].fermion)
            .fold(false, |acc, m| {
                let o = m % norb;
                acc ^ props.orbitals[o].parity(self.get(props, m / norb, o))
            })
    }

    /// Permute sites in place, moving the contents of site `i` to `perm[i]`.
    ///
    /// Returns `true` if reordering the fermionic modes into canonical order
    /// takes an odd number of exchanges.
    pub fn translate(&mut self, props: &SiteProps, perm: &[usize]) -> bool {
        let bps = props.bits_per_site;
        let mut new: BitVec<u64, Lsb0> = BitVec::repeat(false, self.bits.len());
        for (site, &target) in perm.iter().enumerate() {
            new[target * bps..(target + 1) * bps]
                .copy_from_bitslice(&self.bits[props.site_block(site)]);
        }
        let odd
            = if props.has_fermions() {
                let norb = props.num_orbitals();
                let moved: Vec<usize>
                    = (0..props.num_sites())
                    .flat_map(|site| (0..norb).map(move |o| (site, o)))
                    .filter(|&(site, o)| {
                        props.orbitals[o].parity(self.get(props, site, o))
                    })
                    .map(|(site, o)| perm[site] * norb + o)
                    .collect();
                inversion_parity(&moved)
            } else {
                false
            };
        self.bits = new;
        odd
    }

    /// `⟨c|A|c⟩` for a diagonal operator `A`.
    pub fn diagonal_operator<T>(&self, props: &SiteProps, op: &MOpr<T>) -> T
    where T: Scalar
    {
        op.terms().iter()
            .map(|term| {
                term.factors().iter()
                    .fold(term.coeff(), |acc, f| {
                        let v = self.get(props, f.site(), f.orbital());
                        acc * f.mat()[[v, v]]
                    })
            })
            .fold(T::zero(), |acc, x| acc + x)
    }

    /// Human-readable list of local states, site by site.
    pub fn fmt_states(&self, props: &SiteProps) -> String {
        (0..props.num_sites())
            .map(|site| self.site_state(props, site).to_string())
            .collect::<Vec<String>>()
            .join(",")
    }
}

fn inversion_parity(seq: &[usize]) -> bool {
    let mut odd = false;
    for (i, a) in seq.iter().enumerate() {
        for b in seq[i + 1..].iter() {
            if a > b { odd = !odd; }
        }
    }
    odd
}

/// Apply a sum of operator products to a configuration.
///
/// Factors are applied right to left. Amplitudes with modulus at most `eps`
/// are dropped and equal output configurations are merged; the output is
/// sorted.
pub fn opr_x_phi<T>(op: &MOpr<T>, c: &MBasis, props: &SiteProps, eps: f64)
    -> Wavefunction<T>
where T: Scalar
{
    let mut out: Wavefunction<T> = Vec::new();
    for term in op.terms().iter() {
        let mut states: Wavefunction<T> = vec![(c.clone(), term.coeff())];
        for f in term.factors().iter().rev() {
            let (site, orb) = (f.site(), f.orbital());
            let mat = f.mat();
            let mut next: Wavefunction<T> = Vec::with_capacity(states.len());
            for (s, amp) in states.into_iter() {
                let v = s.get(props, site, orb);
                let amp
                    = if f.is_fermion() && s.jw_parity(props, site, orb) {
                        -amp
                    } else {
                        amp
                    };
                for r in 0..mat.nrows() {
                    let m = mat[[r, v]];
                    if m.modulus() <= eps { continue; }
                    let mut s2 = s.clone();
                    s2.set(props, site, orb, r);
                    next.push((s2, amp * m));
                }
            }
            states = next;
            if states.is_empty() { break; }
        }
        out.append(&mut states);
    }
    out.sort_by(|l, r| l.0.cmp(&r.0));
    let mut merged: Wavefunction<T> = Vec::with_capacity(out.len());
    for (s, amp) in out.into_iter() {
        match merged.last_mut() {
            Some((last, acc)) if *last == s => { *acc += amp; },
            _ => { merged.push((s, amp)); },
        }
    }
    merged.retain(|(_, amp)| amp.modulus() > eps);
    merged
}

/// Enumerate the configurations with labels in `labels`, in label order,
/// keeping only those on which every diagonal observable `Q_m` evaluates to
/// `q_m` within `tol`. Labels past the last configuration are ignored.
pub fn enumerate_basis<T>(
    props: &SiteProps,
    labels: Range<u64>,
    conserved: &[(MOpr<T>, f64)],
    tol: f64,
) -> MBasisResult<Vec<MBasis>>
where T: Scalar
{
    let n = props.check_labels()?;
    let basis: Vec<MBasis>
        = (labels.start.min(n)..labels.end.min(n))
        .map(|label| MBasis::from_label(props, label))
        .filter(|c| satisfies(c, props, conserved, tol))
        .collect();
    Ok(basis)
}

/// Returns `true` if `c` has eigenvalue `q_m` under each diagonal `Q_m`.
pub fn satisfies<T>(
    c: &MBasis,
    props: &SiteProps,
    conserved: &[(MOpr<T>, f64)],
    tol: f64,
) -> bool
where T: Scalar
{
    conserved.iter()
        .all(|(q, val)| {
            (c.diagonal_operator(props, q) - T::from_re(*val)).modulus() < tol
        })
}

/// Site properties of a lattice divided into two halves, with the maps between
/// parent configurations and pairs of half configurations.
#[derive(Clone, Debug)]
pub struct SplitProps {
    /// Properties of the parent lattice.
    pub parent: SiteProps,
    /// Properties of either half.
    pub sub: SiteProps,
    /// The division itself.
    pub split: SubLattice,
}

impl SplitProps {
    pub fn new(parent: &SiteProps, split: SubLattice) -> Self {
        let sub = parent.restrict(split.sub_sites());
        Self { parent: parent.clone(), sub, split }
    }

    /// Interleave two half configurations into a parent configuration.
    pub fn zipper(&self, a: &MBasis, b: &MBasis) -> MBasis {
        let bps = self.parent.bits_per_site;
        let mut c = MBasis::new(&self.parent);
        for s in 0..self.split.sub_sites() {
            let sa = self.split.a_site(s);
            let sb = self.split.b_site(s);
            c.bits[sa * bps..(sa + 1) * bps]
                .copy_from_bitslice(&a.bits[self.sub.site_block(s)]);
            c.bits[sb * bps..(sb + 1) * bps]
                .copy_from_bitslice(&b.bits[self.sub.site_block(s)]);
        }
        c
    }

    /// Inverse of [`Self::zipper`].
    pub fn unzip(&self, c: &MBasis) -> (MBasis, MBasis) {
        let bps = self.parent.bits_per_site;
        let mut a = MBasis::new(&self.sub);
        let mut b = MBasis::new(&self.sub);
        for s in 0..self.split.sub_sites() {
            let sa = self.split.a_site(s);
            let sb = self.split.b_site(s);
            let block = self.sub.site_block(s);
            a.bits[block.clone()]
                .copy_from_bitslice(&c.bits[sa * bps..(sa + 1) * bps]);
            b.bits[block]
                .copy_from_bitslice(&c.bits[sb * bps..(sb + 1) * bps]);
        }
        (a, b)
    }

    /// Labels of the two halves of a parent configuration.
    pub fn label_sub(&self, c: &MBasis) -> (u64, u64) {
        let d = self.parent.local_dim() as u64;
        (0..self.split.sub_sites()).rev()
            .fold((0, 0), |(la, lb), s| {
                let va = c.site_state(&self.parent, self.split.a_site(s)) as u64;
                let vb = c.site_state(&self.parent, self.split.b_site(s)) as u64;
                (la * d + va, lb * d + vb)
            })
    }
}

/// Sites of an undivided lattice split by index into a low block `0..n_lo`
/// and a high block `n_lo..N`, with `n_lo = N / 2`.
///
/// A configuration is keyed by the labels of its blocks, `(high, low)`. Since
/// `label = high · D^{n_lo} + low`, keys sort the same way as labels and the
/// full basis is a product of the two blocks.
#[derive(Clone, Debug)]
pub struct SiteSplit {
    /// Properties of the whole lattice.
    pub props: SiteProps,
    lo_sites: usize,
    dim_lo: u64,
    dim_hi: u64,
}

impl SiteSplit {
    pub fn new(props: &SiteProps) -> MBasisResult<Self> {
        props.check_labels()?;
        let lo_sites = props.num_sites() / 2;
        let dim_lo = props.restrict(lo_sites).check_labels()?;
        let dim_hi = props.restrict(props.num_sites() - lo_sites).check_labels()?;
        Ok(Self { props: props.clone(), lo_sites, dim_lo, dim_hi })
    }

    /// Number of sites in the low block.
    pub fn lo_sites(&self) -> usize { self.lo_sites }

    /// Number of configurations of the high and low blocks.
    pub fn dims(&self) -> (u64, u64) { (self.dim_hi, self.dim_lo) }

    /// Labels of the high and low blocks of a configuration.
    pub fn key(&self, c: &MBasis) -> (u64, u64) {
        let d = self.props.local_dim() as u64;
        let block = |sites: Range<usize>| -> u64 {
            sites.rev()
                .fold(0, |acc, site| acc * d + c.site_state(&self.props, site) as u64)
        };
        (block(self.lo_sites..self.props.num_sites()), block(0..self.lo_sites))
    }

    /// Labels of every configuration whose high block has label `hi`.
    pub fn block_labels(&self, hi: u64) -> Range<u64> {
        hi * self.dim_lo..(hi + 1) * self.dim_lo
    }
}
