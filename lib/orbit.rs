//! Translation orbits of sublattice configurations.
//!
//! The full sublattice basis is enumerated in label order, so that a
//! configuration's position in [`SubOrbits::basis_full`] is its label. Each
//! orbit is represented by its smallest element, and every representative
//! carries its stabilizer subgroup.

use std::{ collections::BTreeSet, time::Instant };
use ndarray as nd;
use thiserror::Error;
use crate::{
    lattice::{ Lattice, Translations },
    mbasis::{ MBasis, MBasisError, SiteProps },
};

#[derive(Debug, Error)]
pub enum OrbitError {
    /// Returned when the sublattice basis is too large to enumerate.
    #[error("error in orbit classification: sublattice basis too large to enumerate")]
    BasisTooLarge,

    /// Returned when a translation image lands in a different orbit than its
    /// source.
    #[error("error in orbit classification: configuration {0} assigned to two orbits")]
    Inconsistent(usize),

    /// Returned when orbit sizes don't add up to the size of the basis.
    #[error("error in orbit classification: orbits cover {counted} of {total} configurations")]
    Partition { counted: usize, total: usize },

    #[error("labeling error: {0}")]
    Label(#[from] MBasisError),
}
use OrbitError::*;
pub type OrbitResult<T> = Result<T, OrbitError>;

/// A subgroup of a [`Translations`] group, stored as the sorted list of its
/// elements.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Subgroup {
    elems: Vec<usize>,
}

impl Subgroup {
    /// The trivial subgroup.
    pub fn trivial() -> Self { Self { elems: vec![0] } }

    /// The translations that leave `c` invariant, ignoring fermionic signs.
    pub fn stabilizer(c: &MBasis, props: &SiteProps, group: &Translations)
        -> Self
    {
        let elems: Vec<usize>
            = (0..group.len())
            .filter(|&t| {
                let mut img = c.clone();
                img.translate(props, group.perm(t));
                img == *c
            })
            .collect();
        Self { elems }
    }

    pub fn elems(&self) -> &[usize] { &self.elems }

    /// Number of elements.
    pub fn order(&self) -> usize { self.elems.len() }

    pub fn contains(&self, t: usize) -> bool {
        self.elems.binary_search(&t).is_ok()
    }

    /// Smallest element of the coset `j + self`.
    pub fn min_in_coset(&self, j: usize, group: &Translations) -> usize {
        self.elems.iter()
            .map(|&s| group.compose(j, s))
            .min()
            .unwrap_or(j)
    }

    /// Encoding as a tuple of periods `(ω_1, ..., ω_d)`, if the subgroup is
    /// generated by translations along the coordinate axes. Dimensions without
    /// symmetry report their linear size.
    pub fn divisors(&self, group: &Translations, lattice: &Lattice)
        -> Option<Vec<usize>>
    {
        let extents = group.extents();
        let omega: Vec<usize>
            = extents.iter().enumerate()
            .map(|(k, &e)| {
                if e == 1 { return lattice.dims()[k]; }
                (1..e)
                    .find(|&w| {
                        let mut disp = vec![0_i64; extents.len()];
                        disp[k] = w as i64;
                        self.contains(group.index(&disp))
                    })
                    .unwrap_or(e)
            })
            .collect();
        let order: usize
            = omega.iter().zip(extents)
            .map(|(&w, &e)| if e == 1 { 1 } else { e / w })
            .product();
        (order == self.order()).then_some(omega)
    }
}

/// Translation orbits of a sublattice.
#[derive(Clone, Debug, PartialEq)]
pub struct SubOrbits {
    /// Every configuration, in label order.
    pub basis_full: Vec<MBasis>,
    /// Position in `basis_full` of each representative, ascending.
    pub repr: Vec<usize>,
    /// Representative of each configuration.
    pub belong2rep: Vec<usize>,
    /// Translation taking each configuration to its representative.
    pub dist2rep: Vec<usize>,
    /// Distinct stabilizer subgroups, sorted.
    pub groups: Vec<Subgroup>,
    /// Stabilizer of each representative.
    pub belong2group: Vec<usize>,
    /// Orbit size under each subgroup.
    pub omega_g: Vec<usize>,
    // label of T_j r for every representative r and translation j
    translated: nd::Array2<u64>,
}

impl SubOrbits {
    /// Enumerate and classify the full basis of a sublattice.
    pub fn build(props: &SiteProps, group: &Translations) -> OrbitResult<Self> {
        let t0 = Instant::now();
        let n = props.num_labels()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or(BasisTooLarge)?;
        let basis_full: Vec<MBasis>
            = (0..n as u64).map(|l| MBasis::from_label(props, l)).collect();
        let (repr, belong2rep, dist2rep)
            = classify_trans_full2rep(props, &basis_full, group)?;
        let (groups, belong2group, omega_g)
            = classify_trans_rep2group(props, &basis_full, &repr, group);
        let counted: usize
            = belong2group.iter().map(|&g| omega_g[g]).sum();
        if counted != basis_full.len() {
            return Err(Partition { counted, total: basis_full.len() });
        }
        let mut translated = nd::Array2::zeros((repr.len(), group.len()));
        for (r, &i) in repr.iter().enumerate() {
            for j in 0..group.len() {
                let mut c = basis_full[i].clone();
                c.translate(props, group.perm(j));
                translated[[r, j]] = c.label(props)?;
            }
        }
        log::info!(
            "classified {} sublattice configurations into {} orbits ({} stabilizer groups) in {:.3?}",
            basis_full.len(), repr.len(), groups.len(), t0.elapsed(),
        );
        Ok(Self {
            basis_full,
            repr,
            belong2rep,
            dist2rep,
            groups,
            belong2group,
            omega_g,
            translated,
        })
    }

    /// Number of orbits.
    pub fn num_reps(&self) -> usize { self.repr.len() }

    /// Configuration of representative `r`.
    pub fn repr_config(&self, r: usize) -> &MBasis {
        &self.basis_full[self.repr[r]]
    }

    /// Label of representative `r`.
    pub fn repr_label(&self, r: usize) -> u64 { self.repr[r] as u64 }

    /// Label of representative `r` translated by `j`.
    pub fn translated_label(&self, r: usize, j: usize) -> u64 {
        self.translated[[r, j]]
    }

    /// Stabilizer of representative `r`.
    pub fn group_of(&self, r: usize) -> &Subgroup {
        &self.groups[self.belong2group[r]]
    }

    /// Returns `true` if the configuration with label `l` is a representative.
    pub fn is_repr(&self, l: usize) -> bool {
        self.repr[self.belong2rep[l]] == l
    }
}

/// Find the representative of every configuration in a label-ordered basis.
///
/// Returns the positions of the representatives and, for every configuration,
/// the index of its representative and the translation taking it there.
pub fn classify_trans_full2rep(
    props: &SiteProps,
    basis_full: &[MBasis],
    group: &Translations,
) -> OrbitResult<(Vec<usize>, Vec<usize>, Vec<usize>)>
{
    const UNSET: usize = usize::MAX;
    let n = basis_full.len();
    let mut repr: Vec<usize> = Vec::new();
    let mut belong2rep: Vec<usize> = vec![UNSET; n];
    let mut dist2rep: Vec<usize> = vec![0; n];
    for (i, c) in basis_full.iter().enumerate() {
        if belong2rep[i] != UNSET { continue; }
        // all other members of the orbit are larger and still unassigned
        let r = repr.len();
        repr.push(i);
        for t in 0..group.len() {
            let mut img = c.clone();
            img.translate(props, group.perm(t));
            let l = img.label(props)? as usize;
            if l >= n { return Err(Inconsistent(l)); }
            if belong2rep[l] == UNSET {
                belong2rep[l] = r;
                dist2rep[l] = group.inverse(t);
            } else if belong2rep[l] != r {
                return Err(Inconsistent(l));
            }
        }
    }
    Ok((repr, belong2rep, dist2rep))
}

/// Compute the stabilizer of every representative.
///
/// Returns the sorted list of distinct stabilizers, the stabilizer of each
/// representative, and the orbit size belonging to each stabilizer.
pub fn classify_trans_rep2group(
    props: &SiteProps,
    basis_full: &[MBasis],
    repr: &[usize],
    group: &Translations,
) -> (Vec<Subgroup>, Vec<usize>, Vec<usize>)
{
    let stabs: Vec<Subgroup>
        = repr.iter()
        .map(|&i| Subgroup::stabilizer(&basis_full[i], props, group))
        .collect();
    let groups: Vec<Subgroup>
        = stabs.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect();
    let belong2group: Vec<usize>
        = stabs.iter()
        .map(|s| groups.binary_search(s).unwrap_or_default())
        .collect();
    let omega_g: Vec<usize>
        = groups.iter().map(|g| group.len() / g.order()).collect();
    (groups, belong2group, omega_g)
}
