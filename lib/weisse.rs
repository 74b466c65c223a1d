//! Weisse tables: canonicalization of parent configurations from the orbit
//! data of their two halves.
//!
//! A parent configuration `c = a ⊗ b` is canonical when its A-half is a
//! sublattice representative `r_a` and its B-half is `T_j r_b` with `j` the
//! smallest element of its class. When a parent translation can exchange the
//! halves ("involved" special dimension), the A-half must additionally be the
//! representative with the smaller index; the class of `j` is then its coset
//! modulo both stabilizers. The canonical form of `c` depends only on
//!
//! - whether `R(a)` is less than, equal to, or greater than `R(b)` (the
//!   [`Branch`]),
//! - the stabilizer groups `g_a`, `g_b` of the two representatives, and
//! - the translations `j_a`, `j_b` taking the halves to their representatives,
//!
//! so it can be tabulated once per lattice:
//!
//! - `E[branch][g_a, g_b, j_a, j_b] = (disp_i, disp_j)`: translating `c` by
//!   the parent translation `disp_i` yields `r'_a ⊗ T_{disp_j} r'_b`, where
//!   `(r'_a, r'_b)` is `(R(a), R(b))`, or `(R(b), R(a))` for the greater branch
//!   of an involved lattice.
//! - `W[branch][g_a, g_b, j]`: index of the parent stabilizer of `r_a ⊗ T_j r_b`
//!   if that configuration is canonical, else the sentinel
//!   `groups_parent.len()`.
//!
//! Entries are computed by brute-force canonicalization of one sample pair of
//! representatives per `(branch, g_a, g_b)`.

use std::{ collections::BTreeSet, time::Instant };
use ndarray as nd;
use crate::{
    lattice::Translations,
    mbasis::{ MBasis, SplitProps },
    orbit::{ SubOrbits, Subgroup },
    pool::{ PoolResult, WorkerPool },
};

const NONE: u32 = u32::MAX;

/// Relative order of the representative indices of the two halves.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Branch {
    Lt = 0,
    Eq = 1,
    Gt = 2,
}

impl Branch {
    pub fn of(ra: usize, rb: usize) -> Self {
        match ra.cmp(&rb) {
            std::cmp::Ordering::Less => Self::Lt,
            std::cmp::Ordering::Equal => Self::Eq,
            std::cmp::Ordering::Greater => Self::Gt,
        }
    }

    pub fn all() -> [Self; 3] { [Self::Lt, Self::Eq, Self::Gt] }
}

/// Canonical form of a parent configuration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Canonical {
    /// Parent translation taking the configuration to canonical form.
    pub disp: usize,
    /// Representative of the canonical A-half.
    pub ra: usize,
    /// Representative of the canonical B-half.
    pub rb: usize,
    /// Sublattice translation applied to `rb` in the canonical B-half.
    pub j: usize,
}

/// Borrowed view of everything needed to canonicalize parent configurations.
#[derive(Copy, Clone, Debug)]
pub struct Symmetry<'a> {
    pub zp: &'a SplitProps,
    pub group: &'a Translations,
    pub sub_group: &'a Translations,
    pub orbits: &'a SubOrbits,
}

impl<'a> Symmetry<'a> {
    /// Returns `true` if parent translations can exchange the two halves.
    pub fn involved(&self) -> bool { self.zp.split.involved }

    /// Canonicalize by trying every parent translation.
    pub fn canonicalize(&self, c: &MBasis) -> Canonical {
        let orbits = self.orbits;
        let mut best: Option<Canonical> = None;
        for t in 0..self.group.len() {
            let mut img = c.clone();
            img.translate(&self.zp.parent, self.group.perm(t));
            let (ia, ib) = self.zp.label_sub(&img);
            let (ia, ib) = (ia as usize, ib as usize);
            if !orbits.is_repr(ia) { continue; }
            let ra = orbits.belong2rep[ia];
            let rb = orbits.belong2rep[ib];
            if self.involved() && ra > rb { continue; }
            let j0 = self.sub_group.inverse(orbits.dist2rep[ib]);
            let j = orbits.group_of(rb).min_in_coset(j0, self.sub_group);
            if best.map_or(true, |b| j < b.j) {
                best = Some(Canonical { disp: t, ra, rb, j });
            }
        }
        // the orbit of c always contains a configuration whose A-half is a
        // representative with the smaller index
        best.unwrap_or(Canonical { disp: 0, ra: 0, rb: 0, j: 0 })
    }

    /// Build the canonical configuration `r_a ⊗ T_j r_b`.
    pub fn reconstruct(&self, ra: usize, rb: usize, j: usize) -> MBasis {
        let mut b = self.orbits.repr_config(rb).clone();
        b.translate(&self.zp.sub, self.sub_group.perm(j));
        self.zp.zipper(self.orbits.repr_config(ra), &b)
    }

    /// Parent stabilizer of a configuration.
    pub fn stabilizer(&self, c: &MBasis) -> Subgroup {
        Subgroup::stabilizer(c, &self.zp.parent, self.group)
    }
}

/// The `E` and `W` tables for all three branches.
#[derive(Clone, Debug, PartialEq)]
pub struct WeisseTables {
    involved: bool,
    groups_parent: Vec<Subgroup>,
    w: [nd::Array3<u32>; 3],
    e: [nd::Array4<(u32, u32)>; 3],
}

// output of one (branch, g_a, g_b) task
struct Block {
    w: Vec<Option<Subgroup>>,
    e: Vec<(u32, u32)>,
}

impl WeisseTables {
    /// Build all tables.
    pub fn build(sym: &Symmetry, pool: &WorkerPool) -> PoolResult<Self> {
        let t0 = Instant::now();
        let orbits = sym.orbits;
        let ng = orbits.groups.len();
        let nj = sym.sub_group.len();
        let involved = sym.involved();

        // smallest and largest representative carrying each group
        let mut min_rep: Vec<usize> = vec![usize::MAX; ng];
        let mut max_rep: Vec<usize> = vec![0; ng];
        for (r, &g) in orbits.belong2group.iter().enumerate() {
            min_rep[g] = min_rep[g].min(r);
            max_rep[g] = max_rep[g].max(r);
        }
        let sample = |branch: Branch, ga: usize, gb: usize| -> Option<(usize, usize)> {
            match branch {
                Branch::Lt => (min_rep[ga] < max_rep[gb])
                    .then_some((min_rep[ga], max_rep[gb])),
                Branch::Eq => (ga == gb).then_some((min_rep[ga], min_rep[ga])),
                Branch::Gt => (max_rep[ga] > min_rep[gb])
                    .then_some((max_rep[ga], min_rep[gb])),
            }
        };

        let tasks: Vec<(Branch, usize, usize, usize, usize)>
            = Branch::all().into_iter()
            .flat_map(|branch| {
                (0..ng).flat_map(move |ga| (0..ng).map(move |gb| (branch, ga, gb)))
            })
            .filter_map(|(branch, ga, gb)| {
                sample(branch, ga, gb).map(|(ra, rb)| (branch, ga, gb, ra, rb))
            })
            .collect();
        let blocks: Vec<Block>
            = pool.map(tasks.len(), 1, |k| {
                let (branch, _, _, ra, rb) = tasks[k];
                Self::build_block(sym, branch, ra, rb)
            })?;

        let groups_parent: Vec<Subgroup>
            = blocks.iter()
            .flat_map(|block| block.w.iter().flatten().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let sentinel = groups_parent.len() as u32;
        let mut w: [nd::Array3<u32>; 3]
            = std::array::from_fn(|_| nd::Array3::from_elem((ng, ng, nj), sentinel));
        let mut e: [nd::Array4<(u32, u32)>; 3]
            = std::array::from_fn(|_| {
                nd::Array4::from_elem((ng, ng, nj, nj), (NONE, NONE))
            });
        for (&(branch, ga, gb, _, _), block) in tasks.iter().zip(blocks) {
            let b = branch as usize;
            if !(involved && branch == Branch::Gt) {
                for (j, stab) in block.w.into_iter().enumerate() {
                    if let Some(s) = stab {
                        let g = groups_parent.binary_search(&s)
                            .unwrap_or(groups_parent.len());
                        w[b][[ga, gb, j]] = g as u32;
                    }
                }
            }
            for (k, entry) in block.e.into_iter().enumerate() {
                e[b][[ga, gb, k / nj, k % nj]] = entry;
            }
        }
        if involved {
            w[Branch::Gt as usize] = nd::Array3::from_elem((0, 0, 0), sentinel);
        }
        log::info!(
            "built Weisse tables ({} sublattice groups, {} parent groups, {} translations) in {:.3?}",
            ng, groups_parent.len(), nj, t0.elapsed(),
        );
        Ok(Self { involved, groups_parent, w, e })
    }

    fn build_block(sym: &Symmetry, branch: Branch, ra: usize, rb: usize) -> Block {
        let sub_group = sym.sub_group;
        let nj = sub_group.len();
        let skip_w = sym.involved() && branch == Branch::Gt;
        let w: Vec<Option<Subgroup>>
            = (0..nj)
            .map(|j| {
                if skip_w { return None; }
                let c = sym.reconstruct(ra, rb, j);
                let canon = sym.canonicalize(&c);
                (canon.j == j && canon.ra == ra && canon.rb == rb)
                    .then(|| sym.stabilizer(&c))
            })
            .collect();
        let ra_config = sym.orbits.repr_config(ra);
        let rb_config = sym.orbits.repr_config(rb);
        let e: Vec<(u32, u32)>
            = (0..nj * nj)
            .map(|k| {
                let (ja, jb) = (k / nj, k % nj);
                let mut a = ra_config.clone();
                a.translate(&sym.zp.sub, sub_group.perm(sub_group.inverse(ja)));
                let mut b = rb_config.clone();
                b.translate(&sym.zp.sub, sub_group.perm(sub_group.inverse(jb)));
                let canon = sym.canonicalize(&sym.zp.zipper(&a, &b));
                (canon.disp as u32, canon.j as u32)
            })
            .collect();
        Block { w, e }
    }

    /// Returns `true` if parent translations exchange the two halves.
    pub fn involved(&self) -> bool { self.involved }

    /// Distinct parent stabilizers, sorted.
    pub fn groups_parent(&self) -> &[Subgroup] { &self.groups_parent }

    /// The sentinel value of the `W` tables.
    pub fn sentinel(&self) -> usize { self.groups_parent.len() }

    /// Raw `W` table of a branch.
    pub fn w_table(&self, branch: Branch) -> &nd::Array3<u32> {
        &self.w[branch as usize]
    }

    /// Raw `E` table of a branch.
    pub fn e_table(&self, branch: Branch) -> &nd::Array4<(u32, u32)> {
        &self.e[branch as usize]
    }

    /// Parent stabilizer index of `r_a ⊗ T_j r_b`, or `None` if that
    /// configuration isn't canonical.
    pub fn w(&self, branch: Branch, ga: usize, gb: usize, j: usize)
        -> Option<usize>
    {
        self.w[branch as usize].get([ga, gb, j])
            .map(|&g| g as usize)
            .filter(|&g| g < self.groups_parent.len())
    }

    /// `(disp_i, disp_j)` for a configuration whose halves are `T_{-j_a} r_a`
    /// and `T_{-j_b} r_b`.
    pub fn e(&self, branch: Branch, ga: usize, gb: usize, ja: usize, jb: usize)
        -> Option<(usize, usize)>
    {
        self.e[branch as usize].get([ga, gb, ja, jb])
            .filter(|&&(d, _)| d != NONE)
            .map(|&(d, j)| (d as usize, j as usize))
    }

    /// Look up the canonical form of a parent configuration.
    pub fn lookup(&self, sym: &Symmetry, c: &MBasis) -> Option<Canonical> {
        let orbits = sym.orbits;
        let (ia, ib) = sym.zp.label_sub(c);
        let (ia, ib) = (ia as usize, ib as usize);
        let ra = orbits.belong2rep[ia];
        let rb = orbits.belong2rep[ib];
        let branch = Branch::of(ra, rb);
        let (disp, j)
            = self.e(
                branch,
                orbits.belong2group[ra],
                orbits.belong2group[rb],
                orbits.dist2rep[ia],
                orbits.dist2rep[ib],
            )?;
        let (ra, rb)
            = if self.involved && branch == Branch::Gt { (rb, ra) } else { (ra, rb) };
        Some(Canonical { disp, ra, rb, j })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        lattice::{ Boundary, Lattice },
        local,
        mbasis::{ self, Orbital, SiteProps },
        opr::{ MOpr, OprProd },
    };

    struct Setup {
        zp: SplitProps,
        group: Translations,
        sub_group: Translations,
        orbits: SubOrbits,
    }

    impl Setup {
        fn new(latt: Lattice, orb: Orbital) -> Self {
            let props = SiteProps::new(latt.total_sites()).with_orbital(orb);
            let split = latt.divide(None).unwrap();
            let group = Translations::new(&latt, &latt.trans_sym());
            let sub_group
                = Translations::new(&split.lattice, &split.lattice.trans_sym());
            let zp = SplitProps::new(&props, split);
            let orbits = SubOrbits::build(&zp.sub, &sub_group).unwrap();
            Self { zp, group, sub_group, orbits }
        }

        fn sym(&self) -> Symmetry<'_> {
            Symmetry {
                zp: &self.zp,
                group: &self.group,
                sub_group: &self.sub_group,
                orbits: &self.orbits,
            }
        }
    }

    // sign picked up by T|c⟩ on a single fermionic orbital, from creation
    // operators applied to the vacuum in the same order before and after
    fn translation_sign(props: &SiteProps, c: &MBasis, perm: &[usize]) -> f64 {
        let occupied: Vec<usize>
            = (0..props.num_sites()).filter(|&s| c.get(props, s, 0) == 1).collect();
        let create = |sites: Vec<usize>| -> f64 {
            let mut prod: OprProd<f64> = OprProd::new(1.0);
            sites.into_iter().for_each(|s| { prod.push(local::cdag::<f64>(s, 0)); });
            let op: MOpr<f64> = prod.into();
            let out = mbasis::opr_x_phi(&op, &MBasis::new(props), props, 1e-12);
            assert_eq!(out.len(), 1);
            out[0].1
        };
        create(occupied.iter().map(|&s| perm[s]).collect()) * create(occupied)
    }

    // returns the number of lookups whose translation is fermion-odd
    fn check_roundtrip(setup: &Setup) -> usize {
        let sym = setup.sym();
        let props = &setup.zp.parent;
        let mut odd_count: usize = 0;
        let tables = WeisseTables::build(&sym, &WorkerPool::new(2)).unwrap();
        let n = setup.zp.parent.num_labels().unwrap();
        for label in 0..n {
            let c = MBasis::from_label(&setup.zp.parent, label);
            let canon = tables.lookup(&sym, &c).unwrap();
            let target = sym.reconstruct(canon.ra, canon.rb, canon.j);
            let mut img = c.clone();
            let odd = img.translate(props, setup.group.perm(canon.disp));
            assert_eq!(img, target);
            if props.has_fermions() {
                let chi = translation_sign(props, &c, setup.group.perm(canon.disp));
                assert_eq!(odd, chi < 0.0, "sign mismatch for label {}", label);
                odd_count += odd as usize;
            } else {
                assert!(!odd);
            }
            // the table agrees with brute force on the canonical state
            assert_eq!(sym.canonicalize(&target).j, canon.j);
            let brute = sym.canonicalize(&c);
            assert_eq!((brute.ra, brute.rb, brute.j), (canon.ra, canon.rb, canon.j));
            // the canonical state is flagged by W
            let (ra, rb) = (canon.ra, canon.rb);
            let w = tables.w(
                Branch::of(ra, rb),
                setup.orbits.belong2group[ra],
                setup.orbits.belong2group[rb],
                canon.j,
            );
            assert_eq!(w.map(|g| &tables.groups_parent()[g]), Some(&sym.stabilizer(&target)));
        }
        odd_count
    }

    #[test]
    fn roundtrip_involved_chain() {
        check_roundtrip(&Setup::new(
            Lattice::chain(8, Boundary::Pbc).unwrap(),
            Orbital::spin_half(),
        ));
    }

    #[test]
    fn roundtrip_unit_cell_split() {
        let odd = check_roundtrip(&Setup::new(
            Lattice::honeycomb(3, 1, [Boundary::Pbc, Boundary::Pbc]).unwrap(),
            Orbital::spinless_fermion(),
        ));
        assert!(odd > 0);
    }

    #[test]
    fn fermion_signs_on_honeycomb() {
        let setup = Setup::new(
            Lattice::honeycomb(2, 2, [Boundary::Pbc, Boundary::Pbc]).unwrap(),
            Orbital::spinless_fermion(),
        );
        assert!(check_roundtrip(&setup) > 0);
        // both modes of one cell move together and keep their order
        let props = &setup.zp.parent;
        let c = MBasis::from_states(props, &[1, 1, 0, 0, 0, 0, 0, 0]);
        for t in 0..setup.group.len() {
            let mut img = c.clone();
            let odd = img.translate(props, setup.group.perm(t));
            assert!(!odd);
            assert_eq!(translation_sign(props, &c, setup.group.perm(t)), 1.0);
        }
        // c†_1 c†_2 |0⟩ moved by (1, 0) becomes c†_3 c†_0 |0⟩ = -c†_0 c†_3 |0⟩
        let c = MBasis::from_states(props, &[0, 1, 1, 0, 0, 0, 0, 0]);
        let t = setup.group.index(&[1, 0]);
        let mut img = c.clone();
        assert!(img.translate(props, setup.group.perm(t)));
        assert_eq!(img, MBasis::from_states(props, &[1, 0, 0, 1, 0, 0, 0, 0]));
        assert_eq!(translation_sign(props, &c, setup.group.perm(t)), -1.0);
    }

    #[test]
    fn roundtrip_square() {
        check_roundtrip(&Setup::new(
            Lattice::square(4, 2, [Boundary::Pbc, Boundary::Pbc]).unwrap(),
            Orbital::spinless_fermion(),
        ));
    }

    #[test]
    fn roundtrip_open_special_dimension() {
        check_roundtrip(&Setup::new(
            Lattice::square(3, 2, [Boundary::Pbc, Boundary::Obc]).unwrap(),
            Orbital::spin_one(),
        ));
    }

    #[test]
    fn involved_gt_is_empty() {
        let setup = Setup::new(
            Lattice::chain(6, Boundary::Pbc).unwrap(),
            Orbital::spin_half(),
        );
        let tables = WeisseTables::build(&setup.sym(), &WorkerPool::new(1)).unwrap();
        assert!(tables.involved());
        assert_eq!(tables.w_table(Branch::Gt).len(), 0);
        assert!(tables.e_table(Branch::Gt).len() > 0);
    }

    #[test]
    fn rebuild_is_identical() {
        let setup = Setup::new(
            Lattice::square(2, 4, [Boundary::Pbc, Boundary::Pbc]).unwrap(),
            Orbital::spin_half(),
        );
        let a = WeisseTables::build(&setup.sym(), &WorkerPool::new(3)).unwrap();
        let b = WeisseTables::build(&setup.sym(), &WorkerPool::new(1)).unwrap();
        assert_eq!(a, b);
    }
}
