//! Lattice geometry, translation groups, and the split of a lattice into two
//! interleaved sublattices.
//!
//! Sites are numbered in column-major order over the Bravais coordinates with
//! the sublattice index innermost:
//! ```text
//! site = sub + s * (x_0 + L_0 * (x_1 + L_1 * (x_2 + ...)))
//! ```
//! Elements of a [`Translations`] group are numbered the same way over their
//! displacement vectors, with the identity at index 0.

use std::{ fmt, str::FromStr };
use itertools::Itertools;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LatticeError {
    /// Returned when a linear size is zero.
    #[error("error in lattice creation: dimension {0} has zero extent")]
    ZeroExtent(usize),

    /// Returned when the number of boundary conditions doesn't match the
    /// number of dimensions.
    #[error("error in lattice creation: got {bcs} boundary conditions for {dims} dimensions")]
    BoundaryMismatch { dims: usize, bcs: usize },

    /// Returned when a named lattice is given the wrong number of dimensions.
    #[error("error in lattice creation: {kind} lattice is {expected}-dimensional, got {found}")]
    DimensionMismatch { kind: LatticeKind, expected: usize, found: usize },

    /// Returned when the sublattice count is zero.
    #[error("error in lattice creation: sublattice count must be positive")]
    ZeroSublattices,

    /// Returned when a coordinate lies outside an open dimension.
    #[error("error in coordinate lookup: coordinate {coor} out of bounds along open dimension {dim}")]
    OutOfBounds { coor: i64, dim: usize },

    /// Returned when a coordinate vector has the wrong number of components.
    #[error("error in coordinate lookup: got {found} coordinates for {expected} dimensions")]
    CoordinateLength { expected: usize, found: usize },

    /// Returned when a sublattice index exceeds the sublattice count.
    #[error("error in coordinate lookup: sublattice {sub} out of bounds for {num_sub} sublattices")]
    SublatticeOutOfBounds { sub: usize, num_sub: usize },

    /// Returned when a site index exceeds the number of sites.
    #[error("error in coordinate lookup: site {site} out of bounds for {total} sites")]
    SiteOutOfBounds { site: usize, total: usize },

    /// Returned when no dimension can be halved.
    #[error("error in lattice division: no dimension has even extent")]
    NoEvenDimension,

    /// Returned when the requested special dimension doesn't exist.
    #[error("error in lattice division: special dimension {0} out of range")]
    InvalidSpecialDim(usize),

    /// Returned when the requested special dimension has odd extent.
    #[error("error in lattice division: special dimension {0} has odd extent")]
    OddSpecialDim(usize),

    /// Returned when parsing an unknown lattice name.
    #[error("error in lattice parsing: unknown lattice kind '{0}'")]
    UnknownKind(String),

    /// Returned when parsing an unknown boundary condition.
    #[error("error in lattice parsing: unknown boundary condition '{0}'")]
    UnknownBoundary(String),
}
use LatticeError::*;
pub type LatticeResult<T> = Result<T, LatticeError>;

/// Boundary condition along a single dimension.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Boundary {
    /// Periodic.
    Pbc,
    /// Open.
    Obc,
}

impl Boundary {
    /// Returns `true` if `self` is `Pbc`.
    pub fn is_periodic(self) -> bool { matches!(self, Self::Pbc) }
}

impl FromStr for Boundary {
    type Err = LatticeError;

    fn from_str(s: &str) -> LatticeResult<Self> {
        match s.to_lowercase().as_str() {
            "pbc" | "periodic" => Ok(Self::Pbc),
            "obc" | "open" => Ok(Self::Obc),
            _ => Err(UnknownBoundary(s.to_string())),
        }
    }
}

/// Named lattice geometries.
///
/// The geometry itself only fixes the dimension and the number of sites per
/// unit cell; bonds are left to the Hamiltonian.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LatticeKind {
    Chain,
    Square,
    Triangular,
    Honeycomb,
    Kagome,
    Cubic,
    /// Arbitrary dimension and unit cell.
    Custom,
}

impl LatticeKind {
    /// Expected number of dimensions, if fixed.
    pub fn dimension(self) -> Option<usize> {
        match self {
            Self::Chain => Some(1),
            Self::Square | Self::Triangular | Self::Honeycomb | Self::Kagome
                => Some(2),
            Self::Cubic => Some(3),
            Self::Custom => None,
        }
    }

    /// Number of sites per unit cell.
    pub fn num_sub(self) -> usize {
        match self {
            Self::Honeycomb => 2,
            Self::Kagome => 3,
            _ => 1,
        }
    }
}

impl fmt::Display for LatticeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Chain => "chain",
            Self::Square => "square",
            Self::Triangular => "triangular",
            Self::Honeycomb => "honeycomb",
            Self::Kagome => "kagome",
            Self::Cubic => "cubic",
            Self::Custom => "custom",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for LatticeKind {
    type Err = LatticeError;

    fn from_str(s: &str) -> LatticeResult<Self> {
        match s.to_lowercase().as_str() {
            "chain" => Ok(Self::Chain),
            "square" => Ok(Self::Square),
            "triangular" => Ok(Self::Triangular),
            "honeycomb" => Ok(Self::Honeycomb),
            "kagome" => Ok(Self::Kagome),
            "cubic" => Ok(Self::Cubic),
            _ => Err(UnknownKind(s.to_string())),
        }
    }
}

/// A finite Bravais lattice with a multi-site unit cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lattice {
    kind: LatticeKind,
    dims: Vec<usize>,
    bc: Vec<Boundary>,
    num_sub: usize,
}

impl Lattice {
    /// Create a new lattice.
    pub fn new(
        kind: LatticeKind,
        dims: Vec<usize>,
        bc: Vec<Boundary>,
        num_sub: usize,
    ) -> LatticeResult<Self>
    {
        if let Some(d) = kind.dimension() {
            if d != dims.len() {
                return Err(DimensionMismatch {
                    kind, expected: d, found: dims.len() });
            }
        }
        if dims.len() != bc.len() {
            return Err(BoundaryMismatch { dims: dims.len(), bcs: bc.len() });
        }
        if let Some(k) = dims.iter().position(|l| *l == 0) {
            return Err(ZeroExtent(k));
        }
        if num_sub == 0 { return Err(ZeroSublattices); }
        Ok(Self { kind, dims, bc, num_sub })
    }

    /// Create a named lattice with its natural unit cell.
    pub fn named(kind: LatticeKind, dims: Vec<usize>, bc: Vec<Boundary>)
        -> LatticeResult<Self>
    {
        Self::new(kind, dims, bc, kind.num_sub())
    }

    /// A one-dimensional chain.
    pub fn chain(l: usize, bc: Boundary) -> LatticeResult<Self> {
        Self::named(LatticeKind::Chain, vec![l], vec![bc])
    }

    /// A square lattice.
    pub fn square(lx: usize, ly: usize, bc: [Boundary; 2])
        -> LatticeResult<Self>
    {
        Self::named(LatticeKind::Square, vec![lx, ly], bc.to_vec())
    }

    /// A triangular lattice.
    pub fn triangular(lx: usize, ly: usize, bc: [Boundary; 2])
        -> LatticeResult<Self>
    {
        Self::named(LatticeKind::Triangular, vec![lx, ly], bc.to_vec())
    }

    /// A honeycomb lattice (two sites per unit cell).
    pub fn honeycomb(lx: usize, ly: usize, bc: [Boundary; 2])
        -> LatticeResult<Self>
    {
        Self::named(LatticeKind::Honeycomb, vec![lx, ly], bc.to_vec())
    }

    /// A kagome lattice (three sites per unit cell).
    pub fn kagome(lx: usize, ly: usize, bc: [Boundary; 2])
        -> LatticeResult<Self>
    {
        Self::named(LatticeKind::Kagome, vec![lx, ly], bc.to_vec())
    }

    /// A simple cubic lattice.
    pub fn cubic(lx: usize, ly: usize, lz: usize, bc: [Boundary; 3])
        -> LatticeResult<Self>
    {
        Self::named(LatticeKind::Cubic, vec![lx, ly, lz], bc.to_vec())
    }

    pub fn kind(&self) -> LatticeKind { self.kind }

    /// Number of dimensions.
    pub fn dimension(&self) -> usize { self.dims.len() }

    /// Linear sizes.
    pub fn dims(&self) -> &[usize] { &self.dims }

    /// Boundary conditions.
    pub fn boundaries(&self) -> &[Boundary] { &self.bc }

    /// Number of sites per unit cell.
    pub fn num_sub(&self) -> usize { self.num_sub }

    /// Total number of sites, `s * ∏ L_k`.
    pub fn total_sites(&self) -> usize {
        self.num_sub * self.dims.iter().product::<usize>()
    }

    /// Translation-symmetry mask: `true` along periodic dimensions.
    pub fn trans_sym(&self) -> Vec<bool> {
        self.bc.iter().map(|b| b.is_periodic()).collect()
    }

    /// Convert Bravais coordinates and a sublattice index to a linear site
    /// index. Coordinates wrap along periodic dimensions.
    pub fn coor2site(&self, coor: &[i64], sub: usize) -> LatticeResult<usize> {
        if coor.len() != self.dims.len() {
            return Err(CoordinateLength { expected: self.dims.len(), found: coor.len() });
        }
        if sub >= self.num_sub {
            return Err(SublatticeOutOfBounds { sub, num_sub: self.num_sub });
        }
        let mut site: usize = 0;
        for (k, ((&x, &l), &b)) in
            coor.iter().zip(&self.dims).zip(&self.bc).enumerate().rev()
        {
            let l = l as i64;
            let x
                = if b.is_periodic() {
                    x.rem_euclid(l)
                } else if (0..l).contains(&x) {
                    x
                } else {
                    return Err(OutOfBounds { coor: x, dim: k });
                };
            site = site * l as usize + x as usize;
        }
        Ok(site * self.num_sub + sub)
    }

    /// Inverse of [`Self::coor2site`].
    pub fn site2coor(&self, site: usize) -> LatticeResult<(Vec<i64>, usize)> {
        let total = self.total_sites();
        if site >= total { return Err(SiteOutOfBounds { site, total }); }
        let sub = site % self.num_sub;
        let mut rem = site / self.num_sub;
        let coor: Vec<i64>
            = self.dims.iter()
            .map(|&l| { let x = rem % l; rem /= l; x as i64 })
            .collect();
        Ok((coor, sub))
    }

    /// Site reached from `site` by a displacement; open dimensions must have
    /// zero displacement.
    pub(crate) fn shift_site(&self, site: usize, disp: &[usize]) -> usize {
        let sub = site % self.num_sub;
        let mut rem = site / self.num_sub;
        let mut stride: usize = 1;
        let mut out: usize = 0;
        for (&l, &dx) in self.dims.iter().zip(disp) {
            let x = rem % l;
            rem /= l;
            out += ((x + dx) % l) * stride;
            stride *= l;
        }
        out * self.num_sub + sub
    }

    /// The rectangular translation subgroups admitted by a symmetry mask, each
    /// given as a tuple of periods `(ω_1, ..., ω_d)` with `ω_k | L_k`, in
    /// lexicographic order. Dimensions without symmetry carry `ω_k = L_k`.
    pub fn translation_subgroups(&self, trans_sym: &[bool]) -> Vec<Vec<usize>> {
        self.dims.iter().zip(trans_sym)
            .map(|(&l, &sym)| {
                if sym {
                    (1..=l).filter(|w| l % w == 0).collect::<Vec<usize>>()
                } else {
                    vec![l]
                }
            })
            .multi_cartesian_product()
            .collect()
    }

    /// Divide the lattice into two interleaved sublattices.
    ///
    /// With an even number of sites per unit cell and no special dimension
    /// requested, the unit cell is halved. Otherwise the special dimension
    /// (given, or the first with even extent) is halved and sites with even
    /// coordinate along it form sublattice A.
    pub fn divide(&self, dim_spec: Option<usize>) -> LatticeResult<SubLattice> {
        if dim_spec.is_none() && self.num_sub % 2 == 0 {
            let sub = Self {
                kind: self.kind,
                dims: self.dims.clone(),
                bc: self.bc.clone(),
                num_sub: self.num_sub / 2,
            };
            let n_sub = sub.total_sites();
            let mut a_sites = vec![0; n_sub];
            let mut b_sites = vec![0; n_sub];
            let mut half = Vec::with_capacity(self.total_sites());
            for site in 0..self.total_sites() {
                let (coor, s) = self.site2coor(site)?;
                let sub_site = sub.coor2site(&coor, s / 2)?;
                if s % 2 == 0 {
                    a_sites[sub_site] = site;
                    half.push((Half::A, sub_site));
                } else {
                    b_sites[sub_site] = site;
                    half.push((Half::B, sub_site));
                }
            }
            return Ok(SubLattice {
                lattice: sub,
                split: Split::Sublattice,
                involved: false,
                a_sites,
                b_sites,
                half,
            });
        }
        let ds
            = match dim_spec {
                Some(d) if d >= self.dimension() => {
                    return Err(InvalidSpecialDim(d));
                },
                Some(d) if self.dims[d] % 2 != 0 => {
                    return Err(OddSpecialDim(d));
                },
                Some(d) => d,
                None => self.dims.iter().position(|l| l % 2 == 0)
                    .ok_or(NoEvenDimension)?,
            };
        let mut dims = self.dims.clone();
        dims[ds] /= 2;
        let sub = Self {
            kind: self.kind,
            dims,
            bc: self.bc.clone(),
            num_sub: self.num_sub,
        };
        let n_sub = sub.total_sites();
        let mut a_sites = vec![0; n_sub];
        let mut b_sites = vec![0; n_sub];
        let mut half = Vec::with_capacity(self.total_sites());
        for site in 0..self.total_sites() {
            let (mut coor, s) = self.site2coor(site)?;
            let even = coor[ds] % 2 == 0;
            coor[ds] /= 2;
            let sub_site = sub.coor2site(&coor, s)?;
            if even {
                a_sites[sub_site] = site;
                half.push((Half::A, sub_site));
            } else {
                b_sites[sub_site] = site;
                half.push((Half::B, sub_site));
            }
        }
        Ok(SubLattice {
            lattice: sub,
            split: Split::Dimension(ds),
            involved: self.bc[ds].is_periodic(),
            a_sites,
            b_sites,
            half,
        })
    }
}

/// How a lattice was divided.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Split {
    /// Even and odd sites of the unit cell.
    Sublattice,
    /// Even and odd coordinates along a special dimension.
    Dimension(usize),
}

/// One of the two halves of a divided lattice.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Half {
    A,
    B,
}

/// A lattice divided into two congruent sublattices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubLattice {
    /// Geometry shared by both halves.
    pub lattice: Lattice,
    /// How the parent was divided.
    pub split: Split,
    /// `true` if the special dimension carries translation symmetry, in which
    /// case a parent translation can exchange the two halves.
    pub involved: bool,
    a_sites: Vec<usize>,
    b_sites: Vec<usize>,
    half: Vec<(Half, usize)>,
}

impl SubLattice {
    /// Number of sites in each half.
    pub fn sub_sites(&self) -> usize { self.a_sites.len() }

    /// Parent site of an A-site.
    pub fn a_site(&self, sub_site: usize) -> usize { self.a_sites[sub_site] }

    /// Parent site of a B-site.
    pub fn b_site(&self, sub_site: usize) -> usize { self.b_sites[sub_site] }

    /// Half and sublattice site of a parent site.
    pub fn locate(&self, site: usize) -> (Half, usize) { self.half[site] }
}

/// The group of lattice translations along the dimensions with translation
/// symmetry, with every element's site permutation cached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Translations {
    extents: Vec<usize>,
    perms: Vec<Vec<usize>>,
}

impl Translations {
    /// Build the translation group of `lattice` restricted to the dimensions
    /// marked in `trans_sym`.
    pub fn new(lattice: &Lattice, trans_sym: &[bool]) -> Self {
        let extents: Vec<usize>
            = lattice.dims().iter().zip(trans_sym)
            .map(|(&l, &sym)| if sym { l } else { 1 })
            .collect();
        let order: usize = extents.iter().product();
        let mut group = Self { extents, perms: Vec::with_capacity(order) };
        group.perms
            = (0..order)
            .map(|t| {
                let disp = group.disp(t);
                (0..lattice.total_sites())
                    .map(|site| lattice.shift_site(site, &disp))
                    .collect()
            })
            .collect();
        group
    }

    /// The trivial group on `lattice`.
    pub fn trivial(lattice: &Lattice) -> Self {
        Self::new(lattice, &vec![false; lattice.dimension()])
    }

    /// Number of elements.
    pub fn len(&self) -> usize { self.perms.len() }

    /// Always `false`; the identity is always present.
    pub fn is_empty(&self) -> bool { self.perms.is_empty() }

    /// Extent of the group along each dimension (1 where there is no
    /// symmetry).
    pub fn extents(&self) -> &[usize] { &self.extents }

    /// Displacement vector of an element.
    pub fn disp(&self, t: usize) -> Vec<usize> {
        let mut rem = t;
        self.extents.iter()
            .map(|&e| { let x = rem % e; rem /= e; x })
            .collect()
    }

    /// Element with a given displacement, taken modulo the extents.
    pub fn index(&self, disp: &[i64]) -> usize {
        disp.iter().zip(&self.extents).rev()
            .fold(0, |acc, (&x, &e)| acc * e + x.rem_euclid(e as i64) as usize)
    }

    /// Group product (sum of displacements).
    pub fn compose(&self, a: usize, b: usize) -> usize {
        let mut ra = a;
        let mut rb = b;
        let mut stride: usize = 1;
        let mut out: usize = 0;
        for &e in self.extents.iter() {
            out += ((ra % e + rb % e) % e) * stride;
            ra /= e;
            rb /= e;
            stride *= e;
        }
        out
    }

    /// Group inverse (negated displacement).
    pub fn inverse(&self, a: usize) -> usize {
        let mut ra = a;
        let mut stride: usize = 1;
        let mut out: usize = 0;
        for &e in self.extents.iter() {
            out += ((e - ra % e) % e) * stride;
            ra /= e;
            stride *= e;
        }
        out
    }

    /// Site permutation of an element: site `i` is moved to `perm(t)[i]`.
    pub fn perm(&self, t: usize) -> &[usize] { &self.perms[t] }

    /// The angle `2π Σ_d k_d x_d / L_d` of the momentum phase for element `t`.
    pub fn phase_angle(&self, t: usize, momentum: &[i64]) -> f64 {
        self.disp(t).into_iter().zip(&self.extents).zip(momentum)
            .map(|((x, &e), &k)| {
                (k.rem_euclid(e as i64) as f64) * (x as f64) / (e as f64)
            })
            .sum::<f64>()
            * std::f64::consts::TAU
    }

    /// Normalize a momentum vector: reduce modulo the extents and zero out
    /// dimensions without symmetry.
    pub fn normalize_momentum(&self, momentum: &[i64]) -> Vec<i64> {
        momentum.iter().zip(&self.extents)
            .map(|(&k, &e)| if e > 1 { k.rem_euclid(e as i64) } else { 0 })
            .collect()
    }

    /// Returns `true` if every momentum phase is real, i.e. `2k ≡ 0` modulo
    /// each extent.
    pub fn momentum_is_real(&self, momentum: &[i64]) -> bool {
        momentum.iter().zip(&self.extents)
            .all(|(&k, &e)| (2 * k).rem_euclid(e as i64) == 0)
    }

    /// Format a momentum for diagnostics, with `NA` along dimensions without
    /// symmetry.
    pub fn fmt_momentum(&self, momentum: &[i64]) -> String {
        let comps: Vec<String>
            = momentum.iter().zip(&self.extents)
            .map(|(k, &e)| if e > 1 { k.to_string() } else { "NA".to_string() })
            .collect();
        format!("({})", comps.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coor_site_roundtrip() {
        let latt = Lattice::honeycomb(3, 4, [Boundary::Pbc, Boundary::Obc])
            .unwrap();
        assert_eq!(latt.total_sites(), 24);
        for site in 0..latt.total_sites() {
            let (coor, sub) = latt.site2coor(site).unwrap();
            assert_eq!(latt.coor2site(&coor, sub).unwrap(), site);
        }
        assert_eq!(latt.coor2site(&[1, 2], 1).unwrap(), 1 + 2 * (1 + 3 * 2));
        assert_eq!(latt.coor2site(&[-1, 0], 0).unwrap(), 2 * 2);
        assert!(latt.coor2site(&[0, 4], 0).is_err());
        assert!(matches!(
            latt.coor2site(&[1], 0),
            Err(CoordinateLength { expected: 2, found: 1 })
        ));
        assert!(matches!(
            latt.coor2site(&[1, 2, 0], 0),
            Err(CoordinateLength { expected: 2, found: 3 })
        ));
        assert!(matches!(
            latt.coor2site(&[1, 2], 2),
            Err(SublatticeOutOfBounds { sub: 2, num_sub: 2 })
        ));
    }

    #[test]
    fn rectangular_subgroups() {
        let latt = Lattice::square(4, 3, [Boundary::Pbc, Boundary::Obc])
            .unwrap();
        let groups = latt.translation_subgroups(&latt.trans_sym());
        assert_eq!(groups, vec![vec![1, 3], vec![2, 3], vec![4, 3]]);
    }

    #[test]
    fn translation_group_arithmetic() {
        let latt = Lattice::triangular(4, 3, [Boundary::Pbc, Boundary::Pbc])
            .unwrap();
        let group = Translations::new(&latt, &latt.trans_sym());
        assert_eq!(group.len(), 12);
        assert_eq!(group.disp(0), vec![0, 0]);
        for a in 0..group.len() {
            let da: Vec<i64>
                = group.disp(a).into_iter().map(|x| x as i64).collect();
            assert_eq!(group.index(&da), a);
            assert_eq!(group.compose(a, group.inverse(a)), 0);
            for b in 0..group.len() {
                let ab = group.compose(a, b);
                let pa = group.perm(a);
                let pb = group.perm(b);
                let pab = group.perm(ab);
                for site in 0..latt.total_sites() {
                    assert_eq!(pab[site], pa[pb[site]]);
                }
            }
        }
    }

    #[test]
    fn divide_unit_cell() {
        let latt = Lattice::honeycomb(2, 2, [Boundary::Pbc, Boundary::Pbc])
            .unwrap();
        let split = latt.divide(None).unwrap();
        assert_eq!(split.split, Split::Sublattice);
        assert!(!split.involved);
        assert_eq!(split.sub_sites(), 4);
        for s in 0..4 {
            assert_eq!(split.a_site(s), 2 * s);
            assert_eq!(split.b_site(s), 2 * s + 1);
        }
    }

    #[test]
    fn divide_special_dimension() {
        let latt = Lattice::chain(8, Boundary::Pbc).unwrap();
        let split = latt.divide(None).unwrap();
        assert_eq!(split.split, Split::Dimension(0));
        assert!(split.involved);
        assert_eq!(split.lattice.dims(), &[4]);
        for s in 0..4 {
            assert_eq!(split.a_site(s), 2 * s);
            assert_eq!(split.b_site(s), 2 * s + 1);
            assert_eq!(split.locate(2 * s + 1), (Half::B, s));
        }
        let latt = Lattice::square(3, 4, [Boundary::Pbc, Boundary::Obc])
            .unwrap();
        let split = latt.divide(None).unwrap();
        assert_eq!(split.split, Split::Dimension(1));
        assert!(!split.involved);
        let latt = Lattice::square(3, 5, [Boundary::Pbc, Boundary::Pbc])
            .unwrap();
        assert!(matches!(latt.divide(None), Err(NoEvenDimension)));
    }

    #[test]
    fn momentum_helpers() {
        let latt = Lattice::square(4, 2, [Boundary::Pbc, Boundary::Obc])
            .unwrap();
        let group = Translations::new(&latt, &latt.trans_sym());
        assert_eq!(group.normalize_momentum(&[-1, 5]), vec![3, 0]);
        assert!(group.momentum_is_real(&[2, 1]));
        assert!(!group.momentum_is_real(&[1, 0]));
        assert_eq!(group.fmt_momentum(&[3, 0]), "(3, NA)");
        let angle = group.phase_angle(group.index(&[1, 0]), &[1, 0]);
        assert!((angle - std::f64::consts::FRAC_PI_2).abs() < 1e-14);
    }
}
