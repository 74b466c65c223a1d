//! The exact-diagonalization engine: a state machine driving a Hamiltonian
//! through orbit classification, Weisse tables, sector enumeration, matrix
//! assembly, and the eigensolver.
//!
//! Operations must be called in stage order:
//! ```text
//! Empty -> LatticeBound -> OrbitsBuilt -> WeisseBuilt -> SectorEnumerated
//!       -> MatrixReady -> Spectrum
//! ```
//! Any operation may be repeated. Rebinding the lattice or rebuilding the
//! tables discards everything downstream; re-enumerating a sector or changing
//! the Hamiltonian discards the matrix and the spectrum.

use std::time::Instant;
use num_complex::Complex64 as C64;
use rand::{ rngs::StdRng, SeedableRng };
use rand::distributions::Distribution;
use rustc_hash::FxHashMap as HashMap;
use statrs::distribution::Normal;
use thiserror::Error;
use crate::{
    Scalar,
    config::EdConfig,
    csr::CsrMatrix,
    hamiltonian::{ Basis, SectorHamiltonian },
    lanczos::{ self, LanczosError, LinearOp, Spectrum, Which },
    lattice::{ Lattice, LatticeError, Translations },
    mbasis::{ self, MBasis, MBasisError, SiteProps, SiteSplit, SplitProps },
    opr::MOpr,
    orbit::{ OrbitError, SubOrbits },
    pool::{ PoolError, WorkerPool },
    sector::{ Sector, SectorError },
    weisse::{ Symmetry, WeisseTables },
};

#[derive(Debug, Error)]
pub enum ModelError {
    /// Returned when an operation is called before its prerequisites.
    #[error("error in {op}: requires stage {required:?}, engine is at {found:?}")]
    WrongStage { op: &'static str, required: Stage, found: Stage },

    /// Returned when the lattice and the site properties disagree on the
    /// number of sites.
    #[error("error in bind_lattice: lattice has {lattice} sites, site properties have {props}")]
    SiteCount { lattice: usize, props: usize },

    /// Returned when an operator acts on a site that doesn't exist.
    #[error("error in operator check: site {site} out of bounds for {num_sites} sites")]
    OperatorSite { site: usize, num_sites: usize },

    /// Returned when an operator acts on an orbital that doesn't exist.
    #[error("error in operator check: orbital {orbital} out of bounds for {num_orbitals} orbitals")]
    OperatorOrbital { orbital: usize, num_orbitals: usize },

    /// Returned when an operator's matrix doesn't match its orbital.
    #[error("error in operator check: {found}x{found} matrix on orbital {orbital} of dimension {expected}")]
    OperatorDimension { orbital: usize, expected: usize, found: usize },

    /// Returned when `add_diagonal` receives an off-diagonal term.
    #[error("error in add_diagonal: operator has off-diagonal terms")]
    NotDiagonal,

    /// Returned when a momentum has the wrong number of components.
    #[error("error in enumerate_sector: momentum has {found} components, lattice has {expected} dimensions")]
    MomentumLength { expected: usize, found: usize },

    /// Returned when a conserved observable is not diagonal.
    #[error("error in enumerate_sector: conserved observable {0} is not diagonal")]
    NonDiagonalConserved(usize),

    /// Returned when a real-scalar engine is asked for a sector with complex
    /// phases.
    #[error("error in enumerate_sector: momentum {0} has complex phases; use a complex scalar")]
    ComplexPhases(String),

    /// Returned when a sector exceeds the configured index width.
    #[error("error in enumerate_sector: sector dimension {dim} exceeds index width maximum {max}")]
    IndexOverflow { dim: usize, max: usize },

    /// Returned when a vector doesn't match the sector dimension.
    #[error("error in multiply: vector has length {found}, sector has dimension {expected}")]
    VectorLength { expected: usize, found: usize },

    /// Returned when the eigensolver converges fewer pairs than required.
    #[error("error in solve: {nconv} eigenpairs converged, {required} required")]
    NotConverged { nconv: usize, required: usize },

    /// Returned when an eigenvector column doesn't exist.
    #[error("error in measure: column {col} out of range for {nconv} converged eigenpairs")]
    ColumnOutOfRange { col: usize, nconv: usize },

    #[error("lattice error: {0}")]
    Lattice(#[from] LatticeError),

    #[error("labeling error: {0}")]
    Label(#[from] MBasisError),

    #[error("orbit error: {0}")]
    Orbit(#[from] OrbitError),

    #[error("sector error: {0}")]
    Sector(#[from] SectorError),

    #[error("worker pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("eigensolver error: {0}")]
    Lanczos(#[from] LanczosError),
}
use ModelError::*;
pub type ModelResult<T> = Result<T, ModelError>;

/// Progress of an [`Engine`] through its pipeline.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Empty,
    LatticeBound,
    OrbitsBuilt,
    WeisseBuilt,
    SectorEnumerated,
    MatrixReady,
    Spectrum,
}

#[derive(Clone, Debug)]
enum Division {
    // two sublattices with their own translation group
    Halves { zp: SplitProps, sub_group: Translations },
    // sites split by index, without translation symmetry
    Sites(SiteSplit),
}

#[derive(Clone, Debug)]
struct Geometry {
    lattice: Lattice,
    group: Translations,
    division: Division,
}

/// Exact-diagonalization engine over amplitude type `T`.
#[derive(Clone, Debug)]
pub struct Engine<T> {
    config: EdConfig,
    pool: WorkerPool,
    props: SiteProps,
    h_diag: MOpr<T>,
    h_off: MOpr<T>,
    stage: Stage,
    geometry: Option<Geometry>,
    orbits: Option<SubOrbits>,
    weisse: Option<WeisseTables>,
    sector: Option<Sector>,
    csr: Option<CsrMatrix<T>>,
    spectrum: Option<Spectrum<T>>,
}

impl<T> Engine<T>
where T: Scalar
{
    /// Create a new engine with an empty Hamiltonian.
    pub fn new(props: SiteProps, config: EdConfig) -> Self {
        let pool
            = config.nthreads
            .map(WorkerPool::new)
            .unwrap_or_else(WorkerPool::new_cpus);
        Self {
            config,
            pool,
            props,
            h_diag: MOpr::new(),
            h_off: MOpr::new(),
            stage: Stage::Empty,
            geometry: None,
            orbits: None,
            weisse: None,
            sector: None,
            csr: None,
            spectrum: None,
        }
    }

    pub fn config(&self) -> &EdConfig { &self.config }

    pub fn props(&self) -> &SiteProps { &self.props }

    pub fn stage(&self) -> Stage { self.stage }

    /// Diagonal part of the Hamiltonian.
    pub fn h_diag(&self) -> &MOpr<T> { &self.h_diag }

    /// Off-diagonal part of the Hamiltonian.
    pub fn h_off(&self) -> &MOpr<T> { &self.h_off }

    pub fn lattice(&self) -> Option<&Lattice> {
        self.geometry.as_ref().map(|geo| &geo.lattice)
    }

    /// The parent translation group; trivial when translations are disabled.
    pub fn translations(&self) -> Option<&Translations> {
        self.geometry.as_ref().map(|geo| &geo.group)
    }

    /// The sublattice division, if translations are enabled.
    pub fn split_props(&self) -> Option<&SplitProps> {
        match &self.geometry.as_ref()?.division {
            Division::Halves { zp, .. } => Some(zp),
            Division::Sites(_) => None,
        }
    }

    /// The site-index split of the full basis, if translations are disabled.
    pub fn site_split(&self) -> Option<&SiteSplit> {
        match &self.geometry.as_ref()?.division {
            Division::Halves { .. } => None,
            Division::Sites(split) => Some(split),
        }
    }

    pub fn orbits(&self) -> Option<&SubOrbits> { self.orbits.as_ref() }

    pub fn weisse(&self) -> Option<&WeisseTables> { self.weisse.as_ref() }

    pub fn sector(&self) -> Option<&Sector> { self.sector.as_ref() }

    /// The assembled matrix, if any.
    pub fn csr(&self) -> Option<&CsrMatrix<T>> { self.csr.as_ref() }

    pub fn spectrum(&self) -> Option<&Spectrum<T>> { self.spectrum.as_ref() }

    /// Number of representatives in the current sector, fakes included.
    pub fn dim_repr(&self) -> usize {
        self.sector.as_ref().map_or(0, |s| s.dim_repr())
    }

    /// Number of physical states in the current sector.
    pub fn dim_physical(&self) -> usize {
        self.sector.as_ref().map_or(0, |s| s.dim_physical())
    }

    fn require(&self, op: &'static str, required: Stage) -> ModelResult<()> {
        if self.stage < required {
            Err(WrongStage { op, required, found: self.stage })
        } else {
            Ok(())
        }
    }

    fn wrong_stage(&self, op: &'static str, required: Stage) -> ModelError {
        WrongStage { op, required, found: self.stage }
    }

    // drop everything at or after `stage`
    fn invalidate(&mut self, stage: Stage) {
        if stage <= Stage::OrbitsBuilt { self.orbits = None; }
        if stage <= Stage::WeisseBuilt { self.weisse = None; }
        if stage <= Stage::SectorEnumerated { self.sector = None; }
        if stage <= Stage::MatrixReady { self.csr = None; }
        self.spectrum = None;
        let prev
            = match stage {
                Stage::Empty => Stage::Empty,
                Stage::LatticeBound => Stage::Empty,
                Stage::OrbitsBuilt => Stage::LatticeBound,
                Stage::WeisseBuilt => Stage::OrbitsBuilt,
                Stage::SectorEnumerated => Stage::WeisseBuilt,
                Stage::MatrixReady => Stage::SectorEnumerated,
                Stage::Spectrum => Stage::MatrixReady,
            };
        self.stage = self.stage.min(prev);
    }

    /// Bind a lattice, dividing it with the default choice of special
    /// dimension.
    pub fn bind_lattice(&mut self, lattice: Lattice) -> ModelResult<()> {
        self.bind_lattice_with(lattice, None)
    }

    /// Bind a lattice, dividing it along `dim_spec` if given. With
    /// translations disabled the lattice is not divided and `dim_spec` is
    /// ignored.
    pub fn bind_lattice_with(&mut self, lattice: Lattice, dim_spec: Option<usize>)
        -> ModelResult<()>
    {
        let n = lattice.total_sites();
        if n != self.props.num_sites() {
            return Err(SiteCount { lattice: n, props: self.props.num_sites() });
        }
        if let Some(max_site) = self.h_diag.max_site().max(self.h_off.max_site()) {
            if max_site >= n {
                return Err(OperatorSite { site: max_site, num_sites: n });
            }
        }
        let (group, division)
            = if self.config.translations {
                let trans_sym = lattice.trans_sym();
                let split = lattice.divide(dim_spec)?;
                let group = Translations::new(&lattice, &trans_sym);
                let sub_group
                    = Translations::new(&split.lattice, &split.lattice.trans_sym());
                let zp = SplitProps::new(&self.props, split);
                zp.sub.check_labels()?;
                log::info!(
                    "bound {} lattice {:?} ({} sites): split {:?}{}, |G| = {} ({} rectangular subgroups), |G_sub| = {}",
                    lattice.kind(),
                    lattice.dims(),
                    n,
                    zp.split.split,
                    if zp.split.involved { " (involved)" } else { "" },
                    group.len(),
                    lattice.translation_subgroups(&trans_sym).len(),
                    sub_group.len(),
                );
                (group, Division::Halves { zp, sub_group })
            } else {
                let split = SiteSplit::new(&self.props)?;
                log::info!(
                    "bound {} lattice {:?} ({} sites) without translations: full basis keyed at site {}",
                    lattice.kind(),
                    lattice.dims(),
                    n,
                    split.lo_sites(),
                );
                (Translations::trivial(&lattice), Division::Sites(split))
            };
        self.geometry = Some(Geometry { lattice, group, division });
        self.invalidate(Stage::OrbitsBuilt);
        self.stage = Stage::LatticeBound;
        Ok(())
    }

    fn check_operator(&self, op: &MOpr<T>) -> ModelResult<()> {
        let num_sites = self.props.num_sites();
        let num_orbitals = self.props.num_orbitals();
        for f in op.terms().iter().flat_map(|term| term.factors().iter()) {
            if f.site() >= num_sites {
                return Err(OperatorSite { site: f.site(), num_sites });
            }
            if f.orbital() >= num_orbitals {
                return Err(OperatorOrbital { orbital: f.orbital(), num_orbitals });
            }
            let expected = self.props.orbital(f.orbital()).dim_local();
            if f.dim() != expected {
                return Err(OperatorDimension {
                    orbital: f.orbital(),
                    expected,
                    found: f.dim(),
                });
            }
        }
        Ok(())
    }

    fn hamiltonian_changed(&mut self) {
        if self.stage > Stage::SectorEnumerated {
            self.invalidate(Stage::MatrixReady);
        }
    }

    /// Add diagonal terms to the Hamiltonian.
    pub fn add_diagonal<O>(&mut self, op: O) -> ModelResult<()>
    where O: Into<MOpr<T>>
    {
        let op: MOpr<T> = op.into();
        self.check_operator(&op)?;
        if !op.is_diagonal() { return Err(NotDiagonal); }
        self.h_diag += op;
        self.hamiltonian_changed();
        Ok(())
    }

    /// Add terms to the off-diagonal part of the Hamiltonian. Diagonal terms
    /// are accepted but handled less efficiently than through
    /// [`Self::add_diagonal`].
    pub fn add_offdiagonal<O>(&mut self, op: O) -> ModelResult<()>
    where O: Into<MOpr<T>>
    {
        let op: MOpr<T> = op.into();
        self.check_operator(&op)?;
        self.h_off += op;
        self.hamiltonian_changed();
        Ok(())
    }

    /// Add terms to the Hamiltonian, routing each by whether it is diagonal.
    pub fn add_hamiltonian<O>(&mut self, op: O) -> ModelResult<()>
    where O: Into<MOpr<T>>
    {
        let op: MOpr<T> = op.into();
        self.check_operator(&op)?;
        let (diag, off) = op.split_diagonal();
        self.h_diag += diag;
        self.h_off += off;
        self.hamiltonian_changed();
        Ok(())
    }

    fn symmetry(&self, op: &'static str) -> ModelResult<Symmetry<'_>> {
        let geo = self.geometry.as_ref();
        match (geo.map(|geo| &geo.division), geo, &self.orbits) {
            (Some(Division::Halves { zp, sub_group }), Some(geo), Some(orbits)) => {
                Ok(Symmetry { zp, group: &geo.group, sub_group, orbits })
            },
            _ => Err(self.wrong_stage(op, Stage::OrbitsBuilt)),
        }
    }

    // how the sectors of the current tables are labeled
    fn basis(&self, op: &'static str) -> ModelResult<Basis<'_>> {
        let missing = || self.wrong_stage(op, Stage::WeisseBuilt);
        if self.stage < Stage::WeisseBuilt { return Err(missing()); }
        let geo = self.geometry.as_ref().ok_or_else(missing)?;
        match &geo.division {
            Division::Halves { .. } => {
                let sym = self.symmetry(op)?;
                let weisse = self.weisse.as_ref().ok_or_else(missing)?;
                Ok(Basis::Momentum { sym, weisse })
            },
            Division::Sites(split) => Ok(Basis::Full { split }),
        }
    }

    /// Enumerate and classify the sublattice orbits. Without translation
    /// symmetry there is nothing to classify and only the stage advances.
    pub fn build_orbits(&mut self) -> ModelResult<()> {
        self.require("build_orbits", Stage::LatticeBound)?;
        let geo = self.geometry.as_ref()
            .ok_or_else(|| self.wrong_stage("build_orbits", Stage::LatticeBound))?;
        let orbits
            = match &geo.division {
                Division::Halves { zp, sub_group } => {
                    let orbits = SubOrbits::build(&zp.sub, sub_group)?;
                    log::debug!(
                        "sublattice stabilizer periods: {:?}",
                        orbits.groups.iter()
                            .map(|g| g.divisors(sub_group, &zp.split.lattice))
                            .collect::<Vec<_>>(),
                    );
                    Some(orbits)
                },
                Division::Sites(_) => None,
            };
        self.invalidate(Stage::OrbitsBuilt);
        self.orbits = orbits;
        self.stage = Stage::OrbitsBuilt;
        Ok(())
    }

    /// Build the sublattice orbits (if needed) and the Weisse tables. Without
    /// translation symmetry no tables are needed and only the stage advances.
    pub fn build_weisse(&mut self) -> ModelResult<()> {
        self.require("build_weisse", Stage::LatticeBound)?;
        if self.stage < Stage::OrbitsBuilt { self.build_orbits()?; }
        let tables
            = match self.geometry.as_ref().map(|geo| &geo.division) {
                Some(Division::Sites(_)) => None,
                _ => Some(WeisseTables::build(&self.symmetry("build_weisse")?, &self.pool)?),
            };
        self.invalidate(Stage::WeisseBuilt);
        self.weisse = tables;
        self.stage = Stage::WeisseBuilt;
        Ok(())
    }

    /// Enumerate the representatives of momentum `momentum` (one integer per
    /// lattice dimension, taken modulo its extent and ignored along
    /// dimensions without translation symmetry) with conserved diagonal
    /// observables `Q_m = q_m`.
    pub fn enumerate_sector(&mut self, momentum: &[i64], conserved: &[(MOpr<T>, f64)])
        -> ModelResult<&Sector>
    {
        self.require("enumerate_sector", Stage::WeisseBuilt)?;
        let basis = self.basis("enumerate_sector")?;
        let group = self.translations()
            .ok_or_else(|| self.wrong_stage("enumerate_sector", Stage::WeisseBuilt))?;
        let dim = group.extents().len();
        if momentum.len() != dim {
            return Err(MomentumLength { expected: dim, found: momentum.len() });
        }
        for (m, (q, _)) in conserved.iter().enumerate() {
            self.check_operator(q)?;
            if !q.is_diagonal() { return Err(NonDiagonalConserved(m)); }
        }
        let k = group.normalize_momentum(momentum);
        if !T::IS_COMPLEX && !group.momentum_is_real(&k) {
            return Err(ComplexPhases(group.fmt_momentum(&k)));
        }
        let tol = &self.config.tol;
        let sector
            = match basis {
                Basis::Momentum { sym, weisse } => Sector::enumerate(
                    &sym, weisse, &k, conserved, tol.q_match, tol.lanczos, &self.pool,
                )?,
                Basis::Full { split } => Sector::full(
                    split, &k, conserved, tol.q_match, tol.lanczos, &self.pool,
                )?,
            };
        let max = self.config.index_width.max_dim();
        if sector.dim_repr() > max {
            return Err(IndexOverflow { dim: sector.dim_repr(), max });
        }
        if sector.dim_repr() == 0 {
            log::info!("sector k = {} is empty", group.fmt_momentum(&k));
        } else {
            log::debug!(
                "first representative of k = {}: [{}]",
                group.fmt_momentum(&k),
                sector.state(0).fmt_states(basis.props()),
            );
        }
        self.invalidate(Stage::SectorEnumerated);
        self.stage = Stage::SectorEnumerated;
        Ok(self.sector.insert(sector))
    }

    /// The Hamiltonian restricted to the current sector.
    pub fn hamiltonian(&self) -> ModelResult<SectorHamiltonian<'_, T>> {
        let basis = self.basis("hamiltonian")?;
        let sector = self.sector.as_ref()
            .ok_or_else(|| self.wrong_stage("hamiltonian", Stage::SectorEnumerated))?;
        Ok(SectorHamiltonian {
            basis,
            sector,
            h_diag: &self.h_diag,
            h_off: &self.h_off,
            eps: self.config.tol.opr,
        })
    }

    /// Assemble the sector matrix in CSR form, optionally storing only the
    /// upper triangle.
    pub fn assemble(&mut self, upper: bool) -> ModelResult<&CsrMatrix<T>> {
        self.require("assemble", Stage::SectorEnumerated)?;
        let t0 = Instant::now();
        let mat = self.hamiltonian()?.assemble(upper, &self.pool)?;
        if mat.nrows() == 0 {
            log::info!("sector is empty; assembled an empty matrix");
        } else {
            log::info!(
                "assembled {}x{} matrix with {} stored entries in {:.3?}",
                mat.nrows(), mat.nrows(), mat.nnz(), t0.elapsed(),
            );
        }
        self.invalidate(Stage::MatrixReady);
        self.stage = Stage::MatrixReady;
        Ok(self.csr.insert(mat))
    }

    /// Use matrix-free multiplication in the eigensolver.
    pub fn enable_matrix_free(&mut self) -> ModelResult<()> {
        self.require("enable_matrix_free", Stage::SectorEnumerated)?;
        self.invalidate(Stage::MatrixReady);
        self.stage = Stage::MatrixReady;
        Ok(())
    }

    /// Compute `y = H x` in the current sector, through the assembled matrix
    /// if there is one.
    pub fn multiply(&self, x: &[T], y: &mut [T]) -> ModelResult<()> {
        self.require("multiply", Stage::SectorEnumerated)?;
        let dim = self.dim_repr();
        if x.len() != dim {
            return Err(VectorLength { expected: dim, found: x.len() });
        }
        if y.len() != dim {
            return Err(VectorLength { expected: dim, found: y.len() });
        }
        match &self.csr {
            Some(mat) => { mat.multiply(x, y); },
            None => { self.hamiltonian()?.multiply(x, y, &self.pool)?; },
        }
        Ok(())
    }

    /// Compute the `nev` lowest eigenpairs of the current sector. `maxit = 0`
    /// selects `nev` times the configured iteration factor.
    pub fn ground_state(&mut self, nev: usize, ncv: usize, maxit: usize)
        -> ModelResult<&Spectrum<T>>
    {
        self.solve(Which::Smallest, nev, ncv, maxit)
    }

    /// Compute the `nev` highest eigenpairs of the current sector.
    pub fn highest_state(&mut self, nev: usize, ncv: usize, maxit: usize)
        -> ModelResult<&Spectrum<T>>
    {
        self.solve(Which::Largest, nev, ncv, maxit)
    }

    fn start_vector(&self, sector: &Sector) -> Vec<T> {
        let mut rng
            = self.config.seed
            .map(StdRng::seed_from_u64)
            .unwrap_or_else(StdRng::from_entropy);
        let normal = Normal::standard();
        (0..sector.dim_repr())
            .map(|i| {
                let re = normal.sample(&mut rng);
                let im = if T::IS_COMPLEX { normal.sample(&mut rng) } else { 0.0 };
                if sector.is_fake(i) {
                    T::zero()
                } else {
                    T::from_c64(C64::new(re, im))
                }
            })
            .collect()
    }

    fn solve(&mut self, which: Which, nev: usize, ncv: usize, maxit: usize)
        -> ModelResult<&Spectrum<T>>
    {
        self.require("solve", Stage::MatrixReady)?;
        if self.dim_physical() == 0 {
            log::info!("sector has no physical states; nothing to solve");
            self.stage = Stage::Spectrum;
            return Ok(self.spectrum.insert(Spectrum::empty(which)));
        }
        let maxit
            = if maxit == 0 { nev * self.config.tol.maxit_factor } else { maxit };
        let t0 = Instant::now();
        let spec: Spectrum<T>
            = {
                let ham = self.hamiltonian()?;
                let v0 = self.start_vector(ham.sector);
                let pool = self.pool;
                let apply
                    = move |x: &[T], y: &mut [T]| ham.multiply(x, y, &pool);
                let op: LinearOp<'_, T>
                    = match &self.csr {
                        Some(mat) => LinearOp::Csr(mat),
                        None => LinearOp::Callback(&apply),
                    };
                lanczos::eigsolve(
                    &op,
                    ham.dim(),
                    nev,
                    ncv,
                    maxit,
                    which,
                    self.config.tol.lanczos,
                    &v0,
                )?
            };
        log::info!(
            "eigensolver ({:?}) converged {} of {} pairs in {:.3?}",
            which, spec.nconv, nev, t0.elapsed(),
        );
        if spec.nconv == 0 {
            return Err(NotConverged { nconv: 0, required: 1 });
        }
        self.stage = Stage::Spectrum;
        Ok(self.spectrum.insert(spec))
    }

    /// Expand eigenvector `col` of the current spectrum into the full product
    /// basis.
    pub fn eigenvector_full(&self, col: usize) -> ModelResult<HashMap<MBasis, T>> {
        self.require("eigenvector_full", Stage::Spectrum)?;
        let spec = self.spectrum.as_ref()
            .ok_or_else(|| self.wrong_stage("eigenvector_full", Stage::Spectrum))?;
        let v = spec.eigenvectors.get(col)
            .ok_or(ColumnOutOfRange { col, nconv: spec.nconv })?;
        let ham = self.hamiltonian()?;
        let sector = ham.sector;
        let mut psi: HashMap<MBasis, T> = HashMap::default();
        let sym
            = match ham.basis {
                Basis::Momentum { sym, .. } => sym,
                Basis::Full { .. } => {
                    for (i, &vi) in v.iter().enumerate() {
                        if vi.modulus() == 0.0 { continue; }
                        psi.insert(sector.state(i).clone(), vi);
                    }
                    psi.retain(|_, a| a.modulus() > self.config.tol.machine);
                    return Ok(psi);
                },
            };
        let props = &sym.zp.parent;
        let group = sym.group;
        let order = group.len() as f64;
        for (i, &vi) in v.iter().enumerate() {
            if sector.is_fake(i) || vi.modulus() == 0.0 { continue; }
            let scale = vi * T::from_re((order * sector.norm(i)).sqrt().recip());
            for t in 0..group.len() {
                let mut c = sector.state(i).clone();
                let odd = c.translate(props, group.perm(t));
                let phase
                    = T::from_phase(-group.phase_angle(t, sector.momentum()));
                let amp = if odd { -(scale * phase) } else { scale * phase };
                *psi.entry(c).or_insert_with(T::zero) += amp;
            }
        }
        psi.retain(|_, a| a.modulus() > self.config.tol.machine);
        Ok(psi)
    }

    fn apply_full(&self, op: &MOpr<T>, psi: &HashMap<MBasis, T>)
        -> HashMap<MBasis, T>
    {
        let mut out: HashMap<MBasis, T> = HashMap::default();
        for (c, &a) in psi.iter() {
            for (c2, x) in mbasis::opr_x_phi(op, c, &self.props, self.config.tol.opr) {
                *out.entry(c2).or_insert_with(T::zero) += x * a;
            }
        }
        out
    }

    /// `⟨ψ|O|ψ⟩` for eigenvector `col` of the current spectrum.
    pub fn measure<O>(&self, op: O, col: usize) -> ModelResult<T>
    where O: Into<MOpr<T>>
    {
        let op: MOpr<T> = op.into();
        self.check_operator(&op)?;
        let psi = self.eigenvector_full(col)?;
        let o_psi = self.apply_full(&op, &psi);
        Ok(overlap(&psi, &o_psi))
    }

    /// `⟨O_1 ψ|O_2 ψ⟩` for eigenvector `col` of the current spectrum; equal to
    /// `⟨ψ|O_1† O_2|ψ⟩`.
    pub fn measure2<O1, O2>(&self, op1: O1, op2: O2, col: usize) -> ModelResult<T>
    where
        O1: Into<MOpr<T>>,
        O2: Into<MOpr<T>>,
    {
        let op1: MOpr<T> = op1.into();
        let op2: MOpr<T> = op2.into();
        self.check_operator(&op1)?;
        self.check_operator(&op2)?;
        let psi = self.eigenvector_full(col)?;
        let a = self.apply_full(&op1, &psi);
        let b = self.apply_full(&op2, &psi);
        Ok(overlap(&a, &b))
    }
}

// ⟨a|b⟩ for sparse vectors
fn overlap<T>(a: &HashMap<MBasis, T>, b: &HashMap<MBasis, T>) -> T
where T: Scalar
{
    b.iter()
        .filter_map(|(c, &bc)| a.get(c).map(|&ac| ac.conj() * bc))
        .fold(T::zero(), |acc, x| acc + x)
}
