//! Process-wide numeric knobs and engine configuration.
//!
//! All values are fixed when an [`Engine`][crate::model::Engine] is
//! constructed and never mutated afterwards.

/// Diagonal value assigned to representatives whose momentum projection
/// vanishes.
pub const PINNED_DIAGONAL: f64 = 99.99;

/// Numeric tolerances.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Tolerances {
    /// Threshold below which intermediate amplitudes are considered zero.
    pub machine: f64,
    /// Threshold below which operator-level amplitudes are dropped.
    pub opr: f64,
    /// Eigensolver precision; also the cutoff below which a normalization
    /// factor marks a representative as fake.
    pub lanczos: f64,
    /// Matching tolerance for the eigenvalues of conserved observables.
    pub q_match: f64,
    /// Default maximum number of eigensolver iterations per requested
    /// eigenvalue.
    pub maxit_factor: usize,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            machine: 1e-15,
            opr: 1e-12,
            lanczos: 1e-8,
            q_match: 1e-5,
            maxit_factor: 100,
        }
    }
}

/// Width of the integers used to index basis states.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexWidth {
    /// 32-bit indices.
    U32,
    /// 64-bit indices.
    U64,
}

impl IndexWidth {
    /// Largest representable dimension.
    pub fn max_dim(self) -> usize {
        match self {
            Self::U32 => u32::MAX as usize,
            Self::U64 => u64::MAX as usize,
        }
    }
}

/// Configuration of an [`Engine`][crate::model::Engine].
#[derive(Clone, Debug)]
pub struct EdConfig {
    /// Numeric tolerances.
    pub tol: Tolerances,
    /// Index width; sectors larger than [`IndexWidth::max_dim`] are rejected.
    pub index_width: IndexWidth,
    /// Number of worker threads. Defaults to the number of logical cores.
    pub nthreads: Option<usize>,
    /// Seed for the eigensolver's initial vector. Drawn from entropy if
    /// `None`.
    pub seed: Option<u64>,
    /// Whether to exploit translation symmetry. If `false`, the lattice is
    /// never divided and every sector is the full (filtered) basis.
    pub translations: bool,
}

impl Default for EdConfig {
    fn default() -> Self {
        Self {
            tol: Tolerances::default(),
            index_width: IndexWidth::U32,
            nthreads: None,
            seed: None,
            translations: true,
        }
    }
}

impl EdConfig {
    /// Set the number of worker threads.
    pub fn with_threads(mut self, nthreads: usize) -> Self {
        self.nthreads = Some(nthreads);
        self
    }

    /// Set the eigensolver seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Disable translation symmetry.
    pub fn without_translations(mut self) -> Self {
        self.translations = false;
        self
    }
}
