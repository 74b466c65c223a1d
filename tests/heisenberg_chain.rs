use num_complex::Complex64 as C64;
use rustc_hash::FxHashSet as HashSet;
use lattice_ed::{
    Scalar,
    config::{ EdConfig, PINNED_DIAGONAL },
    lattice::{ Boundary, Lattice },
    local,
    mbasis::{ MBasis, Orbital, SiteProps },
    model::{ Engine, Stage },
    opr::MOpr,
};

const L: usize = 8;
const E0: f64 = -3.651093408937;

fn bond<T>(i: usize, j: usize) -> MOpr<T>
where T: Scalar
{
    let half = T::from_re(0.5);
    local::sz::<T>(i, 0) * local::sz(j, 0)
        + (local::splus::<T>(i, 0) * local::sminus(j, 0)).scale(half)
        + (local::sminus::<T>(i, 0) * local::splus(j, 0)).scale(half)
}

fn chain<T>(config: EdConfig) -> Engine<T>
where T: Scalar
{
    let props = SiteProps::new(L).with_orbital(Orbital::spin_half());
    let mut engine: Engine<T> = Engine::new(props, config);
    for i in 0..L {
        engine.add_hamiltonian(bond::<T>(i, (i + 1) % L)).unwrap();
    }
    engine.bind_lattice(Lattice::chain(L, Boundary::Pbc).unwrap()).unwrap();
    engine.build_weisse().unwrap();
    engine
}

fn sz_zero<T>() -> [(MOpr<T>, f64); 1]
where T: Scalar
{
    [(local::sz_total(L, 0), 0.0)]
}

fn config() -> EdConfig { EdConfig::default().with_threads(4).with_seed(10546) }

#[test]
fn ground_state_zero_momentum() {
    let mut engine: Engine<f64> = chain(config());
    let sector = engine.enumerate_sector(&[0], &sz_zero()).unwrap();
    assert_eq!(sector.dim_repr(), 10);
    assert_eq!(sector.dim_physical(), 10);
    engine.assemble(false).unwrap();
    let spec = engine.ground_state(2, 10, 0).unwrap();
    assert_eq!(spec.nconv, 2);
    assert!((spec.eigenvalues[0] - E0).abs() < 1e-8);
    assert!(spec.gap().unwrap() > 1e-3);
}

#[test]
fn rebuilt_tables_are_identical() {
    let mut engine: Engine<f64> = chain(config());
    let first = engine.weisse().unwrap().clone();
    engine.enumerate_sector(&[0], &sz_zero()).unwrap();
    engine.build_weisse().unwrap();
    assert_eq!(engine.stage(), Stage::WeisseBuilt);
    assert!(engine.sector().is_none());
    assert_eq!(engine.weisse().unwrap(), &first);
}

#[test]
fn fake_rows_are_pinned() {
    let mut engine: Engine<C64> = chain(config());
    let sector = engine.enumerate_sector(&[1], &sz_zero()).unwrap().clone();
    assert!(sector.dim_physical() < sector.dim_repr());
    let mat = engine.assemble(false).unwrap();
    assert!(mat.hermiticity_error() < 1e-12);
    let dim = sector.dim_repr();
    for i in (0..dim).filter(|&i| sector.is_fake(i)) {
        assert_eq!(mat.get(i, i), C64::from(PINNED_DIAGONAL));
        for j in (0..dim).filter(|&j| j != i) {
            assert_eq!(mat.get(i, j), C64::from(0.0));
            assert_eq!(mat.get(j, i), C64::from(0.0));
        }
    }
    // the eigensolver never sees the pinned value
    engine.enable_matrix_free().unwrap();
    let spec = engine.highest_state(1, 8, 0).unwrap();
    assert!(spec.eigenvalues[0] < 0.25 * L as f64 + 1e-8);
}

#[test]
fn storage_modes_agree() {
    let mut engine: Engine<C64> = chain(config());
    engine.enumerate_sector(&[0], &sz_zero()).unwrap();

    engine.assemble(true).unwrap();
    let e_upper = engine.ground_state(1, 10, 0).unwrap().eigenvalues[0];

    engine.enable_matrix_free().unwrap();
    assert!(engine.csr().is_none());
    assert_eq!(engine.stage(), Stage::MatrixReady);
    let e_free = engine.ground_state(1, 10, 0).unwrap().eigenvalues[0];

    assert!((e_upper - E0).abs() < 1e-8);
    assert!((e_free - E0).abs() < 1e-8);

    // engine.multiply goes through the matrix-free path without a stored matrix
    let dim = engine.dim_repr();
    let x: Vec<C64>
        = (0..dim).map(|i| C64::new(1.0 / (1.0 + i as f64), 0.25 * i as f64)).collect();
    let mut y_free = vec![C64::from(0.0); dim];
    engine.multiply(&x, &mut y_free).unwrap();
    engine.assemble(false).unwrap();
    let mut y_csr = vec![C64::from(0.0); dim];
    engine.multiply(&x, &mut y_csr).unwrap();
    for (a, b) in y_free.iter().zip(&y_csr) {
        assert!((a - b).norm() < 1e-12);
    }
}

#[test]
fn momentum_blocks_reproduce_full_spectrum() {
    // every momentum block together, with fakes removed, carries the spectrum
    // of the full Sz = 0 space
    let mut engine: Engine<C64> = chain(config());
    let mut blocks: Vec<f64> = Vec::new();
    let mut total: usize = 0;
    let mut trace = C64::from(0.0);
    for k in 0..L as i64 {
        engine.enumerate_sector(&[k], &sz_zero()).unwrap();
        total += engine.dim_physical();
        let sector = engine.sector().unwrap().clone();
        let dense = engine.assemble(false).unwrap().to_dense();
        for i in (0..sector.dim_repr()).filter(|&i| !sector.is_fake(i)) {
            trace += dense[(i, i)];
        }
        blocks.extend(
            dense.symmetric_eigen().eigenvalues.iter().copied().filter(|&e| e < 50.0)
        );
    }
    assert_eq!(total, 70);
    assert!((trace - C64::from(-20.0)).norm() < 1e-10);

    let mut full: Engine<f64> = chain(config().without_translations());
    let sector = full.enumerate_sector(&[0], &sz_zero()).unwrap();
    assert_eq!(sector.dim_repr(), 70);
    assert_eq!(sector.dim_physical(), 70);
    let dense = full.assemble(false).unwrap().to_dense();
    let mut reference: Vec<f64> = dense.symmetric_eigen().eigenvalues.iter().copied().collect();
    reference.sort_by(f64::total_cmp);
    blocks.sort_by(f64::total_cmp);
    assert_eq!(blocks.len(), 70);
    for (a, b) in blocks.iter().zip(&reference) {
        assert!((a - b).abs() < 1e-10);
    }
    assert!((reference[0] - E0).abs() < 1e-10);
}

#[test]
fn nonzero_momenta_lie_above() {
    let mut engine: Engine<C64> = chain(config());
    for k in 1..L as i64 {
        engine.enumerate_sector(&[k], &sz_zero()).unwrap();
        if k == 1 || k == 3 || k == 5 || k == 7 {
            assert_eq!(engine.dim_physical(), 8);
        }
        engine.enable_matrix_free().unwrap();
        let e = engine.ground_state(1, 10, 0).unwrap().eigenvalues[0];
        assert!(e > E0 + 1e-3);
    }
}

#[test]
fn translations_disabled() {
    let mut engine: Engine<f64> = chain(config().without_translations());
    assert_eq!(engine.translations().unwrap().len(), 1);
    let sector = engine.enumerate_sector(&[0], &sz_zero()).unwrap();
    assert_eq!(sector.dim_repr(), 70);
    engine.enable_matrix_free().unwrap();
    let e = engine.ground_state(1, 20, 0).unwrap().eigenvalues[0];
    assert!((e - E0).abs() < 1e-8);
}

#[test]
fn highest_state_is_ferromagnetic() {
    let mut engine: Engine<f64> = chain(config());
    engine.enumerate_sector(&[0], &sz_zero()).unwrap();
    engine.assemble(false).unwrap();
    let spec = engine.highest_state(1, 10, 0).unwrap();
    assert!((spec.eigenvalues[0] - 0.25 * L as f64).abs() < 1e-8);
}

#[test]
fn seeded_runs_are_reproducible() {
    let run = || {
        let mut engine: Engine<C64> = chain(config());
        engine.enumerate_sector(&[2], &sz_zero()).unwrap();
        engine.enable_matrix_free().unwrap();
        engine.ground_state(2, 10, 0).unwrap().clone()
    };
    let a = run();
    let b = run();
    assert_eq!(a.eigenvalues, b.eigenvalues);
    assert_eq!(a.eigenvectors, b.eigenvectors);
}

#[test]
fn ground_state_correlations() {
    let mut engine: Engine<f64> = chain(config());
    engine.enumerate_sector(&[0], &sz_zero()).unwrap();
    engine.assemble(false).unwrap();
    engine.ground_state(1, 10, 0).unwrap();

    let props = engine.props().clone();
    let psi = engine.eigenvector_full(0).unwrap();
    let nrm: f64 = psi.values().map(|a| a * a).sum();
    assert!((nrm - 1.0).abs() < 1e-10);
    let sz_tot: MOpr<f64> = local::sz_total(L, 0);
    assert!(psi.keys().all(|c| c.diagonal_operator(&props, &sz_tot).abs() < 1e-12));

    let zz = engine.measure(local::sz::<f64>(0, 0) * local::sz(1, 0), 0).unwrap();
    assert!((zz - E0 / 24.0).abs() < 1e-7);
    let zz2 = engine.measure2(local::sz::<f64>(0, 0), local::sz::<f64>(1, 0), 0).unwrap();
    assert!((zz2 - zz).abs() < 1e-10);
    // translation invariance
    let zz_far = engine.measure(local::sz::<f64>(5, 0) * local::sz(6, 0), 0).unwrap();
    assert!((zz_far - zz).abs() < 1e-10);
    let energy = engine.measure(bond::<f64>(3, 4), 0).unwrap();
    assert!((energy - E0 / L as f64).abs() < 1e-7);
    assert!(engine.measure(local::sz::<f64>(2, 0), 0).unwrap().abs() < 1e-10);
    assert!(engine.measure(local::sz::<f64>(0, 0), 1).is_err());
}

#[test]
fn orbits_partition_filtered_basis() {
    // orbit walking from every representative covers each Sz = 0 configuration
    // exactly once
    let mut engine: Engine<f64> = chain(config());
    let props = engine.props().clone();
    let sz_tot: MOpr<f64> = local::sz_total(L, 0);
    let filtered: HashSet<MBasis>
        = (0..1_u64 << L)
        .map(|label| MBasis::from_label(&props, label))
        .filter(|c| c.diagonal_operator(&props, &sz_tot).abs() < 1e-12)
        .collect();
    assert_eq!(filtered.len(), 70);

    engine.enumerate_sector(&[0], &sz_zero()).unwrap();
    let group = engine.translations().unwrap().clone();
    let mut seen: HashSet<MBasis> = HashSet::default();
    let mut covered: usize = 0;
    for r in engine.sector().unwrap().basis() {
        let orbit: HashSet<MBasis>
            = (0..group.len())
            .map(|t| {
                let mut c = r.clone();
                c.translate(&props, group.perm(t));
                c
            })
            .collect();
        for c in orbit.into_iter() {
            assert!(filtered.contains(&c));
            assert!(seen.insert(c));
            covered += 1;
        }
    }
    assert_eq!(covered, 70);
}
