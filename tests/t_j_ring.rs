use ndarray as nd;
use num_complex::Complex64 as C64;
use lattice_ed::{
    config::EdConfig,
    lattice::{ Boundary, Lattice },
    mbasis::{ Orbital, SiteProps },
    model::Engine,
    opr::{ MOpr, Opr },
};

// local states: 0 = empty, 1 = ↑, 2 = ↓
fn local_op(site: usize, entries: &[(usize, usize, f64)], fermion: bool) -> Opr<C64> {
    let mut mat: nd::Array2<C64> = nd::Array2::zeros((3, 3));
    entries.iter().for_each(|&(i, j, x)| { mat[[i, j]] = C64::from(x); });
    Opr::new(site, 0, fermion, mat)
}

fn cdag(site: usize, s: usize) -> Opr<C64> { local_op(site, &[(s, 0, 1.0)], true) }

fn c(site: usize, s: usize) -> Opr<C64> { local_op(site, &[(0, s, 1.0)], true) }

fn t_j_ring(l: usize, t: f64, j: f64) -> MOpr<C64> {
    let sz = |i: usize| local_op(i, &[(1, 1, 0.5), (2, 2, -0.5)], false);
    let sp = |i: usize| local_op(i, &[(1, 2, 1.0)], false);
    let sm = |i: usize| local_op(i, &[(2, 1, 1.0)], false);
    let n = |i: usize| local_op(i, &[(1, 1, 1.0), (2, 2, 1.0)], false);
    let mut h: MOpr<C64> = MOpr::new();
    for a in 0..l {
        let b = (a + 1) % l;
        for s in [1, 2] {
            h += C64::from(-t) * (cdag(a, s) * c(b, s));
            h += C64::from(-t) * (cdag(b, s) * c(a, s));
        }
        h += C64::from(j) * (sz(a) * sz(b));
        h += C64::from(0.5 * j) * (sp(a) * sm(b));
        h += C64::from(0.5 * j) * (sm(a) * sp(b));
        h += C64::from(-0.25 * j) * (n(a) * n(b));
    }
    h
}

fn counts(l: usize, up: f64, down: f64) -> [(MOpr<C64>, f64); 2] {
    let count = |s: usize| -> MOpr<C64> {
        (0..l).fold(MOpr::new(), |acc, i| acc + local_op(i, &[(s, s, 1.0)], false))
    };
    [(count(1), up), (count(2), down)]
}

fn t_j_engine(l: usize, t: f64, j: f64, config: EdConfig) -> Engine<C64> {
    let props = SiteProps::new(l).with_orbital(Orbital::tj());
    let mut engine: Engine<C64> = Engine::new(props, config);
    engine.add_hamiltonian(t_j_ring(l, t, j)).unwrap();
    engine.bind_lattice(Lattice::chain(l, Boundary::Pbc).unwrap()).unwrap();
    engine.build_weisse().unwrap();
    engine
}

fn sorted_block(engine: &mut Engine<C64>) -> Vec<f64> {
    let dense = engine.assemble(false).unwrap().to_dense();
    let mut evals: Vec<f64>
        = dense.symmetric_eigen().eigenvalues.iter().copied()
        .filter(|&e| e < 50.0)
        .collect();
    evals.sort_by(f64::total_cmp);
    evals
}

#[test]
fn single_electron_disperses() {
    let l = 4;
    let mut engine = t_j_engine(l, 1.0, 0.5, EdConfig::default().with_seed(2));
    assert_eq!(engine.props().local_dim(), 3);
    for k in 0..l {
        let sector = engine.enumerate_sector(&[k as i64], &counts(l, 1.0, 0.0)).unwrap();
        assert_eq!(sector.dim_physical(), 1);
        let evals = sorted_block(&mut engine);
        let eps = -2.0 * (2.0 * std::f64::consts::PI * k as f64 / l as f64).cos();
        assert_eq!(evals.len(), 1);
        assert!((evals[0] - eps).abs() < 1e-10, "k = {}: {} != {}", k, evals[0], eps);
    }
}

#[test]
fn t_j_blocks_reproduce_full_spectrum() {
    let l = 4;
    let (t, j) = (1.0, 0.5);
    let n = counts(l, 1.0, 1.0);
    let mut engine = t_j_engine(l, t, j, EdConfig::default().with_seed(2));
    let mut blocks: Vec<f64> = Vec::new();
    for k in 0..l as i64 {
        engine.enumerate_sector(&[k], &n).unwrap();
        blocks.extend(sorted_block(&mut engine));
    }
    blocks.sort_by(f64::total_cmp);

    let mut full = t_j_engine(l, t, j, EdConfig::default().without_translations());
    // no double occupancy: 4 * 3
    assert_eq!(full.enumerate_sector(&[0], &n).unwrap().dim_repr(), 12);
    let reference = sorted_block(&mut full);
    assert_eq!(blocks.len(), reference.len());
    for (a, b) in blocks.iter().zip(&reference) {
        assert!((a - b).abs() < 1e-10);
    }
}
