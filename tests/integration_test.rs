//! End-to-end tests driving the full pipeline from the example YAML
//! configurations: geometry parsing, integral assembly, SCF, the MP2
//! correction, and the displacement grid.

use approx::assert_relative_eq;
use std::fs;
use std::path::PathBuf;

use hartree::config::Config;
use hartree::displace;
use hartree::molecule::Molecule;
use hartree::mp2_impl::Ump2;
use hartree::scf_impl::{Rhf, Scf, Uhf};

fn example_path(filename: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("example")
        .join(filename)
}

fn load(filename: &str) -> Config {
    let text = fs::read_to_string(example_path(filename)).unwrap();
    serde_yml::from_str(&text).unwrap()
}

/// Geometry, electron count, and integrals for a configuration.
fn setup(config: &Config) -> (Molecule, usize, basis::AoIntegrals) {
    let mut molecule = Molecule::parse(&config.molecule).unwrap();
    molecule.to_bohr();
    let n_electrons = molecule.n_electrons(config.charge()).unwrap();
    let ints =
        basis::ao::compute_integrals(&molecule.charges_and_coords(), &config.basis).unwrap();
    (molecule, n_electrons, ints)
}

#[test]
fn h2_uhf_converges_to_the_reference_energy() {
    let config = load("h2_mp2.yaml");
    let (_, n_electrons, ints) = setup(&config);

    let mut uhf = Uhf::new(&ints, n_electrons, config.scf_options());
    let report = uhf.compute_energy();

    assert!(report.converged);
    assert!(report.iterations <= 50);
    // STO-3G H2 at 1.4 Bohr (Szabo & Ostlund): -1.1167 au.
    assert_relative_eq!(report.energy, -1.1167, epsilon = 2e-3);
}

#[test]
fn uhf_with_and_without_diis_agree_and_match_rhf() {
    let config = load("h2_mp2.yaml");
    let (_, n_electrons, ints) = setup(&config);

    let mut accelerated = Uhf::new(&ints, n_electrons, config.scf_options());
    let with_diis = accelerated.compute_energy();

    let mut plain_options = config.scf_options();
    plain_options.diis = false;
    let mut plain = Uhf::new(&ints, n_electrons, plain_options);
    let without_diis = plain.compute_energy();

    let mut rhf = Rhf::new(&ints, n_electrons, config.scf_options()).unwrap();
    let restricted = rhf.compute_energy();

    assert!(with_diis.converged && without_diis.converged && restricted.converged);
    assert_relative_eq!(with_diis.energy, without_diis.energy, epsilon = 1e-8);
    assert_relative_eq!(with_diis.energy, restricted.energy, epsilon = 1e-8);
}

#[test]
fn h2_ump2_direct_and_fitted_paths_agree() {
    let config = load("h2_mp2.yaml");
    assert!(config.is_mp2_enabled());
    let threshold = config.mp2_fit_threshold().unwrap();
    let (_, n_electrons, ints) = setup(&config);

    let mut uhf = Uhf::new(&ints, n_electrons, config.scf_options());
    assert!(uhf.compute_energy().converged);

    let mut direct = Ump2::new(&uhf, &ints);
    let mut fitted = Ump2::with_fitted(&uhf, &ints, threshold);
    let direct_energy = direct.compute_energy().energy;
    let fitted_energy = fitted.compute_energy().energy;

    assert!(direct_energy < uhf.energy);
    assert!((direct_energy - fitted_energy).abs() < 1e-6);
}

#[test]
fn heh_cation_converges_for_both_solvers() {
    let config = load("heh_cation.yaml");
    let (molecule, n_electrons, ints) = setup(&config);
    assert_eq!(molecule.nuclear_charge(), 3);
    assert_eq!(n_electrons, 2);

    let mut uhf = Uhf::new(&ints, n_electrons, config.scf_options());
    let unrestricted = uhf.compute_energy();
    let mut rhf = Rhf::new(&ints, n_electrons, config.scf_options()).unwrap();
    let restricted = rhf.compute_energy();

    assert!(unrestricted.converged && restricted.converged);
    assert!(unrestricted.energy < 0.0);
    assert_relative_eq!(unrestricted.energy, restricted.energy, epsilon = 1e-8);
}

#[test]
fn displacement_grid_covers_every_coordinate_pair() {
    let config = load("h2_disps.yaml");
    let mut reference = Molecule::parse(&config.molecule).unwrap();
    reference.to_bohr();
    let settings = config.displacement_settings();

    let root = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("h2_grid");
    let _ = fs::remove_dir_all(&root);
    fs::create_dir_all(&root).unwrap();

    let count =
        displace::write_displacement_inputs(&reference, "reference input", &settings, &root)
            .unwrap();
    let ncoord = reference.ncoord();
    assert_eq!(count, ncoord * (ncoord + 1));

    let grid = root.join(&settings.directory);
    assert!(grid.join("molecule.xyz").is_file());

    let mut seen = std::collections::HashSet::new();
    for index in 0..count {
        let dir = grid.join(index.to_string());
        let template = fs::read_to_string(dir.join("input.dat")).unwrap();
        assert_eq!(template, "reference input");

        let text = fs::read_to_string(dir.join("disp.xyz")).unwrap();
        assert!(seen.insert(text.clone()), "duplicate displacement {}", index);

        let displaced = Molecule::parse(&text).unwrap();
        let mut moved = 0;
        for (a, b) in displaced.geom.iter().zip(&reference.geom) {
            for axis in 0..3 {
                let offset = (a[axis] - b[axis]).abs();
                if offset > 1e-12 {
                    assert_relative_eq!(offset, settings.disp_size, epsilon = 1e-9);
                    moved += 1;
                }
            }
        }
        assert!(moved == 1 || moved == 2, "displacement {} moved {} coordinates", index, moved);
    }
}
