//! Command-line driver: YAML configuration in, mean-field (and perturbative)
//! energies out.

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::info;

use hartree::config::{Args, Config, Method};
use hartree::displace;
use hartree::io::{setup_output, write_convergence_trace, write_energy_report};
use hartree::molecule::Molecule;
use hartree::mp2_impl::Ump2;
use hartree::scf_impl::{Rhf, Scf, Uhf};

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    setup_output(args.output.as_ref());

    info!("Reading configuration from: {}", args.config_file);
    let config_content = fs::read_to_string(&args.config_file)
        .wrap_err_with(|| format!("unable to read configuration file: {}", args.config_file))?;
    let config: Config =
        serde_yml::from_str(&config_content).wrap_err("failed to parse configuration file")?;

    let mut molecule =
        Molecule::parse(&config.molecule).wrap_err("failed to parse the molecule geometry")?;
    molecule.to_bohr();

    let charge = args.charge.unwrap_or_else(|| config.charge());
    let n_electrons = molecule.n_electrons(charge)?;
    info!(
        "{}: {} atoms, {} electrons (charge {}), basis {}",
        molecule.formula(),
        molecule.natom(),
        n_electrons,
        charge,
        config.basis
    );

    if args.displacements || config.displacements_enabled() {
        let settings = config.displacement_settings();
        let template = match config.displacement_template() {
            Some(path) => fs::read_to_string(path)
                .wrap_err_with(|| format!("unable to read displacement template: {}", path))?,
            None => config_content.clone(),
        };
        displace::write_displacement_inputs(&molecule, &template, &settings, Path::new("."))?;
    }

    let integrals =
        basis::ao::compute_integrals(&molecule.charges_and_coords(), &config.basis)?;
    let options = scf_options(&config, &args);

    let mut stdout = std::io::stdout().lock();
    match args.method.unwrap_or_else(|| config.method()) {
        Method::Rhf => {
            let mut rhf = Rhf::new(&integrals, n_electrons, options)?;
            let report = rhf.compute_energy();
            write_convergence_trace(&mut stdout, "RHF", &rhf.trace)?;
            write_energy_report(&mut stdout, "RHF", &report)?;
        }
        Method::Uhf => {
            let mut uhf = Uhf::new(&integrals, n_electrons, options);
            let report = uhf.compute_energy();
            write_convergence_trace(&mut stdout, "UHF", &uhf.trace)?;
            write_energy_report(&mut stdout, "UHF", &report)?;

            if config.is_mp2_enabled() {
                let mut ump2 = Ump2::new(&uhf, &integrals);
                let correlation = ump2.correlation();
                let mp2_report = ump2.compute_energy();
                writeln!(stdout, "@UMP2 correlation energy: {:18.10} au", correlation)?;
                write_energy_report(&mut stdout, "UMP2", &mp2_report)?;

                if let Some(threshold) = config.mp2_fit_threshold() {
                    let mut fitted = Ump2::with_fitted(&uhf, &integrals, threshold);
                    let fitted_report = fitted.compute_energy();
                    writeln!(
                        stdout,
                        "@DF-UMP2 correlation energy: {:18.10} au",
                        fitted.correlation()
                    )?;
                    write_energy_report(&mut stdout, "DF-UMP2", &fitted_report)?;
                    writeln!(
                        stdout,
                        "DF energy error: {:.5e} au, integral difference norm: {:.5e}",
                        fitted_report.energy - mp2_report.energy,
                        fitted.gmo().difference_norm(ump2.gmo())
                    )?;
                }
            }
        }
    }

    Ok(())
}

/// Configuration-file SCF options with the command-line overrides applied.
fn scf_options(config: &Config, args: &Args) -> hartree::scf_impl::ScfOptions {
    let mut options = config.scf_options();
    if let Some(max_iter) = args.max_iter {
        options.max_iter = max_iter;
    }
    if args.no_diis {
        options.diis = false;
    }
    options
}
