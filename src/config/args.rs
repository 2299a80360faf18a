//! Command-line argument parsing.

use clap::Parser;

use super::Method;

/// Mean-field and perturbative energies from a YAML configuration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    pub config_file: String,

    /// Override the solver selected in the configuration
    #[arg(long, value_enum)]
    pub method: Option<Method>,

    /// Override the maximum SCF iteration count
    #[arg(long)]
    pub max_iter: Option<usize>,

    /// Disable DIIS extrapolation
    #[arg(long)]
    pub no_diis: bool,

    /// Override the molecular charge
    #[arg(long)]
    pub charge: Option<i32>,

    /// Write log output to a file (default stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Also generate the finite-difference displacement grid
    #[arg(long)]
    pub displacements: bool,
}
