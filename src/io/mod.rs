//! Input/output: logging setup and result reporting.

mod output;

pub use output::{setup_output, write_convergence_trace, write_energy_report};
