//! Output formatting and logging utilities.

use color_eyre::eyre::Result;
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::time::SystemTime;
use tracing::info;
use tracing_subscriber::{
    fmt::format::Writer, fmt::layer, fmt::time::FormatTime, layer::SubscriberExt,
    util::SubscriberInitExt, Registry,
};

use crate::scf_impl::{EnergyReport, IterationRecord};

/// Custom time formatter that shows only seconds
struct SecondPrecisionTimer;

impl FormatTime for SecondPrecisionTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        let duration = SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();

        let total_seconds = duration.as_secs();
        let hours = (total_seconds / 3600) % 24;
        let minutes = (total_seconds / 60) % 60;
        let seconds = total_seconds % 60;

        write!(w, "{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}

/// Route tracing output to a file, or to stdout when no path is given.
pub fn setup_output(output_path: Option<&String>) {
    match output_path {
        Some(path) => {
            if let Ok(log) = File::create(path) {
                let file_layer = layer()
                    .with_writer(std::sync::Arc::new(log))
                    .with_timer(SecondPrecisionTimer)
                    .with_ansi(false);
                Registry::default().with(file_layer).init();
                info!("Output will be written to: {}", path);
            } else {
                eprintln!("Could not create output file: {}", path);
            }
        }
        None => {
            let stdout_layer = layer()
                .with_writer(std::io::stdout)
                .with_timer(SecondPrecisionTimer)
                .with_ansi(true);
            Registry::default().with(stdout_layer).init();
        }
    }
}

/// Final energy line with fixed-point formatting for reproducibility checks.
pub fn write_energy_report<W: Write>(
    writer: &mut W,
    label: &str,
    report: &EnergyReport,
) -> Result<()> {
    let status = if report.converged {
        "converged"
    } else {
        "NOT converged"
    };
    writeln!(
        writer,
        "@{} total energy: {:18.10} au  ({} after {} iterations)",
        label, report.energy, status, report.iterations
    )?;
    Ok(())
}

/// Plain-text dump of the iteration diagnostics an SCF run retained.
pub fn write_convergence_trace<W: Write>(
    writer: &mut W,
    label: &str,
    trace: &[IterationRecord],
) -> Result<()> {
    writeln!(writer, "# {}  iter        energy              dE        |dD|", label)?;
    for record in trace {
        writeln!(
            writer,
            "{:6} {:20.10} {:12.3e} {:12.3e}",
            record.iteration, record.energy, record.delta_e, record.density_change
        )?;
    }
    Ok(())
}
