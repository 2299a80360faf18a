//! Configuration management for the calculations.
//!
//! All knobs come in through an explicit YAML file (plus command-line
//! overrides); nothing is read from ambient global state. Missing keys fall
//! back to the documented defaults.

mod args;

pub use args::Args;

use serde::{Deserialize, Serialize};

use crate::displace::DisplacementSettings;
use crate::scf_impl::ScfOptions;

/// Top-level configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// XYZ-format geometry text (count line, units/comment line, atoms).
    pub molecule: String,
    /// Named orbital basis set, e.g. `sto-3g`.
    pub basis: String,
    pub charge: Option<i32>,
    pub method: Option<Method>,
    pub scf: Option<ScfParams>,
    pub mp2: Option<Mp2Params>,
    pub displacements: Option<DisplacementParams>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Rhf,
    Uhf,
}

/// SCF iteration settings.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ScfParams {
    pub max_iter: Option<usize>,
    pub diis: Option<bool>,
    pub diis_nvector: Option<usize>,
    pub diis_start: Option<usize>,
    pub e_convergence: Option<f64>,
}

/// Perturbative correction settings.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Mp2Params {
    pub enabled: Option<bool>,
    /// Eigenvalue cutoff for the density-fitted integral path; unset runs
    /// the direct path only.
    pub fit_threshold: Option<f64>,
}

/// Finite-difference displacement grid settings.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct DisplacementParams {
    pub enabled: Option<bool>,
    pub disp_size: Option<f64>,
    pub directory: Option<String>,
    /// Reference input copied into every displacement directory; the
    /// configuration file itself when unset.
    pub template_file: Option<String>,
}

impl Config {
    pub fn charge(&self) -> i32 {
        self.charge.unwrap_or(0)
    }

    pub fn method(&self) -> Method {
        self.method.unwrap_or(Method::Uhf)
    }

    /// SCF options with every missing key defaulted.
    pub fn scf_options(&self) -> ScfOptions {
        let defaults = ScfOptions::default();
        match &self.scf {
            Some(params) => ScfOptions {
                max_iter: params.max_iter.unwrap_or(defaults.max_iter),
                e_convergence: params.e_convergence.unwrap_or(defaults.e_convergence),
                diis: params.diis.unwrap_or(defaults.diis),
                diis_nvector: params.diis_nvector.unwrap_or(defaults.diis_nvector),
                diis_start: params.diis_start.unwrap_or(defaults.diis_start),
            },
            None => defaults,
        }
    }

    pub fn is_mp2_enabled(&self) -> bool {
        self.mp2.as_ref().and_then(|m| m.enabled).unwrap_or(false)
    }

    pub fn mp2_fit_threshold(&self) -> Option<f64> {
        self.mp2.as_ref().and_then(|m| m.fit_threshold)
    }

    pub fn displacements_enabled(&self) -> bool {
        self.displacements
            .as_ref()
            .and_then(|d| d.enabled)
            .unwrap_or(false)
    }

    pub fn displacement_settings(&self) -> DisplacementSettings {
        let defaults = DisplacementSettings::default();
        match &self.displacements {
            Some(params) => DisplacementSettings {
                disp_size: params.disp_size.unwrap_or(defaults.disp_size),
                directory: params
                    .directory
                    .clone()
                    .unwrap_or(defaults.directory),
            },
            None => defaults,
        }
    }

    pub fn displacement_template(&self) -> Option<&str> {
        self.displacements
            .as_ref()
            .and_then(|d| d.template_file.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_the_documented_defaults() {
        let config: Config =
            serde_yml::from_str("molecule: |\n  1\n  Bohr\n  H 0 0 0\nbasis: sto-3g\n").unwrap();
        let options = config.scf_options();
        assert_eq!(options.max_iter, 50);
        assert!(options.diis);
        assert_eq!(options.diis_nvector, 6);
        assert_eq!(options.diis_start, 6);
        assert_eq!(options.e_convergence, 1e-10);
        assert_eq!(config.charge(), 0);
        assert_eq!(config.method(), Method::Uhf);
        assert!(!config.is_mp2_enabled());
        assert!(!config.displacements_enabled());
    }

    #[test]
    fn explicit_keys_override_defaults() {
        let text = "\
molecule: |
  1
  Bohr
  H 0 0 0
basis: sto-3g
charge: 1
method: rhf
scf:
  max_iter: 200
  diis: false
mp2:
  enabled: true
  fit_threshold: 1.0e-8
displacements:
  enabled: true
  disp_size: 0.01
  directory: GRID
";
        let config: Config = serde_yml::from_str(text).unwrap();
        assert_eq!(config.charge(), 1);
        assert_eq!(config.method(), Method::Rhf);
        let options = config.scf_options();
        assert_eq!(options.max_iter, 200);
        assert!(!options.diis);
        assert_eq!(options.diis_nvector, 6);
        assert!(config.is_mp2_enabled());
        assert_eq!(config.mp2_fit_threshold(), Some(1e-8));
        let settings = config.displacement_settings();
        assert_eq!(settings.disp_size, 0.01);
        assert_eq!(settings.directory, "GRID");
    }
}
