// Main library file for SCF calculations

pub mod config;
pub mod displace;
pub mod io;
pub mod molecule;
pub mod mp2_impl;
pub mod scf_impl;
pub mod spin;
