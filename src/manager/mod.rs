//! Installation management for the IgBLAST distribution

pub mod installer;

pub use installer::{is_igblast_installed, IgBlastInstaller, InstallInfo};
