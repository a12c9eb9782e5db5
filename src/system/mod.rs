//! System-level utilities: path resolution and environment overrides

pub mod paths;

pub use paths::{describe_paths, igblast_home, igblast_install_dir, is_custom_home};
