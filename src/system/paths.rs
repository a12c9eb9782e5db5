use std::path::PathBuf;
use std::sync::OnceLock;

// Cache the paths to avoid repeated environment lookups
static IGBLAST_HOME: OnceLock<PathBuf> = OnceLock::new();
static IGBLAST_INSTALL_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Get the igblast home directory
/// Checks IGBLAST_HOME environment variable, falls back to ${HOME}/.igblast
pub fn igblast_home() -> PathBuf {
    IGBLAST_HOME
        .get_or_init(|| {
            if let Ok(path) = std::env::var("IGBLAST_HOME") {
                PathBuf::from(path)
            } else {
                let home = std::env::var("HOME").unwrap_or_else(|_| {
                    std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string())
                });
                PathBuf::from(home).join(".igblast")
            }
        })
        .clone()
}

/// Get the directory holding managed IgBLAST installations
/// Checks IGBLAST_INSTALL_DIR environment variable, falls back to IGBLAST_HOME/igblast
pub fn igblast_install_dir() -> PathBuf {
    IGBLAST_INSTALL_DIR
        .get_or_init(|| {
            if let Ok(path) = std::env::var("IGBLAST_INSTALL_DIR") {
                PathBuf::from(path)
            } else {
                igblast_home().join("igblast")
            }
        })
        .clone()
}

/// Check if running with a custom home or install directory
pub fn is_custom_home() -> bool {
    std::env::var("IGBLAST_HOME").is_ok() || std::env::var("IGBLAST_INSTALL_DIR").is_ok()
}

/// Get a human-readable description of the current path configuration
pub fn describe_paths() -> String {
    format!(
        "IgBLAST Paths:\n  \
        Home: {}\n  \
        Installs: {}\n  \
        Custom: {}",
        igblast_home().display(),
        igblast_install_dir().display(),
        if is_custom_home() {
            "Yes"
        } else {
            "No (using defaults)"
        }
    )
}
