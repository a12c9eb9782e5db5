//! Run IgBLAST analyses on immunoglobulin (Ig) and T-cell receptor (TCR)
//! sequences.
//!
//! This crate provides a convenient interface to install and run IgBLAST,
//! supporting both the IgBLASTn and IgBLASTp variants. It downloads and
//! unpacks the NCBI release archives into a versioned local store, builds
//! typed command-line invocations, executes them as subprocesses, and
//! monitors download progress.
//!
//! ```no_run
//! use igblast::{IgBlastVariant, RunRequest};
//!
//! # #[tokio::main]
//! # async fn main() -> igblast::IgBlastResult<()> {
//! // Install IgBLAST if not already installed
//! if !igblast::is_igblast_installed() {
//!     igblast::install_igblast().await?;
//! }
//!
//! // Run an IgBLASTn analysis
//! let request = RunRequest::new(
//!     IgBlastVariant::Nucleotide,
//!     "query.fasta",
//!     "V.fasta",
//!     "D.fasta",
//!     "J.fasta",
//!     "auxiliary.txt",
//!     "output.tsv",
//! )
//! .with_param("organism", "human")
//! .with_param("domain_system", "imgt");
//!
//! igblast::run_igblast(&request)?;
//! # Ok(())
//! # }
//! ```

// Modules
pub mod download;
pub mod error;
pub mod manager;
pub mod runner;
pub mod system;
pub mod testing;
pub mod types;

// Re-exports for convenience
pub use error::{IgBlastError, IgBlastResult};
pub use manager::{is_igblast_installed, IgBlastInstaller, InstallInfo};
pub use runner::{IgBlastRunner, RunRequest, AIRR_OUTFMT};
pub use types::IgBlastVariant;

use std::path::PathBuf;

/// Version information for the igblast crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the newest IgBLAST release into the default location.
/// Re-invocation when already installed is a no-op.
pub async fn install_igblast() -> IgBlastResult<()> {
    IgBlastInstaller::new().install(None, false).await
}

/// Install a specific IgBLAST release, optionally forcing a re-download
pub async fn install_igblast_with(version: Option<&str>, force: bool) -> IgBlastResult<()> {
    IgBlastInstaller::new().install(version, force).await
}

/// Run IgBLAST for `request`, blocking until the tool exits.
///
/// The binary is resolved from the managed installation first and from
/// `$PATH` second; managed installs also export `IGDATA` so the tool finds
/// its bundled `internal_data`.
pub fn run_igblast(request: &RunRequest) -> IgBlastResult<PathBuf> {
    let installer = IgBlastInstaller::new();

    let (binary_path, igdata) = match installer.binary_path(request.variant) {
        Some(path) => (path, installer.igdata_dir()),
        None => match which::which(request.variant.executable()) {
            Ok(path) => (path, None),
            Err(_) => {
                return Err(IgBlastError::NotInstalled(
                    installer.expected_binary_path(request.variant),
                ))
            }
        },
    };

    let mut runner = IgBlastRunner::new(binary_path)?;
    if let Some(igdata) = igdata {
        runner = runner.with_igdata(igdata);
    }
    runner.run(request)
}
