//! Error types for IgBLAST operations

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for IgBLAST operations
#[derive(Error, Debug)]
pub enum IgBlastError {
    #[error("IgBLAST installation failed: {0}")]
    InstallationFailed(String),

    #[error("IgBLAST is not installed (expected binary at {})", .0.display())]
    NotInstalled(PathBuf),

    #[error("missing input file: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("IgBLAST execution failed with exit code {code}: {stderr}")]
    ToolExecutionFailed { code: i32, stderr: String },
}

/// Result type alias for IgBLAST operations
pub type IgBlastResult<T> = Result<T, IgBlastError>;

// Installer internals build anyhow context chains; they surface as a single
// installation-failure kind carrying the flattened cause.
impl From<anyhow::Error> for IgBlastError {
    fn from(err: anyhow::Error) -> Self {
        IgBlastError::InstallationFailed(format!("{:#}", err))
    }
}
