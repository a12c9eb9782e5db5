//! Build and execute IgBLAST invocations

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

use crate::error::{IgBlastError, IgBlastResult};
use crate::types::IgBlastVariant;

/// AIRR rearrangement tabular output (the IgBLAST default here)
pub const AIRR_OUTFMT: u32 = 19;

/// Flags owned by the typed request; same-named additional parameters are
/// dropped so no flag appears twice on the assembled command line.
const RESERVED_FLAGS: &[&str] = &[
    "query",
    "germline_db_V",
    "germline_db_D",
    "germline_db_J",
    "auxiliary_data",
    "outfmt",
    "num_threads",
    "out",
];

/// A single IgBLAST invocation: variant, input files, and tool parameters
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub variant: IgBlastVariant,
    pub query_file: PathBuf,
    pub v_database: PathBuf,
    pub d_database: PathBuf,
    pub j_database: PathBuf,
    pub aux_file: PathBuf,
    pub output_file: PathBuf,
    /// Resolved to all available cores at invocation time when unset
    pub num_threads: Option<usize>,
    pub outfmt: u32,
    pub additional_params: BTreeMap<String, String>,
}

impl RunRequest {
    pub fn new(
        variant: IgBlastVariant,
        query_file: impl AsRef<Path>,
        v_database: impl AsRef<Path>,
        d_database: impl AsRef<Path>,
        j_database: impl AsRef<Path>,
        aux_file: impl AsRef<Path>,
        output_file: impl AsRef<Path>,
    ) -> Self {
        Self {
            variant,
            query_file: query_file.as_ref().to_path_buf(),
            v_database: v_database.as_ref().to_path_buf(),
            d_database: d_database.as_ref().to_path_buf(),
            j_database: j_database.as_ref().to_path_buf(),
            aux_file: aux_file.as_ref().to_path_buf(),
            output_file: output_file.as_ref().to_path_buf(),
            num_threads: None,
            outfmt: AIRR_OUTFMT,
            additional_params: BTreeMap::new(),
        }
    }

    /// Set an explicit thread count instead of all available cores
    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }

    /// Select an IgBLAST output format code
    pub fn with_outfmt(mut self, outfmt: u32) -> Self {
        self.outfmt = outfmt;
        self
    }

    /// Add an extra IgBLAST flag, e.g. ("organism", "human").
    /// An empty value emits the flag alone, for boolean switches.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_params.insert(key.into(), value.into());
        self
    }

    /// Add several extra flags at once
    pub fn with_params<K, V, I>(mut self, params: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in params {
            self.additional_params.insert(key.into(), value.into());
        }
        self
    }

    /// Check inputs and parameters; everything here fails before any spawn
    fn validate(&self) -> IgBlastResult<()> {
        for path in [
            &self.query_file,
            &self.v_database,
            &self.d_database,
            &self.j_database,
            &self.aux_file,
        ] {
            if !path.is_file() {
                return Err(IgBlastError::MissingInput(path.clone()));
            }
        }

        if self.num_threads == Some(0) {
            return Err(IgBlastError::InvalidParameter(
                "num_threads must be at least 1".to_string(),
            ));
        }

        for (key, value) in &self.additional_params {
            if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(IgBlastError::InvalidParameter(format!(
                    "flag name {:?} must contain only letters, digits, and underscores",
                    key
                )));
            }
            if value.chars().any(|c| c.is_control()) {
                return Err(IgBlastError::InvalidParameter(format!(
                    "value for -{} contains control characters",
                    key
                )));
            }
        }

        Ok(())
    }

    /// Assemble the full argument list. Explicit flags come first; additional
    /// parameters follow in sorted order, with reserved names dropped.
    fn assemble_args(&self) -> Vec<OsString> {
        let num_threads = self.num_threads.unwrap_or_else(num_cpus::get);

        let mut args: Vec<OsString> = vec![
            "-query".into(),
            self.query_file.as_os_str().into(),
            "-germline_db_V".into(),
            self.v_database.as_os_str().into(),
            "-germline_db_D".into(),
            self.d_database.as_os_str().into(),
            "-germline_db_J".into(),
            self.j_database.as_os_str().into(),
            "-auxiliary_data".into(),
            self.aux_file.as_os_str().into(),
            "-outfmt".into(),
            self.outfmt.to_string().into(),
            "-num_threads".into(),
            num_threads.to_string().into(),
            "-out".into(),
            self.output_file.as_os_str().into(),
        ];

        for (key, value) in &self.additional_params {
            if RESERVED_FLAGS.contains(&key.as_str()) {
                warn!(
                    flag = %key,
                    "ignoring additional parameter shadowed by an explicit flag"
                );
                continue;
            }
            args.push(format!("-{}", key).into());
            if !value.is_empty() {
                args.push(value.as_str().into());
            }
        }

        args
    }
}

/// Executes a resolved IgBLAST binary
pub struct IgBlastRunner {
    binary_path: PathBuf,
    igdata_dir: Option<PathBuf>,
}

impl IgBlastRunner {
    /// Create a runner for a binary that must already exist
    pub fn new(binary_path: PathBuf) -> IgBlastResult<Self> {
        if !binary_path.exists() {
            return Err(IgBlastError::NotInstalled(binary_path));
        }

        Ok(Self {
            binary_path,
            igdata_dir: None,
        })
    }

    /// Export IGDATA so the tool can locate its internal_data directory
    pub fn with_igdata(mut self, igdata_dir: PathBuf) -> Self {
        self.igdata_dir = Some(igdata_dir);
        self
    }

    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    pub fn is_available(&self) -> bool {
        self.binary_path.exists()
    }

    /// Query the tool version
    pub fn version(&self) -> IgBlastResult<String> {
        let output = Command::new(&self.binary_path)
            .arg("-version")
            .output()
            .map_err(|e| IgBlastError::ToolExecutionFailed {
                code: -1,
                stderr: format!("failed to spawn {}: {}", self.binary_path.display(), e),
            })?;

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Run one IgBLAST invocation, blocking until the child exits.
    /// Returns the output file path the tool wrote.
    pub fn run(&self, request: &RunRequest) -> IgBlastResult<PathBuf> {
        request.validate()?;

        let args = request.assemble_args();
        debug!(
            binary = %self.binary_path.display(),
            variant = request.variant.name(),
            "running IgBLAST"
        );

        let mut cmd = Command::new(&self.binary_path);
        cmd.args(&args);
        if let Some(ref igdata) = self.igdata_dir {
            cmd.env("IGDATA", igdata);
        }

        let output = cmd.output().map_err(|e| IgBlastError::ToolExecutionFailed {
            code: -1,
            stderr: format!("failed to spawn {}: {}", self.binary_path.display(), e),
        })?;

        if !output.status.success() {
            return Err(IgBlastError::ToolExecutionFailed {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(request.output_file.clone())
    }
}
