//! Test doubles: stub executables and fabricated installations.
//!
//! Both this crate's tests and downstream users exercising the wrapper
//! without a real IgBLAST release use these fixtures.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use tempfile::TempDir;

use crate::manager::{IgBlastInstaller, InstallInfo};
use crate::types::IgBlastVariant;

/// A stub igblast executable living in its own scratch directory
pub struct MockIgBlast {
    _dir: TempDir,
    pub binary_path: PathBuf,
}

impl MockIgBlast {
    /// Stub that writes the requested output file and exits 0
    pub fn succeeding() -> Result<Self> {
        Self::with_behavior(0, "")
    }

    /// Stub that prints `stderr_text` to stderr and exits with `exit_code`
    pub fn failing(exit_code: i32, stderr_text: &str) -> Result<Self> {
        Self::with_behavior(exit_code, stderr_text)
    }

    pub fn with_behavior(exit_code: i32, stderr_text: &str) -> Result<Self> {
        let dir = TempDir::new()?;
        let binary_path = write_stub_executable(dir.path(), "igblastn", exit_code, stderr_text)?;
        Ok(Self {
            _dir: dir,
            binary_path,
        })
    }
}

/// Write a stub executable shell script named `name` into `dir`.
///
/// The script answers `-version`, honors `-out` by writing a small tabular
/// header, prints `stderr_text` to stderr, and exits with `exit_code`.
pub fn write_stub_executable(
    dir: &Path,
    name: &str,
    exit_code: i32,
    stderr_text: &str,
) -> Result<PathBuf> {
    let binary_path = dir.join(name);

    let script = format!(
        r#"#!/bin/sh
if [ "$1" = "-version" ]; then
    echo "igblast: 1.22.0"
    exit 0
fi
out=""
prev=""
for arg in "$@"; do
    if [ "$prev" = "-out" ]; then
        out="$arg"
    fi
    prev="$arg"
done
if [ -n "$out" ]; then
    printf 'sequence_id\tsequence\n' > "$out"
fi
if [ -n "{stderr}" ]; then
    echo "{stderr}" >&2
fi
exit {code}
"#,
        stderr = stderr_text,
        code = exit_code
    );

    let mut file = fs::File::create(&binary_path)?;
    file.write_all(script.as_bytes())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(&binary_path)?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&binary_path, perms)?;
    }

    Ok(binary_path)
}

/// Fabricate a complete on-disk installation, laid out the way the installer
/// leaves a real release, and mark it current.
pub fn fake_installation(installer: &IgBlastInstaller, version: &str) -> Result<()> {
    let version_dir = installer.version_dir(version);
    let bin_dir = version_dir.join("bin");
    fs::create_dir_all(&bin_dir)?;
    fs::create_dir_all(version_dir.join("internal_data"))?;
    fs::create_dir_all(version_dir.join("optional_file"))?;

    for variant in [IgBlastVariant::Nucleotide, IgBlastVariant::Protein] {
        write_stub_executable(&bin_dir, variant.executable(), 0, "")?;
    }

    fs::write(
        version_dir.join("optional_file").join("human_gl.aux"),
        "# aux\n",
    )?;

    let info = InstallInfo {
        version: version.to_string(),
        installed_date: Utc::now(),
        install_path: version_dir.clone(),
        is_current: false,
    };
    fs::write(
        version_dir.join("info.json"),
        serde_json::to_string_pretty(&info)?,
    )?;

    installer.set_current_version(version)?;
    Ok(())
}
