use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::debug;

use crate::download::DownloadProgress;
use crate::error::{IgBlastError, IgBlastResult};
use crate::system::paths;
use crate::types::IgBlastVariant;

/// Process-wide install state for the default install directory.
/// Lazily computed on first query, reset by an explicit (re)install.
static INSTALL_STATE: RwLock<Option<bool>> = RwLock::new(None);

/// Check whether IgBLAST is installed at the default location.
/// The lookup is cached for the process lifetime; only an explicit install
/// through [`IgBlastInstaller::install`] refreshes it.
pub fn is_igblast_installed() -> bool {
    if let Some(state) = *INSTALL_STATE.read().unwrap() {
        return state;
    }
    let state = IgBlastInstaller::new().is_installed();
    *INSTALL_STATE.write().unwrap() = Some(state);
    state
}

/// Information about an installed IgBLAST release
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallInfo {
    pub version: String,
    pub installed_date: DateTime<Utc>,
    pub install_path: PathBuf,
    pub is_current: bool,
}

/// Manager for local IgBLAST installations
pub struct IgBlastInstaller {
    install_dir: PathBuf,
    client: reqwest::Client,
    base_url: String,
}

impl Default for IgBlastInstaller {
    fn default() -> Self {
        Self::new()
    }
}

impl IgBlastInstaller {
    /// Create an installer rooted at the default install directory
    pub fn new() -> Self {
        Self::with_directory(paths::igblast_install_dir())
    }

    /// Create an installer rooted at a custom directory
    pub fn with_directory<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            install_dir: dir.as_ref().to_path_buf(),
            client: reqwest::Client::builder()
                .user_agent(concat!("igblast-rs/", env!("CARGO_PKG_VERSION")))
                // Release archives are ~100 MB; allow slow mirrors
                .timeout(std::time::Duration::from_secs(1800))
                .connect_timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap(),
            base_url: "https://ftp.ncbi.nlm.nih.gov".to_string(),
        }
    }

    /// Override the download mirror (used by tests against a local server)
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Root directory holding versioned installations
    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    /// Directory for a specific release version
    pub fn version_dir(&self, version: &str) -> PathBuf {
        self.install_dir.join(version)
    }

    /// Resolve the `current` symlink to the active version directory
    pub fn current_dir(&self) -> Option<PathBuf> {
        let current_link = self.install_dir.join("current");
        if current_link.exists() {
            fs::read_link(&current_link).ok().map(|p| {
                if p.is_absolute() {
                    p
                } else {
                    self.install_dir.join(p)
                }
            })
        } else {
            None
        }
    }

    /// Get the path to a variant's binary if installed
    pub fn binary_path(&self, variant: IgBlastVariant) -> Option<PathBuf> {
        self.current_dir()
            .map(|dir| dir.join("bin").join(variant.executable()))
            .filter(|p| p.exists())
    }

    /// The path where a variant's binary is expected to live
    pub fn expected_binary_path(&self, variant: IgBlastVariant) -> PathBuf {
        self.install_dir
            .join("current")
            .join("bin")
            .join(variant.executable())
    }

    /// Check if a complete installation is present; side-effect-free
    pub fn is_installed(&self) -> bool {
        self.binary_path(IgBlastVariant::Nucleotide).is_some()
            && self.binary_path(IgBlastVariant::Protein).is_some()
    }

    /// Directory to export as IGDATA so IgBLAST finds its internal_data
    pub fn igdata_dir(&self) -> Option<PathBuf> {
        self.current_dir()
            .filter(|dir| dir.join("internal_data").is_dir())
    }

    /// Get the binary path for a variant, or a typed not-installed failure
    pub fn resolved_binary(&self, variant: IgBlastVariant) -> IgBlastResult<PathBuf> {
        self.binary_path(variant)
            .ok_or_else(|| IgBlastError::NotInstalled(self.expected_binary_path(variant)))
    }

    /// Get the currently selected version
    pub fn current_version(&self) -> Result<Option<String>> {
        let current_link = self.install_dir.join("current");
        if !current_link.exists() {
            return Ok(None);
        }

        let target = fs::read_link(&current_link)?;
        Ok(target
            .file_name()
            .and_then(|s| s.to_str())
            .map(|s| s.to_string()))
    }

    /// Point the `current` symlink at an installed version
    pub fn set_current_version(&self, version: &str) -> Result<()> {
        let version_dir = self.version_dir(version);

        if !version_dir.exists() {
            anyhow::bail!("IgBLAST version {} is not installed", version);
        }

        let current_link = self.install_dir.join("current");

        // Remove old symlink if it exists
        if current_link.exists() {
            fs::remove_file(&current_link)?;
        }

        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(&version_dir, &current_link)?;
        }

        #[cfg(not(unix))]
        {
            anyhow::bail!("Symlinks are not supported on this platform");
        }

        Ok(())
    }

    /// List all installed versions, newest first
    pub fn list_versions(&self) -> Result<Vec<InstallInfo>> {
        if !self.install_dir.exists() {
            return Ok(Vec::new());
        }

        let current_version = self.current_version()?;
        let mut versions = Vec::new();

        for entry in fs::read_dir(&self.install_dir)? {
            let entry = entry?;
            let path = entry.path();
            let name = entry.file_name();
            let name = name.to_string_lossy();

            if path.is_dir() && name != "current" && !name.starts_with(".tmp_") {
                let info_path = path.join("info.json");
                if info_path.exists() {
                    let info_str = fs::read_to_string(&info_path)?;
                    let mut info: InstallInfo = serde_json::from_str(&info_str)?;
                    info.is_current = Some(info.version.as_str()) == current_version.as_deref();
                    versions.push(info);
                }
            }
        }

        versions.sort_by(|a, b| b.installed_date.cmp(&a.installed_date));
        Ok(versions)
    }

    /// Verify that an installation directory is complete and valid
    fn verify_installation(&self, version_dir: &Path) -> bool {
        for variant in [IgBlastVariant::Nucleotide, IgBlastVariant::Protein] {
            let binary_path = version_dir.join("bin").join(variant.executable());
            if !binary_path.exists() || !binary_path.is_file() {
                return false;
            }

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                match fs::metadata(&binary_path) {
                    Ok(metadata) => {
                        if metadata.permissions().mode() & 0o111 == 0 {
                            return false;
                        }
                    }
                    Err(_) => return false,
                }
            }
        }

        version_dir.join("info.json").exists()
    }

    /// Remove leftover staging directories from failed installations
    fn cleanup_temp_dirs(&self) -> Result<()> {
        if !self.install_dir.exists() {
            return Ok(());
        }

        for entry in fs::read_dir(&self.install_dir)? {
            let entry = entry?;
            let path = entry.path();
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with(".tmp_") {
                    debug!(dir = name, "removing stale staging directory");
                    fs::remove_dir_all(&path).ok();
                }
            }
        }
        Ok(())
    }

    /// Download and install an IgBLAST release.
    ///
    /// With `version = None` the newest NCBI release is selected. Re-invoking
    /// for an already-installed, verified version is a no-op unless `force`
    /// is set, in which case the version is removed and fetched again.
    pub async fn install(&self, version: Option<&str>, force: bool) -> IgBlastResult<()> {
        let result = self.install_inner(version, force).await;

        if self.install_dir == paths::igblast_install_dir() {
            let mut state = INSTALL_STATE.write().unwrap();
            *state = match &result {
                Ok(()) => Some(true),
                Err(_) => None,
            };
        }

        result.map_err(IgBlastError::from)
    }

    async fn install_inner(&self, version: Option<&str>, force: bool) -> Result<()> {
        let version = match version {
            Some(v) => v
                .trim_start_matches("ncbi-igblast-")
                .trim_start_matches('v')
                .to_string(),
            None => self.latest_version().await?,
        };

        let version_dir = self.version_dir(&version);
        let temp_dir = self.install_dir.join(format!(".tmp_{}", version));

        fs::create_dir_all(&self.install_dir)?;
        self.cleanup_temp_dirs()?;

        if version_dir.exists() {
            if !force && self.verify_installation(&version_dir) {
                println!("✓ IgBLAST {} is already installed and verified", version);
                self.set_current_version(&version)?;
                return Ok(());
            }
            if !force {
                println!(
                    "⚠ IgBLAST {} directory exists but installation is incomplete/corrupt",
                    version
                );
                println!("  Repairing installation...");
            }
            fs::remove_dir_all(&version_dir)?;
        }

        println!("📦 Installing IgBLAST {}...", version);
        fs::create_dir_all(&temp_dir)?;

        let archive_name = self.archive_name(&version)?;
        let download_url = format!(
            "{}/blast/executables/igblast/release/{}/{}",
            self.base_url, version, archive_name
        );
        println!("⬇ Downloading from {}...", download_url);

        let archive_path = temp_dir.join(&archive_name);
        self.download_archive(&download_url, &archive_path).await?;

        println!("📂 Extracting IgBLAST...");
        self.extract_tar_gz(&archive_path, &temp_dir)?;
        fs::remove_file(&archive_path)?;

        // The archive unpacks to a subdirectory like ncbi-igblast-1.22.0/
        let release_dir = temp_dir
            .read_dir()?
            .filter_map(|entry| entry.ok())
            .find(|entry| {
                entry.path().is_dir()
                    && entry
                        .file_name()
                        .to_string_lossy()
                        .starts_with("ncbi-igblast")
            })
            .map(|entry| entry.path())
            .context("Could not find extracted IgBLAST directory")?;

        for variant in [IgBlastVariant::Nucleotide, IgBlastVariant::Protein] {
            let binary = release_dir.join("bin").join(variant.executable());
            if !binary.exists() {
                anyhow::bail!(
                    "{} not found after extraction at {:?}",
                    variant.executable(),
                    binary
                );
            }

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let mut perms = fs::metadata(&binary)?.permissions();
                perms.set_mode(0o755);
                fs::set_permissions(&binary, perms)?;
            }
        }

        let info = InstallInfo {
            version: version.clone(),
            installed_date: Utc::now(),
            install_path: version_dir.clone(),
            is_current: true,
        };
        fs::write(
            release_dir.join("info.json"),
            serde_json::to_string_pretty(&info)?,
        )?;

        if !self.verify_installation(&release_dir) {
            fs::remove_dir_all(&temp_dir)?;
            anyhow::bail!("Installation verification failed");
        }

        // Move from staging to the final directory (atomic operation)
        fs::rename(&release_dir, &version_dir)
            .context("Failed to move installation to final directory")?;
        fs::remove_dir_all(&temp_dir).ok();

        self.set_current_version(&version)?;

        println!("✓ Successfully installed IgBLAST {}", version);
        Ok(())
    }

    /// Get the newest release version from the NCBI LATEST listing
    pub async fn latest_version(&self) -> Result<String> {
        let url = format!(
            "{}/blast/executables/igblast/release/LATEST/",
            self.base_url
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("Failed to fetch release listing: HTTP {}", response.status());
        }

        let listing = response.text().await?;
        Self::parse_listing_version(&listing)
            .context("Could not find an IgBLAST release in the LATEST listing")
    }

    /// Pull the version number out of a release-directory listing.
    /// Archive names look like ncbi-igblast-1.22.0-x64-linux.tar.gz
    fn parse_listing_version(listing: &str) -> Option<String> {
        for (idx, _) in listing.match_indices("ncbi-igblast-") {
            let rest = &listing[idx + "ncbi-igblast-".len()..];
            let version: String = rest
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            let version = version.trim_end_matches('.');
            if version.contains('.') {
                return Some(version.to_string());
            }
        }
        None
    }

    /// Compare two version strings (supports semantic versioning)
    pub fn compare_versions(&self, v1: &str, v2: &str) -> Ordering {
        let v1_clean = v1.trim_start_matches("ncbi-igblast-").trim_start_matches('v');
        let v2_clean = v2.trim_start_matches("ncbi-igblast-").trim_start_matches('v');

        let v1_parts: Vec<u32> = v1_clean.split('.').filter_map(|s| s.parse().ok()).collect();
        let v2_parts: Vec<u32> = v2_clean.split('.').filter_map(|s| s.parse().ok()).collect();

        for i in 0..std::cmp::max(v1_parts.len(), v2_parts.len()) {
            let p1 = v1_parts.get(i).unwrap_or(&0);
            let p2 = v2_parts.get(i).unwrap_or(&0);
            match p1.cmp(p2) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        Ordering::Equal
    }

    /// Check if a newer release than the current one is available
    pub async fn check_for_upgrade(&self) -> Result<Option<String>> {
        let current_version = match self.current_version()? {
            Some(v) => v,
            None => return Ok(None), // Not installed
        };

        let latest_version = self.latest_version().await?;

        if self.compare_versions(&latest_version, &current_version) == Ordering::Greater {
            Ok(Some(latest_version))
        } else {
            Ok(None)
        }
    }

    /// Detect the current platform
    fn detect_platform(&self) -> Result<(String, String)> {
        let os = if cfg!(target_os = "linux") {
            "linux"
        } else if cfg!(target_os = "macos") {
            "macos"
        } else if cfg!(target_os = "windows") {
            "windows"
        } else {
            anyhow::bail!("Unsupported operating system");
        };

        let arch = if cfg!(target_arch = "x86_64") {
            "x86_64"
        } else if cfg!(target_arch = "aarch64") {
            "aarch64"
        } else {
            anyhow::bail!("Unsupported architecture");
        };

        Ok((os.to_string(), arch.to_string()))
    }

    /// Release archive name for the current platform
    fn archive_name(&self, version: &str) -> Result<String> {
        let (os, arch) = self.detect_platform()?;

        let platform = match (os.as_str(), arch.as_str()) {
            ("linux", "x86_64") => "x64-linux",
            ("macos", "x86_64") => "x64-macosx",
            (os, arch) => anyhow::bail!("Unsupported platform: {}-{}", os, arch),
        };

        Ok(format!("ncbi-igblast-{}-{}.tar.gz", version, platform))
    }

    /// Stream a release archive to disk with a progress bar
    async fn download_archive(&self, url: &str, dest: &Path) -> Result<()> {
        use futures_util::StreamExt;
        use std::io::Write;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to start IgBLAST download")?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to download IgBLAST: HTTP {}", response.status());
        }

        let mut progress = DownloadProgress::new();
        progress.set_message("Downloading IgBLAST release...");
        progress.set_total(response.content_length().unwrap_or(0) as usize);

        let mut file = fs::File::create(dest).context("Failed to create archive file")?;

        let mut downloaded = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Failed to read chunk")?;
            file.write_all(&chunk).context("Failed to write chunk")?;

            downloaded += chunk.len() as u64;
            progress.set_current(downloaded as usize);
        }

        progress.finish();
        Ok(())
    }

    /// Extract a tar.gz archive
    fn extract_tar_gz(&self, archive_path: &Path, dest_dir: &Path) -> Result<()> {
        use flate2::read::GzDecoder;
        use tar::Archive;

        let file = fs::File::open(archive_path)?;
        let gz = GzDecoder::new(file);
        let mut archive = Archive::new(gz);

        archive.unpack(dest_dir)?;
        Ok(())
    }
}
