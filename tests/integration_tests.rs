#![cfg(unix)]

//! End-to-end tests: mocked-HTTP installs and stub-binary runs

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serial_test::serial;
use tempfile::TempDir;

use igblast::testing::mock::{self, MockIgBlast};
use igblast::{
    IgBlastError, IgBlastInstaller, IgBlastRunner, IgBlastVariant, RunRequest, AIRR_OUTFMT,
};

/// Build a gzipped release tarball the way NCBI ships one:
/// ncbi-igblast-<version>/{bin,internal_data,optional_file}
fn release_tarball(version: &str) -> Vec<u8> {
    let staging = TempDir::new().unwrap();
    let root = staging.path().join(format!("ncbi-igblast-{}", version));
    let bin_dir = root.join("bin");

    fs::create_dir_all(&bin_dir).unwrap();
    fs::create_dir_all(root.join("internal_data").join("human")).unwrap();
    fs::create_dir_all(root.join("optional_file")).unwrap();

    mock::write_stub_executable(&bin_dir, "igblastn", 0, "").unwrap();
    mock::write_stub_executable(&bin_dir, "igblastp", 0, "").unwrap();
    fs::write(root.join("optional_file").join("human_gl.aux"), "# aux\n").unwrap();

    let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder
        .append_dir_all(format!("ncbi-igblast-{}", version), &root)
        .unwrap();
    builder.into_inner().unwrap().finish().unwrap()
}

fn write_inputs(dir: &Path) -> RunRequest {
    for name in ["query.fasta", "V.fasta", "D.fasta", "J.fasta", "aux.txt"] {
        fs::write(dir.join(name), ">seq1\nACGT\n").unwrap();
    }

    RunRequest::new(
        IgBlastVariant::Nucleotide,
        dir.join("query.fasta"),
        dir.join("V.fasta"),
        dir.join("D.fasta"),
        dir.join("J.fasta"),
        dir.join("aux.txt"),
        dir.join("output.tsv"),
    )
}

// ===== Installer Integration Tests =====

#[cfg(all(target_arch = "x86_64", any(target_os = "linux", target_os = "macos")))]
#[tokio::test]
async fn test_install_workflow_over_http() {
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(
            r"^/blast/executables/igblast/release/.*\.tar\.gz$",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(release_tarball("1.22.0")))
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let installer =
        IgBlastInstaller::with_directory(temp_dir.path()).with_base_url(mock_server.uri());

    assert!(!installer.is_installed());

    installer.install(Some("1.22.0"), false).await.unwrap();

    assert!(installer.is_installed());
    assert_eq!(
        installer.current_version().unwrap(),
        Some("1.22.0".to_string())
    );
    assert!(installer
        .binary_path(IgBlastVariant::Nucleotide)
        .unwrap()
        .ends_with("bin/igblastn"));
    assert!(installer.igdata_dir().is_some());

    // No staging leftovers
    assert!(!temp_dir.path().join(".tmp_1.22.0").exists());

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);

    // Second install is a no-op: no re-download observed
    installer.install(Some("1.22.0"), false).await.unwrap();
    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);

    // Forced reinstall downloads again
    installer.install(Some("1.22.0"), true).await.unwrap();
    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert!(installer.is_installed());
}

#[cfg(all(target_arch = "x86_64", any(target_os = "linux", target_os = "macos")))]
#[tokio::test]
async fn test_latest_version_from_release_listing() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blast/executables/igblast/release/LATEST/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>
            <a href="ncbi-igblast-1.22.0-x64-linux.tar.gz">ncbi-igblast-1.22.0-x64-linux.tar.gz</a>
            </body></html>"#,
        ))
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let installer =
        IgBlastInstaller::with_directory(temp_dir.path()).with_base_url(mock_server.uri());

    let latest = installer.latest_version().await.unwrap();
    assert_eq!(latest, "1.22.0");
}

#[tokio::test]
async fn test_install_failure_is_typed() {
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let installer =
        IgBlastInstaller::with_directory(temp_dir.path()).with_base_url(mock_server.uri());

    let result = installer.install(Some("1.22.0"), false).await;
    assert!(matches!(result, Err(IgBlastError::InstallationFailed(_))));
    assert!(!installer.is_installed());
}

// ===== Runner Integration Tests =====

#[test]
fn test_install_then_run_workflow() {
    let temp_dir = TempDir::new().unwrap();
    let installer = IgBlastInstaller::with_directory(temp_dir.path());
    mock::fake_installation(&installer, "1.22.0").unwrap();

    let binary = installer.resolved_binary(IgBlastVariant::Nucleotide).unwrap();
    let mut runner = IgBlastRunner::new(binary).unwrap();
    if let Some(igdata) = installer.igdata_dir() {
        runner = runner.with_igdata(igdata);
    }

    let work_dir = TempDir::new().unwrap();
    let request = write_inputs(work_dir.path())
        .with_outfmt(AIRR_OUTFMT)
        .with_param("organism", "human");

    let output = runner.run(&request).unwrap();
    assert!(output.exists());

    let content = fs::read_to_string(&output).unwrap();
    assert!(content.starts_with("sequence_id"));
}

#[test]
fn test_run_surfaces_tool_stderr() {
    let stub = MockIgBlast::failing(3, "Error: Germline annotation database not found").unwrap();
    let runner = IgBlastRunner::new(stub.binary_path.clone()).unwrap();

    let work_dir = TempDir::new().unwrap();
    let request = write_inputs(work_dir.path());

    match runner.run(&request) {
        Err(IgBlastError::ToolExecutionFailed { code, stderr }) => {
            assert_eq!(code, 3);
            assert!(stderr.contains("Germline annotation database"));
        }
        other => panic!("Expected ToolExecutionFailed, got {:?}", other),
    }
}

// ===== Crate Surface Tests =====

#[test]
#[serial]
fn test_is_igblast_installed_is_cached_and_consistent() {
    // Whatever the machine state, the cached answer must be stable
    let first = igblast::is_igblast_installed();
    let second = igblast::is_igblast_installed();
    assert_eq!(first, second);
}

#[test]
fn test_variant_parsing_and_names() {
    assert_eq!(
        IgBlastVariant::from_str("igblastn").unwrap(),
        IgBlastVariant::Nucleotide
    );
    assert_eq!(
        IgBlastVariant::from_str("Protein").unwrap(),
        IgBlastVariant::Protein
    );
    assert_eq!(
        IgBlastVariant::from_str("n").unwrap(),
        IgBlastVariant::Nucleotide
    );
    assert!(IgBlastVariant::from_str("blastx").is_err());

    assert_eq!(IgBlastVariant::Nucleotide.executable(), "igblastn");
    assert_eq!(IgBlastVariant::Protein.executable(), "igblastp");
    assert_eq!(IgBlastVariant::Nucleotide.to_string(), "IgBLASTn");
}
