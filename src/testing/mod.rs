//! Fixtures for testing against a stubbed IgBLAST

pub mod mock;

pub use mock::{fake_installation, write_stub_executable, MockIgBlast};
