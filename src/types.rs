//! Common types for the IgBLAST wrapper

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// IgBLAST variants selecting the underlying executable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IgBlastVariant {
    Nucleotide,
    Protein,
}

impl IgBlastVariant {
    /// Get the name of the variant
    pub fn name(&self) -> &'static str {
        match self {
            IgBlastVariant::Nucleotide => "nucleotide",
            IgBlastVariant::Protein => "protein",
        }
    }

    /// Get the display name of the variant
    pub fn display_name(&self) -> &'static str {
        match self {
            IgBlastVariant::Nucleotide => "IgBLASTn",
            IgBlastVariant::Protein => "IgBLASTp",
        }
    }

    /// Get the executable name for the variant
    pub fn executable(&self) -> &'static str {
        match self {
            IgBlastVariant::Nucleotide => "igblastn",
            IgBlastVariant::Protein => "igblastp",
        }
    }
}

impl std::fmt::Display for IgBlastVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for IgBlastVariant {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "igblastn" | "nucleotide" | "n" => Ok(IgBlastVariant::Nucleotide),
            "igblastp" | "protein" | "p" => Ok(IgBlastVariant::Protein),
            _ => anyhow::bail!("Unknown IgBLAST variant: {}", s),
        }
    }
}
