//! Configuration for input locations, grouping heuristics, and run behavior

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for a notices run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NoticeConfig {
    /// Locations of the project inputs and the notices document
    pub paths: InputPaths,
    /// Cache and trace locations
    pub cache: CachePaths,
    /// Network configuration for license fetches
    pub network: NetworkConfig,
    /// Rules for rendering and validating the document
    pub document: DocumentRules,
    /// Heuristics for grouping packages into families
    pub grouping: GroupingRules,
    /// Dependencies bundled directly rather than restored from a feed
    pub manual_dependencies: Vec<ManualDependency>,
}

/// Input file locations, relative to the working directory by default
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputPaths {
    /// Project file (or directory scanned for `*.csproj` / `*.fsproj`)
    pub project_file: PathBuf,
    /// Central package version pins
    pub props_file: PathBuf,
    /// Restored dependency graph
    pub assets_file: PathBuf,
    /// The notices document maintained by this tool
    pub notices_file: PathBuf,
    /// Persisted family groupings, rewritten after each run
    pub families_file: PathBuf,
    /// Organization aliases and license text aliases
    pub orgs_file: PathBuf,
}

/// On-disk cache locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CachePaths {
    /// Per-(id, version) cached license texts
    pub license_dir: PathBuf,
    /// Timestamped per-run folders with trace and document snapshots
    pub runs_dir: PathBuf,
    /// Default location of the latest run trace
    pub trace_file: PathBuf,
}

/// Network configuration for license fetches
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Rendering and validation rules for the notices document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentRules {
    /// Indentation prefix applied to every license body line
    pub indent: String,
    /// Section names allowed to stay even when not mapped to a package
    pub manual_sections: Vec<String>,
}

/// Heuristics for grouping packages into families
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingRules {
    /// Ordered prefix rules; the first matching prefix wins
    pub prefixes: Vec<PrefixRule>,
    /// Collapse `Root.Sub.Part` ids into family `Root`
    pub collapse_dotted: bool,
}

/// A single prefix-to-family rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefixRule {
    pub prefix: String,
    pub family: String,
}

/// A dependency whose license ships with the repository itself
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualDependency {
    pub family: String,
    pub packages: Vec<String>,
    pub license_path: PathBuf,
}

impl Default for InputPaths {
    fn default() -> Self {
        Self {
            project_file: PathBuf::from("."),
            props_file: PathBuf::from("Directory.Packages.props"),
            assets_file: PathBuf::from("obj/project.assets.json"),
            notices_file: PathBuf::from("THIRD-PARTY-NOTICES.md"),
            families_file: PathBuf::from("third-party-families.json"),
            orgs_file: PathBuf::from("third-party-orgs.json"),
        }
    }
}

impl Default for CachePaths {
    fn default() -> Self {
        Self {
            license_dir: PathBuf::from(".cache/licenses"),
            runs_dir: PathBuf::from(".cache/third_party_runs"),
            trace_file: PathBuf::from(".cache/update_trace.json"),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

impl NetworkConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for DocumentRules {
    fn default() -> Self {
        Self {
            indent: "    ".to_string(),
            manual_sections: Vec::new(),
        }
    }
}

impl Default for GroupingRules {
    fn default() -> Self {
        Self {
            prefixes: Vec::new(),
            collapse_dotted: true,
        }
    }
}

impl NoticeConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: NoticeConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = NoticeConfig::default();
        assert_eq!(config.document.indent, "    ");
        assert!(config.grouping.collapse_dotted);
        assert_eq!(config.network.timeout_secs, 10);
        assert!(config.manual_dependencies.is_empty());
    }

    #[test]
    fn test_load_partial_toml() {
        let toml = r#"
[document]
indent = "  "
manual_sections = ["MICROSOFT VISUAL STUDIO 2022 IMAGE LIBRARY"]

[[grouping.prefixes]]
prefix = "Serilog"
family = "Serilog"

[[manual_dependencies]]
family = "ILSpy"
packages = ["ICSharpCode.Decompiler", "ICSharpCode.ILSpyX"]
license_path = "src/ILSpy/LICENSE"
"#;
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "{}", toml).unwrap();
        let config = NoticeConfig::load(f.path()).unwrap();
        assert_eq!(config.document.indent, "  ");
        assert_eq!(config.document.manual_sections.len(), 1);
        assert_eq!(config.grouping.prefixes[0].family, "Serilog");
        assert_eq!(config.manual_dependencies[0].packages.len(), 2);
        // untouched sections fall back to defaults
        assert_eq!(config.network.timeout_secs, 10);
    }
}
