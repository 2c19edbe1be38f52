//! Group package ids into legal families via layered heuristics

use crate::config::{GroupingRules, ManualDependency};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// Persisted family groupings, rewritten after each run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamiliesConfig {
    pub version: String,
    #[serde(default)]
    pub families: Vec<FamilyEntry>,
}

/// One persisted family grouping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyEntry {
    pub name: String,
    #[serde(default = "default_retain")]
    pub retain: bool,
    #[serde(default)]
    pub packages: Vec<String>,
}

fn default_retain() -> bool {
    true
}

impl Default for FamiliesConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            families: Vec::new(),
        }
    }
}

impl FamiliesConfig {
    /// Load the persisted configuration; absent or malformed files yield the
    /// default (empty) configuration.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str(&content) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("Malformed families config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Flatten into a package id -> family name lookup.
    pub fn package_lookup(&self) -> HashMap<String, String> {
        let mut lookup = HashMap::new();
        for entry in &self.families {
            for pkg in &entry.packages {
                lookup.insert(pkg.clone(), entry.name.clone());
            }
        }
        lookup
    }
}

/// An organization grouping repositories and license text aliases
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgEntry {
    pub name: String,
    #[serde(default)]
    pub github_prefixes: Vec<String>,
    #[serde(default)]
    pub license_aliases: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OrgsFile {
    #[serde(default)]
    orgs: Vec<OrgEntry>,
}

/// Load organization aliases; absent or malformed files yield an empty list.
pub fn load_org_config(path: &Path) -> Vec<OrgEntry> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return Vec::new(),
    };
    match serde_json::from_str::<OrgsFile>(&content) {
        Ok(file) => file.orgs,
        Err(e) => {
            warn!("Malformed orgs config {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

/// Extract the lowercased owner segment from a GitHub repository URL.
pub fn extract_repo_owner(repo_url: &str) -> Option<String> {
    let url = repo_url.strip_suffix(".git").unwrap_or(repo_url);
    let tail = url.split("github.com/").nth(1)?;
    let owner = tail.split('/').next()?;
    if owner.is_empty() {
        None
    } else {
        Some(owner.to_lowercase())
    }
}

/// Map a repository owner to a configured organization name.
pub fn map_owner_to_org(owner: &str, orgs: &[OrgEntry]) -> Option<String> {
    for entry in orgs {
        for prefix in &entry.github_prefixes {
            let prefix_owner = prefix
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or(prefix)
                .to_lowercase();
            if prefix_owner == owner.to_lowercase() {
                return Some(entry.name.clone());
            }
        }
    }
    None
}

/// Resolves package ids to family names, first match wins:
/// manual declarations, persisted configuration, organization alias,
/// prefix table, dotted-root collapse, then the id itself.
#[derive(Debug, Clone)]
pub struct Classifier {
    manual: HashMap<String, String>,
    persisted: HashMap<String, String>,
    orgs: Vec<OrgEntry>,
    rules: GroupingRules,
}

impl Classifier {
    pub fn new(
        manual_dependencies: &[ManualDependency],
        families: &FamiliesConfig,
        orgs: Vec<OrgEntry>,
        rules: GroupingRules,
    ) -> Self {
        let mut manual = HashMap::new();
        for entry in manual_dependencies {
            for pkg in &entry.packages {
                manual.insert(pkg.clone(), entry.family.clone());
            }
        }
        Self {
            manual,
            persisted: families.package_lookup(),
            orgs,
            rules,
        }
    }

    /// Choose the family for `id`, consulting the organization tier when a
    /// repository owner is known.
    pub fn classify(&self, id: &str, owner: Option<&str>) -> String {
        if let Some(family) = self.manual.get(id) {
            return family.clone();
        }
        if let Some(family) = self.persisted.get(id) {
            return family.clone();
        }
        if let Some(owner) = owner {
            if let Some(org) = map_owner_to_org(owner, &self.orgs) {
                return org;
            }
        }
        for rule in &self.rules.prefixes {
            if id.starts_with(&rule.prefix) {
                return rule.family.clone();
            }
        }
        if self.rules.collapse_dotted {
            if let Some(root) = id.split('.').next() {
                if !root.is_empty() && root.len() < id.len() {
                    return root.to_string();
                }
            }
        }
        id.to_string()
    }

    /// Classification without network-derived inputs; the validator uses this
    /// so its family expectations match the generator's.
    pub fn classify_offline(&self, id: &str) -> String {
        self.classify(id, None)
    }

    pub fn org_entry(&self, family: &str) -> Option<&OrgEntry> {
        self.orgs.iter().find(|o| o.name == family)
    }
}
