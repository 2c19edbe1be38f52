//! Core data types for the notices pipeline

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::path::PathBuf;

/// A declared direct dependency resolved against the lock data
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Package id as declared by the project
    pub id: String,
    /// Concrete version, when one could be determined
    pub version: Option<String>,
    /// Unpacked package folder: `root/lowercase(id)/lowercase(version)`
    pub package_path: Option<PathBuf>,
}

/// A package with its acquired license, ready for assembly
#[derive(Debug, Clone, Serialize)]
pub struct PackageNotice {
    pub id: String,
    pub version: String,
    /// Cleaned license text; not serialized into traces
    #[serde(skip_serializing)]
    pub license_text: String,
    /// Which source in the fallback chain produced the text
    pub source: String,
    pub package_path: Option<String>,
    pub cache_path: Option<String>,
    pub repository: Option<String>,
    pub owner: Option<String>,
    pub family: String,
}

/// Warning emitted when one family holds textually divergent licenses
#[derive(Debug, Clone, Serialize)]
pub struct VariantWarning {
    pub family: String,
    /// Normalized signature -> occurrence count among members
    pub variants: BTreeMap<String, usize>,
    pub packages: Vec<String>,
}

/// Family name -> ordered member ids, in first-seen order.
///
/// Membership accumulates across packages; a package already recorded under
/// a different family keeps its first mapping and the conflict is counted.
#[derive(Debug, Clone, Default)]
pub struct FamilyMap {
    names: Vec<String>,
    members: HashMap<String, Vec<String>>,
    assigned: HashMap<String, String>,
    conflicts: usize,
}

impl FamilyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id` as a member of `family`, preserving insertion order.
    pub fn insert(&mut self, family: &str, id: &str) {
        if let Some(existing) = self.assigned.get(id) {
            if existing != family {
                self.conflicts += 1;
            }
            return;
        }
        self.assigned.insert(id.to_string(), family.to_string());
        let entry = self.members.entry(family.to_string()).or_insert_with(|| {
            self.names.push(family.to_string());
            Vec::new()
        });
        entry.push(id.to_string());
    }

    pub fn get(&self, family: &str) -> Option<&[String]> {
        self.members.get(family).map(|v| v.as_slice())
    }

    pub fn family_of(&self, id: &str) -> Option<&str> {
        self.assigned.get(id).map(|s| s.as_str())
    }

    /// Iterate families in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.names
            .iter()
            .map(move |n| (n.as_str(), self.members[n].as_slice()))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Number of ignored re-assignments seen so far.
    pub fn conflicts(&self) -> usize {
        self.conflicts
    }
}

impl Serialize for FamilyMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.names.len()))?;
        for (name, members) in self.iter() {
            map.serialize_entry(name, members)?;
        }
        map.end()
    }
}

/// Structured diagnostics produced by the validator
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub preamble_lines: usize,
    pub sections_count: usize,
    pub alphabetical_ok: bool,
    pub expected_order: Vec<String>,
    pub titles: Vec<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
