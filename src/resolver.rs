//! Resolve declared direct dependencies to versions and package folders

use crate::types::Resolution;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Load the ordered list of direct `<PackageReference>` ids.
///
/// `path` may be a project file or a directory, in which case every
/// `*.csproj` / `*.fsproj` directly under it is scanned in name order.
/// Missing or malformed files yield an empty list, never an abort.
pub fn load_direct_packages(path: &Path) -> Vec<String> {
    let mut packages: Vec<String> = Vec::new();

    let project_files = if path.is_dir() {
        let mut files: Vec<PathBuf> = match std::fs::read_dir(path) {
            Ok(entries) => entries
                .flatten()
                .map(|e| e.path())
                .filter(|p| {
                    matches!(
                        p.extension().and_then(|s| s.to_str()),
                        Some("csproj" | "fsproj")
                    )
                })
                .collect(),
            Err(e) => {
                warn!("Could not scan {} for project files: {}", path.display(), e);
                Vec::new()
            }
        };
        files.sort();
        files
    } else {
        vec![path.to_path_buf()]
    };

    for file in project_files {
        for id in parse_package_references(&file) {
            if !packages.contains(&id) {
                packages.push(id);
            }
        }
    }

    packages
}

/// Parse `<PackageReference Include="..." />` entries from one project file.
fn parse_package_references(path: &Path) -> Vec<String> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Could not read {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);

    let mut ids = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                let tag = String::from_utf8_lossy(e.name().local_name().as_ref()).into_owned();
                if tag == "PackageReference" {
                    for attr in e.attributes().flatten() {
                        let key =
                            String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
                        if key == "Include" {
                            let val = attr.unescape_value().unwrap_or_default().into_owned();
                            if !val.is_empty() {
                                ids.push(val);
                            }
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("Malformed project file {}: {}", path.display(), e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    ids
}

/// Load central `<PackageVersion Include="..." Version="..." />` pins.
pub fn load_central_versions(path: &Path) -> HashMap<String, String> {
    let mut versions = HashMap::new();
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return versions,
    };

    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                let tag = String::from_utf8_lossy(e.name().local_name().as_ref()).into_owned();
                if tag == "PackageVersion" {
                    let mut id = String::new();
                    let mut version = String::new();
                    for attr in e.attributes().flatten() {
                        let key =
                            String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
                        let val = attr.unescape_value().unwrap_or_default().into_owned();
                        match key.as_str() {
                            "Include" => id = val,
                            "Version" => version = val,
                            _ => {}
                        }
                    }
                    if !id.is_empty() && !version.is_empty() {
                        versions.insert(id, version);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("Malformed props file {}: {}", path.display(), e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    versions
}

/// Restored dependency graph: `Id/Version` target keys plus package roots.
#[derive(Debug, Clone, Default)]
pub struct LockData {
    /// Keys of the first target framework, e.g. `Serilog/3.1.1`
    pub target_keys: Vec<String>,
    /// Package folder roots, first entry wins
    pub package_folders: Vec<PathBuf>,
}

/// Load lock data from `project.assets.json`.
///
/// Absent or malformed files yield empty lock data.
pub fn load_lock_data(path: &Path) -> LockData {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return LockData::default(),
    };
    let value: serde_json::Value = match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            warn!("Malformed assets file {}: {}", path.display(), e);
            return LockData::default();
        }
    };

    let target_keys = value
        .get("targets")
        .and_then(|t| t.as_object())
        .and_then(|targets| targets.values().next())
        .and_then(|first| first.as_object())
        .map(|m| m.keys().cloned().collect())
        .unwrap_or_default();

    let package_folders = value
        .get("packageFolders")
        .and_then(|f| f.as_object())
        .map(|m| m.keys().map(PathBuf::from).collect())
        .unwrap_or_default();

    LockData {
        target_keys,
        package_folders,
    }
}

/// Resolve each declared id to a concrete version and package folder.
///
/// Lock data wins over central pins; the folder is derived as
/// `root/lowercase(id)/lowercase(version)`. Packages without a version from
/// either source come back with `version: None`.
pub fn resolve_packages(
    packages: &[String],
    central_versions: &HashMap<String, String>,
    lock: &LockData,
) -> Vec<Resolution> {
    let mut resolved = Vec::with_capacity(packages.len());

    for pkg in packages {
        let prefix = format!("{}/", pkg.to_lowercase());
        let version = lock
            .target_keys
            .iter()
            .find(|key| key.to_lowercase().starts_with(&prefix))
            .and_then(|key| key.splitn(2, '/').nth(1))
            .map(String::from)
            .or_else(|| central_versions.get(pkg).cloned());

        let package_path = match (&version, lock.package_folders.first()) {
            (Some(v), Some(root)) => {
                Some(root.join(pkg.to_lowercase()).join(v.to_lowercase()))
            }
            _ => None,
        };

        debug!(
            "Resolved {} -> {}",
            pkg,
            version.as_deref().unwrap_or("<none>")
        );

        resolved.push(Resolution {
            id: pkg.clone(),
            version,
            package_path,
        });
    }

    resolved
}

/// Ids for which no version could be determined from either source.
pub fn unresolved_ids(resolutions: &[Resolution]) -> Vec<String> {
    resolutions
        .iter()
        .filter(|r| r.version.is_none())
        .map(|r| r.id.clone())
        .collect()
}
