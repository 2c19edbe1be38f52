//! Read license hints and texts from nuspec manifests, package folders,
//! and nupkg archives

use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zip::ZipArchive;

/// Conventional license filenames, matched case-insensitively.
pub const LICENSE_FILE_NAMES: &[&str] = &[
    "license",
    "license.txt",
    "license.md",
    "copying",
    "copying.txt",
    "licence",
    "licence.txt",
];

/// License-relevant fields of a `.nuspec` manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NuspecInfo {
    /// `<license>` content: a file hint or a license expression
    pub license: Option<String>,
    /// `type` attribute of `<license>`: `file` or `expression`
    pub license_type: Option<String>,
    /// Deprecated `<licenseUrl>` field
    pub license_url: Option<String>,
    /// `url` attribute of `<repository>`
    pub repository: Option<String>,
}

impl NuspecInfo {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Parse the metadata fields we care about from nuspec XML.
pub fn parse_nuspec(content: &str) -> NuspecInfo {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut info = NuspecInfo::default();
    let mut current: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let tag = String::from_utf8_lossy(e.name().local_name().as_ref()).into_owned();
                if tag == "license" {
                    for attr in e.attributes().flatten() {
                        let key =
                            String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
                        if key == "type" {
                            info.license_type =
                                Some(attr.unescape_value().unwrap_or_default().into_owned());
                        }
                    }
                }
                current = Some(tag);
            }
            Ok(Event::Empty(ref e)) => {
                let tag = String::from_utf8_lossy(e.name().local_name().as_ref()).into_owned();
                if tag == "repository" {
                    for attr in e.attributes().flatten() {
                        let key =
                            String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
                        if key == "url" {
                            info.repository =
                                Some(attr.unescape_value().unwrap_or_default().into_owned());
                        }
                    }
                }
                current = None;
            }
            Ok(Event::Text(ref t)) => {
                if let Some(tag) = &current {
                    let value = t.unescape().unwrap_or_default().trim().to_string();
                    if !value.is_empty() {
                        match tag.as_str() {
                            "license" => info.license = Some(value),
                            "licenseUrl" => info.license_url = Some(value),
                            _ => {}
                        }
                    }
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("Malformed nuspec: {}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    info
}

/// Locate the nuspec inside an unpacked package folder.
///
/// NuGet lowercases the on-disk filename, so the exact id is tried first
/// and any `*.nuspec` second.
pub fn find_nuspec(folder: &Path, id: &str) -> Option<PathBuf> {
    for candidate in [
        folder.join(format!("{}.nuspec", id)),
        folder.join(format!("{}.nuspec", id.to_lowercase())),
    ] {
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    let mut matches: Vec<PathBuf> = std::fs::read_dir(folder)
        .ok()?
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("nuspec"))
        .collect();
    matches.sort();
    matches.into_iter().next()
}

/// Read and parse a nuspec file; IO problems yield empty info.
pub fn read_nuspec(path: &Path) -> NuspecInfo {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_nuspec(&content),
        Err(e) => {
            debug!("Could not read nuspec {}: {}", path.display(), e);
            NuspecInfo::default()
        }
    }
}

fn read_lossy(path: &Path) -> Option<String> {
    let bytes = std::fs::read(path).ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

fn sorted_entries(folder: &Path) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = match std::fs::read_dir(folder) {
        Ok(entries) => entries.flatten().map(|e| e.path()).collect(),
        Err(_) => Vec::new(),
    };
    entries.sort();
    entries
}

/// Look for a license file inside the unpacked package folder: the manifest
/// hint first, then well-known filenames at the top level, then one level
/// into subdirectories.
pub fn find_license_in_folder(folder: &Path, hint: Option<&str>) -> Option<(String, String)> {
    if !folder.is_dir() {
        return None;
    }
    if let Some(hint) = hint {
        let candidate = folder.join(hint);
        if candidate.is_file() {
            if let Some(text) = read_lossy(&candidate) {
                return Some((text, format!("file:{}", candidate.display())));
            }
        }
    }

    let entries = sorted_entries(folder);
    for entry in &entries {
        if entry.is_file() && name_matches(entry) {
            if let Some(text) = read_lossy(entry) {
                return Some((text, format!("file:{}", entry.display())));
            }
        }
    }
    for entry in &entries {
        if entry.is_dir() {
            for sub in sorted_entries(entry) {
                if sub.is_file() && name_matches(&sub) {
                    if let Some(text) = read_lossy(&sub) {
                        return Some((text, format!("file:{}", sub.display())));
                    }
                }
            }
        }
    }
    None
}

fn name_matches(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| LICENSE_FILE_NAMES.contains(&n.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Path of the packed archive inside an unpacked package folder.
pub fn nupkg_path(folder: &Path, id: &str, version: &str) -> PathBuf {
    folder.join(format!(
        "{}.{}.nupkg",
        id.to_lowercase(),
        version.to_lowercase()
    ))
}

/// Apply the hint/filename search against an archive's internal listing.
pub fn extract_license_from_archive(path: &Path, hint: Option<&str>) -> Option<(String, String)> {
    let file = File::open(path).ok()?;
    let mut archive = ZipArchive::new(file).ok()?;
    let names: Vec<String> = archive.file_names().map(String::from).collect();

    let mut candidates: Vec<String> = Vec::new();
    if let Some(hint) = hint {
        let hint_low = hint.to_lowercase();
        if let Some(name) = names.iter().find(|n| n.to_lowercase().ends_with(&hint_low)) {
            candidates.push(name.clone());
        }
    }
    if candidates.is_empty() {
        for name in &names {
            let base = name.rsplit('/').next().unwrap_or(name).to_lowercase();
            if LICENSE_FILE_NAMES.contains(&base.as_str()) {
                candidates.push(name.clone());
            }
        }
    }

    for candidate in candidates {
        if let Ok(mut entry) = archive.by_name(&candidate) {
            let mut bytes = Vec::new();
            if entry.read_to_end(&mut bytes).is_ok() {
                let text = String::from_utf8_lossy(&bytes).into_owned();
                return Some((text, format!("zip:{}:{}", path.display(), candidate)));
            }
        }
    }
    None
}

/// Pull the nuspec out of the packed archive when no unpacked copy exists.
pub fn read_nuspec_from_archive(path: &Path) -> NuspecInfo {
    let Ok(file) = File::open(path) else {
        return NuspecInfo::default();
    };
    let Ok(mut archive) = ZipArchive::new(file) else {
        return NuspecInfo::default();
    };
    let name = archive
        .file_names()
        .find(|n| n.to_lowercase().ends_with(".nuspec"))
        .map(String::from);
    if let Some(name) = name {
        if let Ok(mut entry) = archive.by_name(&name) {
            let mut bytes = Vec::new();
            if entry.read_to_end(&mut bytes).is_ok() {
                return parse_nuspec(&String::from_utf8_lossy(&bytes));
            }
        }
    }
    NuspecInfo::default()
}
