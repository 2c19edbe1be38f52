//! License acquisition: an ordered fallback chain with persistent caching.
//!
//! Sources are tried in fixed priority order — cache, manifest hint, folder
//! search, archive search, license expression, declared URL, repository
//! guess — and the first candidate that survives normalization and the
//! rejection filters wins. Rejected candidates advance the chain and are
//! never cached.

mod manifest;
mod remote;
mod spdx_texts;

pub use manifest::NuspecInfo;
pub use remote::{HttpFetcher, SPDX_RAW};

use crate::text::{clean_license_text, has_placeholders, is_registry_stub};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Acquisition policy for one run
#[derive(Debug, Clone)]
pub struct AcquirePolicy {
    /// Allow network fallbacks (registry, declared URL, repository guess)
    pub allow_network: bool,
    /// Ignore and overwrite cached texts
    pub force_refresh: bool,
    /// Timeout for each network request
    pub timeout: Duration,
}

/// A successfully acquired and filtered license text
#[derive(Debug, Clone)]
pub struct Acquisition {
    /// Cleaned license text
    pub text: String,
    /// Provenance tag: which source produced the text
    pub source: String,
    /// Repository URL discovered from the manifest, when any
    pub repository: Option<String>,
    /// Cache file backing this text
    pub cache_path: Option<PathBuf>,
}

/// Runs the fallback chain for one package at a time
#[derive(Debug)]
pub struct Acquirer {
    cache_dir: PathBuf,
    policy: AcquirePolicy,
    http: Option<HttpFetcher>,
    registry_base: String,
}

impl Acquirer {
    pub fn new(cache_dir: PathBuf, policy: AcquirePolicy) -> Self {
        let http = if policy.allow_network {
            match HttpFetcher::new(policy.timeout) {
                Ok(fetcher) => Some(fetcher),
                Err(e) => {
                    warn!("Could not build HTTP client, network sources disabled: {}", e);
                    None
                }
            }
        } else {
            None
        };
        Self {
            cache_dir,
            policy,
            http,
            registry_base: SPDX_RAW.to_string(),
        }
    }

    /// Override the SPDX registry endpoint (used by tests).
    pub fn with_registry_base(mut self, base: impl Into<String>) -> Self {
        self.registry_base = base.into();
        self
    }

    /// Acquire the license text for one resolved package.
    ///
    /// Returns None only when every source in the chain failed or was
    /// rejected; the caller records the package as missing.
    pub fn acquire(
        &self,
        id: &str,
        version: &str,
        package_path: Option<&Path>,
    ) -> Option<Acquisition> {
        let cache_path = self.cache_dir.join(format!("{}-{}.txt", id, version));

        if !self.policy.force_refresh {
            if let Some(text) = self.read_cache(&cache_path) {
                debug!("{} {}: cache hit", id, version);
                return Some(Acquisition {
                    text,
                    source: "cache".to_string(),
                    repository: None,
                    cache_path: Some(cache_path),
                });
            }
        }

        let archive_path = package_path.map(|p| manifest::nupkg_path(p, id, version));

        let mut nuspec = NuspecInfo::default();
        if let Some(folder) = package_path {
            if let Some(nuspec_file) = manifest::find_nuspec(folder, id) {
                nuspec = manifest::read_nuspec(&nuspec_file);
            }
        }
        if nuspec.is_empty() {
            if let Some(archive) = archive_path.as_deref().filter(|p| p.is_file()) {
                nuspec = manifest::read_nuspec_from_archive(archive);
            }
        }
        let repository = nuspec.repository.clone();
        let hint = match nuspec.license_type.as_deref() {
            // An expression is not a filename; only pass file-ish hints down.
            Some("expression") => None,
            _ => nuspec.license.as_deref(),
        };

        // Manifest hint and well-known filenames in the unpacked folder.
        if let Some(folder) = package_path {
            if let Some((raw, source)) = manifest::find_license_in_folder(folder, hint) {
                if let Some(acq) = self.accept(&raw, source, &repository, &cache_path) {
                    return Some(acq);
                }
            }
        }

        // Same search against the packed archive listing.
        if let Some(archive) = archive_path.as_deref().filter(|p| p.is_file()) {
            if let Some((raw, source)) = manifest::extract_license_from_archive(archive, hint) {
                if let Some(acq) = self.accept(&raw, source, &repository, &cache_path) {
                    return Some(acq);
                }
            }
        }

        // Structured license expression.
        if nuspec.license_type.as_deref() == Some("expression") {
            if let Some(expr) = nuspec.license.as_deref() {
                if let Some(raw) =
                    remote::fetch_expression_text(expr, self.http.as_ref(), &self.registry_base)
                {
                    if let Some(acq) =
                        self.accept(&raw, "spdx-expression".to_string(), &repository, &cache_path)
                    {
                        return Some(acq);
                    }
                }
            }
        }

        // Declared license URL.
        if let (Some(http), Some(url)) = (self.http.as_ref(), nuspec.license_url.as_deref()) {
            if url.starts_with("http") {
                if let Some(raw) = http.get_text(url) {
                    if let Some(acq) = self.accept(&raw, url.to_string(), &repository, &cache_path)
                    {
                        return Some(acq);
                    }
                }
            }
        }

        // Last resort: guess the license path in the source repository.
        if let (Some(http), Some(repo)) = (self.http.as_ref(), repository.as_deref()) {
            if let Some(raw) = remote::guess_repository_license(http, repo) {
                if let Some(acq) = self.accept(&raw, repo.to_string(), &repository, &cache_path) {
                    return Some(acq);
                }
            }
        }

        debug!("{} {}: all sources exhausted", id, version);
        None
    }

    /// Cached text is reused only when it still passes both filters.
    fn read_cache(&self, path: &Path) -> Option<String> {
        let bytes = std::fs::read(path).ok()?;
        let cached = String::from_utf8_lossy(&bytes);
        if cached.trim().is_empty() || has_placeholders(&cached) || is_registry_stub(&cached) {
            debug!("Rejecting stale cache entry {}", path.display());
            return None;
        }
        Some(clean_license_text(&cached))
    }

    /// Normalize a candidate, apply the rejection filters, and cache it.
    fn accept(
        &self,
        raw: &str,
        source: String,
        repository: &Option<String>,
        cache_path: &Path,
    ) -> Option<Acquisition> {
        let cleaned = clean_license_text(raw);
        if cleaned.is_empty() {
            return None;
        }
        if has_placeholders(&cleaned) || is_registry_stub(&cleaned) {
            debug!("Rejected candidate from {}", source);
            return None;
        }
        if let Some(parent) = cache_path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!("Could not create cache dir {}: {}", parent.display(), e);
            }
        }
        if let Err(e) = std::fs::write(cache_path, &cleaned) {
            warn!("Could not write cache entry {}: {}", cache_path.display(), e);
        }
        Some(Acquisition {
            text: cleaned,
            source,
            repository: repository.clone(),
            cache_path: Some(cache_path.to_path_buf()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn policy() -> AcquirePolicy {
        AcquirePolicy {
            allow_network: false,
            force_refresh: false,
            timeout: Duration::from_secs(5),
        }
    }

    fn acquirer(cache: &TempDir) -> Acquirer {
        Acquirer::new(cache.path().to_path_buf(), policy())
    }

    #[test]
    fn test_folder_license_is_found_and_cached() {
        let cache = TempDir::new().unwrap();
        let pkg = TempDir::new().unwrap();
        std::fs::write(pkg.path().join("LICENSE"), "MIT License\n\nbody").unwrap();

        let acq = acquirer(&cache)
            .acquire("Pkg", "1.0.0", Some(pkg.path()))
            .unwrap();
        assert!(acq.source.starts_with("file:"));
        assert_eq!(acq.text, "MIT License\n\nbody");

        let cached = std::fs::read_to_string(cache.path().join("Pkg-1.0.0.txt")).unwrap();
        assert_eq!(cached, "MIT License\n\nbody");
    }

    #[test]
    fn test_cache_hit_short_circuits() {
        let cache = TempDir::new().unwrap();
        std::fs::write(cache.path().join("Pkg-1.0.0.txt"), "cached body").unwrap();

        let acq = acquirer(&cache).acquire("Pkg", "1.0.0", None).unwrap();
        assert_eq!(acq.source, "cache");
        assert_eq!(acq.text, "cached body");
        assert!(acq.repository.is_none());
    }

    #[test]
    fn test_force_refresh_skips_cache() {
        let cache = TempDir::new().unwrap();
        std::fs::write(cache.path().join("Pkg-1.0.0.txt"), "stale").unwrap();
        let pkg = TempDir::new().unwrap();
        std::fs::write(pkg.path().join("LICENSE"), "fresh body").unwrap();

        let mut p = policy();
        p.force_refresh = true;
        let acq = Acquirer::new(cache.path().to_path_buf(), p)
            .acquire("Pkg", "1.0.0", Some(pkg.path()))
            .unwrap();
        assert_eq!(acq.text, "fresh body");
        let cached = std::fs::read_to_string(cache.path().join("Pkg-1.0.0.txt")).unwrap();
        assert_eq!(cached, "fresh body");
    }

    #[test]
    fn test_placeholder_cache_entry_is_ignored() {
        let cache = TempDir::new().unwrap();
        std::fs::write(
            cache.path().join("Pkg-1.0.0.txt"),
            "Copyright <year> <copyright holders>",
        )
        .unwrap();

        assert!(acquirer(&cache).acquire("Pkg", "1.0.0", None).is_none());
    }

    #[test]
    fn test_placeholder_candidate_advances_chain() {
        let cache = TempDir::new().unwrap();
        let pkg = TempDir::new().unwrap();
        std::fs::write(pkg.path().join("LICENSE"), "Copyright {year} Someone").unwrap();

        // The folder hit is an unfilled template, so it is rejected and the
        // chain moves on; with no other source the package ends up missing,
        // and nothing is cached.
        let result = acquirer(&cache).acquire("Pkg", "1.0.0", Some(pkg.path()));
        assert!(result.is_none());
        assert!(!cache.path().join("Pkg-1.0.0.txt").exists());
    }

    #[test]
    fn test_expression_resolves_builtin_offline() {
        let cache = TempDir::new().unwrap();
        let pkg = TempDir::new().unwrap();
        std::fs::write(
            pkg.path().join("Pkg.nuspec"),
            r#"<package><metadata><license type="expression">MIT</license></metadata></package>"#,
        )
        .unwrap();

        let acq = acquirer(&cache)
            .acquire("Pkg", "1.0.0", Some(pkg.path()))
            .unwrap();
        assert_eq!(acq.source, "spdx-expression");
        assert!(acq.text.contains("The MIT License"));
    }

    #[test]
    fn test_registry_expression_via_custom_base() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/Zlib.txt")
            .with_status(200)
            .with_body("zlib License\n\nCopyright 2024 Example.")
            .create();

        let cache = TempDir::new().unwrap();
        let pkg = TempDir::new().unwrap();
        std::fs::write(
            pkg.path().join("Pkg.nuspec"),
            r#"<package><metadata><license type="expression">Zlib</license></metadata></package>"#,
        )
        .unwrap();

        let mut p = policy();
        p.allow_network = true;
        let acq = Acquirer::new(cache.path().to_path_buf(), p)
            .with_registry_base(format!("{}/", server.url()))
            .acquire("Pkg", "1.0.0", Some(pkg.path()))
            .unwrap();
        assert_eq!(acq.source, "spdx-expression");
        assert!(acq.text.starts_with("zlib License"));
        mock.assert();
    }

    #[test]
    fn test_repository_carried_from_nuspec() {
        let cache = TempDir::new().unwrap();
        let pkg = TempDir::new().unwrap();
        std::fs::write(
            pkg.path().join("Pkg.nuspec"),
            r#"<package><metadata>
  <license type="expression">MIT</license>
  <repository type="git" url="https://github.com/example/pkg" />
</metadata></package>"#,
        )
        .unwrap();

        let acq = acquirer(&cache)
            .acquire("Pkg", "1.0.0", Some(pkg.path()))
            .unwrap();
        assert_eq!(acq.repository.as_deref(), Some("https://github.com/example/pkg"));
    }

    #[test]
    fn test_missing_when_no_sources() {
        let cache = TempDir::new().unwrap();
        assert!(acquirer(&cache).acquire("Ghost", "0.1.0", None).is_none());
    }
}
