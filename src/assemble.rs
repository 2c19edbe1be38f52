//! Assemble the notices document and drive a full update run

use crate::acquire::{AcquirePolicy, Acquirer};
use crate::canonical::{alias_signatures, pick_canonical};
use crate::config::NoticeConfig;
use crate::error::{NoticeError, Result};
use crate::family::{self, Classifier, FamiliesConfig, FamilyEntry};
use crate::resolver;
use crate::text::{clean_license_text, indent_block};
use crate::types::{FamilyMap, PackageNotice, Resolution, VariantWarning};
use chrono::Utc;
use serde::Serialize;
use similar::TextDiff;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Flags controlling one update run
#[derive(Debug, Clone)]
pub struct UpdateOptions {
    /// Allow network fallbacks during acquisition
    pub allow_network: bool,
    /// Ignore cached license texts
    pub force_refresh: bool,
    /// Compute and diff but write no document
    pub dry_run: bool,
    /// Rewrite the persisted families configuration after the run
    pub sync_families: bool,
    /// Incremental mode: re-acquire only this package's family
    pub package: Option<String>,
    /// Override for the default trace location
    pub trace_file: Option<PathBuf>,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            allow_network: false,
            force_refresh: false,
            dry_run: false,
            sync_families: true,
            package: None,
            trace_file: None,
        }
    }
}

/// Everything produced by one update run
#[derive(Debug)]
pub struct UpdateOutcome {
    /// The rendered (planned or written) document
    pub document: String,
    /// Unified diff against the existing document, dry-run only
    pub diff: Option<String>,
    pub warnings: Vec<VariantWarning>,
    pub family_map: FamilyMap,
    pub packages: Vec<PackageNotice>,
    pub run_dir: PathBuf,
    pub trace_path: PathBuf,
    /// False in dry-run mode
    pub written: bool,
}

#[derive(Serialize)]
struct RunTrace<'a> {
    packages: &'a [PackageNotice],
    warnings: &'a [VariantWarning],
    family_packages: &'a FamilyMap,
    notices: String,
    allow_network: bool,
    force_refresh: bool,
    dry_run: bool,
    package: Option<&'a str>,
    run_dir: String,
    timestamp: &'a str,
}

/// Run the full pipeline: resolve, acquire, classify, assemble, write.
pub fn run_update(config: &NoticeConfig, opts: &UpdateOptions) -> Result<UpdateOutcome> {
    let timestamp = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
    let run_dir = config.cache.runs_dir.join(&timestamp);
    std::fs::create_dir_all(&run_dir)?;
    let trace_path = opts
        .trace_file
        .clone()
        .unwrap_or_else(|| config.cache.trace_file.clone());

    let direct = resolver::load_direct_packages(&config.paths.project_file);
    if direct.is_empty() {
        return Err(NoticeError::NoDirectPackages(
            config.paths.project_file.display().to_string(),
        ));
    }
    info!("Found {} direct package references", direct.len());

    let central = resolver::load_central_versions(&config.paths.props_file);
    let lock = resolver::load_lock_data(&config.paths.assets_file);
    let resolutions = resolver::resolve_packages(&direct, &central, &lock);

    let families_cfg = FamiliesConfig::load(&config.paths.families_file);
    let orgs = family::load_org_config(&config.paths.orgs_file);
    let classifier = Classifier::new(
        &config.manual_dependencies,
        &families_cfg,
        orgs,
        config.grouping.clone(),
    );

    let mut packages: Vec<PackageNotice> = Vec::new();
    let mut missing: Vec<String> = Vec::new();

    // Dependencies bundled with the repository carry their license in-tree.
    for entry in &config.manual_dependencies {
        let text = std::fs::read(&entry.license_path)
            .ok()
            .map(|bytes| clean_license_text(&String::from_utf8_lossy(&bytes)));
        for pkg in &entry.packages {
            match &text {
                Some(t) if !t.is_empty() => packages.push(PackageNotice {
                    id: pkg.clone(),
                    version: "local".to_string(),
                    license_text: t.clone(),
                    source: entry.license_path.display().to_string(),
                    package_path: entry
                        .license_path
                        .parent()
                        .map(|p| p.display().to_string()),
                    cache_path: None,
                    repository: None,
                    owner: None,
                    family: entry.family.clone(),
                }),
                _ => missing.push(format!("{} (manual license missing)", pkg)),
            }
        }
    }

    let target_family = opts.package.as_ref().map(|pkg| {
        if !direct.contains(pkg) {
            warn!("{} is not a declared direct dependency; continuing anyway", pkg);
        }
        classifier.classify_offline(pkg)
    });

    let targets: Vec<Resolution> = match &target_family {
        Some(fam) => resolutions
            .iter()
            .filter(|r| classifier.classify_offline(&r.id) == *fam)
            .cloned()
            .collect(),
        None => resolutions.clone(),
    };

    // Resolution failures abort before any acquisition.
    let unresolved = resolver::unresolved_ids(&targets);
    if !unresolved.is_empty() {
        return Err(NoticeError::UnresolvedPackages(unresolved));
    }

    let acquirer = Acquirer::new(
        config.cache.license_dir.clone(),
        AcquirePolicy {
            allow_network: opts.allow_network,
            force_refresh: opts.force_refresh,
            timeout: config.network.timeout(),
        },
    );

    for res in &targets {
        let Some(version) = res.version.as_ref() else {
            continue;
        };
        match acquirer.acquire(&res.id, version, res.package_path.as_deref()) {
            Some(acq) => {
                let owner = acq
                    .repository
                    .as_deref()
                    .and_then(family::extract_repo_owner);
                let fam = classifier.classify(&res.id, owner.as_deref());
                debug!("{} {} via {} -> family {}", res.id, version, acq.source, fam);
                packages.push(PackageNotice {
                    id: res.id.clone(),
                    version: version.clone(),
                    license_text: acq.text,
                    source: acq.source,
                    package_path: res.package_path.as_ref().map(|p| p.display().to_string()),
                    cache_path: acq.cache_path.map(|p| p.display().to_string()),
                    repository: acq.repository,
                    owner,
                    family: fam,
                });
            }
            None => missing.push(format!("{} {}", res.id, version)),
        }
    }

    // All lookups complete first; an incomplete document is never written.
    if !missing.is_empty() {
        return Err(NoticeError::MissingLicenses(missing));
    }

    let mut family_map = FamilyMap::new();
    for pkg in &packages {
        family_map.insert(&pkg.family, &pkg.id);
    }
    if target_family.is_some() {
        // Classification state covers the whole run even when only one
        // family was re-acquired.
        for res in &resolutions {
            let fam = classifier.classify_offline(&res.id);
            family_map.insert(&fam, &res.id);
        }
    }
    if family_map.conflicts() > 0 {
        warn!(
            "{} package(s) matched more than one family; first mapping kept",
            family_map.conflicts()
        );
    }

    let (mut sections, warnings) =
        build_sections(&packages, &classifier, &config.document.indent);

    let (preamble, existing_sections) = read_sections(&config.paths.notices_file);
    let current_text =
        std::fs::read_to_string(&config.paths.notices_file).unwrap_or_default();
    std::fs::write(run_dir.join("current_notices.md"), &current_text)?;

    // Curated sections without a backing package survive regeneration.
    for name in &config.document.manual_sections {
        if sections.iter().all(|(n, _)| n != name) {
            if let Some((_, body)) = existing_sections.iter().find(|(n, _)| n == name) {
                sections.push((name.clone(), body.clone()));
            }
        }
    }

    // Incremental mode: sections outside the re-acquired family are carried
    // from the existing document, but only under headings the run's family
    // map still expects. Stale headings are dropped, not copied forward.
    if target_family.is_some() {
        for (name, body) in &existing_sections {
            if sections.iter().any(|(n, _)| n == name) {
                continue;
            }
            if family_map.get(name).is_some() {
                sections.push((name.clone(), body.clone()));
            } else {
                warn!("Dropping section {} no longer present in the family map", name);
            }
        }
    }

    let document = render_document(&preamble, &sections);
    std::fs::write(run_dir.join("planned_notices.md"), &document)?;

    let mut diff = None;
    let mut written = false;
    if opts.dry_run {
        diff = Some(
            TextDiff::from_lines(&current_text, &document)
                .unified_diff()
                .context_radius(3)
                .header("current", "planned")
                .to_string(),
        );
    } else {
        std::fs::write(&config.paths.notices_file, &document)?;
        written = true;
        if opts.sync_families {
            sync_families_config(&config.paths.families_file, &family_map)?;
        }
    }

    let trace = RunTrace {
        packages: &packages,
        warnings: &warnings,
        family_packages: &family_map,
        notices: config.paths.notices_file.display().to_string(),
        allow_network: opts.allow_network,
        force_refresh: opts.force_refresh,
        dry_run: opts.dry_run,
        package: opts.package.as_deref(),
        run_dir: run_dir.display().to_string(),
        timestamp: &timestamp,
    };
    let trace_json = serde_json::to_string_pretty(&trace)?;
    if let Some(parent) = trace_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&trace_path, &trace_json)?;
    std::fs::write(run_dir.join("trace.json"), &trace_json)?;

    Ok(UpdateOutcome {
        document,
        diff,
        warnings,
        family_map,
        packages,
        run_dir,
        trace_path,
        written,
    })
}

/// Group acquired packages by family and render one body per family.
fn build_sections(
    packages: &[PackageNotice],
    classifier: &Classifier,
    indent: &str,
) -> (Vec<(String, String)>, Vec<VariantWarning>) {
    let mut grouped: Vec<(String, Vec<&PackageNotice>)> = Vec::new();
    for pkg in packages {
        match grouped.iter_mut().find(|(name, _)| *name == pkg.family) {
            Some((_, members)) => members.push(pkg),
            None => grouped.push((pkg.family.clone(), vec![pkg])),
        }
    }
    grouped.sort_by_key(|(name, _)| name.to_lowercase());

    let mut sections = Vec::with_capacity(grouped.len());
    let mut warnings = Vec::new();
    for (fam, members) in grouped {
        let texts: Vec<String> = members.iter().map(|p| p.license_text.clone()).collect();
        let aliases = classifier
            .org_entry(&fam)
            .map(|org| alias_signatures(&org.license_aliases))
            .unwrap_or_default();
        let (canonical, variants) = pick_canonical(&texts, &aliases);
        if !variants.is_empty() {
            warnings.push(VariantWarning {
                family: fam.clone(),
                variants,
                packages: members.iter().map(|p| p.id.clone()).collect(),
            });
        }
        let body = format!("{}\n", indent_block(canonical.trim(), indent));
        sections.push((fam, body));
    }
    (sections, warnings)
}

fn section_title(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("##")?;
    if rest.starts_with(' ') || rest.starts_with('\t') {
        Some(rest.trim())
    } else {
        None
    }
}

/// Split a notices document into preamble and ordered (heading, body) pairs.
pub fn parse_sections(text: &str) -> (String, Vec<(String, String)>) {
    let mut preamble_lines: Vec<&str> = Vec::new();
    let mut sections: Vec<(String, String)> = Vec::new();
    let mut current: Option<String> = None;
    let mut buf: Vec<&str> = Vec::new();

    for line in text.lines() {
        if let Some(title) = section_title(line) {
            match current.take() {
                None => preamble_lines = std::mem::take(&mut buf),
                Some(name) => {
                    sections.push((name, finish_body(&buf)));
                    buf.clear();
                }
            }
            current = Some(title.to_string());
        } else {
            buf.push(line);
        }
    }
    if let Some(name) = current {
        sections.push((name, finish_body(&buf)));
    }

    let preamble = preamble_lines.join("\n").trim().to_string();
    let preamble = if preamble.is_empty() {
        preamble
    } else {
        preamble + "\n"
    };
    (preamble, sections)
}

fn finish_body(lines: &[&str]) -> String {
    let mut body = lines.join("\n").trim_matches('\n').to_string();
    body.push('\n');
    body
}

/// Read and split an existing document; a missing file is an empty document.
pub fn read_sections(path: &Path) -> (String, Vec<(String, String)>) {
    match std::fs::read_to_string(path) {
        Ok(text) => parse_sections(&text),
        Err(_) => (String::new(), Vec::new()),
    }
}

/// Render the document with sections alphabetized case-insensitively.
pub fn render_document(preamble: &str, sections: &[(String, String)]) -> String {
    let mut order: Vec<&(String, String)> = sections.iter().collect();
    order.sort_by_key(|(name, _)| name.to_lowercase());

    let mut out: Vec<String> = Vec::new();
    if !preamble.trim().is_empty() {
        out.push(preamble.trim_end().to_string());
        out.push(String::new());
    }
    for (name, body) in order {
        out.push(format!("## {}", name));
        out.push(String::new());
        out.push(body.trim_end().to_string());
        out.push(String::new());
    }
    let mut text = out.join("\n").trim_end().to_string();
    text.push('\n');
    text
}

/// Persist the run's groupings back to the families configuration.
pub fn sync_families_config(path: &Path, family_map: &FamilyMap) -> Result<()> {
    let mut entries: Vec<FamilyEntry> = family_map
        .iter()
        .map(|(name, members)| {
            let mut packages: Vec<String> = members.to_vec();
            packages.sort();
            FamilyEntry {
                name: name.to_string(),
                retain: true,
                packages,
            }
        })
        .collect();
    entries.sort_by_key(|e| e.name.to_lowercase());

    let cfg = FamiliesConfig {
        version: "1.0".to_string(),
        families: entries,
    };
    std::fs::write(path, serde_json::to_string_pretty(&cfg)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GroupingRules, ManualDependency, NoticeConfig};
    use crate::family::FamiliesConfig;
    use tempfile::TempDir;

    fn classifier() -> Classifier {
        Classifier::new(
            &[],
            &FamiliesConfig::default(),
            Vec::new(),
            GroupingRules::default(),
        )
    }

    fn notice(id: &str, family: &str, text: &str) -> PackageNotice {
        PackageNotice {
            id: id.to_string(),
            version: "1.0.0".to_string(),
            license_text: text.to_string(),
            source: "test".to_string(),
            package_path: None,
            cache_path: None,
            repository: None,
            owner: None,
            family: family.to_string(),
        }
    }

    #[test]
    fn test_grouped_family_single_section_no_warning() {
        let t = "MIT License\n\nPermission is granted.";
        let packages = vec![notice("PkgA", "Acme", t), notice("PkgB", "Acme", t)];
        let (sections, warnings) = build_sections(&packages, &classifier(), "    ");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].0, "Acme");
        assert_eq!(
            sections[0].1,
            "    MIT License\n    \n    Permission is granted.\n"
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_divergent_family_warns_with_counts() {
        let packages = vec![
            notice("PkgA", "Acme", "License variant one"),
            notice("PkgB", "Acme", "License variant two"),
        ];
        let (_, warnings) = build_sections(&packages, &classifier(), "    ");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].family, "Acme");
        assert_eq!(warnings[0].packages, vec!["PkgA", "PkgB"]);
        let counts: Vec<usize> = warnings[0].variants.values().copied().collect();
        assert_eq!(counts, vec![1, 1]);
    }

    #[test]
    fn test_parse_render_round_trip() {
        let doc = "Intro paragraph.\n\n## Alpha\n\n    Alpha license text\n\n## beta\n\n    Beta license text\n";
        let (preamble, sections) = parse_sections(doc);
        assert_eq!(preamble, "Intro paragraph.\n");
        assert_eq!(sections.len(), 2);
        let rendered = render_document(&preamble, &sections);
        assert_eq!(rendered, doc);
        // a second pass is byte-identical
        let (p2, s2) = parse_sections(&rendered);
        assert_eq!(render_document(&p2, &s2), rendered);
    }

    #[test]
    fn test_render_sorts_case_insensitively() {
        let sections = vec![
            ("beta".to_string(), "    b\n".to_string()),
            ("Alpha".to_string(), "    a\n".to_string()),
        ];
        let rendered = render_document("", &sections);
        let alpha = rendered.find("## Alpha").unwrap();
        let beta = rendered.find("## beta").unwrap();
        assert!(alpha < beta);
    }

    struct Fixture {
        dir: TempDir,
        config: NoticeConfig,
    }

    /// A self-contained project layout with two resolvable packages whose
    /// licenses ship in unpacked package folders.
    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let root = dir.path();

        std::fs::write(
            root.join("App.csproj"),
            r#"<Project Sdk="Microsoft.NET.Sdk">
  <ItemGroup>
    <PackageReference Include="Acme.Core" />
    <PackageReference Include="Acme.Extras" />
  </ItemGroup>
</Project>"#,
        )
        .unwrap();

        let pkgs = root.join("pkgs");
        for (folder, version) in [("acme.core", "1.2.0"), ("acme.extras", "2.0.1")] {
            let p = pkgs.join(folder).join(version);
            std::fs::create_dir_all(&p).unwrap();
            std::fs::write(p.join("LICENSE"), "MIT License\n\nCopyright 2024 Acme.").unwrap();
        }

        std::fs::write(
            root.join("project.assets.json"),
            format!(
                r#"{{
  "targets": {{
    "net8.0": {{
      "Acme.Core/1.2.0": {{}},
      "Acme.Extras/2.0.1": {{}}
    }}
  }},
  "packageFolders": {{"{}": {{}}}}
}}"#,
                pkgs.display()
            ),
        )
        .unwrap();

        let mut config = NoticeConfig::default();
        config.paths.project_file = root.join("App.csproj");
        config.paths.props_file = root.join("Directory.Packages.props");
        config.paths.assets_file = root.join("project.assets.json");
        config.paths.notices_file = root.join("THIRD-PARTY-NOTICES.md");
        config.paths.families_file = root.join("third-party-families.json");
        config.paths.orgs_file = root.join("third-party-orgs.json");
        config.cache.license_dir = root.join(".cache/licenses");
        config.cache.runs_dir = root.join(".cache/runs");
        config.cache.trace_file = root.join(".cache/update_trace.json");

        Fixture { dir, config }
    }

    #[test]
    fn test_run_update_end_to_end_offline() {
        let fx = fixture();
        let outcome = run_update(&fx.config, &UpdateOptions::default()).unwrap();

        assert!(outcome.written);
        assert!(outcome.warnings.is_empty());
        // dotted roots collapse into one family with both members
        assert_eq!(outcome.family_map.names(), &["Acme".to_string()]);
        assert_eq!(outcome.family_map.get("Acme").unwrap().len(), 2);

        let doc = std::fs::read_to_string(&fx.config.paths.notices_file).unwrap();
        assert!(doc.contains("## Acme"));
        assert!(doc.contains("    MIT License"));
        assert_eq!(doc.matches("## ").count(), 1);

        // trace and run snapshots exist
        assert!(fx.config.cache.trace_file.is_file());
        assert!(outcome.run_dir.join("trace.json").is_file());
        assert!(outcome.run_dir.join("planned_notices.md").is_file());

        // families config synced
        let families = FamiliesConfig::load(&fx.config.paths.families_file);
        assert_eq!(families.families.len(), 1);
        assert_eq!(families.families[0].name, "Acme");

        drop(fx.dir);
    }

    #[test]
    fn test_run_update_is_idempotent() {
        let fx = fixture();
        run_update(&fx.config, &UpdateOptions::default()).unwrap();
        let first = std::fs::read_to_string(&fx.config.paths.notices_file).unwrap();
        run_update(&fx.config, &UpdateOptions::default()).unwrap();
        let second = std::fs::read_to_string(&fx.config.paths.notices_file).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_run_update_preserves_preamble_and_manual_section() {
        let mut fx = fixture();
        fx.config.document.manual_sections = vec!["CURATED ART PACK".to_string()];
        std::fs::write(
            &fx.config.paths.notices_file,
            "Hand-written preamble.\n\n## CURATED ART PACK\n\n    curated license body\n",
        )
        .unwrap();

        let outcome = run_update(&fx.config, &UpdateOptions::default()).unwrap();
        assert!(outcome.document.starts_with("Hand-written preamble.\n"));
        assert!(outcome.document.contains("## CURATED ART PACK"));
        assert!(outcome.document.contains("    curated license body"));
    }

    #[test]
    fn test_run_update_dry_run_writes_nothing() {
        let fx = fixture();
        let opts = UpdateOptions {
            dry_run: true,
            ..UpdateOptions::default()
        };
        let outcome = run_update(&fx.config, &opts).unwrap();
        assert!(!outcome.written);
        assert!(outcome.diff.is_some());
        assert!(outcome.diff.unwrap().contains("## Acme"));
        assert!(!fx.config.paths.notices_file.exists());
        assert!(!fx.config.paths.families_file.exists());
    }

    #[test]
    fn test_run_update_unresolved_is_fatal() {
        let fx = fixture();
        // remove the lock data so neither source can supply versions
        std::fs::write(&fx.config.paths.assets_file, "{}").unwrap();
        let err = run_update(&fx.config, &UpdateOptions::default()).unwrap_err();
        match err {
            NoticeError::UnresolvedPackages(ids) => {
                assert_eq!(ids, vec!["Acme.Core", "Acme.Extras"])
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_run_update_missing_license_fails_whole_run() {
        let fx = fixture();
        let pkgs = fx.dir.path().join("pkgs");
        std::fs::remove_file(pkgs.join("acme.extras/2.0.1/LICENSE")).unwrap();

        let err = run_update(&fx.config, &UpdateOptions::default()).unwrap_err();
        match err {
            NoticeError::MissingLicenses(ids) => {
                assert_eq!(ids, vec!["Acme.Extras 2.0.1"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        // no partial document was written
        assert!(!fx.config.paths.notices_file.exists());
    }

    #[test]
    fn test_run_update_manual_dependency_missing_license() {
        let mut fx = fixture();
        fx.config.manual_dependencies = vec![ManualDependency {
            family: "Bundled".to_string(),
            packages: vec!["Bundled.Lib".to_string()],
            license_path: fx.dir.path().join("nonexistent/LICENSE"),
        }];
        let err = run_update(&fx.config, &UpdateOptions::default()).unwrap_err();
        match err {
            NoticeError::MissingLicenses(ids) => {
                assert_eq!(ids, vec!["Bundled.Lib (manual license missing)"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    /// Extend the fixture with a third package forming its own family.
    fn add_widget_package(fx: &Fixture) {
        let root = fx.dir.path();
        std::fs::write(
            root.join("App.csproj"),
            r#"<Project Sdk="Microsoft.NET.Sdk">
  <ItemGroup>
    <PackageReference Include="Acme.Core" />
    <PackageReference Include="Acme.Extras" />
    <PackageReference Include="Widget" />
  </ItemGroup>
</Project>"#,
        )
        .unwrap();

        let pkgs = root.join("pkgs");
        let dir = pkgs.join("widget").join("1.0.0");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("LICENSE"), "MIT License\n\nCopyright 2024 Widget.").unwrap();

        std::fs::write(
            root.join("project.assets.json"),
            format!(
                r#"{{
  "targets": {{
    "net8.0": {{
      "Acme.Core/1.2.0": {{}},
      "Acme.Extras/2.0.1": {{}},
      "Widget/1.0.0": {{}}
    }}
  }},
  "packageFolders": {{"{}": {{}}}}
}}"#,
                pkgs.display()
            ),
        )
        .unwrap();
    }

    #[test]
    fn test_run_update_incremental_carries_expected_sections_only() {
        let fx = fixture();
        add_widget_package(&fx);
        run_update(&fx.config, &UpdateOptions::default()).unwrap();

        // hand-edit the document: mangle both real bodies and add a heading
        // the classification no longer produces
        let doc = std::fs::read_to_string(&fx.config.paths.notices_file).unwrap();
        let doc = doc
            .replace("Copyright 2024 Acme.", "stale acme body")
            .replace("Copyright 2024 Widget.", "edited widget body")
            + "\n## Zzz.Other\n\n    orphaned license body\n";
        std::fs::write(&fx.config.paths.notices_file, doc).unwrap();

        let opts = UpdateOptions {
            package: Some("Acme.Core".to_string()),
            ..UpdateOptions::default()
        };
        let outcome = run_update(&fx.config, &opts).unwrap();

        // target family re-acquired, non-target family carried by heading
        assert!(outcome.document.contains("Copyright 2024 Acme."));
        assert!(!outcome.document.contains("stale acme body"));
        assert!(outcome.document.contains("edited widget body"));
        // heading absent from the run's family map is dropped
        assert!(!outcome.document.contains("## Zzz.Other"));
        assert!(outcome.family_map.get("Zzz.Other").is_none());
    }
}
