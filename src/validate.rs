//! Read-only structural checks against an existing notices document

use crate::assemble::parse_sections;
use crate::config::NoticeConfig;
use crate::error::Result;
use crate::family::{self, Classifier, FamiliesConfig};
use crate::resolver;
use crate::text::has_placeholders;
use crate::types::{FamilyMap, ValidationReport};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// Keywords expected near the top of any genuine license body.
const KEYWORDS: &[&str] = &[
    "license",
    "permission",
    "copyright",
    "apache",
    "mit",
    "bsd",
    "gpl",
];

/// How many leading body lines are searched for a keyword.
const KEYWORD_WINDOW: usize = 8;

fn contains_keyword(body: &str) -> bool {
    body.lines().take(KEYWORD_WINDOW).any(|line| {
        let lower = line.to_lowercase();
        KEYWORDS.iter().any(|kw| lower.contains(kw))
    })
}

/// Whitespace-only lines are exempt from the indentation rule.
fn uniformly_indented(body: &str, indent: &str) -> bool {
    body.lines()
        .filter(|line| !line.trim().is_empty())
        .all(|line| line.starts_with(indent))
}

/// The family expectations the generator would produce, without network
/// inputs, so both tools agree on grouping.
fn expected_families(config: &NoticeConfig) -> FamilyMap {
    let families_cfg = FamiliesConfig::load(&config.paths.families_file);
    let orgs = family::load_org_config(&config.paths.orgs_file);
    let classifier = Classifier::new(
        &config.manual_dependencies,
        &families_cfg,
        orgs,
        config.grouping.clone(),
    );

    let mut map = FamilyMap::new();
    for entry in &config.manual_dependencies {
        for pkg in &entry.packages {
            map.insert(&entry.family, pkg);
        }
    }
    // Persisted groupings influence expectations only through the
    // classifier tier; config entries with no current package stay unknown.
    for id in resolver::load_direct_packages(&config.paths.project_file) {
        map.insert(&classifier.classify_offline(&id), &id);
    }
    map
}

/// Validate the document at `notices_path` against structure and grouping
/// rules. Errors are fatal to the caller's exit code, warnings advisory.
pub fn run_check(config: &NoticeConfig, notices_path: &Path) -> Result<ValidationReport> {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let text = match std::fs::read_to_string(notices_path) {
        Ok(t) => t,
        Err(_) => {
            return Ok(ValidationReport {
                preamble_lines: 0,
                sections_count: 0,
                alphabetical_ok: false,
                expected_order: Vec::new(),
                titles: Vec::new(),
                errors: vec![format!("Document not found: {}", notices_path.display())],
                warnings,
            });
        }
    };

    let (preamble, sections) = parse_sections(&text);
    if sections.is_empty() {
        errors.push(format!("No sections found in {}", notices_path.display()));
    }
    let titles: Vec<String> = sections.iter().map(|(name, _)| name.clone()).collect();

    let mut expected_order = titles.clone();
    expected_order.sort_by_key(|name| name.to_lowercase());
    let alphabetical_ok = titles == expected_order;
    if !alphabetical_ok {
        errors.push(format!(
            "Sections are not in alphabetical order; expected: {}",
            expected_order.join(", ")
        ));
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for (name, _) in &sections {
        if !seen.insert(name.as_str()) {
            errors.push(format!("Duplicate section heading: {}", name));
        }
    }

    for (name, body) in &sections {
        if body.trim().is_empty() {
            errors.push(format!("Section {} has an empty body", name));
            continue;
        }
        if !contains_keyword(body) {
            errors.push(format!(
                "Section {} does not look like a license (no keyword in the first {} lines)",
                name, KEYWORD_WINDOW
            ));
        }
        if !uniformly_indented(body, &config.document.indent) {
            errors.push(format!("Section {} is not uniformly indented", name));
        }
        if has_placeholders(body) {
            errors.push(format!(
                "Section {} contains unresolved placeholder text",
                name
            ));
        }
    }

    let expected = expected_families(config);
    let title_set: HashSet<&str> = titles.iter().map(|t| t.as_str()).collect();
    let manual_sections: HashSet<&str> = config
        .document
        .manual_sections
        .iter()
        .map(|s| s.as_str())
        .collect();

    for name in &titles {
        let known = expected.get(name).is_some()
            || expected.family_of(name).is_some()
            || manual_sections.contains(name.as_str());
        if !known {
            errors.push(format!(
                "Section {} maps to no known family, package, or manual section",
                name
            ));
        }
    }

    for (name, members) in expected.iter() {
        let family_present = title_set.contains(name);
        let member_titles: Vec<&str> = members
            .iter()
            .map(|m| m.as_str())
            .filter(|m| *m != name && title_set.contains(m))
            .collect();
        debug!(
            "family {}: heading {}, {} member heading(s)",
            name,
            family_present,
            member_titles.len()
        );
        if family_present && !member_titles.is_empty() {
            errors.push(format!(
                "Family {} has a grouped section alongside individual members: {}",
                name,
                member_titles.join(", ")
            ));
        } else if !family_present {
            if member_titles.len() > 1 {
                warnings.push(format!(
                    "Family {} has multiple packages present but not grouped: {}",
                    name,
                    member_titles.join(", ")
                ));
            } else if member_titles.is_empty() {
                warnings.push(format!("Family {} is missing from the document", name));
            }
        }
    }

    Ok(ValidationReport {
        preamble_lines: preamble.lines().count(),
        sections_count: sections.len(),
        alphabetical_ok,
        expected_order,
        titles,
        errors,
        warnings,
    })
}
