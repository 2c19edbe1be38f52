//! Pick one representative license text per family

use crate::text::license_signature;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug)]
struct Variant {
    text: String,
    count: usize,
    alias: bool,
}

/// Selection criteria, in strict priority order. This ordering encodes
/// product judgment about which copy of a license represents a family:
/// an organization-declared alias wins outright, then the most common
/// variant, then the variant carrying a copyright line, then sheer length.
fn score(variant: &Variant) -> (bool, usize, bool, usize) {
    (
        variant.alias,
        variant.count,
        variant.text.to_lowercase().contains("copyright"),
        variant.text.len(),
    )
}

/// Choose the canonical license text for one family.
///
/// `alias_signatures` holds the normalized signatures of any texts the
/// family's organization declared as authoritative. Returns the chosen
/// original text plus, when members disagree, a signature -> occurrence
/// map for the variant warning. Ties break toward the lexicographically
/// smallest signature, so repeated runs are deterministic.
pub fn pick_canonical(
    texts: &[String],
    alias_signatures: &HashSet<String>,
) -> (String, BTreeMap<String, usize>) {
    let mut variants: BTreeMap<String, Variant> = BTreeMap::new();
    for text in texts {
        let sig = license_signature(text);
        let entry = variants.entry(sig.clone()).or_insert_with(|| Variant {
            text: text.clone(),
            count: 0,
            alias: alias_signatures.contains(&sig),
        });
        entry.count += 1;
    }

    let mut warning = BTreeMap::new();
    if variants.len() > 1 {
        for (sig, v) in &variants {
            warning.insert(sig.clone(), v.count);
        }
    }

    let mut best: Option<&Variant> = None;
    for variant in variants.values() {
        match best {
            Some(current) if score(variant) <= score(current) => {}
            _ => best = Some(variant),
        }
    }

    let canonical = best.map(|v| v.text.clone()).unwrap_or_default();
    (canonical, warning)
}

/// Signatures of an organization's declared license aliases.
pub fn alias_signatures(aliases: &[String]) -> HashSet<String> {
    aliases.iter().map(|a| license_signature(a)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_identical_texts_no_warning() {
        let t = "MIT License\n\nPermission is granted.";
        let (canonical, warning) = pick_canonical(&texts(&[t, t]), &HashSet::new());
        assert_eq!(canonical, t);
        assert!(warning.is_empty());
    }

    #[test]
    fn test_distinct_texts_warn_with_counts() {
        let (canonical, warning) = pick_canonical(
            &texts(&["License text A", "License text B"]),
            &HashSet::new(),
        );
        assert_eq!(warning.len(), 2);
        assert!(warning.values().all(|&c| c == 1));
        // tie on everything but length is impossible here; equal length and
        // no copyright means the smaller signature wins deterministically
        assert_eq!(canonical, "License text A");
    }

    #[test]
    fn test_majority_wins() {
        let (canonical, warning) = pick_canonical(
            &texts(&["Short variant", "The longer license body", "Short variant"]),
            &HashSet::new(),
        );
        assert_eq!(canonical, "Short variant");
        assert_eq!(warning.len(), 2);
        assert_eq!(warning[&license_signature("Short variant")], 2);
    }

    #[test]
    fn test_alias_beats_count() {
        let aliases = alias_signatures(&["Org approved text".to_string()]);
        let (canonical, _) = pick_canonical(
            &texts(&["Common text", "Common text", "Org approved text"]),
            &aliases,
        );
        assert_eq!(canonical, "Org approved text");
    }

    #[test]
    fn test_copyright_beats_length() {
        let (canonical, _) = pick_canonical(
            &texts(&[
                "A considerably longer license body without the magic word",
                "Copyright 2024 Example",
            ]),
            &HashSet::new(),
        );
        assert_eq!(canonical, "Copyright 2024 Example");
    }

    #[test]
    fn test_deterministic_across_runs() {
        let input = texts(&["Variant one text", "Variant two text", "Variant one text"]);
        let first = pick_canonical(&input, &HashSet::new());
        let second = pick_canonical(&input, &HashSet::new());
        assert_eq!(first, second);
    }
}
