//! License text normalization, signatures, and rejection filters

use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

/// Unfilled template fields that disqualify a license text.
const PLACEHOLDER_MARKERS: &[&str] = &[
    "<year>",
    "<copyright",
    "{year}",
    "yyyy",
    "replaceable-license-text",
];

/// Markers of registry boilerplate standing in for the actual license body.
const REGISTRY_STUB_MARKERS: &[&str] = &[
    "spdx identifier",
    "data pulled from spdx",
    "replaceable-license-text",
    "licenses.nuget.org",
];

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").unwrap())
}

fn spaces_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t]+").unwrap())
}

fn blank_runs_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").unwrap())
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Detect texts that are an HTML page rather than a plain license body.
pub fn looks_like_html(text: &str) -> bool {
    let sample = text.trim().to_lowercase();
    sample.contains("<html") || sample.starts_with("<!doctype") || sample.contains("<body")
}

fn unescape_entities(text: &str) -> Cow<'_, str> {
    match quick_xml::escape::unescape(text) {
        Ok(unescaped) => unescaped,
        // Bad entities are left alone rather than failing the candidate.
        Err(_) => Cow::Borrowed(text),
    }
}

/// Normalize a candidate license text.
///
/// Line endings are unified, markup is stripped when the text looks like an
/// HTML page, character entities are unescaped, horizontal whitespace runs
/// collapse to one space, and runs of more than two newlines collapse to a
/// single blank line.
pub fn clean_license_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let mut normalized = text.replace("\r\n", "\n");
    if looks_like_html(&normalized) {
        normalized = tag_re().replace_all(&normalized, " ").into_owned();
    }
    let normalized = unescape_entities(&normalized);
    let normalized = spaces_re().replace_all(&normalized, " ");
    let normalized = blank_runs_re().replace_all(&normalized, "\n\n");
    normalized.trim().to_string()
}

/// Whitespace-collapsed, case-folded form used to compare license copies.
pub fn license_signature(text: &str) -> String {
    let cleaned = clean_license_text(text);
    whitespace_re()
        .replace_all(cleaned.trim(), " ")
        .to_lowercase()
}

/// True when the text still contains unresolved template fields.
pub fn has_placeholders(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    let low = text.to_lowercase();
    PLACEHOLDER_MARKERS.iter().any(|m| low.contains(m))
}

/// True when the text is registry boilerplate rather than a license body.
pub fn is_registry_stub(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    let low = text.to_lowercase();
    REGISTRY_STUB_MARKERS.iter().any(|m| low.contains(m))
}

/// Re-indent a block uniformly: strip leading whitespace per line, then prefix.
pub fn indent_block(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|ln| format!("{}{}", prefix, ln.trim_start()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_collapses_whitespace() {
        let raw = "MIT  License\r\n\r\n\r\n\r\nPermission\tis granted.";
        let cleaned = clean_license_text(raw);
        assert_eq!(cleaned, "MIT License\n\nPermission is granted.");
    }

    #[test]
    fn test_clean_strips_html() {
        let raw = "<!DOCTYPE html><html><body><p>MIT License &amp; more</p></body></html>";
        let cleaned = clean_license_text(raw);
        assert!(!cleaned.contains('<'));
        assert!(cleaned.contains("MIT License & more"));
    }

    #[test]
    fn test_clean_plain_text_keeps_angle_brackets() {
        // Not an HTML page, so inline markers survive for the placeholder filter.
        let raw = "Copyright <year> <copyright holders>";
        let cleaned = clean_license_text(raw);
        assert!(cleaned.contains("<year>"));
        assert!(has_placeholders(&cleaned));
    }

    #[test]
    fn test_signature_folds_case_and_whitespace() {
        let a = "MIT License\n\nPermission is granted.";
        let b = "mit  license permission IS granted.";
        assert_eq!(license_signature(a), license_signature(b));
    }

    #[test]
    fn test_placeholder_markers() {
        assert!(has_placeholders("Copyright {year} Example"));
        assert!(has_placeholders("Copyright YYYY Holder"));
        assert!(!has_placeholders("Copyright 2024 Example"));
        assert!(!has_placeholders(""));
    }

    #[test]
    fn test_registry_stub_markers() {
        assert!(is_registry_stub("Data pulled from SPDX, see licenses.nuget.org"));
        assert!(!is_registry_stub("The MIT License (MIT)"));
    }

    #[test]
    fn test_indent_block() {
        let text = "line one\n  line two\n\nline three";
        let indented = indent_block(text, "    ");
        assert_eq!(indented, "    line one\n    line two\n    \n    line three");
    }
}
