//! Network fallbacks: SPDX registry texts, declared URLs, and repository
//! branch guessing. Every failure here means "no result", never an error.

use super::spdx_texts;
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Raw text endpoint of the SPDX license-list registry.
pub const SPDX_RAW: &str = "https://raw.githubusercontent.com/spdx/license-list-data/main/text/";

/// Default branch names tried when guessing a repository license path.
/// Best-effort only; repositories with other default branches are simply
/// not found by this step.
const REPO_BRANCHES: &[&str] = &["master", "main"];

/// Blocking HTTP client for the acquisition chain
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> crate::error::Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// GET a URL as text; any failure (transport or HTTP status) is None.
    pub fn get_text(&self, url: &str) -> Option<String> {
        match self.client.get(url).send() {
            Ok(response) if response.status().is_success() => response.text().ok(),
            Ok(response) => {
                debug!("GET {} -> HTTP {}", url, response.status());
                None
            }
            Err(e) => {
                debug!("GET {} failed: {}", url, e);
                None
            }
        }
    }
}

/// Reduce a license expression to its first bare identifier.
///
/// `MIT OR Apache-2.0` -> `MIT`; WITH exception clauses are dropped. Inputs
/// the `spdx` crate cannot parse fall back to naive splitting.
pub fn first_license_id(expr: &str) -> Option<String> {
    if let Ok(parsed) = spdx::Expression::parse(expr) {
        if let Some(req) = parsed.requirements().next() {
            // Read the token back out of the source text. The parser
            // canonicalizes some ids (GPL-2.0-only displays as GPL-2.0) and
            // the registry fetch needs the declared identifier.
            let span = req.span.start as usize..req.span.end as usize;
            if let Some(raw) = expr.get(span) {
                if let Some(token) = raw.split_whitespace().next() {
                    return Some(
                        token
                            .trim_matches(|c| c == '(' || c == ')')
                            .to_string(),
                    );
                }
            }
        }
    }
    let id = expr
        .split(" OR ")
        .next()
        .unwrap_or(expr)
        .split(" AND ")
        .next()
        .unwrap_or(expr)
        .trim()
        .trim_matches(|c| c == '(' || c == ')' || c == ' ');
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Resolve a license expression to full text: built-in table first, then the
/// SPDX registry when a fetcher is available.
pub fn fetch_expression_text(
    expr: &str,
    fetcher: Option<&HttpFetcher>,
    registry_base: &str,
) -> Option<String> {
    let id = first_license_id(expr)?;
    if let Some(text) = spdx_texts::builtin(&id) {
        return Some(text.to_string());
    }
    let fetcher = fetcher?;
    fetcher.get_text(&format!("{}{}.txt", registry_base, id))
}

/// Try the conventional license file path on each common default branch.
pub fn guess_repository_license(fetcher: &HttpFetcher, repo_url: &str) -> Option<String> {
    let base = repo_url.trim_end_matches('/');
    for branch in REPO_BRANCHES {
        let url = format!("{}/blob/{}/LICENSE?plain=1", base, branch);
        if let Some(text) = fetcher.get_text(&url) {
            return Some(text);
        }
    }
    None
}
