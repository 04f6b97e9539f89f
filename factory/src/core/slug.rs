//! Subject name normalization.

use std::sync::LazyLock;

use regex::Regex;

static DISALLOWED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9\s-]").expect("static regex"));
static SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s-]+").expect("static regex"));

/// Convert a human-readable subject into a URL-friendly slug.
///
/// Lowercases, drops anything outside ASCII alphanumerics, whitespace and
/// hyphens, collapses separator runs into a single hyphen, then trims hyphens
/// from both ends. The result may be empty.
pub fn slugify(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let stripped = DISALLOWED_RE.replace_all(&lowered, "");
    let collapsed = SEPARATOR_RE.replace_all(&stripped, "-");
    collapsed.trim_matches('-').to_string()
}
