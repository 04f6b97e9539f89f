//! Deterministic placeholder substitution.
//!
//! Templates contain `{{NAME}}` tokens where `NAME` is a case-sensitive run of
//! ASCII alphanumerics and underscores. Rendering is a single left-to-right
//! pass: each token found in the template is replaced by its binding, and bound
//! values are never rescanned. Tokens without a binding are copied through
//! verbatim and reported.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").expect("static regex"));

/// Placeholder name → bound value.
pub type Bindings = BTreeMap<String, String>;

/// Format a placeholder token for `name`.
pub fn placeholder(name: &str) -> String {
    format!("{{{{{name}}}}}")
}

/// Result of a render pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    /// Names of placeholders left unresolved, in order of first appearance.
    pub unresolved: Vec<String>,
}

impl Rendered {
    pub fn is_clean(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Substitute every bound placeholder in `template`.
///
/// Pure: identical `(template, bindings)` always yield identical output.
pub fn render(template: &str, bindings: &Bindings) -> String {
    render_with_report(template, bindings).text
}

/// Substitute placeholders and collect the names left unresolved.
pub fn render_with_report(template: &str, bindings: &Bindings) -> Rendered {
    let mut unresolved: Vec<String> = Vec::new();
    let text = PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures<'_>| {
            let name = &caps[1];
            match bindings.get(name) {
                Some(value) => value.clone(),
                None => {
                    if !unresolved.iter().any(|seen| seen == name) {
                        unresolved.push(name.to_string());
                    }
                    caps[0].to_string()
                }
            }
        })
        .into_owned();
    Rendered { text, unresolved }
}

/// List the distinct placeholder names present in `text`, in order of first
/// appearance.
pub fn placeholders(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in PLACEHOLDER_RE.captures_iter(text) {
        let name = &caps[1];
        if !names.iter().any(|seen| seen == name) {
            names.push(name.to_string());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings(pairs: &[(&str, &str)]) -> Bindings {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn replaces_every_occurrence() {
        let out = render(
            "{{A}} and {{A}} then {{B}}",
            &bindings(&[("A", "x"), ("B", "y")]),
        );
        assert_eq!(out, "x and x then y");
    }

    #[test]
    fn names_are_case_sensitive() {
        let rendered = render_with_report("{{name}} {{NAME}}", &bindings(&[("NAME", "v")]));
        assert_eq!(rendered.text, "{{name}} v");
        assert_eq!(rendered.unresolved, vec!["name"]);
    }

    #[test]
    fn unresolved_tokens_stay_literal_and_are_reported_once() {
        let rendered = render_with_report("{{X}}-{{Y}}-{{X}}", &bindings(&[("Y", "1")]));
        assert_eq!(rendered.text, "{{X}}-1-{{X}}");
        assert_eq!(rendered.unresolved, vec!["X"]);
        assert!(!rendered.is_clean());
    }

    #[test]
    fn bound_values_are_not_rescanned() {
        let out = render(
            "{{OUTER}}",
            &bindings(&[("OUTER", "{{INNER}}"), ("INNER", "leak")]),
        );
        assert_eq!(out, "{{INNER}}");
    }

    #[test]
    fn self_binding_keeps_runtime_variable() {
        let rendered = render_with_report(
            "Hello {{COMPANY_NAME}}",
            &bindings(&[("COMPANY_NAME", "{{COMPANY_NAME}}")]),
        );
        assert_eq!(rendered.text, "Hello {{COMPANY_NAME}}");
        assert!(rendered.is_clean());
    }

    #[test]
    fn non_token_braces_are_untouched() {
        let out = render("{{ spaced }} {{a-b}} {single}", &bindings(&[("a", "x")]));
        assert_eq!(out, "{{ spaced }} {{a-b}} {single}");
    }

    #[test]
    fn rendering_is_repeatable() {
        let template = "<a>{{ONE}}</a>{{TWO}}{{THREE}}";
        let b = bindings(&[("ONE", "1"), ("TWO", "{{ONE}}")]);
        assert_eq!(render(template, &b), render(template, &b));
    }

    #[test]
    fn placeholders_lists_distinct_names() {
        assert_eq!(placeholders("{{B}} {{A}} {{B}}"), vec!["B", "A"]);
        assert_eq!(placeholder("AGENT_NAME"), "{{AGENT_NAME}}");
    }
}
