//! `{field}` placeholder substitution.
//!
//! A placeholder is any brace pair whose contents match a key exactly, so
//! keys may contain spaces, dashes or non-ASCII letters. Braces holding `:`
//! or `;` (inline CSS) are never placeholders.
//!
//! Values are inserted verbatim. No escaping is applied, so form values
//! containing markup end up in the rendered letter as markup. Substitution
//! is a single pass: braces inside an inserted value are not expanded.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([^{}:;\r\n]+)\}").expect("valid placeholder regex"))
}

/// Replace every `{name}` with `values[name]`. Unknown names are left as-is.
pub fn substitute(template: &str, values: &BTreeMap<String, String>) -> String {
    placeholder_regex()
        .replace_all(template, |caps: &Captures| match values.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Placeholder names in order of first appearance, without duplicates.
pub fn placeholder_names(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in placeholder_regex().captures_iter(template) {
        let name = &caps[1];
        if name.trim() != name {
            continue;
        }
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_substitute_known_and_unknown() {
        let out = substitute(
            "Kepada {nama} ({nip}) di {tempat}",
            &values(&[("nama", "Budi"), ("nip", "1987")]),
        );
        assert_eq!(out, "Kepada Budi (1987) di {tempat}");
    }

    #[test]
    fn test_substitute_repeats_and_no_recursion() {
        let out = substitute("{a}-{a}-{b}", &values(&[("a", "{b}"), ("b", "x")]));
        assert_eq!(out, "{b}-{b}-x");
    }

    #[test]
    fn test_values_are_not_escaped() {
        let out = substitute("<p>{nama}</p>", &values(&[("nama", "<b>Budi</b>")]));
        assert_eq!(out, "<p><b>Budi</b></p>");
    }

    #[test]
    fn test_keys_with_dashes_spaces_and_accents() {
        let out = substitute(
            "Nama: {nama-siswa}, lahir di {tempat lahir}, kelas {kelas_é}",
            &values(&[
                ("nama-siswa", "Budi"),
                ("tempat lahir", "Bandung"),
                ("kelas_é", "5A"),
            ]),
        );
        assert_eq!(out, "Nama: Budi, lahir di Bandung, kelas 5A");
    }

    #[test]
    fn test_keys_must_match_exactly() {
        let out = substitute("{ nama } {} {nama}", &values(&[("nama", "x")]));
        assert_eq!(out, "{ nama } {} x");
    }

    #[test]
    fn test_inline_css_is_left_alone() {
        let template = "<style>p { margin: 0; }</style><p>{nama}</p>";
        let out = substitute(template, &values(&[("nama", "Budi")]));
        assert_eq!(out, "<style>p { margin: 0; }</style><p>Budi</p>");
        assert_eq!(placeholder_names(template), vec!["nama"]);
    }

    #[test]
    fn test_placeholder_names() {
        assert_eq!(
            placeholder_names("{nama} {nip} {nama} {tempat lahir} { padded } {body}"),
            vec!["nama", "nip", "tempat lahir", "body"]
        );
        assert!(placeholder_names("no fields").is_empty());
    }
}
