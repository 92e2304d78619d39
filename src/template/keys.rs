//! Lexical key scan, independent of compilation

use std::collections::BTreeSet;

/// Names referenced as `{{.name}}`, including pipelines that start with the
/// reference (`{{.name | upper}}`)
pub fn scan_keys(source: &str) -> BTreeSet<String> {
    let mut keys = BTreeSet::new();
    let mut rest = source;

    while let Some(start) = rest.find("{{") {
        let tail = &rest[start + 2..];
        let Some(end) = tail.find("}}") else {
            break;
        };
        let body = tail[..end].trim();
        if let Some(reference) = body.strip_prefix('.') {
            let name = reference
                .split(|c: char| c.is_whitespace() || c == '|')
                .next()
                .unwrap_or_default();
            if !name.is_empty() {
                keys.insert(name.to_string());
            }
        }
        rest = &tail[end + 2..];
    }

    keys
}
