//! Template content validation and data sanitization

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{TemplaterError, TemplaterResult};
use crate::models::DataMap;

use super::{DANGEROUS_COMMANDS, DANGEROUS_PATTERNS, INJECTION_SEQUENCES};

fn dangerous_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        DANGEROUS_PATTERNS
            .iter()
            .filter_map(|src| Regex::new(src).ok())
            .collect()
    })
}

/// Reject template source that names a dangerous command or idiom
///
/// Fails closed on the first match: tokens are checked against the command
/// denylist first, then the whole text against the idiom patterns.
pub fn validate_template_content(content: &str) -> TemplaterResult<()> {
    for word in content.split_whitespace() {
        if let Some(cmd) = DANGEROUS_COMMANDS
            .iter()
            .find(|cmd| word.eq_ignore_ascii_case(cmd))
        {
            return Err(TemplaterError::UnsafeContent {
                reason: format!("dangerous command detected: {}", cmd),
            });
        }
    }

    for pattern in dangerous_patterns() {
        if let Some(found) = pattern.find(content) {
            return Err(TemplaterError::UnsafeContent {
                reason: format!(
                    "dangerous pattern detected: '{}' matches {}",
                    found.as_str(),
                    pattern.as_str()
                ),
            });
        }
    }

    Ok(())
}

/// Strip shell injection sequences from a single value
///
/// Repeats until stable, since removing `;` from `&;&` leaves `&&`.
pub fn sanitize_value(value: &str) -> String {
    let mut out = value.to_string();
    while INJECTION_SEQUENCES.iter().any(|seq| out.contains(seq)) {
        out = INJECTION_SEQUENCES
            .iter()
            .fold(out, |acc, seq| acc.replace(seq, ""));
    }
    out
}

/// Copy of `data` with injection sequences stripped from every value
pub fn sanitize_data(data: &DataMap) -> DataMap {
    data.iter()
        .map(|(k, v)| (k.clone(), sanitize_value(v)))
        .collect()
}
