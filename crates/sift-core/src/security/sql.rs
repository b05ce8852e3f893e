//! Screening of raw passthrough text.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

/// Patterns that mark raw text as an injection attempt.
const DANGEROUS_PATTERNS: &[(&str, &str)] = &[
    (
        "stacked statement",
        r"(?i);\s*(DROP|DELETE|UPDATE|INSERT|ALTER|CREATE|TRUNCATE)\b",
    ),
    ("union select", r"(?i)\bUNION\s+(ALL\s+)?SELECT\b"),
    ("trailing line comment", r"--[^\r\n]*$"),
    ("block comment", r"/\*"),
];

fn compiled_patterns() -> &'static [(&'static str, Regex)] {
    static PATTERNS: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        DANGEROUS_PATTERNS
            .iter()
            .filter_map(|(name, pattern)| Regex::new(pattern).ok().map(|re| (*name, re)))
            .collect()
    })
}

fn placeholder_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\$(\d+)|\?").ok())
        .as_ref()
}

/// Name of the first dangerous pattern the text matches.
pub fn find_dangerous_pattern(sql: &str) -> Option<&'static str> {
    compiled_patterns()
        .iter()
        .find(|(_, re)| re.is_match(sql))
        .map(|(name, _)| *name)
}

/// Number of positional parameters the text expects.
///
/// Numbered placeholders count once per distinct index (`$1` may repeat);
/// every `?` counts separately.
pub fn count_placeholders(sql: &str) -> usize {
    let Some(pattern) = placeholder_pattern() else {
        return 0;
    };
    let mut numbered = BTreeSet::new();
    let mut anonymous = 0;
    for caps in pattern.captures_iter(sql) {
        match caps.get(1) {
            Some(index) => {
                numbered.insert(index.as_str().to_string());
            }
            None => anonymous += 1,
        }
    }
    numbered.len() + anonymous
}
