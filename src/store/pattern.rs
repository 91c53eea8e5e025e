//! Wildcard root patterns for store enumeration.
//!
//! Store paths are compared in a canonical form: `/` separators, no trailing
//! separator, hive drive suffix (`HKLM:`) and long hive names
//! (`HKEY_LOCAL_MACHINE`) folded to the short hive name. Matching is
//! case-insensitive, like the registry itself.

use regex::Regex;

use crate::core::errors::{Result, RrhError};

const HIVE_ALIASES: &[(&str, &str)] = &[
    ("HKEY_LOCAL_MACHINE", "HKLM"),
    ("HKEY_CURRENT_USER", "HKCU"),
    ("HKEY_CLASSES_ROOT", "HKCR"),
    ("HKEY_USERS", "HKU"),
    ("HKEY_CURRENT_CONFIG", "HKCC"),
];

/// A compiled root pattern.
#[derive(Debug, Clone)]
pub struct RootPattern {
    original: String,
    compiled: Regex,
}

impl RootPattern {
    /// Compile a wildcard pattern.
    ///
    /// - `**` matches across path components
    /// - `*` matches within one component
    /// - `?` matches a single character within one component
    pub fn new(pattern: &str) -> Result<Self> {
        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            return Err(RrhError::InvalidPattern {
                pattern: pattern.to_string(),
                details: "pattern is empty".to_string(),
            });
        }
        let compiled = glob_to_regex(&normalize_store_path(trimmed)).map_err(|err| {
            RrhError::InvalidPattern {
                pattern: pattern.to_string(),
                details: err.to_string(),
            }
        })?;
        Ok(Self {
            original: pattern.to_string(),
            compiled,
        })
    }

    /// Whether a store path lies under this root.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.compiled.is_match(&normalize_store_path(path))
    }

    /// Pattern as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.original
    }
}

/// Canonical comparison form of a store path.
#[must_use]
pub fn normalize_store_path(path: &str) -> String {
    let unified = path.trim().replace('\\', "/");
    let trimmed = unified.trim_end_matches('/');

    let (head, rest) = trimmed
        .split_once('/')
        .map_or((trimmed, None), |(h, r)| (h, Some(r)));
    let head = head.strip_suffix(':').unwrap_or(head);
    let head = HIVE_ALIASES
        .iter()
        .find(|(long, _)| long.eq_ignore_ascii_case(head))
        .map_or(head, |(_, short)| short);

    match rest {
        Some(rest) => format!("{head}/{rest}"),
        None => head.to_string(),
    }
}

/// Case-folded [`normalize_store_path`], used wherever two paths must compare equal.
#[must_use]
pub fn store_path_key(path: &str) -> String {
    normalize_store_path(path).to_ascii_lowercase()
}

fn glob_to_regex(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    let mut regex_str = String::with_capacity(pattern.len() * 2);
    regex_str.push_str("(?i)^");

    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2) == Some(&'/') {
                    regex_str.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    regex_str.push_str(".*");
                    i += 2;
                }
            }
            '*' => {
                regex_str.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                regex_str.push_str("[^/]");
                i += 1;
            }
            c => {
                let mut buf = [0u8; 4];
                regex_str.push_str(&regex::escape(c.encode_utf8(&mut buf)));
                i += 1;
            }
        }
    }

    regex_str.push('$');
    Regex::new(&regex_str)
}
