//! Version normalizer: scrubs vendor-formatted version strings into comparable tuples.
//!
//! Scrub order:
//! 1. drop a trailing segment made only of zero digits (`1.0.0000` -> `1.0`)
//! 2. drop interior segments made only of zero digits, merging separators
//! 3. parse 1..=4 dot-separated `u32` components
//!
//! Parsed tuples are zero-padded to at least three components, so `1.0`,
//! `1.0.0` and `1.0.0000` are all `(1,0,0)`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::core::errors::{Result, RrhError};

const MIN_COMPONENTS: usize = 3;
const MAX_COMPONENTS: usize = 4;

/// A parsed, comparable version tuple.
#[derive(Debug, Clone)]
pub struct NormalizedVersion {
    components: Vec<u32>,
}

impl NormalizedVersion {
    /// Components after zero padding.
    #[must_use]
    pub fn components(&self) -> &[u32] {
        &self.components
    }

    fn padded(&self, len: usize) -> impl Iterator<Item = u32> + '_ {
        self.components
            .iter()
            .copied()
            .chain(std::iter::repeat(0))
            .take(len)
    }
}

impl PartialEq for NormalizedVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for NormalizedVersion {}

impl PartialOrd for NormalizedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NormalizedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        self.padded(len).cmp(other.padded(len))
    }
}

impl fmt::Display for NormalizedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.components.iter().map(u32::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

impl FromStr for NormalizedVersion {
    type Err = RrhError;

    fn from_str(raw: &str) -> Result<Self> {
        let scrubbed = scrub(raw);
        let unparseable = |details: String| RrhError::VersionParse {
            raw: raw.to_string(),
            details,
        };

        if scrubbed.is_empty() {
            return Err(unparseable("nothing left after scrubbing zero segments".to_string()));
        }

        let mut components = scrubbed
            .split('.')
            .map(|part| {
                part.parse::<u32>()
                    .map_err(|e| unparseable(format!("segment {part:?}: {e}")))
            })
            .collect::<Result<Vec<u32>>>()?;

        if components.len() > MAX_COMPONENTS {
            return Err(unparseable(format!(
                "{} components, at most {MAX_COMPONENTS} allowed",
                components.len()
            )));
        }
        if components.len() < MIN_COMPONENTS {
            components.resize(MIN_COMPONENTS, 0);
        }
        Ok(Self { components })
    }
}

/// Result of normalizing one entry's `DisplayVersion`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionOutcome {
    /// No `DisplayVersion` property.
    Absent,
    /// A dotted numeric version.
    Parsed(NormalizedVersion),
    /// Present but not numeric; classified as absent.
    Unparseable {
        /// Version string as read.
        raw: String,
        /// What went wrong.
        details: String,
    },
}

impl VersionOutcome {
    /// The parsed version, if any. Unparseable and absent both yield `None`.
    #[must_use]
    pub const fn parsed(&self) -> Option<&NormalizedVersion> {
        match self {
            Self::Parsed(v) => Some(v),
            Self::Absent | Self::Unparseable { .. } => None,
        }
    }
}

/// Normalize an optional raw version string. Never fails.
#[must_use]
pub fn normalize(raw: Option<&str>) -> VersionOutcome {
    let Some(raw) = raw else {
        return VersionOutcome::Absent;
    };
    match raw.parse::<NormalizedVersion>() {
        Ok(version) => VersionOutcome::Parsed(version),
        Err(RrhError::VersionParse { raw, details }) => VersionOutcome::Unparseable { raw, details },
        Err(other) => VersionOutcome::Unparseable {
            raw: raw.to_string(),
            details: other.to_string(),
        },
    }
}

fn is_zero_segment(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b == b'0')
}

fn scrub(raw: &str) -> String {
    let mut segments: Vec<&str> = raw.trim().split('.').collect();

    if segments.last().is_some_and(|s| is_zero_segment(s)) {
        segments.pop();
    }

    let last = segments.len().saturating_sub(1);
    let kept: Vec<&str> = segments
        .iter()
        .enumerate()
        .filter(|&(i, s)| i == 0 || i == last || !is_zero_segment(s))
        .map(|(_, s)| *s)
        .collect();

    kept.join(".")
}
