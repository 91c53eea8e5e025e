//! Software-registration store: entry model, root patterns, and store backends.
//!
//! The engine only talks to a store through [`RegistrationStore`]. Reads take a
//! shared reference and deletions an exclusive one, so a discovery pass can be
//! handed a store it is statically unable to mutate.

pub mod memory;
pub mod pattern;
pub mod snapshot;

use serde::{Deserialize, Serialize};

use crate::core::errors::Result;

/// Tri-state `SystemComponent` marker of one registration entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemComponentFlag {
    /// The property was never set on the entry.
    #[default]
    Absent,
    /// Explicitly zero: a user-visible installed program.
    Zero,
    /// Non-zero: a hidden component registration.
    One,
}

impl SystemComponentFlag {
    /// Interpret a raw DWORD read from the store. Any non-zero value hides the entry.
    #[must_use]
    pub const fn from_dword(raw: Option<u32>) -> Self {
        match raw {
            None => Self::Absent,
            Some(0) => Self::Zero,
            Some(_) => Self::One,
        }
    }

    /// Raw DWORD form, `None` when absent.
    #[must_use]
    pub const fn as_dword(self) -> Option<u32> {
        match self {
            Self::Absent => None,
            Self::Zero => Some(0),
            Self::One => Some(1),
        }
    }

    /// Report/CSV rendering: empty, `0`, or `1`.
    #[must_use]
    pub const fn as_report_str(self) -> &'static str {
        match self {
            Self::Absent => "",
            Self::Zero => "0",
            Self::One => "1",
        }
    }
}

/// Immutable snapshot of one uninstall registration as read from the store.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegistrationEntry {
    /// Unique locator of the entry within this run's snapshot.
    pub path: String,
    /// `DisplayName`.
    pub display_name: Option<String>,
    /// Raw vendor-formatted version, not guaranteed numeric.
    pub display_version: Option<String>,
    /// `SystemComponent`.
    pub system_component: SystemComponentFlag,
    /// `Publisher`.
    pub publisher: Option<String>,
    /// `Comments`.
    pub comments: Option<String>,
}

impl RegistrationEntry {
    /// Start an entry with only its locator set.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Set `DisplayName`.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Set `DisplayVersion`.
    #[must_use]
    pub fn with_display_version(mut self, version: impl Into<String>) -> Self {
        self.display_version = Some(version.into());
        self
    }

    /// Set the `SystemComponent` flag.
    #[must_use]
    pub const fn with_system_component(mut self, flag: SystemComponentFlag) -> Self {
        self.system_component = flag;
        self
    }

    /// Set `Publisher`.
    #[must_use]
    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }

    /// Set `Comments`.
    #[must_use]
    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }
}

/// Hierarchical registration store addressable by wildcard root patterns.
///
/// Implementations must not hold locks across calls; every call is an
/// independent best-effort read or write against the live store.
pub trait RegistrationStore {
    /// List every entry under `root_pattern`. A failure covers only this root.
    fn enumerate(&self, root_pattern: &str) -> Result<Vec<RegistrationEntry>>;

    /// Remove the entry at `path`.
    fn delete(&mut self, path: &str) -> Result<()>;
}
