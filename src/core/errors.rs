//! RRH-prefixed error types with structured error codes.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, RrhError>;

/// Top-level error type for Registry Residue Helper.
#[derive(Debug, Error)]
pub enum RrhError {
    /// Config failed validation.
    #[error("[RRH-1001] invalid configuration: {details}")]
    InvalidConfig {
        /// What went wrong.
        details: String,
    },

    /// An explicitly named config file does not exist.
    #[error("[RRH-1002] missing configuration file: {path}")]
    MissingConfig {
        /// Path involved.
        path: PathBuf,
    },

    /// Config file could not be parsed.
    #[error("[RRH-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        /// What was being parsed or encoded.
        context: &'static str,
        /// What went wrong.
        details: String,
    },

    /// One store root could not be listed.
    #[error("[RRH-2001] failed to enumerate store root {root}: {details}")]
    RootEnumeration {
        /// Root pattern as given.
        root: String,
        /// What went wrong.
        details: String,
    },

    /// A version string is not dotted numeric.
    #[error("[RRH-2002] unparseable version {raw:?}: {details}")]
    VersionParse {
        /// Version string as read.
        raw: String,
        /// What went wrong.
        details: String,
    },

    /// One entry could not be removed.
    #[error("[RRH-2003] failed to delete entry {path}: {details}")]
    EntryDeletion {
        /// Path involved.
        path: String,
        /// What went wrong.
        details: String,
    },

    /// The CSV report could not be written.
    #[error("[RRH-2004] report export to {path} failed: {details}")]
    Export {
        /// Path involved.
        path: PathBuf,
        /// What went wrong.
        details: String,
    },

    /// A root pattern is empty or malformed.
    #[error("[RRH-2005] invalid root pattern {pattern:?}: {details}")]
    InvalidPattern {
        /// Pattern as given.
        pattern: String,
        /// What went wrong.
        details: String,
    },

    /// JSON, CSV or TOML encoding failed.
    #[error("[RRH-2101] serialization failure in {context}: {details}")]
    Serialization {
        /// What was being parsed or encoded.
        context: &'static str,
        /// What went wrong.
        details: String,
    },

    /// Filesystem failure.
    #[error("[RRH-3002] IO failure at {path}: {source}")]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Anything else.
    #[error("[RRH-3900] runtime failure: {details}")]
    Runtime {
        /// What went wrong.
        details: String,
    },
}

impl RrhError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "RRH-1001",
            Self::MissingConfig { .. } => "RRH-1002",
            Self::ConfigParse { .. } => "RRH-1003",
            Self::RootEnumeration { .. } => "RRH-2001",
            Self::VersionParse { .. } => "RRH-2002",
            Self::EntryDeletion { .. } => "RRH-2003",
            Self::Export { .. } => "RRH-2004",
            Self::InvalidPattern { .. } => "RRH-2005",
            Self::Serialization { .. } => "RRH-2101",
            Self::Io { .. } => "RRH-3002",
            Self::Runtime { .. } => "RRH-3900",
        }
    }

    /// Whether re-running the pass might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. }
                | Self::RootEnumeration { .. }
                | Self::EntryDeletion { .. }
                | Self::Export { .. }
                | Self::Runtime { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for RrhError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<csv::Error> for RrhError {
    fn from(value: csv::Error) -> Self {
        Self::Serialization {
            context: "csv",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for RrhError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
