//! Configuration system: TOML file + env var overrides + smart defaults.

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, RrhError};
use crate::scanner::rules::VendorProfile;
use crate::store::pattern::{RootPattern, store_path_key};

/// Native and 32-bit-on-64-bit uninstall roots.
pub const DEFAULT_ROOTS: &[&str] = &[
    r"HKLM\SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall\*",
    r"HKLM\SOFTWARE\WOW6432Node\Microsoft\Windows\CurrentVersion\Uninstall\*",
];

/// Default product-name pattern for the Adobe family.
///
/// Product names that are also common words (Bridge, Animate, Audition,
/// Dimension, Substance) are only matched through the vendor word itself.
pub const DEFAULT_PRODUCT_PATTERN: &str = r"\badobe\b|\b(?:photoshop|illustrator|indesign|incopy|after effects|lightroom|acrobat|dreamweaver|character animator|premiere (?:pro|elements|rush))\b";

/// Report file name inside the temp directory.
pub const DEFAULT_REPORT_FILE: &str = "rrh-residue-report.csv";

/// Full RRH configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    /// Store roots and snapshot location.
    pub store: StoreConfig,
    /// Vendor constants for classification.
    pub vendor: VendorConfig,
    /// Discovery report settings.
    pub report: ReportConfig,
    /// Config and log file locations.
    pub paths: PathsConfig,
}

/// Which store roots to enumerate and where the CLI's store lives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    /// Root patterns enumerated in order.
    pub roots: Vec<String>,
    /// JSON snapshot used by the CLI store.
    pub snapshot_file: PathBuf,
}

/// Vendor constants fed to the classification rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VendorConfig {
    /// Case-insensitive regex over `DisplayName`.
    pub product_pattern: String,
    /// Substring marking the vendor suite itself.
    pub family_term: String,
    /// Exact `Publisher` value, compared case-insensitively.
    pub publisher_legal_name: String,
    /// Substring of `Comments` left by the vendor packaging tool.
    pub packaging_marker: String,
    /// Entries newer than this are never matched.
    pub version_threshold: String,
}

/// Discovery report destination.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReportConfig {
    /// CSV destination.
    pub path: PathBuf,
}

/// Filesystem paths used by rrh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    /// Default config file location.
    pub config_file: PathBuf,
    /// Activity log file.
    pub jsonl_log: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            roots: DEFAULT_ROOTS.iter().map(|r| (*r).to_string()).collect(),
            snapshot_file: data_dir().join("uninstall-hives.json"),
        }
    }
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            product_pattern: DEFAULT_PRODUCT_PATTERN.to_string(),
            family_term: "Creative Cloud".to_string(),
            publisher_legal_name: "Adobe Inc.".to_string(),
            packaging_marker: "Creative Cloud Packager".to_string(),
            version_threshold: "1.0.0".to_string(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            path: env::temp_dir().join(DEFAULT_REPORT_FILE),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            config_file: home_dir().join(".config").join("rrh").join("config.toml"),
            jsonl_log: data_dir().join("activity.jsonl"),
        }
    }
}

fn home_dir() -> PathBuf {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .map_or_else(
            || {
                eprintln!(
                    "[RRH-CONFIG] WARNING: HOME not set, falling back to temp dir for data paths"
                );
                env::temp_dir()
            },
            PathBuf::from,
        )
}

fn data_dir() -> PathBuf {
    home_dir().join(".local").join("share").join("rrh")
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| RrhError::Io {
                path: path_buf.clone(),
                source,
            })?;
            toml::from_str::<Self>(&raw)?
        } else if is_explicit_path {
            return Err(RrhError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var);
        cfg.normalize();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic FNV-1a hash of the effective config for logging.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    /// Compile the vendor section into a rule profile.
    pub fn vendor_profile(&self) -> Result<VendorProfile> {
        VendorProfile::from_config(&self.vendor)
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F)
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("RRH_STORE_ROOTS") {
            self.store.roots = raw
                .split(';')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(raw) = lookup("RRH_STORE_SNAPSHOT_FILE") {
            self.store.snapshot_file = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("RRH_REPORT_PATH") {
            self.report.path = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("RRH_JSONL_LOG") {
            self.paths.jsonl_log = PathBuf::from(raw);
        }
        set_env_string(&mut lookup, "RRH_VENDOR_FAMILY_TERM", &mut self.vendor.family_term);
        set_env_string(
            &mut lookup,
            "RRH_VENDOR_PUBLISHER",
            &mut self.vendor.publisher_legal_name,
        );
        set_env_string(
            &mut lookup,
            "RRH_VENDOR_PACKAGING_MARKER",
            &mut self.vendor.packaging_marker,
        );
        set_env_string(
            &mut lookup,
            "RRH_VENDOR_VERSION_THRESHOLD",
            &mut self.vendor.version_threshold,
        );
    }

    fn normalize(&mut self) {
        for root in &mut self.store.roots {
            *root = root.trim().to_string();
        }
        let mut seen = HashSet::new();
        self.store.roots.retain(|root| seen.insert(store_path_key(root)));
    }

    fn validate(&self) -> Result<()> {
        if self.store.roots.is_empty() {
            return Err(RrhError::InvalidConfig {
                details: "store.roots must list at least one root pattern".to_string(),
            });
        }
        for root in &self.store.roots {
            RootPattern::new(root).map_err(|e| RrhError::InvalidConfig {
                details: format!("store.roots: {e}"),
            })?;
        }
        for (name, value) in [
            ("vendor.family_term", &self.vendor.family_term),
            ("vendor.publisher_legal_name", &self.vendor.publisher_legal_name),
            ("vendor.packaging_marker", &self.vendor.packaging_marker),
        ] {
            if value.trim().is_empty() {
                return Err(RrhError::InvalidConfig {
                    details: format!("{name} must not be empty"),
                });
            }
        }
        self.vendor_profile()?;
        if self.report.path.as_os_str().is_empty() {
            return Err(RrhError::InvalidConfig {
                details: "report.path must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn set_env_string<F>(lookup: &mut F, name: &str, slot: &mut String)
where
    F: FnMut(&str) -> Option<String>,
{
    if let Some(raw) = lookup(name) {
        *slot = raw;
    }
}
