//! Store backed by a JSON export of the uninstall-information hives.
//!
//! The file is re-read on every call, so each enumeration sees whatever the
//! file holds at that moment. Deletions rewrite it through a temp sibling and
//! a rename, preserving every property of the surviving entries, including
//! properties this crate does not interpret.
//!
//! ```json
//! {
//!   "entries": [
//!     {
//!       "path": "HKLM\\SOFTWARE\\...\\Uninstall\\{GUID}",
//!       "DisplayName": "Adobe Photoshop CC",
//!       "DisplayVersion": "1.0.0",
//!       "SystemComponent": 1,
//!       "Publisher": "Adobe Inc.",
//!       "InstallLocation": "C:\\Program Files\\Adobe"
//!     }
//!   ]
//! }
//! ```


use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, RrhError};
use crate::store::pattern::{RootPattern, store_path_key};
use crate::store::{RegistrationEntry, RegistrationStore, SystemComponentFlag};

/// On-disk document layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotDocument {
    /// Exported keys.
    #[serde(default)]
    pub entries: Vec<SnapshotRecord>,
}

/// One exported key with its raw property values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// Full key path.
    pub path: String,
    /// `DisplayName`.
    #[serde(rename = "DisplayName", default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// `DisplayVersion`.
    #[serde(rename = "DisplayVersion", default, skip_serializing_if = "Option::is_none")]
    pub display_version: Option<String>,
    /// Raw `SystemComponent` DWORD.
    #[serde(rename = "SystemComponent", default, skip_serializing_if = "Option::is_none")]
    pub system_component: Option<u32>,
    /// `Publisher`.
    #[serde(rename = "Publisher", default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    /// `Comments`.
    #[serde(rename = "Comments", default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    /// Properties carried through untouched on rewrite.
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_json::Value>,
}

impl From<&SnapshotRecord> for RegistrationEntry {
    fn from(record: &SnapshotRecord) -> Self {
        Self {
            path: record.path.clone(),
            display_name: record.display_name.clone(),
            display_version: record.display_version.clone(),
            system_component: SystemComponentFlag::from_dword(record.system_component),
            publisher: record.publisher.clone(),
            comments: record.comments.clone(),
        }
    }
}

impl From<&RegistrationEntry> for SnapshotRecord {
    fn from(entry: &RegistrationEntry) -> Self {
        Self {
            path: entry.path.clone(),
            display_name: entry.display_name.clone(),
            display_version: entry.display_version.clone(),
            system_component: entry.system_component.as_dword(),
            publisher: entry.publisher.clone(),
            comments: entry.comments.clone(),
            other: BTreeMap::new(),
        }
    }
}

/// File-backed registration store.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Open an existing snapshot file, validating that it parses.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
        };
        store.read_document()?;
        Ok(store)
    }

    /// Write a fresh snapshot containing `entries`, replacing any existing file.
    pub fn create(path: impl AsRef<Path>, entries: &[RegistrationEntry]) -> Result<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
        };
        let document = SnapshotDocument {
            entries: entries.iter().map(SnapshotRecord::from).collect(),
        };
        store.write_document(&document)?;
        Ok(store)
    }

    /// Snapshot file backing this store.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every entry in the file, in file order.
    pub fn entries(&self) -> Result<Vec<RegistrationEntry>> {
        Ok(self
            .read_document()?
            .entries
            .iter()
            .map(RegistrationEntry::from)
            .collect())
    }

    fn read_document(&self) -> Result<SnapshotDocument> {
        let raw = fs::read_to_string(&self.path).map_err(|e| RrhError::io(&self.path, e))?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn write_document(&self, document: &SnapshotDocument) -> Result<()> {
        let tmp = temp_sibling(&self.path);
        let body = serde_json::to_vec_pretty(document)?;
        let mut file = fs::File::create(&tmp).map_err(|e| RrhError::io(&tmp, e))?;
        file.write_all(&body).map_err(|e| RrhError::io(&tmp, e))?;
        file.sync_all().map_err(|e| RrhError::io(&tmp, e))?;
        drop(file);
        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            RrhError::io(&self.path, e)
        })
    }
}

impl RegistrationStore for SnapshotStore {
    fn enumerate(&self, root_pattern: &str) -> Result<Vec<RegistrationEntry>> {
        let root = RootPattern::new(root_pattern)?;
        let document = self
            .read_document()
            .map_err(|e| RrhError::RootEnumeration {
                root: root_pattern.to_string(),
                details: e.to_string(),
            })?;
        Ok(document
            .entries
            .iter()
            .filter(|record| root.matches(&record.path))
            .map(RegistrationEntry::from)
            .collect())
    }

    fn delete(&mut self, path: &str) -> Result<()> {
        let deletion_error = |details: String| RrhError::EntryDeletion {
            path: path.to_string(),
            details,
        };
        let mut document = self
            .read_document()
            .map_err(|e| deletion_error(e.to_string()))?;
        let key = store_path_key(path);
        let before = document.entries.len();
        document
            .entries
            .retain(|record| store_path_key(&record.path) != key);
        if document.entries.len() == before {
            return Err(deletion_error("entry does not exist".to_string()));
        }
        self.write_document(&document)
            .map_err(|e| deletion_error(e.to_string()))
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
