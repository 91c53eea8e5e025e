//! Report exporter: writes a discovery pass's matches to a CSV file.
//!
//! The file is always replaced as a whole (temp sibling, then rename). With zero
//! matches nothing is written and a prior report is left in place.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::errors::{Result, RrhError};
use crate::logger::ActivityLog;
use crate::logger::jsonl::{EventType, LogEntry, Severity};
use crate::scanner::scan::MatchedEntry;

/// One CSV row. Field order is the column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRecord<'a> {
    /// Store path.
    pub path: &'a str,
    /// `DisplayName`, empty when absent.
    pub display_name: &'a str,
    /// Raw `DisplayVersion`, empty when absent.
    pub display_version: &'a str,
    /// Empty, `0` or `1`.
    pub system_component: &'static str,
    /// `Publisher`, empty when absent.
    pub publisher: &'a str,
    /// `Comments`, empty when absent.
    pub comments: &'a str,
    /// Why the entry matched.
    pub reason: &'a str,
}

impl<'a> From<&'a MatchedEntry> for ReportRecord<'a> {
    fn from(m: &'a MatchedEntry) -> Self {
        let e = &m.entry;
        Self {
            path: &e.path,
            display_name: e.display_name.as_deref().unwrap_or_default(),
            display_version: e.display_version.as_deref().unwrap_or_default(),
            system_component: e.system_component.as_report_str(),
            publisher: e.publisher.as_deref().unwrap_or_default(),
            comments: e.comments.as_deref().unwrap_or_default(),
            reason: m.reason(),
        }
    }
}

/// What the exporter did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Nothing matched; no file written.
    Skipped,
    /// Report replaced with `rows` data rows.
    Written {
        /// Path involved.
        path: PathBuf,
        /// Data rows written.
        rows: usize,
    },
}

/// Write `matches` to `path`. Empty input writes nothing.
pub fn write_report(path: &Path, matches: &[MatchedEntry]) -> Result<ExportOutcome> {
    if matches.is_empty() {
        return Ok(ExportOutcome::Skipped);
    }
    let export_error = |details: String| RrhError::Export {
        path: path.to_path_buf(),
        details,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| export_error(e.to_string()))?;
    }

    let tmp = temp_sibling(path);
    let written = write_rows(&tmp, matches).and_then(|()| {
        fs::rename(&tmp, path).map_err(|e| RrhError::io(path, e))
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(export_error(e.to_string()));
    }

    Ok(ExportOutcome::Written {
        path: path.to_path_buf(),
        rows: matches.len(),
    })
}

/// Export and log the outcome. Never fails; errors are logged and returned as `None`.
pub fn export_and_log<L>(path: &Path, matches: &[MatchedEntry], log: &mut L) -> Option<PathBuf>
where
    L: ActivityLog + ?Sized,
{
    match write_report(path, matches) {
        Ok(ExportOutcome::Skipped) => {
            log.record(LogEntry::new(
                EventType::NoMatches,
                Severity::Info,
                "no matches",
            ));
            None
        }
        Ok(ExportOutcome::Written { path, rows }) => {
            log.record(
                LogEntry::new(
                    EventType::ReportExported,
                    Severity::Info,
                    format!("exported {rows} matches to {}", path.display()),
                )
                .with_count(rows)
                .with_details(path.display().to_string()),
            );
            Some(path)
        }
        Err(e) => {
            log.record(
                LogEntry::new(
                    EventType::ExportFailed,
                    Severity::Error,
                    format!("report export failed: {e}"),
                )
                .with_error(&e),
            );
            None
        }
    }
}

fn write_rows(tmp: &Path, matches: &[MatchedEntry]) -> Result<()> {
    let mut writer = csv::Writer::from_path(tmp)?;
    for m in matches {
        writer.serialize(ReportRecord::from(m))?;
    }
    writer.flush().map_err(|e| RrhError::io(tmp, e))?;
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
