//! JSONL logger: append-only line-delimited JSON activity log.
//!
//! Each line is a self-contained JSON object, assembled in memory and written
//! with a single `write_all` so a concurrent `tail -f` never sees a partial line.
//!
//! Lines go to the first sink that accepts them: primary file, fallback file,
//! stderr (prefixed `[RRH-JSONL]`), then nowhere. A sweep never fails because
//! logging failed.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, RrhError};
use crate::store::RegistrationEntry;

/// Severity level for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Routine progress.
    Info,
    /// Something was skipped but the pass continued.
    Warning,
    /// An operation on one entry failed.
    Error,
}

impl Severity {
    /// Upper-case console label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARN",
            Self::Error => "ERROR",
        }
    }
}

/// Event types emitted by a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A pass began.
    SweepStart,
    /// One root could not be listed and was skipped.
    RootEnumerationFailed,
    /// A version string was treated as absent.
    VersionUnparseable,
    /// Discovery matched an entry.
    EntryDiscovered,
    /// Cleanup matched an entry and will delete it.
    EntryRemoving,
    /// An entry was deleted.
    EntryRemoved,
    /// An entry could not be deleted.
    EntryRemovalFailed,
    /// Discovery matched nothing.
    NoMatches,
    /// The CSV report was written.
    ReportExported,
    /// The CSV report could not be written.
    ExportFailed,
    /// A pass finished.
    SweepComplete,
}

/// A single JSONL log entry. `ts`, `event`, `severity` and `message` are always set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// ISO 8601 UTC timestamp.
    pub ts: String,
    /// What happened.
    pub event: EventType,
    /// How bad it was.
    pub severity: Severity,
    /// Human-readable line echoed to the console.
    pub message: String,
    /// Store path of the entry involved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// `DisplayName` of the entry involved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Raw `DisplayVersion` of the entry involved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_version: Option<String>,
    /// Classification reason for a match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Root pattern involved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    /// `RRH-xxxx` code of the error involved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Rendered error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Row or entry count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    /// Free-form detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    /// Create a new entry stamped with the current UTC time.
    pub fn new(event: EventType, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            ts: format_utc_now(),
            event,
            severity,
            message: message.into(),
            path: None,
            display_name: None,
            display_version: None,
            reason: None,
            root: None,
            error_code: None,
            error_message: None,
            count: None,
            details: None,
        }
    }

    /// Attach the identifying properties of a registration entry.
    #[must_use]
    pub fn with_entry(mut self, entry: &RegistrationEntry) -> Self {
        self.path = Some(entry.path.clone());
        self.display_name.clone_from(&entry.display_name);
        self.display_version.clone_from(&entry.display_version);
        self
    }

    /// Attach a classification reason.
    #[must_use]
    pub fn with_reason(mut self, reason: Option<&str>) -> Self {
        self.reason = reason.map(str::to_string);
        self
    }

    /// Attach the root pattern involved.
    #[must_use]
    pub fn with_root(mut self, root: &str) -> Self {
        self.root = Some(root.to_string());
        self
    }

    /// Attach an error's code and message.
    #[must_use]
    pub fn with_error(mut self, error: &RrhError) -> Self {
        self.error_code = Some(error.code().to_string());
        self.error_message = Some(error.to_string());
        self
    }

    /// Attach a count.
    #[must_use]
    pub const fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    /// Attach free-form detail.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Configuration for the JSONL writer.
#[derive(Debug, Clone)]
pub struct JsonlConfig {
    /// Primary log file.
    pub path: PathBuf,
    /// Used when the primary file cannot be opened or written.
    pub fallback_path: Option<PathBuf>,
    /// A log already this large at open time is moved to `<path>.1` first.
    pub max_size_bytes: u64,
}

impl JsonlConfig {
    /// Config for `path` with the temp dir as fallback.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

impl Default for JsonlConfig {
    fn default() -> Self {
        Self {
            path: std::env::temp_dir().join("rrh").join("activity.jsonl"),
            fallback_path: Some(std::env::temp_dir().join("rrh-activity.jsonl")),
            max_size_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Where lines currently go.
enum Sink {
    Primary(BufWriter<File>),
    Fallback(BufWriter<File>),
    Stderr,
    Discard,
}

impl Sink {
    const fn name(&self) -> &'static str {
        match self {
            Self::Primary(_) => "normal",
            Self::Fallback(_) => "fallback",
            Self::Stderr => "stderr",
            Self::Discard => "discard",
        }
    }
}

/// Append-only JSONL log writer that degrades instead of failing.
pub struct JsonlWriter {
    config: JsonlConfig,
    sink: Sink,
}

impl JsonlWriter {
    /// Open the log, rolling over an oversized previous log and falling back as needed.
    pub fn open(config: JsonlConfig) -> Self {
        let sink = match open_log_file(&config.path, config.max_size_bytes) {
            Ok(file) => Sink::Primary(BufWriter::new(file)),
            Err(_) => Self::fallback_sink(&config),
        };
        Self { config, sink }
    }

    /// Write a single log entry as one JSONL line.
    pub fn write_entry(&mut self, entry: &LogEntry) {
        match serde_json::to_string(entry) {
            Ok(json) => self.write_line(&format!("{json}\n")),
            Err(e) => {
                let _ = writeln!(io::stderr(), "[RRH-JSONL] serialize error: {e}");
            }
        }
    }

    /// Flush buffered lines to the file sink, if any.
    pub fn flush(&mut self) {
        if let Sink::Primary(w) | Sink::Fallback(w) = &mut self.sink {
            let _ = w.flush();
        }
    }

    /// Current sink: `normal`, `fallback`, `stderr` or `discard`.
    #[must_use]
    pub fn state(&self) -> &str {
        self.sink.name()
    }

    fn write_line(&mut self, line: &str) {
        loop {
            let written = match &mut self.sink {
                Sink::Primary(w) | Sink::Fallback(w) => w.write_all(line.as_bytes()),
                Sink::Stderr => write!(io::stderr(), "[RRH-JSONL] {line}"),
                Sink::Discard => return,
            };
            if written.is_ok() {
                return;
            }
            self.sink = match self.sink {
                Sink::Primary(_) => Self::fallback_sink(&self.config),
                Sink::Fallback(_) => {
                    let _ = writeln!(io::stderr(), "[RRH-JSONL] fallback write failed, using stderr");
                    Sink::Stderr
                }
                Sink::Stderr | Sink::Discard => Sink::Discard,
            };
        }
    }

    fn fallback_sink(config: &JsonlConfig) -> Sink {
        let Some(fallback) = config.fallback_path.as_deref() else {
            let _ = writeln!(io::stderr(), "[RRH-JSONL] no writable log path, using stderr");
            return Sink::Stderr;
        };
        match open_log_file(fallback, config.max_size_bytes) {
            Ok(file) => {
                let _ = writeln!(
                    io::stderr(),
                    "[RRH-JSONL] primary path failed, using fallback: {}",
                    fallback.display()
                );
                Sink::Fallback(BufWriter::new(file))
            }
            Err(_) => {
                let _ = writeln!(io::stderr(), "[RRH-JSONL] no writable log path, using stderr");
                Sink::Stderr
            }
        }
    }
}

impl Drop for JsonlWriter {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Open `path` for appending, creating parents. An existing file of at least
/// `max_size` bytes is first renamed to `<path>.1`, replacing any older one.
fn open_log_file(path: &Path, max_size: u64) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| RrhError::io(parent, source))?;
    }
    let oversized = fs::metadata(path).is_ok_and(|m| m.is_file() && m.len() >= max_size);
    if oversized {
        let _ = fs::rename(path, previous_log(path));
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| RrhError::io(path, source))
}

fn previous_log(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".1");
    PathBuf::from(name)
}

/// Format current UTC time as ISO 8601.
pub(crate) fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(path: PathBuf) -> JsonlConfig {
        JsonlConfig {
            path,
            fallback_path: None,
            max_size_bytes: 1024 * 1024,
        }
    }

    #[test]
    fn write_entry_produces_valid_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.jsonl");
        let mut writer = JsonlWriter::open(config(path.clone()));

        writer.write_entry(&LogEntry::new(EventType::SweepStart, Severity::Info, "start"));
        writer.flush();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 1);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["event"], "sweep_start");
        assert_eq!(parsed["severity"], "info");
        assert_eq!(parsed["message"], "start");
    }

    #[test]
    fn entry_fields_are_carried() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entry.jsonl");
        let mut writer = JsonlWriter::open(config(path.clone()));

        let reg = RegistrationEntry::new(r"HKLM\Uninstall\{A}")
            .with_display_name("Adobe Bridge")
            .with_display_version("1.0");
        let err = RrhError::EntryDeletion {
            path: reg.path.clone(),
            details: "denied".to_string(),
        };
        writer.write_entry(
            &LogEntry::new(EventType::EntryRemovalFailed, Severity::Error, "error removing")
                .with_entry(&reg)
                .with_error(&err),
        );
        writer.flush();

        let parsed: serde_json::Value =
            serde_json::from_str(fs::read_to_string(&path).unwrap().trim()).unwrap();
        assert_eq!(parsed["path"], r"HKLM\Uninstall\{A}");
        assert_eq!(parsed["display_name"], "Adobe Bridge");
        assert_eq!(parsed["error_code"], "RRH-2003");
    }

    #[test]
    fn oversized_log_rolls_over_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roll.jsonl");
        fs::write(&path, "x".repeat(200)).unwrap();
        fs::write(previous_log(&path), "older").unwrap();

        let mut writer = JsonlWriter::open(JsonlConfig {
            max_size_bytes: 100,
            ..config(path.clone())
        });
        writer.write_entry(&LogEntry::new(EventType::SweepStart, Severity::Info, "fresh"));
        writer.flush();

        assert_eq!(fs::read_to_string(previous_log(&path)).unwrap(), "x".repeat(200));
        let current = fs::read_to_string(&path).unwrap();
        assert_eq!(current.lines().count(), 1);
        assert!(current.contains("fresh"));
    }

    #[test]
    fn small_log_is_appended_not_rolled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.jsonl");
        fs::write(&path, "{}\n").unwrap();

        let mut writer = JsonlWriter::open(JsonlConfig {
            max_size_bytes: 100,
            ..config(path.clone())
        });
        writer.write_entry(&LogEntry::new(EventType::SweepStart, Severity::Info, "s"));
        writer.flush();

        assert!(!previous_log(&path).exists());
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 2);
    }

    #[test]
    fn fallback_when_primary_dir_unwritable() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file, not a dir").unwrap();
        let fallback = dir.path().join("fallback.jsonl");
        let mut writer = JsonlWriter::open(JsonlConfig {
            fallback_path: Some(fallback.clone()),
            ..config(blocker.join("primary.jsonl"))
        });

        assert_eq!(writer.state(), "fallback");
        writer.write_entry(&LogEntry::new(EventType::ExportFailed, Severity::Warning, "x"));
        writer.flush();
        assert!(!fs::read_to_string(&fallback).unwrap().is_empty());
    }

    #[test]
    fn stderr_when_nothing_is_writable() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file").unwrap();
        let writer = JsonlWriter::open(config(blocker.join("primary.jsonl")));
        assert_eq!(writer.state(), "stderr");
    }

    #[test]
    fn optional_fields_omitted_when_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sparse.jsonl");
        let mut writer = JsonlWriter::open(config(path.clone()));

        writer.write_entry(&LogEntry::new(EventType::NoMatches, Severity::Info, "no matches"));
        writer.flush();

        let line = fs::read_to_string(&path).unwrap();
        assert!(!line.contains("\"path\""));
        assert!(!line.contains("\"reason\""));
        assert!(!line.contains("\"error_code\""));
    }

    #[test]
    fn appends_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("append.jsonl");
        for _ in 0..2 {
            let mut writer = JsonlWriter::open(config(path.clone()));
            writer.write_entry(&LogEntry::new(EventType::SweepStart, Severity::Info, "s"));
        }
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 2);
    }
}
