//! Tee logger: every entry goes to the JSONL file and is echoed to the console
//! as `[timestamp] message`.

use std::io::{self, Write};

use crate::logger::ActivityLog;
use crate::logger::jsonl::{JsonlConfig, JsonlWriter, LogEntry, Severity};

/// How much of the activity stream reaches the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EchoLevel {
    /// Every entry.
    #[default]
    All,
    /// Warnings and errors only (`--quiet`).
    Problems,
    /// Nothing; file only.
    Off,
}

impl EchoLevel {
    const fn admits(self, severity: Severity) -> bool {
        match self {
            Self::All => true,
            Self::Problems => !matches!(severity, Severity::Info),
            Self::Off => false,
        }
    }
}

/// JSONL file sink plus console echo.
pub struct TeeLogger {
    jsonl: Option<JsonlWriter>,
    console: Box<dyn Write + Send>,
    echo: EchoLevel,
}

impl TeeLogger {
    /// File at `config.path` with stderr echo.
    pub fn open(config: JsonlConfig, echo: EchoLevel) -> Self {
        Self {
            jsonl: Some(JsonlWriter::open(config)),
            console: Box::new(io::stderr()),
            echo,
        }
    }

    /// Console echo only, no file.
    #[must_use]
    pub fn console_only(echo: EchoLevel) -> Self {
        Self {
            jsonl: None,
            console: Box::new(io::stderr()),
            echo,
        }
    }

    /// Replace the console sink.
    #[must_use]
    pub fn with_console(mut self, console: Box<dyn Write + Send>) -> Self {
        self.console = console;
        self
    }

    /// Degradation state of the file sink, `None` when there is no file.
    pub fn file_state(&self) -> Option<&str> {
        self.jsonl.as_ref().map(JsonlWriter::state)
    }

    /// Flush both sinks.
    pub fn flush(&mut self) {
        if let Some(w) = self.jsonl.as_mut() {
            w.flush();
        }
        let _ = self.console.flush();
    }
}

impl ActivityLog for TeeLogger {
    fn record(&mut self, entry: LogEntry) {
        if self.echo.admits(entry.severity) {
            let line = match entry.severity {
                Severity::Info => format!("[{}] {}", entry.ts, entry.message),
                Severity::Warning | Severity::Error => {
                    format!("[{}] {}: {}", entry.ts, entry.severity.label(), entry.message)
                }
            };
            let _ = writeln!(self.console, "{line}");
        }
        if let Some(w) = self.jsonl.as_mut() {
            w.write_entry(&entry);
        }
    }
}

impl Drop for TeeLogger {
    fn drop(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::logger::jsonl::EventType;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn echo_prefixes_timestamp() {
        let buf = SharedBuf::default();
        let mut log = TeeLogger::console_only(EchoLevel::All).with_console(Box::new(buf.clone()));
        let entry = LogEntry::new(EventType::EntryRemoved, Severity::Info, "removed X");
        let ts = entry.ts.clone();
        log.record(entry);
        assert_eq!(buf.text(), format!("[{ts}] removed X\n"));
    }

    #[test]
    fn problems_level_drops_info() {
        let buf = SharedBuf::default();
        let mut log =
            TeeLogger::console_only(EchoLevel::Problems).with_console(Box::new(buf.clone()));
        log.record(LogEntry::new(EventType::EntryDiscovered, Severity::Info, "discovered"));
        log.record(LogEntry::new(EventType::RootEnumerationFailed, Severity::Warning, "root gone"));
        let text = buf.text();
        assert!(!text.contains("discovered"));
        assert!(text.contains("WARN: root gone"));
    }

    #[test]
    fn file_receives_entries_even_when_echo_is_off() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.jsonl");
        let mut log = TeeLogger::open(
            JsonlConfig {
                fallback_path: None,
                ..JsonlConfig::at(&path)
            },
            EchoLevel::Off,
        );
        assert_eq!(log.file_state(), Some("normal"));
        log.record(LogEntry::new(EventType::SweepStart, Severity::Info, "start"));
        log.flush();
        assert!(std::fs::read_to_string(&path).unwrap().contains("sweep_start"));
    }
}
