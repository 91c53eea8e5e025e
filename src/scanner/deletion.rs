//! Mutation executor: removes matched entries from the store one at a time.
//!
//! Each deletion is isolated. A failure is logged and recorded, and the next
//! entry is still attempted.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::core::errors::Result;
use crate::logger::ActivityLog;
use crate::logger::jsonl::{EventType, LogEntry, Severity};
use crate::scanner::scan::MatchedEntry;
use crate::store::RegistrationStore;

/// Outcome of one deletion attempt.
#[derive(Debug)]
pub struct EntryOutcome {
    /// Path handed to the store.
    pub path: String,
    /// What the store returned.
    pub result: Result<()>,
}

/// Details for a deletion that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionError {
    /// Path that could not be removed.
    pub path: String,
    /// Rendered error.
    pub error: String,
    /// `RRH-xxxx` code.
    pub error_code: String,
    /// Whether a later pass may succeed.
    pub recoverable: bool,
}

/// Folded outcome of a cleanup pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletionReport {
    /// Entries deleted.
    pub removed: usize,
    /// Deletions that failed.
    pub failed: usize,
    /// One record per failed deletion, in attempt order.
    pub errors: Vec<DeletionError>,
    /// Wall time spent deleting.
    #[serde(skip)]
    pub duration: Duration,
}

impl DeletionReport {
    /// Fold per-entry outcomes into counts.
    #[must_use]
    pub fn fold(outcomes: &[EntryOutcome], duration: Duration) -> Self {
        outcomes.iter().fold(
            Self {
                duration,
                ..Self::default()
            },
            |mut report, outcome| {
                match &outcome.result {
                    Ok(()) => report.removed += 1,
                    Err(e) => {
                        report.failed += 1;
                        report.errors.push(DeletionError {
                            path: outcome.path.clone(),
                            error: e.to_string(),
                            error_code: e.code().to_string(),
                            recoverable: e.is_retryable(),
                        });
                    }
                }
                report
            },
        )
    }
}

/// Attempt to delete every matched entry, in order.
pub fn execute<S, L>(store: &mut S, matches: &[MatchedEntry], log: &mut L) -> Vec<EntryOutcome>
where
    S: RegistrationStore + ?Sized,
    L: ActivityLog + ?Sized,
{
    let mut outcomes = Vec::with_capacity(matches.len());
    for m in matches {
        let result = store.delete(&m.entry.path);
        match &result {
            Ok(()) => log.record(
                LogEntry::new(
                    EventType::EntryRemoved,
                    Severity::Info,
                    format!("removed {}", m.entry.path),
                )
                .with_entry(&m.entry)
                .with_reason(m.verdict.reason.as_deref()),
            ),
            Err(e) => log.record(
                LogEntry::new(
                    EventType::EntryRemovalFailed,
                    Severity::Error,
                    format!("error removing {}: {e}", m.entry.path),
                )
                .with_entry(&m.entry)
                .with_error(e),
            ),
        }
        outcomes.push(EntryOutcome {
            path: m.entry.path.clone(),
            result,
        });
    }
    outcomes
}

/// Execute and fold in one step.
pub fn execute_and_fold<S, L>(store: &mut S, matches: &[MatchedEntry], log: &mut L) -> DeletionReport
where
    S: RegistrationStore + ?Sized,
    L: ActivityLog + ?Sized,
{
    let start = Instant::now();
    let outcomes = execute(store, matches, log);
    DeletionReport::fold(&outcomes, start.elapsed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::memory::MemoryLog;
    use crate::scanner::rules::ClassificationVerdict;
    use crate::store::RegistrationEntry;
    use crate::store::memory::MemoryStore;

    fn matched(path: &str) -> MatchedEntry {
        MatchedEntry {
            entry: RegistrationEntry::new(path).with_display_name("Adobe X"),
            verdict: ClassificationVerdict {
                matched: true,
                reason: Some("r".to_string()),
                rule: Some("family-residue"),
            },
        }
    }

    fn paths() -> [&'static str; 3] {
        [r"HKLM\U\{1}", r"HKLM\U\{2}", r"HKLM\U\{3}"]
    }

    #[test]
    fn deletes_every_match() {
        let mut store =
            MemoryStore::with_entries(paths().map(RegistrationEntry::new));
        let matches: Vec<_> = paths().iter().map(|p| matched(p)).collect();
        let mut log = MemoryLog::new();

        let report = execute_and_fold(&mut store, &matches, &mut log);
        assert_eq!(report.removed, 3);
        assert_eq!(report.failed, 0);
        assert!(store.is_empty());
        assert_eq!(log.count(EventType::EntryRemoved), 3);
    }

    #[test]
    fn failure_on_one_entry_does_not_stop_the_next() {
        let mut store =
            MemoryStore::with_entries(paths().map(RegistrationEntry::new));
        store.fail_deletion(paths()[1]);
        let matches: Vec<_> = paths().iter().map(|p| matched(p)).collect();
        let mut log = MemoryLog::new();

        let outcomes = execute(&mut store, &matches, &mut log);
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].result.is_ok());
        assert!(outcomes[1].result.is_err());
        assert!(outcomes[2].result.is_ok());
        assert_eq!(store.delete_calls(), 3);
        assert!(!store.contains(paths()[2]));

        let report = DeletionReport::fold(&outcomes, Duration::ZERO);
        assert_eq!(report.removed, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.errors[0].path, paths()[1]);
        assert_eq!(report.errors[0].error_code, "RRH-2003");
        assert!(report.errors[0].recoverable);

        let failure = log.events(EventType::EntryRemovalFailed).next().unwrap();
        assert!(failure.message.starts_with("error removing "));
    }

    #[test]
    fn vanished_entry_counts_as_failed() {
        let mut store = MemoryStore::new();
        let mut log = MemoryLog::new();
        let report = execute_and_fold(&mut store, &[matched(r"HKLM\U\{gone}")], &mut log);
        assert_eq!(report.removed, 0);
        assert_eq!(report.failed, 1);
    }

    #[test]
    fn empty_match_list_touches_nothing() {
        let mut store = MemoryStore::new();
        let mut log = MemoryLog::new();
        let report = execute_and_fold(&mut store, &[], &mut log);
        assert_eq!((report.removed, report.failed), (0, 0));
        assert!(report.errors.is_empty());
        assert_eq!(store.delete_calls(), 0);
    }
}
