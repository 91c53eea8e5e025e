//! Scan orchestrator: enumerate every root, normalize, classify, accumulate.
//!
//! A failing root is logged and skipped. Entries reachable from two overlapping
//! roots are classified once, under the first root that yielded them.

use std::collections::HashSet;

use serde::Serialize;

use crate::logger::ActivityLog;
use crate::logger::jsonl::{EventType, LogEntry, Severity};
use crate::scanner::rules::{ClassificationVerdict, Classifier};
use crate::scanner::sweep::SweepMode;
use crate::scanner::version::{VersionOutcome, normalize};
use crate::store::pattern::store_path_key;
use crate::store::{RegistrationEntry, RegistrationStore};

/// One matched entry with the verdict that matched it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedEntry {
    /// Entry as enumerated.
    pub entry: RegistrationEntry,
    /// Verdict that matched it.
    pub verdict: ClassificationVerdict,
}

impl MatchedEntry {
    /// Match reason, empty if unset.
    #[must_use]
    pub fn reason(&self) -> &str {
        self.verdict.reason.as_deref().unwrap_or_default()
    }
}

/// Accumulated result of one scan, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Matches in discovery order.
    pub matches: Vec<MatchedEntry>,
    /// Distinct entries classified across all roots.
    pub examined: usize,
    /// Roots whose enumeration failed.
    pub failed_roots: Vec<String>,
    /// Entries whose version could not be parsed and were classified as version-less.
    pub unparseable_versions: usize,
}

impl ScanReport {
    /// Number of matches.
    #[must_use]
    pub fn matched(&self) -> usize {
        self.matches.len()
    }
}

/// Scan every root in order. Takes the store by shared reference; a scan never mutates.
pub fn scan<S, L>(
    store: &S,
    roots: &[String],
    classifier: &Classifier,
    mode: SweepMode,
    log: &mut L,
) -> ScanReport
where
    S: RegistrationStore + ?Sized,
    L: ActivityLog + ?Sized,
{
    let mut report = ScanReport::default();
    let mut seen: HashSet<String> = HashSet::new();

    for root in roots {
        let entries = match store.enumerate(root) {
            Ok(entries) => entries,
            Err(e) => {
                log.record(
                    LogEntry::new(
                        EventType::RootEnumerationFailed,
                        Severity::Warning,
                        format!("cannot enumerate {root}: {e}"),
                    )
                    .with_root(root)
                    .with_error(&e),
                );
                report.failed_roots.push(root.clone());
                continue;
            }
        };

        for entry in entries {
            if !seen.insert(store_path_key(&entry.path)) {
                continue;
            }
            report.examined += 1;

            let version = normalize(entry.display_version.as_deref());
            if let VersionOutcome::Unparseable { raw, details } = &version {
                report.unparseable_versions += 1;
                log.record(
                    LogEntry::new(
                        EventType::VersionUnparseable,
                        Severity::Warning,
                        format!(
                            "unparseable version {raw:?} on {}, treating as absent",
                            entry.path
                        ),
                    )
                    .with_entry(&entry)
                    .with_details(details.clone()),
                );
            }

            let verdict = classifier.classify(&entry, &version);
            if !verdict.matched {
                continue;
            }

            let (event, verb) = match mode {
                SweepMode::Discovery => (EventType::EntryDiscovered, "discovered"),
                SweepMode::Cleanup => (EventType::EntryRemoving, "removing"),
            };
            log.record(
                LogEntry::new(
                    event,
                    Severity::Info,
                    format!(
                        "{verb} {} ({} {}): {}",
                        entry.path,
                        entry.display_name.as_deref().unwrap_or("<no name>"),
                        entry.display_version.as_deref().unwrap_or("<no version>"),
                        verdict.reason.as_deref().unwrap_or_default()
                    ),
                )
                .with_entry(&entry)
                .with_reason(verdict.reason.as_deref()),
            );
            report.matches.push(MatchedEntry { entry, verdict });
        }
    }

    report
}
