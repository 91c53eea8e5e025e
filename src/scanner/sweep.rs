//! Sweep engine: one discovery or cleanup pass over the configured roots.
//!
//! Both modes run the same scan. Discovery then exports the report. Cleanup
//! then hands the matches to the mutation executor. A pass never fails: every
//! engine-side error is logged and folded into the summary.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;

use crate::core::config::Config;
use crate::core::errors::Result;
use crate::logger::ActivityLog;
use crate::logger::jsonl::{EventType, LogEntry, Severity};
use crate::scanner::deletion::{self, DeletionError};
use crate::scanner::export;
use crate::scanner::rules::Classifier;
use crate::scanner::scan::{MatchedEntry, ScanReport, scan};
use crate::store::RegistrationStore;

/// Pass mode. Everything up to classification is identical between modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepMode {
    /// Read-only pass that reports matches.
    Discovery,
    /// Pass that deletes matches.
    Cleanup,
}

impl fmt::Display for SweepMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Discovery => "discovery",
            Self::Cleanup => "cleanup",
        })
    }
}

/// Structured result of one pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    /// Discovery or cleanup.
    pub mode: SweepMode,
    /// Distinct entries classified.
    pub examined: usize,
    /// Entries matched.
    pub matched: usize,
    /// Entries deleted; always zero for discovery.
    pub removed: usize,
    /// Deletions that failed.
    pub failed: usize,
    /// Roots that could not be enumerated.
    pub failed_roots: Vec<String>,
    /// Entries whose version was treated as absent.
    pub unparseable_versions: usize,
    /// Set when a discovery pass wrote a report.
    pub report_path: Option<PathBuf>,
    /// Matched entries in discovery order.
    pub matches: Vec<MatchedEntry>,
    /// Per-entry deletion failures.
    pub errors: Vec<DeletionError>,
    /// Wall time of the pass.
    pub duration_ms: u64,
}

impl SweepSummary {
    fn from_scan(mode: SweepMode, scan: ScanReport) -> Self {
        Self {
            mode,
            examined: scan.examined,
            matched: scan.matched(),
            removed: 0,
            failed: 0,
            failed_roots: scan.failed_roots,
            unparseable_versions: scan.unparseable_versions,
            report_path: None,
            matches: scan.matches,
            errors: Vec::new(),
            duration_ms: 0,
        }
    }

    /// Whether the pass finished with any per-entry or per-root failure.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.failed > 0 || !self.failed_roots.is_empty()
    }
}

/// Runs sweeps with a fixed root list, classifier, and report destination.
#[derive(Debug, Clone)]
pub struct SweepEngine {
    roots: Vec<String>,
    classifier: Classifier,
    report_path: Option<PathBuf>,
}

impl SweepEngine {
    /// Engine that exports discovery reports to `report_path`.
    #[must_use]
    pub fn new(roots: Vec<String>, classifier: Classifier, report_path: PathBuf) -> Self {
        Self {
            roots,
            classifier,
            report_path: Some(report_path),
        }
    }

    /// Engine configured from a validated [`Config`].
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            config.store.roots.clone(),
            Classifier::new(config.vendor_profile()?),
            config.report.path.clone(),
        ))
    }

    /// Discovery passes from this engine skip the CSV export.
    #[must_use]
    pub fn without_export(mut self) -> Self {
        self.report_path = None;
        self
    }

    /// Roots enumerated by each pass.
    #[must_use]
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// Report destination, `None` when export is off.
    #[must_use]
    pub fn report_path(&self) -> Option<&Path> {
        self.report_path.as_deref()
    }

    /// Read-only pass. The store is only borrowed shared.
    pub fn discover<S, L>(&self, store: &S, log: &mut L) -> SweepSummary
    where
        S: RegistrationStore + ?Sized,
        L: ActivityLog + ?Sized,
    {
        let start = Instant::now();
        log_start(log, SweepMode::Discovery, &self.roots);
        let report = scan(store, &self.roots, &self.classifier, SweepMode::Discovery, log);
        let mut summary = SweepSummary::from_scan(SweepMode::Discovery, report);
        if let Some(path) = &self.report_path {
            summary.report_path = export::export_and_log(path, &summary.matches, log);
        }
        finish(log, summary, start)
    }

    /// Deleting pass.
    pub fn clean<S, L>(&self, store: &mut S, log: &mut L) -> SweepSummary
    where
        S: RegistrationStore + ?Sized,
        L: ActivityLog + ?Sized,
    {
        let start = Instant::now();
        log_start(log, SweepMode::Cleanup, &self.roots);
        let report = scan(&*store, &self.roots, &self.classifier, SweepMode::Cleanup, log);
        let mut summary = SweepSummary::from_scan(SweepMode::Cleanup, report);
        let deletions = deletion::execute_and_fold(store, &summary.matches, log);
        summary.removed = deletions.removed;
        summary.failed = deletions.failed;
        summary.errors = deletions.errors;
        finish(log, summary, start)
    }

    /// Run `mode` against a store held exclusively.
    pub fn run<S, L>(&self, mode: SweepMode, store: &mut S, log: &mut L) -> SweepSummary
    where
        S: RegistrationStore + ?Sized,
        L: ActivityLog + ?Sized,
    {
        match mode {
            SweepMode::Discovery => self.discover(&*store, log),
            SweepMode::Cleanup => self.clean(store, log),
        }
    }
}

fn log_start<L: ActivityLog + ?Sized>(log: &mut L, mode: SweepMode, roots: &[String]) {
    log.record(
        LogEntry::new(
            EventType::SweepStart,
            Severity::Info,
            format!("{mode} pass over {} roots", roots.len()),
        )
        .with_count(roots.len())
        .with_details(roots.join(";")),
    );
}

fn finish<L: ActivityLog + ?Sized>(
    log: &mut L,
    mut summary: SweepSummary,
    start: Instant,
) -> SweepSummary {
    summary.duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    let severity = if summary.is_partial() {
        Severity::Warning
    } else {
        Severity::Info
    };
    let message = match summary.mode {
        SweepMode::Discovery => format!(
            "discovery complete: {} examined, {} matched",
            summary.examined, summary.matched
        ),
        SweepMode::Cleanup => format!(
            "cleanup complete: {} matched, {} removed, {} failed",
            summary.matched, summary.removed, summary.failed
        ),
    };
    let mut entry = LogEntry::new(EventType::SweepComplete, severity, message)
        .with_count(summary.matched);
    if !summary.failed_roots.is_empty() {
        entry = entry.with_details(format!("failed roots: {}", summary.failed_roots.join(";")));
    }
    log.record(entry);
    summary
}
