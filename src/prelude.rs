//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use registry_residue_helper::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{Result, RrhError};

// Store
pub use crate::store::memory::MemoryStore;
pub use crate::store::snapshot::SnapshotStore;
pub use crate::store::{RegistrationEntry, RegistrationStore, SystemComponentFlag};

// Logger
pub use crate::logger::ActivityLog;
pub use crate::logger::jsonl::{EventType, LogEntry, Severity};
pub use crate::logger::memory::MemoryLog;
pub use crate::logger::tee::{EchoLevel, TeeLogger};

// Scanner
pub use crate::scanner::rules::{ClassificationVerdict, Classifier, VendorProfile};
pub use crate::scanner::scan::{MatchedEntry, ScanReport};
pub use crate::scanner::sweep::{SweepEngine, SweepMode, SweepSummary};
pub use crate::scanner::version::{NormalizedVersion, VersionOutcome};
