#![forbid(unsafe_code)]

//! Registry Residue Helper (rrh): finds and removes software-registration
//! entries a vendor's uninstaller left behind.
//!
//! Two passes over the same classification:
//! 1. **Discovery**: read-only; matched entries are exported to a CSV report
//! 2. **Cleanup**: matched entries are deleted one at a time, failures isolated
//!
//! # Library usage
//!
//! ```rust,no_run
//! use registry_residue_helper::prelude::*;
//!
//! let config = Config::load(None)?;
//! let engine = SweepEngine::from_config(&config)?;
//! let store = SnapshotStore::open("hives.json")?;
//! let mut log = MemoryLog::new();
//! let summary = engine.discover(&store, &mut log);
//! println!("{} matched", summary.matched);
//! # Ok::<(), RrhError>(())
//! ```

pub mod prelude;

pub mod core;
pub mod logger;
pub mod scanner;
pub mod store;
