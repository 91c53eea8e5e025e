//! Activity logging: JSONL append-only file plus a console echo.
//!
//! Engine code records through [`ActivityLog`] and never knows which sink is
//! attached. A failing sink never fails the sweep.

pub mod jsonl;
pub mod memory;
pub mod tee;

use crate::logger::jsonl::LogEntry;

/// Destination for sweep activity events.
pub trait ActivityLog {
    fn record(&mut self, entry: LogEntry);
}

impl<T: ActivityLog + ?Sized> ActivityLog for &mut T {
    fn record(&mut self, entry: LogEntry) {
        (**self).record(entry);
    }
}
