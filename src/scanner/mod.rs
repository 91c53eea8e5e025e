//! Residue scanner: version normalization, classification rules, scan
//! orchestration, report export, deletion, and the sweep engine tying them together.

pub mod deletion;
pub mod export;
pub mod rules;
pub mod scan;
pub mod sweep;
pub mod version;
