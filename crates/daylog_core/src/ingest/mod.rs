//! Log ingestion: classification, validation, mapping, stats and linking.
//!
//! # Responsibility
//! - Turn one source file into trusted `DayRecord`s plus diagnostics.
//! - Repair month-boundary sleep continuity over merged results.
//!
//! # Invariants
//! - Per-file work is sequential; parallelism only exists across files.
//! - Validators accumulate diagnostics instead of failing per line.

pub mod convert;
pub mod line;
pub mod linker;
pub mod mapper;
pub mod semantic;
pub mod stats;
pub mod structure;
