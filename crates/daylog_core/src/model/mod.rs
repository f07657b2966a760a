//! Normalized day/activity model produced by the conversion pipeline.
//!
//! # Responsibility
//! - Define the records handed from the converter to the writer.
//! - Define the validation diagnostics shared by every validator.
//!
//! # Invariants
//! - Activities of one day are contiguous: `end_time[i] == start_time[i + 1]`.
//! - `logical_id / 10000` equals the day's date as an integer.

pub mod day;
pub mod validation;
