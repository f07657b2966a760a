//! Persistence of converted days.
//!
//! # Responsibility
//! - Resolve hierarchical project paths to stable row ids.
//! - Write days and their time records in one transaction per batch.
//!
//! # Invariants
//! - Resolver caches live for exactly one batch.
//! - A failed batch leaves the store exactly as it was.

pub mod day_repo;
pub mod project_repo;
