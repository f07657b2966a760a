//! Core of the daylog time-log pipeline.
//!
//! Source files flow through structural validation, mapping, stats and
//! sleep linking into normalized days, which are persisted into SQLite in
//! one transaction per batch.

pub mod config;
pub mod db;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, ConverterConfig, DateCheckMode, DurationRule};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use ingest::convert::{Conversion, Converter};
pub use ingest::linker::link_and_finalize;
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::day::{Activity, ActivityStats, DayRecord, MonthKey};
pub use model::validation::{
    ErrorCategory, ErrorKind, Severity, ValidationError, ValidationReport,
};
pub use repo::day_repo::{
    import, month_bounds, replace_month, ImportData, ImportSummary, WriteError, WriteResult,
};
pub use repo::project_repo::{ProjectRepoError, ProjectResolver};
pub use service::import_service::{
    convert_sources, import_sources, read_sources, replace_month_from_sources, PipelineError,
    PipelineOutput, PipelineResult, SourceFile, SourceOutcome,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
