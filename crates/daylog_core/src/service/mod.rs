//! Use-case services over the ingest pipeline and the day store.
//!
//! # Responsibility
//! - Orchestrate multi-file conversion and batch persistence.
//! - Keep the CLI decoupled from ingest and storage details.

pub mod import_service;
