//! Observability subsystem for blobdb
//!
//! Structured JSON logging for the storage pipelines.
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on pipeline execution
//! 3. No async or background threads
//! 4. Deterministic output

mod logger;

pub use logger::{Logger, Severity};
