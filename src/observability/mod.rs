//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Process start:
//!     LoggerConfig → Logger::new
//!         → sink::make_writer (stdout, stderr or append-only file)
//!         → registry + EnvFilter + fmt layer (format.rs) → Dispatch
//!     init_tracing(&logger) → same Dispatch becomes the global default
//!
//! Per request:
//!     base Logger → with_context / with_request (derived, never mutated)
//!     → Debug/Info/Warn/Error → tracing event on the logger's Dispatch
//!     → format.rs flattens it into one record → writer
//!
//! Dependencies (hyper, sqlx, tower-http):
//!     tracing events → global Dispatch → same records, same writer, plus `target`
//! ```
//!
//! # Design Decisions
//! - Loggers are values: derivation clones the field set, the parent stays as it was
//! - The logger is passed explicitly; the global default only catches events
//!   from other crates
//! - Below-threshold calls return before any record is built or written

pub mod fields;
mod format;
pub mod logging;
pub mod sink;
pub mod tracing;

pub use logging::{Fields, Logger, LoggerError};
pub use sink::{make_writer, MemorySink, MemoryWriter};
pub use self::tracing::init_tracing;
