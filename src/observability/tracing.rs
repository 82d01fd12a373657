//! Diagnostics from dependencies.
//!
//! # Responsibilities
//! - Route `tracing` events emitted inside hyper, sqlx and tower-http through
//!   the application logger's subscriber, so they share its format and output
//!
//! # Design Decisions
//! - Dependencies are filtered at `warn` unless `RUST_LOG` says otherwise
//! - Installing twice is harmless: the second call reports an error and changes nothing

use tracing::dispatcher::{self, SetGlobalDefaultError};

use crate::observability::Logger;

/// Make `logger`'s subscriber the process-wide default.
pub fn init_tracing(logger: &Logger) -> Result<(), SetGlobalDefaultError> {
    dispatcher::set_global_default(logger.dispatch().clone())
}
