/// Core Module for esql
///
/// This module contains the fundamental components shared by the rest of the
/// runtime: the error taxonomy, the crate-wide `Result` alias and the legacy
/// status-code mapping surfaced through the diagnostics record.

pub mod error;

// Re-export commonly used types for convenience
pub use error::{EsqlError, Result};
