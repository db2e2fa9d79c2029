//! Diagnostics record applications poll after each runtime operation.
//!
//! The embedded-SQL calling convention reports outcomes through a single
//! mutable status area rather than rich inline errors: a numeric code, a
//! message, the affected-row count of the last statement and a pair of
//! warning flags. The session resets this record at the start of every
//! public operation and fills it in from the operation's outcome.

use crate::core::EsqlError;

/// Warning flags set by operations that succeed with caveats.
///
/// `any` mirrors the convention's leading warning slot (set whenever any
/// other flag is set); `truncated` reports that at least one output string
/// did not fit its host variable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Warnings {
    pub any: bool,
    pub truncated: bool,
}

impl Warnings {
    pub fn set_truncated(&mut self) {
        self.any = true;
        self.truncated = true;
    }
}

/// The status area updated by every public operation.
#[derive(Debug, Default)]
pub struct Diagnostics {
    /// Legacy numeric status: 0 on success, 100 for "no data", negative on
    /// faults.
    pub sqlcode: i64,
    /// Human-readable message for the last failure, empty on success.
    pub message: String,
    /// Rows affected or returned by the last successful statement. Left
    /// unset when the statement failed part-way through decoding.
    pub rows_affected: Option<i64>,
    pub warnings: Warnings,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the record at the start of an operation.
    pub fn reset(&mut self) {
        self.sqlcode = 0;
        self.message.clear();
        self.rows_affected = None;
        self.warnings = Warnings::default();
    }

    /// Records a failure outcome.
    pub fn record_error(&mut self, err: &EsqlError) {
        self.sqlcode = err.sqlcode();
        self.message = err.to_string();
    }

    /// Records the row count of a successful statement.
    pub fn record_rows(&mut self, rows: i64) {
        self.rows_affected = Some(rows);
    }

    pub fn is_error(&self) -> bool {
        self.sqlcode < 0
    }
}
