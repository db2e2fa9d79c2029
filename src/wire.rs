//! Wire-protocol boundary consumed by the runtime.
//!
//! The runtime never speaks the database protocol itself. A `WireDriver`
//! opens connections and each `WireConnection` executes one literal query
//! string at a time, returning either a tabular result (per-cell text with a
//! null flag, per-field metadata) or a command completion with an affected
//! count. Everything above this boundary — rendering, decoding, transaction
//! bookkeeping — is this crate's job; everything below it is not.

use std::fmt;

/// Error reported by the wire boundary (connect refusals, execution faults).
#[derive(Debug, Clone)]
pub struct WireError {
    pub message: String,
}

impl WireError {
    pub fn new(message: impl Into<String>) -> Self {
        WireError {
            message: message.into(),
        }
    }
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WireError {}

/// Per-field metadata of a tabular result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    /// Server-internal type identifier for the field.
    pub type_id: u32,
    /// Declared storage size in bytes, negative for variable-length types.
    pub size: i32,
    /// Type modifier (carries declared width or precision/scale for
    /// parameterized types), -1 when absent.
    pub modifier: i32,
}

/// A tabular result: column metadata plus rows of nullable text cells.
#[derive(Debug, Clone, Default)]
pub struct TableResult {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl TableResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn field_count(&self) -> usize {
        self.columns.len()
    }

    /// Text of one cell, `None` when the cell is NULL. Out-of-range
    /// coordinates also read as NULL; the decoder checks shape before
    /// indexing.
    pub fn cell(&self, row: usize, field: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(field))
            .and_then(|c| c.as_deref())
    }

    pub fn column(&self, field: usize) -> Option<&ColumnInfo> {
        self.columns.get(field)
    }
}

/// Outcome of executing one query string.
#[derive(Debug, Clone)]
pub enum WireOutcome {
    /// Rows came back.
    Table(TableResult),
    /// A command completed without rows; `tag` is the completion tag
    /// (e.g. "INSERT", "COMMIT") and `affected` the row count it reports.
    Command { tag: String, affected: i64 },
    /// The query text was empty.
    Empty,
}

/// One open connection at the wire boundary.
///
/// Calls are synchronous: `run` blocks until the backend answers. The
/// runtime drains `take_notifications` after each execution and logs what it
/// finds; notifications carry no further meaning here.
pub trait WireConnection {
    fn run(&mut self, text: &str) -> std::result::Result<WireOutcome, WireError>;

    /// Out-of-band notifications received since the last drain.
    fn take_notifications(&mut self) -> Vec<String> {
        Vec::new()
    }

    fn close(&mut self) {}
}

/// Factory for wire connections.
pub trait WireDriver {
    fn open(
        &self,
        target: &str,
        user: Option<&str>,
        password: Option<&str>,
    ) -> std::result::Result<Box<dyn WireConnection>, WireError>;
}
