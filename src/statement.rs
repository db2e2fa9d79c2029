//! Statement builder orchestration: render the template, open a transaction
//! if the connection needs one, execute at the wire boundary and decode the
//! outcome.

use crate::connection::Connection;
use crate::core::{EsqlError, Result};
use crate::decode::decode_rows;
use crate::diag::Warnings;
use crate::render::render;
use crate::variable::Variable;
use crate::wire::WireOutcome;
use std::io::Write;
use tracing::debug;

/// Caller-supplied verbose trace sink.
///
/// When enabled, every rendered query and every decoded cell is written as
/// one line. Off by default; write failures are ignored rather than allowed
/// to fail the statement.
pub struct TraceSink {
    sink: Option<Box<dyn Write + Send>>,
}

impl TraceSink {
    pub fn off() -> Self {
        TraceSink { sink: None }
    }

    pub fn set(&mut self, sink: Option<Box<dyn Write + Send>>) {
        self.sink = sink;
    }

    pub fn enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub(crate) fn line(&mut self, text: &str) {
        if let Some(sink) = self.sink.as_mut() {
            let _ = writeln!(sink, "[esql] {}", text);
        }
    }
}

/// Completion tags that end a transaction no matter how they were issued.
pub(crate) fn ends_transaction(tag: &str) -> bool {
    tag.eq_ignore_ascii_case("commit") || tag.eq_ignore_ascii_case("rollback")
}

/// Renders and executes one statement, decoding any rows into `outputs`.
///
/// Returns the row count of a tabular result or the affected count of a
/// command. Argument-count mismatches are caught during rendering, before
/// anything reaches the connection.
pub(crate) fn execute_statement(
    conn: &mut Connection,
    template: &str,
    inputs: &[Variable<'_>],
    outputs: &mut [Variable<'_>],
    warnings: &mut Warnings,
    trace: &mut TraceSink,
) -> Result<i64> {
    let rendered = render(template, inputs)?;

    conn.begin_if_needed()?;

    debug!(connection = %conn.name(), "QUERY: {}", rendered);
    trace.line(&format!("QUERY: {} on connection {}", rendered, conn.name()));

    match conn.run(&rendered)? {
        WireOutcome::Table(result) => {
            let rows = result.row_count();
            if rows < 1 {
                debug!("incorrect number of matches: {}", rows);
                return Err(EsqlError::NotFound);
            }
            decode_rows(&result, outputs, conn, warnings, trace)?;
            Ok(rows as i64)
        }
        WireOutcome::Command { tag, affected } => {
            debug!("OK: {}", tag);
            if ends_transaction(&tag) {
                conn.committed = true;
            }
            Ok(affected)
        }
        WireOutcome::Empty => Err(EsqlError::EmptyQuery),
    }
}
