//! Scripted wire-boundary doubles and result-building helpers shared by the
//! unit and integration tests. No real database is involved anywhere in the
//! test suite: a `ScriptedWire` replays a fixed sequence of expected queries
//! and canned replies, panicking loudly on any divergence.

use crate::wire::{
    ColumnInfo, TableResult, WireConnection, WireDriver, WireError, WireOutcome,
};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct Expectation {
    query: String,
    reply: Result<WireOutcome, String>,
}

/// A wire connection that replays a script of expected queries.
///
/// Every `run` call must match the next scripted query exactly; an
/// unexpected or surplus query panics the test. Empty query text answers
/// `Empty` without consuming a script entry, like a real boundary would.
#[derive(Default)]
pub struct ScriptedWire {
    script: VecDeque<Expectation>,
    notifications: Vec<String>,
    closed: Arc<AtomicBool>,
}

impl ScriptedWire {
    pub fn new() -> Self {
        ScriptedWire::default()
    }

    /// Expects `query` and answers with `outcome`.
    pub fn expect(mut self, query: &str, outcome: WireOutcome) -> Self {
        self.script.push_back(Expectation {
            query: query.to_string(),
            reply: Ok(outcome),
        });
        self
    }

    /// Expects `query` and answers with a generic success tag.
    pub fn expect_ok(self, query: &str) -> Self {
        self.expect(
            query,
            WireOutcome::Command {
                tag: "OK".to_string(),
                affected: 0,
            },
        )
    }

    /// Expects `query` and answers with a command completion.
    pub fn expect_command(self, query: &str, tag: &str, affected: i64) -> Self {
        self.expect(
            query,
            WireOutcome::Command {
                tag: tag.to_string(),
                affected,
            },
        )
    }

    /// Expects `query` and answers with a wire error.
    pub fn expect_error(mut self, query: &str, message: &str) -> Self {
        self.script.push_back(Expectation {
            query: query.to_string(),
            reply: Err(message.to_string()),
        });
        self
    }

    /// Queues an out-of-band notification delivered after the next run.
    pub fn with_notification(mut self, message: &str) -> Self {
        self.notifications.push(message.to_string());
        self
    }

    /// Shared flag flipped when the connection is closed.
    pub fn close_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }
}

impl WireConnection for ScriptedWire {
    fn run(&mut self, text: &str) -> Result<WireOutcome, WireError> {
        if text.trim().is_empty() {
            return Ok(WireOutcome::Empty);
        }
        let expectation = match self.script.pop_front() {
            Some(e) => e,
            None => panic!("unexpected query with empty script: {text:?}"),
        };
        assert_eq!(
            expectation.query, text,
            "scripted wire got a query out of order"
        );
        expectation.reply.map_err(WireError::new)
    }

    fn take_notifications(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notifications)
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// A driver that hands out scripted connections in order, or refuses.
#[derive(Default)]
pub struct ScriptedDriver {
    openings: RefCell<VecDeque<Result<ScriptedWire, String>>>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        ScriptedDriver::default()
    }

    /// The next open succeeds with this scripted connection.
    pub fn connection(self, wire: ScriptedWire) -> Self {
        self.openings.borrow_mut().push_back(Ok(wire));
        self
    }

    /// The next open is refused with this message.
    pub fn refuse(self, message: &str) -> Self {
        self.openings.borrow_mut().push_back(Err(message.to_string()));
        self
    }
}

impl WireDriver for ScriptedDriver {
    fn open(
        &self,
        target: &str,
        _user: Option<&str>,
        _password: Option<&str>,
    ) -> Result<Box<dyn WireConnection>, WireError> {
        match self.openings.borrow_mut().pop_front() {
            Some(Ok(wire)) => Ok(Box::new(wire)),
            Some(Err(message)) => Err(WireError::new(message)),
            None => panic!("unexpected open of target {target:?}"),
        }
    }
}

/// Column metadata with unconstrained size and modifier.
pub fn column(name: &str, type_id: u32) -> ColumnInfo {
    ColumnInfo {
        name: name.to_string(),
        type_id,
        size: -1,
        modifier: -1,
    }
}

/// Builds a tabular result from borrowed cell text.
pub fn table(columns: Vec<ColumnInfo>, rows: Vec<Vec<Option<&str>>>) -> TableResult {
    TableResult {
        columns,
        rows: rows
            .into_iter()
            .map(|row| row.into_iter().map(|cell| cell.map(str::to_string)).collect())
            .collect(),
    }
}

/// `table`, wrapped as a wire outcome.
pub fn table_outcome(columns: Vec<ColumnInfo>, rows: Vec<Vec<Option<&str>>>) -> WireOutcome {
    WireOutcome::Table(table(columns, rows))
}
