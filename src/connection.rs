//! A named database connection with its transaction bookkeeping and the
//! lazy server-type cache the decoder consults.

use crate::core::{EsqlError, Result};
use crate::typeinfo;
use crate::wire::{WireConnection, WireOutcome};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Reserved name resolving to the session's current connection.
pub const CURRENT: &str = "CURRENT";

/// Reserved name addressing every open connection at once (disconnect only).
pub const ALL: &str = "ALL";

/// One open connection owned by the session.
pub struct Connection {
    name: String,
    wire: Box<dyn WireConnection>,
    /// True when no transaction is open. Manual-commit mode opens one lazily
    /// before the next statement.
    pub(crate) committed: bool,
    pub(crate) autocommit: bool,
    /// oid → is-array flags, seeded from the builtin table on first use and
    /// extended by catalog lookups.
    type_cache: HashMap<u32, bool>,
}

impl Connection {
    pub(crate) fn new(name: String, wire: Box<dyn WireConnection>, autocommit: bool) -> Self {
        Connection {
            name,
            wire,
            committed: true,
            autocommit,
            type_cache: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True when no transaction is open on this connection.
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    pub fn autocommit(&self) -> bool {
        self.autocommit
    }

    /// Runs one query string at the wire boundary, draining and logging any
    /// out-of-band notifications afterwards.
    pub(crate) fn run(&mut self, text: &str) -> Result<WireOutcome> {
        let outcome = self.wire.run(text);
        for note in self.wire.take_notifications() {
            debug!(connection = %self.name, "async notify received: {}", note);
        }
        match outcome {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                // A backend fault aborts any open transaction; keep the
                // bookkeeping in step but leave the connection usable.
                if !self.committed {
                    warn!(connection = %self.name, "backend fault aborted open transaction");
                    self.committed = true;
                }
                Err(EsqlError::Backend(e.message))
            }
        }
    }

    /// Opens a transaction if manual-commit mode requires one.
    pub(crate) fn begin_if_needed(&mut self) -> Result<()> {
        if self.committed && !self.autocommit {
            if let Err(e) = self.wire.run("begin transaction") {
                return Err(EsqlError::Transaction(e.message));
            }
            debug!(connection = %self.name, "implicit begin transaction");
            self.committed = false;
        }
        Ok(())
    }

    /// Is-array flag for a server type, from the cache or the catalog.
    ///
    /// The builtin table answers for well-known types. A miss queries the
    /// catalog through this connection; character types are pinned to
    /// non-array since their array values decode as plain text.
    pub(crate) fn is_type_array(&mut self, type_id: u32) -> Result<bool> {
        if let Some(&flag) = typeinfo::BUILTIN_ARRAY_FLAGS.get(&type_id) {
            return Ok(flag);
        }
        if let Some(&flag) = self.type_cache.get(&type_id) {
            return Ok(flag);
        }

        let query = format!("select typelem from pg_type where oid={}", type_id);
        let mut isarray = false;
        if let WireOutcome::Table(result) = self.run(&query)? {
            if let Some(cell) = result.cell(0, 0) {
                isarray = cell.parse::<i64>().map(|elem| elem != 0).unwrap_or(false);
            }
            if typeinfo::is_character_type(type_id) {
                isarray = false;
            }
            debug!(
                connection = %self.name,
                "type {} array: {}", type_id, isarray
            );
            self.type_cache.insert(type_id, isarray);
        }
        Ok(isarray)
    }

    pub(crate) fn close(&mut self) {
        debug!(connection = %self.name, "closing connection");
        self.wire.close();
    }
}
