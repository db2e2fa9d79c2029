//! The session context: everything the embedded-SQL calling convention used
//! to keep in process globals lives here instead. A `Session` owns the
//! connection set and the current-connection pointer, the diagnostics
//! record, the prepared-statement registry, the descriptor table and the
//! trace sink. Independent sessions are fully isolated.
//!
//! Every public operation follows the same shape: reset the diagnostics
//! record, run, record the outcome. Callers that prefer the legacy polling
//! style can ignore the returned `Result` and inspect `diagnostics()` after
//! each call.

use crate::config::Config;
use crate::connection::{Connection, ALL, CURRENT};
use crate::core::{EsqlError, Result};
use crate::descriptor::{DescItem, DescValue, Descriptor};
use crate::diag::Diagnostics;
use crate::prepare::normalize_template;
use crate::statement::{ends_transaction, execute_statement, TraceSink};
use crate::variable::Variable;
use crate::wire::{WireDriver, WireOutcome};
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use tracing::debug;

/// One logical embedded-SQL session.
pub struct Session {
    driver: Box<dyn WireDriver>,
    connections: Vec<Connection>,
    current: Option<String>,
    prepared: HashMap<String, String>,
    descriptors: HashMap<String, Descriptor>,
    diag: Diagnostics,
    trace: TraceSink,
    default_autocommit: bool,
}

/// Resolves a connection reference to a member of the session's set.
///
/// `None` and the reserved `CURRENT` token mean the current connection.
fn resolve_mut<'a>(
    connections: &'a mut [Connection],
    current: Option<&str>,
    name: Option<&str>,
) -> Result<&'a mut Connection> {
    let wanted = match name {
        None | Some(CURRENT) => current.ok_or(EsqlError::NotConnected)?,
        Some(other) => other,
    };
    connections
        .iter_mut()
        .find(|c| c.name() == wanted)
        .ok_or_else(|| EsqlError::NoSuchConnection(wanted.to_string()))
}

impl Session {
    pub fn new(driver: Box<dyn WireDriver>) -> Self {
        Session {
            driver,
            connections: Vec::new(),
            current: None,
            prepared: HashMap::new(),
            descriptors: HashMap::new(),
            diag: Diagnostics::new(),
            trace: TraceSink::off(),
            default_autocommit: false,
        }
    }

    /// Applies loaded configuration: the autocommit default for new
    /// connections and, when enabled, the verbose trace sink (a file when
    /// one is configured, stderr otherwise).
    pub fn apply_config(&mut self, config: &Config) -> Result<()> {
        self.default_autocommit = config.autocommit();
        if config.trace_enabled() {
            let file = config.trace.as_ref().and_then(|t| t.file.as_deref());
            let sink: Box<dyn Write + Send> = match file {
                Some(path) => {
                    Box::new(fs::File::create(path).map_err(|e| EsqlError::Config(e.to_string()))?)
                }
                None => Box::new(io::stderr()),
            };
            self.trace.set(Some(sink));
        }
        Ok(())
    }

    /// Replaces the verbose trace sink; `None` turns tracing off.
    pub fn set_trace(&mut self, sink: Option<Box<dyn Write + Send>>) {
        self.trace.set(sink);
    }

    /// The status area updated by the last public operation.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diag
    }

    pub fn current_connection(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn default_autocommit(&self) -> bool {
        self.default_autocommit
    }

    /// Read-only view of a connection (`None`/`"CURRENT"` for the current
    /// one). Does not touch the diagnostics record.
    pub fn connection(&self, name: Option<&str>) -> Result<&Connection> {
        let wanted = match name {
            None | Some(CURRENT) => self.current.as_deref().ok_or(EsqlError::NotConnected)?,
            Some(other) => other,
        };
        self.connections
            .iter()
            .find(|c| c.name() == wanted)
            .ok_or_else(|| EsqlError::NoSuchConnection(wanted.to_string()))
    }

    // ---- connection management -------------------------------------------

    /// Opens a connection and makes it current.
    ///
    /// The connection is registered under `name`, or under the target text
    /// when no name is given. A wire refusal reports `ConnectFailed` and
    /// leaves the session's set untouched. `autocommit: None` takes the
    /// configured default.
    pub fn connect(
        &mut self,
        target: &str,
        user: Option<&str>,
        password: Option<&str>,
        name: Option<&str>,
        autocommit: Option<bool>,
    ) -> Result<()> {
        self.diag.reset();
        let result = self.connect_inner(target, user, password, name, autocommit);
        self.finish(result)
    }

    fn connect_inner(
        &mut self,
        target: &str,
        user: Option<&str>,
        password: Option<&str>,
        name: Option<&str>,
        autocommit: Option<bool>,
    ) -> Result<()> {
        let name = name.unwrap_or(target).to_string();
        if self.connections.iter().any(|c| c.name() == name) {
            return Err(EsqlError::ConnectFailed {
                target: target.to_string(),
                reason: format!("connection name \"{}\" is already in use", name),
            });
        }
        let wire = self
            .driver
            .open(target, user, password)
            .map_err(|e| EsqlError::ConnectFailed {
                target: target.to_string(),
                reason: e.message,
            })?;
        let autocommit = autocommit.unwrap_or(self.default_autocommit);
        debug!(connection = %name, target, autocommit, "connection established");
        self.connections
            .push(Connection::new(name.clone(), wire, autocommit));
        self.current = Some(name);
        Ok(())
    }

    /// Makes a named connection current.
    pub fn set_connection(&mut self, name: &str) -> Result<()> {
        self.diag.reset();
        let result = if name == CURRENT {
            self.current
                .as_ref()
                .map(|_| ())
                .ok_or(EsqlError::NotConnected)
        } else if self.connections.iter().any(|c| c.name() == name) {
            debug!(connection = %name, "now current");
            self.current = Some(name.to_string());
            Ok(())
        } else {
            Err(EsqlError::NoSuchConnection(name.to_string()))
        };
        self.finish(result)
    }

    /// Closes one connection, the current one, or (with `"ALL"`) every
    /// connection in the session.
    pub fn disconnect(&mut self, name: Option<&str>) -> Result<()> {
        self.diag.reset();
        let result = self.disconnect_inner(name);
        self.finish(result)
    }

    fn disconnect_inner(&mut self, name: Option<&str>) -> Result<()> {
        if name == Some(ALL) {
            for conn in &mut self.connections {
                conn.close();
            }
            self.connections.clear();
            self.current = None;
            return Ok(());
        }
        let wanted = match name {
            None | Some(CURRENT) => self.current.clone().ok_or(EsqlError::NotConnected)?,
            Some(other) => other.to_string(),
        };
        let index = self
            .connections
            .iter()
            .position(|c| c.name() == wanted)
            .ok_or_else(|| EsqlError::NoSuchConnection(wanted.clone()))?;
        let mut conn = self.connections.remove(index);
        conn.close();
        if self.current.as_deref() == Some(wanted.as_str()) {
            self.current = None;
        }
        Ok(())
    }

    /// Switches a connection's autocommit mode.
    ///
    /// Turning autocommit on while a transaction is open commits it first;
    /// turning it off just lets the next statement begin one lazily.
    /// Toggling to the present mode is a no-op.
    pub fn set_autocommit(&mut self, name: Option<&str>, mode: bool) -> Result<()> {
        self.diag.reset();
        let result = resolve_mut(&mut self.connections, self.current.as_deref(), name).and_then(
            |conn| {
                if conn.autocommit() == mode {
                    return Ok(());
                }
                if mode && !conn.is_committed() {
                    conn.run("commit")?;
                    conn.committed = true;
                }
                debug!(connection = %conn.name(), autocommit = mode, "autocommit switched");
                conn.autocommit = mode;
                Ok(())
            },
        );
        self.finish(result)
    }

    /// Runs transaction text (`commit`, `rollback`, `begin transaction`,
    /// savepoint commands) on a connection and keeps the in-transaction
    /// bookkeeping in step.
    pub fn transaction(&mut self, name: Option<&str>, action: &str) -> Result<()> {
        self.diag.reset();
        let result = {
            let Session {
                connections,
                current,
                trace,
                ..
            } = self;
            resolve_mut(connections, current.as_deref(), name).and_then(|conn| {
                let begins = action
                    .trim_start()
                    .to_ascii_lowercase()
                    .starts_with("begin");
                if !begins {
                    conn.begin_if_needed()?;
                }
                trace.line(&format!("QUERY: {} on connection {}", action, conn.name()));
                conn.run(action)?;
                conn.committed = !begins;
                Ok(())
            })
        };
        self.finish(result)
    }

    // ---- statements ------------------------------------------------------

    /// Renders and executes one statement on a connection, splicing `inputs`
    /// into the template's `?` markers and decoding any rows into `outputs`.
    /// Returns the row count or affected count, which is also recorded in
    /// the diagnostics record.
    pub fn execute(
        &mut self,
        name: Option<&str>,
        template: &str,
        inputs: &[Variable<'_>],
        outputs: &mut [Variable<'_>],
    ) -> Result<i64> {
        self.diag.reset();
        let result = {
            let Session {
                connections,
                current,
                diag,
                trace,
                ..
            } = self;
            resolve_mut(connections, current.as_deref(), name).and_then(|conn| {
                execute_statement(conn, template, inputs, outputs, &mut diag.warnings, trace)
            })
        };
        self.finish_rows(result)
    }

    // ---- prepared statements ---------------------------------------------

    /// Registers a template under a statement name, normalizing its
    /// `:identifier` markers to `?`. Re-preparing a name replaces the old
    /// template.
    pub fn prepare(&mut self, name: &str, template: &str) -> Result<()> {
        self.diag.reset();
        let normalized = normalize_template(template);
        debug!(statement = %name, "prepared: {}", normalized);
        self.prepared.insert(name.to_string(), normalized);
        Ok(())
    }

    /// Stored template of a prepared statement, if any.
    pub fn prepared(&self, name: &str) -> Option<&str> {
        self.prepared.get(name).map(String::as_str)
    }

    pub fn deallocate_prepared(&mut self, name: &str) -> Result<()> {
        self.diag.reset();
        let result = self
            .prepared
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| EsqlError::InvalidStatementName(name.to_string()));
        self.finish(result)
    }

    pub fn deallocate_all_prepared(&mut self) -> Result<()> {
        self.diag.reset();
        self.prepared.clear();
        Ok(())
    }

    /// Executes a prepared statement exactly as if its stored template had
    /// been passed to `execute` inline.
    pub fn execute_prepared(
        &mut self,
        connection: Option<&str>,
        name: &str,
        inputs: &[Variable<'_>],
        outputs: &mut [Variable<'_>],
    ) -> Result<i64> {
        self.diag.reset();
        let result = {
            let Session {
                connections,
                current,
                prepared,
                diag,
                trace,
                ..
            } = self;
            match prepared.get(name) {
                None => Err(EsqlError::InvalidStatementName(name.to_string())),
                Some(template) => resolve_mut(connections, current.as_deref(), connection)
                    .and_then(|conn| {
                        execute_statement(
                            conn,
                            template,
                            inputs,
                            outputs,
                            &mut diag.warnings,
                            trace,
                        )
                    }),
            }
        };
        self.finish_rows(result)
    }

    // ---- descriptors -----------------------------------------------------

    /// Allocates (or re-allocates, empty) a named descriptor.
    pub fn allocate_descriptor(&mut self, name: &str) -> Result<()> {
        self.diag.reset();
        self.descriptors.insert(name.to_string(), Descriptor::new());
        Ok(())
    }

    pub fn deallocate_descriptor(&mut self, name: &str) -> Result<()> {
        self.diag.reset();
        let result = self
            .descriptors
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| EsqlError::UnknownDescriptor(name.to_string()));
        self.finish(result)
    }

    /// Runs a query and stores its tabular result in the descriptor,
    /// replacing whatever it held. A result with no rows still replaces the
    /// stored one but reports `NotFound`.
    pub fn execute_into(
        &mut self,
        descriptor: &str,
        connection: Option<&str>,
        query: &str,
    ) -> Result<i64> {
        self.diag.reset();
        let result = {
            let Session {
                connections,
                current,
                descriptors,
                trace,
                ..
            } = self;
            match descriptors.get_mut(descriptor) {
                None => Err(EsqlError::UnknownDescriptor(descriptor.to_string())),
                Some(desc) => resolve_mut(connections, current.as_deref(), connection).and_then(
                    |conn| {
                        conn.begin_if_needed()?;
                        trace.line(&format!("QUERY: {} on connection {}", query, conn.name()));
                        match conn.run(query)? {
                            WireOutcome::Table(table) => {
                                let rows = table.row_count();
                                desc.set_result(Some(table));
                                if rows < 1 {
                                    Err(EsqlError::NotFound)
                                } else {
                                    Ok(rows as i64)
                                }
                            }
                            WireOutcome::Command { tag, affected } => {
                                desc.set_result(None);
                                if ends_transaction(&tag) {
                                    conn.committed = true;
                                }
                                Ok(affected)
                            }
                            WireOutcome::Empty => Err(EsqlError::EmptyQuery),
                        }
                    },
                ),
            }
        };
        self.finish_rows(result)
    }

    /// Field count of the descriptor's stored result.
    pub fn descriptor_header(&mut self, name: &str) -> Result<usize> {
        self.diag.reset();
        let result = self
            .descriptors
            .get(name)
            .map(Descriptor::field_count)
            .ok_or_else(|| EsqlError::UnknownDescriptor(name.to_string()));
        if let Err(e) = &result {
            self.diag.record_error(e);
        }
        result
    }

    /// One item of one field (1-based) of the descriptor's stored result.
    pub fn descriptor_field(&mut self, name: &str, index: i32, item: DescItem) -> Result<DescValue> {
        self.diag.reset();
        let result = self
            .descriptors
            .get(name)
            .ok_or_else(|| EsqlError::UnknownDescriptor(name.to_string()))
            .and_then(|desc| desc.item(index, item));
        if let Err(e) = &result {
            self.diag.record_error(e);
        }
        result
    }

    /// Same as `descriptor_field`, taking the item by its textual name as
    /// the preprocessor emits it.
    pub fn descriptor_field_named(
        &mut self,
        name: &str,
        index: i32,
        item: &str,
    ) -> Result<DescValue> {
        let item = match item.parse::<DescItem>() {
            Ok(item) => item,
            Err(e) => {
                self.diag.reset();
                self.diag.record_error(&e);
                return Err(e);
            }
        };
        self.descriptor_field(name, index, item)
    }

    // ---- outcome recording -----------------------------------------------

    fn finish(&mut self, result: Result<()>) -> Result<()> {
        if let Err(e) = &result {
            self.diag.record_error(e);
        }
        result
    }

    fn finish_rows(&mut self, result: Result<i64>) -> Result<i64> {
        match &result {
            Ok(rows) => self.diag.record_rows(*rows),
            Err(e) => self.diag.record_error(e),
        }
        result
    }
}
