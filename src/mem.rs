//! Staged ownership of buffers the runtime allocates on the caller's behalf.
//!
//! Pointer-slot output variables have no caller-allocated storage: the
//! decoder builds a right-sized buffer from the actual result. Those buffers
//! are staged here per call and only committed into the caller's `Option`
//! slots once the whole decode has succeeded. On any error the scope is
//! dropped, which frees every staged buffer and leaves every pointer slot
//! untouched — the unwind path cannot leak and cannot expose half-filled
//! output.

use crate::core::{EsqlError, Result};
use crate::variable::{HostSlot, Variable};

/// Buffers staged for pointer-slot output variables during one call.
#[derive(Default)]
pub(crate) struct AllocScope {
    staged: Vec<(usize, Vec<String>)>,
}

impl AllocScope {
    pub fn new() -> Self {
        AllocScope::default()
    }

    /// Reserves a buffer for the output variable at `index`, sized to the
    /// actual result. Size arithmetic is checked; overflow is the runtime's
    /// out-of-memory condition.
    pub fn allocate(&mut self, index: usize, rows: usize, widest: usize) -> Result<&mut Vec<String>> {
        widest
            .checked_add(1)
            .and_then(|w| w.checked_mul(rows))
            .ok_or(EsqlError::OutOfMemory)?;
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(rows)
            .map_err(|_| EsqlError::OutOfMemory)?;
        self.staged.push((index, buffer));
        Ok(&mut self.staged.last_mut().expect("just pushed").1)
    }

    /// Hands every staged buffer to its caller slot. Consumes the scope;
    /// only reached when the whole decode succeeded.
    pub fn commit(self, outputs: &mut [Variable]) {
        for (index, rows) in self.staged {
            if let HostSlot::TextPtr(slot) = &mut outputs[index].slot {
                **slot = Some(rows);
            }
        }
    }
}
