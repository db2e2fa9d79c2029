//! Input literal rendering: turns a query template with `?` placeholder
//! markers and an ordered input variable list into an executable query
//! string.
//!
//! Numeric kinds format through Rust's `Display`, which never consults a
//! process locale, so the literals always parse under the database's numeric
//! grammar. Text kinds are quoted with every embedded quote doubled and
//! every backslash doubled. A negative input indicator renders the NULL
//! keyword and skips the value entirely. Multi-element numeric and bool
//! slices render as a quoted `{...}` array literal.

use crate::core::{EsqlError, Result};
use crate::variable::{HostSlot, Variable};
use tracing::debug;

/// Quotes a text value for splicing: doubles embedded single quotes,
/// doubles backslashes, wraps in single quotes.
pub fn quote_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        match ch {
            '\'' => out.push_str("''"),
            '\\' => out.push_str("\\\\"),
            _ => out.push(ch),
        }
    }
    out.push('\'');
    out
}

/// Byte offset of the next `?` marker outside quoted literals, if any.
///
/// A quote region opens and closes on `'`; a backslash-escaped quote inside
/// a region does not close it.
fn next_marker(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut in_string = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' => {
                if in_string && i > 0 && bytes[i - 1] == b'\\' {
                    // escaped quote, still inside the literal
                } else {
                    in_string = !in_string;
                }
            }
            b'?' if !in_string => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

fn join_array<T, F>(items: &[T], mut format_one: F) -> String
where
    F: FnMut(&T) -> String,
{
    let body: Vec<String> = items.iter().map(|item| format_one(item)).collect();
    format!("'{{{}}}'", body.join(","))
}

/// Renders one input variable as a literal.
///
/// The paired indicator wins over the stored value: a negative indicator
/// yields the NULL keyword without formatting the storage at all.
fn literal(var: &Variable) -> Result<String> {
    if var.is_null_input() {
        return Ok("null".to_string());
    }

    let text = match &var.slot {
        HostSlot::SmallInt(s) if s.len() > 1 => join_array(s, |v| v.to_string()),
        HostSlot::SmallInt(s) => scalar(s)?.to_string(),
        HostSlot::Int(s) if s.len() > 1 => join_array(s, |v| v.to_string()),
        HostSlot::Int(s) => scalar(s)?.to_string(),
        HostSlot::BigInt(s) if s.len() > 1 => join_array(s, |v| v.to_string()),
        HostSlot::BigInt(s) => scalar(s)?.to_string(),
        HostSlot::USmallInt(s) if s.len() > 1 => join_array(s, |v| v.to_string()),
        HostSlot::USmallInt(s) => scalar(s)?.to_string(),
        HostSlot::UInt(s) if s.len() > 1 => join_array(s, |v| v.to_string()),
        HostSlot::UInt(s) => scalar(s)?.to_string(),
        HostSlot::UBigInt(s) if s.len() > 1 => join_array(s, |v| v.to_string()),
        HostSlot::UBigInt(s) => scalar(s)?.to_string(),
        HostSlot::Float(s) if s.len() > 1 => join_array(s, |v| v.to_string()),
        HostSlot::Float(s) => scalar(s)?.to_string(),
        HostSlot::Double(s) if s.len() > 1 => join_array(s, |v| v.to_string()),
        HostSlot::Double(s) => scalar(s)?.to_string(),
        HostSlot::Bool(s) if s.len() > 1 => {
            join_array(s, |v| (if *v { "t" } else { "f" }).to_string())
        }
        HostSlot::Bool(s) => format!("'{}'", if *scalar(s)? { 't' } else { 'f' }),
        HostSlot::FixedText(t) => {
            if t.capacity() == 0 {
                return Err(empty_slot(var));
            }
            quote_literal(t.element(0))
        }
        HostSlot::VarText(s) => quote_literal(scalar(s)?.as_str()),
        HostSlot::TextPtr(opt) => match opt.as_ref().and_then(|rows| rows.first()) {
            Some(text) => quote_literal(text),
            None => return Err(empty_slot(var)),
        },
    };
    Ok(text)
}

fn scalar<'s, T>(slice: &'s [T]) -> Result<&'s T> {
    slice
        .first()
        .ok_or_else(|| EsqlError::Unsupported("empty input variable".to_string()))
}

fn empty_slot(var: &Variable) -> EsqlError {
    EsqlError::Unsupported(format!("empty {} input variable", var.slot.kind()))
}

/// Renders the full template: splices one literal per marker, left to right.
///
/// An input variable with no marker left is `TooManyArguments`; a marker
/// with no input variable left is `TooFewArguments`. Both are caught here,
/// before anything reaches the connection.
pub fn render(template: &str, inputs: &[Variable]) -> Result<String> {
    let mut rendered = template.to_string();
    let mut cursor = 0;

    for var in inputs {
        let value = literal(var)?;
        match next_marker(&rendered[cursor..]) {
            Some(offset) => {
                let at = cursor + offset;
                rendered.replace_range(at..at + 1, &value);
                cursor = at + value.len();
            }
            None => {
                debug!("render: input variable left over after last marker");
                return Err(EsqlError::TooManyArguments);
            }
        }
    }

    if next_marker(&rendered[cursor..]).is_some() {
        debug!("render: marker left over after last input variable");
        return Err(EsqlError::TooFewArguments);
    }

    Ok(rendered)
}
