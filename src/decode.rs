//! Output row decoding: writes a tabular result back into the caller's
//! output variables and their indicators.
//!
//! For every output variable, in field order, every returned row is decoded
//! up to the variable's declared capacity. The indicator is set from the
//! cell's null flag before any value conversion; numeric parses are strict
//! and must consume the whole cell text; text kinds truncate into place and
//! report lengths through the indicator plus the truncation warning flag.
//! Pointer-slot variables get one right-sized buffer allocated per variable,
//! staged through the allocation scope and committed only if the entire
//! decode succeeds.

use crate::connection::Connection;
use crate::core::{EsqlError, Result};
use crate::diag::Warnings;
use crate::mem::AllocScope;
use crate::statement::TraceSink;
use crate::variable::{HostSlot, IndicatorSlot, Variable};
use crate::wire::TableResult;
use tracing::debug;

fn parse_i64(text: &str) -> Result<i64> {
    text.parse::<i64>()
        .map_err(|_| EsqlError::IntFormat(text.to_string()))
}

fn parse_u64(text: &str) -> Result<u64> {
    text.parse::<u64>()
        .map_err(|_| EsqlError::UintFormat(text.to_string()))
}

fn parse_f64(text: &str) -> Result<f64> {
    text.parse::<f64>()
        .map_err(|_| EsqlError::FloatFormat(text.to_string()))
}

fn narrow_i<T: TryFrom<i64>>(value: i64, text: &str) -> Result<T> {
    T::try_from(value).map_err(|_| EsqlError::IntFormat(text.to_string()))
}

fn narrow_u<T: TryFrom<u64>>(value: u64, text: &str) -> Result<T> {
    T::try_from(value).map_err(|_| EsqlError::UintFormat(text.to_string()))
}

fn parse_bool(text: &str) -> Result<bool> {
    match text {
        "t" => Ok(true),
        "f" => Ok(false),
        other => Err(EsqlError::BoolFormat(other.to_string())),
    }
}

/// Sets the indicator for one row from the cell's null flag. A NULL cell
/// without an indicator is an error; decoding of the value is skipped for
/// NULL either way.
fn set_null_indicator(
    indicator: &mut Option<IndicatorSlot<'_>>,
    index: usize,
    is_null: bool,
) -> Result<bool> {
    match indicator {
        Some(ind) => ind.set(index, if is_null { -1 } else { 0 }),
        None if is_null => return Err(EsqlError::MissingIndicator),
        None => {}
    }
    Ok(is_null)
}

/// Decodes one non-text cell into one element of the slot.
fn store_value(slot: &mut HostSlot<'_>, index: usize, text: &str) -> Result<()> {
    match slot {
        HostSlot::SmallInt(s) => s[index] = narrow_i(parse_i64(text)?, text)?,
        HostSlot::Int(s) => s[index] = narrow_i(parse_i64(text)?, text)?,
        HostSlot::BigInt(s) => s[index] = parse_i64(text)?,
        HostSlot::USmallInt(s) => s[index] = narrow_u(parse_u64(text)?, text)?,
        HostSlot::UInt(s) => s[index] = narrow_u(parse_u64(text)?, text)?,
        HostSlot::UBigInt(s) => s[index] = parse_u64(text)?,
        HostSlot::Float(s) => s[index] = parse_f64(text)? as f32,
        HostSlot::Double(s) => s[index] = parse_f64(text)?,
        HostSlot::Bool(s) => s[index] = parse_bool(text)?,
        HostSlot::FixedText(_) | HostSlot::VarText(_) | HostSlot::TextPtr(_) => {
            unreachable!("text kinds are decoded by store_text")
        }
    }
    Ok(())
}

/// Decodes one text cell, truncating into place and reporting lengths.
///
/// The indicator receives the returned length, or the truncated length when
/// the source did not fit; truncation also raises the warning flag.
fn store_text(
    slot: &mut HostSlot<'_>,
    indicator: &mut Option<IndicatorSlot<'_>>,
    index: usize,
    text: &str,
    warnings: &mut Warnings,
) -> Result<()> {
    let (stored, capacity) = match slot {
        HostSlot::FixedText(t) => (t.store(index, text), t.width()),
        HostSlot::VarText(s) => {
            let vc = &mut s[index];
            (vc.store(text), vc.capacity())
        }
        _ => unreachable!("store_text called for a non-text kind"),
    };
    if text.len() > capacity {
        debug!("truncated {} bytes to {}", text.len(), stored);
        warnings.set_truncated();
        if let Some(ind) = indicator {
            ind.set(index, stored as i64);
        }
    } else if let Some(ind) = indicator {
        ind.set(index, text.len() as i64);
    }
    Ok(())
}

fn is_text_kind(slot: &HostSlot<'_>) -> bool {
    matches!(slot, HostSlot::FixedText(_) | HostSlot::VarText(_))
}

/// Text hosts never split on the brace syntax, even when the server flags
/// the column's type as an array: array values of text-like types land in
/// the host variable verbatim. Only numeric and bool host arrays take the
/// element-wise path.
fn splits_as_array(slot: &HostSlot<'_>) -> bool {
    !matches!(
        slot,
        HostSlot::FixedText(_) | HostSlot::VarText(_) | HostSlot::TextPtr(_)
    )
}

/// Splits a server array value (`{a,b,c}`) into elements. Values of the
/// types the runtime asks this for carry no quoting or nesting.
fn split_array_cell(text: &str) -> Vec<&str> {
    let inner = text
        .strip_prefix('{')
        .and_then(|t| t.strip_suffix('}'))
        .unwrap_or(text);
    if inner.is_empty() {
        Vec::new()
    } else {
        inner.split(',').collect()
    }
}

/// Capacity check: a positive declared capacity (and the indicator's) must
/// cover the full row count before any row is decoded.
fn check_capacity(var: &Variable<'_>, rows: usize) -> Result<()> {
    if let Some(capacity) = var.slot.capacity() {
        if rows > capacity {
            return Err(EsqlError::TooManyMatches { rows, capacity });
        }
    }
    if let Some(ind) = &var.indicator {
        if rows > ind.capacity() {
            return Err(EsqlError::TooManyMatches {
                rows,
                capacity: ind.capacity(),
            });
        }
    }
    Ok(())
}

/// Decodes every field of `result` into the output variables, in order.
pub(crate) fn decode_rows(
    result: &TableResult,
    outputs: &mut [Variable<'_>],
    conn: &mut Connection,
    warnings: &mut Warnings,
    trace: &mut TraceSink,
) -> Result<()> {
    let rows = result.row_count();
    let mut scope = AllocScope::new();

    for (field, column) in result.columns.iter().enumerate() {
        let Some(var) = outputs.get_mut(field) else {
            debug!("result has more fields than output variables");
            return Err(EsqlError::TooFewArguments);
        };

        let isarray = conn.is_type_array(column.type_id)?;

        if isarray && splits_as_array(&var.slot) {
            decode_array_field(result, field, var, rows, trace)?;
            continue;
        }

        check_capacity(var, rows)?;

        if let HostSlot::TextPtr(_) = var.slot {
            decode_pointer_field(result, field, var, rows, &mut scope, trace)?;
            continue;
        }

        let Variable { slot, indicator } = var;
        for row in 0..rows {
            let cell = result.cell(row, field);
            trace.line(&format!(
                "RESULT: {} offset: {} array: no",
                cell.unwrap_or(""),
                row
            ));
            if set_null_indicator(indicator, row, cell.is_none())? {
                continue;
            }
            let text = cell.expect("checked non-null");
            if is_text_kind(slot) {
                store_text(slot, indicator, row, text, warnings)?;
            } else {
                store_value(slot, row, text)?;
            }
        }
    }

    if outputs.len() > result.field_count() {
        debug!("more output variables than result fields");
        return Err(EsqlError::TooManyArguments);
    }

    scope.commit(outputs);
    Ok(())
}

/// Decodes a server array cell element-by-element into a host array.
///
/// An array cell fills the whole host array from a single row, so the
/// result must carry exactly one row for this field.
fn decode_array_field(
    result: &TableResult,
    field: usize,
    var: &mut Variable<'_>,
    rows: usize,
    trace: &mut TraceSink,
) -> Result<()> {
    if rows > 1 {
        return Err(EsqlError::TooManyMatches { rows, capacity: 1 });
    }
    // The single source row still needs one indicator element.
    if let Some(ind) = &var.indicator {
        if ind.capacity() < 1 {
            return Err(EsqlError::TooManyMatches {
                rows: 1,
                capacity: 0,
            });
        }
    }

    let cell = result.cell(0, field);
    trace.line(&format!("RESULT: {} array: yes", cell.unwrap_or("")));

    let Variable { slot, indicator } = var;
    if set_null_indicator(indicator, 0, cell.is_none())? {
        return Ok(());
    }
    let elements = split_array_cell(cell.expect("checked non-null"));

    let capacity = slot.capacity().unwrap_or(elements.len());
    if elements.len() > capacity {
        return Err(EsqlError::TooManyMatches {
            rows: elements.len(),
            capacity,
        });
    }

    for (index, element) in elements.iter().enumerate() {
        store_value(slot, index, element)?;
    }
    Ok(())
}

/// Decodes into a pointer slot: one buffer per variable, sized from the
/// actual result, staged until the whole decode succeeds.
fn decode_pointer_field(
    result: &TableResult,
    field: usize,
    var: &mut Variable<'_>,
    rows: usize,
    scope: &mut AllocScope,
    trace: &mut TraceSink,
) -> Result<()> {
    if let Some(ind) = &var.indicator {
        if rows > ind.capacity() {
            return Err(EsqlError::TooManyMatches {
                rows,
                capacity: ind.capacity(),
            });
        }
    }

    let widest = (0..rows)
        .filter_map(|row| result.cell(row, field))
        .map(|text| text.len())
        .max()
        .unwrap_or(0);

    let buffer = scope.allocate(field, rows, widest)?;
    // Split borrow: the buffer is staged, the indicator still lives in var.
    let indicator = &mut var.indicator;

    for row in 0..rows {
        let cell = result.cell(row, field);
        trace.line(&format!(
            "RESULT: {} offset: {} array: no",
            cell.unwrap_or(""),
            row
        ));
        if set_null_indicator(indicator, row, cell.is_none())? {
            buffer.push(String::new());
            continue;
        }
        buffer.push(cell.expect("checked non-null").to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{column, table, ScriptedWire};
    use crate::typeinfo::oid;
    use crate::variable::{FixedText, VarChar};

    fn test_connection() -> Connection {
        Connection::new("test".into(), Box::new(ScriptedWire::new()), true)
    }

    fn decode(
        result: &TableResult,
        outputs: &mut [Variable<'_>],
        warnings: &mut Warnings,
    ) -> Result<()> {
        let mut conn = test_connection();
        let mut trace = TraceSink::off();
        decode_rows(result, outputs, &mut conn, warnings, &mut trace)
    }

    #[test]
    fn test_decode_int_rows() {
        let result = table(
            vec![column("n", oid::INT4)],
            vec![vec![Some("1")], vec![Some("2")], vec![Some("3")]],
        );
        let mut values = [0i32; 3];
        let mut ind = [9i32; 3];
        let mut outputs = [Variable::with_indicator(
            HostSlot::Int(&mut values),
            IndicatorSlot::Int(&mut ind),
        )];
        decode(&result, &mut outputs, &mut Warnings::default()).unwrap();
        assert_eq!(values, [1, 2, 3]);
        assert_eq!(ind, [0, 0, 0]);
    }

    #[test]
    fn test_strict_parse_rejects_trailing_garbage() {
        let result = table(vec![column("n", oid::INT4)], vec![vec![Some("12abc")]]);
        let mut values = [0i32];
        let mut outputs = [Variable::new(HostSlot::Int(&mut values))];
        let err = decode(&result, &mut outputs, &mut Warnings::default()).unwrap_err();
        match err {
            EsqlError::IntFormat(text) => assert_eq!(text, "12abc"),
            other => panic!("expected IntFormat, got {other:?}"),
        }
    }

    #[test]
    fn test_unsigned_and_float_formats() {
        let result = table(vec![column("n", oid::INT4)], vec![vec![Some("-1")]]);
        let mut values = [0u32];
        let mut outputs = [Variable::new(HostSlot::UInt(&mut values))];
        let err = decode(&result, &mut outputs, &mut Warnings::default()).unwrap_err();
        assert!(matches!(err, EsqlError::UintFormat(_)));

        let result = table(vec![column("x", oid::FLOAT8)], vec![vec![Some("1.5e")]]);
        let mut values = [0f64];
        let mut outputs = [Variable::new(HostSlot::Double(&mut values))];
        let err = decode(&result, &mut outputs, &mut Warnings::default()).unwrap_err();
        assert!(matches!(err, EsqlError::FloatFormat(_)));
    }

    #[test]
    fn test_bool_tokens() {
        let result = table(
            vec![column("b", oid::BOOL)],
            vec![vec![Some("t")], vec![Some("f")]],
        );
        let mut values = [false, true];
        let mut outputs = [Variable::new(HostSlot::Bool(&mut values))];
        decode(&result, &mut outputs, &mut Warnings::default()).unwrap();
        assert_eq!(values, [true, false]);

        let result = table(vec![column("b", oid::BOOL)], vec![vec![Some("yes")]]);
        let mut values = [false];
        let mut outputs = [Variable::new(HostSlot::Bool(&mut values))];
        let err = decode(&result, &mut outputs, &mut Warnings::default()).unwrap_err();
        assert!(matches!(err, EsqlError::BoolFormat(_)));
    }

    #[test]
    fn test_null_sets_indicator_and_skips_value() {
        let result = table(vec![column("n", oid::INT4)], vec![vec![None]]);
        let mut values = [42i32];
        let mut ind = [0i16];
        let mut outputs = [Variable::with_indicator(
            HostSlot::Int(&mut values),
            IndicatorSlot::Short(&mut ind),
        )];
        decode(&result, &mut outputs, &mut Warnings::default()).unwrap();
        assert_eq!(ind, [-1]);
        // storage untouched
        assert_eq!(values, [42]);
    }

    #[test]
    fn test_null_without_indicator_is_an_error() {
        let result = table(vec![column("n", oid::INT4)], vec![vec![None]]);
        let mut values = [0i32];
        let mut outputs = [Variable::new(HostSlot::Int(&mut values))];
        let err = decode(&result, &mut outputs, &mut Warnings::default()).unwrap_err();
        assert!(matches!(err, EsqlError::MissingIndicator));
    }

    #[test]
    fn test_fixed_text_truncation_reports_length_and_warns() {
        let result = table(vec![column("s", oid::TEXT)], vec![vec![Some("truncate me")]]);
        let mut buf = [0u8; 4];
        let mut ind = [0i32];
        let mut outputs = [Variable::with_indicator(
            HostSlot::FixedText(FixedText::packed(&mut buf, 4).unwrap()),
            IndicatorSlot::Int(&mut ind),
        )];
        let mut warnings = Warnings::default();
        decode(&result, &mut outputs, &mut warnings).unwrap();
        assert_eq!(&buf, b"trun");
        assert_eq!(ind, [4]);
        assert!(warnings.truncated);
    }

    #[test]
    fn test_fitting_text_reports_returned_length_without_warning() {
        let result = table(vec![column("s", oid::TEXT)], vec![vec![Some("ok")]]);
        let mut buf = [0u8; 8];
        let mut ind = [0i32];
        let mut outputs = [Variable::with_indicator(
            HostSlot::FixedText(FixedText::packed(&mut buf, 8).unwrap()),
            IndicatorSlot::Int(&mut ind),
        )];
        let mut warnings = Warnings::default();
        decode(&result, &mut outputs, &mut warnings).unwrap();
        assert_eq!(&buf[..2], b"ok");
        assert_eq!(ind, [2]);
        assert!(!warnings.any);
    }

    #[test]
    fn test_varchar_truncation() {
        let result = table(vec![column("s", oid::VARCHAR)], vec![vec![Some("abcdef")]]);
        let mut vars = [VarChar::with_capacity(3)];
        let mut ind = [0i64];
        let mut outputs = [Variable::with_indicator(
            HostSlot::VarText(&mut vars),
            IndicatorSlot::Long(&mut ind),
        )];
        let mut warnings = Warnings::default();
        decode(&result, &mut outputs, &mut warnings).unwrap();
        assert_eq!(vars[0].as_str(), "abc");
        assert_eq!(vars[0].len, 3);
        assert_eq!(ind, [3]);
        assert!(warnings.truncated);
    }

    #[test]
    fn test_capacity_overflow() {
        let result = table(
            vec![column("n", oid::INT4)],
            vec![vec![Some("1")], vec![Some("2")], vec![Some("3")]],
        );
        let mut values = [0i32; 2];
        let mut outputs = [Variable::new(HostSlot::Int(&mut values))];
        let err = decode(&result, &mut outputs, &mut Warnings::default()).unwrap_err();
        match err {
            EsqlError::TooManyMatches { rows, capacity } => {
                assert_eq!(rows, 3);
                assert_eq!(capacity, 2);
            }
            other => panic!("expected TooManyMatches, got {other:?}"),
        }
    }

    #[test]
    fn test_indicator_capacity_also_limits() {
        let result = table(
            vec![column("n", oid::INT4)],
            vec![vec![Some("1")], vec![Some("2")]],
        );
        let mut values = [0i32; 4];
        let mut ind = [0i32; 1];
        let mut outputs = [Variable::with_indicator(
            HostSlot::Int(&mut values),
            IndicatorSlot::Int(&mut ind),
        )];
        let err = decode(&result, &mut outputs, &mut Warnings::default()).unwrap_err();
        assert!(matches!(err, EsqlError::TooManyMatches { capacity: 1, .. }));
    }

    #[test]
    fn test_field_variable_mismatch() {
        let result = table(
            vec![column("a", oid::INT4), column("b", oid::INT4)],
            vec![vec![Some("1"), Some("2")]],
        );
        let mut values = [0i32];
        let mut outputs = [Variable::new(HostSlot::Int(&mut values))];
        let err = decode(&result, &mut outputs, &mut Warnings::default()).unwrap_err();
        assert!(matches!(err, EsqlError::TooFewArguments));

        let result = table(vec![column("a", oid::INT4)], vec![vec![Some("1")]]);
        let mut a = [0i32];
        let mut b = [0i32];
        let mut outputs = [
            Variable::new(HostSlot::Int(&mut a)),
            Variable::new(HostSlot::Int(&mut b)),
        ];
        let err = decode(&result, &mut outputs, &mut Warnings::default()).unwrap_err();
        assert!(matches!(err, EsqlError::TooManyArguments));
    }

    #[test]
    fn test_pointer_slot_allocation() {
        let result = table(
            vec![column("s", oid::TEXT)],
            vec![vec![Some("first")], vec![None], vec![Some("third")]],
        );
        let mut target: Option<Vec<String>> = None;
        let mut ind = [0i32; 3];
        {
            let mut outputs = [Variable::with_indicator(
                HostSlot::TextPtr(&mut target),
                IndicatorSlot::Int(&mut ind),
            )];
            decode(&result, &mut outputs, &mut Warnings::default()).unwrap();
        }
        assert_eq!(
            target.unwrap(),
            vec!["first".to_string(), String::new(), "third".to_string()]
        );
        assert_eq!(ind, [0, -1, 0]);
    }

    #[test]
    fn test_pointer_slot_not_filled_on_error() {
        // Second field fails to parse; the staged buffer must be dropped.
        let result = table(
            vec![column("s", oid::TEXT), column("n", oid::INT4)],
            vec![vec![Some("text"), Some("oops")]],
        );
        let mut target: Option<Vec<String>> = None;
        let mut n = [0i32];
        {
            let mut outputs = [
                Variable::new(HostSlot::TextPtr(&mut target)),
                Variable::new(HostSlot::Int(&mut n)),
            ];
            let err = decode(&result, &mut outputs, &mut Warnings::default()).unwrap_err();
            assert!(matches!(err, EsqlError::IntFormat(_)));
        }
        assert!(target.is_none());
    }

    #[test]
    fn test_array_cell_splits_into_host_array() {
        let mut conn = test_connection();
        let result = table(
            // bytea is flagged as an array type in the builtin table
            vec![column("v", oid::BYTEA)],
            vec![vec![Some("{1,2,3}")]],
        );
        let mut values = [0i32; 4];
        let mut outputs = [Variable::new(HostSlot::Int(&mut values))];
        let mut trace = TraceSink::off();
        decode_rows(
            &result,
            &mut outputs,
            &mut conn,
            &mut Warnings::default(),
            &mut trace,
        )
        .unwrap();
        assert_eq!(values, [1, 2, 3, 0]);
    }

    #[test]
    fn test_unsigned_narrowing_bounds() {
        let result = table(vec![column("n", oid::INT4)], vec![vec![Some("70000")]]);
        let mut values = [0u16];
        let mut outputs = [Variable::new(HostSlot::USmallInt(&mut values))];
        let err = decode(&result, &mut outputs, &mut Warnings::default()).unwrap_err();
        assert!(matches!(err, EsqlError::UintFormat(_)));

        // The same cell fits the wider unsigned kind.
        let result = table(vec![column("n", oid::INT4)], vec![vec![Some("70000")]]);
        let mut values = [0u32];
        let mut outputs = [Variable::new(HostSlot::UInt(&mut values))];
        decode(&result, &mut outputs, &mut Warnings::default()).unwrap();
        assert_eq!(values, [70_000]);

        let result = table(vec![column("n", oid::INT4)], vec![vec![Some("65535")]]);
        let mut values = [0u16];
        let mut outputs = [Variable::new(HostSlot::USmallInt(&mut values))];
        decode(&result, &mut outputs, &mut Warnings::default()).unwrap();
        assert_eq!(values, [u16::MAX]);
    }

    #[test]
    fn test_array_cell_overflow() {
        let mut conn = test_connection();
        let result = table(vec![column("v", oid::BYTEA)], vec![vec![Some("{1,2,3}")]]);
        let mut values = [0i32; 2];
        let mut outputs = [Variable::new(HostSlot::Int(&mut values))];
        let mut trace = TraceSink::off();
        let err = decode_rows(
            &result,
            &mut outputs,
            &mut conn,
            &mut Warnings::default(),
            &mut trace,
        )
        .unwrap_err();
        assert!(matches!(err, EsqlError::TooManyMatches { .. }));
    }

    #[test]
    fn test_array_cell_with_empty_indicator_reports_capacity() {
        let mut conn = test_connection();
        let result = table(vec![column("v", oid::BYTEA)], vec![vec![Some("{1,2}")]]);
        let mut values = [0i32; 2];
        let mut ind: [i32; 0] = [];
        let mut outputs = [Variable::with_indicator(
            HostSlot::Int(&mut values),
            IndicatorSlot::Int(&mut ind),
        )];
        let mut trace = TraceSink::off();
        let err = decode_rows(
            &result,
            &mut outputs,
            &mut conn,
            &mut Warnings::default(),
            &mut trace,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            EsqlError::TooManyMatches {
                rows: 1,
                capacity: 0
            }
        ));
    }
}
