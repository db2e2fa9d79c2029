//! Host and indicator variable model.
//!
//! A host variable is one caller-owned storage slot bound into a statement,
//! either as an input (its value is rendered into the query) or as an output
//! (decoded rows are written into it). Arrays are expressed as slices:
//! a scalar is a one-element slice, an array's capacity is its length.
//! Fixed-width text with record striding goes through `FixedText`, which
//! keeps the stride arithmetic internal and bounds-checked.

use crate::core::{EsqlError, Result};
use std::fmt;

/// Kind tags, used for trace output and format-error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKind {
    SmallInt,
    Int,
    BigInt,
    USmallInt,
    UInt,
    UBigInt,
    Float,
    Double,
    Bool,
    FixedText,
    VarText,
    TextPtr,
}

impl fmt::Display for HostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HostKind::SmallInt => "smallint",
            HostKind::Int => "int",
            HostKind::BigInt => "bigint",
            HostKind::USmallInt => "unsigned smallint",
            HostKind::UInt => "unsigned int",
            HostKind::UBigInt => "unsigned bigint",
            HostKind::Float => "float",
            HostKind::Double => "double",
            HostKind::Bool => "bool",
            HostKind::FixedText => "fixed text",
            HostKind::VarText => "varchar",
            HostKind::TextPtr => "text pointer",
        };
        f.write_str(name)
    }
}

/// Stored bytes as text. Byte-wise truncation can split a multi-byte
/// character; the valid prefix is exposed rather than nothing.
fn text_prefix(bytes: &[u8]) -> &str {
    match std::str::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => std::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or(""),
    }
}

/// Length-prefixed text storage: a fixed capacity buffer plus the used
/// length. Decoding truncates to capacity and records the stored length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarChar {
    pub len: usize,
    pub arr: Vec<u8>,
}

impl VarChar {
    /// An empty varchar with the given fixed capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        VarChar {
            len: 0,
            arr: vec![0; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.arr.len()
    }

    /// The stored text, up to `len`.
    pub fn as_str(&self) -> &str {
        text_prefix(&self.arr[..self.len])
    }

    /// Stores `text`, truncating to capacity. Returns the stored length.
    pub fn store(&mut self, text: &str) -> usize {
        let n = text.len().min(self.arr.len());
        self.arr[..n].copy_from_slice(&text.as_bytes()[..n]);
        self.len = n;
        n
    }
}

/// Fixed-width text elements packed into a strided byte buffer.
///
/// `width` bytes of text per element, elements `stride` bytes apart (stride
/// covers surrounding record fields when the buffer is an array of composite
/// records). Stored text shorter than `width` is NUL padded.
#[derive(Debug)]
pub struct FixedText<'a> {
    buf: &'a mut [u8],
    width: usize,
    stride: usize,
}

impl<'a> FixedText<'a> {
    /// Wraps caller storage. The stride must cover the width and the buffer
    /// must hold a whole number of elements.
    pub fn new(buf: &'a mut [u8], width: usize, stride: usize) -> Result<Self> {
        if width == 0 || stride < width || buf.len() % stride != 0 {
            return Err(EsqlError::Unsupported(format!(
                "invalid fixed text shape: len {} width {} stride {}",
                buf.len(),
                width,
                stride
            )));
        }
        Ok(FixedText { buf, width, stride })
    }

    /// Wraps a contiguous buffer of `width`-sized elements.
    pub fn packed(buf: &'a mut [u8], width: usize) -> Result<Self> {
        Self::new(buf, width, width)
    }

    pub fn capacity(&self) -> usize {
        self.buf.len() / self.stride
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Text of one element, up to the first NUL.
    pub fn element(&self, index: usize) -> &str {
        let start = index * self.stride;
        let bytes = &self.buf[start..start + self.width];
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(self.width);
        text_prefix(&bytes[..end])
    }

    /// Stores `text` into one element, truncating to the element width and
    /// NUL padding the remainder. Returns the stored length.
    pub fn store(&mut self, index: usize, text: &str) -> usize {
        let start = index * self.stride;
        let slot = &mut self.buf[start..start + self.width];
        let n = text.len().min(slot.len());
        slot[..n].copy_from_slice(&text.as_bytes()[..n]);
        for b in &mut slot[n..] {
            *b = 0;
        }
        n
    }
}

/// The tagged union of host storage slots.
///
/// Each variant holds an exclusive borrow of caller memory. `TextPtr` is the
/// runtime-allocated case: the caller supplies an empty `Option` and the
/// runtime fills it with a right-sized buffer during decode.
#[derive(Debug)]
pub enum HostSlot<'a> {
    SmallInt(&'a mut [i16]),
    Int(&'a mut [i32]),
    BigInt(&'a mut [i64]),
    USmallInt(&'a mut [u16]),
    UInt(&'a mut [u32]),
    UBigInt(&'a mut [u64]),
    Float(&'a mut [f32]),
    Double(&'a mut [f64]),
    Bool(&'a mut [bool]),
    FixedText(FixedText<'a>),
    VarText(&'a mut [VarChar]),
    TextPtr(&'a mut Option<Vec<String>>),
}

impl HostSlot<'_> {
    pub fn kind(&self) -> HostKind {
        match self {
            HostSlot::SmallInt(_) => HostKind::SmallInt,
            HostSlot::Int(_) => HostKind::Int,
            HostSlot::BigInt(_) => HostKind::BigInt,
            HostSlot::USmallInt(_) => HostKind::USmallInt,
            HostSlot::UInt(_) => HostKind::UInt,
            HostSlot::UBigInt(_) => HostKind::UBigInt,
            HostSlot::Float(_) => HostKind::Float,
            HostSlot::Double(_) => HostKind::Double,
            HostSlot::Bool(_) => HostKind::Bool,
            HostSlot::FixedText(_) => HostKind::FixedText,
            HostSlot::VarText(_) => HostKind::VarText,
            HostSlot::TextPtr(_) => HostKind::TextPtr,
        }
    }

    /// Declared element capacity; `None` for the runtime-allocated pointer
    /// slot, which grows to fit the result.
    pub fn capacity(&self) -> Option<usize> {
        match self {
            HostSlot::SmallInt(s) => Some(s.len()),
            HostSlot::Int(s) => Some(s.len()),
            HostSlot::BigInt(s) => Some(s.len()),
            HostSlot::USmallInt(s) => Some(s.len()),
            HostSlot::UInt(s) => Some(s.len()),
            HostSlot::UBigInt(s) => Some(s.len()),
            HostSlot::Float(s) => Some(s.len()),
            HostSlot::Double(s) => Some(s.len()),
            HostSlot::Bool(s) => Some(s.len()),
            HostSlot::FixedText(t) => Some(t.capacity()),
            HostSlot::VarText(s) => Some(s.len()),
            HostSlot::TextPtr(_) => None,
        }
    }
}

/// Indicator storage paired with a host variable.
///
/// On input a negative value at index 0 binds NULL. On output each element
/// receives -1 for a NULL cell, the returned length for text kinds, or 0.
/// The convention allows three integer widths for indicators.
#[derive(Debug)]
pub enum IndicatorSlot<'a> {
    Short(&'a mut [i16]),
    Int(&'a mut [i32]),
    Long(&'a mut [i64]),
}

impl IndicatorSlot<'_> {
    pub fn capacity(&self) -> usize {
        match self {
            IndicatorSlot::Short(s) => s.len(),
            IndicatorSlot::Int(s) => s.len(),
            IndicatorSlot::Long(s) => s.len(),
        }
    }

    pub fn get(&self, index: usize) -> i64 {
        match self {
            IndicatorSlot::Short(s) => s[index] as i64,
            IndicatorSlot::Int(s) => s[index] as i64,
            IndicatorSlot::Long(s) => s[index],
        }
    }

    /// Stores a value, saturating to the slot's integer width.
    pub fn set(&mut self, index: usize, value: i64) {
        match self {
            IndicatorSlot::Short(s) => s[index] = value.clamp(i16::MIN as i64, i16::MAX as i64) as i16,
            IndicatorSlot::Int(s) => s[index] = value.clamp(i32::MIN as i64, i32::MAX as i64) as i32,
            IndicatorSlot::Long(s) => s[index] = value,
        }
    }
}

/// One bound host variable: a storage slot plus its optional indicator.
#[derive(Debug)]
pub struct Variable<'a> {
    pub slot: HostSlot<'a>,
    pub indicator: Option<IndicatorSlot<'a>>,
}

impl<'a> Variable<'a> {
    pub fn new(slot: HostSlot<'a>) -> Self {
        Variable {
            slot,
            indicator: None,
        }
    }

    pub fn with_indicator(slot: HostSlot<'a>, indicator: IndicatorSlot<'a>) -> Self {
        Variable {
            slot,
            indicator: Some(indicator),
        }
    }

    /// True when the input indicator marks this variable NULL.
    pub fn is_null_input(&self) -> bool {
        match &self.indicator {
            Some(ind) if ind.capacity() > 0 => ind.get(0) < 0,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varchar_store_and_truncate() {
        let mut vc = VarChar::with_capacity(5);
        assert_eq!(vc.store("hi"), 2);
        assert_eq!(vc.as_str(), "hi");
        assert_eq!(vc.store("overflowing"), 5);
        assert_eq!(vc.as_str(), "overf");
    }

    #[test]
    fn test_varchar_truncation_keeps_valid_utf8_prefix() {
        // "héllo" is 6 bytes; capacity 2 cuts through the two-byte é.
        let mut vc = VarChar::with_capacity(2);
        assert_eq!(vc.store("héllo"), 2);
        assert_eq!(vc.as_str(), "h");

        let mut vc = VarChar::with_capacity(3);
        assert_eq!(vc.store("héllo"), 3);
        assert_eq!(vc.as_str(), "hé");
    }

    #[test]
    fn test_fixed_text_truncation_keeps_valid_utf8_prefix() {
        let mut buf = vec![0u8; 2];
        let mut ft = FixedText::packed(&mut buf, 2).unwrap();
        assert_eq!(ft.store(0, "héllo"), 2);
        assert_eq!(ft.element(0), "h");
    }

    #[test]
    fn test_fixed_text_strided_elements() {
        // Three 8-byte records, 4 bytes of text each
        let mut buf = vec![0u8; 24];
        let mut ft = FixedText::new(&mut buf, 4, 8).unwrap();
        assert_eq!(ft.capacity(), 3);
        assert_eq!(ft.store(1, "ab"), 2);
        assert_eq!(ft.store(2, "longer"), 4);
        assert_eq!(ft.element(0), "");
        assert_eq!(ft.element(1), "ab");
        assert_eq!(ft.element(2), "long");
    }

    #[test]
    fn test_fixed_text_rejects_bad_shape() {
        let mut buf = vec![0u8; 10];
        assert!(FixedText::new(&mut buf, 4, 3).is_err());
        assert!(FixedText::new(&mut buf, 0, 4).is_err());
        assert!(FixedText::new(&mut buf, 4, 4).is_err()); // 10 not a multiple of 4
    }

    #[test]
    fn test_indicator_saturates_to_width() {
        let mut ind = [0i16; 1];
        let mut slot = IndicatorSlot::Short(&mut ind);
        slot.set(0, 1 << 20);
        assert_eq!(slot.get(0), i16::MAX as i64);
        slot.set(0, -1);
        assert_eq!(slot.get(0), -1);
    }

    #[test]
    fn test_null_input_needs_negative_indicator() {
        let mut value = [42i32];
        let mut ind = [0i32];
        let var = Variable::with_indicator(
            HostSlot::Int(&mut value),
            IndicatorSlot::Int(&mut ind),
        );
        assert!(!var.is_null_input());

        let mut value = [42i32];
        let mut ind = [-1i32];
        let var = Variable::with_indicator(
            HostSlot::Int(&mut value),
            IndicatorSlot::Int(&mut ind),
        );
        assert!(var.is_null_input());

        let mut value = [42i32];
        let var = Variable::new(HostSlot::Int(&mut value));
        assert!(!var.is_null_input());
    }
}
