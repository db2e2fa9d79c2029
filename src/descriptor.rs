//! Dynamic descriptors: named handles to a result set whose shape is only
//! known at run time. A descriptor is allocated empty, populated by
//! executing a query into it, then consulted field-by-field.

use crate::core::{EsqlError, Result};
use crate::typeinfo::{self, DynType};
use crate::wire::TableResult;
use std::str::FromStr;

/// The fixed set of items a descriptor field can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescItem {
    Name,
    Nullable,
    KeyMember,
    Length,
    Precision,
    Scale,
    Type,
    OctetLength,
    ReturnedLength,
    Indicator,
}

impl FromStr for DescItem {
    type Err = EsqlError;

    /// Parses the textual item names the preprocessor emits.
    fn from_str(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "name" => Ok(DescItem::Name),
            "nullable" => Ok(DescItem::Nullable),
            "key_member" => Ok(DescItem::KeyMember),
            "length" => Ok(DescItem::Length),
            "precision" => Ok(DescItem::Precision),
            "scale" => Ok(DescItem::Scale),
            "type" => Ok(DescItem::Type),
            "octet_length" => Ok(DescItem::OctetLength),
            "returned_length" => Ok(DescItem::ReturnedLength),
            "indicator" => Ok(DescItem::Indicator),
            other => Err(EsqlError::UnknownDescriptorItem(other.to_string())),
        }
    }
}

/// Value of one descriptor item.
#[derive(Debug, Clone, PartialEq)]
pub enum DescValue {
    Int(i64),
    Text(String),
}

impl DescValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            DescValue::Int(v) => Some(*v),
            DescValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            DescValue::Text(t) => Some(t),
            DescValue::Int(_) => None,
        }
    }
}

/// A named handle to the most recent result executed into it.
#[derive(Debug, Default)]
pub struct Descriptor {
    result: Option<TableResult>,
}

impl Descriptor {
    pub fn new() -> Self {
        Descriptor::default()
    }

    /// Replaces the stored result; the previous one is discarded.
    pub(crate) fn set_result(&mut self, result: Option<TableResult>) {
        self.result = result;
    }

    pub fn field_count(&self) -> usize {
        self.result.as_ref().map_or(0, |r| r.field_count())
    }

    /// Answers one item for the 1-based field `index`.
    ///
    /// `nullable` and `key_member` are the hard-coded answers of the legacy
    /// calling convention (always true, always false); the runtime derives
    /// no catalog metadata for them. `octet_length`, `returned_length` and
    /// `indicator` describe the first returned row.
    pub fn item(&self, index: i32, item: DescItem) -> Result<DescValue> {
        let result = self
            .result
            .as_ref()
            .filter(|r| index >= 1 && (index as usize) <= r.field_count())
            .ok_or(EsqlError::InvalidDescriptorIndex(index))?;
        let field = (index - 1) as usize;
        let column = result.column(field).expect("index checked");

        let value = match item {
            DescItem::Name => DescValue::Text(column.name.clone()),
            DescItem::Nullable => DescValue::Int(1),
            DescItem::KeyMember => DescValue::Int(0),
            DescItem::Length => DescValue::Int(typeinfo::declared_length(
                column.type_id,
                column.size,
                column.modifier,
            )),
            DescItem::Precision => {
                DescValue::Int(typeinfo::numeric_precision(column.type_id, column.modifier))
            }
            DescItem::Scale => {
                DescValue::Int(typeinfo::numeric_scale(column.type_id, column.modifier))
            }
            DescItem::Type => DescValue::Int(DynType::from_type_id(column.type_id).code()),
            DescItem::OctetLength | DescItem::ReturnedLength => {
                DescValue::Int(result.cell(0, field).map_or(0, |t| t.len() as i64))
            }
            DescItem::Indicator => {
                DescValue::Int(if result.cell(0, field).is_none() { -1 } else { 0 })
            }
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typeinfo::oid;
    use crate::wire::ColumnInfo;

    fn sample_descriptor() -> Descriptor {
        let mut desc = Descriptor::new();
        desc.set_result(Some(TableResult {
            columns: vec![
                ColumnInfo {
                    name: "title".to_string(),
                    type_id: oid::VARCHAR,
                    size: -1,
                    modifier: 36, // varchar(32)
                },
                ColumnInfo {
                    name: "price".to_string(),
                    type_id: oid::NUMERIC,
                    size: -1,
                    modifier: ((10 << 16) | 2) + typeinfo::VAR_HEADER_SIZE,
                },
            ],
            rows: vec![vec![Some("dune".to_string()), None]],
        }));
        desc
    }

    #[test]
    fn test_header_and_name() {
        let desc = sample_descriptor();
        assert_eq!(desc.field_count(), 2);
        assert_eq!(
            desc.item(1, DescItem::Name).unwrap().as_text(),
            Some("title")
        );
        assert_eq!(
            desc.item(2, DescItem::Name).unwrap().as_text(),
            Some("price")
        );
    }

    #[test]
    fn test_index_out_of_range() {
        let desc = sample_descriptor();
        for bad in [0, -1, 3] {
            let err = desc.item(bad, DescItem::Name).unwrap_err();
            assert!(matches!(err, EsqlError::InvalidDescriptorIndex(i) if i == bad));
        }
        // An empty descriptor rejects every index.
        let empty = Descriptor::new();
        assert!(empty.item(1, DescItem::Name).is_err());
    }

    #[test]
    fn test_length_precision_scale() {
        let desc = sample_descriptor();
        assert_eq!(desc.item(1, DescItem::Length).unwrap(), DescValue::Int(32));
        assert_eq!(
            desc.item(2, DescItem::Precision).unwrap(),
            DescValue::Int(10)
        );
        assert_eq!(desc.item(2, DescItem::Scale).unwrap(), DescValue::Int(2));
    }

    #[test]
    fn test_hard_coded_items() {
        let desc = sample_descriptor();
        assert_eq!(desc.item(1, DescItem::Nullable).unwrap(), DescValue::Int(1));
        assert_eq!(
            desc.item(1, DescItem::KeyMember).unwrap(),
            DescValue::Int(0)
        );
    }

    #[test]
    fn test_row_zero_items() {
        let desc = sample_descriptor();
        assert_eq!(
            desc.item(1, DescItem::ReturnedLength).unwrap(),
            DescValue::Int(4)
        );
        assert_eq!(
            desc.item(1, DescItem::Indicator).unwrap(),
            DescValue::Int(0)
        );
        assert_eq!(
            desc.item(2, DescItem::Indicator).unwrap(),
            DescValue::Int(-1)
        );
    }

    #[test]
    fn test_dynamic_type_tag() {
        let desc = sample_descriptor();
        assert_eq!(
            desc.item(1, DescItem::Type).unwrap(),
            DescValue::Int(DynType::CharacterVarying.code())
        );
    }

    #[test]
    fn test_item_names_parse() {
        assert_eq!("name".parse::<DescItem>().unwrap(), DescItem::Name);
        assert_eq!("TYPE".parse::<DescItem>().unwrap(), DescItem::Type);
        assert_eq!(
            "octet_length".parse::<DescItem>().unwrap(),
            DescItem::OctetLength
        );
        let err = "cardinality".parse::<DescItem>().unwrap_err();
        assert!(matches!(err, EsqlError::UnknownDescriptorItem(_)));
    }
}
