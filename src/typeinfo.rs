//! Server type information: identifier constants, the builtin
//! oid → is-array seed table, type-modifier helpers and the portable
//! dynamic type tags descriptors report.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Well-known server type identifiers.
pub mod oid {
    pub const BOOL: u32 = 16;
    pub const BYTEA: u32 = 17;
    pub const CHAR: u32 = 18;
    pub const NAME: u32 = 19;
    pub const INT8: u32 = 20;
    pub const INT2: u32 = 21;
    pub const INT2VECTOR: u32 = 22;
    pub const INT4: u32 = 23;
    pub const TEXT: u32 = 25;
    pub const OID: u32 = 26;
    pub const OIDVECTOR: u32 = 30;
    pub const FLOAT4: u32 = 700;
    pub const FLOAT8: u32 = 701;
    pub const UNKNOWN: u32 = 705;
    pub const BPCHAR: u32 = 1042;
    pub const VARCHAR: u32 = 1043;
    pub const DATE: u32 = 1082;
    pub const TIME: u32 = 1083;
    pub const TIMESTAMP: u32 = 1114;
    pub const TIMETZ: u32 = 1266;
    pub const INTERVAL: u32 = 1186;
    pub const NUMERIC: u32 = 1700;
}

/// Header bytes a variable-length value carries before its payload; type
/// modifiers of the character types include it.
pub const VAR_HEADER_SIZE: i32 = 4;

/// Seed entries for the per-connection is-array cache: types whose array-ness
/// never needs a catalog round trip.
pub static BUILTIN_ARRAY_FLAGS: Lazy<HashMap<u32, bool>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert(oid::BOOL, false);
    m.insert(oid::BYTEA, true);
    m.insert(oid::CHAR, false);
    m.insert(oid::NAME, true);
    m.insert(oid::INT8, false);
    m.insert(oid::INT2, false);
    m.insert(oid::INT2VECTOR, true);
    m.insert(oid::INT4, false);
    m.insert(oid::TEXT, true);
    m.insert(oid::OID, false);
    m.insert(oid::OIDVECTOR, true);
    m.insert(oid::FLOAT4, false);
    m.insert(oid::FLOAT8, false);
    m.insert(oid::UNKNOWN, true);
    m.insert(oid::BPCHAR, false);
    m.insert(oid::VARCHAR, false);
    m.insert(oid::DATE, false);
    m.insert(oid::TIME, false);
    m.insert(oid::TIMESTAMP, false);
    m.insert(oid::TIMETZ, false);
    m.insert(oid::INTERVAL, false);
    m.insert(oid::NUMERIC, false);
    m
});

/// True when the oid denotes a character-string type. Array values of these
/// are decoded as plain text, never split element-wise.
pub fn is_character_type(type_id: u32) -> bool {
    matches!(
        type_id,
        oid::CHAR | oid::NAME | oid::TEXT | oid::BPCHAR | oid::VARCHAR
    )
}

/// Declared length of a field, derived from size and type modifier the way
/// the calling convention defines it: character types report their modifier
/// minus the value header, everything else its storage size.
pub fn declared_length(type_id: u32, size: i32, modifier: i32) -> i64 {
    if is_character_type(type_id) && modifier >= VAR_HEADER_SIZE {
        (modifier - VAR_HEADER_SIZE) as i64
    } else {
        size as i64
    }
}

/// Precision encoded in a numeric type modifier, 0 when absent.
pub fn numeric_precision(type_id: u32, modifier: i32) -> i64 {
    if type_id == oid::NUMERIC && modifier >= VAR_HEADER_SIZE {
        (((modifier - VAR_HEADER_SIZE) >> 16) & 0xffff) as i64
    } else {
        0
    }
}

/// Scale encoded in a numeric type modifier, 0 when absent.
pub fn numeric_scale(type_id: u32, modifier: i32) -> i64 {
    if type_id == oid::NUMERIC && modifier >= VAR_HEADER_SIZE {
        ((modifier - VAR_HEADER_SIZE) & 0xffff) as i64
    } else {
        0
    }
}

/// Portable dynamic type tag reported by descriptors.
///
/// Unrecognized server identifiers are preserved rather than rejected, so a
/// caller can still branch on the raw oid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynType {
    Character,
    CharacterVarying,
    Numeric,
    Integer,
    Smallint,
    Bigint,
    Real,
    DoublePrecision,
    Boolean,
    DateTime,
    Interval,
    Unknown(u32),
}

impl DynType {
    pub fn from_type_id(type_id: u32) -> DynType {
        match type_id {
            oid::CHAR | oid::BPCHAR => DynType::Character,
            oid::VARCHAR | oid::TEXT | oid::NAME => DynType::CharacterVarying,
            oid::NUMERIC => DynType::Numeric,
            oid::INT4 | oid::OID => DynType::Integer,
            oid::INT2 => DynType::Smallint,
            oid::INT8 => DynType::Bigint,
            oid::FLOAT4 => DynType::Real,
            oid::FLOAT8 => DynType::DoublePrecision,
            oid::BOOL => DynType::Boolean,
            oid::DATE | oid::TIME | oid::TIMESTAMP | oid::TIMETZ => DynType::DateTime,
            oid::INTERVAL => DynType::Interval,
            other => DynType::Unknown(other),
        }
    }

    /// Numeric tag the legacy convention hands to applications. Unknown
    /// types report the negated server identifier, preserving the original.
    pub fn code(&self) -> i64 {
        match self {
            DynType::Character => 1,
            DynType::CharacterVarying => 12,
            DynType::Numeric => 2,
            DynType::Integer => 4,
            DynType::Smallint => 5,
            DynType::Bigint => 25,
            DynType::Real => 7,
            DynType::DoublePrecision => 8,
            DynType::Boolean => 16,
            DynType::DateTime => 9,
            DynType::Interval => 10,
            DynType::Unknown(type_id) => -(*type_id as i64),
        }
    }
}
