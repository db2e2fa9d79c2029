/// esql Error Module
///
/// This module defines the error taxonomy for the embedded-SQL runtime.
/// Every detectable failure is caught at the point of detection and turned
/// into one of these variants; nothing propagates as an unhandled fault.
/// Each variant also carries a legacy numeric status code (see `sqlcode`)
/// which the diagnostics record exposes to applications written against the
/// embedded-SQL calling convention.
use thiserror::Error;

/// Error type covering every failure the runtime can report.
///
/// The variants group into the taxonomy the calling convention defines:
/// - connection lookup and establishment
/// - statement shape (argument counts, array capacity)
/// - value format (strict text-to-host decoding)
/// - null handling, result shape, descriptor shape and the registry
/// - resource limits and a catch-all wrapping backend error text
#[derive(Error, Debug)]
pub enum EsqlError {
    /// Lookup of a connection name that is not in the session's set
    #[error("no such connection: {0}")]
    NoSuchConnection(String),

    /// The wire boundary refused to open a connection
    #[error("could not connect to database {target}: {reason}")]
    ConnectFailed { target: String, reason: String },

    /// An operation needs a current connection but none is established
    #[error("not connected")]
    NotConnected,

    /// More input variables than placeholder markers in the template
    #[error("too many arguments")]
    TooManyArguments,

    /// Placeholder markers (or result fields) left without a variable
    #[error("too few arguments")]
    TooFewArguments,

    /// The result has more rows than the output variable or its indicator
    /// can hold
    #[error("too many matches: {rows} rows do not fit into an array of {capacity}")]
    TooManyMatches { rows: usize, capacity: usize },

    /// A signed integer cell failed the strict full-consume parse
    #[error("not correctly formatted int type: {0}")]
    IntFormat(String),

    /// An unsigned integer cell failed the strict full-consume parse
    #[error("not correctly formatted unsigned type: {0}")]
    UintFormat(String),

    /// A floating-point cell failed the strict full-consume parse
    #[error("not correctly formatted floating-point type: {0}")]
    FloatFormat(String),

    /// A boolean cell was neither of the two truth tokens
    #[error("could not convert {0} to bool")]
    BoolFormat(String),

    /// A NULL cell arrived for an output variable with no indicator
    #[error("NULL value without indicator variable")]
    MissingIndicator,

    /// A tabular result came back with zero rows
    #[error("no data found")]
    NotFound,

    /// The query text was empty
    #[error("empty query")]
    EmptyQuery,

    /// Descriptor field index outside [1, field_count]
    #[error("descriptor index {0} out of range")]
    InvalidDescriptorIndex(i32),

    /// Descriptor item name the runtime does not know
    #[error("unknown descriptor item: {0}")]
    UnknownDescriptorItem(String),

    /// Lookup of a descriptor name that was never allocated
    #[error("descriptor {0} not found")]
    UnknownDescriptor(String),

    /// Prepared-statement name that is not in the registry
    #[error("invalid statement name: {0}")]
    InvalidStatementName(String),

    /// Buffer size arithmetic overflowed while allocating for the caller
    #[error("out of memory")]
    OutOfMemory,

    /// Starting or finishing a transaction failed
    #[error("error in transaction processing: {0}")]
    Transaction(String),

    /// Catch-all for errors the wire boundary reports during execution
    #[error("backend error: {0}")]
    Backend(String),

    /// A host variable kind the statement builder cannot marshal
    #[error("unsupported host variable type: {0}")]
    Unsupported(String),

    /// Configuration loading and validation errors
    #[error("configuration error: {0}")]
    Config(String),

    /// File system and I/O errors (configuration files, trace sinks)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EsqlError {
    /// Legacy numeric status code recorded in the diagnostics record.
    ///
    /// Positive 100 means "no data"; negative codes are faults. The values
    /// match the error-number table of the calling convention this runtime
    /// serves, so applications that switch on the code keep working.
    pub fn sqlcode(&self) -> i64 {
        match self {
            EsqlError::NotFound => 100,
            EsqlError::OutOfMemory => -12,
            EsqlError::Unsupported(_) => -200,
            EsqlError::TooManyArguments => -201,
            EsqlError::TooFewArguments => -202,
            EsqlError::TooManyMatches { .. } => -203,
            EsqlError::IntFormat(_) => -204,
            EsqlError::UintFormat(_) => -205,
            EsqlError::FloatFormat(_) => -206,
            EsqlError::BoolFormat(_) => -207,
            EsqlError::EmptyQuery => -208,
            EsqlError::MissingIndicator => -209,
            EsqlError::NoSuchConnection(_) => -220,
            EsqlError::NotConnected => -221,
            EsqlError::InvalidStatementName(_) => -230,
            EsqlError::UnknownDescriptor(_) => -240,
            EsqlError::InvalidDescriptorIndex(_) => -241,
            EsqlError::UnknownDescriptorItem(_) => -242,
            EsqlError::Backend(_) => -400,
            EsqlError::Transaction(_) => -401,
            EsqlError::ConnectFailed { .. } => -402,
            EsqlError::Config(_) | EsqlError::Io(_) => -100,
        }
    }
}

/// Type alias for Result to use EsqlError as the error type.
pub type Result<T> = std::result::Result<T, EsqlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EsqlError::NoSuchConnection("backup".to_string());
        assert!(err.to_string().contains("no such connection"));
        assert!(err.to_string().contains("backup"));

        let err = EsqlError::TooManyMatches {
            rows: 5,
            capacity: 3,
        };
        assert!(err.to_string().contains("5 rows"));
        assert!(err.to_string().contains("array of 3"));

        let err = EsqlError::IntFormat("12abc".to_string());
        assert!(err.to_string().contains("12abc"));
    }

    #[test]
    fn test_sqlcode_mapping() {
        assert_eq!(EsqlError::NotFound.sqlcode(), 100);
        assert_eq!(EsqlError::TooManyArguments.sqlcode(), -201);
        assert_eq!(EsqlError::TooFewArguments.sqlcode(), -202);
        assert_eq!(EsqlError::EmptyQuery.sqlcode(), -208);
        assert_eq!(
            EsqlError::ConnectFailed {
                target: "db".into(),
                reason: "refused".into()
            }
            .sqlcode(),
            -402
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: EsqlError = io_err.into();
        match err {
            EsqlError::Io(_) => {}
            _ => panic!("Expected IO error"),
        }
    }
}
