//! bf-results: CSV-in-XML result sets and the file-backed store that caches them.

pub mod csv;
pub mod store;
pub mod types;
mod xml;

pub use store::{ReadOnly, ResultStore, SimulationStamp, Writable};
pub use types::*;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed results document {path}: {reason}")]
    Malformed { path: String, reason: String },

    #[error("Result set key has no `name` attribute")]
    MissingName,

    #[error("Attribute `{attribute}` is reserved and cannot be part of a result set key")]
    ReservedAttribute { attribute: String },

    #[error("Invalid key attribute {attribute:?}: {reason}")]
    InvalidAttribute { attribute: String, reason: String },

    #[error("Invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("Columns [{found}] do not match header [{expected}] of result set `{set}`")]
    SchemaMismatch {
        set: String,
        expected: String,
        found: String,
    },

    #[error("Invalid value for column `{column}`: {value:?} ({reason})")]
    InvalidValue {
        column: String,
        value: String,
        reason: String,
    },

    #[error("Result set `{set}` has no column `{column}`")]
    UnknownColumn { set: String, column: String },

    #[error("No record with {column} = {value} in result set `{set}` ({store})")]
    RecordNotFound {
        store: String,
        set: String,
        column: String,
        value: String,
    },
}
