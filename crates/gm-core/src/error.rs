//! Error types for gm-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in gm-core
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File extension is not a spreadsheet format we can decode
    #[error("unsupported file format for '{name}'")]
    UnsupportedFormat { name: String },

    /// Spreadsheet decoding failed
    #[error("failed to decode '{name}': {message}")]
    Decode { name: String, message: String },

    /// CSV parsing error from the csv crate
    #[error("CSV error in '{name}': {source}")]
    Csv {
        name: String,
        #[source]
        source: csv::Error,
    },

    /// Workbook encoding failed
    #[error("failed to write workbook '{path}': {message}")]
    Encode { path: PathBuf, message: String },

    /// Directory traversal error
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// No file with this id is loaded
    #[error("no loaded file with id '{0}'")]
    FileNotFound(String),

    /// The file has no sheet with this name
    #[error("file '{file}' has no sheet named '{sheet}'")]
    SheetNotFound { file: String, sheet: String },

    /// A grid bundle could not be retrieved during a merge
    #[error("grid bundle for '{file}' is unavailable: {message}")]
    GridUnavailable { file: String, message: String },

    /// Merge was requested with no files loaded
    #[error("no files loaded")]
    NoFiles,

    /// Merge produced zero data rows
    #[error("merge result is empty; check the header row and data start row of each sheet")]
    EmptyResult,

    /// Unexpected failure inside the merge
    #[error("merge failed; make sure the sheets share a consistent structure and the row numbers are correct")]
    MergeFailed(#[source] Box<Error>),

    /// Export requested before any successful merge
    #[error("no merge result to export")]
    NoResult,

    /// Unknown export format name
    #[error("unknown export format '{0}' (expected xlsx, csv or json)")]
    UnknownFormat(String),

    /// A caller passed a missing or malformed argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
