//! Error types for combat log parsing

use std::path::PathBuf;
use thiserror::Error;

/// Errors during combat log line parsing
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed line {line_number}: decoded {fields} fields, expected at least {needed}")]
    MalformedLine {
        line_number: u64,
        fields: usize,
        needed: usize,
    },

    #[error("invalid timestamp at line {line_number}: {value}")]
    InvalidTimestamp { line_number: u64, value: String },
}

/// Errors during log file reading operations
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("failed to open log file {path}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to memory map file {path}")]
    MemoryMap {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read file {path}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to seek in file {path}")]
    Seek {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
