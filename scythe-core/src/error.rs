//! Error types shared by summary construction, serialization, and analysis.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SummaryError>;

/// Errors surfaced by the summary pipeline.
///
/// Structural errors in the binary format abort the current operation; a
/// partially accumulated index must be discarded by the caller. Lookups of
/// absent GUIDs are `Option`s, never errors.
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("malformed signature: not a module summary file")]
    MalformedSignature,

    #[error("truncated stream: {0}")]
    TruncatedStream(String),

    #[error("unknown record ID {0}")]
    UnknownRecord(u64),

    #[error("orphan record: {0}")]
    OrphanRecord(String),

    #[error("invalid {what} value {value}")]
    BadEnum { what: &'static str, value: u64 },

    #[error("index error: {0}")]
    Index(String),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SummaryError {
    /// Attach a path to a raw IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SummaryError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Construct a `TruncatedStream` error with a formatted message.
#[macro_export]
macro_rules! err_truncated {
    ($($arg:tt)*) => {
        $crate::error::SummaryError::TruncatedStream(format!($($arg)*))
    };
}

/// Return early with a `TruncatedStream` error.
#[macro_export]
macro_rules! bail_truncated {
    ($($arg:tt)*) => {
        return Err($crate::err_truncated!($($arg)*))
    };
}

/// Construct an `OrphanRecord` error with a formatted message.
#[macro_export]
macro_rules! err_orphan {
    ($($arg:tt)*) => {
        $crate::error::SummaryError::OrphanRecord(format!($($arg)*))
    };
}

/// Return early with an `OrphanRecord` error.
#[macro_export]
macro_rules! bail_orphan {
    ($($arg:tt)*) => {
        return Err($crate::err_orphan!($($arg)*))
    };
}

/// Construct an `Index` error with a formatted message.
#[macro_export]
macro_rules! err_index {
    ($($arg:tt)*) => {
        $crate::error::SummaryError::Index(format!($($arg)*))
    };
}

/// Return early with an `Index` error.
#[macro_export]
macro_rules! bail_index {
    ($($arg:tt)*) => {
        return Err($crate::err_index!($($arg)*))
    };
}
