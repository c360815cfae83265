//! Error handling primitives shared across the crate.
//!
//! Every failure surfaces as an [`EvalError`]; each kind maps onto a stable
//! [`ErrorCode`] which the command line front-end uses as its exit status.

use std::path::PathBuf;

use thiserror::Error;

/// Stable error codes, used as process exit status. Zero is left to success.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorCode {
    /// Caller passed an unsupported unit, cutoff or column.
    InvalidArgument = 1,
    /// Requested qualifier is not known to the model.
    NotFound = 2,
    /// A summary was built from zero evaluations.
    DivisionByZero = 3,
    /// Filesystem failure while reading or writing.
    Io = 4,
    /// Input could not be decoded into evaluation records.
    Decode = 5,
    /// Statistics could not be serialized.
    Encode = 6,
}

/// Canonical error type for the crate.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("qualifier {qualifier} not found, must be one of [{valid}]")]
    NotFound { qualifier: String, valid: String },

    #[error("division by zero: {0}")]
    DivisionByZero(&'static str),

    #[error("io error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode json: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result alias used throughout the crate.
pub type EvalResult<T> = Result<T, EvalError>;

impl EvalError {
    /// Validation helper.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Unknown qualifier; `valid` is rendered into the message as-is.
    pub fn qualifier_not_found<'a, I>(qualifier: &str, valid: I) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        let valid = valid
            .into_iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        Self::NotFound {
            qualifier: qualifier.to_string(),
            valid,
        }
    }

    /// IO helper carrying the offending path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Decode helper carrying the offending path.
    pub fn decode(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Decode {
            path: path.into(),
            source,
        }
    }

    /// Machine parsable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::DivisionByZero(_) => ErrorCode::DivisionByZero,
            Self::Io { .. } | Self::Csv(_) => ErrorCode::Io,
            Self::Decode { .. } => ErrorCode::Decode,
            Self::Encode(_) => ErrorCode::Encode,
        }
    }
}
