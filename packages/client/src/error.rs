//! Error types for the client layer.
//!
//! Each layer has its own enum; [`Error`] composes them for the
//! [`Client`](crate::Client) operations.

use std::path::PathBuf;

use tinydconf_variant::{ParseError, VariantType};

/// Errors from decoding a variant into a [`Value`](crate::Value).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The value (or one nested in it) has a tag with no host mapping:
    /// boxed variants, maybes and dictionary entries.
    #[error("unsupported type '{ty}'")]
    UnsupportedType { ty: VariantType },

    /// Storage for a container's children could not be reserved.
    #[error("cannot allocate storage for {len} children")]
    AllocationFailure { len: usize },

    /// A node reported more children than it could produce.
    #[error("child {index} of {len} is missing")]
    MissingChild { index: usize, len: usize },
}

/// Errors from a configuration backend.
///
/// These are passed through the client unchanged.
#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    /// I/O, IPC or connection failure.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The configuration store cannot be reached at all.
    #[error("backend unavailable: {reason}")]
    Unavailable { reason: String },
}

impl BackendError {
    /// Wrap any error as a transport failure.
    pub fn transport(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        BackendError::Transport(error.into())
    }
}

/// Errors related to dconf path validation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("empty path")]
    Empty,

    /// Paths must start with `/`.
    #[error("path '{path}' does not start with '/'")]
    NotAbsolute { path: String },

    #[error("path '{path}' contains '//' at offset {offset}")]
    DoubleSlash { path: String, offset: usize },

    /// A directory path was required; those end with `/`.
    #[error("'{path}' is not a directory path")]
    NotADirectory { path: String },

    /// A key path was required; those do not end with `/`.
    #[error("'{path}' is not a key path")]
    NotAKey { path: String },

    #[error("invalid path component '{component}': {message}")]
    InvalidComponent { component: String, message: String },
}

/// Errors from loading a dconf keyfile.
#[derive(thiserror::Error, Debug)]
pub enum KeyfileError {
    #[error("cannot read keyfile {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// A value failed to parse as GVariant text.
    #[error("line {line}: invalid value for key '{key}': {source}")]
    Value {
        line: usize,
        key: String,
        #[source]
        source: ParseError,
    },
}

/// Errors from [`Client`](crate::Client) operations.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("path error: {0}")]
    Path(#[from] PathError),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}

impl Error {
    /// Check if this is the distinguished "unsupported type" failure.
    pub fn is_type_error(&self) -> bool {
        matches!(self, Error::Decode(DecodeError::UnsupportedType { .. }))
    }
}
