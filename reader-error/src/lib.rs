use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReaderError>;

/// Coarse classification of a [`ReaderError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The foreign side failed while reading or releasing.
    IoFailure,
    /// The reader is closed, or its lock is poisoned.
    InvalidState,
    /// The request does not fit the supplied buffer.
    InvalidArgument,
}

#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Foreign reader error: {0}")]
    Foreign(String),
    #[error("Reader {0} is closed")]
    Closed(String),
    #[error("Reader {0} is poisoned")]
    Poisoned(String),
    #[error(
        "Request out of bounds: offset {offset} + length {length} exceeds capacity {capacity}"
    )]
    OutOfBounds {
        offset: usize,
        length: usize,
        capacity: usize,
    },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReaderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) | Self::Foreign(_) | Self::Other(_) => {
                ErrorKind::IoFailure
            }
            Self::Closed(_) | Self::Poisoned(_) => ErrorKind::InvalidState,
            Self::OutOfBounds { .. } => ErrorKind::InvalidArgument,
        }
    }
}

impl From<ReaderError> for io::Error {
    fn from(err: ReaderError) -> Self {
        match err {
            ReaderError::Io(e) => e,
            ReaderError::OutOfBounds { .. } => {
                io::Error::new(io::ErrorKind::InvalidInput, err.to_string())
            }
            other => io::Error::new(io::ErrorKind::Other, other.to_string()),
        }
    }
}
