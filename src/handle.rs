use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Raw value used across foreign boundaries to signal end-of-stream.
pub const END_OF_STREAM: i32 = -1;

static NEXT_LOCAL: AtomicU64 = AtomicU64::new(1);

/// Opaque token naming a reader resource owned by a foreign runtime.
///
/// The value is never interpreted on this side; it is only passed back
/// to the backend that issued it and printed in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u64);

impl Handle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Fresh token for resources that carry no identifier of their own.
    pub fn allocate() -> Self {
        Self(NEXT_LOCAL.fetch_add(1, Ordering::Relaxed))
    }
}

impl From<u64> for Handle {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Result of a single successful read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Number of units written into the buffer.
    Count(usize),
    /// No more data will ever be produced.
    EndOfStream,
}

impl ReadOutcome {
    pub fn is_end_of_stream(self) -> bool {
        matches!(self, Self::EndOfStream)
    }

    /// Units produced, with end-of-stream counted as zero.
    pub fn count(self) -> usize {
        match self {
            Self::Count(n) => n,
            Self::EndOfStream => 0,
        }
    }

    /// Encoding used by JNI and C callers: the count, or [`END_OF_STREAM`].
    pub fn into_raw(self) -> i32 {
        match self {
            Self::Count(n) => i32::try_from(n).unwrap_or(i32::MAX),
            Self::EndOfStream => END_OF_STREAM,
        }
    }
}
