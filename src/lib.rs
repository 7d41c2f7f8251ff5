//! Safe readers over streams implemented behind opaque foreign handles.
//!
//! An [`ExternalHandleReader`] owns one handle to a reader living in
//! another runtime (a C library, a child process, the JVM) and forwards
//! `read` and `close` to it through a [`ReaderBackend`], while enforcing
//! the lifecycle: reads only while open, release exactly once.

pub mod backend;
pub mod backends;
mod handle;
pub mod options;
mod reader;
pub mod shared;

#[cfg(feature = "jni-bindings")]
pub mod jvm;

pub use backend::{DynByteBackend, ReaderBackend};
pub use handle::{Handle, ReadOutcome, END_OF_STREAM};
pub use options::ReaderOptions;
pub use reader::ExternalHandleReader;
pub use shared::SharedReader;

pub use reader_error::{ErrorKind, ReaderError, Result};
