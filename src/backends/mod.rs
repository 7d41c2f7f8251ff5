//! Built-in [`ReaderBackend`](crate::ReaderBackend) implementations.

mod io;
mod memory;
mod raw;

pub use self::io::IoBackend;
pub use self::memory::{MemoryBackend, ReleaseCounter};
pub use self::raw::{RawBackend, RawReaderVTable, RAW_ERROR, RAW_OK};
