use reader_error::{ReaderError, Result};

use crate::backend::ReaderBackend;
use crate::handle::{Handle, ReadOutcome, END_OF_STREAM};

/// Status returned by [`RawReaderVTable::close`] on success.
pub const RAW_OK: i32 = 0;
/// Generic failure status for both table entries.
pub const RAW_ERROR: i32 = -2;

/// C ABI capability table of a foreign byte reader.
///
/// `read` fills at most `len` bytes at `buf` and returns the count,
/// [`END_OF_STREAM`] once the source is exhausted, or any other negative
/// value on failure. `close` returns [`RAW_OK`] on success.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawReaderVTable {
    pub read: unsafe extern "C" fn(handle: u64, buf: *mut u8, len: usize) -> i64,
    pub close: unsafe extern "C" fn(handle: u64) -> i32,
}

/// Backend for readers implemented in C or any runtime exposing a C ABI.
#[derive(Debug)]
pub struct RawBackend {
    handle: Handle,
    vtable: RawReaderVTable,
}

impl RawBackend {
    /// # Safety
    ///
    /// `handle` must be valid for both functions of `vtable` until
    /// `close` has been called through it, and must not be read or
    /// closed by anyone else meanwhile.
    pub unsafe fn new(handle: Handle, vtable: RawReaderVTable) -> Self {
        Self { handle, vtable }
    }
}

impl ReaderBackend for RawBackend {
    type Unit = u8;

    fn handle(&self) -> Handle {
        self.handle
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
        // Safety: `new` requires the handle to be live until closed, and
        // the wrapper never reads after release.
        let status = unsafe {
            (self.vtable.read)(self.handle.raw(), buf.as_mut_ptr(), buf.len())
        };
        match status {
            n if n == i64::from(END_OF_STREAM) => Ok(ReadOutcome::EndOfStream),
            n if n < 0 => Err(ReaderError::Foreign(format!(
                "read on handle {} failed with status {}",
                self.handle, n
            ))),
            n => usize::try_from(n)
                .map(ReadOutcome::Count)
                .map_err(|_| {
                    ReaderError::Foreign(format!(
                        "read on handle {} returned {}",
                        self.handle, n
                    ))
                }),
        }
    }

    fn release(&mut self) -> Result<()> {
        // Safety: see `read`; release is reached at most once.
        let status = unsafe { (self.vtable.close)(self.handle.raw()) };
        if status == RAW_OK {
            Ok(())
        } else {
            Err(ReaderError::Foreign(format!(
                "close on handle {} failed with status {}",
                self.handle, status
            )))
        }
    }
}
