use reader_error::Result;

use crate::handle::{Handle, ReadOutcome};

/// Capability table of a reader living on the other side of a foreign
/// boundary.
///
/// An [`ExternalHandleReader`](crate::ExternalHandleReader) owns exactly one
/// backend and guarantees that `read` is never called after `release`,
/// and that `release` is called at most once.
pub trait ReaderBackend {
    /// Element produced by the stream: `u8` for byte streams,
    /// `u16` for UTF-16 character streams.
    type Unit: Copy + Default;

    /// Token identifying the foreign resource, for diagnostics.
    fn handle(&self) -> Handle;

    /// Fill up to `buf.len()` units from the foreign reader.
    ///
    /// `buf` is never empty. Implementations return the number of units
    /// produced, or [`ReadOutcome::EndOfStream`] once the source is
    /// exhausted.
    fn read(&mut self, buf: &mut [Self::Unit]) -> Result<ReadOutcome>;

    /// Release the foreign resource.
    fn release(&mut self) -> Result<()>;
}

impl<B> ReaderBackend for Box<B>
where
    B: ReaderBackend + ?Sized,
{
    type Unit = B::Unit;

    fn handle(&self) -> Handle {
        (**self).handle()
    }

    fn read(&mut self, buf: &mut [Self::Unit]) -> Result<ReadOutcome> {
        (**self).read(buf)
    }

    fn release(&mut self) -> Result<()> {
        (**self).release()
    }
}

/// Type-erased byte backend, used where the concrete backend is chosen
/// at runtime.
pub type DynByteBackend = Box<dyn ReaderBackend<Unit = u8> + Send>;
