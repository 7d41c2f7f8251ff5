use std::io;

use reader_error::{ReaderError, Result};

use crate::backend::ReaderBackend;
use crate::handle::{Handle, ReadOutcome};
use crate::options::ReaderOptions;

/// Units requested per call by [`ExternalHandleReader::read_to_end`]
/// when no `max_request` is configured.
const DRAIN_CHUNK: usize = 8 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    Closed,
}

/// Reader over a stream whose implementation lives behind an opaque
/// foreign handle.
///
/// The reader owns the handle's lifetime, not the data: the backend is
/// released exactly once, either by [`close`](Self::close) or when the
/// reader goes out of scope.
pub struct ExternalHandleReader<B: ReaderBackend> {
    options: ReaderOptions,
    backend: B,
    state: State,
    exhausted: bool,
}

impl<B: ReaderBackend> ExternalHandleReader<B> {
    /// Wrap a backend with a diagnostic label. No I/O is performed.
    pub fn new(label: impl Into<String>, backend: B) -> Self {
        Self::with_options(ReaderOptions::new(label), backend)
    }

    pub fn with_options(options: ReaderOptions, backend: B) -> Self {
        log::debug!(
            "reader/{}: bound to handle {}",
            options.label,
            backend.handle()
        );
        Self {
            options,
            backend,
            state: State::Open,
            exhausted: false,
        }
    }

    pub fn handle(&self) -> Handle {
        self.backend.handle()
    }

    pub fn label(&self) -> &str {
        &self.options.label
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_closed(&self) -> bool {
        self.state == State::Closed
    }

    /// Whether the foreign side has already reported end-of-stream.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Fail with an invalid-state error if the reader has been closed.
    pub fn ensure_open(&self) -> Result<()> {
        match self.state {
            State::Open => Ok(()),
            State::Closed => Err(ReaderError::Closed(self.options.label.clone())),
        }
    }

    /// Fill up to `length` units of `buf`, starting at `offset`.
    ///
    /// Returns the number of units produced, which may be less than
    /// `length`, or [`ReadOutcome::EndOfStream`]. A zero-length request
    /// returns `Count(0)` without consulting the foreign side. Once the
    /// end of the stream has been seen, every later call reports it again.
    pub fn read(
        &mut self,
        buf: &mut [B::Unit],
        offset: usize,
        length: usize,
    ) -> Result<ReadOutcome> {
        self.ensure_open()?;
        check_span(offset, length, buf.len())?;

        if length == 0 {
            return Ok(ReadOutcome::Count(0));
        }
        if self.exhausted {
            return Ok(ReadOutcome::EndOfStream);
        }

        let request = self.options.clamp(length);
        let target = &mut buf[offset..offset + request];
        match self.backend.read(target) {
            Ok(ReadOutcome::Count(0)) => Err(ReaderError::Foreign(format!(
                "handle {} produced no data for a request of {} units",
                self.backend.handle(),
                request
            ))),
            Ok(ReadOutcome::Count(n)) if n > request => {
                Err(ReaderError::Foreign(format!(
                    "handle {} produced {} units for a request of {}",
                    self.backend.handle(),
                    n,
                    request
                )))
            }
            Ok(ReadOutcome::Count(n)) => {
                log::trace!(
                    "reader/{}: {} of {} units read",
                    self.options.label,
                    n,
                    length
                );
                Ok(ReadOutcome::Count(n))
            }
            Ok(ReadOutcome::EndOfStream) => {
                log::debug!("reader/{}: end of stream", self.options.label);
                self.exhausted = true;
                Ok(ReadOutcome::EndOfStream)
            }
            Err(err) => {
                log::warn!("reader/{}: read failed: {}", self.options.label, err);
                Err(err)
            }
        }
    }

    /// Fill as much of `buf` as one foreign call produces.
    pub fn read_into(&mut self, buf: &mut [B::Unit]) -> Result<ReadOutcome> {
        let length = buf.len();
        self.read(buf, 0, length)
    }

    /// Read until end-of-stream, appending to `out`.
    /// Returns the number of units appended.
    pub fn read_to_end(&mut self, out: &mut Vec<B::Unit>) -> Result<usize> {
        let chunk_len = self.options.clamp(DRAIN_CHUNK);
        let mut chunk = vec![B::Unit::default(); chunk_len];
        let mut total = 0;
        loop {
            match self.read(&mut chunk, 0, chunk_len)? {
                ReadOutcome::Count(n) => {
                    out.extend_from_slice(&chunk[..n]);
                    total += n;
                }
                ReadOutcome::EndOfStream => return Ok(total),
            }
        }
    }

    /// Release the foreign handle.
    ///
    /// Only the first call reaches the foreign side; later calls return
    /// `Ok(())`. The reader counts as closed even when the release
    /// itself reports an error.
    pub fn close(&mut self) -> Result<()> {
        if self.state == State::Closed {
            log::trace!("reader/{}: already closed", self.options.label);
            return Ok(());
        }
        self.state = State::Closed;

        log::debug!(
            "reader/{}: releasing handle {}",
            self.options.label,
            self.backend.handle()
        );
        self.backend.release().map_err(|err| {
            log::warn!(
                "reader/{}: release of handle {} failed: {}",
                self.options.label,
                self.backend.handle(),
                err
            );
            err
        })
    }
}

impl<B: ReaderBackend> Drop for ExternalHandleReader<B> {
    fn drop(&mut self) {
        if self.state == State::Open {
            log::debug!(
                "reader/{}: dropped while open, releasing",
                self.options.label
            );
            // The error has already been logged by `close`.
            let _ = self.close();
        }
    }
}

impl<B> io::Read for ExternalHandleReader<B>
where
    B: ReaderBackend<Unit = u8>,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let outcome = self.read_into(buf)?;
        Ok(outcome.count())
    }
}

/// Check that `offset..offset + length` lies within a buffer of
/// `capacity` units.
pub(crate) fn check_span(
    offset: usize,
    length: usize,
    capacity: usize,
) -> Result<()> {
    match offset.checked_add(length) {
        Some(end) if end <= capacity => Ok(()),
        _ => Err(ReaderError::OutOfBounds {
            offset,
            length,
            capacity,
        }),
    }
}
