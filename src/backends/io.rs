use std::io::{self, Read};
use std::process::{Child, ChildStdout};

use reader_error::{ReaderError, Result};

use crate::backend::ReaderBackend;
use crate::handle::{Handle, ReadOutcome};

type ReleaseHook = Box<dyn FnOnce() -> io::Result<()> + Send>;

/// Byte backend over any [`std::io::Read`].
///
/// Typical sources are pipes to another process, whose reader really
/// does live in a different runtime, or plain files. Releasing drops
/// the inner reader and then runs the release hook, if any.
pub struct IoBackend<R> {
    handle: Handle,
    inner: Option<R>,
    on_release: Option<ReleaseHook>,
}

impl<R: Read> IoBackend<R> {
    pub fn new(inner: R) -> Self {
        Self::with_handle(Handle::allocate(), inner)
    }

    pub fn with_handle(handle: Handle, inner: R) -> Self {
        Self {
            handle,
            inner: Some(inner),
            on_release: None,
        }
    }

    /// Run `hook` once the inner reader has been dropped.
    pub fn on_release<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() -> io::Result<()> + Send + 'static,
    {
        self.on_release = Some(Box::new(hook));
        self
    }
}

impl IoBackend<ChildStdout> {
    /// Read the standard output of a child process.
    ///
    /// Releasing reaps the child, killing it first if it is still
    /// running.
    pub fn from_child(mut child: Child) -> Result<Self> {
        let stdout = child.stdout.take().ok_or_else(|| {
            ReaderError::Foreign(format!(
                "child process {} has no piped stdout",
                child.id()
            ))
        })?;
        let handle = Handle::new(u64::from(child.id()));

        Ok(Self::with_handle(handle, stdout).on_release(move || {
            if child.try_wait()?.is_none() {
                log::debug!("child process {} still running, killing", child.id());
                child.kill()?;
            }
            child.wait().map(|_| ())
        }))
    }
}

impl<R: Read> ReaderBackend for IoBackend<R> {
    type Unit = u8;

    fn handle(&self) -> Handle {
        self.handle
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
        let inner = self.inner.as_mut().ok_or_else(|| {
            ReaderError::Foreign(format!(
                "handle {} already released",
                self.handle
            ))
        })?;
        loop {
            match inner.read(buf) {
                Ok(0) => return Ok(ReadOutcome::EndOfStream),
                Ok(n) => return Ok(ReadOutcome::Count(n)),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {
                    continue
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn release(&mut self) -> Result<()> {
        drop(self.inner.take());
        match self.on_release.take() {
            Some(hook) => Ok(hook()?),
            None => Ok(()),
        }
    }
}
