use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use reader_error::{ReaderError, Result};

use crate::backend::ReaderBackend;
use crate::handle::{Handle, ReadOutcome};

/// Shared count of release calls made on a backend.
///
/// Stays readable after the backend itself has been dropped.
#[derive(Debug, Clone, Default)]
pub struct ReleaseCounter(Arc<AtomicUsize>);

impl ReleaseCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Backend serving units from memory, with scripted misbehaviour.
///
/// Stands in for a foreign reader in tests, and bridges data that
/// already crossed the boundary in one piece.
#[derive(Debug)]
pub struct MemoryBackend<U> {
    handle: Handle,
    data: Vec<U>,
    position: usize,
    chunk_limit: Option<usize>,
    fail_at: Option<usize>,
    fail_release: bool,
    released: bool,
    reads: usize,
    releases: ReleaseCounter,
}

impl<U: Copy + Default> MemoryBackend<U> {
    pub fn new(handle: u64, data: impl Into<Vec<U>>) -> Self {
        Self {
            handle: Handle::new(handle),
            data: data.into(),
            position: 0,
            chunk_limit: None,
            fail_at: None,
            fail_release: false,
            released: false,
            reads: 0,
            releases: ReleaseCounter::default(),
        }
    }

    /// Produce at most `limit` units per call.
    pub fn with_chunk_limit(mut self, limit: usize) -> Self {
        self.chunk_limit = Some(limit.max(1));
        self
    }

    /// Fail once when the cursor reaches `position`.
    pub fn failing_at(mut self, position: usize) -> Self {
        self.fail_at = Some(position);
        self
    }

    /// Report failure when released.
    pub fn failing_release(mut self) -> Self {
        self.fail_release = true;
        self
    }

    pub fn release_counter(&self) -> ReleaseCounter {
        self.releases.clone()
    }

    /// Number of read calls that reached this backend.
    pub fn reads(&self) -> usize {
        self.reads
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }
}

impl MemoryBackend<u16> {
    /// Character source holding the UTF-16 encoding of `text`.
    pub fn from_text(handle: u64, text: &str) -> Self {
        Self::new(handle, text.encode_utf16().collect::<Vec<u16>>())
    }
}

impl<U: Copy + Default> ReaderBackend for MemoryBackend<U> {
    type Unit = U;

    fn handle(&self) -> Handle {
        self.handle
    }

    fn read(&mut self, buf: &mut [U]) -> Result<ReadOutcome> {
        self.reads += 1;
        if self.released {
            return Err(ReaderError::Foreign(format!(
                "handle {} already released",
                self.handle
            )));
        }

        let mut available = self.remaining();
        if let Some(fail_at) = self.fail_at {
            if fail_at == self.position {
                self.fail_at = None;
                return Err(ReaderError::Foreign(format!(
                    "scripted failure at position {}",
                    fail_at
                )));
            }
            if fail_at > self.position {
                available = available.min(fail_at - self.position);
            }
        }
        if available == 0 {
            return Ok(ReadOutcome::EndOfStream);
        }

        let mut n = buf.len().min(available);
        if let Some(limit) = self.chunk_limit {
            n = n.min(limit);
        }
        buf[..n].copy_from_slice(&self.data[self.position..self.position + n]);
        self.position += n;
        Ok(ReadOutcome::Count(n))
    }

    fn release(&mut self) -> Result<()> {
        self.releases.bump();
        self.released = true;
        if self.fail_release {
            return Err(ReaderError::Foreign(format!(
                "scripted release failure for handle {}",
                self.handle
            )));
        }
        Ok(())
    }
}
