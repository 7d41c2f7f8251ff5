use std::sync::{Arc, Mutex, MutexGuard};

use reader_error::{ReaderError, Result};

use crate::backend::ReaderBackend;
use crate::handle::ReadOutcome;
use crate::reader::ExternalHandleReader;

/// Cloneable, thread-safe handle to one [`ExternalHandleReader`].
///
/// Every operation holds the reader's lock for the duration of the
/// foreign call, so calls on the same foreign handle never overlap.
pub struct SharedReader<B: ReaderBackend> {
    label: String,
    inner: Arc<Mutex<ExternalHandleReader<B>>>,
}

impl<B: ReaderBackend> Clone for SharedReader<B> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: ReaderBackend> SharedReader<B> {
    pub fn new(reader: ExternalHandleReader<B>) -> Self {
        Self {
            label: reader.label().to_owned(),
            inner: Arc::new(Mutex::new(reader)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, ExternalHandleReader<B>>> {
        self.inner
            .lock()
            .map_err(|_| ReaderError::Poisoned(self.label.clone()))
    }

    pub fn read(
        &self,
        buf: &mut [B::Unit],
        offset: usize,
        length: usize,
    ) -> Result<ReadOutcome> {
        self.lock()?.read(buf, offset, length)
    }

    pub fn read_into(&self, buf: &mut [B::Unit]) -> Result<ReadOutcome> {
        self.lock()?.read_into(buf)
    }

    pub fn close(&self) -> Result<()> {
        self.lock()?.close()
    }

    pub fn is_closed(&self) -> Result<bool> {
        Ok(self.lock()?.is_closed())
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use reader_error::ErrorKind;

    use super::*;
    use crate::backends::MemoryBackend;

    #[test]
    fn threads_observe_every_unit_once() {
        let data: Vec<u8> = (0..=255).cycle().take(4096).collect();
        let backend = MemoryBackend::new(1, data.clone()).with_chunk_limit(7);
        let releases = backend.release_counter();
        let shared =
            SharedReader::new(ExternalHandleReader::new("shared", backend));

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    let mut buf = [0u8; 16];
                    while let ReadOutcome::Count(n) =
                        shared.read_into(&mut buf).unwrap()
                    {
                        seen.extend_from_slice(&buf[..n]);
                    }
                    seen
                })
            })
            .collect();

        let total: usize = workers
            .into_iter()
            .map(|worker| worker.join().unwrap().len())
            .sum();
        assert_eq!(total, data.len());

        shared.close().unwrap();
        shared.close().unwrap();
        assert_eq!(releases.get(), 1);
        assert!(shared.is_closed().unwrap());
    }

    #[test]
    fn poisoned_lock_is_invalid_state() {
        let backend = MemoryBackend::new(1, b"hello".to_vec());
        let shared =
            SharedReader::new(ExternalHandleReader::new("poison", backend));

        let poisoner = shared.clone();
        let _ = thread::spawn(move || {
            let _guard = poisoner.inner.lock().unwrap();
            panic!("poisoning the lock");
        })
        .join();

        let err = shared.read_into(&mut [0u8; 4]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }
}
