use jni::objects::{GlobalRef, JCharArray, JObject, JValue};
use jni::sys::{jint, jsize};
use jni::{JNIEnv, JavaVM};

use reader_error::{ReaderError, Result};

use super::{jni_error, take_exception};
use crate::backend::ReaderBackend;
use crate::handle::{Handle, ReadOutcome, END_OF_STREAM};

/// Java `char[]` reused across reads, with its length.
struct TransferArray {
    array: GlobalRef,
    len: usize,
}

/// Character backend calling into a `java.io.Reader` instance.
///
/// Holds a global reference so the Java object outlives any local frame,
/// and attaches the calling thread to the JVM for each call. Units travel
/// through one `char[]` kept across calls, regrown only when a larger
/// request arrives.
pub struct JavaReaderBackend {
    handle: Handle,
    vm: JavaVM,
    reader: GlobalRef,
    transfer: Option<TransferArray>,
}

impl JavaReaderBackend {
    pub fn new(env: &mut JNIEnv, reader: &JObject) -> Result<Self> {
        if reader.is_null() {
            return Err(ReaderError::Foreign("java reader is null".to_owned()));
        }
        let vm = env.get_java_vm().map_err(jni_error)?;
        let reader = env.new_global_ref(reader).map_err(jni_error)?;
        let handle = Handle::new(reader.as_obj().as_raw() as usize as u64);
        Ok(Self {
            handle,
            vm,
            reader,
            transfer: None,
        })
    }
}

/// Whether a transfer array of `current` length cannot serve `wanted` units.
fn needs_regrow(current: Option<usize>, wanted: usize) -> bool {
    current.map_or(true, |len| len < wanted)
}

/// Interpret the value returned by `Reader.read(char[], int, int)`.
fn decode_count(count: jint, requested: usize) -> Option<ReadOutcome> {
    if count == END_OF_STREAM {
        return Some(ReadOutcome::EndOfStream);
    }
    usize::try_from(count)
        .ok()
        .filter(|n| *n <= requested)
        .map(ReadOutcome::Count)
}

fn transfer_array<'a>(
    env: &mut JNIEnv,
    slot: &'a mut Option<TransferArray>,
    wanted: usize,
) -> Result<&'a GlobalRef> {
    if needs_regrow(slot.as_ref().map(|transfer| transfer.len), wanted) {
        let len = jsize::try_from(wanted).unwrap_or(jsize::MAX);
        let local = env.new_char_array(len).map_err(jni_error)?;
        let array = env.new_global_ref(&local).map_err(jni_error)?;
        env.delete_local_ref(local).map_err(jni_error)?;
        *slot = Some(TransferArray {
            array,
            len: len as usize,
        });
    }
    slot.as_ref()
        .map(|transfer| &transfer.array)
        .ok_or_else(|| ReaderError::Foreign("transfer array missing".to_owned()))
}

impl ReaderBackend for JavaReaderBackend {
    type Unit = u16;

    fn handle(&self) -> Handle {
        self.handle
    }

    fn read(&mut self, buf: &mut [u16]) -> Result<ReadOutcome> {
        let mut env = self.vm.attach_current_thread().map_err(jni_error)?;
        let length = jsize::try_from(buf.len()).unwrap_or(jsize::MAX);
        let array = transfer_array(&mut env, &mut self.transfer, length as usize)?;

        let result = env
            .call_method(
                self.reader.as_obj(),
                "read",
                "([CII)I",
                &[
                    JValue::Object(array.as_obj()),
                    JValue::Int(0),
                    JValue::Int(length),
                ],
            )
            .and_then(|value| value.i());
        let count = match result {
            Ok(count) => count,
            Err(jni::errors::Error::JavaException) => {
                return Err(take_exception(&mut env))
            }
            Err(err) => return Err(jni_error(err)),
        };

        let outcome = decode_count(count, length as usize).ok_or_else(|| {
            ReaderError::Foreign(format!(
                "java reader {} returned {} for a request of {}",
                self.handle, count, length
            ))
        })?;
        if let ReadOutcome::Count(n) = outcome {
            let chars: &JCharArray = array.as_obj().into();
            env.get_char_array_region(chars, 0, &mut buf[..n])
                .map_err(jni_error)?;
        }
        Ok(outcome)
    }

    fn release(&mut self) -> Result<()> {
        let mut env = self.vm.attach_current_thread().map_err(jni_error)?;
        match env.call_method(self.reader.as_obj(), "close", "()V", &[]) {
            Ok(_) => Ok(()),
            Err(jni::errors::Error::JavaException) => {
                Err(take_exception(&mut env))
            }
            Err(err) => Err(jni_error(err)),
        }
    }
}
