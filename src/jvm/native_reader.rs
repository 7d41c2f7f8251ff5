//! Native methods of the Java class `NativeReader`.
//!
//! The Java side keeps the value returned by `openFile` or `wrap` in a
//! `long` field and passes it back to every call. `dispose` frees it.
//!
//! ```java
//! final class NativeReader {
//!     static native long openFile(String path) throws IOException;
//!     static native long wrap(java.io.Reader reader);
//!     static native int read(long handle, byte[] buf, int off, int len) throws IOException;
//!     static native int readChars(long handle, char[] buf, int off, int len) throws IOException;
//!     static native void close(long handle) throws IOException;
//!     static native void dispose(long handle);
//! }
//! ```

use std::fs::File;
use std::num::NonZeroUsize;

use jni::objects::{JByteArray, JCharArray, JClass, JObject, JString};
use jni::sys::{jbyte, jint, jlong, jsize};
use jni::JNIEnv;

use reader_error::{ErrorKind, ReaderError, Result};

use super::{jni_error, JavaReaderBackend};
use crate::backend::{DynByteBackend, ReaderBackend};
use crate::backends::IoBackend;
use crate::handle::{ReadOutcome, END_OF_STREAM};
use crate::options::ReaderOptions;
use crate::reader::{check_span, ExternalHandleReader};

/// Cap on units moved per native call, bounding the staging buffer.
const NATIVE_MAX_REQUEST: NonZeroUsize = match NonZeroUsize::new(8 * 1024) {
    Some(max) => max,
    None => panic!("native request cap must be positive"),
};

fn native_options(label: impl Into<String>) -> ReaderOptions {
    ReaderOptions::new(label).with_max_request(NATIVE_MAX_REQUEST)
}

/// Reader plus the staging buffer reused by every native read.
pub struct StagedReader<B: ReaderBackend> {
    reader: ExternalHandleReader<B>,
    staging: Vec<B::Unit>,
}

impl<B: ReaderBackend> StagedReader<B> {
    pub fn new(reader: ExternalHandleReader<B>) -> Self {
        Self {
            reader,
            staging: Vec::new(),
        }
    }

    /// Serve a Java-side `read(buf, off, len)`.
    ///
    /// `capacity` yields the Java array length and is consulted only once
    /// the reader is known to be open. Produced units go to `copy_out`
    /// together with the array offset to write them at. Returns the count,
    /// or [`END_OF_STREAM`].
    fn read_with<C, F>(
        &mut self,
        offset: jint,
        length: jint,
        capacity: C,
        copy_out: F,
    ) -> Result<jint>
    where
        C: FnOnce() -> Result<jsize>,
        F: FnOnce(usize, &[B::Unit]) -> Result<()>,
    {
        self.reader.ensure_open()?;
        let (offset, length) = java_span(offset, length, capacity()?)?;

        let request = self.reader.options().clamp(length);
        if self.staging.len() < request {
            self.staging.resize(request, B::Unit::default());
        }
        let outcome = self.reader.read(&mut self.staging, 0, request)?;
        if let ReadOutcome::Count(n) = outcome {
            copy_out(offset, &self.staging[..n])?;
        }
        Ok(outcome.into_raw())
    }

    fn close(&mut self) -> Result<()> {
        self.reader.close()
    }
}

/// Rust reader owned by a Java `NativeReader` through a raw pointer.
pub enum NativeReader {
    Bytes(StagedReader<DynByteBackend>),
    Chars(StagedReader<JavaReaderBackend>),
}

impl NativeReader {
    fn into_jlong(self) -> jlong {
        Box::into_raw(Box::new(self)) as jlong
    }

    fn from_jlong<'a>(value: jlong) -> Result<&'a mut Self> {
        if value == 0 {
            return Err(ReaderError::Closed("<null>".to_owned()));
        }
        Ok(unsafe { &mut *(value as *mut NativeReader) })
    }

    fn close(&mut self) -> Result<()> {
        match self {
            Self::Bytes(staged) => staged.close(),
            Self::Chars(staged) => staged.close(),
        }
    }
}

fn to_jbytes(units: &[u8]) -> Vec<jbyte> {
    units.iter().map(|byte| *byte as jbyte).collect()
}

fn throw(env: &mut JNIEnv, err: &ReaderError) {
    let class = match err.kind() {
        ErrorKind::IoFailure => "java/io/IOException",
        ErrorKind::InvalidState => "java/lang/IllegalStateException",
        ErrorKind::InvalidArgument => "java/lang/IndexOutOfBoundsException",
    };
    throw_class(env, class, &err.to_string());
}

fn throw_class(env: &mut JNIEnv, class: &str, message: &str) {
    if let Err(err) = env.throw_new(class, message) {
        log::error!("failed to throw {}: {}", class, err);
    }
}

/// Validate a Java-side `(off, len)` pair against an array length.
fn java_span(offset: jint, length: jint, capacity: jsize) -> Result<(usize, usize)> {
    match (
        usize::try_from(offset),
        usize::try_from(length),
        usize::try_from(capacity),
    ) {
        (Ok(offset), Ok(length), Ok(capacity)) => {
            check_span(offset, length, capacity)?;
            Ok((offset, length))
        }
        _ => Err(ReaderError::OutOfBounds {
            offset: offset.max(0) as usize,
            length: length.max(0) as usize,
            capacity: capacity.max(0) as usize,
        }),
    }
}

#[no_mangle]
pub extern "system" fn Java_NativeReader_openFile<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    path: JString<'local>,
) -> jlong {
    let path: String = match env.get_string(&path) {
        Ok(path) => path.into(),
        Err(err) => {
            throw(&mut env, &jni_error(err));
            return 0;
        }
    };

    match File::open(&path) {
        Ok(file) => {
            let backend: DynByteBackend = Box::new(IoBackend::new(file));
            let reader =
                ExternalHandleReader::with_options(native_options(path), backend);
            NativeReader::Bytes(StagedReader::new(reader)).into_jlong()
        }
        Err(err) => {
            throw(&mut env, &ReaderError::Io(err));
            0
        }
    }
}

#[no_mangle]
pub extern "system" fn Java_NativeReader_wrap<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    reader: JObject<'local>,
) -> jlong {
    match JavaReaderBackend::new(&mut env, &reader) {
        Ok(backend) => {
            let reader =
                ExternalHandleReader::with_options(native_options("java"), backend);
            NativeReader::Chars(StagedReader::new(reader)).into_jlong()
        }
        Err(err) => {
            throw(&mut env, &err);
            0
        }
    }
}

fn read_bytes(
    env: &mut JNIEnv,
    handle: jlong,
    buf: &JByteArray,
    offset: jint,
    length: jint,
) -> Result<jint> {
    let NativeReader::Bytes(staged) = NativeReader::from_jlong(handle)? else {
        return Err(ReaderError::Foreign(
            "handle refers to a character reader".to_owned(),
        ));
    };
    let env: &JNIEnv = env;
    staged.read_with(
        offset,
        length,
        || env.get_array_length(buf).map_err(jni_error),
        |at, units| {
            env.set_byte_array_region(buf, at as jsize, &to_jbytes(units))
                .map_err(jni_error)
        },
    )
}

#[no_mangle]
pub extern "system" fn Java_NativeReader_read<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    handle: jlong,
    buf: JByteArray<'local>,
    offset: jint,
    length: jint,
) -> jint {
    read_bytes(&mut env, handle, &buf, offset, length).unwrap_or_else(|err| {
        throw(&mut env, &err);
        END_OF_STREAM
    })
}

fn read_chars(
    env: &mut JNIEnv,
    handle: jlong,
    buf: &JCharArray,
    offset: jint,
    length: jint,
) -> Result<jint> {
    let NativeReader::Chars(staged) = NativeReader::from_jlong(handle)? else {
        return Err(ReaderError::Foreign(
            "handle refers to a byte reader".to_owned(),
        ));
    };
    let env: &JNIEnv = env;
    staged.read_with(
        offset,
        length,
        || env.get_array_length(buf).map_err(jni_error),
        |at, units| {
            env.set_char_array_region(buf, at as jsize, units)
                .map_err(jni_error)
        },
    )
}

#[no_mangle]
pub extern "system" fn Java_NativeReader_readChars<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    handle: jlong,
    buf: JCharArray<'local>,
    offset: jint,
    length: jint,
) -> jint {
    read_chars(&mut env, handle, &buf, offset, length).unwrap_or_else(|err| {
        throw(&mut env, &err);
        END_OF_STREAM
    })
}

#[no_mangle]
pub extern "system" fn Java_NativeReader_close<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    handle: jlong,
) {
    if handle == 0 {
        return;
    }
    let result =
        NativeReader::from_jlong(handle).and_then(|reader| reader.close());
    if let Err(err) = result {
        throw(&mut env, &err);
    }
}

/// Safety: the `NativeReader` is dropped after this call and `handle`
/// must not be used again.
#[no_mangle]
pub extern "system" fn Java_NativeReader_dispose<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
    handle: jlong,
) {
    if handle == 0 {
        return;
    }
    let reader = unsafe { Box::from_raw(handle as *mut NativeReader) };
    drop(reader);
}
