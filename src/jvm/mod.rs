//! JVM interop over JNI.
//!
//! [`JavaReaderBackend`] lets Rust read from a `java.io.Reader`;
//! [`native_reader`] exports native methods through which a Java class
//! drives a Rust reader held behind a `long` handle.

mod java_reader;
pub mod native_reader;

pub use java_reader::JavaReaderBackend;

use jni::JNIEnv;
use jni::objects::JString;
use reader_error::ReaderError;

pub(crate) fn jni_error(err: jni::errors::Error) -> ReaderError {
    ReaderError::Foreign(format!("JNI: {}", err))
}

/// Clear the pending Java exception and turn it into an error carrying
/// the throwable's `toString()`.
pub(crate) fn take_exception(env: &mut JNIEnv) -> ReaderError {
    let throwable = match env.exception_occurred() {
        Ok(throwable) => throwable,
        Err(err) => return jni_error(err),
    };
    if let Err(err) = env.exception_clear() {
        return jni_error(err);
    }

    let message = env
        .call_method(&throwable, "toString", "()Ljava/lang/String;", &[])
        .and_then(|value| value.l())
        .and_then(|object| {
            let text = JString::from(object);
            env.get_string(&text).map(String::from)
        })
        .unwrap_or_else(|_| "java exception".to_owned());
    ReaderError::Foreign(message)
}
