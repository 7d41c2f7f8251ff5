use std::fs::File;
use std::io::{Read, Write};
use std::num::NonZeroUsize;

use handle_reader::backends::{IoBackend, MemoryBackend};
use handle_reader::{
    ErrorKind, ExternalHandleReader, ReadOutcome, ReaderOptions,
};
use quickcheck_macros::quickcheck;
use tempdir::TempDir;

/// Drain `reader` with requests cycling through `lengths`, checking the
/// per-call contract on the way.
fn drain_with(
    reader: &mut ExternalHandleReader<MemoryBackend<u8>>,
    lengths: &[usize],
) -> Vec<u8> {
    let mut collected = Vec::new();
    let mut buf = [0u8; 64];
    for length in lengths.iter().cycle() {
        let length = length % buf.len() + 1;
        match reader.read(&mut buf, 0, length).unwrap() {
            ReadOutcome::Count(n) => {
                assert!(n > 0 && n <= length);
                collected.extend_from_slice(&buf[..n]);
            }
            ReadOutcome::EndOfStream => break,
        }
    }
    collected
}

#[quickcheck]
fn prop_reads_preserve_order_and_total(
    data: Vec<u8>,
    chunk_limit: u8,
    lengths: Vec<u8>,
) -> bool {
    let lengths: Vec<usize> = if lengths.is_empty() {
        vec![7]
    } else {
        lengths.into_iter().map(usize::from).collect()
    };
    let backend = MemoryBackend::new(1, data.clone())
        .with_chunk_limit(usize::from(chunk_limit));
    let mut reader = ExternalHandleReader::new("prop", backend);

    drain_with(&mut reader, &lengths) == data
}

#[quickcheck]
fn prop_exhaustion_is_idempotent(data: Vec<u8>, extra_calls: u8) -> bool {
    let mut reader =
        ExternalHandleReader::new("prop", MemoryBackend::new(1, data));
    let mut sink = Vec::new();
    reader.read_to_end(&mut sink).unwrap();

    let mut buf = [0u8; 8];
    (0..extra_calls % 16).all(|_| {
        reader.read(&mut buf, 0, 8).unwrap() == ReadOutcome::EndOfStream
    })
}

#[quickcheck]
fn prop_zero_length_reads_return_zero(data: Vec<u8>, offset: u8) -> bool {
    let mut reader =
        ExternalHandleReader::new("prop", MemoryBackend::new(1, data));
    let mut buf = [0u8; 256];

    reader.read(&mut buf, usize::from(offset), 0).unwrap() == ReadOutcome::Count(0)
}

#[quickcheck]
fn prop_close_releases_exactly_once(closes: u8) -> bool {
    let backend = MemoryBackend::new(1, b"hello".to_vec());
    let releases = backend.release_counter();
    let mut reader = ExternalHandleReader::new("prop", backend);

    for _ in 0..=closes % 8 {
        reader.close().unwrap();
    }
    drop(reader);
    releases.get() == 1
}

#[test_log::test]
fn hello_scenario() {
    let backend = MemoryBackend::new(1, b"hello".to_vec());
    let mut reader = ExternalHandleReader::new("hello", backend);
    let mut buf = [0u8; 10];

    assert_eq!(reader.read(&mut buf, 0, 10).unwrap(), ReadOutcome::Count(5));
    assert_eq!(&buf[..5], b"hello");
    assert_eq!(
        reader.read(&mut buf, 0, 10).unwrap(),
        ReadOutcome::EndOfStream
    );
    assert_eq!(
        reader.read(&mut buf, 0, 10).unwrap().into_raw(),
        handle_reader::END_OF_STREAM
    );
    assert!(reader.close().is_ok());
}

#[test]
fn empty_source_scenario() {
    let backend = MemoryBackend::<u8>::new(2, Vec::new());
    let mut reader = ExternalHandleReader::new("empty", backend);
    let mut buf = [0u8; 4];

    assert_eq!(
        reader.read(&mut buf, 0, 4).unwrap(),
        ReadOutcome::EndOfStream
    );
}

#[test]
fn mid_stream_failure_scenario() {
    let backend = MemoryBackend::new(3, b"hello world".to_vec()).failing_at(6);
    let releases = backend.release_counter();
    let mut reader = ExternalHandleReader::new("flaky", backend);
    let mut out = Vec::new();

    let err = reader.read_to_end(&mut out).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IoFailure);
    assert_eq!(out, b"hello ");
    assert!(!reader.is_closed());

    // Caller gives up rather than retrying.
    reader.close().unwrap();
    let err = reader.read(&mut [0u8; 4], 0, 4).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(releases.get(), 1);
}

#[test]
fn file_backed_reader() {
    let temp_dir =
        TempDir::new("tmp").expect("Failed to create temporary directory");
    let path = temp_dir.path().join("source.txt");
    let content: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
    File::create(&path)
        .and_then(|mut file| file.write_all(&content))
        .expect("Failed to write source file");

    let file = File::open(&path).expect("Failed to open source file");
    let cap = NonZeroUsize::new(1000).unwrap();
    let options = ReaderOptions::new("file").with_max_request(cap);
    let mut reader =
        ExternalHandleReader::with_options(options, IoBackend::new(file));

    let mut buf = [0u8; 4096];
    match reader.read(&mut buf, 0, 4096).unwrap() {
        ReadOutcome::Count(n) => assert!(n <= 1000),
        ReadOutcome::EndOfStream => panic!("unexpected end of stream"),
    }

    let mut reader = ExternalHandleReader::new(
        "file",
        IoBackend::new(File::open(&path).unwrap()),
    );
    let mut read_back = Vec::new();
    reader.read_to_end(&mut read_back).unwrap();
    assert_eq!(read_back, content);
    reader.close().unwrap();
}

#[test]
fn std_read_interop() {
    let backend = MemoryBackend::new(4, b"line one\nline two\n".to_vec())
        .with_chunk_limit(3);
    let reader = ExternalHandleReader::new("std", backend);
    let mut text = String::new();

    std::io::BufReader::new(reader)
        .read_to_string(&mut text)
        .unwrap();
    assert_eq!(text, "line one\nline two\n");
}

#[cfg(unix)]
#[test]
fn child_process_reader() {
    use std::process::{Command, Stdio};

    let child = Command::new("sh")
        .args(["-c", "printf hello"])
        .stdout(Stdio::piped())
        .spawn()
        .expect("Failed to spawn sh");
    let backend = IoBackend::from_child(child).unwrap();
    let mut reader = ExternalHandleReader::new("sh", backend);

    let mut out = Vec::new();
    reader.read_to_end(&mut out).unwrap();
    assert_eq!(out, b"hello");
    assert!(reader.close().is_ok());
}

#[cfg(unix)]
#[test]
fn closing_early_reaps_running_child() {
    use std::process::{Command, Stdio};

    let child = Command::new("sh")
        .args(["-c", "while true; do echo tick; sleep 1; done"])
        .stdout(Stdio::piped())
        .spawn()
        .expect("Failed to spawn sh");
    let backend = IoBackend::from_child(child).unwrap();
    let mut reader = ExternalHandleReader::new("ticker", backend);

    let mut buf = [0u8; 5];
    assert!(matches!(
        reader.read(&mut buf, 0, 5).unwrap(),
        ReadOutcome::Count(_)
    ));
    assert!(reader.close().is_ok());
}
