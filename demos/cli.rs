use anyhow::{Context, Result};
use handle_reader::backends::IoBackend;
use handle_reader::{
    ExternalHandleReader, ReadOutcome, ReaderBackend, ReaderOptions,
};
use std::fs::File;
use std::io::Write;
use std::process::{Command, Stdio};
use std::{env, io};

const CHUNK: usize = 4096;

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn usage() {
    println!("Usage:");
    println!(" cargo run --example cli file <path> [OPTIONS_JSON]");
    println!(" cargo run --example cli exec <program> [args...]");
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        usage();
        return Ok(());
    }

    match args[1].as_str() {
        "file" => file_command(&args[2], args.get(3).map(String::as_str)),
        "exec" => exec_command(&args[2], &args[3..]),
        _ => {
            eprintln!("Invalid source. Use 'file' or 'exec'.");
            usage();
            Ok(())
        }
    }
}

fn file_command(path: &str, options: Option<&str>) -> Result<()> {
    let options = match options {
        Some(json) => ReaderOptions::from_json(json)
            .context("Failed to parse reader options")?,
        None => ReaderOptions::new(path),
    };
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path))?;

    let reader = ExternalHandleReader::with_options(options, IoBackend::new(file));
    stream(reader)
}

fn exec_command(program: &str, args: &[String]) -> Result<()> {
    let child = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to spawn {}", program))?;

    let backend = IoBackend::from_child(child)?;
    stream(ExternalHandleReader::new(program, backend))
}

/// Copy the reader to stdout, reporting each chunk on stderr.
fn stream<B>(mut reader: ExternalHandleReader<B>) -> Result<()>
where
    B: ReaderBackend<Unit = u8>,
{
    let mut buf = vec![0u8; CHUNK];
    let mut stdout = io::stdout().lock();
    let mut total = 0;
    loop {
        match reader.read(&mut buf, 0, CHUNK)? {
            ReadOutcome::Count(n) => {
                stdout.write_all(&buf[..n])?;
                total += n;
                eprintln!("read {} bytes from handle {}", n, reader.handle());
            }
            ReadOutcome::EndOfStream => break,
        }
    }
    stdout.flush()?;
    reader.close()?;
    eprintln!("{}: {} bytes in total", reader.label(), total);
    Ok(())
}
