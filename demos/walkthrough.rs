//! Replays a short allocation session and prints the resulting pages.
//!
//! Every allocator call is clocked at debug level. Pass `info` or `off` as
//! the first argument to hide the timing records.

use log::{LevelFilter, Log, Metadata, Record};
use paged_alloc::{Address, AllocError, Clocked, PagedAllocator};

/// Writes every record to stderr.
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            eprintln!("{:<5} {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let level = match std::env::args().nth(1).as_deref() {
        Some("info") => LevelFilter::Info,
        Some("off") => LevelFilter::Off,
        _ => LevelFilter::Debug,
    };
    log::set_logger(&LOGGER).map_err(|e| e.to_string())?;
    log::set_max_level(level);

    let mut alloc = Clocked::new(PagedAllocator::try_new(32, 4, 8)?);

    // An allocator constructed alongside shares nothing with the first.
    let other = PagedAllocator::try_new(32, 4, 8)?;

    for size in [6, 3, 2, 3, 6] {
        alloc.allocate(size, 0)?;
    }

    alloc.resize(Some("0b11000000000".parse::<Address>()?), 1)?;
    alloc.release("0b100000000000".parse()?)?;
    alloc.allocate(3, 0)?;

    match alloc.allocate(9, 0) {
        Err(e @ AllocError::Oversized { .. }) => println!("rejected: {e}"),
        other => println!("unexpected: {other:?}"),
    }

    println!();
    for page in alloc.inspect() {
        println!("{page}");
    }

    println!();
    println!("untouched allocator:");
    print!("{other}");

    Ok(())
}
