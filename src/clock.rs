//! Call timing.
//!
//! [`clock`] runs a closure, measures how long it took and logs one record
//! describing the call through the [`log`] facade. [`Clocked`] wraps a
//! [`PagedAllocator`] so that each of its operations is clocked, leaving the
//! allocator itself free of any instrumentation.
//!
//! Records are emitted under the `paged_alloc::clock` target in the form
//!
//! ```text
//! [0.00000120] allocate(6, 0) >>> Ok(...)
//! ```

use std::{fmt, time::Instant};

use log::Level;

use crate::{
    address::Address,
    page::Page,
    paged::{AllocError, Pages, PagedAllocator},
};

/// The log target of clock records.
pub const TARGET: &str = "paged_alloc::clock";

/// Runs `f`, logging its elapsed time, `name`, `args` and result at `level`.
///
/// The result is returned unchanged.
pub fn clock<T, F>(level: Level, name: &str, args: fmt::Arguments<'_>, f: F) -> T
where
    T: fmt::Debug,
    F: FnOnce() -> T,
{
    let t0 = Instant::now();
    let result = f();
    let elapsed = t0.elapsed();

    log::log!(
        target: TARGET,
        level,
        "[{:0.8}] {}({}) >>> {:?}",
        elapsed.as_secs_f64(),
        name,
        args,
        result
    );

    result
}

/// A [`PagedAllocator`] whose operations are clocked.
#[derive(Clone, Debug)]
pub struct Clocked {
    inner: PagedAllocator,
    level: Level,
}

impl Clocked {
    /// Wraps `inner`, logging at [`Level::Debug`].
    pub fn new(inner: PagedAllocator) -> Clocked {
        Clocked::with_level(inner, Level::Debug)
    }

    /// Wraps `inner`, logging at `level`.
    pub fn with_level(inner: PagedAllocator, level: Level) -> Clocked {
        Clocked { inner, level }
    }

    /// Returns the level clock records are logged at.
    pub fn level(&self) -> Level {
        self.level
    }

    /// Returns a reference to the wrapped allocator.
    pub fn get_ref(&self) -> &PagedAllocator {
        &self.inner
    }

    /// Unwraps the allocator.
    pub fn into_inner(self) -> PagedAllocator {
        self.inner
    }

    /// Clocked [`PagedAllocator::allocate`].
    pub fn allocate(&mut self, size: usize, occupied_volume: usize) -> Result<&Page, AllocError> {
        let inner = &mut self.inner;
        clock(
            self.level,
            "allocate",
            format_args!("{size}, {occupied_volume}"),
            || inner.allocate(size, occupied_volume),
        )
    }

    /// Clocked [`PagedAllocator::resize`].
    pub fn resize(&mut self, addr: Option<Address>, new_size: usize) -> Result<&Page, AllocError> {
        let inner = &mut self.inner;
        clock(
            self.level,
            "resize",
            format_args!("{addr:?}, {new_size}"),
            || inner.resize(addr, new_size),
        )
    }

    /// Clocked [`PagedAllocator::release`].
    pub fn release(&mut self, addr: Address) -> Result<(), AllocError> {
        let inner = &mut self.inner;
        clock(self.level, "release", format_args!("{addr:?}"), || {
            inner.release(addr)
        })
    }

    /// Clocked [`PagedAllocator::inspect`].
    ///
    /// Only the creation of the iterator is timed.
    pub fn inspect(&self) -> Pages<'_> {
        let inner = &self.inner;
        clock(self.level, "inspect", format_args!(""), || inner.inspect())
    }
}

impl From<PagedAllocator> for Clocked {
    fn from(inner: PagedAllocator) -> Clocked {
        Clocked::new(inner)
    }
}

impl fmt::Display for Clocked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}
