//! A simulated paged memory allocator.
//!
//! [`PagedAllocator`] models a fixed-size address space divided into
//! fixed-size [`Page`]s and hands out contiguous [`Block`]s within them. No
//! real memory is touched; addresses are plain integers rendered in binary.
//!
//! Placement is first-fit over the pages in creation order, and released
//! blocks are only ever reused by a later request of exactly the same size.
//! Free blocks are never split or coalesced.
//!
//! ```
//! use paged_alloc::PagedAllocator;
//!
//! let mut alloc = PagedAllocator::try_new(32, 4, 8).unwrap();
//! let page = alloc.allocate(6, 0).unwrap();
//! let block = page.last().unwrap();
//!
//! assert_eq!(block.start().value(), 0);
//! assert_eq!(block.size(), 6);
//! ```

#![doc(html_root_url = "https://docs.rs/paged_alloc/0.1.0")]
#![warn(missing_debug_implementations)]
#![warn(missing_docs)]
#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(docs_rs, feature(doc_cfg))]

extern crate alloc;

pub mod address;
pub mod block;
pub mod page;
pub mod paged;

#[cfg(feature = "std")]
#[cfg_attr(docs_rs, doc(cfg(feature = "std")))]
pub mod clock;

#[cfg(test)]
mod tests;

use core::fmt;

pub use crate::{
    address::{Address, ParseAddressError},
    block::{Block, BlockError},
    page::Page,
    paged::{AllocError, PagedAllocator},
};

#[cfg(feature = "std")]
pub use crate::clock::Clocked;

/// The number of address units one unit of block size advances past its gap.
///
/// Each unit of size is encoded as 8 bits plus a 1-bit gap, so a block of `n`
/// units starting at `s` ends at `s + n * UNIT_SCALE + (n - 1)`.
pub const UNIT_SCALE: u64 = 255;

/// The number of addresses covered by one unit of block size, gap included.
///
/// A block's size is recovered as `(end - start + 1) / UNIT_SPAN`. For blocks
/// of up to `UNIT_SCALE` units this equals `(end - start) / UNIT_SCALE`, and
/// unlike that form it stays exact for larger blocks.
pub const UNIT_SPAN: u64 = UNIT_SCALE + 1;

/// The error type for allocator constructors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllocInitError {
    /// The page capacity times the page count does not equal the total
    /// capacity.
    ///
    /// `page_capacity` is the requested page size after rounding up to a
    /// power of two.
    SizeMismatch {
        /// The requested total capacity.
        total_capacity: usize,
        /// The rounded page capacity.
        page_capacity: usize,
        /// The requested number of pages.
        page_count: usize,
    },

    /// The configuration of the allocator is invalid.
    ///
    /// This variant is returned when the page size or page count is zero, or
    /// when the page size cannot be rounded up to a power of two.
    InvalidConfig,

    /// The pages would extend past the end of the address space.
    AddressOverflow,
}

impl fmt::Display for AllocInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocInitError::SizeMismatch {
                total_capacity,
                page_capacity,
                page_count,
            } => write!(
                f,
                "{page_count} pages of {page_capacity} units do not add up to {total_capacity}"
            ),
            AllocInitError::InvalidConfig => f.write_str("invalid allocator configuration"),
            AllocInitError::AddressOverflow => f.write_str("pages overflow the address space"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AllocInitError {}
