//! Paged allocation.
//!
//! A [`PagedAllocator`] divides its address space into a fixed number of
//! equally-sized pages, laid out back-to-back from address zero. Each
//! allocation places a single block inside one page.
//!
//! ## Placement
//!
//! Requests are served by the first of:
//!
//! 1. The oldest released block whose size equals the request exactly. The
//!    block is reinstated over its old address range in its old page.
//! 2. The first page, in creation order, with enough remaining capacity. The
//!    block is appended after the page's most recently placed block.
//!
//! Released blocks are never split or merged with their neighbours, so a
//! request that does not match any released block exactly always takes fresh
//! space.
//!
//! ## Characteristics
//!
//! #### Time complexity
//!
//! | Operation                | Best-case | Worst-case                  |
//! |--------------------------|-----------|-----------------------------|
//! | Allocate                 | O(1)      | O(free blocks + pages)      |
//! | Resize                   | O(1)      | O(blocks + free blocks)     |
//! | Release                  | O(1)      | O(blocks)                   |
//!
//! #### Fragmentation
//!
//! Since released space is only reused by requests of the same size, external
//! fragmentation grows with the variety of request sizes and is never healed.

use alloc::vec::Vec;
use core::{fmt, slice};

use crate::{
    address::Address,
    block::{Block, BlockError},
    page::Page,
    AllocInitError,
};

/// A released block awaiting reuse.
#[derive(Clone, Debug, PartialEq, Eq)]
struct FreeBlock {
    block: Block,
    page: usize,
}

/// A simulated paged allocator.
///
/// All state is owned by the instance; separate allocators never share pages
/// or free blocks.
#[derive(Clone, Debug)]
pub struct PagedAllocator {
    total_capacity: usize,
    page_capacity: usize,
    pages: Vec<Page>,
    free_list: Vec<FreeBlock>,
}

impl PagedAllocator {
    /// Constructs a new `PagedAllocator`.
    ///
    /// `page_size` is rounded up to the next power of two to obtain the page
    /// capacity. `page_count` pages of that capacity are laid out from
    /// address zero.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `page_size` or `page_count` is zero.
    /// - The page capacity times `page_count` is not `total_capacity`.
    /// - The pages would not fit in the address space.
    pub fn try_new(
        total_capacity: usize,
        page_count: usize,
        page_size: usize,
    ) -> Result<PagedAllocator, AllocInitError> {
        if page_count == 0 {
            return Err(AllocInitError::InvalidConfig);
        }

        let page_capacity = round_up_pow2(page_size).ok_or(AllocInitError::InvalidConfig)?;

        if page_capacity.checked_mul(page_count) != Some(total_capacity) {
            return Err(AllocInitError::SizeMismatch {
                total_capacity,
                page_capacity,
                page_count,
            });
        }

        let mut pages = Vec::with_capacity(page_count);
        let mut cursor = Some(Address::ZERO);
        for _ in 0..page_count {
            let page = cursor
                .and_then(|start| Page::new(start, page_capacity))
                .ok_or(AllocInitError::AddressOverflow)?;
            cursor = page.end().next();
            pages.push(page);
        }

        Ok(PagedAllocator {
            total_capacity,
            page_capacity,
            pages,
            free_list: Vec::new(),
        })
    }

    /// Returns the total capacity in units.
    #[inline]
    pub fn total_capacity(&self) -> usize {
        self.total_capacity
    }

    /// Returns the capacity of each page in units.
    #[inline]
    pub fn page_capacity(&self) -> usize {
        self.page_capacity
    }

    /// Returns the number of pages.
    #[inline]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Places a new block of `size` units holding `occupied_volume` units.
    ///
    /// On success, returns the page that received the block. The new block
    /// is always that page's [`last`](Page::last) block.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `size` exceeds the page capacity ([`AllocError::Oversized`]).
    /// - No released block matches `size` and no page has `size` units
    ///   remaining ([`AllocError::OutOfMemory`]).
    /// - `size` is zero or `occupied_volume` exceeds `size`
    ///   ([`AllocError::Block`]).
    ///
    /// The allocator is unchanged on error.
    pub fn allocate(&mut self, size: usize, occupied_volume: usize) -> Result<&Page, AllocError> {
        let index = self.place(size, occupied_volume)?;
        Ok(&self.pages[index])
    }

    /// Resizes the block starting at `addr` to `new_size` units.
    ///
    /// If `addr` is `None`, this is equivalent to
    /// [`allocate(new_size, 0)`](PagedAllocator::allocate).
    ///
    /// The block is removed from its page. If the page's remaining capacity
    /// is then at least `new_size - old_size`, the block is replaced in the
    /// same page, keeping its start address. Otherwise it is placed anew as
    /// by `allocate`, possibly in another page at another address, and the
    /// space it vacated is not offered for reuse.
    ///
    /// On success, returns the page holding the resized block, which is that
    /// page's [`last`](Page::last) block. The occupied volume carries over.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::Oversized`] if `new_size` exceeds the page
    /// capacity; this is checked before `addr` is looked up, so it takes
    /// precedence over [`AllocError::BlockNotFound`], which is returned if no
    /// block starts at `addr`. Otherwise returns the same errors as
    /// `allocate`. The allocator is unchanged on error.
    pub fn resize(&mut self, addr: Option<Address>, new_size: usize) -> Result<&Page, AllocError> {
        let addr = match addr {
            Some(a) => a,
            None => return self.allocate(new_size, 0),
        };

        if new_size > self.page_capacity {
            return Err(AllocError::Oversized {
                size: new_size,
                page_capacity: self.page_capacity,
            });
        }

        let (page_idx, block_idx) = self.find(addr)?;
        let page = &mut self.pages[page_idx];
        let old = page.take(block_idx);

        // capacity - occupied >= new_size - old_size, where the left side
        // is negative on an overcommitted page; rearranged to avoid underflow.
        if page.capacity() + old.size() >= page.occupied_volume() + new_size {
            match Block::with_size(old.start(), new_size, old.occupied_volume()) {
                Ok(block) => {
                    page.append(block);
                    return Ok(&self.pages[page_idx]);
                }
                Err(e) => {
                    page.restore(block_idx, old);
                    return Err(e.into());
                }
            }
        }

        match self.place(new_size, old.occupied_volume()) {
            Ok(index) => Ok(&self.pages[index]),
            Err(e) => {
                self.pages[page_idx].restore(block_idx, old);
                Err(e)
            }
        }
    }

    /// Releases the block starting at `addr`.
    ///
    /// The block's address range is remembered and handed out again to the
    /// next request of exactly the same size.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::BlockNotFound`] if no block starts at `addr`.
    pub fn release(&mut self, addr: Address) -> Result<(), AllocError> {
        let (page_idx, block_idx) = self.find(addr)?;
        let block = self.pages[page_idx].take(block_idx);

        self.free_list.push(FreeBlock {
            block: block.vacated(),
            page: page_idx,
        });

        Ok(())
    }

    /// Returns an iterator over the pages in creation order.
    pub fn inspect(&self) -> Pages<'_> {
        Pages {
            inner: self.pages.iter(),
        }
    }

    /// Returns an iterator over the released blocks awaiting reuse, oldest
    /// first, each paired with the page it belongs to.
    pub fn free_blocks(&self) -> impl Iterator<Item = (&Block, &Page)> + Clone + '_ {
        self.free_list
            .iter()
            .map(move |free| (&free.block, &self.pages[free.page]))
    }

    /// Places a block and returns the index of the page that received it.
    fn place(&mut self, size: usize, occupied_volume: usize) -> Result<usize, AllocError> {
        if size > self.page_capacity {
            return Err(AllocError::Oversized {
                size,
                page_capacity: self.page_capacity,
            });
        }

        if let Some(free_idx) = self.free_list.iter().position(|f| f.block.size() == size) {
            let FreeBlock { block, page } = &self.free_list[free_idx];
            let page = *page;
            let reused = Block::new(block.start(), block.end(), occupied_volume)?;

            self.pages[page].append(reused);
            self.free_list.remove(free_idx);
            return Ok(page);
        }

        let index = self
            .pages
            .iter()
            .position(|p| p.remaining_capacity() >= size)
            .ok_or(AllocError::OutOfMemory { size })?;

        let page = &mut self.pages[index];
        let start = page
            .next_block_start()
            .ok_or(AllocError::OutOfMemory { size })?;
        let block = Block::with_size(start, size, occupied_volume)?;
        page.append(block);

        Ok(index)
    }

    /// Finds the first block starting at `addr`, scanning pages in order.
    fn find(&self, addr: Address) -> Result<(usize, usize), AllocError> {
        self.pages
            .iter()
            .enumerate()
            .find_map(|(page_idx, page)| page.position_of(addr).map(|i| (page_idx, i)))
            .ok_or(AllocError::BlockNotFound(addr))
    }
}

impl fmt::Display for PagedAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for page in &self.pages {
            writeln!(f, "{page}")?;
        }

        Ok(())
    }
}

/// An iterator over the pages of a [`PagedAllocator`].
///
/// Returned by [`PagedAllocator::inspect`].
#[derive(Clone, Debug)]
pub struct Pages<'a> {
    inner: slice::Iter<'a, Page>,
}

impl<'a> Iterator for Pages<'a> {
    type Item = &'a Page;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Pages<'_> {}

/// The error type for allocator operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllocError {
    /// The request is larger than a page.
    Oversized {
        /// The requested size.
        size: usize,
        /// The capacity of each page.
        page_capacity: usize,
    },

    /// No page has room for the request and no released block matches it.
    OutOfMemory {
        /// The requested size.
        size: usize,
    },

    /// No block starts at the given address.
    BlockNotFound(Address),

    /// The requested block could not be constructed.
    Block(BlockError),
}

impl From<BlockError> for AllocError {
    fn from(e: BlockError) -> Self {
        AllocError::Block(e)
    }
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocError::Oversized {
                size,
                page_capacity,
            } => write!(
                f,
                "requested {size} units but pages hold only {page_capacity}"
            ),
            AllocError::OutOfMemory { size } => {
                write!(f, "no free space for a block of {size} units")
            }
            AllocError::BlockNotFound(addr) => write!(f, "no block starts at {addr}"),
            AllocError::Block(e) => fmt::Display::fmt(e, f),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AllocError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AllocError::Block(e) => Some(e),
            _ => None,
        }
    }
}

fn round_up_pow2(x: usize) -> Option<usize> {
    match x {
        0 => None,
        x => x.checked_next_power_of_two(),
    }
}
