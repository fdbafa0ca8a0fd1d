//! Fixed-capacity pages.

use alloc::vec::Vec;
use core::{fmt, slice};

use crate::{address::Address, block::Block, paged::AllocError};

/// A fixed-capacity region of the simulated address space.
///
/// A page holds an ordered sequence of [`Block`]s. Blocks are appended
/// contiguously: each new block starts one address past the end of the most
/// recently appended block, or at the page start if the page is empty.
/// Removing a block does not move the remaining ones.
///
/// The page does not check appended blocks for overlap; keeping them apart is
/// up to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page {
    start: Address,
    end: Address,
    capacity: usize,
    blocks: Vec<Block>,
    occupied_volume: usize,
}

impl Page {
    /// Creates an empty page of `capacity` units starting at `start`.
    ///
    /// Returns `None` if `capacity` is zero or the page would run past the
    /// end of the address space.
    pub(crate) fn new(start: Address, capacity: usize) -> Option<Page> {
        let end = start.span_end(capacity)?;

        Some(Page {
            start,
            end,
            capacity,
            blocks: Vec::new(),
            occupied_volume: 0,
        })
    }

    /// Returns the first address of the page.
    #[inline]
    pub fn start(&self) -> Address {
        self.start
    }

    /// Returns the last address of the page.
    #[inline]
    pub fn end(&self) -> Address {
        self.end
    }

    /// Returns the capacity of the page in units.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the sum of the sizes of the blocks in the page.
    #[inline]
    pub fn occupied_volume(&self) -> usize {
        self.occupied_volume
    }

    /// Returns the number of units not covered by any block.
    ///
    /// An in-place resize may commit more units than the page holds, in which
    /// case this is zero even though the page is short by the difference.
    /// Capacity checks that must see the shortfall compare `capacity()` and
    /// `occupied_volume()` directly.
    #[inline]
    pub fn remaining_capacity(&self) -> usize {
        self.capacity.saturating_sub(self.occupied_volume)
    }

    /// Returns the blocks in insertion order.
    #[inline]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Returns an iterator over the blocks in insertion order.
    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    /// Returns the most recently appended block.
    #[inline]
    pub fn last(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// Returns `true` if the page holds no blocks.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Returns the address at which the next appended block starts.
    ///
    /// Returns `None` if the last block ends at the very end of the address
    /// space.
    pub fn next_block_start(&self) -> Option<Address> {
        match self.blocks.last() {
            Some(last) => last.end().next(),
            None => Some(self.start),
        }
    }

    /// Appends `block` to the page.
    pub fn append(&mut self, block: Block) {
        self.occupied_volume += block.size();
        self.blocks.push(block);
    }

    /// Removes the first block spanning the same range as `block`.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::BlockNotFound`] if the page holds no such block.
    pub fn remove(&mut self, block: &Block) -> Result<Block, AllocError> {
        let index = self
            .blocks
            .iter()
            .position(|b| b.same_extent(block))
            .ok_or(AllocError::BlockNotFound(block.start()))?;

        Ok(self.take(index))
    }

    /// Returns the index of the first block starting at `addr`.
    pub(crate) fn position_of(&self, addr: Address) -> Option<usize> {
        self.blocks.iter().position(|b| b.start() == addr)
    }

    /// Removes and returns the block at `index`.
    pub(crate) fn take(&mut self, index: usize) -> Block {
        let block = self.blocks.remove(index);
        self.occupied_volume -= block.size();
        block
    }

    /// Puts a block previously removed with [`Page::take`] back at `index`.
    pub(crate) fn restore(&mut self, index: usize, block: Block) {
        self.occupied_volume += block.size();
        self.blocks.insert(index, block);
    }
}

impl<'a> IntoIterator for &'a Page {
    type Item = &'a Block;

    type IntoIter = slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, block) in self.blocks.iter().enumerate() {
            if i != 0 {
                f.write_str(", ")?;
            }
            write!(f, "{block}")?;
        }

        write!(
            f,
            "] <start={}, end={}, capacity={}, occupied_volume={}>",
            self.start, self.end, self.capacity, self.occupied_volume
        )
    }
}
