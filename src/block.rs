//! Placed blocks.

use core::fmt;

use crate::{address::Address, UNIT_SPAN};

/// A contiguous extent within a page.
///
/// A `Block` is immutable once constructed. Resizing a block means replacing
/// it with a new `Block` value.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Block {
    start: Address,
    end: Address,
    size: usize,
    occupied_volume: usize,
}

impl Block {
    /// Constructs a block spanning `start..=end`.
    ///
    /// The size is derived as `(end - start + 1) / UNIT_SPAN`.
    ///
    /// # Errors
    ///
    /// Returns [`BlockError::InvalidRange`] if the derived size is zero, which
    /// includes every range with `end <= start`, and
    /// [`BlockError::CapacityExceeded`] if `occupied_volume` exceeds the size.
    pub fn new(
        start: Address,
        end: Address,
        occupied_volume: usize,
    ) -> Result<Block, BlockError> {
        let span = end
            .value()
            .checked_sub(start.value())
            .ok_or(BlockError::InvalidRange { start, end })?;
        let units = (u128::from(span) + 1) / u128::from(UNIT_SPAN);
        let size = usize::try_from(units)
            .map_err(|_| BlockError::InvalidRange { start, end })?;

        if size == 0 {
            return Err(BlockError::InvalidRange { start, end });
        }

        if occupied_volume > size {
            return Err(BlockError::CapacityExceeded {
                occupied_volume,
                size,
            });
        }

        Ok(Block {
            start,
            end,
            size,
            occupied_volume,
        })
    }

    /// Constructs a block of `size` units starting at `start`.
    ///
    /// # Errors
    ///
    /// Returns [`BlockError::InvalidRange`] if `size` is zero or the block
    /// would run past the end of the address space, and
    /// [`BlockError::CapacityExceeded`] if `occupied_volume` exceeds `size`.
    pub fn with_size(
        start: Address,
        size: usize,
        occupied_volume: usize,
    ) -> Result<Block, BlockError> {
        let end = start
            .span_end(size)
            .ok_or(BlockError::InvalidRange { start, end: start })?;

        Block::new(start, end, occupied_volume)
    }

    /// Returns a copy of this block with nothing stored in it.
    #[inline]
    pub fn vacated(&self) -> Block {
        Block {
            occupied_volume: 0,
            ..*self
        }
    }

    /// Returns the first address of the block.
    #[inline]
    pub fn start(&self) -> Address {
        self.start
    }

    /// Returns the last address of the block.
    #[inline]
    pub fn end(&self) -> Address {
        self.end
    }

    /// Returns the size of the block in units.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the number of units in use.
    #[inline]
    pub fn occupied_volume(&self) -> usize {
        self.occupied_volume
    }

    /// Returns `true` if `other` spans the same address range.
    #[inline]
    pub fn same_extent(&self, other: &Block) -> bool {
        self.start == other.start && self.end == other.end
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} ... {}], size={}, occupied_volume={}",
            self.start, self.end, self.size, self.occupied_volume
        )
    }
}

/// The error type for block construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockError {
    /// The address range does not contain a whole unit.
    InvalidRange {
        /// The requested first address.
        start: Address,
        /// The requested last address.
        end: Address,
    },

    /// The occupied volume is larger than the block.
    CapacityExceeded {
        /// The requested occupied volume.
        occupied_volume: usize,
        /// The size of the block.
        size: usize,
    },
}

impl fmt::Display for BlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockError::InvalidRange { start, end } => {
                write!(f, "block range [{start} ... {end}] holds no whole unit")
            }
            BlockError::CapacityExceeded {
                occupied_volume,
                size,
            } => write!(
                f,
                "occupied volume {occupied_volume} exceeds block size {size}"
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BlockError {}
