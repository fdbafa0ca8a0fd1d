//! Simulated addresses.
//!
//! An [`Address`] is a non-negative offset into the simulated address space.
//! Its canonical textual form is a string of binary digits with no prefix,
//! no separators and no leading zeros; [`Address::parse`] additionally
//! accepts a leading `0b`.

use core::{fmt, str::FromStr};

use crate::UNIT_SCALE;

/// An offset into the simulated address space.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(u64);

impl Address {
    /// The first address of the address space.
    pub const ZERO: Address = Address(0);

    /// Creates an address from its integer value.
    #[inline]
    pub const fn new(value: u64) -> Address {
        Address(value)
    }

    /// Parses an address from a binary digit string.
    ///
    /// An optional `0b` prefix is stripped before parsing. Leading zeros are
    /// accepted and discarded, so `"0011"` and `"11"` parse to equal
    /// addresses.
    ///
    /// # Errors
    ///
    /// Returns an error if no digits remain after the prefix, if any
    /// character is not `0` or `1`, or if the value does not fit in 64 bits.
    pub fn parse(text: &str) -> Result<Address, ParseAddressError> {
        let digits = text.strip_prefix("0b").unwrap_or(text);
        if digits.is_empty() {
            return Err(ParseAddressError::Empty);
        }

        let mut value: u64 = 0;
        for (index, ch) in digits.char_indices() {
            let bit = match ch {
                '0' => 0,
                '1' => 1,
                _ => return Err(ParseAddressError::InvalidDigit { index, found: ch }),
            };

            value = value
                .checked_mul(2)
                .and_then(|v| v.checked_add(bit))
                .ok_or(ParseAddressError::Overflow)?;
        }

        Ok(Address(value))
    }

    /// Returns the integer value of the address.
    #[inline]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Returns the address immediately following this one.
    #[inline]
    pub fn next(self) -> Option<Address> {
        self.0.checked_add(1).map(Address)
    }

    /// Returns the last address of an extent of `size` units starting at
    /// `self`.
    ///
    /// Returns `None` if `size` is zero or the extent would overflow the
    /// address space.
    pub fn span_end(self, size: usize) -> Option<Address> {
        let size = u64::try_from(size).ok()?;
        let gaps = size.checked_sub(1)?;
        let span = size.checked_mul(UNIT_SCALE)?.checked_add(gaps)?;

        self.0.checked_add(span).map(Address)
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Address {
        Address(value)
    }
}

impl FromStr for Address {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:b}", self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#b}", self.0)
    }
}

/// The error returned when a string is not a valid binary address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseAddressError {
    /// The string contains no digits.
    Empty,

    /// The string contains a character other than `0` or `1`.
    InvalidDigit {
        /// The byte offset of the offending character, after the prefix.
        index: usize,
        /// The offending character.
        found: char,
    },

    /// The value does not fit in 64 bits.
    Overflow,
}

impl fmt::Display for ParseAddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseAddressError::Empty => f.write_str("address has no binary digits"),
            ParseAddressError::InvalidDigit { index, found } => {
                write!(f, "invalid binary digit {found:?} at offset {index}")
            }
            ParseAddressError::Overflow => f.write_str("address does not fit in 64 bits"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseAddressError {}
