//! # Null Bitmap
//!
//! The first bytes of every record form the null region. Bits are numbered
//! LSB-first: bit `i` lives in byte `i / 8` under mask `1 << (i % 8)`.
//!
//! ```text
//! byte 0                    byte 1
//! ┌─┬─┬─┬─┬─┬─┬─┬─┐        ┌─┬─┬─┬─┬─┬─┬─┬─┐
//! │7│6│5│4│3│2│1│0│        │f│e│d│c│b│a│9│8│
//! └─┴─┴─┴─┴─┴─┴─┴─┘        └─┴─┴─┴─┴─┴─┴─┴─┘
//!  bit 0: null-row flag (if any)
//!  then one bit per nullable column, and M % 8 bits after a BIT(M)
//!  column's own null bit, in column order
//! ```
//!
//! A column never owns this region; it only holds the coordinates of its
//! bits.

/// One bit of the null region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NullBit {
    pub byte: usize,
    pub mask: u8,
}

impl NullBit {
    pub fn from_index(bit: usize) -> Self {
        Self {
            byte: bit / 8,
            mask: 1 << (bit % 8),
        }
    }

    #[inline]
    pub fn is_set(self, data: &[u8]) -> bool {
        data[self.byte] & self.mask != 0
    }

    #[inline]
    pub fn set(self, data: &mut [u8]) {
        data[self.byte] |= self.mask;
    }

    #[inline]
    pub fn clear(self, data: &mut [u8]) {
        data[self.byte] &= !self.mask;
    }
}

/// How a column's nullness is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NullMode {
    /// NOT NULL column in a table without a null-row flag.
    NotNull,
    /// Own bit; the row flag, if present, also forces NULL.
    Bit {
        bit: NullBit,
        row_flag: Option<NullBit>,
    },
    /// NOT NULL column that still reads NULL when the whole row is flagged.
    RowFlag(NullBit),
}

impl NullMode {
    pub fn is_nullable(self) -> bool {
        matches!(self, NullMode::Bit { .. })
    }

    pub fn is_null(self, data: &[u8]) -> bool {
        match self {
            NullMode::NotNull => false,
            NullMode::Bit { bit, row_flag } => {
                bit.is_set(data) || row_flag.is_some_and(|f| f.is_set(data))
            }
            NullMode::RowFlag(flag) => flag.is_set(data),
        }
    }
}

/// A run of up to 7 bits in the null region, used for the leftover bits of
/// a BIT(M) column. The run may straddle a byte boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnevenBits {
    pub start: usize,
    pub len: u8,
}

impl UnevenBits {
    fn mask(self) -> u16 {
        (1u16 << self.len) - 1
    }

    pub fn get(self, data: &[u8]) -> u8 {
        let byte = self.start / 8;
        let ofs = self.start % 8;
        let mut word = u16::from(data[byte]);
        if ofs + usize::from(self.len) > 8 {
            word |= u16::from(data[byte + 1]) << 8;
        }
        ((word >> ofs) & self.mask()) as u8
    }

    pub fn set(self, data: &mut [u8], value: u8) {
        let byte = self.start / 8;
        let ofs = self.start % 8;
        let mask = self.mask() << ofs;
        let bits = (u16::from(value) << ofs) & mask;
        data[byte] = (data[byte] & !(mask as u8)) | bits as u8;
        if ofs + usize::from(self.len) > 8 {
            let hi_mask = (mask >> 8) as u8;
            data[byte + 1] = (data[byte + 1] & !hi_mask) | (bits >> 8) as u8;
        }
    }
}

/// Bytes needed for `bits` bits.
pub fn null_bytes_for(bits: usize) -> usize {
    bits.div_ceil(8)
}
