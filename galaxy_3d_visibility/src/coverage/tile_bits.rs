//! Fixed-width bit rows.
//!
//! A coverage word holds one bit per pixel row: bit `k` is row `k` of the
//! word's band. `Bits32` is the column word of the flat buffer, `Bits64`
//! the column word of a 32x64 tile.

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Not};

/// `KEEP_MASKS[k]` keeps bits `k..32` (all ones shifted left by `k`).
pub const KEEP_MASKS: [u32; 33] = build_keep_masks();

const fn build_keep_masks() -> [u32; 33] {
    let mut masks = [0u32; 33];
    let mut k = 0;
    while k < 32 {
        masks[k] = u32::MAX << k;
        k += 1;
    }
    masks
}

/// Bit row operations shared by the 32 and 64 bit words.
pub trait TileBits:
    Copy
    + Eq
    + fmt::Debug
    + BitOrAssign
    + BitAndAssign
    + BitXorAssign
    + Not<Output = Self>
{
    /// Number of bits in the row
    const BITS: u32;

    fn empty() -> Self;
    fn full() -> Self;
    fn is_empty(&self) -> bool;
    fn is_full(&self) -> bool;

    /// `self &= !other`
    fn and_inverted(&mut self, other: Self);
    /// `self |= !other`
    fn or_inverted(&mut self, other: Self);
    fn invert(&mut self);

    fn xor_bit(&mut self, index: u32);
    fn test_bit(&self, index: u32) -> bool;

    /// True if any bit of byte group `n` (bits `8n..8n+8`) is set.
    fn check_byte(&self, n: u32) -> bool;

    /// Bits `0..=index`
    fn start_mask(index: u32) -> Self;
    /// Bits `index..BITS`
    fn end_mask(index: u32) -> Self;
    /// Bits `first..=last`
    fn range_mask(first: u32, last: u32) -> Self {
        let mut mask = Self::start_mask(last);
        mask &= Self::end_mask(first);
        mask
    }

    fn count_ones(&self) -> u32;

    /// Number of byte groups
    fn byte_groups() -> u32 {
        Self::BITS / 8
    }
}

macro_rules! tile_bits_impl {
    ($name:ident, $raw:ty, $bits:expr) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name(pub $raw);

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:#0width$b})", stringify!($name), self.0, width = $bits + 2)
            }
        }

        impl TileBits for $name {
            const BITS: u32 = $bits;

            #[inline]
            fn empty() -> Self {
                $name(0)
            }

            #[inline]
            fn full() -> Self {
                $name(<$raw>::MAX)
            }

            #[inline]
            fn is_empty(&self) -> bool {
                self.0 == 0
            }

            #[inline]
            fn is_full(&self) -> bool {
                self.0 == <$raw>::MAX
            }

            #[inline]
            fn and_inverted(&mut self, other: Self) {
                self.0 &= !other.0;
            }

            #[inline]
            fn or_inverted(&mut self, other: Self) {
                self.0 |= !other.0;
            }

            #[inline]
            fn invert(&mut self) {
                self.0 = !self.0;
            }

            #[inline]
            fn xor_bit(&mut self, index: u32) {
                debug_assert!(index < $bits);
                self.0 ^= 1 << index;
            }

            #[inline]
            fn test_bit(&self, index: u32) -> bool {
                debug_assert!(index < $bits);
                (self.0 >> index) & 1 != 0
            }

            #[inline]
            fn check_byte(&self, n: u32) -> bool {
                debug_assert!(n < $bits / 8);
                (self.0 >> (n * 8)) & 0xff != 0
            }

            #[inline]
            fn start_mask(index: u32) -> Self {
                debug_assert!(index < $bits);
                if index + 1 >= $bits {
                    $name(<$raw>::MAX)
                } else {
                    $name((1 << (index + 1)) - 1)
                }
            }

            #[inline]
            fn end_mask(index: u32) -> Self {
                if index >= $bits {
                    $name(0)
                } else {
                    $name(<$raw>::MAX << index)
                }
            }

            #[inline]
            fn count_ones(&self) -> u32 {
                self.0.count_ones()
            }
        }

        impl BitOr for $name {
            type Output = Self;
            fn bitor(self, rhs: Self) -> Self {
                $name(self.0 | rhs.0)
            }
        }

        impl BitAnd for $name {
            type Output = Self;
            fn bitand(self, rhs: Self) -> Self {
                $name(self.0 & rhs.0)
            }
        }

        impl BitXor for $name {
            type Output = Self;
            fn bitxor(self, rhs: Self) -> Self {
                $name(self.0 ^ rhs.0)
            }
        }

        impl BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        }

        impl BitAndAssign for $name {
            fn bitand_assign(&mut self, rhs: Self) {
                self.0 &= rhs.0;
            }
        }

        impl BitXorAssign for $name {
            fn bitxor_assign(&mut self, rhs: Self) {
                self.0 ^= rhs.0;
            }
        }

        impl Not for $name {
            type Output = Self;
            fn not(self) -> Self {
                $name(!self.0)
            }
        }
    };
}

tile_bits_impl!(Bits32, u32, 32);
tile_bits_impl!(Bits64, u64, 64);

#[cfg(test)]
#[path = "tile_bits_tests.rs"]
mod tests;
