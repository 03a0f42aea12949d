//! Datapath word widths.
//!
//! The accelerator reads packed bitplane rows through a fixed-width memory
//! port. Every packed buffer in the system is laid out for one of the four
//! port widths below, chosen once per codec instance and never mixed within
//! an operand pair.

use std::fmt;

/// Width of one packed machine word, in bits.
///
/// Rows of a bitplane are padded up to a whole number of words of this
/// width; the padding bits are always zero so AND/popcount over full words
/// never picks up stray contributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WordSize {
    /// 8-bit port (byte-serial debug builds of the datapath).
    W8,
    /// 16-bit port.
    W16,
    /// 32-bit port.
    W32,
    /// 64-bit port, the shipping configuration.
    #[default]
    W64,
}

/// All supported port widths, narrowest first.
pub const ALL_WORD_SIZES: [WordSize; 4] = [WordSize::W8, WordSize::W16, WordSize::W32, WordSize::W64];

impl WordSize {
    /// Width in bits.
    #[must_use]
    pub const fn bits(self) -> usize {
        match self {
            Self::W8 => 8,
            Self::W16 => 16,
            Self::W32 => 32,
            Self::W64 => 64,
        }
    }

    /// Width in bytes, the wire granule. Words are serialized little-endian
    /// at exactly this many bytes each.
    #[must_use]
    pub const fn bytes(self) -> usize {
        self.bits() / 8
    }

    /// Number of words needed to hold `bits` bits.
    #[must_use]
    pub const fn words_for_bits(self, bits: usize) -> usize {
        bits.div_ceil(self.bits())
    }

    /// Look up a width by bit count. Returns `None` for anything other than
    /// 8, 16, 32, or 64.
    #[must_use]
    pub const fn from_bits(bits: usize) -> Option<Self> {
        match bits {
            8 => Some(Self::W8),
            16 => Some(Self::W16),
            32 => Some(Self::W32),
            64 => Some(Self::W64),
            _ => None,
        }
    }

    /// Mask selecting the valid bits of one word of this width.
    #[must_use]
    pub const fn mask(self) -> u64 {
        match self {
            Self::W64 => u64::MAX,
            _ => (1u64 << self.bits()) - 1,
        }
    }
}

impl fmt::Display for WordSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.bits())
    }
}

impl std::str::FromStr for WordSize {
    type Err = String;

    /// Accepts `w8`/`w16`/`w32`/`w64` or a bare bit count.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix('w')
            .unwrap_or(s)
            .parse::<usize>()
            .ok()
            .and_then(Self::from_bits)
            .ok_or_else(|| format!("unknown word size `{s}` (expected w8, w16, w32, or w64)"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_for_bits_rounds_up() {
        assert_eq!(WordSize::W64.words_for_bits(0), 0);
        assert_eq!(WordSize::W64.words_for_bits(1), 1);
        assert_eq!(WordSize::W64.words_for_bits(64), 1);
        assert_eq!(WordSize::W64.words_for_bits(65), 2);
        assert_eq!(WordSize::W8.words_for_bits(9), 2);
    }

    #[test]
    fn from_bits_rejects_odd_widths() {
        assert_eq!(WordSize::from_bits(64), Some(WordSize::W64));
        assert_eq!(WordSize::from_bits(12), None);
        assert_eq!(WordSize::from_bits(0), None);
    }

    #[test]
    fn masks_cover_exactly_the_port_width() {
        assert_eq!(WordSize::W8.mask(), 0xff);
        assert_eq!(WordSize::W16.mask(), 0xffff);
        assert_eq!(WordSize::W32.mask(), 0xffff_ffff);
        assert_eq!(WordSize::W64.mask(), u64::MAX);
    }

    #[test]
    fn display_is_compact() {
        assert_eq!(WordSize::W32.to_string(), "w32");
    }

    #[test]
    fn parses_both_spellings() {
        assert_eq!("w16".parse::<WordSize>(), Ok(WordSize::W16));
        assert_eq!("64".parse::<WordSize>(), Ok(WordSize::W64));
        assert!("w12".parse::<WordSize>().is_err());
        assert!("wide".parse::<WordSize>().is_err());
    }
}
