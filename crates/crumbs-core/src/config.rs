//! Per-schema configuration.
//!
//! Everything the layout compiler and the decoder need to agree on lives in
//! one [`GlobalConfig`] value built by the assembler and passed explicitly.

use crate::error::{CrumbError, Result};
use crate::types::FieldType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest supported word size in bytes (512-bit words).
pub const MAX_WORD_SIZE: usize = 64;

/// Size of the fixed record header (`size`, `category_id`, `entry_id`).
pub const HEADER_SIZE: usize = 3;

/// Byte order of multi-byte fields on the wire.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    /// Most significant byte first.
    Big,
    /// Least significant byte first.
    Little,
    /// Network order; identical to [`ByteOrder::Big`].
    Network,
}

impl ByteOrder {
    /// Whether multi-byte values are stored most significant byte first.
    #[inline]
    #[must_use]
    pub const fn is_big_endian(self) -> bool {
        matches!(self, Self::Big | Self::Network)
    }

    /// Struct-module style prefix character (`>`, `<` or `!`).
    #[must_use]
    pub const fn prefix(self) -> char {
        match self {
            Self::Big => '>',
            Self::Little => '<',
            Self::Network => '!',
        }
    }

    /// Read a `u32` from the first four bytes of `b`.
    #[must_use]
    pub fn read_u32(self, b: [u8; 4]) -> u32 {
        if self.is_big_endian() {
            u32::from_be_bytes(b)
        } else {
            u32::from_le_bytes(b)
        }
    }

    /// Encode a `u32` in this byte order.
    #[must_use]
    pub fn write_u32(self, v: u32) -> [u8; 4] {
        if self.is_big_endian() {
            v.to_be_bytes()
        } else {
            v.to_le_bytes()
        }
    }
}

impl FromStr for ByteOrder {
    type Err = CrumbError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "big" => Ok(Self::Big),
            "little" => Ok(Self::Little),
            "network" => Ok(Self::Network),
            other => Err(CrumbError::schema(format!(
                "invalid byte order \"{other}\"; must be big|little|network"
            ))),
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Big => "big",
            Self::Little => "little",
            Self::Network => "network",
        })
    }
}

/// Process-wide settings derived once from the schema document.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GlobalConfig {
    /// Target word size in bytes; every record is a multiple of it.
    pub word_size: usize,
    /// Wire byte order.
    pub byte_order: ByteOrder,
    /// Multiplier applied to decoded timestamps.
    pub timescale: f64,
    /// Type of the injected clock field, if any.
    pub timestamp: Option<FieldType>,
    /// Type of the injected sequence counter, if any.
    pub sequence: Option<FieldType>,
    /// Whether a per-category/per-entry filter bitmask is generated.
    pub filters: bool,
}

impl GlobalConfig {
    /// Minimal configuration: no injected fields, unit timescale, no filters.
    ///
    /// # Errors
    /// Fails if `word_size` is zero or above [`MAX_WORD_SIZE`].
    pub fn new(word_size: usize, byte_order: ByteOrder) -> Result<Self> {
        if word_size == 0 {
            return Err(CrumbError::schema("word size must be positive"));
        }
        if word_size > MAX_WORD_SIZE {
            return Err(CrumbError::schema(format!(
                "word size of {word_size} bytes exceeds the {MAX_WORD_SIZE}-byte maximum"
            )));
        }
        Ok(Self {
            word_size,
            byte_order,
            timescale: 1.0,
            timestamp: None,
            sequence: None,
            filters: false,
        })
    }

    /// Bytes between the 3-byte header and the next word boundary.
    #[inline]
    #[must_use]
    pub const fn header_gap(&self) -> usize {
        match HEADER_SIZE % self.word_size {
            0 => 0,
            rem => self.word_size - rem,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_gap_per_word_size() {
        let gap = |w| GlobalConfig::new(w, ByteOrder::Little).unwrap().header_gap();
        assert_eq!(gap(1), 0);
        assert_eq!(gap(2), 1);
        assert_eq!(gap(3), 0);
        assert_eq!(gap(4), 1);
        assert_eq!(gap(8), 5);
    }

    #[test]
    fn byte_order_parses_case_insensitively() {
        assert_eq!("BIG".parse::<ByteOrder>().unwrap(), ByteOrder::Big);
        assert_eq!("Network".parse::<ByteOrder>().unwrap(), ByteOrder::Network);
        assert!(matches!(
            "middle".parse::<ByteOrder>(),
            Err(CrumbError::Schema(_))
        ));
    }

    #[test]
    fn network_order_is_big_endian() {
        assert_eq!(ByteOrder::Network.write_u32(0x0102_0304), [1, 2, 3, 4]);
        assert_eq!(ByteOrder::Little.read_u32([4, 3, 2, 1]), 0x0102_0304);
    }

    #[test]
    fn word_size_is_bounded() {
        assert!(GlobalConfig::new(0, ByteOrder::Big).is_err());
        assert!(GlobalConfig::new(MAX_WORD_SIZE, ByteOrder::Big).is_ok());
        assert!(matches!(
            GlobalConfig::new(MAX_WORD_SIZE + 1, ByteOrder::Big),
            Err(CrumbError::Schema(_))
        ));
    }
}
