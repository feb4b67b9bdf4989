//! Field types and the type resolver.
//!
//! A [`FieldType`] is what the schema declares; a [`Storage`] is the concrete
//! fixed-width machine representation it maps onto. Resolution happens once,
//! at compile time, and every later stage works from the resolved storage.

use crate::error::{CrumbError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Largest enumeration that still fits a one-byte index.
pub const MAX_BYTE_SYMBOLS: usize = 256;

/// Largest enumeration that fits a two-byte index.
pub const MAX_SYMBOLS: usize = 64 * 1024;

/// Declared type of a payload field.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FieldType {
    /// Fixed-width integer.
    Integer {
        /// Width in bits as declared (8, 16, 32 or 64 are valid).
        bits: u32,
        /// Two's complement when `true`.
        signed: bool,
    },
    /// IEEE-754 float.
    Float {
        /// Width in bits as declared (32 or 64 are valid).
        bits: u32,
    },
    /// Enumeration stored as an index into `symbols`.
    Enum {
        /// Ordered symbol names.
        symbols: Vec<String>,
    },
}

impl FieldType {
    /// Symbol list for enumerations, `None` for numeric types.
    #[inline]
    #[must_use]
    pub fn symbols(&self) -> Option<&[String]> {
        match self {
            Self::Enum { symbols } => Some(symbols),
            _ => None,
        }
    }

    /// Whether this is an enumeration.
    #[inline]
    #[must_use]
    pub const fn is_enum(&self) -> bool {
        matches!(self, Self::Enum { .. })
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer { bits, signed: true } => write!(f, "-{bits}"),
            Self::Integer { bits, signed: false } => write!(f, "{bits}"),
            Self::Float { bits } => write!(f, "{bits}.0"),
            Self::Enum { symbols } => write!(f, "\"{}\"", symbols.join(" ")),
        }
    }
}

/// Concrete storage of a resolved field.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Storage {
    /// `uint8_t`
    U8,
    /// `uint16_t`
    U16,
    /// `uint32_t`
    U32,
    /// `uint64_t`
    U64,
    /// `int8_t`
    I8,
    /// `int16_t`
    I16,
    /// `int32_t`
    I32,
    /// `int64_t`
    I64,
    /// `float`
    F32,
    /// `double`
    F64,
}

impl Storage {
    /// Width in bytes.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::U64 | Self::I64 | Self::F64 => 8,
        }
    }

    /// Transport code in struct-module notation.
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::U8 => 'B',
            Self::U16 => 'H',
            Self::U32 => 'I',
            Self::U64 => 'Q',
            Self::I8 => 'b',
            Self::I16 => 'h',
            Self::I32 => 'i',
            Self::I64 => 'q',
            Self::F32 => 'f',
            Self::F64 => 'd',
        }
    }

    /// C type name used in generated declarations.
    #[must_use]
    pub const fn c_type(self) -> &'static str {
        match self {
            Self::U8 => "uint8_t",
            Self::U16 => "uint16_t",
            Self::U32 => "uint32_t",
            Self::U64 => "uint64_t",
            Self::I8 => "int8_t",
            Self::I16 => "int16_t",
            Self::I32 => "int32_t",
            Self::I64 => "int64_t",
            Self::F32 => "float",
            Self::F64 => "double",
        }
    }

    /// Integer storage for `bits`, if it is a native C width.
    #[must_use]
    pub const fn integer(bits: u32, signed: bool) -> Option<Self> {
        Some(match (bits, signed) {
            (8, false) => Self::U8,
            (16, false) => Self::U16,
            (32, false) => Self::U32,
            (64, false) => Self::U64,
            (8, true) => Self::I8,
            (16, true) => Self::I16,
            (32, true) => Self::I32,
            (64, true) => Self::I64,
            _ => return None,
        })
    }
}

#[allow(clippy::unwrap_used)]
fn identifier() -> &'static Regex {
    static IDENT: OnceLock<Regex> = OnceLock::new();
    IDENT.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap())
}

/// Whether `s` is usable as a C identifier.
#[must_use]
pub fn is_valid_symbol(s: &str) -> bool {
    identifier().is_match(s)
}

/// Map a declared field type onto its fixed-width storage.
///
/// # Errors
/// - [`CrumbError::InvalidFieldSize`] for integer widths other than
///   8/16/32/64 and float widths other than 32/64,
/// - [`CrumbError::InvalidSymbolName`] for a symbol that is not an identifier,
/// - [`CrumbError::TooManySymbols`] beyond 65536 symbols.
pub fn resolve(ty: &FieldType) -> Result<Storage> {
    match ty {
        FieldType::Integer { bits, signed } => Storage::integer(*bits, *signed).ok_or_else(|| {
            CrumbError::InvalidFieldSize(format!(
                "{ty}; must be the size of a built-in C integer type"
            ))
        }),
        FieldType::Float { bits: 32 } => Ok(Storage::F32),
        FieldType::Float { bits: 64 } => Ok(Storage::F64),
        FieldType::Float { .. } => Err(CrumbError::InvalidFieldSize(format!(
            "{ty}; floats must be 32.0 or 64.0"
        ))),
        FieldType::Enum { symbols } => {
            if let Some(bad) = symbols.iter().find(|s| !is_valid_symbol(s)) {
                return Err(CrumbError::InvalidSymbolName(bad.clone()));
            }
            match symbols.len() {
                n if n <= MAX_BYTE_SYMBOLS => Ok(Storage::U8),
                n if n <= MAX_SYMBOLS => Ok(Storage::U16),
                n => Err(CrumbError::TooManySymbols(n)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(bits: u32, signed: bool) -> FieldType {
        FieldType::Integer { bits, signed }
    }

    fn symbols(n: usize) -> FieldType {
        FieldType::Enum {
            symbols: (0..n).map(|i| format!("S{i}")).collect(),
        }
    }

    #[test]
    fn integers_resolve_to_native_widths() {
        assert_eq!(resolve(&int(8, false)).unwrap(), Storage::U8);
        assert_eq!(resolve(&int(16, true)).unwrap(), Storage::I16);
        assert_eq!(resolve(&int(64, true)).unwrap().width(), 8);
        assert!(matches!(
            resolve(&int(12, false)),
            Err(CrumbError::InvalidFieldSize(_))
        ));
    }

    #[test]
    fn floats_resolve_to_single_and_double() {
        assert_eq!(resolve(&FieldType::Float { bits: 32 }).unwrap(), Storage::F32);
        assert_eq!(resolve(&FieldType::Float { bits: 64 }).unwrap().code(), 'd');
        assert!(matches!(
            resolve(&FieldType::Float { bits: 16 }),
            Err(CrumbError::InvalidFieldSize(_))
        ));
    }

    #[test]
    fn enum_storage_grows_with_symbol_count() {
        assert_eq!(resolve(&symbols(256)).unwrap(), Storage::U8);
        assert_eq!(resolve(&symbols(257)).unwrap(), Storage::U16);
        assert_eq!(resolve(&symbols(65536)).unwrap(), Storage::U16);
        assert!(matches!(
            resolve(&symbols(65537)),
            Err(CrumbError::TooManySymbols(65537))
        ));
    }

    #[test]
    fn enum_symbols_must_be_identifiers() {
        let ty = FieldType::Enum {
            symbols: vec!["IDLE".into(), "2FAST".into()],
        };
        match resolve(&ty) {
            Err(CrumbError::InvalidSymbolName(s)) => assert_eq!(s, "2FAST"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(is_valid_symbol("_private9"));
        assert!(!is_valid_symbol(""));
        assert!(!is_valid_symbol("with-dash"));
    }
}
