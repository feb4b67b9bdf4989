//! Layout compiler.
//!
//! Records start with a fixed 3-byte header (`size`, `category_id`,
//! `entry_id`). The bytes between the header and the next word boundary form
//! a gap which is filled greedily with the widest payload fields that still
//! fit; whatever is left becomes explicit header padding. The remaining
//! fields follow in width-descending order and the record is padded out to a
//! whole number of words.
//!
//! The packing must be reproduced exactly by every producer and consumer, so
//! the derived [`PackFormat`] is kept next to the field offsets and used for
//! both decoding and test encoding.

use crate::config::{ByteOrder, GlobalConfig, HEADER_SIZE};
use crate::error::{CrumbError, Result};
use crate::format::{parse_format, FormatToken};
use crate::schema::EntryDef;
use crate::types::{is_valid_symbol, resolve, FieldType, Storage};
use crate::{SEQUENCE_FIELD, TIMESTAMP_FIELD};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;
use tracing::debug;

/// One position of a pack format.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum PackCode {
    /// A single raw byte (header byte or padding).
    Byte,
    /// A payload field.
    Field(Storage),
}

impl PackCode {
    /// Bytes covered by this code.
    #[inline]
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Self::Byte => 1,
            Self::Field(s) => s.width(),
        }
    }

    /// Struct-module character.
    #[inline]
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::Byte => 'B',
            Self::Field(s) => s.code(),
        }
    }
}

/// Binary pack/unpack format of one record.
///
/// Each code yields one positional value: three header bytes, one per
/// header-padding byte, one per field (physical order), one per
/// footer-padding byte.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackFormat {
    /// Byte order of multi-byte codes.
    pub byte_order: ByteOrder,
    /// Codes in wire order.
    pub codes: Vec<PackCode>,
}

impl PackFormat {
    /// Number of positional values.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Whether the format is empty (never the case for a compiled entry).
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Total bytes covered.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.codes.iter().map(|c| c.width()).sum()
    }
}

impl fmt::Display for PackFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.byte_order.prefix())?;
        for c in &self.codes {
            write!(f, "{}", c.code())?;
        }
        Ok(())
    }
}

/// A payload field placed in the record.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompiledField {
    /// Field name.
    pub name: String,
    /// Declared type.
    pub ty: FieldType,
    /// Resolved storage.
    pub storage: Storage,
    /// Byte offset from the start of the record.
    pub offset: usize,
    /// Index of this field's value in the unpacked positional tuple.
    pub slot: usize,
}

impl CompiledField {
    /// Width in bytes.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> usize {
        self.storage.width()
    }

    /// Whether the value comes from the runtime rather than a parameter.
    #[must_use]
    pub fn is_injected(&self) -> bool {
        self.name == TIMESTAMP_FIELD || self.name == SEQUENCE_FIELD
    }
}

/// A fully laid-out entry. Immutable once built.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CompiledEntry {
    /// Owning category name.
    pub category: String,
    /// Owning category id.
    pub category_id: u8,
    /// Entry name.
    pub name: String,
    /// Entry id within the category.
    pub id: u8,
    /// Fields in physical order.
    pub fields: Vec<CompiledField>,
    /// Explicit padding bytes right after the header.
    pub header_padding: usize,
    /// Explicit padding bytes at the end of the record.
    pub footer_padding: usize,
    /// Total record size in bytes (multiple of the word size).
    pub size: usize,
    /// Pack/unpack format.
    pub pack: PackFormat,
    /// Format string as written in the schema.
    pub format: String,
    /// Tokenized format string.
    pub tokens: Vec<FormatToken>,
}

impl CompiledEntry {
    /// `<category>-<entry>`, the prefix of every decoded line.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}-{}", self.category, self.name)
    }

    /// Look up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&CompiledField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The injected timestamp field, if the schema configures one.
    #[must_use]
    pub fn timestamp(&self) -> Option<&CompiledField> {
        self.field(TIMESTAMP_FIELD)
    }

    /// Value of the header `size` byte: record words minus one.
    #[must_use]
    pub const fn size_code(&self, word_size: usize) -> usize {
        self.size / word_size - 1
    }
}

/// Payload fields plus injected ones, in declaration order.
fn declared_fields(entry: &EntryDef, config: &GlobalConfig) -> Result<Vec<(String, FieldType)>> {
    let mut fields = entry
        .payload
        .iter()
        .map(|(name, decl)| {
            if !is_valid_symbol(name) {
                return Err(CrumbError::schema(format!(
                    "field name \"{name}\" of entry \"{}\" is not a valid C identifier",
                    entry.name
                )));
            }
            Ok((name.clone(), decl.field_type()?))
        })
        .collect::<Result<Vec<_>>>()?;

    for (name, ty) in [
        (TIMESTAMP_FIELD, &config.timestamp),
        (SEQUENCE_FIELD, &config.sequence),
    ] {
        let Some(ty) = ty else { continue };
        match fields.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = ty.clone(),
            None => fields.push((name.to_owned(), ty.clone())),
        }
    }
    Ok(fields)
}

/// Lay out one entry.
///
/// # Errors
/// Type resolution failures, an unparsable format string, or a record too
/// large for the one-byte size code.
pub fn compile_entry(
    category: &str,
    category_id: u8,
    entry: &EntryDef,
    entry_id: u8,
    config: &GlobalConfig,
) -> Result<CompiledEntry> {
    let qualified = format!("{category}-{}", entry.name);

    let mut sized = Vec::new();
    for (name, ty) in declared_fields(entry, config)? {
        let storage = resolve(&ty).map_err(|e| match e {
            CrumbError::InvalidFieldSize(m) => {
                CrumbError::InvalidFieldSize(format!("{m} (field \"{name}\" of {qualified})"))
            }
            other => other,
        })?;
        sized.push((name, ty, storage));
    }

    // Stable: equal widths keep declaration order.
    sized.sort_by_key(|(_, _, s)| Reverse(s.width()));

    let mut gap = config.header_gap();
    let (mut head, mut tail) = (Vec::new(), Vec::new());
    for f in sized {
        if f.2.width() <= gap {
            gap -= f.2.width();
            head.push(f);
        } else {
            tail.push(f);
        }
    }
    let header_padding = gap;

    let mut codes = vec![PackCode::Byte; HEADER_SIZE + header_padding];
    let mut offset = HEADER_SIZE + header_padding;
    let mut fields = Vec::with_capacity(head.len() + tail.len());
    for (name, ty, storage) in head.into_iter().chain(tail) {
        fields.push(CompiledField {
            name,
            ty,
            storage,
            offset,
            slot: codes.len(),
        });
        codes.push(PackCode::Field(storage));
        offset += storage.width();
    }

    let word = config.word_size;
    let footer_padding = match offset % word {
        0 => 0,
        rem => word - rem,
    };
    codes.extend(std::iter::repeat(PackCode::Byte).take(footer_padding));
    let size = offset + footer_padding;

    if size / word - 1 > usize::from(u8::MAX) {
        return Err(CrumbError::schema(format!(
            "{qualified} is {size} bytes; at most {} words fit the size byte",
            usize::from(u8::MAX) + 1
        )));
    }

    let tokens = parse_format(&entry.format)
        .map_err(|e| CrumbError::schema(format!("{qualified}: {e}")))?;

    let pack = PackFormat {
        byte_order: config.byte_order,
        codes,
    };
    debug!(
        entry = %qualified,
        size,
        header_padding,
        footer_padding,
        pack = %pack,
        "compiled entry layout"
    );

    Ok(CompiledEntry {
        category: category.to_owned(),
        category_id,
        name: entry.name.clone(),
        id: entry_id,
        fields,
        header_padding,
        footer_padding,
        size,
        pack,
        format: entry.format.clone(),
        tokens,
    })
}
