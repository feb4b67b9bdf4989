//! Serde model of the JSON schema document.
//!
//! The document is taken mostly as written; semantic validation happens in
//! the assembler so that every rule reports a uniform [`CrumbError::Schema`].
//! Payload maps keep their declaration order (`indexmap`), which matters:
//! ties in the packing sort are broken by it.

use crate::error::{CrumbError, Result};
use crate::types::FieldType;
use indexmap::IndexMap;
use serde::{de, Deserialize, Deserializer, Serialize};

/// Key some schema files wrap the whole document in.
pub const WRAPPER_KEY: &str = "crumbs";

/// A field type as spelled in the schema.
///
/// - integer: bit width, negative for signed (`8`, `-32`, …),
/// - float: `32.0` or `64.0`,
/// - string: space-separated enumeration symbols.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TypeDecl {
    /// Signed-magnitude integer bit width.
    Bits(i64),
    /// Float bit width.
    Float(f64),
    /// Enumeration symbols separated by single spaces.
    Symbols(String),
}

impl TypeDecl {
    /// Convert the declaration into a [`FieldType`].
    ///
    /// Width checks are left to the resolver; this only rejects values that
    /// cannot name a width at all (e.g. `12.5`).
    pub fn field_type(&self) -> Result<FieldType> {
        match self {
            Self::Bits(n) => {
                let bits = u32::try_from(n.unsigned_abs())
                    .map_err(|_| CrumbError::InvalidFieldSize(n.to_string()))?;
                Ok(FieldType::Integer { bits, signed: *n < 0 })
            }
            Self::Float(f) => {
                if f.fract() != 0.0 || *f <= 0.0 || *f > f64::from(u32::MAX) {
                    return Err(CrumbError::InvalidFieldSize(format!(
                        "{f}; floats must be 32.0 or 64.0"
                    )));
                }
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let bits = *f as u32;
                Ok(FieldType::Float { bits })
            }
            Self::Symbols(s) => Ok(FieldType::Enum {
                symbols: s.split(' ').map(str::to_owned).collect(),
            }),
        }
    }
}

/// One log entry ("crumb") definition.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EntryDef {
    /// Entry name, unique within its category.
    pub name: String,
    /// Payload fields in declaration order.
    #[serde(default)]
    pub payload: IndexMap<String, TypeDecl>,
    /// Format string with `%{field}` / `%<spec>{field}` directives.
    pub format: String,
}

/// A named group of entries.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CategoryDef {
    /// Category name, unique across the schema.
    pub name: Option<String>,
    /// Entries in declaration order.
    #[serde(default)]
    pub entries: Vec<EntryDef>,
}

/// The whole schema document.
///
/// Required keys are optional here so that their absence is reported by
/// the assembler with a schema error rather than a serde message.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SchemaDoc {
    /// Target word size in bits.
    pub wordsize: Option<u64>,
    /// `big`, `little` or `network`.
    pub byteorder: Option<String>,
    /// Multiplier for decoded timestamps.
    pub timescale: Option<f64>,
    /// Type of the injected timestamp field.
    pub timestamp: Option<TypeDecl>,
    /// Type of the injected sequence field.
    pub sequence: Option<TypeDecl>,
    /// Filter bitmask switch; must be a boolean when present.
    #[serde(default, deserialize_with = "present_bool")]
    pub filters: Option<bool>,
    /// Categories in declaration order.
    pub categories: Option<Vec<CategoryDef>>,
}

/// Only called for keys that are present, so `null` is rejected too.
fn present_bool<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<bool>, D::Error> {
    bool::deserialize(d)
        .map(Some)
        .map_err(|_| de::Error::custom("the \"filters\" field must be true or false"))
}

impl SchemaDoc {
    /// Parse a schema from raw JSON bytes.
    ///
    /// Accepts the bare document or one wrapped in a top-level `"crumbs"`
    /// object.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let mut root: serde_json::Value = serde_json::from_slice(bytes)
            .map_err(|e| CrumbError::schema(format!("invalid JSON: {e}")))?;
        if let Some(inner) = root.get_mut(WRAPPER_KEY) {
            root = inner.take();
        }
        serde_json::from_value(root).map_err(|e| CrumbError::schema(e.to_string()))
    }
}
