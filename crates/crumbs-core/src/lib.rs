//! crumbs-core: schema model, type resolution and the layout compiler.
//!
//! This crate defines the **stable boundary** used across the crumbs crates:
//! - the schema document as read from JSON (`SchemaDoc`, `TypeDecl`, …),
//! - the explicit per-schema configuration (`GlobalConfig`),
//! - the type resolver mapping declarations onto fixed-width storage,
//! - the layout compiler that packs payload fields into word-aligned records,
//! - the schema assembler that builds the `(category, entry) → CompiledEntry`
//!   table shared by the code generator and the trace decoder.
//!
//! ```no_run
//! use crumbs_core::{assemble, schema_crc, SchemaDoc};
//! # fn main() -> crumbs_core::Result<()> {
//! let bytes = std::fs::read("crumbs.json")?;
//! let doc = SchemaDoc::from_slice(&bytes)?;
//! let schema = assemble(&doc, schema_crc(&bytes))?;
//! for entry in schema.entries() {
//!     println!("{}-{}: {} bytes", entry.category, entry.name, entry.size);
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![deny(missing_docs)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]
// Small, explicit allowlist to keep docs readable and APIs ergonomic.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::doc_markdown
)]

/// Schema assembly: validation, id assignment and the compiled entry table.
pub mod assemble;
/// Per-schema configuration threaded through compilation and decoding.
pub mod config;
/// CRC32 guard shared by generated artifacts and trace streams.
pub mod crc;
/// Error taxonomy shared by every crumbs crate.
pub mod error;
/// Format-string tokenizer and printf conversion specs.
pub mod format;
/// JSON/CBOR helpers for schema input and compiled layout dumps.
pub mod io;
/// Layout compiler: field packing, padding and the pack format.
pub mod layout;
/// Serde model of the JSON schema document.
pub mod schema;
/// Field types and the type resolver.
pub mod types;

// ---- Re-exports for workspace compatibility ----
pub use assemble::{assemble, CompiledSchema};
pub use config::{ByteOrder, GlobalConfig, HEADER_SIZE};
pub use crc::schema_crc;
pub use error::{CrumbError, Result};
pub use format::{Conversion, FormatToken};
pub use layout::{compile_entry, CompiledEntry, CompiledField, PackCode, PackFormat};
pub use schema::{CategoryDef, EntryDef, SchemaDoc, TypeDecl};
pub use types::{resolve, FieldType, Storage};

/// Category byte marking the end of a trace (and wrapped ring-buffer fill).
pub const FILL_SENTINEL: u8 = 0xFE;

/// Name of the injected, clock-driven timestamp field.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Name of the injected, counter-driven sequence field.
pub const SEQUENCE_FIELD: &str = "sequence";

/// Commonly-used items for quick imports.
///
/// ```rust
/// use crumbs_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        assemble::{assemble, CompiledSchema},
        config::{ByteOrder, GlobalConfig},
        error::{CrumbError, Result},
        layout::{CompiledEntry, CompiledField},
        schema::SchemaDoc,
        types::{FieldType, Storage},
    };
}
