//! C artifact generation for compiled crumb schemas.
//!
//! Two small steps, both pure functions of a [`CompiledSchema`]:
//!
//! - `decl`: build structured declarations (record structs, enums, encoder
//!   functions, id constants, the filter bitmask) from the compiled table.
//! - `render`: turn those declarations into a single C header.
//!
//! Nothing here re-derives layout; offsets, padding and sizes all come from
//! the compiled entries so the generated producer cannot disagree with the
//! decoder.
//!
//! [`CompiledSchema`]: crumbs_core::CompiledSchema

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]

/// Structured declarations derived from the compiled table.
pub mod decl;
/// C header rendering.
pub mod render;

use anyhow::{Context, Result};
use crumbs_core::{io::ensure_parent_dir, CompiledSchema};
use std::path::Path;

/// Default file name of the generated header.
pub const DEFAULT_HEADER: &str = "crumbauto.h";

/// Generate the header text for a compiled schema.
#[must_use]
pub fn generate_header(schema: &CompiledSchema) -> String {
    render::render_header(&decl::declare(schema))
}

/// Generate the header and write it to `path`.
pub fn write_header<P: AsRef<Path>>(path: P, schema: &CompiledSchema) -> Result<()> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    std::fs::write(path, generate_header(schema))
        .with_context(|| format!("write header {}", path.display()))?;
    Ok(())
}
