//! File helpers for schema input and compiled layout dumps.
//!
//! Schemas are JSON. Compiled layouts can be written as JSON or CBOR with
//! extension-based auto-detection; unknown or missing extensions default to
//! JSON for writes and are rejected for reads.

use crate::{assemble, schema_crc, CompiledSchema, SchemaDoc};
use anyhow::{anyhow, Context, Result};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Ensure the parent directory for a file exists (no-op if none).
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating parent directory {}", display(path)))?;
        }
    }
    Ok(())
}

/// ------------------------------
/// Schema input
/// ------------------------------

/// Read, checksum and compile a schema file.
pub fn load_schema<P: AsRef<Path>>(path: P) -> Result<CompiledSchema> {
    let path_ref = path.as_ref();
    let bytes = fs::read(path_ref).with_context(|| format!("read {}", display(path_ref)))?;
    let doc = SchemaDoc::from_slice(&bytes)
        .with_context(|| format!("parse schema {}", display(path_ref)))?;
    let schema = assemble(&doc, schema_crc(&bytes))
        .with_context(|| format!("compile schema {}", display(path_ref)))?;
    Ok(schema)
}

/// ------------------------------
/// Compiled layout I/O
/// ------------------------------

/// Write a compiled schema to **JSON** (pretty).
pub fn write_layout_json<P: AsRef<Path>>(path: P, v: &CompiledSchema) -> Result<()> {
    let path_ref = path.as_ref();
    ensure_parent_dir(path_ref)?;
    let f = File::create(path_ref).with_context(|| format!("create {}", display(path_ref)))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut w, v).with_context(|| "serialize JSON layout")?;
    w.flush().with_context(|| "flush JSON writer")?;
    Ok(())
}

/// Write a compiled schema to **CBOR**.
pub fn write_layout_cbor<P: AsRef<Path>>(path: P, v: &CompiledSchema) -> Result<()> {
    let path_ref = path.as_ref();
    ensure_parent_dir(path_ref)?;
    let f = File::create(path_ref).with_context(|| format!("create {}", display(path_ref)))?;
    let mut w = BufWriter::new(f);
    ciborium::ser::into_writer(v, &mut w).with_context(|| "serialize CBOR layout")?;
    w.flush().with_context(|| "flush CBOR writer")?;
    Ok(())
}

/// Read a compiled schema from **JSON**.
pub fn read_layout_json<P: AsRef<Path>>(path: P) -> Result<CompiledSchema> {
    let path_ref = path.as_ref();
    let f = File::open(path_ref).with_context(|| format!("open {}", display(path_ref)))?;
    let v = serde_json::from_reader(BufReader::new(f))
        .with_context(|| "deserialize JSON layout")?;
    Ok(v)
}

/// Read a compiled schema from **CBOR**.
pub fn read_layout_cbor<P: AsRef<Path>>(path: P) -> Result<CompiledSchema> {
    let path_ref = path.as_ref();
    let f = File::open(path_ref).with_context(|| format!("open {}", display(path_ref)))?;
    let mut rdr = BufReader::new(f);
    let v = ciborium::de::from_reader(&mut rdr).with_context(|| "deserialize CBOR layout")?;
    Ok(v)
}

/// Auto-detect write (defaults to **JSON** if unknown or missing).
pub fn write_layout_auto<P: AsRef<Path>>(path: P, v: &CompiledSchema) -> Result<()> {
    match ext_lower(path.as_ref()).as_deref() {
        Some("cbor") => write_layout_cbor(path, v),
        _ => write_layout_json(path, v),
    }
}

/// Auto-detect read by extension `.json` / `.cbor` (case-insensitive).
pub fn read_layout_auto<P: AsRef<Path>>(path: P) -> Result<CompiledSchema> {
    match ext_lower(path.as_ref()).as_deref() {
        Some("json") => read_layout_json(path),
        Some("cbor") => read_layout_cbor(path),
        Some(other) => Err(anyhow!(
            "unsupported layout extension: {} (supported: .json, .cbor)",
            other
        )),
        None => Err(anyhow!("path has no extension (expected .json or .cbor)")),
    }
}

/* ---------------- Small helpers ---------------- */

#[inline]
fn ext_lower(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

#[inline]
fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
