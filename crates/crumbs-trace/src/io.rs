//! File helpers for binary trace dumps.
//!
//! Traces are raw bytes as produced by the device dump routine; these
//! helpers only move them between disk and memory.

use anyhow::{Context, Result};
use crumbs_core::io::ensure_parent_dir;
use std::fs;
use std::path::Path;

/// Read a binary trace.
pub fn read_trace<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let path_ref = path.as_ref();
    fs::read(path_ref).with_context(|| format!("read trace {}", display(path_ref)))
}

/// Write a binary trace, creating parent directories.
pub fn write_trace<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<()> {
    let path_ref = path.as_ref();
    ensure_parent_dir(path_ref)?;
    fs::write(path_ref, bytes).with_context(|| format!("write trace {}", display(path_ref)))?;
    Ok(())
}

#[inline]
fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
