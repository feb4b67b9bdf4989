//! Consumer side of crumbs: from raw trace bytes to log lines.
//!
//! Building blocks, all driven by a [`crumbs_core::CompiledSchema`]:
//!
//! - `value`: typed values and positional pack/unpack of a record.
//! - `printf`: single-value printf conversions used by format directives.
//! - `codec`: one record to one formatted line.
//! - `stream`: lazy iteration over a whole trace buffer (CRC guard,
//!   end-of-trace sentinel, checksum trailer).
//! - `writer` / `generator`: the producing side emulated in Rust, for tests,
//!   benches and the CLI `--simulate` option.
//! - `io`: reading and writing trace files.
//!
//! Callers use module paths such as `crumbs_trace::stream::TraceStream`.

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
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

/// Record codec.
pub mod codec;
/// Synthetic trace generator.
pub mod generator;
/// Trace file helpers.
pub mod io;
/// printf-style conversions.
pub mod printf;
/// Trace stream processor.
pub mod stream;
/// Decoded values and pack/unpack.
pub mod value;
/// Encoder-side trace writer.
pub mod writer;
