// crates/crumbs-cli/src/main.rs

#![forbid(unsafe_code)]
#![deny(
    rust_2018_idioms,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo
)]

use anyhow::{Context, Result};
use clap::Parser;
use crumbs_core::{
    io::{load_schema, write_layout_auto},
    CompiledSchema,
};
use crumbs_trace::{
    generator::{generate_trace, DEFAULT_SEED},
    io::{read_trace, write_trace},
    stream::TraceStream,
};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "crumbs",
    about = "Compile crumb schemas, generate C encoders and decode binary traces",
    long_about = "Compile a crumb schema (JSON) into a binary record layout.\n\n\
                  Use --generate to write the C header for the producing side and \
                  --process to turn a binary trace dump back into log lines.",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    /// Crumb definition file (JSON)
    schema: PathBuf,

    /// Generate the C header
    #[arg(short, long)]
    generate: bool,

    /// Output path for the generated header
    #[arg(short, long, default_value = crumbs_codegen::DEFAULT_HEADER)]
    output: PathBuf,

    /// Decode a binary trace and print one line per record
    #[arg(short, long, value_name = "TRACE")]
    process: Option<PathBuf>,

    /// Decode even if the trace was produced with a different definition
    #[arg(short, long)]
    force: bool,

    /// Dump the compiled layout table (CBOR for `.cbor`, JSON otherwise)
    #[arg(long, value_name = "PATH")]
    layout: Option<PathBuf>,

    /// Write a synthetic trace for this schema
    #[arg(long, value_name = "TRACE")]
    simulate: Option<PathBuf>,

    /// Number of records in the synthetic trace
    #[arg(long, default_value_t = 100, requires = "simulate")]
    records: usize,

    /// Seed for the synthetic trace
    #[arg(long, default_value_t = DEFAULT_SEED, requires = "simulate")]
    seed: u64,
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let schema = load_schema(&cli.schema)?;
    info!(
        schema = %cli.schema.display(),
        categories = schema.num_categories(),
        entries = schema.table.len(),
        crc = format_args!("0x{:08x}", schema.crc),
        "compiled crumb definition"
    );

    if let Some(path) = &cli.layout {
        dump_layout(&schema, path)?;
    }
    if cli.generate {
        generate(&schema, &cli.output)?;
    }
    if let Some(path) = &cli.simulate {
        simulate(&schema, path, cli.records, cli.seed)?;
    }
    if let Some(path) = &cli.process {
        process(&schema, path, cli.force)?;
    }
    Ok(())
}

/// Initialize tracing with an env-driven filter (default INFO) on stderr.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

fn dump_layout(schema: &CompiledSchema, path: &Path) -> Result<()> {
    write_layout_auto(path, schema)?;
    info!(path = %path.display(), "wrote compiled layout");
    Ok(())
}

fn generate(schema: &CompiledSchema, output: &Path) -> Result<()> {
    crumbs_codegen::write_header(output, schema)?;
    info!(
        path = %output.display(),
        max_entry_size = schema.max_entry_size,
        "wrote C header"
    );
    Ok(())
}

fn simulate(schema: &CompiledSchema, path: &Path, records: usize, seed: u64) -> Result<()> {
    let bytes = generate_trace(schema, records, seed).context("generate synthetic trace")?;
    write_trace(path, &bytes)?;
    info!(path = %path.display(), records, seed, bytes = bytes.len(), "wrote synthetic trace");
    Ok(())
}

fn process(schema: &CompiledSchema, path: &Path, force: bool) -> Result<()> {
    let bytes = read_trace(path)?;
    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let mut stream = TraceStream::new(schema, &bytes, force);
    let mut decoded = 0usize;
    let mut failure = None;
    for line in stream.by_ref() {
        match line {
            Ok(line) => {
                writeln!(out, "{line}").context("write decoded line")?;
                decoded += 1;
            }
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }
    if let Some(e) = failure {
        out.flush().context("flush stdout")?;
        return Err(e).with_context(|| {
            format!(
                "decode {} at byte {} after {decoded} records",
                path.display(),
                stream.offset()
            )
        });
    }
    out.flush().context("flush stdout")?;
    info!(
        records = decoded,
        bytes = stream.offset(),
        end = ?stream.end_reason(),
        "processed trace"
    );
    Ok(())
}
