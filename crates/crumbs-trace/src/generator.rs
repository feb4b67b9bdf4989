//! Deterministic synthetic traces, used by the CLI `--simulate` option,
//! the decode bench and round-trip tests.
//!
//! Records are drawn uniformly over every entry of the schema. Payload values
//! cover the full range of their storage (enum indices stay within the
//! symbol list); injected timestamps increase monotonically and sequence
//! numbers count up from zero.

use crate::value::Value;
use crate::writer::TraceWriter;
use crumbs_core::{
    CompiledEntry, CompiledField, CompiledSchema, Result, Storage, SEQUENCE_FIELD, TIMESTAMP_FIELD,
};
use rand::{rngs::StdRng, Rng as _, SeedableRng};

/// Seed used when the caller does not pick one.
pub const DEFAULT_SEED: u64 = 42;

fn random_value(rng: &mut StdRng, field: &CompiledField) -> Value {
    if let Some(symbols) = field.ty.symbols() {
        return Value::Unsigned(rng.random_range(0..symbols.len() as u64));
    }
    match field.storage {
        Storage::U8 => Value::Unsigned(u64::from(rng.random::<u8>())),
        Storage::U16 => Value::Unsigned(u64::from(rng.random::<u16>())),
        Storage::U32 => Value::Unsigned(u64::from(rng.random::<u32>())),
        Storage::U64 => Value::Unsigned(rng.random::<u64>()),
        Storage::I8 => Value::Signed(i64::from(rng.random::<i8>())),
        Storage::I16 => Value::Signed(i64::from(rng.random::<i16>())),
        Storage::I32 => Value::Signed(i64::from(rng.random::<i32>())),
        Storage::I64 => Value::Signed(rng.random::<i64>()),
        // Quarter steps are exact in f32.
        Storage::F32 | Storage::F64 => {
            Value::Float(f64::from(rng.random_range(-1000i16..=1000)) / 4.0)
        }
    }
}

/// One record's field values, in physical order.
#[must_use]
pub fn random_fields(
    rng: &mut StdRng,
    entry: &CompiledEntry,
    timestamp: u64,
    sequence: u64,
) -> Vec<(String, Value)> {
    entry
        .fields
        .iter()
        .map(|f| {
            let v = match f.name.as_str() {
                TIMESTAMP_FIELD => Value::Unsigned(timestamp),
                SEQUENCE_FIELD => Value::Unsigned(sequence),
                _ => random_value(rng, f),
            };
            (f.name.clone(), v)
        })
        .collect()
}

/// Generate a complete trace (tag, `records` records, sentinel, checksum).
///
/// A schema without entries yields an empty trace.
pub fn generate_trace(schema: &CompiledSchema, records: usize, seed: u64) -> Result<Vec<u8>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let entries: Vec<&CompiledEntry> = schema.entries().collect();
    let mut w = TraceWriter::new(schema);
    if entries.is_empty() {
        return Ok(w.finish());
    }

    let mut clock = 0u64;
    for seq in 0..records as u64 {
        clock += rng.random_range(1..=100);
        let entry = entries[rng.random_range(0..entries.len())];
        let owned = random_fields(&mut rng, entry, clock, seq);
        let fields: Vec<(&str, Value)> = owned.iter().map(|(n, v)| (n.as_str(), *v)).collect();
        w.record_entry(entry, &fields)?;
    }
    Ok(w.finish())
}
