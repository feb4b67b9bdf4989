//! Encoder-side emulation.
//!
//! Builds the same bytes a device produces when it logs through the
//! generated header and then dumps its buffer: CRC tag, records packed
//! exactly as the generated structs lay them out, the end-of-trace record
//! and the XOR checksum.

use crate::stream::{xor_checksum, SENTINEL_RECORD};
use crate::value::{pack, Value};
use crumbs_core::{CompiledEntry, CompiledSchema, CrumbError, Result};

/// Accumulates a trace for one schema.
#[derive(Debug)]
pub struct TraceWriter<'a> {
    schema: &'a CompiledSchema,
    buf: Vec<u8>,
    records: usize,
}

impl<'a> TraceWriter<'a> {
    /// Start a trace tagged with the schema CRC.
    #[must_use]
    pub fn new(schema: &'a CompiledSchema) -> Self {
        let buf = schema.config.byte_order.write_u32(schema.crc).to_vec();
        Self {
            schema,
            buf,
            records: 0,
        }
    }

    /// Append a record of `category`-`entry`, filling fields by name.
    ///
    /// Every field of the entry, injected ones included, must be given.
    pub fn record(
        &mut self,
        category: &str,
        entry: &str,
        fields: &[(&str, Value)],
    ) -> Result<&mut Self> {
        let e = self.schema.find(category, entry).ok_or_else(|| {
            CrumbError::schema(format!("no entry {category}-{entry} in the schema"))
        })?;
        self.record_entry(e, fields)
    }

    /// Append a record of an already resolved entry.
    pub fn record_entry(
        &mut self,
        entry: &CompiledEntry,
        fields: &[(&str, Value)],
    ) -> Result<&mut Self> {
        let word = self.schema.config.word_size;
        let mut values = vec![Value::Unsigned(0); entry.pack.len()];
        values[0] = Value::Unsigned(entry.size_code(word) as u64);
        values[1] = Value::Unsigned(u64::from(entry.category_id));
        values[2] = Value::Unsigned(u64::from(entry.id));

        for f in &entry.fields {
            let (_, v) = fields
                .iter()
                .find(|(name, _)| *name == f.name)
                .ok_or_else(|| CrumbError::MissingField {
                    entry: entry.qualified_name(),
                    field: f.name.clone(),
                })?;
            values[f.slot] = *v;
        }

        self.buf.extend(pack(&entry.pack, &values)?);
        self.records += 1;
        Ok(self)
    }

    /// Records written so far.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.records
    }

    /// Whether no record has been written.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.records == 0
    }

    /// Close the trace: end-of-trace record plus checksum.
    #[must_use]
    pub fn finish(mut self) -> Vec<u8> {
        let checksum = xor_checksum(&self.buf);
        self.buf.extend_from_slice(&SENTINEL_RECORD);
        self.buf.push(checksum);
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{EndReason, TraceStream};
    use crumbs_core::{assemble, SchemaDoc};

    fn schema() -> CompiledSchema {
        let doc = SchemaDoc::from_slice(
            br#"{"wordsize": 32, "byteorder": "big", "categories": [
                {"name": "net", "entries": [
                    {"name": "rx", "payload": {"len": 16, "port": 8}, "format": "len=%{len} port=%{port}"}
                ]}]}"#,
        )
        .unwrap();
        assemble(&doc, 0xCAFE_F00D).unwrap()
    }

    #[test]
    fn layout_matches_the_dump_routine() {
        let s = schema();
        let mut w = TraceWriter::new(&s);
        w.record("net", "rx", &[("len", 0x0102u64.into()), ("port", 7u64.into())])
            .unwrap();
        assert_eq!(w.len(), 1);
        let bytes = w.finish();
        // tag, [size, cat, entry, port, len_hi, len_lo, pad, pad], sentinel, xor.
        assert_eq!(&bytes[..4], &[0xCA, 0xFE, 0xF0, 0x0D]);
        assert_eq!(&bytes[4..12], &[1, 0, 0, 7, 0x01, 0x02, 0, 0]);
        assert_eq!(&bytes[12..16], &SENTINEL_RECORD);
        assert_eq!(bytes[16], xor_checksum(&bytes[..12]));
    }

    #[test]
    fn written_traces_decode() {
        let s = schema();
        let mut w = TraceWriter::new(&s);
        w.record("net", "rx", &[("len", 64u64.into()), ("port", 1u64.into())])
            .unwrap()
            .record("net", "rx", &[("len", 65u64.into()), ("port", 2u64.into())])
            .unwrap();
        let bytes = w.finish();
        let mut st = TraceStream::new(&s, &bytes, false);
        let lines: Vec<_> = st.by_ref().map(|r| r.unwrap()).collect();
        assert_eq!(lines, ["net-rx: len=64 port=1", "net-rx: len=65 port=2"]);
        assert_eq!(st.end_reason(), Some(EndReason::EndOfTrace));
    }

    #[test]
    fn missing_fields_are_reported() {
        let s = schema();
        let mut w = TraceWriter::new(&s);
        let err = w.record("net", "rx", &[("len", 1u64.into())]).unwrap_err();
        assert!(matches!(err, CrumbError::MissingField { field, .. } if field == "port"));
        assert!(w.record("net", "tx", &[]).is_err());
        assert!(w.is_empty());
    }
}
