//! Record codec: one record's bytes to one formatted line.
//!
//! A line is `[<timestamp>] <category>-<entry>: <rendered format>`, where the
//! bracketed timestamp only appears when the schema injects one.

use crate::printf::{format_default, format_value};
use crate::value::{unpack, Value};
use crumbs_core::{
    CompiledEntry, CompiledField, Conversion, CrumbError, FormatToken, GlobalConfig, Result,
};
use std::fmt::Write as _;

/// Reject slices shorter than the entry.
fn check_len(entry: &CompiledEntry, bytes: &[u8]) -> Result<()> {
    if bytes.len() < entry.size {
        return Err(CrumbError::TruncatedRecord {
            offset: 0,
            need: entry.size,
            have: bytes.len(),
        });
    }
    Ok(())
}

/// Decode the payload fields of one record, in physical order.
pub fn decode_values(entry: &CompiledEntry, bytes: &[u8]) -> Result<Vec<(String, Value)>> {
    check_len(entry, bytes)?;
    let values = unpack(&entry.pack, &bytes[..entry.size])?;
    Ok(entry
        .fields
        .iter()
        .map(|f| (f.name.clone(), values[f.slot]))
        .collect())
}

fn render_field(field: &CompiledField, value: Value, conv: Option<&Conversion>) -> Result<String> {
    if let Some(conv) = conv {
        return Ok(format_value(conv, value));
    }
    let Some(symbols) = field.ty.symbols() else {
        return Ok(format_default(value));
    };
    value
        .as_index()
        .and_then(|i| usize::try_from(i).ok())
        .and_then(|i| symbols.get(i))
        .cloned()
        .ok_or_else(|| CrumbError::InvalidEnumIndex {
            field: field.name.clone(),
            index: value.as_index().unwrap_or(u64::MAX),
            count: symbols.len(),
        })
}

/// Decode one record into its formatted line.
///
/// `bytes` must start at the record header and hold at least `entry.size`
/// bytes; anything past that is ignored.
pub fn decode_record(entry: &CompiledEntry, config: &GlobalConfig, bytes: &[u8]) -> Result<String> {
    check_len(entry, bytes)?;
    let values = unpack(&entry.pack, &bytes[..entry.size])?;

    let mut out = String::new();
    if let Some(ts) = entry.timestamp() {
        let t = values[ts.slot].as_f64() * config.timescale;
        let _ = write!(out, "[{t:012.6}] ");
    }
    let _ = write!(out, "{}: ", entry.qualified_name());

    for token in &entry.tokens {
        match token {
            FormatToken::Literal(text) => out.push_str(text),
            FormatToken::Field { name, conversion } => {
                let field = entry.field(name).ok_or_else(|| CrumbError::UnknownFormatField {
                    entry: entry.qualified_name(),
                    field: name.clone(),
                })?;
                out.push_str(&render_field(field, values[field.slot], conversion.as_ref())?);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::pack;
    use crumbs_core::{assemble, CompiledSchema, SchemaDoc};

    fn schema(json: &str) -> CompiledSchema {
        assemble(&SchemaDoc::from_slice(json.as_bytes()).unwrap(), 0).unwrap()
    }

    /// Header values followed by zero padding and the given field values.
    fn encode(e: &CompiledEntry, word: usize, fields: &[Value]) -> Vec<u8> {
        let mut values = vec![Value::Unsigned(0); e.pack.len()];
        values[0] = Value::Unsigned(e.size_code(word) as u64);
        values[1] = Value::Unsigned(u64::from(e.category_id));
        values[2] = Value::Unsigned(u64::from(e.id));
        for (f, v) in e.fields.iter().zip(fields) {
            values[f.slot] = *v;
        }
        pack(&e.pack, &values).unwrap()
    }

    #[test]
    fn single_byte_record_decodes() {
        let s = schema(
            r#"{"wordsize": 32, "byteorder": "little", "categories": [
                {"name": "sys", "entries": [
                    {"name": "boot", "payload": {"code": 8}, "format": "code=%{code}"}
                ]}]}"#,
        );
        let e = s.entry(0, 0).unwrap();
        let line = decode_record(e, &s.config, &[0x00, 0x00, 0x00, 0x05]).unwrap();
        assert_eq!(line, "sys-boot: code=5");
    }

    #[test]
    fn enum_fields_render_symbols() {
        let s = schema(
            r#"{"wordsize": 32, "byteorder": "big", "categories": [
                {"name": "sys", "entries": [
                    {"name": "st", "payload": {"state": "IDLE RUNNING STOPPED"},
                     "format": "state=%{state} raw=%d{state}"}
                ]}]}"#,
        );
        let e = s.entry(0, 0).unwrap();
        let bytes = encode(e, 4, &[Value::Unsigned(1)]);
        assert_eq!(
            decode_record(e, &s.config, &bytes).unwrap(),
            "sys-st: state=RUNNING raw=1"
        );

        let bytes = encode(e, 4, &[Value::Unsigned(3)]);
        assert!(matches!(
            decode_record(e, &s.config, &bytes),
            Err(CrumbError::InvalidEnumIndex { index: 3, count: 3, .. })
        ));
    }

    #[test]
    fn timestamp_prefix_is_scaled() {
        let s = schema(
            r#"{"wordsize": 32, "byteorder": "little", "timestamp": 32, "timescale": 0.001,
                "categories": [{"name": "net", "entries": [
                    {"name": "rx", "payload": {"len": 16}, "format": "len=%{len} hex=%#06x{len}"}
                ]}]}"#,
        );
        let e = s.entry(0, 0).unwrap();
        let mut fields = vec![Value::Unsigned(0); e.fields.len()];
        let len_idx = e.fields.iter().position(|f| f.name == "len").unwrap();
        fields[len_idx] = Value::Unsigned(64);
        let ts_idx = e.fields.iter().position(|f| f.name == "timestamp").unwrap();
        fields[ts_idx] = Value::Unsigned(1500);
        let bytes = encode(e, 4, &fields);
        assert_eq!(
            decode_record(e, &s.config, &bytes).unwrap(),
            "[00001.500000] net-rx: len=64 hex=0x0040"
        );
    }

    #[test]
    fn floats_default_to_truncated_integers() {
        let s = schema(
            r#"{"wordsize": 32, "byteorder": "little", "categories": [
                {"name": "adc", "entries": [
                    {"name": "v", "payload": {"volts": 32.0}, "format": "%{volts} %.2f{volts}"}
                ]}]}"#,
        );
        let e = s.entry(0, 0).unwrap();
        let bytes = encode(e, 4, &[Value::Float(3.75)]);
        assert_eq!(decode_record(e, &s.config, &bytes).unwrap(), "adc-v: 3 3.75");
    }

    #[test]
    fn unknown_field_and_short_input() {
        let s = schema(
            r#"{"wordsize": 32, "byteorder": "little", "categories": [
                {"name": "a", "entries": [
                    {"name": "b", "payload": {"x": 8}, "format": "%{y}"}
                ]}]}"#,
        );
        let e = s.entry(0, 0).unwrap();
        assert!(matches!(
            decode_record(e, &s.config, &[0, 0, 0, 1]),
            Err(CrumbError::UnknownFormatField { field, .. }) if field == "y"
        ));
        assert!(matches!(
            decode_record(e, &s.config, &[0, 0]),
            Err(CrumbError::TruncatedRecord { need: 4, have: 2, .. })
        ));
    }

    #[test]
    fn typed_values_follow_physical_order() {
        let s = schema(
            r#"{"wordsize": 32, "byteorder": "little", "categories": [
                {"name": "a", "entries": [
                    {"name": "b", "payload": {"wide": -32, "small": 8}, "format": ""}
                ]}]}"#,
        );
        let e = s.entry(0, 0).unwrap();
        let bytes = encode(e, 4, &[Value::Unsigned(9), Value::Signed(-4)]);
        let values = decode_values(e, &bytes).unwrap();
        assert_eq!(
            values,
            [
                ("small".to_owned(), Value::Unsigned(9)),
                ("wide".to_owned(), Value::Signed(-4))
            ]
        );
    }
}
