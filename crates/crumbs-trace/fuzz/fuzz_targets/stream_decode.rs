#![no_main]
use crumbs_core::{assemble, CompiledSchema, SchemaDoc};
use crumbs_trace::stream::TraceStream;
use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;

const SCHEMA: &[u8] = br#"{"wordsize": 32, "byteorder": "little", "timestamp": 32, "categories": [
    {"name": "sys", "entries": [
        {"name": "boot", "payload": {"code": 8}, "format": "code=%{code} %#x{code}"},
        {"name": "state", "payload": {"state": "IDLE RUNNING"}, "format": "state=%{state}"}
    ]},
    {"name": "adc", "entries": [
        {"name": "v", "payload": {"volts": 64.0, "ch": -16}, "format": "%{ch} %g{volts} %s{volts}"}
    ]}]}"#;

fn schema() -> &'static CompiledSchema {
    static SCHEMA_CELL: OnceLock<CompiledSchema> = OnceLock::new();
    SCHEMA_CELL.get_or_init(|| {
        let doc = SchemaDoc::from_slice(SCHEMA).unwrap();
        assemble(&doc, 0).unwrap()
    })
}

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must end the stream, never panic.
    for line in TraceStream::new(schema(), data, true) {
        let _ = line;
    }
});
