//! End-to-end header generation from a schema document.

use crumbs_codegen::{decl::declare, generate_header, write_header};
use crumbs_core::{assemble, schema_crc, CompiledSchema, SchemaDoc};

const SCHEMA: &str = r#"{
    "crumbs": {
        "wordsize": 32,
        "byteorder": "little",
        "timestamp": 32,
        "filters": true,
        "categories": [
            {"name": "sys", "entries": [
                {"name": "boot", "payload": {"code": 8}, "format": "code=%{code}"},
                {"name": "state", "payload": {"state": "IDLE RUNNING STOPPED"},
                 "format": "state=%{state}"}
            ]},
            {"name": "net", "entries": [
                {"name": "rx", "payload": {"len": 16, "rssi": -8}, "format": "len=%{len} rssi=%{rssi}"}
            ]}
        ]
    }
}"#;

fn compiled() -> CompiledSchema {
    let doc = SchemaDoc::from_slice(SCHEMA.as_bytes()).unwrap();
    assemble(&doc, schema_crc(SCHEMA.as_bytes())).unwrap()
}

#[test]
fn header_declares_every_entry() {
    let schema = compiled();
    let h = generate_header(&schema);

    assert!(h.contains("#ifndef __CRUMBSAUTO_H__"));
    assert!(h.trim_end().ends_with("#endif /* __CRUMBSAUTO_H__ */"));
    assert!(h.contains("typedef uint32_t crumbi_t;"));
    assert!(h.contains(&format!("CRUMB_CRC = 0x{:08x};", schema.crc)));
    assert!(h.contains("CRUMB_SCALE = 4;"));
    assert!(h.contains("typedef uint32_t crumbtime_t;"));
    assert!(!h.contains("crumbseq_t"));

    for ty in ["Crumb_sys_boot_t", "Crumb_sys_state_t", "Crumb_net_rx_t"] {
        assert!(h.contains(&format!("}} {ty};")), "missing struct {ty}");
    }
    assert!(h.contains("static inline void Crumb_sys_boot(uint8_t code)"));
    assert!(h.contains("static inline void Crumb_sys_state(Crumb_sys_state_state_enum state)"));
    assert!(h.contains("CRUMB_SYS_STATE_STATE_RUNNING,"));
    assert!(h.contains("#define CRUMB_CAT_NET   1"));
    assert!(h.contains("#define CRUMB_ENTRY_SYS_STATE   1"));
    assert!(h.contains("#define __CRUMB_FILTERS_ENABLED"));
    assert!(h.contains(&format!(
        "#define CRUMB_MAX_ENTRY_SIZE   {}",
        schema.max_entry_size
    )));
}

#[test]
fn declarations_never_rederive_layout() {
    let schema = compiled();
    let a = declare(&schema);
    for (r, e) in a.records.iter().zip(schema.entries()) {
        assert_eq!(r.size, e.size);
        assert_eq!(r.header_padding, e.header_padding);
        assert_eq!(r.footer_padding, e.footer_padding);
        let names: Vec<_> = e.fields.iter().map(|f| f.name.as_str()).collect();
        let members: Vec<_> = r.fields.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, members);
    }
    for (enc, e) in a.encoders.iter().zip(schema.entries()) {
        assert!(enc.params.iter().all(|p| p.name != "timestamp"));
        assert_eq!(enc.assignments.len(), 3 + e.fields.len());
    }
}

#[test]
fn header_is_written_to_disk() {
    let dir = std::env::temp_dir().join(format!("crumbs-codegen-{}", std::process::id()));
    let path = dir.join("out").join("crumbauto.h");
    write_header(&path, &compiled()).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("Crumb_Header_t"));
    let _ = std::fs::remove_dir_all(&dir);
}
