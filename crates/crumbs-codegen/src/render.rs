//! C header text.
//!
//! Layout of the generated file: include guard, word/CRC globals, injected
//! counter typedefs, `Crumb_Header_t`, record structs, id constants, filter
//! storage, then enums and the encoder functions that use all of the above.

use crate::decl::{
    AssignValue, Artifacts, EncoderDecl, EnumDecl, FilterDecl, IdConstant, RecordDecl,
};
use std::fmt::Write as _;

/// Include guard macro.
pub const INCLUDE_GUARD: &str = "__CRUMBSAUTO_H__";

const HEADER_STRUCT: &str = "typedef struct {
    uint8_t         size;
    uint8_t         catid;
    uint8_t         entryid;
    uint8_t         rsvd;
} Crumb_Header_t;
";

// `write!` into a `String` cannot fail; the results below are discarded.

fn globals(out: &mut String, a: &Artifacts) {
    let _ = writeln!(out, "typedef {} crumbi_t;", a.word_type);
    let _ = writeln!(out, "static const uint32_t CRUMB_CRC = 0x{:08x};", a.crc);
    let _ = writeln!(out, "static const size_t CRUMB_SCALE = {};", a.scale);
    out.push('\n');

    if let Some(s) = a.sequence {
        let _ = writeln!(out, "typedef {} crumbseq_t;", s.c_type());
        out.push_str("crumbseq_t Crumb_Sequence(void);\n");
    }
    if let Some(s) = a.timestamp {
        let _ = writeln!(out, "typedef {} crumbtime_t;", s.c_type());
        out.push_str("crumbtime_t Crumb_Timestamp(void);\n");
    }
    out.push_str("void* Crumb_GetEntry(size_t size);\n\n");
    out.push_str(HEADER_STRUCT);
    out.push('\n');
}

fn record(out: &mut String, r: &RecordDecl) {
    out.push_str("typedef struct {\n");
    out.push_str("    uint8_t size;\n    uint8_t catid;\n    uint8_t entryid;\n");
    if r.header_padding > 0 {
        let _ = writeln!(out, "    uint8_t hdrpadding[{}];", r.header_padding);
    }
    for m in &r.fields {
        let _ = writeln!(out, "    {} {};", m.c_type, m.name);
    }
    if r.footer_padding > 0 {
        let _ = writeln!(out, "    uint8_t footerpadding[{}];", r.footer_padding);
    }
    let _ = writeln!(out, "}} {}; /* {} bytes */\n", r.type_name, r.size);
}

fn constants(out: &mut String, max_entry_size: usize, ids: &[IdConstant]) {
    let _ = writeln!(out, "#define CRUMB_MAX_ENTRY_SIZE   {max_entry_size}");
    for c in ids {
        let _ = writeln!(out, "#define {}   {}", c.name, c.value);
    }
    out.push('\n');
}

fn filters(out: &mut String, f: FilterDecl) {
    out.push_str("typedef struct {\n");
    if f.enabled {
        let _ = writeln!(out, "    uint32_t    filters[{}][{}];", f.categories, f.entries);
    } else {
        out.push_str("    uint32_t    filters[0];\n");
    }
    out.push_str("} Crumb_Filters_t;\n\nextern Crumb_Filters_t __crumb_filters;\n");
    if f.enabled {
        out.push_str("#define __CRUMB_FILTERS_ENABLED\n");
    }
    out.push('\n');
}

fn enumeration(out: &mut String, e: &EnumDecl) {
    out.push_str("typedef enum {\n");
    for v in &e.variants {
        let _ = writeln!(out, "    {v},");
    }
    let _ = writeln!(out, "}} {};\n", e.type_name);
}

fn encoder(out: &mut String, e: &EncoderDecl) {
    let params = if e.params.is_empty() {
        "void".to_owned()
    } else {
        e.params
            .iter()
            .map(|p| format!("{} {}", p.c_type, p.name))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let _ = writeln!(out, "static inline void {}({params}) {{", e.fn_name);
    let _ = writeln!(
        out,
        "    if (Crumb_Filter(0x{:x}, 0x{:x})) {{",
        e.category_id, e.entry_id
    );
    let _ = writeln!(out, "        {}      *entry;\n", e.record_type);
    let _ = writeln!(
        out,
        "        entry = ({}*)Crumb_GetEntry({});",
        e.record_type, e.size
    );
    for a in &e.assignments {
        let value = match &a.value {
            AssignValue::Const(n) => n.to_string(),
            AssignValue::Param(p) => p.clone(),
            AssignValue::Timestamp => "Crumb_Timestamp()".to_owned(),
            AssignValue::Sequence => "Crumb_Sequence()".to_owned(),
        };
        let _ = writeln!(out, "        entry->{} = {value};", a.member);
    }
    out.push_str("    }\n}\n\n");
}

/// Render the complete header.
#[must_use]
pub fn render_header(a: &Artifacts) -> String {
    let mut out = String::new();
    out.push_str("/* This is an auto-generated file, do not modify\n */\n");
    let _ = writeln!(out, "#ifndef {INCLUDE_GUARD}\n#define {INCLUDE_GUARD}\n");
    out.push_str("#include <stddef.h>\n#include <stdint.h>\n\n");

    globals(&mut out, a);
    for r in &a.records {
        record(&mut out, r);
    }
    constants(&mut out, a.max_entry_size, &a.constants);
    filters(&mut out, a.filters);
    for e in &a.enums {
        enumeration(&mut out, e);
    }
    for e in &a.encoders {
        encoder(&mut out, e);
    }

    let _ = writeln!(out, "#endif /* {INCLUDE_GUARD} */");
    out
}
