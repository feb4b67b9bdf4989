//! Declarations for the generated C header.
//!
//! [`declare`] walks a compiled table once and produces plain data: the
//! renderer never looks at the schema again, and tests can assert on names
//! and values without parsing C.

use crumbs_core::{resolve, CompiledEntry, CompiledField, CompiledSchema, FieldType, Storage};
use serde::Serialize;

/// Raw-word C type used when the word size has no native integer.
const FALLBACK_WORD_TYPE: &str = "size_t";

/// Everything the header declares, in rendering order.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Artifacts {
    /// C type of one machine word (`crumbi_t`).
    pub word_type: &'static str,
    /// `CRUMB_CRC`.
    pub crc: u32,
    /// `CRUMB_SCALE`: bytes per size-code unit.
    pub scale: usize,
    /// `crumbseq_t`, when the schema injects a sequence counter.
    pub sequence: Option<Storage>,
    /// `crumbtime_t`, when the schema injects a timestamp.
    pub timestamp: Option<Storage>,
    /// One struct per entry, in id order.
    pub records: Vec<RecordDecl>,
    /// One enum per enum-typed field.
    pub enums: Vec<EnumDecl>,
    /// One encoder per entry, in id order.
    pub encoders: Vec<EncoderDecl>,
    /// `CRUMB_MAX_ENTRY_SIZE`.
    pub max_entry_size: usize,
    /// `CRUMB_CAT_*` and `CRUMB_ENTRY_*` defines.
    pub constants: Vec<IdConstant>,
    /// Filter bitmask storage.
    pub filters: FilterDecl,
}

/// One struct member.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct MemberDecl {
    /// C type.
    pub c_type: &'static str,
    /// Member name.
    pub name: String,
}

/// `Crumb_<cat>_<entry>_t`.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct RecordDecl {
    /// Typedef name.
    pub type_name: String,
    /// Length of `hdrpadding[]`; omitted when zero.
    pub header_padding: usize,
    /// Payload members in physical order.
    pub fields: Vec<MemberDecl>,
    /// Length of `footerpadding[]`; omitted when zero.
    pub footer_padding: usize,
    /// Expected `sizeof`.
    pub size: usize,
}

/// `Crumb_<cat>_<entry>_<field>_enum`.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct EnumDecl {
    /// Typedef name.
    pub type_name: String,
    /// Field the enum belongs to.
    pub field: String,
    /// Enumerator names, upper-cased, in symbol order.
    pub variants: Vec<String>,
}

/// Right-hand side of one member assignment in an encoder body.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub enum AssignValue {
    /// A literal number.
    Const(usize),
    /// The function parameter of the same name.
    Param(String),
    /// `Crumb_Timestamp()`.
    Timestamp,
    /// `Crumb_Sequence()`.
    Sequence,
}

/// `entry-><member> = <value>;`
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct Assignment {
    /// Record member.
    pub member: String,
    /// Value stored.
    pub value: AssignValue,
}

/// One encoder parameter.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ParamDecl {
    /// C type (an enum typedef for enum fields).
    pub c_type: String,
    /// Parameter name.
    pub name: String,
}

/// `static inline void Crumb_<cat>_<entry>(...)`.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct EncoderDecl {
    /// Function name.
    pub fn_name: String,
    /// Record typedef written by the function.
    pub record_type: String,
    /// Category id passed to `Crumb_Filter`.
    pub category_id: u8,
    /// Entry id passed to `Crumb_Filter`.
    pub entry_id: u8,
    /// Bytes requested from `Crumb_GetEntry`.
    pub size: usize,
    /// Parameters in physical field order, injected fields excluded.
    pub params: Vec<ParamDecl>,
    /// Header assignments followed by one per field.
    pub assignments: Vec<Assignment>,
}

/// A `#define NAME value` id constant.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct IdConstant {
    /// Macro name.
    pub name: String,
    /// Id value.
    pub value: u8,
}

/// `Crumb_Filters_t`.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub struct FilterDecl {
    /// Whether `__CRUMB_FILTERS_ENABLED` is defined.
    pub enabled: bool,
    /// Outer dimension (category words).
    pub categories: usize,
    /// Inner dimension (entry words).
    pub entries: usize,
}

impl FilterDecl {
    /// Total `uint32_t` words of filter storage.
    #[must_use]
    pub const fn words(&self) -> usize {
        self.categories * self.entries
    }
}

fn record_type(e: &CompiledEntry) -> String {
    format!("Crumb_{}_{}_t", e.category, e.name)
}

fn enum_type(e: &CompiledEntry, f: &CompiledField) -> String {
    format!("Crumb_{}_{}_{}_enum", e.category, e.name, f.name)
}

fn record_decl(e: &CompiledEntry) -> RecordDecl {
    RecordDecl {
        type_name: record_type(e),
        header_padding: e.header_padding,
        fields: e
            .fields
            .iter()
            .map(|f| MemberDecl {
                c_type: f.storage.c_type(),
                name: f.name.clone(),
            })
            .collect(),
        footer_padding: e.footer_padding,
        size: e.size,
    }
}

fn enum_decls(e: &CompiledEntry) -> impl Iterator<Item = EnumDecl> + '_ {
    e.fields
        .iter()
        .filter(|f| !f.is_injected())
        .filter_map(move |f| {
            let symbols = f.ty.symbols()?;
            let prefix = format!("CRUMB_{}_{}_{}_", e.category, e.name, f.name).to_uppercase();
            Some(EnumDecl {
                type_name: enum_type(e, f),
                field: f.name.clone(),
                variants: symbols
                    .iter()
                    .map(|s| format!("{prefix}{}", s.to_uppercase()))
                    .collect(),
            })
        })
}

fn encoder_decl(e: &CompiledEntry, word_size: usize) -> EncoderDecl {
    let mut assignments = vec![
        Assignment {
            member: "catid".into(),
            value: AssignValue::Const(usize::from(e.category_id)),
        },
        Assignment {
            member: "entryid".into(),
            value: AssignValue::Const(usize::from(e.id)),
        },
        Assignment {
            member: "size".into(),
            value: AssignValue::Const(e.size_code(word_size)),
        },
    ];
    let mut params = Vec::new();

    for f in &e.fields {
        let value = match f.name.as_str() {
            crumbs_core::TIMESTAMP_FIELD => AssignValue::Timestamp,
            crumbs_core::SEQUENCE_FIELD => AssignValue::Sequence,
            name => {
                let c_type = if f.ty.is_enum() {
                    enum_type(e, f)
                } else {
                    f.storage.c_type().to_owned()
                };
                params.push(ParamDecl {
                    c_type,
                    name: name.to_owned(),
                });
                AssignValue::Param(name.to_owned())
            }
        };
        assignments.push(Assignment {
            member: f.name.clone(),
            value,
        });
    }

    EncoderDecl {
        fn_name: format!("Crumb_{}_{}", e.category, e.name),
        record_type: record_type(e),
        category_id: e.category_id,
        entry_id: e.id,
        size: e.size,
        params,
        assignments,
    }
}

fn id_constants(schema: &CompiledSchema) -> Vec<IdConstant> {
    let mut out = Vec::new();
    for (id, cat) in (0u8..).zip(&schema.categories) {
        out.push(IdConstant {
            name: format!("CRUMB_CAT_{}", cat.to_uppercase()),
            value: id,
        });
        for e in schema.entries().filter(|e| e.category_id == id) {
            out.push(IdConstant {
                name: format!("CRUMB_ENTRY_{}_{}", cat, e.name).to_uppercase(),
                value: e.id,
            });
        }
    }
    out
}

fn filter_decl(schema: &CompiledSchema) -> FilterDecl {
    let word = schema.config.word_size;
    if schema.config.filters {
        FilterDecl {
            enabled: true,
            categories: schema.num_categories().div_ceil(word),
            entries: schema.max_entries_per_category.div_ceil(word),
        }
    } else {
        FilterDecl {
            enabled: false,
            categories: 0,
            entries: 0,
        }
    }
}

fn word_type(word_size: usize) -> &'static str {
    u32::try_from(word_size * 8)
        .ok()
        .and_then(|bits| Storage::integer(bits, false))
        .map_or(FALLBACK_WORD_TYPE, Storage::c_type)
}

/// Build every declaration of the generated header.
#[must_use]
pub fn declare(schema: &CompiledSchema) -> Artifacts {
    let config = &schema.config;
    let injected = |ty: &Option<FieldType>| ty.as_ref().and_then(|t| resolve(t).ok());

    Artifacts {
        word_type: word_type(config.word_size),
        crc: schema.crc,
        scale: config.word_size,
        sequence: injected(&config.sequence),
        timestamp: injected(&config.timestamp),
        records: schema.entries().map(record_decl).collect(),
        enums: schema.entries().flat_map(enum_decls).collect(),
        encoders: schema
            .entries()
            .map(|e| encoder_decl(e, config.word_size))
            .collect(),
        max_entry_size: schema.max_entry_size,
        constants: id_constants(schema),
        filters: filter_decl(schema),
    }
}
