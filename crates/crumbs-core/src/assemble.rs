//! Schema assembly.
//!
//! Validates a [`SchemaDoc`], derives the [`GlobalConfig`], numbers
//! categories and entries in declaration order and compiles every entry
//! into the lookup table shared by the code generator and the decoder.
//! The first failure aborts the whole compile; no partial table escapes.

use crate::config::{ByteOrder, GlobalConfig, MAX_WORD_SIZE};
use crate::error::{CrumbError, Result};
use crate::format::referenced_fields;
use crate::layout::{compile_entry, CompiledEntry};
use crate::schema::{CategoryDef, SchemaDoc, TypeDecl};
use crate::types::{is_valid_symbol, resolve, FieldType};
use crate::FILL_SENTINEL;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// Most categories addressable without colliding with the header sentinels.
pub const MAX_CATEGORIES: usize = FILL_SENTINEL as usize;

/// Most entries a category can hold (one id byte).
pub const MAX_ENTRIES_PER_CATEGORY: usize = u8::MAX as usize + 1;

/// Output of [`assemble`]: the compiled entry table plus schema-wide facts.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CompiledSchema {
    /// Configuration derived from the document.
    pub config: GlobalConfig,
    /// CRC32 of the schema file bytes.
    pub crc: u32,
    /// Category names indexed by id.
    pub categories: Vec<String>,
    /// `(category_id, entry_id) → CompiledEntry`, ordered by id.
    #[serde(with = "table_as_seq")]
    pub table: BTreeMap<(u8, u8), CompiledEntry>,
    /// Largest compiled record in bytes.
    pub max_entry_size: usize,
    /// Largest number of entries in one category.
    pub max_entries_per_category: usize,
}

impl CompiledSchema {
    /// Look up the entry a record header points at.
    #[inline]
    #[must_use]
    pub fn entry(&self, category_id: u8, entry_id: u8) -> Option<&CompiledEntry> {
        self.table.get(&(category_id, entry_id))
    }

    /// Entries in id order (category-major).
    pub fn entries(&self) -> impl Iterator<Item = &CompiledEntry> {
        self.table.values()
    }

    /// Number of categories.
    #[inline]
    #[must_use]
    pub fn num_categories(&self) -> usize {
        self.categories.len()
    }

    /// Find an entry by category and entry name.
    #[must_use]
    pub fn find(&self, category: &str, entry: &str) -> Option<&CompiledEntry> {
        self.entries()
            .find(|e| e.category == category && e.name == entry)
    }
}

/// Tuple keys have no JSON representation; the table travels as a list and
/// is re-keyed from each entry's own ids.
mod table_as_seq {
    use super::CompiledEntry;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(
        table: &BTreeMap<(u8, u8), CompiledEntry>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        s.collect_seq(table.values())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<BTreeMap<(u8, u8), CompiledEntry>, D::Error> {
        let entries = Vec::<CompiledEntry>::deserialize(d)?;
        Ok(entries
            .into_iter()
            .map(|e| ((e.category_id, e.id), e))
            .collect())
    }
}

fn optional_type(decl: Option<&TypeDecl>) -> Result<Option<FieldType>> {
    decl.map(TypeDecl::field_type).transpose()
}

/// Top-level keys → configuration.
fn global_config(doc: &SchemaDoc) -> Result<GlobalConfig> {
    let bits = doc.wordsize.ok_or_else(|| {
        CrumbError::schema("definition of word size for target platform required (\"wordsize\": bits)")
    })?;
    let order = doc.byteorder.as_deref().ok_or_else(|| {
        CrumbError::schema("byte order must be specified (\"byteorder\": big|little|network)")
    })?;
    if bits == 0 || bits % 8 != 0 {
        return Err(CrumbError::schema(format!(
            "word size {bits} must be a positive multiple of 8 bits"
        )));
    }
    let word_size = usize::try_from(bits / 8)
        .ok()
        .filter(|&w| w <= MAX_WORD_SIZE)
        .ok_or_else(|| {
            CrumbError::schema(format!(
                "word size {bits} exceeds the maximum of {} bits",
                MAX_WORD_SIZE * 8
            ))
        })?;

    let mut config = GlobalConfig::new(word_size, order.parse::<ByteOrder>()?)?;
    if let Some(scale) = doc.timescale {
        config.timescale = scale;
    }
    config.timestamp = optional_type(doc.timestamp.as_ref())?;
    config.sequence = optional_type(doc.sequence.as_ref())?;
    // Resolved here as well so a bad injected type fails even with no entries.
    for ty in config.timestamp.iter().chain(config.sequence.iter()) {
        resolve(ty)?;
    }
    config.filters = doc.filters.unwrap_or(false);
    Ok(config)
}

/// Structural checks that need the whole category list.
fn check_categories(categories: &[CategoryDef]) -> Result<Vec<String>> {
    if categories.len() > MAX_CATEGORIES {
        return Err(CrumbError::schema(format!(
            "{} categories defined; at most {MAX_CATEGORIES} are addressable",
            categories.len()
        )));
    }

    let mut names = Vec::with_capacity(categories.len());
    let mut seen = HashSet::new();
    for c in categories {
        let name = c
            .name
            .as_ref()
            .ok_or_else(|| CrumbError::schema("category requires a name field"))?;
        if !is_valid_symbol(name) {
            return Err(CrumbError::schema(format!(
                "category name \"{name}\" is not a valid C identifier"
            )));
        }
        if !seen.insert(name.as_str()) {
            return Err(CrumbError::schema(format!(
                "category \"{name}\" previously defined"
            )));
        }
        if c.entries.len() > MAX_ENTRIES_PER_CATEGORY {
            return Err(CrumbError::schema(format!(
                "category \"{name}\" has {} entries; at most {MAX_ENTRIES_PER_CATEGORY} are addressable",
                c.entries.len()
            )));
        }
        let mut entry_names = HashSet::new();
        for e in &c.entries {
            if !is_valid_symbol(&e.name) {
                return Err(CrumbError::schema(format!(
                    "entry name \"{}\" in category \"{name}\" is not a valid C identifier",
                    e.name
                )));
            }
            if !entry_names.insert(e.name.as_str()) {
                return Err(CrumbError::schema(format!(
                    "entry \"{}\" previously defined in category \"{name}\"",
                    e.name
                )));
            }
        }
        names.push(name.clone());
    }
    Ok(names)
}

/// Validate and compile a schema document.
///
/// `crc` is the CRC32 of the raw schema bytes (see [`crate::schema_crc`]);
/// it is carried along for the generated header and the trace guard.
pub fn assemble(doc: &SchemaDoc, crc: u32) -> Result<CompiledSchema> {
    let config = global_config(doc)?;
    let categories = doc
        .categories
        .as_deref()
        .ok_or_else(|| CrumbError::schema("\"categories\" list required"))?;
    let names = check_categories(categories)?;

    let mut table = BTreeMap::new();
    let mut max_entry_size = 0;
    let mut max_entries_per_category = 0;

    // Ids are positional; wire compatibility depends on declaration order.
    for ((cat_id, cat), cat_name) in (0u8..).zip(categories).zip(&names) {
        max_entries_per_category = max_entries_per_category.max(cat.entries.len());
        for (entry_id, def) in (0u8..=u8::MAX).zip(&cat.entries) {
            let entry = compile_entry(cat_name, cat_id, def, entry_id, &config)?;
            for field in referenced_fields(&entry.tokens) {
                if entry.field(field).is_none() {
                    warn!(
                        entry = %entry.qualified_name(),
                        field,
                        "format string references a field the payload does not declare"
                    );
                }
            }
            max_entry_size = max_entry_size.max(entry.size);
            table.insert((cat_id, entry_id), entry);
        }
    }

    debug!(
        categories = names.len(),
        entries = table.len(),
        max_entry_size,
        crc = format_args!("0x{crc:08x}"),
        "assembled schema"
    );

    Ok(CompiledSchema {
        config,
        crc,
        categories: names,
        table,
        max_entry_size,
        max_entries_per_category,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(json: &str) -> SchemaDoc {
        SchemaDoc::from_slice(json.as_bytes()).unwrap()
    }

    fn schema_err(json: &str) -> String {
        match assemble(&doc(json), 0) {
            Err(CrumbError::Schema(m)) => m,
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn ids_follow_declaration_order() {
        let s = assemble(
            &doc(
                r#"{"wordsize": 32, "byteorder": "little", "categories": [
                    {"name": "net", "entries": [
                        {"name": "rx", "payload": {"len": 16}, "format": "%{len}"},
                        {"name": "tx", "payload": {"len": 16}, "format": "%{len}"},
                        {"name": "drop", "payload": {}, "format": "dropped"}
                    ]},
                    {"name": "sys", "entries": [
                        {"name": "boot", "payload": {"code": 8}, "format": "code=%{code}"}
                    ]}
                ]}"#,
            ),
            7,
        )
        .unwrap();
        assert_eq!(s.categories, ["net", "sys"]);
        assert_eq!(s.entry(0, 2).unwrap().name, "drop");
        assert_eq!(s.entry(1, 0).unwrap().qualified_name(), "sys-boot");
        assert_eq!(s.find("net", "tx").unwrap().id, 1);
        assert_eq!(s.max_entries_per_category, 3);
        assert_eq!(s.max_entry_size, 8);
        assert_eq!(s.config.word_size, 4);
        assert_eq!(s.crc, 7);
    }

    #[test]
    fn required_keys_are_enforced() {
        assert!(schema_err(r#"{"byteorder": "big", "categories": []}"#).contains("wordsize"));
        assert!(schema_err(r#"{"wordsize": 32, "categories": []}"#).contains("byteorder"));
        assert!(schema_err(r#"{"wordsize": 32, "byteorder": "big"}"#).contains("categories"));
        assert!(
            schema_err(r#"{"wordsize": 32, "byteorder": "middle", "categories": []}"#)
                .contains("middle")
        );
        schema_err(r#"{"wordsize": 12, "byteorder": "big", "categories": []}"#);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let m = schema_err(
            r#"{"wordsize": 32, "byteorder": "big", "categories": [
                {"name": "a", "entries": []}, {"name": "a", "entries": []}
            ]}"#,
        );
        assert!(m.contains("previously defined"));
        schema_err(
            r#"{"wordsize": 32, "byteorder": "big", "categories": [
                {"name": "a", "entries": [
                    {"name": "e", "format": ""}, {"name": "e", "format": ""}
                ]}
            ]}"#,
        );
        schema_err(r#"{"wordsize": 32, "byteorder": "big", "categories": [{"entries": []}]}"#);
        schema_err(r#"{"wordsize": 32, "byteorder": "big", "categories": [{"name": "my cat"}]}"#);
    }

    #[test]
    fn injected_types_are_resolved_up_front() {
        let r = assemble(
            &doc(r#"{"wordsize": 32, "byteorder": "big", "timestamp": 24, "categories": []}"#),
            0,
        );
        assert!(matches!(r, Err(CrumbError::InvalidFieldSize(_))));
    }

    #[test]
    fn oversized_word_size_is_rejected() {
        let m = schema_err(
            r#"{"wordsize": 8000000000000000, "byteorder": "big", "categories": [
                {"name": "a", "entries": [{"name": "e", "payload": {"x": 8}, "format": ""}]}
            ]}"#,
        );
        assert!(m.contains("word size"), "{m}");
        schema_err(r#"{"wordsize": 520, "byteorder": "big", "categories": []}"#);
        let s = assemble(
            &doc(r#"{"wordsize": 512, "byteorder": "big", "categories": []}"#),
            0,
        )
        .unwrap();
        assert_eq!(s.config.word_size, MAX_WORD_SIZE);
    }

    #[test]
    fn filters_must_be_boolean() {
        for bad in ["\"yes\"", "null"] {
            let json = format!(
                r#"{{"wordsize": 32, "byteorder": "big", "filters": {bad}, "categories": []}}"#
            );
            assert!(
                matches!(SchemaDoc::from_slice(json.as_bytes()), Err(CrumbError::Schema(ref m)) if m.contains("filters")),
                "{bad} should be rejected"
            );
        }
        let s = assemble(
            &doc(r#"{"wordsize": 32, "byteorder": "big", "filters": true, "categories": []}"#),
            0,
        )
        .unwrap();
        assert!(s.config.filters);
    }

    #[test]
    fn malformed_format_aborts_the_compile() {
        schema_err(
            r#"{"wordsize": 32, "byteorder": "big", "categories": [
                {"name": "a", "entries": [{"name": "e", "payload": {"x": 8}, "format": "x=%{x"}]}
            ]}"#,
        );
    }

    #[test]
    fn type_errors_propagate_unchanged() {
        let r = assemble(
            &doc(
                r#"{"wordsize": 32, "byteorder": "big", "categories": [
                    {"name": "a", "entries": [{"name": "e", "payload": {"s": "OK not-ok"}, "format": ""}]}
                ]}"#,
            ),
            0,
        );
        assert!(matches!(r, Err(CrumbError::InvalidSymbolName(s)) if s == "not-ok"));
    }

    #[test]
    fn optional_settings_are_applied() {
        let s = assemble(
            &doc(
                r#"{"wordsize": 64, "byteorder": "network", "timescale": 0.001,
                    "timestamp": 32, "sequence": 16, "categories": []}"#,
            ),
            0,
        )
        .unwrap();
        assert_eq!(s.config.word_size, 8);
        assert!((s.config.timescale - 0.001).abs() < f64::EPSILON);
        assert_eq!(
            s.config.sequence,
            Some(FieldType::Integer {
                bits: 16,
                signed: false
            })
        );
        assert_eq!(s.num_categories(), 0);
    }
}
