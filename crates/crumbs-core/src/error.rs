//! Errors raised while compiling a schema or decoding a trace.
//!
//! Schema and type errors abort compilation before any table exists.
//! Decode errors are fatal to a single record; `UnknownRecord` is fatal to a
//! whole trace pass. `VersionMismatch` is the only recoverable one: callers
//! report it and may continue when forced.

/// Result alias used by all crumbs library crates.
pub type Result<T> = std::result::Result<T, CrumbError>;

/// Everything that can go wrong between a schema file and a decoded line.
#[derive(Debug, thiserror::Error)]
pub enum CrumbError {
    /// Missing or invalid schema content.
    #[error("schema error: {0}")]
    Schema(String),

    /// An integer or float declaration with an unsupported bit width.
    #[error("invalid payload field size {0}")]
    InvalidFieldSize(String),

    /// An enumeration symbol that is not a valid C identifier.
    #[error("\"{0}\" is not a valid C/C++ symbol name")]
    InvalidSymbolName(String),

    /// More enumeration symbols than two bytes can index.
    #[error("too many enumeration symbols ({0}); at most 65536 are supported")]
    TooManySymbols(usize),

    /// A record window shorter than the compiled entry size.
    #[error("truncated record at offset {offset}: need {need} bytes, have {have}")]
    TruncatedRecord {
        /// Byte offset of the record within its buffer.
        offset: usize,
        /// Bytes required by the compiled layout.
        need: usize,
        /// Bytes actually available.
        have: usize,
    },

    /// A format directive names a field the entry does not have.
    #[error("format string of {entry} references unknown field \"{field}\"")]
    UnknownFormatField {
        /// `<category>-<entry>` of the offending entry.
        entry: String,
        /// Field name inside the `%{...}` directive.
        field: String,
    },

    /// A decoded enumeration index outside the symbol list.
    #[error("enum field \"{field}\" decoded index {index} but has {count} symbols")]
    InvalidEnumIndex {
        /// Field name.
        field: String,
        /// Decoded index.
        index: u64,
        /// Number of declared symbols.
        count: usize,
    },

    /// A record header naming an entry the schema does not define.
    #[error("unknown record (category {category}, entry {entry}) at offset {offset}")]
    UnknownRecord {
        /// Category id byte.
        category: u8,
        /// Entry id byte.
        entry: u8,
        /// Byte offset of the record header.
        offset: usize,
    },

    /// The trace was produced against a different schema.
    #[error("schema CRC 0x{expected:08x} does not match trace CRC 0x{found:08x}")]
    VersionMismatch {
        /// CRC of the loaded schema.
        expected: u32,
        /// CRC embedded in the trace.
        found: u32,
    },

    /// A record was written without a value for one of its fields.
    #[error("no value supplied for field \"{field}\" of {entry}")]
    MissingField {
        /// `<category>-<entry>` being written.
        entry: String,
        /// Field lacking a value.
        field: String,
    },

    /// Reading or writing a schema, trace or artifact failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CrumbError {
    /// Shorthand for a [`CrumbError::Schema`] with a formatted message.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }
}
