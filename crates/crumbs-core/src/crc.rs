//! CRC32 guard.
//!
//! The CRC of the schema file's raw bytes is compiled into the generated
//! header and written as the first word of every trace dump; the decoder
//! compares the two before trusting any record layout.

/// Standard (IEEE, zlib-compatible) CRC32 of the schema file contents.
#[inline]
#[must_use]
pub fn schema_crc(bytes: &[u8]) -> u32 {
    crc32fast::hash(bytes)
}
