//! Trace stream processor.
//!
//! A trace is the schema CRC (one `u32` in the configured byte order),
//! followed by records, followed by a record header whose category byte is
//! the fill sentinel. The producer's dump routine additionally writes the XOR
//! of every preceding byte right after the 4-byte sentinel record.
//!
//! [`TraceStream`] walks that buffer lazily and yields one decoded line per
//! record. The first error ends the stream: nothing after a bad record is
//! trusted.

use crate::codec::decode_record;
use crumbs_core::{CompiledSchema, CrumbError, Result, FILL_SENTINEL, HEADER_SIZE};
use tracing::{debug, warn};

/// Bytes of the leading CRC tag.
pub const TAG_SIZE: usize = 4;

/// Bytes of the end-of-trace record written by the dump routine.
pub const SENTINEL_RECORD: [u8; 4] = [0x00, FILL_SENTINEL, 0x00, 0x00];

/// Why a stream stopped yielding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndReason {
    /// Reached the fill sentinel.
    EndOfTrace,
    /// Tag did not match the schema CRC and `force` was off.
    VersionMismatch,
    /// Ran out of bytes before a sentinel.
    OutOfData,
    /// Yielded an error.
    Fatal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Start,
    Scanning,
    Terminated(EndReason),
}

/// Compare the leading tag of a trace against the schema CRC.
pub fn check_version(schema: &CompiledSchema, bytes: &[u8]) -> Result<()> {
    let tag: [u8; TAG_SIZE] = bytes
        .get(..TAG_SIZE)
        .and_then(|b| b.try_into().ok())
        .ok_or(CrumbError::TruncatedRecord {
            offset: 0,
            need: TAG_SIZE,
            have: bytes.len(),
        })?;
    let found = schema.config.byte_order.read_u32(tag);
    if found == schema.crc {
        Ok(())
    } else {
        Err(CrumbError::VersionMismatch {
            expected: schema.crc,
            found,
        })
    }
}

/// XOR of every byte, as computed by the dump routine.
#[must_use]
pub fn xor_checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

/// Lazy iterator of decoded lines over one trace buffer.
#[derive(Debug)]
pub struct TraceStream<'a> {
    schema: &'a CompiledSchema,
    bytes: &'a [u8],
    force: bool,
    offset: usize,
    state: State,
}

impl<'a> TraceStream<'a> {
    /// Start a pass over `bytes`. `force` decodes even when the CRC tag does
    /// not match the schema.
    #[must_use]
    pub const fn new(schema: &'a CompiledSchema, bytes: &'a [u8], force: bool) -> Self {
        Self {
            schema,
            bytes,
            force,
            offset: TAG_SIZE,
            state: State::Start,
        }
    }

    /// Why the stream stopped, once it has.
    #[must_use]
    pub const fn end_reason(&self) -> Option<EndReason> {
        match self.state {
            State::Terminated(r) => Some(r),
            _ => None,
        }
    }

    /// Byte offset of the next record header.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    fn stop(&mut self, reason: EndReason) {
        self.state = State::Terminated(reason);
    }

    fn fail(&mut self, err: CrumbError) -> Option<Result<String>> {
        self.stop(EndReason::Fatal);
        Some(Err(err))
    }

    /// Version guard, then the first record.
    fn start(&mut self) -> Option<Result<String>> {
        match check_version(self.schema, self.bytes) {
            Ok(()) => {}
            Err(e @ CrumbError::TruncatedRecord { .. }) => return self.fail(e),
            Err(e) => {
                warn!(
                    error = %e,
                    "crumb definition does not match the one used to produce the trace; \
                     use force to process it anyway"
                );
                if !self.force {
                    self.stop(EndReason::VersionMismatch);
                    return None;
                }
            }
        }
        self.state = State::Scanning;
        self.scan()
    }

    /// Sentinel reached: verify the optional checksum trailer.
    fn finish(&mut self) {
        let at = self.offset;
        if let Some(&stored) = self.bytes.get(at + SENTINEL_RECORD.len()) {
            let computed = xor_checksum(&self.bytes[..at]);
            if stored == computed {
                debug!(checksum = stored, "trace checksum verified");
            } else {
                warn!(stored, computed, "trace checksum mismatch");
            }
        }
        self.stop(EndReason::EndOfTrace);
    }

    fn scan(&mut self) -> Option<Result<String>> {
        let at = self.offset;
        let Some(header) = self.bytes.get(at..at + HEADER_SIZE) else {
            warn!(
                offset = at,
                len = self.bytes.len(),
                "trace ended without an end-of-trace marker"
            );
            self.stop(EndReason::OutOfData);
            return None;
        };
        let (size, category, entry_id) = (header[0], header[1], header[2]);
        if category == FILL_SENTINEL {
            self.finish();
            return None;
        }

        let Some(entry) = self.schema.entry(category, entry_id) else {
            return self.fail(CrumbError::UnknownRecord {
                category,
                entry: entry_id,
                offset: at,
            });
        };

        let end = at + (usize::from(size) + 1) * self.schema.config.word_size;
        let Some(record) = self.bytes.get(at..end) else {
            return self.fail(CrumbError::TruncatedRecord {
                offset: at,
                need: end - at,
                have: self.bytes.len() - at,
            });
        };
        debug!(
            offset = at,
            entry = %entry.qualified_name(),
            raw = %hex::encode(record),
            "record"
        );

        match decode_record(entry, &self.schema.config, record) {
            Ok(line) => {
                self.offset = end;
                Some(Ok(line))
            }
            Err(CrumbError::TruncatedRecord { need, have, .. }) => {
                self.fail(CrumbError::TruncatedRecord {
                    offset: at,
                    need,
                    have,
                })
            }
            Err(e) => self.fail(e),
        }
    }
}

impl Iterator for TraceStream<'_> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.state {
            State::Start => self.start(),
            State::Scanning => self.scan(),
            State::Terminated(_) => None,
        }
    }
}

impl std::iter::FusedIterator for TraceStream<'_> {}
