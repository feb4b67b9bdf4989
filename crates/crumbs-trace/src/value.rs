//! Decoded values and the positional pack/unpack of a [`PackFormat`].

use crumbs_core::{ByteOrder, CrumbError, PackCode, PackFormat, Result, Storage};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One decoded field value.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub enum Value {
    /// Unsigned integers, raw bytes and enum indices.
    Unsigned(u64),
    /// Signed integers.
    Signed(i64),
    /// `float` / `double`.
    Float(f64),
}

impl Value {
    /// The value as an enum index, if it is a non-negative integer.
    #[must_use]
    pub fn as_index(self) -> Option<u64> {
        match self {
            Self::Unsigned(v) => Some(v),
            Self::Signed(v) => u64::try_from(v).ok(),
            Self::Float(_) => None,
        }
    }

    /// The value as a float.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Unsigned(v) => v as f64,
            Self::Signed(v) => v as f64,
            Self::Float(v) => v,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsigned(v) => write!(f, "{v}"),
            Self::Signed(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::Unsigned(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Signed(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

/* ---------------- byte order ---------------- */

fn read_bytes<const N: usize>(order: ByteOrder, b: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&b[..N]);
    if !order.is_big_endian() {
        out.reverse();
    }
    out
}

fn write_bytes(order: ByteOrder, be: &[u8], out: &mut Vec<u8>) {
    if order.is_big_endian() {
        out.extend_from_slice(be);
    } else {
        out.extend(be.iter().rev());
    }
}

fn read_one(code: PackCode, order: ByteOrder, b: &[u8]) -> Value {
    let storage = match code {
        PackCode::Byte => return Value::Unsigned(u64::from(b[0])),
        PackCode::Field(s) => s,
    };
    match storage {
        Storage::U8 => Value::Unsigned(u64::from(b[0])),
        Storage::I8 => Value::Signed(i64::from(i8::from_be_bytes([b[0]]))),
        Storage::U16 => Value::Unsigned(u64::from(u16::from_be_bytes(read_bytes(order, b)))),
        Storage::I16 => Value::Signed(i64::from(i16::from_be_bytes(read_bytes(order, b)))),
        Storage::U32 => Value::Unsigned(u64::from(u32::from_be_bytes(read_bytes(order, b)))),
        Storage::I32 => Value::Signed(i64::from(i32::from_be_bytes(read_bytes(order, b)))),
        Storage::U64 => Value::Unsigned(u64::from_be_bytes(read_bytes(order, b))),
        Storage::I64 => Value::Signed(i64::from_be_bytes(read_bytes(order, b))),
        Storage::F32 => Value::Float(f64::from(f32::from_be_bytes(read_bytes(order, b)))),
        Storage::F64 => Value::Float(f64::from_be_bytes(read_bytes(order, b))),
    }
}

/// Integer bit pattern of a value, truncated the way a C assignment would.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn raw_bits(v: Value) -> u64 {
    match v {
        Value::Unsigned(u) => u,
        Value::Signed(i) => i as u64,
        Value::Float(f) => f as i64 as u64,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn write_one(code: PackCode, order: ByteOrder, v: Value, out: &mut Vec<u8>) {
    let storage = match code {
        PackCode::Byte => {
            out.push(raw_bits(v) as u8);
            return;
        }
        PackCode::Field(s) => s,
    };
    let bits = raw_bits(v);
    match storage {
        Storage::U8 | Storage::I8 => out.push(bits as u8),
        Storage::U16 | Storage::I16 => write_bytes(order, &(bits as u16).to_be_bytes(), out),
        Storage::U32 | Storage::I32 => write_bytes(order, &(bits as u32).to_be_bytes(), out),
        Storage::U64 | Storage::I64 => write_bytes(order, &bits.to_be_bytes(), out),
        Storage::F32 => write_bytes(order, &(v.as_f64() as f32).to_be_bytes(), out),
        Storage::F64 => write_bytes(order, &v.as_f64().to_be_bytes(), out),
    }
}

/* ---------------- positional pack/unpack ---------------- */

/// Unpack exactly `pack.byte_len()` bytes into one value per code.
pub fn unpack(pack: &PackFormat, bytes: &[u8]) -> Result<Vec<Value>> {
    let need = pack.byte_len();
    if bytes.len() < need {
        return Err(CrumbError::TruncatedRecord {
            offset: 0,
            need,
            have: bytes.len(),
        });
    }
    let mut at = 0;
    let mut out = Vec::with_capacity(pack.len());
    for &code in &pack.codes {
        out.push(read_one(code, pack.byte_order, &bytes[at..]));
        at += code.width();
    }
    Ok(out)
}

/// Pack one value per code into bytes.
pub fn pack(pack: &PackFormat, values: &[Value]) -> Result<Vec<u8>> {
    if values.len() != pack.len() {
        return Err(CrumbError::schema(format!(
            "pack format {pack} takes {} values, got {}",
            pack.len(),
            values.len()
        )));
    }
    let mut out = Vec::with_capacity(pack.byte_len());
    for (&code, &v) in pack.codes.iter().zip(values) {
        write_one(code, pack.byte_order, v, &mut out);
    }
    Ok(out)
}
