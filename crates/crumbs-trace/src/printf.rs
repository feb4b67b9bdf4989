//! Single-value printf formatting.
//!
//! Follows the conventions of Python's `%` operator rather than C's where the
//! two differ: `%#o` prints `0o`, `%s` of a float prints its shortest
//! round-trip form (`1.0`, `1e+20`), and precision on integer conversions is
//! a minimum digit count. Integer conversions of float values truncate
//! toward zero.

use crate::value::Value;
use crumbs_core::Conversion;

/// Default precision of `e`, `f` and `g`.
const DEFAULT_PRECISION: usize = 6;

/// Formatted text before padding.
struct Body {
    negative: bool,
    prefix: &'static str,
    digits: String,
    /// Sign flags apply.
    signed: bool,
    /// The `0` flag pads with zeros.
    zero_pad: bool,
}

impl Body {
    const fn number(negative: bool, prefix: &'static str, digits: String) -> Self {
        Self {
            negative,
            prefix,
            digits,
            signed: true,
            zero_pad: true,
        }
    }

    const fn text(digits: String) -> Self {
        Self {
            negative: false,
            prefix: "",
            digits,
            signed: false,
            zero_pad: false,
        }
    }
}

fn pad(conv: &Conversion, body: Body) -> String {
    let flags = conv.flags;
    let sign = match (body.signed, body.negative) {
        (true, true) => "-",
        (true, false) if flags.plus => "+",
        (true, false) if flags.space => " ",
        _ => "",
    };
    let len = sign.len() + body.prefix.len() + body.digits.chars().count();
    let fill = conv.width.unwrap_or(0).saturating_sub(len);

    let mut out = String::with_capacity(len + fill);
    if flags.left {
        out.push_str(sign);
        out.push_str(body.prefix);
        out.push_str(&body.digits);
        out.extend(std::iter::repeat(' ').take(fill));
    } else if flags.zero && body.zero_pad {
        out.push_str(sign);
        out.push_str(body.prefix);
        out.extend(std::iter::repeat('0').take(fill));
        out.push_str(&body.digits);
    } else {
        out.extend(std::iter::repeat(' ').take(fill));
        out.push_str(sign);
        out.push_str(body.prefix);
        out.push_str(&body.digits);
    }
    out
}

/* ---------------- integers ---------------- */

/// Sign and magnitude of the integer a value converts to.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn integer_parts(v: Value) -> Option<(bool, u128)> {
    match v {
        Value::Unsigned(u) => Some((false, u128::from(u))),
        Value::Signed(i) => Some((i < 0, u128::from(i.unsigned_abs()))),
        Value::Float(f) if f.is_finite() => {
            let t = f.trunc();
            Some((t < 0.0, t.abs() as u128))
        }
        Value::Float(_) => None,
    }
}

fn integer(conv: &Conversion, v: Value) -> Body {
    let Some((negative, mag)) = integer_parts(v) else {
        return non_finite(conv, v.as_f64());
    };
    let alt = conv.flags.alt;
    let (digits, prefix) = match conv.kind {
        'o' => (format!("{mag:o}"), if alt { "0o" } else { "" }),
        'x' => (format!("{mag:x}"), if alt { "0x" } else { "" }),
        'X' => (format!("{mag:X}"), if alt { "0X" } else { "" }),
        _ => (mag.to_string(), ""),
    };
    let digits = match conv.precision {
        Some(p) if p > digits.len() => format!("{}{digits}", "0".repeat(p - digits.len())),
        _ => digits,
    };
    Body::number(negative, prefix, digits)
}

/* ---------------- floats ---------------- */

fn non_finite(conv: &Conversion, f: f64) -> Body {
    let word = if f.is_nan() { "nan" } else { "inf" };
    let digits = if conv.kind.is_ascii_uppercase() {
        word.to_ascii_uppercase()
    } else {
        word.to_owned()
    };
    Body {
        zero_pad: false,
        ..Body::number(f.is_infinite() && f < 0.0, "", digits)
    }
}

/// Rust's `{:e}` output split into mantissa and exponent.
fn split_exp(s: &str) -> (&str, i32) {
    match s.split_once('e') {
        Some((m, e)) => (m, e.parse().unwrap_or(0)),
        None => (s, 0),
    }
}

/// C-style exponent suffix: sign and at least two digits.
fn exp_suffix(e: i32, upper: bool) -> String {
    let sign = if e < 0 { '-' } else { '+' };
    let marker = if upper { 'E' } else { 'e' };
    format!("{marker}{sign}{:02}", e.unsigned_abs())
}

fn sci(abs: f64, precision: usize, upper: bool, alt: bool) -> String {
    let s = format!("{abs:.precision$e}");
    let (mantissa, e) = split_exp(&s);
    let dot = if alt && precision == 0 { "." } else { "" };
    format!("{mantissa}{dot}{}", exp_suffix(e, upper))
}

fn fixed(abs: f64, precision: usize, alt: bool) -> String {
    let mut s = format!("{abs:.precision$}");
    if alt && precision == 0 {
        s.push('.');
    }
    s
}

fn strip_fraction_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

fn general(abs: f64, precision: usize, upper: bool, alt: bool) -> String {
    let p = precision.max(1);
    let exp = if abs == 0.0 {
        0
    } else {
        split_exp(&format!("{abs:.prec$e}", prec = p - 1)).1
    };
    let p_i32 = i32::try_from(p).unwrap_or(i32::MAX);
    if (-4..p_i32).contains(&exp) {
        let decimals = usize::try_from(p_i32 - 1 - exp).unwrap_or(0);
        let s = fixed(abs, decimals, alt);
        if alt {
            s
        } else {
            strip_fraction_zeros(&s).to_owned()
        }
    } else {
        let s = format!("{abs:.prec$e}", prec = p - 1);
        let (mantissa, e) = split_exp(&s);
        let mantissa = if alt {
            mantissa
        } else {
            strip_fraction_zeros(mantissa)
        };
        format!("{mantissa}{}", exp_suffix(e, upper))
    }
}

fn float(conv: &Conversion, v: Value) -> Body {
    let f = v.as_f64();
    if !f.is_finite() {
        return non_finite(conv, f);
    }
    let abs = f.abs();
    let precision = conv.precision.unwrap_or(DEFAULT_PRECISION);
    let alt = conv.flags.alt;
    let digits = match conv.kind {
        'e' => sci(abs, precision, false, alt),
        'E' => sci(abs, precision, true, alt),
        'g' => general(abs, precision, false, alt),
        'G' => general(abs, precision, true, alt),
        _ => fixed(abs, precision, alt),
    };
    Body::number(f.is_sign_negative(), "", digits)
}

/* ---------------- strings ---------------- */

/// Shortest round-trip text of a float: `1.0`, `0.1`, `1e+20`, `1.5e-05`.
#[must_use]
pub fn float_repr(f: f64) -> String {
    if f.is_nan() {
        return "nan".into();
    }
    if f.is_infinite() {
        return if f < 0.0 { "-inf" } else { "inf" }.into();
    }
    let sign = if f.is_sign_negative() { "-" } else { "" };
    if f == 0.0 {
        return format!("{sign}0.0");
    }

    let s = format!("{:e}", f.abs());
    let (mantissa, exp) = split_exp(&s);
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();

    let body = if (-4..16).contains(&exp) {
        if exp >= 0 {
            let int_len = usize::try_from(exp).unwrap_or(0) + 1;
            if digits.len() <= int_len {
                format!("{digits}{}.0", "0".repeat(int_len - digits.len()))
            } else {
                format!("{}.{}", &digits[..int_len], &digits[int_len..])
            }
        } else {
            let zeros = usize::try_from(-exp - 1).unwrap_or(0);
            format!("0.{}{digits}", "0".repeat(zeros))
        }
    } else {
        let rest = if digits.len() > 1 {
            format!(".{}", &digits[1..])
        } else {
            String::new()
        };
        format!("{}{rest}{}", &digits[..1], exp_suffix(exp, false))
    };
    format!("{sign}{body}")
}

fn string(conv: &Conversion, v: Value) -> Body {
    let s = match (conv.kind, v) {
        ('c', _) => {
            let ch = integer_parts(v)
                .filter(|(neg, _)| !neg)
                .and_then(|(_, m)| u32::try_from(m).ok())
                .and_then(char::from_u32)
                .unwrap_or(char::REPLACEMENT_CHARACTER);
            ch.to_string()
        }
        (_, Value::Float(f)) => float_repr(f),
        (_, other) => other.to_string(),
    };
    let s = match conv.precision {
        Some(p) if conv.kind != 'c' => s.chars().take(p).collect(),
        _ => s,
    };
    Body::text(s)
}

/* ---------------- entry points ---------------- */

/// Format one value with a parsed conversion.
#[must_use]
pub fn format_value(conv: &Conversion, v: Value) -> String {
    let body = match conv.kind {
        'd' | 'i' | 'u' | 'o' | 'x' | 'X' => integer(conv, v),
        'e' | 'E' | 'f' | 'F' | 'g' | 'G' => float(conv, v),
        _ => string(conv, v),
    };
    pad(conv, body)
}

/// Rendering of a directive without a conversion: base-10 integer.
#[must_use]
pub fn format_default(v: Value) -> String {
    match integer_parts(v) {
        Some((true, m)) => format!("-{m}"),
        Some((false, m)) => m.to_string(),
        None => float_repr(v.as_f64()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[track_caller]
    fn f(spec: &str, v: impl Into<Value>) -> String {
        format_value(&Conversion::parse(spec).unwrap(), v.into())
    }

    #[test]
    fn integer_conversions() {
        assert_eq!(f("d", 42u64), "42");
        assert_eq!(f("i", -7i64), "-7");
        assert_eq!(f("08x", 255u64), "000000ff");
        assert_eq!(f("#x", 255u64), "0xff");
        assert_eq!(f("#X", 255u64), "0XFF");
        assert_eq!(f("#o", 8u64), "0o10");
        assert_eq!(f("x", -255i64), "-ff");
        assert_eq!(f("#06x", 255u64), "0x00ff");
        assert_eq!(f("05d", -3i64), "-0003");
        assert_eq!(f(".3d", 5u64), "005");
        assert_eq!(f("lu", 9u64), "9");
    }

    #[test]
    fn sign_and_justification() {
        assert_eq!(f("+d", 5u64), "+5");
        assert_eq!(f(" d", 5u64), " 5");
        assert_eq!(f("-5d", 5u64), "5    ");
        assert_eq!(f("5d", 5u64), "    5");
        assert_eq!(f("-05d", 5u64), "5    ");
    }

    #[test]
    fn integer_conversions_truncate_floats() {
        assert_eq!(f("d", 3.9), "3");
        assert_eq!(f("d", -3.9), "-3");
        assert_eq!(f("x", 255.7), "ff");
        assert_eq!(format_default(Value::Float(-0.5)), "0");
        assert_eq!(format_default(Value::Signed(-12)), "-12");
    }

    #[test]
    fn fixed_and_exponent() {
        assert_eq!(f("f", 1.5), "1.500000");
        assert_eq!(f("5.2f", 3.14159), " 3.14");
        assert_eq!(f(".0f", 2.0), "2");
        assert_eq!(f("#.0f", 2.0), "2.");
        assert_eq!(f("f", 7u64), "7.000000");
        assert_eq!(f("e", 12345.678), "1.234568e+04");
        assert_eq!(f("E", 0.00012), "1.200000E-04");
        assert_eq!(f("+.1f", 0.26), "+0.3");
        assert_eq!(f("010.3f", -1.5), "-00001.500");
    }

    #[test]
    fn general_format() {
        assert_eq!(f("g", 0.0001), "0.0001");
        assert_eq!(f("g", 0.00001), "1e-05");
        assert_eq!(f("g", 123_456_789.0), "1.23457e+08");
        assert_eq!(f("g", 100.0), "100");
        assert_eq!(f("g", 0.0), "0");
        assert_eq!(f("#g", 1.0), "1.00000");
        assert_eq!(f(".3G", 1e-10), "1E-10");
    }

    #[test]
    fn non_finite_floats() {
        assert_eq!(f("f", f64::INFINITY), "inf");
        assert_eq!(f("F", f64::NEG_INFINITY), "-INF");
        assert_eq!(f("5f", f64::NAN), "  nan");
    }

    #[test]
    fn string_conversions() {
        assert_eq!(f("s", 1.0), "1.0");
        assert_eq!(f("s", 0.1), "0.1");
        assert_eq!(f("s", 1e20), "1e+20");
        assert_eq!(f("r", 1.5e-5), "1.5e-05");
        assert_eq!(f("s", 12u64), "12");
        assert_eq!(f(".2s", 12345u64), "12");
        assert_eq!(f("5s", 7u64), "    7");
        assert_eq!(f("c", 65u64), "A");
    }

    #[test]
    fn float_repr_positions_the_point() {
        assert_eq!(float_repr(123.0), "123.0");
        assert_eq!(float_repr(1234.5), "1234.5");
        assert_eq!(float_repr(-0.0), "-0.0");
        assert_eq!(float_repr(0.00012), "0.00012");
        assert_eq!(float_repr(1e16), "1e+16");
    }
}
