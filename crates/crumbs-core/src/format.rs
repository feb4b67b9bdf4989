//! Format-string tokenizer.
//!
//! Entry format strings mix literal text with directives of the form
//! `%{field}` (default rendering) or `%<spec>{field}` where `<spec>` is a
//! single printf conversion without the leading `%` (`x`, `08x`, `.3f`, …).
//! Strings are tokenized once at schema assembly; a malformed directive is a
//! schema error instead of a decode-time failure.

use crate::error::{CrumbError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

/// Length modifiers accepted and ignored in conversion specs.
const LENGTH_MODIFIERS: &[char] = &['h', 'l', 'L', 'q', 'j', 'z', 't'];

/// Largest accepted width or precision.
pub const MAX_WIDTH: usize = 1024;

/// Conversion characters accepted in conversion specs.
const CONVERSIONS: &[char] = &[
    'd', 'i', 'u', 'o', 'x', 'X', 'e', 'E', 'f', 'F', 'g', 'G', 'c', 's', 'r', 'a',
];

/// printf flags.
#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Flags {
    /// `-`: left-justify within the width.
    pub left: bool,
    /// `+`: always print a sign.
    pub plus: bool,
    /// ` `: print a space in place of a `+` sign.
    pub space: bool,
    /// `#`: alternate form (`0x`, `0o`, kept trailing zeros).
    pub alt: bool,
    /// `0`: pad numbers with zeros.
    pub zero: bool,
}

/// A parsed single-value printf conversion.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversion {
    /// Flags in any order.
    pub flags: Flags,
    /// Minimum field width.
    pub width: Option<usize>,
    /// Precision (digits after the point, significant digits for `g`).
    pub precision: Option<usize>,
    /// Conversion character.
    pub kind: char,
}

impl Conversion {
    /// Parse a conversion spec such as `08x` or `-10.3f`.
    pub fn parse(spec: &str) -> Result<Self> {
        let bad = |why: &str| CrumbError::schema(format!("invalid conversion \"%{spec}\": {why}"));
        let mut chars = spec.chars().peekable();

        let mut flags = Flags::default();
        while let Some(&c) = chars.peek() {
            match c {
                '-' => flags.left = true,
                '+' => flags.plus = true,
                ' ' => flags.space = true,
                '#' => flags.alt = true,
                '0' => flags.zero = true,
                _ => break,
            }
            chars.next();
        }

        let width = digits(&mut chars).ok_or_else(|| bad("width too large"))?;

        let mut precision = None;
        if chars.peek() == Some(&'.') {
            chars.next();
            let p = digits(&mut chars).ok_or_else(|| bad("precision too large"))?;
            precision = Some(p.unwrap_or(0));
        }

        while chars.peek().is_some_and(|c| LENGTH_MODIFIERS.contains(c)) {
            chars.next();
        }

        let kind = chars.next().ok_or_else(|| bad("missing conversion character"))?;
        if !CONVERSIONS.contains(&kind) {
            return Err(bad("unsupported conversion character"));
        }
        if chars.next().is_some() {
            return Err(bad("trailing characters after conversion"));
        }

        Ok(Self {
            flags,
            width,
            precision,
            kind,
        })
    }
}

/// Read a run of decimal digits: `Some(None)` if there are none, `None` if
/// the number exceeds [`MAX_WIDTH`].
fn digits(chars: &mut Peekable<Chars<'_>>) -> Option<Option<usize>> {
    let mut n: Option<usize> = None;
    while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
        let v = n
            .unwrap_or(0)
            .checked_mul(10)
            .and_then(|v| v.checked_add(d as usize))
            .filter(|&v| v <= MAX_WIDTH)?;
        n = Some(v);
        chars.next();
    }
    Some(n)
}

impl fmt::Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("%")?;
        let fl = self.flags;
        for (on, c) in [
            (fl.left, '-'),
            (fl.plus, '+'),
            (fl.space, ' '),
            (fl.alt, '#'),
            (fl.zero, '0'),
        ] {
            if on {
                write!(f, "{c}")?;
            }
        }
        if let Some(w) = self.width {
            write!(f, "{w}")?;
        }
        if let Some(p) = self.precision {
            write!(f, ".{p}")?;
        }
        write!(f, "{}", self.kind)
    }
}

/// One piece of a tokenized format string.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum FormatToken {
    /// Text copied verbatim.
    Literal(String),
    /// Substitution of a field value.
    Field {
        /// Field name between the braces.
        name: String,
        /// Explicit conversion; `None` selects the default rendering.
        conversion: Option<Conversion>,
    },
}

/// Split a format string into literal and directive tokens.
///
/// # Errors
/// [`CrumbError::Schema`] for an unterminated directive, an empty field name
/// or an invalid conversion spec.
pub fn parse_format(format: &str) -> Result<Vec<FormatToken>> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut chars = format.char_indices();

    while let Some((start, c)) = chars.next() {
        if c != '%' {
            literal.push(c);
            continue;
        }

        let unterminated = || {
            CrumbError::schema(format!(
                "unterminated directive at byte {start} of format \"{format}\""
            ))
        };

        let mut spec = String::new();
        loop {
            match chars.next() {
                Some((_, '{')) => break,
                Some((_, c)) => spec.push(c),
                None => return Err(unterminated()),
            }
        }
        let mut name = String::new();
        loop {
            match chars.next() {
                Some((_, '}')) => break,
                Some((_, c)) => name.push(c),
                None => return Err(unterminated()),
            }
        }
        if name.is_empty() {
            return Err(CrumbError::schema(format!(
                "empty field name at byte {start} of format \"{format}\""
            )));
        }

        let conversion = if spec.is_empty() {
            None
        } else {
            Some(Conversion::parse(&spec)?)
        };
        if !literal.is_empty() {
            tokens.push(FormatToken::Literal(std::mem::take(&mut literal)));
        }
        tokens.push(FormatToken::Field { name, conversion });
    }

    if !literal.is_empty() {
        tokens.push(FormatToken::Literal(literal));
    }
    Ok(tokens)
}

/// Field names referenced by a token list, in order of appearance.
pub fn referenced_fields(tokens: &[FormatToken]) -> impl Iterator<Item = &str> {
    tokens.iter().filter_map(|t| match t {
        FormatToken::Field { name, .. } => Some(name.as_str()),
        FormatToken::Literal(_) => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str) -> FormatToken {
        FormatToken::Field {
            name: name.into(),
            conversion: None,
        }
    }

    #[test]
    fn literals_and_default_directives() {
        let t = parse_format("code=%{code} done").unwrap();
        assert_eq!(
            t,
            vec![
                FormatToken::Literal("code=".into()),
                field("code"),
                FormatToken::Literal(" done".into()),
            ]
        );
    }

    #[test]
    fn adjacent_directives_have_no_empty_literals() {
        let t = parse_format("%{a}%{b}").unwrap();
        assert_eq!(t, vec![field("a"), field("b")]);
    }

    #[test]
    fn conversion_specs_are_parsed() {
        let t = parse_format("addr=%08lx{addr}").unwrap();
        let FormatToken::Field {
            conversion: Some(c),
            ..
        } = &t[1]
        else {
            panic!("expected directive, got {t:?}");
        };
        assert!(c.flags.zero);
        assert_eq!(c.width, Some(8));
        assert_eq!(c.kind, 'x');
        assert_eq!(c.to_string(), "%08x");

        let c = Conversion::parse("-+10.3f").unwrap();
        assert!(c.flags.left && c.flags.plus);
        assert_eq!((c.width, c.precision), (Some(10), Some(3)));
    }

    #[test]
    fn malformed_directives_are_schema_errors() {
        for bad in ["100%", "x=%{open", "%{}", "%y{f}", "%5{f}", "%dd{f}"] {
            assert!(
                matches!(parse_format(bad), Err(CrumbError::Schema(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn oversized_width_and_precision_are_schema_errors() {
        for bad in [
            "%99999999999999999999999d{x}",
            "%999999999999d{x}",
            "%.99999999999999999999999f{x}",
            "%1025d{x}",
        ] {
            assert!(
                matches!(parse_format(bad), Err(CrumbError::Schema(_))),
                "{bad:?} should be rejected"
            );
        }
        let c = Conversion::parse(&format!("{MAX_WIDTH}.{MAX_WIDTH}f")).unwrap();
        assert_eq!((c.width, c.precision), (Some(MAX_WIDTH), Some(MAX_WIDTH)));
    }

    #[test]
    fn referenced_fields_in_order() {
        let t = parse_format("%{b} then %x{a}").unwrap();
        assert_eq!(referenced_fields(&t).collect::<Vec<_>>(), ["b", "a"]);
    }
}
