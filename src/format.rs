//! Component C: rendering a registered format string and its parameters into a single log
//! line, in either of two wire shapes.
//!
//! *Human* mode expands the format string in place, exactly like `printf`, and tags it
//! with the entry id for grep-ability: `"[0xNNNN] <expanded text>\n"`. *Encoded* mode skips
//! expansion on the device and instead renders each parameter on its own, separated by
//! `|`, leaving the format string to be re-applied later by [`crate::decode`]:
//! `"\nNNNN|<arg1>|<arg2>|...|\n"`.
//!
//! Both modes share a fixed-size line buffer; overflow truncates the line and appends a
//! sentinel rather than growing unbounded, since the buffer is meant to live on a firmware
//! stack.

use fehler::{throw, throws};
use thiserror::Error;

use crate::value::Value;

/// Longest line either rendering mode will ever produce.
pub const LOG_LINE_SIZE: usize = 128;

/// Entry id used by the unregistered, ad hoc `printf`-style calls.
pub const LOGGER_PRINTF_ID: u16 = 0x00FF;

/// Reserved id meaning "not a recognized entry", used by the decoder for undecodable spans.
pub const INVALID_ID: u16 = 0xFFFF;

const TRUNCATION_SENTINEL: &[u8] = b".. truncated ..|\n";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    /// A specifier in the format string could not be scanned (dangling `%`, unsupported
    /// conversion character).
    #[error("malformed format string at byte {0}")]
    Formatting(usize),
    /// Fewer parameters were supplied than the format string has specifiers.
    #[error("not enough parameters for format string")]
    TooFewParameters,
    /// A parameter's runtime type did not match the specifier that consumes it.
    #[error("parameter type does not match its specifier")]
    TypeMismatch,
}

fn substitute_special(byte: u8) -> u8 {
    match byte {
        b'|' => b'!',
        b'\n' => b'\r',
        0 => b'0',
        other => other,
    }
}

/// A fixed-capacity line under construction. Bytes pushed past capacity are dropped and
/// replaced, on [`finish`](LineBuffer::finish), with [`TRUNCATION_SENTINEL`].
struct LineBuffer<'a> {
    buf: &'a mut [u8],
    len: usize,
    overflowed: bool,
}

impl<'a> LineBuffer<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        LineBuffer {
            buf,
            len: 0,
            overflowed: false,
        }
    }

    fn push_byte(&mut self, b: u8) {
        if self.len < self.buf.len() {
            self.buf[self.len] = b;
            self.len += 1;
        } else {
            self.overflowed = true;
        }
    }

    fn push_str(&mut self, s: &str) {
        for &b in s.as_bytes() {
            self.push_byte(b);
        }
    }

    fn finish(self) -> usize {
        if self.overflowed && self.buf.len() >= TRUNCATION_SENTINEL.len() {
            let start = self.buf.len() - TRUNCATION_SENTINEL.len();
            self.buf[start..].copy_from_slice(TRUNCATION_SENTINEL);
            self.buf.len()
        } else {
            self.len
        }
    }
}

/// Render `format` fully expanded, human-readable, tagged with `id`.
#[throws(FormatError)]
pub fn render_human(buf: &mut [u8], id: u16, format: &str, values: &[Value]) -> usize {
    let specs = specifiers::scan(format).map_err(FormatError::Formatting)?;
    let mut lb = LineBuffer::new(buf);
    lb.push_str("[0x");
    lb.push_str(&hex4(id));
    lb.push_str("] ");

    let mut last_end = 0;
    for (i, spec) in specs.iter().enumerate() {
        lb.push_str(&format[last_end..spec.start]);
        let value = values.get(i).ok_or(FormatError::TooFewParameters)?;
        let raw = &format[spec.start..spec.end];
        let parsed = parse_specifier(raw, spec.conversion);
        let core = format_core(value, &parsed)?;
        lb.push_str(&pad(core, &parsed));
        last_end = spec.end;
    }
    lb.push_str(&format[last_end..]);
    lb.push_byte(b'\n');
    lb.finish()
}

/// Render an ad hoc, unregistered message's fully expanded text into the encoded wire
/// shape: `"\nNNNN|<escaped expanded text>|\n"`. Unlike [`render_encoded`], there is no
/// format string left on the device side for a decoder to re-apply later, so the whole
/// expansion happens here and travels as a single escaped content field.
#[throws(FormatError)]
pub fn render_encoded_printf(buf: &mut [u8], id: u16, format: &str, values: &[Value]) -> usize {
    let specs = specifiers::scan(format).map_err(FormatError::Formatting)?;
    let mut lb = LineBuffer::new(buf);
    lb.push_byte(b'\n');
    lb.push_str(&hex4(id));
    lb.push_byte(b'|');

    let mut last_end = 0;
    for (i, spec) in specs.iter().enumerate() {
        for b in format[last_end..spec.start].bytes() {
            lb.push_byte(substitute_special(b));
        }
        let value = values.get(i).ok_or(FormatError::TooFewParameters)?;
        let raw = &format[spec.start..spec.end];
        let parsed = parse_specifier(raw, spec.conversion);
        let core = format_core(value, &parsed)?;
        for b in pad(core, &parsed).bytes() {
            lb.push_byte(substitute_special(b));
        }
        last_end = spec.end;
    }
    for b in format[last_end..].bytes() {
        lb.push_byte(substitute_special(b));
    }
    lb.push_byte(b'|');
    lb.push_byte(b'\n');
    lb.finish()
}

/// Render `id` and each of `values` (each formatted per its own specifier in `format`, in
/// order) without expanding the format string itself, so a later decoder can re-apply it.
#[throws(FormatError)]
pub fn render_encoded(buf: &mut [u8], id: u16, format: &str, values: &[Value]) -> usize {
    let specs = specifiers::scan(format).map_err(FormatError::Formatting)?;
    let mut lb = LineBuffer::new(buf);
    lb.push_byte(b'\n');
    lb.push_str(&hex4(id));
    lb.push_byte(b'|');

    for (i, spec) in specs.iter().enumerate() {
        let value = values.get(i).ok_or(FormatError::TooFewParameters)?;
        let raw = &format[spec.start..spec.end];
        let parsed = parse_specifier(raw, spec.conversion);
        let core = format_core(value, &parsed)?;
        for b in pad(core, &parsed).bytes() {
            lb.push_byte(substitute_special(b));
        }
        lb.push_byte(b'|');
    }
    lb.push_byte(b'\n');
    lb.finish()
}

fn hex4(id: u16) -> String {
    format!("{:04X}", id)
}

/// The printf-style grammar: `%[flags][width][.precision][length]specifier`, restricted to
/// the specifiers `{d,i,u,x,X,f,F,c,s,p}`.
pub mod specifiers {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Specifier {
        /// Byte offset of the `%` that starts this specifier.
        pub start: usize,
        /// Byte offset one past the conversion character.
        pub end: usize,
        pub conversion: char,
    }

    /// Scan `format` for every specifier. `%%` is a literal percent and is skipped rather
    /// than reported. Returns the byte offset of the first malformed specifier on failure.
    pub fn scan(format: &str) -> Result<Vec<Specifier>, usize> {
        let bytes = format.as_bytes();
        let mut out = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] != b'%' {
                i += 1;
                continue;
            }
            let start = i;
            i += 1;
            if i < bytes.len() && bytes[i] == b'%' {
                i += 1;
                continue;
            }
            while i < bytes.len() && matches!(bytes[i], b'-' | b'+' | b'0' | b' ' | b'#') {
                i += 1;
            }
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i < bytes.len() && bytes[i] == b'.' {
                i += 1;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
            }
            while i < bytes.len() && matches!(bytes[i], b'h' | b'l' | b'L' | b'z' | b'j' | b't') {
                i += 1;
            }
            if i >= bytes.len() {
                return Err(start);
            }
            let conversion = bytes[i] as char;
            if !matches!(conversion, 'd' | 'i' | 'u' | 'x' | 'X' | 'f' | 'F' | 'c' | 's' | 'p') {
                return Err(start);
            }
            i += 1;
            out.push(Specifier { start, end: i, conversion });
        }
        Ok(out)
    }
}

struct ParsedSpec {
    left_align: bool,
    zero_pad: bool,
    plus_sign: bool,
    space_sign: bool,
    alt: bool,
    width: Option<usize>,
    precision: Option<usize>,
    conversion: char,
}

fn parse_specifier(raw: &str, conversion: char) -> ParsedSpec {
    let bytes = raw.as_bytes();
    let mut i = 1; // skip '%'
    let mut p = ParsedSpec {
        left_align: false,
        zero_pad: false,
        plus_sign: false,
        space_sign: false,
        alt: false,
        width: None,
        precision: None,
        conversion,
    };
    while i < bytes.len() {
        match bytes[i] {
            b'-' => p.left_align = true,
            b'0' => p.zero_pad = true,
            b'+' => p.plus_sign = true,
            b' ' => p.space_sign = true,
            b'#' => p.alt = true,
            _ => break,
        }
        i += 1;
    }
    let width_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i > width_start {
        p.width = raw[width_start..i].parse().ok();
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let prec_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        p.precision = Some(raw[prec_start..i].parse().unwrap_or(0));
    }
    p
}

#[throws(FormatError)]
fn format_core(value: &Value, spec: &ParsedSpec) -> String {
    match spec.conversion {
        'd' | 'i' => {
            let v = match value {
                Value::I32(v) => *v,
                _ => throw!(FormatError::TypeMismatch),
            };
            let mut s = v.unsigned_abs().to_string();
            if let Some(p) = spec.precision {
                while s.len() < p {
                    s.insert(0, '0');
                }
            }
            if v < 0 {
                s.insert(0, '-');
            } else if spec.plus_sign {
                s.insert(0, '+');
            } else if spec.space_sign {
                s.insert(0, ' ');
            }
            s
        }
        'u' => {
            let v = match value {
                Value::U32(v) => *v,
                _ => throw!(FormatError::TypeMismatch),
            };
            let mut s = v.to_string();
            if let Some(p) = spec.precision {
                while s.len() < p {
                    s.insert(0, '0');
                }
            }
            s
        }
        'x' | 'X' => {
            let v = match value {
                Value::U32(v) => *v,
                _ => throw!(FormatError::TypeMismatch),
            };
            let mut s = if spec.conversion == 'x' {
                format!("{:x}", v)
            } else {
                format!("{:X}", v)
            };
            if let Some(p) = spec.precision {
                while s.len() < p {
                    s.insert(0, '0');
                }
            }
            if spec.alt && v != 0 {
                s = format!("{}{}", if spec.conversion == 'x' { "0x" } else { "0X" }, s);
            }
            s
        }
        'f' | 'F' => {
            let v = match value {
                Value::F32(v) => *v,
                _ => throw!(FormatError::TypeMismatch),
            };
            let precision = spec.precision.unwrap_or(6);
            let mut s = format!("{:.*}", precision, v.abs());
            if v.is_sign_negative() {
                s.insert(0, '-');
            } else if spec.plus_sign {
                s.insert(0, '+');
            } else if spec.space_sign {
                s.insert(0, ' ');
            }
            s
        }
        'c' => match value {
            Value::Char(v) => v.to_string(),
            _ => throw!(FormatError::TypeMismatch),
        },
        's' => match value {
            Value::Str(v) => match spec.precision {
                Some(p) => v.chars().take(p).collect(),
                None => v.to_string(),
            },
            _ => throw!(FormatError::TypeMismatch),
        },
        'p' => match value {
            Value::Ptr(v) => format!("{:#x}", v),
            _ => throw!(FormatError::TypeMismatch),
        },
        _ => throw!(FormatError::Formatting(0)),
    }
}

fn pad(core: String, spec: &ParsedSpec) -> String {
    let width = match spec.width {
        Some(w) if core.len() < w => w,
        _ => return core,
    };
    let fill = width - core.len();
    if spec.left_align {
        format!("{}{}", core, " ".repeat(fill))
    } else if spec.zero_pad {
        match core.chars().next() {
            Some(c) if c == '-' || c == '+' || c == ' ' => {
                format!("{}{}{}", c, "0".repeat(fill), &core[1..])
            }
            _ => format!("{}{}", "0".repeat(fill), core),
        }
    } else {
        format!("{}{}", " ".repeat(fill), core)
    }
}
