//! Component D: the desktop-side counterpart of [`crate::format`]'s encoded mode. Scans a
//! decompressed byte stream for `"\nNNNN|arg|arg|\n"` entries and re-expands each one
//! against the same entry tables the firmware was built with, producing the same text
//! [`crate::format::render_human`] would have on the device. An id with no registered
//! format (the reserved printf id, or any other free-form printf-with-id call) has no
//! format string to re-expand against, so its single content field decodes as-is instead.

use crate::format::{specifiers, INVALID_ID};
use crate::registry::Registry;

/// Result of a single [`decode`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOutcome {
    /// How many bytes of `src` were consumed.
    pub src_consumed: usize,
    /// How many bytes were written to `dst`.
    pub dst_written: usize,
}

/// Decode as many whole entries out of `src` as fit in `dst`, returning how much of each
/// was used. A trailing entry with no closing newline yet is left unconsumed; a fully-
/// framed entry that would overflow `dst` is also left unconsumed, for the next call.
pub fn decode(src: &[u8], dst: &mut [u8], registry: &Registry) -> DecodeOutcome {
    let mut src_pos = 0;
    let mut dst_pos = 0;

    loop {
        let segment_start = src_pos;
        let newline_offset = match src[src_pos..].iter().position(|&b| b == b'\n') {
            Some(offset) => offset,
            None => break, // no closing newline yet; leave the rest for next time
        };
        let segment = &src[src_pos..src_pos + newline_offset];
        let after = src_pos + newline_offset + 1;

        if segment.is_empty() {
            // two adjacent newlines: the separator between two back-to-back entries.
            src_pos = after;
            continue;
        }

        let rendered = render_entry(segment, registry);
        if dst_pos + rendered.len() > dst.len() {
            src_pos = segment_start;
            break;
        }
        dst[dst_pos..dst_pos + rendered.len()].copy_from_slice(&rendered);
        dst_pos += rendered.len();
        src_pos = after;
    }

    DecodeOutcome {
        src_consumed: src_pos,
        dst_written: dst_pos,
    }
}

fn is_decodable(segment: &[u8]) -> bool {
    segment.len() >= 5 && segment[4] == b'|' && segment.last() == Some(&b'|')
}

fn reverse_escape(byte: u8) -> u8 {
    match byte {
        b'!' => b'|',
        b'\r' => b'\n',
        other => other,
    }
}

fn render_entry(segment: &[u8], registry: &Registry) -> Vec<u8> {
    if !is_decodable(segment) {
        return undecodable(segment);
    }

    let id = match std::str::from_utf8(&segment[0..4]).ok().and_then(|s| u16::from_str_radix(s, 16).ok()) {
        Some(id) => id,
        None => return undecodable(segment),
    };

    let format = match registry.find(id) {
        Some(format) => format,
        // Not a registered entry: either the reserved printf id, or a free-form printf
        // call under a caller-chosen id. Either way there is no format string to
        // re-expand against, so the single content field between the pipes is rendered
        // as-is, reverse-escaped back to its original bytes.
        None => return render_printf_style(id, segment),
    };

    let after_id = &segment[5..];
    let mut params: Vec<&[u8]> = if after_id.is_empty() {
        Vec::new()
    } else {
        let mut parts: Vec<&[u8]> = after_id.split(|&b| b == b'|').collect();
        parts.pop();
        parts
    };

    let specs = match specifiers::scan(format) {
        Ok(specs) => specs,
        Err(_) => return undecodable(segment),
    };
    if specs.len() != params.len() {
        return undecodable(segment);
    }

    let mut out = Vec::with_capacity(format.len() + 16);
    out.extend_from_slice(b"[0x");
    out.extend_from_slice(format!("{:04X}", id).as_bytes());
    out.extend_from_slice(b"] ");

    let mut last_end = 0;
    for spec in &specs {
        out.extend_from_slice(format[last_end..spec.start].as_bytes());
        let param = params.remove(0);
        out.extend(param.iter().map(|&b| reverse_escape(b)));
        last_end = spec.end;
    }
    out.extend_from_slice(format[last_end..].as_bytes());
    out.push(b'\n');
    out
}

/// Render a printf-style entry (reserved `LOGGER_PRINTF` id, or any other id with no
/// registered format): `[0xNNNN] ` followed by the single reverse-escaped content field,
/// with no format re-expansion.
fn render_printf_style(id: u16, segment: &[u8]) -> Vec<u8> {
    // `is_decodable` guarantees segment[4] and the last byte are both `|`. When those are
    // the same byte (a segment of exactly `"NNNN|"`, the zero-parameter registered shape)
    // there is no content between them; printf-style entries otherwise always carry a
    // second closing `|` with the content field in between.
    let content: &[u8] = if segment.len() > 5 { &segment[5..segment.len() - 1] } else { &[] };
    let mut out = Vec::with_capacity(content.len() + 16);
    out.extend_from_slice(b"[0x");
    out.extend_from_slice(format!("{:04X}", id).as_bytes());
    out.extend_from_slice(b"] ");
    out.extend(content.iter().map(|&b| reverse_escape(b)));
    out.push(b'\n');
    out
}

fn undecodable(segment: &[u8]) -> Vec<u8> {
    let prefix = format!("[0x{:04X}][L] ", INVALID_ID);
    let mut out = Vec::with_capacity(prefix.len() + segment.len() + 1);
    out.extend_from_slice(prefix.as_bytes());
    out.extend_from_slice(segment);
    out.push(b'\n');
    out
}
