//! C glyph table parser.
//!
//! Works line by line: every `0xNN` literal is appended to the current
//! group, and an annotation comment `/* '<char>', <index> */` closes the
//! group as one glyph. Literals on the annotation line itself belong to the
//! glyph it closes.

use std::path::Path;

use tracing::{debug, instrument};

use super::glyph::{FontError, Glyph};

/// Parse a glyph table from C source text.
pub fn parse_font_source(source: &str, bytes_per_glyph: usize) -> Result<Vec<Glyph>, FontError> {
    let mut glyphs = Vec::new();
    let mut current: Vec<u8> = Vec::with_capacity(bytes_per_glyph);

    for line in source.lines() {
        current.extend(hex_literals(line));

        if let Some((ch, digits)) = find_annotation(line) {
            if current.len() != bytes_per_glyph {
                return Err(FontError::GlyphSizeMismatch {
                    glyph: ch,
                    actual: current.len(),
                    expected: bytes_per_glyph,
                });
            }
            let index = digits.parse::<u16>().map_err(|_| FontError::IndexOutOfRange {
                glyph: ch,
                value: digits.to_string(),
            })?;

            debug!(glyph = %ch, index, "Parsed glyph");
            glyphs.push(Glyph {
                ch,
                index,
                data: std::mem::take(&mut current),
            });
        }
    }

    if !current.is_empty() {
        debug!(bytes = current.len(), "Trailing bytes without annotation ignored");
    }

    Ok(glyphs)
}

/// Read and parse a glyph table file (UTF-8).
#[instrument(skip(path), fields(path = %path.as_ref().display()))]
pub fn parse_font_file<P: AsRef<Path>>(
    path: P,
    bytes_per_glyph: usize,
) -> Result<Vec<Glyph>, FontError> {
    let source = std::fs::read_to_string(path)?;
    parse_font_source(&source, bytes_per_glyph)
}

/// All `0x` + two-hex-digit literals in `line`, left to right,
/// non-overlapping.
fn hex_literals(line: &str) -> impl Iterator<Item = u8> + '_ {
    let bytes = line.as_bytes();
    let mut i = 0;
    std::iter::from_fn(move || {
        while i + 4 <= bytes.len() {
            let window = &bytes[i..i + 4];
            if window[0] == b'0'
                && window[1] == b'x'
                && window[2].is_ascii_hexdigit()
                && window[3].is_ascii_hexdigit()
            {
                i += 4;
                // Both digits were checked above
                let text = std::str::from_utf8(&window[2..4]).ok()?;
                return u8::from_str_radix(text, 16).ok();
            }
            i += 1;
        }
        None
    })
}

/// First `/* '<char>', <digits> */` comment in `line`.
fn find_annotation(line: &str) -> Option<(char, &str)> {
    line.match_indices("/*")
        .find_map(|(start, _)| parse_annotation(&line[start + 2..]))
}

fn parse_annotation(rest: &str) -> Option<(char, &str)> {
    let rest = rest.trim_start().strip_prefix('\'')?;
    let mut chars = rest.chars();
    let ch = chars.next()?;
    let rest = chars.as_str().strip_prefix('\'')?;
    let rest = rest.trim_start().strip_prefix(',')?.trim_start();

    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }
    let (digits, rest) = rest.split_at(digits_len);
    rest.trim_start().strip_prefix("*/")?;
    Some((ch, digits))
}
