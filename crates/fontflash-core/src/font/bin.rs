//! Flat glyph binary: glyph bitmaps concatenated in record order.

use super::glyph::Glyph;

pub fn encode_bin(glyphs: &[Glyph]) -> Vec<u8> {
    glyphs.iter().flat_map(|g| g.data.iter().copied()).collect()
}

/// Bitmap of glyph `index` in a binary of fixed-size records, the same way
/// the firmware addresses it (`index * bytes_per_glyph`).
pub fn read_glyph(bin: &[u8], index: u16, bytes_per_glyph: usize) -> Option<&[u8]> {
    let start = usize::from(index).checked_mul(bytes_per_glyph)?;
    let end = start.checked_add(bytes_per_glyph)?;
    bin.get(start..end)
}
