//! C index header generation.
//!
//! The header is consumed by the firmware at compile time: a `unicode ->
//! index` table in source order plus the layout constants it needs to
//! address glyphs in flash.

use std::fmt::{self, Write};

use super::glyph::{FontError, Glyph};
use crate::config::HeaderLayout;

const GUARD: &str = "__CH_FONT_INDEX_H__";

/// Render the index header text.
pub fn render_index_header(
    glyphs: &[Glyph],
    bytes_per_glyph: usize,
    layout: &HeaderLayout,
) -> Result<String, FontError> {
    let entries = glyphs
        .iter()
        .map(|g| Ok((g.code_point_u16()?, g.index)))
        .collect::<Result<Vec<_>, FontError>>()?;

    let mut out = String::new();
    write_header(&mut out, &entries, bytes_per_glyph, layout)?;
    Ok(out)
}

fn write_header<W: Write>(
    out: &mut W,
    entries: &[(u16, u16)],
    bytes_per_glyph: usize,
    layout: &HeaderLayout,
) -> fmt::Result {
    writeln!(out, "#ifndef {GUARD}")?;
    writeln!(out, "#define {GUARD}\n")?;
    writeln!(out, "#include <stdint.h>\n")?;

    out.write_str("typedef struct\n{\n")?;
    out.write_str("    uint16_t unicode;   // Unicode code point\n")?;
    out.write_str("    uint16_t index;     // Glyph index\n")?;
    out.write_str("} CH_FontIndex_t;\n\n")?;

    writeln!(out, "#define CH_FONT_COUNT {}", entries.len())?;
    writeln!(out, "#define CH_FONT_BYTES_PER_CHAR {}", bytes_per_glyph)?;
    writeln!(out, "#define CH_FONT_BASE_ADDR 0x{:06X}", layout.base_addr)?;
    writeln!(out, "#define CH_FONT_WIDTH {}", layout.width)?;
    writeln!(out, "#define CH_FONT_HEIGHT {}\n", layout.height)?;
    writeln!(out, "#define CH_CACHE_SIZE {}\n", layout.cache_size)?;

    out.write_str("// Glyph cache (recently used glyphs)\n")?;
    out.write_str("typedef struct {\n")?;
    out.write_str("    uint16_t unicode;  // Unicode code point\n")?;
    out.write_str("    uint8_t data[CH_FONT_BYTES_PER_CHAR];  // Glyph bitmap\n")?;
    out.write_str("    uint8_t used;  // Slot in use\n")?;
    out.write_str("} CH_FontCache_t;\n\n")?;

    out.write_str("static const CH_FontIndex_t OLED_CH_FontIndex[] =\n{\n")?;
    for (unicode, index) in entries {
        writeln!(out, "    {{0x{:04X}, {}}},", unicode, index)?;
    }
    out.write_str("};\n\n")?;

    writeln!(out, "#endif /* {GUARD} */")
}
