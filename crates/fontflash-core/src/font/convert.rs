//! Conversion pipeline: C glyph table -> font binary + index header.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use super::bin::{encode_bin, read_glyph};
use super::glyph::Glyph;
use super::index::render_index_header;
use super::parser::parse_font_file;
use crate::config::ConvertConfig;

/// What a conversion produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionSummary {
    pub glyph_count: usize,
    pub bin_size: usize,
    pub output_bin: PathBuf,
    pub output_index: PathBuf,
    /// Glyphs whose annotated index does not match their position in the
    /// binary; the firmware would fetch the wrong bitmap for these.
    pub misplaced: Vec<char>,
}

/// Parse the configured glyph table and write both outputs.
///
/// Nothing is written unless the whole table parses and renders.
#[instrument(skip(config), fields(input = %config.input_font_c.display()))]
pub fn convert_font_table(config: &ConvertConfig) -> Result<ConversionSummary> {
    let glyphs = parse_font_file(&config.input_font_c, config.bytes_per_glyph)
        .with_context(|| format!("Failed to parse {}", config.input_font_c.display()))?;

    let bin = encode_bin(&glyphs);
    let header = render_index_header(&glyphs, config.bytes_per_glyph, &config.layout)
        .context("Failed to render index header")?;

    write_output(&config.output_bin, &bin)?;
    write_output(&config.output_index, header.as_bytes())?;
    info!(glyphs = glyphs.len(), bytes = bin.len(), "Font table converted");

    let written = std::fs::read(&config.output_bin)
        .with_context(|| format!("Failed to read back {}", config.output_bin.display()))?;
    let misplaced = misplaced_glyphs(&written, &glyphs, config.bytes_per_glyph);
    for ch in &misplaced {
        warn!(glyph = %ch, "Glyph index does not match its offset in the binary");
    }

    Ok(ConversionSummary {
        glyph_count: glyphs.len(),
        bin_size: written.len(),
        output_bin: config.output_bin.clone(),
        output_index: config.output_index.clone(),
        misplaced,
    })
}

fn write_output(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}

/// Glyphs that cannot be found at `index * bytes_per_glyph` in `bin`.
fn misplaced_glyphs(bin: &[u8], glyphs: &[Glyph], bytes_per_glyph: usize) -> Vec<char> {
    glyphs
        .iter()
        .filter(|g| read_glyph(bin, g.index, bytes_per_glyph) != Some(g.data.as_slice()))
        .map(|g| g.ch)
        .collect()
}
