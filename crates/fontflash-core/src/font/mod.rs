//! Font table conversion.
//!
//! Turns a C glyph table (hex byte literals, each glyph closed by a
//! `/* '<char>', <index> */` annotation) into the flat binary that gets
//! flashed and a C header mapping Unicode code points to glyph indices.

pub mod bin;
pub mod convert;
pub mod glyph;
pub mod index;
pub mod parser;

pub use bin::{encode_bin, read_glyph};
pub use convert::{ConversionSummary, convert_font_table};
pub use glyph::{FontError, Glyph};
pub use index::render_index_header;
pub use parser::{parse_font_file, parse_font_source};
