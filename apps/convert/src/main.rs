use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use fontflash_core::config::{DEFAULT_CONFIG_FILE, ToolConfig};
use fontflash_core::font::convert_font_table;
use tracing::warn;

#[derive(Parser, Debug)]
#[command(author, version, about = "Font table converter", long_about = None)]
struct Args {
    /// Configuration file (input table, output paths, layout constants)
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(if args.verbose {
                    tracing::Level::DEBUG.into()
                } else {
                    tracing::Level::INFO.into()
                })
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ToolConfig::load_or_default(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?
        .convert;

    let summary = convert_font_table(&config)?;

    println!("Font conversion complete");
    println!("Glyphs: {}", summary.glyph_count);
    println!("BIN: {} ({} bytes)", summary.output_bin.display(), summary.bin_size);
    println!("IDX: {}", summary.output_index.display());

    if !summary.misplaced.is_empty() {
        warn!(
            count = summary.misplaced.len(),
            "Some glyph indices do not match their position in the binary"
        );
    }

    Ok(())
}
