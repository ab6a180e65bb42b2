use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::Parser;
use fontflash_core::config::{DEFAULT_CONFIG_FILE, ToolConfig};
use fontflash_core::{FlashSession, SerialPortChannel, TransferError};
use tracing::{error, info, warn};

mod progress;

use progress::IndicatifObserver;

#[derive(Parser, Debug)]
#[command(author, version, about = "Font glyph flashing tool", long_about = None)]
struct Args {
    /// Configuration file (port, baud rate, input file)
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt()
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
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = match ToolConfig::load_or_default(&args.config) {
        Ok(c) => c.flash,
        Err(e) => {
            error!("Failed to load {}: {}", args.config.display(), e);
            process::exit(1);
        }
    };

    println!("=== Font Flash Tool ===");
    println!();

    // A missing input is reported, not treated as a failure
    if let Some(message) = missing_input(&config.input) {
        println!("{message}");
        return;
    }

    println!("File: {}", config.input.display());
    println!("Port: {}, baud rate: {}", config.port, config.baud_rate);
    println!();

    let session = FlashSession::with_observer(config, Arc::new(IndicatifObserver::new()));

    match session.run() {
        Ok(report) => {
            info!(
                bytes = report.total_bytes,
                blocks = report.blocks_sent,
                rate = %format!("{} B/s", report.bytes_per_sec()),
                "Transfer confirmed"
            );
            println!("=== Flashing successful ===");
        }
        Err(e) if e.data_possibly_valid() => {
            warn!("{}", e);
            println!("Warning: No DONE signal received (data may still be valid)");
        }
        Err(e) => {
            error!("Error: {}", e);
            if let TransferError::Connection { .. } = e {
                let ports = SerialPortChannel::available_ports();
                if ports.is_empty() {
                    println!("No serial ports detected");
                } else {
                    println!("Available ports: {}", ports.join(", "));
                }
            }
            process::exit(1);
        }
    }
}

fn missing_input(path: &Path) -> Option<String> {
    (!path.exists()).then(|| format!("Error: file '{}' not found", path.display()))
}
