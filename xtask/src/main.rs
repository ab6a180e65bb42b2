use anyhow::Result;
use clap::{Parser, Subcommand};
use fontflash_core::config::{DEFAULT_CONFIG_FILE, ToolConfig};
use std::path::Path;
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Tasks for the project", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the project
    Build,
    /// Convert the font table, then flash it
    Flash,
    /// Run the font table converter
    Convert,
    /// Write a configuration file with every default spelled out
    InitConfig,
}

fn cargo_run(package: &str) -> Result<()> {
    let status = Command::new("cargo")
        .arg("run")
        .arg("-p")
        .arg(package)
        .status()?;
    if !status.success() {
        anyhow::bail!("{} failed", package);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Build => {
            println!("Building project...");
            let status = Command::new("cargo").arg("build").status()?;
            if !status.success() {
                anyhow::bail!("Build failed");
            }
        }
        Commands::Flash => {
            println!("Converting font table...");
            cargo_run("fontflash-convert")?;
            println!("Flashing...");
            cargo_run("fontflash-cli")?;
        }
        Commands::Convert => {
            println!("Converting font table...");
            cargo_run("fontflash-convert")?;
        }
        Commands::InitConfig => {
            if Path::new(DEFAULT_CONFIG_FILE).exists() {
                anyhow::bail!("{} already exists", DEFAULT_CONFIG_FILE);
            }
            ToolConfig::default().save_to_file(DEFAULT_CONFIG_FILE)?;
            println!("Wrote {}", DEFAULT_CONFIG_FILE);
        }
    }

    Ok(())
}
