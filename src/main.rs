//! Stegosaurus - hide files in pictures and sound
//!
//! Command-line front end: hide a file in a carrier, extract it again, or
//! check how much a carrier can hold. Set `RUST_LOG=debug` for stage logs.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{CapacityCommand, CommandExecutor, ExtractCommand, HideCommand};

/// Stegosaurus - hide files in pictures and sound
///
/// Images carry one byte per 8x8 block in a DCT coefficient; WAV audio
/// carries one bit per echo slot. Payloads can be password-encrypted.
#[derive(Parser)]
#[command(name = "stegosaurus")]
#[command(version)]
#[command(about = "Hide files in images (block DCT) and WAV audio (echo hiding)")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hide a file inside a carrier
    Hide(HideCommand),

    /// Extract hidden data from a carrier
    Extract(ExtractCommand),

    /// Show how many bytes a carrier can hold
    Capacity(CapacityCommand),
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Hide(cmd) => cmd.execute(),
        Commands::Extract(cmd) => cmd.execute(),
        Commands::Capacity(cmd) => cmd.execute(),
    }
}
