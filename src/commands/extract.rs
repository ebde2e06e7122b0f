//! Extract command - recover a hidden file from a carrier.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use super::{build_stego, print_progress, CommandExecutor};

/// Extract hidden data from a carrier.
///
/// Embedding parameters are not stored in the carrier: pass the same
/// --config that was used to hide.
#[derive(Args, Debug)]
pub struct ExtractCommand {
    /// Carrier file that holds hidden data
    #[arg(short, long)]
    pub carrier: PathBuf,

    /// File to write the recovered bytes to
    #[arg(short, long)]
    pub output: PathBuf,

    /// Password the payload was encrypted with
    #[arg(short, long)]
    pub password: Option<String>,

    /// JSON file with embedding parameters
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Worker threads (default: one per CPU)
    #[arg(short, long)]
    pub threads: Option<usize>,
}

impl CommandExecutor for ExtractCommand {
    fn execute(&self) -> Result<()> {
        let stego = build_stego(self.config.as_deref(), self.threads)?;

        let payload = stego
            .extract(&self.carrier, self.password.as_deref(), Some(&print_progress))
            .with_context(|| format!("Failed to extract data from {}", self.carrier.display()))?;

        std::fs::write(&self.output, &payload)
            .with_context(|| format!("Failed to write {}", self.output.display()))?;

        eprintln!("Extracted {} bytes to {}", payload.len(), self.output.display());
        Ok(())
    }
}
