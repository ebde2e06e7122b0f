//! Capacity command - how much a carrier can hold.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use super::{build_stego, CommandExecutor};

/// Show how many payload bytes a carrier can hold.
#[derive(Args, Debug)]
pub struct CapacityCommand {
    /// Carrier file to inspect
    #[arg(short, long)]
    pub carrier: PathBuf,

    /// Account for password encryption overhead
    #[arg(short, long)]
    pub encrypted: bool,

    /// JSON file with embedding parameters
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl CommandExecutor for CapacityCommand {
    fn execute(&self) -> Result<()> {
        let stego = build_stego(self.config.as_deref(), Some(1))?;
        let capacity = stego
            .capacity(&self.carrier, self.encrypted)
            .with_context(|| format!("Failed to inspect {}", self.carrier.display()))?;

        println!("{}", capacity);
        if self.encrypted {
            eprintln!("(with password; compressible image payloads may fit more)");
        }
        Ok(())
    }
}
