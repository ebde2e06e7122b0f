//! Hide command - embed a file in an image or WAV carrier.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use super::{build_stego, print_progress, CommandExecutor};

/// Hide a file inside an image or WAV carrier.
///
/// Images are written as PNG, audio as WAV with the carrier's format.
/// Without --output the result goes next to the carrier as <name>_hidden.<ext>.
#[derive(Args, Debug)]
pub struct HideCommand {
    /// Carrier file (.png, .jpg, .jpeg, .bmp, .wav)
    #[arg(short, long)]
    pub carrier: PathBuf,

    /// File whose bytes will be hidden
    #[arg(short, long)]
    pub input: PathBuf,

    /// Password to encrypt the payload with
    #[arg(short, long)]
    pub password: Option<String>,

    /// Where to write the modified carrier (must differ from the carrier)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// JSON file with embedding parameters
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Worker threads (default: one per CPU)
    #[arg(short, long)]
    pub threads: Option<usize>,
}

impl CommandExecutor for HideCommand {
    fn execute(&self) -> Result<()> {
        let stego = build_stego(self.config.as_deref(), self.threads)?;
        let payload = std::fs::read(&self.input)
            .with_context(|| format!("Failed to read {}", self.input.display()))?;

        let password = self.password.as_deref();
        let written = match &self.output {
            Some(output) => {
                stego.hide_to(&self.carrier, output, &payload, password, Some(&print_progress))
            }
            None => stego.hide(&self.carrier, &payload, password, Some(&print_progress)),
        }
        .with_context(|| format!("Failed to hide data in {}", self.carrier.display()))?;

        eprintln!("Hid {} bytes in {}", payload.len(), written.display());
        Ok(())
    }
}
