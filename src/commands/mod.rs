//! Command module - Strategy pattern for CLI commands.
//!
//! Each command is a separate module implementing the `CommandExecutor` trait.

mod capacity;
mod extract;
mod hide;

pub use capacity::CapacityCommand;
pub use extract::ExtractCommand;
pub use hide::HideCommand;

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use stegosaurus::{Stego, StegoConfig, WorkerPool};

/// Trait for command execution - Strategy pattern.
///
/// Each command struct holds its parsed arguments and implements
/// this trait to define its execution logic.
pub trait CommandExecutor {
    /// Executes the command with its parsed arguments.
    fn execute(&self) -> Result<()>;
}

/// Loads the optional JSON config and builds a codec on a pool of `threads`
/// workers (`None` = one per CPU).
fn build_stego(config: Option<&Path>, threads: Option<usize>) -> Result<Stego> {
    let config = match config {
        Some(path) => StegoConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => StegoConfig::default(),
    };

    let pool = WorkerPool::new(threads.unwrap_or(0)).context("Failed to start worker pool")?;
    Stego::with_pool(config, pool).context("Invalid configuration")
}

/// Renders progress as a percentage on stderr.
fn print_progress(fraction: f64) {
    let mut stderr = std::io::stderr().lock();
    let _ = write!(stderr, "\r{:>3}%", (fraction * 100.0).round() as u32);
    if fraction >= 1.0 {
        let _ = writeln!(stderr);
    }
    let _ = stderr.flush();
}
