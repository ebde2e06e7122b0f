//! # Stegosaurus - hide files in pictures and sound
//!
//! Stegosaurus hides an arbitrary byte payload inside a carrier file so the
//! carrier still looks (or sounds) unchanged, and recovers the exact payload
//! later.
//!
//! ## Carriers
//!
//! - **Images** (PNG, JPEG, BMP): one byte per 8×8 block, written into a DCT
//!   coefficient of every colour channel. The result is saved as PNG.
//! - **Audio** (WAV): one bit per slot of `2 × delay` samples, carried by the
//!   presence or absence of a short echo.
//!
//! ## Framing
//!
//! Every payload is framed before it is embedded:
//!
//! ```text
//! [length: u32 BE] [CRC-32: u32 BE, audio only] [body]
//! ```
//!
//! With a password the body is `salt || nonce || ciphertext`: the key is
//! derived with PBKDF2-HMAC-SHA256 and the payload sealed with
//! ChaCha20-Poly1305 (image payloads are deflated first).
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use stegosaurus::{Stego, StegoConfig};
//!
//! let stego = Stego::new(StegoConfig::default()).unwrap();
//! let output = stego
//!     .hide(Path::new("cat.png"), b"meet at noon", Some("pw"), None)
//!     .unwrap();
//!
//! let payload = stego.extract(&output, Some("pw"), None).unwrap();
//! assert_eq!(payload, b"meet at noon");
//! ```
//!
//! Lossy re-encoding of an output carrier (JPEG, MP3, resampling) destroys
//! the hidden data.

pub mod config;
pub mod crypto;
pub mod error;
pub mod frame;
pub mod scheduler;
pub mod stego;

pub use config::{AudioConfig, ImageConfig, StegoConfig};
pub use error::{Result, StegoError};
pub use frame::{frame, unframe, FrameLayout};
pub use scheduler::{Progress, ProgressSink, WorkerPool};
pub use stego::{extract, hide, AudioStego, CarrierKind, ImageStego, Stego};

/// Current version of the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
