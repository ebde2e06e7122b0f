//! Carrier capacity.
//!
//! Capacity is the largest payload, in bytes, that is guaranteed to fit once
//! framing overhead is paid: one byte per 8×8 block for images, one bit per
//! `2 × delay` samples for audio.

use crate::frame::FrameLayout;
use crate::stego::dct::BLOCK_SIZE;

/// Number of whole 8×8 blocks in a `width × height` image.
pub fn image_blocks(width: u32, height: u32) -> usize {
    (width as usize / BLOCK_SIZE) * (height as usize / BLOCK_SIZE)
}

/// Payload capacity of an image with `blocks` blocks.
pub fn image_capacity(blocks: usize, encrypted: bool) -> usize {
    blocks.saturating_sub(FrameLayout::IMAGE.overhead(encrypted))
}

/// Number of whole bit-slots in `frames` samples of a mono signal.
pub fn audio_slots(frames: usize, delay: usize) -> usize {
    if delay == 0 {
        return 0;
    }
    frames / (2 * delay)
}

/// Payload capacity of an audio carrier with `frames` samples per channel.
pub fn audio_capacity(frames: usize, delay: usize, encrypted: bool) -> usize {
    (audio_slots(frames, delay) / 8).saturating_sub(FrameLayout::AUDIO.overhead(encrypted))
}
