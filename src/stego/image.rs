//! Block-DCT steganography for images.
//!
//! The image is cut into 8×8 blocks in raster order (partial edge blocks are
//! left alone). Each block carries one byte of the framed stream: the byte is
//! written into one DCT coefficient, selected by its zigzag position, of all
//! three colour channels. The coefficient is set to `byte + 0.5` and the
//! block's pixels are nudged until truncating the recomputed coefficient
//! gives the byte back.
//!
//! Output is always lossless PNG; alpha is dropped.

use std::io::Cursor;
use std::ops::Range;
use std::path::Path;

use image::{DynamicImage, ImageFormat, RgbImage};
use log::debug;

use crate::config::ImageConfig;
use crate::error::{Result, StegoError};
use crate::frame::{declared_len, frame, unframe, FrameLayout};
use crate::scheduler::{Progress, WorkerPool};
use crate::stego::capacity::{image_blocks, image_capacity};
use crate::stego::dct::{self, BLOCK_LEN, BLOCK_SIZE, ZIGZAG_TO_NATURAL};

/// Colour channels that carry the byte.
const CHANNELS: usize = 3;

/// One block of 8-bit samples per channel.
type BlockPixels = [[u8; BLOCK_LEN]; CHANNELS];

/// Image steganography handler.
#[derive(Clone)]
pub struct ImageStego {
    image: RgbImage,
}

impl ImageStego {
    /// Creates a new ImageStego from a file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let image = image::open(path.as_ref()).map_err(|e| {
            StegoError::Format(format!("cannot decode {}: {}", path.as_ref().display(), e))
        })?;
        Ok(Self::from_image(image))
    }

    /// Creates a new ImageStego from encoded bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| StegoError::Format(format!("cannot decode image: {e}")))?;
        Ok(Self::from_image(image))
    }

    /// Creates a new ImageStego from a DynamicImage.
    pub fn from_image(image: DynamicImage) -> Self {
        Self {
            image: image.to_rgb8(),
        }
    }

    /// Number of whole 8×8 blocks, i.e. bytes of framed stream.
    pub fn blocks(&self) -> usize {
        let (width, height) = self.image.dimensions();
        image_blocks(width, height)
    }

    /// Largest payload that always fits, in bytes.
    pub fn capacity(&self, encrypted: bool) -> usize {
        image_capacity(self.blocks(), encrypted)
    }

    /// Frames `payload` and embeds it.
    pub fn hide(
        &self,
        payload: &[u8],
        password: Option<&str>,
        config: &ImageConfig,
        pool: &WorkerPool,
        progress: &Progress<'_>,
    ) -> Result<Self> {
        let stream = frame(payload, password, FrameLayout::IMAGE)?;
        self.embed(&stream, config, pool, progress)
    }

    /// Extracts and unframes the hidden payload.
    pub fn extract(
        &self,
        password: Option<&str>,
        config: &ImageConfig,
        pool: &WorkerPool,
        progress: &Progress<'_>,
    ) -> Result<Vec<u8>> {
        let layout = FrameLayout::IMAGE;
        let header_len = layout.header_len();
        let blocks = self.blocks();

        if blocks < header_len {
            return Err(StegoError::Format(format!(
                "image has {blocks} blocks, fewer than the {header_len}-byte header"
            )));
        }

        let mut stream = self.read_blocks(0..header_len, config, pool, &Progress::silent())?;
        let body_len = declared_len(&stream)?;

        let end = header_len.saturating_add(body_len);
        if end > blocks {
            return Err(StegoError::Format(format!(
                "declared length {body_len} exceeds the {} blocks available",
                blocks - header_len
            )));
        }

        progress.set_total(body_len);
        stream.extend(self.read_blocks(header_len..end, config, pool, progress)?);
        debug!("Read {} bytes of framed stream from image", stream.len());

        unframe(&stream, password, layout)
    }

    /// Embeds an already framed stream, one byte per block.
    ///
    /// Blocks past the end of the stream are copied through untouched.
    pub fn embed(
        &self,
        stream: &[u8],
        config: &ImageConfig,
        pool: &WorkerPool,
        progress: &Progress<'_>,
    ) -> Result<Self> {
        config.validate()?;
        let blocks = self.blocks();
        if stream.len() > blocks {
            return Err(StegoError::Capacity {
                needed: stream.len(),
                available: blocks,
            });
        }

        let natural = ZIGZAG_TO_NATURAL[config.zigzag_index];
        progress.set_total(stream.len());

        let units: Vec<(usize, u8)> = stream.iter().copied().enumerate().collect();
        let encoded = pool.map_ordered(units, progress, |(index, byte)| {
            self.encode_block(index, byte, natural)
        });

        let unsettled = encoded.iter().filter(|(_, settled)| !settled).count();
        ensure_settled(unsettled, stream.len())?;

        let mut output = self.image.clone();
        for (index, (pixels, _)) in encoded.into_iter().enumerate() {
            self.store_block(&mut output, index, &pixels);
        }
        debug!("Embedded {} bytes into {} blocks", stream.len(), blocks);

        Ok(Self { image: output })
    }

    /// Reads the byte carried by each block in `range`.
    pub fn read_blocks(
        &self,
        range: Range<usize>,
        config: &ImageConfig,
        pool: &WorkerPool,
        progress: &Progress<'_>,
    ) -> Result<Vec<u8>> {
        config.validate()?;
        let natural = ZIGZAG_TO_NATURAL[config.zigzag_index];
        let indices: Vec<usize> = range.collect();
        Ok(pool.map_ordered(indices, progress, |index| self.decode_block(index, natural)))
    }

    fn encode_block(&self, index: usize, byte: u8, natural: usize) -> (BlockPixels, bool) {
        let target = byte as f64 + 0.5;
        let mut out = [[0u8; BLOCK_LEN]; CHANNELS];
        let mut settled = true;

        for (channel, samples) in out.iter_mut().enumerate() {
            let mut coeffs = dct::forward(&self.load_block(index, channel));
            coeffs[natural] = target;

            let mut pixels = dct::inverse(&coeffs);
            dct::quantize(&mut pixels);
            settled &= dct::settle(&mut pixels, natural, target);

            for (dst, src) in samples.iter_mut().zip(pixels.iter()) {
                *dst = *src as u8;
            }
        }
        (out, settled)
    }

    fn decode_block(&self, index: usize, natural: usize) -> u8 {
        let mut votes = [0u8; CHANNELS];
        for (channel, vote) in votes.iter_mut().enumerate() {
            let coeff = dct::forward(&self.load_block(index, channel))[natural];
            *vote = (coeff as i64).clamp(0, 255) as u8;
        }
        majority(votes)
    }

    /// Top-left pixel of block `index`.
    fn block_origin(&self, index: usize) -> (u32, u32) {
        let per_row = self.image.width() as usize / BLOCK_SIZE;
        let bx = index % per_row;
        let by = index / per_row;
        ((bx * BLOCK_SIZE) as u32, (by * BLOCK_SIZE) as u32)
    }

    fn load_block(&self, index: usize, channel: usize) -> [f64; BLOCK_LEN] {
        let (ox, oy) = self.block_origin(index);
        let mut block = [0.0f64; BLOCK_LEN];
        for y in 0..BLOCK_SIZE {
            for x in 0..BLOCK_SIZE {
                let pixel = self.image.get_pixel(ox + x as u32, oy + y as u32);
                block[y * BLOCK_SIZE + x] = pixel.0[channel] as f64;
            }
        }
        block
    }

    fn store_block(&self, output: &mut RgbImage, index: usize, pixels: &BlockPixels) {
        let (ox, oy) = self.block_origin(index);
        for y in 0..BLOCK_SIZE {
            for x in 0..BLOCK_SIZE {
                let pixel = output.get_pixel_mut(ox + x as u32, oy + y as u32);
                for (channel, samples) in pixels.iter().enumerate() {
                    pixel.0[channel] = samples[y * BLOCK_SIZE + x];
                }
            }
        }
    }

    /// Returns the image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| StegoError::Io(std::io::Error::other(e.to_string())))?;
        Ok(bytes)
    }

    /// Saves the image as PNG.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_png_bytes()?)?;
        Ok(())
    }

    /// Returns a reference to the underlying image.
    pub fn image(&self) -> &RgbImage {
        &self.image
    }
}

/// Fails if any block could not be settled onto its byte.
fn ensure_settled(unsettled: usize, blocks: usize) -> Result<()> {
    if unsettled > 0 {
        return Err(StegoError::Embedding(format!(
            "{unsettled} of {blocks} blocks could not hold their byte exactly"
        )));
    }
    Ok(())
}

/// Value at least two channels agree on, else the red channel's.
fn majority([r, g, b]: [u8; CHANNELS]) -> u8 {
    if g == b && r != g {
        g
    } else {
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn create_test_image(width: u32, height: u32) -> DynamicImage {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([
                ((x * 17) % 256) as u8,
                ((y * 23) % 256) as u8,
                (((x + y) * 31) % 256) as u8,
            ])
        });
        DynamicImage::ImageRgb8(img)
    }

    fn pool() -> WorkerPool {
        WorkerPool::new(2).unwrap()
    }

    fn roundtrip(stego: &ImageStego, data: &[u8], password: Option<&str>, config: &ImageConfig) {
        let pool = pool();
        let hidden = stego
            .hide(data, password, config, &pool, &Progress::silent())
            .unwrap();
        let extracted = hidden
            .extract(password, config, &pool, &Progress::silent())
            .unwrap();
        assert_eq!(extracted, data);
    }

    #[test]
    fn test_capacity() {
        let stego = ImageStego::from_image(create_test_image(256, 256));

        assert_eq!(stego.blocks(), 1024);
        assert_eq!(stego.capacity(false), 1020);
        assert_eq!(stego.capacity(true), 975);
    }

    #[test]
    fn test_hide_and_extract_small() {
        let stego = ImageStego::from_image(create_test_image(256, 256));
        roundtrip(&stego, b"hello world", None, &ImageConfig::default());
    }

    #[test]
    fn test_hide_and_extract_every_byte_value() {
        let stego = ImageStego::from_image(create_test_image(160, 160));
        let data: Vec<u8> = (0..=255).collect();
        roundtrip(&stego, &data, None, &ImageConfig::default());
    }

    #[test]
    fn test_hide_and_extract_with_password() {
        let stego = ImageStego::from_image(create_test_image(128, 128));
        roundtrip(&stego, b"classified", Some("hunter2"), &ImageConfig::default());
    }

    #[test]
    fn test_other_zigzag_positions() {
        let stego = ImageStego::from_image(create_test_image(64, 64));
        for zigzag_index in [0, 5, 20] {
            roundtrip(&stego, b"zigzag", None, &ImageConfig { zigzag_index });
        }
    }

    #[test]
    fn test_empty_data() {
        let stego = ImageStego::from_image(create_test_image(64, 64));
        roundtrip(&stego, &[], None, &ImageConfig::default());
    }

    #[test]
    fn test_image_too_small() {
        let stego = ImageStego::from_image(create_test_image(32, 32));
        let result = stego.hide(
            &[0u8; 13],
            None,
            &ImageConfig::default(),
            &pool(),
            &Progress::silent(),
        );

        assert!(matches!(
            result,
            Err(StegoError::Capacity {
                needed: 17,
                available: 16
            })
        ));
    }

    #[test]
    fn test_edge_pixels_untouched() {
        let original = ImageStego::from_image(create_test_image(20, 13));
        assert_eq!(original.blocks(), 2);

        let hidden = original
            .embed(&[7, 9], &ImageConfig::default(), &pool(), &Progress::silent())
            .unwrap();

        for y in 0..13 {
            for x in 0..20 {
                if x >= 16 || y >= 8 {
                    assert_eq!(hidden.image().get_pixel(x, y), original.image().get_pixel(x, y));
                }
            }
        }
    }

    #[test]
    fn test_png_roundtrip() {
        let pool = pool();
        let config = ImageConfig::default();
        let stego = ImageStego::from_image(create_test_image(100, 100));

        let hidden = stego
            .hide(b"Test PNG roundtrip", None, &config, &pool, &Progress::silent())
            .unwrap();

        let png_bytes = hidden.to_png_bytes().unwrap();
        let reloaded = ImageStego::from_bytes(&png_bytes).unwrap();
        let extracted = reloaded
            .extract(None, &config, &pool, &Progress::silent())
            .unwrap();

        assert_eq!(extracted, b"Test PNG roundtrip");
    }

    #[test]
    fn test_cropped_image_is_format_error() {
        let pool = pool();
        let config = ImageConfig::default();
        let stego = ImageStego::from_image(create_test_image(256, 256));
        let hidden = stego
            .hide(b"hello world", None, &config, &pool, &Progress::silent())
            .unwrap();

        // Only the four header blocks survive.
        let cropped = image::imageops::crop_imm(hidden.image(), 0, 0, 32, 8).to_image();
        let cropped = ImageStego::from_image(DynamicImage::ImageRgb8(cropped));

        let result = cropped.extract(None, &config, &pool, &Progress::silent());
        assert!(matches!(result, Err(StegoError::Format(_))));
    }

    #[test]
    fn test_save_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.png");
        let stego = ImageStego::from_image(create_test_image(16, 16));

        stego.save(&path).unwrap();

        let reloaded = ImageStego::from_file(&path).unwrap();
        assert_eq!(reloaded.image(), stego.image());
    }

    #[test]
    fn test_undecodable_bytes() {
        assert!(matches!(
            ImageStego::from_bytes(b"not an image"),
            Err(StegoError::Format(_))
        ));
    }

    #[test]
    fn test_unsettled_blocks_fail_the_embed() {
        assert!(ensure_settled(0, 64).is_ok());
        assert!(matches!(
            ensure_settled(1, 64),
            Err(StegoError::Embedding(msg)) if msg.contains("1 of 64")
        ));
    }

    #[test]
    fn test_majority_vote() {
        assert_eq!(majority([1, 1, 1]), 1);
        assert_eq!(majority([1, 2, 2]), 2);
        assert_eq!(majority([2, 1, 2]), 2);
        assert_eq!(majority([2, 2, 1]), 2);
        assert_eq!(majority([1, 2, 3]), 1);
    }
}
