//! 8×8 orthonormal DCT-II and zigzag scan order.
//!
//! Blocks are 64 `f64` samples in natural (row-major) order, i.e.
//! `index = row * 8 + col`, for both pixels and coefficients. The transform
//! is applied to raw 0–255 values without a level shift.

use std::sync::OnceLock;

/// Block edge length.
pub const BLOCK_SIZE: usize = 8;

/// Samples per block.
pub const BLOCK_LEN: usize = BLOCK_SIZE * BLOCK_SIZE;

/// Maps zigzag index (0–63) to natural row-major index (0–63).
pub const ZIGZAG_TO_NATURAL: [usize; 64] = [
     0,  1,  8, 16,  9,  2,  3, 10,
    17, 24, 32, 25, 18, 11,  4,  5,
    12, 19, 26, 33, 40, 48, 41, 34,
    27, 20, 13,  6,  7, 14, 21, 28,
    35, 42, 49, 56, 57, 50, 43, 36,
    29, 22, 15, 23, 30, 37, 44, 51,
    58, 59, 52, 45, 38, 31, 39, 46,
    53, 60, 61, 54, 47, 55, 62, 63,
];

/// Half-width of the window the settled coefficient must land in, around
/// the centre of its integer bucket.
const SETTLE_TOLERANCE: f64 = 0.25;

/// Upper bound on single-pixel nudges while settling one block.
const MAX_SETTLE_STEPS: usize = BLOCK_LEN * 256;

/// `BASIS[u][x] = C(u) * cos((2x + 1) * u * PI / 16)`, with
/// `C(0) = sqrt(1/8)` and `C(u > 0) = 1/2`.
static BASIS: OnceLock<[[f64; BLOCK_SIZE]; BLOCK_SIZE]> = OnceLock::new();

fn basis() -> &'static [[f64; BLOCK_SIZE]; BLOCK_SIZE] {
    BASIS.get_or_init(|| {
        let mut table = [[0.0f64; BLOCK_SIZE]; BLOCK_SIZE];
        for (u, row) in table.iter_mut().enumerate() {
            let norm = if u == 0 { (1.0f64 / 8.0).sqrt() } else { 0.5 };
            for (x, value) in row.iter_mut().enumerate() {
                *value = norm
                    * ((2 * x + 1) as f64 * u as f64 * std::f64::consts::PI / 16.0).cos();
            }
        }
        table
    })
}

/// Forward 2-D DCT of one block.
pub fn forward(pixels: &[f64; BLOCK_LEN]) -> [f64; BLOCK_LEN] {
    let b = basis();

    // Rows first: temp[y][v] = sum_x pixels[y][x] * B[v][x]
    let mut temp = [0.0f64; BLOCK_LEN];
    for y in 0..BLOCK_SIZE {
        for v in 0..BLOCK_SIZE {
            let mut sum = 0.0;
            for x in 0..BLOCK_SIZE {
                sum += pixels[y * BLOCK_SIZE + x] * b[v][x];
            }
            temp[y * BLOCK_SIZE + v] = sum;
        }
    }

    // Then columns: out[u][v] = sum_y temp[y][v] * B[u][y]
    let mut out = [0.0f64; BLOCK_LEN];
    for u in 0..BLOCK_SIZE {
        for v in 0..BLOCK_SIZE {
            let mut sum = 0.0;
            for y in 0..BLOCK_SIZE {
                sum += temp[y * BLOCK_SIZE + v] * b[u][y];
            }
            out[u * BLOCK_SIZE + v] = sum;
        }
    }
    out
}

/// Inverse 2-D DCT of one block.
pub fn inverse(coeffs: &[f64; BLOCK_LEN]) -> [f64; BLOCK_LEN] {
    let b = basis();

    let mut temp = [0.0f64; BLOCK_LEN];
    for u in 0..BLOCK_SIZE {
        for x in 0..BLOCK_SIZE {
            let mut sum = 0.0;
            for v in 0..BLOCK_SIZE {
                sum += coeffs[u * BLOCK_SIZE + v] * b[v][x];
            }
            temp[u * BLOCK_SIZE + x] = sum;
        }
    }

    let mut out = [0.0f64; BLOCK_LEN];
    for y in 0..BLOCK_SIZE {
        for x in 0..BLOCK_SIZE {
            let mut sum = 0.0;
            for u in 0..BLOCK_SIZE {
                sum += temp[u * BLOCK_SIZE + x] * b[u][y];
            }
            out[y * BLOCK_SIZE + x] = sum;
        }
    }
    out
}

/// Contribution of each pixel to the coefficient at natural index `natural`.
fn pixel_weights(natural: usize) -> [f64; BLOCK_LEN] {
    let b = basis();
    let (u, v) = (natural / BLOCK_SIZE, natural % BLOCK_SIZE);
    let mut weights = [0.0f64; BLOCK_LEN];
    for y in 0..BLOCK_SIZE {
        for x in 0..BLOCK_SIZE {
            weights[y * BLOCK_SIZE + x] = b[u][y] * b[v][x];
        }
    }
    weights
}

/// Rounds and clips every sample to the 8-bit range.
pub fn quantize(pixels: &mut [f64; BLOCK_LEN]) {
    for p in pixels.iter_mut() {
        *p = p.round().clamp(0.0, 255.0);
    }
}

/// Nudges 8-bit pixels by ±1 until the coefficient at `natural` is within
/// [`SETTLE_TOLERANCE`] of `target`.
///
/// `pixels` must already hold integer values in 0–255. Every nudge moves
/// the coefficient by at most 0.25, so the window cannot be stepped over.
/// Returns `false` if the step budget ran out first.
pub fn settle(pixels: &mut [f64; BLOCK_LEN], natural: usize, target: f64) -> bool {
    let weights = pixel_weights(natural);

    let mut order: Vec<usize> = (0..BLOCK_LEN).collect();
    order.sort_by(|&a, &b| weights[b].abs().total_cmp(&weights[a].abs()));

    let mut current: f64 = pixels.iter().zip(weights.iter()).map(|(p, w)| p * w).sum();
    let mut cursor = 0;

    for _ in 0..MAX_SETTLE_STEPS {
        let error = target - current;
        if error.abs() <= SETTLE_TOLERANCE {
            return true;
        }

        let found = (0..BLOCK_LEN).map(|k| (cursor + k) % BLOCK_LEN).find_map(|pos| {
            let idx = order[pos];
            let step = if (error > 0.0) == (weights[idx] > 0.0) { 1.0 } else { -1.0 };
            let next = pixels[idx] + step;
            (weights[idx] != 0.0 && (0.0..=255.0).contains(&next)).then_some((pos, idx, step))
        });

        let Some((pos, idx, step)) = found else {
            return false;
        };

        pixels[idx] += step;
        current += weights[idx] * step;
        cursor = (pos + 1) % BLOCK_LEN;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block(seed: usize) -> [f64; BLOCK_LEN] {
        let mut block = [0.0; BLOCK_LEN];
        for (i, p) in block.iter_mut().enumerate() {
            *p = ((i * 37 + seed * 11) % 256) as f64;
        }
        block
    }

    #[test]
    fn test_zigzag_covers_all_indices() {
        let mut seen = [false; BLOCK_LEN];
        for &idx in &ZIGZAG_TO_NATURAL {
            assert!(!seen[idx], "duplicate natural index {idx}");
            seen[idx] = true;
        }
        assert!(seen.iter().all(|&s| s));
        // Second zigzag element is row 0, column 1.
        assert_eq!(ZIGZAG_TO_NATURAL[1], 1);
        assert_eq!(ZIGZAG_TO_NATURAL[2], 8);
    }

    #[test]
    fn test_forward_inverse_roundtrip() {
        let block = sample_block(3);
        let back = inverse(&forward(&block));
        for (a, b) in block.iter().zip(back.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_flat_block_has_only_dc() {
        let block = [100.0; BLOCK_LEN];
        let coeffs = forward(&block);

        // Orthonormal scaling: DC = 8 * mean.
        assert!((coeffs[0] - 800.0).abs() < 1e-9);
        assert!(coeffs[1..].iter().all(|c| c.abs() < 1e-9));
    }

    #[test]
    fn test_transform_preserves_energy() {
        let block = sample_block(9);
        let coeffs = forward(&block);
        let e_pixels: f64 = block.iter().map(|p| p * p).sum();
        let e_coeffs: f64 = coeffs.iter().map(|c| c * c).sum();
        assert!((e_pixels - e_coeffs).abs() < 1e-6 * e_pixels);
    }

    #[test]
    fn test_settle_lands_in_bucket_centre() {
        for (seed, byte) in [(0usize, 0u8), (1, 17), (2, 128), (3, 255)] {
            let mut coeffs = forward(&sample_block(seed));
            let target = byte as f64 + 0.5;
            coeffs[1] = target;
            let mut pixels = inverse(&coeffs);
            quantize(&mut pixels);

            assert!(settle(&mut pixels, 1, target));
            assert!(pixels.iter().all(|p| (0.0..=255.0).contains(p) && p.fract() == 0.0));
            let measured = forward(&pixels)[1];
            assert!((measured - target).abs() <= SETTLE_TOLERANCE + 1e-9);
            assert_eq!(measured as u8, byte);
        }
    }

    #[test]
    fn test_settle_on_saturated_block() {
        // A white block cannot go brighter, so only darkening nudges are left.
        let mut coeffs = forward(&[255.0; BLOCK_LEN]);
        coeffs[1] = 255.5;
        let mut pixels = inverse(&coeffs);
        quantize(&mut pixels);

        assert!(settle(&mut pixels, 1, 255.5));
        assert_eq!(forward(&pixels)[1] as u8, 255);
    }

    #[test]
    fn test_settle_gives_up_on_unreachable_target() {
        // No 8-bit block has a first AC coefficient anywhere near this.
        let mut pixels = sample_block(4);
        assert!(!settle(&mut pixels, 1, 5000.0));
        assert!(pixels.iter().all(|p| (0.0..=255.0).contains(p)));
    }

    #[test]
    fn test_settle_other_positions() {
        for zigzag in [0usize, 2, 5, 20, 63] {
            let natural = ZIGZAG_TO_NATURAL[zigzag];
            let mut coeffs = forward(&sample_block(zigzag));
            coeffs[natural] = 42.5;
            let mut pixels = inverse(&coeffs);
            quantize(&mut pixels);

            assert!(settle(&mut pixels, natural, 42.5));
            assert_eq!(forward(&pixels)[natural] as u8, 42);
        }
    }
}
