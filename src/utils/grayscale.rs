/// Convert RGB crops to grayscale
/// Y = 0.299*R + 0.587*G + 0.114*B
/// Uses fast integer arithmetic: Y = (76*R + 150*G + 29*B) >> 8
use image::{GrayImage, RgbImage};
use rayon::prelude::*;

/// Coefficients for grayscale conversion: Y = (76*R + 150*G + 29*B) >> 8
const COEF_R: u32 = 76;
const COEF_G: u32 = 150;
const COEF_B: u32 = 29;

/// Crops at or above this pixel count are converted row-parallel
const PARALLEL_MIN_PIXELS: usize = 640 * 480;

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    let lum = (COEF_R * r as u32 + COEF_G * g as u32 + COEF_B * b as u32) >> 8;
    lum.min(255) as u8
}

/// Convert an RGB image to grayscale, choosing the parallel path for large inputs
pub fn to_grayscale(rgb: &RgbImage) -> GrayImage {
    if (rgb.width() as usize) * (rgb.height() as usize) >= PARALLEL_MIN_PIXELS {
        rgb_to_grayscale_parallel(rgb)
    } else {
        rgb_to_grayscale(rgb)
    }
}

/// Convert an RGB image to grayscale on the calling thread
pub fn rgb_to_grayscale(rgb: &RgbImage) -> GrayImage {
    let (width, height) = rgb.dimensions();
    let mut gray = Vec::with_capacity(width as usize * height as usize);

    // Process 8 pixels at a time with manual unrolling
    let mut chunks = rgb.as_raw().chunks_exact(24);
    for chunk in &mut chunks {
        for px in chunk.chunks_exact(3) {
            gray.push(luma(px[0], px[1], px[2]));
        }
    }

    // Process remaining pixels
    for px in chunks.remainder().chunks_exact(3) {
        gray.push(luma(px[0], px[1], px[2]));
    }

    GrayImage::from_raw(width, height, gray).unwrap_or_else(|| GrayImage::new(width, height))
}

/// Convert an RGB image to grayscale, processing rows in parallel
pub fn rgb_to_grayscale_parallel(rgb: &RgbImage) -> GrayImage {
    let (width, height) = rgb.dimensions();
    let mut gray = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return gray;
    }

    let src = rgb.as_raw();
    let row_len = width as usize;
    gray.par_chunks_mut(row_len).enumerate().for_each(|(y, row)| {
        let row_start = y * row_len * 3;
        for (x, out) in row.iter_mut().enumerate() {
            let idx = row_start + x * 3;
            *out = luma(src[idx], src[idx + 1], src[idx + 2]);
        }
    });

    gray
}
