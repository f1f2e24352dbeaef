//! Global and adaptive binarization of grayscale crops.
//!
//! Outputs are 8-bit images holding only 0 (dark) and 255 (light), the
//! convention the morphology operators and decode engines expect.

use image::GrayImage;

use super::filter::gaussian_blur;

/// Sigma used for a Gaussian window of `block_size` taps when none is given
pub fn gaussian_sigma_for(block_size: u32) -> f32 {
    0.3 * ((block_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Simple global threshold binarization: `src > level` becomes 255
pub fn threshold_binarize(gray: &GrayImage, level: u8) -> GrayImage {
    let mut binary = gray.clone();
    for px in binary.iter_mut() {
        *px = if *px > level { 255 } else { 0 };
    }
    binary
}

/// Convert grayscale image to binary using Otsu's thresholding method
pub fn otsu_binarize(gray: &GrayImage) -> GrayImage {
    let level = imageproc::contrast::otsu_level(gray);
    threshold_binarize(gray, level)
}

/// Adaptive Gaussian thresholding.
///
/// Each pixel is compared with the Gaussian-weighted mean of its
/// `block_size x block_size` neighbourhood minus `offset`; pixels strictly
/// above that local threshold become 255. `block_size` must be odd and at
/// least 3, smaller or even values are bumped to the next valid size.
pub fn adaptive_gaussian_binarize(gray: &GrayImage, block_size: u32, offset: i32) -> GrayImage {
    let block_size = block_size.max(3) | 1;
    let mean = gaussian_blur(gray, block_size, gaussian_sigma_for(block_size));

    let mut binary = GrayImage::new(gray.width(), gray.height());
    for ((out, &src), &local) in binary.iter_mut().zip(gray.iter()).zip(mean.iter()) {
        *out = if src as i32 - local as i32 > -offset { 255 } else { 0 };
    }
    binary
}
