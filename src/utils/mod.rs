//! Image processing helpers for the variant generator
//!
//! - Grayscale conversion (RGB to luminance)
//! - Binarization (Otsu, fixed threshold, adaptive Gaussian)
//! - Linear filters (Gaussian blur, 3x3 sharpening)

pub mod binarization;
pub mod filter;
pub mod grayscale;
