//! Variant generation: independent preprocessed renderings of one crop.
//!
//! Every crop yields the same four variants in the same order:
//!
//! 1. [`Method::Original`] - grayscale only
//! 2. [`Method::AdaptiveThresholdClosing`] - adaptive Gaussian threshold
//!    (block 11, offset 2) then a 3x3 closing, reconnecting broken bars
//! 3. [`Method::SharpenUpscale`] - 3x3 sharpening then 2x cubic upscale, for
//!    small or blurry codes
//! 4. [`Method::OtsuErosion`] - Otsu binarization then one 3x3 erosion,
//!    removing ink bleed
//!
//! Generation is pure: the same crop always yields identical variants.

use image::{GrayImage, RgbImage, imageops};
use imageproc::distance_transform::Norm;
use imageproc::morphology;

use crate::models::Method;
use crate::utils::binarization::{adaptive_gaussian_binarize, otsu_binarize};
use crate::utils::filter::sharpen;
use crate::utils::grayscale::to_grayscale;

/// Block size of the adaptive threshold window
pub const ADAPTIVE_BLOCK_SIZE: u32 = 11;
/// Constant subtracted from the local Gaussian mean
pub const ADAPTIVE_OFFSET: i32 = 2;
/// Upscale factor of the sharpened variant
pub const UPSCALE_FACTOR: u32 = 2;

/// One preprocessed rendering of a crop
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    /// Preprocessed pixels
    pub image: GrayImage,
    /// How the pixels were produced
    pub method: Method,
}

impl Variant {
    /// Pair an image with the method that produced it
    pub fn new(image: GrayImage, method: Method) -> Self {
        Self { image, method }
    }
}

/// Generate the four variants of an RGB crop, in [`Method::ALL`] order
pub fn generate(crop: &RgbImage) -> Vec<Variant> {
    generate_from_gray(&to_grayscale(crop))
}

/// Generate the four variants from an already grayscale crop
pub fn generate_from_gray(gray: &GrayImage) -> Vec<Variant> {
    Method::ALL
        .iter()
        .map(|&method| Variant::new(render(gray, method), method))
        .collect()
}

/// Render a single variant
pub fn render(gray: &GrayImage, method: Method) -> GrayImage {
    match method {
        Method::Original => gray.clone(),
        Method::AdaptiveThresholdClosing => adaptive_threshold_closing(gray),
        Method::SharpenUpscale => sharpen_upscale(gray),
        Method::OtsuErosion => otsu_erosion(gray),
    }
}

fn adaptive_threshold_closing(gray: &GrayImage) -> GrayImage {
    let binary = adaptive_gaussian_binarize(gray, ADAPTIVE_BLOCK_SIZE, ADAPTIVE_OFFSET);
    // LInf radius 1 is the 3x3 all-ones structuring element
    morphology::close(&binary, Norm::LInf, 1)
}

fn sharpen_upscale(gray: &GrayImage) -> GrayImage {
    let sharpened = sharpen(gray);
    imageops::resize(
        &sharpened,
        gray.width() * UPSCALE_FACTOR,
        gray.height() * UPSCALE_FACTOR,
        imageops::FilterType::CatmullRom,
    )
}

fn otsu_erosion(gray: &GrayImage) -> GrayImage {
    let binary = otsu_binarize(gray);
    morphology::erode(&binary, Norm::LInf, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn stripes(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, _| {
            if (x / 4) % 2 == 0 {
                Rgb([20, 20, 20])
            } else {
                Rgb([230, 230, 230])
            }
        })
    }

    #[test]
    fn test_four_variants_in_fixed_order() {
        let variants = generate(&stripes(40, 12));
        let methods: Vec<Method> = variants.iter().map(|v| v.method).collect();
        assert_eq!(methods, Method::ALL.to_vec());
    }

    #[test]
    fn test_variant_dimensions() {
        let variants = generate(&stripes(40, 12));
        assert_eq!(variants[0].image.dimensions(), (40, 12));
        assert_eq!(variants[1].image.dimensions(), (40, 12));
        assert_eq!(variants[2].image.dimensions(), (80, 24));
        assert_eq!(variants[3].image.dimensions(), (40, 12));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let crop = stripes(33, 17);
        assert_eq!(generate(&crop), generate(&crop));
    }

    #[test]
    fn test_binary_variants_are_binary() {
        let variants = generate(&stripes(40, 12));
        for v in [&variants[1], &variants[3]] {
            assert!(v.image.iter().all(|&p| p == 0 || p == 255), "{}", v.method);
        }
    }

    #[test]
    fn test_erosion_widens_dark_bars() {
        let gray = to_grayscale(&stripes(40, 12));
        let dark = |img: &GrayImage| img.iter().filter(|&&p| p == 0).count();
        let otsu = otsu_binarize(&gray);
        let eroded = render(&gray, Method::OtsuErosion);
        assert!(dark(&eroded) > dark(&otsu));
    }

    #[test]
    fn test_single_pixel_crop() {
        let variants = generate(&RgbImage::from_pixel(1, 1, Rgb([100, 100, 100])));
        assert_eq!(variants.len(), 4);
        assert_eq!(variants[2].image.dimensions(), (2, 2));
    }
}
