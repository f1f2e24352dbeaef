//! Synthetic linear barcodes for tests, benchmarks and the CLI.
//!
//! Symbols are drawn black on white, bars spanning the full image height,
//! with a light quiet zone left and right.

use std::fmt;
use std::str::FromStr;

use image::{GrayImage, Luma, Rgb, RgbImage};

use crate::engine::linear::{encode_code128, encode_code39, encode_ean13};

/// Symbologies the renderer can draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbology {
    /// Code 128, set B or C
    Code128,
    /// EAN-13 from 12 or 13 digits
    Ean13,
    /// Code 39 without check character
    Code39,
}

impl FromStr for Symbology {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "code128" => Ok(Self::Code128),
            "ean13" => Ok(Self::Ean13),
            "code39" => Ok(Self::Code39),
            other => Err(format!("unknown symbology {other:?}")),
        }
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Code128 => "code128",
            Self::Ean13 => "ean13",
            Self::Code39 => "code39",
        })
    }
}

/// Geometry of a rendered symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthOptions {
    /// Pixels per module
    pub module_px: u32,
    /// Bar height in pixels
    pub bar_height: u32,
    /// Quiet zone on each side, in modules
    pub quiet_modules: u32,
}

impl Default for SynthOptions {
    fn default() -> Self {
        Self {
            module_px: 3,
            bar_height: 60,
            quiet_modules: 10,
        }
    }
}

/// Render `text` in `symbology`; `None` when the text cannot be encoded
pub fn render(symbology: Symbology, text: &str, opts: &SynthOptions) -> Option<GrayImage> {
    let widths = match symbology {
        Symbology::Code128 => encode_code128(text)?,
        Symbology::Ean13 => encode_ean13(text)?,
        Symbology::Code39 => encode_code39(text)?,
    };
    Some(render_widths(&widths, opts))
}

/// Render a Code 128 symbol
pub fn render_code128(text: &str, opts: &SynthOptions) -> Option<GrayImage> {
    render(Symbology::Code128, text, opts)
}

/// Render an EAN-13 symbol
pub fn render_ean13(text: &str, opts: &SynthOptions) -> Option<GrayImage> {
    render(Symbology::Ean13, text, opts)
}

/// Render a Code 39 symbol
pub fn render_code39(text: &str, opts: &SynthOptions) -> Option<GrayImage> {
    render(Symbology::Code39, text, opts)
}

/// Draw bar-first element widths (in modules) between two quiet zones
fn render_widths(widths: &[u8], opts: &SynthOptions) -> GrayImage {
    let module_px = opts.module_px.max(1);
    let modules: u32 = widths.iter().map(|&w| w as u32).sum::<u32>() + 2 * opts.quiet_modules;
    let mut img = GrayImage::from_pixel(modules * module_px, opts.bar_height.max(1), Luma([255]));

    let mut x = opts.quiet_modules * module_px;
    for (i, &w) in widths.iter().enumerate() {
        let run = w as u32 * module_px;
        if i % 2 == 0 {
            for px in x..x + run {
                for y in 0..img.height() {
                    img.put_pixel(px, y, Luma([0]));
                }
            }
        }
        x += run;
    }
    img
}

/// Copy `code` into `frame` with its top-left corner at `(x, y)`, clipping at the frame edge
pub fn paste_into(frame: &mut RgbImage, code: &GrayImage, x: u32, y: u32) {
    for (cx, cy, px) in code.enumerate_pixels() {
        let (fx, fy) = (x + cx, y + cy);
        if fx < frame.width() && fy < frame.height() {
            let v = px[0];
            frame.put_pixel(fx, fy, Rgb([v, v, v]));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions() {
        let opts = SynthOptions::default();
        let img = render_ean13("400638133393", &opts).unwrap();
        assert_eq!(img.dimensions(), ((95 + 20) * 3, 60));
        // Quiet zone is light, first guard bar is dark
        assert_eq!(img.get_pixel(0, 0)[0], 255);
        assert_eq!(img.get_pixel(30, 0)[0], 0);
    }

    #[test]
    fn test_unencodable_text() {
        assert!(render_ean13("12345", &SynthOptions::default()).is_none());
        assert!(render_code39("lower#", &SynthOptions::default()).is_none());
    }

    #[test]
    fn test_symbology_parse() {
        assert_eq!("Code-128".parse::<Symbology>(), Ok(Symbology::Code128));
        assert_eq!("EAN_13".parse::<Symbology>(), Ok(Symbology::Ean13));
        assert!("qr".parse::<Symbology>().is_err());
    }

    #[test]
    fn test_paste_clips() {
        let mut frame = RgbImage::from_pixel(10, 10, Rgb([9, 9, 9]));
        let code = GrayImage::from_pixel(6, 6, Luma([0]));
        paste_into(&mut frame, &code, 7, 7);
        assert_eq!(frame.get_pixel(9, 9), &Rgb([0, 0, 0]));
        assert_eq!(frame.get_pixel(6, 6), &Rgb([9, 9, 9]));
    }
}
