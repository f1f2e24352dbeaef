use crate::models::BoundingBox;
use crate::utils::grayscale::to_grayscale;
use image::{GenericImageView, GrayImage, RgbImage};
use std::env;
use std::fs;
use std::io;
use std::path::Path;

fn max_dim_from_env() -> Option<u32> {
    match env::var("BARCODE_MAX_DIM") {
        Ok(value) => match value.trim().parse::<u32>() {
            Ok(0) => None,
            Ok(v) => Some(v),
            Err(_) => None,
        },
        Err(_) => None,
    }
}

/// Load an image as RGB, downscaled to fit `BARCODE_MAX_DIM` when set.
///
/// Returns the image and the factor that maps its coordinates back to the
/// file's (1.0 when no resize happened).
pub fn load_rgb<P: AsRef<Path>>(path: P) -> Result<(RgbImage, f32), image::ImageError> {
    let img = image::open(path)?;
    let (orig_w, orig_h) = img.dimensions();
    match max_dim_from_env() {
        Some(max_dim) if orig_w.max(orig_h) > max_dim => {
            let resized = img.resize(max_dim, max_dim, image::imageops::FilterType::Triangle);
            let scale = orig_w as f32 / resized.width().max(1) as f32;
            Ok((resized.to_rgb8(), scale))
        }
        _ => Ok((img.to_rgb8(), 1.0)),
    }
}

/// Load an image and convert it to grayscale.
pub fn load_gray<P: AsRef<Path>>(path: P) -> Result<GrayImage, image::ImageError> {
    let (rgb, _) = load_rgb(path)?;
    Ok(to_grayscale(&rgb))
}

/// Map a box from file coordinates into a frame downscaled by `scale`.
pub fn scale_box(bbox: &BoundingBox, scale: f32) -> BoundingBox {
    BoundingBox::new(bbox.x1 / scale, bbox.y1 / scale, bbox.x2 / scale, bbox.y2 / scale)
}

/// Parse boxes from text, one `x1,y1,x2,y2` per line.
///
/// Blank lines and lines starting with `#` are skipped.
pub fn parse_boxes(text: &str) -> Result<Vec<BoundingBox>, String> {
    text.lines()
        .enumerate()
        .map(|(n, line)| (n, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(n, line)| {
            line.parse::<BoundingBox>()
                .map_err(|e| format!("line {}: {e}", n + 1))
        })
        .collect()
}

/// Read a box file, see [`parse_boxes`].
pub fn read_boxes<P: AsRef<Path>>(path: P) -> io::Result<Vec<BoundingBox>> {
    let text = fs::read_to_string(path)?;
    parse_boxes(&text).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Summary statistics for grayscale data.
#[derive(Debug, Clone, Copy)]
pub struct GrayStats {
    /// Minimum grayscale value.
    pub min: u8,
    /// Maximum grayscale value.
    pub max: u8,
    /// Average grayscale value.
    pub avg: u8,
}

/// Compute min/max/avg for grayscale values.
pub fn grayscale_stats(gray: &GrayImage) -> GrayStats {
    let mut min = u8::MAX;
    let mut max = u8::MIN;
    let mut sum: u64 = 0;
    for &v in gray.as_raw() {
        min = min.min(v);
        max = max.max(v);
        sum += v as u64;
    }
    let pixels = gray.as_raw().len();
    let avg = if pixels == 0 {
        0
    } else {
        (sum / pixels as u64) as u8
    };
    GrayStats { min, max, avg }
}
