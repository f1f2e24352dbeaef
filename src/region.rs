//! Region extraction: crop a localized box, plus margin, out of a frame.

use image::{RgbImage, imageops};

use crate::error::BoxError;
use crate::models::BoundingBox;

/// Pixels added on every side of a box before cropping
pub const DEFAULT_MARGIN: u32 = 10;

/// Pixel-aligned rectangle inside a frame, half-open on the right and bottom
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    /// Left column (inclusive)
    pub x: u32,
    /// Top row (inclusive)
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// Result of cropping a box out of a frame
#[derive(Debug, Clone, PartialEq)]
pub enum Crop {
    /// An owned copy of the clamped region
    Region {
        /// Cropped pixels
        image: RgbImage,
        /// Where the crop sits in the frame
        rect: PixelRect,
    },
    /// The clamped region has zero width or height; nothing can be decoded
    Empty,
}

impl Crop {
    /// True for [`Crop::Empty`]
    pub fn is_empty(&self) -> bool {
        matches!(self, Crop::Empty)
    }

    /// Cropped pixels, if any
    pub fn image(&self) -> Option<&RgbImage> {
        match self {
            Crop::Region { image, .. } => Some(image),
            Crop::Empty => None,
        }
    }
}

/// Expand `bbox` by `margin`, clamp it to a `width x height` frame and return
/// the pixel rectangle, or `None` when nothing of it remains.
///
/// Coordinates are truncated toward zero before the margin is applied.
pub fn clamp_region(
    bbox: &BoundingBox,
    margin: u32,
    width: u32,
    height: u32,
) -> Result<Option<PixelRect>, BoxError> {
    bbox.validate()?;

    let margin = margin as i64;
    let x1 = (bbox.x1.trunc() as i64 - margin).clamp(0, width as i64);
    let y1 = (bbox.y1.trunc() as i64 - margin).clamp(0, height as i64);
    let x2 = (bbox.x2.trunc() as i64 + margin).clamp(0, width as i64);
    let y2 = (bbox.y2.trunc() as i64 + margin).clamp(0, height as i64);

    if x2 <= x1 || y2 <= y1 {
        return Ok(None);
    }

    Ok(Some(PixelRect {
        x: x1 as u32,
        y: y1 as u32,
        width: (x2 - x1) as u32,
        height: (y2 - y1) as u32,
    }))
}

/// Crop `bbox` (expanded by `margin`) out of `frame`.
///
/// A malformed box is a contract violation and returns an error; a box whose
/// clamped region is empty returns [`Crop::Empty`].
pub fn extract(frame: &RgbImage, bbox: &BoundingBox, margin: u32) -> Result<Crop, BoxError> {
    let Some(rect) = clamp_region(bbox, margin, frame.width(), frame.height())? else {
        return Ok(Crop::Empty);
    };
    let image = imageops::crop_imm(frame, rect.x, rect.y, rect.width, rect.height).to_image();
    Ok(Crop::Region { image, rect })
}
