//! Region localization seam and the frame-level scanner built on it.
//!
//! The localizer (an object detection model in production) is an external
//! collaborator. It proposes boxes with a class and a confidence; the scanner
//! keeps the target class above the confidence floor and hands the boxes to
//! an [`EnsembleDecoder`].

use std::convert::Infallible;
use std::error::Error;

use image::RgbImage;

use crate::error::ScanError;
use crate::models::{BoundingBox, DetectionList};
use crate::pipeline::EnsembleDecoder;

/// One candidate region proposed by a localizer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Localization {
    /// Frame-relative box
    pub bbox: BoundingBox,
    /// Model class index
    pub class_id: u32,
    /// Model confidence in `[0, 1]`
    pub confidence: f32,
}

/// Finds candidate code regions in a frame.
///
/// Implementations may keep model state between calls, hence `&mut self`.
/// Boxes they return must be well formed; a malformed box makes the scan
/// fail with [`ScanError::InvalidBoundingBox`].
pub trait Localizer: Send {
    /// Failure type of [`Localizer::locate`]
    type Error: Into<Box<dyn Error + Send + Sync>>;

    /// Backend identifier used in logs
    fn name(&self) -> &'static str;

    /// Propose regions with at least `min_confidence`
    fn locate(&mut self, frame: &RgbImage, min_confidence: f32) -> Result<Vec<Localization>, Self::Error>;
}

/// Boxes of `target_class` with confidence at or above `min_confidence`, in input order
pub fn select_boxes(localizations: &[Localization], target_class: u32, min_confidence: f32) -> Vec<BoundingBox> {
    localizations
        .iter()
        .filter(|l| l.class_id == target_class && l.confidence >= min_confidence)
        .map(|l| l.bbox)
        .collect()
}

/// Proposes the whole frame as a single box.
///
/// Stands in for a model when the code is known to fill the image.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullFrameLocalizer;

impl Localizer for FullFrameLocalizer {
    type Error = Infallible;

    fn name(&self) -> &'static str {
        "full-frame"
    }

    fn locate(&mut self, frame: &RgbImage, _min_confidence: f32) -> Result<Vec<Localization>, Self::Error> {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }
        Ok(vec![Localization {
            bbox: BoundingBox::new(0.0, 0.0, width as f32, height as f32),
            class_id: 0,
            confidence: 1.0,
        }])
    }
}

/// A localizer and a decoder wired together
#[derive(Debug)]
pub struct Scanner<L: Localizer> {
    localizer: L,
    decoder: EnsembleDecoder,
}

impl<L: Localizer> Scanner<L> {
    /// Compose `localizer` with `decoder`
    pub fn new(localizer: L, decoder: EnsembleDecoder) -> Self {
        Self { localizer, decoder }
    }

    /// Localize, filter and decode one frame
    pub fn scan(&mut self, frame: &RgbImage) -> Result<DetectionList, ScanError> {
        let config = self.decoder.config();
        let localizations = self
            .localizer
            .locate(frame, config.min_confidence)
            .map_err(|e| ScanError::Localizer(e.into()))?;
        let boxes = select_boxes(&localizations, config.target_class, config.min_confidence);
        tracing::trace!(
            localizer = self.localizer.name(),
            proposed = localizations.len(),
            kept = boxes.len(),
            "localized frame"
        );
        self.decoder.process(frame, &boxes)
    }

    /// The decoder
    pub fn decoder(&self) -> &EnsembleDecoder {
        &self.decoder
    }

    /// The localizer, e.g. to swap model weights
    pub fn localizer_mut(&mut self) -> &mut L {
        &mut self.localizer
    }

    /// Take the scanner apart
    pub fn into_parts(self) -> (L, EnsembleDecoder) {
        (self.localizer, self.decoder)
    }
}
