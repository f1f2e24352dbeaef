//! Per-frame orchestration: crop, variants and race for every box.

use std::time::Instant;

use image::RgbImage;
use tracing::{debug, debug_span};

use crate::config::{EnsembleConfig, LatencyMode};
use crate::engine::EngineChain;
use crate::ensemble::EnsembleDispatcher;
use crate::error::ScanError;
use crate::models::{BoundingBox, DecodeResult, Detection, DetectionList};
use crate::region::{self, Crop};
use crate::variants;

/// Decodes the localized boxes of a frame.
///
/// Owns the decode worker pool, which is reused for every frame and box until
/// the decoder is dropped. Frames are independent: nothing carries over from
/// one call of [`EnsembleDecoder::process`] to the next.
#[derive(Debug)]
pub struct EnsembleDecoder {
    config: EnsembleConfig,
    dispatcher: EnsembleDispatcher,
}

impl EnsembleDecoder {
    /// Decoder with the standard engines (linear scanner, rxing fallback)
    pub fn new(config: EnsembleConfig) -> Result<Self, ScanError> {
        let chain = EngineChain::standard(config.use_fallback);
        Self::with_chain(config, chain)
    }

    /// Decoder racing variants through a caller-supplied engine chain.
    ///
    /// `config.use_fallback` is not consulted; the chain decides.
    pub fn with_chain(config: EnsembleConfig, chain: EngineChain) -> Result<Self, ScanError> {
        config.validate()?;
        let dispatcher = EnsembleDispatcher::new(config.workers, chain)?
            .with_deadline(config.decode_timeout())
            .with_cancel_losers(config.cancel_losers);
        Ok(Self { config, dispatcher })
    }

    /// Active configuration
    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    /// Underlying dispatcher
    pub fn dispatcher(&self) -> &EnsembleDispatcher {
        &self.dispatcher
    }

    /// Decode every box of `frame`.
    ///
    /// The result has one [`Detection`] per box, in input order. All boxes are
    /// checked before any decoding starts; a malformed one fails the whole
    /// call with [`ScanError::InvalidBoundingBox`]. Boxes that clamp to an
    /// empty region, and boxes nothing could be read from, get
    /// `decoded: None`.
    pub fn process(&self, frame: &RgbImage, bboxes: &[BoundingBox]) -> Result<DetectionList, ScanError> {
        let frame_start = Instant::now();
        let span = debug_span!(
            "process_frame",
            width = frame.width(),
            height = frame.height(),
            boxes = bboxes.len()
        );
        let _guard = span.enter();

        for (index, bbox) in bboxes.iter().enumerate() {
            bbox.validate()
                .map_err(|source| ScanError::InvalidBoundingBox {
                    index,
                    bbox: *bbox,
                    source,
                })?;
        }

        let mut detections = Vec::with_capacity(bboxes.len());
        for (index, bbox) in bboxes.iter().enumerate() {
            let box_start = Instant::now();
            let decoded = self.decode_box(frame, index, bbox)?;
            let latency = match self.config.latency {
                LatencyMode::FrameCumulative => frame_start.elapsed(),
                LatencyMode::PerBox => box_start.elapsed(),
            };
            detections.push(Detection {
                bbox: *bbox,
                decoded,
                latency,
            });
        }

        let detections = DetectionList::new(detections);
        debug!(
            decoded = detections.decoded_count(),
            elapsed_ms = frame_start.elapsed().as_secs_f64() * 1000.0,
            "frame processed"
        );
        Ok(detections)
    }

    /// Race the variants of an already cropped region
    pub fn decode_region(&self, crop: &RgbImage) -> Option<DecodeResult> {
        self.dispatcher.race_decode(variants::generate(crop))
    }

    fn decode_box(
        &self,
        frame: &RgbImage,
        index: usize,
        bbox: &BoundingBox,
    ) -> Result<Option<DecodeResult>, ScanError> {
        let crop = region::extract(frame, bbox, self.config.margin).map_err(|source| {
            ScanError::InvalidBoundingBox {
                index,
                bbox: *bbox,
                source,
            }
        })?;
        match crop {
            Crop::Region { image, .. } => Ok(self.decode_region(&image)),
            Crop::Empty => {
                debug!(index, %bbox, "box clamps to an empty region");
                Ok(None)
            }
        }
    }
}
