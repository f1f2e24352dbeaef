//! barcode_ensemble - ensemble decoding of barcodes in localized frame regions
//!
//! An external localizer proposes boxes; for each box the crate crops the
//! region with a margin, renders four preprocessing variants and races them
//! across a bounded worker pool. Each variant goes through a fast linear
//! scanline engine first and the rxing multi-format engine second. The first
//! payload to come back wins.
//!
//! ```no_run
//! use barcode_ensemble::{BoundingBox, EnsembleConfig, EnsembleDecoder};
//!
//! let frame = image::open("frame.png").unwrap().to_rgb8();
//! let decoder = EnsembleDecoder::new(EnsembleConfig::default()).unwrap();
//! let detections = decoder
//!     .process(&frame, &[BoundingBox::new(120.0, 80.0, 420.0, 200.0)])
//!     .unwrap();
//! for det in &detections {
//!     if let Some(hit) = &det.decoded {
//!         println!("{} via {} on {}", hit.data, hit.engine, hit.method);
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

/// Decoder configuration and environment overrides
pub mod config;
/// Decode engine adapters (linear scanner, rxing fallback)
pub mod engine;
/// Winner-takes-all variant race on the worker pool
pub mod ensemble;
/// Error types
pub mod error;
/// Localizer seam and frame scanner
pub mod localizer;
/// Core data structures (BoundingBox, Detection, Method, etc.)
pub mod models;
/// Per-frame orchestration
pub mod pipeline;
/// Crop extraction with margin and clamping
pub mod region;
/// Synthetic barcode rendering
pub mod synth;
/// Helpers for CLI tools (image loading, box files, stats)
pub mod tools;
/// Utility functions (grayscale, binarization, filters)
pub mod utils;
/// Preprocessing variants of a crop
pub mod variants;

pub use config::{EnsembleConfig, LatencyMode};
pub use engine::{DecodeEngine, EngineChain};
pub use error::{BoxError, EngineError, ScanError};
pub use localizer::{FullFrameLocalizer, Localization, Localizer, Scanner};
pub use models::{BoundingBox, DecodeResult, Detection, DetectionList, EngineRole, Method};
pub use pipeline::EnsembleDecoder;

use image::RgbImage;

/// Decode the boxes of one frame with the default configuration.
///
/// Builds a worker pool for this call only; keep an [`EnsembleDecoder`]
/// around when processing a stream of frames.
pub fn decode(frame: &RgbImage, bboxes: &[BoundingBox]) -> Result<DetectionList, ScanError> {
    EnsembleDecoder::new(EnsembleConfig::default())?.process(frame, bboxes)
}
