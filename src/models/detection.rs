use std::fmt;
use std::ops::Deref;
use std::time::Duration;

use serde::{Serialize, Serializer};

use super::BoundingBox;

/// Preprocessing method that produced a variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Method {
    /// Grayscale conversion only
    Original,
    /// Adaptive Gaussian threshold followed by a 3x3 closing
    #[serde(rename = "AdaptiveThreshold_Closing")]
    AdaptiveThresholdClosing,
    /// 3x3 sharpening followed by 2x cubic upscale
    #[serde(rename = "Sharpen_Upscale")]
    SharpenUpscale,
    /// Otsu binarization followed by a 3x3 erosion
    #[serde(rename = "Otsu_Erosion")]
    OtsuErosion,
}

impl Method {
    /// Every method, in generation order
    pub const ALL: [Method; 4] = [
        Method::Original,
        Method::AdaptiveThresholdClosing,
        Method::SharpenUpscale,
        Method::OtsuErosion,
    ];

    /// Stable identifier reported alongside decode results
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Original => "Original",
            Method::AdaptiveThresholdClosing => "AdaptiveThreshold_Closing",
            Method::SharpenUpscale => "Sharpen_Upscale",
            Method::OtsuErosion => "Otsu_Erosion",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of an engine in the decode chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineRole {
    /// Tried first on every variant, tuned for linear codes
    Fast,
    /// Tried only when the fast engine finds nothing
    Fallback,
}

impl EngineRole {
    /// Stable identifier reported alongside decode results
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineRole::Fast => "fast",
            EngineRole::Fallback => "fallback",
        }
    }
}

impl fmt::Display for EngineRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payload decoded from one variant by one engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodeResult {
    /// Decoded text
    pub data: String,
    /// Symbology name as reported by the engine (e.g. `CODE128`, `QR_CODE`)
    #[serde(rename = "type")]
    pub symbology: String,
    /// Preprocessing method of the decoded image
    pub method: Method,
    /// Engine that produced the payload
    pub engine: EngineRole,
}

/// Outcome for one localized bounding box
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    /// Box as handed over by the localizer
    pub bbox: BoundingBox,
    /// Winning payload, `None` when nothing decoded
    pub decoded: Option<DecodeResult>,
    /// Elapsed time, see [`crate::config::LatencyMode`]
    #[serde(rename = "inference_time", serialize_with = "duration_as_secs")]
    pub latency: Duration,
}

fn duration_as_secs<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(d.as_secs_f64())
}

/// Detections of a single frame, in bounding-box input order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DetectionList(Vec<Detection>);

impl DetectionList {
    /// Wrap detections that are already in input order
    pub fn new(detections: Vec<Detection>) -> Self {
        Self(detections)
    }

    /// Number of decoded detections
    pub fn decoded_count(&self) -> usize {
        self.0.iter().filter(|d| d.decoded.is_some()).count()
    }

    /// Unwrap into the underlying vector
    pub fn into_vec(self) -> Vec<Detection> {
        self.0
    }
}

impl Deref for DetectionList {
    type Target = [Detection];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl IntoIterator for DetectionList {
    type Item = Detection;
    type IntoIter = std::vec::IntoIter<Detection>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a DetectionList {
    type Item = &'a Detection;
    type IntoIter = std::slice::Iter<'a, Detection>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
