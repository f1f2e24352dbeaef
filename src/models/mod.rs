pub mod bbox;
pub mod detection;

pub use bbox::BoundingBox;
pub use detection::{DecodeResult, Detection, DetectionList, EngineRole, Method};
