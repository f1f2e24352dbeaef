use thiserror::Error;

use crate::models::BoundingBox;

/// Reasons a bounding box violates the localizer contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BoxError {
    /// A coordinate is NaN or infinite
    #[error("bounding box has a non-finite coordinate")]
    NonFinite,
    /// `x1 >= x2` or `y1 >= y2`
    #[error("bounding box is empty or inverted")]
    Inverted,
}

/// Failure reported by a decode engine.
///
/// Engine errors never reach callers of the pipeline: the adapter chain
/// converts them into an empty result set.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Input the engine cannot process at all (e.g. degenerate dimensions)
    #[error("unsupported input: {0}")]
    Unsupported(String),
    /// Anything else raised by the backend
    #[error("engine failure: {0}")]
    Internal(String),
    /// The backend panicked while decoding
    #[error("engine panicked: {0}")]
    Panicked(String),
}

/// Caller-visible errors of the ensemble pipeline.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The localizer handed over a malformed box
    #[error("invalid bounding box #{index} {bbox:?}: {source}")]
    InvalidBoundingBox {
        /// Position of the box in the input list
        index: usize,
        /// The offending box
        bbox: BoundingBox,
        /// What is wrong with it
        #[source]
        source: BoxError,
    },
    /// The decode worker pool could not be started
    #[error("failed to build decode worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    /// The injected localizer failed
    #[error("localizer failed: {0}")]
    Localizer(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// Configuration values are out of range
    #[error("invalid configuration: {0}")]
    Config(String),
}
