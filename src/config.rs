//! Decoder configuration.
//!
//! Defaults match the production deployment: four workers, a 10 px margin,
//! fallback enabled and frame-cumulative latency. Values can be deserialised
//! (missing fields take their default) or layered from `BARCODE_*`
//! environment variables.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ensemble::DEFAULT_WORKERS;
use crate::error::ScanError;
use crate::region::DEFAULT_MARGIN;

/// What a detection's `latency` measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatencyMode {
    /// Time since the frame started processing (includes earlier boxes)
    #[default]
    FrameCumulative,
    /// Time spent on this box alone
    PerBox,
}

impl FromStr for LatencyMode {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "frame" | "frame_cumulative" => Ok(Self::FrameCumulative),
            "box" | "per_box" => Ok(Self::PerBox),
            other => Err(ScanError::Config(format!(
                "unknown latency mode {other:?} (expected frame or box)"
            ))),
        }
    }
}

/// Tunables of [`crate::EnsembleDecoder`] and [`crate::Scanner`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    /// Decode worker threads
    pub workers: usize,
    /// Pixels added around every box before cropping
    pub margin: u32,
    /// Run the fallback engine when the fast engine finds nothing
    pub use_fallback: bool,
    /// Per-box race deadline in milliseconds; 0 disables it
    pub decode_timeout_ms: u64,
    /// Stop losing tasks once a winner is known
    pub cancel_losers: bool,
    /// Latency semantic of each detection
    pub latency: LatencyMode,
    /// Localizer class kept by [`crate::localizer::select_boxes`]
    pub target_class: u32,
    /// Localizer confidence floor
    pub min_confidence: f32,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            margin: DEFAULT_MARGIN,
            use_fallback: true,
            decode_timeout_ms: 500,
            cancel_losers: true,
            latency: LatencyMode::FrameCumulative,
            target_class: 0,
            min_confidence: 0.25,
        }
    }
}

impl EnsembleConfig {
    /// Defaults overridden by any `BARCODE_*` variables in the environment
    pub fn from_env() -> Result<Self, ScanError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable name
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ScanError> {
        let d = Self::default();
        let config = Self {
            workers: parse_env(&lookup, "BARCODE_WORKERS", d.workers)?,
            margin: parse_env(&lookup, "BARCODE_MARGIN", d.margin)?,
            use_fallback: parse_env_bool(&lookup, "BARCODE_FALLBACK", d.use_fallback)?,
            decode_timeout_ms: parse_env(&lookup, "BARCODE_DECODE_TIMEOUT_MS", d.decode_timeout_ms)?,
            cancel_losers: parse_env_bool(&lookup, "BARCODE_CANCEL_LOSERS", d.cancel_losers)?,
            latency: parse_env(&lookup, "BARCODE_LATENCY", d.latency)?,
            target_class: parse_env(&lookup, "BARCODE_TARGET_CLASS", d.target_class)?,
            min_confidence: parse_env(&lookup, "BARCODE_MIN_CONFIDENCE", d.min_confidence)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the decoder cannot run with
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.workers == 0 {
            return Err(ScanError::Config("workers must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ScanError::Config(format!(
                "min_confidence {} is outside [0, 1]",
                self.min_confidence
            )));
        }
        Ok(())
    }

    /// Race deadline, `None` when disabled
    pub fn decode_timeout(&self) -> Option<Duration> {
        (self.decode_timeout_ms > 0).then(|| Duration::from_millis(self.decode_timeout_ms))
    }
}

fn parse_env<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, ScanError> {
    match lookup(name) {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse::<T>()
            .map_err(|_| ScanError::Config(format!("{name}={v:?} is not a valid value"))),
    }
}

fn parse_env_bool(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: bool,
) -> Result<bool, ScanError> {
    match lookup(name).as_deref().map(str::trim) {
        None => Ok(default),
        Some("1" | "true" | "TRUE" | "yes" | "YES") => Ok(true),
        Some("0" | "false" | "FALSE" | "no" | "NO") => Ok(false),
        Some(other) => Err(ScanError::Config(format!("{name}={other:?} is not a boolean"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EnsembleConfig::default();
        assert_eq!(config.workers, 4);
        assert_eq!(config.margin, 10);
        assert!(config.use_fallback);
        assert_eq!(config.decode_timeout(), Some(Duration::from_millis(500)));
        assert_eq!(config.latency, LatencyMode::FrameCumulative);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let config = EnsembleConfig::from_lookup(lookup(&[
            ("BARCODE_WORKERS", "8"),
            ("BARCODE_FALLBACK", "0"),
            ("BARCODE_DECODE_TIMEOUT_MS", "0"),
            ("BARCODE_LATENCY", "box"),
            ("BARCODE_MIN_CONFIDENCE", " 0.5 "),
        ]))
        .unwrap();
        assert_eq!(config.workers, 8);
        assert!(!config.use_fallback);
        assert_eq!(config.decode_timeout(), None);
        assert_eq!(config.latency, LatencyMode::PerBox);
        assert_eq!(config.min_confidence, 0.5);
        assert_eq!(config.margin, 10);
    }

    #[test]
    fn test_bad_env_values_are_rejected() {
        for vars in [
            [("BARCODE_WORKERS", "many")],
            [("BARCODE_WORKERS", "0")],
            [("BARCODE_CANCEL_LOSERS", "maybe")],
            [("BARCODE_LATENCY", "wall")],
            [("BARCODE_MIN_CONFIDENCE", "1.5")],
        ] {
            assert!(
                matches!(EnsembleConfig::from_lookup(lookup(&vars)), Err(ScanError::Config(_))),
                "{vars:?}"
            );
        }
    }

    #[test]
    fn test_partial_json() {
        let config: EnsembleConfig =
            serde_json::from_str(r#"{"workers": 2, "latency": "per_box"}"#).unwrap();
        assert_eq!(config.workers, 2);
        assert_eq!(config.latency, LatencyMode::PerBox);
        assert!(config.cancel_losers);
    }
}
