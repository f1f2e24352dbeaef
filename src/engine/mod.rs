//! Decode engine adapters
//!
//! A [`DecodeEngine`] turns a grayscale image into zero or more payloads.
//! [`EngineChain`] owns the fast engine and the optional fallback engine and
//! applies the ensemble policy to one variant:
//!
//! - the fast engine is always tried first
//! - the fallback runs only when the fast engine found nothing
//! - errors and panics raised by either engine are contained here and count
//!   as "no result"
//!
//! Every payload leaving the chain is tagged with the engine role and the
//! preprocessing method of its input.

use std::panic::{self, AssertUnwindSafe};

use image::GrayImage;
use tracing::{debug, trace, warn};

use crate::ensemble::RaceToken;
use crate::error::EngineError;
use crate::models::{DecodeResult, EngineRole};
use crate::variants::Variant;

/// Fallback engine backed by the rxing multi-format reader
pub mod fallback;
/// Fast scanline engine for linear codes
pub mod linear;

pub use fallback::RxingEngine;
pub use linear::LinearEngine;

/// A payload as reported by an engine, before provenance tagging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// Decoded text
    pub data: String,
    /// Symbology name
    pub symbology: String,
}

impl Symbol {
    /// Create a symbol
    pub fn new(data: impl Into<String>, symbology: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            symbology: symbology.into(),
        }
    }
}

/// Decode backend.
///
/// Engines are shared by all workers of the pool, so implementations must be
/// stateless per call or synchronise internally. An empty vector means "no
/// code found" and is not an error.
pub trait DecodeEngine: Send + Sync {
    /// Backend identifier used in logs
    fn name(&self) -> &'static str;

    /// Decode every symbol found in `image`
    fn decode(&self, image: &GrayImage) -> Result<Vec<Symbol>, EngineError>;
}

/// Fast engine followed by an optional fallback engine
pub struct EngineChain {
    fast: Box<dyn DecodeEngine>,
    fallback: Option<Box<dyn DecodeEngine>>,
}

impl EngineChain {
    /// Chain with an explicit fast engine and optional fallback
    pub fn new(fast: Box<dyn DecodeEngine>, fallback: Option<Box<dyn DecodeEngine>>) -> Self {
        Self { fast, fallback }
    }

    /// Linear scanline engine, plus the rxing fallback when `use_fallback` is set
    pub fn standard(use_fallback: bool) -> Self {
        let fallback: Option<Box<dyn DecodeEngine>> = if use_fallback {
            Some(Box::new(RxingEngine::new()))
        } else {
            None
        };
        Self::new(Box::new(LinearEngine::new()), fallback)
    }

    /// Whether a fallback engine is configured
    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Decode one variant
    pub fn decode(&self, variant: &Variant) -> Vec<DecodeResult> {
        self.decode_until(variant, &RaceToken::new())
    }

    /// Decode one variant, giving up before the next engine once `token` is settled
    pub fn decode_until(&self, variant: &Variant, token: &RaceToken) -> Vec<DecodeResult> {
        if token.is_settled() {
            return Vec::new();
        }
        let fast = run_contained(self.fast.as_ref(), variant);
        if !fast.is_empty() {
            return tag(fast, variant, EngineRole::Fast);
        }

        let Some(fallback) = &self.fallback else {
            return Vec::new();
        };
        if token.is_settled() {
            trace!(method = %variant.method, "race settled, skipping fallback engine");
            return Vec::new();
        }
        tag(run_contained(fallback.as_ref(), variant), variant, EngineRole::Fallback)
    }
}

impl std::fmt::Debug for EngineChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineChain")
            .field("fast", &self.fast.name())
            .field("fallback", &self.fallback.as_ref().map(|e| e.name()))
            .finish()
    }
}

fn tag(symbols: Vec<Symbol>, variant: &Variant, engine: EngineRole) -> Vec<DecodeResult> {
    symbols
        .into_iter()
        .map(|s| DecodeResult {
            data: s.data,
            symbology: s.symbology,
            method: variant.method,
            engine,
        })
        .collect()
}

/// Run an engine, converting errors and panics into an empty result
fn run_contained(engine: &dyn DecodeEngine, variant: &Variant) -> Vec<Symbol> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| engine.decode(&variant.image)))
        .unwrap_or_else(|payload| Err(EngineError::Panicked(panic_message(payload.as_ref()))));

    match outcome {
        Ok(symbols) => symbols,
        Err(err @ EngineError::Panicked(_)) => {
            warn!(
                engine = engine.name(),
                method = %variant.method,
                error = %err,
                "decode engine panicked, treating as no result"
            );
            Vec::new()
        }
        Err(err) => {
            debug!(
                engine = engine.name(),
                method = %variant.method,
                error = %err,
                "decode engine failed, treating as no result"
            );
            Vec::new()
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Method;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Fixed(Vec<Symbol>, Arc<AtomicUsize>);

    impl DecodeEngine for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }
        fn decode(&self, _image: &GrayImage) -> Result<Vec<Symbol>, EngineError> {
            self.1.fetch_add(1, Ordering::SeqCst);
            Ok(self.0.clone())
        }
    }

    struct Failing;

    impl DecodeEngine for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn decode(&self, _image: &GrayImage) -> Result<Vec<Symbol>, EngineError> {
            Err(EngineError::Internal("boom".into()))
        }
    }

    struct Panicking;

    impl DecodeEngine for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }
        fn decode(&self, _image: &GrayImage) -> Result<Vec<Symbol>, EngineError> {
            panic!("native reader blew up")
        }
    }

    fn variant(method: Method) -> Variant {
        Variant::new(GrayImage::new(4, 4), method)
    }

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    #[test]
    fn test_fast_hit_skips_fallback() {
        let calls = counter();
        let chain = EngineChain::new(
            Box::new(Fixed(vec![Symbol::new("42", "CODE128")], counter())),
            Some(Box::new(Fixed(vec![Symbol::new("x", "QR_CODE")], calls.clone()))),
        );
        let results = chain.decode(&variant(Method::SharpenUpscale));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].engine, EngineRole::Fast);
        assert_eq!(results[0].method, Method::SharpenUpscale);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_fallback_runs_when_fast_is_empty() {
        let chain = EngineChain::new(
            Box::new(Fixed(Vec::new(), counter())),
            Some(Box::new(Fixed(vec![Symbol::new("hello", "QR_CODE")], counter()))),
        );
        let results = chain.decode(&variant(Method::OtsuErosion));
        assert_eq!(results[0].engine, EngineRole::Fallback);
        assert_eq!(results[0].method, Method::OtsuErosion);
        assert_eq!(results[0].data, "hello");
    }

    #[test]
    fn test_fallback_disabled() {
        let chain = EngineChain::new(Box::new(Fixed(Vec::new(), counter())), None);
        assert!(chain.decode(&variant(Method::Original)).is_empty());
        assert!(!chain.has_fallback());
    }

    #[test]
    fn test_engine_errors_are_swallowed() {
        let chain = EngineChain::new(Box::new(Failing), Some(Box::new(Panicking)));
        assert!(chain.decode(&variant(Method::Original)).is_empty());
    }

    #[test]
    fn test_settled_token_skips_work() {
        let calls = counter();
        let chain = EngineChain::new(Box::new(Fixed(Vec::new(), calls.clone())), None);
        let token = RaceToken::new();
        token.settle();
        assert!(chain.decode_until(&variant(Method::Original), &token).is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
