use image::GrayImage;
use rxing::common::HybridBinarizer;
use rxing::{
    BinaryBitmap, DecodeHintType, DecodeHintValue, DecodingHintDictionary, Exceptions,
    Luma8LuminanceSource, MultiUseMultiFormatReader, Reader,
};

use super::{DecodeEngine, Symbol};
use crate::error::EngineError;

/// Smallest side rxing can binarize meaningfully
const MIN_SIDE: u32 = 8;

/// Multi-format fallback engine (QR, Data Matrix, Aztec, PDF417 and 1D codes).
///
/// The rxing reader keeps per-decode state behind `&mut self`, so a fresh
/// reader is built for every call and the engine itself holds nothing
/// mutable. That makes it safe to share across the worker pool.
#[derive(Debug, Clone)]
pub struct RxingEngine {
    try_harder: bool,
}

impl RxingEngine {
    /// Engine with the try-harder hint enabled
    pub fn new() -> Self {
        Self { try_harder: true }
    }

    /// Toggle the try-harder hint
    pub fn with_try_harder(mut self, try_harder: bool) -> Self {
        self.try_harder = try_harder;
        self
    }

    fn hints(&self) -> DecodingHintDictionary {
        let mut hints = DecodingHintDictionary::new();
        if self.try_harder {
            hints.insert(DecodeHintType::TRY_HARDER, DecodeHintValue::TryHarder(true));
        }
        hints
    }
}

impl Default for RxingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DecodeEngine for RxingEngine {
    fn name(&self) -> &'static str {
        "rxing"
    }

    fn decode(&self, image: &GrayImage) -> Result<Vec<Symbol>, EngineError> {
        let (width, height) = image.dimensions();
        if width < MIN_SIDE || height < MIN_SIDE {
            return Err(EngineError::Unsupported(format!(
                "{width}x{height} is below the {MIN_SIDE}px minimum"
            )));
        }

        let source = Luma8LuminanceSource::new(image.as_raw().clone(), width, height);
        let mut bitmap = BinaryBitmap::new(HybridBinarizer::new(source));
        let mut reader = MultiUseMultiFormatReader::default();

        match reader.decode_with_hints(&mut bitmap, &self.hints()) {
            Ok(result) => Ok(vec![Symbol::new(
                result.getText(),
                format!("{:?}", result.getBarcodeFormat()),
            )]),
            Err(Exceptions::NotFoundException(_)) => Ok(Vec::new()),
            Err(err) => Err(EngineError::Internal(format!("{err:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::{SynthOptions, render_code128};
    use image::Luma;

    #[test]
    fn test_blank_image_has_no_symbols() {
        let blank = GrayImage::from_pixel(120, 80, Luma([255]));
        let result = RxingEngine::new().decode(&blank);
        assert!(!matches!(result, Ok(symbols) if !symbols.is_empty()));
    }

    #[test]
    fn test_tiny_image_is_unsupported() {
        let tiny = GrayImage::new(3, 3);
        assert!(matches!(
            RxingEngine::new().decode(&tiny),
            Err(EngineError::Unsupported(_))
        ));
    }

    #[test]
    fn test_decodes_clean_code128() {
        let img = render_code128("HELLO-128", &SynthOptions::default()).unwrap();
        let symbols = RxingEngine::new().decode(&img).unwrap();
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].data, "HELLO-128");
        assert_eq!(symbols[0].symbology, "CODE_128");
    }
}
