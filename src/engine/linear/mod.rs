//! Scanline decoder for linear (1D) barcodes.
//!
//! Rows and columns are sampled evenly across the image. Each sampled line is
//! binarized at the midpoint of its own intensity range and turned into a
//! run-length list that always begins with a light run, so bars sit at odd
//! indices. Every run list is handed to the symbology readers, first as read
//! and then reversed, which covers codes rotated by 90, 180 and 270 degrees.
//!
//! Code 128 and EAN-13 carry a checksum and are accepted from a single line.
//! Code 39 has none, so it must be read identically on at least two lines.

use image::GrayImage;

use super::{DecodeEngine, Symbol};
use crate::error::EngineError;

mod code128;
mod code39;
mod ean13;
mod pattern;

pub(crate) use code128::encode as encode_code128;
pub(crate) use code39::encode as encode_code39;
pub(crate) use ean13::encode as encode_ean13;

/// Default number of rows (and of columns) sampled per image
pub const DEFAULT_SCAN_LINES: u32 = 16;

/// Lines whose intensity range is narrower than this carry no code
const MIN_CONTRAST: u8 = 40;

/// Fewest runs that can hold any supported symbol (one-character Code 128)
const MIN_RUNS: usize = 27;

/// Lines that must agree before a Code 39 read is accepted
const CODE39_MIN_LINES: usize = 2;

/// Fast in-house engine for Code 128, EAN-13/UPC-A and Code 39
#[derive(Debug, Clone)]
pub struct LinearEngine {
    scan_lines: u32,
}

impl LinearEngine {
    /// Engine sampling [`DEFAULT_SCAN_LINES`] rows and columns
    pub fn new() -> Self {
        Self {
            scan_lines: DEFAULT_SCAN_LINES,
        }
    }

    /// Change the number of sampled rows and columns (at least one)
    pub fn with_scan_lines(mut self, scan_lines: u32) -> Self {
        self.scan_lines = scan_lines.max(1);
        self
    }
}

impl Default for LinearEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DecodeEngine for LinearEngine {
    fn name(&self) -> &'static str {
        "linear-scan"
    }

    fn decode(&self, image: &GrayImage) -> Result<Vec<Symbol>, EngineError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(EngineError::Unsupported(format!("{width}x{height} image")));
        }

        let mut tally = Tally::default();
        let raw = image.as_raw();
        let row_len = width as usize;

        for y in sample_positions(height, self.scan_lines) {
            let start = y as usize * row_len;
            tally.add(decode_line(&raw[start..start + row_len]));
        }

        let mut column = Vec::with_capacity(height as usize);
        for x in sample_positions(width, self.scan_lines) {
            column.clear();
            column.extend((0..height).map(|y| image.get_pixel(x, y)[0]));
            tally.add(decode_line(&column));
        }

        Ok(tally.accepted())
    }
}

/// Symbols read so far and the number of lines that produced each
#[derive(Default)]
struct Tally {
    reads: Vec<(Symbol, usize)>,
}

impl Tally {
    fn add(&mut self, symbol: Option<Symbol>) {
        let Some(symbol) = symbol else {
            return;
        };
        match self.reads.iter_mut().find(|(s, _)| *s == symbol) {
            Some((_, count)) => *count += 1,
            None => self.reads.push((symbol, 1)),
        }
    }

    fn accepted(self) -> Vec<Symbol> {
        self.reads
            .into_iter()
            .filter(|(s, count)| s.symbology != code39::SYMBOLOGY || *count >= CODE39_MIN_LINES)
            .map(|(s, _)| s)
            .collect()
    }
}

/// `n` evenly spaced positions strictly inside `0..len`
fn sample_positions(len: u32, n: u32) -> Vec<u32> {
    let mut positions: Vec<u32> = (1..=n as u64)
        .map(|k| (k * len as u64 / (n as u64 + 1)) as u32)
        .collect();
    positions.dedup();
    positions
}

fn decode_line(line: &[u8]) -> Option<Symbol> {
    let (lo, hi) = line
        .iter()
        .fold((u8::MAX, u8::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if hi.saturating_sub(lo) < MIN_CONTRAST {
        return None;
    }
    let threshold = ((lo as u16 + hi as u16 + 1) / 2) as u8;

    let forward = light_first_runs(line.iter().map(|&v| v < threshold));
    decode_runs(&forward).or_else(|| {
        let reversed = light_first_runs(line.iter().rev().map(|&v| v < threshold));
        decode_runs(&reversed)
    })
}

/// Run lengths of a dark/light sequence, starting with a (possibly empty) light run
fn light_first_runs(dark: impl Iterator<Item = bool>) -> Vec<u32> {
    let mut runs = Vec::new();
    let mut in_dark = false;
    let mut count = 0u32;
    for d in dark {
        if d != in_dark {
            runs.push(count);
            count = 0;
            in_dark = d;
        }
        count += 1;
    }
    runs.push(count);
    runs
}

fn decode_runs(runs: &[u32]) -> Option<Symbol> {
    if runs.len() < MIN_RUNS {
        return None;
    }
    code128::decode(runs)
        .map(|text| Symbol::new(text, code128::SYMBOLOGY))
        .or_else(|| ean13::decode(runs).map(|text| Symbol::new(text, ean13::SYMBOLOGY)))
        .or_else(|| code39::decode(runs).map(|text| Symbol::new(text, code39::SYMBOLOGY)))
}
