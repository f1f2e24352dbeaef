//! Code 128 (code sets A, B and C) with the mandatory mod-103 checksum.

use super::pattern::{bar_starts, best_match};

pub(crate) const SYMBOLOGY: &str = "CODE128";

const MAX_AVG_VARIANCE: f32 = 0.25;
const MAX_INDIVIDUAL_VARIANCE: f32 = 0.7;

const START_A: usize = 103;
const START_B: usize = 104;
const START_C: usize = 105;
const STOP: usize = 106;

const CODE_SHIFT: usize = 98;
const CODE_C: usize = 99;
const CODE_B: usize = 100;
const CODE_A: usize = 101;
const FNC_1: usize = 102;
const FNC_2: usize = 97;
const FNC_3: usize = 96;

/// Group separator emitted for FNC1 outside the leading position
const GS: char = '\u{1d}';

/// Element widths (bar, space, bar, space, bar, space) of every symbol.
/// The stop symbol carries a seventh, 2-module bar not listed here.
#[rustfmt::skip]
const PATTERNS: [[u8; 6]; 107] = [
    [2,1,2,2,2,2], [2,2,2,1,2,2], [2,2,2,2,2,1], [1,2,1,2,2,3], [1,2,1,3,2,2],
    [1,3,1,2,2,2], [1,2,2,2,1,3], [1,2,2,3,1,2], [1,3,2,2,1,2], [2,2,1,2,1,3],
    [2,2,1,3,1,2], [2,3,1,2,1,2], [1,1,2,2,3,2], [1,2,2,1,3,2], [1,2,2,2,3,1],
    [1,1,3,2,2,2], [1,2,3,1,2,2], [1,2,3,2,2,1], [2,2,3,2,1,1], [2,2,1,1,3,2],
    [2,2,1,2,3,1], [2,1,3,2,1,2], [2,2,3,1,1,2], [3,1,2,1,3,1], [3,1,1,2,2,2],
    [3,2,1,1,2,2], [3,2,1,2,2,1], [3,1,2,2,1,2], [3,2,2,1,1,2], [3,2,2,2,1,1],
    [2,1,2,1,2,3], [2,1,2,3,2,1], [2,3,2,1,2,1], [1,1,1,3,2,3], [1,3,1,1,2,3],
    [1,3,1,3,2,1], [1,1,2,3,1,3], [1,3,2,1,1,3], [1,3,2,3,1,1], [2,1,1,3,1,3],
    [2,3,1,1,1,3], [2,3,1,3,1,1], [1,1,2,1,3,3], [1,1,2,3,3,1], [1,3,2,1,3,1],
    [1,1,3,1,2,3], [1,1,3,3,2,1], [1,3,3,1,2,1], [3,1,3,1,2,1], [2,1,1,3,3,1],
    [2,3,1,1,3,1], [2,1,3,1,1,3], [2,1,3,3,1,1], [2,1,3,1,3,1], [3,1,1,1,2,3],
    [3,1,1,3,2,1], [3,3,1,1,2,1], [3,1,2,1,1,3], [3,1,2,3,1,1], [3,3,2,1,1,1],
    [3,1,4,1,1,1], [2,2,1,4,1,1], [4,3,1,1,1,1], [1,1,1,2,2,4], [1,1,1,4,2,2],
    [1,2,1,1,2,4], [1,2,1,4,2,1], [1,4,1,1,2,2], [1,4,1,2,2,1], [1,1,2,2,1,4],
    [1,1,2,4,1,2], [1,2,2,1,1,4], [1,2,2,4,1,1], [1,4,2,1,1,2], [1,4,2,2,1,1],
    [2,4,1,2,1,1], [2,2,1,1,1,4], [4,1,3,1,1,1], [2,4,1,1,1,2], [1,3,4,1,1,1],
    [1,1,1,2,4,2], [1,2,1,1,4,2], [1,2,1,2,4,1], [1,1,4,2,1,2], [1,2,4,1,1,2],
    [1,2,4,2,1,1], [4,1,1,2,1,2], [4,2,1,1,1,2], [4,2,1,2,1,1], [2,1,2,1,4,1],
    [2,1,4,1,2,1], [4,1,2,1,2,1], [1,1,1,1,4,3], [1,1,1,3,4,1], [1,3,1,1,4,1],
    [1,1,4,1,1,3], [1,1,4,3,1,1], [4,1,1,1,1,3], [4,1,1,3,1,1], [1,1,3,1,4,1],
    [1,1,4,1,3,1], [3,1,1,1,4,1], [4,1,1,1,3,1], [2,1,1,4,1,2], [2,1,1,2,1,4],
    [2,1,1,2,3,2], [2,3,3,1,1,1],
];

/// Trailing bar of the stop symbol, in modules
const STOP_TERMINATOR: u8 = 2;

fn all_patterns() -> Vec<&'static [u8]> {
    PATTERNS.iter().map(|p| p.as_slice()).collect()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum CodeSet {
    A,
    B,
    C,
}

/// Decode the first valid Code 128 symbol in a light-first run list
pub(crate) fn decode(runs: &[u32]) -> Option<String> {
    let patterns = all_patterns();
    let starts = [
        PATTERNS[START_A].as_slice(),
        PATTERNS[START_B].as_slice(),
        PATTERNS[START_C].as_slice(),
    ];

    for i in bar_starts(runs, 6) {
        let Some(start) = best_match(&runs[i..i + 6], &starts, MAX_AVG_VARIANCE, MAX_INDIVIDUAL_VARIANCE)
        else {
            continue;
        };
        // Quiet zone of at least half the start symbol
        let start_width: u32 = runs[i..i + 6].iter().sum();
        if runs[i - 1] * 2 < start_width {
            continue;
        }
        if let Some(codes) = read_symbols(runs, i + 6, &patterns) {
            let mut all = Vec::with_capacity(codes.len() + 1);
            all.push(START_A + start);
            all.extend(codes);
            if let Some(text) = verify_and_translate(&all) {
                return Some(text);
            }
        }
    }
    None
}

/// Read symbols after the start symbol up to (excluding) the stop symbol
fn read_symbols(runs: &[u32], mut pos: usize, patterns: &[&[u8]]) -> Option<Vec<usize>> {
    let mut codes = Vec::new();
    while pos + 6 <= runs.len() {
        let code = best_match(&runs[pos..pos + 6], patterns, MAX_AVG_VARIANCE, MAX_INDIVIDUAL_VARIANCE)?;
        if code == STOP {
            return Some(codes);
        }
        if code >= START_A {
            return None;
        }
        codes.push(code);
        pos += 6;
    }
    None
}

/// Check the mod-103 checksum and translate codes (start first, checksum last)
fn verify_and_translate(codes: &[usize]) -> Option<String> {
    // Start, at least one data symbol, checksum
    if codes.len() < 3 {
        return None;
    }
    let (check, body) = codes.split_last()?;
    let sum = body
        .iter()
        .enumerate()
        .map(|(pos, &code)| if pos == 0 { code } else { pos * code })
        .sum::<usize>();
    if sum % 103 != *check {
        return None;
    }
    translate(body)
}

fn translate(codes: &[usize]) -> Option<String> {
    let mut set = match codes[0] {
        START_A => CodeSet::A,
        START_B => CodeSet::B,
        START_C => CodeSet::C,
        _ => return None,
    };
    let mut text = String::new();
    let mut shift = false;
    let mut fnc4 = false;

    for (idx, &code) in codes.iter().enumerate().skip(1) {
        let current = if shift {
            match set {
                CodeSet::A => CodeSet::B,
                CodeSet::B => CodeSet::A,
                CodeSet::C => CodeSet::C,
            }
        } else {
            set
        };
        shift = false;

        match current {
            CodeSet::A | CodeSet::B => match code {
                0..=63 => push_char(&mut text, code as u32 + 32, &mut fnc4),
                64..=95 if current == CodeSet::A => push_char(&mut text, code as u32 - 64, &mut fnc4),
                64..=95 => push_char(&mut text, code as u32 + 32, &mut fnc4),
                FNC_3 | FNC_2 => {}
                CODE_SHIFT => shift = true,
                CODE_C => set = CodeSet::C,
                CODE_B if current == CodeSet::A => set = CodeSet::B,
                CODE_A if current == CodeSet::B => set = CodeSet::A,
                // FNC4 in its own set
                CODE_B | CODE_A => fnc4 = true,
                FNC_1 if idx == 1 => {}
                FNC_1 => text.push(GS),
                _ => return None,
            },
            CodeSet::C => match code {
                0..=99 => {
                    text.push(char::from(b'0' + (code / 10) as u8));
                    text.push(char::from(b'0' + (code % 10) as u8));
                }
                CODE_B => set = CodeSet::B,
                CODE_A => set = CodeSet::A,
                FNC_1 if idx == 1 => {}
                FNC_1 => text.push(GS),
                _ => return None,
            },
        }
    }

    if text.is_empty() { None } else { Some(text) }
}

fn push_char(text: &mut String, value: u32, fnc4: &mut bool) {
    let value = if *fnc4 { value + 128 } else { value };
    *fnc4 = false;
    if let Some(c) = char::from_u32(value) {
        text.push(c);
    }
}

/// Element widths (modules) of `text` encoded as Code 128, starting with a bar.
///
/// Even-length digit strings use code set C, everything else code set B.
/// Returns `None` for characters outside printable ASCII.
pub(crate) fn encode(text: &str) -> Option<Vec<u8>> {
    if text.is_empty() {
        return None;
    }
    let bytes = text.as_bytes();
    let mut codes = Vec::new();
    if bytes.len() % 2 == 0 && bytes.iter().all(u8::is_ascii_digit) {
        codes.push(START_C);
        for pair in bytes.chunks_exact(2) {
            codes.push(((pair[0] - b'0') * 10 + (pair[1] - b'0')) as usize);
        }
    } else {
        codes.push(START_B);
        for &b in bytes {
            if !(32..=127).contains(&b) {
                return None;
            }
            codes.push((b - 32) as usize);
        }
    }

    let sum: usize = codes
        .iter()
        .enumerate()
        .map(|(pos, &code)| if pos == 0 { code } else { pos * code })
        .sum();
    codes.push(sum % 103);
    codes.push(STOP);

    let mut widths: Vec<u8> = codes.iter().flat_map(|&c| PATTERNS[c]).collect();
    widths.push(STOP_TERMINATOR);
    Some(widths)
}
