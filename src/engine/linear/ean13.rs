//! EAN-13 (and UPC-A, reported as EAN-13 with a leading zero).

use super::pattern::{bar_starts, best_match, pattern_variance};

pub(crate) const SYMBOLOGY: &str = "EAN13";

const MAX_AVG_VARIANCE: f32 = 0.48;
const MAX_INDIVIDUAL_VARIANCE: f32 = 0.7;

/// Runs in a complete symbol: guard, 6 digits, centre guard, 6 digits, guard
const SYMBOL_RUNS: usize = 3 + 6 * 4 + 5 + 6 * 4 + 3;
/// Modules in a complete symbol
const SYMBOL_MODULES: u32 = 95;

const SIDE_GUARD: [u8; 3] = [1, 1, 1];
const CENTRE_GUARD: [u8; 5] = [1, 1, 1, 1, 1];

/// Widths of the odd-parity (L) digit encodings; R encodings share them
const L_PATTERNS: [[u8; 4]; 10] = [
    [3, 2, 1, 1],
    [2, 2, 2, 1],
    [2, 1, 2, 2],
    [1, 4, 1, 1],
    [1, 1, 3, 2],
    [1, 2, 3, 1],
    [1, 1, 1, 4],
    [1, 3, 1, 2],
    [1, 2, 1, 3],
    [3, 1, 1, 2],
];

/// Parity of the six left-hand digits for each implied first digit (1 = even/G)
const FIRST_DIGIT_PARITY: [u8; 10] = [
    0b000000, 0b001011, 0b001101, 0b001110, 0b010011, 0b011001, 0b011100, 0b010101, 0b010110,
    0b011010,
];

/// Even-parity (G) encodings are the L widths mirrored
fn g_pattern(digit: usize) -> [u8; 4] {
    let mut p = L_PATTERNS[digit];
    p.reverse();
    p
}

/// Decode the first valid EAN-13 symbol in a light-first run list
pub(crate) fn decode(runs: &[u32]) -> Option<String> {
    let l_patterns: Vec<&[u8]> = L_PATTERNS.iter().map(|p| p.as_slice()).collect();
    let g_owned: Vec<[u8; 4]> = (0..10).map(g_pattern).collect();
    let lg_patterns: Vec<&[u8]> = l_patterns
        .iter()
        .copied()
        .chain(g_owned.iter().map(|p| p.as_slice()))
        .collect();

    for i in bar_starts(runs, SYMBOL_RUNS) {
        if let Some(digits) = decode_at(runs, i, &l_patterns, &lg_patterns) {
            return Some(digits);
        }
    }
    None
}

fn decode_at(runs: &[u32], i: usize, l_patterns: &[&[u8]], lg_patterns: &[&[u8]]) -> Option<String> {
    let symbol = &runs[i..i + SYMBOL_RUNS];
    let total: u32 = symbol.iter().sum();
    let unit = total as f32 / SYMBOL_MODULES as f32;

    // Quiet zone of at least three modules
    if (runs[i - 1] as f32) < 3.0 * unit {
        return None;
    }
    if pattern_variance(&symbol[..3], &SIDE_GUARD, MAX_INDIVIDUAL_VARIANCE) > MAX_AVG_VARIANCE {
        return None;
    }

    let mut digits = Vec::with_capacity(13);
    let mut parity = 0u8;
    for k in 0..6 {
        let at = 3 + k * 4;
        let idx = best_match(&symbol[at..at + 4], lg_patterns, MAX_AVG_VARIANCE, MAX_INDIVIDUAL_VARIANCE)?;
        if idx >= 10 {
            parity |= 1 << (5 - k);
        }
        digits.push((idx % 10) as u8);
    }

    if pattern_variance(&symbol[27..32], &CENTRE_GUARD, MAX_INDIVIDUAL_VARIANCE) > MAX_AVG_VARIANCE {
        return None;
    }

    for k in 0..6 {
        let at = 32 + k * 4;
        let idx = best_match(&symbol[at..at + 4], l_patterns, MAX_AVG_VARIANCE, MAX_INDIVIDUAL_VARIANCE)?;
        digits.push(idx as u8);
    }

    if pattern_variance(&symbol[56..59], &SIDE_GUARD, MAX_INDIVIDUAL_VARIANCE) > MAX_AVG_VARIANCE {
        return None;
    }

    let first = FIRST_DIGIT_PARITY.iter().position(|&p| p == parity)? as u8;
    digits.insert(0, first);
    if check_digit(&digits[..12]) != digits[12] {
        return None;
    }
    Some(digits.iter().map(|d| char::from(b'0' + d)).collect())
}

/// EAN check digit over the first 12 digits
fn check_digit(digits: &[u8]) -> u8 {
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, &d)| if i % 2 == 0 { d as u32 } else { d as u32 * 3 })
        .sum();
    ((10 - sum % 10) % 10) as u8
}

/// Element widths of a 12- or 13-digit EAN-13, starting with a bar.
///
/// A 12-digit input gets its check digit appended; a 13-digit input must
/// carry a correct one.
pub(crate) fn encode(text: &str) -> Option<Vec<u8>> {
    if !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut digits: Vec<u8> = text.bytes().map(|b| b - b'0').collect();
    match digits.len() {
        12 => digits.push(check_digit(&digits)),
        13 if check_digit(&digits[..12]) == digits[12] => {}
        _ => return None,
    }

    let parity = FIRST_DIGIT_PARITY[digits[0] as usize];
    let mut widths = SIDE_GUARD.to_vec();
    for (k, &d) in digits[1..7].iter().enumerate() {
        if parity & (1 << (5 - k)) != 0 {
            widths.extend(g_pattern(d as usize));
        } else {
            widths.extend(L_PATTERNS[d as usize]);
        }
    }
    widths.extend(CENTRE_GUARD);
    for &d in &digits[7..] {
        widths.extend(L_PATTERNS[d as usize]);
    }
    widths.extend(SIDE_GUARD);
    Some(widths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::linear::test_support::runs_from_widths;

    #[test]
    fn test_symbol_shape() {
        let widths = encode("400638133393").unwrap();
        assert_eq!(widths.len(), SYMBOL_RUNS);
        assert_eq!(widths.iter().map(|&w| w as u32).sum::<u32>(), SYMBOL_MODULES);
    }

    #[test]
    fn test_check_digit() {
        // 4006381333931 is a well-known valid EAN-13
        assert_eq!(check_digit(&[4, 0, 0, 6, 3, 8, 1, 3, 3, 3, 9, 3]), 1);
    }

    #[test]
    fn test_decode_roundtrip_every_first_digit() {
        for first in 0..10u8 {
            let text = format!("{first}12345678901");
            let widths = encode(&text).unwrap();
            let decoded = decode(&runs_from_widths(&widths, 2, 9)).unwrap();
            assert_eq!(&decoded[..12], text.as_str());
        }
    }

    #[test]
    fn test_wrong_check_digit_is_rejected() {
        assert_eq!(encode("4006381333932"), None);
        let mut widths = encode("4006381333931").unwrap();
        // Replace the last right-hand digit (1) by a 7
        widths[52..56].copy_from_slice(&L_PATTERNS[7]);
        assert_eq!(decode(&runs_from_widths(&widths, 2, 9)), None);
    }
}
