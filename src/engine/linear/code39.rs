//! Code 39 (standard character set, no check character).

use super::pattern::bar_starts;

pub(crate) const SYMBOLOGY: &str = "CODE39";

const ALPHABET: &[u8; 43] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ-. $/+%";

/// Wide/narrow masks, first element in the most significant of 9 bits
#[rustfmt::skip]
const ENCODINGS: [u16; 43] = [
    0x034, 0x121, 0x061, 0x160, 0x031, 0x130, 0x070, 0x025, 0x124, 0x064,
    0x109, 0x049, 0x148, 0x019, 0x118, 0x058, 0x00D, 0x10C, 0x04C, 0x01C,
    0x103, 0x043, 0x142, 0x013, 0x112, 0x052, 0x007, 0x106, 0x046, 0x016,
    0x181, 0x0C1, 0x1C0, 0x091, 0x190, 0x0D0, 0x085, 0x184, 0x0C4, 0x0A8,
    0x0A2, 0x08A, 0x02A,
];

/// Start/stop character `*`
const ASTERISK: u16 = 0x094;

/// Elements per character
const CHAR_RUNS: usize = 9;
/// Module width of wide elements in rendered symbols
const WIDE: u8 = 3;

/// Classify nine element widths into a wide/narrow mask with exactly three wide
fn to_mask(runs: &[u32]) -> Option<u16> {
    let mut max_narrow = 0u32;
    loop {
        let min_over = runs.iter().copied().filter(|&r| r > max_narrow).min()?;
        max_narrow = min_over;
        let wide: Vec<u32> = runs.iter().copied().filter(|&r| r > max_narrow).collect();
        match wide.len() {
            3 => {
                // Wide elements must be clearly wider than narrow ones
                let narrow_max = runs.iter().copied().filter(|&r| r <= max_narrow).max()?;
                let wide_min = *wide.iter().min()?;
                if (wide_min as f32) < narrow_max as f32 * 1.5 {
                    return None;
                }
                let mut mask = 0u16;
                for (i, &r) in runs.iter().enumerate() {
                    if r > max_narrow {
                        mask |= 1 << (CHAR_RUNS - 1 - i);
                    }
                }
                return Some(mask);
            }
            n if n < 3 => return None,
            _ => continue,
        }
    }
}

fn lookup(mask: u16) -> Option<u8> {
    ENCODINGS.iter().position(|&e| e == mask).map(|i| ALPHABET[i])
}

/// Decode the first valid Code 39 symbol in a light-first run list
pub(crate) fn decode(runs: &[u32]) -> Option<String> {
    for i in bar_starts(runs, CHAR_RUNS) {
        if to_mask(&runs[i..i + CHAR_RUNS]) != Some(ASTERISK) {
            continue;
        }
        let start_width: u32 = runs[i..i + CHAR_RUNS].iter().sum();
        if runs[i - 1] * 2 < start_width {
            continue;
        }
        if let Some(text) = read_from(runs, i + CHAR_RUNS + 1, start_width) {
            return Some(text);
        }
    }
    None
}

fn read_from(runs: &[u32], mut pos: usize, start_width: u32) -> Option<String> {
    let mut text = String::new();
    while pos + CHAR_RUNS <= runs.len() {
        let chunk = &runs[pos..pos + CHAR_RUNS];
        // Inter-character gap must stay narrow
        if runs[pos - 1] as f32 > start_width as f32 / 6.0 {
            return None;
        }
        let width: u32 = chunk.iter().sum();
        if (width as f32) < start_width as f32 * 0.6 || (width as f32) > start_width as f32 * 1.6 {
            return None;
        }
        let mask = to_mask(chunk)?;
        if mask == ASTERISK {
            return if text.is_empty() { None } else { Some(text) };
        }
        text.push(char::from(lookup(mask)?));
        pos += CHAR_RUNS + 1;
    }
    None
}

/// Element widths of `*text*`, starting with a bar; narrow gaps between characters
pub(crate) fn encode(text: &str) -> Option<Vec<u8>> {
    if text.is_empty() {
        return None;
    }
    let mut masks = vec![ASTERISK];
    for b in text.bytes() {
        let idx = ALPHABET.iter().position(|&a| a == b.to_ascii_uppercase())?;
        masks.push(ENCODINGS[idx]);
    }
    masks.push(ASTERISK);

    let mut widths = Vec::with_capacity(masks.len() * (CHAR_RUNS + 1));
    for (n, mask) in masks.iter().enumerate() {
        if n > 0 {
            widths.push(1);
        }
        for bit in (0..CHAR_RUNS).rev() {
            widths.push(if mask & (1 << bit) != 0 { WIDE } else { 1 });
        }
    }
    Some(widths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::linear::test_support::runs_from_widths;

    #[test]
    fn test_every_encoding_has_three_wide_elements() {
        for (i, e) in ENCODINGS.iter().chain(std::iter::once(&ASTERISK)).enumerate() {
            assert_eq!(e.count_ones(), 3, "encoding {i}");
        }
    }

    #[test]
    fn test_decode_roundtrip() {
        let widths = encode("CODE-39 $5").unwrap();
        assert_eq!(decode(&runs_from_widths(&widths, 2, 10)), Some("CODE-39 $5".into()));
    }

    #[test]
    fn test_lowercase_is_uppercased() {
        let widths = encode("abc").unwrap();
        assert_eq!(decode(&runs_from_widths(&widths, 3, 10)), Some("ABC".into()));
    }

    #[test]
    fn test_unsupported_char() {
        assert_eq!(encode("a#b"), None);
    }

    #[test]
    fn test_missing_stop_is_rejected() {
        let mut widths = encode("XYZ").unwrap();
        widths.truncate(widths.len() - CHAR_RUNS - 1);
        assert_eq!(decode(&runs_from_widths(&widths, 2, 10)), None);
    }
}
