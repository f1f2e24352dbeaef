/// Width-pattern matching shared by the linear symbologies.
///
/// A pattern is a sequence of element widths in modules; observed runs are
/// scaled by the unit width implied by their total and compared element by
/// element.

/// Average variance, relative to the total width, of a match against `pattern`.
///
/// Returns `f32::INFINITY` when any single element is off by more than
/// `max_individual` modules or when the runs are too narrow to measure.
pub(crate) fn pattern_variance(runs: &[u32], pattern: &[u8], max_individual: f32) -> f32 {
    debug_assert_eq!(runs.len(), pattern.len());
    let total: u32 = runs.iter().sum();
    let modules: u32 = pattern.iter().map(|&p| p as u32).sum();
    if total < modules {
        // Less than one pixel per module
        return f32::INFINITY;
    }

    let unit = total as f32 / modules as f32;
    let max_individual = max_individual * unit;
    let mut variance = 0.0f32;
    for (&run, &width) in runs.iter().zip(pattern) {
        let diff = (run as f32 - width as f32 * unit).abs();
        if diff > max_individual {
            return f32::INFINITY;
        }
        variance += diff;
    }
    variance / total as f32
}

/// Index of the best matching pattern below `max_avg`, if any
pub(crate) fn best_match(
    runs: &[u32],
    patterns: &[&[u8]],
    max_avg: f32,
    max_individual: f32,
) -> Option<usize> {
    let mut best = None;
    let mut best_variance = max_avg;
    for (idx, pattern) in patterns.iter().enumerate() {
        let variance = pattern_variance(runs, pattern, max_individual);
        if variance < best_variance {
            best_variance = variance;
            best = Some(idx);
        }
    }
    best
}

/// Bar indices of a run list that starts with a light run
pub(crate) fn bar_starts(runs: &[u32], elements: usize) -> impl Iterator<Item = usize> + '_ {
    (1..runs.len()).step_by(2).take_while(move |&i| i + elements <= runs.len())
}
