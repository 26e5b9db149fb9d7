// =============================================================================
// Rolling-window statistics shared by the indicators
// =============================================================================
//
// Every rolling helper returns one output per *complete* window, oldest first:
// an input of length `n` with window `period` yields `n - period + 1` values
// (or nothing when `n < period` or `period == 0`).  There is no partial-window
// output, so a short series can never masquerade as a computed value.

/// Arithmetic mean of each `period`-long window.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }
    let divisor = period as f64;
    values
        .windows(period)
        .map(|w| w.iter().sum::<f64>() / divisor)
        .collect()
}

/// Sum of each `period`-long window.
pub fn rolling_sum(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }
    values.windows(period).map(|w| w.iter().sum()).collect()
}

/// Sample standard deviation (n - 1 denominator).
///
/// Returns `None` for fewer than two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std = variance.sqrt();
    std.is_finite().then_some(std)
}

/// Sample standard deviation of each `period`-long window.
///
/// Empty when `period < 2`.
pub fn rolling_sample_std(values: &[f64], period: usize) -> Vec<f64> {
    if period < 2 || values.len() < period {
        return Vec::new();
    }
    values.windows(period).filter_map(sample_std).collect()
}

/// Median of `values`; `None` when empty or when any value is NaN.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() || values.iter().any(|v| v.is_nan()) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_lengths() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(rolling_mean(&v, 2), vec![1.5, 2.5, 3.5, 4.5]);
        assert_eq!(rolling_mean(&v, 5), vec![3.0]);
        assert!(rolling_mean(&v, 6).is_empty());
        assert!(rolling_mean(&v, 0).is_empty());
    }

    #[test]
    fn sum_window() {
        assert_eq!(rolling_sum(&[1.0, 2.0, 3.0], 2), vec![3.0, 5.0]);
    }

    #[test]
    fn std_matches_known_value() {
        // Sample std of 2,4,4,4,5,5,7,9 is sqrt(32/7).
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let std = sample_std(&v).unwrap();
        assert!((std - (32.0_f64 / 7.0).sqrt()).abs() < 1e-10);
    }

    #[test]
    fn std_needs_two_points() {
        assert!(sample_std(&[1.0]).is_none());
        assert!(rolling_sample_std(&[1.0, 2.0, 3.0], 1).is_empty());
    }

    #[test]
    fn median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[1.0, f64::NAN]), None);
    }
}
