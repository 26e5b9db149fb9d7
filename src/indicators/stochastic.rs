// =============================================================================
// Stochastic Oscillator (%K / %D)
// =============================================================================
//
//   %K = 100 * (close - lowest_low) / (highest_high - lowest_low)
//        over the last `period` observations
//   %D = mean of the last `smooth_d` %K values
//
// When the period range is empty (highest_high <= lowest_low) %K is
// undefined rather than 0 or 50.  Feeds that report a close outside its own
// high/low would push %K out of range, so it is clamped to [0, 100].
// =============================================================================

use crate::types::Observation;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StochasticResult {
    pub k: f64,
    /// `None` until `smooth_d` consecutive %K values are defined.
    pub d: Option<f64>,
}

/// %K for the window ending at each observation from index `period - 1`.
pub fn percent_k_series(observations: &[Observation], period: usize) -> Vec<Option<f64>> {
    if period == 0 || observations.len() < period {
        return Vec::new();
    }
    observations.windows(period).map(percent_k).collect()
}

fn percent_k(window: &[Observation]) -> Option<f64> {
    let close = window.last()?.close;
    let highest = window.iter().map(|o| o.high).fold(f64::NEG_INFINITY, f64::max);
    let lowest = window.iter().map(|o| o.low).fold(f64::INFINITY, f64::min);

    if highest <= lowest {
        return None;
    }
    let k = 100.0 * (close - lowest) / (highest - lowest);
    k.is_finite().then(|| k.clamp(0.0, 100.0))
}

/// Latest %K and (when available) %D.
///
/// Returns `None` when there are fewer than `period` observations or the
/// latest %K is undefined.
pub fn calculate_stochastic(
    observations: &[Observation],
    period: usize,
    smooth_d: usize,
) -> Option<StochasticResult> {
    let series = percent_k_series(observations, period);
    let k = (*series.last()?)?;

    let d = if smooth_d > 0 && series.len() >= smooth_d {
        let tail = &series[series.len() - smooth_d..];
        tail.iter()
            .copied()
            .collect::<Option<Vec<f64>>>()
            .map(|ks| ks.iter().sum::<f64>() / smooth_d as f64)
    } else {
        None
    };

    Some(StochasticResult { k, d })
}
