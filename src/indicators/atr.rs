// =============================================================================
// True Range / Average True Range (ATR)
// =============================================================================
//
// True Range (TR) for each bar:
//   TR = max(H - L, |H - prevClose|, |L - prevClose|)
//
// ATR is the simple rolling mean of TR over `period` bars.  It feeds the
// directional indicators in `adx`.
// =============================================================================

use super::rolling::rolling_mean;
use crate::types::Observation;

/// True range of one bar given the previous close.
pub fn true_range(high: f64, low: f64, prev_close: f64) -> f64 {
    (high - low)
        .max((high - prev_close).abs())
        .max((low - prev_close).abs())
}

/// True range for each consecutive pair of observations (length `n - 1`).
pub fn true_ranges(observations: &[Observation]) -> Vec<f64> {
    observations
        .windows(2)
        .map(|w| true_range(w[1].high, w[1].low, w[0].close))
        .collect()
}

/// Rolling-mean ATR series.
pub fn atr_series(observations: &[Observation], period: usize) -> Vec<f64> {
    rolling_mean(&true_ranges(observations), period)
}
