// =============================================================================
// Volatility (VTR)
// =============================================================================
//
// Two variants are available:
//
//   CloseStdDev (canonical)  sample std of the last `period` closes
//   LogReturns               sample std of the last `period` log returns,
//                            scaled by sqrt(period)
//
// They are not interchangeable: the first is in price units, the second is a
// dimensionless return volatility.  The signal layer compares the latest
// value against either a fixed threshold or the median of the series, so
// the series (not just the last value) is what gets reported.
// =============================================================================

use serde::{Deserialize, Serialize};

use super::rolling::rolling_sample_std;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VolatilityMethod {
    #[default]
    CloseStdDev,
    LogReturns,
}

impl VolatilityMethod {
    /// Observations needed before the first value is defined.
    pub fn lookback(&self, period: usize) -> usize {
        match self {
            Self::CloseStdDev => period,
            Self::LogReturns => period + 1,
        }
    }
}

/// Natural-log returns between consecutive closes.
///
/// Empty if any close is non-positive.
pub fn log_returns(closes: &[f64]) -> Vec<f64> {
    if closes.iter().any(|&c| c <= 0.0) {
        return Vec::new();
    }
    closes.windows(2).map(|w| (w[1] / w[0]).ln()).collect()
}

/// Rolling volatility series, oldest first.
pub fn volatility_series(closes: &[f64], period: usize, method: VolatilityMethod) -> Vec<f64> {
    match method {
        VolatilityMethod::CloseStdDev => rolling_sample_std(closes, period),
        VolatilityMethod::LogReturns => {
            let scale = (period as f64).sqrt();
            rolling_sample_std(&log_returns(closes), period)
                .into_iter()
                .map(|std| std * scale)
                .collect()
        }
    }
}

/// Latest volatility reading plus the series it was taken from.
#[derive(Debug, Clone, PartialEq)]
pub struct VolatilityResult {
    pub latest: f64,
    pub series: Vec<f64>,
}

/// Rolling volatility over `closes`, or `None` on insufficient data.
pub fn calculate_volatility(closes: &[f64], period: usize, method: VolatilityMethod) -> Option<VolatilityResult> {
    let series = volatility_series(closes, period, method);
    let latest = series.last().copied().filter(|v| v.is_finite())?;
    Some(VolatilityResult { latest, series })
}
