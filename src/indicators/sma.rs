// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================

/// Mean of the last `period` closes, or `None` on insufficient data.
pub fn calculate_sma(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period {
        return None;
    }
    let window = &closes[closes.len() - period..];
    let sma = window.iter().sum::<f64>() / period as f64;
    sma.is_finite().then_some(sma)
}
