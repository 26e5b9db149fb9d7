// =============================================================================
// Moving Average Convergence Divergence (MACD)
// =============================================================================
//
//   MACD line   = EMA(short) - EMA(long)
//   Signal line = EMA(signal) of the MACD line
//   Histogram   = MACD line - Signal line
//
// All EMAs are seeded with their first input.  The indicator is reported only
// once the window holds `long` closes; before that the slow EMA is still
// dominated by its seed.
// =============================================================================

use super::ema::calculate_ema;

/// Latest MACD reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdResult {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Full MACD and signal lines, one value per close.
pub fn macd_lines(closes: &[f64], short: usize, long: usize, signal: usize) -> (Vec<f64>, Vec<f64>) {
    let fast = calculate_ema(closes, short);
    let slow = calculate_ema(closes, long);
    let macd: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let signal_line = calculate_ema(&macd, signal);
    (macd, signal_line)
}

/// Compute the latest MACD reading.
///
/// Returns `None` when:
/// - any span is zero or `short >= long`;
/// - fewer than `long` closes are available;
/// - a non-finite value truncated one of the lines.
pub fn calculate_macd(closes: &[f64], short: usize, long: usize, signal: usize) -> Option<MacdResult> {
    if short == 0 || signal == 0 || short >= long || closes.len() < long {
        return None;
    }

    let (macd, signal_line) = macd_lines(closes, short, long, signal);
    if macd.len() != closes.len() || signal_line.len() != closes.len() {
        return None;
    }

    let macd = *macd.last()?;
    let signal = *signal_line.last()?;
    Some(MacdResult {
        macd,
        signal,
        histogram: macd - signal,
    })
}
