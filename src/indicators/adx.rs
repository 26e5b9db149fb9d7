// =============================================================================
// Average Directional Index (ADX)
// =============================================================================
//
// ADX quantifies trend **strength** regardless of direction.
//
// Calculation pipeline:
//   1. Compute +DM and -DM per bar:
//        up   = high_t - high_{t-1}
//        down = low_{t-1} - low_t
//        +DM  = up   if up > down and up > 0,   else 0
//        -DM  = down if down > up and down > 0, else 0
//   2. Compute True Range (TR) per bar and ATR = rolling mean of TR.
//   3. +DI = 100 * rolling_sum(+DM) / ATR
//      -DI = 100 * rolling_sum(-DM) / ATR
//   4. DX  = 100 * |+DI - -DI| / (+DI + -DI)
//   5. ADX = rolling mean of DX over `period`.
//
// Degenerate ratios resolve to 0: a zero ATR (no range at all) gives zero
// DIs, and a zero DI sum gives DX = 0.  A perfectly flat market therefore
// reads as "no trend" rather than as missing data.
//
// Interpretation:
//   ADX > 25  => trending market
// =============================================================================

use super::atr::atr_series;
use super::rolling::{rolling_mean, rolling_sum};
use crate::types::Observation;

/// ADX together with the directional indicators it was derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdxResult {
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
}

/// +DM and -DM for each consecutive pair of observations (length `n - 1`).
pub fn directional_movement(observations: &[Observation]) -> (Vec<f64>, Vec<f64>) {
    observations
        .windows(2)
        .map(|w| {
            let up_move = w[1].high - w[0].high;
            let down_move = w[0].low - w[1].low;

            let pdm = if up_move > down_move && up_move > 0.0 {
                up_move
            } else {
                0.0
            };
            let mdm = if down_move > up_move && down_move > 0.0 {
                down_move
            } else {
                0.0
            };
            (pdm, mdm)
        })
        .unzip()
}

/// Compute the most recent ADX reading from a slice of observations.
///
/// Returns `None` when:
/// - `period` is zero.
/// - There are fewer than `2 * period` observations (`period` true ranges
///   for the first DI, then `period` DX values for the ADX mean).
/// - Any intermediate calculation produces a non-finite result.
pub fn calculate_adx(observations: &[Observation], period: usize) -> Option<AdxResult> {
    if period == 0 || observations.len() < 2 * period {
        return None;
    }

    let (plus_dm, minus_dm) = directional_movement(observations);

    let atr = atr_series(observations, period);
    let plus_sum = rolling_sum(&plus_dm, period);
    let minus_sum = rolling_sum(&minus_dm, period);

    let mut dx_values = Vec::with_capacity(atr.len());
    let mut last_di = (0.0, 0.0);
    for ((&atr, &ps), &ms) in atr.iter().zip(&plus_sum).zip(&minus_sum) {
        let (plus_di, minus_di) = if atr > 0.0 {
            (100.0 * ps / atr, 100.0 * ms / atr)
        } else {
            (0.0, 0.0)
        };
        dx_values.push(compute_dx(plus_di, minus_di));
        last_di = (plus_di, minus_di);
    }

    let adx = *rolling_mean(&dx_values, period).last()?;
    let (plus_di, minus_di) = last_di;

    if adx.is_finite() && plus_di.is_finite() && minus_di.is_finite() {
        Some(AdxResult {
            adx,
            plus_di,
            minus_di,
        })
    } else {
        None
    }
}

/// DX from the directional indicators; 0 when their sum is zero.
fn compute_dx(plus_di: f64, minus_di: f64) -> f64 {
    let di_sum = plus_di + minus_di;
    if di_sum <= 0.0 {
        return 0.0;
    }
    100.0 * (plus_di - minus_di).abs() / di_sum
}
