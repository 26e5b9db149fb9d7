// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the technical indicators used by
// the consensus engine.  Every public function returns `Option<T>` (or an
// empty series) so callers are forced to handle insufficient-data and
// numerical-edge-case scenarios.
//
// `IndicatorKind` is the closed set of indicators the engine evaluates; the
// stream processor dispatches on it rather than holding a list of callbacks.

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rolling;
pub mod rsi;
pub mod sma;
pub mod stochastic;
pub mod volatility;

use serde::{Deserialize, Serialize};

use crate::types::Observation;

pub use volatility::VolatilityMethod;

/// Parameters for one full indicator pass.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorParams {
    pub period: usize,
    pub macd_short: usize,
    pub macd_long: usize,
    pub macd_signal: usize,
    pub bollinger_k: f64,
    pub stochastic_smooth_d: usize,
    pub volatility_method: VolatilityMethod,
    pub volatility_threshold: Option<f64>,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            period: 14,
            macd_short: 12,
            macd_long: 26,
            macd_signal: 9,
            bollinger_k: 2.0,
            stochastic_smooth_d: 3,
            volatility_method: VolatilityMethod::CloseStdDev,
            volatility_threshold: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndicatorKind {
    Rsi,
    Macd,
    Sma,
    Bollinger,
    Adx,
    Volatility,
    Stochastic,
}

/// Output of one indicator over one window.
///
/// `value` is the headline reading; `series` carries what the signal rules
/// need beyond it:
///
/// | kind        | value    | series                         |
/// |-------------|----------|--------------------------------|
/// | Rsi, Sma    | reading  | `None`                         |
/// | Macd        | MACD     | `[signal, histogram]`          |
/// | Bollinger   | middle   | `[upper, middle, lower]`       |
/// | Adx         | ADX      | `[+DI, -DI]`                   |
/// | Volatility  | latest   | full rolling series, oldest first |
/// | Stochastic  | %K       | `[%D]` once %D is defined      |
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorOutput {
    pub value: Option<f64>,
    pub series: Option<Vec<f64>>,
}

impl IndicatorOutput {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn scalar(value: Option<f64>) -> Self {
        Self {
            value,
            series: None,
        }
    }

    pub fn with_series(value: f64, series: Vec<f64>) -> Self {
        Self {
            value: Some(value),
            series: Some(series),
        }
    }
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 7] = [
        IndicatorKind::Rsi,
        IndicatorKind::Macd,
        IndicatorKind::Sma,
        IndicatorKind::Bollinger,
        IndicatorKind::Adx,
        IndicatorKind::Volatility,
        IndicatorKind::Stochastic,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Rsi => "RSI",
            Self::Macd => "MACD",
            Self::Sma => "SMA",
            Self::Bollinger => "Bollinger",
            Self::Adx => "ADX",
            Self::Volatility => "Volatility",
            Self::Stochastic => "Stochastic",
        }
    }

    /// Observations required before this indicator reports a value.
    pub fn lookback(&self, params: &IndicatorParams) -> usize {
        let p = params.period;
        match self {
            Self::Rsi => p + 1,
            Self::Macd => params.macd_long,
            Self::Sma | Self::Bollinger | Self::Stochastic => p,
            Self::Adx => 2 * p,
            Self::Volatility => params.volatility_method.lookback(p),
        }
    }

    /// Compute this indicator over `window` (oldest first).
    pub fn compute(&self, window: &[Observation], params: &IndicatorParams) -> IndicatorOutput {
        let closes: Vec<f64> = window.iter().map(|o| o.close).collect();
        self.compute_with_closes(window, &closes, params)
    }

    fn compute_with_closes(
        &self,
        window: &[Observation],
        closes: &[f64],
        params: &IndicatorParams,
    ) -> IndicatorOutput {
        let p = params.period;
        match self {
            Self::Rsi => IndicatorOutput::scalar(rsi::current_rsi(closes, p)),
            Self::Sma => IndicatorOutput::scalar(sma::calculate_sma(closes, p)),
            Self::Macd => {
                match macd::calculate_macd(
                    closes,
                    params.macd_short,
                    params.macd_long,
                    params.macd_signal,
                ) {
                    Some(m) => IndicatorOutput::with_series(m.macd, vec![m.signal, m.histogram]),
                    None => IndicatorOutput::none(),
                }
            }
            Self::Bollinger => match bollinger::calculate_bollinger(closes, p, params.bollinger_k) {
                Some(bb) => IndicatorOutput::with_series(bb.middle, vec![bb.upper, bb.middle, bb.lower]),
                None => IndicatorOutput::none(),
            },
            Self::Adx => match adx::calculate_adx(window, p) {
                Some(r) => IndicatorOutput::with_series(r.adx, vec![r.plus_di, r.minus_di]),
                None => IndicatorOutput::none(),
            },
            Self::Volatility => match volatility::calculate_volatility(closes, p, params.volatility_method) {
                Some(v) => IndicatorOutput::with_series(v.latest, v.series),
                None => IndicatorOutput::none(),
            },
            Self::Stochastic => {
                match stochastic::calculate_stochastic(window, p, params.stochastic_smooth_d) {
                    Some(s) => IndicatorOutput {
                        value: Some(s.k),
                        series: s.d.map(|d| vec![d]),
                    },
                    None => IndicatorOutput::none(),
                }
            }
        }
    }
}

impl std::fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Run every indicator over `window`, in `IndicatorKind::ALL` order.
pub fn compute_all(window: &[Observation], params: &IndicatorParams) -> Vec<(IndicatorKind, IndicatorOutput)> {
    let closes: Vec<f64> = window.iter().map(|o| o.close).collect();
    IndicatorKind::ALL
        .iter()
        .map(|&kind| (kind, kind.compute_with_closes(window, &closes, params)))
        .collect()
}
