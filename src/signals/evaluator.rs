// =============================================================================
// Signal Evaluator - indicator reading => categorical signal
// =============================================================================
//
// One stateless rule per indicator:
//
//   RSI         < 30 Oversold,  > 70 Overbought,  else Neutral
//   MACD        line > signal Bullish,  < signal Bearish,  == Neutral
//   SMA         price > SMA Bullish,  else Bearish
//   Bollinger   price < lower Buy,  price > upper Sell,  else Neutral
//   ADX         > 25 StrongTrend,  else WeakTrend
//   Volatility  < threshold Low,  else High
//               (threshold = configured value, or median of the series)
//   Stochastic  %K < 20 Oversold,  > 80 Overbought,  else Neutral
//
// A missing value always maps to NoData.
// =============================================================================

use crate::indicators::rolling::median;
use crate::indicators::{IndicatorKind, IndicatorOutput, IndicatorParams};

use super::categories::{IndicatorResult, SignalCategory};

pub const RSI_OVERSOLD: f64 = 30.0;
pub const RSI_OVERBOUGHT: f64 = 70.0;
pub const STOCH_OVERSOLD: f64 = 20.0;
pub const STOCH_OVERBOUGHT: f64 = 80.0;
pub const ADX_STRONG_TREND: f64 = 25.0;

pub struct SignalEvaluator;

impl SignalEvaluator {
    /// Categorise a single indicator output against the latest `price`.
    pub fn evaluate(
        kind: IndicatorKind,
        output: &IndicatorOutput,
        price: f64,
        params: &IndicatorParams,
    ) -> SignalCategory {
        let Some(value) = output.value else {
            return SignalCategory::NoData;
        };
        let series = output.series.as_deref().unwrap_or(&[]);

        match kind {
            IndicatorKind::Rsi => Self::oscillator(value, RSI_OVERSOLD, RSI_OVERBOUGHT),
            IndicatorKind::Stochastic => Self::oscillator(value, STOCH_OVERSOLD, STOCH_OVERBOUGHT),
            IndicatorKind::Macd => match series.first() {
                Some(&signal) if value > signal => SignalCategory::Bullish,
                Some(&signal) if value < signal => SignalCategory::Bearish,
                Some(_) => SignalCategory::Neutral,
                None => SignalCategory::NoData,
            },
            IndicatorKind::Sma => {
                if price > value {
                    SignalCategory::Bullish
                } else {
                    SignalCategory::Bearish
                }
            }
            IndicatorKind::Bollinger => match series {
                [_, _, lower] if price < *lower => SignalCategory::Buy,
                [upper, _, _] if price > *upper => SignalCategory::Sell,
                [_, _, _] => SignalCategory::Neutral,
                _ => SignalCategory::NoData,
            },
            IndicatorKind::Adx => {
                if value > ADX_STRONG_TREND {
                    SignalCategory::StrongTrend
                } else {
                    SignalCategory::WeakTrend
                }
            }
            IndicatorKind::Volatility => {
                let threshold = params.volatility_threshold.or_else(|| median(series));
                match threshold {
                    Some(t) if value < t => SignalCategory::LowVolatility,
                    Some(_) => SignalCategory::HighVolatility,
                    None => SignalCategory::NoData,
                }
            }
        }
    }

    /// Categorise every output of a full indicator pass.
    pub fn evaluate_all(
        outputs: &[(IndicatorKind, IndicatorOutput)],
        price: f64,
        params: &IndicatorParams,
    ) -> Vec<IndicatorResult> {
        outputs
            .iter()
            .map(|(kind, output)| IndicatorResult {
                kind: *kind,
                value: output.value,
                signal: Self::evaluate(*kind, output, price, params),
            })
            .collect()
    }

    fn oscillator(value: f64, oversold: f64, overbought: f64) -> SignalCategory {
        if value < oversold {
            SignalCategory::Oversold
        } else if value > overbought {
            SignalCategory::Overbought
        } else {
            SignalCategory::Neutral
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(kind: IndicatorKind, output: IndicatorOutput, price: f64) -> SignalCategory {
        SignalEvaluator::evaluate(kind, &output, price, &IndicatorParams::default())
    }

    #[test]
    fn missing_value_is_no_data() {
        for kind in IndicatorKind::ALL {
            assert_eq!(eval(kind, IndicatorOutput::none(), 100.0), SignalCategory::NoData);
        }
    }

    #[test]
    fn rsi_thresholds() {
        let rsi = |v| eval(IndicatorKind::Rsi, IndicatorOutput::scalar(Some(v)), 100.0);
        assert_eq!(rsi(29.9), SignalCategory::Oversold);
        assert_eq!(rsi(30.0), SignalCategory::Neutral);
        assert_eq!(rsi(70.0), SignalCategory::Neutral);
        assert_eq!(rsi(70.1), SignalCategory::Overbought);
    }

    #[test]
    fn macd_crossover() {
        let macd = |line, signal| {
            eval(
                IndicatorKind::Macd,
                IndicatorOutput::with_series(line, vec![signal, line - signal]),
                100.0,
            )
        };
        assert_eq!(macd(1.0, 0.5), SignalCategory::Bullish);
        assert_eq!(macd(0.5, 1.0), SignalCategory::Bearish);
        assert_eq!(macd(1.0, 1.0), SignalCategory::Neutral);
    }

    #[test]
    fn sma_equal_price_is_bearish() {
        let out = IndicatorOutput::scalar(Some(100.0));
        assert_eq!(eval(IndicatorKind::Sma, out.clone(), 100.0), SignalCategory::Bearish);
        assert_eq!(eval(IndicatorKind::Sma, out, 100.5), SignalCategory::Bullish);
    }

    #[test]
    fn bollinger_band_breaks() {
        let bands = IndicatorOutput::with_series(100.0, vec![110.0, 100.0, 90.0]);
        assert_eq!(eval(IndicatorKind::Bollinger, bands.clone(), 89.0), SignalCategory::Buy);
        assert_eq!(eval(IndicatorKind::Bollinger, bands.clone(), 111.0), SignalCategory::Sell);
        assert_eq!(eval(IndicatorKind::Bollinger, bands.clone(), 110.0), SignalCategory::Neutral);
        assert_eq!(eval(IndicatorKind::Bollinger, bands, 90.0), SignalCategory::Neutral);
    }

    #[test]
    fn adx_strength() {
        let adx = |v| eval(IndicatorKind::Adx, IndicatorOutput::with_series(v, vec![0.0, 0.0]), 1.0);
        assert_eq!(adx(25.0), SignalCategory::WeakTrend);
        assert_eq!(adx(25.1), SignalCategory::StrongTrend);
    }

    #[test]
    fn volatility_against_median() {
        let series = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let low = IndicatorOutput::with_series(2.0, series.clone());
        let high = IndicatorOutput::with_series(3.0, series);
        assert_eq!(eval(IndicatorKind::Volatility, low, 1.0), SignalCategory::LowVolatility);
        assert_eq!(eval(IndicatorKind::Volatility, high, 1.0), SignalCategory::HighVolatility);
    }

    #[test]
    fn volatility_against_fixed_threshold() {
        let params = IndicatorParams {
            volatility_threshold: Some(10.0),
            ..IndicatorParams::default()
        };
        let out = IndicatorOutput::with_series(5.0, vec![1.0, 5.0]);
        assert_eq!(
            SignalEvaluator::evaluate(IndicatorKind::Volatility, &out, 1.0, &params),
            SignalCategory::LowVolatility
        );
    }

    #[test]
    fn stochastic_thresholds() {
        let stoch = |v| eval(IndicatorKind::Stochastic, IndicatorOutput::scalar(Some(v)), 1.0);
        assert_eq!(stoch(19.0), SignalCategory::Oversold);
        assert_eq!(stoch(50.0), SignalCategory::Neutral);
        assert_eq!(stoch(81.0), SignalCategory::Overbought);
    }
}
