// =============================================================================
// Signal categories and votes
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::indicators::IndicatorKind;

/// Categorical reading of one indicator.
///
/// Which tags an indicator can produce:
/// - RSI, Stochastic: Oversold / Overbought / Neutral
/// - MACD: Bullish / Bearish / Neutral
/// - SMA: Bullish / Bearish
/// - Bollinger: Buy / Sell / Neutral
/// - ADX: StrongTrend / WeakTrend
/// - Volatility: HighVolatility / LowVolatility
///
/// Any indicator without a value reports `NoData`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalCategory {
    Oversold,
    Overbought,
    Neutral,
    Bullish,
    Bearish,
    Buy,
    Sell,
    StrongTrend,
    WeakTrend,
    HighVolatility,
    LowVolatility,
    NoData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Vote {
    Buy,
    Sell,
}

impl SignalCategory {
    /// The vote this category casts, if any.
    ///
    /// Trend strength, volatility, neutral readings and missing data abstain.
    pub fn vote(self) -> Option<Vote> {
        match self {
            Self::Oversold | Self::Bullish | Self::Buy => Some(Vote::Buy),
            Self::Overbought | Self::Bearish | Self::Sell => Some(Vote::Sell),
            Self::Neutral
            | Self::StrongTrend
            | Self::WeakTrend
            | Self::HighVolatility
            | Self::LowVolatility
            | Self::NoData => None,
        }
    }
}

/// One indicator's contribution to a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorResult {
    pub kind: IndicatorKind,
    pub value: Option<f64>,
    pub signal: SignalCategory,
}
