// =============================================================================
// Error taxonomy
// =============================================================================
//
// Nothing here is fatal to the process.  Malformed observations are dropped,
// invalid risk inputs force a Hold, and bad configuration is rejected before
// it reaches a running processor.  Insufficient data and degenerate ratios are
// not errors at all: they surface as `None` or documented guard values.

use thiserror::Error;

use crate::indicators::IndicatorKind;

/// Reasons an inbound observation is dropped before touching the window.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ObservationError {
    #[error("malformed observation: {field} is not finite")]
    NonFinite { field: &'static str },

    #[error("malformed observation: close must be positive, got {close}")]
    NonPositiveClose { close: f64 },

    #[error("malformed observation: {field} is negative ({value})")]
    Negative { field: &'static str, value: f64 },

    #[error("malformed observation: timestamp {received} is older than {previous}")]
    TimestampRegression { previous: i64, received: i64 },
}

/// Position sizing failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RiskError {
    #[error("invalid risk input: balance {balance} and price {price} must both be positive")]
    InvalidInput { balance: f64, price: f64 },

    #[error("invalid risk percentage: {0}")]
    InvalidRiskPercentage(f64),
}

/// Rejected configuration values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("period must be at least 2, got {0}")]
    PeriodTooShort(usize),

    #[error("capacity {capacity} is smaller than period {period}")]
    CapacityBelowPeriod { capacity: usize, period: usize },

    #[error("capacity {capacity} can never hold the {lookback} observations {indicator} needs")]
    CapacityBelowLookback {
        capacity: usize,
        indicator: IndicatorKind,
        lookback: usize,
    },

    #[error("{name} threshold must be at least 1")]
    ZeroThreshold { name: &'static str },

    #[error("MACD spans must satisfy 1 <= short < long and signal >= 1 (got {short}/{long}/{signal})")]
    MacdSpans {
        short: usize,
        long: usize,
        signal: usize,
    },

    #[error("risk percentage must be in (0, 100], got {0}")]
    RiskPercentage(f64),

    #[error("loss percentage must be in (0, 1), got {0}")]
    LossPercentage(f64),

    #[error("account balance must be positive and finite, got {0}")]
    AccountBalance(f64),

    #[error("bollinger k must be finite and non-negative, got {0}")]
    BollingerK(f64),

    #[error("stochastic %D smoothing must be at least 1")]
    StochasticSmoothing,
}
