// =============================================================================
// Shared types used across the consensus engine
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::error::ObservationError;

/// Identifier of a subscribed instrument, e.g. `"BTC-USD"`.
pub type InstrumentId = String;

/// A single price/volume observation (tick or candle) for one instrument.
///
/// `low <= close <= high` is not enforced: exchange feeds violate it
/// transiently and the indicators tolerate it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    #[serde(default)]
    pub volume: f64,
}

impl Observation {
    pub fn new(timestamp: i64, close: f64, high: f64, low: f64, volume: f64) -> Self {
        Self {
            timestamp,
            close,
            high,
            low,
            volume,
        }
    }

    /// Check the numeric fields of this observation.
    ///
    /// `close` must be finite and strictly positive; `high`, `low` and
    /// `volume` must be finite and non-negative.
    pub fn validate(&self) -> Result<(), ObservationError> {
        let fields = [
            ("close", self.close),
            ("high", self.high),
            ("low", self.low),
            ("volume", self.volume),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(ObservationError::NonFinite { field });
            }
        }
        if self.close <= 0.0 {
            return Err(ObservationError::NonPositiveClose { close: self.close });
        }
        for &(field, value) in &fields[1..] {
            if value < 0.0 {
                return Err(ObservationError::Negative { field, value });
            }
        }
        Ok(())
    }
}

/// Final trading action produced by the consensus vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl Default for Action {
    fn default() -> Self {
        Self::Hold
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
            Self::Hold => write!(f, "HOLD"),
        }
    }
}
