// =============================================================================
// Consensus Engine - threshold vote over categorical signals
// =============================================================================
//
//   buy_count  >= buy_threshold                    => BUY
//   sell_count >= sell_threshold (and not BUY)     => SELL
//   otherwise                                      => HOLD
//
// Buy is checked first, so with low thresholds a tie resolves to Buy.
// Abstaining categories (Neutral, trend, volatility, NoData) count for
// neither side.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::categories::{IndicatorResult, SignalCategory, Vote};
use crate::decision::ConsensusDecision;
use crate::types::Action;

fn default_buy_threshold() -> u32 {
    3
}
fn default_sell_threshold() -> u32 {
    3
}

/// Votes required for each side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusThresholds {
    #[serde(default = "default_buy_threshold")]
    pub buy_threshold: u32,
    #[serde(default = "default_sell_threshold")]
    pub sell_threshold: u32,
}

impl ConsensusThresholds {
    /// 3-of-N on either side.
    pub fn balanced() -> Self {
        Self {
            buy_threshold: 3,
            sell_threshold: 3,
        }
    }

    /// 5 votes to buy, 4 to sell.
    pub fn strict() -> Self {
        Self {
            buy_threshold: 5,
            sell_threshold: 4,
        }
    }
}

impl Default for ConsensusThresholds {
    fn default() -> Self {
        Self::balanced()
    }
}

#[derive(Debug, Clone)]
pub struct ConsensusEngine {
    thresholds: ConsensusThresholds,
}

impl ConsensusEngine {
    pub fn new(thresholds: ConsensusThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> ConsensusThresholds {
        self.thresholds
    }

    pub fn set_thresholds(&mut self, thresholds: ConsensusThresholds) {
        self.thresholds = thresholds;
    }

    /// Count votes and resolve the action.
    pub fn vote(&self, signals: &[SignalCategory]) -> ConsensusDecision {
        let (mut buy, mut sell) = (0u32, 0u32);
        for vote in signals.iter().filter_map(|s| s.vote()) {
            match vote {
                Vote::Buy => buy += 1,
                Vote::Sell => sell += 1,
            }
        }

        let action = if buy >= self.thresholds.buy_threshold {
            Action::Buy
        } else if sell >= self.thresholds.sell_threshold {
            Action::Sell
        } else {
            Action::Hold
        };

        debug!(
            buy_votes = buy,
            sell_votes = sell,
            buy_threshold = self.thresholds.buy_threshold,
            sell_threshold = self.thresholds.sell_threshold,
            %action,
            "Consensus vote"
        );

        ConsensusDecision::tally(action, buy, sell)
    }

    /// Vote over a full indicator breakdown.
    pub fn vote_results(&self, results: &[IndicatorResult]) -> ConsensusDecision {
        let signals: Vec<SignalCategory> = results.iter().map(|r| r.signal).collect();
        self.vote(&signals)
    }
}

impl Default for ConsensusEngine {
    fn default() -> Self {
        Self::new(ConsensusThresholds::default())
    }
}
