// =============================================================================
// Consensus Decision - record of every evaluated observation
// =============================================================================
//
// One decision is emitted per accepted observation, including the Holds.
// The record keeps the vote tally and the per-indicator breakdown that
// produced it, so every decision can be audited after the fact.
//
// Sizing fields are populated only for Buy/Sell.  Any downstream gate that
// turns a Buy/Sell into a Hold clears them and records why.
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::indicators::IndicatorKind;
use crate::signals::{IndicatorResult, SignalCategory};
use crate::types::Action;

/// Why a decision ended up as Hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldReason {
    /// The window is shorter than the minimum period.
    InsufficientData,
    /// Neither vote count reached its threshold.
    NoConsensus,
    /// A Buy/Sell was vetoed because ADX did not confirm a strong trend.
    WeakTrend,
    /// Balance or price unusable for sizing.
    InvalidRiskInput,
    /// The sized position would exceed the risk budget.
    RiskCeilingExceeded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusDecision {
    /// Unique identifier for this decision (UUID v4).
    pub id: Uuid,

    pub action: Action,
    pub buy_votes: u32,
    pub sell_votes: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_size: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<HoldReason>,

    /// ADX category at the time of the decision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<SignalCategory>,

    /// Timestamp (epoch ms) of the observation that triggered the decision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,

    /// Close price the decision was evaluated at.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signals: Vec<IndicatorResult>,

    pub emitted_at: DateTime<Utc>,
}

impl ConsensusDecision {
    /// A decision carrying only the outcome of a vote.
    pub fn tally(action: Action, buy_votes: u32, sell_votes: u32) -> Self {
        let reason = (action == Action::Hold).then_some(HoldReason::NoConsensus);
        Self {
            id: Uuid::new_v4(),
            action,
            buy_votes,
            sell_votes,
            position_size: None,
            stop_loss: None,
            reason,
            trend: None,
            timestamp: None,
            price: None,
            signals: Vec::new(),
            emitted_at: Utc::now(),
        }
    }

    /// A Hold with no votes cast.
    pub fn hold(reason: HoldReason) -> Self {
        let mut decision = Self::tally(Action::Hold, 0, 0);
        decision.reason = Some(reason);
        decision
    }

    /// Attach the triggering observation's timestamp and price.
    pub fn at(mut self, timestamp: i64, price: f64) -> Self {
        self.timestamp = Some(timestamp);
        self.price = Some(price);
        self
    }

    /// Attach the per-indicator breakdown and pick the trend out of it.
    pub fn with_signals(mut self, signals: Vec<IndicatorResult>) -> Self {
        self.trend = signals
            .iter()
            .find(|r| r.kind == IndicatorKind::Adx)
            .map(|r| r.signal);
        self.signals = signals;
        self
    }

    pub fn with_sizing(mut self, position_size: f64, stop_loss: f64) -> Self {
        self.position_size = Some(position_size);
        self.stop_loss = Some(stop_loss);
        self
    }

    /// Turn this decision into a Hold, keeping the vote tally.
    pub fn downgrade(mut self, reason: HoldReason) -> Self {
        self.action = Action::Hold;
        self.position_size = None;
        self.stop_loss = None;
        self.reason = Some(reason);
        self
    }

    pub fn is_actionable(&self) -> bool {
        self.action != Action::Hold
    }
}
