// =============================================================================
// Risk Sizer - position size and stop-loss under a fixed risk budget
// =============================================================================
//
//   risk_amount = balance * risk_percentage / 100
//   size        = risk_amount / price
//   stop_loss   = price * (1 - loss_percentage)
//
// A second gate re-checks `size * price <= risk_amount` on every sized
// decision.  It holds by construction today; a failing check downgrades the
// decision to Hold rather than letting an oversized order through.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::decision::{ConsensusDecision, HoldReason};
use crate::error::RiskError;

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

fn default_account_balance() -> f64 {
    10_000.0
}
fn default_risk_percentage() -> f64 {
    2.0
}
fn default_loss_percentage() -> f64 {
    0.05
}

/// Relative slack allowed by the risk ceiling for float rounding.
const CEILING_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskParameters {
    /// Balance used for sizing, in quote currency.
    #[serde(default = "default_account_balance")]
    pub account_balance: f64,
    /// Percent of balance risked per position (2.0 = 2 %).
    #[serde(default = "default_risk_percentage")]
    pub risk_percentage: f64,
    /// Stop-loss distance as a fraction of price (0.05 = 5 %).
    #[serde(default = "default_loss_percentage")]
    pub loss_percentage: f64,
}

impl Default for RiskParameters {
    fn default() -> Self {
        Self {
            account_balance: default_account_balance(),
            risk_percentage: default_risk_percentage(),
            loss_percentage: default_loss_percentage(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSize {
    pub risk_amount: f64,
    pub size: f64,
}

// ---------------------------------------------------------------------------
// Pure sizing functions
// ---------------------------------------------------------------------------

/// Size a position so that `size * price` equals the risk budget.
pub fn size(balance: f64, price: f64, risk_pct: f64) -> Result<PositionSize, RiskError> {
    if !(balance.is_finite() && price.is_finite()) || balance <= 0.0 || price <= 0.0 {
        return Err(RiskError::InvalidInput { balance, price });
    }
    if !risk_pct.is_finite() || risk_pct <= 0.0 || risk_pct > 100.0 {
        return Err(RiskError::InvalidRiskPercentage(risk_pct));
    }

    let risk_amount = balance * risk_pct / 100.0;
    Ok(PositionSize {
        risk_amount,
        size: risk_amount / price,
    })
}

/// Stop-loss price `loss_pct` below `price`.
pub fn stop_loss(price: f64, loss_pct: f64) -> f64 {
    price * (1.0 - loss_pct)
}

/// `true` when a position of `size` at `price` stays within the risk budget.
pub fn within_risk_ceiling(size: f64, price: f64, balance: f64, risk_pct: f64) -> bool {
    let risk_amount = balance * risk_pct / 100.0;
    let exposure = size * price;
    exposure.is_finite() && exposure <= risk_amount * (1.0 + CEILING_TOLERANCE)
}

// ---------------------------------------------------------------------------
// Risk Sizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RiskSizer {
    params: RiskParameters,
}

impl RiskSizer {
    pub fn new(params: RiskParameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> RiskParameters {
        self.params
    }

    pub fn set_params(&mut self, params: RiskParameters) {
        self.params = params;
    }

    pub fn set_balance(&mut self, balance: f64) {
        self.params.account_balance = balance;
    }

    /// Size a position at `price` with the configured balance and risk.
    pub fn assess(&self, price: f64) -> Result<PositionSize, RiskError> {
        size(self.params.account_balance, price, self.params.risk_percentage)
    }

    /// Attach size and stop-loss to an actionable decision.
    ///
    /// Holds pass through untouched.  Sizing failures and risk-ceiling
    /// violations downgrade the decision to Hold.
    pub fn apply(&self, decision: ConsensusDecision, price: f64) -> ConsensusDecision {
        if !decision.is_actionable() {
            return decision;
        }

        let position = match self.assess(price) {
            Ok(position) => position,
            Err(e) => {
                warn!(error = %e, action = %decision.action, "Risk sizing failed, holding");
                return decision.downgrade(HoldReason::InvalidRiskInput);
            }
        };

        if !within_risk_ceiling(
            position.size,
            price,
            self.params.account_balance,
            self.params.risk_percentage,
        ) {
            warn!(
                size = position.size,
                price,
                risk_amount = position.risk_amount,
                "Position exceeds risk ceiling, holding"
            );
            return decision.downgrade(HoldReason::RiskCeilingExceeded);
        }

        let stop = stop_loss(price, self.params.loss_percentage);
        debug!(
            size = position.size,
            risk_amount = position.risk_amount,
            stop_loss = stop,
            "Position sized"
        );
        decision.with_sizing(position.size, stop)
    }
}

impl Default for RiskSizer {
    fn default() -> Self {
        Self::new(RiskParameters::default())
    }
}
