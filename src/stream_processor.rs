// =============================================================================
// Stream Processor - per-instrument evaluation state machine
// =============================================================================
//
// Runs once per accepted observation:
//
//   AwaitingData ──(window.len() >= period)──► Ready ──► Evaluating ──► Emitted
//        ▲                                                                │
//        └──────────────────── next observation ──────────────────────────┘
//
// Pipeline for a Ready window:
//   1. Compute all indicators over the window
//   2. Categorise each reading
//   3. Vote against the consensus thresholds
//   4. Optional ADX trend gate
//   5. Size the position (Buy/Sell only)
//
// A window below the minimum period emits Hold(InsufficientData).  A
// malformed observation is rejected before it touches the window.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::decision::{ConsensusDecision, HoldReason};
use crate::error::ObservationError;
use crate::indicators::{self, IndicatorParams};
use crate::market_data::RollingWindow;
use crate::risk::RiskSizer;
use crate::runtime_config::RuntimeConfig;
use crate::signals::{ConsensusEngine, SignalCategory, SignalEvaluator};
use crate::types::{Action, InstrumentId, Observation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessorState {
    AwaitingData,
    Ready,
    Evaluating,
    Emitted,
}

impl std::fmt::Display for ProcessorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AwaitingData => write!(f, "AwaitingData"),
            Self::Ready => write!(f, "Ready"),
            Self::Evaluating => write!(f, "Evaluating"),
            Self::Emitted => write!(f, "Emitted"),
        }
    }
}

pub struct StreamProcessor {
    instrument: InstrumentId,
    window: RollingWindow,
    params: IndicatorParams,
    consensus: ConsensusEngine,
    risk: RiskSizer,
    require_strong_trend: bool,
    state: ProcessorState,
}

impl StreamProcessor {
    pub fn new(instrument: impl Into<InstrumentId>, config: &RuntimeConfig) -> Self {
        Self {
            instrument: instrument.into(),
            window: RollingWindow::new(config.capacity),
            params: config.indicator_params(),
            consensus: ConsensusEngine::new(config.consensus),
            risk: RiskSizer::new(config.risk),
            require_strong_trend: config.require_strong_trend,
            state: ProcessorState::AwaitingData,
        }
    }

    /// Apply a new configuration.  A smaller capacity evicts the oldest
    /// observations immediately.
    pub fn reconfigure(&mut self, config: &RuntimeConfig) {
        let evicted = self.window.set_capacity(config.capacity);
        self.params = config.indicator_params();
        self.consensus.set_thresholds(config.consensus);
        self.risk.set_params(config.risk);
        self.require_strong_trend = config.require_strong_trend;
        self.state = self.resting_state();
        debug!(
            instrument = %self.instrument,
            capacity = config.capacity,
            period = config.period,
            evicted,
            "processor reconfigured"
        );
    }

    pub fn set_balance(&mut self, balance: f64) {
        self.risk.set_balance(balance);
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn state(&self) -> ProcessorState {
        self.state
    }

    pub fn window(&self) -> &RollingWindow {
        &self.window
    }

    /// Window length at which evaluation starts.
    pub fn minimum_period(&self) -> usize {
        self.params.period
    }

    pub fn is_ready(&self) -> bool {
        self.window.is_ready(self.minimum_period())
    }

    /// Validate `obs` and append it to the window without evaluating.
    ///
    /// On error the window is left unchanged.
    pub fn accept(&mut self, obs: Observation) -> Result<(), ObservationError> {
        obs.validate()?;
        if let Some(latest) = self.window.latest() {
            if obs.timestamp < latest.timestamp {
                return Err(ObservationError::TimestampRegression {
                    previous: latest.timestamp,
                    received: obs.timestamp,
                });
            }
        }

        if let Some(evicted) = self.window.append(obs) {
            trace!(
                instrument = %self.instrument,
                evicted_ts = evicted.timestamp,
                "observation evicted"
            );
        }
        self.state = self.resting_state();
        Ok(())
    }

    /// Accept `obs` and emit a decision for the updated window.
    pub fn push(&mut self, obs: Observation) -> Result<ConsensusDecision, ObservationError> {
        if let Err(e) = self.accept(obs) {
            warn!(
                instrument = %self.instrument,
                timestamp = obs.timestamp,
                error = %e,
                "dropping malformed observation"
            );
            return Err(e);
        }
        Ok(self.evaluate())
    }

    /// Run the pipeline over the current window.
    pub fn evaluate(&mut self) -> ConsensusDecision {
        let Some(&latest) = self.window.latest() else {
            self.state = ProcessorState::AwaitingData;
            return ConsensusDecision::hold(HoldReason::InsufficientData);
        };

        if !self.is_ready() {
            self.state = ProcessorState::AwaitingData;
            debug!(
                instrument = %self.instrument,
                len = self.window.len(),
                needed = self.minimum_period(),
                "awaiting data"
            );
            return ConsensusDecision::hold(HoldReason::InsufficientData).at(latest.timestamp, latest.close);
        }

        self.state = ProcessorState::Ready;
        trace!(instrument = %self.instrument, state = %self.state, "window ready");
        self.state = ProcessorState::Evaluating;

        let price = latest.close;

        // ── 1. Indicators ────────────────────────────────────────────────
        let outputs = indicators::compute_all(self.window.as_slice(), &self.params);

        // ── 2. Signals ───────────────────────────────────────────────────
        let results = SignalEvaluator::evaluate_all(&outputs, price, &self.params);

        // ── 3. Vote ──────────────────────────────────────────────────────
        let mut decision = self
            .consensus
            .vote_results(&results)
            .at(latest.timestamp, price)
            .with_signals(results);

        // ── 4. Trend gate ────────────────────────────────────────────────
        if self.require_strong_trend
            && decision.is_actionable()
            && decision.trend != Some(SignalCategory::StrongTrend)
        {
            debug!(
                instrument = %self.instrument,
                action = %decision.action,
                trend = ?decision.trend,
                "no strong trend, holding"
            );
            decision = decision.downgrade(HoldReason::WeakTrend);
        }

        // ── 5. Risk ──────────────────────────────────────────────────────
        let decision = self.risk.apply(decision, price);

        self.state = ProcessorState::Emitted;
        match decision.action {
            Action::Hold => debug!(
                instrument = %self.instrument,
                buy_votes = decision.buy_votes,
                sell_votes = decision.sell_votes,
                reason = ?decision.reason,
                "HOLD"
            ),
            action => info!(
                instrument = %self.instrument,
                %action,
                price,
                buy_votes = decision.buy_votes,
                sell_votes = decision.sell_votes,
                size = decision.position_size,
                stop_loss = decision.stop_loss,
                "decision emitted"
            ),
        }

        decision
    }

    fn resting_state(&self) -> ProcessorState {
        if self.is_ready() {
            ProcessorState::Ready
        } else {
            ProcessorState::AwaitingData
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::IndicatorKind;
    use crate::signals::ConsensusThresholds;

    /// Closes 100..=119, one minute apart, with a +/-0.5 range.
    fn rising_series() -> Vec<Observation> {
        (0..20)
            .map(|i| {
                let c = 100.0 + i as f64;
                Observation::new(i * 60_000, c, c + 0.5, c - 0.5, 10.0)
            })
            .collect()
    }

    fn config_with(buy: u32, sell: u32) -> RuntimeConfig {
        RuntimeConfig {
            consensus: ConsensusThresholds {
                buy_threshold: buy,
                sell_threshold: sell,
            },
            ..RuntimeConfig::default()
        }
    }

    fn run(config: &RuntimeConfig) -> (StreamProcessor, Vec<ConsensusDecision>) {
        let mut p = StreamProcessor::new("BTC-USD", config);
        let decisions = rising_series()
            .into_iter()
            .map(|o| p.push(o).unwrap())
            .collect();
        (p, decisions)
    }

    fn signal_of(d: &ConsensusDecision, kind: IndicatorKind) -> SignalCategory {
        d.signals
            .iter()
            .find(|r| r.kind == kind)
            .map(|r| r.signal)
            .unwrap()
    }

    #[test]
    fn holds_until_minimum_period() {
        let (_, decisions) = run(&RuntimeConfig::default());
        for d in &decisions[..13] {
            assert_eq!(d.action, Action::Hold);
            assert_eq!(d.reason, Some(HoldReason::InsufficientData));
            assert!(d.signals.is_empty());
        }
        assert!(!decisions[13].signals.is_empty());
    }

    #[test]
    fn rising_series_signals() {
        let (p, decisions) = run(&RuntimeConfig::default());
        assert_eq!(p.state(), ProcessorState::Emitted);
        let last = decisions.last().unwrap();

        assert_eq!(signal_of(last, IndicatorKind::Rsi), SignalCategory::Overbought);
        assert_eq!(signal_of(last, IndicatorKind::Macd), SignalCategory::NoData);
        assert_eq!(signal_of(last, IndicatorKind::Sma), SignalCategory::Bullish);
        assert_eq!(signal_of(last, IndicatorKind::Bollinger), SignalCategory::Neutral);
        assert_eq!(signal_of(last, IndicatorKind::Adx), SignalCategory::NoData);
        assert_eq!(signal_of(last, IndicatorKind::Stochastic), SignalCategory::Overbought);
        assert_eq!((last.buy_votes, last.sell_votes), (1, 2));
        assert_eq!(last.price, Some(119.0));
        assert_eq!(last.timestamp, Some(19 * 60_000));
    }

    #[test]
    fn rising_series_decision_depends_on_thresholds() {
        let (_, d) = run(&config_with(3, 3));
        let last = d.last().unwrap();
        assert_eq!(last.action, Action::Hold);
        assert_eq!(last.reason, Some(HoldReason::NoConsensus));

        let (_, d) = run(&config_with(2, 2));
        let last = d.last().unwrap();
        assert_eq!(last.action, Action::Sell);
        let size = last.position_size.unwrap();
        assert!((size - 200.0 / 119.0).abs() < 1e-10);
        assert!((last.stop_loss.unwrap() - 119.0 * 0.95).abs() < 1e-10);

        let (_, d) = run(&config_with(1, 1));
        assert_eq!(d.last().unwrap().action, Action::Buy);
    }

    #[test]
    fn strong_trend_gate_downgrades_without_adx() {
        let mut config = config_with(2, 2);
        config.require_strong_trend = true;
        let (_, d) = run(&config);
        let last = d.last().unwrap();
        assert_eq!(last.action, Action::Hold);
        assert_eq!(last.reason, Some(HoldReason::WeakTrend));
        assert!(last.position_size.is_none());
    }

    #[test]
    fn strong_trend_gate_passes_in_trend() {
        let mut config = config_with(2, 2);
        config.require_strong_trend = true;
        let mut p = StreamProcessor::new("BTC-USD", &config);
        let mut last = None;
        for i in 0..40 {
            let c = 100.0 + i as f64;
            last = Some(p.push(Observation::new(i, c, c + 0.5, c - 0.5, 1.0)).unwrap());
        }
        let last = last.unwrap();
        assert_eq!(last.trend, Some(SignalCategory::StrongTrend));
        assert_ne!(last.reason, Some(HoldReason::WeakTrend));
    }

    #[test]
    fn malformed_observation_leaves_window_unchanged() {
        let mut p = StreamProcessor::new("ETH-USD", &RuntimeConfig::default());
        p.push(Observation::new(1, 10.0, 11.0, 9.0, 1.0)).unwrap();

        let err = p.push(Observation::new(2, f64::NAN, 11.0, 9.0, 1.0)).unwrap_err();
        assert!(matches!(err, ObservationError::NonFinite { field: "close" }));
        assert!(p.push(Observation::new(3, -1.0, 11.0, 9.0, 1.0)).is_err());
        assert_eq!(p.window().len(), 1);
    }

    #[test]
    fn timestamp_regression_rejected() {
        let mut p = StreamProcessor::new("ETH-USD", &RuntimeConfig::default());
        p.push(Observation::new(100, 10.0, 11.0, 9.0, 1.0)).unwrap();
        // Equal timestamps are accepted.
        p.push(Observation::new(100, 10.5, 11.0, 9.0, 1.0)).unwrap();
        let err = p.push(Observation::new(99, 10.0, 11.0, 9.0, 1.0)).unwrap_err();
        assert_eq!(
            err,
            ObservationError::TimestampRegression {
                previous: 100,
                received: 99
            }
        );
        assert_eq!(p.window().len(), 2);
    }

    #[test]
    fn state_transitions() {
        let mut p = StreamProcessor::new("SOL-USD", &RuntimeConfig::default());
        assert_eq!(p.state(), ProcessorState::AwaitingData);
        let series = rising_series();
        for o in &series[..13] {
            p.push(*o).unwrap();
            assert_eq!(p.state(), ProcessorState::AwaitingData);
        }
        p.accept(series[13]).unwrap();
        assert_eq!(p.state(), ProcessorState::Ready);
        p.evaluate();
        assert_eq!(p.state(), ProcessorState::Emitted);
    }

    #[test]
    fn capacity_bounds_window() {
        let config = RuntimeConfig {
            capacity: 15,
            ..RuntimeConfig::default()
        };
        let (p, _) = run(&config);
        assert_eq!(p.window().len(), 15);
        assert_eq!(p.window().as_slice()[0].timestamp, 5 * 60_000);
    }

    #[test]
    fn reconfigure_shrinks_window_and_applies_thresholds() {
        let (mut p, _) = run(&RuntimeConfig::default());
        let mut config = config_with(2, 2);
        config.capacity = 16;
        p.reconfigure(&config);
        assert_eq!(p.window().len(), 16);
        assert_eq!(p.evaluate().action, Action::Sell);
    }

    #[test]
    fn invalid_balance_forces_hold() {
        let (mut p, _) = run(&config_with(2, 2));
        p.set_balance(0.0);
        let d = p.evaluate();
        assert_eq!(d.action, Action::Hold);
        assert_eq!(d.reason, Some(HoldReason::InvalidRiskInput));
    }
}
