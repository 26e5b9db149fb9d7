// =============================================================================
// Engine - multi-instrument registry of stream processors
// =============================================================================
//
// One StreamProcessor per subscribed instrument.  Instruments are independent
// and may be driven from different tasks concurrently; within an instrument
// every push is serialised by that processor's mutex, so the window is never
// mutated during an in-flight evaluation.
//
// Thread safety:
//   - parking_lot::RwLock over the instrument map (read-mostly).
//   - parking_lot::RwLock over the config, write-held across every update.
//   - parking_lot::Mutex per processor (single writer per instrument).
//   - Atomic counters for lock-free stats.
//
// Decisions are handed to a `DecisionSink` while the processor lock is held,
// which keeps per-instrument delivery in arrival order.  Sinks must not call
// back into the engine for the same instrument.
// =============================================================================

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::decision::ConsensusDecision;
use crate::error::{ConfigError, ObservationError};
use crate::market_data::WindowSnapshot;
use crate::runtime_config::RuntimeConfig;
use crate::stream_processor::StreamProcessor;
use crate::types::{InstrumentId, Observation};

// =============================================================================
// Outbound sinks
// =============================================================================

/// Consumer of emitted decisions (execution, alerting, narration).
pub trait DecisionSink: Send + Sync {
    fn on_decision(&self, instrument: &str, decision: &ConsensusDecision);
}

/// Forwards decisions into a tokio channel for an async consumer.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<(InstrumentId, ConsensusDecision)>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<(InstrumentId, ConsensusDecision)>) -> Self {
        Self { tx }
    }
}

impl DecisionSink for ChannelSink {
    fn on_decision(&self, instrument: &str, decision: &ConsensusDecision) {
        if self.tx.send((instrument.to_string(), decision.clone())).is_err() {
            warn!(instrument, "decision receiver dropped");
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

pub struct Engine {
    config: RwLock<RuntimeConfig>,
    processors: RwLock<HashMap<InstrumentId, Arc<Mutex<StreamProcessor>>>>,
    sink: Arc<dyn DecisionSink>,

    decisions_emitted: AtomicU64,
    observations_dropped: AtomicU64,
}

impl Engine {
    /// Build an engine with a validated configuration.
    pub fn new(config: RuntimeConfig, sink: Arc<dyn DecisionSink>) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            period = config.period,
            capacity = config.capacity,
            buy_threshold = config.consensus.buy_threshold,
            sell_threshold = config.consensus.sell_threshold,
            "engine initialised"
        );
        Ok(Self {
            config: RwLock::new(config),
            processors: RwLock::new(HashMap::new()),
            sink,
            decisions_emitted: AtomicU64::new(0),
            observations_dropped: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> RuntimeConfig {
        self.config.read().clone()
    }

    // ── Configuration ───────────────────────────────────────────────────

    /// Update the core options and apply them to every processor.
    ///
    /// The previous configuration stays in force if validation fails.
    pub fn configure(
        &self,
        period: usize,
        capacity: usize,
        buy_threshold: u32,
        sell_threshold: u32,
        risk_percentage: f64,
        loss_percentage: f64,
    ) -> Result<(), ConfigError> {
        let mut current = self.config.write();
        let mut next = current.clone();
        next.period = period;
        next.capacity = capacity;
        next.consensus.buy_threshold = buy_threshold;
        next.consensus.sell_threshold = sell_threshold;
        next.risk.risk_percentage = risk_percentage;
        next.risk.loss_percentage = loss_percentage;
        self.install(&mut current, next)
    }

    /// Validate `next`, push it to every processor, then make it current.
    /// The caller holds the config write lock throughout.
    fn install(&self, current: &mut RuntimeConfig, next: RuntimeConfig) -> Result<(), ConfigError> {
        next.validate()?;
        let processors = self.processors.read();
        for processor in processors.values() {
            processor.lock().reconfigure(&next);
        }
        info!(
            period = next.period,
            capacity = next.capacity,
            instruments = processors.len(),
            "configuration applied"
        );
        *current = next;
        Ok(())
    }

    /// Replace the account balance used for sizing on every instrument.
    pub fn update_balance(&self, balance: f64) -> Result<(), ConfigError> {
        if !balance.is_finite() || balance <= 0.0 {
            return Err(ConfigError::AccountBalance(balance));
        }
        let mut config = self.config.write();
        config.risk.account_balance = balance;
        for processor in self.processors.read().values() {
            processor.lock().set_balance(balance);
        }
        info!(balance, "account balance updated");
        Ok(())
    }

    // ── Instruments ─────────────────────────────────────────────────────

    /// Processor for `instrument`, created on first use.
    pub fn subscribe(&self, instrument: &str) -> Arc<Mutex<StreamProcessor>> {
        if let Some(p) = self.processors.read().get(instrument) {
            return Arc::clone(p);
        }
        // Lock order is config, then processors.
        let config = self.config.read();
        let mut processors = self.processors.write();
        let processor = processors.entry(instrument.to_string()).or_insert_with(|| {
            info!(instrument, "instrument subscribed");
            Arc::new(Mutex::new(StreamProcessor::new(instrument, &config)))
        });
        Arc::clone(processor)
    }

    pub fn unsubscribe(&self, instrument: &str) -> bool {
        let removed = self.processors.write().remove(instrument).is_some();
        if removed {
            info!(instrument, "instrument unsubscribed");
        }
        removed
    }

    pub fn instruments(&self) -> Vec<InstrumentId> {
        let mut ids: Vec<InstrumentId> = self.processors.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    // ── Ingestion ───────────────────────────────────────────────────────

    /// Feed one observation and emit the resulting decision.
    pub fn push_observation(
        &self,
        instrument: &str,
        obs: Observation,
    ) -> Result<ConsensusDecision, ObservationError> {
        let processor = self.subscribe(instrument);
        let mut processor = processor.lock();
        match processor.push(obs) {
            Ok(decision) => {
                self.sink.on_decision(instrument, &decision);
                self.decisions_emitted.fetch_add(1, Ordering::Relaxed);
                Ok(decision)
            }
            Err(e) => {
                self.observations_dropped.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    /// Feed several observations in order.  Malformed ones are dropped
    /// individually; a decision is returned for each accepted one.
    pub fn push_batch(
        &self,
        instrument: &str,
        observations: impl IntoIterator<Item = Observation>,
    ) -> Vec<ConsensusDecision> {
        let processor = self.subscribe(instrument);
        let mut processor = processor.lock();
        let mut decisions = Vec::new();
        for obs in observations {
            match processor.push(obs) {
                Ok(decision) => {
                    self.sink.on_decision(instrument, &decision);
                    self.decisions_emitted.fetch_add(1, Ordering::Relaxed);
                    decisions.push(decision);
                }
                Err(_) => {
                    self.observations_dropped.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        decisions
    }

    /// Seed a window with historical observations without emitting
    /// decisions.  Returns how many were accepted.
    pub fn backfill(&self, instrument: &str, observations: impl IntoIterator<Item = Observation>) -> usize {
        let processor = self.subscribe(instrument);
        let mut processor = processor.lock();
        let mut accepted = 0;
        let mut rejected = 0;
        for obs in observations {
            match processor.accept(obs) {
                Ok(()) => accepted += 1,
                Err(e) => {
                    rejected += 1;
                    debug!(instrument, error = %e, "backfill observation rejected");
                }
            }
        }
        if rejected > 0 {
            warn!(instrument, accepted, rejected, "backfill dropped observations");
            self.observations_dropped.fetch_add(rejected, Ordering::Relaxed);
        }
        info!(instrument, accepted, window = processor.window().len(), "backfill complete");
        accepted
    }

    // ── Persistence ─────────────────────────────────────────────────────

    /// Copy every window's contents.
    pub fn snapshot(&self) -> WindowSnapshot {
        let windows: BTreeMap<InstrumentId, Vec<Observation>> = self
            .processors
            .read()
            .iter()
            .map(|(id, p)| (id.clone(), p.lock().window().to_vec()))
            .collect();
        WindowSnapshot::new(windows)
    }

    /// Backfill every instrument in `snapshot`.  Returns the number of
    /// observations restored.
    pub fn restore(&self, snapshot: &WindowSnapshot) -> usize {
        let restored: usize = snapshot
            .windows
            .iter()
            .map(|(id, observations)| self.backfill(id, observations.iter().copied()))
            .sum();
        info!(
            instruments = snapshot.windows.len(),
            observations = restored,
            taken_at = %snapshot.taken_at,
            "windows restored"
        );
        restored
    }

    // ── Stats ───────────────────────────────────────────────────────────

    pub fn decisions_emitted(&self) -> u64 {
        self.decisions_emitted.load(Ordering::Relaxed)
    }

    pub fn observations_dropped(&self) -> u64 {
        self.observations_dropped.load(Ordering::Relaxed)
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::HoldReason;
    use crate::types::Action;

    #[derive(Default)]
    struct RecordingSink {
        seen: Mutex<Vec<(String, ConsensusDecision)>>,
    }

    impl DecisionSink for RecordingSink {
        fn on_decision(&self, instrument: &str, decision: &ConsensusDecision) {
            self.seen.lock().push((instrument.to_string(), decision.clone()));
        }
    }

    fn bar(i: i64) -> Observation {
        let c = 100.0 + i as f64;
        Observation::new(i * 60_000, c, c + 0.5, c - 0.5, 1.0)
    }

    fn engine() -> (Engine, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let engine = Engine::new(RuntimeConfig::default(), sink.clone()).unwrap();
        (engine, sink)
    }

    #[test]
    fn new_rejects_invalid_config() {
        let config = RuntimeConfig {
            period: 1,
            ..RuntimeConfig::default()
        };
        assert!(Engine::new(config, Arc::new(RecordingSink::default())).is_err());
    }

    #[test]
    fn push_emits_to_sink() {
        let (engine, sink) = engine();
        let d = engine.push_observation("BTC-USD", bar(0)).unwrap();
        assert_eq!(d.reason, Some(HoldReason::InsufficientData));
        let seen = sink.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "BTC-USD");
        assert_eq!(seen[0].1.id, d.id);
        assert_eq!(engine.decisions_emitted(), 1);
    }

    #[test]
    fn malformed_observation_is_not_emitted() {
        let (engine, sink) = engine();
        let bad = Observation::new(0, 0.0, 1.0, 1.0, 1.0);
        assert!(engine.push_observation("BTC-USD", bad).is_err());
        assert!(sink.seen.lock().is_empty());
        assert_eq!(engine.observations_dropped(), 1);
    }

    #[test]
    fn instruments_are_independent() {
        let (engine, _) = engine();
        for i in 0..20 {
            engine.push_observation("BTC-USD", bar(i)).unwrap();
        }
        engine.push_observation("ETH-USD", bar(0)).unwrap();
        assert_eq!(engine.instruments(), vec!["BTC-USD".to_string(), "ETH-USD".to_string()]);
        assert_eq!(engine.subscribe("BTC-USD").lock().window().len(), 20);
        assert_eq!(engine.subscribe("ETH-USD").lock().window().len(), 1);
    }

    #[test]
    fn unsubscribe_drops_window() {
        let (engine, _) = engine();
        engine.backfill("BTC-USD", (0..5).map(bar));
        assert!(engine.unsubscribe("BTC-USD"));
        assert!(!engine.unsubscribe("BTC-USD"));
        assert!(engine.instruments().is_empty());
        assert!(engine.subscribe("BTC-USD").lock().window().is_empty());
    }

    #[test]
    fn batch_skips_malformed_entries() {
        let (engine, sink) = engine();
        let batch = vec![bar(0), Observation::new(1, f64::INFINITY, 1.0, 1.0, 1.0), bar(2)];
        let decisions = engine.push_batch("SOL-USD", batch);
        assert_eq!(decisions.len(), 2);
        assert_eq!(sink.seen.lock().len(), 2);
        assert_eq!(engine.observations_dropped(), 1);
    }

    #[test]
    fn backfill_is_silent() {
        let (engine, sink) = engine();
        let accepted = engine.backfill("BTC-USD", (0..19).map(bar));
        assert_eq!(accepted, 19);
        assert!(sink.seen.lock().is_empty());

        let d = engine.push_observation("BTC-USD", bar(19)).unwrap();
        assert_eq!((d.buy_votes, d.sell_votes), (1, 2));
    }

    #[test]
    fn configure_applies_to_existing_processors() {
        let (engine, _) = engine();
        engine.backfill("BTC-USD", (0..40).map(bar));
        engine.backfill("ETH-USD", (0..19).map(bar));
        engine.configure(14, 30, 2, 2, 2.0, 0.05).unwrap();
        assert_eq!(engine.subscribe("BTC-USD").lock().window().len(), 30);
        assert_eq!(engine.config().capacity, 30);

        let d = engine.push_observation("ETH-USD", bar(19)).unwrap();
        assert_eq!(d.action, Action::Sell);
    }

    #[test]
    fn configure_rejects_capacity_below_lookback() {
        let (engine, _) = engine();
        assert!(matches!(
            engine.configure(14, 16, 2, 2, 2.0, 0.05),
            Err(ConfigError::CapacityBelowLookback { .. })
        ));
        assert_eq!(engine.config().capacity, 100);
    }

    #[test]
    fn balance_update_survives_concurrent_configure() {
        let (engine, _) = engine();
        let engine = Arc::new(engine);
        engine.backfill("BTC-USD", (0..19).map(bar));

        let reconfigure = {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || {
                for _ in 0..200 {
                    engine.configure(14, 100, 2, 2, 2.0, 0.05).unwrap();
                }
            })
        };
        let rebalance = {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || {
                for _ in 0..50 {
                    engine.update_balance(20_000.0).unwrap();
                    std::thread::yield_now();
                }
            })
        };
        reconfigure.join().unwrap();
        rebalance.join().unwrap();

        assert!((engine.config().risk.account_balance - 20_000.0).abs() < 1e-10);
        let d = engine.push_observation("BTC-USD", bar(19)).unwrap();
        assert!((d.position_size.unwrap() - 400.0 / 119.0).abs() < 1e-10);
    }

    #[test]
    fn configure_rejects_and_keeps_previous() {
        let (engine, _) = engine();
        assert!(matches!(
            engine.configure(14, 10, 3, 3, 2.0, 0.05),
            Err(ConfigError::CapacityBelowPeriod { .. })
        ));
        assert_eq!(engine.config().capacity, 100);
    }

    #[test]
    fn update_balance_changes_sizing() {
        let (engine, _) = engine();
        engine.configure(14, 100, 2, 2, 2.0, 0.05).unwrap();
        engine.backfill("BTC-USD", (0..19).map(bar));
        engine.update_balance(20_000.0).unwrap();
        let d = engine.push_observation("BTC-USD", bar(19)).unwrap();
        assert!((d.position_size.unwrap() - 400.0 / 119.0).abs() < 1e-10);
        assert!(engine.update_balance(0.0).is_err());
    }

    #[test]
    fn snapshot_then_restore() {
        let (engine, _) = engine();
        engine.backfill("BTC-USD", (0..5).map(bar));
        engine.backfill("ETH-USD", (10..12).map(bar));
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.observation_count(), 7);

        let (fresh, sink) = self::engine();
        assert_eq!(fresh.restore(&snapshot), 7);
        assert!(sink.seen.lock().is_empty());
        let ts: Vec<i64> = fresh
            .subscribe("ETH-USD")
            .lock()
            .window()
            .iter()
            .map(|o| o.timestamp)
            .collect();
        assert_eq!(ts, vec![10 * 60_000, 11 * 60_000]);
    }

    #[test]
    fn channel_sink_forwards() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let engine = Engine::new(RuntimeConfig::default(), Arc::new(ChannelSink::new(tx))).unwrap();
        engine.push_observation("BTC-USD", bar(0)).unwrap();
        let (instrument, decision) = rx.try_recv().unwrap();
        assert_eq!(instrument, "BTC-USD");
        assert_eq!(decision.action, Action::Hold);
    }

    #[test]
    fn concurrent_pushes_on_one_instrument_are_serialised() {
        let (engine, sink) = engine();
        let engine = Arc::new(engine);
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        // Same timestamp for everyone so ordering never rejects.
                        let obs = Observation::new(0, 100.0 + t as f64, 101.0, 99.0, 1.0);
                        let _ = engine.push_observation("BTC-USD", obs);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(engine.subscribe("BTC-USD").lock().window().len(), 100);
        assert_eq!(sink.seen.lock().len(), 100);
    }
}
