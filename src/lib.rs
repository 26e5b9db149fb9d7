// =============================================================================
// Consensus Engine - streaming indicators, signal consensus and risk sizing
// =============================================================================

pub mod decision;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod market_data;
pub mod risk;
pub mod runtime_config;
pub mod signals;
pub mod stream_processor;
pub mod types;

pub use decision::{ConsensusDecision, HoldReason};
pub use engine::{ChannelSink, DecisionSink, Engine};
pub use error::{ConfigError, ObservationError, RiskError};
pub use runtime_config::RuntimeConfig;
pub use stream_processor::{ProcessorState, StreamProcessor};
pub use types::{Action, InstrumentId, Observation};
