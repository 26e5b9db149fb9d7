// =============================================================================
// Signals Module
// =============================================================================
//
// Signal pipeline for the consensus engine:
// - Categorical signal per indicator reading (evaluator)
// - Vote tally against configured thresholds (consensus)

pub mod categories;
pub mod consensus;
pub mod evaluator;

pub use categories::{IndicatorResult, SignalCategory, Vote};
pub use consensus::{ConsensusEngine, ConsensusThresholds};
pub use evaluator::SignalEvaluator;
