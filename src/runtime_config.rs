// =============================================================================
// Runtime Configuration - engine settings with atomic save
// =============================================================================
//
// Central configuration hub for the consensus engine.  Every tunable
// parameter lives here and is passed explicitly into the processors; there
// is no process-wide implicit state.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash.  All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.
//
// =============================================================================

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ConfigError;
use crate::indicators::{IndicatorKind, IndicatorParams, VolatilityMethod};
use crate::risk::RiskParameters;
use crate::signals::ConsensusThresholds;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_period() -> usize {
    14
}

fn default_capacity() -> usize {
    100
}

fn default_macd_short() -> usize {
    12
}

fn default_macd_long() -> usize {
    26
}

fn default_macd_signal() -> usize {
    9
}

fn default_bollinger_k() -> f64 {
    2.0
}

fn default_stochastic_smooth_d() -> usize {
    3
}

// =============================================================================
// IndicatorSettings
// =============================================================================

/// Indicator parameters other than the shared lookback `period`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSettings {
    #[serde(default = "default_macd_short")]
    pub macd_short: usize,

    #[serde(default = "default_macd_long")]
    pub macd_long: usize,

    #[serde(default = "default_macd_signal")]
    pub macd_signal: usize,

    /// Bollinger band width in standard deviations.
    #[serde(default = "default_bollinger_k")]
    pub bollinger_k: f64,

    /// Number of %K values averaged into %D.
    #[serde(default = "default_stochastic_smooth_d")]
    pub stochastic_smooth_d: usize,

    #[serde(default)]
    pub volatility_method: VolatilityMethod,

    /// Fixed High/Low volatility cut.  `None` uses the median of the
    /// in-window volatility series.
    #[serde(default)]
    pub volatility_threshold: Option<f64>,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            macd_short: default_macd_short(),
            macd_long: default_macd_long(),
            macd_signal: default_macd_signal(),
            bollinger_k: default_bollinger_k(),
            stochastic_smooth_d: default_stochastic_smooth_d(),
            volatility_method: VolatilityMethod::default(),
            volatility_threshold: None,
        }
    }
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level runtime configuration.
///
/// Every field has a serde default so that older JSON files missing new fields
/// will still deserialise correctly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Indicator lookback and the minimum window length before evaluation.
    #[serde(default = "default_period")]
    pub period: usize,

    /// Maximum observations retained per instrument.
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    #[serde(default)]
    pub consensus: ConsensusThresholds,

    #[serde(default)]
    pub risk: RiskParameters,

    #[serde(default)]
    pub indicators: IndicatorSettings,

    /// Downgrade Buy/Sell to Hold unless ADX reports a strong trend.
    #[serde(default)]
    pub require_strong_trend: bool,

    /// Where the host persists rolling windows across restarts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_path: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            period: default_period(),
            capacity: default_capacity(),
            consensus: ConsensusThresholds::default(),
            risk: RiskParameters::default(),
            indicators: IndicatorSettings::default(),
            require_strong_trend: false,
            snapshot_path: None,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            period = config.period,
            capacity = config.capacity,
            buy_threshold = config.consensus.buy_threshold,
            sell_threshold = config.consensus.sell_threshold,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }

    /// Override selected fields from `CONSENSUS_*` environment variables.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = env_override("CONSENSUS_PERIOD") {
            self.period = v;
        }
        if let Some(v) = env_override("CONSENSUS_CAPACITY") {
            self.capacity = v;
        }
        if let Some(v) = env_override("CONSENSUS_BUY_THRESHOLD") {
            self.consensus.buy_threshold = v;
        }
        if let Some(v) = env_override("CONSENSUS_SELL_THRESHOLD") {
            self.consensus.sell_threshold = v;
        }
        if let Some(v) = env_override("CONSENSUS_RISK_PERCENTAGE") {
            self.risk.risk_percentage = v;
        }
        if let Some(v) = env_override("CONSENSUS_LOSS_PERCENTAGE") {
            self.risk.loss_percentage = v;
        }
        if let Some(v) = env_override("CONSENSUS_ACCOUNT_BALANCE") {
            self.risk.account_balance = v;
        }
    }

    /// Reject configurations the processors cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period < 2 {
            return Err(ConfigError::PeriodTooShort(self.period));
        }
        if self.capacity < self.period {
            return Err(ConfigError::CapacityBelowPeriod {
                capacity: self.capacity,
                period: self.period,
            });
        }
        if self.consensus.buy_threshold == 0 {
            return Err(ConfigError::ZeroThreshold { name: "buy" });
        }
        if self.consensus.sell_threshold == 0 {
            return Err(ConfigError::ZeroThreshold { name: "sell" });
        }

        let ind = &self.indicators;
        if ind.macd_short == 0 || ind.macd_signal == 0 || ind.macd_short >= ind.macd_long {
            return Err(ConfigError::MacdSpans {
                short: ind.macd_short,
                long: ind.macd_long,
                signal: ind.macd_signal,
            });
        }
        if !ind.bollinger_k.is_finite() || ind.bollinger_k < 0.0 {
            return Err(ConfigError::BollingerK(ind.bollinger_k));
        }
        if ind.stochastic_smooth_d == 0 {
            return Err(ConfigError::StochasticSmoothing);
        }

        let params = self.indicator_params();
        let starved = IndicatorKind::ALL
            .iter()
            .map(|kind| (*kind, kind.lookback(&params)))
            .max_by_key(|&(_, lookback)| lookback);
        if let Some((indicator, lookback)) = starved {
            if self.capacity < lookback {
                return Err(ConfigError::CapacityBelowLookback {
                    capacity: self.capacity,
                    indicator,
                    lookback,
                });
            }
        }

        let risk = &self.risk;
        if !risk.risk_percentage.is_finite() || risk.risk_percentage <= 0.0 || risk.risk_percentage > 100.0 {
            return Err(ConfigError::RiskPercentage(risk.risk_percentage));
        }
        if !risk.loss_percentage.is_finite() || risk.loss_percentage <= 0.0 || risk.loss_percentage >= 1.0 {
            return Err(ConfigError::LossPercentage(risk.loss_percentage));
        }
        if !risk.account_balance.is_finite() || risk.account_balance <= 0.0 {
            return Err(ConfigError::AccountBalance(risk.account_balance));
        }

        Ok(())
    }

    /// Full parameter set for one indicator pass.
    pub fn indicator_params(&self) -> IndicatorParams {
        let ind = &self.indicators;
        IndicatorParams {
            period: self.period,
            macd_short: ind.macd_short,
            macd_long: ind.macd_long,
            macd_signal: ind.macd_signal,
            bollinger_k: ind.bollinger_k,
            stochastic_smooth_d: ind.stochastic_smooth_d,
            volatility_method: ind.volatility_method,
            volatility_threshold: ind.volatility_threshold,
        }
    }
}

fn env_override<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(v) => {
            info!(var = name, value = %raw, "config override from environment");
            Some(v)
        }
        Err(_) => {
            warn!(var = name, value = %raw, "ignoring unparseable config override");
            None
        }
    }
}
