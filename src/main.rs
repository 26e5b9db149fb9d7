// =============================================================================
// Consensus Engine - Main Entry Point
// =============================================================================
//
// Reads JSON lines from stdin and writes one JSON line per decision to
// stdout.  Logs go to stderr so stdout carries decisions only.
//
// Inbound line shapes:
//   {"instrument":"BTC-USD","timestamp":1700000000000,"close":..,"high":..,"low":..,"volume":..}
//   {"instrument":"BTC-USD","observations":[{..}, {..}]}
//   {"instrument":"BTC-USD","backfill":[{..}, {..}]}
//   {"balance":12500.0}
// =============================================================================

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use consensus_engine::market_data::WindowSnapshot;
use consensus_engine::{ChannelSink, ConsensusDecision, Engine, Observation, RuntimeConfig};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InboundMessage {
    Batch {
        instrument: String,
        observations: Vec<Observation>,
    },
    Backfill {
        instrument: String,
        backfill: Vec<Observation>,
    },
    Single {
        instrument: String,
        #[serde(flatten)]
        observation: Observation,
    },
    Balance {
        balance: f64,
    },
}

#[derive(Serialize)]
struct OutboundEvent<'a> {
    instrument: &'a str,
    #[serde(flatten)]
    decision: &'a ConsensusDecision,
}

fn parse_line(line: &str) -> anyhow::Result<InboundMessage> {
    serde_json::from_str(line).with_context(|| format!("unrecognised input line: {line}"))
}

fn handle_message(engine: &Engine, message: InboundMessage) {
    match message {
        InboundMessage::Single {
            instrument,
            observation,
        } => {
            if let Err(e) = engine.push_observation(&instrument, observation) {
                debug!(instrument = %instrument, error = %e, "observation dropped");
            }
        }
        InboundMessage::Batch {
            instrument,
            observations,
        } => {
            let received = observations.len();
            let decisions = engine.push_batch(&instrument, observations);
            debug!(instrument = %instrument, received, accepted = decisions.len(), "batch processed");
        }
        InboundMessage::Backfill {
            instrument,
            backfill,
        } => {
            engine.backfill(&instrument, backfill);
        }
        InboundMessage::Balance { balance } => {
            if let Err(e) = engine.update_balance(balance) {
                warn!(error = %e, "balance update rejected");
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Consensus engine starting up");

    let config_path: PathBuf = std::env::var("CONSENSUS_CONFIG")
        .unwrap_or_else(|_| "consensus_config.json".to_string())
        .into();

    let mut config = RuntimeConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });
    config.apply_env_overrides();
    config.validate().context("invalid configuration")?;

    // ── 2. Engine & decision writer ──────────────────────────────────────
    let (tx, mut rx) = mpsc::unbounded_channel::<(String, ConsensusDecision)>();
    let engine = Engine::new(config.clone(), Arc::new(ChannelSink::new(tx)))?;

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some((instrument, decision)) = rx.recv().await {
            let event = OutboundEvent {
                instrument: &instrument,
                decision: &decision,
            };
            let mut line = serde_json::to_string(&event).context("failed to serialise decision")?;
            line.push('\n');
            stdout
                .write_all(line.as_bytes())
                .await
                .context("failed to write decision to stdout")?;
            stdout.flush().await.context("failed to flush stdout")?;
        }
        anyhow::Ok(())
    });

    // ── 3. Restore windows ───────────────────────────────────────────────
    if let Some(path) = &config.snapshot_path {
        if path.exists() {
            match WindowSnapshot::load(path) {
                Ok(snapshot) => {
                    engine.restore(&snapshot);
                }
                Err(e) => warn!(error = %e, "Failed to restore window snapshot"),
            }
        }
    }

    info!("Reading observations from stdin. Press Ctrl+C to stop.");

    // ── 4. Ingestion loop ────────────────────────────────────────────────
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match parse_line(line) {
                        Ok(message) => handle_message(&engine, message),
                        Err(e) => warn!(error = %e, "skipping input line"),
                    }
                }
                Ok(None) => {
                    info!("stdin closed");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "stdin read error");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                warn!("Shutdown signal received - stopping gracefully");
                break;
            }
        }
    }

    // ── 5. Graceful shutdown ─────────────────────────────────────────────
    if let Some(path) = &config.snapshot_path {
        if let Err(e) = engine.snapshot().save(path) {
            error!(error = %e, "Failed to save window snapshot on shutdown");
        }
    }

    info!(
        decisions = engine.decisions_emitted(),
        dropped = engine.observations_dropped(),
        "Consensus engine shut down"
    );

    // Dropping the engine drops the sink sender and ends the writer.
    drop(engine);
    writer.await??;
    Ok(())
}
