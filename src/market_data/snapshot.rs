// ---------------------------------------------------------------------------
// WindowSnapshot -- rolling-window contents persisted across restarts
// ---------------------------------------------------------------------------
//
// The only engine state worth persisting is what each instrument's window
// holds.  Snapshots are JSON (instrument -> oldest-first observations) and
// are written with the same tmp + rename pattern as the runtime config.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::{InstrumentId, Observation};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSnapshot {
    pub taken_at: DateTime<Utc>,
    #[serde(default)]
    pub windows: BTreeMap<InstrumentId, Vec<Observation>>,
}

impl WindowSnapshot {
    pub fn new(windows: BTreeMap<InstrumentId, Vec<Observation>>) -> Self {
        Self {
            taken_at: Utc::now(),
            windows,
        }
    }

    pub fn observation_count(&self) -> usize {
        self.windows.values().map(Vec::len).sum()
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read window snapshot from {}", path.display()))?;

        let snapshot: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse window snapshot from {}", path.display()))?;

        info!(
            path = %path.display(),
            instruments = snapshot.windows.len(),
            observations = snapshot.observation_count(),
            taken_at = %snapshot.taken_at,
            "window snapshot loaded"
        );
        Ok(snapshot)
    }

    /// Atomic write (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string(self).context("failed to serialise window snapshot")?;

        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp snapshot to {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp snapshot to {}", path.display()))?;

        info!(
            path = %path.display(),
            instruments = self.windows.len(),
            observations = self.observation_count(),
            "window snapshot saved (atomic)"
        );
        Ok(())
    }
}
