//! Caller-controlled engine state.

use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

/// Whether the next decision cycle may read from the content store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    ForceReload,
    Normal,
}

/// Mutable state shared by all interceptions.
///
/// A force reload is transient: it reverts to [`OperatingMode::Normal`] once
/// `window` has elapsed since it was armed. A zero window keeps it armed until
/// cleared explicitly.
#[derive(Debug)]
pub struct EngineState {
    armed_at: Option<Instant>,
    window: Duration,
}

impl EngineState {
    pub fn new(window: Duration) -> Self {
        Self { armed_at: None, window }
    }

    pub fn set_force_reload(&mut self, force: bool) {
        self.armed_at = force.then(Instant::now);
    }

    /// Current mode, expiring a stale force reload.
    pub fn operating_mode(&mut self) -> OperatingMode {
        match self.armed_at {
            Some(at) if self.window.is_zero() || at.elapsed() < self.window => OperatingMode::ForceReload,
            Some(_) => {
                self.armed_at = None;
                OperatingMode::Normal
            }
            None => OperatingMode::Normal,
        }
    }
}
