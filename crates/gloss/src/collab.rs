//! Navigation and telemetry sinks for the TUI

use gloss_core::{Navigator, Telemetry};
use serde_json::Value;
use std::sync::Mutex;

/// Records pushed locations until the app picks them up
#[derive(Debug, Default)]
pub struct HistoryNavigator {
    pending: Mutex<Vec<String>>,
}

impl HistoryNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain locations pushed since the last call
    pub fn take_pending(&self) -> Vec<String> {
        match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl Navigator for HistoryNavigator {
    fn push_history(&self, location: &str) {
        tracing::debug!(location, "history push");
        match self.pending.lock() {
            Ok(mut pending) => pending.push(location.to_string()),
            Err(poisoned) => poisoned.into_inner().push(location.to_string()),
        }
    }
}

/// Forwards analytics events to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn log_event(&self, name: &str, properties: Value) {
        tracing::info!(target: "gloss::telemetry", event = name, %properties);
    }
}
