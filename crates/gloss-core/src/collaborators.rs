//! Side-effecting collaborators called by the tooltip coordinator

use serde_json::Value;
use std::sync::Arc;

/// Navigation history (location hash updates, definition jumps).
pub trait Navigator: Send + Sync {
    /// Fire-and-forget. An empty location clears the current hash.
    fn push_history(&self, location: &str);
}

/// Analytics sink.
///
/// Implementations must swallow their own failures: telemetry never blocks
/// or aborts the tooltip pipeline.
pub trait Telemetry: Send + Sync {
    fn log_event(&self, name: &str, properties: Value);
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct Noop;

impl Navigator for Noop {
    fn push_history(&self, _location: &str) {}
}

impl Telemetry for Noop {
    fn log_event(&self, _name: &str, _properties: Value) {}
}

#[derive(Clone)]
pub struct Collaborators {
    pub navigator: Arc<dyn Navigator>,
    pub telemetry: Arc<dyn Telemetry>,
}

impl Collaborators {
    pub fn new(navigator: Arc<dyn Navigator>, telemetry: Arc<dyn Telemetry>) -> Self {
        Self {
            navigator,
            telemetry,
        }
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::new(Arc::new(Noop), Arc::new(Noop))
    }
}
