//! Tooltip coordination
//!
//! [`TooltipMachine`] is the synchronous state machine: gestures and lookup
//! results go in, commands for async work come out. [`mount`] wraps it in a
//! tokio actor that debounces hover gestures, runs the lookups and the
//! loading timer, cancels superseded chains and publishes [`Snapshot`]s for
//! renderers.

mod driver;
mod machine;
mod types;

pub use driver::{mount, InputSender, MountedView};
pub use machine::TooltipMachine;
pub use types::{
    Command, DefinitionSlot, Gesture, GestureKind, Input, Modifiers, NavigationOutcome, Snapshot,
    Tooltip, TooltipConfig, TooltipState,
};

#[cfg(test)]
mod tests;
