use crate::grid::{Anchor, GridTarget};
use crate::lookup::HoverContent;
use crate::position::SemanticPosition;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    Hover,
    Click,
}

/// Modifier keys held during a pointer or key event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub fn any(self) -> bool {
        self.shift || self.ctrl || self.alt || self.meta
    }
}

/// One pointer interaction with the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gesture {
    pub kind: GestureKind,
    pub target: GridTarget,
    pub modifiers: Modifiers,
    pub at: Instant,
}

impl Gesture {
    pub fn hover(target: GridTarget) -> Self {
        Self {
            kind: GestureKind::Hover,
            target,
            modifiers: Modifiers::NONE,
            at: Instant::now(),
        }
    }

    pub fn click(target: GridTarget) -> Self {
        Self {
            kind: GestureKind::Click,
            ..Self::hover(target)
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// State of the eagerly prefetched definition lookup
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DefinitionSlot {
    #[default]
    Pending,
    Resolved(Option<String>),
    Failed,
}

impl DefinitionSlot {
    pub fn url(&self) -> Option<&str> {
        match self {
            DefinitionSlot::Resolved(Some(url)) => Some(url),
            _ => None,
        }
    }
}

/// Render-ready tooltip payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tooltip {
    pub position: SemanticPosition,
    /// None when the lookup failed: only the position is shown
    pub content: Option<HoverContent>,
    pub definition: DefinitionSlot,
}

impl Tooltip {
    pub fn is_bare(&self) -> bool {
        self.content.is_none()
    }

    pub fn definition_url(&self) -> Option<&str> {
        self.definition.url()
    }
}

/// The single active tooltip, if any
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TooltipState {
    #[default]
    Idle,
    Loading {
        position: SemanticPosition,
        anchor: Anchor,
    },
    Transient {
        position: SemanticPosition,
        anchor: Anchor,
        tooltip: Tooltip,
    },
    Docked {
        position: SemanticPosition,
        anchor: Anchor,
        tooltip: Tooltip,
    },
}

impl TooltipState {
    pub fn is_idle(&self) -> bool {
        matches!(self, TooltipState::Idle)
    }

    pub fn is_docked(&self) -> bool {
        matches!(self, TooltipState::Docked { .. })
    }

    pub fn anchor(&self) -> Option<Anchor> {
        match self {
            TooltipState::Idle => None,
            TooltipState::Loading { anchor, .. }
            | TooltipState::Transient { anchor, .. }
            | TooltipState::Docked { anchor, .. } => Some(*anchor),
        }
    }

    pub fn position(&self) -> Option<&SemanticPosition> {
        match self {
            TooltipState::Idle => None,
            TooltipState::Loading { position, .. }
            | TooltipState::Transient { position, .. }
            | TooltipState::Docked { position, .. } => Some(position),
        }
    }

    pub fn tooltip(&self) -> Option<&Tooltip> {
        match self {
            TooltipState::Transient { tooltip, .. } | TooltipState::Docked { tooltip, .. } => {
                Some(tooltip)
            }
            TooltipState::Idle | TooltipState::Loading { .. } => None,
        }
    }

    fn tooltip_mut(&mut self) -> Option<&mut Tooltip> {
        match self {
            TooltipState::Transient { tooltip, .. } | TooltipState::Docked { tooltip, .. } => {
                Some(tooltip)
            }
            TooltipState::Idle | TooltipState::Loading { .. } => None,
        }
    }

    pub(crate) fn attach_definition(&mut self, slot: DefinitionSlot) {
        if let Some(tooltip) = self.tooltip_mut() {
            tooltip.definition = slot;
        }
    }
}

/// What renderers read: the tooltip plus the anchors to style
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    pub state: TooltipState,
    /// Anchors styled as hover highlights
    pub highlighted: BTreeSet<Anchor>,
    /// Anchors styled as docked (sticky)
    pub docked: BTreeSet<Anchor>,
    /// Bumped by the driver on every published change
    pub revision: u64,
}

impl Snapshot {
    pub(crate) fn same_view(&self, other: &Snapshot) -> bool {
        self.state == other.state
            && self.highlighted == other.highlighted
            && self.docked == other.docked
    }
}

/// Async work requested by the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start the hover and definition lookups for a chain
    Lookup {
        generation: u64,
        position: SemanticPosition,
    },
    /// Start the loading-placeholder timer for a chain
    LoadingTimer { generation: u64 },
    /// Stop everything still running for a chain
    Cancel { generation: u64 },
}

/// Result of a navigation request (go to definition, find references)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    Intercepted,
    /// A modifier was held: leave the event to its default behavior
    PassThrough,
    /// No tooltip or no target to navigate to
    Unavailable,
}

/// Events accepted by a mounted view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Gesture(Gesture),
    /// The pointer left the grid
    PointerLeft,
    Escape,
    Dismiss,
    GoToDefinition(Modifiers),
    FindReferences(Modifiers),
}

/// Timing of the tooltip pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TooltipConfig {
    /// Hover gestures closer together than this collapse into one
    pub debounce_ms: u64,
    /// Grace period before a pending lookup shows a loading placeholder
    pub loading_delay_ms: u64,
}

impl Default for TooltipConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 50,
            loading_delay_ms: 500,
        }
    }
}

impl TooltipConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn loading_delay(&self) -> Duration {
        Duration::from_millis(self.loading_delay_ms)
    }
}
