use super::types::{
    Command, DefinitionSlot, Gesture, GestureKind, Modifiers, NavigationOutcome, Snapshot, Tooltip,
    TooltipState,
};
use crate::collaborators::Collaborators;
use crate::grid::{resolve, Anchor, DiffGrid, GridTarget};
use crate::lookup::{DefinitionOutcome, LookupErrorKind, LookupResult};
use crate::position::SemanticPosition;
use serde_json::json;
use std::collections::BTreeSet;

/// Lookups issued for one gesture position
#[derive(Debug)]
struct Chain {
    generation: u64,
    kind: GestureKind,
    position: SemanticPosition,
    anchor: Anchor,
    hover: Option<LookupResult>,
    definition: DefinitionSlot,
}

/// Tooltip state machine.
///
/// Every input is a method call that returns the async work to start or
/// stop. Results come back tagged with the generation of the chain that
/// requested them; anything from a superseded chain is dropped, so only the
/// most recent gesture can change what is shown.
pub struct TooltipMachine {
    state: TooltipState,
    /// Generation whose placeholder or tooltip is on screen
    shown: Option<u64>,
    highlighted: BTreeSet<Anchor>,
    docked: BTreeSet<Anchor>,
    active: Option<Chain>,
    /// Chain of the docked tooltip; survives newer hover chains
    docked_generation: Option<u64>,
    last_generation: u64,
    collaborators: Collaborators,
}

impl TooltipMachine {
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            state: TooltipState::Idle,
            shown: None,
            highlighted: BTreeSet::new(),
            docked: BTreeSet::new(),
            active: None,
            docked_generation: None,
            last_generation: 0,
            collaborators,
        }
    }

    pub fn state(&self) -> &TooltipState {
        &self.state
    }

    pub fn highlighted(&self) -> &BTreeSet<Anchor> {
        &self.highlighted
    }

    pub fn docked(&self) -> &BTreeSet<Anchor> {
        &self.docked
    }

    pub fn active_generation(&self) -> Option<u64> {
        self.active.as_ref().map(|chain| chain.generation)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state.clone(),
            highlighted: self.highlighted.clone(),
            docked: self.docked.clone(),
            revision: 0,
        }
    }

    fn set_state(&mut self, state: TooltipState, shown: Option<u64>) {
        self.state = state;
        self.shown = shown;
    }

    /// Handle a settled hover or a click.
    pub fn gesture(&mut self, grid: &DiffGrid, gesture: &Gesture) -> Vec<Command> {
        if gesture.kind == GestureKind::Click {
            if let GridTarget::Gutter { row, side } = gesture.target {
                if let Some(id) = grid.gutter_anchor_id(row, side) {
                    self.collaborators.navigator.push_history(&format!("#{id}"));
                }
                return Vec::new();
            }
        }

        let Some(resolved) = resolve(grid, &gesture.target) else {
            return Vec::new();
        };

        if gesture.kind == GestureKind::Click
            && self.state.is_docked()
            && self.state.position() == Some(&resolved.position)
        {
            return Vec::new();
        }

        if let Some(chain) = self.active.as_mut() {
            if chain.position == resolved.position {
                if gesture.kind == GestureKind::Hover || chain.kind == GestureKind::Click {
                    return Vec::new();
                }
                // Dock from the prefetched results, no second round trip
                chain.kind = GestureKind::Click;
                if chain.hover.is_none() {
                    // A suppressed hover timer never showed Loading: restart it for the click
                    return vec![Command::LoadingTimer {
                        generation: chain.generation,
                    }];
                }
                return self.present();
            }
        }

        let mut commands = Vec::new();
        if let Some(previous) = self.active.take() {
            if Some(previous.generation) != self.docked_generation {
                commands.push(Command::Cancel {
                    generation: previous.generation,
                });
            }
        }
        if matches!(self.state, TooltipState::Loading { .. }) {
            self.set_state(TooltipState::Idle, None);
        }

        self.last_generation += 1;
        let generation = self.last_generation;
        tracing::trace!(
            generation,
            position = %resolved.position,
            kind = ?gesture.kind,
            "starting lookup chain"
        );
        self.active = Some(Chain {
            generation,
            kind: gesture.kind,
            position: resolved.position.clone(),
            anchor: resolved.anchor,
            hover: None,
            definition: DefinitionSlot::Pending,
        });
        commands.push(Command::Lookup {
            generation,
            position: resolved.position,
        });
        commands.push(Command::LoadingTimer { generation });
        commands
    }

    /// The loading grace period of a chain ran out.
    pub fn loading_elapsed(&mut self, generation: u64) -> Vec<Command> {
        let Some(chain) = self
            .active
            .as_ref()
            .filter(|chain| chain.generation == generation && chain.hover.is_none())
        else {
            return Vec::new();
        };
        if chain.kind == GestureKind::Hover && self.state.is_docked() {
            return Vec::new();
        }

        let kind = chain.kind;
        let loading = TooltipState::Loading {
            position: chain.position.clone(),
            anchor: chain.anchor,
        };
        let commands = if kind == GestureKind::Click {
            self.release_docked()
        } else {
            Vec::new()
        };
        self.highlighted.clear();
        self.set_state(loading, Some(generation));
        commands
    }

    pub fn hover_resolved(&mut self, generation: u64, result: LookupResult) -> Vec<Command> {
        let Some(chain) = self
            .active
            .as_mut()
            .filter(|chain| chain.generation == generation)
        else {
            tracing::trace!(generation, "dropping stale hover result");
            return Vec::new();
        };
        if chain.hover.is_some() {
            return Vec::new();
        }
        if let LookupResult::Found(_, Some(url)) = &result {
            chain.definition = DefinitionSlot::Resolved(Some(url.clone()));
        }
        chain.hover = Some(result);
        self.present()
    }

    pub fn definition_resolved(&mut self, generation: u64, outcome: DefinitionOutcome) {
        let slot = match outcome {
            Ok(target) => DefinitionSlot::Resolved(target),
            Err(_) => DefinitionSlot::Failed,
        };

        let mut known = self.docked_generation == Some(generation);
        if let Some(chain) = self
            .active
            .as_mut()
            .filter(|chain| chain.generation == generation)
        {
            chain.definition = slot.clone();
            known = true;
        }
        if !known {
            tracing::trace!(generation, "dropping stale definition result");
            return;
        }
        if self.shown == Some(generation) {
            self.state.attach_definition(slot);
        }
    }

    /// Show (or clear) whatever the active chain resolved to.
    fn present(&mut self) -> Vec<Command> {
        let Some(chain) = self.active.as_ref() else {
            return Vec::new();
        };
        let Some(result) = chain.hover.as_ref() else {
            return Vec::new();
        };

        let content = match result {
            LookupResult::Empty | LookupResult::Error(LookupErrorKind::NoInfo) => {
                if !self.state.is_docked() {
                    self.highlighted.clear();
                    self.set_state(TooltipState::Idle, None);
                }
                return Vec::new();
            }
            LookupResult::Found(content, _) => Some(content.clone()),
            // Still show the position so the selection stays visible
            LookupResult::Error(LookupErrorKind::Failed(_)) => None,
        };

        let generation = chain.generation;
        let kind = chain.kind;
        let anchor = chain.anchor;
        let position = chain.position.clone();
        let tooltip = Tooltip {
            position: position.clone(),
            content,
            definition: chain.definition.clone(),
        };

        match kind {
            GestureKind::Hover => {
                if self.state.is_docked() {
                    return Vec::new();
                }
                self.highlighted = BTreeSet::from([anchor]);
                self.set_state(
                    TooltipState::Transient {
                        position,
                        anchor,
                        tooltip,
                    },
                    Some(generation),
                );
                Vec::new()
            }
            GestureKind::Click => {
                let commands = self.release_docked();
                self.highlighted.clear();
                self.docked.insert(anchor);
                self.docked_generation = Some(generation);

                let has_definition = tooltip.definition_url().is_some();
                self.collaborators.navigator.push_history(&position.to_hash());
                self.set_state(
                    TooltipState::Docked {
                        position,
                        anchor,
                        tooltip,
                    },
                    Some(generation),
                );
                self.collaborators
                    .telemetry
                    .log_event("TooltipDocked", json!({ "hasDefinition": has_definition }));
                commands
            }
        }
    }

    /// Forget the docked tooltip's styling and chain.
    fn release_docked(&mut self) -> Vec<Command> {
        self.docked.clear();
        match self.docked_generation.take() {
            Some(generation) if self.active_generation() != Some(generation) => {
                vec![Command::Cancel { generation }]
            }
            _ => Vec::new(),
        }
    }

    pub fn pointer_left(&mut self) -> Vec<Command> {
        self.highlighted.clear();

        let mut commands = Vec::new();
        if let Some(chain) = self.active.as_ref() {
            if chain.kind == GestureKind::Hover
                && Some(chain.generation) != self.docked_generation
            {
                commands.push(Command::Cancel {
                    generation: chain.generation,
                });
                self.active = None;
            }
        }

        let keep = match &self.state {
            TooltipState::Docked { .. } => true,
            // A click still waiting for its result keeps its placeholder
            TooltipState::Loading { .. } => {
                self.active_generation().is_some() && self.active_generation() == self.shown
            }
            TooltipState::Idle | TooltipState::Transient { .. } => false,
        };
        if !keep {
            self.set_state(TooltipState::Idle, None);
        }
        commands
    }

    pub fn escape(&mut self) -> Vec<Command> {
        self.dismiss_via("escape")
    }

    pub fn dismiss(&mut self) -> Vec<Command> {
        self.dismiss_via("dismiss")
    }

    fn dismiss_via(&mut self, via: &str) -> Vec<Command> {
        let was_docked = self.state.is_docked();
        let commands = self.reset();
        if was_docked {
            self.collaborators.navigator.push_history("");
            self.collaborators
                .telemetry
                .log_event("TooltipDismissed", json!({ "via": via }));
        }
        commands
    }

    /// Drop every chain and tooltip without any side effects.
    pub fn reset(&mut self) -> Vec<Command> {
        let mut commands = Vec::new();
        if let Some(chain) = self.active.take() {
            commands.push(Command::Cancel {
                generation: chain.generation,
            });
        }
        if let Some(generation) = self.docked_generation.take() {
            let cancel = Command::Cancel { generation };
            if !commands.contains(&cancel) {
                commands.push(cancel);
            }
        }
        self.highlighted.clear();
        self.docked.clear();
        self.set_state(TooltipState::Idle, None);
        commands
    }

    pub fn go_to_definition(&mut self, modifiers: Modifiers) -> NavigationOutcome {
        if modifiers.any() {
            return NavigationOutcome::PassThrough;
        }
        let Some(url) = self
            .state
            .tooltip()
            .and_then(Tooltip::definition_url)
            .map(str::to_string)
        else {
            return NavigationOutcome::Unavailable;
        };
        self.collaborators.navigator.push_history(&url);
        self.collaborators.telemetry.log_event(
            "GoToDefinition",
            json!({ "docked": self.state.is_docked() }),
        );
        NavigationOutcome::Intercepted
    }

    pub fn find_references(&mut self, modifiers: Modifiers) -> NavigationOutcome {
        if modifiers.any() {
            return NavigationOutcome::PassThrough;
        }
        let Some(tooltip) = self.state.tooltip() else {
            return NavigationOutcome::Unavailable;
        };
        let url = tooltip.position.references_url();
        self.collaborators.navigator.push_history(&url);
        self.collaborators.telemetry.log_event(
            "FindReferences",
            json!({ "docked": self.state.is_docked() }),
        );
        NavigationOutcome::Intercepted
    }
}
