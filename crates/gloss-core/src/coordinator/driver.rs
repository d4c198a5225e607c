use super::machine::TooltipMachine;
use super::types::{Command, Gesture, GestureKind, Input, Snapshot, TooltipConfig};
use crate::collaborators::Collaborators;
use crate::grid::DiffGrid;
use crate::lookup::{DefinitionOutcome, LookupGateway, LookupResult, LookupService};
use crate::position::SemanticPosition;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, Instant};

enum Envelope {
    Input(Input),
    ReplaceGrid(Arc<DiffGrid>),
    Shutdown,
}

enum Completion {
    Hover {
        generation: u64,
        result: LookupResult,
    },
    Definition {
        generation: u64,
        outcome: DefinitionOutcome,
    },
    LoadingElapsed {
        generation: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Part {
    Hover,
    Definition,
}

/// Running lookups of one chain
struct ChainHandle {
    hover: Option<JoinHandle<()>>,
    definition: Option<JoinHandle<()>>,
}

impl ChainHandle {
    fn abort(&self) {
        for handle in [&self.hover, &self.definition].into_iter().flatten() {
            handle.abort();
        }
    }
}

/// Every task spawned on behalf of a mounted view.
///
/// Dropping the set aborts whatever is still running, so teardown happens on
/// every exit path of the actor.
#[derive(Default)]
pub(crate) struct ViewResources {
    chains: HashMap<u64, ChainHandle>,
    timers: HashMap<u64, JoinHandle<()>>,
}

impl ViewResources {
    fn track_chain(&mut self, generation: u64, hover: JoinHandle<()>, definition: JoinHandle<()>) {
        self.chains.insert(
            generation,
            ChainHandle {
                hover: Some(hover),
                definition: Some(definition),
            },
        );
    }

    fn track_timer(&mut self, generation: u64, timer: JoinHandle<()>) {
        self.timers.insert(generation, timer);
    }

    /// Forget a finished part; the chain entry goes once both parts are done
    fn finish(&mut self, generation: u64, part: Part) {
        let Some(chain) = self.chains.get_mut(&generation) else {
            return;
        };
        match part {
            Part::Hover => chain.hover = None,
            Part::Definition => chain.definition = None,
        }
        if chain.hover.is_none() && chain.definition.is_none() {
            self.chains.remove(&generation);
        }
    }

    fn cancel_timer(&mut self, generation: u64) {
        if let Some(timer) = self.timers.remove(&generation) {
            timer.abort();
        }
    }

    fn cancel(&mut self, generation: u64) {
        if let Some(chain) = self.chains.remove(&generation) {
            chain.abort();
        }
        self.cancel_timer(generation);
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.chains.len() + self.timers.len()
    }

    fn release(&mut self) {
        for (_, chain) in self.chains.drain() {
            chain.abort();
        }
        for (_, timer) in self.timers.drain() {
            timer.abort();
        }
    }
}

impl Drop for ViewResources {
    fn drop(&mut self) {
        self.release();
    }
}

/// Cloneable handle for feeding events into a mounted view
#[derive(Clone)]
pub struct InputSender {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl InputSender {
    /// Returns false once the view has been unmounted
    pub fn send(&self, input: Input) -> bool {
        self.tx.send(Envelope::Input(input)).is_ok()
    }
}

/// A grid with a running tooltip coordinator.
///
/// Dropping the view aborts the coordinator and every lookup it started;
/// [`MountedView::unmount`] does the same but waits for it to finish.
pub struct MountedView {
    input: InputSender,
    snapshots: watch::Receiver<Snapshot>,
    actor: Option<JoinHandle<()>>,
}

impl MountedView {
    pub fn input(&self) -> InputSender {
        self.input.clone()
    }

    pub fn snapshots(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// Swap the grid (e.g. when switching files). Dismisses any tooltip.
    pub fn replace_grid(&self, grid: Arc<DiffGrid>) -> bool {
        self.input.tx.send(Envelope::ReplaceGrid(grid)).is_ok()
    }

    pub async fn unmount(mut self) {
        let Some(actor) = self.actor.take() else {
            return;
        };
        let _ = self.input.tx.send(Envelope::Shutdown);
        if let Err(err) = actor.await {
            if err.is_panic() {
                tracing::error!(error = %err, "tooltip coordinator panicked");
            }
        }
    }
}

impl Drop for MountedView {
    fn drop(&mut self) {
        if let Some(actor) = self.actor.take() {
            actor.abort();
        }
    }
}

/// Start a tooltip coordinator for `grid`.
///
/// Must be called from within a tokio runtime.
pub fn mount<S: LookupService>(
    grid: Arc<DiffGrid>,
    service: Arc<S>,
    collaborators: Collaborators,
    config: TooltipConfig,
) -> MountedView {
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let (completion_tx, completion_rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::default());

    let actor = Actor {
        machine: TooltipMachine::new(collaborators),
        grid,
        gateway: LookupGateway::new(service),
        config,
        inputs: input_rx,
        completion_tx,
        completions: completion_rx,
        resources: ViewResources::default(),
        pending_hover: None,
        snapshots: snapshot_tx,
    };
    let actor = tokio::spawn(actor.run());

    MountedView {
        input: InputSender { tx: input_tx },
        snapshots: snapshot_rx,
        actor: Some(actor),
    }
}

struct Actor<S> {
    machine: TooltipMachine,
    grid: Arc<DiffGrid>,
    gateway: LookupGateway<S>,
    config: TooltipConfig,
    inputs: mpsc::UnboundedReceiver<Envelope>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completions: mpsc::UnboundedReceiver<Completion>,
    resources: ViewResources,
    /// Latest hover waiting for the pointer to settle
    pending_hover: Option<Gesture>,
    snapshots: watch::Sender<Snapshot>,
}

async fn settle(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl<S: LookupService> Actor<S> {
    async fn run(mut self) {
        tracing::debug!(rows = self.grid.len(), "tooltip coordinator mounted");
        loop {
            let deadline = self
                .pending_hover
                .as_ref()
                .map(|gesture| gesture.at + self.config.debounce());

            tokio::select! {
                biased;
                envelope = self.inputs.recv() => match envelope {
                    Some(Envelope::Shutdown) | None => break,
                    Some(envelope) => self.on_envelope(envelope),
                },
                Some(completion) = self.completions.recv() => self.on_completion(completion),
                _ = settle(deadline) => {
                    if let Some(gesture) = self.pending_hover.take() {
                        self.on_gesture(gesture);
                    }
                }
            }
            self.publish();
        }
        self.resources.release();
        tracing::debug!("tooltip coordinator unmounted");
    }

    fn on_envelope(&mut self, envelope: Envelope) {
        let commands = match envelope {
            Envelope::Input(Input::Gesture(gesture)) => match gesture.kind {
                GestureKind::Hover => {
                    self.pending_hover = Some(gesture);
                    Vec::new()
                }
                GestureKind::Click => {
                    self.pending_hover = None;
                    self.machine.gesture(&self.grid, &gesture)
                }
            },
            Envelope::Input(Input::PointerLeft) => {
                self.pending_hover = None;
                self.machine.pointer_left()
            }
            Envelope::Input(Input::Escape) => {
                self.pending_hover = None;
                self.machine.escape()
            }
            Envelope::Input(Input::Dismiss) => {
                self.pending_hover = None;
                self.machine.dismiss()
            }
            Envelope::Input(Input::GoToDefinition(modifiers)) => {
                let outcome = self.machine.go_to_definition(modifiers);
                tracing::debug!(?outcome, "go to definition");
                Vec::new()
            }
            Envelope::Input(Input::FindReferences(modifiers)) => {
                let outcome = self.machine.find_references(modifiers);
                tracing::debug!(?outcome, "find references");
                Vec::new()
            }
            Envelope::ReplaceGrid(grid) => {
                self.pending_hover = None;
                self.grid = grid;
                self.machine.reset()
            }
            Envelope::Shutdown => Vec::new(),
        };
        self.execute(commands);
    }

    fn on_gesture(&mut self, gesture: Gesture) {
        let commands = self.machine.gesture(&self.grid, &gesture);
        self.execute(commands);
    }

    fn on_completion(&mut self, completion: Completion) {
        let commands = match completion {
            Completion::Hover { generation, result } => {
                self.resources.cancel_timer(generation);
                self.resources.finish(generation, Part::Hover);
                self.machine.hover_resolved(generation, result)
            }
            Completion::Definition {
                generation,
                outcome,
            } => {
                self.resources.finish(generation, Part::Definition);
                self.machine.definition_resolved(generation, outcome);
                Vec::new()
            }
            Completion::LoadingElapsed { generation } => {
                self.resources.cancel_timer(generation);
                self.machine.loading_elapsed(generation)
            }
        };
        self.execute(commands);
    }

    fn execute(&mut self, commands: Vec<Command>) {
        for command in commands {
            match command {
                Command::Lookup {
                    generation,
                    position,
                } => self.spawn_lookups(generation, position),
                Command::LoadingTimer { generation } => self.spawn_timer(generation),
                Command::Cancel { generation } => self.resources.cancel(generation),
            }
        }
    }

    fn spawn_lookups(&mut self, generation: u64, position: SemanticPosition) {
        let hover = {
            let gateway = self.gateway.clone();
            let tx = self.completion_tx.clone();
            let position = position.clone();
            tokio::spawn(async move {
                let result = gateway.fetch_hover(&position).await;
                let _ = tx.send(Completion::Hover { generation, result });
            })
        };
        let definition = {
            let gateway = self.gateway.clone();
            let tx = self.completion_tx.clone();
            tokio::spawn(async move {
                let outcome = gateway.fetch_definition_target(&position).await;
                let _ = tx.send(Completion::Definition {
                    generation,
                    outcome,
                });
            })
        };
        self.resources.track_chain(generation, hover, definition);
    }

    fn spawn_timer(&mut self, generation: u64) {
        // A restarted timer replaces the running one
        self.resources.cancel_timer(generation);
        let tx = self.completion_tx.clone();
        let delay = self.config.loading_delay();
        let timer = tokio::spawn(async move {
            sleep(delay).await;
            let _ = tx.send(Completion::LoadingElapsed { generation });
        });
        self.resources.track_timer(generation, timer);
    }

    fn publish(&mut self) {
        let next = self.machine.snapshot();
        self.snapshots.send_if_modified(|current| {
            if current.same_view(&next) {
                return false;
            }
            let revision = current.revision + 1;
            *current = Snapshot { revision, ..next };
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resources_release_aborts_everything() {
        let mut resources = ViewResources::default();
        let hover = tokio::spawn(std::future::pending::<()>());
        let definition = tokio::spawn(std::future::pending::<()>());
        let timer = tokio::spawn(std::future::pending::<()>());
        let probe = hover.abort_handle();

        resources.track_chain(1, hover, definition);
        resources.track_timer(1, timer);
        assert_eq!(resources.in_flight(), 2);

        drop(resources);
        for _ in 0..16 {
            if probe.is_finished() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(probe.is_finished());
    }

    #[tokio::test]
    async fn test_finish_removes_chain_after_both_parts() {
        let mut resources = ViewResources::default();
        resources.track_chain(7, tokio::spawn(async {}), tokio::spawn(async {}));
        resources.finish(7, Part::Hover);
        assert_eq!(resources.in_flight(), 1);
        resources.finish(7, Part::Definition);
        assert_eq!(resources.in_flight(), 0);
    }
}
