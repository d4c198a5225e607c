use super::*;
use crate::collaborators::{Collaborators, Navigator, Telemetry};
use crate::grid::{Anchor, DiffGrid, GridTarget};
use crate::hunk::parse_unified;
use crate::lookup::{HoverContent, LookupErrorKind, LookupResult, LookupService, ServiceError};
use crate::position::{SemanticPosition, Side};
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

const DIFF: &str = "\
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1,3 +1,3 @@
 fn parse(input: &str) -> Config {
-    let old_value = read(input);
+    let new_value = read(input);
     build(new_value)
";

/// `parse` on new line 1
const A: GridTarget = GridTarget::Content { row: 1, column: 3 };
/// `new_value` on new line 2
const B: GridTarget = GridTarget::Content { row: 3, column: 9 };
/// `build` on new line 3
const C: GridTarget = GridTarget::Content { row: 4, column: 5 };
/// Hunk header
const MISS: GridTarget = GridTarget::Content { row: 0, column: 0 };

fn grid() -> DiffGrid {
    let files = parse_unified(DIFF);
    DiffGrid::from_file(&files[0], "acme/app", "base", "head")
}

fn anchor(row: usize, start: usize, end: usize) -> Anchor {
    Anchor {
        row,
        side: Side::New,
        start,
        end,
    }
}

#[derive(Default)]
struct Recorder {
    history: Mutex<Vec<String>>,
    events: Mutex<Vec<(String, Value)>>,
}

impl Recorder {
    fn history(&self) -> Vec<String> {
        self.history.lock().unwrap().clone()
    }

    fn events_named(&self, name: &str) -> Vec<Value> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(event, _)| event == name)
            .map(|(_, props)| props.clone())
            .collect()
    }
}

impl Navigator for Recorder {
    fn push_history(&self, location: &str) {
        self.history.lock().unwrap().push(location.to_string());
    }
}

impl Telemetry for Recorder {
    fn log_event(&self, name: &str, properties: Value) {
        self.events
            .lock()
            .unwrap()
            .push((name.to_string(), properties));
    }
}

fn machine() -> (TooltipMachine, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let collaborators = Collaborators::new(recorder.clone(), recorder.clone());
    (TooltipMachine::new(collaborators), recorder)
}

fn lookup_generation(commands: &[Command]) -> u64 {
    commands
        .iter()
        .find_map(|command| match command {
            Command::Lookup { generation, .. } => Some(*generation),
            _ => None,
        })
        .expect("lookup command")
}

fn content(text: &str) -> HoverContent {
    HoverContent {
        contents: vec![text.to_string()],
        range: None,
    }
}

fn found(text: &str) -> LookupResult {
    LookupResult::Found(content(text), None)
}

fn shown_line(state: &TooltipState) -> Option<usize> {
    state.position().map(SemanticPosition::line)
}

// ============================================================================
// State machine
// ============================================================================

#[test]
fn test_unresolved_gesture_is_noop() {
    let grid = grid();
    let (mut m, recorder) = machine();

    let before = m.snapshot();
    assert!(m.gesture(&grid, &Gesture::hover(MISS)).is_empty());
    assert!(m.gesture(&grid, &Gesture::click(MISS)).is_empty());
    assert!(m.gesture(&grid, &Gesture::hover(GridTarget::Outside)).is_empty());
    assert_eq!(m.snapshot(), before);

    // Same with a tooltip on screen
    let generation = lookup_generation(&m.gesture(&grid, &Gesture::hover(A)));
    m.hover_resolved(generation, found("fn parse"));
    let before = m.snapshot();
    assert!(m.gesture(&grid, &Gesture::click(MISS)).is_empty());
    assert_eq!(m.snapshot(), before);
    assert_eq!(m.active_generation(), Some(generation));
    assert!(recorder.history().is_empty());
}

#[test]
fn test_gesture_starts_lookup_and_timer() {
    let grid = grid();
    let (mut m, _) = machine();

    let commands = m.gesture(&grid, &Gesture::hover(A));
    assert_eq!(commands.len(), 2);
    let generation = lookup_generation(&commands);
    assert!(commands.contains(&Command::LoadingTimer { generation }));
    match &commands[0] {
        Command::Lookup { position, .. } => {
            assert_eq!(position.line(), 1);
            assert_eq!(position.character(), 3);
            assert_eq!(position.spec().path, "src/lib.rs");
        }
        other => panic!("unexpected command {other:?}"),
    }

    // Hovering the same token again does not start a second chain
    assert!(m.gesture(&grid, &Gesture::hover(A)).is_empty());
    assert!(m.state().is_idle());
}

#[test]
fn test_hover_without_definition_then_dock() {
    let grid = grid();
    let (mut m, recorder) = machine();

    let generation = lookup_generation(&m.gesture(&grid, &Gesture::hover(A)));
    m.hover_resolved(generation, found("fn parse(input: &str) -> Config"));
    m.definition_resolved(generation, Ok(None));

    let TooltipState::Transient { tooltip, .. } = m.state() else {
        panic!("expected transient, got {:?}", m.state());
    };
    assert_eq!(tooltip.content, Some(content("fn parse(input: &str) -> Config")));
    assert_eq!(tooltip.definition_url(), None);
    assert_eq!(m.highlighted(), &BTreeSet::from([anchor(1, 3, 8)]));
    assert_eq!(
        m.go_to_definition(Modifiers::NONE),
        NavigationOutcome::Unavailable
    );

    // Clicking docks from the prefetched results
    let commands = m.gesture(&grid, &Gesture::click(A));
    assert!(commands.is_empty());
    assert!(m.state().is_docked());
    assert_eq!(m.docked(), &BTreeSet::from([anchor(1, 3, 8)]));
    assert!(m.highlighted().is_empty());
    assert_eq!(recorder.history(), vec!["#L1:4".to_string()]);
    assert_eq!(
        recorder.events_named("TooltipDocked"),
        vec![json!({ "hasDefinition": false })]
    );

    // Clicking the docked token again changes nothing
    assert!(m.gesture(&grid, &Gesture::click(A)).is_empty());
    assert_eq!(recorder.events_named("TooltipDocked").len(), 1);
}

#[test]
fn test_docking_b_replaces_a() {
    let grid = grid();
    let (mut m, recorder) = machine();

    let a = lookup_generation(&m.gesture(&grid, &Gesture::click(A)));
    m.hover_resolved(a, found("fn parse"));
    m.definition_resolved(a, Ok(Some("src/lib.rs#L1".to_string())));
    assert!(m.state().is_docked());

    let b = lookup_generation(&m.gesture(&grid, &Gesture::click(B)));
    m.hover_resolved(b, found("let new_value"));

    assert_eq!(shown_line(m.state()), Some(2));
    assert!(m.state().is_docked());
    assert_eq!(m.docked(), &BTreeSet::from([anchor(3, 8, 17)]));
    assert!(!m.docked().contains(&anchor(1, 3, 8)));
    assert!(!m.highlighted().contains(&anchor(1, 3, 8)));

    let docked = recorder.events_named("TooltipDocked");
    assert_eq!(
        docked,
        vec![
            json!({ "hasDefinition": false }),
            json!({ "hasDefinition": false })
        ]
    );
    assert_eq!(recorder.history(), vec!["#L1:4", "#L2:10"]);
}

#[test]
fn test_empty_after_loading_returns_to_idle() {
    let grid = grid();
    let (mut m, _) = machine();

    let generation = lookup_generation(&m.gesture(&grid, &Gesture::hover(B)));
    m.loading_elapsed(generation);
    assert!(matches!(m.state(), TooltipState::Loading { .. }));
    assert_eq!(m.state().anchor(), Some(anchor(3, 8, 17)));
    assert!(m.state().tooltip().is_none());

    m.hover_resolved(generation, LookupResult::Empty);
    assert!(m.state().is_idle());
    assert!(m.highlighted().is_empty());
}

#[test]
fn test_timer_after_result_is_noop() {
    let grid = grid();
    let (mut m, _) = machine();

    let generation = lookup_generation(&m.gesture(&grid, &Gesture::hover(A)));
    m.hover_resolved(generation, found("fn parse"));
    let before = m.snapshot();
    assert!(m.loading_elapsed(generation).is_empty());
    assert_eq!(m.snapshot(), before);
}

#[test]
fn test_stale_result_never_flips_back() {
    let grid = grid();
    let (mut m, _) = machine();

    let a = lookup_generation(&m.gesture(&grid, &Gesture::hover(A)));
    let commands = m.gesture(&grid, &Gesture::hover(B));
    assert!(commands.contains(&Command::Cancel { generation: a }));
    let b = lookup_generation(&commands);
    assert_ne!(a, b);

    // A resolves late: nothing happens
    m.loading_elapsed(a);
    m.hover_resolved(a, found("fn parse"));
    m.definition_resolved(a, Ok(Some("src/lib.rs#L1".to_string())));
    assert!(m.state().is_idle());
    assert!(m.highlighted().is_empty());

    m.hover_resolved(b, found("let new_value"));
    assert_eq!(shown_line(m.state()), Some(2));

    // Still B after another late A result
    m.hover_resolved(a, found("fn parse"));
    assert_eq!(shown_line(m.state()), Some(2));
    assert_eq!(m.highlighted(), &BTreeSet::from([anchor(3, 8, 17)]));
}

#[test]
fn test_new_gesture_clears_stale_loading() {
    let grid = grid();
    let (mut m, _) = machine();

    let a = lookup_generation(&m.gesture(&grid, &Gesture::hover(A)));
    m.loading_elapsed(a);
    assert!(matches!(m.state(), TooltipState::Loading { .. }));

    m.gesture(&grid, &Gesture::hover(C));
    assert!(m.state().is_idle());
}

#[test]
fn test_escape_clears_docked() {
    let grid = grid();
    let (mut m, recorder) = machine();

    let generation = lookup_generation(&m.gesture(&grid, &Gesture::click(C)));
    m.hover_resolved(generation, found("fn build"));
    assert!(m.state().is_docked());
    m.pointer_left();
    assert!(m.state().is_docked());

    m.escape();
    assert!(m.state().is_idle());
    assert!(m.docked().is_empty());
    assert!(m.highlighted().is_empty());
    assert_eq!(m.active_generation(), None);
    assert_eq!(recorder.history().last().map(String::as_str), Some(""));
    assert_eq!(
        recorder.events_named("TooltipDismissed"),
        vec![json!({ "via": "escape" })]
    );

    // Nothing docked: no history update
    let pushed = recorder.history().len();
    m.dismiss();
    assert_eq!(recorder.history().len(), pushed);
}

#[test]
fn test_gutter_click_bypasses_pipeline() {
    let grid = grid();
    let (mut m, recorder) = machine();

    let commands = m.gesture(
        &grid,
        &Gesture::click(GridTarget::Gutter {
            row: 3,
            side: Side::New,
        }),
    );
    assert!(commands.is_empty());
    assert!(m.state().is_idle());
    assert_eq!(
        recorder.history(),
        vec![format!("#{}R2", grid.anchor_prefix())]
    );

    // Hovering a gutter does nothing at all
    let gutter = GridTarget::Gutter {
        row: 3,
        side: Side::New,
    };
    assert!(m.gesture(&grid, &Gesture::hover(gutter)).is_empty());
    assert_eq!(recorder.history().len(), 1);
}

#[test]
fn test_hover_while_docked_keeps_docked() {
    let grid = grid();
    let (mut m, _) = machine();

    let a = lookup_generation(&m.gesture(&grid, &Gesture::click(A)));
    m.hover_resolved(a, found("fn parse"));

    let b = lookup_generation(&m.gesture(&grid, &Gesture::hover(B)));
    m.loading_elapsed(b);
    assert!(m.state().is_docked());
    m.hover_resolved(b, found("let new_value"));
    assert!(m.state().is_docked());
    assert_eq!(shown_line(m.state()), Some(1));
    assert!(m.highlighted().is_empty());

    let c = lookup_generation(&m.gesture(&grid, &Gesture::hover(C)));
    m.hover_resolved(c, LookupResult::Empty);
    assert_eq!(shown_line(m.state()), Some(1));
    assert_eq!(m.docked(), &BTreeSet::from([anchor(1, 3, 8)]));
}

#[test]
fn test_docked_chain_survives_newer_hovers() {
    let grid = grid();
    let (mut m, _) = machine();

    let a = lookup_generation(&m.gesture(&grid, &Gesture::click(A)));
    m.hover_resolved(a, found("fn parse"));
    assert_eq!(
        m.state().tooltip().map(|t| t.definition.clone()),
        Some(DefinitionSlot::Pending)
    );

    let commands = m.gesture(&grid, &Gesture::hover(B));
    assert!(!commands.contains(&Command::Cancel { generation: a }));

    m.definition_resolved(a, Ok(Some("src/lib.rs#L1".to_string())));
    assert_eq!(
        m.state().tooltip().and_then(Tooltip::definition_url),
        Some("src/lib.rs#L1")
    );
}

#[test]
fn test_failed_lookup_shows_bare_tooltip() {
    let grid = grid();
    let (mut m, _) = machine();

    let generation = lookup_generation(&m.gesture(&grid, &Gesture::hover(C)));
    m.hover_resolved(
        generation,
        LookupResult::Error(LookupErrorKind::Failed("offline".to_string())),
    );
    let tooltip = m.state().tooltip().expect("bare tooltip");
    assert!(tooltip.is_bare());
    assert_eq!(tooltip.position.line(), 3);

    // No-info errors show nothing
    let generation = lookup_generation(&m.gesture(&grid, &Gesture::hover(A)));
    m.hover_resolved(generation, LookupResult::Error(LookupErrorKind::NoInfo));
    assert!(m.state().is_idle());
}

#[test]
fn test_definition_attached_after_display() {
    let grid = grid();
    let (mut m, recorder) = machine();

    let generation = lookup_generation(&m.gesture(&grid, &Gesture::hover(C)));
    m.hover_resolved(generation, found("fn build"));
    assert_eq!(
        m.state().tooltip().map(|t| t.definition.clone()),
        Some(DefinitionSlot::Pending)
    );

    m.definition_resolved(generation, Ok(Some("src/build.rs#L10".to_string())));
    assert_eq!(
        m.state().tooltip().and_then(Tooltip::definition_url),
        Some("src/build.rs#L10")
    );

    let shift = Modifiers {
        shift: true,
        ..Modifiers::NONE
    };
    assert_eq!(m.go_to_definition(shift), NavigationOutcome::PassThrough);
    assert!(recorder.history().is_empty());

    assert_eq!(
        m.go_to_definition(Modifiers::NONE),
        NavigationOutcome::Intercepted
    );
    assert_eq!(recorder.history(), vec!["src/build.rs#L10"]);
    assert_eq!(recorder.events_named("GoToDefinition").len(), 1);
}

#[test]
fn test_definition_before_display_is_attached() {
    let grid = grid();
    let (mut m, recorder) = machine();

    let generation = lookup_generation(&m.gesture(&grid, &Gesture::click(C)));
    m.definition_resolved(generation, Ok(Some("src/build.rs#L10".to_string())));
    m.hover_resolved(generation, found("fn build"));

    assert_eq!(
        m.state().tooltip().and_then(Tooltip::definition_url),
        Some("src/build.rs#L10")
    );
    assert_eq!(
        recorder.events_named("TooltipDocked"),
        vec![json!({ "hasDefinition": true })]
    );
}

#[test]
fn test_pointer_left_clears_transient() {
    let grid = grid();
    let (mut m, _) = machine();

    let generation = lookup_generation(&m.gesture(&grid, &Gesture::hover(B)));
    m.hover_resolved(generation, found("let new_value"));
    assert!(!m.highlighted().is_empty());

    let commands = m.pointer_left();
    assert_eq!(commands, vec![Command::Cancel { generation }]);
    assert!(m.state().is_idle());
    assert!(m.highlighted().is_empty());
}

#[test]
fn test_find_references_respects_modifiers() {
    let grid = grid();
    let (mut m, recorder) = machine();

    assert_eq!(
        m.find_references(Modifiers::NONE),
        NavigationOutcome::Unavailable
    );

    let generation = lookup_generation(&m.gesture(&grid, &Gesture::click(A)));
    m.hover_resolved(generation, found("fn parse"));

    let ctrl = Modifiers {
        ctrl: true,
        ..Modifiers::NONE
    };
    assert_eq!(m.find_references(ctrl), NavigationOutcome::PassThrough);
    assert_eq!(
        m.find_references(Modifiers::NONE),
        NavigationOutcome::Intercepted
    );
    assert_eq!(
        recorder.history().last().map(String::as_str),
        Some("acme/app@head/-/blob/src/lib.rs#L1:4&tab=references")
    );
}

#[test]
fn test_click_loading_replaces_docked() {
    let grid = grid();
    let (mut m, _) = machine();

    let a = lookup_generation(&m.gesture(&grid, &Gesture::click(A)));
    m.hover_resolved(a, found("fn parse"));

    let b = lookup_generation(&m.gesture(&grid, &Gesture::click(B)));
    let commands = m.loading_elapsed(b);
    assert_eq!(commands, vec![Command::Cancel { generation: a }]);
    assert!(matches!(m.state(), TooltipState::Loading { .. }));
    assert!(m.docked().is_empty());

    // Leaving the grid keeps a pending click's placeholder
    m.pointer_left();
    assert!(matches!(m.state(), TooltipState::Loading { .. }));

    m.hover_resolved(b, found("let new_value"));
    assert!(m.state().is_docked());
    assert_eq!(shown_line(m.state()), Some(2));
}

#[test]
fn test_click_on_pending_hover_restarts_loading_timer() {
    let grid = grid();
    let (mut m, _) = machine();

    let c = lookup_generation(&m.gesture(&grid, &Gesture::click(C)));
    m.hover_resolved(c, found("fn build"));

    // Hover timer is swallowed while C is docked
    let a = lookup_generation(&m.gesture(&grid, &Gesture::hover(A)));
    assert!(m.loading_elapsed(a).is_empty());
    assert!(m.state().is_docked());

    let commands = m.gesture(&grid, &Gesture::click(A));
    assert_eq!(commands, vec![Command::LoadingTimer { generation: a }]);
    assert_eq!(m.active_generation(), Some(a));

    assert_eq!(m.loading_elapsed(a), vec![Command::Cancel { generation: c }]);
    assert!(matches!(m.state(), TooltipState::Loading { .. }));
    assert_eq!(m.state().anchor(), Some(anchor(1, 3, 8)));
    assert!(m.docked().is_empty());

    m.hover_resolved(a, found("fn parse"));
    assert!(m.state().is_docked());
    assert_eq!(shown_line(m.state()), Some(1));
}

#[test]
fn test_reset_has_no_side_effects() {
    let grid = grid();
    let (mut m, recorder) = machine();

    let generation = lookup_generation(&m.gesture(&grid, &Gesture::click(A)));
    m.hover_resolved(generation, found("fn parse"));
    let pushed = recorder.history().len();

    assert_eq!(m.reset(), vec![Command::Cancel { generation }]);
    assert!(m.state().is_idle());
    assert!(m.docked().is_empty());
    assert_eq!(recorder.history().len(), pushed);
    assert!(recorder.events_named("TooltipDismissed").is_empty());
}

// ============================================================================
// Async driver
// ============================================================================

#[derive(Clone)]
struct Script {
    delay: Duration,
    hover: Result<Option<HoverContent>, ServiceError>,
    definition: Result<Option<String>, ServiceError>,
}

impl Script {
    fn found(text: &str, delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            hover: Ok(Some(content(text))),
            definition: Ok(None),
        }
    }

    fn empty(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            hover: Ok(None),
            definition: Ok(None),
        }
    }
}

/// Counts futures that are still alive (started and neither finished nor dropped)
struct Live(Arc<AtomicUsize>);

impl Live {
    fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for Live {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct ScriptedService {
    scripts: HashMap<usize, Script>,
    hover_calls: AtomicUsize,
    completed: Mutex<Vec<usize>>,
    live: Arc<AtomicUsize>,
}

impl ScriptedService {
    fn with(mut self, line: usize, script: Script) -> Self {
        self.scripts.insert(line, script);
        self
    }

    fn script(&self, line: usize) -> Script {
        self.scripts.get(&line).cloned().unwrap_or(Script {
            delay: Duration::ZERO,
            hover: Err(ServiceError::Unsupported),
            definition: Err(ServiceError::Unsupported),
        })
    }

    fn completed(&self) -> Vec<usize> {
        self.completed.lock().unwrap().clone()
    }

    fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl LookupService for ScriptedService {
    async fn fetch_hover(
        &self,
        position: &SemanticPosition,
    ) -> Result<Option<HoverContent>, ServiceError> {
        let script = self.script(position.line());
        self.hover_calls.fetch_add(1, Ordering::SeqCst);
        let _live = Live::new(&self.live);
        sleep(script.delay).await;
        self.completed.lock().unwrap().push(position.line());
        script.hover
    }

    async fn fetch_definition(
        &self,
        position: &SemanticPosition,
    ) -> Result<Option<String>, ServiceError> {
        let script = self.script(position.line());
        let _live = Live::new(&self.live);
        sleep(script.delay).await;
        script.definition
    }
}

fn mount_with(service: &Arc<ScriptedService>) -> (MountedView, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let view = mount(
        Arc::new(grid()),
        Arc::clone(service),
        Collaborators::new(recorder.clone(), recorder.clone()),
        TooltipConfig::default(),
    );
    (view, recorder)
}

#[tokio::test(start_paused = true)]
async fn test_driver_debounces_hovers() {
    let service = Arc::new(
        ScriptedService::default()
            .with(1, Script::found("fn parse", 0))
            .with(2, Script::found("let new_value", 0))
            .with(3, Script::found("fn build", 0)),
    );
    let (view, _) = mount_with(&service);
    let input = view.input();

    input.send(Input::Gesture(Gesture::hover(A)));
    sleep(Duration::from_millis(10)).await;
    input.send(Input::Gesture(Gesture::hover(B)));
    sleep(Duration::from_millis(10)).await;
    input.send(Input::Gesture(Gesture::hover(C)));
    sleep(Duration::from_millis(200)).await;

    assert_eq!(service.hover_calls.load(Ordering::SeqCst), 1);
    let snapshot = view.snapshot();
    assert!(matches!(snapshot.state, TooltipState::Transient { .. }));
    assert_eq!(shown_line(&snapshot.state), Some(3));
    assert_eq!(snapshot.highlighted, BTreeSet::from([anchor(4, 4, 9)]));
    assert!(snapshot.revision > 0);
}

#[tokio::test(start_paused = true)]
async fn test_driver_last_gesture_wins() {
    let service = Arc::new(
        ScriptedService::default()
            .with(1, Script::found("fn parse", 300))
            .with(2, Script::found("let new_value", 20)),
    );
    let (view, _) = mount_with(&service);
    let input = view.input();

    input.send(Input::Gesture(Gesture::hover(A)));
    sleep(Duration::from_millis(100)).await;
    assert_eq!(service.hover_calls.load(Ordering::SeqCst), 1);

    input.send(Input::Gesture(Gesture::hover(B)));
    sleep(Duration::from_millis(100)).await;
    assert_eq!(shown_line(&view.snapshot().state), Some(2));

    // Well past the point where A would have resolved
    sleep(Duration::from_millis(800)).await;
    let snapshot = view.snapshot();
    assert_eq!(shown_line(&snapshot.state), Some(2));
    assert!(matches!(snapshot.state, TooltipState::Transient { .. }));
    assert_eq!(service.completed(), vec![2]);
    assert_eq!(service.live(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_driver_loading_then_empty() {
    let service = Arc::new(ScriptedService::default().with(2, Script::empty(800)));
    let (view, _) = mount_with(&service);

    view.input().send(Input::Gesture(Gesture::hover(B)));
    sleep(Duration::from_millis(300)).await;
    assert!(view.snapshot().state.is_idle());

    sleep(Duration::from_millis(300)).await;
    let snapshot = view.snapshot();
    assert!(matches!(snapshot.state, TooltipState::Loading { .. }));
    assert_eq!(snapshot.state.anchor(), Some(anchor(3, 8, 17)));

    sleep(Duration::from_millis(400)).await;
    assert!(view.snapshot().state.is_idle());
}

#[tokio::test(start_paused = true)]
async fn test_driver_click_on_slow_hover_shows_loading() {
    let service = Arc::new(
        ScriptedService::default()
            .with(1, Script::found("fn parse", 2000))
            .with(3, Script::found("fn build", 0)),
    );
    let (view, _) = mount_with(&service);
    let input = view.input();

    input.send(Input::Gesture(Gesture::click(C)));
    sleep(Duration::from_millis(50)).await;
    assert!(view.snapshot().state.is_docked());

    // Past A's own grace period: still docked on C
    input.send(Input::Gesture(Gesture::hover(A)));
    sleep(Duration::from_millis(700)).await;
    assert_eq!(shown_line(&view.snapshot().state), Some(3));

    input.send(Input::Gesture(Gesture::click(A)));
    sleep(Duration::from_millis(100)).await;
    assert!(view.snapshot().state.is_docked());

    sleep(Duration::from_millis(500)).await;
    let snapshot = view.snapshot();
    assert!(matches!(snapshot.state, TooltipState::Loading { .. }));
    assert_eq!(snapshot.state.anchor(), Some(anchor(1, 3, 8)));
    assert!(snapshot.docked.is_empty());

    sleep(Duration::from_millis(1000)).await;
    let snapshot = view.snapshot();
    assert!(snapshot.state.is_docked());
    assert_eq!(shown_line(&snapshot.state), Some(1));
    assert_eq!(service.hover_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_driver_fast_result_never_shows_loading() {
    let service = Arc::new(ScriptedService::default().with(1, Script::found("fn parse", 100)));
    let (view, _) = mount_with(&service);
    let mut snapshots = view.snapshots();

    view.input().send(Input::Gesture(Gesture::hover(A)));
    snapshots.changed().await.unwrap();
    assert!(matches!(
        snapshots.borrow_and_update().state,
        TooltipState::Transient { .. }
    ));

    // The loading timer was cancelled by the result
    sleep(Duration::from_secs(2)).await;
    assert!(matches!(
        view.snapshot().state,
        TooltipState::Transient { .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_driver_click_docks_and_escape_dismisses() {
    let service = Arc::new(ScriptedService::default().with(3, Script::found("fn build", 0)));
    let (view, recorder) = mount_with(&service);
    let mut snapshots = view.snapshots();
    let input = view.input();

    input.send(Input::Gesture(Gesture::click(C)));
    snapshots.changed().await.unwrap();
    let snapshot = snapshots.borrow_and_update().clone();
    assert!(snapshot.state.is_docked());
    assert_eq!(snapshot.docked, BTreeSet::from([anchor(4, 4, 9)]));
    assert_eq!(recorder.events_named("TooltipDocked").len(), 1);

    input.send(Input::PointerLeft);
    input.send(Input::Gesture(Gesture::hover(A)));
    sleep(Duration::from_millis(200)).await;
    assert!(view.snapshot().state.is_docked());

    input.send(Input::Escape);
    sleep(Duration::from_millis(1)).await;
    let snapshot = view.snapshot();
    assert!(snapshot.state.is_idle());
    assert!(snapshot.docked.is_empty());
    assert!(snapshot.highlighted.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_driver_replace_grid_dismisses() {
    let service = Arc::new(ScriptedService::default().with(1, Script::found("fn parse", 0)));
    let (view, recorder) = mount_with(&service);

    view.input().send(Input::Gesture(Gesture::click(A)));
    sleep(Duration::from_millis(50)).await;
    assert!(view.snapshot().state.is_docked());

    assert!(view.replace_grid(Arc::new(grid())));
    sleep(Duration::from_millis(50)).await;
    let snapshot = view.snapshot();
    assert!(snapshot.state.is_idle());
    assert!(snapshot.docked.is_empty());
    assert!(recorder.events_named("TooltipDismissed").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unmount_releases_lookups() {
    let service = Arc::new(ScriptedService::default().with(1, Script::found("fn parse", 10_000)));
    let (view, _) = mount_with(&service);
    let input = view.input();

    input.send(Input::Gesture(Gesture::hover(A)));
    sleep(Duration::from_millis(100)).await;
    assert_eq!(service.live(), 2);

    view.unmount().await;
    sleep(Duration::from_millis(1)).await;
    assert_eq!(service.live(), 0);
    assert!(service.completed().is_empty());
    assert!(!input.send(Input::Escape));
}

#[tokio::test(start_paused = true)]
async fn test_drop_releases_lookups() {
    let service = Arc::new(ScriptedService::default().with(2, Script::found("x", 10_000)));
    let (view, _) = mount_with(&service);

    view.input().send(Input::Gesture(Gesture::hover(B)));
    sleep(Duration::from_millis(100)).await;
    assert_eq!(service.live(), 2);

    drop(view);
    sleep(Duration::from_millis(1)).await;
    assert_eq!(service.live(), 0);
}
