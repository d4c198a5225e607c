//! Application state and logic

use crate::collab::{HistoryNavigator, TracingTelemetry};
use crate::config::Theme;
use crate::views::GridLayout;
use gloss_core::coordinator::InputSender;
use gloss_core::{
    mount, Collaborators, DiffGrid, FileDiff, Input, LookupService, MountedView, Side, Snapshot,
    TooltipConfig,
};
use ratatui::layout::Rect;
use std::sync::Arc;
use tokio::sync::watch;

mod input;

/// Repository identity used to build lookup positions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    pub repo: String,
    pub base_rev: String,
    pub head_rev: String,
}

/// The main application state
pub struct App {
    /// Files of the loaded diff
    pub files: Vec<FileDiff>,
    /// Index of the file on screen
    pub current_file: usize,
    /// Grid of the current file
    pub grid: Arc<DiffGrid>,
    pub source: SourceInfo,
    view: MountedView,
    input: InputSender,
    snapshots: watch::Receiver<Snapshot>,
    /// Latest tooltip snapshot published by the coordinator
    pub snapshot: Snapshot,
    navigator: Arc<HistoryNavigator>,
    /// First grid row on screen
    pub scroll_offset: usize,
    /// Grid rows visible (computed during render)
    pub viewport_height: usize,
    /// Screen geometry of the grid (computed during render)
    pub grid_layout: Option<GridLayout>,
    /// Screen area of the tooltip popup (computed during render)
    pub tooltip_area: Option<Rect>,
    /// True while the pointer is over the grid
    pointer_in_grid: bool,
    /// Most recent navigation location (hash or definition target)
    pub last_location: Option<String>,
    /// One-off message for the status bar
    pub status_message: Option<String>,
    /// Git branch name (if in a git repo)
    pub git_branch: Option<String>,
    pub theme: Theme,
    /// Whether to quit
    pub should_quit: bool,
}

impl App {
    /// Mount the first file. Must be called inside a tokio runtime.
    pub fn new<S: LookupService>(
        files: Vec<FileDiff>,
        source: SourceInfo,
        service: Arc<S>,
        tooltip: TooltipConfig,
        git_branch: Option<String>,
    ) -> Self {
        let grid = Arc::new(Self::grid_for(&files, 0, &source));
        let navigator = Arc::new(HistoryNavigator::new());
        let collaborators = Collaborators::new(navigator.clone(), Arc::new(TracingTelemetry));
        let view = mount(grid.clone(), service, collaborators, tooltip);
        let input = view.input();
        let snapshots = view.snapshots();

        Self {
            files,
            current_file: 0,
            grid,
            source,
            view,
            input,
            snapshots,
            snapshot: Snapshot::default(),
            navigator,
            scroll_offset: 0,
            viewport_height: 1,
            grid_layout: None,
            tooltip_area: None,
            pointer_in_grid: false,
            last_location: None,
            status_message: None,
            git_branch,
            theme: Theme::default(),
            should_quit: false,
        }
    }

    fn grid_for(files: &[FileDiff], idx: usize, source: &SourceInfo) -> DiffGrid {
        let empty = FileDiff::default();
        let file = files.get(idx).unwrap_or(&empty);
        DiffGrid::from_file(file, &source.repo, &source.base_rev, &source.head_rev)
    }

    /// Stop the coordinator and wait for its lookups to be released
    pub async fn unmount(self) {
        self.view.unmount().await;
    }

    pub(crate) fn send(&self, input: Input) {
        if !self.input.send(input) {
            tracing::warn!("tooltip coordinator is gone");
        }
    }

    /// Pull the latest snapshot and follow pushed navigation locations.
    /// Called once per frame.
    pub fn sync(&mut self) {
        if self.snapshots.has_changed().unwrap_or(false) {
            self.snapshot = self.snapshots.borrow_and_update().clone();
        }
        for location in self.navigator.take_pending() {
            self.follow_location(&location);
        }
    }

    pub fn current_file_path(&self) -> &str {
        self.files
            .get(self.current_file)
            .map(FileDiff::display_path)
            .unwrap_or("")
    }

    pub fn stats(&self) -> (usize, usize) {
        self.files
            .get(self.current_file)
            .map(FileDiff::stats)
            .unwrap_or((0, 0))
    }

    // ------------------------------------------------------------------------
    // Files
    // ------------------------------------------------------------------------

    pub fn select_file(&mut self, idx: usize) {
        if idx == self.current_file || idx >= self.files.len() {
            return;
        }
        self.current_file = idx;
        self.grid = Arc::new(Self::grid_for(&self.files, idx, &self.source));
        if !self.view.replace_grid(self.grid.clone()) {
            tracing::warn!("tooltip coordinator is gone");
        }
        self.scroll_offset = 0;
        self.pointer_in_grid = false;
        self.grid_layout = None;
        self.tooltip_area = None;
        self.status_message = None;
    }

    pub fn next_file(&mut self) {
        if self.current_file + 1 < self.files.len() {
            self.select_file(self.current_file + 1);
        }
    }

    pub fn prev_file(&mut self) {
        if self.current_file > 0 {
            self.select_file(self.current_file - 1);
        }
    }

    // ------------------------------------------------------------------------
    // Scrolling
    // ------------------------------------------------------------------------

    fn max_scroll(&self) -> usize {
        self.grid.len().saturating_sub(self.viewport_height.max(1))
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = (self.scroll_offset + lines).min(self.max_scroll());
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    pub fn scroll_half_page_down(&mut self) {
        self.scroll_down((self.viewport_height / 2).max(1));
    }

    pub fn scroll_half_page_up(&mut self) {
        self.scroll_up((self.viewport_height / 2).max(1));
    }

    pub fn goto_start(&mut self) {
        self.scroll_offset = 0;
    }

    pub fn goto_end(&mut self) {
        self.scroll_offset = self.max_scroll();
    }

    /// Scroll just enough to bring `row` on screen
    pub fn reveal_row(&mut self, row: usize) {
        let height = self.viewport_height.max(1);
        if row < self.scroll_offset {
            self.scroll_offset = row;
        } else if row >= self.scroll_offset + height {
            self.scroll_offset = row + 1 - height;
        }
    }

    // ------------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------------

    /// React to a location pushed by the coordinator.
    ///
    /// Position hashes and gutter ids scroll the current grid; definition
    /// targets (`path#L<n>`) may switch files first. An empty location
    /// clears the current one.
    pub fn follow_location(&mut self, location: &str) {
        tracing::debug!(location, "following location");
        if location.is_empty() {
            self.last_location = None;
            return;
        }
        self.last_location = Some(location.to_string());

        if location.contains("&tab=references") {
            self.status_message = Some(format!("References: {}", location));
            return;
        }

        if let Some(fragment) = location.strip_prefix('#') {
            let row = self.grid.row_for_anchor_id(fragment).or_else(|| {
                parse_position_hash(fragment)
                    .and_then(|(side, line)| self.grid.row_for_line(side, line))
            });
            if let Some(row) = row {
                self.reveal_row(row);
            }
            return;
        }

        let Some((path, line)) = parse_definition_target(location) else {
            self.status_message = Some(format!("Cannot open {}", location));
            return;
        };
        if path != self.grid.spec(Side::New).path {
            match self.files.iter().position(|file| file.display_path() == path) {
                Some(idx) => self.select_file(idx),
                None => {
                    self.status_message =
                        Some(format!("Definition outside the diff: {}", location));
                    return;
                }
            }
        }
        match self.grid.row_for_line(Side::New, line) {
            Some(row) => self.reveal_row(row),
            None => {
                self.status_message = Some(format!("{}:{} is not part of the diff", path, line))
            }
        }
    }
}

/// `L12:4` (new side) or `O12:4` (old side)
fn parse_position_hash(fragment: &str) -> Option<(Side, usize)> {
    let mut chars = fragment.chars();
    let side = match chars.next()? {
        'L' => Side::New,
        'O' => Side::Old,
        _ => return None,
    };
    let (line, _) = chars.as_str().split_once(':')?;
    Some((side, line.parse().ok()?))
}

/// `path#L12`
fn parse_definition_target(target: &str) -> Option<(&str, usize)> {
    let (path, line) = target.rsplit_once("#L")?;
    Some((path, line.parse().ok()?))
}
