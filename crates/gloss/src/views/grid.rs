//! Unified diff grid: gutters, markers and content with anchor styling

use crate::app::App;
use crate::config::Theme;
use gloss_core::grid::cell_width;
use gloss_core::{Anchor, DiffGrid, GridRow, GridTarget, NumberedRow, RowKind, Side, Snapshot};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Screen geometry of the rendered grid.
///
/// Each line row is laid out as `old new m content`: two right-aligned
/// number gutters, the marker column and the content, separated by spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub area: Rect,
    pub scroll: usize,
    pub number_width: u16,
}

impl GridLayout {
    pub fn new(area: Rect, scroll: usize, grid: &DiffGrid) -> Self {
        let digits = grid.max_line_number().max(1).to_string().len() as u16;
        Self {
            area,
            scroll,
            number_width: digits.max(3),
        }
    }

    fn new_gutter_x(&self) -> u16 {
        self.number_width + 1
    }

    fn marker_x(&self) -> u16 {
        self.number_width * 2 + 2
    }

    /// Column where row content starts
    pub fn content_x(&self) -> u16 {
        self.marker_x() + 2
    }

    fn contains(&self, x: u16, y: u16) -> bool {
        x >= self.area.x
            && x < self.area.x + self.area.width
            && y >= self.area.y
            && y < self.area.y + self.area.height
    }

    /// Map a screen cell to a grid target. None when the cell is outside the
    /// grid area.
    pub fn target_at(&self, grid: &DiffGrid, x: u16, y: u16) -> Option<GridTarget> {
        if !self.contains(x, y) {
            return None;
        }
        let row = self.scroll + (y - self.area.y) as usize;
        if row >= grid.len() {
            return Some(GridTarget::Outside);
        }

        let rel_x = x - self.area.x;
        let target = if rel_x < self.number_width {
            GridTarget::Gutter {
                row,
                side: Side::Old,
            }
        } else if rel_x >= self.new_gutter_x() && rel_x < self.new_gutter_x() + self.number_width {
            GridTarget::Gutter {
                row,
                side: Side::New,
            }
        } else if rel_x >= self.content_x() {
            GridTarget::Content {
                row,
                column: (rel_x - self.content_x()) as usize,
            }
        } else {
            GridTarget::Outside
        };
        Some(target)
    }

    /// Screen cell of the first char of `anchor`, if its row is visible
    pub fn screen_pos(&self, grid: &DiffGrid, anchor: &Anchor) -> Option<(u16, u16)> {
        if anchor.row < self.scroll || anchor.row >= self.scroll + self.area.height as usize {
            return None;
        }
        let GridRow::Line { row, .. } = grid.row(anchor.row)? else {
            return None;
        };
        let offset: usize = row.content.chars().take(anchor.start).map(cell_width).sum();
        let x = (self.area.x + self.content_x()).saturating_add(offset as u16);
        let y = self.area.y + (anchor.row - self.scroll) as u16;
        Some((x.min(self.area.x + self.area.width.saturating_sub(1)), y))
    }
}

pub fn render_grid(frame: &mut Frame, app: &mut App, area: Rect) {
    let layout = GridLayout::new(area, app.scroll_offset, &app.grid);
    app.grid_layout = Some(layout);
    app.viewport_height = area.height as usize;

    let lines: Vec<Line> = app
        .grid
        .rows()
        .iter()
        .enumerate()
        .skip(app.scroll_offset)
        .take(area.height as usize)
        .map(|(idx, row)| render_row(idx, row, &layout, &app.snapshot, &app.theme))
        .collect();

    frame.render_widget(Paragraph::new(lines), area);
}

fn render_row<'a>(
    idx: usize,
    row: &'a GridRow,
    layout: &GridLayout,
    snapshot: &Snapshot,
    theme: &Theme,
) -> Line<'a> {
    match row {
        GridRow::Boundary { header, .. } => Line::from(Span::styled(
            header.as_str(),
            Style::default().fg(theme.diff_hunk_header),
        )),
        GridRow::Plain { text, .. } => {
            let pad = " ".repeat(layout.content_x() as usize);
            Line::from(vec![
                Span::raw(pad),
                Span::styled(
                    text.as_str(),
                    Style::default()
                        .fg(theme.text_muted)
                        .add_modifier(Modifier::ITALIC),
                ),
            ])
        }
        GridRow::Line { row, .. } => render_numbered(idx, row, layout, snapshot, theme),
    }
}

fn number(n: Option<usize>, width: usize) -> String {
    match n {
        Some(n) => format!("{:>width$}", n, width = width),
        None => " ".repeat(width),
    }
}

fn render_numbered<'a>(
    idx: usize,
    row: &NumberedRow,
    layout: &GridLayout,
    snapshot: &Snapshot,
    theme: &Theme,
) -> Line<'a> {
    let width = layout.number_width as usize;
    let gutter = Style::default().fg(theme.diff_line_number);
    let base = match row.kind {
        RowKind::Added => Style::default().fg(theme.diff_added),
        RowKind::Removed => Style::default().fg(theme.diff_removed),
        RowKind::Context => Style::default().fg(theme.diff_context),
    };

    let mut spans = vec![
        Span::styled(number(row.old_line, width), gutter),
        Span::raw(" "),
        Span::styled(number(row.new_line, width), gutter),
        Span::raw(" "),
        Span::styled(row.kind.marker().to_string(), base),
        Span::raw(" "),
    ];
    spans.extend(content_spans(idx, &row.content, snapshot, base, theme));
    if row.no_newline {
        spans.push(Span::styled(" (no newline)", Style::default().fg(theme.text_muted)));
    }
    Line::from(spans)
}

/// Split row content into runs, styling the chars covered by anchors
fn content_spans<'a>(
    idx: usize,
    content: &str,
    snapshot: &Snapshot,
    base: Style,
    theme: &Theme,
) -> Vec<Span<'a>> {
    let hover = base.bg(theme.hover_bg);
    let docked = base.bg(theme.docked_bg).add_modifier(Modifier::BOLD);
    let style_at = |pos: usize| {
        let covers = |anchor: &Anchor| anchor.row == idx && anchor.start <= pos && pos < anchor.end;
        if snapshot.docked.iter().any(covers) {
            docked
        } else if snapshot.highlighted.iter().any(covers) {
            hover
        } else {
            base
        }
    };

    let mut spans = Vec::new();
    let mut run = String::new();
    let mut run_style = base;
    for (pos, c) in content.chars().enumerate() {
        let style = style_at(pos);
        if style != run_style && !run.is_empty() {
            spans.push(Span::styled(std::mem::take(&mut run), run_style));
        }
        run_style = style;
        // Tabs take a single cell, matching pointer resolution
        run.push(if c == '\t' { ' ' } else { c });
    }
    if !run.is_empty() {
        spans.push(Span::styled(run, run_style));
    }
    spans
}
