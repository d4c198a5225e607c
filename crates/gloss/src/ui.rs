//! UI rendering for the TUI

use crate::app::App;
use crate::views::{render_grid, render_tooltip};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use unicode_width::UnicodeWidthStr;

const KEY_HINTS: &str = "q quit  j/k scroll  [/] file  d def  r refs  esc close";

/// Main drawing function
pub fn draw(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Top bar
            Constraint::Min(0),    // Diff grid
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    draw_top_bar(frame, app, chunks[0]);
    render_grid(frame, app, chunks[1]);
    draw_status_bar(frame, app, chunks[2]);
    // Popup last so it sits on top of the grid
    render_tooltip(frame, app, chunks[1]);
}

fn draw_top_bar(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let (insertions, deletions) = app.stats();

    let mut spans = vec![
        Span::styled(
            " gloss ",
            Style::default()
                .fg(theme.primary)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(app.current_file_path().to_string(), Style::default().fg(theme.text)),
    ];
    if app.files.len() > 1 {
        spans.push(Span::styled(
            format!(" ({}/{})", app.current_file + 1, app.files.len()),
            Style::default().fg(theme.text_muted),
        ));
    }
    spans.push(Span::styled(
        format!(" +{}", insertions),
        Style::default().fg(theme.diff_added),
    ));
    spans.push(Span::styled(
        format!(" -{}", deletions),
        Style::default().fg(theme.diff_removed),
    ));
    let scope = match app.git_branch.as_ref() {
        Some(branch) => format!("  {}@{}", app.source.repo, branch),
        None => format!("  {}", app.source.repo),
    };
    spans.push(Span::styled(scope, Style::default().fg(theme.text_muted)));
    spans.push(Span::styled(
        format!("  {}..{}", app.source.base_rev, app.source.head_rev),
        Style::default().fg(theme.accent),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let left = app
        .status_message
        .as_deref()
        .or(app.last_location.as_deref())
        .unwrap_or("");

    let width = area.width as usize;
    let hints_width = KEY_HINTS.width();
    let left_budget = width.saturating_sub(hints_width + 2);
    let left: String = if left.width() > left_budget {
        left.chars().take(left_budget.saturating_sub(1)).chain(['…']).collect()
    } else {
        left.to_string()
    };
    let pad = width.saturating_sub(left.width() + hints_width + 1);

    let mut spans = vec![
        Span::raw(" "),
        Span::styled(left, Style::default().fg(theme.warning)),
        Span::raw(" ".repeat(pad)),
    ];
    if hints_width < width {
        spans.push(Span::styled(KEY_HINTS, Style::default().fg(theme.text_muted)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
