//! Tooltip popup anchored to the hovered or docked token

use crate::app::App;
use crate::config::Theme;
use gloss_core::coordinator::Tooltip;
use gloss_core::TooltipState;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

const MAX_WIDTH: u16 = 72;
const MAX_HEIGHT: u16 = 14;

fn tooltip_lines(tooltip: &Tooltip, docked: bool, theme: &Theme) -> Vec<(String, Style)> {
    let text = Style::default().fg(theme.text);
    let code = Style::default().fg(theme.code);
    let muted = Style::default().fg(theme.text_muted);

    let mut lines = Vec::new();
    match &tooltip.content {
        Some(content) => {
            for (idx, block) in content.contents.iter().enumerate() {
                let mut in_code = false;
                for line in block.lines() {
                    if line.trim_start().starts_with("```") {
                        in_code = !in_code;
                        continue;
                    }
                    let style = if in_code {
                        code
                    } else if idx == 0 {
                        text.add_modifier(Modifier::BOLD)
                    } else {
                        text
                    };
                    lines.push((line.to_string(), style));
                }
            }
        }
        // Lookup failed: the position is all we can show
        None => lines.push((tooltip.position.to_string(), muted)),
    }

    let mut hints = Vec::new();
    if tooltip.definition_url().is_some() {
        hints.push("[d] definition");
    }
    if docked {
        hints.push("[r] references");
        hints.push("[esc] close");
    }
    if !hints.is_empty() {
        lines.push((hints.join("  "), muted));
    }
    lines
}

/// Place a `width`x`height` popup under (or, without room, above) `(x, y)`
pub fn popup_rect(bounds: Rect, x: u16, y: u16, width: u16, height: u16) -> Rect {
    let width = width.min(bounds.width);
    let height = height.min(bounds.height);
    let bottom = bounds.y + bounds.height;
    let right = bounds.x + bounds.width;

    let top = if y + 1 + height <= bottom {
        y + 1
    } else {
        y.saturating_sub(height).max(bounds.y)
    };
    let left = x.min(right.saturating_sub(width)).max(bounds.x);
    Rect::new(left, top, width, height)
}

pub fn render_tooltip(frame: &mut Frame, app: &mut App, bounds: Rect) {
    app.tooltip_area = None;
    let Some(layout) = app.grid_layout else {
        return;
    };
    let theme = &app.theme;

    let (anchor, lines, docked) = match &app.snapshot.state {
        TooltipState::Idle => return,
        TooltipState::Loading { anchor, .. } => (
            *anchor,
            vec![("Loading…".to_string(), Style::default().fg(theme.text_muted))],
            false,
        ),
        TooltipState::Transient {
            anchor, tooltip, ..
        } => (*anchor, tooltip_lines(tooltip, false, theme), false),
        TooltipState::Docked {
            anchor, tooltip, ..
        } => (*anchor, tooltip_lines(tooltip, true, theme), true),
    };
    // Scrolled out of view: nothing to point at
    let Some((x, y)) = layout.screen_pos(&app.grid, &anchor) else {
        return;
    };

    let content_width = lines
        .iter()
        .map(|(line, _)| line.width())
        .max()
        .unwrap_or(0) as u16;
    let width = content_width.saturating_add(2).min(MAX_WIDTH).max(12);
    let height = (lines.len() as u16).saturating_add(2).min(MAX_HEIGHT);
    let area = popup_rect(bounds, x, y, width, height);

    let border = if docked {
        Style::default().fg(theme.border_active)
    } else {
        Style::default().fg(theme.text_muted)
    };
    let mut block = Block::default().borders(Borders::ALL).border_style(border);
    if docked {
        block = block.title(Span::styled(" pinned ", border));
    }
    if let Some(bg) = theme.background_panel {
        block = block.style(Style::default().bg(bg));
    }

    let text: Vec<Line> = lines
        .into_iter()
        .map(|(line, style)| Line::from(Span::styled(line, style)))
        .collect();

    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(text).block(block), area);
    app.tooltip_area = Some(area);
}
