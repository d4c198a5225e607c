//! Diff grid model and pointer target resolution
//!
//! A [`DiffGrid`] is the row layout of one file's hunks. Renderers draw it and
//! translate pointer coordinates into a [`GridTarget`]; [`resolve`] turns a
//! target into the [`SemanticPosition`] the tooltip pipeline queries.

use crate::hunk::{FileDiff, HunkLayout, NumberedRow, RowKind};
use crate::position::{RepoSpec, SemanticPosition, Side};
use sha2::{Digest, Sha256};
use unicode_width::UnicodeWidthChar;

/// One row of the laid-out diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridRow {
    /// Hunk header row (`@@ -a,b +c,d @@`)
    Boundary { header: String, hunk: usize },
    Line { row: NumberedRow, hunk: usize },
    /// Row of a hunk that could not be numbered
    Plain { text: String, hunk: usize },
}

/// Laid-out rows of a single file diff plus the identity of both sides
#[derive(Debug, Clone)]
pub struct DiffGrid {
    old: RepoSpec,
    new: RepoSpec,
    anchor_prefix: String,
    rows: Vec<GridRow>,
}

impl DiffGrid {
    pub fn from_file(file: &FileDiff, repo: &str, base_rev: &str, head_rev: &str) -> Self {
        let new_path = file.display_path().to_string();
        let old_path = file.old_path.clone().unwrap_or_else(|| new_path.clone());

        let mut rows = Vec::new();
        for (idx, hunk) in file.hunks.iter().enumerate() {
            rows.push(GridRow::Boundary {
                header: hunk.header(),
                hunk: idx,
            });
            match HunkLayout::of(hunk) {
                HunkLayout::Numbered(numbered) => {
                    rows.extend(numbered.into_iter().map(|row| GridRow::Line { row, hunk: idx }));
                }
                HunkLayout::Plain(lines) => {
                    rows.extend(lines.into_iter().map(|text| GridRow::Plain { text, hunk: idx }));
                }
            }
        }

        Self {
            old: RepoSpec {
                repo: repo.to_string(),
                rev: base_rev.to_string(),
                path: old_path,
            },
            anchor_prefix: file_anchor(&new_path),
            new: RepoSpec {
                repo: repo.to_string(),
                rev: head_rev.to_string(),
                path: new_path,
            },
            rows,
        }
    }

    pub fn rows(&self) -> &[GridRow] {
        &self.rows
    }

    pub fn row(&self, idx: usize) -> Option<&GridRow> {
        self.rows.get(idx)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn spec(&self, side: Side) -> &RepoSpec {
        match side {
            Side::Old => &self.old,
            Side::New => &self.new,
        }
    }

    pub fn anchor_prefix(&self) -> &str {
        &self.anchor_prefix
    }

    /// Widest line number on either side (for gutter sizing)
    pub fn max_line_number(&self) -> usize {
        self.rows
            .iter()
            .filter_map(|row| match row {
                GridRow::Line { row, .. } => row.old_line.max(row.new_line),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Row index showing `line` on `side`
    pub fn row_for_line(&self, side: Side, line: usize) -> Option<usize> {
        self.rows.iter().position(|row| match row {
            GridRow::Line { row, .. } => match side {
                Side::Old => row.old_line == Some(line),
                Side::New => row.new_line == Some(line),
            },
            _ => false,
        })
    }

    /// Stable id of a line-number gutter cell, e.g. `diff-1a2b3c4d5e6fR12`
    pub fn gutter_anchor_id(&self, row: usize, side: Side) -> Option<String> {
        let GridRow::Line { row: line, .. } = self.rows.get(row)? else {
            return None;
        };
        let (letter, number) = match side {
            Side::Old => ('L', line.old_line?),
            Side::New => ('R', line.new_line?),
        };
        Some(format!("{}{}{}", self.anchor_prefix, letter, number))
    }

    /// Inverse of [`DiffGrid::gutter_anchor_id`]
    pub fn row_for_anchor_id(&self, id: &str) -> Option<usize> {
        let rest = id.strip_prefix(&self.anchor_prefix)?;
        let mut chars = rest.chars();
        let side = match chars.next()? {
            'L' => Side::Old,
            'R' => Side::New,
            _ => return None,
        };
        let line = chars.as_str().parse().ok()?;
        self.row_for_line(side, line)
    }
}

fn file_anchor(path: &str) -> String {
    let digest = Sha256::digest(path.as_bytes());
    let hex: String = digest.iter().take(6).map(|b| format!("{b:02x}")).collect();
    format!("diff-{hex}")
}

/// Handle to the token cell under a resolved position.
///
/// `start..end` is a char range in the row's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Anchor {
    pub row: usize,
    pub side: Side,
    pub start: usize,
    pub end: usize,
}

/// Raw pointer target inside the rendered grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridTarget {
    /// `column` counts display cells from the start of the row content
    Content { row: usize, column: usize },
    Gutter { row: usize, side: Side },
    Outside,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub position: SemanticPosition,
    pub anchor: Anchor,
}

/// Map a pointer target to the semantic position of the token under it.
///
/// Returns None for anything that is not a token in a numbered content cell:
/// gutters, boundary rows, plain fallback rows, whitespace, or columns past
/// the end of the text.
pub fn resolve(grid: &DiffGrid, target: &GridTarget) -> Option<Resolved> {
    let GridTarget::Content { row, column } = *target else {
        return None;
    };
    let GridRow::Line { row: line, .. } = grid.row(row)? else {
        return None;
    };

    let (side, line_number) = match line.kind {
        RowKind::Removed => (Side::Old, line.old_line?),
        RowKind::Added | RowKind::Context => (Side::New, line.new_line?),
    };

    let chars: Vec<char> = line.content.chars().collect();
    let character = char_at_column(&chars, column)?;
    let (start, end) = token_bounds(&chars, character)?;

    let position = SemanticPosition::new(side, line_number, character, grid.spec(side).clone())?;
    Some(Resolved {
        position,
        anchor: Anchor {
            row,
            side,
            start,
            end,
        },
    })
}

/// Display width of a char as laid out in the grid (tabs take one cell)
pub fn cell_width(c: char) -> usize {
    if c == '\t' {
        return 1;
    }
    c.width().unwrap_or(1)
}

fn char_at_column(chars: &[char], column: usize) -> Option<usize> {
    let mut start = 0;
    for (idx, &c) in chars.iter().enumerate() {
        let width = cell_width(c);
        if width > 0 && column < start + width {
            return Some(idx);
        }
        start += width;
    }
    None
}

fn is_ident(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn token_bounds(chars: &[char], idx: usize) -> Option<(usize, usize)> {
    let c = *chars.get(idx)?;
    if c.is_whitespace() {
        return None;
    }
    if !is_ident(c) {
        return Some((idx, idx + 1));
    }
    let mut start = idx;
    while start > 0 && is_ident(chars[start - 1]) {
        start -= 1;
    }
    let mut end = idx + 1;
    while end < chars.len() && is_ident(chars[end]) {
        end += 1;
    }
    Some((start, end))
}
