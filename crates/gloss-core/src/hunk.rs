//! Hunk line numbering and unified diff parsing

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HunkError {
    #[error("malformed hunk: row {row} has marker {marker:?}")]
    Malformed { row: usize, marker: Option<char> },
}

/// Classification of a hunk row by its leading marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowKind {
    Context,
    Added,
    Removed,
}

impl RowKind {
    pub fn from_marker(marker: char) -> Option<Self> {
        match marker {
            ' ' => Some(RowKind::Context),
            '+' => Some(RowKind::Added),
            '-' => Some(RowKind::Removed),
            _ => None,
        }
    }

    pub fn marker(self) -> char {
        match self {
            RowKind::Context => ' ',
            RowKind::Added => '+',
            RowKind::Removed => '-',
        }
    }
}

/// A hunk row with its derived line numbers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberedRow {
    pub kind: RowKind,
    /// Line number on the old side (None for added rows)
    pub old_line: Option<usize>,
    /// Line number on the new side (None for removed rows)
    pub new_line: Option<usize>,
    /// Row text without the marker
    pub content: String,
    /// Followed by a `\ No newline at end of file` marker
    pub no_newline: bool,
}

/// Number the rows of a hunk body.
///
/// Context rows advance both counters, removed rows only the old one and
/// added rows only the new one. The empty segment after the final line
/// terminator is dropped before numbering.
pub fn number_rows(
    old_start: usize,
    new_start: usize,
    body: &str,
) -> Result<Vec<NumberedRow>, HunkError> {
    let mut segments: Vec<&str> = body.split('\n').collect();
    if segments.last().is_some_and(|s| s.is_empty()) {
        segments.pop();
    }

    let mut rows: Vec<NumberedRow> = Vec::with_capacity(segments.len());
    let mut old_line = old_start;
    let mut new_line = new_start;

    for (idx, segment) in segments.into_iter().enumerate() {
        let mut chars = segment.chars();
        let marker = chars.next();
        let content = chars.as_str();

        let kind = match marker {
            Some('\\') => match rows.last_mut() {
                Some(prev) => {
                    prev.no_newline = true;
                    continue;
                }
                None => return Err(HunkError::Malformed { row: idx, marker }),
            },
            Some(c) => RowKind::from_marker(c).ok_or(HunkError::Malformed { row: idx, marker })?,
            None => return Err(HunkError::Malformed { row: idx, marker }),
        };

        let (old, new) = match kind {
            RowKind::Context => {
                let numbers = (Some(old_line), Some(new_line));
                old_line += 1;
                new_line += 1;
                numbers
            }
            RowKind::Removed => {
                let numbers = (Some(old_line), None);
                old_line += 1;
                numbers
            }
            RowKind::Added => {
                let numbers = (None, Some(new_line));
                new_line += 1;
                numbers
            }
        };

        rows.push(NumberedRow {
            kind,
            old_line: old,
            new_line: new,
            content: content.to_string(),
            no_newline: false,
        });
    }

    Ok(rows)
}

/// Start line and length of one side of a hunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HunkRange {
    pub start_line: usize,
    pub line_count: usize,
}

impl HunkRange {
    fn parse(s: &str) -> Option<Self> {
        if let Some((start, count)) = s.split_once(',') {
            Some(Self {
                start_line: start.parse().ok()?,
                line_count: count.parse().ok()?,
            })
        } else {
            // "5" means start=5, count=1
            Some(Self {
                start_line: s.parse().ok()?,
                line_count: 1,
            })
        }
    }
}

/// A single hunk: paired ranges plus the marker-prefixed body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub old_range: HunkRange,
    pub new_range: HunkRange,
    /// Text after the closing `@@` (usually the enclosing function)
    pub section: Option<String>,
    pub body: String,
}

impl Hunk {
    pub fn rows(&self) -> Result<Vec<NumberedRow>, HunkError> {
        number_rows(self.old_range.start_line, self.new_range.start_line, &self.body)
    }

    pub fn header(&self) -> String {
        let mut header = format!(
            "@@ -{},{} +{},{} @@",
            self.old_range.start_line,
            self.old_range.line_count,
            self.new_range.start_line,
            self.new_range.line_count
        );
        if let Some(section) = &self.section {
            header.push(' ');
            header.push_str(section);
        }
        header
    }
}

/// How a hunk is laid out in the grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HunkLayout {
    Numbered(Vec<NumberedRow>),
    /// Fallback for hunks that fail numbering: unlabeled text
    Plain(Vec<String>),
}

impl HunkLayout {
    pub fn of(hunk: &Hunk) -> Self {
        match hunk.rows() {
            Ok(rows) => HunkLayout::Numbered(rows),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    header = %hunk.header(),
                    "rendering hunk as plain text"
                );
                HunkLayout::Plain(hunk.body.lines().map(str::to_string).collect())
            }
        }
    }
}

/// One file section of a unified diff
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileDiff {
    /// None for `/dev/null` (added file)
    pub old_path: Option<String>,
    /// None for `/dev/null` (deleted file)
    pub new_path: Option<String>,
    pub hunks: Vec<Hunk>,
}

impl FileDiff {
    pub fn display_path(&self) -> &str {
        self.new_path
            .as_deref()
            .or(self.old_path.as_deref())
            .unwrap_or("(unknown)")
    }

    pub fn stats(&self) -> (usize, usize) {
        let mut insertions = 0;
        let mut deletions = 0;
        for hunk in &self.hunks {
            if let Ok(rows) = hunk.rows() {
                for row in rows {
                    match row.kind {
                        RowKind::Added => insertions += 1,
                        RowKind::Removed => deletions += 1,
                        RowKind::Context => {}
                    }
                }
            }
        }
        (insertions, deletions)
    }
}

fn strip_path(raw: &str, prefix: &str) -> Option<String> {
    // Drop trailing timestamps emitted by `diff -u`
    let raw = raw.split('\t').next().unwrap_or(raw).trim_end();
    if raw == "/dev/null" {
        return None;
    }
    Some(raw.strip_prefix(prefix).unwrap_or(raw).to_string())
}

fn parse_hunk_header(line: &str) -> Option<(HunkRange, HunkRange, Option<String>)> {
    // @@ -start,count +start,count @@ optional section
    let rest = line.strip_prefix("@@ ")?;
    let (ranges, section) = rest.split_once(" @@")?;
    let mut parts = ranges.split_whitespace();
    let old = HunkRange::parse(parts.next()?.strip_prefix('-')?)?;
    let new = HunkRange::parse(parts.next()?.strip_prefix('+')?)?;
    let section = section.trim();
    let section = (!section.is_empty()).then(|| section.to_string());
    Some((old, new, section))
}

/// Parse a unified diff (git or plain `diff -u`) into per-file sections.
///
/// Hunk bodies are collected verbatim, so rows with unknown markers are kept
/// and surface later as [`HunkError::Malformed`].
pub fn parse_unified(text: &str) -> Vec<FileDiff> {
    let mut files: Vec<FileDiff> = Vec::new();
    let mut current: Option<FileDiff> = None;
    let mut hunk: Option<Hunk> = None;
    let mut remaining_old = 0usize;
    let mut remaining_new = 0usize;

    let flush_hunk = |hunk: &mut Option<Hunk>, file: &mut Option<FileDiff>| {
        if let Some(done) = hunk.take() {
            file.get_or_insert_with(FileDiff::default).hunks.push(done);
        }
    };

    for line in text.lines() {
        if let Some(open) = hunk.as_mut() {
            let in_body = remaining_old > 0 || remaining_new > 0;
            if line.starts_with('\\')
                || (in_body && !line.starts_with("@@ ") && !line.starts_with("diff --git "))
            {
                match line.chars().next() {
                    Some(' ') => {
                        remaining_old = remaining_old.saturating_sub(1);
                        remaining_new = remaining_new.saturating_sub(1);
                    }
                    Some('-') => remaining_old = remaining_old.saturating_sub(1),
                    Some('+') => remaining_new = remaining_new.saturating_sub(1),
                    _ => {}
                }
                open.body.push_str(line);
                open.body.push('\n');
                continue;
            }
            flush_hunk(&mut hunk, &mut current);
        }

        if line.starts_with("diff ") {
            if let Some(done) = current.take() {
                files.push(done);
            }
            current = Some(FileDiff::default());
        } else if let Some(path) = line.strip_prefix("--- ") {
            let file = current.get_or_insert_with(FileDiff::default);
            if !file.hunks.is_empty() {
                // A new header without a `diff` line starts another file
                files.push(std::mem::take(file));
            }
            file.old_path = strip_path(path, "a/");
        } else if let Some(path) = line.strip_prefix("+++ ") {
            current.get_or_insert_with(FileDiff::default).new_path = strip_path(path, "b/");
        } else if line.starts_with("@@ ") {
            if let Some((old_range, new_range, section)) = parse_hunk_header(line) {
                remaining_old = old_range.line_count;
                remaining_new = new_range.line_count;
                hunk = Some(Hunk {
                    old_range,
                    new_range,
                    section,
                    body: String::new(),
                });
            }
        }
    }

    flush_hunk(&mut hunk, &mut current);
    if let Some(done) = current {
        if !done.hunks.is_empty() || done.old_path.is_some() || done.new_path.is_some() {
            files.push(done);
        }
    }
    files
}
