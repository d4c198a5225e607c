//! Local symbol index answering hover and definition lookups
//!
//! Definition sites are found with a keyword regex over every line of the
//! diff (and optionally the working-tree copies of the changed files). No
//! language server involved: good enough to drive the tooltips offline.

use anyhow::{Context, Result};
use gloss_core::{
    FileDiff, HoverContent, LookupService, RowKind, SemanticPosition, ServiceError, Side,
};
use regex::Regex;
use rustc_hash::FxHashMap;
use std::path::Path;
use std::time::Duration;

const DEFINITION_PATTERN: &str = concat!(
    r"\b(fn|struct|enum|trait|type|const|static|mod|let|class|def|function|interface)",
    r"\s+(?:mut\s+)?([A-Za-z_][A-Za-z0-9_]*)",
);

/// Where a symbol is defined
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub kind: String,
    pub name: String,
    pub path: String,
    pub line: usize,
    pub text: String,
}

/// Line texts of one side of one file (sparse: only lines we have seen)
type SourceLines = FxHashMap<usize, String>;

pub struct LocalIndex {
    pattern: Regex,
    sources: FxHashMap<(Side, String), SourceLines>,
    definitions: FxHashMap<String, Definition>,
    latency: Duration,
}

impl LocalIndex {
    pub fn new(latency: Duration) -> Result<Self> {
        let pattern = Regex::new(DEFINITION_PATTERN).context("Invalid definition pattern")?;
        Ok(Self {
            pattern,
            sources: FxHashMap::default(),
            definitions: FxHashMap::default(),
            latency,
        })
    }

    /// Index every file of a diff. `worktree` is the repository root whose
    /// files back the new side.
    pub fn build(files: &[FileDiff], worktree: Option<&Path>, latency: Duration) -> Result<Self> {
        let mut index = Self::new(latency)?;
        let mut old_lines = Vec::new();

        for file in files {
            let new_path = file.display_path().to_string();
            let old_path = file.old_path.clone().unwrap_or_else(|| new_path.clone());
            for hunk in &file.hunks {
                // Malformed hunks have no line numbers to index
                let Ok(rows) = hunk.rows() else {
                    continue;
                };
                for row in rows {
                    if let (RowKind::Added | RowKind::Context, Some(line)) =
                        (row.kind, row.new_line)
                    {
                        index.add_line(Side::New, &new_path, line, &row.content);
                    }
                    if let (RowKind::Removed | RowKind::Context, Some(line)) =
                        (row.kind, row.old_line)
                    {
                        old_lines.push((old_path.clone(), line, row.content));
                    }
                }
            }
        }

        if let Some(root) = worktree {
            for file in files {
                let Some(path) = file.new_path.as_deref() else {
                    continue;
                };
                match std::fs::read_to_string(root.join(path)) {
                    Ok(text) => {
                        for (idx, line) in text.lines().enumerate() {
                            index.add_line_if_missing(Side::New, path, idx + 1, line);
                        }
                    }
                    Err(err) => tracing::debug!(path, error = %err, "skipping worktree file"),
                }
            }
        }

        // Old-side sites only fill in names the new side does not define
        for (path, line, text) in old_lines {
            index.add_line(Side::Old, &path, line, &text);
        }

        tracing::debug!(
            files = files.len(),
            definitions = index.definitions.len(),
            "built local index"
        );
        Ok(index)
    }

    fn add_line(&mut self, side: Side, path: &str, line: usize, text: &str) {
        self.sources
            .entry((side, path.to_string()))
            .or_default()
            .insert(line, text.to_string());
        self.scan_definitions(path, line, text);
    }

    fn add_line_if_missing(&mut self, side: Side, path: &str, line: usize, text: &str) {
        let lines = self.sources.entry((side, path.to_string())).or_default();
        if lines.contains_key(&line) {
            return;
        }
        lines.insert(line, text.to_string());
        self.scan_definitions(path, line, text);
    }

    fn scan_definitions(&mut self, path: &str, line: usize, text: &str) {
        for caps in self.pattern.captures_iter(text) {
            let (Some(kind), Some(name)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            self.definitions
                .entry(name.as_str().to_string())
                .or_insert_with(|| Definition {
                    kind: kind.as_str().to_string(),
                    name: name.as_str().to_string(),
                    path: path.to_string(),
                    line,
                    text: text.trim().to_string(),
                });
        }
    }

    pub fn definition(&self, name: &str) -> Option<&Definition> {
        self.definitions.get(name)
    }

    fn line_text(&self, position: &SemanticPosition) -> Option<&str> {
        self.sources
            .get(&(position.side(), position.spec().path.clone()))?
            .get(&position.line())
            .map(String::as_str)
    }

    /// Identifier under the position and its char range
    fn identifier_at(
        &self,
        position: &SemanticPosition,
    ) -> Result<(String, usize, usize), ServiceError> {
        let text = self.line_text(position).ok_or(ServiceError::NotFound)?;
        let chars: Vec<char> = text.chars().collect();
        let idx = position.character();
        match chars.get(idx) {
            Some(&c) if is_ident(c) => {}
            _ => return Err(ServiceError::Unsupported),
        }
        let mut start = idx;
        while start > 0 && is_ident(chars[start - 1]) {
            start -= 1;
        }
        let mut end = idx + 1;
        while end < chars.len() && is_ident(chars[end]) {
            end += 1;
        }
        // Numbers are not symbols
        if chars[start].is_ascii_digit() {
            return Err(ServiceError::Unsupported);
        }
        Ok((chars[start..end].iter().collect(), start, end))
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

fn is_ident(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

impl LookupService for LocalIndex {
    async fn fetch_hover(
        &self,
        position: &SemanticPosition,
    ) -> Result<Option<HoverContent>, ServiceError> {
        self.simulate_latency().await;
        let (name, start, end) = self.identifier_at(position)?;
        let definition = self.definitions.get(&name).ok_or(ServiceError::NotFound)?;
        Ok(Some(HoverContent {
            contents: vec![
                format!("{} {}", definition.kind, definition.name),
                format!("```\n{}\n```", definition.text),
                format!("{}:{}", definition.path, definition.line),
            ],
            range: Some((start, end)),
        }))
    }

    async fn fetch_definition(
        &self,
        position: &SemanticPosition,
    ) -> Result<Option<String>, ServiceError> {
        self.simulate_latency().await;
        let (name, _, _) = self.identifier_at(position)?;
        let definition = self.definitions.get(&name).ok_or(ServiceError::NotFound)?;
        Ok(Some(format!("{}#L{}", definition.path, definition.line)))
    }
}
