//! Semantic positions inside a diff

use std::fmt;

/// Which side of the diff a position refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    Old,
    New,
}

impl Side {
    /// Letter used in position hashes (`#L12:4` on the new side, `#O12:4` on the old)
    fn hash_letter(self) -> char {
        match self {
            Side::Old => 'O',
            Side::New => 'L',
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Old => f.write_str("old"),
            Side::New => f.write_str("new"),
        }
    }
}

/// Repository, revision and path identifying one side of a file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoSpec {
    pub repo: String,
    pub rev: String,
    pub path: String,
}

/// The symbol context to query: a side, a 1-based line and a 0-based
/// character offset within that line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SemanticPosition {
    side: Side,
    line: usize,
    character: usize,
    spec: RepoSpec,
}

impl SemanticPosition {
    /// Returns None for line 0, since lines are 1-based.
    pub fn new(side: Side, line: usize, character: usize, spec: RepoSpec) -> Option<Self> {
        if line == 0 {
            return None;
        }
        Some(Self {
            side,
            line,
            character,
            spec,
        })
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn character(&self) -> usize {
        self.character
    }

    pub fn spec(&self) -> &RepoSpec {
        &self.spec
    }

    /// Location hash recorded in history when a tooltip is docked
    pub fn to_hash(&self) -> String {
        format!(
            "#{}{}:{}",
            self.side.hash_letter(),
            self.line,
            self.character + 1
        )
    }

    pub fn references_url(&self) -> String {
        format!(
            "{}@{}/-/blob/{}#L{}:{}&tab=references",
            self.spec.repo,
            self.spec.rev,
            self.spec.path,
            self.line,
            self.character + 1
        )
    }
}

impl fmt::Display for SemanticPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{} ({})",
            self.spec.path,
            self.line,
            self.character + 1,
            self.side
        )
    }
}
