//! Git integration for loading diffs and naming revisions

use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GitError {
    #[error("Not a git repository")]
    NotARepo,
    #[error("Git command failed: {0}")]
    CommandFailed(String),
    #[error("Invalid revision range: {0}")]
    InvalidRange(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which changes to diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffSource {
    /// Working tree against the index
    Uncommitted,
    /// Index against HEAD
    Staged,
    Range { from: String, to: String },
}

impl DiffSource {
    /// Parse `A..B`; an empty side means `HEAD`
    pub fn parse_range(range: &str) -> Result<Self, GitError> {
        let Some((from, to)) = range.split_once("..") else {
            return Err(GitError::InvalidRange(range.to_string()));
        };
        if to.starts_with('.') {
            // `A...B` (merge-base form) is not supported
            return Err(GitError::InvalidRange(range.to_string()));
        }
        let side = |rev: &str| {
            if rev.is_empty() {
                "HEAD".to_string()
            } else {
                rev.to_string()
            }
        };
        Ok(DiffSource::Range {
            from: side(from),
            to: side(to),
        })
    }

    /// Revisions shown on the old and new side
    pub fn revisions(&self) -> (String, String) {
        match self {
            DiffSource::Uncommitted => ("INDEX".to_string(), "WORKTREE".to_string()),
            DiffSource::Staged => ("HEAD".to_string(), "INDEX".to_string()),
            DiffSource::Range { from, to } => (from.clone(), to.clone()),
        }
    }
}

/// Check if a directory is a git repository
pub fn is_git_repo(path: &Path) -> bool {
    Command::new("git")
        .arg("-C")
        .arg(path)
        .arg("rev-parse")
        .arg("--git-dir")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Get the current git branch name
pub fn get_current_branch(path: &Path) -> Result<String, GitError> {
    let output = Command::new("git")
        .arg("-C")
        .arg(path)
        .arg("rev-parse")
        .arg("--abbrev-ref")
        .arg("HEAD")
        .output()?;

    if !output.status.success() {
        return Err(GitError::NotARepo);
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Get the root of the git repository
pub fn get_repo_root(path: &Path) -> Result<PathBuf, GitError> {
    let output = Command::new("git")
        .arg("-C")
        .arg(path)
        .arg("rev-parse")
        .arg("--show-toplevel")
        .output()?;

    if !output.status.success() {
        return Err(GitError::NotARepo);
    }

    let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok(PathBuf::from(root))
}

/// Short commit hash of a revision
pub fn rev_parse_short(repo_path: &Path, rev: &str) -> Result<String, GitError> {
    let output = Command::new("git")
        .arg("-C")
        .arg(repo_path)
        .arg("rev-parse")
        .arg("--short")
        .arg(rev)
        .output()?;

    if !output.status.success() {
        return Err(GitError::CommandFailed(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Repository name used in lookup URLs (`host/owner/name` from the origin
/// remote, else the directory name)
pub fn repo_name(repo_path: &Path) -> String {
    let origin = Command::new("git")
        .arg("-C")
        .arg(repo_path)
        .arg("remote")
        .arg("get-url")
        .arg("origin")
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string());

    if let Some(name) = origin.as_deref().and_then(name_from_remote_url) {
        return name;
    }
    repo_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "repo".to_string())
}

fn name_from_remote_url(url: &str) -> Option<String> {
    let url = url.trim().trim_end_matches('/');
    let url = url.strip_suffix(".git").unwrap_or(url);
    let rest = if let Some((_, rest)) = url.split_once("://") {
        // Drop credentials
        rest.rsplit_once('@').map(|(_, r)| r).unwrap_or(rest).to_string()
    } else if let Some((user_host, path)) = url.split_once(':') {
        // scp-like: git@host:owner/name
        let host = user_host.rsplit_once('@').map(|(_, h)| h).unwrap_or(user_host);
        format!("{host}/{path}")
    } else {
        return None;
    };
    if rest.is_empty() || !rest.contains('/') {
        return None;
    }
    Some(rest)
}

/// Unified diff text for `source`
pub fn diff_text(repo_path: &Path, source: &DiffSource) -> Result<String, GitError> {
    let mut command = Command::new("git");
    command
        .arg("-C")
        .arg(repo_path)
        .arg("diff")
        .arg("--no-color")
        .arg("--no-ext-diff");
    match source {
        DiffSource::Uncommitted => {}
        DiffSource::Staged => {
            command.arg("--cached");
        }
        DiffSource::Range { from, to } => {
            command.arg(format!("{}..{}", from, to));
        }
    }

    let output = command.output()?;
    if !output.status.success() {
        return Err(GitError::CommandFailed(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    tracing::debug!(bytes = output.stdout.len(), ?source, "loaded git diff");
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
