//! Gloss CLI - diff viewer TUI with hover and go-to-definition tooltips

mod app;
mod collab;
mod config;
mod index;
mod logging;
mod ui;
mod views;

use anyhow::{Context, Result};
use app::{App, SourceInfo};
use clap::Parser;
use config::{Theme, ThemeMode};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use gloss_core::git::{self, DiffSource};
use gloss_core::parse_unified;
use index::LocalIndex;
use ratatui::prelude::*;
use std::io::{self, Read, Stdout};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "gloss")]
#[command(author, version, about = "A diff viewer with code intelligence tooltips")]
struct Args {
    /// Unified diff to show (`-` reads stdin). Defaults to `git diff`.
    patch: Option<PathBuf>,

    /// Show staged changes (index vs HEAD)
    #[arg(long, conflicts_with_all = ["rev", "patch"])]
    staged: bool,

    /// Show changes between two revisions: <A>..<B>
    #[arg(long, value_name = "A..B", conflicts_with = "patch")]
    rev: Option<String>,

    /// Theme mode: dark or light
    #[arg(long, value_enum)]
    theme_mode: Option<CliThemeMode>,

    /// Write logs here (enabled with GLOSS_LOG)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum CliThemeMode {
    Dark,
    Light,
}

impl From<CliThemeMode> for ThemeMode {
    fn from(mode: CliThemeMode) -> Self {
        match mode {
            CliThemeMode::Dark => ThemeMode::Dark,
            CliThemeMode::Light => ThemeMode::Light,
        }
    }
}

/// Diff text plus what is known about where it came from
struct LoadedDiff {
    text: String,
    source: SourceInfo,
    /// Directory whose files back the new side
    worktree: Option<PathBuf>,
    git_branch: Option<String>,
}

fn load_patch(patch: &Path, cwd: &Path) -> Result<LoadedDiff> {
    let text = if patch.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read diff from stdin")?;
        text
    } else {
        std::fs::read_to_string(patch)
            .with_context(|| format!("Failed to read: {}", patch.display()))?
    };

    let root = git::get_repo_root(cwd).ok();
    let repo = match root.as_deref() {
        Some(root) => git::repo_name(root),
        None => cwd
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "local".to_string()),
    };
    Ok(LoadedDiff {
        text,
        source: SourceInfo {
            repo,
            base_rev: "a".to_string(),
            head_rev: "b".to_string(),
        },
        worktree: Some(root.unwrap_or_else(|| cwd.to_path_buf())),
        git_branch: None,
    })
}

fn load_git(source: DiffSource, cwd: &Path) -> Result<LoadedDiff> {
    if !git::is_git_repo(cwd) {
        anyhow::bail!(
            "Not in a git repository.\n\
             \n\
             Usage: gloss <PATCH>\n\
             \n\
             Or run from a git repository to view uncommitted changes."
        );
    }
    let root = git::get_repo_root(cwd).context("Failed to get git repository root")?;
    let text = git::diff_text(&root, &source).context("Failed to run git diff")?;

    let (base_rev, head_rev) = source.revisions();
    let short = |rev: String| git::rev_parse_short(&root, &rev).unwrap_or(rev);
    let (base_rev, head_rev) = match source {
        DiffSource::Range { .. } => (short(base_rev), short(head_rev)),
        DiffSource::Staged => (short(base_rev), head_rev),
        DiffSource::Uncommitted => (base_rev, head_rev),
    };

    Ok(LoadedDiff {
        text,
        source: SourceInfo {
            repo: git::repo_name(&root),
            base_rev,
            head_rev,
        },
        git_branch: git::get_current_branch(&root).ok(),
        worktree: Some(root),
    })
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = config::Config::load();
    if let Some(path) = logging::init(args.log_file.as_deref())? {
        eprintln!("Logging to {}", path.display());
    }

    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let loaded = match (&args.patch, &args.rev) {
        (Some(patch), _) => load_patch(patch, &cwd)?,
        (None, Some(range)) => load_git(DiffSource::parse_range(range)?, &cwd)?,
        (None, None) if args.staged => load_git(DiffSource::Staged, &cwd)?,
        (None, None) => load_git(DiffSource::Uncommitted, &cwd)?,
    };

    let files = parse_unified(&loaded.text);
    if files.iter().all(|file| file.hunks.is_empty()) {
        println!("No changes found.");
        return Ok(());
    }
    tracing::info!(files = files.len(), repo = %loaded.source.repo, "diff loaded");

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let runtime_guard = runtime.enter();

    let worktree = loaded
        .worktree
        .as_deref()
        .filter(|_| config.lookup.index_worktree);
    let index = Arc::new(LocalIndex::build(&files, worktree, config.lookup.latency())?);

    let mut app = App::new(
        files,
        loaded.source,
        index,
        config.tooltip,
        loaded.git_branch,
    );

    // Theme mode: CLI overrides config
    let theme_mode = args
        .theme_mode
        .map(ThemeMode::from)
        .unwrap_or(config.ui.theme_mode);
    app.theme = Theme::resolve(theme_mode);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run event loop
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    drop(runtime_guard);
    runtime.block_on(app.unmount());

    if let Err(err) = result {
        eprintln!("Error: {}", err);
        return Err(err);
    }

    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(16);

    loop {
        app.sync();
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(tick_rate)? {
            match event::read()? {
                Event::Mouse(me) => app.handle_mouse(me),
                Event::Key(key) if key.kind == KeyEventKind::Press => app.handle_key(key),
                _ => {}
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
