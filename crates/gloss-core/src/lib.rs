//! Core engine for gloss
//!
//! Parses unified diffs into numbered hunk rows, lays them out as a
//! [`grid::DiffGrid`], resolves pointer targets to semantic positions and
//! coordinates the hover/definition tooltip shown over the grid.

pub mod collaborators;
pub mod coordinator;
pub mod git;
pub mod grid;
pub mod hunk;
pub mod lookup;
pub mod position;

pub use collaborators::{Collaborators, Navigator, Telemetry};
pub use coordinator::{
    mount, Gesture, Input, Modifiers, MountedView, NavigationOutcome, Snapshot, TooltipConfig,
    TooltipMachine, TooltipState,
};
pub use grid::{resolve, Anchor, DiffGrid, GridRow, GridTarget};
pub use hunk::{parse_unified, FileDiff, Hunk, HunkError, HunkLayout, NumberedRow, RowKind};
pub use lookup::{HoverContent, LookupGateway, LookupResult, LookupService, ServiceError};
pub use position::{RepoSpec, SemanticPosition, Side};
