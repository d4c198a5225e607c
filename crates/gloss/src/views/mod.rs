//! View rendering modules

mod grid;
mod tooltip;

pub use grid::{render_grid, GridLayout};
pub use tooltip::render_tooltip;
