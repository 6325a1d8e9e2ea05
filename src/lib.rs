// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. render::RenderOptions)
    clippy::module_name_repetitions
)]

//! # Tablemail
//!
//! Converts a visual design tree into table-based HTML with inline CSS that
//! renders the same in legacy email clients.
//!
//! Email clients lack flexbox, grid, opacity and reliable class-based CSS,
//! so tablemail:
//! - Flattens translucent fills onto their resolved backgrounds
//! - Emulates auto-layout stacks and rows with nested tables
//! - Emits text runs with deduplicated inline styles
//! - Replaces vector art and image fills with exported images
//!
//! ## Modules
//!
//! - [`design`]: Design tree model and JSON loading
//! - [`render`]: Node-to-markup renderer
//! - [`host`]: Font loading, image export and button confirmation
//! - [`config`]: Saved command line defaults
//! - [`perf`]: Timing and render debug logging

pub mod config;
pub mod design;
pub mod host;
pub mod perf;
pub mod render;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::design::{DesignNode, DesignTree, NodeHandle};
    pub use crate::host::{Host, LocalHost, NullHost};
    pub use crate::render::{ImageExportMode, RenderOptions, RenderOutput, parse};
}
