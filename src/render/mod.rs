//! Design tree to email HTML rendering.
//!
//! This module handles:
//! - Resolving effective colours against ancestor backgrounds
//! - Classifying nodes into rendering strategies
//! - Emulating auto-layout with nested tables
//! - Rendering styled text runs and exporting images
//!
//! A render pass is a sequential tree walk. Children are visited in document
//! order and every host call completes before the walk continues, so the
//! output and the image numbering are deterministic.

mod cleanup;
pub mod classify;
pub mod color;
mod image;
mod layout;
pub mod style;
pub mod text;

pub use cleanup::remove_empty_rows;
pub use self::image::placeholder_url;

use std::collections::HashSet;
use std::fmt;

use tracing::{debug, warn};

use crate::design::{self, DesignTree, NodeHandle, Rgb};
use crate::host::Host;
use classify::Strategy;

/// Default outer table width in pixels.
pub const DEFAULT_PAGE_WIDTH: f64 = 600.0;

/// How image-like nodes are emitted.
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImageExportMode {
    /// Placeholder-service URLs sized to the node
    #[default]
    Placeholder,
    /// Inline data URIs
    Base64,
    /// Relative file references plus an asset list
    Download,
}

impl ImageExportMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Placeholder => "placeholder",
            Self::Base64 => "base64",
            Self::Download => "download",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "placeholder" => Some(Self::Placeholder),
            "base64" => Some(Self::Base64),
            "download" => Some(Self::Download),
            _ => None,
        }
    }
}

impl fmt::Display for ImageExportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub mode: ImageExportMode,
    /// Width given to root tables.
    pub page_width: f64,
    /// Directory that downloaded assets are referenced from.
    pub asset_dir: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            mode: ImageExportMode::default(),
            page_width: DEFAULT_PAGE_WIDTH,
            asset_dir: "images".to_string(),
        }
    }
}

/// An exported image collected in download mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub name: String,
    pub data: Vec<u8>,
}

/// Result of one render pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOutput {
    pub html: String,
    pub assets: Vec<ImageAsset>,
}

/// Inherited state for rendering one subtree.
///
/// Built fresh for every child; never mutated in place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderContext {
    /// Opaque colour behind the subtree.
    pub background: Rgb,
    /// Pixel budget left by the ancestors.
    pub available_width: f64,
    pub mode: ImageExportMode,
    pub is_root: bool,
}

impl RenderContext {
    pub const fn root(background: Rgb, available_width: f64, mode: ImageExportMode) -> Self {
        Self {
            background,
            available_width,
            mode,
            is_root: true,
        }
    }

    #[must_use]
    pub const fn child(self, background: Rgb, available_width: f64) -> Self {
        Self {
            background,
            available_width,
            mode: self.mode,
            is_root: false,
        }
    }
}

/// Render the selected nodes to email HTML.
///
/// Several selected nodes are stacked vertically like siblings and wrapped in
/// one outer table. Fonts are loaded up front, and button-shaped containers
/// are confirmed with the host before rendering starts.
pub fn parse<H: Host + ?Sized>(
    tree: &DesignTree,
    selection: &[NodeHandle],
    options: &RenderOptions,
    host: &mut H,
) -> RenderOutput {
    let _scope = crate::perf::scope("render.parse");
    let selected: Vec<NodeHandle> = selection
        .iter()
        .copied()
        .filter(|handle| tree.get(*handle).is_some_and(|node| node.visible))
        .collect();
    if selected.is_empty() {
        host.notify("Select at least one visible layer to export");
        return RenderOutput::default();
    }

    for font in design::collect_fonts(tree, &selected) {
        if let Err(err) = host.load_font(&font) {
            warn!("{err}; text will fall back to the web-safe stack");
        }
    }

    let candidates = classify::collect_cta_candidates(tree, &selected);
    let confirmed = if candidates.is_empty() {
        HashSet::new()
    } else {
        let confirmed = host.confirm_cta(&candidates);
        debug!(
            candidates = candidates.len(),
            confirmed = confirmed.len(),
            "button confirmation"
        );
        confirmed
    };

    let mut pass = RenderPass {
        tree,
        host,
        options,
        confirmed,
        assets: Vec::new(),
        image_count: 0,
    };
    let markup = pass.render_selection(&selected);
    debug!(
        nodes = selected.len(),
        assets = pass.assets.len(),
        bytes = markup.len(),
        "render pass finished"
    );

    RenderOutput {
        html: remove_empty_rows(&markup),
        assets: pass.assets,
    }
}

/// Render every root of the tree.
pub fn parse_tree<H: Host + ?Sized>(
    tree: &DesignTree,
    options: &RenderOptions,
    host: &mut H,
) -> RenderOutput {
    parse(tree, tree.roots(), options, host)
}

/// State owned by a single render invocation.
pub(crate) struct RenderPass<'a, H: Host + ?Sized> {
    tree: &'a DesignTree,
    host: &'a mut H,
    options: &'a RenderOptions,
    confirmed: HashSet<String>,
    assets: Vec<ImageAsset>,
    image_count: usize,
}

impl<H: Host + ?Sized> RenderPass<'_, H> {
    fn render_selection(&mut self, selected: &[NodeHandle]) -> String {
        let tree = self.tree;
        let background = color::ancestor_background(tree, selected[0]);
        let ctx = RenderContext::root(background, self.options.page_width, self.options.mode);

        if let [single] = selected {
            return self.render_node(*single, ctx);
        }
        let stack = self.vertical_stack(selected, layout::StackFrame::default(), ctx);
        format!(
            "<table role=\"presentation\" width=\"{width}\" align=\"center\" {TABLE_RESET}><tr><td>{stack}</td></tr></table>",
            width = layout::px(self.options.page_width),
        )
    }

    fn render_node(&mut self, handle: NodeHandle, ctx: RenderContext) -> String {
        let tree = self.tree;
        let node = &tree[handle];
        if !node.visible {
            return String::new();
        }
        let strategy = classify::classify(tree, handle, &self.confirmed);
        crate::perf::log_event("render.node", || {
            format!("id={} name={:?} strategy={strategy:?}", node.id, node.name)
        });
        match strategy {
            Strategy::ImageLike => self.render_image(handle, ctx),
            Strategy::Bullet(parts) => self.render_bullet(handle, parts, ctx),
            Strategy::CallToAction(parts) => self.render_cta(handle, parts, ctx),
            Strategy::Container => self.render_container(handle, ctx),
            Strategy::Shape => layout::render_shape(tree, handle, ctx),
            Strategy::Text => text::render_text(node, ctx),
            Strategy::Unsupported => String::new(),
        }
    }
}

/// Attributes that strip default table spacing in every client.
pub(crate) const TABLE_RESET: &str = "cellpadding=\"0\" cellspacing=\"0\" border=\"0\"";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_round_trips_through_str() {
        for mode in [
            ImageExportMode::Placeholder,
            ImageExportMode::Base64,
            ImageExportMode::Download,
        ] {
            assert_eq!(ImageExportMode::parse(mode.as_str()), Some(mode));
        }
        assert_eq!(ImageExportMode::parse("svg"), None);
    }

    #[test]
    fn test_child_context_is_never_root() {
        let root = RenderContext::root(Rgb::WHITE, 600.0, ImageExportMode::Base64);
        let child = root.child(Rgb::BLACK, 560.0);
        assert!(root.is_root);
        assert!(!child.is_root);
        assert_eq!(child.mode, ImageExportMode::Base64);
        assert_eq!(child.available_width, 560.0);
    }

    #[test]
    fn test_default_options() {
        let options = RenderOptions::default();
        assert_eq!(options.page_width, 600.0);
        assert_eq!(options.mode, ImageExportMode::Placeholder);
        assert_eq!(options.asset_dir, "images");
    }
}
