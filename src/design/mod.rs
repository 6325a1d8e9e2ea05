//! The visual design tree.
//!
//! This module handles:
//! - The node model (frames, groups, shapes, text) as a closed tagged union
//! - Arena storage with non-owning parent handles
//! - Loading design exports from JSON

mod parser;
mod types;

pub use parser::{LoadError, load, parse};
pub use types::{
    ContainerData, ContainerKind, CounterAlign, DesignNode, DesignTree, FontName, Geometry,
    GradientStop, LayoutContext, LayoutMode, LineHeight, NodeData, NodeHandle, Padding, Paint,
    PaintKind, PrimaryAlign, Rgb, ShapeData, ShapeKind, TextAlign, TextData, TextDecoration,
    TextRun,
};

/// Every distinct font referenced by visible text under `roots`.
pub fn collect_fonts(tree: &DesignTree, roots: &[NodeHandle]) -> Vec<FontName> {
    let mut fonts = std::collections::BTreeSet::new();
    let mut stack: Vec<NodeHandle> = roots.iter().rev().copied().collect();
    while let Some(handle) = stack.pop() {
        let node = &tree[handle];
        if !node.visible {
            continue;
        }
        if let Some(text) = node.text_data() {
            fonts.extend(text.runs.iter().filter_map(|run| run.font.clone()));
        }
        stack.extend(node.children().iter().rev().copied());
    }
    fonts.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_fonts_dedupes_and_skips_hidden() {
        let mut tree = DesignTree::new();
        let root = tree.add_root(DesignNode::frame("root", Geometry::default()));
        tree.add_child(root, DesignNode::text("a", Geometry::default(), "one"));
        tree.add_child(root, DesignNode::text("b", Geometry::default(), "two"));
        let hidden = DesignNode::text_runs(
            "c",
            Geometry::default(),
            vec![TextRun::new("x", FontName::new("Georgia", "Italic"), 12.0)],
        )
        .with_visible(false);
        tree.add_child(root, hidden);

        let fonts = collect_fonts(&tree, &[root]);
        assert_eq!(fonts, vec![FontName::new("Inter", "Regular")]);
    }

    #[test]
    fn test_collect_fonts_ignores_mixed_runs() {
        let mut run = TextRun::new("x", FontName::new("Inter", "Bold"), 12.0);
        run.font = None;
        let mut tree = DesignTree::new();
        let text = tree.add_root(DesignNode::text_runs("t", Geometry::default(), vec![run]));
        assert!(collect_fonts(&tree, &[text]).is_empty());
    }
}
